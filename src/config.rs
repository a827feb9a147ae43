use std::time::Duration;

use crate::infrastructure::fetcher::RetryPolicy;

/// 候选来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// 检索 API（按查询语句 + 日期区间）
    Query,
    /// 每日更新的订阅源（按主题组）
    Feed,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Query => "query",
            SourceKind::Feed => "feed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "query" | "search" => Some(SourceKind::Query),
            "feed" | "rss" => Some(SourceKind::Feed),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 阶段产物与运行汇总的存放目录
    pub data_dir: String,
    /// 运行日志文件
    pub log_file: String,
    /// 来源定义文件（查询语句、主题组、角色）
    pub sources_file: String,
    /// 候选来源类型
    pub source_kind: SourceKind,
    // --- 检索 / 订阅 API ---
    pub search_api_url: String,
    pub feed_base_url: String,
    pub search_retry: RetryPolicy,
    pub feed_retry: RetryPolicy,
    /// 相邻两次检索之间的固定间隔
    pub inter_query_delay: Duration,
    /// 相邻两个订阅主题组之间的固定间隔
    pub inter_group_delay: Duration,
    /// 候选数量低于该值时告警
    pub min_candidates_warning: usize,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    /// 第一阶段（相关性过滤）模型
    pub filter_model: String,
    /// 第二阶段（多维评分）模型
    pub scoring_model: String,
    // --- 选择策略 ---
    pub score_threshold: f64,
    pub top_n: usize,
    // --- 存储配置 ---
    pub store_url: String,
    pub store_key: String,
    pub posts_table: String,
    pub labels_table: String,
    /// 发布时附加的标签
    pub publish_label: String,
    /// 续跑时读取的最近发布条数
    pub continuation_lookback: usize,
    // --- 运行环境 ---
    pub default_persona: String,
    /// 无人值守（CI）模式：缺少发布身份时直接失败
    pub unattended: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_file: "curator.log".to_string(),
            sources_file: "sources.toml".to_string(),
            source_kind: SourceKind::Query,
            search_api_url: "http://export.arxiv.org/api/query".to_string(),
            feed_base_url: "https://rss.arxiv.org/rss".to_string(),
            search_retry: RetryPolicy::new(4, Duration::from_secs(30)),
            feed_retry: RetryPolicy::new(2, Duration::from_secs(5)),
            inter_query_delay: Duration::from_secs(15),
            inter_group_delay: Duration::from_secs(3),
            min_candidates_warning: 5,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            filter_model: "gpt-4o-mini".to_string(),
            scoring_model: "gpt-4o".to_string(),
            score_threshold: 8.5,
            top_n: 5,
            store_url: String::new(),
            store_key: String::new(),
            posts_table: "posts".to_string(),
            labels_table: "labels".to_string(),
            publish_label: "ai-curated".to_string(),
            continuation_lookback: 20,
            default_persona: "curator".to_string(),
            unattended: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            data_dir: env_or("CURATOR_DATA_DIR", default.data_dir),
            log_file: env_or("CURATOR_LOG_FILE", default.log_file),
            sources_file: env_or("CURATOR_SOURCES_FILE", default.sources_file),
            source_kind: std::env::var("CURATOR_SOURCE_KIND").ok().and_then(|v| SourceKind::parse(&v)).unwrap_or(default.source_kind),
            search_api_url: env_or("SEARCH_API_URL", default.search_api_url),
            feed_base_url: env_or("FEED_BASE_URL", default.feed_base_url),
            search_retry: RetryPolicy::new(
                env_parse("SEARCH_RETRIES", default.search_retry.retries),
                Duration::from_secs(env_parse("SEARCH_BACKOFF_SECS", default.search_retry.base_delay.as_secs())),
            ),
            feed_retry: RetryPolicy::new(
                env_parse("FEED_RETRIES", default.feed_retry.retries),
                Duration::from_secs(env_parse("FEED_BACKOFF_SECS", default.feed_retry.base_delay.as_secs())),
            ),
            inter_query_delay: Duration::from_secs(env_parse("INTER_QUERY_DELAY_SECS", default.inter_query_delay.as_secs())),
            inter_group_delay: Duration::from_secs(env_parse("INTER_GROUP_DELAY_SECS", default.inter_group_delay.as_secs())),
            min_candidates_warning: env_parse("MIN_CANDIDATES_WARNING", default.min_candidates_warning),
            llm_api_key: env_or("LLM_API_KEY", default.llm_api_key),
            llm_api_base_url: env_or("LLM_API_BASE_URL", default.llm_api_base_url),
            filter_model: env_or("LLM_FILTER_MODEL", default.filter_model),
            scoring_model: env_or("LLM_SCORING_MODEL", default.scoring_model),
            score_threshold: env_parse("SCORE_THRESHOLD", default.score_threshold),
            top_n: env_parse("TOP_N", default.top_n),
            store_url: env_or("STORE_URL", default.store_url),
            store_key: env_or("STORE_KEY", default.store_key),
            posts_table: env_or("STORE_POSTS_TABLE", default.posts_table),
            labels_table: env_or("STORE_LABELS_TABLE", default.labels_table),
            publish_label: env_or("PUBLISH_LABEL", default.publish_label),
            continuation_lookback: env_parse("CONTINUATION_LOOKBACK", default.continuation_lookback),
            default_persona: env_or("DEFAULT_PERSONA", default.default_persona),
            unattended: detect_unattended(),
        }
    }
}

/// 在 CI 中运行时视为无人值守
pub fn detect_unattended() -> bool {
    ["CI", "GITHUB_ACTIONS"].iter().any(|name| {
        std::env::var(name)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false)
    })
}

fn env_or(name: &str, default: String) -> String {
    std::env::var(name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_operational_values() {
        let config = Config::default();
        assert_eq!(config.search_retry.retries, 4);
        assert_eq!(config.search_retry.base_delay, Duration::from_secs(30));
        assert_eq!(config.feed_retry.retries, 2);
        assert_eq!(config.feed_retry.base_delay, Duration::from_secs(5));
        assert_eq!(config.inter_query_delay, Duration::from_secs(15));
        assert_eq!(config.inter_group_delay, Duration::from_secs(3));
        assert_eq!(config.min_candidates_warning, 5);
        assert_eq!(config.top_n, 5);
        assert!((config.score_threshold - 8.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!(SourceKind::parse("Query"), Some(SourceKind::Query));
        assert_eq!(SourceKind::parse(" rss "), Some(SourceKind::Feed));
        assert_eq!(SourceKind::parse("scholar"), None);
    }
}
