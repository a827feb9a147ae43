//! 候选来源 - 业务能力层
//!
//! ## 职责
//!
//! 给定日期窗口，产出去重后的候选论文列表。
//! 两种策略（检索 API / 订阅源）实现同一个 trait，由配置选择，编排层只看到 trait。
//!
//! 两种策略共用收尾步骤 [`finish_discovery`]：
//! 统计每个查询 / 主题组的命中数 → 跨查询去重 → 候选过少时告警（不失败）

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Config, SourceKind};
use crate::error::CuratorResult;
use crate::infrastructure::{HttpTransport, RateLimitedFetcher};
use crate::models::{CandidatePaper, DateWindow, SourceSettings};
use crate::services::dedup::dedup_by_id;
use crate::services::feed_source::FeedSource;
use crate::services::query_source::QuerySource;

/// 一次发现的结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub papers: Vec<CandidatePaper>,
    /// 查询 / 主题组标签 → 去重前的命中数
    pub query_summary: BTreeMap<String, usize>,
}

/// 候选来源
#[async_trait]
pub trait CandidateSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// 查询语句或主题组的标签（写入运行汇总）
    fn labels(&self) -> Vec<String>;

    async fn discover(&self, window: &DateWindow) -> CuratorResult<Discovery>;
}

/// 收尾：合并各批次、去重、告警
///
/// # 参数
/// - `batches`: 按执行顺序排列的 (标签, 该标签命中的论文)
/// - `min_candidates_warning`: 候选数低于该值时打 warn
pub fn finish_discovery(
    batches: Vec<(String, Vec<CandidatePaper>)>,
    min_candidates_warning: usize,
) -> Discovery {
    let mut query_summary = BTreeMap::new();
    let mut all = Vec::new();

    for (label, papers) in batches {
        *query_summary.entry(label).or_insert(0) += papers.len();
        all.extend(papers);
    }

    let (papers, removed) = dedup_by_id(all);
    info!(
        "🧹 去重完成: 移除 {} 篇重复, 剩余 {} 篇候选",
        removed,
        papers.len()
    );

    if papers.len() < min_candidates_warning {
        warn!(
            "⚠️ 候选论文只有 {} 篇 (低于 {})，可能是低活跃日或检索语句过窄",
            papers.len(),
            min_candidates_warning
        );
    }

    Discovery {
        papers,
        query_summary,
    }
}

/// 按配置构建候选来源
pub fn build_source(
    config: &Config,
    settings: &SourceSettings,
    transport: Arc<dyn HttpTransport>,
) -> Box<dyn CandidateSource> {
    match config.source_kind {
        SourceKind::Query => Box::new(QuerySource::new(
            RateLimitedFetcher::new(transport, config.search_retry),
            config.search_api_url.clone(),
            settings.queries.clone(),
            config.inter_query_delay,
            config.min_candidates_warning,
        )),
        SourceKind::Feed => Box::new(FeedSource::new(
            RateLimitedFetcher::new(transport, config.feed_retry),
            config.feed_base_url.clone(),
            settings.feed_groups.clone(),
            config.inter_group_delay,
            config.min_candidates_warning,
        )),
    }
}
