use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::paper::{CandidatePaper, CuratedPaper};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// 日期窗口（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn single(day: NaiveDate) -> Self {
        Self::new(day, day)
    }

    /// 起始日期晚于结束日期：没有可处理的日期
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// 窗口包含的天数（空窗口为 0）
    pub fn days(&self) -> i64 {
        if self.is_empty() {
            0
        } else {
            (self.end - self.start).num_days() + 1
        }
    }

    /// 日期区间标签：`YYYY-MM-DD` 或 `YYYY-MM-DD_YYYY-MM-DD`
    pub fn tag(&self) -> String {
        if self.start == self.end {
            self.start.format(DATE_FORMAT).to_string()
        } else {
            format!(
                "{}_{}",
                self.start.format(DATE_FORMAT),
                self.end.format(DATE_FORMAT)
            )
        }
    }

    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.split_once('_') {
            Some((start, end)) => Some(Self::new(
                NaiveDate::parse_from_str(start, DATE_FORMAT).ok()?,
                NaiveDate::parse_from_str(end, DATE_FORMAT).ok()?,
            )),
            None => NaiveDate::parse_from_str(tag, DATE_FORMAT)
                .ok()
                .map(Self::single),
        }
    }

    /// 窗口内的每一天
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.days()).map(move |offset| self.start + Duration::days(offset))
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ~ {}", self.start, self.end)
    }
}

/// 第一阶段产物：候选论文列表
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateArtifact {
    pub tag: String,
    pub window: DateWindow,
    pub source: String,
    pub query_summary: BTreeMap<String, usize>,
    pub papers: Vec<CandidatePaper>,
}

/// 第二阶段产物：完整排名（不只是入选部分）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationArtifact {
    pub tag: String,
    pub threshold: f64,
    pub top_n: usize,
    pub candidate_count: usize,
    pub filtered_count: usize,
    pub ranking: Vec<CuratedPaper>,
    pub selected_ids: Vec<String>,
}

impl CurationArtifact {
    /// 按排名顺序取出入选论文
    pub fn selected(&self) -> Vec<CuratedPaper> {
        self.ranking
            .iter()
            .filter(|p| self.selected_ids.iter().any(|id| id == p.id()))
            .cloned()
            .collect()
    }
}

/// 发布结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub posted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 第三阶段产物：发布结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationArtifact {
    pub tag: String,
    pub persona: String,
    pub dry_run: bool,
    pub outcome: PublishOutcome,
    pub published_at: DateTime<Utc>,
}

/// 流水线状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Discovery,
    Evaluation,
    Publication,
    Done,
}

/// 运行结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// 窗口为空，所有可用日期均已处理
    NothingToDo,
    /// 候选为空（低活跃日）
    NoCandidates,
    /// 第一阶段没有论文通过
    NoneRelevant,
    /// 缺少发布身份，跳过发布
    PublishSkipped,
    /// 完成发布
    Published,
}

/// 运行元数据
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunMetadata {
    pub source: String,
    pub query_labels: Vec<String>,
    pub filter_model: String,
    pub scoring_model: String,
    pub persona: String,
    pub started_at: DateTime<Utc>,
    pub duration_secs: f64,
}

/// 运行汇总：整次流水线结束时写一次
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub window: DateWindow,
    pub tag: String,
    pub state: RunState,
    pub outcome: RunOutcome,
    pub candidate_count: usize,
    pub filtered_count: usize,
    pub selected_count: usize,
    pub selected: Vec<CuratedPaper>,
    pub publish: Option<PublishOutcome>,
    pub metadata: RunMetadata,
}
