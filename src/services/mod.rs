//! 业务能力层（Services）
//!
//! ## 职责
//!
//! 描述"我能做什么"，不关心流程顺序：
//! - 候选发现：`candidate_source`（trait）+ `query_source` / `feed_source`（两种策略）
//! - 条目解析与去重：`entry_parser`、`dedup`
//! - 两阶段评估：`relevance_filter`（第一阶段）、`scorer`（第二阶段），共用 `llm_json`
//! - 选择与发布：`selection`、`publication`

pub mod candidate_source;
pub mod dedup;
pub mod entry_parser;
pub mod feed_source;
pub mod llm_json;
pub mod publication;
pub mod query_source;
pub mod relevance_filter;
pub mod scorer;
pub mod selection;

pub use candidate_source::{build_source, finish_discovery, CandidateSource, Discovery};
pub use dedup::dedup_by_id;
pub use feed_source::FeedSource;
pub use publication::PublicationGateway;
pub use query_source::QuerySource;
pub use relevance_filter::{survivors, RelevanceFilter};
pub use scorer::{merge_curated, Scorer};
pub use selection::{select, Selection};
