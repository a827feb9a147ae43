//! 去重 - 业务能力层
//!
//! 按外部标识做精确去重：先出现者保留，顺序不变

use std::collections::HashSet;

use crate::models::CandidatePaper;

/// 按标识去重，返回 (去重后的列表, 移除数量)
pub fn dedup_by_id(papers: Vec<CandidatePaper>) -> (Vec<CandidatePaper>, usize) {
    let total = papers.len();
    let mut seen = HashSet::with_capacity(total);
    let unique: Vec<CandidatePaper> = papers
        .into_iter()
        .filter(|paper| seen.insert(paper.id.clone()))
        .collect();
    let removed = total - unique.len();
    (unique, removed)
}
