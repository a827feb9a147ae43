//! 选择策略
//!
//! 按综合分降序稳定排序 → 过滤阈值 → 截取前 N 篇

use crate::models::CuratedPaper;

/// 选择结果
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// 完整排名（与输入等长）
    pub ranking: Vec<CuratedPaper>,
    /// 入选论文（排名顺序）
    pub selected: Vec<CuratedPaper>,
}

impl Selection {
    pub fn selected_ids(&self) -> Vec<String> {
        self.selected.iter().map(|p| p.id().to_string()).collect()
    }
}

/// 选出综合分不低于 `threshold` 的前 `top_n` 篇；同分保持输入顺序
pub fn select(papers: Vec<CuratedPaper>, threshold: f64, top_n: usize) -> Selection {
    let mut ranking = papers;
    ranking.sort_by(|a, b| b.score().total_cmp(&a.score()));

    let selected = ranking
        .iter()
        .filter(|p| p.score() >= threshold)
        .take(top_n)
        .cloned()
        .collect();

    Selection { ranking, selected }
}
