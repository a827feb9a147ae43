use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 候选论文
///
/// 由候选来源解析得到，在一次运行内不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatePaper {
    /// 外部标识（已去掉版本后缀），运行内唯一
    pub id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    pub published: DateTime<Utc>,
    pub abs_url: String,
    pub pdf_url: String,
}

impl CandidatePaper {
    /// 论文自身的发布日期（UTC）
    pub fn published_date(&self) -> NaiveDate {
        self.published.date_naive()
    }
}

impl std::fmt::Display for CandidatePaper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let title_preview = if self.title.chars().count() > 80 {
            self.title.chars().take(80).collect::<String>() + "..."
        } else {
            self.title.clone()
        };
        write!(f, "[{}] {}", self.id, title_preview)
    }
}

/// 第一阶段判定结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub id: String,
    pub relevant: bool,
    pub reason: String,
}

/// 评分维度及其权重（百分比，合计恰为 100）
pub const SCORE_WEIGHTS_PERCENT: [(&str, u32); 4] = [
    ("relevance", 30),
    ("novelty", 30),
    ("impact", 25),
    ("clarity", 15),
];

/// 子分数取值范围
pub const MIN_SUB_SCORE: u8 = 1;
pub const MAX_SUB_SCORE: u8 = 10;

/// 综合分 = 0.30*relevance + 0.30*novelty + 0.25*impact + 0.15*clarity，四舍五入到一位小数
///
/// 全程整数运算，同一组子分数永远得到同一个结果。
pub fn overall_score(relevance: u8, novelty: u8, impact: u8, clarity: u8) -> f64 {
    let scores = [relevance, novelty, impact, clarity];
    let weighted: u32 = SCORE_WEIGHTS_PERCENT
        .iter()
        .zip(scores)
        .map(|((_, weight), score)| weight * u32::from(score))
        .sum();
    // weighted 单位为 0.01 分，换算为 0.1 分并四舍五入
    let tenths = (weighted + 5) / 10;
    f64::from(tenths) / 10.0
}

/// 第二阶段评估结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Evaluation {
    pub relevance: u8,
    pub novelty: u8,
    pub impact: u8,
    pub clarity: u8,
    pub overall_score: f64,
    pub reasoning: String,
    pub summary: String,
    pub tags: Vec<String>,
}

impl Evaluation {
    /// 由四个子分数构建评估，综合分在本地计算
    pub fn new(
        relevance: u8,
        novelty: u8,
        impact: u8,
        clarity: u8,
        reasoning: String,
        summary: String,
        tags: Vec<String>,
    ) -> Self {
        Self {
            relevance,
            novelty,
            impact,
            clarity,
            overall_score: overall_score(relevance, novelty, impact, clarity),
            reasoning,
            summary,
            tags,
        }
    }
}

/// 已评估论文：候选字段 + 评估
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuratedPaper {
    #[serde(flatten)]
    pub paper: CandidatePaper,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

impl CuratedPaper {
    pub fn id(&self) -> &str {
        &self.paper.id
    }

    pub fn score(&self) -> f64 {
        self.evaluation.overall_score
    }
}
