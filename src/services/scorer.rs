//! 第二阶段：多维评分 - 业务能力层
//!
//! 只对第一阶段的幸存论文调用强模型，按四个维度打分（1-10），
//! 综合分在本地按固定权重计算，不信任模型给出的总分。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::clients::ChatModel;
use crate::error::CuratorResult;
use crate::models::paper::{MAX_SUB_SCORE, MIN_SUB_SCORE};
use crate::models::{CandidatePaper, CuratedPaper, Evaluation};
use crate::services::entry_parser::strip_version;
use crate::services::llm_json::ask_json_array;

const STAGE: &str = "stage2-score";

/// 每篇论文最多保留的标签数
pub const MAX_TAGS: usize = 5;

const SYSTEM_MESSAGE: &str = "You are an expert reviewer of AI-for-materials-science research. \
Score each paper on four dimensions using integers from 1 to 10: relevance (fit to AI x materials \
science), novelty (originality of method or finding), impact (expected influence on the field), \
clarity (quality of the abstract's communication). Be demanding: 9-10 is reserved for exceptional \
work. Respond with JSON only.";

#[derive(Debug, Deserialize)]
struct RawScore {
    id: String,
    relevance: f64,
    novelty: f64,
    impact: f64,
    clarity: f64,
    #[serde(default)]
    reasoning: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// 评分器
pub struct Scorer {
    model: Arc<dyn ChatModel>,
}

impl Scorer {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// 批量评分
    ///
    /// # 返回
    /// 标识 → 评估；模型遗漏的论文不出现在结果中，模型编造的标识被忽略
    pub async fn score(
        &self,
        papers: &[CandidatePaper],
    ) -> CuratorResult<HashMap<String, Evaluation>> {
        if papers.is_empty() {
            debug!("没有需要评分的论文，跳过第二阶段调用");
            return Ok(HashMap::new());
        }

        info!(
            "📊 第二阶段评分: {} 篇, 模型: {}",
            papers.len(),
            self.model.model_name()
        );

        let user_message = build_user_message(papers);
        let raw: Vec<RawScore> =
            ask_json_array(self.model.as_ref(), STAGE, SYSTEM_MESSAGE, &user_message).await?;

        let wanted: HashSet<&str> = papers.iter().map(|p| p.id.as_str()).collect();
        let mut evaluations = HashMap::with_capacity(papers.len());

        for item in raw {
            let id = strip_version(&item.id);
            if !wanted.contains(id.as_str()) {
                debug!("忽略模型返回的未知标识: {}", id);
                continue;
            }
            if evaluations.contains_key(&id) {
                continue;
            }

            let evaluation = Evaluation::new(
                clamp_score(&id, "relevance", item.relevance),
                clamp_score(&id, "novelty", item.novelty),
                clamp_score(&id, "impact", item.impact),
                clamp_score(&id, "clarity", item.clarity),
                item.reasoning.trim().to_string(),
                item.summary.trim().to_string(),
                normalize_tags(&item.tags),
            );
            debug!("  [{}] 综合分 {:.1}", id, evaluation.overall_score);
            evaluations.insert(id, evaluation);
        }

        for paper in papers {
            if !evaluations.contains_key(&paper.id) {
                debug!("[{}] 模型未返回评分，丢弃", paper.id);
            }
        }

        info!("✓ 第二阶段完成: {}/{} 篇获得评分", evaluations.len(), papers.len());
        Ok(evaluations)
    }
}

/// 合并候选论文与评估结果，保持候选顺序，没有评估的论文被丢弃
pub fn merge_curated(
    papers: &[CandidatePaper],
    mut evaluations: HashMap<String, Evaluation>,
) -> Vec<CuratedPaper> {
    papers
        .iter()
        .filter_map(|paper| {
            evaluations
                .remove(&paper.id)
                .map(|evaluation| CuratedPaper {
                    paper: paper.clone(),
                    evaluation,
                })
        })
        .collect()
}

/// 四舍五入并夹到 [1, 10]
fn clamp_score(id: &str, dimension: &str, value: f64) -> u8 {
    let min = f64::from(MIN_SUB_SCORE);
    let max = f64::from(MAX_SUB_SCORE);
    let rounded = if value.is_finite() { value.round() } else { min };
    if rounded < min || rounded > max {
        warn!(
            "[{}] {} 分数 {} 超出范围 [{}, {}]，已截断",
            id, dimension, value, MIN_SUB_SCORE, MAX_SUB_SCORE
        );
    }
    rounded.clamp(min, max) as u8
}

/// 标签归一化：去空白、小写、内部空白换成 `-`、去重，最多 5 个
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.iter()
        .map(|tag| {
            tag.split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
                .to_lowercase()
        })
        .filter(|tag| !tag.is_empty())
        .filter(|tag| seen.insert(tag.clone()))
        .take(MAX_TAGS)
        .collect()
}

fn build_user_message(papers: &[CandidatePaper]) -> String {
    let items: Vec<_> = papers
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "title": p.title,
                "authors": p.authors,
                "abstract": p.abstract_text,
            })
        })
        .collect();
    let items_json = serde_json::to_string_pretty(&items).unwrap_or_default();

    format!(
        r#"Score each paper below.

Papers:
{}

Return a JSON array with one object per paper:
[{{"id": "<paper id>", "relevance": 1-10, "novelty": 1-10, "impact": 1-10, "clarity": 1-10,
  "reasoning": "<2-3 sentences on the scores>", "summary": "<2-3 sentence plain-language summary>",
  "tags": ["<up to 5 short topic tags>"]}}]"#,
        items_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    struct FixedModel(String);

    #[async_trait]
    impl ChatModel for FixedModel {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _system: &str, _user: &str) -> CuratorResult<String> {
            Ok(self.0.clone())
        }
    }

    fn paper(id: &str) -> CandidatePaper {
        CandidatePaper {
            id: id.to_string(),
            title: format!("title {}", id),
            abstract_text: "abstract".to_string(),
            authors: vec!["A. Author".to_string()],
            categories: vec![],
            published: Utc::now(),
            abs_url: String::new(),
            pdf_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_score_computes_overall_locally() {
        let reply = r#"[
  {"id": "a", "relevance": 9, "novelty": 9, "impact": 9, "clarity": 9, "overall_score": 2.0,
   "reasoning": "strong", "summary": "s", "tags": ["ML Potentials", "ml potentials", "  DFT "]},
  {"id": "ghost", "relevance": 10, "novelty": 10, "impact": 10, "clarity": 10}
]"#;
        let scorer = Scorer::new(Arc::new(FixedModel(reply.to_string())));
        let papers = vec![paper("a"), paper("b")];

        let evaluations = scorer.score(&papers).await.unwrap();
        assert_eq!(evaluations.len(), 1);
        let a = &evaluations["a"];
        assert_eq!(a.overall_score, 9.0);
        assert_eq!(a.tags, vec!["ml-potentials", "dft"]);
        assert!(!evaluations.contains_key("b"));
        assert!(!evaluations.contains_key("ghost"));

        let curated = merge_curated(&papers, evaluations);
        assert_eq!(curated.len(), 1);
        assert_eq!(curated[0].id(), "a");
    }

    #[tokio::test]
    async fn test_versioned_ids_are_kept() {
        let reply = r#"[{"id": "2602.00001v2", "relevance": 8, "novelty": 8, "impact": 8, "clarity": 8}]"#;
        let scorer = Scorer::new(Arc::new(FixedModel(reply.to_string())));

        let evaluations = scorer.score(&[paper("2602.00001")]).await.unwrap();
        assert_eq!(evaluations.len(), 1);
        assert_eq!(evaluations["2602.00001"].overall_score, 8.0);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score("x", "novelty", 11.0), 10);
        assert_eq!(clamp_score("x", "novelty", 0.0), 1);
        assert_eq!(clamp_score("x", "novelty", 7.6), 8);
        assert_eq!(clamp_score("x", "novelty", f64::NAN), 1);
    }

    #[test]
    fn test_normalize_tags_limit() {
        let tags: Vec<String> = (0..8).map(|i| format!("Tag {}", i)).collect();
        let normalized = normalize_tags(&tags);
        assert_eq!(normalized.len(), MAX_TAGS);
        assert_eq!(normalized[0], "tag-0");
    }
}
