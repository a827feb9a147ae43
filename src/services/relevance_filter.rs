//! 第一阶段：相关性过滤 - 业务能力层
//!
//! 只负责"这篇论文是否属于材料科学 × 人工智能的交叉领域"这一判断，
//! 所有候选一次性批量提交给便宜模型。

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::clients::ChatModel;
use crate::error::CuratorResult;
use crate::models::{CandidatePaper, FilterVerdict};
use crate::services::entry_parser::strip_version;
use crate::services::llm_json::ask_json_array;

const STAGE: &str = "stage1-filter";

/// 模型未返回判定时写入的理由
pub const NOT_JUDGED_REASON: &str = "模型未返回该论文的判定，按不相关处理";

const SYSTEM_MESSAGE: &str = "You are a strict research curator for a community at the intersection of \
materials science and artificial intelligence. A paper is relevant ONLY if it applies AI / machine learning \
methods to a materials-science problem, or builds AI methods specifically for materials (crystals, alloys, \
polymers, catalysts, batteries, interatomic potentials, materials discovery). Strictly exclude pure biology, \
drug discovery, pure physics without an AI component, and general machine learning with no materials \
application. Respond with JSON only.";

#[derive(Debug, Deserialize)]
struct RawVerdict {
    id: String,
    relevant: bool,
    #[serde(default)]
    reason: String,
}

/// 相关性过滤器
pub struct RelevanceFilter {
    model: Arc<dyn ChatModel>,
}

impl RelevanceFilter {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    /// 批量判定
    ///
    /// # 返回
    /// 与输入等长、同序的判定列表；模型遗漏的论文判为不相关
    pub async fn filter(&self, papers: &[CandidatePaper]) -> CuratorResult<Vec<FilterVerdict>> {
        if papers.is_empty() {
            debug!("没有候选论文，跳过第一阶段调用");
            return Ok(Vec::new());
        }

        info!(
            "🔍 第一阶段过滤: {} 篇候选, 模型: {}",
            papers.len(),
            self.model.model_name()
        );

        let user_message = build_user_message(papers);
        let raw: Vec<RawVerdict> =
            ask_json_array(self.model.as_ref(), STAGE, SYSTEM_MESSAGE, &user_message).await?;

        let verdicts = align_verdicts(papers, raw);
        let relevant = verdicts.iter().filter(|v| v.relevant).count();
        info!("✓ 第一阶段完成: {}/{} 篇相关", relevant, verdicts.len());

        for verdict in &verdicts {
            debug!(
                "  [{}] {} - {}",
                verdict.id,
                if verdict.relevant { "相关" } else { "排除" },
                verdict.reason
            );
        }

        Ok(verdicts)
    }
}

/// 取出判定为相关的论文，保持输入顺序
pub fn survivors(papers: &[CandidatePaper], verdicts: &[FilterVerdict]) -> Vec<CandidatePaper> {
    papers
        .iter()
        .zip(verdicts)
        .filter(|(_, verdict)| verdict.relevant)
        .map(|(paper, _)| paper.clone())
        .collect()
}

fn build_user_message(papers: &[CandidatePaper]) -> String {
    let items: Vec<_> = papers
        .iter()
        .map(|p| {
            json!({
                "id": p.id,
                "title": p.title,
                "abstract": p.abstract_text,
            })
        })
        .collect();
    let items_json = serde_json::to_string_pretty(&items).unwrap_or_default();

    format!(
        r#"Decide for EACH paper below whether it is relevant.

Papers:
{}

Return a JSON array with exactly one object per paper, in any order:
[{{"id": "<paper id>", "relevant": true | false, "reason": "<one short sentence>"}}]"#,
        items_json
    )
}

/// 按输入顺序对齐模型判定：每个输入恰好一条，重复的以第一条为准，多余的忽略
///
/// 模型回显的标识可能带版本后缀，匹配前去掉
fn align_verdicts(papers: &[CandidatePaper], raw: Vec<RawVerdict>) -> Vec<FilterVerdict> {
    let mut by_id: HashMap<String, RawVerdict> = HashMap::with_capacity(raw.len());
    for verdict in raw {
        by_id.entry(strip_version(&verdict.id)).or_insert(verdict);
    }

    papers
        .iter()
        .map(|paper| match by_id.remove(&paper.id) {
            Some(raw) => FilterVerdict {
                id: paper.id.clone(),
                relevant: raw.relevant,
                reason: raw.reason,
            },
            None => {
                debug!("[{}] 模型未返回判定", paper.id);
                FilterVerdict {
                    id: paper.id.clone(),
                    relevant: false,
                    reason: NOT_JUDGED_REASON.to_string(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FixedModel {
        reply: String,
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _system: &str, user: &str) -> CuratorResult<String> {
            assert!(user.contains("Papers:"));
            *self.calls.lock().unwrap() += 1;
            Ok(self.reply.clone())
        }
    }

    fn model(reply: &str) -> Arc<FixedModel> {
        Arc::new(FixedModel {
            reply: reply.to_string(),
            calls: Mutex::new(0),
        })
    }

    fn paper(id: &str) -> CandidatePaper {
        CandidatePaper {
            id: id.to_string(),
            title: format!("title {}", id),
            abstract_text: "abstract".to_string(),
            authors: vec![],
            categories: vec![],
            published: Utc::now(),
            abs_url: String::new(),
            pdf_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_one_verdict_per_input_in_order() {
        let reply = r#"```json
[
  {"id": "c", "relevant": true, "reason": "ml potentials"},
  {"id": "zzz", "relevant": true, "reason": "invented"},
  {"id": "a", "relevant": false, "reason": "pure biology"}
]
```"#;
        let model = model(reply);
        let filter = RelevanceFilter::new(model.clone());
        let papers = vec![paper("a"), paper("b"), paper("c")];

        let verdicts = filter.filter(&papers).await.unwrap();
        let ids: Vec<&str> = verdicts.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(!verdicts[0].relevant);
        assert!(!verdicts[1].relevant);
        assert_eq!(verdicts[1].reason, NOT_JUDGED_REASON);
        assert!(verdicts[2].relevant);

        let kept = survivors(&papers, &verdicts);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id, "c");
        assert_eq!(*model.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_call() {
        let model = model("[]");
        let filter = RelevanceFilter::new(model.clone());
        let verdicts = filter.filter(&[]).await.unwrap();
        assert!(verdicts.is_empty());
        assert_eq!(*model.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_versioned_ids_match_candidates() {
        let reply = r#"[{"id": " 2602.00001v1", "relevant": true, "reason": "alloy ML"}]"#;
        let filter = RelevanceFilter::new(model(reply));
        let papers = vec![paper("2602.00001")];

        let verdicts = filter.filter(&papers).await.unwrap();
        assert_eq!(verdicts[0].id, "2602.00001");
        assert!(verdicts[0].relevant);
        assert_eq!(verdicts[0].reason, "alloy ML");
    }
}
