//! 发布网关 - 业务能力层
//!
//! ## 职责
//!
//! 把入选论文幂等地写入内容平台：
//! 1. 首次发布时确保策展标签存在（实例状态，`reset()` 清除）
//! 2. 一次批量查询已存在的标识，已存在的跳过
//! 3. 其余逐条插入；单条失败只记录、计数，不中断后续条目

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::clients::{PaperStore, PublishRecord};
use crate::error::CuratorResult;
use crate::models::{CuratedPaper, PublishOutcome};
use crate::utils::logging::truncate_text;

pub struct PublicationGateway {
    store: Arc<dyn PaperStore>,
    label: String,
    dry_run: bool,
    label_ensured: bool,
}

impl PublicationGateway {
    pub fn new(store: Arc<dyn PaperStore>, label: impl Into<String>, dry_run: bool) -> Self {
        Self {
            store,
            label: label.into(),
            dry_run,
            label_ensured: false,
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn label_ensured(&self) -> bool {
        self.label_ensured
    }

    /// 清除"标签已确保"状态，下次发布会重新确保
    pub fn reset(&mut self) {
        self.label_ensured = false;
    }

    /// 发布入选论文
    ///
    /// # 参数
    /// - `selected`: 入选论文（排名顺序）
    /// - `author_id`: 发布身份
    ///
    /// # 返回
    /// 发布 / 跳过 / 失败计数。演练模式下 `posted` 为将会插入的条数
    pub async fn publish(
        &mut self,
        selected: &[CuratedPaper],
        author_id: &str,
    ) -> CuratorResult<PublishOutcome> {
        let mut outcome = PublishOutcome::default();
        if selected.is_empty() {
            info!("没有入选论文，跳过发布");
            return Ok(outcome);
        }

        if !self.label_ensured && !self.dry_run {
            self.store.ensure_label(&self.label).await?;
            self.label_ensured = true;
            info!("✓ 标签已确保: {}", self.label);
        }

        let ids: Vec<String> = selected.iter().map(|p| p.id().to_string()).collect();
        let existing = self.store.existing_ids(&ids).await?;

        for paper in selected {
            if existing.contains(paper.id()) {
                info!("⏭️  已发布过，跳过: {}", paper.paper);
                outcome.skipped += 1;
                continue;
            }

            let record = build_record(paper, author_id, &self.label);

            if self.dry_run {
                info!(
                    "📝 [演练] 将发布: {} ({} 字符)",
                    record.title,
                    record.content.chars().count()
                );
                outcome.posted += 1;
                continue;
            }

            match self.store.insert(&record).await {
                Ok(()) => {
                    info!("✅ 已发布: {}", truncate_text(&record.title, 80));
                    outcome.posted += 1;
                }
                Err(e) => {
                    error!("❌ 发布失败 [{}]: {}", paper.id(), e);
                    outcome.failed += 1;
                }
            }
        }

        if outcome.failed > 0 {
            warn!(
                "⚠️ 部分发布失败: 成功 {}, 跳过 {}, 失败 {}",
                outcome.posted, outcome.skipped, outcome.failed
            );
        }

        Ok(outcome)
    }
}

/// 发布标题：`[YYYY-MM-DD] <title>`，日期取论文自身的发布日期
pub fn format_title(paper: &CuratedPaper) -> String {
    format!(
        "[{}] {}",
        paper.paper.published_date().format("%Y-%m-%d"),
        paper.paper.title
    )
}

/// 发布正文：摘要 + 评审理由 + 分数 + 作者 + 原文摘要 + 链接
pub fn build_content(paper: &CuratedPaper) -> String {
    let evaluation = &paper.evaluation;
    let mut sections = Vec::new();

    if !evaluation.summary.is_empty() {
        sections.push(format!("**Summary**\n\n{}", evaluation.summary));
    }
    if !evaluation.reasoning.is_empty() {
        sections.push(format!("**Why it was selected**\n\n{}", evaluation.reasoning));
    }
    sections.push(format!(
        "**Score** {:.1}/10 (relevance {}, novelty {}, impact {}, clarity {})",
        evaluation.overall_score,
        evaluation.relevance,
        evaluation.novelty,
        evaluation.impact,
        evaluation.clarity
    ));
    if !paper.paper.authors.is_empty() {
        sections.push(format!("**Authors** {}", paper.paper.authors.join(", ")));
    }
    if !paper.paper.abstract_text.is_empty() {
        sections.push(format!("**Abstract**\n\n{}", paper.paper.abstract_text));
    }
    sections.push(format!(
        "[Abstract page]({}) · [PDF]({})",
        paper.paper.abs_url, paper.paper.pdf_url
    ));

    sections.join("\n\n")
}

/// 反规范化的发布记录
pub fn build_record(paper: &CuratedPaper, author_id: &str, label: &str) -> PublishRecord {
    PublishRecord {
        external_id: paper.id().to_string(),
        title: format_title(paper),
        content: build_content(paper),
        author_id: author_id.to_string(),
        label: label.to_string(),
        tags: paper.evaluation.tags.clone(),
        source_url: paper.paper.abs_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MemoryPaperStore;
    use crate::models::{CandidatePaper, Evaluation};
    use chrono::{TimeZone, Utc};

    fn curated(id: &str) -> CuratedPaper {
        CuratedPaper {
            paper: CandidatePaper {
                id: id.to_string(),
                title: format!("Paper {}", id),
                abstract_text: "An abstract.".to_string(),
                authors: vec!["Ada Lovelace".to_string(), "Alan Turing".to_string()],
                categories: vec![],
                published: Utc.with_ymd_and_hms(2026, 2, 17, 23, 0, 0).unwrap(),
                abs_url: format!("https://arxiv.org/abs/{}", id),
                pdf_url: format!("https://arxiv.org/pdf/{}", id),
            },
            evaluation: Evaluation::new(
                9,
                9,
                9,
                9,
                "Strong method.".to_string(),
                "It predicts alloys.".to_string(),
                vec!["alloys".to_string()],
            ),
        }
    }

    #[test]
    fn test_record_format() {
        let record = build_record(&curated("2602.00001"), "user-1", "ai-curated");
        assert_eq!(record.title, "[2026-02-17] Paper 2602.00001");
        assert!(record.content.contains("It predicts alloys."));
        assert!(record.content.contains("Strong method."));
        assert!(record.content.contains("9.0/10"));
        assert!(record.content.contains("Ada Lovelace, Alan Turing"));
        assert!(record.content.contains("https://arxiv.org/pdf/2602.00001"));
        assert_eq!(record.tags, vec!["alloys"]);
    }

    #[tokio::test]
    async fn test_publish_is_idempotent() {
        let store = Arc::new(MemoryPaperStore::new());
        let mut gateway = PublicationGateway::new(store.clone(), "ai-curated", false);
        let selected = vec![curated("a"), curated("b")];

        let first = gateway.publish(&selected, "user-1").await.unwrap();
        assert_eq!(first, PublishOutcome { posted: 2, skipped: 0, failed: 0 });

        let second = gateway.publish(&selected, "user-1").await.unwrap();
        assert_eq!(second, PublishOutcome { posted: 0, skipped: 2, failed: 0 });
        assert_eq!(store.records().len(), 2);
    }

    #[tokio::test]
    async fn test_label_ensured_once_until_reset() {
        let store = Arc::new(MemoryPaperStore::new());
        let mut gateway = PublicationGateway::new(store.clone(), "ai-curated", false);

        gateway.publish(&[curated("a")], "u").await.unwrap();
        gateway.publish(&[curated("b")], "u").await.unwrap();
        assert_eq!(store.label_calls(), 1);
        assert!(store.has_label("ai-curated"));

        gateway.reset();
        assert!(!gateway.label_ensured());
        gateway.publish(&[curated("c")], "u").await.unwrap();
        assert_eq!(store.label_calls(), 2);
    }

    #[tokio::test]
    async fn test_item_failure_is_isolated() {
        let store = Arc::new(MemoryPaperStore::new());
        store.fail_inserts_for("b");
        let mut gateway = PublicationGateway::new(store.clone(), "ai-curated", false);

        let outcome = gateway
            .publish(&[curated("a"), curated("b"), curated("c")], "u")
            .await
            .unwrap();
        assert_eq!(outcome, PublishOutcome { posted: 2, skipped: 0, failed: 1 });
        let ids: Vec<String> = store.records().into_iter().map(|r| r.external_id).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = Arc::new(MemoryPaperStore::new());
        let mut gateway = PublicationGateway::new(store.clone(), "ai-curated", true);

        let outcome = gateway.publish(&[curated("a")], "u").await.unwrap();
        assert_eq!(outcome.posted, 1);
        assert!(store.records().is_empty());
        assert_eq!(store.label_calls(), 0);
    }
}
