//! 三阶段流程 - 流程层
//!
//! 核心职责：定义"一个日期窗口"的完整处理流程
//!
//! 流程顺序：
//! 1. 发现：候选来源 → 去重 → `phase1_candidates.json`
//! 2. 评估：第一阶段过滤 → 第二阶段评分 → 选择 → `phase2_curated.json`
//! 3. 发布：存在性检查 → 逐条插入 → `phase3_published.json`
//!
//! 每个阶段只依赖上一阶段的产物，因此可以单独重跑。
//! 阶段失败时不写产物。

use chrono::Utc;
use tracing::info;

use crate::config::{Config, SourceKind};
use crate::error::CuratorResult;
use crate::infrastructure::ArtifactStore;
use crate::models::{CandidateArtifact, CurationArtifact, PublicationArtifact};
use crate::services::{
    merge_curated, select, survivors, CandidateSource, PublicationGateway, RelevanceFilter, Scorer,
};
use crate::utils::logging::{log_phase_complete, log_phase_start};
use crate::workflow::run_ctx::RunCtx;

/// 三阶段流程
///
/// - 持有各阶段需要的业务能力
/// - 决定阶段内的调用顺序与产物写入
/// - 不决定跑哪些阶段（由编排层决定）
pub struct CurationFlow {
    source: Box<dyn CandidateSource>,
    filter: RelevanceFilter,
    scorer: Scorer,
    gateway: PublicationGateway,
    artifacts: ArtifactStore,
    threshold: f64,
    top_n: usize,
}

impl CurationFlow {
    /// 创建新的流程
    pub fn new(
        source: Box<dyn CandidateSource>,
        filter: RelevanceFilter,
        scorer: Scorer,
        gateway: PublicationGateway,
        artifacts: ArtifactStore,
        config: &Config,
    ) -> Self {
        Self {
            source,
            filter,
            scorer,
            gateway,
            artifacts,
            threshold: config.score_threshold,
            top_n: config.top_n,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn source_labels(&self) -> Vec<String> {
        self.source.labels()
    }

    pub fn filter_model(&self) -> &str {
        self.filter.model_name()
    }

    pub fn scoring_model(&self) -> &str {
        self.scorer.model_name()
    }

    /// 第 1 阶段：发现候选
    pub async fn discover(&self, ctx: &RunCtx) -> CuratorResult<CandidateArtifact> {
        log_phase_start(1, "候选发现", &ctx.tag);

        let discovery = self.source.discover(&ctx.window).await?;

        let artifact = CandidateArtifact {
            tag: ctx.tag.clone(),
            window: ctx.window,
            source: self.source.kind().as_str().to_string(),
            query_summary: discovery.query_summary,
            papers: discovery.papers,
        };
        self.artifacts.write_candidates(&artifact).await?;

        log_phase_complete(1, &format!("{} 篇候选", artifact.papers.len()));
        Ok(artifact)
    }

    /// 第 2 阶段：过滤 + 评分 + 选择
    ///
    /// 第一阶段没有幸存者时同样写产物（空排名）
    pub async fn evaluate(
        &self,
        ctx: &RunCtx,
        candidates: &CandidateArtifact,
    ) -> CuratorResult<CurationArtifact> {
        log_phase_start(2, "两阶段评估", &ctx.tag);

        let verdicts = self.filter.filter(&candidates.papers).await?;
        let relevant = survivors(&candidates.papers, &verdicts);

        let curated = if relevant.is_empty() {
            info!("{} 没有论文通过第一阶段，跳过评分", ctx);
            Vec::new()
        } else {
            let evaluations = self.scorer.score(&relevant).await?;
            merge_curated(&relevant, evaluations)
        };

        let selection = select(curated, self.threshold, self.top_n);
        info!(
            "🏆 选择完成: {} 篇评分, {} 篇入选 (阈值 {}, 上限 {})",
            selection.ranking.len(),
            selection.selected.len(),
            self.threshold,
            self.top_n
        );

        let artifact = CurationArtifact {
            tag: ctx.tag.clone(),
            threshold: self.threshold,
            top_n: self.top_n,
            candidate_count: candidates.papers.len(),
            filtered_count: relevant.len(),
            selected_ids: selection.selected_ids(),
            ranking: selection.ranking,
        };
        self.artifacts.write_curation(&artifact).await?;

        log_phase_complete(
            2,
            &format!(
                "相关 {} 篇, 入选 {} 篇",
                artifact.filtered_count,
                artifact.selected_ids.len()
            ),
        );
        Ok(artifact)
    }

    /// 第 3 阶段：发布
    pub async fn publish(
        &mut self,
        ctx: &RunCtx,
        curation: &CurationArtifact,
        author_id: &str,
    ) -> CuratorResult<PublicationArtifact> {
        log_phase_start(3, "发布", &ctx.tag);

        let selected = curation.selected();
        let outcome = self.gateway.publish(&selected, author_id).await?;

        let artifact = PublicationArtifact {
            tag: ctx.tag.clone(),
            persona: ctx.persona.clone(),
            dry_run: self.gateway.is_dry_run(),
            outcome,
            published_at: Utc::now(),
        };
        self.artifacts.write_publication(&artifact).await?;

        log_phase_complete(
            3,
            &format!(
                "发布 {}, 跳过 {}, 失败 {}",
                outcome.posted, outcome.skipped, outcome.failed
            ),
        );
        Ok(artifact)
    }
}
