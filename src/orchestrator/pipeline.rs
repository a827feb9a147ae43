//! 流水线编排器
//!
//! 状态机：`Idle → Discovery → Evaluation → Publication → Done`
//!
//! - 空窗口（所有可用日期都已处理）直接进入 `Done`，不发任何请求
//! - 没有候选 / 没有论文通过第一阶段时提前进入 `Done`
//! - 缺少发布身份时跳过发布并告警；无人值守模式下直接失败
//! - 完整运行结束时写一次运行汇总

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use crate::clients::{OpenAiChatModel, PaperStore, RestPaperStore};
use crate::config::Config;
use crate::error::{ConfigError, CuratorError, CuratorResult};
use crate::infrastructure::{ArtifactStore, HttpTransport, ReqwestTransport};
use crate::models::sources::persona_env_var;
use crate::models::{
    CuratedPaper, PublishOutcome, RunMetadata, RunOutcome, RunState, RunSummary, SourceSettings,
};
use crate::orchestrator::continuation::resolve_window;
use crate::services::{build_source, PublicationGateway, RelevanceFilter, Scorer};
use crate::workflow::{CurationFlow, RunCtx};

/// 要运行的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSelection {
    Discovery,
    Evaluation,
    Publication,
    Full,
}

/// 单阶段运行可选的阶段
#[derive(Debug, Clone, Copy)]
enum SinglePhase {
    Discovery,
    Evaluation,
    Publication,
}

/// 一次运行请求
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub phase: PhaseSelection,
    pub date: Option<NaiveDate>,
    pub persona: String,
}

/// 运行过程中累积的统计
#[derive(Debug, Default)]
struct Progress {
    candidate_count: usize,
    filtered_count: usize,
    selected: Vec<CuratedPaper>,
    publish: Option<PublishOutcome>,
}

pub struct PipelineOrchestrator {
    flow: CurationFlow,
    store: Arc<dyn PaperStore>,
    settings: SourceSettings,
    lookback: usize,
    unattended: bool,
    dry_run: bool,
    state: RunState,
}

impl PipelineOrchestrator {
    pub fn new(
        flow: CurationFlow,
        store: Arc<dyn PaperStore>,
        settings: SourceSettings,
        config: &Config,
        dry_run: bool,
    ) -> Self {
        Self {
            flow,
            store,
            settings,
            lookback: config.continuation_lookback,
            unattended: config.unattended,
            dry_run,
            state: RunState::Idle,
        }
    }

    /// 用真实的网络客户端组装编排器
    pub fn from_config(config: &Config, settings: SourceSettings, dry_run: bool) -> Self {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new());
        let store: Arc<dyn PaperStore> = Arc::new(RestPaperStore::new(config));

        let flow = CurationFlow::new(
            build_source(config, &settings, transport),
            RelevanceFilter::new(Arc::new(OpenAiChatModel::filter_model(config))),
            Scorer::new(Arc::new(OpenAiChatModel::scoring_model(config))),
            PublicationGateway::new(store.clone(), config.publish_label.clone(), dry_run),
            ArtifactStore::new(&config.data_dir),
            config,
        );

        Self::new(flow, store, settings, config, dry_run)
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        info!("🔄 状态: {:?} → {:?}", self.state, next);
        self.state = next;
    }

    /// 运行请求；完整运行返回运行汇总，单阶段运行返回 `None`
    ///
    /// # 参数
    /// - `today`: 当前日期（UTC），窗口终点为前一天
    pub async fn run(
        &mut self,
        request: &RunRequest,
        today: NaiveDate,
    ) -> CuratorResult<Option<RunSummary>> {
        self.state = RunState::Idle;
        let phase = match request.phase {
            PhaseSelection::Full => return self.run_full(request, today).await.map(Some),
            PhaseSelection::Discovery => SinglePhase::Discovery,
            PhaseSelection::Evaluation => SinglePhase::Evaluation,
            PhaseSelection::Publication => SinglePhase::Publication,
        };
        self.run_single(phase, request, today).await?;
        Ok(None)
    }

    async fn run_full(&mut self, request: &RunRequest, today: NaiveDate) -> CuratorResult<RunSummary> {
        let started = Instant::now();
        let started_at = Utc::now();

        let identity = self.lookup_identity(&request.persona)?;
        let ctx = self.context(request, identity.as_deref(), today).await?;
        let mut progress = Progress::default();

        if ctx.window.is_empty() {
            info!("✓ 所有可用日期均已处理 ({}), 无需运行", ctx.window);
            return self
                .finish(&ctx, RunOutcome::NothingToDo, progress, started, started_at)
                .await;
        }

        self.transition(RunState::Discovery);
        let candidates = self.flow.discover(&ctx).await?;
        progress.candidate_count = candidates.papers.len();
        if candidates.papers.is_empty() {
            info!("{} 没有候选论文，可能是低活跃日", ctx);
            return self
                .finish(&ctx, RunOutcome::NoCandidates, progress, started, started_at)
                .await;
        }

        self.transition(RunState::Evaluation);
        let curation = self.flow.evaluate(&ctx, &candidates).await?;
        progress.filtered_count = curation.filtered_count;
        progress.selected = curation.selected();
        if curation.filtered_count == 0 {
            return self
                .finish(&ctx, RunOutcome::NoneRelevant, progress, started, started_at)
                .await;
        }

        let Some(author_id) = self.require_identity(&request.persona, identity)? else {
            return self
                .finish(&ctx, RunOutcome::PublishSkipped, progress, started, started_at)
                .await;
        };

        self.transition(RunState::Publication);
        let publication = self.flow.publish(&ctx, &curation, &author_id).await?;
        progress.publish = Some(publication.outcome);

        self.finish(&ctx, RunOutcome::Published, progress, started, started_at)
            .await
    }

    /// 单阶段运行：读取上一阶段的产物
    async fn run_single(
        &mut self,
        phase: SinglePhase,
        request: &RunRequest,
        today: NaiveDate,
    ) -> CuratorResult<()> {
        let identity = self.lookup_identity(&request.persona)?;
        let ctx = self.context(request, identity.as_deref(), today).await?;

        if ctx.window.is_empty() {
            info!("✓ 所有可用日期均已处理 ({}), 无需运行", ctx.window);
            self.transition(RunState::Done);
            return Ok(());
        }

        match phase {
            SinglePhase::Discovery => {
                self.transition(RunState::Discovery);
                self.flow.discover(&ctx).await?;
            }
            SinglePhase::Evaluation => {
                self.transition(RunState::Evaluation);
                let candidates = self.flow.artifacts().read_candidates(&ctx.tag).await?;
                self.flow.evaluate(&ctx, &candidates).await?;
            }
            SinglePhase::Publication => {
                let curation = self.flow.artifacts().read_curation(&ctx.tag).await?;
                if let Some(author_id) = self.require_identity(&request.persona, identity)? {
                    self.transition(RunState::Publication);
                    self.flow.publish(&ctx, &curation, &author_id).await?;
                }
            }
        }

        self.transition(RunState::Done);
        Ok(())
    }

    async fn context(
        &self,
        request: &RunRequest,
        author_id: Option<&str>,
        today: NaiveDate,
    ) -> CuratorResult<RunCtx> {
        let window = resolve_window(
            request.date,
            self.store.as_ref(),
            author_id,
            self.lookback,
            today,
        )
        .await?;
        let ctx = RunCtx::new(window, request.persona.clone(), self.dry_run);
        info!("{} 开始处理", ctx);
        Ok(ctx)
    }

    /// 查找发布身份；缺失时返回 `None`，未定义的角色直接报错
    fn lookup_identity(&self, persona: &str) -> CuratorResult<Option<String>> {
        match self.settings.resolve_identity(persona) {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_missing_identity() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// 进入发布阶段前检查身份：缺失时告警跳过，无人值守模式下失败
    fn require_identity(
        &self,
        persona: &str,
        identity: Option<String>,
    ) -> CuratorResult<Option<String>> {
        if identity.is_some() {
            return Ok(identity);
        }

        let env_var = persona_env_var(persona);
        if self.unattended {
            return Err(CuratorError::Config(ConfigError::MissingIdentity {
                persona: persona.to_string(),
                env_var,
            }));
        }

        warn!(
            "⚠️ 角色 {} 没有配置发布身份 (设置 {} )，跳过发布",
            persona, env_var
        );
        Ok(None)
    }

    async fn finish(
        &mut self,
        ctx: &RunCtx,
        outcome: RunOutcome,
        progress: Progress,
        started: Instant,
        started_at: chrono::DateTime<Utc>,
    ) -> CuratorResult<RunSummary> {
        self.transition(RunState::Done);

        let summary = RunSummary {
            window: ctx.window,
            tag: ctx.tag.clone(),
            state: self.state,
            outcome,
            candidate_count: progress.candidate_count,
            filtered_count: progress.filtered_count,
            selected_count: progress.selected.len(),
            selected: progress.selected,
            publish: progress.publish,
            metadata: RunMetadata {
                source: self.flow.source_kind().as_str().to_string(),
                query_labels: self.flow.source_labels(),
                filter_model: self.flow.filter_model().to_string(),
                scoring_model: self.flow.scoring_model().to_string(),
                persona: ctx.persona.clone(),
                started_at,
                duration_secs: started.elapsed().as_secs_f64(),
            },
        };

        self.flow.artifacts().write_summary(&summary).await?;
        Ok(summary)
    }
}
