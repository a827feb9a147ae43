//! # Paper Curator
//!
//! 一个无人值守的论文策展流水线：发现候选论文 → 两阶段 LLM 评估 → 选择 → 幂等发布
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 只暴露能力，不认识流程
//! - `RateLimitedFetcher` - 所有对外 GET 请求的出口（有限重试 + 线性退避）
//! - `ArtifactStore` - 按日期区间标签持久化阶段产物
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 外部服务的接缝（trait）及其实现
//! - `ChatModel` / `OpenAiChatModel` - LLM 对话调用
//! - `PaperStore` / `RestPaperStore` / `MemoryPaperStore` - 已发布条目存储
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `CandidateSource` - 检索 API / 订阅源两种发现策略
//! - `RelevanceFilter` - 第一阶段相关性过滤
//! - `Scorer` - 第二阶段多维评分
//! - `select` - 阈值 + 前 N 选择
//! - `PublicationGateway` - 幂等发布
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个日期窗口"的三阶段流程
//! - `RunCtx` - 上下文封装（窗口 + 标签 + 角色）
//! - `CurationFlow` - 发现 → 评估 → 发布，每阶段写产物
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/continuation` - 从发布历史恢复日期窗口
//! - `orchestrator/pipeline` - 状态机、提前结束、运行汇总
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, SourceKind};
pub use error::{CuratorError, CuratorResult};
pub use models::{CandidatePaper, CuratedPaper, DateWindow, RunSummary};
pub use orchestrator::{PhaseSelection, PipelineOrchestrator, RunRequest};
pub use workflow::{CurationFlow, RunCtx};
