//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责决定"跑哪个日期窗口、跑哪些阶段"，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `continuation` - 日期窗口续跑
//! - 从已发布标题的日期前缀恢复上次处理到的日期
//! - 计算 [上次日期 + 1, 昨天] 窗口，可能为空
//!
//! ### `pipeline` - 流水线编排器
//! - 维护运行状态（Idle → Discovery → Evaluation → Publication → Done）
//! - 处理提前结束（空窗口、无候选、无相关论文、缺少发布身份）
//! - 单阶段运行时读取上一阶段的产物
//! - 写运行汇总
//!
//! ## 层次关系
//!
//! ```text
//! pipeline (一次运行)
//!     ↓
//! workflow::CurationFlow (一个日期窗口的三个阶段)
//!     ↓
//! services (能力层：source / filter / scorer / selection / publication)
//!     ↓
//! clients + infrastructure (LLM、存储、抓取、产物)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → clients / infrastructure
//! 2. **无业务逻辑**：只做调度和统计，不做具体业务判断

pub mod continuation;
pub mod pipeline;

// 重新导出主要类型
pub use continuation::resolve_window;
pub use pipeline::{PhaseSelection, PipelineOrchestrator, RunRequest};
