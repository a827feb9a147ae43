//! 基础设施层
//!
//! ## 职责
//!
//! 只暴露能力，不认识业务对象的流程：
//! - `fetcher` - 所有对外 GET 请求的出口（重试 + 线性退避）
//! - `artifact_store` - 阶段产物的持久化（按日期区间标签分目录）

pub mod artifact_store;
pub mod fetcher;

pub use artifact_store::ArtifactStore;
pub use fetcher::{HttpResponse, HttpTransport, RateLimitedFetcher, ReqwestTransport, RetryPolicy};
