pub mod phases;
pub mod run_ctx;

pub use phases::CurationFlow;
pub use run_ctx::RunCtx;
