pub mod llm_client;
pub mod memory_store;
pub mod store_client;

pub use llm_client::{ChatModel, OpenAiChatModel};
pub use memory_store::MemoryPaperStore;
pub use store_client::{PaperStore, PublishRecord, RestPaperStore};
