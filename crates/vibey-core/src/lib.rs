pub mod attachment;
pub mod backend;
pub mod config;
pub mod mode;
pub mod pipeline;
pub mod product;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use attachment::ImageAttachment;
pub use backend::{BackendClient, MatchingBackend};
pub use config::Config;
pub use mode::MatchMode;
pub use pipeline::{run_matching, MatchOutcome, MatchingStatus, PipelineEvent, ProgressSink};
pub use product::{flatten_search_results, Documents, Product, RawResult, SearchHit};
pub use session::{ChatSession, Ticket};
pub use state::{ChatMessage, ChatRole};
