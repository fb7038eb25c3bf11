//! Agent module: memory-augmented conversation
//!
//! ```text
//! api / cli ──▶ MemoryAgent ──▶ MemoryStore        (search, add, get_all, delete_all)
//!                   └────────▶ CompletionClient   (one answer per turn)
//! ```

pub mod completion;
pub mod orchestrator;

pub use completion::{ChatMessage, CompletionClient, OpenAiCompatClient, Role};
pub use orchestrator::{system_prompt, IngestReport, MemoryAgent, TurnOutcome, TurnStage};
