//! Memory pipeline
//!
//! Store responses → `normalize` → `assemble_context`, plus chunking of long
//! documents before they are added to the store.

pub mod chunker;
pub mod context;
pub mod record;
pub mod store;

pub use chunker::{chunk_text, Chunk};
pub use context::assemble_context;
pub use record::{normalize, MemoryRecord, StoreResponse};
pub use store::{InMemoryStore, Mem0HttpStore, MemoryStore};

/// Default maximum chunk size for ingested documents, in characters.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 2000;

/// Default number of memories embedded in a prompt.
pub const DEFAULT_CONTEXT_CAP: usize = 10;
