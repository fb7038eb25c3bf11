//! Mnemograph - memory-augmented chat with a knowledge graph view
//!
//! Mnemograph puts long-term memory in front of a language model. Each chat
//! turn searches the user's memories, embeds the most relevant ones in the
//! prompt and stores the exchange back. The relationships the memory engine
//! extracts into its graph store can be rendered as an interactive graph.
//!
//! ## Architecture
//!
//! ```text
//!            ┌──────────── CLI / HTTP API ────────────┐
//!            │                                        │
//!     ┌──────▼───────┐                        ┌───────▼──────┐
//!     │  MemoryAgent │                        │ GraphService │
//!     └──┬────────┬──┘                        └──┬────────┬──┘
//!        │        │                              │        │
//! ┌──────▼─────┐ ┌▼───────────────┐   ┌──────────▼──┐ ┌───▼───────────┐
//! │ MemoryStore│ │CompletionClient│   │ GraphStore  │ │ GraphRenderer │
//! │ (mem0)     │ │(OpenAI-compat) │   │ (Neo4j)     │ │ (vis-network) │
//! └────────────┘ └────────────────┘   └─────────────┘ └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`memory`]: chunking, response normalization, context assembly, stores
//! - [`agent`]: conversation turns and the completion client
//! - [`graph`]: graph store query, node/edge mapping, rendering
//! - [`api`]: HTTP API
//! - [`config`]: Configuration management

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod graph;
pub mod memory;

pub use config::MnemographConfig;
pub use error::{Error, Result};
