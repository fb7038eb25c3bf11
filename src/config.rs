//! Mnemograph configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main Mnemograph configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MnemographConfig {
    /// HTTP gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Memory store configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Graph store configuration
    #[serde(default)]
    pub graph: GraphConfig,

    /// Completion model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Document ingestion configuration
    #[serde(default)]
    pub ingest: IngestConfig,

    /// Context assembly configuration
    #[serde(default)]
    pub context: ContextConfig,

    /// Graph rendering configuration
    #[serde(default)]
    pub render: RenderConfig,
}

impl ModelConfig {
    /// Base URL from the environment override, else the configured one
    pub fn resolved_base_url(&self) -> String {
        resolve_secret(&self.base_url_ref).unwrap_or_else(|| self.base_url.clone())
    }
}

impl MnemographConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty = any)
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8501,
            cors_origins: Vec::new(),
        }
    }
}

/// Which memory store backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryProvider {
    /// mem0 REST server (default)
    #[default]
    Mem0,

    /// Process-local store, nothing survives a restart
    InMemory,
}

/// Memory store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Backend provider
    pub provider: MemoryProvider,

    /// Base URL of the mem0 REST server
    pub base_url: String,

    /// Environment variable holding the mem0 API key (optional)
    pub api_key_ref: String,

    /// User id used when a request does not name one
    pub default_user_id: String,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            provider: MemoryProvider::Mem0,
            base_url: "http://localhost:8888".to_string(),
            api_key_ref: "mem0_api_key".to_string(),
            default_user_id: "user_1".to_string(),
        }
    }
}

/// How node identifiers are derived in the graph traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeIdFunction {
    /// `toString(id(n))`
    #[default]
    LegacyId,

    /// `elementId(n)`
    ElementId,
}

/// Graph store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Neo4j HTTP endpoint
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for basic auth
    pub username: String,

    /// Environment variable holding the password
    pub password_ref: String,

    /// Maximum number of relationship records per traversal
    pub record_limit: usize,

    /// Node identifier function
    pub node_id: NodeIdFunction,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            username: "neo4j".to_string(),
            password_ref: "neo4j_password".to_string(),
            record_limit: 1000,
            node_id: NodeIdFunction::LegacyId,
        }
    }
}

/// Completion model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// OpenAI-compatible base URL, used when `base_url_ref` is unset
    pub base_url: String,

    /// Environment variable overriding `base_url`
    pub base_url_ref: String,

    /// Model identifier
    pub model: String,

    /// Environment variable holding the API key
    pub api_key_ref: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".to_string(),
            base_url_ref: "openai_base_url".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key_ref: "openrouter_api_key".to_string(),
        }
    }
}

/// Document ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Maximum chunk size in characters
    pub max_chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: crate::memory::DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// Context assembly configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Maximum number of memories embedded in the prompt
    pub max_memories: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_memories: crate::memory::DEFAULT_CONTEXT_CAP,
        }
    }
}

/// Graph rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Output path of the rendered HTML document
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            output: PathBuf::from("knowledge_graph.html"),
        }
    }
}

/// Resolve a secret from the environment.
///
/// `reference` names an environment variable (e.g. `"openrouter_api_key"` →
/// reads `$OPENROUTER_API_KEY`). Both the original casing and the UPPER_CASE
/// form are tried. Empty values count as unset.
pub fn resolve_secret(reference: &str) -> Option<String> {
    if reference.is_empty() {
        return None;
    }
    std::env::var(reference)
        .or_else(|_| std::env::var(reference.to_uppercase()))
        .ok()
        .filter(|v| !v.is_empty())
}
