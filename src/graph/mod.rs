//! Knowledge graph visualization
//!
//! Fetches one-hop relationship records from the graph store, maps them into
//! a deduplicated node/edge model and renders that model to an HTML artifact.

pub mod mapper;
pub mod model;
pub mod render;
pub mod store;

pub use mapper::map_records;
pub use model::{GraphEdge, GraphNode, KnowledgeGraph, NodeCategory, RelationRecord, SizeHint};
pub use render::{GraphRenderer, LayoutEngine, RenderedGraph, VisNetworkLayout};
pub use store::{GraphStore, Neo4jHttpStore};

use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Query, map and render pipeline over a graph store.
pub struct GraphService {
    store: Arc<dyn GraphStore>,
    renderer: GraphRenderer,
}

impl GraphService {
    /// Create a service with the default vis-network renderer
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self::with_renderer(store, GraphRenderer::default())
    }

    pub fn with_renderer(store: Arc<dyn GraphStore>, renderer: GraphRenderer) -> Self {
        Self { store, renderer }
    }

    /// Fetch and map the graph visible to `user_id`.
    pub async fn graph(&self, user_id: &str) -> Result<KnowledgeGraph> {
        let records = self.store.one_hop(user_id).await?;
        Ok(map_records(&records))
    }

    /// Render the graph visible to `user_id` into an HTML document.
    ///
    /// `Ok(None)` means the store returned no records.
    pub async fn document(&self, user_id: &str) -> Result<Option<String>> {
        let graph = self.graph(user_id).await?;
        self.renderer.document(&graph)
    }

    /// Render the graph visible to `user_id` to `path`.
    ///
    /// `Ok(None)` means the store returned no records and nothing was
    /// written. Store failures surface as errors, never as an empty graph.
    pub async fn save_graph(&self, user_id: &str, path: &Path) -> Result<Option<RenderedGraph>> {
        let graph = self.graph(user_id).await?;
        if graph.is_empty() {
            tracing::info!(user_id = %user_id, "No relationships found for graph");
        }
        self.renderer.render(&graph, path).await
    }

    /// Whether the graph store answers a trivial query.
    pub async fn test_connection(&self) -> bool {
        match self.store.ping().await {
            Ok(ok) => ok,
            Err(e) => {
                tracing::warn!("Graph store connection check failed: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;

    struct FixedStore {
        records: Vec<RelationRecord>,
        fail: bool,
    }

    #[async_trait]
    impl GraphStore for FixedStore {
        async fn one_hop(&self, _user_id: &str) -> Result<Vec<RelationRecord>> {
            if self.fail {
                return Err(Error::GraphStore("connection refused".to_string()));
            }
            Ok(self.records.clone())
        }

        async fn ping(&self) -> Result<bool> {
            if self.fail {
                return Err(Error::GraphStore("connection refused".to_string()));
            }
            Ok(true)
        }
    }

    fn service(records: Vec<RelationRecord>, fail: bool) -> GraphService {
        GraphService::new(Arc::new(FixedStore { records, fail }))
    }

    #[tokio::test]
    async fn test_save_graph_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.html");
        let record = RelationRecord {
            source: "1".to_string(),
            target: "2".to_string(),
            relation: Some("KNOWS".to_string()),
            ..Default::default()
        };

        let rendered = service(vec![record], false)
            .save_graph("user_1", &path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rendered.node_count, 2);
        assert_eq!(rendered.edge_count, 1);
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_save_graph_empty_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.html");
        let rendered = service(vec![], false).save_graph("user_1", &path).await.unwrap();
        assert!(rendered.is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_save_graph_propagates_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg.html");
        let result = service(vec![], true).save_graph("user_1", &path).await;
        assert!(matches!(result, Err(Error::GraphStore(_))));
    }

    #[tokio::test]
    async fn test_connection_status() {
        assert!(service(vec![], false).test_connection().await);
        assert!(!service(vec![], true).test_connection().await);
    }
}
