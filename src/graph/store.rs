//! Graph store collaborators
//!
//! The graph store answers a single parametrized one-hop traversal. Nodes
//! owned by the requesting user and ownerless (global) nodes are both
//! visible, so the filter is a disjunction rather than a strict per-user
//! predicate.

use super::model::RelationRecord;
use crate::config::{GraphConfig, NodeIdFunction};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Boundary to a graph store.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch up to the configured cap of one-hop relationship records
    /// visible to `user_id`.
    async fn one_hop(&self, user_id: &str) -> Result<Vec<RelationRecord>>;

    /// Probe the store; `Ok(true)` when it answers.
    async fn ping(&self) -> Result<bool>;
}

/// Build the one-hop traversal for the given id function and record cap.
pub fn one_hop_query(node_id: NodeIdFunction, limit: usize) -> String {
    let (source, target) = match node_id {
        NodeIdFunction::LegacyId => ("toString(id(n))", "toString(id(m))"),
        NodeIdFunction::ElementId => ("elementId(n)", "elementId(m)"),
    };
    format!(
        "MATCH (n)-[r]->(m) \
         WHERE n.user_id = $user_id OR m.user_id = $user_id OR \
         n.user_id IS NULL OR m.user_id IS NULL \
         RETURN {source} AS source, {target} AS target, type(r) AS relation, \
         labels(n) AS n_labels, labels(m) AS m_labels, \
         n.memory AS n_memory, m.memory AS m_memory, \
         n.value AS n_value, m.value AS m_value, \
         n.name AS n_name, m.name AS m_name, \
         n.text AS n_text, m.text AS m_text, \
         n.id AS n_id, m.id AS m_id \
         LIMIT {limit}"
    )
}

// =============================================================================
// Neo4j HTTP transactional endpoint
// =============================================================================

/// Neo4j client speaking the HTTP transactional API
/// (`POST /db/{database}/tx/commit`).
pub struct Neo4jHttpStore {
    client: reqwest::Client,
    endpoint: String,
    username: String,
    password: Option<String>,
    query: String,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

impl Neo4jHttpStore {
    /// Create a client from graph configuration and a resolved password
    pub fn new(config: &GraphConfig, password: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/db/{}/tx/commit",
                config.url.trim_end_matches('/'),
                config.database
            ),
            username: config.username.clone(),
            password,
            query: one_hop_query(config.node_id, config.record_limit),
        }
    }

    /// Run a single statement and return its rows as column → value maps.
    async fn run(&self, statement: &str, parameters: Value) -> Result<Vec<Map<String, Value>>> {
        let body = json!({
            "statements": [{
                "statement": statement,
                "parameters": parameters,
                "resultDataContents": ["row"],
            }]
        });

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.username, self.password.as_ref())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GraphStore(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::GraphStore(format!("returned {}: {}", status, text)));
        }

        let tx: TxResponse = response
            .json()
            .await
            .map_err(|e| Error::GraphStore(format!("malformed response: {}", e)))?;
        rows_from_response(tx)
    }
}

fn rows_from_response(tx: TxResponse) -> Result<Vec<Map<String, Value>>> {
    if let Some(err) = tx.errors.first() {
        return Err(Error::GraphStore(format!("{}: {}", err.code, err.message)));
    }

    let mut rows = Vec::new();
    for result in tx.results {
        for data in result.data {
            rows.push(
                result
                    .columns
                    .iter()
                    .cloned()
                    .zip(data.row)
                    .collect::<Map<String, Value>>(),
            );
        }
    }
    Ok(rows)
}

#[async_trait]
impl GraphStore for Neo4jHttpStore {
    async fn one_hop(&self, user_id: &str) -> Result<Vec<RelationRecord>> {
        let rows = self
            .run(&self.query, json!({ "user_id": user_id }))
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match serde_json::from_value::<RelationRecord>(Value::Object(row)) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Skipping unreadable relationship row: {}", e),
            }
        }
        tracing::debug!(user_id = %user_id, count = records.len(), "Fetched one-hop records");
        Ok(records)
    }

    async fn ping(&self) -> Result<bool> {
        let rows = self.run("RETURN 'OK' AS status", json!({})).await?;
        Ok(rows
            .first()
            .and_then(|row| row.get("status"))
            .and_then(Value::as_str)
            == Some("OK"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_query_uses_configured_limit_and_id_function() {
        let legacy = one_hop_query(NodeIdFunction::LegacyId, 1000);
        assert!(legacy.contains("toString(id(n)) AS source"));
        assert!(legacy.ends_with("LIMIT 1000"));

        let element = one_hop_query(NodeIdFunction::ElementId, 300);
        assert!(element.contains("elementId(m) AS target"));
        assert!(element.ends_with("LIMIT 300"));
    }

    #[test]
    fn test_query_keeps_ownerless_nodes_visible() {
        let query = one_hop_query(NodeIdFunction::LegacyId, 10);
        assert!(query.contains("n.user_id = $user_id OR m.user_id = $user_id"));
        assert!(query.contains("n.user_id IS NULL OR m.user_id IS NULL"));
    }

    #[test]
    fn test_rows_zip_columns() {
        let tx: TxResponse = serde_json::from_value(json!({
            "results": [{
                "columns": ["source", "target", "relation", "n_labels"],
                "data": [
                    {"row": ["1", "2", "KNOWS", ["User"]]},
                    {"row": ["2", "3", null, null]}
                ]
            }],
            "errors": []
        }))
        .unwrap();

        let rows = rows_from_response(tx).unwrap();
        assert_eq!(rows.len(), 2);
        let record: RelationRecord = serde_json::from_value(Value::Object(rows[1].clone())).unwrap();
        assert_eq!(record.source, "2");
        assert!(record.relation.is_none());
        assert!(record.n_labels.is_none());
    }

    #[test]
    fn test_tx_errors_become_graph_store_errors() {
        let tx: TxResponse = serde_json::from_value(json!({
            "results": [],
            "errors": [{"code": "Neo.ClientError.Security.Unauthorized", "message": "bad creds"}]
        }))
        .unwrap();

        let err = rows_from_response(tx).unwrap_err();
        assert!(matches!(err, Error::GraphStore(_)));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_unreachable_store_is_graph_store_error() {
        let config = GraphConfig {
            url: "http://127.0.0.1:9".to_string(),
            ..GraphConfig::default()
        };
        let store = Neo4jHttpStore::new(&config, None);
        assert!(matches!(
            store.one_hop("user_1").await,
            Err(Error::GraphStore(_))
        ));
    }

    fn config_for(server: &MockServer) -> GraphConfig {
        GraphConfig {
            url: server.base_url(),
            ..GraphConfig::default()
        }
    }

    #[tokio::test]
    async fn test_one_hop_decodes_rows_and_skips_unreadable() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/db/neo4j/tx/commit")
                    .header("authorization", "Basic bmVvNGo6c2VjcmV0")
                    .body_includes("\"user_id\":\"alice\"")
                    .body_includes("LIMIT 1000");
                then.status(200).json_body(json!({
                    "results": [{
                        "columns": ["source", "target", "relation", "n_labels", "m_labels", "n_name", "m_name"],
                        "data": [
                            {"row": ["1", "2", "LIKES", ["User"], ["Entity"], "alice", "tea"]},
                            {"row": ["1", "3", "KNOWS", "User", ["Person"], "alice", "bob"]},
                            {"row": [4, 5, null, null, null, null, null]}
                        ]
                    }],
                    "errors": []
                }));
            })
            .await;

        let store = Neo4jHttpStore::new(&config_for(&server), Some("secret".to_string()));
        let records = store.one_hop("alice").await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].relation.as_deref(), Some("LIKES"));
        assert_eq!(records[0].m_name, Some(json!("tea")));
        assert_eq!(records[1].source, "4");
        assert!(records[1].relation.is_none());
    }

    #[tokio::test]
    async fn test_ping_reads_status_row() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/db/neo4j/tx/commit")
                    .body_includes("RETURN 'OK' AS status");
                then.status(200).json_body(json!({
                    "results": [{"columns": ["status"], "data": [{"row": ["OK"]}]}],
                    "errors": []
                }));
            })
            .await;

        let store = Neo4jHttpStore::new(&config_for(&server), None);
        assert!(store.ping().await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_failure_is_graph_store_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/db/neo4j/tx/commit");
                then.status(401).body("unauthorized");
            })
            .await;

        let store = Neo4jHttpStore::new(&config_for(&server), Some("wrong".to_string()));
        let err = store.one_hop("alice").await.unwrap_err();
        assert!(matches!(err, Error::GraphStore(_)));
        assert!(err.to_string().contains("401"));
        assert!(matches!(store.ping().await, Err(Error::GraphStore(_))));
    }
}
