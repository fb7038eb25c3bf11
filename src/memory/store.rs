//! Memory store collaborators
//!
//! `MemoryStore` is the boundary to the vector/graph memory engine. Responses
//! are returned as raw JSON and normalized by the caller, so a backend never
//! needs to agree on a response schema.
//!
//! Two backends are provided:
//! - `Mem0HttpStore` talks to a mem0 REST server.
//! - `InMemoryStore` keeps memories in process, for local runs and tests.

use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Boundary to a memory store.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Search memories relevant to `query` for a user.
    async fn search(&self, query: &str, user_id: &str) -> Result<Value>;

    /// Store a piece of text for a user.
    async fn add(
        &self,
        text: &str,
        user_id: &str,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Value>;

    /// List every memory of a user.
    async fn get_all(&self, user_id: &str) -> Result<Value>;

    /// Delete every memory of a user.
    async fn delete_all(&self, user_id: &str) -> Result<()>;

    /// Backend name for logs and diagnostics.
    fn name(&self) -> &str;
}

// =============================================================================
// mem0 REST server
// =============================================================================

/// Client for the mem0 REST server.
pub struct Mem0HttpStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl Mem0HttpStore {
    /// Create a client for the server at `base_url`
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::Store(format!("mem0 request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Store(format!("mem0 returned {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Store(format!("mem0 response unreadable: {}", e)))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::Store(format!("mem0 returned malformed JSON: {}", e)))
    }
}

#[async_trait]
impl MemoryStore for Mem0HttpStore {
    async fn search(&self, query: &str, user_id: &str) -> Result<Value> {
        let body = json!({ "query": query, "user_id": user_id });
        self.send(self.client.post(self.url("/search")).json(&body))
            .await
    }

    async fn add(
        &self,
        text: &str,
        user_id: &str,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let mut body = json!({
            "messages": [{ "role": "user", "content": text }],
            "user_id": user_id,
        });
        if let Some(metadata) = metadata {
            body["metadata"] = Value::Object(metadata.clone());
        }
        self.send(self.client.post(self.url("/memories")).json(&body))
            .await
    }

    async fn get_all(&self, user_id: &str) -> Result<Value> {
        self.send(
            self.client
                .get(self.url("/memories"))
                .query(&[("user_id", user_id)]),
        )
        .await
    }

    async fn delete_all(&self, user_id: &str) -> Result<()> {
        self.send(
            self.client
                .delete(self.url("/memories"))
                .query(&[("user_id", user_id)]),
        )
        .await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "mem0"
    }
}

// =============================================================================
// In-process store
// =============================================================================

/// A memory kept by `InMemoryStore`
#[derive(Debug, Clone)]
struct StoredMemory {
    id: String,
    text: String,
    metadata: Option<Map<String, Value>>,
    created_at: i64,
}

impl StoredMemory {
    fn to_json(&self, user_id: &str, score: Option<f64>) -> Value {
        let mut entry = json!({
            "id": self.id,
            "memory": self.text,
            "user_id": user_id,
            "created_at": self.created_at,
        });
        if let Some(metadata) = &self.metadata {
            entry["metadata"] = Value::Object(metadata.clone());
        }
        if let Some(score) = score {
            entry["score"] = json!(score);
        }
        entry
    }
}

/// Process-local memory store.
///
/// Search ranks memories by the share of query words they contain; memories
/// sharing no word with the query are left out. Responses use the same
/// `{"results": [...]}` shape as mem0.
pub struct InMemoryStore {
    memories: Arc<RwLock<HashMap<String, Vec<StoredMemory>>>>,
}

impl InMemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            memories: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of memories held for a user
    pub async fn count(&self, user_id: &str) -> usize {
        self.memories
            .read()
            .await
            .get(user_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn overlap_score(query_words: &[String], text: &str) -> f64 {
    if query_words.is_empty() {
        return 0.0;
    }
    let text_words = words(text);
    let hits = query_words
        .iter()
        .filter(|w| text_words.contains(w))
        .count();
    hits as f64 / query_words.len() as f64
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn search(&self, query: &str, user_id: &str) -> Result<Value> {
        let query_words = words(query);
        let memories = self.memories.read().await;

        let mut scored: Vec<(f64, &StoredMemory)> = memories
            .get(user_id)
            .map(|list| {
                list.iter()
                    .map(|m| (overlap_score(&query_words, &m.text), m))
                    .filter(|(score, _)| *score > 0.0)
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        let results: Vec<Value> = scored
            .into_iter()
            .map(|(score, m)| m.to_json(user_id, Some(score)))
            .collect();
        Ok(json!({ "results": results }))
    }

    async fn add(
        &self,
        text: &str,
        user_id: &str,
        metadata: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let memory = StoredMemory {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.to_string(),
            metadata: metadata.cloned(),
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        let response = json!({
            "results": [{ "id": memory.id, "memory": memory.text, "event": "ADD" }]
        });

        self.memories
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .push(memory);

        Ok(response)
    }

    async fn get_all(&self, user_id: &str) -> Result<Value> {
        let memories = self.memories.read().await;
        let results: Vec<Value> = memories
            .get(user_id)
            .map(|list| list.iter().map(|m| m.to_json(user_id, None)).collect())
            .unwrap_or_default();
        Ok(json!({ "results": results }))
    }

    async fn delete_all(&self, user_id: &str) -> Result<()> {
        self.memories.write().await.remove(user_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::normalize;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_add_and_get_all() {
        let store = InMemoryStore::new();
        store.add("I like apples", "user-1", None).await.unwrap();
        store.add("I like oranges", "user-1", None).await.unwrap();
        store.add("I like pears", "user-2", None).await.unwrap();

        let records = normalize(&store.get_all("user-1").await.unwrap());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "I like apples");
        assert!(records[0].id.is_some());
        assert_eq!(store.count("user-2").await, 1);
    }

    #[tokio::test]
    async fn test_search_ranks_by_overlap() {
        let store = InMemoryStore::new();
        store.add("I work as a developer", "user-1", None).await.unwrap();
        store.add("I live in Moscow", "user-1", None).await.unwrap();
        store.add("I love Python and graphs", "user-1", None).await.unwrap();

        let records = normalize(&store.search("where do I live, Moscow?", "user-1").await.unwrap());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].text, "I live in Moscow");
        // Ties keep insertion order
        assert_eq!(records[1].text, "I work as a developer");
        assert!(records[0].score.unwrap() > records[1].score.unwrap());
    }

    #[tokio::test]
    async fn test_search_unknown_user_is_empty() {
        let store = InMemoryStore::new();
        let records = normalize(&store.search("anything", "nobody").await.unwrap());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_is_kept() {
        let store = InMemoryStore::new();
        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("cv.txt"));
        store.add("senior engineer", "user-1", Some(&metadata)).await.unwrap();

        let records = normalize(&store.get_all("user-1").await.unwrap());
        assert_eq!(records[0].metadata_value("source"), Some(&json!("cv.txt")));
    }

    #[tokio::test]
    async fn test_delete_all_only_affects_user() {
        let store = InMemoryStore::new();
        store.add("a", "user-1", None).await.unwrap();
        store.add("b", "user-2", None).await.unwrap();

        store.delete_all("user-1").await.unwrap();
        assert_eq!(store.count("user-1").await, 0);
        assert_eq!(store.count("user-2").await, 1);
    }

    #[test]
    fn test_mem0_base_url_is_normalized() {
        let store = Mem0HttpStore::new("http://localhost:8888/", None);
        assert_eq!(store.url("/search"), "http://localhost:8888/search");
        assert_eq!(store.name(), "mem0");
    }

    #[tokio::test]
    async fn test_mem0_unreachable_is_store_error() {
        // Port 9 (discard) is not expected to serve HTTP
        let store = Mem0HttpStore::new("http://127.0.0.1:9", None);
        let err = store.search("q", "user-1").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
    }

    // -------------------------------------------------------------------------
    // mem0 wire format
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_mem0_search_request_and_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/search")
                    .header("authorization", "Bearer mem0-key")
                    .json_body(json!({"query": "where do I live", "user_id": "alice"}));
                then.status(200).json_body(json!({
                    "results": [
                        {"id": "m1", "memory": "lives in Moscow", "score": 0.91},
                        {"id": "m2", "memory": "likes tea", "score": 0.4}
                    ]
                }));
            })
            .await;

        let store = Mem0HttpStore::new(server.base_url(), Some("mem0-key".to_string()));
        let records = normalize(&store.search("where do I live", "alice").await.unwrap());

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].text, "lives in Moscow");
        assert_eq!(records[0].score, Some(0.91));
    }

    #[tokio::test]
    async fn test_mem0_add_sends_messages_and_metadata() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/memories").json_body(json!({
                    "messages": [{"role": "user", "content": "I like tea"}],
                    "user_id": "alice",
                    "metadata": {"source": "notes.txt"}
                }));
                then.status(200)
                    .json_body(json!({"results": [{"id": "m1", "event": "ADD"}]}));
            })
            .await;

        let mut metadata = Map::new();
        metadata.insert("source".to_string(), json!("notes.txt"));
        let store = Mem0HttpStore::new(server.base_url(), None);
        let response = store
            .add("I like tea", "alice", Some(&metadata))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response["results"][0]["event"], "ADD");
    }

    #[tokio::test]
    async fn test_mem0_get_all_and_delete_all_use_user_query() {
        let server = MockServer::start_async().await;
        let list = server
            .mock_async(|when, then| {
                when.method(GET).path("/memories").query_param("user_id", "alice");
                then.status(200)
                    .json_body(json!([{"id": "m1", "memory": "likes tea"}]));
            })
            .await;
        let delete = server
            .mock_async(|when, then| {
                when.method(DELETE).path("/memories").query_param("user_id", "alice");
                then.status(204);
            })
            .await;

        let store = Mem0HttpStore::new(server.base_url(), None);
        let records = normalize(&store.get_all("alice").await.unwrap());
        store.delete_all("alice").await.unwrap();

        list.assert_async().await;
        delete.assert_async().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "likes tea");
    }

    #[tokio::test]
    async fn test_mem0_empty_body_is_null() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(200).body("");
            })
            .await;

        let store = Mem0HttpStore::new(server.base_url(), None);
        assert_eq!(store.search("q", "alice").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_mem0_failures_are_store_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/search");
                then.status(500).body("vector store offline");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/memories");
                then.status(200).body("<html>not json</html>");
            })
            .await;

        let store = Mem0HttpStore::new(server.base_url(), None);
        let err = store.search("q", "alice").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("vector store offline"));

        let err = store.get_all("alice").await.unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("malformed JSON"));
    }
}
