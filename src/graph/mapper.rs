//! Mapping of relationship records into a deduplicated node/edge model
//!
//! Label and category resolution are table-driven: `LABEL_PRECEDENCE` and
//! `CATEGORY_PRECEDENCE` list the candidates in the order they are tried.

use super::model::{
    Endpoint, GraphEdge, GraphNode, KnowledgeGraph, LabelField, NodeCategory, RelationRecord,
    Side, SizeHint,
};
use crate::memory::record::{is_present, value_to_text};
use std::collections::HashSet;

/// Maximum display label length, in characters.
pub const DISPLAY_LABEL_MAX: usize = 35;

/// Relation label used when a record carries none.
pub const DEFAULT_RELATION: &str = "related";

/// Label used when an endpoint has neither fields nor labels.
pub const FALLBACK_LABEL: &str = "Node";

/// Display field precedence. The endpoint's last store label and
/// `FALLBACK_LABEL` follow after these.
pub const LABEL_PRECEDENCE: &[LabelField] = &[
    LabelField::Name,
    LabelField::Memory,
    LabelField::Value,
    LabelField::Text,
    LabelField::Id,
];

/// Category precedence; the first category matching any label wins.
pub const CATEGORY_PRECEDENCE: &[NodeCategory] = &[
    NodeCategory::User,
    NodeCategory::Entity,
    NodeCategory::Memory,
    NodeCategory::Person,
    NodeCategory::Location,
    NodeCategory::Organization,
];

/// Build the graph model from a batch of relationship records.
///
/// Produces one node per distinct id (first occurrence wins) and exactly one
/// edge per record.
pub fn map_records(records: &[RelationRecord]) -> KnowledgeGraph {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes = Vec::new();
    let mut edges = Vec::with_capacity(records.len());

    for record in records {
        for side in [Side::Source, Side::Target] {
            let endpoint = record.endpoint(side);
            if seen.insert(endpoint.id) {
                nodes.push(build_node(&endpoint));
            }
        }

        let relation_label = record
            .relation
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_RELATION)
            .to_string();

        edges.push(GraphEdge {
            source_id: record.source.clone(),
            target_id: record.target.clone(),
            relation_label,
        });
    }

    KnowledgeGraph {
        nodes,
        edges,
        record_count: records.len(),
    }
}

fn build_node(endpoint: &Endpoint<'_>) -> GraphNode {
    let full_label = resolve_display_label(endpoint);
    let category = resolve_category(endpoint.labels);
    GraphNode {
        id: endpoint.id.to_string(),
        labels: endpoint.labels.to_vec(),
        display_label: truncate_label(&full_label),
        full_label,
        category,
        size_hint: if category == NodeCategory::User {
            SizeHint::Large
        } else {
            SizeHint::Normal
        },
    }
}

/// Resolve the untruncated display label of an endpoint.
pub fn resolve_display_label(endpoint: &Endpoint<'_>) -> String {
    LABEL_PRECEDENCE
        .iter()
        .filter_map(|field| endpoint.field(*field))
        .find(|v| is_present(v))
        .map(value_to_text)
        .or_else(|| endpoint.labels.last().filter(|l| !l.is_empty()).cloned())
        .unwrap_or_else(|| FALLBACK_LABEL.to_string())
}

/// Resolve a node category from its labels.
///
/// Matching is case-insensitive and accepts the keyword anywhere in a label,
/// so `User`, `user` and `__User__` all map to `NodeCategory::User`.
pub fn resolve_category(labels: &[String]) -> NodeCategory {
    let lowered: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    CATEGORY_PRECEDENCE
        .iter()
        .copied()
        .find(|category| {
            category
                .keyword()
                .map(|kw| lowered.iter().any(|l| l == kw || l.contains(kw)))
                .unwrap_or(false)
        })
        .unwrap_or(NodeCategory::Unknown)
}

/// Truncate a label to `DISPLAY_LABEL_MAX` characters.
pub fn truncate_label(label: &str) -> String {
    label.chars().take(DISPLAY_LABEL_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(source: &str, target: &str) -> RelationRecord {
        RelationRecord {
            source: source.to_string(),
            target: target.to_string(),
            ..Default::default()
        }
    }

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_input() {
        let graph = map_records(&[]);
        assert!(graph.is_empty());
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_shared_source_first_occurrence_wins() {
        let mut first = record("1", "2");
        first.n_name = Some(json!("alice"));
        first.n_labels = Some(labels(&["User"]));
        first.relation = Some("KNOWS".to_string());

        let mut second = record("1", "3");
        second.n_name = Some(json!("someone else"));
        second.n_labels = Some(labels(&["Person"]));

        let graph = map_records(&[first, second]);
        assert_eq!(graph.nodes.iter().filter(|n| n.id == "1").count(), 1);

        let node = graph.node("1").unwrap();
        assert_eq!(node.display_label, "alice");
        assert_eq!(node.category, NodeCategory::User);
        assert_eq!(node.size_hint, SizeHint::Large);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_parallel_edges_and_self_loops_are_kept() {
        let records = vec![record("1", "2"), record("1", "2"), record("3", "3")];
        let graph = map_records(&records);
        assert_eq!(graph.edges.len(), 3);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges[2].source_id, graph.edges[2].target_id);
    }

    #[test]
    fn test_missing_relation_defaults() {
        let mut blank = record("1", "2");
        blank.relation = Some(String::new());
        let graph = map_records(&[record("1", "2"), blank]);
        assert!(graph.edges.iter().all(|e| e.relation_label == "related"));
    }

    #[test]
    fn test_label_precedence() {
        let mut r = record("1", "2");
        r.n_memory = Some(json!("likes tea"));
        r.n_value = Some(json!("v"));
        r.n_text = Some(json!("t"));
        r.n_id = Some(json!("raw-id"));
        assert_eq!(resolve_display_label(&r.endpoint(Side::Source)), "likes tea");

        r.n_name = Some(json!(""));
        assert_eq!(resolve_display_label(&r.endpoint(Side::Source)), "likes tea");

        r.n_name = Some(json!("tea"));
        assert_eq!(resolve_display_label(&r.endpoint(Side::Source)), "tea");

        let mut r = record("1", "2");
        r.m_text = Some(json!("t"));
        r.m_id = Some(json!(42));
        assert_eq!(resolve_display_label(&r.endpoint(Side::Target)), "t");
        r.m_text = None;
        assert_eq!(resolve_display_label(&r.endpoint(Side::Target)), "42");
    }

    #[test]
    fn test_label_falls_back_to_last_label_then_node() {
        let mut r = record("1", "2");
        r.n_labels = Some(labels(&["__Entity__", "Location"]));
        assert_eq!(resolve_display_label(&r.endpoint(Side::Source)), "Location");
        assert_eq!(resolve_display_label(&r.endpoint(Side::Target)), "Node");
    }

    #[test]
    fn test_display_label_truncated_to_35_chars() {
        let mut r = record("1", "2");
        let long = "A remarkably long memory about graph databases and tea";
        r.n_memory = Some(json!(long));
        let graph = map_records(&[r]);
        let node = graph.node("1").unwrap();
        assert_eq!(node.display_label.chars().count(), 35);
        assert_eq!(node.full_label, long);
    }

    #[test]
    fn test_category_case_insensitive() {
        assert_eq!(resolve_category(&labels(&["USER"])), NodeCategory::User);
        assert_eq!(resolve_category(&labels(&["__User__"])), NodeCategory::User);
        assert_eq!(resolve_category(&labels(&["entity"])), NodeCategory::Entity);
        assert_eq!(resolve_category(&labels(&["Organization"])), NodeCategory::Organization);
    }

    #[test]
    fn test_category_first_match_wins_over_label_order() {
        // Label order does not matter; the category precedence does
        assert_eq!(
            resolve_category(&labels(&["Person", "Entity"])),
            NodeCategory::Entity
        );
        assert_eq!(
            resolve_category(&labels(&["Location", "Memory", "User"])),
            NodeCategory::User
        );
    }

    #[test]
    fn test_category_unknown() {
        assert_eq!(resolve_category(&labels(&["Galaxy"])), NodeCategory::Unknown);
        assert_eq!(resolve_category(&[]), NodeCategory::Unknown);
    }

    #[test]
    fn test_size_hint_only_for_users() {
        let mut r = record("1", "2");
        r.n_labels = Some(labels(&["user"]));
        r.m_labels = Some(labels(&["Person"]));
        let graph = map_records(&[r]);
        assert_eq!(graph.node("1").unwrap().size_hint, SizeHint::Large);
        assert_eq!(graph.node("2").unwrap().size_hint, SizeHint::Normal);
    }
}
