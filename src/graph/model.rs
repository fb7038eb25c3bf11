//! Graph model: raw relationship records in, nodes and edges out

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One directed one-hop relationship row returned by the graph store.
///
/// `n_*` fields describe the source endpoint, `m_*` the target. Every
/// descriptive field may be missing or null.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RelationRecord {
    /// Canonical source node id
    #[serde(deserialize_with = "id_string")]
    pub source: String,
    /// Canonical target node id
    #[serde(deserialize_with = "id_string")]
    pub target: String,
    /// Relationship type
    #[serde(default)]
    pub relation: Option<String>,
    #[serde(default)]
    pub n_labels: Option<Vec<String>>,
    #[serde(default)]
    pub m_labels: Option<Vec<String>>,
    #[serde(default)]
    pub n_name: Option<Value>,
    #[serde(default)]
    pub m_name: Option<Value>,
    #[serde(default)]
    pub n_memory: Option<Value>,
    #[serde(default)]
    pub m_memory: Option<Value>,
    #[serde(default)]
    pub n_value: Option<Value>,
    #[serde(default)]
    pub m_value: Option<Value>,
    #[serde(default)]
    pub n_text: Option<Value>,
    #[serde(default)]
    pub m_text: Option<Value>,
    #[serde(default)]
    pub n_id: Option<Value>,
    #[serde(default)]
    pub m_id: Option<Value>,
}

/// Accept ids serialized either as strings or as bare numbers.
fn id_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

/// Which end of a relationship record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The `n` endpoint
    Source,
    /// The `m` endpoint
    Target,
}

/// Candidate display fields of an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    Name,
    Memory,
    Value,
    Text,
    Id,
}

/// Borrowed view of one endpoint of a relationship record
#[derive(Debug, Clone, Copy)]
pub struct Endpoint<'a> {
    pub id: &'a str,
    pub labels: &'a [String],
    record: &'a RelationRecord,
    side: Side,
}

impl<'a> Endpoint<'a> {
    /// Value of a candidate display field, if the row carried one
    pub fn field(&self, field: LabelField) -> Option<&'a Value> {
        let r = self.record;
        let value = match (self.side, field) {
            (Side::Source, LabelField::Name) => &r.n_name,
            (Side::Source, LabelField::Memory) => &r.n_memory,
            (Side::Source, LabelField::Value) => &r.n_value,
            (Side::Source, LabelField::Text) => &r.n_text,
            (Side::Source, LabelField::Id) => &r.n_id,
            (Side::Target, LabelField::Name) => &r.m_name,
            (Side::Target, LabelField::Memory) => &r.m_memory,
            (Side::Target, LabelField::Value) => &r.m_value,
            (Side::Target, LabelField::Text) => &r.m_text,
            (Side::Target, LabelField::Id) => &r.m_id,
        };
        value.as_ref()
    }
}

impl RelationRecord {
    /// View one endpoint of the record
    pub fn endpoint(&self, side: Side) -> Endpoint<'_> {
        let (id, labels) = match side {
            Side::Source => (&self.source, &self.n_labels),
            Side::Target => (&self.target, &self.m_labels),
        };
        Endpoint {
            id: id.as_str(),
            labels: labels.as_deref().unwrap_or(&[]),
            record: self,
            side,
        }
    }
}

/// Rendering bucket of a node, derived from its labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeCategory {
    User,
    Entity,
    Memory,
    Person,
    Location,
    Organization,
    Unknown,
}

impl NodeCategory {
    /// Label keyword matched against node labels (`None` for `Unknown`)
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Self::User => Some("user"),
            Self::Entity => Some("entity"),
            Self::Memory => Some("memory"),
            Self::Person => Some("person"),
            Self::Location => Some("location"),
            Self::Organization => Some("organization"),
            Self::Unknown => None,
        }
    }

    /// Fill color used by the renderer
    pub fn color(&self) -> &'static str {
        match self {
            Self::User => "#6366f1",
            Self::Entity => "#f97316",
            Self::Memory => "#22c55e",
            Self::Person => "#e11d48",
            Self::Location => "#0ea5e9",
            Self::Organization => "#8b5cf6",
            Self::Unknown => "#94a3b8",
        }
    }
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.keyword().unwrap_or("unknown"))
    }
}

/// Relative node size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeHint {
    Large,
    Normal,
}

/// A deduplicated graph node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    /// Canonical id from the graph store
    pub id: String,
    /// Store labels, in store order
    pub labels: Vec<String>,
    /// Display label, at most 35 characters
    pub display_label: String,
    /// Untruncated display label, used for tooltips
    pub full_label: String,
    pub category: NodeCategory,
    pub size_hint: SizeHint,
}

/// A directed, labelled edge. Parallel edges and self-loops are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub source_id: String,
    pub target_id: String,
    pub relation_label: String,
}

/// Nodes and edges built from one batch of relationship records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    /// Nodes in first-seen order
    pub nodes: Vec<GraphNode>,
    /// Edges in record order
    pub edges: Vec<GraphEdge>,
    /// Number of records the graph was built from
    pub record_count: usize,
}

impl KnowledgeGraph {
    /// Whether the graph was built from an empty record set
    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Look up a node by id
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
