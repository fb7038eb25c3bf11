//! Graph rendering
//!
//! The renderer hands the graph model to a `LayoutEngine`, which turns it into
//! a self-contained visual document, and writes that document to a path.
//! The stock engine emits a vis-network page whose force-directed physics run
//! in the browser; the layout constants below are fixed.
//!
//! Rendering an empty record set yields `None` rather than a document, so
//! callers can tell "nothing to show" apart from a failed query.

use super::model::{GraphNode, KnowledgeGraph, SizeHint};
use crate::error::{Error, Result};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Barnes-Hut gravitational constant
pub const GRAVITATIONAL_CONSTANT: i64 = -80_000;
/// Barnes-Hut central gravity
pub const CENTRAL_GRAVITY: f64 = 0.3;
/// Rest length of edge springs
pub const SPRING_LENGTH: u32 = 250;
/// Physics stabilization iterations before first paint
pub const STABILIZATION_ITERATIONS: u32 = 100;
/// Hover tooltip delay in milliseconds
pub const TOOLTIP_DELAY_MS: u32 = 200;

const CANVAS_HEIGHT: &str = "650px";
const CANVAS_WIDTH: &str = "100%";
const BACKGROUND_COLOR: &str = "#1a1a2e";
const FONT_COLOR: &str = "#ffffff";
const EDGE_COLOR: &str = "#64748b";
const LARGE_NODE_SIZE: u32 = 25;
const NORMAL_NODE_SIZE: u32 = 20;
const VIS_NETWORK_SCRIPT: &str =
    "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

/// Turns a graph model into a self-contained document.
pub trait LayoutEngine: Send + Sync {
    /// Produce the document for a non-empty graph
    fn layout(&self, graph: &KnowledgeGraph) -> Result<String>;

    /// Engine name for logs
    fn name(&self) -> &str;
}

/// vis-network HTML page with Barnes-Hut physics.
#[derive(Debug, Default, Clone, Copy)]
pub struct VisNetworkLayout;

impl VisNetworkLayout {
    fn node_json(node: &GraphNode) -> Value {
        json!({
            "id": node.id,
            "label": node.display_label,
            "title": format!("{}\nType: {:?}", node.full_label, node.labels),
            "color": node.category.color(),
            "size": match node.size_hint {
                SizeHint::Large => LARGE_NODE_SIZE,
                SizeHint::Normal => NORMAL_NODE_SIZE,
            },
            "shape": "dot",
            "group": node.category.to_string(),
        })
    }

    /// Fixed network options handed to vis-network.
    pub fn options() -> Value {
        json!({
            "nodes": {
                "font": { "size": 14, "face": "Arial", "color": FONT_COLOR }
            },
            "edges": {
                "color": EDGE_COLOR,
                "font": { "size": 10, "align": "middle", "face": "Arial" },
                "smooth": { "type": "continuous", "roundness": 0.3 }
            },
            "physics": {
                "enabled": true,
                "barnesHut": {
                    "gravitationalConstant": GRAVITATIONAL_CONSTANT,
                    "centralGravity": CENTRAL_GRAVITY,
                    "springLength": SPRING_LENGTH
                },
                "stabilization": { "enabled": true, "iterations": STABILIZATION_ITERATIONS }
            },
            "interaction": { "hover": true, "tooltipDelay": TOOLTIP_DELAY_MS }
        })
    }
}

/// Serialize JSON for embedding inside a `<script>` element.
fn script_json(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace("</", "<\\/"))
}

impl LayoutEngine for VisNetworkLayout {
    fn layout(&self, graph: &KnowledgeGraph) -> Result<String> {
        let nodes: Vec<Value> = graph.nodes.iter().map(Self::node_json).collect();
        let edges: Vec<Value> = graph
            .edges
            .iter()
            .map(|e| {
                json!({
                    "from": e.source_id,
                    "to": e.target_id,
                    "label": e.relation_label,
                    "title": e.relation_label,
                    "color": EDGE_COLOR,
                })
            })
            .collect();

        let nodes = script_json(&Value::Array(nodes))?;
        let edges = script_json(&Value::Array(edges))?;
        let options = script_json(&Self::options())?;

        Ok(format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Knowledge graph</title>
<script src="{script}"></script>
<style>
  html, body {{ margin: 0; background: {background}; }}
  #graph {{ width: {width}; height: {height}; background: {background}; }}
</style>
</head>
<body>
<div id="graph"></div>
<script>
  var nodes = new vis.DataSet({nodes});
  var edges = new vis.DataSet({edges});
  var options = {options};
  var network = new vis.Network(document.getElementById("graph"), {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"#,
            script = VIS_NETWORK_SCRIPT,
            background = BACKGROUND_COLOR,
            width = CANVAS_WIDTH,
            height = CANVAS_HEIGHT,
        ))
    }

    fn name(&self) -> &str {
        "vis-network"
    }
}

/// Handle to a rendered artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedGraph {
    /// Where the document was written
    pub path: PathBuf,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Writes graph documents produced by a layout engine.
pub struct GraphRenderer {
    engine: Box<dyn LayoutEngine>,
}

impl GraphRenderer {
    /// Create a renderer over the given engine
    pub fn new(engine: Box<dyn LayoutEngine>) -> Self {
        Self { engine }
    }

    /// Produce the document without writing it.
    ///
    /// Returns `None` for a graph built from an empty record set.
    pub fn document(&self, graph: &KnowledgeGraph) -> Result<Option<String>> {
        if graph.is_empty() {
            return Ok(None);
        }
        self.engine.layout(graph).map(Some)
    }

    /// Render the graph to `path`, replacing any previous artifact there.
    ///
    /// Returns `None` for a graph built from an empty record set.
    pub async fn render(&self, graph: &KnowledgeGraph, path: &Path) -> Result<Option<RenderedGraph>> {
        let Some(document) = self.document(graph)? else {
            tracing::debug!("Graph is empty, nothing to render");
            return Ok(None);
        };

        tokio::fs::write(path, document)
            .await
            .map_err(|e| Error::Render(format!("failed to write {}: {}", path.display(), e)))?;

        tracing::info!(
            path = %path.display(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            engine = self.engine.name(),
            "Rendered knowledge graph"
        );

        Ok(Some(RenderedGraph {
            path: path.to_path_buf(),
            node_count: graph.nodes.len(),
            edge_count: graph.edges.len(),
        }))
    }
}

impl Default for GraphRenderer {
    fn default() -> Self {
        Self::new(Box::new(VisNetworkLayout))
    }
}
