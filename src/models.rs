//! Data models for the notes graph.
//!
//! `Graph` is the value handed from the builder to the layout simulation and
//! over the wire to clients. Node indices are dense and zero-based, and links
//! are undirected, normalized so that `source <= target`, and unique.

use crate::error::GraphError;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

// ============================================================================
// Notes
// ============================================================================

/// A note as produced by a note source: its title plus the raw outgoing
/// reference strings found in its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub title: String,
    pub references: Vec<String>,
}

impl Note {
    pub fn new(title: impl Into<String>, references: Vec<String>) -> Self {
        Self {
            title: title.into(),
            references,
        }
    }
}

// ============================================================================
// Graph Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GraphNode {
    pub index: usize,
    pub title: String,
}

/// An undirected link between two node indices, stored with `source <= target`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "LinkRecord")]
pub struct SimpleLink {
    source: usize,
    target: usize,
}

#[derive(Deserialize)]
struct LinkRecord {
    source: usize,
    target: usize,
}

impl From<LinkRecord> for SimpleLink {
    fn from(record: LinkRecord) -> Self {
        SimpleLink::new(record.source, record.target)
    }
}

impl SimpleLink {
    pub fn new(a: usize, b: usize) -> Self {
        if a <= b {
            Self { source: a, target: b }
        } else {
            Self { source: b, target: a }
        }
    }

    pub fn source(&self) -> usize {
        self.source
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "GraphRecord")]
pub struct Graph {
    nodes: Vec<GraphNode>,
    links: IndexSet<SimpleLink>,
}

#[derive(Deserialize)]
struct GraphRecord {
    nodes: Vec<GraphNode>,
    links: Vec<SimpleLink>,
}

impl TryFrom<GraphRecord> for Graph {
    type Error = GraphError;

    fn try_from(record: GraphRecord) -> Result<Self, Self::Error> {
        let mut graph = Graph::new();
        for node in record.nodes {
            graph.push_node(node.index, node.title)?;
        }
        for link in record.links {
            if link.target() >= graph.node_count() {
                return Err(GraphError::UnknownNote(link.target()));
            }
            if !link.is_self_loop() {
                graph.links.insert(link);
            }
        }
        Ok(graph)
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn links(&self) -> impl ExactSizeIterator<Item = &SimpleLink> {
        self.links.iter()
    }

    pub fn node(&self, index: usize) -> Option<&GraphNode> {
        self.nodes.get(index)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains_link(&self, a: usize, b: usize) -> bool {
        self.links.contains(&SimpleLink::new(a, b))
    }

    /// Append a node. The index must equal the current node count.
    pub(crate) fn push_node(&mut self, index: usize, title: String) -> Result<(), GraphError> {
        let expected = self.nodes.len();
        if index != expected {
            return Err(GraphError::NonDenseIndex {
                expected,
                found: index,
            });
        }
        self.nodes.push(GraphNode { index, title });
        Ok(())
    }

    /// Insert the normalized link between `a` and `b`. Returns false when an
    /// equal link is already present.
    pub(crate) fn insert_link(&mut self, a: usize, b: usize) -> bool {
        debug_assert_ne!(a, b, "self-loops are never graph edges");
        debug_assert!(a.max(b) < self.nodes.len(), "link endpoint out of range");
        self.links.insert(SimpleLink::new(a, b))
    }

    /// Number of links incident to each node, indexed by node index.
    pub fn degrees(&self) -> Vec<usize> {
        let mut degrees = vec![0; self.nodes.len()];
        for link in &self.links {
            degrees[link.source] += 1;
            degrees[link.target] += 1;
        }
        degrees
    }
}

// ============================================================================
// Build Diagnostics
// ============================================================================

/// A reference from a note to a title that no note carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DanglingLink {
    pub source_index: usize,
    pub source_title: String,
    pub target: String,
}

impl std::fmt::Display for DanglingLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "\"{}\" links to missing target \"{}\"",
            self.source_title, self.target
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub graph: Graph,
    pub dangling: Vec<DanglingLink>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_link_normalizes() {
        let link = SimpleLink::new(5, 2);
        assert_eq!(link.source(), 2);
        assert_eq!(link.target(), 5);
        assert_eq!(link, SimpleLink::new(2, 5));
    }

    #[test]
    fn test_insert_link_deduplicates_reversed_pair() {
        let mut graph = Graph::new();
        graph.push_node(0, "a".into()).unwrap();
        graph.push_node(1, "b".into()).unwrap();
        assert!(graph.insert_link(0, 1));
        assert!(!graph.insert_link(1, 0));
        assert_eq!(graph.link_count(), 1);
        assert!(graph.contains_link(1, 0));
    }

    #[test]
    fn test_push_node_rejects_gap() {
        let mut graph = Graph::new();
        graph.push_node(0, "a".into()).unwrap();
        let err = graph.push_node(2, "c".into()).unwrap_err();
        assert!(matches!(
            err,
            GraphError::NonDenseIndex {
                expected: 1,
                found: 2
            }
        ));
    }

    #[test]
    fn test_degrees() {
        let mut graph = Graph::new();
        for (i, title) in ["a", "b", "c", "d"].iter().enumerate() {
            graph.push_node(i, title.to_string()).unwrap();
        }
        graph.insert_link(0, 1);
        graph.insert_link(1, 2);
        graph.insert_link(3, 1);
        assert_eq!(graph.degrees(), vec![1, 3, 1, 1]);
    }

    #[test]
    fn test_graph_json_shape() {
        let mut graph = Graph::new();
        graph.push_node(0, "A".into()).unwrap();
        graph.push_node(1, "B".into()).unwrap();
        graph.insert_link(1, 0);

        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [{"index": 0, "title": "A"}, {"index": 1, "title": "B"}],
                "links": [{"source": 0, "target": 1}],
            })
        );
    }

    #[test]
    fn test_graph_deserialize_normalizes_and_dedups() {
        let json = r#"{
            "nodes": [{"index": 0, "title": "A"}, {"index": 1, "title": "B"}],
            "links": [{"source": 1, "target": 0}, {"source": 0, "target": 1}, {"source": 1, "target": 1}]
        }"#;
        let graph: Graph = serde_json::from_str(json).unwrap();
        assert_eq!(graph.link_count(), 1);
        let link = graph.links().next().unwrap();
        assert_eq!((link.source(), link.target()), (0, 1));
    }

    #[test]
    fn test_graph_deserialize_rejects_out_of_range_link() {
        let json = r#"{
            "nodes": [{"index": 0, "title": "A"}],
            "links": [{"source": 0, "target": 3}]
        }"#;
        assert!(serde_json::from_str::<Graph>(json).is_err());
    }

    #[test]
    fn test_dangling_link_display() {
        let dangling = DanglingLink {
            source_index: 2,
            source_title: "C".into(),
            target: "D".into(),
        };
        assert_eq!(dangling.to_string(), "\"C\" links to missing target \"D\"");
    }
}
