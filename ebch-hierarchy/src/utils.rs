//! Visualisation helpers for dynamic graphs.

use std::fs::File;
use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};

use ebch_core::errors::Result;
use petgraph::dot::Dot;
use petgraph::graph::{
    DiGraph,
    NodeIndex,
};
use tracing::{
    debug,
    instrument,
};

use crate::graph::DirectedDynamicGraph;
use crate::weights::WeightHandler;

/// Copy a dynamic graph into a petgraph graph, one petgraph edge per stored edge record.
///
/// Nodes are labelled with their vertex id, edges with weight, direction and, for shortcuts, the
/// contracted vertex.
pub fn to_petgraph<H: WeightHandler>(graph: &DirectedDynamicGraph, handler: &H) -> DiGraph<u32, String> {
    let mut petgraph = DiGraph::with_capacity(graph.vertex_count() as usize, graph.edge_count());
    for vertex in 0..graph.vertex_count() {
        petgraph.add_node(vertex);
    }

    for vertex in 0..graph.vertex_count() {
        for edge in graph.edges(vertex) {
            let (weight, direction) = handler.weight(edge.fixed());
            let label = match edge.contracted() {
                Some(via) => format!("{weight} {direction:?} via {via}"),
                None => format!("{weight} {direction:?}"),
            };
            petgraph.add_edge(NodeIndex::new(vertex as usize), NodeIndex::new(edge.neighbour() as usize), label);
        }
    }
    petgraph
}

/// Render `graph` in DOT format into `output_dir/filename`.
#[instrument(skip(graph, handler))]
pub fn write_dot_file<H: WeightHandler>(
    graph: &DirectedDynamicGraph,
    handler: &H,
    output_dir: &Path,
    filename: &str,
) -> Result<PathBuf> {
    let petgraph = to_petgraph(graph, handler);
    let dot_content = format!("{}", Dot::new(&petgraph));

    let file_path = output_dir.join(filename);
    let mut file = File::create(&file_path)?;
    write!(file, "{dot_content}")?;

    debug!("Graph written to: {}", file_path.display());
    Ok(file_path)
}

#[cfg(test)]
#[allow(clippy::missing_docs_in_private_items)]
mod tests {
    use assertables::*;
    use rstest::*;

    use super::*;
    use crate::graph::{
        add_edge,
        Direction,
        EdgeData,
    };
    use crate::weights::DefaultWeightHandler;

    #[fixture]
    fn graph() -> DirectedDynamicGraph {
        let handler = DefaultWeightHandler;
        let mut graph = DirectedDynamicGraph::with_vertices(3, 1);
        add_edge(&mut graph, &handler, 0, 1, &EdgeData::original(2.0, Direction::Both)).unwrap();
        add_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(5.0, Direction::Forward, 1, vec![1], vec![1])).unwrap();
        graph
    }

    #[rstest]
    fn test_to_petgraph(graph: DirectedDynamicGraph) {
        let petgraph = to_petgraph(&graph, &DefaultWeightHandler);
        assert_eq!(petgraph.node_count(), 3);
        assert_eq!(petgraph.edge_count(), 2);

        let labels: Vec<_> = petgraph.edge_weights().cloned().collect();
        assert_eq!(labels, vec!["2 Both".to_string(), "5 Forward via 1".to_string()]);
    }

    #[rstest]
    fn test_write_dot_file(graph: DirectedDynamicGraph) {
        let dir = tempfile::tempdir().unwrap();
        let path = write_dot_file(&graph, &DefaultWeightHandler, dir.path(), "hierarchy.dot").unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert_starts_with!(content, "digraph {");
        assert_contains!(content, "5 Forward via 1");
    }
}
