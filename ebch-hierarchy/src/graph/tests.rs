use assertables::*;
use rstest::*;

use super::*;
use crate::errors::GraphError;
use crate::weights::DefaultWeightHandler;

/// Neighbours of the edges stored at `vertex`, in storage order.
fn neighbours(graph: &DirectedDynamicGraph, vertex: u32) -> Vec<u32> {
    graph.edges(vertex).map(|edge| edge.neighbour()).collect()
}

/// Decoded edges stored at `vertex`.
fn edges_at(graph: &DirectedDynamicGraph, vertex: u32) -> Vec<(u32, EdgeData<f32>)> {
    graph
        .edges(vertex)
        .map(|edge| (edge.neighbour(), EdgeData::read(&DefaultWeightHandler, &edge).unwrap()))
        .collect()
}

/// Four isolated vertices, one fixed word per edge.
#[fixture]
fn graph() -> DirectedDynamicGraph {
    DirectedDynamicGraph::with_vertices(4, 1)
}

#[rstest]
#[case::zero(0.0, Direction::Both)]
#[case::fraction(0.5, Direction::Forward)]
#[case::large(1_000_000.0, Direction::Backward)]
fn test_weight_word_round_trip(#[case] weight: f32, #[case] direction: Direction) {
    let word = serialize(weight, direction).unwrap();
    assert_eq!(deserialize(word), (weight, direction));
}

#[rstest]
#[case::negative(-0.1)]
#[case::nan(f32::NAN)]
#[case::too_large(MAX_WEIGHT * 2.0)]
fn test_weight_out_of_range(#[case] weight: f32) {
    assert!(matches!(serialize(weight, Direction::Both), Err(GraphError::WeightOutOfRange(_))));
}

#[rstest]
fn test_weight_is_rounded_to_precision() {
    let word = serialize(2.26, Direction::Both).unwrap();
    assert_eq!(deserialize(word).0, 2.3);
}

#[rstest]
fn test_dynamic_words_layout() {
    assert_is_empty!(encode_dynamic(&EdgeKind::Original));
    assert_eq!(encode_dynamic(&EdgeKind::shortcut(5, vec![5], vec![5])), vec![5]);
    assert_eq!(encode_dynamic(&EdgeKind::shortcut(5, vec![7], vec![5])), vec![5, 1, 7]);
    assert_eq!(encode_dynamic(&EdgeKind::shortcut(5, vec![5], vec![8, 9])), vec![5, 0, 8, 9]);
    assert_eq!(encode_dynamic(&EdgeKind::shortcut(5, vec![1, 2], vec![3])), vec![5, 2, 1, 2, 3]);
}

#[rstest]
fn test_dynamic_words_round_trip() {
    for kind in [
        EdgeKind::Original,
        EdgeKind::shortcut(5, vec![], vec![]),
        EdgeKind::shortcut(5, vec![7], vec![]),
        EdgeKind::shortcut(5, vec![], vec![8, 9]),
        EdgeKind::shortcut(5, vec![1, 2], vec![3, 4]),
    ] {
        assert_eq!(decode_dynamic(0, &encode_dynamic(&kind)).unwrap(), kind);
    }
}

#[rstest]
fn test_corrupt_dynamic_words() {
    assert!(matches!(decode_dynamic(3, &[5, 4, 1]), Err(GraphError::CorruptEdgeData { edge: 3, .. })));
}

#[rstest]
fn test_implicit_sequences_read_back_as_contracted() {
    let shortcut = Shortcut::new(5, vec![], vec![]);
    assert_eq!(shortcut.sequence1(), vec![5]);
    assert_eq!(shortcut.sequence2(), vec![5]);
    assert_eq!(Shortcut::new(5, vec![5], vec![5]), shortcut);
}

#[rstest]
fn test_reversed_shortcut_swaps_and_reverses_sequences() {
    let shortcut = Shortcut::new(5, vec![1, 2], vec![3]);
    let reversed = shortcut.reversed();
    assert_eq!(reversed.sequence1(), vec![3]);
    assert_eq!(reversed.sequence2(), vec![2, 1]);
    assert_eq!(reversed.reversed(), shortcut);
}

#[rstest]
fn test_add_and_enumerate(mut graph: DirectedDynamicGraph) {
    graph.add_edge(0, 1, &[10], &[]).unwrap();
    graph.add_edge(0, 2, &[20], &[3]).unwrap();
    graph.add_edge(1, 0, &[10], &[]).unwrap();

    assert_eq!(graph.edge_count(), 3);
    assert_eq!(neighbours(&graph, 0), vec![1, 2]);
    assert_eq!(neighbours(&graph, 1), vec![0]);
    assert_is_empty!(neighbours(&graph, 3));
    assert_is_empty!(neighbours(&graph, 42));

    let edges: Vec<_> = graph.edges(0).collect();
    assert!(edges[0].is_original());
    assert_eq!(edges[0].contracted(), None);
    assert_eq!(edges[1].fixed(), &[20]);
    assert_eq!(edges[1].contracted(), Some(3));
}

#[rstest]
fn test_add_edge_grows_the_graph() {
    let mut graph = DirectedDynamicGraph::new(1);
    graph.add_edge(2, 5, &[1], &[]).unwrap();
    assert_eq!(graph.vertex_count(), 6);
}

#[rstest]
fn test_add_edge_checks_fixed_size(mut graph: DirectedDynamicGraph) {
    assert_eq!(
        graph.add_edge(0, 1, &[1, 2], &[]),
        Err(GraphError::FixedSizeMismatch { expected: 1, actual: 2 })
    );
}

#[rstest]
fn test_blocks_relocate_when_full(mut graph: DirectedDynamicGraph) {
    for i in 0..20 {
        graph.add_edge(0, 1 + i % 3, &[i], &[]).unwrap();
        graph.add_edge(1, 2, &[100 + i], &[i, 0]).unwrap();
    }

    let fixed: Vec<u32> = graph.edges(0).map(|edge| edge.fixed()[0]).collect();
    assert_eq!(fixed, (0..20).collect::<Vec<_>>());
    let dynamic: Vec<u32> = graph.edges(1).map(|edge| edge.dynamic()[0]).collect();
    assert_eq!(dynamic, (0..20).collect::<Vec<_>>());
}

#[rstest]
fn test_remove_edge_removes_all_parallel_edges(mut graph: DirectedDynamicGraph) {
    graph.add_edge(0, 1, &[1], &[]).unwrap();
    graph.add_edge(0, 2, &[2], &[]).unwrap();
    graph.add_edge(0, 1, &[3], &[2]).unwrap();

    assert_eq!(graph.remove_edge(0, 1), 2);
    assert_eq!(graph.remove_edge(0, 1), 0);
    assert_eq!(neighbours(&graph, 0), vec![2]);
    assert_eq!(graph.edge_count(), 1);
}

#[rstest]
fn test_retain_and_remove_edges(mut graph: DirectedDynamicGraph) {
    for to in 1..4 {
        graph.add_edge(0, to, &[to], &[]).unwrap();
    }
    assert_eq!(graph.retain_edges(0, |edge| edge.neighbour() != 2), 1);
    assert_eq!(neighbours(&graph, 0), vec![1, 3]);
    assert_eq!(graph.remove_edges(0), 2);
    assert_eq!(graph.edge_count(), 0);
}

#[rstest]
fn test_compress_keeps_edges_in_order(mut graph: DirectedDynamicGraph) {
    for i in 0..12 {
        graph.add_edge(i % 3, 3, &[i], &[]).unwrap();
    }
    graph.remove_edge(1, 3);
    let before: Vec<Vec<u32>> = (0..4).map(|v| graph.edges(v).map(|e| e.fixed()[0]).collect()).collect();

    graph.compress();

    let after: Vec<Vec<u32>> = (0..4).map(|v| graph.edges(v).map(|e| e.fixed()[0]).collect()).collect();
    assert_eq!(before, after);
    assert_eq!(graph.edge_count(), 8);

    // blocks are tight and in vertex order, so the first edge of vertex 0 sits at offset 0
    assert_eq!(graph.edges(0).next().unwrap().index(), 0);
}

#[rstest]
fn test_edge_by_directed_id(mut graph: DirectedDynamicGraph) {
    graph.add_edge(0, 1, &[1], &[]).unwrap();
    let index = graph.add_edge(0, 2, &[2], &[]).unwrap();

    assert_eq!(graph.edge(DirectedEdgeId::forward(index)).unwrap().neighbour(), 2);
    assert_eq!(graph.edge(DirectedEdgeId::backward(index)).unwrap().neighbour(), 2);
    assert_eq!(graph.edge(NO_EDGE).unwrap_err(), GraphError::InvalidEdgeId(0));
    assert!(matches!(graph.edge(DirectedEdgeId(10_000)), Err(GraphError::InvalidEdgeId(10_000))));
}

#[rstest]
fn test_directed_edge_id_sign() {
    let id = DirectedEdgeId::backward(4);
    assert_eq!(id.0, -5);
    assert!(!id.is_forward());
    assert_eq!(id.index().unwrap(), 4);
    assert!(NO_EDGE.is_none());
}

#[rstest]
fn test_sequences_of_original_edge(mut graph: DirectedDynamicGraph) {
    let index = graph.add_edge(0, 1, &[1], &[]).unwrap();
    let edge = graph.edge(DirectedEdgeId::forward(index)).unwrap();
    assert_eq!(edge.sequence1(), Err(GraphError::NotAShortcut(index)));
    assert_is_empty!(edge.leading());
    assert_is_empty!(edge.trailing());
}

#[rstest]
fn test_add_edge_reproduces_sequences(mut graph: DirectedDynamicGraph) {
    let data = EdgeData::shortcut(3.0, Direction::Forward, 2, vec![1, 2], vec![3]);
    let index = add_edge(&mut graph, &DefaultWeightHandler, 0, 3, &data).unwrap();

    let edge = graph.edge(DirectedEdgeId::forward(index)).unwrap();
    assert!(!edge.is_original());
    assert_eq!(edge.sequence1().unwrap(), vec![1, 2]);
    assert_eq!(edge.sequence2().unwrap(), vec![3]);
    assert_eq!(edge.leading(), vec![1, 2]);
    assert_eq!(edge.trailing(), vec![3]);
    assert_eq!(EdgeData::read(&DefaultWeightHandler, &edge).unwrap(), data);
}

#[rstest]
fn test_add_or_update_is_idempotent(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    let data = EdgeData::shortcut(4.0, Direction::Both, 2, vec![], vec![]);
    let update = add_or_update_edge(&mut graph, &handler, 0, 1, &data, false).unwrap();
    assert_eq!(update, EdgeUpdate { added: 1, removed: 0 });

    let snapshot = edges_at(&graph, 0);
    for weight in [4.0, 5.0] {
        let again = EdgeData::shortcut(weight, Direction::Forward, 3, vec![], vec![]);
        assert!(!add_or_update_edge(&mut graph, &handler, 0, 1, &again, false).unwrap().changed());
        assert!(!add_or_update_edge(&mut graph, &handler, 0, 1, &data, false).unwrap().changed());
    }
    assert_eq!(edges_at(&graph, 0), snapshot);
}

#[rstest]
fn test_add_or_update_splits_directions(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(4.0, Direction::Both, 1, vec![], vec![]), false)
        .unwrap();
    let update =
        add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(2.0, Direction::Forward, 3, vec![], vec![]), false)
            .unwrap();
    assert_eq!(update, EdgeUpdate { added: 2, removed: 1 });

    assert_eq!(
        edges_at(&graph, 0),
        vec![
            (2, EdgeData::shortcut(2.0, Direction::Forward, 3, vec![], vec![])),
            (2, EdgeData::shortcut(4.0, Direction::Backward, 1, vec![], vec![])),
        ]
    );
}

#[rstest]
fn test_add_or_update_merges_identical_directions(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(5.0, Direction::Both, 1, vec![], vec![]), false)
        .unwrap();
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(3.0, Direction::Forward, 1, vec![], vec![]), false)
        .unwrap();
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(3.0, Direction::Backward, 1, vec![], vec![]), false)
        .unwrap();

    assert_eq!(edges_at(&graph, 0), vec![(2, EdgeData::shortcut(3.0, Direction::Both, 1, vec![], vec![]))]);
}

#[rstest]
fn test_add_or_update_does_not_merge_different_content(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(3.0, Direction::Forward, 1, vec![], vec![]), false)
        .unwrap();
    add_or_update_edge(&mut graph, &handler, 0, 2, &EdgeData::shortcut(3.0, Direction::Backward, 3, vec![], vec![]), false)
        .unwrap();
    assert_eq!(edges_at(&graph, 0).len(), 2);
}

#[rstest]
fn test_add_or_update_with_hops_keeps_distinct_hops(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    let via_one = EdgeData::shortcut(3.0, Direction::Both, 1, vec![], vec![]);
    let via_three = EdgeData::shortcut(5.0, Direction::Both, 3, vec![], vec![]);

    add_or_update_edge(&mut graph, &handler, 0, 2, &via_one, true).unwrap();
    assert!(add_or_update_edge(&mut graph, &handler, 0, 2, &via_three, true).unwrap().changed());
    assert_eq!(edges_at(&graph, 0).len(), 2);

    // without hop matching the heavier edge is dominated and dropped
    let mut plain = DirectedDynamicGraph::with_vertices(4, 1);
    add_or_update_edge(&mut plain, &handler, 0, 2, &via_one, false).unwrap();
    assert!(!add_or_update_edge(&mut plain, &handler, 0, 2, &via_three, false).unwrap().changed());
    assert_eq!(edges_at(&plain, 0).len(), 1);
}

#[rstest]
fn test_add_or_update_with_hops_compares_whole_sequences(mut graph: DirectedDynamicGraph) {
    let handler = DefaultWeightHandler;
    let through_five = EdgeData::shortcut(3.0, Direction::Forward, 1, vec![4, 5], vec![1]);
    let through_six = EdgeData::shortcut(5.0, Direction::Forward, 1, vec![4, 6], vec![1]);

    add_or_update_edge(&mut graph, &handler, 0, 2, &through_five, true).unwrap();
    assert!(add_or_update_edge(&mut graph, &handler, 0, 2, &through_six, true).unwrap().changed());
    assert_eq!(edges_at(&graph, 0).len(), 2);

    let lighter = EdgeData::shortcut(2.0, Direction::Forward, 1, vec![4, 6], vec![1]);
    assert_eq!(add_or_update_edge(&mut graph, &handler, 0, 2, &lighter, true).unwrap(), EdgeUpdate { added: 1, removed: 1 });
    assert_eq!(edges_at(&graph, 0), vec![(2, through_five), (2, lighter)]);
}

#[rstest]
#[case::original(vec![], vec![], vec![])]
#[case::implicit(vec![5], vec![5], vec![5])]
#[case::leading_only(vec![5, 1, 7], vec![7], vec![5])]
#[case::trailing_only(vec![5, 0, 8, 9], vec![5], vec![8, 9])]
#[case::both(vec![5, 2, 1, 2, 3], vec![1, 2], vec![3])]
fn test_resolved_sequences_from_words(#[case] words: Vec<u32>, #[case] leading: Vec<u32>, #[case] trailing: Vec<u32>) {
    let mut graph = DirectedDynamicGraph::with_vertices(2, 1);
    let index = graph.add_edge(0, 1, &[0], &words).unwrap();
    let edge = graph.edge(DirectedEdgeId::forward(index)).unwrap();
    assert_eq!(edge.leading(), leading);
    assert_eq!(edge.trailing(), trailing);
    assert_eq!(edge.kind().unwrap().sequences(), (leading, trailing));
}

#[rstest]
fn test_abandoned_blocks_stay_within_twice_the_reserved_words(mut graph: DirectedDynamicGraph) {
    for i in 0..200 {
        let dynamic: Vec<u32> = (0..i % 4).collect();
        graph.add_edge(i % 4, (i + 1) % 4, &[i], &dynamic).unwrap();
        assert_lt!(graph.allocated_words(), 2 * graph.reserved_words());
    }
    for vertex in 0..4 {
        graph.retain_edges(vertex, |edge| edge.fixed()[0] % 2 == 0);
        graph.add_edge(vertex, 0, &[0], &[1, 2, 3]).unwrap();
    }
    assert_lt!(graph.allocated_words(), 2 * graph.reserved_words());

    graph.compress();
    assert_eq!(graph.allocated_words(), graph.reserved_words());
    assert_eq!(graph.edge_count(), 104);
}
