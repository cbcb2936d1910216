use assertables::*;
use itertools::Itertools;
use rstest::*;

use super::*;
use crate::contraction_hierarchies::ContractionParameters;
use crate::errors::QueryError;
use crate::graph::{
    DirectedDynamicGraph,
    Direction,
};
use crate::model::RoadNetwork;
use crate::restrictions::{
    FnRestrictions,
    NoRestrictions,
    RestrictionTable,
};
use crate::testutils::*;
use crate::weights::DefaultWeightHandler;

/// `network` with `restrictions` in place of its own.
fn with_restrictions(mut network: RoadNetwork, restrictions: &[&[u32]]) -> RoadNetwork {
    network.restrictions = restrictions.iter().map(|sequence| sequence.to_vec()).collect();
    network
}

/// Query `graph` with the restrictions of `network`.
fn restricted_route(network: &RoadNetwork, graph: &DirectedDynamicGraph, from: u32, to: u32) -> Option<Route> {
    route(graph, &network.restriction_table(), from, to)
}

/// 0 - 1 - 2 with uneven weights.
#[fixture]
fn path_network() -> RoadNetwork {
    network(3, &[(0, 1, 10.0), (1, 2, 20.0)])
}

/// [`path_network`] with 1 contracted first.
#[fixture]
fn contracted_path(path_network: RoadNetwork) -> DirectedDynamicGraph {
    contract(&path_network, Some(&[1, 0, 2]))
}

/// A short way 0 - 1 - 2 and a long way 0 - 3 - 2.
#[fixture]
fn two_ways() -> RoadNetwork {
    network(4, &[(0, 1, 1.0), (1, 2, 1.0), (0, 3, 2.0), (3, 2, 2.0)])
}

/// 0 enters 1 and 3 leaves it, both one-way; 2 is a dead end off 1.  Turning 0 -> 1 -> 3 is
/// forbidden, so 0 can only reach 3 by turning around at 2.
#[fixture]
fn dead_end() -> RoadNetwork {
    let network = directed_network(
        4,
        &[(0, 1, 1.0, Direction::Forward), (1, 2, 1.0, Direction::Both), (1, 3, 1.0, Direction::Forward)],
    );
    with_restrictions(network, &[&[0, 1, 3]])
}

/// Like `dead_end`, with the dead end two segments long: 1 - 2 - 4.
#[fixture]
fn long_dead_end() -> RoadNetwork {
    let network = directed_network(
        5,
        &[
            (0, 1, 1.0, Direction::Forward),
            (1, 2, 1.0, Direction::Both),
            (2, 4, 1.0, Direction::Both),
            (1, 3, 1.0, Direction::Forward),
        ],
    );
    with_restrictions(network, &[&[0, 1, 3]])
}

#[rstest]
fn test_route_over_shortcut(contracted_path: DirectedDynamicGraph) {
    let route = unrestricted_route(&contracted_path, 0, 2).unwrap();
    assert_eq!(route, Route { weight: 30.0, vertices: vec![0, 1, 2] });

    let route = unrestricted_route(&contracted_path, 2, 0).unwrap();
    assert_eq!(route, Route { weight: 30.0, vertices: vec![2, 1, 0] });
}

#[rstest]
#[case::down(0, 1, 10.0, vec![0, 1])]
#[case::up(1, 2, 20.0, vec![1, 2])]
#[case::same(1, 1, 0.0, vec![1])]
fn test_route_without_shortcuts(
    contracted_path: DirectedDynamicGraph,
    #[case] from: u32,
    #[case] to: u32,
    #[case] weight: f32,
    #[case] vertices: Vec<u32>,
) {
    assert_eq!(unrestricted_route(&contracted_path, from, to), Some(Route { weight, vertices }));
}

#[rstest]
fn test_sources_keep_their_weight(contracted_path: DirectedDynamicGraph) {
    let mut query = BidirectionalDykstra::new(
        &contracted_path,
        &DefaultWeightHandler,
        &NoRestrictions,
        &[EdgePath::with_weight(0, 5.0), EdgePath::with_weight(1, 30.0)],
        &[EdgePath::new(2)],
    );
    assert!(query.run());
    assert_eq!(query.best().unwrap(), 35.0);
    assert_eq!(query.get_path().unwrap(), vec![0, 1, 2]);
}

#[rstest]
fn test_results_before_run(contracted_path: DirectedDynamicGraph) {
    let query = BidirectionalDykstra::between(&contracted_path, &DefaultWeightHandler, &NoRestrictions, 0, 2);
    assert_eq!(query.status(), QueryStatus::NotRun);
    assert_eq!(query.best(), Err(QueryError::NotRun));
    assert_eq!(query.get_path(), Err(QueryError::NotRun));
}

#[rstest]
fn test_unreachable_target() {
    let network = network(4, &[(0, 1, 1.0), (2, 3, 1.0)]);
    let graph = contract(&network, None);

    let mut query = BidirectionalDykstra::between(&graph, &DefaultWeightHandler, &NoRestrictions, 0, 3);
    assert!(!query.run());
    assert_eq!(query.status(), QueryStatus::Failed);
    assert_eq!(query.route(), Err(QueryError::NoRoute));
}

#[rstest]
fn test_restriction_forces_detour(two_ways: RoadNetwork) {
    let restricted = with_restrictions(two_ways.clone(), &[&[0, 1, 2]]);
    let graph = contract(&restricted, Some(&[1, 3, 0, 2]));

    let detour = restricted_route(&restricted, &graph, 0, 2).unwrap();
    assert_eq!(detour, Route { weight: 4.0, vertices: vec![0, 3, 2] });
    assert_eq!(Some(detour.weight), turn_aware_weight(&restricted, 0, 2));

    // the restriction only covers one direction
    let back = restricted_route(&restricted, &graph, 2, 0).unwrap();
    assert_eq!(back, Route { weight: 2.0, vertices: vec![2, 1, 0] });

    let unrestricted = contract(&two_ways, Some(&[1, 3, 0, 2]));
    assert_eq!(unrestricted_route(&unrestricted, 0, 2).unwrap().weight, 2.0);
}

#[rstest]
fn test_restriction_without_alternative() {
    let restricted = with_restrictions(network(3, &[(0, 1, 1.0), (1, 2, 1.0)]), &[&[0, 1, 2]]);
    let graph = contract(&restricted, Some(&[1, 0, 2]));

    assert_none!(restricted_route(&restricted, &graph, 0, 2));
    assert_none!(turn_aware_weight(&restricted, 0, 2));
    assert_eq!(restricted_route(&restricted, &graph, 2, 0).unwrap().weight, 2.0);
}

#[rstest]
fn test_no_u_turn_at_dead_end(dead_end: RoadNetwork) {
    let graph = contract(&dead_end, Some(&[1, 0, 3, 2]));

    assert_none!(restricted_route(&dead_end, &graph, 0, 3));
    assert_none!(turn_aware_weight(&dead_end, 0, 3));
    assert_eq!(restricted_route(&dead_end, &graph, 0, 2).unwrap().vertices, vec![0, 1, 2]);
    assert_eq!(restricted_route(&dead_end, &graph, 2, 3).unwrap().vertices, vec![2, 1, 3]);
}

#[rstest]
fn test_dead_end_without_restriction(dead_end: RoadNetwork) {
    let open = RoadNetwork { restrictions: vec![], ..dead_end };
    let graph = contract(&open, Some(&[1, 0, 3, 2]));
    assert_eq!(unrestricted_route(&graph, 0, 3), Some(Route { weight: 2.0, vertices: vec![0, 1, 3] }));
}

#[rstest]
fn test_no_u_turn_at_long_dead_end(long_dead_end: RoadNetwork) {
    let graph = contract(&long_dead_end, Some(&[2, 1, 0, 3, 4]));

    // the shortcut 0 -> 4 enters 4 from 2, which is not its contracted vertex
    let shortcut = graph.edges(0).next().unwrap();
    assert_eq!(shortcut.contracted(), Some(1));
    assert_gt!(shortcut.dynamic().len(), 1);

    assert_none!(restricted_route(&long_dead_end, &graph, 0, 3));
    assert_eq!(restricted_route(&long_dead_end, &graph, 0, 4).unwrap().vertices, vec![0, 1, 2, 4]);
    assert_eq!(restricted_route(&long_dead_end, &graph, 4, 3).unwrap().vertices, vec![4, 2, 1, 3]);
}

#[rstest]
#[case::small(3, 3)]
#[case::wide(6, 2)]
#[case::square(5, 5)]
fn test_all_pairs_match_dijkstra(#[case] width: u32, #[case] height: u32) {
    let grid = grid_network(width, height);
    let graph = contract(&grid, None);

    for from in 0..grid.vertex_count {
        let expected = dijkstra_weights(&grid, from);
        for to in 0..grid.vertex_count {
            let found = unrestricted_route(&graph, from, to);
            assert_eq!(found.as_ref().map(|route| route.weight), expected[to as usize], "{from} -> {to}");

            if let Some(route) = found {
                assert_eq!(route.vertices.first(), Some(&from));
                assert_eq!(route.vertices.last(), Some(&to));
                assert_eq!(path_weight(&grid, &route.vertices), Some(route.weight), "{from} -> {to}");
            }
        }
    }
}

#[rstest]
fn test_dykstra_forward(contracted_path: DirectedDynamicGraph) {
    let mut search = Dykstra::new(&contracted_path, &DefaultWeightHandler, &NoRestrictions, &[EdgePath::new(0)], false);
    assert_eq!(search.path(2), Err(QueryError::NotRun));

    search.run();
    assert_eq!(search.status(), QueryStatus::Succeeded);
    assert_eq!(search.weight(2), Some(30.0));
    assert_eq!(search.path(2).unwrap(), vec![0, 1, 2]);
    assert_none!(search.weight(1));
    assert_eq!(search.path(1), Err(QueryError::NoRoute));

    let visits = search.visits(2);
    assert_eq!(visits.len(), 1);
    assert_eq!(visits[0].weight, 30.0);
    assert!(!visits[0].edge.is_none());
}

#[rstest]
fn test_dykstra_backward(contracted_path: DirectedDynamicGraph) {
    let mut search = Dykstra::new(&contracted_path, &DefaultWeightHandler, &NoRestrictions, &[EdgePath::new(1)], true);
    search.run();

    assert_eq!(search.weight(0), Some(10.0));
    assert_eq!(search.weight(2), Some(20.0));
    assert_eq!(search.path(0).unwrap(), vec![0, 1]);
}

#[rstest]
fn test_dykstra_max_weight(contracted_path: DirectedDynamicGraph) {
    let mut search = Dykstra::new(&contracted_path, &DefaultWeightHandler, &NoRestrictions, &[EdgePath::new(1)], true)
        .with_max_weight(15.0);
    search.run();

    assert_eq!(search.weight(0), Some(10.0));
    assert_none!(search.weight(2));
}

#[rstest]
fn test_expand_edge(contracted_path: DirectedDynamicGraph) {
    let shortcut = contracted_path.edges(0).next().unwrap();
    let expand = |from, to, id| expand_edge(&contracted_path, &DefaultWeightHandler, &NoRestrictions, from, to, id);
    assert_eq!(expand(0, 2, shortcut.id()).unwrap(), vec![1, 2]);

    let backward = crate::graph::DirectedEdgeId::backward(shortcut.index());
    assert_eq!(expand(2, 0, backward).unwrap(), vec![1, 0]);

    let mismatched = expand(0, 1, shortcut.id());
    assert!(matches!(mismatched, Err(crate::errors::GraphError::InvalidEdgeId(_))));
}

#[rstest]
fn test_restrictions_from_table_and_closure(two_ways: RoadNetwork) {
    let restricted = with_restrictions(two_ways, &[&[0, 1, 2]]);
    let graph = contract(&restricted, Some(&[1, 3, 0, 2]));

    let table: RestrictionTable = restricted.restrictions.iter().cloned().collect();
    let closure = FnRestrictions::new(|vertex: u32| {
        if vertex <= 2 {
            vec![vec![0, 1, 2]]
        } else {
            vec![]
        }
    });
    assert_eq!(route(&graph, &table, 0, 2).unwrap().weight, 4.0);
    assert_eq!(route(&graph, &closure, 0, 2).unwrap().weight, 4.0);
}

#[rstest]
fn test_original_edges_of_shortcut(contracted_path: DirectedDynamicGraph) {
    let shortcut = contracted_path.edges(0).next().unwrap();
    let edges = original_edges(&contracted_path, &DefaultWeightHandler, &NoRestrictions, 0, 2, shortcut.id()).unwrap();
    assert_eq!(edges, vec![OriginalEdge { vertex1: 0, vertex2: 1 }, OriginalEdge { vertex1: 1, vertex2: 2 }]);

    let route = unrestricted_route(&contracted_path, 2, 0).unwrap();
    assert_eq!(route.original_edges(), vec![OriginalEdge { vertex1: 2, vertex2: 1 }, OriginalEdge { vertex1: 1, vertex2: 0 }]);
}

#[rstest]
fn test_route_of_one_vertex_has_no_original_edges(contracted_path: DirectedDynamicGraph) {
    let route = unrestricted_route(&contracted_path, 1, 1).unwrap();
    assert!(route.original_edges().is_empty());
}

#[rstest]
#[case::by_priority(None)]
#[case::middle_first(Some(vec![1, 2, 0, 3]))]
#[case::ends_first(Some(vec![0, 3, 1, 2]))]
fn test_four_vertex_restriction(#[case] order: Option<Vec<u32>>) {
    let restricted = with_restrictions(network(4, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]), &[&[0, 1, 2, 3]]);
    let graph = contract(&restricted, order.as_deref());

    assert_none!(restricted_route(&restricted, &graph, 0, 3));
    assert_none!(turn_aware_weight(&restricted, 0, 3));
    assert_eq!(restricted_route(&restricted, &graph, 3, 0), Some(Route { weight: 3.0, vertices: vec![3, 2, 1, 0] }));
    assert_eq!(restricted_route(&restricted, &graph, 1, 3).unwrap().weight, 2.0);
    assert_eq!(restricted_route(&restricted, &graph, 0, 2).unwrap().weight, 2.0);
}

#[rstest]
#[case::by_priority(None)]
#[case::middle_first(Some(vec![1, 2, 4, 0, 3]))]
fn test_four_vertex_restriction_forces_detour(#[case] order: Option<Vec<u32>>) {
    let network = network(5, &[(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0), (0, 4, 2.0), (4, 3, 2.0)]);
    let restricted = with_restrictions(network, &[&[0, 1, 2, 3]]);
    let graph = contract(&restricted, order.as_deref());

    let detour = restricted_route(&restricted, &graph, 0, 3).unwrap();
    assert_eq!(detour, Route { weight: 4.0, vertices: vec![0, 4, 3] });
    assert_eq!(Some(detour.weight), turn_aware_weight(&restricted, 0, 3));
    assert_eq!(restricted_route(&restricted, &graph, 3, 0).unwrap().weight, 3.0);
}

#[rstest]
#[case::small(4, 4, ContractionParameters::default())]
#[case::wide(5, 3, ContractionParameters::default())]
#[case::square(5, 5, ContractionParameters::default())]
#[case::bounded_witness(5, 5, ContractionParameters { max_witness_hops: 3, ..ContractionParameters::default() })]
#[case::edge_based(5, 4, ContractionParameters::edge_based())]
fn test_restricted_grid_matches_turn_aware_dijkstra(
    #[case] width: u32,
    #[case] height: u32,
    #[case] parameters: ContractionParameters,
) {
    let grid = restricted_grid(width, height);
    assert!(grid.restrictions.iter().any(|sequence| sequence.len() == 4));
    let graph = contract_with(&grid, &parameters, None);
    let restrictions = grid.restriction_table();

    for from in 0..grid.vertex_count {
        for to in 0..grid.vertex_count {
            let found = route(&graph, &restrictions, from, to);
            let expected = turn_aware_route(&grid, from, to);

            if let Some(found) = &found {
                assert_eq!(found.vertices.first(), Some(&from));
                assert_eq!(found.vertices.last(), Some(&to));
                assert_eq!(path_weight(&grid, &found.vertices), Some(found.weight), "{from} -> {to}");
                assert!(is_legal_route(&grid, &found.vertices), "{from} -> {to}: {:?}", found.vertices);

                let best = expected.as_ref().map_or(f32::INFINITY, |route| route.weight);
                assert_ge!(found.weight, best, "{from} -> {to}");
            }
            if let Some(expected) = expected.filter(|route| route.vertices.iter().all_unique()) {
                assert_eq!(found.map(|route| route.weight), Some(expected.weight), "{from} -> {to}");
            }
        }
    }
}
