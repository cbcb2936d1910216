//! Network fixtures, reference shortest-path oracles and shorthand for contracting and querying.

use std::cmp::Reverse;
use std::collections::{
    BinaryHeap,
    HashSet,
};

use ordered_float::OrderedFloat;
use petgraph::algo::dijkstra;
use petgraph::graph::{
    DiGraph,
    NodeIndex,
};

use crate::contraction_hierarchies::{
    ContractionParameters,
    HierarchyBuilder,
};
use crate::graph::{
    DirectedDynamicGraph,
    Direction,
};
use crate::model::{
    RoadNetwork,
    Segment,
};
use crate::query::{
    BidirectionalDykstra,
    Route,
};
use crate::restrictions::{
    extend_history,
    is_legal_joint,
    NoRestrictions,
    RestrictionLookup,
};
use crate::weights::DefaultWeightHandler;

/// A network of two-way segments.
pub fn network(vertex_count: u32, segments: &[(u32, u32, f32)]) -> RoadNetwork {
    RoadNetwork {
        vertex_count,
        segments: segments
            .iter()
            .map(|&(from, to, weight)| Segment::new(from, to, weight, Direction::Both))
            .collect(),
        restrictions: vec![],
    }
}

/// A network with explicit segment directions.
pub fn directed_network(vertex_count: u32, segments: &[(u32, u32, f32, Direction)]) -> RoadNetwork {
    RoadNetwork {
        vertex_count,
        segments: segments
            .iter()
            .map(|&(from, to, weight, direction)| Segment::new(from, to, weight, direction))
            .collect(),
        restrictions: vec![],
    }
}

/// A `width` x `height` grid with uneven integer weights; every seventh segment is one-way.
pub fn grid_network(width: u32, height: u32) -> RoadNetwork {
    let mut segments = vec![];
    let mut count = 0;
    let mut push = |from: u32, to: u32| {
        let weight = f32::from(u8::try_from(1 + (from * 7 + to * 13) % 9).unwrap());
        let direction = if count % 7 == 3 { Direction::Forward } else { Direction::Both };
        segments.push(Segment::new(from, to, weight, direction));
        count += 1;
    };
    for y in 0..height {
        for x in 0..width {
            let vertex = y * width + x;
            if x + 1 < width {
                push(vertex, vertex + 1);
            }
            if y + 1 < height {
                push(vertex, vertex + width);
            }
        }
    }
    RoadNetwork { vertex_count: width * height, segments, restrictions: vec![] }
}

/// The uncontracted graph of `network`.
pub fn build(network: &RoadNetwork) -> DirectedDynamicGraph {
    network.build_graph(&DefaultWeightHandler).unwrap()
}

/// Build and contract `network` with its own restrictions, in `order` when given, else by priority.
pub fn contract(network: &RoadNetwork, order: Option<&[u32]>) -> DirectedDynamicGraph {
    contract_with(network, &ContractionParameters::default(), order)
}

/// Like [`contract`], with explicit parameters.
pub fn contract_with(network: &RoadNetwork, parameters: &ContractionParameters, order: Option<&[u32]>) -> DirectedDynamicGraph {
    let mut graph = build(network);
    let restrictions = network.restriction_table();
    let mut builder = HierarchyBuilder::new(&mut graph, &DefaultWeightHandler, &restrictions, parameters);
    match order {
        Some(order) => builder.run_with_order(order.iter().copied()).unwrap(),
        None => builder.run().unwrap(),
    }
    graph
}

/// Query a contracted graph; `None` when there is no route.
pub fn route<R: RestrictionLookup + ?Sized>(graph: &DirectedDynamicGraph, restrictions: &R, from: u32, to: u32) -> Option<Route> {
    let mut query = BidirectionalDykstra::between(graph, &DefaultWeightHandler, restrictions, from, to);
    query.run().then(|| query.route().unwrap())
}

/// Query a contracted graph that has no restrictions.
pub fn unrestricted_route(graph: &DirectedDynamicGraph, from: u32, to: u32) -> Option<Route> {
    route(graph, &NoRestrictions, from, to)
}

/// Plain Dijkstra over the original segments, ignoring restrictions.
pub fn dijkstra_weights(network: &RoadNetwork, from: u32) -> Vec<Option<f32>> {
    let mut graph = DiGraph::<u32, f32>::with_capacity(network.vertex_count as usize, network.segments.len() * 2);
    for vertex in 0..network.vertex_count {
        graph.add_node(vertex);
    }
    for segment in &network.segments {
        let (from, to) = (NodeIndex::new(segment.from as usize), NodeIndex::new(segment.to as usize));
        if segment.direction.forward() {
            graph.add_edge(from, to, segment.weight);
        }
        if segment.direction.backward() {
            graph.add_edge(to, from, segment.weight);
        }
    }

    let weights = dijkstra(&graph, NodeIndex::new(from as usize), None, |edge| *edge.weight());
    (0..network.vertex_count)
        .map(|vertex| weights.get(&NodeIndex::new(vertex as usize)).copied())
        .collect()
}

/// The weight of travelling `vertices` over the lightest segment between each consecutive pair;
/// `None` when some pair is not connected in travel direction.
pub fn path_weight(network: &RoadNetwork, vertices: &[u32]) -> Option<f32> {
    vertices.windows(2).try_fold(0.0, |total, pair| {
        network
            .segments
            .iter()
            .filter(|segment| {
                (segment.from == pair[0] && segment.to == pair[1] && segment.direction.forward())
                    || (segment.from == pair[1] && segment.to == pair[0] && segment.direction.backward())
            })
            .map(|segment| segment.weight)
            .min_by(f32::total_cmp)
            .map(|weight| total + weight)
    })
}

/// Dijkstra over `(vertex, recent history)` states of the original segments, honouring the
/// network's restrictions and never turning back.  The source and target are never checked
/// against restrictions, only the vertices in between.
pub fn turn_aware_route(network: &RoadNetwork, from: u32, to: u32) -> Option<Route> {
    let restrictions = network.restriction_table();
    let history_len = restrictions.history_len();
    let mut adjacency = vec![vec![]; network.vertex_count as usize];
    for segment in &network.segments {
        if segment.direction.forward() {
            adjacency[segment.from as usize].push((segment.to, segment.weight));
        }
        if segment.direction.backward() {
            adjacency[segment.to as usize].push((segment.from, segment.weight));
        }
    }

    // (vertex, history, parent) per discovered state; the heap refers to them by index
    let mut states: Vec<(u32, Vec<u32>, Option<usize>)> = vec![(from, vec![], None)];
    let mut heap = BinaryHeap::from([Reverse((OrderedFloat(0.0_f32), 0_usize))]);
    let mut settled = HashSet::new();
    while let Some(Reverse((OrderedFloat(weight), id))) = heap.pop() {
        let (vertex, history) = (states[id].0, states[id].1.clone());
        if vertex == to {
            let mut vertices = vec![];
            let mut current = Some(id);
            while let Some(state) = current {
                vertices.push(states[state].0);
                current = states[state].2;
            }
            vertices.reverse();
            return Some(Route { weight, vertices });
        }
        if !settled.insert((vertex, history.clone())) {
            continue;
        }
        for &(next, segment_weight) in &adjacency[vertex as usize] {
            if !history.is_empty() && !is_legal_joint(&restrictions, &history, vertex, &[next]) {
                continue;
            }
            states.push((next, extend_history(&history, vertex, &[], history_len), Some(id)));
            heap.push(Reverse((OrderedFloat(weight + segment_weight), states.len() - 1)));
        }
    }
    None
}

/// The weight of [`turn_aware_route`].
pub fn turn_aware_weight(network: &RoadNetwork, from: u32, to: u32) -> Option<f32> {
    turn_aware_route(network, from, to).map(|route| route.weight)
}

/// Whether travelling `vertices` never turns straight back and traverses no restriction of the
/// network through one of its inner vertices.
pub fn is_legal_route(network: &RoadNetwork, vertices: &[u32]) -> bool {
    let restrictions = network.restriction_table();
    (1..vertices.len().saturating_sub(1))
        .all(|i| is_legal_joint(&restrictions, &vertices[..i], vertices[i], &vertices[i + 1..]))
}

/// [`grid_network`] with turn restrictions of three and four vertices spread over it.
pub fn restricted_grid(width: u32, height: u32) -> RoadNetwork {
    let mut network = grid_network(width, height);
    for y in 0..height {
        for x in 0..width {
            let vertex = y * width + x;
            // turn from the left neighbour down
            if x > 0 && y + 1 < height && (x + y) % 3 == 1 {
                network.restrictions.push(vec![vertex - 1, vertex, vertex + width]);
            }
            // come from above, go right and then down again
            if y > 0 && x + 1 < width && y + 1 < height && (x + 2 * y) % 4 == 0 {
                network.restrictions.push(vec![vertex - width, vertex, vertex + 1, vertex + 1 + width]);
            }
        }
    }
    network
}
