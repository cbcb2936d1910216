#![deny(
    // This is overly strict, of course. The intent is somewhat of a "quality seal," less to fix everything, and more to force us to add inline allows, which are even more needlessly verbose, but give us a mechanism to say "we think this is okay, but you might want to take a second look here."
    clippy::nursery,
    clippy::pedantic,
    // These are also just for clinic purposes
    missing_docs,
    clippy::missing_docs_in_private_items,
)]
//! `ebchctl`: build an edge-based contraction hierarchy from a JSON road network and answer
//! shortest path queries on it.
//!
//! The network file holds `vertex_count`, `segments` and `restrictions` (see
//! [`RoadNetwork`]).  Queries come from repeated `--query FROM TO` flags and/or a JSON file of
//! `{"from": .., "to": ..}` objects; the answers are printed to stdout as JSON.  See binary
//! --help for more information.

use std::fs::File;
use std::io::BufReader;
use std::path::{
    Path,
    PathBuf,
};
use std::time::Duration;

use clap::Parser;
use ebch_core::errors::{
    ensure,
    Context,
    EmptyResult,
    Result,
};
use ebch_hierarchy::query::QueryStatus;
use ebch_hierarchy::utils::write_dot_file;
use ebch_hierarchy::weights::DefaultWeightHandler;
use ebch_hierarchy::{
    BidirectionalDykstra,
    ContractionParameters,
    DirectedDynamicGraph,
    HierarchyBuilder,
    RestrictionTable,
    RoadNetwork,
    Route,
};
use indicatif::{
    ProgressBar,
    ProgressFinish,
    ProgressStyle,
};
use rayon::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    info,
    instrument,
    warn,
};

/// ebchctl command-line interface to contract a road network and query shortest routes on it
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Road network serialized as JSON.
    #[arg(short, long)]
    network: PathBuf,

    /// YAML file with contraction parameters; unspecified fields keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// A route to compute; may be given more than once.
    #[arg(short, long, num_args = 2, value_names = ["FROM", "TO"])]
    query: Vec<u32>,

    /// JSON file with a list of `{"from": .., "to": ..}` queries.
    #[arg(long)]
    queries: Option<PathBuf>,

    /// Logging verbosity level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(short, long, default_value = "info")]
    verbosity: String,

    /// Write the contracted graph in DOT format to this file.
    #[arg(long)]
    dot: Option<PathBuf>,

    /// Maximum number of edges in a witness path.
    #[arg(long)]
    witness_hops: Option<u32>,

    /// Use the priority factors tuned for edge-based contraction.
    #[arg(long)]
    edge_based_factors: bool,
}

/// A route to compute.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
struct QueryRequest {
    /// Source vertex.
    from: u32,
    /// Target vertex.
    to: u32,
}

/// One line of the output.
#[derive(Debug, PartialEq, Serialize)]
struct QueryAnswer {
    /// Source vertex.
    from: u32,
    /// Target vertex.
    to: u32,
    /// The best route, `None` when the target cannot be reached.
    route: Option<Route>,
}

impl Cli {
    /// Contraction parameters: the config file (or defaults), then the individual flags.
    fn parameters(&self) -> Result<ContractionParameters> {
        let mut parameters = match &self.config {
            Some(path) => {
                let file = File::open(path).with_context(|| format!("opening config {}", path.display()))?;
                serde_yaml::from_reader(BufReader::new(file))
                    .with_context(|| format!("parsing config {}", path.display()))?
            },
            None => ContractionParameters::default(),
        };

        if self.edge_based_factors {
            let preset = ContractionParameters::edge_based();
            parameters.difference_factor = preset.difference_factor;
            parameters.depth_factor = preset.depth_factor;
            parameters.contracted_factor = preset.contracted_factor;
        }
        if let Some(hops) = self.witness_hops {
            parameters.max_witness_hops = hops;
        }
        Ok(parameters)
    }

    /// The `--query` pairs followed by the contents of the `--queries` file.
    fn requests(&self) -> Result<Vec<QueryRequest>> {
        let mut requests: Vec<_> = self.query.chunks_exact(2).map(|pair| QueryRequest { from: pair[0], to: pair[1] }).collect();
        if let Some(path) = &self.queries {
            requests.extend(load_requests(path)?);
        }
        Ok(requests)
    }
}

/// Read a JSON list of requests.
fn load_requests(path: &Path) -> Result<Vec<QueryRequest>> {
    let file = File::open(path).with_context(|| format!("opening queries {}", path.display()))?;
    let requests: Vec<QueryRequest> =
        serde_json::from_reader(BufReader::new(file)).with_context(|| format!("parsing queries {}", path.display()))?;
    Ok(requests)
}

/// Build the graph for `network` and contract it in priority order, with a progress bar.
#[instrument(skip_all, fields(vertices = network.vertex_count))]
fn contract_network(
    network: &RoadNetwork,
    restrictions: &RestrictionTable,
    parameters: &ContractionParameters,
) -> Result<DirectedDynamicGraph> {
    let mut graph = network.build_graph(&DefaultWeightHandler)?;

    let pb = ProgressBar::new(u64::from(network.vertex_count))
        .with_style(ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.yellow/blue}] {pos}/{len} contractions ({percent}%) {msg}",
        )?)
        .with_message("Contraction phase")
        .with_finish(ProgressFinish::AndLeave);
    pb.enable_steady_tick(Duration::from_millis(100));

    let mut builder = HierarchyBuilder::new(&mut graph, &DefaultWeightHandler, restrictions, parameters);
    builder.run_with_progress(|contracted, _| pb.set_position(contracted as u64))?;
    let shortcuts = builder.shortcuts_added();
    pb.finish_using_style();

    info!(shortcuts, edges = graph.edge_count(), "Contraction complete");
    Ok(graph)
}

/// Run one query.
fn answer(graph: &DirectedDynamicGraph, restrictions: &RestrictionTable, request: QueryRequest) -> Result<QueryAnswer> {
    let mut query = BidirectionalDykstra::between(graph, &DefaultWeightHandler, restrictions, request.from, request.to);
    let route = if query.run() {
        Some(query.route()?)
    } else {
        debug_assert_eq!(query.status(), QueryStatus::Failed);
        warn!(from = request.from, to = request.to, "No route found");
        None
    };
    Ok(QueryAnswer { from: request.from, to: request.to, route })
}

/// Answer every request in parallel; the contracted graph is only read from here on.
fn answer_all(
    graph: &DirectedDynamicGraph,
    restrictions: &RestrictionTable,
    requests: &[QueryRequest],
) -> Result<Vec<QueryAnswer>> {
    for request in requests {
        for vertex in [request.from, request.to] {
            ensure!(vertex < graph.vertex_count(), "query vertex {vertex} is not in the network");
        }
    }
    requests.par_iter().map(|&request| answer(graph, restrictions, request)).collect()
}

/// Load, contract, optionally export, then answer the queries.
fn main() -> EmptyResult {
    let args = Cli::parse();

    ebch_core::logging::setup(&args.verbosity);

    let parameters = args.parameters()?;
    let requests = args.requests()?;
    let network = RoadNetwork::from_json_file(&args.network)?;
    info!(
        vertices = network.vertex_count,
        segments = network.segments.len(),
        restrictions = network.restrictions.len(),
        "Loaded road network from {}",
        args.network.display()
    );

    let restrictions = network.restriction_table();
    let graph = contract_network(&network, &restrictions, &parameters)?;

    if let Some(path) = &args.dot {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let filename = path.file_name().and_then(|name| name.to_str()).context("invalid DOT file name")?;
        let written = write_dot_file(&graph, &DefaultWeightHandler, dir, filename)?;
        info!("Contracted graph written to {}", written.display());
    }

    if requests.is_empty() {
        warn!("No queries given; only the hierarchy was built");
        return Ok(());
    }

    let answers = answer_all(&graph, &restrictions, &requests)?;
    println!("{}", serde_json::to_string_pretty(&answers)?);
    Ok(())
}
