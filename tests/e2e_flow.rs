//! End-to-end tests for the flow multigraph: path search, bottlenecks,
//! removal what-ifs and reporting aggregates.

use influence_rs::flow::{DEFAULT_BOTTLENECK_THRESHOLD, DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS};
use influence_rs::{ActorId, Error, FlowEngine, FlowRecord, FlowType};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: three routes from s to t with very different capacity.
//
//   s ──100──▶ a ──100──▶ t
//   s ───5───▶ b ───5───▶ t
//   s ───────────1──────▶ t
// ============================================================================

fn routes() -> FlowEngine {
    FlowEngine::from_flows([
        FlowRecord::new("sa", "s", "a", 100.0, FlowType::Trade),
        FlowRecord::new("at", "a", "t", 100.0, FlowType::Trade),
        FlowRecord::new("sb", "s", "b", 5.0, FlowType::Loan),
        FlowRecord::new("bt", "b", "t", 5.0, FlowType::Loan),
        FlowRecord::new("st", "s", "t", 1.0, FlowType::Aid),
    ])
    .unwrap()
}

fn ids(nodes: &[ActorId]) -> Vec<&str> {
    nodes.iter().map(ActorId::as_str).collect()
}

// ============================================================================
// 1. Path search
// ============================================================================

#[test]
fn test_shortest_path_prefers_heavy_channels() {
    let g = routes();
    let path = g.shortest_path("s", "t").unwrap();
    assert_eq!(ids(&path.nodes), vec!["s", "a", "t"]);
    assert_eq!(path.hops(), 2);
    assert_eq!(path.total_amount, 200.0);
    assert_eq!(path.flows.len(), 2);
}

#[test]
fn test_max_flow_path() {
    let g = routes();
    let path = g.max_flow_path("s", "t").unwrap();
    assert_eq!(ids(&path.nodes), vec!["s", "a", "t"]);
    assert_eq!(path.capacity(), 100.0);
}

#[test]
fn test_all_paths_sorted_by_amount() {
    let g = routes();
    let paths = g.all_paths("s", "t", DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS);
    let totals: Vec<f64> = paths.iter().map(|p| p.total_amount).collect();
    assert_eq!(totals, vec![200.0, 10.0, 1.0]);

    let via_b = &paths[1];
    let bottleneck = via_b.bottleneck.as_ref().unwrap();
    assert_eq!(bottleneck.capacity, 5.0);

    // Depth 1 only keeps the direct edge.
    let direct = g.all_paths("s", "t", 1, DEFAULT_MAX_PATHS);
    assert_eq!(direct.len(), 1);
    assert_eq!(ids(&direct[0].nodes), vec!["s", "t"]);

    assert_eq!(g.all_paths("s", "t", DEFAULT_MAX_DEPTH, 2).len(), 2);
}

#[test]
fn test_no_path_cases() {
    let g = routes();
    assert!(g.shortest_path("t", "s").is_none());
    assert!(g.max_flow_path("t", "s").is_none());
    assert!(g.all_paths("t", "s", DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS).is_empty());
    assert!(g.shortest_path("s", "s").is_none());
    assert!(g.shortest_path("s", "nowhere").is_none());
}

// ============================================================================
// 2. Mutation keeps indices consistent
// ============================================================================

#[test]
fn test_removing_heavy_route_reroutes() {
    let mut g = routes();
    g.remove_flow("at").unwrap();
    let path = g.shortest_path("s", "t").unwrap();
    assert_eq!(ids(&path.nodes), vec!["s", "b", "t"]);
    // `a` still has its inbound flow.
    assert!(g.contains_node("a"));

    g.remove_flow("sa").unwrap();
    assert!(!g.contains_node("a"));
    assert_eq!(g.node_count(), 3);
}

#[test]
fn test_invalid_flows_rejected() {
    let mut g = routes();
    let negative = FlowRecord::new("neg", "s", "t", -5.0, FlowType::Trade);
    assert!(matches!(g.add_flow(negative), Err(Error::InvalidInput(_))));
    let infinite = FlowRecord::new("inf", "s", "t", f64::INFINITY, FlowType::Trade);
    assert!(matches!(g.add_flow(infinite), Err(Error::InvalidInput(_))));
    let zero = FlowRecord::new("zero", "s", "t", 0.0, FlowType::Trade);
    assert!(g.add_flow(zero).is_ok());
    assert_eq!(g.flow_count(), 6);
}

// ============================================================================
// 3. Bottlenecks and removal
// ============================================================================

#[test]
fn test_bottleneck_is_relay() {
    let g = routes();
    let found = g.find_bottlenecks(DEFAULT_BOTTLENECK_THRESHOLD);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].node.as_str(), "a");
    assert!((found[0].impact - 200.0 / 422.0).abs() < 1e-12);
}

#[test]
fn test_simulate_relay_removal() {
    let g = routes();
    let removal = g.simulate_removal("a").unwrap();
    assert_eq!(removal.flows_lost, 2);
    assert_eq!(removal.amount_lost, 200.0);
    assert!(!removal.disconnects);
    assert_eq!(removal.largest_component, 3);
    assert_eq!(ids(&removal.affected_nodes), vec!["s", "t"]);

    // Read-only: route via `a` is still there.
    assert_eq!(g.flow_count(), 5);
    assert_eq!(ids(&g.shortest_path("s", "t").unwrap().nodes), vec!["s", "a", "t"]);
}

// ============================================================================
// 4. Reporting
// ============================================================================

#[test]
fn test_summaries() {
    let g = routes();
    let s = g.node_summary("s").unwrap();
    assert_eq!(s.outflow, 106.0);
    assert_eq!(s.targets, 3);
    assert_eq!(s.sources, 0);

    let by_type = g.aggregate_by_type();
    assert_eq!(by_type[&FlowType::Trade].total, 200.0);
    assert_eq!(by_type[&FlowType::Aid].count, 1);

    let m = g.flow_matrix(&["s", "a", "t"]);
    assert_eq!(m.get("s", "a"), Some(100.0));
    assert_eq!(m.get("s", "t"), Some(1.0));
    assert_eq!(m.get("t", "s"), Some(0.0));

    let top: Vec<&str> = g.top_flows(2).iter().map(|f| f.id.as_str()).collect();
    assert_eq!(top, vec!["at", "sa"]);
}
