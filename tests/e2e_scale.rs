//! End-to-end tests for the scale hierarchy: building, zooming, bottom-up
//! aggregation and level-wide indices.

use influence_rs::{
    BoundingBox, Error, GeoPoint, Network, ParameterSet, Role, ScaleEngine, ScaleLevel, ScaleNode,
};
use pretty_assertions::assert_eq;

// ============================================================================
// Helper: one world, two countries, one city each, one district each and a
// handful of blocks carrying leaf totals.
// ============================================================================

fn world() -> ScaleEngine {
    let mut e = ScaleEngine::new();
    let levels = [
        ScaleNode::new("earth", "Earth", ScaleLevel::World),
        ScaleNode::new("kr", "Korea", ScaleLevel::Country).with_parent("earth"),
        ScaleNode::new("us", "United States", ScaleLevel::Country).with_parent("earth"),
        ScaleNode::new("seoul", "Seoul", ScaleLevel::City)
            .with_parent("kr")
            .with_position(GeoPoint::new(37.56, 126.97)),
        ScaleNode::new("nyc", "New York", ScaleLevel::City)
            .with_parent("us")
            .with_position(GeoPoint::new(40.71, -74.0)),
        ScaleNode::new("jung", "Jung-gu", ScaleLevel::District).with_parent("seoul"),
        ScaleNode::new("manhattan", "Manhattan", ScaleLevel::District).with_parent("nyc"),
    ];
    for node in levels {
        e.add_node(node).unwrap();
    }

    let blocks = [
        ("j1", "jung", 100.0, 40.0, 3, 0.30),
        ("j2", "jung", 50.0, 10.0, 1, 0.10),
        ("m1", "manhattan", 500.0, 300.0, 8, 0.90),
        ("m2", "manhattan", 200.0, 100.0, 2, 0.50),
        ("m3", "manhattan", 10.0, 0.0, 0, 0.10),
    ];
    for (id, parent, mass, flow, count, ki) in blocks {
        e.add_node(
            ScaleNode::new(id, id, ScaleLevel::Block)
                .with_parent(parent)
                .with_totals(mass, flow, count)
                .with_ki(ki)
                .with_actor(id),
        )
        .unwrap();
    }
    e
}

// ============================================================================
// 1. Aggregation
// ============================================================================

#[test]
fn test_aggregate_all_sums_to_world() {
    let mut e = world();
    e.aggregate_all();

    let manhattan = e.get("manhattan").unwrap();
    assert_eq!(manhattan.mass, 710.0);
    assert_eq!(manhattan.flow, 400.0);
    // m3 carries no count and counts as one.
    assert_eq!(manhattan.count, 11);
    assert!((manhattan.ki - (0.5 + 0.03)).abs() < 1e-12);
    assert_eq!(manhattan.top_keyman_id.as_ref().unwrap().as_str(), "m1");

    let earth = e.get("earth").unwrap();
    assert_eq!(earth.mass, 860.0);
    assert_eq!(earth.flow, 450.0);
    assert_eq!(earth.count, 15);
    assert_eq!(earth.top_keyman_id.as_ref().unwrap().as_str(), "us");
}

#[test]
fn test_level_index_and_hubs() {
    let mut e = world();
    let ranked = e.calculate_ki_at_level(ScaleLevel::Block);
    assert_eq!(ranked.len(), 5);
    assert_eq!(ranked[0].0.as_str(), "m1");
    assert!((ranked[0].1 - 1.0).abs() < 1e-12);

    // Five blocks: the single top block by flow is the hub.
    let hubs: Vec<&str> = e
        .nodes_at_level(ScaleLevel::Block)
        .into_iter()
        .filter(|n| n.roles.contains(Role::Hub))
        .map(|n| n.id.as_str())
        .collect();
    assert_eq!(hubs, vec!["m1"]);
    assert!((e.get("m1").unwrap().ki - 1.0).abs() < 1e-12);
}

// ============================================================================
// 2. Navigation
// ============================================================================

#[test]
fn test_zoom_and_path() {
    let e = world();
    let countries: Vec<&str> = e.zoom_in("earth").iter().map(|n| n.id.as_str()).collect();
    assert_eq!(countries, vec!["kr", "us"]);
    assert_eq!(e.zoom_out("j1").unwrap().id.as_str(), "jung");

    let path: Vec<ScaleLevel> = e.path_to_root("m2").iter().map(|n| n.level).collect();
    assert_eq!(path, ScaleLevel::ALL.iter().rev().copied().collect::<Vec<_>>());
}

#[test]
fn test_bounds_query_uses_zoom_level() {
    let e = world();
    let asia = BoundingBox::new(GeoPoint::new(20.0, 100.0), GeoPoint::new(50.0, 150.0));
    let cities: Vec<&str> = e.nodes_in_bounds(9, &asia).iter().map(|n| n.id.as_str()).collect();
    assert_eq!(cities, vec!["seoul"]);
    assert_eq!(ScaleLevel::from_zoom(9), ScaleLevel::City);
}

#[test]
fn test_invalid_hierarchy_rejected() {
    let mut e = world();
    let block_under_city = ScaleNode::new("x", "X", ScaleLevel::Block).with_parent("seoul");
    assert!(matches!(e.add_node(block_under_city), Err(Error::InvalidHierarchy(_))));
    let missing_parent = ScaleNode::new("y", "Y", ScaleLevel::Block).with_parent("nowhere");
    assert!(matches!(e.add_node(missing_parent), Err(Error::InvalidHierarchy(_))));
    assert_eq!(e.len(), 12);
}

// ============================================================================
// 3. Through the Network handle
// ============================================================================

#[test]
fn test_network_owns_scale_tree() {
    let net = Network::new(ParameterSet::default()).unwrap();
    net.with_scale_mut(|s| {
        s.add_node(ScaleNode::new("earth", "Earth", ScaleLevel::World))?;
        s.add_node(ScaleNode::new("kr", "Korea", ScaleLevel::Country).with_parent("earth"))
    })
    .unwrap();
    assert_eq!(net.scale().len(), 2);

    let removed = net.with_scale_mut(|s| s.remove_node("earth"));
    assert_eq!(removed.len(), 2);
    assert!(net.scale().is_empty());
}
