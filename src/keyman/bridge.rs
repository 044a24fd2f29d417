//! Mandatory bridge nodes between two actors of the entity graph.

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::model::ActorId;
use crate::registry::Registry;

/// Hop limit for path enumeration.
pub const BRIDGE_MAX_DEPTH: usize = 6;
/// Paths enumerated before stopping.
pub const BRIDGE_MAX_PATHS: usize = 100;

/// Actors that lie on every enumerated simple path from `source` to
/// `target`, endpoints excluded, in the order they appear on the first
/// (shortest) path.
///
/// Paths are enumerated breadth-first over the registry's connections, up
/// to [`BRIDGE_MAX_DEPTH`] hops and [`BRIDGE_MAX_PATHS`] paths. No path,
/// unknown endpoints or `source == target` give an empty result.
pub fn bridge_nodes(registry: &Registry, source: &str, target: &str) -> Vec<ActorId> {
    if source == target || !registry.contains(source) || !registry.contains(target) {
        return Vec::new();
    }

    let paths = enumerate_paths(registry, source, target);
    let Some(first) = paths.first() else {
        return Vec::new();
    };

    let mut common: HashSet<&ActorId> = first[1..first.len() - 1].iter().collect();
    for path in &paths[1..] {
        let on_path: HashSet<&ActorId> = path.iter().collect();
        common.retain(|id| on_path.contains(*id));
        if common.is_empty() {
            break;
        }
    }

    let bridges: Vec<ActorId> = first
        .iter()
        .filter(|id| common.contains(id))
        .cloned()
        .collect();
    tracing::trace!(source, target, paths = paths.len(), bridges = bridges.len(), "bridge query");
    bridges
}

/// Breadth-first simple paths, shortest first.
fn enumerate_paths(registry: &Registry, source: &str, target: &str) -> Vec<Vec<ActorId>> {
    let mut found = Vec::new();
    let mut queue: VecDeque<Vec<ActorId>> = VecDeque::new();
    queue.push_back(vec![ActorId::from(source)]);

    while let Some(path) = queue.pop_front() {
        let hops = path.len() - 1;
        if hops >= BRIDGE_MAX_DEPTH {
            continue;
        }
        let Some(tip) = path.last() else { continue };
        let Some(actor) = registry.get(tip.as_str()) else { continue };

        for next in &actor.connections {
            if path.contains(next) {
                continue;
            }
            let mut extended = path.clone();
            extended.push(next.clone());

            if next.as_str() == target {
                found.push(extended);
                if found.len() >= BRIDGE_MAX_PATHS {
                    return found;
                }
            } else {
                queue.push_back(extended);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Actor;

    fn registry(edges: &[(&str, &str)]) -> Registry {
        let mut reg = Registry::new();
        for (a, b) in edges {
            for id in [a, b] {
                if !reg.contains(id) {
                    reg.add(Actor::new(*id, *id));
                }
            }
            reg.connect(a, b, 0.5);
        }
        reg
    }

    #[test]
    fn test_single_chokepoint() {
        // a - x - b, a - y - b... all routes to t pass through b
        let reg = registry(&[("a", "x"), ("a", "y"), ("x", "b"), ("y", "b"), ("b", "t")]);
        assert_eq!(bridge_nodes(&reg, "a", "t"), vec![ActorId::from("b")]);
    }

    #[test]
    fn test_chain_orders_by_path() {
        let reg = registry(&[("a", "b"), ("b", "c"), ("c", "d")]);
        assert_eq!(
            bridge_nodes(&reg, "a", "d"),
            vec![ActorId::from("b"), ActorId::from("c")]
        );
    }

    #[test]
    fn test_parallel_routes_have_no_bridge() {
        let reg = registry(&[("a", "x"), ("x", "t"), ("a", "y"), ("y", "t")]);
        assert!(bridge_nodes(&reg, "a", "t").is_empty());
    }

    #[test]
    fn test_direct_edge_and_missing() {
        let reg = registry(&[("a", "b"), ("c", "d")]);
        assert!(bridge_nodes(&reg, "a", "b").is_empty());
        assert!(bridge_nodes(&reg, "a", "d").is_empty());
        assert!(bridge_nodes(&reg, "a", "ghost").is_empty());
        assert!(bridge_nodes(&reg, "a", "a").is_empty());
    }

    #[test]
    fn test_depth_limit() {
        // 7 hops: beyond the limit, so no path and no bridge
        let ids = ["n0", "n1", "n2", "n3", "n4", "n5", "n6", "n7"];
        let edges: Vec<(&str, &str)> = ids.windows(2).map(|w| (w[0], w[1])).collect();
        let reg = registry(&edges);
        assert!(bridge_nodes(&reg, "n0", "n7").is_empty());
        assert_eq!(bridge_nodes(&reg, "n0", "n6").len(), 5);
    }
}
