//! Registry construction from flat ingestion records.

use hashbrown::HashSet;

use super::Registry;
use crate::model::{Actor, ActorId, EntityRecord, FlowRecord, Psi};

/// Knobs for building a registry from raw records.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestOptions {
    /// Magnitude mapped to G = 1. `None` uses the largest magnitude seen.
    pub max_magnitude: Option<f64>,
    /// χ assigned to the smallest qualifying flow.
    pub min_coupling: f64,
    /// χ assigned to the largest qualifying flow.
    pub max_coupling: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { max_magnitude: None, min_coupling: 0.1, max_coupling: 0.9 }
    }
}

/// `log10(x)` with x floored at 1, so magnitudes below 1 map to 0.
fn log_floor(x: f64) -> f64 {
    if x.is_finite() { x.max(1.0).log10() } else { 0.0 }
}

/// Log-scaled position of `x` in `[1, ceiling]`, in `[0, 1]`.
fn log_scale(x: f64, ceiling_log: f64) -> f64 {
    if ceiling_log <= 0.0 {
        return 0.0;
    }
    (log_floor(x) / ceiling_log).clamp(0.0, 1.0)
}

impl Registry {
    /// Build a registry from entity and flow records, then run centrality.
    ///
    /// G comes from `log10(max(magnitude, 1)) / log10(max_magnitude)`.
    /// Missing R, T and L fall back to G (magnitude is the only signal we
    /// have for them); missing E falls back to 0.
    ///
    /// Edges come from the first qualifying flow between each unordered
    /// pair: both endpoints known, distinct, and a finite positive amount.
    /// χ rises log-linearly with the amount from `min_coupling` to
    /// `max_coupling`. Later flows between an already linked pair are
    /// ignored.
    pub fn from_records(entities: &[EntityRecord], flows: &[FlowRecord], opts: IngestOptions) -> Self {
        let mut reg = Registry::new();

        let max_magnitude = opts.max_magnitude.unwrap_or_else(|| {
            entities.iter().map(|e| e.magnitude).filter(|m| m.is_finite()).fold(0.0, f64::max)
        });
        // Floor at 10 so the denominator never reaches log10(1) = 0.
        let magnitude_log = log_floor(max_magnitude).max(1.0);

        for rec in entities {
            let g = log_scale(rec.magnitude, magnitude_log);
            let psi = Psi::new(
                g,
                rec.reputation.unwrap_or(g),
                rec.exposure.unwrap_or(0.0),
                rec.throughput.unwrap_or(g),
                0.0,
                rec.liquidity.unwrap_or(g),
            );
            let mut actor = Actor::new(rec.id.clone(), rec.name.clone())
                .with_psi(psi)
                .with_magnitude(rec.magnitude);
            actor.sector = rec.sector.clone();
            actor.region = rec.region.clone();
            actor.position = rec.position;
            reg.add(actor);
        }

        let qualifying: Vec<&FlowRecord> = flows
            .iter()
            .filter(|f| {
                f.source != f.target
                    && f.amount.is_finite()
                    && f.amount > 0.0
                    && reg.contains(f.source.as_str())
                    && reg.contains(f.target.as_str())
            })
            .collect();

        let amount_log = log_floor(qualifying.iter().map(|f| f.amount).fold(0.0, f64::max)).max(1.0);
        let span = opts.max_coupling - opts.min_coupling;

        let mut linked: HashSet<(ActorId, ActorId)> = HashSet::new();
        for flow in &qualifying {
            let key = if flow.source < flow.target {
                (flow.source.clone(), flow.target.clone())
            } else {
                (flow.target.clone(), flow.source.clone())
            };
            if !linked.insert(key) {
                continue;
            }
            let chi = opts.min_coupling + span * log_scale(flow.amount, amount_log);
            reg.connect(flow.source.as_str(), flow.target.as_str(), chi);
        }

        tracing::debug!(
            actors = reg.len(),
            edges = reg.edge_count(),
            skipped_flows = flows.len() - qualifying.len(),
            "registry built from records"
        );

        reg.centrality();
        reg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FlowType;

    #[test]
    fn test_governance_is_log_scaled() {
        let entities = vec![
            EntityRecord::new("a", "A", 1e12),
            EntityRecord::new("b", "B", 1e6),
            EntityRecord::new("c", "C", 0.5),
        ];
        let reg = Registry::from_records(&entities, &[], IngestOptions::default());
        let g = |id: &str| reg.get(id).unwrap().psi.g;
        assert!((g("a") - 1.0).abs() < 1e-12);
        assert!((g("b") - 0.5).abs() < 1e-12);
        assert_eq!(g("c"), 0.0);
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let entities = vec![
            EntityRecord::new("a", "A", 1e4).with_exposure(0.4).with_liquidity(0.9),
            EntityRecord::new("b", "B", 1e8),
        ];
        let reg = Registry::from_records(&entities, &[], IngestOptions::default());
        let a = reg.get("a").unwrap();
        assert_eq!(a.psi.e, 0.4);
        assert_eq!(a.psi.l, 0.9);
        assert!((a.psi.r - 0.5).abs() < 1e-12);
        assert_eq!(reg.get("b").unwrap().psi.e, 0.0);
    }

    #[test]
    fn test_first_flow_sets_coupling() {
        let entities = vec![
            EntityRecord::new("a", "A", 100.0),
            EntityRecord::new("b", "B", 100.0),
            EntityRecord::new("c", "C", 100.0),
        ];
        let flows = vec![
            FlowRecord::new("f1", "a", "b", 1_000_000.0, FlowType::Trade),
            FlowRecord::new("f2", "b", "a", 10.0, FlowType::Trade),
            FlowRecord::new("f3", "b", "c", 1.0, FlowType::Trade),
            FlowRecord::new("f4", "c", "ghost", 50.0, FlowType::Trade),
        ];
        let reg = Registry::from_records(&entities, &flows, IngestOptions::default());
        assert!((reg.coupling("a", "b").unwrap() - 0.9).abs() < 1e-12);
        assert!((reg.coupling("b", "c").unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(reg.edge_count(), 2);

        let sum: f64 = reg.actors().iter().map(|a| a.centrality).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
