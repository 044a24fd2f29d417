//! The Ψ attribute vector carried by every actor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One axis of the Ψ vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    /// G: governance, derived from log-scaled raw magnitude.
    Governance,
    /// R: reputation.
    Reputation,
    /// E: risk exposure. Weighted negatively.
    Exposure,
    /// T: throughput.
    Throughput,
    /// N: network position, written by centrality.
    Network,
    /// L: liquidity.
    Liquidity,
}

impl Dimension {
    pub const ALL: [Dimension; 6] = [
        Dimension::Governance,
        Dimension::Reputation,
        Dimension::Exposure,
        Dimension::Throughput,
        Dimension::Network,
        Dimension::Liquidity,
    ];

    /// Single-letter symbol used in breakdowns.
    pub fn symbol(self) -> &'static str {
        match self {
            Dimension::Governance => "G",
            Dimension::Reputation => "R",
            Dimension::Exposure => "E",
            Dimension::Throughput => "T",
            Dimension::Network => "N",
            Dimension::Liquidity => "L",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Six-dimensional attribute vector. Every component lives in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Psi {
    pub g: f64,
    pub r: f64,
    pub e: f64,
    pub t: f64,
    pub n: f64,
    pub l: f64,
}

impl Psi {
    /// Build a vector, clamping every component into `[0, 1]`.
    pub fn new(g: f64, r: f64, e: f64, t: f64, n: f64, l: f64) -> Self {
        Self {
            g: unit(g),
            r: unit(r),
            e: unit(e),
            t: unit(t),
            n: unit(n),
            l: unit(l),
        }
    }

    /// Same value on every axis.
    pub fn uniform(v: f64) -> Self {
        Self::new(v, v, v, v, v, v)
    }

    pub fn get(&self, dim: Dimension) -> f64 {
        match dim {
            Dimension::Governance => self.g,
            Dimension::Reputation => self.r,
            Dimension::Exposure => self.e,
            Dimension::Throughput => self.t,
            Dimension::Network => self.n,
            Dimension::Liquidity => self.l,
        }
    }

    /// Set one component (clamped).
    pub fn set(&mut self, dim: Dimension, value: f64) {
        let v = unit(value);
        match dim {
            Dimension::Governance => self.g = v,
            Dimension::Reputation => self.r = v,
            Dimension::Exposure => self.e = v,
            Dimension::Throughput => self.t = v,
            Dimension::Network => self.n = v,
            Dimension::Liquidity => self.l = v,
        }
    }

    /// Liquidity inertia `I = G / (L + 1)`.
    pub fn inertia(&self) -> f64 {
        self.g / (self.l + 1.0)
    }
}

/// Clamp into `[0, 1]`; NaN collapses to 0.
pub(crate) fn unit(v: f64) -> f64 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}
