//! Persistence Diagrams
//!
//! The reduction runs on the sublevel filtration of f = -ρ and produces
//! raw pairs (a, b) with a < b, b possibly +∞. In density terms a feature
//! appears at density -a and disappears at density -b, so the canonical
//! superlevel pair is
//!
//!   birth = -b,  death = -a
//!
//! with birth ≤ death. `to_canonical` is the only place this negation
//! happens.

use serde::{Deserialize, Serialize};

/// Pairs in negated-filtration space, as produced by an engine
#[derive(Debug, Clone, PartialEq)]
pub struct RawDiagram {
    pub dimension: usize,
    /// (a, b) with a < b
    pub pairs: Vec<(f64, f64)>,
}

impl RawDiagram {
    /// Zero-persistence pairs (a == b) are dropped.
    pub fn new(dimension: usize, mut pairs: Vec<(f64, f64)>) -> Self {
        pairs.retain(|&(a, b)| b > a);
        Self { dimension, pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs with a finite death
    pub fn finite_pairs(&self) -> Vec<(f64, f64)> {
        self.pairs.iter().copied().filter(|(_, b)| b.is_finite()).collect()
    }
}

/// Canonical (birth, death) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistencePair {
    pub birth: f64,
    pub death: f64,
}

impl PersistencePair {
    pub fn new(birth: f64, death: f64) -> Self {
        Self { birth, death }
    }

    pub fn persistence(&self) -> f64 {
        self.death - self.birth
    }

    pub fn is_finite(&self) -> bool {
        self.birth.is_finite() && self.death.is_finite()
    }
}

/// Canonical diagram for one homology dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceDiagram {
    pub dimension: usize,
    pub pairs: Vec<PersistencePair>,
}

impl PersistenceDiagram {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            pairs: Vec::new(),
        }
    }

    pub fn from_pairs(dimension: usize, pairs: &[(f64, f64)]) -> Self {
        Self {
            dimension,
            pairs: pairs.iter().map(|&(b, d)| PersistencePair::new(b, d)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs where both birth and death are finite
    pub fn finite_pairs(&self) -> Vec<PersistencePair> {
        self.pairs.iter().copied().filter(PersistencePair::is_finite).collect()
    }

    /// death - birth of every finite pair, in diagram order
    pub fn lifetimes(&self) -> Vec<f64> {
        self.pairs
            .iter()
            .filter(|p| p.is_finite())
            .map(PersistencePair::persistence)
            .collect()
    }

    /// Number of pairs with infinite persistence
    pub fn n_essential(&self) -> usize {
        self.pairs.len() - self.finite_pairs().len()
    }

    /// Largest finite lifetime (0 if there is none)
    pub fn max_persistence(&self) -> f64 {
        self.lifetimes().into_iter().fold(0.0, f64::max)
    }
}

/// Convert a raw diagram to the canonical birth ≤ death form.
///
/// (a, b) → (-b, -a). An essential raw pair (a, +∞) becomes (-∞, -a).
pub fn to_canonical(raw: &RawDiagram) -> PersistenceDiagram {
    PersistenceDiagram {
        dimension: raw.dimension,
        pairs: raw
            .pairs
            .iter()
            .map(|&(a, b)| PersistencePair::new(-b, -a))
            .collect(),
    }
}

/// Finite lifetimes of a (birth, death) array; rows with a non-finite
/// entry are skipped.
pub fn lifetimes(pairs: &[(f64, f64)]) -> Vec<f64> {
    pairs
        .iter()
        .filter(|(b, d)| b.is_finite() && d.is_finite())
        .map(|(b, d)| d - b)
        .collect()
}
