//! Stream candidates and their JSON summaries.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// A significant topological feature with its spatial members
#[derive(Debug, Clone, PartialEq)]
pub struct StreamCandidate {
    /// Rows of the (cleaned) point cloud inside the feature, ascending
    pub member_indices: Vec<usize>,
    /// death - birth
    pub persistence: f64,
    /// Density at which the feature appears (canonical birth)
    pub birth: f64,
    /// Density at which it merges or fills (canonical death)
    pub death: f64,
    /// 0 = connected component, 1 = loop
    pub homology_dim: usize,
    /// Vertex whose position centers the membership query
    pub representative: usize,
}

impl StreamCandidate {
    pub fn n_members(&self) -> usize {
        self.member_indices.len()
    }

    /// Members as row numbers of the raw catalog.
    ///
    /// `clean_indices` is the mapping returned by
    /// [`crate::preprocess::clean_phase_space`].
    pub fn original_indices(&self, clean_indices: &[usize]) -> Result<Vec<usize>> {
        self.member_indices
            .iter()
            .map(|&i| {
                clean_indices.get(i).copied().ok_or_else(|| {
                    StreamError::InvalidInput(format!(
                        "member {} outside the {} cleaned rows",
                        i,
                        clean_indices.len()
                    ))
                })
            })
            .collect()
    }

    pub fn summary(&self) -> CandidateSummary {
        CandidateSummary {
            persistence: self.persistence,
            birth: self.birth,
            death: self.death,
            homology_dim: self.homology_dim,
            n_members: self.n_members(),
        }
    }
}

/// Serializable record of a candidate (members omitted)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub persistence: f64,
    pub birth: f64,
    pub death: f64,
    pub homology_dim: usize,
    pub n_members: usize,
}

/// Pretty-printed JSON array of candidate summaries, in list order.
pub fn serialize_candidates(candidates: &[StreamCandidate]) -> Result<String> {
    let summaries: Vec<CandidateSummary> = candidates.iter().map(StreamCandidate::summary).collect();
    Ok(serde_json::to_string_pretty(&summaries)?)
}
