//! Streams Module: Candidate Extraction
//!
//! Stellar streams are over-densities that stay connected across a wide
//! range of density levels. In the H0 diagram they show up as components
//! whose lifetime stands well above the noise floor of the field; H1
//! loops are available for ring-like structures.
//!
//! - `CandidateExtractor`: thresholding, membership queries, ranking
//! - `StreamCandidate`: one significant feature and its member points
//! - `serialize_candidates`: JSON summaries for downstream consumers

mod candidates;
mod extractor;

pub use candidates::{serialize_candidates, CandidateSummary, StreamCandidate};
pub use extractor::{representative_vertex, select_significant, significance_threshold, CandidateExtractor};
