//! Finder configuration.
//!
//! Defaults, JSON files and `TOPOSTREAMS_*` environment variables, in that
//! order of precedence (environment wins). The backend preference is
//! resolved once when a [`crate::StreamFinder`] is built.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::topology::MAX_HOMOLOGY_DIM;

/// Which backend serves spatial queries and persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendPreference {
    /// In-process kd-tree and reference engine
    Reference,
    /// Accelerator only; fails if no device is reachable
    Accelerator,
    /// Accelerator when reachable, otherwise reference
    #[default]
    Auto,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackendPreference::Reference => "reference",
            BackendPreference::Accelerator => "accelerator",
            BackendPreference::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for BackendPreference {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "cpu" => Ok(BackendPreference::Reference),
            "accelerator" | "gpu" | "cuda" => Ok(BackendPreference::Accelerator),
            "auto" => Ok(BackendPreference::Auto),
            other => Err(StreamError::Config(format!("unknown backend '{}'", other))),
        }
    }
}

/// Candidate extraction parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Fixed lifetime threshold; overrides `sigma_threshold` when set
    pub persistence_threshold: Option<f64>,
    /// Threshold = mean + sigma · std of the finite lifetimes
    pub sigma_threshold: f64,
    /// Diagram to extract from (0 or 1)
    pub homology_dim: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            persistence_threshold: None,
            sigma_threshold: 3.0,
            homology_dim: 0,
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    /// k for the kNN graph (clamped to n - 1)
    pub n_neighbors: usize,
    /// Highest homology dimension computed (0 or 1)
    pub max_dim: usize,
    /// Standardize features before building the graph
    pub scale: bool,
    pub backend: BackendPreference,
    pub extraction: ExtractionConfig,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 32,
            max_dim: 1,
            scale: true,
            backend: BackendPreference::Auto,
            extraction: ExtractionConfig::default(),
        }
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| StreamError::Config(format!("{}: cannot parse '{}'", name, value)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim() {
        "1" | "true" | "True" | "on" | "ON" | "yes" => Ok(true),
        "0" | "false" | "False" | "off" | "OFF" | "no" => Ok(false),
        other => Err(StreamError::Config(format!("{}: cannot parse '{}'", name, other))),
    }
}

impl FinderConfig {
    /// Defaults overlaid with `TOPOSTREAMS_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: FinderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup, then validate.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TOPOSTREAMS_N_NEIGHBORS") {
            self.n_neighbors = parse_var("TOPOSTREAMS_N_NEIGHBORS", &v)?;
        }
        if let Some(v) = lookup("TOPOSTREAMS_MAX_DIM") {
            self.max_dim = parse_var("TOPOSTREAMS_MAX_DIM", &v)?;
        }
        if let Some(v) = lookup("TOPOSTREAMS_SCALE") {
            self.scale = parse_flag("TOPOSTREAMS_SCALE", &v)?;
        }
        if let Some(v) = lookup("TOPOSTREAMS_BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = lookup("TOPOSTREAMS_SIGMA") {
            self.extraction.sigma_threshold = parse_var("TOPOSTREAMS_SIGMA", &v)?;
        }
        if let Some(v) = lookup("TOPOSTREAMS_PERSISTENCE_THRESHOLD") {
            self.extraction.persistence_threshold = Some(parse_var("TOPOSTREAMS_PERSISTENCE_THRESHOLD", &v)?);
        }
        if let Some(v) = lookup("TOPOSTREAMS_HOMOLOGY_DIM") {
            self.extraction.homology_dim = parse_var("TOPOSTREAMS_HOMOLOGY_DIM", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_neighbors == 0 {
            return Err(StreamError::InvalidInput("n_neighbors must be at least 1".to_string()));
        }
        if self.max_dim > MAX_HOMOLOGY_DIM {
            return Err(StreamError::InvalidHomologyDimension {
                requested: self.max_dim,
                max_computed: Some(MAX_HOMOLOGY_DIM),
            });
        }
        if self.extraction.homology_dim > self.max_dim {
            return Err(StreamError::InvalidHomologyDimension {
                requested: self.extraction.homology_dim,
                max_computed: Some(self.max_dim),
            });
        }
        let sigma = self.extraction.sigma_threshold;
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(StreamError::InvalidInput(format!("sigma_threshold {} must be finite and >= 0", sigma)));
        }
        if let Some(t) = self.extraction.persistence_threshold {
            if !t.is_finite() || t < 0.0 {
                return Err(StreamError::InvalidInput(format!(
                    "persistence_threshold {} must be finite and >= 0",
                    t
                )));
            }
        }
        Ok(())
    }
}
