//! Pipeline entry point: parameter validation plus the
//! table-to-artifacts build consumed by the presentation layer.

use crate::corpus::HoldingsTable;
use crate::features::{self, NormalizeOptions};
use crate::network::{self, BipartiteNetwork, NetworkOptions};
use crate::similarity::{self, Linkage, SimilarityError, SimilarityMatrix};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Years with a persisted holdings table. Extending coverage means adding
/// a year here and dropping its table next to the others.
pub const YEARS: &[u16] = &[2017, 2018, 2019, 2020];

/// Errors fatal to a single network-build call. No partial artifact is
/// returned on either variant.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// A parameter is out of range or unrecognized.
    #[error("invalid parameter: {0}")]
    Config(String),

    /// Fewer than 2 owners survived normalization.
    #[error(transparent)]
    InsufficientData(#[from] SimilarityError),
}

pub type BuildResult<T> = Result<T, BuildError>;

/// Parameters for one network build. Same table and parameters always
/// yield the same artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkParams {
    /// Reporting year; selects the persisted table via [`table_path`].
    pub year: u16,
    /// Strict lower bound on normalized value for an edge, in (0, 1].
    /// Values above 1 are allowed and simply produce an empty graph.
    pub threshold: f64,
    /// Clustering linkage criterion.
    pub linkage: Linkage,
    /// Layout spread factor, > 0; typical range 0.4 to 1.0.
    pub gravity: f64,
    /// Cap on displayed issuer labels.
    pub label_count: usize,
    /// Degree floor for the optional node trim; 0 disables.
    pub min_degree: usize,
    /// Optional seeded record subsample in (0, 1]; `None` means full data.
    pub sample_fraction: Option<f64>,
    /// Seed for the layout (and the subsample, when enabled).
    pub seed: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams {
            year: 2017,
            threshold: 0.5,
            linkage: Linkage::Ward,
            gravity: 0.4,
            label_count: 20,
            min_degree: 0,
            sample_fraction: None,
            seed: crate::DEFAULT_SEED,
        }
    }
}

impl NetworkParams {
    /// Validate ranges; any violation fails the whole call.
    pub fn validate(&self) -> BuildResult<()> {
        if !YEARS.contains(&self.year) {
            return Err(BuildError::Config(format!(
                "year {} has no holdings table (known: {:?})",
                self.year, YEARS
            )));
        }
        if !(self.threshold > 0.0) {
            return Err(BuildError::Config(format!(
                "threshold must be positive, got {}",
                self.threshold
            )));
        }
        if !(self.gravity > 0.0) {
            return Err(BuildError::Config(format!(
                "gravity must be positive, got {}",
                self.gravity
            )));
        }
        if let Some(fraction) = self.sample_fraction {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(BuildError::Config(format!(
                    "sample fraction must be in (0, 1], got {fraction}"
                )));
            }
        }
        Ok(())
    }
}

/// Canonical location of the persisted per-year holdings table.
pub fn table_path(data_dir: &Path, year: u16) -> PathBuf {
    data_dir.join(format!("filingsEnd{year}.csv"))
}

/// Build the bipartite network and the ordered similarity matrix for one
/// holdings table. Pure function of the table and the parameters.
pub fn build_network(
    table: &HoldingsTable,
    params: &NetworkParams,
) -> BuildResult<(BipartiteNetwork, SimilarityMatrix)> {
    params.validate()?;

    let features = features::normalize_with(
        table,
        &NormalizeOptions {
            sample_fraction: params.sample_fraction,
            seed: params.seed,
        },
    );

    // Similarity first: an under-populated table fails before any layout
    // work happens.
    let similarity = similarity::build(&features, params.linkage)?;

    let network = network::build(
        &features,
        &NetworkOptions {
            threshold: params.threshold,
            gravity: params.gravity,
            label_count: params.label_count,
            min_degree: params.min_degree,
            seed: params.seed,
        },
    );

    info!(
        year = params.year,
        threshold = params.threshold,
        linkage = %params.linkage,
        nodes = network.nodes.len(),
        owners = similarity.len(),
        "network build complete"
    );

    Ok((network, similarity))
}
