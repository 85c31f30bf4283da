//! Holdnet: investor-issuer network analysis over 13F-HR filings
//!
//! Transforms an archive of quarterly institutional-holdings disclosures
//! into two renderable artifacts: a weighted bipartite investor-issuer
//! network and a hierarchically clustered investor-similarity matrix.
//!
//! The pipeline is a chain of pure, synchronous batch stages:
//!
//! 1. [`filing`] parses one submission document into filer metadata plus
//!    holding records.
//! 2. [`corpus`] walks a downloaded archive, parses every submission and
//!    persists the concatenated holdings table.
//! 3. [`features`] normalizes the table into per-investor value shares
//!    over issuer families.
//! 4. [`similarity`] correlates investors and orders them by hierarchical
//!    clustering.
//! 5. [`network`] thresholds the shares into a laid-out bipartite graph.
//!
//! [`pipeline::build_network`] ties stages 3-5 together behind one call:
//!
//! ```rust
//! use holdnet::corpus::HoldingsTable;
//! use holdnet::pipeline::{build_network, NetworkParams};
//!
//! let table = HoldingsTable::default();
//! let params = NetworkParams::default();
//! // An empty table has no correlatable owners.
//! assert!(build_network(&table, &params).is_err());
//! ```

#![warn(clippy::all)]

pub mod corpus;
pub mod features;
pub mod filing;
pub mod network;
pub mod pipeline;
pub mod similarity;

pub use corpus::{BatchSummary, CorpusBuilder, CorpusError, HoldingsTable};
pub use features::{IssuerKey, NormalizedFeatures};
pub use filing::{FilingMetadata, HoldingRecord, OptionFlag, ParseError, ParsedFiling};
pub use network::{BipartiteNetwork, NetworkEdge, NetworkNode, NodeKind};
pub use pipeline::{build_network, BuildError, NetworkParams};
pub use similarity::{Linkage, SimilarityError, SimilarityMatrix};

/// Default seed for the seeded stages (layout, optional subsample).
pub const DEFAULT_SEED: u64 = 13;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version string
pub fn version() -> &'static str {
    VERSION
}
