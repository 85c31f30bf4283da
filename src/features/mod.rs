//! Feature Normalizer: holdings table → per-investor normalized investment
//! vectors over issuers.
//!
//! Each owner's holdings are expressed as value shares of that owner's
//! total portfolio, aggregated by issuer family (first 6 CUSIP characters)
//! and pivoted into a dense owner × issuer matrix. The stage is a chain of
//! total functions over an immutable input table; for a fixed input the
//! output is bit-for-bit reproducible.

use crate::corpus::HoldingsTable;
use crate::filing::OptionFlag;
use indexmap::IndexMap;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Derived issuer identity: the first 6 characters of a CUSIP, shared by
/// every share class of the same issuing company.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssuerKey(String);

impl IssuerKey {
    /// Derivation is idempotent and total; CUSIPs shorter than 6
    /// characters map to themselves.
    pub fn from_cusip(cusip: &str) -> Self {
        let end = cusip
            .char_indices()
            .nth(6)
            .map(|(i, _)| i)
            .unwrap_or(cusip.len());
        IssuerKey(cusip[..end].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for IssuerKey {
    fn from(s: &str) -> Self {
        IssuerKey::from_cusip(s)
    }
}

/// Options for the normalization stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Optional seeded subsample of the raw records, applied once before
    /// normalization so every downstream artifact sees the same rows.
    /// `None` means full data.
    pub sample_fraction: Option<f64>,
    /// Seed for the subsample draw.
    pub seed: u64,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        NormalizeOptions {
            sample_fraction: None,
            seed: crate::DEFAULT_SEED,
        }
    }
}

/// Issuer display labels: first surviving record's issuer name, truncated
/// to its first 3 whitespace-delimited tokens.
fn truncate_label(name: &str) -> String {
    name.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}

/// Normalized per-investor feature table plus the dense pivoted matrix.
#[derive(Debug, Clone)]
pub struct NormalizedFeatures {
    /// Owner CIK → row index, in first-appearance order.
    owners: IndexMap<String, usize>,
    /// Issuer key → column index, in first-appearance order.
    issuers: IndexMap<IssuerKey, usize>,
    /// Dense owner × issuer matrix of normalized values; a missing holding
    /// is a true zero.
    matrix: Array2<f64>,
    /// Issuer key → display label.
    labels: FxHashMap<IssuerKey, String>,
}

impl NormalizedFeatures {
    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn issuer_count(&self) -> usize {
        self.issuers.len()
    }

    /// Owner ids in row order.
    pub fn owner_ids(&self) -> impl Iterator<Item = &str> {
        self.owners.keys().map(String::as_str)
    }

    /// Issuer keys in column order.
    pub fn issuer_keys(&self) -> impl Iterator<Item = &IssuerKey> {
        self.issuers.keys()
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// Display label for an issuer, if one was seen.
    pub fn label(&self, key: &IssuerKey) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// All non-zero `(owner_id, issuer_key, normalized_value)` triples, in
    /// row-major order.
    pub fn triples(&self) -> impl Iterator<Item = (&str, &IssuerKey, f64)> + '_ {
        self.owners.keys().enumerate().flat_map(move |(i, owner)| {
            self.issuers
                .keys()
                .enumerate()
                .filter_map(move |(j, issuer)| {
                    let v = self.matrix[[i, j]];
                    (v != 0.0).then(|| (owner.as_str(), issuer, v))
                })
        })
    }
}

/// Normalize with default options (full data).
pub fn normalize(table: &HoldingsTable) -> NormalizedFeatures {
    normalize_with(table, &NormalizeOptions::default())
}

/// Normalize a holdings table into per-owner value shares.
pub fn normalize_with(table: &HoldingsTable, opts: &NormalizeOptions) -> NormalizedFeatures {
    // Only straight equity positions carry normalization signal; put/call
    // rows are excluded from aggregation.
    let mut rows: Vec<_> = table
        .records()
        .iter()
        .filter(|r| r.option_flag == OptionFlag::None)
        .collect();

    if let Some(fraction) = opts.sample_fraction {
        let keep = ((rows.len() as f64) * fraction).round() as usize;
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(opts.seed);
        indices.shuffle(&mut rng);
        indices.truncate(keep);
        indices.sort_unstable();
        rows = indices.iter().map(|&i| rows[i]).collect();
        debug!(kept = rows.len(), fraction, "subsampled holdings");
    }

    // Per-owner totals over all records, zero-value ones included. Owners
    // whose total is zero never produce a nonzero share and drop out.
    let mut totals: FxHashMap<&str, f64> = FxHashMap::default();
    for rec in &rows {
        *totals.entry(rec.owner_id.as_str()).or_insert(0.0) += rec.value as f64;
    }

    let mut owners: IndexMap<String, usize> = IndexMap::new();
    let mut issuers: IndexMap<IssuerKey, usize> = IndexMap::new();
    let mut labels: FxHashMap<IssuerKey, String> = FxHashMap::default();
    let mut cells: FxHashMap<(usize, usize), f64> = FxHashMap::default();

    for rec in &rows {
        // Zero reported value would only produce a NaN or zero ratio.
        if rec.value == 0 {
            continue;
        }
        let total = totals[rec.owner_id.as_str()];
        let key = IssuerKey::from_cusip(&rec.cusip);

        let next_row = owners.len();
        let row = *owners.entry(rec.owner_id.clone()).or_insert(next_row);
        let next_col = issuers.len();
        let col = *issuers.entry(key.clone()).or_insert(next_col);
        labels
            .entry(key)
            .or_insert_with(|| truncate_label(&rec.issuer_name));

        // An owner may hold several CUSIPs of one issuer family; shares sum.
        *cells.entry((row, col)).or_insert(0.0) += rec.value as f64 / total;
    }

    let mut matrix = Array2::<f64>::zeros((owners.len(), issuers.len()));
    for ((row, col), value) in cells {
        matrix[[row, col]] = value;
    }

    debug!(
        owners = owners.len(),
        issuers = issuers.len(),
        "normalized feature table built"
    );

    NormalizedFeatures {
        owners,
        issuers,
        matrix,
        labels,
    }
}
