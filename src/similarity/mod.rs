//! Similarity Engine: pairwise investor correlation plus a
//! clustering-induced display ordering.

mod cluster;

pub use cluster::{cluster_order, Linkage};

use crate::features::NormalizedFeatures;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors raised by similarity computation.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SimilarityError {
    /// Correlation is undefined for fewer than two observations.
    #[error("similarity requires at least 2 owners, got {0}")]
    InsufficientData(usize),
}

pub type SimilarityResult<T> = Result<T, SimilarityError>;

/// Symmetric owner × owner correlation matrix, rows and columns permuted
/// into the dendrogram's leaf order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatrix {
    /// Owner ids in display order (both axes).
    pub owner_ids: Vec<String>,
    /// Pearson correlation entries; diagonal is exactly 1.
    pub matrix: Array2<f64>,
}

impl SimilarityMatrix {
    pub fn len(&self) -> usize {
        self.owner_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owner_ids.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.matrix[[i, j]]
    }
}

/// Pearson correlation between every pair of rows of `data`, columns being
/// the observation axis. Owners with identical investment *shapes*
/// correlate near 1 regardless of absolute scale.
///
/// A zero-variance row has no defined correlation with anything; its
/// off-diagonal entries are set to 0 (no linear relationship) so the
/// result stays total. The diagonal is exactly 1.
pub fn correlation_matrix(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows();
    let m = data.ncols();

    // Center each row on its mean.
    let mut centered = data.clone();
    for mut row in centered.rows_mut() {
        let mean = row.sum() / m as f64;
        row.mapv_inplace(|v| v - mean);
    }

    let norms: Array1<f64> = centered
        .rows()
        .into_iter()
        .map(|row| row.dot(&row).sqrt())
        .collect();

    // Cross products in one matrix multiply, then normalize.
    let products = centered.dot(&centered.t());
    let mut corr = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        corr[[i, i]] = 1.0;
        for j in (i + 1)..n {
            let denom = norms[i] * norms[j];
            let r = if denom > 0.0 {
                (products[[i, j]] / denom).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            corr[[i, j]] = r;
            corr[[j, i]] = r;
        }
    }
    corr
}

/// Build the ordered similarity matrix for a normalized feature table.
pub fn build(features: &NormalizedFeatures, linkage: Linkage) -> SimilarityResult<SimilarityMatrix> {
    let n = features.owner_count();
    if n < 2 {
        return Err(SimilarityError::InsufficientData(n));
    }

    let corr = correlation_matrix(features.matrix());
    let order = cluster_order(&corr, linkage);
    debug!(owners = n, %linkage, "similarity matrix clustered");

    let owner_ids: Vec<String> = features.owner_ids().map(str::to_string).collect();
    let ordered_ids: Vec<String> = order.iter().map(|&i| owner_ids[i].clone()).collect();
    let mut ordered = Array2::<f64>::zeros((n, n));
    for (i, &oi) in order.iter().enumerate() {
        for (j, &oj) in order.iter().enumerate() {
            ordered[[i, j]] = corr[[oi, oj]];
        }
    }

    Ok(SimilarityMatrix {
        owner_ids: ordered_ids,
        matrix: ordered,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::HoldingsTable;
    use crate::features::normalize;
    use crate::filing::{HoldingRecord, OptionFlag};
    use chrono::NaiveDate;
    use ndarray::array;

    fn record(owner: &str, cusip: &str, value: u64) -> HoldingRecord {
        HoldingRecord {
            issuer_name: "SOME ISSUER".to_string(),
            cusip: cusip.to_string(),
            value,
            share_amount: 1,
            option_flag: OptionFlag::None,
            owner_name: owner.to_string(),
            owner_id: owner.to_string(),
            report_date: NaiveDate::from_ymd_opt(2019, 12, 31).unwrap(),
        }
    }

    #[test]
    fn perfectly_aligned_rows_correlate_to_one() {
        // Same shape, different scale.
        let data = array![[0.2, 0.8, 0.0], [0.1, 0.4, 0.0]];
        let corr = correlation_matrix(&data);
        assert!((corr[[0, 1]] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn opposite_rows_correlate_to_minus_one() {
        let data = array![[1.0, 0.0], [0.0, 1.0]];
        let corr = correlation_matrix(&data);
        assert!((corr[[0, 1]] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let data = array![
            [0.5, 0.5, 0.0, 0.0],
            [0.0, 0.3, 0.7, 0.0],
            [0.1, 0.1, 0.2, 0.6]
        ];
        let corr = correlation_matrix(&data);
        for i in 0..3 {
            assert_eq!(corr[[i, i]], 1.0);
            for j in 0..3 {
                assert!((corr[[i, j]] - corr[[j, i]]).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn zero_variance_row_correlates_zero() {
        let data = array![[0.5, 0.5], [0.2, 0.8]];
        let corr = correlation_matrix(&data);
        assert_eq!(corr[[0, 1]], 0.0);
        assert_eq!(corr[[0, 0]], 1.0);
    }

    #[test]
    fn single_owner_is_insufficient() {
        let table = HoldingsTable::new(vec![record("A", "111111111", 100)]);
        let features = normalize(&table);
        assert_eq!(
            build(&features, Linkage::Ward),
            Err(SimilarityError::InsufficientData(1))
        );
    }

    #[test]
    fn build_orders_similar_owners_together() {
        // A and C hold the same issuer; B holds a different one.
        let table = HoldingsTable::new(vec![
            record("A", "111111111", 100),
            record("B", "222222222", 100),
            record("C", "111111111", 50),
            record("C", "333333333", 5),
            record("B", "333333333", 5),
        ]);
        let features = normalize(&table);
        let sim = build(&features, Linkage::Complete).unwrap();

        assert_eq!(sim.len(), 3);
        let pos = |o: &str| sim.owner_ids.iter().position(|v| v == o).unwrap();
        assert_eq!(pos("A").abs_diff(pos("C")), 1);
        for i in 0..3 {
            assert_eq!(sim.get(i, i), 1.0);
        }
    }
}
