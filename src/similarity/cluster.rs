//! Agglomerative hierarchical clustering with a selectable linkage
//! criterion, used to reorder the similarity matrix into a
//! block-diagonal-friendly display order.
//!
//! Observations are the rows of the correlation matrix; the metric is
//! Euclidean. Merges run on squared distances: min/max (single/complete)
//! are order-invariant under squaring, and the centroid/Ward update rules
//! are stated on squared distances anyway.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Distance-aggregation rule for cluster merging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    Single,
    Complete,
    Centroid,
    Ward,
}

impl Linkage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Linkage::Single => "single",
            Linkage::Complete => "complete",
            Linkage::Centroid => "centroid",
            Linkage::Ward => "ward",
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Linkage::Single),
            "complete" => Ok(Linkage::Complete),
            "centroid" => Ok(Linkage::Centroid),
            "ward" => Ok(Linkage::Ward),
            other => Err(format!(
                "unknown linkage {other:?} (expected single, complete, centroid or ward)"
            )),
        }
    }
}

/// One active cluster during agglomeration.
struct Cluster {
    /// Leaf indices in display order.
    leaves: Vec<usize>,
    size: f64,
}

/// Cluster the rows of `data` and return the dendrogram's leaf order.
///
/// `data` is any observation matrix (here: the correlation matrix, one row
/// per owner). The returned permutation places similar rows next to each
/// other; applying it to both axes of the similarity matrix yields the
/// display ordering.
pub fn cluster_order(data: &Array2<f64>, linkage: Linkage) -> Vec<usize> {
    let n = data.nrows();
    if n <= 1 {
        return (0..n).collect();
    }

    // Pairwise squared Euclidean distances between rows.
    let mut dist = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let mut d2 = 0.0;
            for k in 0..data.ncols() {
                let diff = data[[i, k]] - data[[j, k]];
                d2 += diff * diff;
            }
            dist[i][j] = d2;
            dist[j][i] = d2;
        }
    }

    let mut clusters: Vec<Option<Cluster>> = (0..n)
        .map(|i| {
            Some(Cluster {
                leaves: vec![i],
                size: 1.0,
            })
        })
        .collect();
    let mut active: Vec<usize> = (0..n).collect();

    while active.len() > 1 {
        // Closest active pair; ties broken by lowest indices so the order
        // is deterministic.
        let (mut best_a, mut best_b) = (active[0], active[1]);
        let mut best_d = f64::INFINITY;
        for (ai, &a) in active.iter().enumerate() {
            for &b in &active[ai + 1..] {
                if dist[a][b] < best_d {
                    best_d = dist[a][b];
                    best_a = a;
                    best_b = b;
                }
            }
        }

        let merged = clusters[best_b].take().expect("active cluster");
        let keeper = clusters[best_a].as_mut().expect("active cluster");
        let (si, sj) = (keeper.size, merged.size);
        let d_ij = dist[best_a][best_b];
        keeper.leaves.extend(merged.leaves);
        keeper.size += merged.size;
        active.retain(|&c| c != best_b);

        // Lance-Williams update of distances from the merged cluster to
        // every other active cluster.
        for &k in &active {
            if k == best_a {
                continue;
            }
            let d_ik = dist[best_a][k];
            let d_jk = dist[best_b][k];
            let sk = clusters[k].as_ref().expect("active cluster").size;
            let updated = match linkage {
                Linkage::Single => d_ik.min(d_jk),
                Linkage::Complete => d_ik.max(d_jk),
                Linkage::Centroid => {
                    let s = si + sj;
                    (si * d_ik + sj * d_jk) / s - (si * sj * d_ij) / (s * s)
                }
                Linkage::Ward => {
                    let s = si + sj + sk;
                    ((si + sk) * d_ik + (sj + sk) * d_jk - sk * d_ij) / s
                }
            };
            dist[best_a][k] = updated;
            dist[k][best_a] = updated;
        }
    }

    let root = active[0];
    clusters[root].take().expect("root cluster").leaves
}
