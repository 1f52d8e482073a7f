//! Agglomerative hierarchical clustering.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::matrix::DissimilarityMatrix;

/// Rules extending a pairwise distance to clusters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linkage {
    /// The distance between the nearest members.
    Single,
    /// The population-weighted mean of the distances.
    Average,
}

impl Linkage {
    /// Gets the name used in configurations.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Average => "average",
        }
    }

    /// Computes the distance from a cluster to the union of two clusters
    /// of `size1` and `size2` members at distances `dist1` and `dist2`.
    #[inline(always)]
    pub fn combine(self, dist1: f64, dist2: f64, size1: f64, size2: f64) -> f64 {
        match self {
            Self::Single => {
                if dist1 <= dist2 {
                    dist1
                } else {
                    dist2
                }
            }
            Self::Average => (size1 * dist1 + size2 * dist2) / (size1 + size2),
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Linkage {
    type Err = &'static str;
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "single" => Ok(Self::Single),
            "average" => Ok(Self::Average),
            _ => Err("Could not parse a linkage method"),
        }
    }
}

/// A record of one agglomeration step.
///
/// The cluster `pair[1]` is absorbed into the cluster `pair[0]`, where `pair[0] < pair[1]`
/// and both are indices of the original items (the slot of the lower one is reused).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    /// Slots of the merged clusters.
    pub pair: [usize; 2],
    /// Populations of the merged clusters.
    pub sizes: [usize; 2],
    /// Linkage distance at which the clusters were merged.
    pub dist: f64,
}

/// Agglomerative hierarchical clustering.
///
/// Each step scans all the active pairs `(j, i)` with `j < i` in row-major order and merges the
/// first pair with the minimum distance; ties therefore depend on the input order.
/// The whole clustering takes `O(n^3)` time for `n` items.
pub struct Hclust {
    linkage: Linkage,
    shows_progress: bool,
}

impl Hclust {
    /// Creates an instance with the linkage rule.
    pub const fn new(linkage: Linkage) -> Self {
        Self {
            linkage,
            shows_progress: false,
        }
    }

    /// Logs the progress?
    pub const fn shows_progress(mut self, yes: bool) -> Self {
        self.shows_progress = yes;
        self
    }

    /// Gets the linkage rule.
    pub const fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Clusters `items` with the dissimilarity function, returning the merge history.
    pub fn cluster<T, F>(&self, items: &[T], dissim: F) -> Vec<Merge>
    where
        F: Fn(&T, &T) -> f64,
    {
        self.cluster_matrix(DissimilarityMatrix::new(items, dissim))
    }

    /// Same as [`Self::cluster()`] but initializes the matrix in parallel.
    pub fn cluster_in_parallel<T, F>(&self, items: &[T], dissim: F) -> Vec<Merge>
    where
        T: Sync,
        F: Fn(&T, &T) -> f64 + Sync,
    {
        self.cluster_matrix(DissimilarityMatrix::new_in_parallel(items, dissim))
    }

    /// Clusters from the initial matrix of singleton clusters.
    ///
    /// The loop stops when fewer than two active clusters remain, or when every remaining pair
    /// has a NaN distance. Infinite distances still merge, last.
    pub fn cluster_matrix(&self, mut matrix: DissimilarityMatrix) -> Vec<Merge> {
        let n = matrix.len();
        if self.shows_progress {
            tracing::info!(n, linkage = %self.linkage, "[Hclust::cluster_matrix] start");
        }

        let mut merges = Vec::with_capacity(n.saturating_sub(1));
        while let Some((target1, target2, dist)) = Self::closest_pair(&matrix) {
            let size1 = matrix.size(target1);
            let size2 = matrix.size(target2);
            merges.push(Merge {
                pair: [target1, target2],
                sizes: [size1 as usize, size2 as usize],
                dist,
            });
            tracing::debug!(target1, target2, dist, "[Hclust::cluster_matrix] merged");

            for k in 0..n {
                if k == target1 || k == target2 || !matrix.is_active(k) {
                    continue;
                }
                let d1 = matrix.distance(k, target1);
                let d2 = matrix.distance(k, target2);
                matrix.set_distance(k, target1, self.linkage.combine(d1, d2, size1, size2));
            }
            matrix.set_size(target1, size1 + size2);
            matrix.set_size(target2, 0.);

            if self.shows_progress && merges.len() % 1000 == 0 {
                tracing::info!(
                    "[Hclust::cluster_matrix] Processed {}/{}...",
                    merges.len(),
                    n - 1
                );
            }
        }
        if self.shows_progress {
            tracing::info!(
                num_merges = merges.len(),
                "[Hclust::cluster_matrix] Done"
            );
        }
        merges
    }

    /// Finds the first active pair `(j, i)`, `j < i`, with the minimum distance,
    /// seeded with the first pair whose distance is not NaN.
    fn closest_pair(matrix: &DissimilarityMatrix) -> Option<(usize, usize, f64)> {
        let mut found = None;
        let mut min = f64::INFINITY;
        for i in 0..matrix.len() {
            if !matrix.is_active(i) {
                continue;
            }
            for j in 0..i {
                if !matrix.is_active(j) {
                    continue;
                }
                let d = matrix.distance(i, j);
                let closer = match found {
                    Some(_) => d < min,
                    None => !d.is_nan(),
                };
                if closer {
                    found = Some((j, i, d));
                    min = d;
                }
            }
        }
        found
    }
}
