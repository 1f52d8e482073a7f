//! Lower-triangular dissimilarity matrix whose diagonal holds cluster populations.
use rayon::prelude::*;

/// A packed `n x n` lower-triangular matrix.
///
/// The diagonal cell `i` holds the population of the cluster `i` (0 once absorbed), and
/// the off-diagonal cell `(i, j)` with `i > j` holds the linkage distance between the
/// clusters `i` and `j`.
#[derive(Clone, Debug, PartialEq)]
pub struct DissimilarityMatrix {
    n: usize,
    cells: Vec<f64>,
}

impl DissimilarityMatrix {
    /// Builds the initial matrix of singleton clusters from pairwise dissimilarities of `items`.
    pub fn new<T, F>(items: &[T], dissim: F) -> Self
    where
        F: Fn(&T, &T) -> f64,
    {
        Self::from_fn(items.len(), |i, j| dissim(&items[i], &items[j]))
    }

    /// Parallel version of [`Self::new()`].
    /// The result is identical to the sequential one.
    pub fn new_in_parallel<T, F>(items: &[T], dissim: F) -> Self
    where
        T: Sync,
        F: Fn(&T, &T) -> f64 + Sync,
    {
        let n = items.len();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut row = Vec::with_capacity(i + 1);
                row.extend((0..i).map(|j| dissim(&items[i], &items[j])));
                row.push(1.);
                row
            })
            .collect();
        Self {
            n,
            cells: rows.into_iter().flatten().collect(),
        }
    }

    /// Builds the initial matrix of `n` singleton clusters, where `dissim(i, j)` is
    /// called once for every `i > j`.
    pub fn from_fn<F>(n: usize, mut dissim: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        let mut cells = Vec::with_capacity(n * (n + 1) / 2);
        for i in 0..n {
            for j in 0..i {
                cells.push(dissim(i, j));
            }
            cells.push(1.);
        }
        Self { n, cells }
    }

    /// Gets the number of rows (and columns).
    pub const fn len(&self) -> usize {
        self.n
    }

    /// Checks if the matrix has no rows.
    pub const fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Gets the population of the cluster `i`, which is 0 if it was absorbed.
    pub fn size(&self, i: usize) -> f64 {
        self.cells[Self::index(i, i)]
    }

    /// Checks if the cluster `i` has not been absorbed yet.
    pub fn is_active(&self, i: usize) -> bool {
        self.size(i) > 0.
    }

    /// Gets the number of active clusters.
    pub fn num_active(&self) -> usize {
        (0..self.n).filter(|&i| self.is_active(i)).count()
    }

    /// Gets the distance between the clusters `i` and `j` (in either order, `i != j`).
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        debug_assert_ne!(i, j);
        self.cells[Self::index(i, j)]
    }

    pub(crate) fn set_size(&mut self, i: usize, size: f64) {
        self.cells[Self::index(i, i)] = size;
    }

    pub(crate) fn set_distance(&mut self, i: usize, j: usize, dist: f64) {
        debug_assert_ne!(i, j);
        self.cells[Self::index(i, j)] = dist;
    }

    #[inline(always)]
    const fn index(i: usize, j: usize) -> usize {
        let (i, j) = if i >= j { (i, j) } else { (j, i) };
        i * (i + 1) / 2 + j
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let m = DissimilarityMatrix::from_fn(4, |i, j| (i * 10 + j) as f64);
        assert_eq!(m.len(), 4);
        for i in 0..4 {
            assert_eq!(m.size(i), 1.);
            for j in 0..i {
                assert_eq!(m.distance(i, j), (i * 10 + j) as f64);
                assert_eq!(m.distance(j, i), (i * 10 + j) as f64);
            }
        }
    }

    #[test]
    fn test_parallel_is_identical() {
        let items: Vec<f64> = (0..37).map(|x| (x as f64 * 0.37).sin()).collect();
        let dissim = |a: &f64, b: &f64| (a - b).abs();
        assert_eq!(
            DissimilarityMatrix::new(&items, dissim),
            DissimilarityMatrix::new_in_parallel(&items, dissim)
        );
    }

    #[test]
    fn test_empty() {
        let m = DissimilarityMatrix::new(&Vec::<f64>::new(), |a, b| a - b);
        assert!(m.is_empty());
        assert_eq!(m.num_active(), 0);
    }

    #[test]
    fn test_deactivate() {
        let mut m = DissimilarityMatrix::from_fn(3, |_, _| 0.5);
        m.set_size(1, 0.);
        assert!(!m.is_active(1));
        assert_eq!(m.num_active(), 2);
    }
}
