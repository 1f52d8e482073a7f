//! Dendrograms folded from merge histories.
use agglomerative::Merge;
use serde::{Deserialize, Serialize};
use sparsevec::vector::round_half_up;
use sparsevec::SparseVector;

use crate::errors::{FindSimpageError, Result};

/// A node of a dendrogram.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DendrogramNode {
    /// Union of two subtrees.
    Internal {
        /// Synthetic identifier `-(k+1)` of the `k`-th merge.
        name: i64,
        /// Linkage distance of the merge.
        dist: f64,
        /// The subtrees of the lower and the higher slots.
        children: Box<[DendrogramNode; 2]>,
        /// Population-weighted interpolation of the children's vectors.
        vec: SparseVector,
    },
    /// A clustered entry.
    Leaf {
        /// Index of the entry.
        name: usize,
        /// Vector of the entry.
        vec: SparseVector,
    },
}

impl DendrogramNode {
    /// Gets the vector.
    pub const fn vec(&self) -> &SparseVector {
        match self {
            Self::Internal { vec, .. } | Self::Leaf { vec, .. } => vec,
        }
    }

    /// Gets the merge distance, or `None` for a leaf.
    pub const fn dist(&self) -> Option<f64> {
        match self {
            Self::Internal { dist, .. } => Some(*dist),
            Self::Leaf { .. } => None,
        }
    }

    /// Collects the entry indices of the leaves from left to right.
    pub fn leaves(&self) -> Vec<usize> {
        let mut leaves = vec![];
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves(&self, leaves: &mut Vec<usize>) {
        match self {
            Self::Internal { children, .. } => {
                children[0].collect_leaves(leaves);
                children[1].collect_leaves(leaves);
            }
            Self::Leaf { name, .. } => leaves.push(*name),
        }
    }

    fn round(&mut self, digits: i32) {
        match self {
            Self::Internal {
                dist,
                children,
                vec,
                ..
            } => {
                children[0].round(digits);
                children[1].round(digits);
                vec.round(digits);
                *dist = round_half_up(*dist, digits);
            }
            Self::Leaf { vec, .. } => {
                vec.round(digits);
            }
        }
    }

    fn cut(&self, height: f64, clusters: &mut Vec<Vec<usize>>) {
        match self {
            Self::Internal { dist, children, .. } if *dist > height => {
                children[0].cut(height, clusters);
                children[1].cut(height, clusters);
            }
            _ => clusters.push(self.leaves()),
        }
    }
}

/// A binary tree recording a clustering history.
///
/// # Examples
///
/// ```
/// use agglomerative::{Hclust, Linkage};
/// use find_simpage::dendrogram::Dendrogram;
/// use sparsevec::{Dissimilarity, SparseVector};
///
/// let vectors: Vec<SparseVector> = vec![
///     [("div", 1.)].into_iter().collect(),
///     [("div", 1.), ("p", 1.)].into_iter().collect(),
///     [("form", 1.)].into_iter().collect(),
/// ];
/// let merges = Hclust::new(Linkage::Average)
///     .cluster(&vectors, |x, y| Dissimilarity::Jaccard.distance(x, y));
/// let tree = Dendrogram::build(&vectors, &merges).unwrap();
///
/// assert_eq!(tree.cut(0.6), vec![vec![0, 1], vec![2]]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    root: Option<DendrogramNode>,
}

impl Dendrogram {
    /// Folds the merges in order into a tree whose leaves hold `vectors`.
    ///
    /// Without any merge, the root is the only leaf (or nothing for no vector).
    pub fn build(vectors: &[SparseVector], merges: &[Merge]) -> Result<Self> {
        let mut slots: Vec<_> = vectors
            .iter()
            .enumerate()
            .map(|(name, vec)| {
                Some(DendrogramNode::Leaf {
                    name,
                    vec: vec.clone(),
                })
            })
            .collect();

        for (k, merge) in merges.iter().enumerate() {
            let [left_id, right_id] = merge.pair;
            let [left_size, right_size] = merge.sizes;
            let left = Self::take_slot(&mut slots, left_id)?;
            let right = Self::take_slot(&mut slots, right_id)?;
            let vec = SparseVector::interp(
                left.vec(),
                right.vec(),
                left_size as f64,
                right_size as f64,
            );
            slots[left_id] = Some(DendrogramNode::Internal {
                name: -(k as i64) - 1,
                dist: merge.dist,
                children: Box::new([left, right]),
                vec,
            });
        }

        Ok(Self {
            root: slots.into_iter().next().flatten(),
        })
    }

    fn take_slot(slots: &mut [Option<DendrogramNode>], id: usize) -> Result<DendrogramNode> {
        slots
            .get_mut(id)
            .and_then(Option::take)
            .ok_or_else(|| FindSimpageError::input(format!("merge refers to a missing cluster {id}")))
    }

    /// Gets the root node.
    pub const fn root(&self) -> Option<&DendrogramNode> {
        self.root.as_ref()
    }

    /// Takes the root node.
    pub fn into_root(self) -> Option<DendrogramNode> {
        self.root
    }

    /// Rounds all the vectors and distances to `digits` decimal places, halves rounded up.
    pub fn round(&mut self, digits: i32) -> &mut Self {
        if let Some(root) = self.root.as_mut() {
            root.round(digits);
        }
        self
    }

    /// Cuts the tree at `height`, returning the entry indices of each subtree
    /// whose merge distance is not above `height`.
    pub fn cut(&self, height: f64) -> Vec<Vec<usize>> {
        let mut clusters = vec![];
        if let Some(root) = self.root.as_ref() {
            root.cut(height, &mut clusters);
        }
        clusters
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, f64)]) -> SparseVector {
        entries.iter().map(|&(k, w)| (k, w)).collect()
    }

    fn merge(pair: [usize; 2], sizes: [usize; 2], dist: f64) -> Merge {
        Merge { pair, sizes, dist }
    }

    #[test]
    fn test_empty() {
        let tree = Dendrogram::build(&[], &[]).unwrap();
        assert!(tree.root().is_none());
        assert!(tree.cut(1.).is_empty());
    }

    #[test]
    fn test_single_leaf() {
        let v = vector(&[("a", 1.)]);
        let tree = Dendrogram::build(&[v.clone()], &[]).unwrap();
        assert_eq!(tree.root(), Some(&DendrogramNode::Leaf { name: 0, vec: v }));
    }

    #[test]
    fn test_build() {
        let vectors = vec![
            vector(&[("a", 1.)]),
            vector(&[("b", 1.)]),
            vector(&[("a", 1.), ("b", 1.)]),
        ];
        let merges = vec![merge([0, 2], [1, 1], 0.5), merge([0, 1], [2, 1], 0.75)];
        let tree = Dendrogram::build(&vectors, &merges).unwrap();
        let root = tree.root().unwrap();

        assert_eq!(root.leaves(), vec![0, 2, 1]);
        assert_eq!(root.dist(), Some(0.75));
        match root {
            DendrogramNode::Internal { name, children, vec, .. } => {
                assert_eq!(*name, -2);
                assert_eq!(children[0].dist(), Some(0.5));
                assert_eq!(children[0].vec(), &vector(&[("a", 1.), ("b", 0.5)]));
                // (2*{a:1,b:0.5} + 1*{b:1}) / 3
                assert!((vec.get("a") - 2. / 3.).abs() < 1e-12);
                assert!((vec.get("b") - 2. / 3.).abs() < 1e-12);
            }
            DendrogramNode::Leaf { .. } => panic!("root must be internal"),
        }
    }

    #[test]
    fn test_invalid_merges() {
        let vectors = vec![vector(&[("a", 1.)]), vector(&[("b", 1.)])];
        assert!(Dendrogram::build(&vectors, &[merge([0, 5], [1, 1], 0.)]).is_err());
        let twice = vec![merge([0, 1], [1, 1], 0.), merge([0, 1], [2, 1], 0.)];
        assert!(Dendrogram::build(&vectors, &twice).is_err());
    }

    #[test]
    fn test_round() {
        let vectors = vec![vector(&[("a", 1.)]), vector(&[("a", 1.), ("b", 1.)])];
        let merges = vec![merge([0, 1], [1, 2], 1. / 3.)];
        let mut tree = Dendrogram::build(&vectors, &merges).unwrap();
        tree.round(3);
        let root = tree.root().unwrap();
        assert_eq!(root.dist(), Some(0.333));
        assert_eq!(root.vec(), &vector(&[("a", 1.), ("b", 0.667)]));
    }

    #[test]
    fn test_cut() {
        let vectors = vec![
            vector(&[("a", 1.)]),
            vector(&[("b", 1.)]),
            vector(&[("c", 1.)]),
            vector(&[("d", 1.)]),
        ];
        let merges = vec![
            merge([0, 1], [1, 1], 0.1),
            merge([2, 3], [1, 1], 0.2),
            merge([0, 2], [2, 2], 0.9),
        ];
        let tree = Dendrogram::build(&vectors, &merges).unwrap();
        assert_eq!(tree.cut(1.), vec![vec![0, 1, 2, 3]]);
        assert_eq!(tree.cut(0.5), vec![vec![0, 1], vec![2, 3]]);
        assert_eq!(tree.cut(0.15), vec![vec![0, 1], vec![2], vec![3]]);
        assert_eq!(tree.cut(0.), vec![vec![0], vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_serialize() {
        let vectors = vec![vector(&[("a", 1.)]), vector(&[("b", 1.)])];
        let tree = Dendrogram::build(&vectors, &[merge([0, 1], [1, 1], 2.)]).unwrap();
        let json = serde_json::to_string(tree.root().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"name":-1,"dist":2.0,"children":[{"name":0,"vec":{"a":1.0}},{"name":1,"vec":{"b":1.0}}],"vec":{"a":0.5,"b":0.5}}"#
        );
        let back: DendrogramNode = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, tree.root().unwrap());
    }
}
