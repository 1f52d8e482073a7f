//! This library provides offline agglomerative hierarchical clustering over a lower-triangular
//! dissimilarity matrix, supporting the single and average linkage rules.
//!
//! The clustering repeatedly merges the closest pair of active clusters and records
//! every merge, so `n` items always yield `n-1` merges (for `n >= 1`).
//!
//! ```
//! use agglomerative::{Hclust, Linkage};
//!
//! let points = vec![0.0f64, 1.0, 5.0];
//! let merges = Hclust::new(Linkage::Single).cluster(&points, |a, b| (a - b).abs());
//!
//! assert_eq!(merges.len(), 2);
//! assert_eq!(merges[0].pair, [0, 1]);
//! assert_eq!(merges[1].dist, 4.0);
//! ```
#![deny(missing_docs)]

pub mod hclust;
pub mod matrix;

pub use hclust::{Hclust, Linkage, Merge};
pub use matrix::DissimilarityMatrix;
