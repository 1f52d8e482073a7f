//! Sparse feature vectors keyed by strings, and the dissimilarity measures
//! used to compare them.
//!
//! ```
//! use sparsevec::{Dissimilarity, SparseVector};
//!
//! let x: SparseVector = [("div", 2.), ("span", 1.)].into_iter().collect();
//! let y: SparseVector = [("div", 2.), ("p", 3.)].into_iter().collect();
//!
//! assert_eq!(SparseVector::dot(&x, &y), 4.);
//! assert_eq!(Dissimilarity::Jaccard.distance(&x, &y), 1. - 1. / 3.);
//! ```
#![deny(missing_docs)]

pub mod dissimilarity;
pub mod vector;

pub use dissimilarity::Dissimilarity;
pub use vector::SparseVector;

/// Norms below this value are treated as zero.
pub const EPSILON: f64 = 1e-8;
