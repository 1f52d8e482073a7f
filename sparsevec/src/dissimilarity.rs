//! Dissimilarity measures between sparse vectors.
//!
//! Every measure is symmetric, returns 0 for identical inputs and grows as the inputs differ.
//! None of them is guaranteed to satisfy the triangle inequality.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::vector::SparseVector;
use crate::EPSILON;

/// Dissimilarity measures, selected by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dissimilarity {
    /// `2 - 2*cos(x,y)`, in the range of [0,4] (in [0,2] for non-negative weights).
    Cosine,
    /// `1 - jaccard(x,y)` over the key sets, in the range of [0,1].
    Jaccard,
    /// `2 - 2*(cos(x,y)*jaccard(x,y))^2`.
    CosineJaccard,
    /// `1 - dot_inf(x,y)`, a cosine over the key sets.
    CosineInf,
}

impl Dissimilarity {
    /// All the measures.
    pub const ALL: [Self; 4] = [
        Self::Cosine,
        Self::Jaccard,
        Self::CosineJaccard,
        Self::CosineInf,
    ];

    /// Gets the name used in configurations.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Jaccard => "jaccard",
            Self::CosineJaccard => "cosine_jaccard",
            Self::CosineInf => "cosine_inf",
        }
    }

    /// Computes the dissimilarity between `x` and `y`.
    pub fn distance(self, x: &SparseVector, y: &SparseVector) -> f64 {
        match self {
            Self::Cosine | Self::CosineJaccard => {
                self.distance_with_norms(x, y, x.l2norm(), y.l2norm())
            }
            // Norms are not used.
            Self::Jaccard | Self::CosineInf => self.distance_with_norms(x, y, 0., 0.),
        }
    }

    /// Computes the dissimilarity between `x` and `y` with their precomputed L2 norms.
    pub fn distance_with_norms(
        self,
        x: &SparseVector,
        y: &SparseVector,
        x_norm: f64,
        y_norm: f64,
    ) -> f64 {
        match self {
            Self::Cosine => {
                if x_norm < EPSILON && y_norm < EPSILON {
                    return 0.;
                }
                let cos = cosine_similarity(x, y, x_norm, y_norm);
                (2. - 2. * cos).max(0.)
            }
            Self::Jaccard => {
                if x.is_empty() && y.is_empty() {
                    return 0.;
                }
                1. - SparseVector::jaccard(x, y)
            }
            Self::CosineJaccard => {
                if x.is_empty() && y.is_empty() {
                    return 0.;
                }
                if x_norm < EPSILON && y_norm < EPSILON {
                    return 0.;
                }
                let sim = cosine_similarity(x, y, x_norm, y_norm) * SparseVector::jaccard(x, y);
                (2. - 2. * sim * sim).max(0.)
            }
            Self::CosineInf => {
                if x.is_empty() && y.is_empty() {
                    return 0.;
                }
                (1. - SparseVector::dot_inf(x, y)).max(0.)
            }
        }
    }
}

/// A vector with a near-zero norm shares no direction with anything else.
fn cosine_similarity(x: &SparseVector, y: &SparseVector, x_norm: f64, y_norm: f64) -> f64 {
    if x_norm < EPSILON || y_norm < EPSILON {
        return 0.;
    }
    SparseVector::dot(x, y) / (x_norm * y_norm)
}

impl fmt::Display for Dissimilarity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dissimilarity {
    type Err = &'static str;
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "cosine" => Ok(Self::Cosine),
            "jaccard" => Ok(Self::Jaccard),
            "cosine_jaccard" => Ok(Self::CosineJaccard),
            "cosine_inf" => Ok(Self::CosineInf),
            _ => Err("Could not parse a dissimilarity measure"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, f64)]) -> SparseVector {
        entries.iter().map(|&(k, w)| (k, w)).collect()
    }

    #[test]
    fn test_cosine() {
        let x = vector(&[("a", 1.), ("b", 1.)]);
        let y = vector(&[("a", 2.), ("b", 2.)]);
        let z = vector(&[("c", 5.)]);
        assert!(Dissimilarity::Cosine.distance(&x, &y) < 1e-12);
        assert_eq!(Dissimilarity::Cosine.distance(&x, &z), 2.);

        let w = vector(&[("a", 1.)]);
        let expected = 2. - 2. / 2f64.sqrt();
        assert!((Dissimilarity::Cosine.distance(&x, &w) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_zero_vectors() {
        let zero = SparseVector::zero();
        let x = vector(&[("a", 1.)]);
        assert_eq!(Dissimilarity::Cosine.distance(&zero, &zero), 0.);
        assert_eq!(Dissimilarity::Cosine.distance(&zero, &x), 2.);
        assert_eq!(Dissimilarity::CosineJaccard.distance(&zero, &zero), 0.);
        assert_eq!(Dissimilarity::CosineJaccard.distance(&x, &zero), 2.);
        // Stored zero weights make the vectors non-empty but still norm-less.
        let zeros = vector(&[("a", 0.)]);
        assert_eq!(Dissimilarity::CosineJaccard.distance(&zeros, &zeros), 0.);
    }

    #[test]
    fn test_jaccard() {
        let x = vector(&[("a", 1.), ("b", 1.)]);
        let y = vector(&[("c", 1.), ("d", 9.)]);
        assert_eq!(Dissimilarity::Jaccard.distance(&x, &y), 1.);
        assert_eq!(Dissimilarity::Jaccard.distance(&x, &x), 0.);

        let zero = SparseVector::zero();
        assert_eq!(Dissimilarity::Jaccard.distance(&zero, &zero), 0.);
        assert_eq!(Dissimilarity::Jaccard.distance(&zero, &x), 1.);
    }

    #[test]
    fn test_cosine_jaccard() {
        let x = vector(&[("a", 1.), ("b", 1.)]);
        let y = vector(&[("a", 1.)]);
        // cos = 1/sqrt(2), jaccard = 1/2
        let sim = 1. / 2f64.sqrt() * 0.5;
        let expected = 2. - 2. * sim * sim;
        assert!((Dissimilarity::CosineJaccard.distance(&x, &y) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_inf() {
        let x = vector(&[("a", 1.), ("b", 7.), ("c", 1.), ("d", 1.)]);
        let y = vector(&[("b", 3.)]);
        assert_eq!(Dissimilarity::CosineInf.distance(&x, &y), 0.5);

        let zero = SparseVector::zero();
        assert_eq!(Dissimilarity::CosineInf.distance(&zero, &zero), 0.);
        assert_eq!(Dissimilarity::CosineInf.distance(&zero, &y), 1.);
    }

    #[test]
    fn test_precomputed_norms() {
        let x = vector(&[("a", 3.), ("b", 4.)]);
        let y = vector(&[("a", 4.), ("b", 3.)]);
        for sim in Dissimilarity::ALL {
            assert_eq!(
                sim.distance(&x, &y),
                sim.distance_with_norms(&x, &y, 5., 5.)
            );
        }
    }

    #[test]
    fn test_parse() {
        for sim in Dissimilarity::ALL {
            assert_eq!(sim.to_string().parse::<Dissimilarity>(), Ok(sim));
        }
        assert!("euclid".parse::<Dissimilarity>().is_err());
    }
}
