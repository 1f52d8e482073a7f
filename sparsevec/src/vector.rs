//! Sparse vectors over string features.
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::AddAssign;

use hashbrown::HashMap;
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::EPSILON;

/// A mapping from feature keys to weights, where an absent key has weight 0.
///
/// Equality and hashing are structural, so two vectors built in different
/// insertion orders compare equal and can be used as the same map key.
/// Weights are expected to be finite.
#[derive(Clone, Default, PartialEq)]
pub struct SparseVector {
    weights: HashMap<String, f64>,
}

impl SparseVector {
    /// Creates an empty vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Alias of [`Self::new()`].
    pub fn zero() -> Self {
        Self::default()
    }

    /// Gets the number of stored features.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Checks if no feature is stored.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Gets the weight of `key`, or 0 if it is absent.
    pub fn get(&self, key: &str) -> f64 {
        self.weights.get(key).copied().unwrap_or(0.)
    }

    /// Checks if `key` is stored.
    pub fn contains_key(&self, key: &str) -> bool {
        self.weights.contains_key(key)
    }

    /// Sets the weight of `key`.
    pub fn insert<K>(&mut self, key: K, weight: f64)
    where
        K: Into<String>,
    {
        self.weights.insert(key.into(), weight);
    }

    /// Adds `weight` to the weight of `key`.
    pub fn increment<K>(&mut self, key: K, weight: f64)
    where
        K: Into<String>,
    {
        *self.weights.entry(key.into()).or_insert(0.) += weight;
    }

    /// Iterates over stored features in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, &w)| (k.as_str(), w))
    }

    /// Iterates over stored feature keys in arbitrary order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    /// Gets the stored features sorted by key.
    pub fn sorted(&self) -> Vec<(&str, f64)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }

    /// Multiplies every weight by `scale`.
    pub fn scale(&mut self, scale: f64) -> &mut Self {
        self.weights.values_mut().for_each(|w| *w *= scale);
        self
    }

    /// Scales the vector to the unit L2 norm.
    /// The vector is left unchanged if its norm is below [`EPSILON`].
    pub fn normalize(&mut self) -> &mut Self {
        let norm = self.l2norm();
        if norm >= EPSILON {
            self.scale(1. / norm);
        }
        self
    }

    /// Consuming variant of [`Self::normalize()`].
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }

    /// Rounds every weight to `digits` decimal places, halves rounded up.
    pub fn round(&mut self, digits: i32) -> &mut Self {
        self.weights
            .values_mut()
            .for_each(|w| *w = round_half_up(*w, digits));
        self
    }

    /// Sums all the weights.
    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    /// Computes the L2 norm.
    pub fn l2norm(&self) -> f64 {
        Self::dot(self, self).sqrt()
    }

    /// Computes the dot product over the keys stored in both vectors.
    pub fn dot(u: &Self, v: &Self) -> f64 {
        let (small, large) = if u.len() <= v.len() { (u, v) } else { (v, u) };
        small
            .weights
            .iter()
            .filter_map(|(k, &w)| large.weights.get(k).map(|&x| w * x))
            .sum()
    }

    /// Counts the shared keys, normalized by the geometric mean of the numbers of keys.
    /// Returns 0 if either vector is empty.
    pub fn dot_inf(u: &Self, v: &Self) -> f64 {
        if u.is_empty() || v.is_empty() {
            return 0.;
        }
        let shared = Self::num_shared_keys(u, v) as f64;
        shared / ((u.len() * v.len()) as f64).sqrt()
    }

    /// Computes the Jaccard similarity of the key sets.
    /// Two empty vectors are regarded as identical.
    pub fn jaccard(u: &Self, v: &Self) -> f64 {
        let shared = Self::num_shared_keys(u, v);
        let union = u.len() + v.len() - shared;
        if union == 0 {
            return 1.;
        }
        shared as f64 / union as f64
    }

    /// Interpolates two vectors weighted by the sizes of their populations,
    /// i.e., `(left*left_size + right*right_size) / (left_size+right_size)`.
    pub fn interp(left: &Self, right: &Self, left_size: f64, right_size: f64) -> Self {
        let mut merged = left.clone();
        merged.scale(left_size);
        let mut other = right.clone();
        other.scale(right_size);
        merged += &other;
        merged.scale(1. / (left_size + right_size));
        merged
    }

    fn num_shared_keys(u: &Self, v: &Self) -> usize {
        let (small, large) = if u.len() <= v.len() { (u, v) } else { (v, u) };
        small
            .weights
            .keys()
            .filter(|k| large.weights.contains_key(*k))
            .count()
    }
}

/// Rounds `x` to `digits` decimal places, with halves rounded away from zero.
pub fn round_half_up(x: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    let rounded = (x * scale).round() / scale;
    if rounded.is_finite() {
        rounded
    } else {
        x
    }
}

impl Eq for SparseVector {}

impl Hash for SparseVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let entries = self.sorted();
        entries.len().hash(state);
        for (key, weight) in entries {
            key.hash(state);
            // 0.0 and -0.0 are equal, so they must hash alike.
            let weight = if weight == 0. { 0. } else { weight };
            weight.to_bits().hash(state);
        }
    }
}

impl AddAssign<&SparseVector> for SparseVector {
    fn add_assign(&mut self, rhs: &SparseVector) {
        for (k, &w) in &rhs.weights {
            *self.weights.entry(k.clone()).or_insert(0.) += w;
        }
    }
}

impl<K> FromIterator<(K, f64)> for SparseVector
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut vec = Self::new();
        vec.extend(iter);
        vec
    }
}

impl<K> Extend<(K, f64)> for SparseVector
where
    K: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, f64)>>(&mut self, iter: I) {
        for (k, w) in iter {
            self.insert(k, w);
        }
    }
}

impl fmt::Debug for SparseVector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.sorted()).finish()
    }
}

impl Serialize for SparseVector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries = self.sorted();
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (k, w) in entries {
            map.serialize_entry(k, &w)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SparseVector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let weights = BTreeMap::<String, f64>::deserialize(deserializer)?;
        Ok(weights.into_iter().collect())
    }
}
