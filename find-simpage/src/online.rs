//! Online clustering of pages arriving one at a time.
use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};
use sparsevec::{Dissimilarity, SparseVector};

use crate::embed::{EmbedMethod, HtmlEmbedder};
use crate::href::{self, Query};

/// Dissimilarity from which nearest-cluster searches start.
/// A page at this distance or farther never joins an existing cluster, whatever the threshold.
pub const MAX_DISSIM: f64 = 1.0;

/// A cluster of pages sharing a shape.
pub struct Cluster {
    id: usize,
    dissimilarity: Dissimilarity,
    vecset: HashMap<SparseVector, f64>,
    hrefset: HashSet<String>,
    version: u64,
    forbidden: bool,
}

impl Cluster {
    fn new(id: usize, dissimilarity: Dissimilarity) -> Self {
        Self {
            id,
            dissimilarity,
            vecset: HashMap::new(),
            hrefset: HashSet::new(),
            version: 0,
            forbidden: false,
        }
    }

    /// Gets the identifier, which is the 1-based creation order in the session.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// Gets the dissimilarity measure.
    pub const fn dissimilarity(&self) -> Dissimilarity {
        self.dissimilarity
    }

    /// Gets the number of distinct member vectors.
    pub fn num_vectors(&self) -> usize {
        self.vecset.len()
    }

    /// Gets the number of distinct encoded hrefs.
    pub fn num_hrefs(&self) -> usize {
        self.hrefset.len()
    }

    /// Iterates over the distinct member vectors.
    pub fn vectors(&self) -> impl Iterator<Item = &SparseVector> {
        self.vecset.keys()
    }

    /// Checks if the encoded href is a member.
    pub fn contains_href(&self, href: &str) -> bool {
        self.hrefset.contains(href)
    }

    /// Gets the encoded hrefs in sorted order.
    pub fn hrefs(&self) -> Vec<&str> {
        let mut hrefs: Vec<_> = self.hrefset.iter().map(String::as_str).collect();
        hrefs.sort_unstable();
        hrefs
    }

    /// Gets the version, which is bumped whenever the cluster grows.
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Checks if the cluster was marked as forbidden.
    pub const fn is_forbidden(&self) -> bool {
        self.forbidden
    }

    /// Gets the arithmetic mean of the member vectors.
    pub fn center(&self) -> SparseVector {
        let mut center = SparseVector::new();
        for vec in self.vecset.keys() {
            center += vec;
        }
        if !self.vecset.is_empty() {
            center.scale(1. / self.vecset.len() as f64);
        }
        center
    }

    /// Computes the minimum dissimilarity between `vec` and the members,
    /// capped at [`MAX_DISSIM`].
    pub fn dissim(&self, vec: &SparseVector) -> f64 {
        let norm = vec.l2norm();
        self.vecset
            .iter()
            .map(|(member, &member_norm)| {
                self.dissimilarity
                    .distance_with_norms(member, vec, member_norm, norm)
            })
            .fold(MAX_DISSIM, f64::min)
    }

    fn add_example(&mut self, vec: SparseVector, href: String) {
        let mut grown = false;
        if !self.vecset.contains_key(&vec) {
            let norm = vec.l2norm();
            self.vecset.insert(vec, norm);
            grown = true;
        }
        grown |= self.hrefset.insert(href);
        if grown {
            self.version += 1;
        }
    }
}

/// A page given to [`ClusteringSession::add_example()`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Response body.
    pub body: String,
    /// Requested path.
    pub path: String,
    /// Requested query.
    pub query: Option<Query>,
}

/// Exported form of a cluster.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterExport {
    /// Encoded hrefs of the members in sorted order.
    pub urlset: Vec<String>,
    /// L2-normalized center of the member vectors.
    pub center: SparseVector,
}

/// Incremental nearest-cluster classifier.
///
/// Clusters are kept newest first, and a page joins the nearest cluster within the threshold
/// or founds a new one. Mutation happens only through `&mut self`, so sharing a session between
/// threads requires external synchronization.
///
/// # Examples
///
/// ```
/// use find_simpage::embed::EmbedMethod;
/// use find_simpage::online::ClusteringSession;
/// use sparsevec::Dissimilarity;
///
/// let mut session = ClusteringSession::new(EmbedMethod::FullBot, Dissimilarity::Jaccard, 0.2);
/// let a = session.add_example("<p>one</p><p>two</p>", "/a", None);
/// let b = session.add_example("<p>three</p>", "/b", None);
/// let c = session.add_example("<form><input name=q></form>", "/c", None);
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(session.history().len(), 3);
/// ```
pub struct ClusteringSession {
    embedder: HtmlEmbedder,
    dissimilarity: Dissimilarity,
    threshold: f64,
    clusters: Vec<Cluster>,
    history: Vec<Example>,
}

impl ClusteringSession {
    /// Creates an empty session, where a page joins a cluster within the `threshold`.
    pub fn new(embed_method: EmbedMethod, dissimilarity: Dissimilarity, threshold: f64) -> Self {
        Self {
            embedder: HtmlEmbedder::new(embed_method),
            dissimilarity,
            threshold,
            clusters: vec![],
            history: vec![],
        }
    }

    /// Gets the embedding method.
    pub const fn embed_method(&self) -> EmbedMethod {
        self.embedder.method()
    }

    /// Gets the dissimilarity measure.
    pub const fn dissimilarity(&self) -> Dissimilarity {
        self.dissimilarity
    }

    /// Gets the threshold.
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Gets the clusters, newest first.
    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    /// Gets the cluster of `id`.
    pub fn cluster(&self, id: usize) -> Option<&Cluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Gets all the added examples in order.
    pub fn history(&self) -> &[Example] {
        &self.history
    }

    /// Finds the nearest cluster within `threshold` and closer than [`MAX_DISSIM`],
    /// returning its position in [`Self::clusters()`]. Ties are won by the newest cluster.
    pub fn classify(&self, vec: &SparseVector, threshold: f64) -> Option<usize> {
        let mut found = None;
        let mut min = MAX_DISSIM;
        for (i, cluster) in self.clusters.iter().enumerate() {
            let d = cluster.dissim(vec);
            if d < min && d <= threshold {
                found = Some(i);
                min = d;
            }
        }
        found
    }

    /// Embeds and classifies a page, adding it to the matched or a new cluster.
    /// Returns the identifier of the cluster.
    pub fn add_example<B, P>(&mut self, body: B, path: P, query: Option<Query>) -> usize
    where
        B: Into<String>,
        P: Into<String>,
    {
        let example = Example {
            body: body.into(),
            path: path.into(),
            query,
        };
        let vec = self.embedder.embed(&example.body);
        self.add_embedded(vec, example)
    }

    /// Same as [`Self::add_example()`] but with the precomputed embedding of the page.
    pub fn add_embedded(&mut self, vec: SparseVector, example: Example) -> usize {
        let pos = match self.classify(&vec, self.threshold) {
            Some(pos) => pos,
            None => {
                let id = self.clusters.len() + 1;
                tracing::debug!(id, path = %example.path, "[ClusteringSession] new cluster");
                self.clusters.insert(0, Cluster::new(id, self.dissimilarity));
                0
            }
        };
        let cluster = &mut self.clusters[pos];
        cluster.add_example(vec, href::encode(&example.path, example.query.as_ref()));
        let id = cluster.id;
        self.history.push(example);
        id
    }

    /// Marks the cluster of `id` as forbidden without changing its members.
    /// Returns `false` if no such cluster exists.
    pub fn mark_forbidden(&mut self, id: usize) -> bool {
        match self.clusters.iter_mut().find(|c| c.id == id) {
            Some(cluster) => {
                cluster.forbidden = true;
                true
            }
            None => false,
        }
    }

    /// Exports the clusters, newest first.
    pub fn export(&self) -> Vec<ClusterExport> {
        self.clusters
            .iter()
            .map(|cluster| ClusterExport {
                urlset: cluster.hrefs().into_iter().map(str::to_string).collect(),
                center: cluster.center().normalized(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(entries: &[(&str, f64)]) -> SparseVector {
        entries.iter().map(|&(k, w)| (k, w)).collect()
    }

    fn example(path: &str) -> Example {
        Example {
            body: String::new(),
            path: path.to_string(),
            query: None,
        }
    }

    // A vector at the cosine distance `d` from {x: 1}.
    fn at_cosine_distance(d: f64) -> SparseVector {
        let cos = 1. - d / 2.;
        vector(&[("x", cos), ("y", (1. - cos * cos).sqrt())])
    }

    #[test]
    fn test_classify_empty() {
        let session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Cosine, 10.);
        assert_eq!(session.classify(&vector(&[("a", 1.)]), 10.), None);
        assert_eq!(session.classify(&SparseVector::zero(), 10.), None);
    }

    #[test]
    fn test_near_and_far() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Cosine, 0.3);
        let a = vector(&[("x", 1.)]);
        let near = at_cosine_distance(0.05);
        let far = at_cosine_distance(0.9);
        assert!((Dissimilarity::Cosine.distance(&a, &near) - 0.05).abs() < 1e-9);

        let id_a = session.add_embedded(a, example("/a"));
        let id_near = session.add_embedded(near, example("/near"));
        let id_far = session.add_embedded(far, example("/far"));

        assert_eq!(id_a, 1);
        assert_eq!(id_near, 1);
        assert_eq!(id_far, 2);
        assert_eq!(session.clusters().len(), 2);
        assert_eq!(session.clusters()[0].id(), 2);
        assert_eq!(session.cluster(1).unwrap().num_vectors(), 2);
    }

    #[test]
    fn test_identical_examples() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Jaccard, 0.);
        let query: Query = [("id", "1")].into_iter().collect();
        let html = "<html><body><p>x</p></body></html>";
        let first = session.add_example(html, "/item", Some(query.clone()));
        let version = session.cluster(first).unwrap().version();
        let second = session.add_example(html, "/item", Some(query));

        assert_eq!(first, second);
        assert_eq!(session.history().len(), 2);
        let cluster = session.cluster(first).unwrap();
        assert_eq!(cluster.num_vectors(), 1);
        assert_eq!(cluster.num_hrefs(), 1);
        assert!(cluster.contains_href("/item?id=1"));
        assert_eq!(cluster.version(), version);
    }

    #[test]
    fn test_ties_favor_newest() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Jaccard, 0.6);
        session.add_embedded(vector(&[("a", 1.), ("b", 1.)]), example("/1"));
        session.add_embedded(vector(&[("c", 1.), ("d", 1.)]), example("/2"));
        assert_eq!(session.clusters().len(), 2);

        // Equally far (2/3) from both clusters.
        let query = vector(&[("a", 1.), ("c", 1.)]);
        assert_eq!(session.classify(&query, 0.7), Some(0));
        assert_eq!(session.clusters()[0].id(), 2);
        assert_eq!(session.classify(&query, 0.6), None);
    }

    #[test]
    fn test_nearest_member() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Jaccard, 0.5);
        session.add_embedded(vector(&[("a", 1.), ("b", 1.)]), example("/1"));
        session.add_embedded(vector(&[("a", 1.), ("b", 1.), ("c", 1.)]), example("/2"));
        assert_eq!(session.clusters().len(), 1);
        // 1/2 from the second member, 2/3 from the first one.
        let query = vector(&[("a", 1.), ("b", 1.), ("c", 1.), ("d", 1.), ("e", 1.), ("f", 1.)]);
        assert_eq!(session.cluster(1).unwrap().dissim(&query), 0.5);
    }

    #[test]
    fn test_mark_forbidden() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Cosine, 0.1);
        let id = session.add_embedded(vector(&[("a", 1.)]), example("/a"));
        assert!(!session.cluster(id).unwrap().is_forbidden());
        assert!(session.mark_forbidden(id));
        assert!(!session.mark_forbidden(id + 1));
        let cluster = session.cluster(id).unwrap();
        assert!(cluster.is_forbidden());
        assert_eq!(cluster.num_vectors(), 1);
        // Forbidden clusters still match; honoring the flag is up to the caller.
        assert_eq!(session.classify(&vector(&[("a", 2.)]), 0.1), Some(0));
    }

    #[test]
    fn test_far_pages_never_join() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Cosine, 1.5);
        let a = vector(&[("x", 1.)]);
        let b = at_cosine_distance(1.2);
        assert!((Dissimilarity::Cosine.distance(&a, &b) - 1.2).abs() < 1e-9);

        let id_a = session.add_embedded(a, example("/a"));
        assert_eq!(session.cluster(id_a).unwrap().dissim(&b), MAX_DISSIM);
        let id_b = session.add_embedded(b, example("/b"));
        assert_ne!(id_a, id_b);
        assert_eq!(session.clusters().len(), 2);
    }

    #[test]
    fn test_distance_one_does_not_join() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Jaccard, 1.);
        session.add_embedded(vector(&[("a", 1.)]), example("/a"));
        // Disjoint keys are at the Jaccard distance 1.
        let disjoint = vector(&[("b", 1.)]);
        assert_eq!(session.classify(&disjoint, 1.), None);
        session.add_embedded(disjoint, example("/b"));
        assert_eq!(session.clusters().len(), 2);
    }

    #[test]
    fn test_export() {
        let mut session = ClusteringSession::new(EmbedMethod::Bot, Dissimilarity::Cosine, 2.);
        session.add_embedded(vector(&[("a", 1.)]), example("/b"));
        session.add_embedded(vector(&[("a", 1.), ("b", 1.)]), example("/a"));
        let exported = session.export();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].urlset, vec!["/a".to_string(), "/b".to_string()]);
        // The mean {a: 1, b: 0.5} normalized.
        let norm = 1.25f64.sqrt();
        assert!((exported[0].center.get("a") - 1. / norm).abs() < 1e-12);
        assert!((exported[0].center.get("b") - 0.5 / norm).abs() < 1e-12);
    }
}
