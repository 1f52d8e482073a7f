//! Offline reports summarizing the shapes of captured pages.
use std::collections::BTreeSet;

use agglomerative::{Hclust, Linkage};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use sparsevec::{Dissimilarity, SparseVector};

use crate::dendrogram::{Dendrogram, DendrogramNode};
use crate::domtree::DomNode;
use crate::embed::{EmbedMethod, HtmlEmbedder};
use crate::errors::{FindSimpageError, Result};
use crate::href::{self, Query};

/// Number of decimal places kept in reported trees.
pub const REPORT_DIGITS: i32 = 3;

/// Identity of a captured page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Identifier of the capture.
    pub id: u64,
    /// Requested path.
    pub path: String,
    /// Requested query.
    pub query: Option<Query>,
}

impl PageInfo {
    /// Encodes the requested href.
    pub fn href(&self) -> String {
        href::encode(&self.path, self.query.as_ref())
    }
}

/// A distinct page shape shared by one or more pages.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Pages with the shape, in order of appearance.
    pub infolist: Vec<PageInfo>,
    /// The embedding as it was computed.
    #[serde(rename = "hist")]
    pub origvec: SparseVector,
    /// The L2-normalized embedding.
    pub vec: SparseVector,
}

/// Groups pages with exactly the same embedding into entries,
/// ordered by the first appearance of each embedding.
///
/// # Examples
///
/// ```
/// use find_simpage::report::{undup, PageInfo};
/// use sparsevec::SparseVector;
///
/// let page = |id| PageInfo { id, path: format!("/{id}"), query: None };
/// let a: SparseVector = [("p", 2.)].into_iter().collect();
/// let b: SparseVector = [("form", 1.)].into_iter().collect();
///
/// let entries = undup(vec![(page(1), a.clone()), (page(2), b), (page(3), a)]);
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].infolist.len(), 2);
/// assert_eq!(entries[0].vec.get("p"), 1.);
/// ```
pub fn undup<I>(pages: I) -> Vec<Entry>
where
    I: IntoIterator<Item = (PageInfo, SparseVector)>,
{
    let mut positions: HashMap<SparseVector, usize> = HashMap::new();
    let mut entries: Vec<Entry> = vec![];
    for (info, vec) in pages {
        if let Some(&pos) = positions.get(&vec) {
            entries[pos].infolist.push(info);
            continue;
        }
        positions.insert(vec.clone(), entries.len());
        entries.push(Entry {
            infolist: vec![info],
            vec: vec.clone().normalized(),
            origvec: vec,
        });
    }
    entries
}

/// Which vector of the entries is dumped by [`vector_csv()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorColumn {
    /// The L2-normalized vectors.
    Normalized,
    /// The original vectors.
    Histogram,
}

/// Renders the vectors of `entries` as CSV.
///
/// The header is `path` followed by the keys of `tagset`, and each row holds the quoted href
/// of the first page of an entry followed by its weights, where absent keys weigh zero.
/// Keys containing a comma or a double quote are quoted as string literals.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeSet;
/// use find_simpage::report::{undup, vector_csv, PageInfo, VectorColumn};
///
/// let info = PageInfo { id: 0, path: "/a".to_string(), query: None };
/// let entries = undup(vec![(info, [("p", 2.)].into_iter().collect())]);
/// let tagset: BTreeSet<String> = ["div", "p"].into_iter().map(String::from).collect();
///
/// assert_eq!(
///     vector_csv(&tagset, &entries, VectorColumn::Histogram),
///     "path,div,p\n\"/a\",0.0,2.0\n"
/// );
/// ```
pub fn vector_csv(tagset: &BTreeSet<String>, entries: &[Entry], column: VectorColumn) -> String {
    let mut csv = String::from("path");
    for key in tagset {
        csv.push(',');
        if key.contains(|c: char| c == ',' || c == '"') {
            csv.push_str(&format!("{key:?}"));
        } else {
            csv.push_str(key);
        }
    }
    csv.push('\n');

    for entry in entries {
        let href = entry
            .infolist
            .first()
            .map(PageInfo::href)
            .unwrap_or_default();
        csv.push_str(&format!("{href:?}"));
        let vec = match column {
            VectorColumn::Normalized => &entry.vec,
            VectorColumn::Histogram => &entry.origvec,
        };
        for key in tagset {
            csv.push_str(&format!(",{:?}", vec.get(key)));
        }
        csv.push('\n');
    }
    csv
}

/// A hierarchical clustering of entries with the methods producing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HclustReport {
    /// Embedding method of the vectors.
    pub embed_method: EmbedMethod,
    /// Linkage rule.
    pub hclust_method: Linkage,
    /// Dissimilarity measure.
    pub hclust_sim: Dissimilarity,
    /// Root of the dendrogram, or `None` without any entry.
    pub root: Option<DendrogramNode>,
}

/// A captured page with its reconstructed element tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// Identifier of the capture.
    pub id: u64,
    /// Requested path.
    pub path: String,
    /// Requested query.
    pub query: Option<Query>,
    /// Status code.
    pub res_code: String,
    /// Element tree of the body.
    pub domtree: Option<DomNode>,
    /// Raw response body.
    pub rawres: String,
}

/// Builder of [`HclustReport`].
///
/// # Examples
///
/// ```
/// use find_simpage::report::{undup, PageInfo, ShapeReporter};
///
/// let reporter = ShapeReporter::from_names("bot", "average", "cosine").unwrap();
/// let embedder = reporter.embedder();
/// let pages = ["<p>a</p>", "<p>b</p>", "<form></form>"]
///     .iter()
///     .enumerate()
///     .map(|(id, html)| {
///         let info = PageInfo { id: id as u64, path: format!("/{id}"), query: None };
///         (info, embedder.embed(html))
///     });
/// let entries = undup(pages);
/// let report = reporter.report(&entries).unwrap();
///
/// assert_eq!(entries.len(), 2);
/// assert_eq!(report.root.unwrap().leaves(), vec![0, 1]);
/// ```
#[derive(Clone, Debug)]
pub struct ShapeReporter {
    embed_method: EmbedMethod,
    linkage: Linkage,
    dissimilarity: Dissimilarity,
    shows_progress: bool,
}

impl Default for ShapeReporter {
    fn default() -> Self {
        Self::new(EmbedMethod::FullBot, Linkage::Single, Dissimilarity::Jaccard)
    }
}

impl ShapeReporter {
    /// Creates an instance.
    pub const fn new(
        embed_method: EmbedMethod,
        linkage: Linkage,
        dissimilarity: Dissimilarity,
    ) -> Self {
        Self {
            embed_method,
            linkage,
            dissimilarity,
            shows_progress: false,
        }
    }

    /// Creates an instance from the names of the methods.
    pub fn from_names(embed_method: &str, linkage: &str, dissimilarity: &str) -> Result<Self> {
        let embed_method: EmbedMethod = embed_method
            .parse()
            .map_err(|_| FindSimpageError::config("embedding method", embed_method))?;
        let linkage: Linkage = linkage
            .parse()
            .map_err(|_| FindSimpageError::config("linkage", linkage))?;
        let dissimilarity: Dissimilarity = dissimilarity
            .parse()
            .map_err(|_| FindSimpageError::config("dissimilarity", dissimilarity))?;
        Ok(Self::new(embed_method, linkage, dissimilarity))
    }

    /// Prints the progress of clustering through `tracing` if `yes` is true.
    pub const fn shows_progress(mut self, yes: bool) -> Self {
        self.shows_progress = yes;
        self
    }

    /// Gets the embedder of the configured method.
    pub const fn embedder(&self) -> HtmlEmbedder {
        HtmlEmbedder::new(self.embed_method)
    }

    /// Clusters the normalized vectors of `entries`.
    pub fn report(&self, entries: &[Entry]) -> Result<HclustReport> {
        self.report_with(entries, false)
    }

    /// Same as [`Self::report()`] but fills the dissimilarity matrix in parallel.
    pub fn report_in_parallel(&self, entries: &[Entry]) -> Result<HclustReport> {
        self.report_with(entries, true)
    }

    fn report_with(&self, entries: &[Entry], parallel: bool) -> Result<HclustReport> {
        let vectors: Vec<_> = entries.iter().map(|e| e.vec.clone()).collect();
        let hclust = Hclust::new(self.linkage).shows_progress(self.shows_progress);
        let dissimilarity = self.dissimilarity;
        let dissim = |x: &SparseVector, y: &SparseVector| dissimilarity.distance(x, y);
        let merges = if parallel {
            hclust.cluster_in_parallel(&vectors, dissim)
        } else {
            hclust.cluster(&vectors, dissim)
        };
        tracing::info!(
            entries = entries.len(),
            merges = merges.len(),
            "[ShapeReporter::report] clustered"
        );
        let mut tree = Dendrogram::build(&vectors, &merges)?;
        tree.round(REPORT_DIGITS);
        Ok(HclustReport {
            embed_method: self.embed_method,
            hclust_method: self.linkage,
            hclust_sim: self.dissimilarity,
            root: tree.into_root(),
        })
    }
}
