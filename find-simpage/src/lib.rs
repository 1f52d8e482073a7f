//! Clustering crawled web pages by the shapes of their HTML documents.
//!
//! Pages are embedded into sparse vectors of their tag structures with [`HtmlEmbedder`],
//! then either grouped one at a time with [`ClusteringSession`] to skip pages already seen
//! during a crawl, or summarized all at once into a dendrogram with [`ShapeReporter`].
//!
//! ```
//! use find_simpage::{ClusteringSession, EmbedMethod};
//! use sparsevec::Dissimilarity;
//!
//! let mut session = ClusteringSession::new(EmbedMethod::FullBot, Dissimilarity::Cosine, 0.2);
//! let first = session.add_example("<ul><li>a</li><li>b</li></ul>", "/list", None);
//! let second = session.add_example("<ul><li>c</li></ul>", "/list", None);
//! assert_eq!(first, second);
//! ```
#![deny(missing_docs)]

pub mod dendrogram;
pub mod domtree;
pub mod dump;
pub mod embed;
pub mod errors;
pub mod href;
pub mod online;
pub mod report;

pub use dendrogram::{Dendrogram, DendrogramNode};
pub use embed::{EmbedMethod, HtmlEmbedder};
pub use online::{Cluster, ClusteringSession};
pub use report::{Entry, HclustReport, PageInfo, ShapeReporter};
