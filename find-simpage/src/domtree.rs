//! Reconstruction of the element trees seen by the embedder.
use serde::{Deserialize, Serialize};
use sparsevec::SparseVector;

use crate::embed::{HtmlEmbedder, VisitedNode};

/// Elements nested deeper than this are left out of reconstructed trees.
pub const MAX_DEPTH: usize = 256;

/// The attributes kept in a [`DomNode`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomAttrs {
    /// Value of `action`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Value of `href`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Value of `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An element of a reconstructed tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomNode {
    /// Tag name.
    pub name: String,
    /// Attributes.
    pub attrs: DomAttrs,
    /// Child elements in document order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl DomNode {
    /// Embeds `html` and reconstructs its element tree at once.
    ///
    /// # Examples
    ///
    /// ```
    /// use find_simpage::domtree::DomNode;
    /// use find_simpage::embed::{EmbedMethod, HtmlEmbedder};
    ///
    /// let embedder = HtmlEmbedder::new(EmbedMethod::Bot);
    /// let (vec, tree) = DomNode::extract(&embedder, "<p>a</p><p>b</p>");
    /// let tree = tree.unwrap();
    ///
    /// assert_eq!(vec.get("p"), 2.);
    /// assert_eq!(tree.name, "html");
    /// assert_eq!(tree.children[1].children.len(), 2);
    /// ```
    pub fn extract(embedder: &HtmlEmbedder, html: &str) -> (SparseVector, Option<Self>) {
        let mut builder = DomTreeBuilder::new();
        let vec = embedder.embed_with(html, |node| builder.visit(node));
        (vec, builder.finish())
    }
}

/// Builder of a [`DomNode`] tree from elements visited in post-order.
///
/// A visited element at depth `d` adopts the pending elements of depth `d+1`
/// that were visited since its preceding sibling. Elements deeper than [`MAX_DEPTH`] are dropped.
#[derive(Default)]
pub struct DomTreeBuilder {
    pending: Vec<(usize, DomNode)>,
}

impl DomTreeBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a visited element.
    pub fn visit(&mut self, node: &VisitedNode) {
        if node.depth > MAX_DEPTH {
            return;
        }
        let mut children = vec![];
        while let Some((depth, _)) = self.pending.last() {
            if *depth != node.depth + 1 {
                break;
            }
            if let Some((_, child)) = self.pending.pop() {
                children.push(child);
            }
        }
        children.reverse();
        self.pending.push((
            node.depth,
            DomNode {
                name: node.name.to_string(),
                attrs: DomAttrs {
                    action: node.action.map(str::to_string),
                    href: node.href.map(str::to_string),
                    name: node.name_attr.map(str::to_string),
                },
                children,
            },
        ));
    }

    /// Gets the root, which is the last visited element.
    pub fn finish(mut self) -> Option<DomNode> {
        self.pending.pop().map(|(_, root)| root)
    }
}
