//! Embedding HTML documents into sparse vectors of their structures.
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use scraper::{ElementRef, Html};
use serde::{Deserialize, Serialize};
use sparsevec::SparseVector;

use crate::href;

/// Embedding variants, selected by name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedMethod {
    /// Bag of tags, counting tag names.
    Bot,
    /// Full bag of tags, counting the structural paths of leaf-most elements.
    FullBot,
}

impl EmbedMethod {
    /// Gets the name used in configurations.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::FullBot => "full_bot",
        }
    }
}

impl fmt::Display for EmbedMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EmbedMethod {
    type Err = &'static str;
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "bot" => Ok(Self::Bot),
            "full_bot" => Ok(Self::FullBot),
            _ => Err("Could not parse an embedding method"),
        }
    }
}

/// An element passed to the callback of [`HtmlEmbedder::embed_with()`].
///
/// It borrows the traversal state and must not be kept after the callback returns.
#[derive(Clone, Copy, Debug)]
pub struct VisitedNode<'a> {
    /// Tag name.
    pub name: &'a str,
    /// Value of the `action` attribute.
    pub action: Option<&'a str>,
    /// Value of the `href` attribute (after rewriting for anchors).
    pub href: Option<&'a str>,
    /// Value of the `name` attribute.
    pub name_attr: Option<&'a str>,
    /// Structural path from the root, e.g., `/html/body/form[@action="/login"]`,
    /// or empty for [`EmbedMethod::Bot`].
    pub path: &'a str,
    /// Depth from the root element, which is at 0.
    pub depth: usize,
    /// Is the node synthesized from a query parameter of an anchor?
    pub synthetic: bool,
}

/// Embedder from HTML documents into sparse vectors.
///
/// The parsed tree is traversed over elements in depth-first post-order, i.e., every element
/// is visited after its children. When an anchor is visited, its `href` is rewritten to the
/// bare path, and an `input` element named after each query key is attached under it and
/// visited just before the anchor. The children of an anchor are visited before the
/// rewriting, so their paths still contain the original `href`.
///
/// # Examples
///
/// ```
/// use find_simpage::embed::{EmbedMethod, HtmlEmbedder};
///
/// let html = r#"<html><body><a href="/item?id=3">item</a><p>text</p></body></html>"#;
///
/// let vec = HtmlEmbedder::new(EmbedMethod::Bot).embed(html);
/// assert_eq!(vec.get("a"), 1.);
/// assert_eq!(vec.get("input"), 1.);
///
/// let vec = HtmlEmbedder::new(EmbedMethod::FullBot).embed(html);
/// assert_eq!(vec.get(r#"/html/body/a[@href="/item"]/input[@name="id"]"#), 1.);
/// assert_eq!(vec.get(r#"/html/body/a[@href="/item"]"#), 0.);
/// assert_eq!(vec.get("/html/body/p"), 1.);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct HtmlEmbedder {
    method: EmbedMethod,
}

impl HtmlEmbedder {
    /// Creates an instance.
    pub const fn new(method: EmbedMethod) -> Self {
        Self { method }
    }

    /// Gets the embedding method.
    pub const fn method(&self) -> EmbedMethod {
        self.method
    }

    /// Embeds an HTML document.
    /// An empty vector is returned for a blank document, meaning that the page should be ignored.
    pub fn embed(&self, html: &str) -> SparseVector {
        self.embed_with(html, |_| {})
    }

    /// Embeds an HTML document, calling `callback` once per visited element.
    ///
    /// Structural paths are built only for [`EmbedMethod::FullBot`];
    /// with [`EmbedMethod::Bot`], [`VisitedNode::path`] is empty.
    pub fn embed_with<F>(&self, html: &str, mut callback: F) -> SparseVector
    where
        F: FnMut(&VisitedNode),
    {
        let mut vec = SparseVector::new();
        if html.trim().is_empty() {
            return vec;
        }
        let document = Html::parse_document(html);
        let method = self.method;
        let with_paths = method == EmbedMethod::FullBot;
        traverse(document.root_element(), with_paths, &mut |node, has_children| {
            callback(node);
            match method {
                EmbedMethod::Bot => vec.increment(node.name, 1.),
                EmbedMethod::FullBot => {
                    if !has_children {
                        vec.increment(node.path, 1.);
                    }
                }
            }
        });
        vec
    }
}

#[derive(Default)]
struct Attrs<'a> {
    action: Option<Cow<'a, str>>,
    href: Option<Cow<'a, str>>,
    name: Option<Cow<'a, str>>,
}

impl<'a> Attrs<'a> {
    fn of(element: &ElementRef<'a>) -> Self {
        let value = element.value();
        Self {
            action: value.attr("action").map(Cow::Borrowed),
            href: value.attr("href").map(Cow::Borrowed),
            name: value.attr("name").map(Cow::Borrowed),
        }
    }

    /// Appends the path segment of `tag`, e.g., `/form[@action="/login" and @name="f"]`.
    fn push_segment(&self, path: &mut String, tag: &str) {
        path.push('/');
        path.push_str(tag);
        let mut preds = [
            ("action", &self.action),
            ("href", &self.href),
            ("name", &self.name),
        ]
        .into_iter()
        .filter_map(|(attr, value)| value.as_ref().map(|v| format!("@{attr}={v:?}")))
        .peekable();
        if preds.peek().is_none() {
            return;
        }
        path.push('[');
        for (i, pred) in preds.enumerate() {
            if i != 0 {
                path.push_str(" and ");
            }
            path.push_str(&pred);
        }
        path.push(']');
    }
}

/// An element on the traversal stack, whose path segment ends the shared path buffer.
struct Frame<'a> {
    element: ElementRef<'a>,
    attrs: Attrs<'a>,
    parent_len: usize,
    depth: usize,
    next_child: Option<ElementRef<'a>>,
    has_children: bool,
}

impl<'a> Frame<'a> {
    fn enter(element: ElementRef<'a>, depth: usize, path: &mut String, with_paths: bool) -> Self {
        let attrs = Attrs::of(&element);
        let parent_len = path.len();
        if with_paths {
            attrs.push_segment(path, element.value().name());
        }
        Self {
            element,
            attrs,
            parent_len,
            depth,
            next_child: element.children().find_map(ElementRef::wrap),
            has_children: false,
        }
    }

    fn leave<F>(mut self, path: &mut String, with_paths: bool, visit: &mut F)
    where
        F: FnMut(&VisitedNode, bool),
    {
        let tag = self.element.value().name();
        let mut has_children = self.has_children;

        if tag == "a" {
            let decoded = self.attrs.href.as_deref().and_then(|h| href::decode(h).ok());
            if let Some(decoded) = decoded {
                self.attrs.href = Some(Cow::Owned(decoded.path));
                if with_paths {
                    path.truncate(self.parent_len);
                    self.attrs.push_segment(path, tag);
                }
                let anchor_len = path.len();
                for key in decoded.query.iter().flat_map(|q| q.keys()) {
                    if with_paths {
                        let input = Attrs {
                            name: Some(Cow::Borrowed(key)),
                            ..Attrs::default()
                        };
                        input.push_segment(path, "input");
                    }
                    let node = VisitedNode {
                        name: "input",
                        action: None,
                        href: None,
                        name_attr: Some(key),
                        path: path.as_str(),
                        depth: self.depth + 1,
                        synthetic: true,
                    };
                    visit(&node, false);
                    path.truncate(anchor_len);
                    has_children = true;
                }
            }
        }

        let node = VisitedNode {
            name: tag,
            action: self.attrs.action.as_deref(),
            href: self.attrs.href.as_deref(),
            name_attr: self.attrs.name.as_deref(),
            path: path.as_str(),
            depth: self.depth,
            synthetic: false,
        };
        visit(&node, has_children);
        path.truncate(self.parent_len);
    }
}

/// Visits the elements under `root` in post-order, passing whether each
/// visited element had any visited child.
///
/// The walk keeps its own stack, so arbitrarily deep documents are fine.
fn traverse<F>(root: ElementRef, with_paths: bool, visit: &mut F)
where
    F: FnMut(&VisitedNode, bool),
{
    let mut path = String::new();
    let mut stack = vec![Frame::enter(root, 0, &mut path, with_paths)];
    while let Some(frame) = stack.last_mut() {
        if let Some(child) = frame.next_child {
            frame.next_child = child.next_siblings().find_map(ElementRef::wrap);
            frame.has_children = true;
            let depth = frame.depth + 1;
            stack.push(Frame::enter(child, depth, &mut path, with_paths));
        } else if let Some(frame) = stack.pop() {
            frame.leave(&mut path, with_paths, visit);
        }
    }
}
