//! Inquiry tree model, parser and traversals.
//!
//! The completion service answers the decomposition prompt with either a
//! single `{"node", "children"}` object or a list whose first element is the
//! root. [`parse_tree`] resolves that once; everything downstream only sees
//! [`InquiryNode`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{escape_html, extract_json_from_completion};
use crate::error::{InquiryError, InquiryResult};

/// Deepest tree accepted by [`parse_tree`].
pub const DEFAULT_MAX_TREE_DEPTH: usize = 12;

/// A question in the inquiry tree together with its sub-questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryNode {
    /// Question text. Serialized as `node`, the key the completion service uses.
    #[serde(rename = "node", alias = "label")]
    pub label: String,
    /// Sub-questions, in the order the service returned them.
    #[serde(default)]
    pub children: Vec<InquiryNode>,
}

/// Top-level reply shape: a root object or a list holding it.
#[derive(Deserialize)]
#[serde(untagged)]
enum TreeReply {
    Many(Vec<Value>),
    One(Map<String, Value>),
}

impl InquiryNode {
    /// Create a leaf node
    pub fn leaf(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            children: Vec::new(),
        }
    }

    /// Create a node with children
    pub fn with_children(label: impl Into<String>, children: Vec<InquiryNode>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// Whether this node has no sub-questions
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of levels, 1 for a leaf.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(InquiryNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Total number of nodes, root included
    pub fn node_count(&self) -> usize {
        self.preorder().count()
    }

    /// Nodes in pre-order
    pub fn preorder(&self) -> Preorder<'_> {
        Preorder { stack: vec![self] }
    }

    /// Directed `(parent, child)` label pairs in pre-order.
    ///
    /// Lazy and restartable; yields exactly `node_count() - 1` edges.
    pub fn edges(&self) -> Edges<'_> {
        Edges {
            stack: self.children.iter().rev().map(|c| (self, c)).collect(),
        }
    }

    /// `(indent_level, label)` lines in pre-order, root at level 0
    pub fn outline(&self) -> Outline<'_> {
        Outline {
            stack: vec![(0, self)],
        }
    }

    /// Graphviz `digraph` text built from [`edges`](Self::edges).
    pub fn to_dot(&self) -> String {
        let mut dot = String::from("digraph G {\n");
        if self.is_leaf() {
            dot.push_str(&format!("\"{}\";\n", escape_dot(&self.label)));
        }
        for (parent, child) in self.edges() {
            dot.push_str(&format!(
                "\"{}\" -> \"{}\";\n",
                escape_dot(parent),
                escape_dot(child)
            ));
        }
        dot.push('}');
        dot
    }

    /// Nested `<li>`/`<ul>` markup with escaped labels.
    pub fn to_html_list(&self) -> String {
        let mut html = format!("<li><strong>{}</strong>", escape_html(&self.label));
        if !self.is_leaf() {
            html.push_str("<ul>");
            for child in &self.children {
                html.push_str(&child.to_html_list());
            }
            html.push_str("</ul>");
        }
        html.push_str("</li>");
        html
    }
}

/// Depth of an optional tree; 0 when no tree has been generated.
pub fn tree_depth(tree: Option<&InquiryNode>) -> usize {
    tree.map(InquiryNode::depth).unwrap_or(0)
}

/// Pre-order node iterator, see [`InquiryNode::preorder`].
#[derive(Debug, Clone)]
pub struct Preorder<'a> {
    stack: Vec<&'a InquiryNode>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = &'a InquiryNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Pre-order edge iterator, see [`InquiryNode::edges`].
#[derive(Debug, Clone)]
pub struct Edges<'a> {
    stack: Vec<(&'a InquiryNode, &'a InquiryNode)>,
}

impl<'a> Iterator for Edges<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let (parent, child) = self.stack.pop()?;
        self.stack
            .extend(child.children.iter().rev().map(|grandchild| (child, grandchild)));
        Some((parent.label.as_str(), child.label.as_str()))
    }
}

/// Pre-order outline iterator, see [`InquiryNode::outline`].
#[derive(Debug, Clone)]
pub struct Outline<'a> {
    stack: Vec<(usize, &'a InquiryNode)>,
}

impl<'a> Iterator for Outline<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        let (level, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (level + 1, child)));
        Some((level, node.label.as_str()))
    }
}

/// Parse completion text into an inquiry tree, rejecting trees deeper than
/// [`DEFAULT_MAX_TREE_DEPTH`].
pub fn parse_tree(raw: &str) -> InquiryResult<InquiryNode> {
    parse_tree_with_limit(raw, DEFAULT_MAX_TREE_DEPTH)
}

/// Parse completion text into an inquiry tree.
///
/// A list reply takes its first element as root; an object reply is the
/// root. Every node needs a string `node` (or `label`) and an optional
/// `children` array.
pub fn parse_tree_with_limit(raw: &str, max_depth: usize) -> InquiryResult<InquiryNode> {
    let json = extract_json_from_completion(raw)
        .map_err(|message| InquiryError::MalformedTree { message })?;

    let reply: TreeReply =
        serde_json::from_str(json).map_err(|e| InquiryError::MalformedTree {
            message: e.to_string(),
        })?;

    let root = match reply {
        TreeReply::One(map) => map,
        TreeReply::Many(items) => match items.into_iter().next() {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(InquiryError::MalformedTree {
                    message: format!("first list element is not an object: {}", other),
                })
            }
            None => {
                return Err(InquiryError::MalformedTree {
                    message: "empty list".to_string(),
                })
            }
        },
    };

    node_from_map(root, 1, max_depth)
}

fn node_from_map(
    mut map: Map<String, Value>,
    level: usize,
    max_depth: usize,
) -> InquiryResult<InquiryNode> {
    if level > max_depth {
        return Err(InquiryError::DepthExceeded { max_depth });
    }

    let label = match map.remove("node").or_else(|| map.remove("label")) {
        Some(Value::String(label)) => label,
        Some(other) => {
            return Err(InquiryError::MalformedTree {
                message: format!("node label must be a string, got {}", other),
            })
        }
        None => {
            return Err(InquiryError::MalformedTree {
                message: "node is missing a `node` label".to_string(),
            })
        }
    };

    let children = match map.remove("children") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(child) => node_from_map(child, level + 1, max_depth),
                other => Err(InquiryError::MalformedTree {
                    message: format!("child of '{}' is not an object: {}", label, other),
                }),
            })
            .collect::<InquiryResult<Vec<_>>>()?,
        Some(other) => {
            return Err(InquiryError::MalformedTree {
                message: format!("children of '{}' must be a list, got {}", label, other),
            })
        }
    };

    Ok(InquiryNode { label, children })
}

fn escape_dot(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
