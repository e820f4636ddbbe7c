pub mod annotation;
pub mod node;
pub mod parser;

use crate::node::{Node, NodeKind, Walk};

/// A parsed Markdown document.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Top-level nodes in source order.
    pub nodes: Vec<Node>,
    /// Raw frontmatter text (between the leading `---` fences), if any.
    pub frontmatter: Option<String>,
    /// The source file ID (for error reporting with codespan-reporting).
    pub source_id: usize,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Document {
            nodes,
            frontmatter: None,
            source_id: 0,
        }
    }

    /// Depth-first walk over every node in the document.
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.nodes)
    }

    /// All headings, at any depth, in document order.
    pub fn headings(&self) -> impl Iterator<Item = &Node> {
        self.walk()
            .filter(|node| matches!(node.kind, NodeKind::Heading { .. }))
    }
}
