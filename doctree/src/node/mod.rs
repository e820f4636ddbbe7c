mod walk;

pub use walk::Walk;

use std::ops::Range;

use codespan_reporting::diagnostic::Label;

use crate::annotation::TagInvocation;

/// Where a node came from: the codespan file ID and a byte span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub file_id: usize,
    pub span: Range<usize>,
}

impl Location {
    pub fn new(file_id: usize, span: Range<usize>) -> Self {
        Location { file_id, span }
    }

    pub fn to_label(&self) -> Label<usize> {
        Label::primary(self.file_id, self.span.clone())
    }

    /// 1-based line of the span start within `source`.
    pub fn line(&self, source: &str) -> usize {
        source[..self.span.start.min(source.len())]
            .bytes()
            .filter(|&b| b == b'\n')
            .count()
            + 1
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub location: Location,
}

/// Node types, with the attributes each type carries.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Block-level
    Heading {
        level: u8,
        /// Author-supplied identifier (`{#id}` or `{% #id %}`).
        id: Option<String>,
    },
    Paragraph,
    Blockquote,
    Fence {
        language: Option<String>,
        content: String,
    },
    List {
        start: Option<u64>,
    },
    Item,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Html(String),
    Rule,

    // Inline
    Text(String),
    Code(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link {
        dest: String,
        title: String,
    },
    Image {
        dest: String,
        title: String,
    },
    SoftBreak,
    HardBreak,

    // Annotations
    Tag(TagInvocation),
    /// A `{% /name %}` that matched no opening tag.
    TagClose(String),

    /// Anything pulldown-cmark produces that the validators do not inspect.
    Other,
}

impl NodeKind {
    /// The schema name of this node type, as used in `children` lists.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Heading { .. } => "heading",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Blockquote => "blockquote",
            NodeKind::Fence { .. } => "fence",
            NodeKind::List { .. } => "list",
            NodeKind::Item => "item",
            NodeKind::Table => "table",
            NodeKind::TableHead => "thead",
            NodeKind::TableRow => "tr",
            NodeKind::TableCell => "td",
            NodeKind::Html(_) => "html",
            NodeKind::Rule => "hr",
            NodeKind::Text(_) => "text",
            NodeKind::Code(_) => "code",
            NodeKind::Emphasis => "em",
            NodeKind::Strong => "strong",
            NodeKind::Strikethrough => "s",
            NodeKind::Link { .. } => "link",
            NodeKind::Image { .. } => "image",
            NodeKind::SoftBreak => "softbreak",
            NodeKind::HardBreak => "hardbreak",
            NodeKind::Tag(_) | NodeKind::TagClose(_) => "tag",
            NodeKind::Other => "other",
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text(_)
                | NodeKind::Code(_)
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::Link { .. }
                | NodeKind::Image { .. }
                | NodeKind::SoftBreak
                | NodeKind::HardBreak
        )
    }
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>, location: Location) -> Self {
        Node {
            kind,
            children,
            location,
        }
    }

    pub fn leaf(kind: NodeKind, location: Location) -> Self {
        Node::new(kind, Vec::new(), location)
    }

    pub fn text(content: impl Into<String>) -> Self {
        Node::leaf(NodeKind::Text(content.into()), Location::default())
    }

    pub fn code(content: impl Into<String>) -> Self {
        Node::leaf(NodeKind::Code(content.into()), Location::default())
    }

    pub fn heading(level: u8, id: Option<&str>, children: Vec<Node>) -> Self {
        Node::new(
            NodeKind::Heading {
                level,
                id: id.map(str::to_string),
            },
            children,
            Location::default(),
        )
    }

    pub fn at(mut self, file_id: usize, span: Range<usize>) -> Self {
        self.location = Location::new(file_id, span);
        self
    }

    /// Depth-first walk over the descendants of this node (not the node itself).
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(&self.children)
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, NodeKind::Heading { .. })
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading { level, .. } => Some(level),
            _ => None,
        }
    }

    pub fn tag(&self) -> Option<&TagInvocation> {
        match &self.kind {
            NodeKind::Tag(invocation) => Some(invocation),
            _ => None,
        }
    }

    /// Whitespace-only text and line breaks carry no content.
    pub fn is_blank(&self) -> bool {
        match &self.kind {
            NodeKind::Text(text) => text.trim().is_empty(),
            NodeKind::SoftBreak | NodeKind::HardBreak => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_counts_newlines_before_span() {
        let source = "a\nb\nc";
        assert_eq!(Location::new(0, 0..1).line(source), 1);
        assert_eq!(Location::new(0, 4..5).line(source), 3);
        assert_eq!(Location::new(0, 99..100).line(source), 3);
    }

    #[test]
    fn blank_nodes() {
        assert!(Node::text("  ").is_blank());
        assert!(!Node::text(" x ").is_blank());
        assert!(Node::leaf(NodeKind::SoftBreak, Location::default()).is_blank());
        assert!(!Node::code(" ").is_blank());
    }
}
