use doctree::node::{Node, NodeKind};

use crate::slug::slugify;

/// The anchor identifier of a heading.
///
/// An explicit id is returned verbatim. Otherwise the text and code content
/// of every descendant, in document order, is slugified.
pub fn heading_id(node: &Node) -> String {
    if let NodeKind::Heading { id: Some(id), .. } = &node.kind {
        return id.clone();
    }

    let text: String = node
        .walk()
        .filter_map(|child| match &child.kind {
            NodeKind::Text(content) | NodeKind::Code(content) => Some(content.as_str()),
            _ => None,
        })
        .collect();
    slugify(&text)
}
