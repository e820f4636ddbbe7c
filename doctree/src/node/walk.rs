use std::slice;

use super::Node;

/// Lazy pre-order traversal. Each call to `walk()` starts a fresh iterator.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<slice::Iter<'a, Node>>,
}

impl<'a> Walk<'a> {
    pub(crate) fn new(nodes: &'a [Node]) -> Self {
        Walk {
            stack: vec![nodes.iter()],
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<&'a Node> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    if !node.children.is_empty() {
                        self.stack.push(node.children.iter());
                    }
                    return Some(node);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{Location, Node, NodeKind};

    fn strong(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Strong, children, Location::default())
    }

    fn texts(node: &Node) -> Vec<String> {
        node.walk()
            .filter_map(|n| match &n.kind {
                NodeKind::Text(t) | NodeKind::Code(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn walks_in_document_order() {
        let heading = Node::heading(
            2,
            None,
            vec![
                Node::text("a"),
                strong(vec![Node::text("b"), strong(vec![Node::code("c")])]),
                Node::text("d"),
            ],
        );
        assert_eq!(texts(&heading), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn walk_excludes_self_and_restarts() {
        let node = strong(vec![Node::text("x")]);
        assert_eq!(node.walk().count(), 1);
        assert_eq!(node.walk().count(), 1);
        assert_eq!(Node::text("leaf").walk().count(), 0);
    }
}
