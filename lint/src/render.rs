//! Attribute sets a renderer receives for configured nodes and tags.

use doctree::annotation::{AttributeValue, Attributes, TagInvocation};
use doctree::node::{Node, NodeKind};

use crate::config::{Config, GLOBAL_ATTRIBUTES, TagSchema};
use crate::heading::heading_id;

/// The component a node renders as, if the config names one.
pub fn render_name<'c>(node: &Node, config: &'c Config) -> Option<&'c str> {
    let schema = match &node.kind {
        NodeKind::Tag(tag) => config.tag(&tag.name),
        kind => config.node(kind.type_name()),
    };
    schema.and_then(|schema| schema.render.as_deref())
}

/// Heading attributes with `id` always set to the resolved identifier.
pub fn heading_attributes(node: &Node, config: &Config) -> Attributes {
    let mut given = Attributes::new();
    if let Some(level) = node.heading_level() {
        given.insert("level".to_string(), AttributeValue::Number(f64::from(level)));
    }
    given.insert("id".to_string(), AttributeValue::String(heading_id(node)));
    apply_schema(given, config.node("heading"))
}

/// Fence attributes with defaults applied and hidden attributes dropped.
pub fn fence_attributes(node: &Node, config: &Config) -> Attributes {
    let NodeKind::Fence { language, content } = &node.kind else {
        return Attributes::new();
    };
    let mut given = Attributes::new();
    if let Some(language) = language {
        given.insert("language".to_string(), AttributeValue::String(language.clone()));
    }
    given.insert("content".to_string(), AttributeValue::String(content.clone()));
    apply_schema(given, config.node("fence"))
}

pub fn tag_attributes(tag: &TagInvocation, config: &Config) -> Attributes {
    let mut rendered = apply_schema(tag.attributes.clone(), config.tag(&tag.name));
    for name in GLOBAL_ATTRIBUTES {
        if let Some(value) = tag.attributes.get(*name) {
            rendered.insert(name.to_string(), value.clone());
        }
    }
    rendered
}

/// Class list for a child of `{% hint kind="..." %}`.
pub fn hint_class(existing: Option<&str>, kind: &str) -> String {
    match existing {
        Some(existing) if !existing.is_empty() => format!("{} hint {}", existing, kind),
        _ => format!("hint {}", kind),
    }
}

/// Keep declared, rendered attributes; fill absent ones from defaults.
/// Without a schema everything passes through.
fn apply_schema(given: Attributes, schema: Option<&TagSchema>) -> Attributes {
    let Some(schema) = schema else {
        return given;
    };
    let mut rendered = Attributes::new();
    for (name, attribute) in &schema.attributes {
        if !attribute.render {
            continue;
        }
        if let Some(value) = given.get(name).or(attribute.default.as_ref()) {
            rendered.insert(name.clone(), value.clone());
        }
    }
    rendered
}

#[cfg(test)]
mod tests {
    use doctree::node::Location;
    use pretty_assertions::assert_eq;

    use super::*;

    fn string(s: &str) -> AttributeValue {
        AttributeValue::String(s.to_string())
    }

    #[test]
    fn heading_id_is_resolved() {
        let config = Config::docs();
        let derived = Node::heading(2, None, vec![Node::text("Getting Started")]);
        let attributes = heading_attributes(&derived, &config);
        assert_eq!(attributes.get("id"), Some(&string("getting-started")));
        assert_eq!(attributes.get("level"), Some(&AttributeValue::Number(2.0)));

        let explicit = Node::heading(3, Some("custom"), vec![Node::text("Getting Started")]);
        assert_eq!(
            heading_attributes(&explicit, &config).get("id"),
            Some(&string("custom"))
        );
        assert_eq!(render_name(&explicit, &config), Some("Heading"));
    }

    #[test]
    fn fence_defaults_and_hidden() {
        let config = Config::docs();
        let fence = Node::leaf(
            NodeKind::Fence {
                language: None,
                content: "let x = 1;".to_string(),
            },
            Location::default(),
        );
        let attributes = fence_attributes(&fence, &config);
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get("language"), Some(&string("typescript")));

        let rust = Node::leaf(
            NodeKind::Fence {
                language: Some("rust".to_string()),
                content: String::new(),
            },
            Location::default(),
        );
        assert_eq!(fence_attributes(&rust, &config).get("language"), Some(&string("rust")));
        assert_eq!(render_name(&rust, &config), Some("CodeBlock"));
    }

    #[test]
    fn tag_attributes_keep_globals() {
        let config = Config::docs();
        let mut attributes = Attributes::new();
        attributes.insert("heading".to_string(), string("Read"));
        attributes.insert("id".to_string(), string("more"));
        let tag = TagInvocation {
            name: "well".to_string(),
            attributes,
            self_closing: false,
            closed: true,
        };
        let rendered = tag_attributes(&tag, &config);
        assert_eq!(rendered.get("heading"), Some(&string("Read")));
        assert_eq!(rendered.get("id"), Some(&string("more")));
        assert_eq!(rendered.len(), 2);

        let node = Node::leaf(NodeKind::Tag(tag), Location::default());
        assert_eq!(render_name(&node, &config), Some("Well"));
    }

    #[test]
    fn hint_classes() {
        assert_eq!(hint_class(None, "tip"), "hint tip");
        assert_eq!(hint_class(Some(""), "warn"), "hint warn");
        assert_eq!(hint_class(Some("lead"), "error"), "lead hint error");
    }

    #[test]
    fn unconfigured_nodes_have_no_render_name() {
        assert_eq!(render_name(&Node::text("x"), &Config::docs()), None);
    }
}
