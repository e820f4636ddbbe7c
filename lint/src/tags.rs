use doctree::Document;
use doctree::annotation::{Attributes, TagInvocation};
use doctree::node::{Location, Node, NodeKind};

use crate::config::{Config, GLOBAL_ATTRIBUTES, TagSchema};
use crate::error::{ErrorCode, ValidationError};

/// Check every `{% tag %}` in the document against the config.
pub fn validate_tags(document: &Document, config: &Config) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    for node in document.walk() {
        match &node.kind {
            NodeKind::Tag(tag) => validate_invocation(node, tag, config, &mut errors),
            NodeKind::TagClose(name) => errors.push(ValidationError::error(
                ErrorCode::MissingClosing,
                format!("closing tag '{}' has no matching opening tag", name),
                &node.location,
            )),
            _ => {}
        }
    }
    errors
}

fn validate_invocation(
    node: &Node,
    tag: &TagInvocation,
    config: &Config,
    errors: &mut Vec<ValidationError>,
) {
    let Some(schema) = config.tag(&tag.name) else {
        errors.push(ValidationError::error(
            ErrorCode::TagUndefined,
            format!("undefined tag: '{}'", tag.name),
            &node.location,
        ));
        return;
    };

    if !tag.self_closing && !tag.closed && !schema.self_closing {
        errors.push(ValidationError::error(
            ErrorCode::MissingClosing,
            format!("tag '{0}' is not closed; add {{% /{0} %}}", tag.name),
            &node.location,
        ));
    }

    errors.extend(validate_attributes(
        &tag.name,
        &tag.attributes,
        schema,
        &node.location,
    ));

    for child in node.children.iter().filter(|child| !child.is_blank()) {
        let type_name = child.kind.type_name();
        if !schema.allows_child(type_name) {
            errors.push(ValidationError::error(
                ErrorCode::InvalidChildren,
                format!("can't nest '{}' in '{}'", type_name, tag.name),
                &child.location,
            ));
        }
    }
}

/// Check attribute presence, type and permitted values against a schema.
pub fn validate_attributes(
    owner: &str,
    attributes: &Attributes,
    schema: &TagSchema,
    location: &Location,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (name, value) in attributes {
        let Some(attribute) = schema.attributes.get(name) else {
            if !GLOBAL_ATTRIBUTES.contains(&name.as_str()) {
                errors.push(ValidationError::error(
                    ErrorCode::AttributeUndefined,
                    format!("invalid attribute for '{}': '{}'", owner, name),
                    location,
                ));
            }
            continue;
        };

        if !attribute.kind.accepts(value) {
            errors.push(ValidationError::error(
                ErrorCode::AttributeTypeInvalid,
                format!(
                    "attribute '{}' must be of type '{}', got '{}'",
                    name,
                    attribute.kind.name(),
                    value.type_name()
                ),
                location,
            ));
            continue;
        }

        if let Some(allowed) = &attribute.matches {
            if !allowed.contains(value) {
                let expected: Vec<String> = allowed.iter().map(ToString::to_string).collect();
                errors.push(ValidationError::error(
                    ErrorCode::AttributeValueInvalid,
                    format!(
                        "attribute '{}' must match one of [{}], got {} instead",
                        name,
                        expected.join(", "),
                        value
                    ),
                    location,
                ));
            }
        }
    }

    for (name, attribute) in &schema.attributes {
        if attribute.required && !attributes.contains_key(name) {
            errors.push(ValidationError::error(
                ErrorCode::AttributeMissingRequired,
                format!("missing required attribute for '{}': '{}'", owner, name),
                location,
            ));
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use doctree::parser::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    fn codes(source: &str) -> Vec<&'static str> {
        let document = Parser::new(source.to_string(), 0)
            .parse()
            .expect("parse failed");
        validate_tags(&document, &Config::docs())
            .iter()
            .map(|e| e.code.as_str())
            .collect()
    }

    #[test]
    fn valid_tags_pass() {
        assert!(codes("Nice {% emoji symbol=\"🎉\" alt=\"party\" /%}\n").is_empty());
        assert!(codes("{% coming-soon /%}\n").is_empty());
        assert!(codes("{% hint kind=\"tip\" %}\n\nUse it.\n\n{% /hint %}\n").is_empty());
        assert!(
            codes("{% well heading=\"Docs\" href=\"/docs\" target=\"_blank\" %}\nRead.\n{% /well %}\n")
                .is_empty()
        );
        assert!(codes("{% details %}\n\n## Inner\n\nText\n\n{% /details %}\n").is_empty());
    }

    #[test]
    fn undefined_tag() {
        assert_eq!(codes("{% mystery /%}\n"), vec!["tag-undefined"]);
    }

    #[test]
    fn missing_required_attributes() {
        assert_eq!(
            codes("{% emoji symbol=\"x\" /%}\n"),
            vec!["attribute-missing-required"]
        );
        assert_eq!(
            codes("{% emoji /%}\n"),
            vec!["attribute-missing-required", "attribute-missing-required"]
        );
    }

    #[test]
    fn attribute_type_and_value() {
        assert_eq!(
            codes("{% emoji symbol=1 alt=\"x\" /%}\n"),
            vec!["attribute-type-invalid"]
        );
        assert_eq!(
            codes("{% hint kind=\"nope\" %}\n\nx\n\n{% /hint %}\n"),
            vec!["attribute-value-invalid"]
        );
    }

    #[test]
    fn undefined_attribute_but_globals_allowed() {
        assert_eq!(
            codes("{% coming-soon size=2 /%}\n"),
            vec!["attribute-undefined"]
        );
        assert!(codes("{% coming-soon #soon .big /%}\n").is_empty());
    }

    #[test]
    fn closing_problems() {
        assert_eq!(
            codes("{% hint kind=\"tip\" %}\n\nNo end.\n"),
            vec!["missing-closing"]
        );
        assert_eq!(codes("Stray.\n\n{% /well %}\n"), vec!["missing-closing"]);
        // self-closing schema tags need no closer
        assert!(codes("{% coming-soon %}\n").is_empty());
    }

    #[test]
    fn invalid_children() {
        assert_eq!(
            codes("{% hint kind=\"tip\" %}\n\n## Heading\n\n{% /hint %}\n"),
            vec!["invalid-children"]
        );
        assert_eq!(
            codes("{% related-content %}\n\nplain\n\n{% /related-content %}\n"),
            vec!["invalid-children"]
        );
    }

    #[test]
    fn message_names_the_attribute() {
        let document = Parser::new("{% hint kind=\"nope\" %}\n\nx\n\n{% /hint %}\n".to_string(), 0)
            .parse()
            .expect("parse failed");
        let errors = validate_tags(&document, &Config::docs());
        assert_eq!(
            errors[0].message,
            "attribute 'kind' must match one of [\"warn\", \"tip\", \"error\"], got \"nope\" instead"
        );
    }
}
