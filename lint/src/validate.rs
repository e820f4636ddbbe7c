use std::collections::HashMap;
use std::collections::hash_map::Entry;

use doctree::Document;
use doctree::node::Node;

use crate::config::Config;
use crate::error::{ErrorCode, ValidationError};
use crate::heading::heading_id;
use crate::tags::validate_tags;

/// Registry entry for an identifier already seen in the document.
#[derive(Debug, Clone, Copy)]
enum Seen<'a> {
    /// The first heading that produced the identifier, not yet reported.
    Owner(&'a Node),
    Reported,
}

/// Report top-level headings whose identifiers collide.
///
/// The first collision on an identifier reports both headings; every later
/// heading with the same identifier adds one more error. Headings with an
/// empty identifier are left to [`validate_heading`].
pub fn validate_document(document: &Document) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashMap<String, Seen<'_>> = HashMap::new();

    for node in document.nodes.iter().filter(|node| node.is_heading()) {
        let id = heading_id(node);
        if id.is_empty() {
            continue;
        }

        match seen.entry(id) {
            Entry::Vacant(entry) => {
                entry.insert(Seen::Owner(node));
            }
            Entry::Occupied(mut entry) => {
                if let Seen::Owner(owner) = *entry.get() {
                    errors.push(ambiguous_heading(entry.key(), owner));
                    entry.insert(Seen::Reported);
                }
                errors.push(ambiguous_heading(entry.key(), node));
            }
        }
    }

    errors
}

fn ambiguous_heading(id: &str, node: &Node) -> ValidationError {
    ValidationError::error(
        ErrorCode::AmbiguousHeadingId,
        format!(
            "heading id \"{}\" is also used by another heading in this file; \
             disambiguate with {{% #some-id %}} after the heading",
            id
        ),
        &node.location,
    )
}

/// Checks that apply to a single heading. Non-headings produce nothing.
pub fn validate_heading(node: &Node) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let Some(level) = node.heading_level() else {
        return errors;
    };

    if level == 1 {
        errors.push(ValidationError::error(
            ErrorCode::DisallowedTopLevelHeading,
            "level 1 headings are not allowed; put the page title in the frontmatter, \
             otherwise use a lower heading level",
            &node.location,
        ));
    }

    if heading_id(node).is_empty() {
        errors.push(ValidationError::error(
            ErrorCode::EmptyHeadingId,
            "heading has an empty id; change its content so a non-empty id is generated, \
             or add {% #some-id %} after the heading",
            &node.location,
        ));
    }

    errors
}

/// Run every check over a document: headings at any depth, identifier
/// collisions, then tags. Errors are ordered by source position.
pub fn validate(document: &Document, config: &Config) -> Vec<ValidationError> {
    let mut errors: Vec<ValidationError> = document.headings().flat_map(validate_heading).collect();
    errors.extend(validate_document(document));
    errors.extend(validate_tags(document, config));
    errors.sort_by_key(|error| error.location.span.start);

    tracing::debug!(
        file_id = document.source_id,
        errors = errors.len(),
        "validated document"
    );
    errors
}

#[cfg(test)]
mod tests {
    use doctree::node::{Location, NodeKind};
    use pretty_assertions::assert_eq;

    use super::*;

    fn heading(level: u8, text: &str, start: usize) -> Node {
        Node::heading(level, None, vec![Node::text(text)]).at(0, start..start + 1)
    }

    fn codes(errors: &[ValidationError]) -> Vec<ErrorCode> {
        errors.iter().map(|e| e.code).collect()
    }

    #[test]
    fn unique_headings_pass() {
        let doc = Document::new(vec![heading(2, "Intro", 0), heading(2, "Usage", 10)]);
        assert!(validate_document(&doc).is_empty());
    }

    #[test]
    fn two_collisions_report_both() {
        let doc = Document::new(vec![heading(2, "Intro", 0), heading(3, "intro", 10)]);
        let errors = validate_document(&doc);
        assert_eq!(
            codes(&errors),
            vec![ErrorCode::AmbiguousHeadingId, ErrorCode::AmbiguousHeadingId]
        );
        assert_eq!(errors[0].location.span.start, 0);
        assert_eq!(errors[1].location.span.start, 10);
        assert!(errors[0].message.contains("\"intro\""));
    }

    #[test]
    fn three_collisions_report_three() {
        let doc = Document::new(vec![
            heading(2, "Intro", 0),
            heading(2, "Intro", 10),
            heading(2, "Intro", 20),
        ]);
        let errors = validate_document(&doc);
        assert_eq!(errors.len(), 3);
        let starts: Vec<usize> = errors.iter().map(|e| e.location.span.start).collect();
        assert_eq!(starts, vec![0, 10, 20]);
    }

    #[test]
    fn collisions_tracked_per_identifier() {
        let doc = Document::new(vec![
            heading(2, "A", 0),
            heading(2, "B", 10),
            heading(2, "A", 20),
            heading(2, "B", 30),
            heading(2, "A", 40),
        ]);
        assert_eq!(validate_document(&doc).len(), 5);
    }

    #[test]
    fn explicit_ids_disambiguate() {
        let doc = Document::new(vec![
            heading(2, "Intro", 0),
            Node::heading(2, Some("intro-2"), vec![Node::text("Intro")]).at(0, 10..11),
        ]);
        assert!(validate_document(&doc).is_empty());
    }

    #[test]
    fn explicit_id_can_collide_with_derived() {
        let doc = Document::new(vec![
            heading(2, "Setup", 0),
            Node::heading(2, Some("setup"), Vec::new()).at(0, 10..11),
        ]);
        assert_eq!(validate_document(&doc).len(), 2);
    }

    #[test]
    fn empty_ids_are_not_ambiguous() {
        let doc = Document::new(vec![heading(2, "!!!", 0), heading(2, "???", 10)]);
        assert!(validate_document(&doc).is_empty());

        let errors: Vec<ValidationError> = doc.headings().flat_map(validate_heading).collect();
        assert_eq!(
            codes(&errors),
            vec![ErrorCode::EmptyHeadingId, ErrorCode::EmptyHeadingId]
        );
    }

    #[test]
    fn nested_headings_skip_collision_check() {
        let quote = Node::new(
            NodeKind::Blockquote,
            vec![heading(2, "Intro", 10)],
            Location::new(0, 8..20),
        );
        let doc = Document::new(vec![heading(2, "Intro", 0), quote]);
        assert!(validate_document(&doc).is_empty());
    }

    #[test]
    fn level_one_is_rejected() {
        let errors = validate_heading(&heading(1, "Title", 0));
        assert_eq!(codes(&errors), vec![ErrorCode::DisallowedTopLevelHeading]);

        let errors = validate_heading(&Node::heading(1, Some("title"), Vec::new()));
        assert_eq!(codes(&errors), vec![ErrorCode::DisallowedTopLevelHeading]);

        let errors = validate_heading(&Node::heading(1, None, Vec::new()));
        assert_eq!(
            codes(&errors),
            vec![ErrorCode::DisallowedTopLevelHeading, ErrorCode::EmptyHeadingId]
        );
    }

    #[test]
    fn empty_heading_reports_once() {
        let errors = validate_heading(&Node::heading(2, None, Vec::new()));
        assert_eq!(codes(&errors), vec![ErrorCode::EmptyHeadingId]);
        assert_eq!(errors[0].level, crate::error::Level::Error);
    }

    #[test]
    fn non_headings_are_ignored() {
        assert!(validate_heading(&Node::text("Intro")).is_empty());
    }

    #[test]
    fn validate_orders_by_position() {
        let doc = Document::new(vec![
            heading(1, "Intro", 0),
            heading(2, "Intro", 10),
            heading(2, "", 20),
        ]);
        let errors = validate(&doc, &Config::docs());
        assert_eq!(
            codes(&errors),
            vec![
                ErrorCode::DisallowedTopLevelHeading,
                ErrorCode::AmbiguousHeadingId,
                ErrorCode::AmbiguousHeadingId,
                ErrorCode::EmptyHeadingId,
            ]
        );
    }
}
