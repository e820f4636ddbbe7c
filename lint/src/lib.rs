pub mod config;
pub mod error;
pub mod heading;
pub mod render;
pub mod slug;
pub mod tags;
pub mod validate;

pub use config::Config;
pub use error::{Error, ErrorCode, Level, Result, ValidationError};
pub use heading::heading_id;
pub use slug::slugify;
pub use tags::validate_tags;
pub use validate::{validate, validate_document, validate_heading};

use doctree::parser::Parser;

/// Parse and validate Markdown source. Syntax errors are reported as
/// `syntax-error` records next to the validation results, in source order.
pub fn check_source(source: &str, file_id: usize, config: &Config) -> Vec<ValidationError> {
    let parsed = Parser::new(source.to_string(), file_id).parse_recovering();
    let mut errors: Vec<ValidationError> =
        parsed.errors.iter().map(ValidationError::from).collect();
    errors.extend(validate(&parsed.document, config));
    errors.sort_by_key(|error| error.location.span.start);
    errors
}
