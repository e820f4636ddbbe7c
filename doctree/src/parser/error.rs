use std::fmt;

use codespan_reporting::diagnostic::{Diagnostic, Severity};

use crate::node::Location;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// `{% ... %}` whose body could not be read.
    Malformed(String),
    /// `{%` with no `%}` before the end of the text run.
    Unterminated,
}

/// A syntax problem in an annotation. Parsing continues past it so that
/// every problem in a file is reported at once.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub location: Location,
}

impl ParseError {
    pub fn malformed(message: impl Into<String>, location: Location) -> Self {
        ParseError {
            kind: ParseErrorKind::Malformed(message.into()),
            location,
        }
    }

    pub fn unterminated(location: Location) -> Self {
        ParseError {
            kind: ParseErrorKind::Unterminated,
            location,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    fn note(&self) -> Option<&'static str> {
        match self.kind {
            ParseErrorKind::Malformed(_) => None,
            ParseErrorKind::Unterminated => {
                Some("an annotation must open with {% and close with %} on the same line")
            }
        }
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(Severity::Error)
            .with_message(self.message())
            .with_labels(vec![self.location.to_label()])
            .with_notes(self.note().map(str::to_string).into_iter().collect())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Malformed(message) => write!(f, "invalid annotation: {}", message),
            ParseErrorKind::Unterminated => f.write_str("unterminated annotation"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unterminated_carries_a_note() {
        let error = ParseError::unterminated(Location::new(1, 3..7));
        let diagnostic = error.to_diagnostic();
        assert_eq!(diagnostic.message, "unterminated annotation");
        assert_eq!(diagnostic.notes.len(), 1);
        assert_eq!(diagnostic.labels[0].range, 3..7);
    }

    #[test]
    fn malformed_names_the_problem() {
        let error = ParseError::malformed("expected a value", Location::new(0, 0..4));
        assert_eq!(error.message(), "invalid annotation: expected a value");
        assert!(error.to_diagnostic().notes.is_empty());
    }
}
