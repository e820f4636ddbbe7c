pub mod error;
mod structural;

pub use error::{ParseError, ParseErrorKind};

use crate::Document;

/// A document together with the syntax errors met while building it.
/// Malformed annotations are left out of the tree; everything else is kept.
#[derive(Debug)]
pub struct Parsed {
    pub document: Document,
    pub errors: Vec<ParseError>,
}

impl Parsed {
    /// The document if the source had no syntax errors.
    pub fn into_result(self) -> Result<Document, Vec<ParseError>> {
        if self.errors.is_empty() {
            Ok(self.document)
        } else {
            Err(self.errors)
        }
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    file_id: usize,
}

impl Parser {
    pub fn new(source: String, file_id: usize) -> Self {
        Parser { source, file_id }
    }

    /// Parse the source Markdown into a document tree, failing on any
    /// syntax error.
    pub fn parse(&self) -> Result<Document, Vec<ParseError>> {
        self.parse_recovering().into_result()
    }

    /// Parse without giving up on syntax errors.
    pub fn parse_recovering(&self) -> Parsed {
        structural::parse_document(&self.source, self.file_id)
    }
}
