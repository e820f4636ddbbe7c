use std::fmt;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Severity};
use doctree::node::Location;
use doctree::parser::ParseError;
use thiserror::Error;

/// Stable identifiers for every validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AmbiguousHeadingId,
    EmptyHeadingId,
    DisallowedTopLevelHeading,
    TagUndefined,
    AttributeUndefined,
    AttributeMissingRequired,
    AttributeTypeInvalid,
    AttributeValueInvalid,
    InvalidChildren,
    MissingClosing,
    SyntaxError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AmbiguousHeadingId => "ambiguous-heading-id",
            ErrorCode::EmptyHeadingId => "empty-id",
            ErrorCode::DisallowedTopLevelHeading => "no-h1",
            ErrorCode::TagUndefined => "tag-undefined",
            ErrorCode::AttributeUndefined => "attribute-undefined",
            ErrorCode::AttributeMissingRequired => "attribute-missing-required",
            ErrorCode::AttributeTypeInvalid => "attribute-type-invalid",
            ErrorCode::AttributeValueInvalid => "attribute-value-invalid",
            ErrorCode::InvalidChildren => "invalid-children",
            ErrorCode::MissingClosing => "missing-closing",
            ErrorCode::SyntaxError => "syntax-error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Level::Debug | Level::Info => Severity::Note,
            Level::Warning => Severity::Warning,
            Level::Error => Severity::Error,
            Level::Critical => Severity::Bug,
        }
    }
}

/// A validation failure attached to the node that caused it.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub level: Level,
    pub message: String,
    pub location: Location,
}

impl ValidationError {
    pub fn error(code: ErrorCode, message: impl Into<String>, location: &Location) -> Self {
        ValidationError {
            code,
            level: Level::Error,
            message: message.into(),
            location: location.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level >= Level::Error
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.level.severity())
            .with_code(self.code.as_str())
            .with_message(&self.message)
            .with_labels(vec![self.location.to_label()])
    }
}

impl From<&ParseError> for ValidationError {
    fn from(error: &ParseError) -> Self {
        ValidationError {
            code: ErrorCode::SyntaxError,
            level: Level::Error,
            message: error.message(),
            location: error.location.clone(),
        }
    }
}

/// Failures outside validation proper: reading files, loading config.
#[derive(Debug, Error)]
pub enum Error {
    #[error("cannot read '{}': {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
