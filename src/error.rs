use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::libxml2::Diagnostic;

/// Main application error type covering every fatal failure of a run
///
/// Non-conforming or unreadable submissions are not errors; they are reported
/// through [`crate::validator::ValidationOutcome`].
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("schema folder not found at {}", path.display())]
    SchemaFolderNotFound { path: PathBuf },

    #[error(
        "main schema file (*.{extension}, e.g. {marker}) not found in {}",
        folder.display()
    )]
    MainSchemaNotFound {
        folder: PathBuf,
        marker: String,
        extension: String,
    },

    #[error(
        "supplementary schema file (*.{extension}, e.g. {marker}) not found in {}",
        folder.display()
    )]
    SupplementarySchemaNotFound {
        folder: PathBuf,
        marker: String,
        extension: String,
    },

    #[error("submission file not found at {}", path.display())]
    SubmissionNotFound { path: PathBuf },

    #[error("creating XML schema from {} failed: {details}", path.display())]
    SchemaCompilation { path: PathBuf, details: String },
}

impl ToolError {
    /// Whether the error means an expected input was missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ToolError::SchemaFolderNotFound { .. }
                | ToolError::MainSchemaNotFound { .. }
                | ToolError::SupplementarySchemaNotFound { .. }
                | ToolError::SubmissionNotFound { .. }
        )
    }
}

/// LibXML2-specific error types
#[derive(Error, Debug)]
pub enum LibXml2Error {
    #[error("Parser context creation failed")]
    ParserContextFailed,

    #[error("XML document could not be parsed: {}", join_diagnostics(diagnostics))]
    DocumentParseFailed { diagnostics: Vec<Diagnostic> },

    #[error("Schema parsing failed: {}", join_diagnostics(diagnostics))]
    SchemaParseFailed { diagnostics: Vec<Diagnostic> },

    #[error("Validation context creation failed")]
    ValidationContextCreationFailed,

    #[error("XPath evaluation failed: {expression}")]
    XPathFailed { expression: String },

    #[error("Setting attribute {attribute} failed")]
    AttributeUpdateFailed { attribute: String },

    #[error("Document of {size} bytes is too large to parse")]
    DocumentTooLarge { size: usize },

    #[error("String contains an interior NUL byte: {value:?}")]
    InvalidString { value: String },

    #[error("Path cannot be expressed as a file URL: {}", path.display())]
    UnusablePath { path: PathBuf },
}

/// Join diagnostics into a single line for error messages
pub(crate) fn join_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "no diagnostics reported".to_string();
    }
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<ConfigError> for ToolError {
    fn from(err: ConfigError) -> Self {
        ToolError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ToolError>;

/// LibXML2 result type alias
pub type LibXml2Result<T> = std::result::Result<T, LibXml2Error>;
