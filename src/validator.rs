//! Validation pipeline
//!
//! Resolves the schema pair, compiles the patched main schema and validates the
//! submission against it. Steps run strictly in sequence; file system access is
//! async, libxml2 work is synchronous.

use std::path::Path;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{LibXml2Error, Result, join_diagnostics};
use crate::file_discovery::{ResolvedPaths, SchemaDiscovery};
use crate::libxml2::{Diagnostic, LibXml2Wrapper, ValidationResult, path_to_url};
use crate::schema_patcher::{CompiledSchema, IncludePatch, SchemaPatcher};

/// Result of validating one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The submission conforms to the schema
    Valid,
    /// The submission violates the schema
    Invalid { diagnostics: Vec<Diagnostic> },
    /// The submission could not be read or parsed, or the engine failed on it
    SubmissionError {
        detail: String,
        diagnostics: Vec<Diagnostic>,
    },
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, ValidationOutcome::Invalid { .. })
    }

    pub fn is_submission_error(&self) -> bool {
        matches!(self, ValidationOutcome::SubmissionError { .. })
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            ValidationOutcome::Valid => &[],
            ValidationOutcome::Invalid { diagnostics }
            | ValidationOutcome::SubmissionError { diagnostics, .. } => diagnostics,
        }
    }

    /// Process exit code: 0 only for a valid submission
    pub fn exit_code(&self) -> u8 {
        if self.is_valid() { 0 } else { 1 }
    }
}

impl From<ValidationResult> for ValidationOutcome {
    fn from(result: ValidationResult) -> Self {
        match result {
            ValidationResult::Valid => ValidationOutcome::Valid,
            ValidationResult::Invalid { errors, .. } => ValidationOutcome::Invalid {
                diagnostics: errors,
            },
            ValidationResult::InternalError { code, errors } => {
                ValidationOutcome::SubmissionError {
                    detail: format!("validation engine internal error (code {})", code),
                    diagnostics: errors,
                }
            }
        }
    }
}

/// Everything a run produced, for detailed reporting
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub paths: ResolvedPaths,
    pub patches: Vec<IncludePatch>,
    pub outcome: ValidationOutcome,
}

/// Runs discovery, schema repair and validation
pub struct ValidationEngine {
    discovery: SchemaDiscovery,
    patcher: SchemaPatcher,
    libxml2_wrapper: LibXml2Wrapper,
}

impl ValidationEngine {
    pub fn new(config: &Config) -> Self {
        Self {
            discovery: SchemaDiscovery::from_config(config),
            patcher: SchemaPatcher::new(config.schemas.clone()),
            libxml2_wrapper: LibXml2Wrapper::new(),
        }
    }

    /// Validate the submission at `submission` against a compiled schema
    ///
    /// Never fails: problems with the submission itself are reported as
    /// [`ValidationOutcome::SubmissionError`].
    pub async fn validate_submission(
        &self,
        schema: &CompiledSchema,
        submission: &Path,
    ) -> ValidationOutcome {
        let content = match tokio::fs::read(submission).await {
            Ok(content) => content,
            Err(e) => {
                return ValidationOutcome::SubmissionError {
                    detail: e.to_string(),
                    diagnostics: Vec::new(),
                };
            }
        };

        let base_url =
            path_to_url(submission).unwrap_or_else(|_| submission.to_string_lossy().into_owned());
        let document = match self
            .libxml2_wrapper
            .parse_document(&content, &base_url, false)
        {
            Ok(document) => document,
            Err(LibXml2Error::DocumentParseFailed { diagnostics }) => {
                debug!(submission = %submission.display(), "Submission is not well-formed");
                return ValidationOutcome::SubmissionError {
                    detail: join_diagnostics(&diagnostics),
                    diagnostics,
                };
            }
            Err(e) => {
                return ValidationOutcome::SubmissionError {
                    detail: e.to_string(),
                    diagnostics: Vec::new(),
                };
            }
        };

        let outcome = match self
            .libxml2_wrapper
            .validate_document(schema.inner(), &document)
        {
            Ok(result) => ValidationOutcome::from(result),
            Err(e) => ValidationOutcome::SubmissionError {
                detail: e.to_string(),
                diagnostics: Vec::new(),
            },
        };

        info!(
            submission = %submission.display(),
            schema = %schema.path().display(),
            valid = outcome.is_valid(),
            diagnostics = outcome.diagnostics().len(),
            "Validation finished"
        );

        outcome
    }

    /// Run the whole pipeline and return the outcome
    ///
    /// Missing inputs and schema compilation failures are errors; anything
    /// about the submission is part of the outcome.
    pub async fn run(&self, folder: &Path, submission: &Path) -> Result<ValidationOutcome> {
        Ok(self.run_report(folder, submission).await?.outcome)
    }

    /// Run the whole pipeline keeping resolved paths and applied rewrites
    pub async fn run_report(&self, folder: &Path, submission: &Path) -> Result<ValidationReport> {
        let paths = self.discovery.resolve(folder, submission).await?;
        debug!(
            main = %paths.main_schema.display(),
            supplementary = ?paths.supplementary_schema,
            "Resolved schema pair"
        );

        let schema = self
            .patcher
            .fix_schema_includes(&paths.main_schema, paths.supplementary_schema.as_deref())
            .await?;

        let outcome = self.validate_submission(&schema, &paths.submission).await;

        Ok(ValidationReport {
            patches: schema.patches().to_vec(),
            paths,
            outcome,
        })
    }
}
