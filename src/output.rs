//! Simple Output and Reporting
//!
//! This module provides the human-readable status lines for a run.

use crate::cli::VerbosityLevel;
use crate::error::ToolError;
use crate::validator::{ValidationOutcome, ValidationReport};

const GREEN: &str = "32";
const RED: &str = "31";

/// Simple output formatter for human-readable results
pub struct Output {
    verbosity: VerbosityLevel,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel) -> Self {
        Self {
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Status output for a full run, with resolution details in verbose mode
    pub fn format_report(&self, report: &ValidationReport) -> String {
        let mut output = String::new();

        if self.verbosity >= VerbosityLevel::Verbose {
            output.push_str(&self.format_details(report));
        }
        output.push_str(&self.format_outcome(&report.outcome));

        output
    }

    pub fn format_outcome(&self, outcome: &ValidationOutcome) -> String {
        match outcome {
            ValidationOutcome::Valid => {
                if self.verbosity == VerbosityLevel::Quiet {
                    String::new()
                } else {
                    format!("{}\n", self.colorize("Validation successful", GREEN))
                }
            }
            ValidationOutcome::Invalid { diagnostics } => {
                let mut output = format!("{}\n", self.colorize("Validation failed", RED));
                for diagnostic in diagnostics {
                    output.push_str(&format!("  {}\n", diagnostic));
                }
                output
            }
            ValidationOutcome::SubmissionError { detail, .. } => {
                format!(
                    "{}: {}\n",
                    self.colorize("Error reading submission", RED),
                    detail
                )
            }
        }
    }

    /// Line printed to stderr for a fatal error
    pub fn format_error(&self, error: &ToolError) -> String {
        format!("Error: {}", error)
    }

    fn format_details(&self, report: &ValidationReport) -> String {
        let paths = &report.paths;
        let mut output = String::new();

        output.push_str(&format!("Schema folder: {}\n", paths.schema_folder.display()));
        output.push_str(&format!("Main schema: {}\n", paths.main_schema.display()));
        match &paths.supplementary_schema {
            Some(path) => {
                output.push_str(&format!("Supplementary schema: {}\n", path.display()))
            }
            None => output.push_str("Supplementary schema: (none)\n"),
        }
        output.push_str(&format!("Submission: {}\n", paths.submission.display()));

        if report.patches.is_empty() {
            output.push_str("Include rewrites: none\n");
        }
        for patch in &report.patches {
            output.push_str(&format!(
                "Include rewritten: {} -> {}\n",
                patch.original, patch.replacement
            ));
        }

        output
    }
}
