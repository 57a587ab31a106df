use clap::Parser;
use std::path::PathBuf;

/// Usage line printed when the arguments cannot be parsed
pub const USAGE: &str = "Usage: validate-schema <schema_folder_path> <submission_xml_path>";

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum VerbosityLevel {
    /// Only show failures and errors
    Quiet,
    /// Show the status line
    #[default]
    Normal,
    /// Also show resolved paths and include rewrites
    Verbose,
}

/// Validate an XML submission against a schema pair
#[derive(Parser, Debug, Clone)]
#[command(name = "validate-schema")]
#[command(
    about = "Validate an XML submission against a main schema and its supplementary schema, \
             fixing the supplementary include in memory"
)]
#[command(version)]
pub struct Cli {
    /// Folder containing the main and supplementary schemas
    #[arg(value_name = "SCHEMA_FOLDER")]
    pub schema_folder: PathBuf,

    /// XML document to validate
    #[arg(value_name = "SUBMISSION")]
    pub submission: PathBuf,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File-name marker of the main schema
    #[arg(long = "main-marker", value_name = "TEXT")]
    pub main_marker: Option<String>,

    /// File-name marker of the supplementary schema
    #[arg(long = "supplementary-marker", value_name = "TEXT")]
    pub supplementary_marker: Option<String>,

    /// Schema file extension, without the dot
    #[arg(long = "extension", value_name = "EXT")]
    pub extension: Option<String>,

    /// Match markers and extension case-sensitively
    #[arg(long = "case-sensitive")]
    pub case_sensitive: bool,

    /// Proceed when no supplementary schema is present
    #[arg(long = "allow-missing-supplementary")]
    pub allow_missing_supplementary: bool,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (failures only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,
}

impl Cli {
    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
