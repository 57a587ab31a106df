//! # validate-schema Library
//!
//! Validates an XML submission against a main XML Schema whose include of a
//! supplementary schema is repaired in memory before compilation. Schema
//! validation itself is performed by libxml2.

pub mod cli;
pub mod config;
pub mod error;
pub mod file_discovery;
pub mod libxml2;
pub mod logging;
pub mod output;
pub mod schema_patcher;
pub mod validator;

pub use cli::{Cli, USAGE, VerbosityLevel};
pub use config::{Config, ConfigError, ConfigManager, SchemaNaming};
pub use error::{LibXml2Error, Result, ToolError};
pub use file_discovery::{ResolvedPaths, SchemaDiscovery, SchemaRole};
pub use libxml2::{Diagnostic, DiagnosticLevel, LibXml2Wrapper, ValidationResult, XmlDocument};
pub use output::Output;
pub use schema_patcher::{CompiledSchema, IncludePatch, PatchedSchema, SchemaPatcher};
pub use validator::{ValidationEngine, ValidationOutcome, ValidationReport};
