use crate::config::{Config, SchemaNaming};
use crate::error::{Result, ToolError};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Role a schema file plays, derived from its file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaRole {
    Main,
    Supplementary,
}

/// Input paths for one run, all confirmed to exist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub schema_folder: PathBuf,
    pub main_schema: PathBuf,
    /// `None` only when a missing supplementary schema is tolerated
    pub supplementary_schema: Option<PathBuf>,
    pub submission: PathBuf,
}

/// Locates the main and supplementary schema in a folder by file-name convention
#[derive(Debug, Clone)]
pub struct SchemaDiscovery {
    naming: SchemaNaming,
    require_supplementary: bool,
}

impl SchemaDiscovery {
    /// Create a discovery engine that requires both schemas
    pub fn new(naming: SchemaNaming) -> Self {
        Self {
            naming,
            require_supplementary: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.schemas.clone())
            .with_require_supplementary(config.policy.require_supplementary)
    }

    /// Set whether a missing supplementary schema is fatal
    pub fn with_require_supplementary(mut self, require: bool) -> Self {
        self.require_supplementary = require;
        self
    }

    pub fn naming(&self) -> &SchemaNaming {
        &self.naming
    }

    /// Classify a file name
    ///
    /// Names without the schema extension have no role. The supplementary
    /// marker is checked first, so a name carrying both markers is never the
    /// main schema.
    pub fn classify(&self, file_name: &str) -> Option<SchemaRole> {
        if !self.naming.has_schema_extension(file_name) {
            return None;
        }
        if self.naming.mentions_supplementary(file_name) {
            Some(SchemaRole::Supplementary)
        } else if self.naming.mentions_main(file_name) {
            Some(SchemaRole::Main)
        } else {
            None
        }
    }

    /// Resolve the schema pair in `folder` and confirm `submission` exists
    ///
    /// # Errors
    ///
    /// - `SchemaFolderNotFound` if `folder` is not an existing directory
    /// - `MainSchemaNotFound` if no file classifies as the main schema
    /// - `SupplementarySchemaNotFound` if none classifies as supplementary and
    ///   one is required
    /// - `SubmissionNotFound` if `submission` is not an existing regular file
    pub async fn resolve(&self, folder: &Path, submission: &Path) -> Result<ResolvedPaths> {
        let is_dir = fs::metadata(folder)
            .await
            .map(|metadata| metadata.is_dir())
            .unwrap_or(false);
        if !is_dir {
            return Err(ToolError::SchemaFolderNotFound {
                path: folder.to_path_buf(),
            });
        }

        let (main_candidates, supplementary_candidates) = self.schema_candidates(folder).await?;

        let main_schema = pick_first(SchemaRole::Main, main_candidates).ok_or_else(|| {
            ToolError::MainSchemaNotFound {
                folder: folder.to_path_buf(),
                marker: self.naming.main_marker.clone(),
                extension: self.naming.extension.clone(),
            }
        })?;

        let supplementary_schema = pick_first(SchemaRole::Supplementary, supplementary_candidates);
        if supplementary_schema.is_none() {
            if self.require_supplementary {
                return Err(ToolError::SupplementarySchemaNotFound {
                    folder: folder.to_path_buf(),
                    marker: self.naming.supplementary_marker.clone(),
                    extension: self.naming.extension.clone(),
                });
            }
            warn!(
                folder = %folder.display(),
                marker = %self.naming.supplementary_marker,
                "No supplementary schema found; includes are left as authored"
            );
        }

        let submission_is_file = fs::metadata(submission)
            .await
            .map(|metadata| metadata.is_file())
            .unwrap_or(false);
        if !submission_is_file {
            return Err(ToolError::SubmissionNotFound {
                path: submission.to_path_buf(),
            });
        }

        Ok(ResolvedPaths {
            schema_folder: folder.to_path_buf(),
            main_schema,
            supplementary_schema,
            submission: submission.to_path_buf(),
        })
    }

    /// Regular files directly inside `folder`, split into (main, supplementary)
    async fn schema_candidates(&self, folder: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
        let mut main = Vec::new();
        let mut supplementary = Vec::new();

        let mut read_dir = fs::read_dir(folder).await?;
        while let Some(entry) = read_dir.next_entry().await? {
            let path = entry.path();
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                debug!(path = %path.display(), "Skipping non UTF-8 file name");
                continue;
            };

            let Some(role) = self.classify(name) else {
                continue;
            };

            // Follows symlinks, so a linked schema file still counts
            let is_file = fs::metadata(&path)
                .await
                .map(|metadata| metadata.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            debug!(file = name, ?role, "Classified schema candidate");
            match role {
                SchemaRole::Main => main.push(path),
                SchemaRole::Supplementary => supplementary.push(path),
            }
        }

        Ok((main, supplementary))
    }
}

/// Deterministic choice among candidates: the first by file name
fn pick_first(role: SchemaRole, mut candidates: Vec<PathBuf>) -> Option<PathBuf> {
    candidates.sort();
    if candidates.len() > 1 {
        let ignored: Vec<String> = candidates[1..]
            .iter()
            .map(|path| path.display().to_string())
            .collect();
        warn!(
            ?role,
            selected = %candidates[0].display(),
            ignored = ?ignored,
            "Several schema files match; using the first by name"
        );
    }
    candidates.into_iter().next()
}
