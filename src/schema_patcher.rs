//! In-memory repair of the main schema's include reference
//!
//! The main schema is parsed into a libxml2 tree with its own path as base URL.
//! Every `xs:include` whose `schemaLocation` names the supplementary schema is
//! pointed at the supplementary file's real name, which then resolves next to
//! the main schema. Schema files on disk are only ever read.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::SchemaNaming;
use crate::error::{LibXml2Error, Result, ToolError, join_diagnostics};
use crate::libxml2::{
    LibXml2Wrapper, XML_SCHEMA_NAMESPACE, XmlDocument, XmlSchemaPtr, path_to_url, url_to_path,
};

const INCLUDE_ELEMENT: &str = "include";
const LOCATION_ATTRIBUTE: &str = "schemaLocation";

/// One rewritten include location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePatch {
    pub original: String,
    pub replacement: String,
}

/// Main schema tree with its include locations corrected
#[derive(Debug)]
pub struct PatchedSchema {
    document: XmlDocument,
    path: PathBuf,
    patches: Vec<IncludePatch>,
}

impl PatchedSchema {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn patches(&self) -> &[IncludePatch] {
        &self.patches
    }

    /// Current `schemaLocation` of every `xs:include`, in document order
    pub fn include_locations(&self) -> Result<Vec<String>> {
        self.document
            .attribute_values(XML_SCHEMA_NAMESPACE, INCLUDE_ELEMENT, LOCATION_ATTRIBUTE)
            .map_err(|err| compilation_error(&self.path, err))
    }
}

/// Schema compiled from a patched tree, ready for one validation
#[derive(Debug)]
pub struct CompiledSchema {
    schema: XmlSchemaPtr,
    path: PathBuf,
    patches: Vec<IncludePatch>,
}

impl CompiledSchema {
    /// Main schema file the schema was compiled from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn patches(&self) -> &[IncludePatch] {
        &self.patches
    }

    pub(crate) fn inner(&self) -> &XmlSchemaPtr {
        &self.schema
    }
}

/// Loads, patches and compiles the main schema
pub struct SchemaPatcher {
    wrapper: LibXml2Wrapper,
    naming: SchemaNaming,
}

impl SchemaPatcher {
    pub fn new(naming: SchemaNaming) -> Self {
        Self {
            wrapper: LibXml2Wrapper::new(),
            naming,
        }
    }

    /// Read and parse the main schema, keeping its path as the base URL
    pub async fn load(&self, main_schema: &Path) -> Result<XmlDocument> {
        let content = tokio::fs::read(main_schema)
            .await
            .map_err(|e| ToolError::SchemaCompilation {
                path: main_schema.to_path_buf(),
                details: format!("reading schema file failed: {}", e),
            })?;

        let base_url = path_to_url(main_schema).map_err(|e| compilation_error(main_schema, e))?;

        self.wrapper
            .parse_document(&content, &base_url, true)
            .map_err(|e| compilation_error(main_schema, e))
    }

    /// Point every matching `xs:include` at the supplementary schema's file name
    ///
    /// An include matches when its location mentions the supplementary marker.
    /// Without a supplementary schema the tree is left as it is.
    pub fn patch_includes(
        &self,
        document: &mut XmlDocument,
        supplementary: Option<&Path>,
    ) -> Result<Vec<IncludePatch>> {
        let schema_path = url_to_path(document.base_url());

        let Some(supplementary) = supplementary else {
            debug!(schema = %schema_path.display(), "No supplementary schema; includes unchanged");
            return Ok(Vec::new());
        };

        let replacement = supplementary
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| ToolError::SchemaCompilation {
                path: schema_path.clone(),
                details: format!(
                    "supplementary schema name is not usable: {}",
                    supplementary.display()
                ),
            })?
            .to_string();

        let naming = &self.naming;
        let changes = document
            .rewrite_attributes(
                XML_SCHEMA_NAMESPACE,
                INCLUDE_ELEMENT,
                LOCATION_ATTRIBUTE,
                |location| {
                    (naming.mentions_supplementary(location) && location != replacement)
                        .then(|| replacement.clone())
                },
            )
            .map_err(|e| compilation_error(&schema_path, e))?;

        let patches: Vec<IncludePatch> = changes
            .into_iter()
            .map(|(original, replacement)| IncludePatch {
                original,
                replacement,
            })
            .collect();

        for patch in &patches {
            info!(
                schema = %schema_path.display(),
                from = %patch.original,
                to = %patch.replacement,
                "Rewrote schema include"
            );
        }

        Ok(patches)
    }

    /// Compile a patched tree; remaining includes resolve from its base URL
    pub fn compile(&self, patched: PatchedSchema) -> Result<CompiledSchema> {
        let PatchedSchema {
            document,
            path,
            patches,
        } = patched;

        let schema = self
            .wrapper
            .compile_schema(document)
            .map_err(|e| compilation_error(&path, e))?;

        for warning in schema.warnings() {
            debug!(schema = %path.display(), %warning, "Schema compiler warning");
        }
        info!(schema = %path.display(), "Compiled schema");

        Ok(CompiledSchema {
            schema,
            path,
            patches,
        })
    }

    /// Load the main schema and patch its includes without compiling
    pub async fn prepare(
        &self,
        main_schema: &Path,
        supplementary: Option<&Path>,
    ) -> Result<PatchedSchema> {
        let mut document = self.load(main_schema).await?;
        let patches = self.patch_includes(&mut document, supplementary)?;

        Ok(PatchedSchema {
            document,
            path: main_schema.to_path_buf(),
            patches,
        })
    }

    /// Load, patch and compile the main schema
    pub async fn fix_schema_includes(
        &self,
        main_schema: &Path,
        supplementary: Option<&Path>,
    ) -> Result<CompiledSchema> {
        let patched = self.prepare(main_schema, supplementary).await?;
        self.compile(patched)
    }
}

fn compilation_error(path: &Path, err: LibXml2Error) -> ToolError {
    let details = match &err {
        LibXml2Error::DocumentParseFailed { diagnostics }
        | LibXml2Error::SchemaParseFailed { diagnostics } => join_diagnostics(diagnostics),
        other => other.to_string(),
    };
    ToolError::SchemaCompilation {
        path: path.to_path_buf(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libxml2::{Diagnostic, DiagnosticLevel};

    const MAIN_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
    <xs:include schemaLocation="../CommonTypes/v1/CommonTypes_old.xsd"/>
    <xs:include schemaLocation="LocalTypes.xsd"/>
</xs:schema>"#;

    fn parse(content: &str) -> XmlDocument {
        LibXml2Wrapper::new()
            .parse_document(content.as_bytes(), "/schemas/FSA029_v1.xsd", true)
            .unwrap()
    }

    fn patcher() -> SchemaPatcher {
        SchemaPatcher::new(SchemaNaming::default())
    }

    #[test]
    fn test_patch_includes_rewrites_matching_location() {
        let mut document = parse(MAIN_XSD);
        let patches = patcher()
            .patch_includes(&mut document, Some(Path::new("/schemas/CommonTypes_v3.xsd")))
            .unwrap();

        assert_eq!(
            patches,
            vec![IncludePatch {
                original: "../CommonTypes/v1/CommonTypes_old.xsd".to_string(),
                replacement: "CommonTypes_v3.xsd".to_string(),
            }]
        );

        let locations = document
            .attribute_values(XML_SCHEMA_NAMESPACE, INCLUDE_ELEMENT, LOCATION_ATTRIBUTE)
            .unwrap();
        assert_eq!(locations, vec!["CommonTypes_v3.xsd", "LocalTypes.xsd"]);
    }

    #[test]
    fn test_patch_includes_is_idempotent() {
        let mut document = parse(MAIN_XSD);
        let supplementary = Path::new("/schemas/CommonTypes_v3.xsd");
        let patcher = patcher();

        assert_eq!(
            patcher
                .patch_includes(&mut document, Some(supplementary))
                .unwrap()
                .len(),
            1
        );
        assert!(
            patcher
                .patch_includes(&mut document, Some(supplementary))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_patch_includes_without_supplementary() {
        let mut document = parse(MAIN_XSD);
        let patches = patcher().patch_includes(&mut document, None).unwrap();
        assert!(patches.is_empty());

        let locations = document
            .attribute_values(XML_SCHEMA_NAMESPACE, INCLUDE_ELEMENT, LOCATION_ATTRIBUTE)
            .unwrap();
        assert_eq!(locations[0], "../CommonTypes/v1/CommonTypes_old.xsd");
    }

    #[test]
    fn test_patch_includes_marker_case_rule() {
        let supplementary = Path::new("/schemas/CommonTypes_v3.xsd");
        let lower = MAIN_XSD.replace("CommonTypes_old", "commontypes_old");

        let mut document = parse(&lower);
        assert_eq!(
            patcher()
                .patch_includes(&mut document, Some(supplementary))
                .unwrap()
                .len(),
            1
        );

        let strict = SchemaPatcher::new(SchemaNaming {
            case_sensitive: true,
            ..SchemaNaming::default()
        });
        let mut document = parse(&lower.replace("../CommonTypes/v1/", ""));
        assert!(
            strict
                .patch_includes(&mut document, Some(supplementary))
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_compilation_error_joins_diagnostics() {
        let err = compilation_error(
            Path::new("/schemas/FSA029_v1.xsd"),
            LibXml2Error::SchemaParseFailed {
                diagnostics: vec![Diagnostic {
                    level: DiagnosticLevel::Error,
                    message: "type does not resolve".to_string(),
                    file: None,
                    line: Some(3),
                    column: None,
                }],
            },
        );

        assert_eq!(
            err.to_string(),
            "creating XML schema from /schemas/FSA029_v1.xsd failed: line 3: type does not resolve"
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_compilation_error() {
        let result = patcher().load(Path::new("/nonexistent/FSA029.xsd")).await;
        assert!(matches!(
            result.unwrap_err(),
            ToolError::SchemaCompilation { .. }
        ));
    }
}
