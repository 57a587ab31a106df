mod common;

use common::test_helpers::{
    COMMON_TYPES_SCHEMA, MAIN_SCHEMA, MISSING_FIELD_SUBMISSION, VALID_SUBMISSION, Workspace,
};
use validate_schema::libxml2::{XML_SCHEMA_NAMESPACE, path_to_url};
use validate_schema::{LibXml2Error, LibXml2Wrapper, ValidationResult};

#[test]
fn test_include_resolves_against_document_base_url() {
    let workspace = Workspace::empty();
    let main_path = workspace.add_schema(
        "FSA029_v1.xsd",
        &MAIN_SCHEMA.replace("../CommonTypes/v1/CommonTypes_old.xsd", "CommonTypes_v3.xsd"),
    );
    workspace.add_schema("CommonTypes_v3.xsd", COMMON_TYPES_SCHEMA);

    let wrapper = LibXml2Wrapper::new();
    let base_url = path_to_url(&main_path).unwrap();
    let document = wrapper
        .parse_document(std::fs::read(&main_path).unwrap().as_slice(), &base_url, true)
        .unwrap();
    let schema = wrapper.compile_schema(document).unwrap();

    let valid = wrapper
        .parse_document(VALID_SUBMISSION.as_bytes(), "return.xml", false)
        .unwrap();
    assert_eq!(
        wrapper.validate_document(&schema, &valid).unwrap(),
        ValidationResult::Valid
    );

    let missing = wrapper
        .parse_document(MISSING_FIELD_SUBMISSION.as_bytes(), "return.xml", false)
        .unwrap();
    match wrapper.validate_document(&schema, &missing).unwrap() {
        ValidationResult::Invalid { errors, .. } => {
            assert!(errors.iter().any(|e| e.message.contains("TotalAssets")))
        }
        other => panic!("Expected Invalid, got {:?}", other),
    }
}

#[test]
fn test_unresolvable_include_fails_compilation() {
    let workspace = Workspace::empty();
    let main_path = workspace.add_schema("FSA029_v1.xsd", MAIN_SCHEMA);

    let wrapper = LibXml2Wrapper::new();
    let base_url = path_to_url(&main_path).unwrap();
    let document = wrapper
        .parse_document(MAIN_SCHEMA.as_bytes(), &base_url, true)
        .unwrap();

    match wrapper.compile_schema(document) {
        Err(LibXml2Error::SchemaParseFailed { diagnostics }) => {
            assert!(!diagnostics.is_empty())
        }
        other => panic!("Expected SchemaParseFailed, got {:?}", other),
    }
}

#[test]
fn test_rewritten_include_is_used_by_compiler() {
    let workspace = Workspace::with_schema_pair();
    let wrapper = LibXml2Wrapper::new();
    let base_url = path_to_url(&workspace.main_schema()).unwrap();

    let mut document = wrapper
        .parse_document(MAIN_SCHEMA.as_bytes(), &base_url, true)
        .unwrap();
    let changes = document
        .rewrite_attributes(XML_SCHEMA_NAMESPACE, "include", "schemaLocation", |_| {
            Some("CommonTypes_v3.xsd".to_string())
        })
        .unwrap();
    assert_eq!(changes.len(), 1);

    let schema = wrapper.compile_schema(document).unwrap();
    let valid = wrapper
        .parse_document(VALID_SUBMISSION.as_bytes(), "return.xml", false)
        .unwrap();
    assert_eq!(
        wrapper.validate_document(&schema, &valid).unwrap(),
        ValidationResult::Valid
    );
}

#[test]
fn test_wrapper_is_reusable_across_threads() {
    let handles: Vec<_> = (0..4)
        .map(|_| {
            std::thread::spawn(|| {
                let wrapper = LibXml2Wrapper::new();
                let result = wrapper.parse_document(b"<root><unclosed></root>", "t.xml", true);
                match result {
                    Err(LibXml2Error::DocumentParseFailed { diagnostics }) => diagnostics.len(),
                    other => panic!("Expected DocumentParseFailed, got {:?}", other),
                }
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap() > 0);
    }
}
