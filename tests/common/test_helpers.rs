#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Main schema whose include points at a layout that does not exist
pub const MAIN_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns="urn:fsa029"
           targetNamespace="urn:fsa029"
           elementFormDefault="qualified">
    <xs:include schemaLocation="../CommonTypes/v1/CommonTypes_old.xsd"/>
    <xs:element name="FSA029Data">
        <xs:complexType>
            <xs:sequence>
                <xs:element name="FirmReference" type="FirmReferenceType"/>
                <xs:element name="ReportingPeriod" type="xs:date"/>
                <xs:element name="TotalAssets" type="MonetaryAmountType"/>
            </xs:sequence>
        </xs:complexType>
    </xs:element>
</xs:schema>
"#;

/// Supplementary schema defining the types the main schema uses
pub const COMMON_TYPES_SCHEMA: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns="urn:fsa029"
           targetNamespace="urn:fsa029"
           elementFormDefault="qualified">
    <xs:simpleType name="FirmReferenceType">
        <xs:restriction base="xs:string">
            <xs:pattern value="[0-9]{6}"/>
        </xs:restriction>
    </xs:simpleType>
    <xs:simpleType name="MonetaryAmountType">
        <xs:restriction base="xs:decimal">
            <xs:fractionDigits value="2"/>
        </xs:restriction>
    </xs:simpleType>
</xs:schema>
"#;

pub const VALID_SUBMISSION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FSA029Data xmlns="urn:fsa029">
    <FirmReference>123456</FirmReference>
    <ReportingPeriod>2024-03-31</ReportingPeriod>
    <TotalAssets>1500000.00</TotalAssets>
</FSA029Data>
"#;

pub const MISSING_FIELD_SUBMISSION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FSA029Data xmlns="urn:fsa029">
    <FirmReference>123456</FirmReference>
    <ReportingPeriod>2024-03-31</ReportingPeriod>
</FSA029Data>
"#;

pub const BAD_VALUE_SUBMISSION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FSA029Data xmlns="urn:fsa029">
    <FirmReference>ABC</FirmReference>
    <ReportingPeriod>2024-03-31</ReportingPeriod>
    <TotalAssets>1500000.00</TotalAssets>
</FSA029Data>
"#;

pub const MALFORMED_SUBMISSION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<FSA029Data xmlns="urn:fsa029">
    <FirmReference>123456
</FSA029Data>
"#;

pub const MAIN_SCHEMA_NAME: &str = "FSA029_v1.xsd";
pub const COMMON_TYPES_NAME: &str = "CommonTypes_v3.xsd";

/// A temporary workspace with a `schemas/` folder and a `submissions/` folder
pub struct Workspace {
    pub dir: TempDir,
    pub schema_folder: PathBuf,
    pub submissions: PathBuf,
}

impl Workspace {
    /// Empty schema and submission folders
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let schema_folder = dir.path().join("schemas");
        let submissions = dir.path().join("submissions");
        fs::create_dir_all(&schema_folder).unwrap();
        fs::create_dir_all(&submissions).unwrap();

        Self {
            dir,
            schema_folder,
            submissions,
        }
    }

    /// Schema folder holding `FSA029_v1.xsd` and `CommonTypes_v3.xsd`
    pub fn with_schema_pair() -> Self {
        let workspace = Self::empty();
        workspace.add_schema(MAIN_SCHEMA_NAME, MAIN_SCHEMA);
        workspace.add_schema(COMMON_TYPES_NAME, COMMON_TYPES_SCHEMA);
        workspace
    }

    pub fn add_schema(&self, name: &str, content: &str) -> PathBuf {
        write_file(&self.schema_folder, name, content)
    }

    pub fn add_submission(&self, name: &str, content: &str) -> PathBuf {
        write_file(&self.submissions, name, content)
    }

    pub fn main_schema(&self) -> PathBuf {
        self.schema_folder.join(MAIN_SCHEMA_NAME)
    }

    pub fn common_types(&self) -> PathBuf {
        self.schema_folder.join(COMMON_TYPES_NAME)
    }
}

pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}
