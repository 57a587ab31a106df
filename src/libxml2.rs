//! LibXML2 FFI Wrapper Module
//!
//! This module provides a safe wrapper around the libxml2 calls the tool needs:
//! parsing documents into trees, locating and rewriting attributes through
//! XPath, compiling a schema from an in-memory tree and validating a document
//! against it.
//!
//! ## Why direct FFI
//!
//! No mature pure Rust library implements XML Schema (XSD) validation, so
//! libxml2 is the validation engine. The bindings are declared here directly
//! against the system library; every pointer handed out by libxml2 is owned
//! by an RAII wrapper and freed exactly once on drop.
//!
//! ## Error capture
//!
//! libxml2 reports problems through callbacks. Parser errors go to the
//! thread's structured error handler, schema compiler and validator errors go
//! to handlers registered on their contexts. All of them are collected into
//! [`Diagnostic`] values with the message passed through verbatim.

use std::ffi::{CStr, CString};
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Once;

use libc::{c_char, c_int, c_void};
use url::Url;

use crate::error::{LibXml2Error, LibXml2Result};

/// Namespace of XML Schema definition documents
pub const XML_SCHEMA_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// `XML_PARSE_NOBLANKS`: drop whitespace-only text nodes
const XML_PARSE_NOBLANKS: c_int = 1 << 8;

/// Prefix bound to the requested namespace inside generated XPath expressions
const XPATH_PREFIX: &CStr = c"ns";

/// Global initialization flag for libxml2
///
/// libxml2's initialization functions are not thread-safe, so they run
/// exactly once behind `std::sync::Once`.
static LIBXML2_INIT: Once = Once::new();

type XmlChar = u8;

// Opaque libxml2 structures
#[repr(C)]
pub struct XmlDoc {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlNode {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchema {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaParserCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlSchemaValidCtxt {
    _private: [u8; 0],
}

#[repr(C)]
pub struct XmlXPathContext {
    _private: [u8; 0],
}

#[repr(C)]
#[allow(dead_code)]
struct XmlNodeSet {
    node_nr: c_int,
    node_max: c_int,
    node_tab: *mut *mut XmlNode,
}

#[repr(C)]
#[allow(dead_code)]
struct XmlXPathObject {
    object_type: c_int,
    nodesetval: *mut XmlNodeSet,
    boolval: c_int,
    floatval: f64,
    stringval: *mut XmlChar,
    user: *mut c_void,
    index: c_int,
    user2: *mut c_void,
    index2: c_int,
}

#[repr(C)]
pub struct xmlError {
    pub domain: c_int,
    pub code: c_int,
    pub message: *const c_char,
    pub level: c_int,
    pub file: *const c_char,
    pub line: c_int,
    pub str1: *const c_char,
    pub str2: *const c_char,
    pub str3: *const c_char,
    pub int1: c_int,
    pub int2: c_int,
    pub ctxt: *mut c_void,
    pub node: *mut c_void,
}

pub type XmlStructuredErrorFunc =
    Option<unsafe extern "C" fn(user_data: *mut c_void, error: *mut xmlError)>;

pub type XmlFreeFunc = unsafe extern "C" fn(mem: *mut c_void);

// External libxml2 FFI declarations
#[cfg_attr(target_os = "windows", link(name = "libxml2"))]
#[cfg_attr(not(target_os = "windows"), link(name = "xml2"))]
unsafe extern "C" {
    pub fn xmlInitParser();
    pub fn xmlInitGlobals();

    pub static xmlFree: XmlFreeFunc;

    // Document parsing
    pub fn xmlReadMemory(
        buffer: *const c_char,
        size: c_int,
        url: *const c_char,
        encoding: *const c_char,
        options: c_int,
    ) -> *mut XmlDoc;
    pub fn xmlFreeDoc(doc: *mut XmlDoc);
    pub fn xmlSetStructuredErrorFunc(ctx: *mut c_void, handler: XmlStructuredErrorFunc);

    // Tree access
    fn xmlXPathNewContext(doc: *mut XmlDoc) -> *mut XmlXPathContext;
    fn xmlXPathFreeContext(ctxt: *mut XmlXPathContext);
    fn xmlXPathRegisterNs(
        ctxt: *mut XmlXPathContext,
        prefix: *const XmlChar,
        ns_uri: *const XmlChar,
    ) -> c_int;
    fn xmlXPathEval(expr: *const XmlChar, ctxt: *mut XmlXPathContext) -> *mut XmlXPathObject;
    fn xmlXPathFreeObject(obj: *mut XmlXPathObject);
    fn xmlGetProp(node: *const XmlNode, name: *const XmlChar) -> *mut XmlChar;
    fn xmlSetProp(node: *mut XmlNode, name: *const XmlChar, value: *const XmlChar)
    -> *mut c_void;

    // Schema parsing functions
    pub fn xmlSchemaNewDocParserCtxt(doc: *mut XmlDoc) -> *mut XmlSchemaParserCtxt;
    pub fn xmlSchemaSetParserStructuredErrors(
        ctxt: *mut XmlSchemaParserCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaParse(ctxt: *const XmlSchemaParserCtxt) -> *mut XmlSchema;
    pub fn xmlSchemaFreeParserCtxt(ctxt: *mut XmlSchemaParserCtxt);
    pub fn xmlSchemaFree(schema: *mut XmlSchema);

    // Schema validation functions
    pub fn xmlSchemaNewValidCtxt(schema: *const XmlSchema) -> *mut XmlSchemaValidCtxt;
    pub fn xmlSchemaFreeValidCtxt(ctxt: *mut XmlSchemaValidCtxt);
    pub fn xmlSchemaSetValidStructuredErrors(
        ctxt: *mut XmlSchemaValidCtxt,
        serror: XmlStructuredErrorFunc,
        ctx: *mut c_void,
    );
    pub fn xmlSchemaValidateDoc(ctxt: *mut XmlSchemaValidCtxt, doc: *mut XmlDoc) -> c_int;
}

/// Severity of a libxml2 diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Warning,
    Error,
    Fatal,
}

impl DiagnosticLevel {
    fn from_raw(level: c_int) -> Self {
        match level {
            1 => DiagnosticLevel::Warning,
            3 => DiagnosticLevel::Fatal,
            _ => DiagnosticLevel::Error,
        }
    }
}

/// A single message reported by libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Diagnostic {
    /// Copy the interesting fields out of a libxml2 error record
    ///
    /// # Safety
    ///
    /// `error` must point to a live `xmlError` whose string fields are either
    /// null or NUL-terminated.
    unsafe fn from_raw(error: &xmlError) -> Option<Self> {
        let message = unsafe { c_string(error.message) }?;
        Some(Diagnostic {
            level: DiagnosticLevel::from_raw(error.level),
            message: message.trim().to_string(),
            file: unsafe { c_string(error.file) },
            line: positive(error.line),
            column: positive(error.int2),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => {
                write!(f, "line {}, column {}: {}", line, column, self.message)
            }
            (Some(line), None) => write!(f, "line {}: {}", line, self.message),
            _ => write!(f, "{}", self.message),
        }
    }
}

fn positive(value: c_int) -> Option<u32> {
    u32::try_from(value).ok().filter(|v| *v > 0)
}

unsafe fn c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

fn c_string_from(value: &str) -> LibXml2Result<CString> {
    CString::new(value).map_err(|_| LibXml2Error::InvalidString {
        value: value.to_string(),
    })
}

/// Callback for libxml2 to report errors (structured)
unsafe extern "C" fn structured_error_callback(user_data: *mut c_void, error: *mut xmlError) {
    if user_data.is_null() || error.is_null() {
        return;
    }
    let diagnostics = unsafe { &mut *(user_data as *mut Vec<Diagnostic>) };
    if let Some(diagnostic) = unsafe { Diagnostic::from_raw(&*error) } {
        diagnostics.push(diagnostic);
    }
}

/// Routes the thread's structured libxml2 errors into a vector until dropped
struct ErrorCapture<'a> {
    _sink: PhantomData<&'a mut Vec<Diagnostic>>,
}

impl<'a> ErrorCapture<'a> {
    fn install(sink: &'a mut Vec<Diagnostic>) -> Self {
        unsafe {
            xmlSetStructuredErrorFunc(
                sink as *mut Vec<Diagnostic> as *mut c_void,
                Some(structured_error_callback),
            );
        }
        ErrorCapture { _sink: PhantomData }
    }
}

impl Drop for ErrorCapture<'_> {
    fn drop(&mut self) {
        unsafe {
            xmlSetStructuredErrorFunc(ptr::null_mut(), None);
        }
    }
}

/// Convert a filesystem path into the `file:` URL libxml2 resolves relative
/// references against
///
/// Relative paths are made absolute first. Characters with a meaning in URIs
/// (`%`, `#`, `?`, spaces) are percent-encoded so they stay part of the path.
pub fn path_to_url(path: &Path) -> LibXml2Result<String> {
    let unusable = || LibXml2Error::UnusablePath {
        path: path.to_path_buf(),
    };
    let absolute = std::path::absolute(path).map_err(|_| unusable())?;
    Url::from_file_path(&absolute)
        .map(String::from)
        .map_err(|_| unusable())
}

/// Filesystem path named by a base URL, or the URL itself when it is not a
/// `file:` URL
pub fn url_to_path(url: &str) -> PathBuf {
    Url::parse(url)
        .ok()
        .filter(|parsed| parsed.scheme() == "file")
        .and_then(|parsed| parsed.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(url))
}

/// Owned libxml2 document tree
///
/// The document keeps the base URL it was parsed with; relative references
/// inside it (such as schema includes) resolve against that URL.
#[derive(Debug)]
pub struct XmlDocument {
    ptr: *mut XmlDoc,
    base_url: String,
}

impl XmlDocument {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn as_ptr(&self) -> *mut XmlDoc {
        self.ptr
    }

    /// Values of `attribute` on every element named `local_name` in `namespace`,
    /// in document order. Elements without the attribute are skipped.
    pub fn attribute_values(
        &self,
        namespace: &str,
        local_name: &str,
        attribute: &str,
    ) -> LibXml2Result<Vec<String>> {
        let c_attribute = c_string_from(attribute)?;
        let selection = self.select_elements(namespace, local_name)?;

        Ok(selection
            .nodes()
            .iter()
            .filter_map(|&node| unsafe { node_attribute(node, &c_attribute) })
            .collect())
    }

    /// Rewrite `attribute` on every element named `local_name` in `namespace`
    ///
    /// `rewrite` receives the current value and returns the replacement, or
    /// `None` to leave the element untouched. Returns `(old, new)` for every
    /// change made.
    pub fn rewrite_attributes<F>(
        &mut self,
        namespace: &str,
        local_name: &str,
        attribute: &str,
        mut rewrite: F,
    ) -> LibXml2Result<Vec<(String, String)>>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let c_attribute = c_string_from(attribute)?;
        let selection = self.select_elements(namespace, local_name)?;
        let mut changes = Vec::new();

        for &node in selection.nodes() {
            let Some(current) = (unsafe { node_attribute(node, &c_attribute) }) else {
                continue;
            };
            let Some(replacement) = rewrite(&current) else {
                continue;
            };

            let c_value = c_string_from(&replacement)?;
            let attr = unsafe {
                xmlSetProp(
                    node,
                    c_attribute.as_ptr() as *const XmlChar,
                    c_value.as_ptr() as *const XmlChar,
                )
            };
            if attr.is_null() {
                return Err(LibXml2Error::AttributeUpdateFailed {
                    attribute: attribute.to_string(),
                });
            }
            changes.push((current, replacement));
        }

        Ok(changes)
    }

    fn select_elements(&self, namespace: &str, local_name: &str) -> LibXml2Result<XPathSelection> {
        let expression = format!(
            "//{}:{}",
            XPATH_PREFIX.to_string_lossy(),
            local_name
        );
        let c_expression = c_string_from(&expression)?;
        let c_namespace = c_string_from(namespace)?;
        let xpath_failed = || LibXml2Error::XPathFailed {
            expression: expression.clone(),
        };

        unsafe {
            let context = xmlXPathNewContext(self.ptr);
            if context.is_null() {
                return Err(xpath_failed());
            }
            // Owns the context from here on so every early return frees it
            let mut selection = XPathSelection {
                context,
                object: ptr::null_mut(),
            };

            if xmlXPathRegisterNs(
                context,
                XPATH_PREFIX.as_ptr() as *const XmlChar,
                c_namespace.as_ptr() as *const XmlChar,
            ) != 0
            {
                return Err(xpath_failed());
            }

            selection.object = xmlXPathEval(c_expression.as_ptr() as *const XmlChar, context);
            if selection.object.is_null() {
                return Err(xpath_failed());
            }

            Ok(selection)
        }
    }
}

impl Drop for XmlDocument {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                xmlFreeDoc(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Result of an XPath query together with the context it was evaluated in
struct XPathSelection {
    context: *mut XmlXPathContext,
    object: *mut XmlXPathObject,
}

impl XPathSelection {
    fn nodes(&self) -> &[*mut XmlNode] {
        unsafe {
            if self.object.is_null() {
                return &[];
            }
            let node_set = (*self.object).nodesetval;
            if node_set.is_null() || (*node_set).node_tab.is_null() || (*node_set).node_nr <= 0 {
                return &[];
            }
            std::slice::from_raw_parts((*node_set).node_tab, (*node_set).node_nr as usize)
        }
    }
}

impl Drop for XPathSelection {
    fn drop(&mut self) {
        unsafe {
            if !self.object.is_null() {
                xmlXPathFreeObject(self.object);
            }
            if !self.context.is_null() {
                xmlXPathFreeContext(self.context);
            }
        }
    }
}

/// Read an attribute value, copying it out of libxml2-owned memory
///
/// # Safety
///
/// `node` must be a live element node of a live document.
unsafe fn node_attribute(node: *const XmlNode, name: &CStr) -> Option<String> {
    let value = unsafe { xmlGetProp(node, name.as_ptr() as *const XmlChar) };
    if value.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(value as *const c_char) }
        .to_string_lossy()
        .into_owned();
    unsafe {
        xmlFree(value as *mut c_void);
    }
    Some(text)
}

/// Compiled libxml2 schema
///
/// The schema keeps the tree it was compiled from alive for as long as it
/// exists; libxml2 schema components may point into that tree.
#[derive(Debug)]
pub struct XmlSchemaPtr {
    ptr: *mut XmlSchema,
    warnings: Vec<Diagnostic>,
    _source: XmlDocument,
}

impl XmlSchemaPtr {
    /// Get the raw pointer for FFI calls
    pub(crate) fn as_ptr(&self) -> *const XmlSchema {
        self.ptr
    }

    /// Non-fatal diagnostics reported while compiling
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }
}

impl Drop for XmlSchemaPtr {
    fn drop(&mut self) {
        // Runs before `_source` is dropped, so the tree outlives the schema
        if !self.ptr.is_null() {
            unsafe {
                xmlSchemaFree(self.ptr);
            }
            self.ptr = ptr::null_mut();
        }
    }
}

/// Validation result from libxml2
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    /// Validation succeeded (return code 0)
    Valid,
    /// Validation failed with errors (return code > 0)
    Invalid {
        error_count: i32,
        errors: Vec<Diagnostic>,
    },
    /// Internal error occurred (return code < 0)
    InternalError { code: i32, errors: Vec<Diagnostic> },
}

impl ValidationResult {
    /// Create ValidationResult from libxml2 return code and captured errors
    pub fn from_code(code: c_int, errors: Vec<Diagnostic>) -> Self {
        match code {
            0 => ValidationResult::Valid,
            n if n > 0 => ValidationResult::Invalid {
                error_count: n,
                errors,
            },
            n => ValidationResult::InternalError { code: n, errors },
        }
    }
}

/// Safe access to libxml2 parsing, schema compilation and validation
pub struct LibXml2Wrapper {
    _phantom: PhantomData<()>,
}

impl LibXml2Wrapper {
    /// Create a new LibXML2 wrapper instance
    ///
    /// Initializes the libxml2 parser on first use. Safe to call repeatedly.
    pub fn new() -> Self {
        LIBXML2_INIT.call_once(|| unsafe {
            xmlInitParser();
            xmlInitGlobals();
        });

        LibXml2Wrapper {
            _phantom: PhantomData,
        }
    }

    /// Parse a document from memory
    ///
    /// `base_url` becomes the document URL used to resolve relative
    /// references and appears in diagnostics. With `strip_blanks` set,
    /// whitespace-only text nodes are dropped from the tree.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::DocumentParseFailed` carrying the parser
    /// diagnostics when the content is not well-formed XML.
    pub fn parse_document(
        &self,
        content: &[u8],
        base_url: &str,
        strip_blanks: bool,
    ) -> LibXml2Result<XmlDocument> {
        let size = c_int::try_from(content.len()).map_err(|_| LibXml2Error::DocumentTooLarge {
            size: content.len(),
        })?;
        let c_url = c_string_from(base_url)?;
        let options = if strip_blanks { XML_PARSE_NOBLANKS } else { 0 };

        let mut diagnostics = Vec::new();
        let doc = {
            let _capture = ErrorCapture::install(&mut diagnostics);
            unsafe {
                xmlReadMemory(
                    content.as_ptr() as *const c_char,
                    size,
                    c_url.as_ptr(),
                    ptr::null(),
                    options,
                )
            }
        };

        if doc.is_null() {
            return Err(LibXml2Error::DocumentParseFailed { diagnostics });
        }

        Ok(XmlDocument {
            ptr: doc,
            base_url: base_url.to_string(),
        })
    }

    /// Compile a schema from a parsed schema document
    ///
    /// Includes and imports still present in the tree are loaded relative to
    /// the document's base URL.
    ///
    /// # Errors
    ///
    /// Returns `LibXml2Error::SchemaParseFailed` with the compiler diagnostics
    /// if the schema is rejected.
    pub fn compile_schema(&self, document: XmlDocument) -> LibXml2Result<XmlSchemaPtr> {
        let mut diagnostics = Vec::new();
        let mut loader_diagnostics = Vec::new();

        let schema_ptr = unsafe {
            let parser_ctxt = xmlSchemaNewDocParserCtxt(document.as_ptr());
            if parser_ctxt.is_null() {
                return Err(LibXml2Error::ParserContextFailed);
            }

            xmlSchemaSetParserStructuredErrors(
                parser_ctxt,
                Some(structured_error_callback),
                &mut diagnostics as *mut Vec<Diagnostic> as *mut c_void,
            );

            // Failures loading included documents surface on the thread handler
            let schema_ptr = {
                let _capture = ErrorCapture::install(&mut loader_diagnostics);
                xmlSchemaParse(parser_ctxt)
            };

            xmlSchemaFreeParserCtxt(parser_ctxt);
            schema_ptr
        };

        loader_diagnostics.append(&mut diagnostics);

        if schema_ptr.is_null() {
            return Err(LibXml2Error::SchemaParseFailed {
                diagnostics: loader_diagnostics,
            });
        }

        Ok(XmlSchemaPtr {
            ptr: schema_ptr,
            warnings: loader_diagnostics,
            _source: document,
        })
    }

    /// Validate a parsed document against a compiled schema
    ///
    /// Neither the schema nor the document is modified.
    pub fn validate_document(
        &self,
        schema: &XmlSchemaPtr,
        document: &XmlDocument,
    ) -> LibXml2Result<ValidationResult> {
        let mut errors = Vec::new();

        let result_code = unsafe {
            let valid_ctxt = xmlSchemaNewValidCtxt(schema.as_ptr());
            if valid_ctxt.is_null() {
                return Err(LibXml2Error::ValidationContextCreationFailed);
            }

            xmlSchemaSetValidStructuredErrors(
                valid_ctxt,
                Some(structured_error_callback),
                &mut errors as *mut Vec<Diagnostic> as *mut c_void,
            );

            let result_code = xmlSchemaValidateDoc(valid_ctxt, document.as_ptr());

            xmlSchemaFreeValidCtxt(valid_ctxt);
            result_code
        };

        Ok(ValidationResult::from_code(result_code, errors))
    }
}

impl Default for LibXml2Wrapper {
    fn default() -> Self {
        Self::new()
    }
}
