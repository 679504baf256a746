//! Record parsers, one per input format
//!
//! Every parser shares one contract: `(bytes, source label) -> ParsedFile`.
//! Dispatch is a lookup on the file extension into the closed `ParserKind`
//! set; nothing here touches the store.

mod free_text;
mod scan_xml;
mod structured;
mod tabular;

use crate::resolve::RawRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use free_text::FREE_TEXT_CONFIDENCE;
pub use scan_xml::SCAN_CONFIDENCE;

/// A whole file could not be parsed; the file is skipped
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed payload: {0}")]
    Malformed(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Raw records produced from one file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFile {
    pub entities: Vec<RawRecord>,
    pub relationships: Vec<RawRecord>,
    /// Elements that could not become raw records (non-object array items,
    /// undecodable rows); counted as rejected, never fatal for the file
    pub malformed: usize,
}

impl ParsedFile {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }
}

/// Closed set of supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParserKind {
    /// JSON documents
    Structured,
    /// CSV with a header row
    Tabular,
    /// Unstructured text scanned for identifiers
    FreeText,
    /// Scan-tool XML (Nmap dialect)
    ScanXml,
}

const EXTENSIONS: &[(&str, ParserKind)] = &[
    ("json", ParserKind::Structured),
    ("csv", ParserKind::Tabular),
    ("txt", ParserKind::FreeText),
    ("xml", ParserKind::ScanXml),
];

impl ParserKind {
    /// Look up the parser for a file extension (case-insensitive, no dot)
    pub fn from_extension(ext: &str) -> Option<Self> {
        EXTENSIONS
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, kind)| *kind)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn parse(&self, bytes: &[u8], source: &str) -> ParseResult<ParsedFile> {
        match self {
            Self::Structured => structured::parse(bytes, source),
            Self::Tabular => tabular::parse(bytes, source),
            Self::FreeText => free_text::parse(bytes, source),
            Self::ScanXml => scan_xml::parse(bytes, source),
        }
    }
}

/// A recognized input file and the tool label it is attributed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: ParserKind,
    /// Name of the directory directly containing the file
    pub source: String,
}

impl SourceFile {
    /// `None` when the extension has no parser
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let kind = ParserKind::from_path(&path)?;
        let source = source_label(&path);
        Some(Self { path, kind, source })
    }

    /// Read and parse the file
    pub fn parse(&self) -> ParseResult<ParsedFile> {
        let bytes = std::fs::read(&self.path)?;
        self.kind.parse(&bytes, &self.source)
    }
}

/// The immediate parent directory name, or `"unknown"` at a filesystem root
pub fn source_label(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
