//! Error types for package mutation

use std::path::PathBuf;
use thiserror::Error;

/// Result type for package mutation operations
pub type StampResult<T> = std::result::Result<T, StampError>;

/// Errors that can occur while mutating a template package.
///
/// Field resolution gaps are deliberately absent: a formula that matches no
/// field is resolved to an empty literal and counted, never raised.
#[derive(Debug, Error)]
pub enum StampError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIP error
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Template file missing; raised before any extraction happens
    #[error("Template not found: {0}")]
    TemplateNotFound(PathBuf),

    /// Archive malformed or structurally unusable
    #[error("Invalid template package: {0}")]
    InvalidPackage(String),

    /// A part the pipeline requires is absent from the package
    #[error("Missing required part: {0}")]
    MissingPart(String),

    /// Part content that should parse did not
    #[error("Parse error: {0}")]
    Parse(String),

    /// Core error
    #[error("Core error: {0}")]
    Core(#[from] docstamp_core::Error),
}
