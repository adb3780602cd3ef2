//! Error types for the Multiship conversion pipeline.
//!
//! - [`ReadError`] - Reading the uploaded spreadsheet
//! - [`WriteError`] - Serializing output workbooks and the zip archive
//! - [`ConvertError`] - Top-level pipeline errors
//! - [`ServerError`] - HTTP adapter errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Read Errors
// =============================================================================

/// Errors while reading the source spreadsheet.
#[derive(Debug, Error)]
pub enum ReadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook could not be opened or parsed.
    #[error("Cannot open workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook has no worksheet.
    #[error("Workbook has no worksheet")]
    NoSheet,

    /// Empty file, or no header row.
    #[error("File is empty")]
    EmptyFile,

    /// Invalid CSV content.
    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Text could not be decoded.
    #[error("Failed to decode text: {0}")]
    Encoding(String),
}

// =============================================================================
// Write Errors
// =============================================================================

/// Errors while serializing output units.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Workbook serialization failed.
    #[error("Cannot write workbook: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Archive assembly failed.
    #[error("Cannot write archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// This is the error type returned by [`crate::transform::pipeline::convert_bytes`].
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Source spreadsheet could not be read.
    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    /// Output could not be serialized.
    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    /// No source column looks like a product name.
    #[error("No product-name column found (looked for: {})", candidates.join(", "))]
    MissingGroupColumn { candidates: Vec<String> },
}

impl ConvertError {
    /// Whether the failure comes from the uploaded content rather than from us.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ConvertError::Read(_) | ConvertError::MissingGroupColumn { .. })
    }
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for read operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// Result type for write operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Result type for pipeline operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
