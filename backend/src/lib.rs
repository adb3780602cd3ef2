//! # Multiship - seller order sheets to Domeme multi-destination address books
//!
//! Multiship reads a marketplace order export (xlsx, xls or CSV), maps its
//! columns onto the fixed 13-column "도매매 복수배송지주소록" template and
//! writes one workbook per product, bundled into a zip archive.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Order sheet │────▶│   Parser    │────▶│  Transform  │────▶│   Writer    │
//! │ (xlsx/csv)  │     │ (auto-fmt)  │     │ (map+group) │     │ (xlsx, zip) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use multiship::{convert_file, Template};
//!
//! let template = Template::default();
//! let result = convert_file("orders.xlsx".as_ref(), &template)?;
//! println!("{} address books", result.units.len());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Compiled-in target template
//! - [`models`] - Tables, cells and mapping results
//! - [`parser`] - Spreadsheet reading with format auto-detection
//! - [`transform`] - Column resolution, row building, grouping, pipeline
//! - [`writer`] - Workbook and archive serialization
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Reading
pub mod parser;

// Conversion
pub mod transform;

// Output
pub mod writer;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{FieldAliases, Template};

pub use error::{ConvertError, ReadError, ServerError, WriteError};

pub use models::{Cell, Column, MatchMethod, OutputGroup, OutputUnit, Resolution, ResolvedMapping, Table};

pub use parser::{parse_bytes_auto, parse_file_auto, ParseResult, SourceFormat};

pub use transform::{
    convert_bytes, convert_file, plan, preview_bytes, preview_file, resolve, resolve_all, similarity, transform,
    ConversionPlan, ConversionPreview, ConversionResult, ConvertOptions, MappingEntry, SourceInfo, UnitSummary,
};

pub use writer::{bundle, package, write_workbook};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
