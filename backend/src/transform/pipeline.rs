//! High-level pipeline API: uploaded spreadsheet → zip of address books.
//!
//! Steps, run once per upload:
//! 1. Read the first sheet (auto-detected format)
//! 2. Locate the product-name column (fatal if missing)
//! 3. Resolve target columns against the source headers
//! 4. Build the output table
//! 5. Split rows by product name
//! 6. Serialize one workbook per product and bundle them
//!
//! # Example
//!
//! ```rust,ignore
//! use multiship::{convert_file, Template};
//! use std::path::Path;
//!
//! let template = Template::default();
//! let result = convert_file(Path::new("orders.xlsx"), &template)?;
//! std::fs::write(&template.archive_name, &result.archive)?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::Template;
use crate::error::ConvertResult;
use crate::models::{Cell, MatchMethod, OutputGroup, Resolution, ResolvedMapping, Table};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};
use crate::writer::{bundle, entry_names, package};

use super::grouper::{find_group_column, group_keys, partition};
use super::resolver::resolve_all;
use super::rows::transform;

/// Options for previews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Number of converted rows included in previews
    pub preview_rows: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { preview_rows: 5 }
    }
}

/// Source file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub format: String,
    pub sheet: Option<String>,
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl SourceInfo {
    fn from_parse(parse: &ParseResult) -> Self {
        Self {
            format: parse.format.label().to_string(),
            sheet: parse.sheet.clone(),
            encoding: parse.encoding.clone(),
            delimiter: parse.delimiter,
            headers: parse.table.column_names().into_iter().map(String::from).collect(),
            row_count: parse.table.row_count(),
        }
    }
}

/// One archive entry
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UnitSummary {
    /// Archive entry name
    pub name: String,
    /// Raw product name
    pub group: String,
    pub rows: usize,
}

impl UnitSummary {
    /// Product name for display; rows without one share the `.xlsx` entry.
    pub fn label(&self) -> &str {
        if self.group.trim().is_empty() {
            "(no product name)"
        } else {
            &self.group
        }
    }
}

/// Everything computed before serialization.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub group_column: String,
    pub mapping: ResolvedMapping,
    pub output: Table,
    pub groups: Vec<OutputGroup>,
}

impl ConversionPlan {
    /// Archive entries this plan will produce, in order.
    pub fn units(&self) -> Vec<UnitSummary> {
        self.groups
            .iter()
            .zip(entry_names(&self.groups))
            .map(|(group, name)| UnitSummary {
                name,
                group: group.key.clone(),
                rows: group.rows.len(),
            })
            .collect()
    }
}

/// Result of a complete conversion
#[derive(Debug, Clone)]
pub struct ConversionResult {
    /// Zip archive bytes
    pub archive: Vec<u8>,
    pub units: Vec<UnitSummary>,
    pub mapping: ResolvedMapping,
    pub group_column: String,
    pub source: SourceInfo,
}

/// Preview of a conversion, nothing serialized
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPreview {
    pub source: SourceInfo,
    pub group_column: String,
    pub mapping: Vec<MappingEntry>,
    /// Output column names
    pub columns: Vec<String>,
    /// First converted rows
    pub rows: Vec<Vec<Cell>>,
    pub units: Vec<UnitSummary>,
}

/// One resolved target column, flattened for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub field: String,
    pub resolution: Resolution,
}

/// Convert a file on disk.
pub fn convert_file(path: &Path, template: &Template) -> ConvertResult<ConversionResult> {
    log_info(format!("📖 Reading {}", path.display()));
    let parse = parse_file_auto(path)?;
    convert_parsed(parse, template)
}

/// Convert uploaded bytes.
pub fn convert_bytes(bytes: &[u8], template: &Template) -> ConvertResult<ConversionResult> {
    log_info(format!("📖 Reading upload ({} bytes)", bytes.len()));
    let parse = parse_bytes_auto(bytes)?;
    convert_parsed(parse, template)
}

/// Preview uploaded bytes without serializing anything.
pub fn preview_bytes(bytes: &[u8], template: &Template, options: &ConvertOptions) -> ConvertResult<ConversionPreview> {
    let parse = parse_bytes_auto(bytes)?;
    preview_parsed(parse, template, options)
}

/// Preview a file on disk without serializing anything.
pub fn preview_file(path: &Path, template: &Template, options: &ConvertOptions) -> ConvertResult<ConversionPreview> {
    let parse = parse_file_auto(path)?;
    preview_parsed(parse, template, options)
}

fn convert_parsed(parse: ParseResult, template: &Template) -> ConvertResult<ConversionResult> {
    let source = SourceInfo::from_parse(&parse);
    print_source(&source);

    let plan = plan(&parse.table, template)?;

    log_info("📦 Writing workbooks...");
    let units = package(&plan.output, &plan.groups, template)?;
    let archive = bundle(&units)?;
    log_success(format!("Archive ready: {} file(s), {} bytes", units.len(), archive.len()));

    Ok(ConversionResult {
        archive,
        units: plan.units(),
        mapping: plan.mapping,
        group_column: plan.group_column,
        source,
    })
}

fn preview_parsed(parse: ParseResult, template: &Template, options: &ConvertOptions) -> ConvertResult<ConversionPreview> {
    let source = SourceInfo::from_parse(&parse);
    let plan = plan(&parse.table, template)?;

    let rows = plan
        .output
        .rows()
        .take(options.preview_rows)
        .map(|row| row.into_iter().cloned().collect())
        .collect();

    Ok(ConversionPreview {
        source,
        units: plan.units(),
        columns: template.schema.clone(),
        rows,
        group_column: plan.group_column,
        mapping: plan
            .mapping
            .entries
            .into_iter()
            .map(|(field, resolution)| MappingEntry { field, resolution })
            .collect(),
    })
}

/// Resolve, transform and split a source table.
///
/// Fails before doing any work when no product-name column exists.
pub fn plan(source: &Table, template: &Template) -> ConvertResult<ConversionPlan> {
    let group_column = find_group_column(template, source)?.to_string();
    log_success(format!("Product column: {}", group_column));

    let columns = source.column_names();
    let mapping = resolve_all(template, &columns);
    print_mapping(&mapping);

    let output = transform(source, template, &mapping);
    let groups = partition(&group_keys(source, &group_column));

    if groups.is_empty() {
        log_warning("No data rows, the archive will be empty");
    } else {
        log_success(format!("{} rows split into {} product(s)", output.row_count(), groups.len()));
    }

    Ok(ConversionPlan { group_column, mapping, output, groups })
}

fn print_source(source: &SourceInfo) {
    match (&source.sheet, &source.encoding) {
        (Some(sheet), _) => log_success(format!("Detected {} workbook, sheet '{}'", source.format, sheet)),
        (None, Some(encoding)) => log_success(format!(
            "Detected CSV, encoding {}, separator '{}'",
            encoding,
            source.delimiter.map(format_delimiter).unwrap_or("?")
        )),
        (None, None) => log_success(format!("Detected {}", source.format)),
    }
    log_success(format!("Read {} rows, {} columns", source.row_count, source.headers.len()));
}

fn print_mapping(mapping: &ResolvedMapping) {
    log_info(format!("🗺️  Column mapping ({} of {} resolved):", mapping.resolved_count(), mapping.entries.len()));
    for (field, resolution) in &mapping.entries {
        let line = match resolution {
            Resolution::Resolved { column, method: MatchMethod::Alias } => format!("{} ← {} (alias)", field, column),
            Resolution::Resolved { column, method: MatchMethod::Substring } => format!("{} ← {} (name)", field, column),
            Resolution::Resolved { column, method: MatchMethod::Similarity(score) } => {
                format!("{} ← {} (similarity {:.2})", field, column, score)
            }
            Resolution::Unresolved => format!("{} ← (blank)", field),
        };
        log_info_indent(line, 1);
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}
