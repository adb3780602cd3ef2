//! Source spreadsheet reader.
//!
//! Turns uploaded bytes into a [`Table`]: first sheet only, first row as
//! headers, every following non-blank row as data.
//!
//! - `.xlsx` / `.xls` (and whatever else calamine opens) are detected from
//!   their container magic bytes.
//! - Anything else is read as CSV, with encoding and delimiter auto-detection.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use crate::error::{ReadError, ReadResult};
use crate::models::{Cell, Table};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const CFB_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Container family of an uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Zip container (xlsx, xlsb, ods)
    OpenXml,
    /// Compound file (legacy xls)
    Legacy,
    /// Delimited text
    Csv,
}

impl SourceFormat {
    pub fn label(&self) -> &'static str {
        match self {
            SourceFormat::OpenXml => "xlsx",
            SourceFormat::Legacy => "xls",
            SourceFormat::Csv => "csv",
        }
    }
}

/// Result of reading with metadata
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Parsed table
    pub table: Table,
    /// Detected container family
    pub format: SourceFormat,
    /// Worksheet that was read (workbooks only)
    pub sheet: Option<String>,
    /// Detected encoding (CSV only)
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only)
    pub delimiter: Option<char>,
}

/// Guess the container family from the leading bytes.
pub fn detect_format(bytes: &[u8]) -> SourceFormat {
    if bytes.starts_with(ZIP_MAGIC) {
        SourceFormat::OpenXml
    } else if bytes.starts_with(CFB_MAGIC) {
        SourceFormat::Legacy
    } else {
        SourceFormat::Csv
    }
}

/// Read a file from disk with auto-detection.
pub fn parse_file_auto<P: AsRef<Path>>(path: P) -> ReadResult<ParseResult> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes_auto(&bytes)
}

/// Read uploaded bytes with auto-detection.
pub fn parse_bytes_auto(bytes: &[u8]) -> ReadResult<ParseResult> {
    if bytes.is_empty() {
        return Err(ReadError::EmptyFile);
    }
    match detect_format(bytes) {
        SourceFormat::Csv => parse_csv_bytes(bytes),
        format => parse_workbook_bytes(bytes, format),
    }
}

// =============================================================================
// Workbooks
// =============================================================================

/// Read the first worksheet of an xlsx/xls workbook.
pub fn parse_workbook_bytes(bytes: &[u8], format: SourceFormat) -> ReadResult<ParseResult> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let sheet = workbook.sheet_names().first().cloned();
    let range = workbook.worksheet_range_at(0).ok_or(ReadError::NoSheet)??;

    let mut rows = range.rows().map(|row| row.iter().map(data_to_cell).collect::<Vec<_>>());
    let header = rows.next().ok_or(ReadError::EmptyFile)?;
    let headers = normalize_headers(header.iter().map(Cell::to_string).collect());
    let data: Vec<Vec<Cell>> = rows.filter(|row| !is_blank_row(row)).collect();

    Ok(ParseResult {
        table: Table::from_rows(headers, data),
        format,
        sheet,
        encoding: None,
        delimiter: None,
    })
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::DateTime(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes. Valid UTF-8 wins, otherwise chardet decides.
pub fn detect_encoding(bytes: &[u8]) -> String {
    if std::str::from_utf8(bytes).is_ok() {
        return "utf-8".to_string();
    }

    let charset = chardet::detect(bytes).0;

    // Normalize charset names to labels encoding_rs understands
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "cp949" | "uhc" | "euc-kr" | "iso-2022-kr" => "euc-kr".to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "" => "utf-8".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes to string using the specified encoding label.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ReadResult<String> {
    let encoding = encoding_rs::Encoding::for_label(encoding.as_bytes())
        .ok_or_else(|| ReadError::Encoding(format!("unknown encoding '{}'", encoding)))?;
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors && encoding == encoding_rs::UTF_8 {
        return Err(ReadError::Encoding("invalid UTF-8 sequence".to_string()));
    }
    Ok(text.into_owned())
}

/// Detect the delimiter by counting occurrences in the first line
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Read CSV bytes with encoding and delimiter auto-detection.
pub fn parse_csv_bytes(bytes: &[u8]) -> ReadResult<ParseResult> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    let table = parse_csv_str(&content, delimiter)?;

    Ok(ParseResult {
        table,
        format: SourceFormat::Csv,
        sheet: None,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

/// Read CSV text with an explicit delimiter. Values stay text; empty fields
/// become [`Cell::Empty`].
pub fn parse_csv_str(content: &str, delimiter: char) -> ReadResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    let mut records = reader.records();
    let header = records.next().ok_or(ReadError::EmptyFile)??;
    let headers = normalize_headers(header.iter().map(String::from).collect());

    let mut rows = Vec::new();
    for record in records {
        let row: Vec<Cell> = record?
            .iter()
            .map(|v| if v.is_empty() { Cell::Empty } else { Cell::text(v) })
            .collect();
        if !is_blank_row(&row) {
            rows.push(row);
        }
    }

    Ok(Table::from_rows(headers, rows))
}

// =============================================================================
// Helpers
// =============================================================================

/// Make header names usable as unique keys: blank headers become
/// `Unnamed: {index}`, repeats get `.1`, `.2`, ... suffixes.
pub fn normalize_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(raw.len());

    for (index, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name
        };

        let mut candidate = base.clone();
        while let Some(count) = seen.get_mut(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", base, count);
        }
        seen.insert(candidate.clone(), 0);
        headers.push(candidate);
    }

    headers
}

fn is_blank_row(row: &[Cell]) -> bool {
    row.iter().all(|c| matches!(c, Cell::Empty))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let table = parse_csv_str("이름,주소\n홍길동,서울\n김철수,부산", ',').unwrap();

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column_names(), vec!["이름", "주소"]);
        assert_eq!(table.column("주소").unwrap().cells[1], Cell::text("부산"));
    }

    #[test]
    fn test_values_are_not_coerced() {
        let table = parse_csv_str("전화번호,수량\n01012345678,  2 ", ',').unwrap();
        assert_eq!(table.column("전화번호").unwrap().cells[0], Cell::text("01012345678"));
        assert_eq!(table.column("수량").unwrap().cells[0], Cell::text("  2 "));
    }

    #[test]
    fn test_quoted_values() {
        let table = parse_csv_str("name;value\n\"Alice\";\"a;b\"", ';').unwrap();
        assert_eq!(table.column("value").unwrap().cells[0], Cell::text("a;b"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let table = parse_csv_str("a,b\n1,2\n,\n3,4\n", ',').unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_whitespace_rows_are_kept() {
        // only rows with no value at all are dropped
        let table = parse_csv_str("a,b\n , \n1,2\n", ',').unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.column("a").unwrap().cells[0], Cell::text(" "));
    }

    #[test]
    fn test_legacy_xls_workbook() {
        let bytes = include_bytes!("../../tests/fixtures/orders.xls");
        assert_eq!(detect_format(bytes), SourceFormat::Legacy);

        let result = parse_bytes_auto(bytes).unwrap();
        assert_eq!(result.format, SourceFormat::Legacy);
        assert_eq!(result.sheet.as_deref(), Some("Orders"));
        assert_eq!(result.table.column_names(), vec!["상품명", "수취인", "전화번호", "수량"]);
        assert_eq!(result.table.row_count(), 2);
        assert_eq!(result.table.column("수취인").unwrap().cells[1], Cell::text("김철수"));
        assert_eq!(result.table.column("전화번호").unwrap().cells[0], Cell::text("01012345678"));
        assert_eq!(result.table.column("수량").unwrap().cells, vec![Cell::Float(3.0), Cell::Float(1.0)]);
    }

    #[test]
    fn test_missing_values_padded() {
        let table = parse_csv_str("a,b,c\n1", ',').unwrap();
        assert_eq!(table.column("c").unwrap().cells[0], Cell::Empty);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(matches!(parse_csv_str("", ','), Err(ReadError::EmptyFile)));
        assert!(matches!(parse_bytes_auto(b""), Err(ReadError::EmptyFile)));
    }

    #[test]
    fn test_header_only_is_empty_table() {
        let table = parse_csv_str("a,b\n", ',').unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns().len(), 2);
    }

    #[test]
    fn test_normalize_headers() {
        let headers = normalize_headers(vec![
            "상품명".into(),
            "".into(),
            "상품명".into(),
            "상품명".into(),
        ]);
        assert_eq!(headers, vec!["상품명", "Unnamed: 1", "상품명.1", "상품명.2"]);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(b"PK\x03\x04rest"), SourceFormat::OpenXml);
        assert_eq!(detect_format(CFB_MAGIC), SourceFormat::Legacy);
        assert_eq!(detect_format("a,b".as_bytes()), SourceFormat::Csv);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
        assert_eq!(detect_delimiter("abc"), ',');
    }

    #[test]
    fn test_euc_kr_decoding() {
        let (encoded, _, _) = encoding_rs::EUC_KR.encode("수취인,주소\n홍길동,서울특별시 강남구\n");
        assert!(std::str::from_utf8(&encoded).is_err());

        let content = decode_content(&encoded, "euc-kr").unwrap();
        let table = parse_csv_str(&content, ',').unwrap();
        assert_eq!(table.column_names(), vec!["수취인", "주소"]);
        assert_eq!(table.column("주소").unwrap().cells[0], Cell::text("서울특별시 강남구"));
    }

    #[test]
    fn test_utf8_detected_without_chardet() {
        assert_eq!(detect_encoding("수취인,주소".as_bytes()), "utf-8");
    }

    #[test]
    fn test_unknown_encoding_label() {
        assert!(matches!(decode_content(b"abc", "klingon"), Err(ReadError::Encoding(_))));
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let result = parse_csv_bytes("\u{feff}a,b\n1,2".as_bytes()).unwrap();
        assert_eq!(result.table.column_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_garbage_workbook_is_read_error() {
        let result = parse_bytes_auto(b"PK\x03\x04not really a zip");
        assert!(matches!(result, Err(ReadError::Workbook(_))));
    }
}
