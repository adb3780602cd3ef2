//! Output serialization: one `.xlsx` per group, bundled into a zip archive.
//!
//! Every workbook has the same layout:
//!
//! | Row | Content                                   |
//! |-----|-------------------------------------------|
//! | 1   | title (first cell only)                   |
//! | 2   | usage notes (first cell only)             |
//! | 3   | template column names                     |
//! | 4.. | data rows of the group, template order    |

use rust_xlsxwriter::{Format, Workbook, Worksheet};
use std::collections::HashSet;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::Template;
use crate::error::WriteResult;
use crate::models::{Cell, OutputGroup, OutputUnit, Table};
use crate::transform::grouper::unit_name;

const SHEET_NAME: &str = "Sheet1";
const DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";
const EXTENSION: &str = "xlsx";

/// First data row (0-based), right below the three header rows.
pub const DATA_START_ROW: u32 = 3;

/// Serialize the selected output rows into an `.xlsx` workbook.
pub fn write_workbook(output: &Table, rows: &[usize], template: &Template) -> WriteResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let date_format = Format::new().set_num_format(DATE_FORMAT);

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (r, header) in template.header_rows().iter().enumerate() {
            for (c, value) in header.iter().enumerate() {
                if !value.is_empty() {
                    sheet.write_string(r as u32, c as u16, value.as_str())?;
                }
            }
        }

        for (offset, &row) in rows.iter().enumerate() {
            let r = DATA_START_ROW + offset as u32;
            for (c, column) in output.columns().iter().enumerate() {
                if let Some(cell) = column.cells.get(row) {
                    write_cell(sheet, r, c as u16, cell, &date_format)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_cell(sheet: &mut Worksheet, row: u32, col: u16, cell: &Cell, date_format: &Format) -> WriteResult<()> {
    match cell {
        Cell::Empty => {}
        Cell::Text(s) if s.is_empty() => {}
        Cell::Text(s) => {
            sheet.write_string(row, col, s.as_str())?;
        }
        Cell::Int(i) => {
            sheet.write_number(row, col, *i as f64)?;
        }
        Cell::Float(v) => {
            sheet.write_number(row, col, *v)?;
        }
        Cell::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        Cell::DateTime(serial) => {
            sheet.write_number_with_format(row, col, *serial, date_format)?;
        }
    }
    Ok(())
}

/// Archive entry names for `groups`. Names come from [`unit_name`]; names
/// that collide after sanitizing get a ` (2)`, ` (3)`, ... suffix.
pub fn entry_names(groups: &[OutputGroup]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();

    groups
        .iter()
        .map(|group| {
            let base = unit_name(&group.key);
            let mut name = format!("{}.{}", base, EXTENSION);
            let mut n = 1;
            while taken.contains(&name) {
                n += 1;
                name = format!("{} ({}).{}", base, n, EXTENSION);
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

/// Serialize every group into its own workbook.
pub fn package(output: &Table, groups: &[OutputGroup], template: &Template) -> WriteResult<Vec<OutputUnit>> {
    groups
        .iter()
        .zip(entry_names(groups))
        .map(|(group, name)| {
            Ok(OutputUnit {
                name,
                rows: group.rows.len(),
                bytes: write_workbook(output, &group.rows, template)?,
            })
        })
        .collect()
}

/// Bundle units into a deflate-compressed zip archive, in order.
pub fn bundle(units: &[OutputUnit]) -> WriteResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for unit in units {
        zip.start_file(unit.name.as_str(), options)?;
        zip.write_all(&unit.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
    use std::io::Read;
    use zip::ZipArchive;

    fn read_sheet(bytes: &[u8]) -> Range<Data> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes.to_vec())).unwrap();
        workbook.worksheet_range_at(0).unwrap().unwrap()
    }

    fn output() -> Table {
        let template = Template::default();
        let mut table = Table::with_rows(2);
        for (i, field) in template.schema.iter().enumerate() {
            let cells = match i {
                0 => vec![Cell::Int(1), Cell::Int(2)],
                1 => vec![Cell::text("홍길동"), Cell::text("김철수")],
                12 => vec![Cell::Float(2.0), Cell::Empty],
                _ => vec![Cell::text(""), Cell::text("")],
            };
            table.push_column(crate::models::Column::new(field.as_str(), cells));
        }
        table
    }

    fn header_block(range: &Range<Data>) -> Vec<Vec<Data>> {
        range.rows().take(3).map(|r| r.to_vec()).collect()
    }

    #[test]
    fn test_workbook_layout() {
        let template = Template::default();
        let bytes = write_workbook(&output(), &[1], &template).unwrap();
        let range = read_sheet(&bytes);

        assert_eq!(range.get_value((0, 0)), Some(&Data::String(template.title.clone())));
        match range.get_value((1, 0)) {
            Some(Data::String(notes)) => assert!(notes.contains("기재 시 유의사항")),
            other => panic!("unexpected notes cell: {:?}", other),
        }
        for (c, field) in template.schema.iter().enumerate() {
            assert_eq!(range.get_value((2, c as u32)), Some(&Data::String(field.clone())));
        }

        // only row index 1 is written, starting at row 4
        assert_eq!(range.get_value((3, 0)), Some(&Data::Float(2.0)));
        assert_eq!(range.get_value((3, 1)), Some(&Data::String("김철수".into())));
        assert_eq!(range.height(), 4);
    }

    #[test]
    fn test_header_block_identical_across_groups() {
        let template = Template::default();
        let first = read_sheet(&write_workbook(&output(), &[0], &template).unwrap());
        let second = read_sheet(&write_workbook(&output(), &[1], &template).unwrap());
        let empty = read_sheet(&write_workbook(&output(), &[], &template).unwrap());

        assert_eq!(header_block(&first), header_block(&second));
        assert_eq!(header_block(&first), header_block(&empty));
    }

    #[test]
    fn test_package_disambiguates_names() {
        let template = Template::default();
        let groups = vec![
            OutputGroup { key: "a/b".into(), rows: vec![0] },
            OutputGroup { key: "a_b".into(), rows: vec![1] },
        ];
        let units = package(&output(), &groups, &template).unwrap();
        assert_eq!(units[0].name, "a_b.xlsx");
        assert_eq!(units[1].name, "a_b (2).xlsx");
        assert_eq!(units[1].rows, 1);
    }

    #[test]
    fn test_bundle_entries_are_deflated() {
        let template = Template::default();
        let groups = vec![
            OutputGroup { key: "사과".into(), rows: vec![0] },
            OutputGroup { key: "배".into(), rows: vec![1] },
        ];
        let units = package(&output(), &groups, &template).unwrap();
        let archive = bundle(&units).unwrap();

        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 2);
        let mut entry = zip.by_index(0).unwrap();
        assert_eq!(entry.name(), "사과.xlsx");
        assert_eq!(entry.compression(), CompressionMethod::Deflated);
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes).unwrap();
        assert_eq!(bytes, units[0].bytes);
    }

    #[test]
    fn test_empty_bundle_is_valid_zip() {
        let archive = bundle(&[]).unwrap();
        let zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        assert_eq!(zip.len(), 0);
    }
}
