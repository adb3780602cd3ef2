//! Split output rows by product name.
//!
//! The product name is read from the *source* table; output rows are tied to
//! it purely by row index.
//!
//! ```text
//! Source (product column)       Output rows            Groups
//! ┌──────────────┐              ┌──────────┐           ┌───────────────┐
//! │ 0: 사과 5kg   │              │ 0: 번호 1 │   →       │ 사과 5kg: 0, 2 │
//! │ 1: 배 3kg     │              │ 1: 번호 2 │           ├───────────────┤
//! │ 2: 사과 5kg   │              │ 2: 번호 3 │           │ 배 3kg: 1      │
//! └──────────────┘              └──────────┘           └───────────────┘
//! ```

use std::collections::HashMap;

use crate::config::Template;
use crate::error::{ConvertError, ConvertResult};
use crate::models::{OutputGroup, Table};

/// First source column whose name contains any product-name candidate
/// (case-sensitive).
pub fn find_group_column<'t>(template: &Template, source: &'t Table) -> ConvertResult<&'t str> {
    source
        .columns()
        .iter()
        .map(|c| c.name.as_str())
        .find(|name| template.group_candidates.iter().any(|k| name.contains(k.as_str())))
        .ok_or_else(|| ConvertError::MissingGroupColumn {
            candidates: template.group_candidates.clone(),
        })
}

/// String form of the group key of every source row.
pub fn group_keys(source: &Table, column: &str) -> Vec<String> {
    source
        .column(column)
        .map(|c| c.cells.iter().map(ToString::to_string).collect())
        .unwrap_or_else(|| vec![String::new(); source.row_count()])
}

/// Partition row indices by key.
///
/// Groups come out in first-appearance order, rows keep their original order
/// inside each group, and every row lands in exactly one group.
pub fn partition(keys: &[String]) -> Vec<OutputGroup> {
    let mut groups: Vec<OutputGroup> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (row, key) in keys.iter().enumerate() {
        let slot = *index.entry(key.as_str()).or_insert_with(|| {
            groups.push(OutputGroup { key: key.clone(), rows: Vec::new() });
            groups.len() - 1
        });
        groups[slot].rows.push(row);
    }

    groups
}

/// File-system safe unit name: path separators become underscores.
pub fn unit_name(key: &str) -> String {
    key.replace(['/', '\\'], "_")
}
