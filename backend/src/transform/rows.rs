//! Row transformer: build the output table in template column order.

use crate::config::Template;
use crate::models::{Cell, Column, ResolvedMapping, Table};

/// Build the output table.
///
/// Every template column is filled, in template order:
/// - the row number column gets `1..=N`
/// - the constant column gets the configured value on every row
/// - resolved columns copy the source cells unchanged
/// - unresolved columns are blank text
///
/// Row count and order always match `source`.
pub fn transform(source: &Table, template: &Template, mapping: &ResolvedMapping) -> Table {
    let rows = source.row_count();
    let mut output = Table::with_rows(rows);

    for field in &template.schema {
        let cells = if *field == template.id_field {
            (1..=rows as i64).map(Cell::Int).collect()
        } else if *field == template.constant_field {
            vec![Cell::text(template.constant_value.as_str()); rows]
        } else {
            match mapping.source_for(field).and_then(|name| source.column(name)) {
                Some(column) => column.cells.clone(),
                None => vec![Cell::text(""); rows],
            }
        };
        output.push_column(Column::new(field.as_str(), cells));
    }

    output
}
