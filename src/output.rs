/// Result rendering for the command-line front end

use crate::config::OutputFormat;
use crate::core::{Dataset, QueryResult};
use comfy_table::{Cell, Table, presets::UTF8_FULL};

pub fn render(result: &Dataset, format: OutputFormat) -> QueryResult<String> {
    match format {
        OutputFormat::Table => Ok(render_table(result)),
        OutputFormat::Json => Ok(format!("{}\n", result.to_json_pretty()?)),
    }
}

/// Union of field names across all rows, in first-seen order.
fn columns(result: &Dataset) -> Vec<&str> {
    let mut columns: Vec<&str> = Vec::new();
    for record in result {
        for name in record.field_names() {
            if !columns.contains(&name) {
                columns.push(name);
            }
        }
    }
    columns
}

fn render_table(result: &Dataset) -> String {
    if result.is_empty() {
        return "(0 rows)\n".to_string();
    }

    let columns = columns(result);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(columns.iter().map(Cell::new));

    for record in result {
        // a row lacking a column shows an empty cell, not NULL
        table.add_row(columns.iter().map(|name| {
            record
                .get(name)
                .map_or_else(|| Cell::new(""), |value| Cell::new(value))
        }));
    }

    format!("{}\n({} rows)\n", table, result.len())
}
