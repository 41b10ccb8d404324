/// ORDER BY over already projected or aggregated rows

use crate::core::Record;
use crate::parser::{ColumnSpec, SortOrder};
use std::cmp::Ordering;

pub struct Orderer;

impl Orderer {
    /// Stable multi-key sort. Keys are looked up by column text, so `AVG(salary)`
    /// refers to the aggregated column of a grouped row. Rows lacking a key sort as Null.
    pub fn order(mut rows: Vec<Record>, order_by: &[(ColumnSpec, SortOrder)]) -> Vec<Record> {
        if order_by.is_empty() {
            return rows;
        }

        let keys: Vec<(String, SortOrder)> = order_by
            .iter()
            .map(|(column, direction)| (column.to_string(), *direction))
            .collect();

        rows.sort_by(|a, b| Self::compare_rows(a, b, &keys));
        rows
    }

    /// First differing key decides; equal on every key means equal.
    /// Keys use the total order, so `30` and `"30"` differ by kind.
    fn compare_rows(a: &Record, b: &Record, keys: &[(String, SortOrder)]) -> Ordering {
        for (key, direction) in keys {
            let ordering = a.get_or_null(key).sort_cmp(b.get_or_null(key));
            if ordering != Ordering::Equal {
                return match direction {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                };
            }
        }
        Ordering::Equal
    }
}
