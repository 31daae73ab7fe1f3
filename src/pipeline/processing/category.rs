use std::collections::BTreeSet;

use crate::table::{Cell, Table};
use crate::error::Result;

/// Labels present in `cells` that are not in `permitted`. Non-text cells,
/// including nulls, are collected under `None`.
pub fn invalid_categories(cells: &[Cell], permitted: &BTreeSet<String>) -> BTreeSet<Option<String>> {
    cells
        .iter()
        .map(|c| c.as_str().map(str::to_string))
        .filter(|label| match label {
            Some(l) => !permitted.contains(l),
            None => true,
        })
        .collect()
}

/// Mark rows whose label falls in the invalid set. `true` means drop.
pub fn invalid_mask(cells: &[Cell], permitted: &BTreeSet<String>) -> Vec<bool> {
    let invalid = invalid_categories(cells, permitted);
    cells
        .iter()
        .map(|c| invalid.contains(&c.as_str().map(str::to_string)))
        .collect()
}

/// Drop every row whose `column` value is outside `permitted`.
/// Returns the invalid labels that were seen, for reporting.
pub fn filter_categories(
    table: &mut Table,
    column: &str,
    permitted: &BTreeSet<String>,
) -> Result<BTreeSet<Option<String>>> {
    let cells = &table.require_column(column)?.cells;
    let invalid = invalid_categories(cells, permitted);
    let keep: Vec<bool> = invalid_mask(cells, permitted).into_iter().map(|drop| !drop).collect();
    table.retain_rows(&keep);
    Ok(invalid)
}
