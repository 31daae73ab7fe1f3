use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::category::filter_categories;
use crate::pipeline::processing::dates::{normalize_cell, DateGrain};
use crate::pipeline::processing::numeric::parse_count_cell;
use crate::pipeline::processing::weight::{normalize_weight_cell, WeightOutcome};
use crate::pipeline::processing::{MissingPolicy, RejectPolicy, RejectReason};
use crate::pipeline::report::{CleaningReport, RowIssue, StepSummary};
use crate::table::{Cell, Table};

/// One transformation in a table's cleaning plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum CleaningStep {
    /// Remove columns; columns the table lacks are ignored.
    DropColumns { columns: Vec<String> },
    /// Replace exact text values, e.g. a known misspelled code.
    RemapValues {
        column: String,
        mapping: BTreeMap<String, String>,
    },
    /// Remove a fixed erroneous prefix from text values that carry it.
    StripPrefix { column: String, prefix: String },
    /// Drop rows whose value is not a permitted label.
    FilterCategories {
        column: String,
        permitted: BTreeSet<String>,
    },
    NormalizeDate {
        column: String,
        grain: DateGrain,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        on_missing: MissingPolicy,
    },
    /// Strip non-digits from a count column and coerce it to integers.
    ScrubNumeric {
        column: String,
        #[serde(default)]
        on_reject: RejectPolicy,
    },
    /// Convert a free-text weight column to kilograms.
    NormalizeWeight {
        column: String,
        #[serde(default)]
        on_reject: RejectPolicy,
    },
    RebaseIndex { start: i64 },
    /// Promote an integer column to the row index.
    SetIndex { column: String },
}

impl CleaningStep {
    /// Short name used in reports, logs and metric labels.
    pub fn label(&self) -> String {
        match self {
            CleaningStep::DropColumns { .. } => "drop_columns".to_string(),
            CleaningStep::RemapValues { column, .. } => format!("remap_values:{}", column),
            CleaningStep::StripPrefix { column, .. } => format!("strip_prefix:{}", column),
            CleaningStep::FilterCategories { column, .. } => format!("filter_categories:{}", column),
            CleaningStep::NormalizeDate { column, .. } => format!("normalize_date:{}", column),
            CleaningStep::ScrubNumeric { column, .. } => format!("scrub_numeric:{}", column),
            CleaningStep::NormalizeWeight { column, .. } => format!("normalize_weight:{}", column),
            CleaningStep::RebaseIndex { .. } => "rebase_index".to_string(),
            CleaningStep::SetIndex { column } => format!("set_index:{}", column),
        }
    }

    pub fn apply(&self, table: &mut Table, report: &mut CleaningReport) -> Result<()> {
        let label = self.label();
        let mut summary = StepSummary {
            step: label.clone(),
            ..Default::default()
        };

        match self {
            CleaningStep::DropColumns { columns } => {
                for name in columns {
                    if table.drop_column(name).is_none() {
                        debug!(table = table.name(), column = %name, "Column to drop not present");
                    }
                }
            }
            CleaningStep::RemapValues { column, mapping } => {
                for cell in table.require_column_mut(column)?.cells.iter_mut() {
                    if let Some(to) = cell.as_str().and_then(|s| mapping.get(s)) {
                        *cell = Cell::Text(to.clone());
                    }
                }
            }
            CleaningStep::StripPrefix { column, prefix } => {
                for cell in table.require_column_mut(column)?.cells.iter_mut() {
                    if let Cell::Text(s) = cell {
                        if let Some(rest) = s.strip_prefix(prefix.as_str()) {
                            *s = rest.to_string();
                        }
                    }
                }
            }
            CleaningStep::FilterCategories { column, permitted } => {
                let before = table.num_rows();
                let invalid = filter_categories(table, column, permitted)?;
                summary.rows_dropped = before - table.num_rows();
                if !invalid.is_empty() {
                    debug!(
                        table = table.name(),
                        column = %column,
                        invalid = ?invalid,
                        "Dropped rows with invalid categories"
                    );
                }
            }
            CleaningStep::NormalizeDate {
                column,
                grain,
                format,
                on_missing,
            } => {
                let col = table.require_column_mut(column)?;
                let mut missing = Vec::with_capacity(col.len());
                for cell in col.cells.iter_mut() {
                    let value = normalize_cell(cell, *grain, format.as_deref());
                    missing.push(value.is_missing());
                    *cell = value.into_cell();
                }
                summary.values_missing = missing.iter().filter(|m| **m).count();
                if *on_missing == MissingPolicy::Drop {
                    let keep: Vec<bool> = missing.iter().map(|m| !m).collect();
                    summary.rows_dropped = table.retain_rows(&keep);
                }
            }
            CleaningStep::ScrubNumeric { column, on_reject } => {
                let rejected = coerce_column(table, column, |cell| {
                    parse_count_cell(cell).map(Cell::Int)
                })?;
                settle_rejections(table, column, &label, *on_reject, rejected, &mut summary, report);
            }
            CleaningStep::NormalizeWeight { column, on_reject } => {
                let rejected = coerce_column(table, column, |cell| match normalize_weight_cell(cell) {
                    WeightOutcome::Kilograms(kg) => Ok(Cell::Float(kg)),
                    WeightOutcome::Rejected(reason) => Err(reason),
                })?;
                settle_rejections(table, column, &label, *on_reject, rejected, &mut summary, report);
            }
            CleaningStep::RebaseIndex { start } => table.rebase_index(*start),
            CleaningStep::SetIndex { column } => table.set_index_from_column(column)?,
        }

        if summary.rows_dropped > 0 {
            metrics::cleaning::rows_dropped(table.name(), &label, summary.rows_dropped);
        }
        report.rows_out = table.num_rows();
        report.steps.push(summary);
        Ok(())
    }
}

/// Replace each cell with `convert(cell)`; rejected cells become `Missing`.
/// Returns `(position, reason)` for every rejection.
fn coerce_column<F>(table: &mut Table, column: &str, convert: F) -> Result<Vec<(usize, RejectReason)>>
where
    F: Fn(&Cell) -> std::result::Result<Cell, RejectReason>,
{
    let col = table.require_column_mut(column)?;
    let mut rejected = Vec::new();
    for (pos, cell) in col.cells.iter_mut().enumerate() {
        match convert(cell) {
            Ok(value) => *cell = value,
            Err(reason) => {
                rejected.push((pos, reason));
                *cell = Cell::Missing;
            }
        }
    }
    Ok(rejected)
}

fn settle_rejections(
    table: &mut Table,
    column: &str,
    label: &str,
    policy: RejectPolicy,
    rejected: Vec<(usize, RejectReason)>,
    summary: &mut StepSummary,
    report: &mut CleaningReport,
) {
    if rejected.is_empty() {
        return;
    }
    let flagged = policy == RejectPolicy::Flag;
    let mut keep = vec![true; table.num_rows()];
    for (pos, reason) in &rejected {
        let row_index = table.index()[*pos];
        warn!(
            table = table.name(),
            column = column,
            row_index,
            reason = %reason,
            flagged,
            "Rejected value"
        );
        report.issues.push(RowIssue {
            row_index,
            step: label.to_string(),
            column: column.to_string(),
            reason: reason.to_string(),
            flagged,
        });
        keep[*pos] = false;
    }
    if flagged {
        summary.values_flagged = rejected.len();
    } else {
        summary.rows_dropped = table.retain_rows(&keep);
    }
}
