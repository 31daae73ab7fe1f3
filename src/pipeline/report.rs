use serde::Serialize;

/// A row a step could not clean, identified by its row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowIssue {
    pub row_index: i64,
    pub step: String,
    pub column: String,
    pub reason: String,
    /// `true` when the row was kept with a missing cell rather than dropped.
    pub flagged: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StepSummary {
    pub step: String,
    pub rows_dropped: usize,
    pub values_missing: usize,
    pub values_flagged: usize,
}

/// Outcome of cleaning one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub table: String,
    pub rows_in: usize,
    pub rows_out: usize,
    pub steps: Vec<StepSummary>,
    pub issues: Vec<RowIssue>,
}

impl CleaningReport {
    pub fn new(table: &str, rows_in: usize) -> Self {
        Self {
            table: table.to_string(),
            rows_in,
            rows_out: rows_in,
            ..Default::default()
        }
    }

    pub fn rows_dropped(&self) -> usize {
        self.steps.iter().map(|s| s.rows_dropped).sum()
    }

    pub fn flagged(&self) -> impl Iterator<Item = &RowIssue> {
        self.issues.iter().filter(|i| i.flagged)
    }
}
