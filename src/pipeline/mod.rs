pub mod plan;
pub mod processing;
pub mod report;
pub mod steps;

pub use plan::{default_plans, SourceSpec, TablePlan};
pub use report::{CleaningReport, RowIssue, StepSummary};
pub use steps::CleaningStep;
