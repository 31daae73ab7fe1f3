//! Per-table cleaning plans: where a table comes from, where it goes, and the
//! ordered steps between.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use crate::constants;
use crate::error::Result;
use crate::pipeline::processing::dates::DateGrain;
use crate::pipeline::processing::{MissingPolicy, RejectPolicy};
use crate::pipeline::report::CleaningReport;
use crate::pipeline::steps::CleaningStep;
use crate::table::Table;

/// Which collaborator supplies the raw table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceSpec {
    Relational { table: String },
    Pdf { document: String },
    StoreApi,
    ObjectStore { object: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePlan {
    pub name: String,
    pub source: SourceSpec,
    pub destination: String,
    pub steps: Vec<CleaningStep>,
}

impl TablePlan {
    /// Run every step in order. The table is consumed and the cleaned table returned.
    #[instrument(skip(self, table), fields(plan = %self.name))]
    pub fn clean(&self, mut table: Table) -> Result<(Table, CleaningReport)> {
        let mut report = CleaningReport::new(&self.name, table.num_rows());
        for step in &self.steps {
            step.apply(&mut table, &mut report)?;
            debug!(step = %step.label(), rows = table.num_rows(), "Applied step");
        }
        info!(
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            issues = report.issues.len(),
            "Cleaned table"
        );
        Ok((table, report))
    }
}

fn label_set(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn date_step(column: &str, grain: DateGrain, format: Option<&str>) -> CleaningStep {
    CleaningStep::NormalizeDate {
        column: column.to_string(),
        grain,
        format: format.map(str::to_string),
        on_missing: MissingPolicy::Keep,
    }
}

pub fn users() -> TablePlan {
    TablePlan {
        name: constants::USERS.to_string(),
        source: SourceSpec::Relational {
            table: constants::LEGACY_USERS_TABLE.to_string(),
        },
        destination: "dim_users".to_string(),
        steps: vec![
            CleaningStep::RemapValues {
                column: "country_code".to_string(),
                mapping: BTreeMap::from([("GGB".to_string(), "GB".to_string())]),
            },
            CleaningStep::FilterCategories {
                column: "country_code".to_string(),
                permitted: label_set(constants::COUNTRY_CODES),
            },
            date_step("date_of_birth", DateGrain::Date, None),
            date_step("join_date", DateGrain::Date, None),
            CleaningStep::DropColumns {
                columns: vec!["index".to_string()],
            },
        ],
    }
}

pub fn cards() -> TablePlan {
    TablePlan {
        name: constants::CARDS.to_string(),
        source: SourceSpec::Pdf {
            document: constants::CARD_DETAILS_PDF.to_string(),
        },
        destination: "dim_card_details".to_string(),
        steps: vec![
            CleaningStep::FilterCategories {
                column: "card_provider".to_string(),
                permitted: label_set(constants::CARD_PROVIDERS),
            },
            date_step("expiry_date", DateGrain::MonthYear, Some("%m/%y")),
            date_step("date_payment_confirmed", DateGrain::Date, None),
        ],
    }
}

pub fn stores() -> TablePlan {
    TablePlan {
        name: constants::STORES.to_string(),
        source: SourceSpec::StoreApi,
        destination: "dim_store_details".to_string(),
        steps: vec![
            CleaningStep::SetIndex {
                column: "index".to_string(),
            },
            CleaningStep::DropColumns {
                columns: vec!["lat".to_string()],
            },
            CleaningStep::StripPrefix {
                column: "continent".to_string(),
                prefix: "ee".to_string(),
            },
            CleaningStep::FilterCategories {
                column: "country_code".to_string(),
                permitted: label_set(constants::COUNTRY_CODES),
            },
            CleaningStep::ScrubNumeric {
                column: "staff_numbers".to_string(),
                on_reject: RejectPolicy::Drop,
            },
            date_step("opening_date", DateGrain::Date, None),
        ],
    }
}

pub fn products() -> TablePlan {
    TablePlan {
        name: constants::PRODUCTS.to_string(),
        source: SourceSpec::ObjectStore {
            object: constants::PRODUCTS_OBJECT.to_string(),
        },
        destination: "dim_products".to_string(),
        steps: vec![
            CleaningStep::RebaseIndex { start: 1 },
            CleaningStep::FilterCategories {
                column: "category".to_string(),
                permitted: label_set(constants::PRODUCT_CATEGORIES),
            },
            date_step("date_added", DateGrain::Date, None),
            CleaningStep::NormalizeWeight {
                column: "weight".to_string(),
                on_reject: RejectPolicy::Drop,
            },
        ],
    }
}

pub fn date_events() -> TablePlan {
    TablePlan {
        name: constants::DATE_EVENTS.to_string(),
        source: SourceSpec::ObjectStore {
            object: constants::DATE_DETAILS_OBJECT.to_string(),
        },
        destination: "dim_date_times".to_string(),
        steps: vec![
            CleaningStep::FilterCategories {
                column: "time_period".to_string(),
                permitted: label_set(constants::TIME_PERIODS),
            },
            date_step("timestamp", DateGrain::Time, None),
            date_step("month", DateGrain::Month, Some("%m")),
            date_step("year", DateGrain::Year, Some("%Y")),
            date_step("day", DateGrain::Day, Some("%d")),
        ],
    }
}

pub fn orders() -> TablePlan {
    TablePlan {
        name: constants::ORDERS.to_string(),
        source: SourceSpec::Relational {
            table: constants::ORDERS_SOURCE_TABLE.to_string(),
        },
        destination: "orders_table".to_string(),
        steps: vec![
            CleaningStep::SetIndex {
                column: "index".to_string(),
            },
            CleaningStep::DropColumns {
                columns: ["level_0", "first_name", "last_name", "1"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
        ],
    }
}

/// Built-in plans in run order.
pub fn default_plans() -> Vec<TablePlan> {
    vec![users(), cards(), stores(), products(), date_events(), orders()]
}
