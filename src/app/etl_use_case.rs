use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::app::ports::{
    ObjectStorePort, PdfTablePort, RelationalSourcePort, StoreApiPort, WarehousePort,
};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::{CleaningReport, SourceSpec, TablePlan};
use crate::table::Table;

/// The readers a run may draw from.
pub struct EtlSources {
    pub relational: Box<dyn RelationalSourcePort>,
    pub pdf: Box<dyn PdfTablePort>,
    pub store_api: Box<dyn StoreApiPort>,
    pub object_store: Box<dyn ObjectStorePort>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableStatus {
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableOutcome {
    pub plan: String,
    pub destination: String,
    pub status: TableStatus,
    pub report: Option<CleaningReport>,
    pub error: Option<String>,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub outcomes: Vec<TableOutcome>,
}

impl RunSummary {
    pub fn failed(&self) -> impl Iterator<Item = &TableOutcome> {
        self.outcomes.iter().filter(|o| o.status == TableStatus::Failed)
    }

    pub fn all_loaded(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Sequences extract → clean → load for each table plan.
pub struct EtlUseCase {
    sources: EtlSources,
    warehouse: Box<dyn WarehousePort>,
}

impl EtlUseCase {
    pub fn new(sources: EtlSources, warehouse: Box<dyn WarehousePort>) -> Self {
        Self { sources, warehouse }
    }

    /// Read the raw table for a plan from its collaborator.
    pub async fn extract(&self, plan: &TablePlan) -> Result<Table> {
        let mut table = match &plan.source {
            SourceSpec::Relational { table } => self.sources.relational.read(table).await?,
            SourceSpec::Pdf { document } => self.sources.pdf.read(document).await?,
            SourceSpec::StoreApi => self.fetch_stores().await?,
            SourceSpec::ObjectStore { object } => self.sources.object_store.fetch(object).await?,
        };
        table.set_name(plan.name.clone());
        Ok(table)
    }

    /// One request per store index, in order.
    async fn fetch_stores(&self) -> Result<Table> {
        let count = self.sources.store_api.list_count().await?;
        info!(count, "Fetching store records");
        // Not pre-sized: `count` comes from the remote API.
        let mut records = Vec::new();
        for i in 0..count {
            records.push(self.sources.store_api.fetch(i).await?);
        }
        Table::from_records("stores", &records)
    }

    /// Extract, clean and load a single table. Any error aborts this table only.
    #[instrument(skip(self, plan), fields(plan = %plan.name, destination = %plan.destination))]
    pub async fn run_table(&self, plan: &TablePlan) -> Result<CleaningReport> {
        let raw = self.extract(plan).await?;
        info!(rows = raw.num_rows(), columns = raw.num_columns(), "Extracted table");
        metrics::pipeline::rows_read(&plan.name, raw.num_rows());

        let (cleaned, report) = plan.clean(raw)?;

        self.warehouse.write(&cleaned, &plan.destination).await?;
        info!(rows = cleaned.num_rows(), "Loaded table");
        metrics::pipeline::rows_written(&plan.name, cleaned.num_rows());
        Ok(report)
    }

    /// Run every plan in order. A failing table is recorded and the loop moves on.
    #[instrument(skip(self, plans), fields(run_id = tracing::field::Empty))]
    pub async fn run_all(&self, plans: &[TablePlan]) -> RunSummary {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!(%run_id, tables = plans.len(), "Starting ETL run");

        let mut outcomes = Vec::with_capacity(plans.len());
        for plan in plans {
            metrics::pipeline::run_started(&plan.name);
            let started = Instant::now();
            let result = self.run_table(plan).await;
            let duration_secs = started.elapsed().as_secs_f64();
            metrics::pipeline::duration(&plan.name, duration_secs);

            let outcome = match result {
                Ok(report) => TableOutcome {
                    plan: plan.name.clone(),
                    destination: plan.destination.clone(),
                    status: TableStatus::Loaded,
                    report: Some(report),
                    error: None,
                    duration_secs,
                },
                Err(e) => {
                    error!(plan = %plan.name, error = %e, "Table pipeline failed");
                    metrics::pipeline::run_failed(&plan.name);
                    TableOutcome {
                        plan: plan.name.clone(),
                        destination: plan.destination.clone(),
                        status: TableStatus::Failed,
                        report: None,
                        error: Some(e.to_string()),
                        duration_secs,
                    }
                }
            };
            outcomes.push(outcome);
        }

        let summary = RunSummary { run_id, outcomes };
        info!(
            %run_id,
            loaded = summary.outcomes.len() - summary.failed().count(),
            failed = summary.failed().count(),
            "Finished ETL run"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::pipeline::plan;
    use crate::table::Cell;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct FailingSource;

    #[async_trait]
    impl RelationalSourcePort for FailingSource {
        async fn read(&self, table_name: &str) -> Result<Table> {
            Err(EtlError::Source {
                message: format!("relation {} unavailable", table_name),
            })
        }
    }

    #[async_trait]
    impl PdfTablePort for FailingSource {
        async fn read(&self, _document_ref: &str) -> Result<Table> {
            Err(EtlError::Source { message: "no pdf".into() })
        }
    }

    struct TwoStores;

    #[async_trait]
    impl StoreApiPort for TwoStores {
        async fn list_count(&self) -> Result<usize> {
            Ok(2)
        }

        async fn fetch(&self, store_index: usize) -> Result<serde_json::Value> {
            let country_code = if store_index == 0 { "GB" } else { "DE" };
            Ok(serde_json::json!({
                "index": store_index,
                "lat": null,
                "continent": "eeEurope",
                "country_code": country_code,
                "staff_numbers": "1x3",
                "opening_date": "2006-03-13",
            }))
        }
    }

    /// Reports far more stores than it can serve.
    struct OverstatedStores;

    #[async_trait]
    impl StoreApiPort for OverstatedStores {
        async fn list_count(&self) -> Result<usize> {
            Ok(usize::MAX / 2)
        }

        async fn fetch(&self, store_index: usize) -> Result<serde_json::Value> {
            Err(EtlError::Source {
                message: format!("store {} not found", store_index),
            })
        }
    }

    struct EmptyObjects;

    #[async_trait]
    impl ObjectStorePort for EmptyObjects {
        async fn fetch(&self, object_ref: &str) -> Result<Table> {
            Err(EtlError::Source {
                message: format!("{} not found", object_ref),
            })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingWarehouse {
        written: Arc<Mutex<Vec<(String, Table)>>>,
    }

    #[async_trait]
    impl WarehousePort for RecordingWarehouse {
        async fn write(&self, table: &Table, destination: &str) -> Result<()> {
            self.written
                .lock()
                .unwrap()
                .push((destination.to_string(), table.clone()));
            Ok(())
        }
    }

    fn use_case(warehouse: RecordingWarehouse) -> EtlUseCase {
        EtlUseCase::new(
            EtlSources {
                relational: Box::new(FailingSource),
                pdf: Box::new(FailingSource),
                store_api: Box::new(TwoStores),
                object_store: Box::new(EmptyObjects),
            },
            Box::new(warehouse),
        )
    }

    #[tokio::test]
    async fn test_failure_in_one_table_does_not_stop_others() {
        let warehouse = RecordingWarehouse::default();
        let etl = use_case(warehouse.clone());

        let summary = etl.run_all(&[plan::users(), plan::stores(), plan::products()]).await;

        assert_eq!(summary.outcomes.len(), 3);
        assert_eq!(summary.outcomes[0].status, TableStatus::Failed);
        assert_eq!(summary.outcomes[1].status, TableStatus::Loaded);
        assert_eq!(summary.outcomes[2].status, TableStatus::Failed);
        assert!(!summary.all_loaded());

        let written = warehouse.written.lock().unwrap();
        assert_eq!(written.len(), 1);
        let (destination, table) = &written[0];
        assert_eq!(destination, "dim_store_details");
        assert_eq!(table.index(), &[0, 1]);
        assert!(table.column("lat").is_none());
        assert_eq!(
            table.column("continent").unwrap().cells,
            vec![Cell::text("Europe"), Cell::text("Europe")]
        );
        assert_eq!(table.column("staff_numbers").unwrap().cells, vec![Cell::Int(13), Cell::Int(13)]);
    }

    #[tokio::test]
    async fn test_cleaning_error_skips_write() {
        let warehouse = RecordingWarehouse::default();
        let etl = use_case(warehouse.clone());
        let mut plan = plan::stores();
        plan.steps.push(crate::pipeline::CleaningStep::ScrubNumeric {
            column: "no_such_column".into(),
            on_reject: Default::default(),
        });

        let err = etl.run_table(&plan).await.unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { .. }));
        assert!(warehouse.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overstated_store_count_fails_on_first_missing_store() {
        let warehouse = RecordingWarehouse::default();
        let etl = EtlUseCase::new(
            EtlSources {
                relational: Box::new(FailingSource),
                pdf: Box::new(FailingSource),
                store_api: Box::new(OverstatedStores),
                object_store: Box::new(EmptyObjects),
            },
            Box::new(warehouse.clone()),
        );

        let err = etl.run_table(&plan::stores()).await.unwrap_err();
        assert!(matches!(err, EtlError::Source { ref message } if message == "store 0 not found"));
        assert!(warehouse.written.lock().unwrap().is_empty());
    }
}
