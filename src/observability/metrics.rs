//! Metrics for ETL runs, recorded through the `metrics` facade.
//!
//! A Prometheus recorder is installed by [`init`]. When
//! `RETAIL_ETL_PUSHGATEWAY_URL` is set the rendered registry can be pushed at
//! the end of a run with [`push_all_metrics`].

use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{info, warn};

use crate::constants::PUSHGATEWAY_URL_ENV;
use crate::error::{EtlError, Result};

/// Every metric name this crate records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    RowsRead,
    RowsWritten,
    RowsDropped,
    PipelineRuns,
    PipelineFailures,
    PipelineDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RowsRead => "retail_etl_rows_read_total",
            MetricName::RowsWritten => "retail_etl_rows_written_total",
            MetricName::RowsDropped => "retail_etl_rows_dropped_total",
            MetricName::PipelineRuns => "retail_etl_pipeline_runs_total",
            MetricName::PipelineFailures => "retail_etl_pipeline_failures_total",
            MetricName::PipelineDuration => "retail_etl_pipeline_duration_seconds",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            RowsRead,
            RowsWritten,
            RowsDropped,
            PipelineRuns,
            PipelineFailures,
            PipelineDuration,
        ]
        .into_iter()
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

struct MetricsState {
    handle: metrics_exporter_prometheus::PrometheusHandle,
    pushgateway_url: Option<String>,
}

static METRICS_HANDLE: OnceLock<Arc<MetricsState>> = OnceLock::new();

/// Install the Prometheus recorder. Calling it twice is an error.
pub fn init() -> Result<()> {
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| EtlError::Config(format!("Failed to install Prometheus recorder: {}", e)))?;

    let pushgateway_url = std::env::var(PUSHGATEWAY_URL_ENV).ok();
    if pushgateway_url.is_some() {
        info!("Metrics system initialized with push gateway support");
    } else {
        info!("Metrics system initialized (no push gateway)");
    }

    METRICS_HANDLE
        .set(Arc::new(MetricsState {
            handle,
            pushgateway_url,
        }))
        .ok();
    Ok(())
}

/// Push the whole registry to the configured gateway. A no-op without one.
pub async fn push_all_metrics(instance: &str) -> Result<()> {
    let Some(state) = METRICS_HANDLE.get() else {
        warn!("Metrics not initialized, skipping push");
        return Ok(());
    };
    let Some(gateway) = state.pushgateway_url.as_deref() else {
        return Ok(());
    };

    let push_url = format!(
        "{}/metrics/job/retail_etl/instance/{}",
        gateway.trim_end_matches('/'),
        instance
    );

    let response = reqwest::Client::new()
        .post(&push_url)
        .header("Content-Type", "text/plain; version=0.0.4")
        .body(state.handle.render())
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(EtlError::Source {
            message: format!("Pushgateway returned status {}: {}", status, body),
        });
    }

    info!("Successfully pushed metrics to Pushgateway for instance={}", instance);
    Ok(())
}

// ============================================================================
// Pipeline Metrics
// ============================================================================

pub mod pipeline {
    use super::MetricName;

    pub fn rows_read(plan: &str, rows: usize) {
        ::metrics::counter!(MetricName::RowsRead.as_str(), "plan" => plan.to_string())
            .increment(rows as u64);
    }

    pub fn rows_written(plan: &str, rows: usize) {
        ::metrics::counter!(MetricName::RowsWritten.as_str(), "plan" => plan.to_string())
            .increment(rows as u64);
    }

    pub fn run_started(plan: &str) {
        ::metrics::counter!(MetricName::PipelineRuns.as_str(), "plan" => plan.to_string())
            .increment(1);
    }

    pub fn run_failed(plan: &str) {
        ::metrics::counter!(MetricName::PipelineFailures.as_str(), "plan" => plan.to_string())
            .increment(1);
    }

    pub fn duration(plan: &str, secs: f64) {
        ::metrics::histogram!(MetricName::PipelineDuration.as_str(), "plan" => plan.to_string())
            .record(secs);
    }
}

// ============================================================================
// Cleaning Metrics
// ============================================================================

pub mod cleaning {
    use super::MetricName;

    /// Rows removed by a single cleaning step.
    pub fn rows_dropped(table: &str, step: &str, rows: usize) {
        if rows == 0 {
            return;
        }
        ::metrics::counter!(
            MetricName::RowsDropped.as_str(),
            "plan" => table.to_string(),
            "step" => step.to_string()
        )
        .increment(rows as u64);
    }
}
