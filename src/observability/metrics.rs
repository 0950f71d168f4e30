//! Run counters for the enrichment pipeline.
//!
//! Counters go through the `metrics` facade. `init_metrics` installs a
//! Prometheus recorder whose handle renders the snapshot at the end of a
//! run; without an installed recorder the calls are no-ops.

use crate::common::error::{EnrichError, Result};
use crate::domain::Stage;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub const ROWS_TOTAL: &str = "geo_enrich_rows_total";
pub const GEOGRAPHIES_RESOLVED_TOTAL: &str = "geo_enrich_geographies_resolved_total";
pub const STAGE_FAILURES_TOTAL: &str = "geo_enrich_stage_failures_total";

/// Install the global Prometheus recorder and return its render handle.
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| EnrichError::Metrics(e.to_string()))
}

/// Counters recorded by the orchestrator
pub struct EnrichMetrics;

impl EnrichMetrics {
    pub fn record_row(geography_resolved: bool) {
        ::metrics::counter!(ROWS_TOTAL).increment(1);
        if geography_resolved {
            ::metrics::counter!(GEOGRAPHIES_RESOLVED_TOTAL).increment(1);
        }
    }

    pub fn record_stage_failure(stage: Stage) {
        ::metrics::counter!(STAGE_FAILURES_TOTAL, "stage" => stage.as_str()).increment(1);
    }
}
