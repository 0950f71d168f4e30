use crate::app::ports::{GeodataPort, PacerPort};
use crate::common::error::EnrichError;
use crate::domain::{EnrichmentRecord, InputRow, Stage, StageStatus};
use crate::observability::metrics::EnrichMetrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Records for every input row, in input order, plus run counters.
#[derive(Debug, Clone)]
pub struct EnrichmentRun {
    pub records: Vec<EnrichmentRecord>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_rows: usize,
    pub geographies_resolved: usize,
    pub chain_failures: usize,
    pub poi_failures: usize,
}

struct StageError {
    stage: Stage,
    source: EnrichError,
}

/// Drives the per-row chain of lookups. A failing lookup only affects the
/// row (and for POIs, only the POI fields) it was made for.
pub struct EnrichUseCase {
    geodata: Arc<dyn GeodataPort>,
    pacer: Arc<dyn PacerPort>,
}

impl EnrichUseCase {
    pub fn new(geodata: Arc<dyn GeodataPort>, pacer: Arc<dyn PacerPort>) -> Self {
        Self { geodata, pacer }
    }

    /// Enrich all rows sequentially. Always yields one record per row.
    pub async fn run(&self, rows: &[InputRow]) -> EnrichmentRun {
        info!("🚀 Enriching {} rows", rows.len());
        let mut records = Vec::with_capacity(rows.len());
        let mut summary = RunSummary {
            total_rows: rows.len(),
            ..Default::default()
        };

        for row in rows {
            let record = self.enrich_row(row).await;

            if record.geo_id.is_some() {
                summary.geographies_resolved += 1;
            }
            if record.outcomes.chain_failure().is_some() {
                summary.chain_failures += 1;
            }
            if !record.poi_fetch_succeeded {
                summary.poi_failures += 1;
            }
            EnrichMetrics::record_row(record.geo_id.is_some());

            records.push(record);
            if records.len() % 10 == 0 {
                info!("Processed {}/{} rows", records.len(), rows.len());
            }

            self.pacer.pause().await;
        }

        info!(
            "✅ Enriched {} rows ({} geographies resolved, {} chain failures, {} POI failures)",
            summary.total_rows, summary.geographies_resolved, summary.chain_failures, summary.poi_failures
        );
        EnrichmentRun { records, summary }
    }

    /// Enrich a single row. Never fails: errors are recorded in the record's
    /// stage outcomes and logged with the row index and stage.
    #[instrument(skip(self, row), fields(row = row.index))]
    pub async fn enrich_row(&self, row: &InputRow) -> EnrichmentRecord {
        let mut record = EnrichmentRecord::new(row.index);

        let Some((lat, lng)) = row.coordinates() else {
            let reason = "row has no usable latitude/longitude";
            warn!(row = row.index, "[{}] Skipping lookups: {}", row.index, reason);
            for stage in [Stage::Geography, Stage::Pois] {
                EnrichMetrics::record_stage_failure(stage);
                record.outcomes.set(stage, StageStatus::Failed(reason.to_string()));
            }
            return record;
        };

        if let Err(StageError { stage, source }) = self.resolve_chain(lat, lng, &mut record).await {
            warn!(row = row.index, stage = %stage, "[{}] {} lookup failed: {}", row.index, stage, source);
            EnrichMetrics::record_stage_failure(stage);
            record.outcomes.set(stage, StageStatus::Failed(source.to_string()));
        }

        self.fetch_pois(row.index, lat, lng, &mut record).await;
        record
    }

    /// Geography, then scores, demographics and value drivers keyed by the
    /// resolved geography. Stops at the first failure; fields filled before
    /// it are kept.
    async fn resolve_chain(
        &self,
        lat: f64,
        lng: f64,
        record: &mut EnrichmentRecord,
    ) -> Result<(), StageError> {
        let geo_id = self
            .geodata
            .geography(lat, lng)
            .await
            .map_err(at(Stage::Geography))?;
        record.outcomes.set(Stage::Geography, StageStatus::Succeeded);

        let Some(geo_id) = geo_id else {
            debug!("No geography found at ({}, {})", lat, lng);
            return Ok(());
        };
        record.geo_id = Some(geo_id.clone());

        record.scores = Some(self.geodata.scores(&geo_id).await.map_err(at(Stage::Scores))?);
        record.outcomes.set(Stage::Scores, StageStatus::Succeeded);

        record.demographics = Some(
            self.geodata
                .demographics(&geo_id)
                .await
                .map_err(at(Stage::Demographics))?,
        );
        record.outcomes.set(Stage::Demographics, StageStatus::Succeeded);

        record.value_drivers = Some(
            self.geodata
                .value_drivers(&geo_id)
                .await
                .map_err(at(Stage::ValueDrivers))?,
        );
        record.outcomes.set(Stage::ValueDrivers, StageStatus::Succeeded);

        Ok(())
    }

    async fn fetch_pois(&self, index: usize, lat: f64, lng: f64, record: &mut EnrichmentRecord) {
        match self.geodata.pois(lat, lng).await {
            Ok(lookup) => {
                record.pois = lookup.pois;
                record.poi_category_counts = lookup.category_counts;
                record.poi_fetch_succeeded = true;
                record.outcomes.set(Stage::Pois, StageStatus::Succeeded);
            }
            Err(e) => {
                warn!(
                    row = index,
                    stage = %Stage::Pois,
                    "POI fetch failed at ({},{}): {}",
                    lat,
                    lng,
                    e
                );
                EnrichMetrics::record_stage_failure(Stage::Pois);
                record.pois = Vec::new();
                record.poi_category_counts = Vec::new();
                record.poi_fetch_succeeded = false;
                record.outcomes.set(Stage::Pois, StageStatus::Failed(e.to_string()));
            }
        }
    }
}

fn at(stage: Stage) -> impl FnOnce(EnrichError) -> StageError {
    move |source| StageError { stage, source }
}
