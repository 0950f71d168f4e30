use anyhow::Result;
use async_trait::async_trait;
use geo_enrich::app::enrich_use_case::EnrichUseCase;
use geo_enrich::app::ports::{GeodataPort, PacerPort};
use geo_enrich::common::error::{EnrichError, Result as EnrichResult};
use geo_enrich::domain::{InputRow, InputTable, PoiLookup, StageStatus, ValueDrivers};
use geo_enrich::infra::csv_io::{read_table, write_table};
use geo_enrich::pipeline::{normalize, FlatTable};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Arc;

/// Canned responses keyed by latitude. Unknown coordinates resolve to no
/// geography; POIs fail for latitudes listed in `poi_failures`.
#[derive(Default)]
struct StubGeodata {
    geographies: HashMap<String, Value>,
    value_drivers: HashMap<String, Value>,
    poi_failures: Vec<String>,
    broken_demographics: Vec<String>,
}

fn key(lat: f64) -> String {
    lat.to_string()
}

#[async_trait]
impl GeodataPort for StubGeodata {
    async fn geography(&self, lat: f64, _lng: f64) -> EnrichResult<Option<String>> {
        let candidates = self.geographies.get(&key(lat)).cloned().unwrap_or(json!({}));
        Ok(candidates.as_object().and_then(|m| m.keys().next().cloned()))
    }

    async fn scores(&self, geo_id: &str) -> EnrichResult<Value> {
        Ok(json!({"walkability": {"value": 9.1, "text": "Walker's paradise"}, "geo": geo_id}))
    }

    async fn demographics(&self, geo_id: &str) -> EnrichResult<Value> {
        if self.broken_demographics.iter().any(|g| g == geo_id) {
            return Err(EnrichError::MissingField("data.attributes".into()));
        }
        Ok(json!({"income": {"median": 61000}}))
    }

    async fn value_drivers(&self, geo_id: &str) -> EnrichResult<ValueDrivers> {
        let raw = self
            .value_drivers
            .get(geo_id)
            .cloned()
            .unwrap_or_else(|| json!([{"name": "schools", "value": 8.1}]));
        ValueDrivers::from_json(raw)
    }

    async fn pois(&self, lat: f64, _lng: f64) -> EnrichResult<PoiLookup> {
        if self.poi_failures.contains(&key(lat)) {
            return Err(EnrichError::UnexpectedShape("data.results is not an array".into()));
        }
        Ok(PoiLookup {
            pois: vec![json!({"category": "cafe"})],
            category_counts: vec![("cafe".to_string(), 3)],
        })
    }
}

struct NoPause;

#[async_trait]
impl PacerPort for NoPause {
    async fn pause(&self) {}
}

fn input(coords: &[(f64, f64)]) -> InputTable {
    InputTable {
        columns: vec!["site".into(), "latitude".into(), "longitude".into()],
        rows: coords
            .iter()
            .enumerate()
            .map(|(index, (lat, lng))| InputRow {
                index,
                latitude: Some(*lat),
                longitude: Some(*lng),
                fields: vec![format!("site-{index}"), lat.to_string(), lng.to_string()],
            })
            .collect(),
    }
}

async fn enrich(stub: StubGeodata, table: &InputTable) -> Result<FlatTable> {
    let run = EnrichUseCase::new(Arc::new(stub), Arc::new(NoPause))
        .run(&table.rows)
        .await;
    Ok(normalize(table, &run.records)?)
}

fn stub_with_geographies(entries: &[(f64, &str)]) -> StubGeodata {
    StubGeodata {
        geographies: entries
            .iter()
            .map(|(lat, id)| (key(*lat), json!({ (*id): {"level": 10} })))
            .collect(),
        ..Default::default()
    }
}

fn columns_with_prefix<'a>(flat: &'a FlatTable, prefix: &str) -> Vec<&'a str> {
    flat.columns
        .iter()
        .filter(|c| c.starts_with(prefix))
        .map(String::as_str)
        .collect()
}

#[tokio::test]
async fn resolved_row_gets_every_column_group() -> Result<()> {
    let table = input(&[(40.7, -74.0)]);
    let flat = enrich(stub_with_geographies(&[(40.7, "g123")]), &table).await?;

    assert_eq!(flat.rows.len(), 1);
    assert_eq!(flat.get(0, "site"), Some(&json!("site-0")));
    assert_eq!(flat.get(0, "new_geo_id"), Some(&json!("g123")));
    assert_eq!(flat.get(0, "poi_success"), Some(&json!(1)));
    assert_eq!(flat.get(0, "pois.count"), Some(&json!(1)));
    assert_eq!(flat.get(0, "poi_cafe_count"), Some(&json!(3)));
    assert_eq!(flat.get(0, "scores.walkability.value"), Some(&json!(9.1)));
    assert_eq!(flat.get(0, "demographics.income.median"), Some(&json!(61000)));
    assert_eq!(flat.get(0, "value_drivers.schools"), Some(&json!(8.1)));
    Ok(())
}

#[tokio::test]
async fn empty_geography_leaves_chain_columns_empty() -> Result<()> {
    let table = input(&[(40.7, -74.0), (1.0, 2.0)]);
    let flat = enrich(stub_with_geographies(&[(40.7, "g123")]), &table).await?;

    assert_eq!(flat.get(1, "new_geo_id"), Some(&Value::Null));
    for column in flat
        .columns
        .iter()
        .filter(|c| c.starts_with("scores.") || c.starts_with("demographics.") || c.starts_with("value_drivers."))
    {
        assert_eq!(flat.get(1, column), Some(&Value::Null), "{column}");
    }
    // POIs are fetched by coordinate, not by geography
    assert_eq!(flat.get(1, "poi_success"), Some(&json!(1)));
    assert_eq!(flat.get(1, "poi_cafe_count"), Some(&json!(3)));
    Ok(())
}

#[tokio::test]
async fn poi_failure_only_touches_poi_columns() -> Result<()> {
    let table = input(&[(40.7, -74.0), (41.0, -73.0)]);
    let mut stub = stub_with_geographies(&[(40.7, "g1"), (41.0, "g2")]);
    stub.poi_failures.push(key(41.0));

    let flat = enrich(stub, &table).await?;

    assert_eq!(flat.get(1, "poi_success"), Some(&json!(0)));
    assert_eq!(flat.get(1, "pois.count"), Some(&json!(0)));
    assert_eq!(flat.get(1, "poi_cafe_count"), Some(&json!(0)));
    assert_eq!(flat.get(1, "new_geo_id"), Some(&json!("g2")));
    assert_eq!(flat.get(1, "demographics.income.median"), Some(&json!(61000)));
    assert_eq!(flat.get(0, "poi_cafe_count"), Some(&json!(3)));
    Ok(())
}

#[tokio::test]
async fn mid_chain_failure_keeps_earlier_fields_and_later_rows() -> Result<()> {
    let table = input(&[(40.7, -74.0), (41.0, -73.0)]);
    let mut stub = stub_with_geographies(&[(40.7, "g1"), (41.0, "g2")]);
    stub.broken_demographics.push("g1".into());

    let run = EnrichUseCase::new(Arc::new(stub), Arc::new(NoPause))
        .run(&table.rows)
        .await;

    let first = &run.records[0];
    assert_eq!(first.geo_id.as_deref(), Some("g1"));
    assert!(first.scores.is_some());
    assert!(first.demographics.is_none());
    assert!(first.value_drivers.is_none());
    assert!(first.outcomes.demographics.is_failed());
    assert_eq!(first.outcomes.value_drivers, StageStatus::NotAttempted);
    assert!(first.poi_fetch_succeeded);

    assert!(run.records[1].value_drivers.is_some());
    assert_eq!(run.summary.chain_failures, 1);

    let flat = normalize(&table, &run.records)?;
    assert_eq!(flat.get(0, "scores.walkability.value"), Some(&json!(9.1)));
    assert_eq!(flat.get(0, "value_drivers.schools"), Some(&Value::Null));
    Ok(())
}

#[tokio::test]
async fn both_value_driver_shapes_share_one_table() -> Result<()> {
    let table = input(&[(40.7, -74.0), (41.0, -73.0)]);
    let mut stub = stub_with_geographies(&[(40.7, "pairs"), (41.0, "categories")]);
    stub.value_drivers.insert(
        "categories".into(),
        json!({"lifestyle": {"variables": [{"variable": "walk_score", "value": 72}]}}),
    );

    let flat = enrich(stub, &table).await?;

    assert_eq!(
        columns_with_prefix(&flat, "value_drivers."),
        vec!["value_drivers.schools", "value_drivers.lifestyle.walk_score"]
    );
    assert_eq!(flat.get(0, "value_drivers.schools"), Some(&json!(8.1)));
    assert_eq!(flat.get(0, "value_drivers.lifestyle.walk_score"), Some(&Value::Null));
    assert_eq!(flat.get(1, "value_drivers.schools"), Some(&Value::Null));
    assert_eq!(flat.get(1, "value_drivers.lifestyle.walk_score"), Some(&json!(72)));
    Ok(())
}

#[tokio::test]
async fn every_row_is_emitted_in_input_order() -> Result<()> {
    let coords: Vec<(f64, f64)> = (0..25).map(|i| (i as f64, -(i as f64))).collect();
    let table = input(&coords);
    let mut stub = stub_with_geographies(&[(3.0, "g3"), (7.0, "g7")]);
    stub.poi_failures = vec![key(0.0), key(24.0)];

    let flat = enrich(stub, &table).await?;

    assert_eq!(flat.rows.len(), 25);
    for (i, row) in flat.rows.iter().enumerate() {
        assert_eq!(row.len(), flat.columns.len());
        assert_eq!(flat.get(i, "site"), Some(&json!(format!("site-{i}"))));
    }
    assert_eq!(flat.get(3, "new_geo_id"), Some(&json!("g3")));
    assert_eq!(flat.get(4, "new_geo_id"), Some(&Value::Null));
    Ok(())
}

#[tokio::test]
async fn reruns_produce_identical_csv() -> Result<()> {
    let csv_in = "site,latitude,longitude\nhome,40.7,-74.0\nnowhere,1.5,2.5\n";

    let mut outputs = Vec::new();
    for _ in 0..2 {
        let table = read_table(Cursor::new(csv_in))?;
        let flat = enrich(stub_with_geographies(&[(40.7, "g123")]), &table).await?;
        let mut out = Vec::new();
        write_table(&mut out, &flat)?;
        outputs.push(out);
    }

    assert_eq!(outputs[0], outputs[1]);
    let text = String::from_utf8(outputs.remove(0))?;
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some(
            "site,latitude,longitude,new_geo_id,poi_success,pois.count,\
             scores.walkability.value,scores.walkability.text,scores.geo,\
             demographics.income.median,value_drivers.schools,poi_cafe_count"
        )
    );
    assert_eq!(
        lines.next(),
        Some("home,40.7,-74.0,g123,1,1,9.1,Walker's paradise,g123,61000,8.1,3")
    );
    assert_eq!(lines.next(), Some("nowhere,1.5,2.5,,1,1,,,,,,3"));
    Ok(())
}

#[tokio::test]
async fn blank_coordinate_row_is_kept_with_empty_enrichment() -> Result<()> {
    let table = read_table(Cursor::new(
        "site,latitude,longitude\na,40.7,-74.0\nb,,\nc,41.0,-73.0\n",
    ))?;
    let stub = stub_with_geographies(&[(40.7, "g1"), (41.0, "g2")]);

    let flat = enrich(stub, &table).await?;

    assert_eq!(flat.rows.len(), 3);
    assert_eq!(flat.get(0, "new_geo_id"), Some(&json!("g1")));
    assert_eq!(flat.get(2, "new_geo_id"), Some(&json!("g2")));

    assert_eq!(flat.get(1, "site"), Some(&json!("b")));
    assert_eq!(flat.get(1, "latitude"), Some(&json!("")));
    assert_eq!(flat.get(1, "new_geo_id"), Some(&Value::Null));
    assert_eq!(flat.get(1, "poi_success"), Some(&json!(0)));
    assert_eq!(flat.get(1, "pois.count"), Some(&json!(0)));
    assert_eq!(flat.get(1, "poi_cafe_count"), Some(&json!(0)));
    assert_eq!(flat.get(1, "demographics.income.median"), Some(&Value::Null));
    Ok(())
}
