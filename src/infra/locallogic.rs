use crate::app::ports::{CredentialPort, GeodataPort};
use crate::common::constants::{
    DEMOGRAPHICS_PATH, GEOGRAPHIES_PATH, POIS_PATH, SCORES_PATH, VALUE_DRIVERS_PATH,
};
use crate::common::error::{EnrichError, Result};
use crate::config::ApiConfig;
use crate::domain::{PoiLookup, ValueDrivers};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Local Logic v3 client. Every request asks the credential provider for
/// fresh headers, so a failing token exchange fails only that lookup.
pub struct LocalLogicClient {
    client: reqwest::Client,
    credentials: Arc<dyn CredentialPort>,
    base_url: String,
    geography_level: String,
    poi_radius: u32,
}

impl LocalLogicClient {
    pub fn new(client: reqwest::Client, credentials: Arc<dyn CredentialPort>, api: &ApiConfig) -> Self {
        Self {
            client,
            credentials,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            geography_level: api.geography_level.clone(),
            poi_radius: api.poi_radius,
        }
    }

    /// Shared reqwest client with the configured timeout.
    pub fn http_client(api: &ApiConfig) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().timeout(api.timeout()).build()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);
        let headers = self.credentials.headers().await?;
        let body = self
            .client
            .get(&url)
            .headers(headers)
            .query(query)
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl GeodataPort for LocalLogicClient {
    #[instrument(skip(self))]
    async fn geography(&self, lat: f64, lng: f64) -> Result<Option<String>> {
        let body = self
            .get_json(
                GEOGRAPHIES_PATH,
                &[
                    ("lat", lat.to_string()),
                    ("lng", lng.to_string()),
                    ("levels", self.geography_level.clone()),
                ],
            )
            .await?;
        parse_geography(&body)
    }

    async fn scores(&self, geo_id: &str) -> Result<Value> {
        let body = self
            .get_json(SCORES_PATH, &[("geography_ids", geo_id.to_string())])
            .await?;
        parse_scores(body)
    }

    async fn demographics(&self, geo_id: &str) -> Result<Value> {
        let body = self
            .get_json(&format!("{DEMOGRAPHICS_PATH}/{geo_id}"), &[])
            .await?;
        parse_demographics(body)
    }

    async fn value_drivers(&self, geo_id: &str) -> Result<ValueDrivers> {
        let body = self
            .get_json(&format!("{VALUE_DRIVERS_PATH}/{geo_id}"), &[])
            .await?;
        parse_value_drivers(body)
    }

    #[instrument(skip(self))]
    async fn pois(&self, lat: f64, lng: f64) -> Result<PoiLookup> {
        let body = self
            .get_json(
                POIS_PATH,
                &[
                    ("lat", lat.to_string()),
                    ("lng", lng.to_string()),
                    ("radius", self.poi_radius.to_string()),
                ],
            )
            .await?;
        parse_pois(body)
    }
}

/// Take `body[path[0]][path[1]]...`, failing with the dotted path if any
/// step is missing.
fn take(mut body: Value, path: &[&str]) -> Result<Value> {
    for key in path {
        body = match body {
            Value::Object(mut map) => map
                .remove(*key)
                .ok_or_else(|| EnrichError::MissingField(path.join(".")))?,
            _ => return Err(EnrichError::MissingField(path.join("."))),
        };
    }
    Ok(body)
}

/// First candidate geography, in the order the API returned them.
pub fn parse_geography(body: &Value) -> Result<Option<String>> {
    let geographies = body
        .get("data")
        .and_then(|d| d.get("geographies"))
        .ok_or_else(|| EnrichError::MissingField("data.geographies".into()))?;
    match geographies {
        Value::Object(candidates) => Ok(candidates.keys().next().cloned()),
        Value::Null => Ok(None),
        _ => Err(EnrichError::UnexpectedShape(
            "data.geographies is not an object".into(),
        )),
    }
}

pub fn parse_scores(body: Value) -> Result<Value> {
    take(body, &["data"])
}

pub fn parse_demographics(body: Value) -> Result<Value> {
    take(body, &["data", "attributes"])
}

pub fn parse_value_drivers(body: Value) -> Result<ValueDrivers> {
    ValueDrivers::from_json(take(body, &["data", "value_drivers"])?)
}

/// POI results plus `meta.counts.total_by_category`; missing counts mean no
/// categories rather than a failed lookup.
pub fn parse_pois(mut body: Value) -> Result<PoiLookup> {
    let counts = body
        .pointer_mut("/meta/counts/total_by_category")
        .map(Value::take)
        .unwrap_or(Value::Null);
    let pois = match take(body, &["data", "results"])? {
        Value::Array(items) => items,
        _ => {
            return Err(EnrichError::UnexpectedShape(
                "data.results is not an array".into(),
            ))
        }
    };

    let category_counts = match counts {
        Value::Object(map) => map
            .into_iter()
            .map(|(category, count)| match integer_count(&count) {
                Some(n) => Ok((category, n)),
                None => Err(EnrichError::UnexpectedShape(format!(
                    "count for '{category}' is not an integer: {count}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?,
        Value::Null => Vec::new(),
        _ => {
            return Err(EnrichError::UnexpectedShape(
                "meta.counts.total_by_category is not an object".into(),
            ))
        }
    };

    Ok(PoiLookup { pois, category_counts })
}

/// Integral counts only; `3.0` is accepted, `2.5` and out-of-range values are not.
fn integer_count(count: &Value) -> Option<i64> {
    count.as_i64().or_else(|| {
        count
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
            .map(|f| f as i64)
    })
}
