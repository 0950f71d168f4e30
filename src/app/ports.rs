use crate::common::error::Result;
use crate::domain::{PoiLookup, ValueDrivers};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;

/// The five remote lookups the orchestrator drives for each row.
#[async_trait]
pub trait GeodataPort: Send + Sync {
    /// First candidate geography containing the coordinate, in the order the
    /// lookup returned them. `None` when the candidate set is empty.
    async fn geography(&self, lat: f64, lng: f64) -> Result<Option<String>>;
    async fn scores(&self, geo_id: &str) -> Result<Value>;
    async fn demographics(&self, geo_id: &str) -> Result<Value>;
    async fn value_drivers(&self, geo_id: &str) -> Result<ValueDrivers>;
    async fn pois(&self, lat: f64, lng: f64) -> Result<PoiLookup>;
}

#[async_trait]
pub trait CredentialPort: Send + Sync {
    /// Ready-to-use request headers, including authorization.
    async fn headers(&self) -> Result<HeaderMap>;
}

#[async_trait]
pub trait PacerPort: Send + Sync {
    async fn pause(&self);
}
