//! Endpoint and column-name constants shared by the client, the orchestrator
//! and the normalizer.

// Local Logic API defaults
pub const DEFAULT_BASE_URL: &str = "https://api.locallogic.co/v3";
pub const DEFAULT_TOKEN_URL: &str = "https://api.locallogic.co/oauth/token";
pub const DEFAULT_GEOGRAPHY_LEVEL: &str = "10";
pub const DEFAULT_POI_RADIUS: u32 = 1000;
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_DELAY_MS: u64 = 300;

// Endpoint paths, relative to the base URL
pub const GEOGRAPHIES_PATH: &str = "geographies";
pub const SCORES_PATH: &str = "scores";
pub const DEMOGRAPHICS_PATH: &str = "demographics";
pub const VALUE_DRIVERS_PATH: &str = "value-drivers";
pub const POIS_PATH: &str = "enhanced-pois";

// Environment overrides
pub const ENV_ACCESS_TOKEN: &str = "LOCALLOGIC_ACCESS_TOKEN";
pub const ENV_CLIENT_ID: &str = "LOCALLOGIC_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "LOCALLOGIC_CLIENT_SECRET";
pub const ENV_BASE_URL: &str = "LOCALLOGIC_BASE_URL";

// Input columns
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

// Generated output columns and prefixes
pub const GEO_ID_COLUMN: &str = "new_geo_id";
pub const POI_SUCCESS_COLUMN: &str = "poi_success";
pub const POI_COUNT_COLUMN: &str = "pois.count";
pub const SCORES_PREFIX: &str = "scores";
pub const DEMOGRAPHICS_PREFIX: &str = "demographics";
pub const VALUE_DRIVERS_PREFIX: &str = "value_drivers";

// Input files read as workbooks instead of CSV
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

pub const DEFAULT_OUTPUT_FILE: &str = "neighborhoods_enriched.csv";

/// Column name for a POI category count, e.g. `poi_cafe_count`.
pub fn poi_category_column(category: &str) -> String {
    format!("poi_{category}_count")
}
