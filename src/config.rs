use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

use crate::color::ColorColumn;
use crate::render::MapStyle;

/// Optional configuration file, relative to the working directory.
const CONFIG_FILE: &str = "config/dashboard";
const ENV_PREFIX: &str = "JEONSE";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub filters: FilterDefaults,
    #[serde(default)]
    pub kakao: KakaoConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub csv_path: PathBuf,
    /// Floor-plan images named `{id}.png` / `{id}.jpg`.
    pub images_dir: PathBuf,
    pub columns: ColumnNames,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("data/final.csv"),
            images_dir: PathBuf::from("data/images"),
            columns: ColumnNames::default(),
        }
    }
}

/// Header names of the listing CSV.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnNames {
    pub id: String,
    pub address: String,
    pub housing_type: String,
    pub area_m2: String,
    pub deposit: String,
    pub deposit_per_m2: String,
    pub commute_minutes: String,
    pub applicants: String,
    pub latitude: String,
    pub longitude: String,
    pub nearest_station: String,
    pub station_distance: String,
    pub image: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            id: "번호".into(),
            address: "주소".into(),
            housing_type: "주택유형".into(),
            area_m2: "m2".into(),
            deposit: "deposit".into(),
            deposit_per_m2: "deposit_m2".into(),
            commute_minutes: "expected_time".into(),
            applicants: "신청자수".into(),
            latitude: "x".into(),
            longitude: "y".into(),
            nearest_station: "nearest_station".into(),
            station_distance: "station_distance".into(),
            image: "image".into(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FilterDefaults {
    pub max_deposit: f64,
    pub max_commute_minutes: f64,
    pub color_column: ColorColumn,
    pub map_style: MapStyle,
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            max_deposit: 30000.0,
            max_commute_minutes: 90.0,
            color_column: ColorColumn::DepositPerArea,
            map_style: MapStyle::OpenStreetMap,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct KakaoConfig {
    /// REST API key, sent as `Authorization: KakaoAK {key}`.
    pub api_key: Option<String>,
    pub geocode_url: String,
    pub directions_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub max_concurrency: usize,
}

impl Default for KakaoConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geocode_url: "https://dapi.kakao.com/v2/local/search/address.json".into(),
            directions_url: "https://apis-navi.kakaomobility.com/v1/directions".into(),
            timeout_secs: 10,
            max_retries: 2,
            retry_base_delay_ms: 250,
            max_concurrency: 4,
        }
    }
}

/// Layer defaults, `config/dashboard.toml` (optional) and `JEONSE_*` env vars.
///
/// Nested keys use a double underscore: `JEONSE_KAKAO__API_KEY`.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .context("building dashboard configuration")?;

    settings
        .try_deserialize()
        .context("deserializing dashboard configuration")
}
