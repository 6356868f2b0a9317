use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::projection::{
    MapProjection, ProjectionError, DEFAULT_CENTER_LATITUDE, DEFAULT_CENTER_LONGITUDE,
    DEFAULT_SPAN_DEGREES,
};
use crate::http::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use crate::models::OutputMode;

pub const DEFAULT_CONFIG_FILE: &str = "geostamp";
pub const ENV_PREFIX: &str = "GEOSTAMP";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub latitude_span: f64,
    pub longitude_span: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_latitude: DEFAULT_CENTER_LATITUDE,
            center_longitude: DEFAULT_CENTER_LONGITUDE,
            latitude_span: DEFAULT_SPAN_DEGREES,
            longitude_span: DEFAULT_SPAN_DEGREES,
        }
    }
}

impl MapConfig {
    pub fn projection(&self) -> Result<MapProjection, ProjectionError> {
        MapProjection::new(
            self.center_latitude,
            self.center_longitude,
            self.latitude_span,
            self.longitude_span,
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default)]
    pub extraction_timeout_ms: Option<u64>,
}

impl IngestConfig {
    pub fn extraction_timeout(&self) -> Option<Duration> {
        self.extraction_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LookupProvider {
    #[default]
    Regions,
    Nominatim,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub provider: LookupProvider,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            provider: LookupProvider::default(),
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    #[default]
    Suffix,
    Overwrite,
    Export,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub mode: OutputKind,
    #[serde(default = "default_suffix")]
    pub suffix: String,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            mode: OutputKind::default(),
            suffix: default_suffix(),
            export_dir: None,
            snapshot_path: None,
        }
    }
}

impl OutputConfig {
    pub fn output_mode(&self) -> anyhow::Result<OutputMode> {
        match self.mode {
            OutputKind::Suffix => Ok(OutputMode::Suffix(self.suffix.clone())),
            OutputKind::Overwrite => Ok(OutputMode::Overwrite),
            OutputKind::Export => match &self.export_dir {
                Some(dir) => Ok(OutputMode::ExportTo(dir.clone())),
                None => anyhow::bail!("output.mode = \"export\" needs output.export_dir"),
            },
        }
    }
}

fn default_endpoint() -> String {
    String::from(DEFAULT_ENDPOINT)
}

fn default_user_agent() -> String {
    String::from(DEFAULT_USER_AGENT)
}

fn default_suffix() -> String {
    String::from("_geo")
}

/// Loads configuration from `path` (or `geostamp.{toml,json,yaml}` in the
/// working directory when present) and `GEOSTAMP__SECTION__KEY` variables.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name(DEFAULT_CONFIG_FILE).required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let cfg: AppConfig = settings.build()?.try_deserialize()?;
    cfg.map.projection()?;
    Ok(cfg)
}
