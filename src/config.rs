use crate::estimation::channel::{ChannelConfig, default_channels};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";
pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_REFERENCE_CHANNEL: &str = "PIR";
pub const DEFAULT_CHART_WIDTH: u32 = 1200;
pub const DEFAULT_CHART_HEIGHT: u32 = 400;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub app: AppSection,
    pub logging: LoggingSection,
    pub dataset: DatasetSection,
    #[serde(default)]
    pub server: Option<ServerSection>,
    #[serde(default)]
    pub report: Option<ReportSection>,
    #[serde(default)]
    pub charts: Option<ChartsSection>,
    #[serde(default)]
    pub channels: Option<Vec<ChannelConfig>>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSection {
    pub name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSection {
    pub level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetSection {
    pub path: PathBuf,
    /// Keep only the first rows after sorting (the dashboard uses 4201)
    pub max_rows: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSection {
    /// Port to listen on (default: 5000)
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportSection {
    /// Channel whose detections bound the time slider (default: "PIR")
    pub reference_channel: Option<String>,
    /// Only the first N detections per channel are charted and used for the slider
    pub display_limit: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartsSection {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_default() -> Result<Config, ConfigError> {
    load_from_path(DEFAULT_CONFIG_PATH)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    fn validate(&self) -> Result<(), ConfigError> {
        let channels = self.channels();
        if channels.is_empty() {
            return Err(ConfigError::Invalid("[[channels]] must not be empty".into()));
        }

        let mut names = HashSet::new();
        for channel in &channels {
            if !names.insert(channel.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate channel name `{}`",
                    channel.name
                )));
            }
        }

        let reference = self.reference_channel();
        if !names.contains(reference) {
            return Err(ConfigError::Invalid(format!(
                "reference channel `{reference}` is not configured"
            )));
        }

        if self.chart_size().0 == 0 || self.chart_size().1 == 0 {
            return Err(ConfigError::Invalid("chart size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset.path
    }

    pub fn max_rows(&self) -> Option<usize> {
        self.dataset.max_rows
    }

    /// Returns the configured channel table, or the stock PIR/light/sound/CO2 set.
    pub fn channels(&self) -> Vec<ChannelConfig> {
        match &self.channels {
            Some(channels) => channels.clone(),
            None => default_channels(),
        }
    }

    pub fn reference_channel(&self) -> &str {
        self.report
            .as_ref()
            .and_then(|r| r.reference_channel.as_deref())
            .unwrap_or(DEFAULT_REFERENCE_CHANNEL)
    }

    pub fn display_limit(&self) -> Option<usize> {
        self.report.as_ref().and_then(|r| r.display_limit)
    }

    /// Returns the server port (default: 5000)
    pub fn server_port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_SERVER_PORT)
    }

    /// Chart raster size in pixels as `(width, height)`
    pub fn chart_size(&self) -> (u32, u32) {
        let charts = self.charts.as_ref();
        (
            charts.and_then(|c| c.width).unwrap_or(DEFAULT_CHART_WIDTH),
            charts.and_then(|c| c.height).unwrap_or(DEFAULT_CHART_HEIGHT),
        )
    }

    pub fn log_level(&self) -> tracing::Level {
        self.logging.level.parse().unwrap_or(tracing::Level::INFO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::channel::CrossingRule;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const MINIMAL: &str = r#"
[app]
name = "occupancy-latency"

[logging]
level = "info"

[dataset]
path = "data/sample_occupancy.csv"
"#;

    fn write_temp(label: &str, contents: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();
        let path = std::env::temp_dir().join(format!("occupancy-config-{label}-{unique}.toml"));
        fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    fn default_config_includes_four_channels() -> Result<(), Box<dyn std::error::Error>> {
        let config = load_default()?;
        assert_eq!(config.channels().len(), 4);
        assert_eq!(config.reference_channel(), "PIR");
        assert_eq!(config.max_rows(), Some(4201));
        Ok(())
    }

    #[test]
    fn missing_optional_sections_use_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp("minimal", MINIMAL)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        assert_eq!(result.server_port(), DEFAULT_SERVER_PORT);
        assert_eq!(result.chart_size(), (1200, 400));
        assert_eq!(result.display_limit(), None);
        assert_eq!(result.channels(), default_channels());
        assert_eq!(result.log_level(), tracing::Level::INFO);
        Ok(())
    }

    #[test]
    fn channel_table_overrides_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!(
            r#"{MINIMAL}
[report]
reference_channel = "Motion"
display_limit = 3000

[[channels]]
name = "Motion"
column = "S7_PIR"
rule = "edge_change"
half_width = 20
"#
        );
        let path = write_temp("channels", &contents)?;

        let result = load_from_path(&path)?;
        let _ = fs::remove_file(&path);

        let channels = result.channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].rule, CrossingRule::EdgeChange { half_width: 20 });
        assert_eq!(result.reference_channel(), "Motion");
        assert_eq!(result.display_limit(), Some(3000));
        Ok(())
    }

    #[test]
    fn unknown_reference_channel_is_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!("{MINIMAL}\n[report]\nreference_channel = \"Radar\"\n");
        let path = write_temp("reference", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn duplicate_channel_names_are_invalid() -> Result<(), Box<dyn std::error::Error>> {
        let contents = format!(
            r#"{MINIMAL}
[[channels]]
name = "PIR"
column = "S6_PIR"
rule = "edge_change"

[[channels]]
name = "PIR"
column = "S7_PIR"
rule = "edge_change"
"#
        );
        let path = write_temp("duplicate", &contents)?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid(_))));
        Ok(())
    }

    #[test]
    fn missing_config_file_returns_read_error() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!("occupancy-config-missing-{unique}.toml"));

        let result = load_from_path(&path);

        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn invalid_toml_returns_parse_error() -> Result<(), Box<dyn std::error::Error>> {
        let path = write_temp("invalid", "not = [valid")?;

        let result = load_from_path(&path);
        let _ = fs::remove_file(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        Ok(())
    }
}
