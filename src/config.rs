//! Configuration for the order insights pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::dataset::{FilterSelection, DEFAULT_BATCH_SIZE};
use crate::io::{ExportOptions, InputFormat};
use crate::pipeline::{MetricsSettings, SummaryScope};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input configuration
    #[serde(default)]
    pub input: InputConfig,

    /// Metric tunables
    #[serde(default)]
    pub metrics: MetricsSettings,

    /// Optional filter applied to the filtered summary and exports
    #[serde(default)]
    pub filter: Option<FilterConfig>,

    /// Export configuration
    #[serde(default)]
    pub export: ExportConfig,

    /// Summary output configuration
    #[serde(default)]
    pub summary: SummaryConfig,
}

/// Input data configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Path to the order table (CSV or parquet)
    #[serde(default = "default_input_path")]
    pub path: String,

    /// File format; `auto` decides from the extension
    #[serde(default)]
    pub format: InputFormat,

    /// Rows per decoded batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            path: default_input_path(),
            format: InputFormat::Auto,
            batch_size: default_batch_size(),
        }
    }
}

/// City and date filter.
///
/// If not specified, the filtered view covers every city and the full date span.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Cities to keep. Empty keeps all.
    #[serde(default)]
    pub cities: Vec<String>,

    /// Inclusive first purchase date
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// Inclusive last purchase date
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl FilterConfig {
    /// Convert to a selection. Without dates, `default_span` supplies the range.
    pub fn to_selection(&self, default_span: Option<(NaiveDate, NaiveDate)>) -> FilterSelection {
        let selection = FilterSelection::default().with_cities(self.cities.iter().cloned());
        match (self.start_date, self.end_date, default_span) {
            (Some(start), Some(end), _) | (None, None, Some((start, end))) => {
                selection.with_date_range(start, end)
            }
            _ => selection,
        }
    }
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Destination CSV file
    #[serde(default = "default_export_path")]
    pub output_path: String,

    #[serde(flatten)]
    pub options: ExportOptions,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_path: default_export_path(),
            options: ExportOptions::default(),
        }
    }
}

/// Summary output configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Which summaries to compute
    #[serde(default)]
    pub scope: SummaryScope,

    /// Optional path to save the summaries as JSON
    #[serde(default)]
    pub output_path: Option<String>,
}

impl Config {
    /// Load configuration from a YAML or JSON file.
    /// Format is auto-detected from file extension (.yaml, .yml, or .json).
    pub fn from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config: Config = match ext {
            "yaml" | "yml" => serde_yaml::from_str(&contents)?,
            "json" => serde_json::from_str(&contents)?,
            _ => serde_yaml::from_str(&contents)?,
        };
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input.path.trim().is_empty() {
            anyhow::bail!("Input path must not be empty");
        }
        if self.input.batch_size == 0 {
            anyhow::bail!("Batch size must be > 0");
        }
        if self.metrics.rolling_window == 0 {
            anyhow::bail!("Rolling window must be > 0");
        }
        if self.metrics.histogram_bins == 0 {
            anyhow::bail!("Histogram bins must be > 0");
        }
        if self.export.output_path.trim().is_empty() {
            anyhow::bail!("Export output path must not be empty");
        }

        if let Some(filter) = &self.filter {
            match (filter.start_date, filter.end_date) {
                (Some(start), Some(end)) if start > end => {
                    tracing::warn!(
                        "Filter start date {} is after end date {}; the filtered view will be empty",
                        start,
                        end
                    );
                }
                (Some(_), None) | (None, Some(_)) => {
                    anyhow::bail!("Filter start_date and end_date must be given together");
                }
                _ => {}
            }
        }
        Ok(())
    }
}

// Default value functions for serde
fn default_input_path() -> String { "data/all_data.csv".to_string() }
fn default_batch_size() -> usize { DEFAULT_BATCH_SIZE }
fn default_export_path() -> String { "filtered_data.csv".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::date;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.input.path, "data/all_data.csv");
        assert_eq!(config.input.format, InputFormat::Auto);
        assert_eq!(config.metrics.rolling_window, 7);
        assert_eq!(config.metrics.top_n, 10);
        assert_eq!(config.metrics.histogram_bins, 30);
        assert!(config.export.options.include_derived);
        assert_eq!(config.summary.scope, SummaryScope::Both);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
input:
  path: orders.parquet
  format: parquet
metrics:
  rolling_window: 3
filter:
  cities: [sao paulo, curitiba]
  start_date: 2018-01-01
  end_date: 2018-03-31
export:
  output_path: out/filtered.csv
  include_derived: false
summary:
  scope: filtered
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.input.format, InputFormat::Parquet);
        assert_eq!(config.input.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.metrics.rolling_window, 3);
        assert_eq!(config.metrics.top_n, 10);
        let filter = config.filter.as_ref().unwrap();
        assert_eq!(filter.cities, vec!["sao paulo", "curitiba"]);
        assert_eq!(filter.start_date, Some(date("2018-01-01")));
        assert!(!config.export.options.include_derived);
        assert_eq!(config.summary.scope, SummaryScope::Filtered);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config = Config::from_json(r#"{"input": {"path": "x.csv"}}"#).unwrap();
        assert_eq!(config.input.path, "x.csv");
        assert!(config.filter.is_none());
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = Config::default();
        let yaml = config.to_yaml().unwrap();
        let parsed = Config::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.input.path, config.input.path);
        assert_eq!(parsed.metrics, config.metrics);
    }

    #[test]
    fn test_config_validation_invalid() {
        let mut config = Config::default();
        config.metrics.rolling_window = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.batch_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.histogram_bins = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.path = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_half_open_range() {
        let mut config = Config::default();
        config.filter = Some(FilterConfig {
            cities: vec![],
            start_date: Some(date("2018-01-01")),
            end_date: None,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_reversed_range_allowed() {
        let mut config = Config::default();
        config.filter = Some(FilterConfig {
            cities: vec![],
            start_date: Some(date("2018-02-01")),
            end_date: Some(date("2018-01-01")),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_filter_to_selection() {
        let span = Some((date("2018-01-01"), date("2018-12-31")));
        let filter = FilterConfig {
            cities: vec!["lisbon".to_string()],
            start_date: None,
            end_date: None,
        };
        let selection = filter.to_selection(span);
        assert!(selection.cities.contains("lisbon"));
        assert_eq!(selection.date_range.unwrap().end, date("2018-12-31"));

        let explicit = FilterConfig {
            cities: vec![],
            start_date: Some(date("2018-03-01")),
            end_date: Some(date("2018-03-02")),
        };
        let selection = explicit.to_selection(span);
        assert_eq!(selection.date_range.unwrap().start, date("2018-03-01"));

        assert!(FilterConfig::default().to_selection(None).date_range.is_none());
    }
}
