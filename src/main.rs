//! Order Insights CLI
//!
//! Summarize and export e-commerce order data.

use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_insights::{run_export, run_summary, Config, FilterConfig, SummaryScope};

#[derive(Parser)]
#[command(name = "order-insights")]
#[command(about = "Summarize and export e-commerce order data", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml", global = true)]
    config: PathBuf,

    /// Override the input data path
    #[arg(long, global = true)]
    input: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dashboard summaries (default if no command specified)
    Summary {
        /// Which summaries to compute
        #[arg(long, value_enum)]
        scope: Option<ScopeArg>,

        /// Save the summaries as JSON
        #[arg(long)]
        json: Option<String>,
    },

    /// Export the filtered orders as CSV
    Export {
        /// Keep only these cities (repeatable)
        #[arg(long = "city")]
        cities: Vec<String>,

        /// Inclusive first purchase date (YYYY-MM-DD)
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,

        /// Inclusive last purchase date (YYYY-MM-DD)
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<String>,

        /// Omit the derived delivery_delay column
        #[arg(long)]
        no_derived: bool,
    },

    /// Validate configuration
    Validate,

    /// Generate a sample configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Unfiltered,
    Filtered,
    Both,
}

impl From<ScopeArg> for SummaryScope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Unfiltered => SummaryScope::Unfiltered,
            ScopeArg::Filtered => SummaryScope::Filtered,
            ScopeArg::Both => SummaryScope::Both,
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        None => {
            summary_command(&cli.config, cli.input, None, None)?;
        }

        Some(Commands::Summary { scope, json }) => {
            summary_command(&cli.config, cli.input, scope, json)?;
        }

        Some(Commands::Export {
            cities,
            start,
            end,
            output,
            no_derived,
        }) => {
            let mut config = load_config(&cli.config, cli.input)?;

            if !cities.is_empty() || start.is_some() {
                let filter = config.filter.get_or_insert_with(FilterConfig::default);
                if !cities.is_empty() {
                    filter.cities = cities;
                }
                if start.is_some() {
                    filter.start_date = start;
                    filter.end_date = end;
                }
            }
            if let Some(output) = output {
                config.export.output_path = output;
            }
            if no_derived {
                config.export.options.include_derived = false;
            }

            let rows = run_export(&config)?;
            println!("Exported {} orders to {}", rows, config.export.output_path);
        }

        Some(Commands::Validate) => {
            validate_command(&cli.config, cli.input)?;
        }

        Some(Commands::GenerateConfig { output }) => {
            generate_config_command(output)?;
        }
    }

    Ok(())
}

/// Read the config file, falling back to defaults when it is absent but an input was given.
fn load_config(config_path: &PathBuf, input: Option<String>) -> Result<Config> {
    let mut config = if !config_path.exists() && input.is_some() {
        tracing::info!(
            "No configuration at {}, using defaults",
            config_path.display()
        );
        Config::default()
    } else {
        Config::from_file(config_path)?
    };

    // Apply overrides
    if let Some(input) = input {
        config.input.path = input;
    }
    Ok(config)
}

fn summary_command(
    config_path: &PathBuf,
    input: Option<String>,
    scope: Option<ScopeArg>,
    json: Option<String>,
) -> Result<()> {
    let mut config = load_config(config_path, input)?;
    if let Some(scope) = scope {
        config.summary.scope = scope.into();
    }
    if json.is_some() {
        config.summary.output_path = json;
    }

    let report = run_summary(&config)?;

    println!("\n=== Order Summary ===");
    for (label, summary) in [("All orders", &report.unfiltered), ("Filtered", &report.filtered)] {
        let Some(summary) = summary else { continue };
        let values = summary.display_values();
        println!("\n[{}]", label);
        println!("Orders: {}", summary.record_count);
        println!("Total sales: {}", values.total_sales);
        println!("Average delivery delay: {}", values.average_delivery_delay);
        if let Some(peak) = summary.peak {
            println!("Peak day: {} ({} orders)", peak.date, peak.count);
        }
        if let Some(top) = summary.top_categories.first() {
            println!("Top category: {} ({})", top.value, top.count);
        }
        if let Some(top) = summary.top_cities.first() {
            println!("Top city: {} ({})", top.value, top.count);
        }
    }
    println!("=====================\n");

    Ok(())
}

fn validate_command(config_path: &PathBuf, input: Option<String>) -> Result<()> {
    let config = load_config(config_path, input)?;
    config.validate()?;
    println!("Configuration is valid");
    Ok(())
}

fn generate_config_command(output: PathBuf) -> Result<()> {
    // Generate a commented YAML config
    let yaml = r#"# Order Insights Configuration

# === INPUT: Where to read orders from ===
input:
  # CSV with a header row, or a parquet file
  path: "data/all_data.csv"

  # One of: auto (by extension), csv, parquet
  format: auto

  # Rows decoded per batch
  batch_size: 8192

# === METRICS: Dashboard tunables ===
metrics:
  # Rolling average window over the daily order series (points, not calendar days)
  rolling_window: 7

  # Entries in the top categories / top cities tables
  top_n: 10

  # Bins in the delivery delay histogram
  histogram_bins: 30

# === EXPORT: Filtered CSV output ===
export:
  output_path: "filtered_data.csv"

  # Append the derived delivery_delay column (whole days)
  include_derived: true

# === SUMMARY: Which summaries to compute ===
summary:
  # One of: unfiltered, filtered, both
  scope: both

  # Save the summaries as JSON
  # output_path: "summary.json"

# === FILTER: Limit the filtered view (optional) ===
# Without a filter the view covers every city and the full purchase-date span.

# filter:
#   # Cities to keep (empty or omit = all cities)
#   cities: ["sao paulo", "rio de janeiro"]
#
#   # Inclusive purchase-date range; give both or neither
#   start_date: 2018-01-01
#   end_date: 2018-06-30
"#;

    std::fs::write(&output, yaml)?;
    println!("Generated sample configuration at: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_default() {
        // No subcommand - should default to Summary
        let cli = Cli::try_parse_from(["order-insights"]);
        assert!(cli.is_ok());
        assert!(cli.unwrap().command.is_none());
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::try_parse_from(["order-insights", "-c", "other.yaml"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_validate() {
        let cli = Cli::try_parse_from(["order-insights", "validate", "-c", "test.json"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_parse_summary_scope() {
        let cli = Cli::try_parse_from([
            "order-insights",
            "summary",
            "--scope",
            "filtered",
            "--json",
            "out.json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Summary { scope, json }) => {
                assert!(matches!(scope, Some(ScopeArg::Filtered)));
                assert_eq!(json.as_deref(), Some("out.json"));
            }
            _ => panic!("expected summary command"),
        }
    }

    #[test]
    fn test_cli_parse_export() {
        let cli = Cli::try_parse_from([
            "order-insights",
            "--input",
            "orders.csv",
            "export",
            "--city",
            "sao paulo",
            "--city",
            "curitiba",
            "--start",
            "2018-01-01",
            "--end",
            "2018-01-31",
            "--no-derived",
        ])
        .unwrap();
        assert_eq!(cli.input.as_deref(), Some("orders.csv"));
        match cli.command {
            Some(Commands::Export {
                cities,
                start,
                end,
                no_derived,
                ..
            }) => {
                assert_eq!(cities, vec!["sao paulo", "curitiba"]);
                assert_eq!(start, NaiveDate::from_ymd_opt(2018, 1, 1));
                assert_eq!(end, NaiveDate::from_ymd_opt(2018, 1, 31));
                assert!(no_derived);
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_cli_export_requires_both_dates() {
        let cli = Cli::try_parse_from(["order-insights", "export", "--start", "2018-01-01"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_load_config_defaults_with_input() {
        let config =
            load_config(&PathBuf::from("/nonexistent/config.yaml"), Some("x.csv".into())).unwrap();
        assert_eq!(config.input.path, "x.csv");
        assert!(load_config(&PathBuf::from("/nonexistent/config.yaml"), None).is_err());
    }

    #[test]
    fn test_generated_config_parses() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        generate_config_command(path.clone()).unwrap();
        let config = Config::from_file(&path).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.filter.is_none());
    }
}
