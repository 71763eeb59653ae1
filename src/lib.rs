//! Order Insights
//!
//! Analytics core for an e-commerce order dashboard: loads an order table once,
//! computes the dashboard's headline values and chart series, and filters the
//! table by city and purchase date for CSV export.
//!
//! # Architecture
//!
//! The crate consists of:
//!
//! - **Dataset**: Column resolution, typed order records, and city/date filtering
//! - **I/O**: Input format detection and CSV export of filtered views
//! - **Pipeline**: Pure metric functions, dashboard summaries, and per-user sessions
//!
//! # Usage
//!
//! ```no_run
//! use order_insights::{run_summary, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::from_file(&"config.yaml".into())?;
//!     let report = run_summary(&config)?;
//!     if let Some(summary) = &report.filtered {
//!         println!("{}", summary);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod io;
pub mod pipeline;

pub use config::{Config, FilterConfig};
pub use dataset::{DateRange, FilterSelection, OrderDataset, OrderRecord};
pub use io::{export_csv, write_csv, ExportOptions, InputFormat};
pub use pipeline::{
    DashboardSession, DashboardSummary, DisplayValues, MetricsSettings, SummaryReport,
    SummaryScope,
};

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Load the order table named by the configuration.
pub fn load_dataset(config: &Config) -> Result<Arc<OrderDataset>> {
    tracing::info!("Loading orders from {}", config.input.path);
    OrderDataset::load(
        Path::new(&config.input.path),
        config.input.format,
        config.input.batch_size,
    )
}

/// Selection described by the configuration's `filter` section.
///
/// Without a filter, or without dates, the full purchase-date span is used.
pub fn configured_selection(config: &Config, dataset: &OrderDataset) -> FilterSelection {
    match &config.filter {
        Some(filter) => filter.to_selection(dataset.purchase_date_span()),
        None => FilterSelection::full_span(dataset),
    }
}

/// Build a session over `dataset` with the configured selection applied.
pub fn build_session(config: &Config, dataset: Arc<OrderDataset>) -> DashboardSession {
    let selection = configured_selection(config, &dataset);
    DashboardSession::with_selection(dataset, config.metrics.clone(), selection)
}

/// Load, filter, and summarize according to the configuration.
pub fn run_summary(config: &Config) -> Result<SummaryReport> {
    config.validate()?;

    let dataset = load_dataset(config)?;
    let session = build_session(config, dataset);
    let scope = config.summary.scope;

    let report = SummaryReport {
        unfiltered: scope
            .includes_unfiltered()
            .then(|| session.unfiltered_summary()),
        filtered: scope.includes_filtered().then(|| session.filtered_summary()),
    };

    if let Some(summary) = &report.unfiltered {
        tracing::info!("Unfiltered: {}", summary);
    }
    if let Some(summary) = &report.filtered {
        tracing::info!("Filtered: {}", summary);
    }

    if let Some(path) = &config.summary.output_path {
        report.save_to_file(path)?;
    }

    Ok(report)
}

/// Load, filter, and write the filtered view as CSV. Returns the rows written.
pub fn run_export(config: &Config) -> Result<usize> {
    config.validate()?;

    let dataset = load_dataset(config)?;
    let session = build_session(config, dataset);
    write_csv(
        session.filtered(),
        &config.export.options,
        Path::new(&config.export.output_path),
    )?;
    Ok(session.filtered().len())
}
