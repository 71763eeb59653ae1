//! Dashboard summaries and their display formatting.

use serde::{Deserialize, Serialize};

use super::metrics::{
    self, DailyCount, FrequencyEntry, GroupMean, HistogramBin, RollingPoint,
};
use crate::dataset::{floor_days, CategoricalField, OrderRecord};

/// Tunables for summary computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSettings {
    /// Rolling average window, in series points
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,

    /// Entries kept in top-N frequency tables
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Bins in the delivery delay histogram
    #[serde(default = "default_histogram_bins")]
    pub histogram_bins: usize,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            top_n: default_top_n(),
            histogram_bins: default_histogram_bins(),
        }
    }
}

fn default_rolling_window() -> usize { 7 }
fn default_top_n() -> usize { 10 }
fn default_histogram_bins() -> usize { 30 }

/// Which record set a summary was computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryScope {
    Unfiltered,
    Filtered,
    #[default]
    Both,
}

impl SummaryScope {
    pub fn includes_unfiltered(self) -> bool {
        matches!(self, SummaryScope::Unfiltered | SummaryScope::Both)
    }

    pub fn includes_filtered(self) -> bool {
        matches!(self, SummaryScope::Filtered | SummaryScope::Both)
    }
}

/// Every value and series the dashboard shows, computed from one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub record_count: usize,
    pub total_sales: f64,
    /// Mean delivered-minus-estimated, in whole days (floored)
    pub average_delivery_delay_days: Option<i64>,
    pub daily_orders: Vec<DailyCount>,
    pub rolling_average: Vec<RollingPoint>,
    pub peak: Option<DailyCount>,
    pub top_categories: Vec<FrequencyEntry>,
    pub top_cities: Vec<FrequencyEntry>,
    pub delivery_delays: Vec<i64>,
    pub delay_histogram: Vec<HistogramBin>,
    /// Mean of the per-record day delays (the histogram's marker line)
    pub mean_delay_days: Option<f64>,
    pub approval_delivery_by_date: Vec<GroupMean>,
}

impl DashboardSummary {
    /// Compute every aggregate from scratch.
    pub fn compute(records: &[OrderRecord], settings: &MetricsSettings) -> Self {
        let daily_orders = metrics::daily_order_counts(records);
        let rolling_average = metrics::rolling_average(&daily_orders, settings.rolling_window);
        let peak = metrics::peak(&daily_orders);
        let delivery_delays = metrics::delivery_delay_distribution(records);
        let delay_histogram = metrics::histogram(&delivery_delays, settings.histogram_bins);
        let mean_delay_days = metrics::mean(&delivery_delays);

        Self {
            record_count: records.len(),
            total_sales: metrics::total_sales(records),
            average_delivery_delay_days: metrics::average_delivery_delay(records).map(floor_days),
            daily_orders,
            rolling_average,
            peak,
            top_categories: metrics::top_n_by_frequency(
                records,
                CategoricalField::ProductCategory,
                settings.top_n,
            ),
            top_cities: metrics::top_n_by_frequency(
                records,
                CategoricalField::CustomerCity,
                settings.top_n,
            ),
            delivery_delays,
            delay_histogram,
            mean_delay_days,
            approval_delivery_by_date: metrics::approval_delivery_by_date(records),
        }
    }

    /// Formatted headline values.
    pub fn display_values(&self) -> DisplayValues {
        DisplayValues {
            total_sales: format_currency(self.total_sales),
            average_delivery_delay: format_days(self.average_delivery_delay_days),
        }
    }

    /// Save the summary as pretty JSON.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Summary saved to {}", path);
        Ok(())
    }
}

impl std::fmt::Display for DashboardSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.display_values();
        write!(
            f,
            "Orders: {} | Sales: {} | Avg delay: {} | Days: {}",
            self.record_count,
            values.total_sales,
            values.average_delivery_delay,
            self.daily_orders.len(),
        )?;
        if let Some(peak) = self.peak {
            write!(f, " | Peak: {} orders on {}", peak.count, peak.date)?;
        }
        Ok(())
    }
}

/// Summaries selected by a [`SummaryScope`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct SummaryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unfiltered: Option<DashboardSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<DashboardSummary>,
}

impl SummaryReport {
    /// Save the report as pretty JSON, creating the parent directory if needed.
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        if let Some(parent) = std::path::Path::new(path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Summary report saved to {}", path);
        Ok(())
    }
}

/// Headline metrics formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayValues {
    pub total_sales: String,
    pub average_delivery_delay: String,
}

/// US-dollar amount with thousands separators, e.g. `$1,234.56` or `-$5.00`.
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let dollars = (cents / 100).to_string();

    let mut grouped = String::with_capacity(dollars.len() + dollars.len() / 3);
    for (i, ch) in dollars.chars().enumerate() {
        if i > 0 && (dollars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// `<N> days`, or `n/a` when there is nothing to average.
pub fn format_days(days: Option<i64>) -> String {
    match days {
        Some(d) => format!("{} days", d),
        None => "n/a".to_string(),
    }
}
