//! Metrics, summaries, and session orchestration.

pub mod metrics;
mod session;
mod summary;

pub use metrics::{DailyCount, FrequencyEntry, GroupMean, HistogramBin, RollingPoint};
pub use session::DashboardSession;
pub use summary::{
    format_currency, format_days, DashboardSummary, DisplayValues, MetricsSettings, SummaryReport,
    SummaryScope,
};
