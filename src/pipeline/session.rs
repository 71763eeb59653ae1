//! Per-user dashboard state driven by explicit filter-change events.

use anyhow::Result;
use std::sync::Arc;

use super::summary::{DashboardSummary, DisplayValues, MetricsSettings, SummaryScope};
use crate::dataset::{FilterSelection, OrderDataset};
use crate::io::{export_csv, ExportOptions};

/// One user's view over a shared dataset.
///
/// The dataset is held by `Arc` and never mutated; each filter change builds
/// a fresh filtered view owned by this session.
pub struct DashboardSession {
    dataset: Arc<OrderDataset>,
    settings: MetricsSettings,
    selection: FilterSelection,
    view: OrderDataset,
}

impl DashboardSession {
    /// Start a session with no city restriction and the full purchase-date span.
    pub fn new(dataset: Arc<OrderDataset>, settings: MetricsSettings) -> Self {
        let selection = FilterSelection::full_span(&dataset);
        Self::with_selection(dataset, settings, selection)
    }

    /// Start a session with an initial selection, filtering once.
    pub fn with_selection(
        dataset: Arc<OrderDataset>,
        settings: MetricsSettings,
        selection: FilterSelection,
    ) -> Self {
        let view = dataset.filter(&selection);
        Self {
            dataset,
            settings,
            selection,
            view,
        }
    }

    /// Replace the selection and recompute the filtered view.
    pub fn on_filter_changed(&mut self, selection: FilterSelection) -> &OrderDataset {
        if selection.date_range.is_some_and(|r| r.is_reversed()) {
            tracing::warn!(
                "Date range {} starts after it ends; the filtered view is empty",
                selection.date_range.map_or_else(String::new, |r| r.to_string())
            );
        }
        self.view = self.dataset.filter(&selection);
        self.selection = selection;
        &self.view
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    /// The shared, unfiltered dataset.
    pub fn dataset(&self) -> &Arc<OrderDataset> {
        &self.dataset
    }

    /// The current filtered view.
    pub fn filtered(&self) -> &OrderDataset {
        &self.view
    }

    /// Aggregates over the whole dataset, ignoring the selection.
    pub fn unfiltered_summary(&self) -> DashboardSummary {
        DashboardSummary::compute(self.dataset.records(), &self.settings)
    }

    /// Aggregates over the current filtered view.
    pub fn filtered_summary(&self) -> DashboardSummary {
        DashboardSummary::compute(self.view.records(), &self.settings)
    }

    /// Headline values for a scope. `Both` reports the filtered view.
    pub fn display_values(&self, scope: SummaryScope) -> DisplayValues {
        match scope {
            SummaryScope::Unfiltered => self.unfiltered_summary().display_values(),
            _ => self.filtered_summary().display_values(),
        }
    }

    /// CSV bytes of the current filtered view.
    pub fn export_filtered(&self, options: &ExportOptions) -> Result<Vec<u8>> {
        export_csv(&self.view, options)
    }
}
