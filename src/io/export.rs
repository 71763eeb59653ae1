//! CSV export of an order dataset view.

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, StringArray};
use arrow::csv::WriterBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::dataset::{ColumnKind, OrderDataset, OrderRecord};

/// Name of the derived delay column appended on export.
pub const DELIVERY_DELAY_COLUMN: &str = "delivery_delay";

/// Options controlling the exported table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Append the derived `delivery_delay` column (whole days)
    #[serde(default = "default_true")]
    pub include_derived: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_derived: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Serialize a dataset view to CSV with a header row and no index column.
pub fn export_csv(dataset: &OrderDataset, options: &ExportOptions) -> Result<Vec<u8>> {
    let batch = to_record_batch(dataset, options)?;

    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buffer);
        writer.write(&batch).context("Failed to encode CSV")?;
    }
    Ok(buffer)
}

/// Write a dataset view to a CSV file. Returns the number of bytes written.
pub fn write_csv(dataset: &OrderDataset, options: &ExportOptions, path: &Path) -> Result<usize> {
    let bytes = export_csv(dataset, options)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;

    tracing::info!(
        "Exported {} orders ({} bytes) to {}",
        dataset.len(),
        bytes.len(),
        path.display()
    );
    Ok(bytes.len())
}

/// Build a text-only record batch in source column order.
fn to_record_batch(dataset: &OrderDataset, options: &ExportOptions) -> Result<RecordBatch> {
    let layout = dataset.layout();
    let records = dataset.records();

    let mut fields = Vec::with_capacity(layout.len() + 1);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(layout.len() + 1);

    for column in layout.columns() {
        let values: Vec<Option<String>> = records
            .iter()
            .map(|record| cell_value(record, column.kind))
            .collect();
        fields.push(Field::new(&column.name, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(values)));
    }

    if options.include_derived && !layout.contains(DELIVERY_DELAY_COLUMN) {
        let delays: Vec<Option<String>> = records
            .iter()
            .map(|r| r.delivery_delay_days().map(|d| d.to_string()))
            .collect();
        fields.push(Field::new(DELIVERY_DELAY_COLUMN, DataType::Utf8, true));
        columns.push(Arc::new(StringArray::from(delays)));
    }

    let schema = Arc::new(Schema::new(fields));
    Ok(RecordBatch::try_new(schema, columns)?)
}

fn cell_value(record: &OrderRecord, kind: ColumnKind) -> Option<String> {
    match kind {
        ColumnKind::Field(field) => record.field_text(field),
        ColumnKind::Extra(slot) => record.extra.get(slot).cloned().flatten(),
    }
}
