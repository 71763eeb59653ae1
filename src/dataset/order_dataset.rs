//! Load an order table from CSV or parquet into an immutable dataset handle.

use anyhow::{Context, Result};
use arrow::array::{Array, ArrayRef, StringArray};
use arrow::compute::cast;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::path::Path;
use std::sync::Arc;

use super::filter::{self, FilterSelection};
use super::record::{parse_timestamp, OrderField, OrderRecord};
use crate::io::InputFormat;

/// Columns computed from other columns. Dropped on load, recomputed on export.
pub const DERIVED_COLUMNS: &[&str] = &["delivery_delay"];

/// Default number of rows per decoded batch.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// What a source column maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// One of the known order fields
    Field(OrderField),

    /// Pass-through column, stored at this slot of `OrderRecord::extra`
    Extra(usize),
}

/// A source column in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,

    /// Index of the column in the source schema
    pub position: usize,
}

/// Ordered source columns of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    columns: Vec<Column>,
    extra_count: usize,
}

impl ColumnLayout {
    /// Layout with just the eight known fields under their canonical names.
    pub fn standard() -> Self {
        let columns = OrderField::ALL
            .into_iter()
            .enumerate()
            .map(|(position, field)| Column {
                name: field.canonical_name().to_string(),
                kind: ColumnKind::Field(field),
                position,
            })
            .collect();
        Self {
            columns,
            extra_count: 0,
        }
    }

    /// Resolve source column names. Fails if any known field is missing.
    pub fn from_column_names<'a>(
        names: impl IntoIterator<Item = &'a str>,
        report: &mut LoadReport,
    ) -> Result<Self> {
        let mut columns = Vec::new();
        let mut extra_count = 0;

        for (position, name) in names.into_iter().enumerate() {
            if DERIVED_COLUMNS.iter().any(|derived| *derived == name) {
                tracing::debug!("Dropping derived column '{}' from source", name);
                report.dropped_columns.push(name.to_string());
                continue;
            }

            let kind = match OrderField::from_column_name(name) {
                Some(field) if !columns.iter().any(|c: &Column| c.kind == ColumnKind::Field(field)) => {
                    tracing::debug!("Column '{}' -> {:?}", name, field);
                    ColumnKind::Field(field)
                }
                _ => {
                    extra_count += 1;
                    ColumnKind::Extra(extra_count - 1)
                }
            };
            columns.push(Column {
                name: name.to_string(),
                kind,
                position,
            });
        }

        for field in OrderField::ALL {
            if !columns.iter().any(|c| c.kind == ColumnKind::Field(field)) {
                anyhow::bail!(
                    "Could not find column with any of these names: {:?}",
                    field.aliases()
                );
            }
        }

        Ok(Self {
            columns,
            extra_count,
        })
    }

    /// Columns in source order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in source order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Source name of a known field.
    pub fn column_name(&self, field: OrderField) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::Field(field))
            .map(|c| c.name.as_str())
    }

    /// Number of pass-through columns.
    pub fn extra_count(&self) -> usize {
        self.extra_count
    }

    /// Whether a column of this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Counters gathered while decoding a source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    /// Rows decoded
    pub rows: usize,

    /// Non-empty timestamp cells that could not be parsed
    pub unparseable_timestamps: usize,

    /// Non-empty price cells that could not be parsed to a finite number
    pub unparseable_prices: usize,

    /// Derived columns present in the source and dropped
    pub dropped_columns: Vec<String>,
}

impl std::fmt::Display for LoadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rows: {} | Unparseable timestamps: {} | Unparseable prices: {}",
            self.rows, self.unparseable_timestamps, self.unparseable_prices
        )?;
        if !self.dropped_columns.is_empty() {
            write!(f, " | Dropped derived columns: {}", self.dropped_columns.join(", "))?;
        }
        Ok(())
    }
}

/// Immutable order table. Filtering produces a new dataset sharing the layout.
#[derive(Debug, Clone)]
pub struct OrderDataset {
    layout: Arc<ColumnLayout>,
    records: Vec<OrderRecord>,
    report: LoadReport,
}

impl OrderDataset {
    /// Build a dataset from already decoded records.
    pub fn from_records(layout: Arc<ColumnLayout>, records: Vec<OrderRecord>) -> Self {
        let report = LoadReport {
            rows: records.len(),
            ..Default::default()
        };
        Self {
            layout,
            records,
            report,
        }
    }

    /// Load a dataset from a file, picking the decoder from `format`.
    pub fn load(path: &Path, format: InputFormat, batch_size: usize) -> Result<Arc<Self>> {
        let dataset = match format.resolve(path) {
            InputFormat::Parquet => Self::from_local_parquet(path, batch_size)?,
            _ => Self::from_local_csv(path, batch_size)?,
        };
        Ok(Arc::new(dataset))
    }

    /// Load from a local CSV file with a header row.
    pub fn from_local_csv(path: &Path, batch_size: usize) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
        Self::from_csv_reader(file, batch_size)
            .with_context(|| format!("Failed to load orders from {}", path.display()))
    }

    /// Load from any seekable CSV source with a header row.
    ///
    /// Every column is decoded as text; typed fields are parsed afterwards so
    /// that bad cells become absent values instead of failing the whole load.
    pub fn from_csv_reader<R: Read + Seek>(mut reader: R, batch_size: usize) -> Result<Self> {
        let (inferred, _) = Format::default()
            .with_header(true)
            .infer_schema(&mut reader, Some(0))
            .context("Failed to read CSV header")?;
        reader.rewind()?;

        let fields: Vec<Field> = inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect();
        let schema: SchemaRef = Arc::new(Schema::new(fields));

        let csv = ReaderBuilder::new(schema.clone())
            .with_header(true)
            .with_batch_size(batch_size)
            .build(reader)?;

        Self::from_batches(&schema, csv)
    }

    /// Load from a local parquet file.
    pub fn from_local_parquet(path: &Path, batch_size: usize) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open parquet file: {}", path.display()))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let schema = builder.schema().clone();
        let reader = builder.with_batch_size(batch_size).build()?;

        Self::from_batches(&schema, reader)
    }

    /// Load from parquet bytes.
    pub fn from_parquet_bytes(bytes: Bytes, batch_size: usize) -> Result<Self> {
        let builder = ParquetRecordBatchReaderBuilder::try_new(bytes)?;
        let schema = builder.schema().clone();
        let reader = builder.with_batch_size(batch_size).build()?;

        Self::from_batches(&schema, reader)
    }

    fn from_batches<I>(schema: &SchemaRef, batches: I) -> Result<Self>
    where
        I: IntoIterator<Item = std::result::Result<RecordBatch, ArrowError>>,
    {
        let mut report = LoadReport::default();
        let layout = ColumnLayout::from_column_names(
            schema.fields().iter().map(|f| f.name().as_str()),
            &mut report,
        )?;

        let mut records = Vec::new();
        for batch_result in batches {
            let batch = batch_result?;
            Self::extract_orders_from_batch(&batch, &layout, &mut records, &mut report)?;
        }
        report.rows = records.len();

        if report.unparseable_timestamps > 0 || report.unparseable_prices > 0 {
            tracing::warn!(
                "{} timestamp and {} price values could not be parsed and were treated as missing",
                report.unparseable_timestamps,
                report.unparseable_prices
            );
        }
        tracing::info!("Loaded {} orders ({} columns)", records.len(), layout.len());

        Ok(Self {
            layout: Arc::new(layout),
            records,
            report,
        })
    }

    /// Decode one record batch into order records.
    fn extract_orders_from_batch(
        batch: &RecordBatch,
        layout: &ColumnLayout,
        records: &mut Vec<OrderRecord>,
        report: &mut LoadReport,
    ) -> Result<()> {
        let text_arrays: Vec<ArrayRef> = layout
            .columns()
            .iter()
            .map(|column| {
                if column.position >= batch.num_columns() {
                    anyhow::bail!("Batch is missing column '{}'", column.name);
                }
                cast(batch.column(column.position).as_ref(), &DataType::Utf8)
                    .with_context(|| format!("Column '{}' cannot be read as text", column.name))
            })
            .collect::<Result<_>>()?;
        let texts: Vec<&StringArray> = text_arrays
            .iter()
            .map(|arr| {
                arr.as_any()
                    .downcast_ref::<StringArray>()
                    .context("Text cast did not produce a string array")
            })
            .collect::<Result<_>>()?;

        for row in 0..batch.num_rows() {
            let mut record = OrderRecord::new(String::new());
            record.extra = vec![None; layout.extra_count()];

            for (column, values) in layout.columns().iter().zip(&texts) {
                let cell = cell_text(values, row);
                match column.kind {
                    ColumnKind::Extra(slot) => record.extra[slot] = cell.map(str::to_string),
                    ColumnKind::Field(OrderField::OrderId) => {
                        record.order_id = cell.unwrap_or_default().to_string();
                    }
                    ColumnKind::Field(OrderField::Price) => {
                        record.price = cell.and_then(parse_price);
                        if record.price.is_none() && cell.is_some() {
                            report.unparseable_prices += 1;
                        }
                    }
                    ColumnKind::Field(OrderField::ProductCategory) => {
                        record.product_category = cell.map(str::to_string);
                    }
                    ColumnKind::Field(OrderField::CustomerCity) => {
                        record.customer_city = cell.map(str::to_string);
                    }
                    ColumnKind::Field(field) => {
                        let parsed = cell.and_then(parse_timestamp);
                        if parsed.is_none() && cell.is_some() {
                            report.unparseable_timestamps += 1;
                        }
                        record.set_timestamp(field, parsed);
                    }
                }
            }

            records.push(record);
        }

        Ok(())
    }

    /// All records.
    pub fn records(&self) -> &[OrderRecord] {
        &self.records
    }

    /// Column layout shared with every view of this dataset.
    pub fn layout(&self) -> &Arc<ColumnLayout> {
        &self.layout
    }

    /// Report from the load this dataset originates from.
    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First and last purchase date, ignoring records without one.
    pub fn purchase_date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(OrderRecord::purchase_date);
        let first = dates.next()?;
        Some(dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d))))
    }

    /// Distinct customer cities, sorted.
    pub fn unique_cities(&self) -> Vec<String> {
        self.records
            .iter()
            .filter_map(|r| r.customer_city.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Apply a filter selection, returning a new view.
    ///
    /// The view's report carries the view's row count; the other counters
    /// describe the load it originates from.
    pub fn filter(&self, selection: &FilterSelection) -> Self {
        let filtered = match selection.date_range {
            Some(range) => filter::compose(&self.records, &selection.cities, range.start, range.end),
            None => filter::filter_by_city(&self.records, &selection.cities),
        };

        tracing::info!(
            "Filtered {} -> {} orders (cities: {}, dates: {})",
            self.records.len(),
            filtered.len(),
            selection.cities.len(),
            selection
                .date_range
                .map_or_else(|| "all".to_string(), |r| r.to_string()),
        );

        let report = LoadReport {
            rows: filtered.len(),
            ..self.report.clone()
        };
        Self {
            layout: self.layout.clone(),
            records: filtered,
            report,
        }
    }
}

/// Finite price from cell text. `NaN` and infinities count as unparseable.
fn parse_price(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|p| p.is_finite())
}

/// Non-null, non-empty cell text.
fn cell_text(values: &StringArray, row: usize) -> Option<&str> {
    if values.is_null(row) {
        return None;
    }
    let value = values.value(row);
    (!value.is_empty()).then_some(value)
}
