//! Order dataset loading, records, and filtering.

mod filter;
mod order_dataset;
mod record;

pub use filter::{compose, filter_by_city, filter_by_date_range, DateRange, FilterSelection};
pub use order_dataset::{
    Column, ColumnKind, ColumnLayout, LoadReport, OrderDataset, DEFAULT_BATCH_SIZE,
    DERIVED_COLUMNS,
};
pub use record::{
    floor_days, format_timestamp, parse_timestamp, CategoricalField, OrderField, OrderRecord,
    Timestamp,
};

#[cfg(test)]
pub(crate) use order_dataset::tests::{sample_dataset, SAMPLE_CSV};
#[cfg(test)]
pub(crate) use record::tests::{date, ts};
