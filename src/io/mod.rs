//! Input format detection and CSV export.

mod export;
mod source;


pub use export::{export_csv, write_csv, ExportOptions, DELIVERY_DELAY_COLUMN};
pub use source::InputFormat;
