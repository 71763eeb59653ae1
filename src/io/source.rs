//! Input source format detection.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// File format of the order table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Decide from the file extension
    #[default]
    Auto,
    Csv,
    Parquet,
}

impl InputFormat {
    /// Resolve `Auto` against a path. `.parquet` and `.pq` are parquet, everything else CSV.
    pub fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                match ext.as_str() {
                    "parquet" | "pq" => InputFormat::Parquet,
                    _ => InputFormat::Csv,
                }
            }
            explicit => explicit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_auto() {
        assert_eq!(InputFormat::Auto.resolve(Path::new("data/all_data.csv")), InputFormat::Csv);
        assert_eq!(InputFormat::Auto.resolve(Path::new("orders.parquet")), InputFormat::Parquet);
        assert_eq!(InputFormat::Auto.resolve(Path::new("orders.PQ")), InputFormat::Parquet);
        assert_eq!(InputFormat::Auto.resolve(Path::new("orders")), InputFormat::Csv);
    }

    #[test]
    fn test_resolve_explicit_wins() {
        assert_eq!(InputFormat::Csv.resolve(Path::new("orders.parquet")), InputFormat::Csv);
        assert_eq!(InputFormat::Parquet.resolve(Path::new("orders.txt")), InputFormat::Parquet);
    }

    #[test]
    fn test_deserialize_lowercase() {
        let format: InputFormat = serde_json::from_str("\"parquet\"").unwrap();
        assert_eq!(format, InputFormat::Parquet);
    }
}
