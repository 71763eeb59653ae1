//! City and purchase-date filters over order records.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;

use super::order_dataset::OrderDataset;
use super::record::OrderRecord;

/// Inclusive purchase-date range. A range whose start is after its end matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether the range is reversed (and therefore empty).
    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// A user's current narrowing of the dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    /// Cities to keep. Empty means every city.
    pub cities: BTreeSet<String>,

    /// Purchase-date window. `None` means no date restriction.
    pub date_range: Option<DateRange>,
}

impl FilterSelection {
    /// No city restriction, date range covering every purchase date in the dataset.
    pub fn full_span(dataset: &OrderDataset) -> Self {
        Self {
            cities: BTreeSet::new(),
            date_range: dataset
                .purchase_date_span()
                .map(|(start, end)| DateRange::new(start, end)),
        }
    }

    /// Restrict to the given cities.
    pub fn with_cities<I, S>(mut self, cities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cities = cities.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict to an inclusive purchase-date window.
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }
}

/// Keep records whose city is in `cities`. An empty set keeps everything.
pub fn filter_by_city(records: &[OrderRecord], cities: &BTreeSet<String>) -> Vec<OrderRecord> {
    if cities.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| r.customer_city.as_ref().is_some_and(|c| cities.contains(c)))
        .cloned()
        .collect()
}

/// Keep records purchased within `[start, end]`. Records without a purchase date are dropped.
pub fn filter_by_date_range(
    records: &[OrderRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<OrderRecord> {
    let range = DateRange::new(start, end);
    if range.is_reversed() {
        return Vec::new();
    }
    records
        .iter()
        .filter(|r| r.purchase_date().is_some_and(|d| range.contains(d)))
        .cloned()
        .collect()
}

/// City filter followed by the date filter.
pub fn compose(
    records: &[OrderRecord],
    cities: &BTreeSet<String>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<OrderRecord> {
    let by_city = filter_by_city(records, cities);
    filter_by_date_range(&by_city, start, end)
}
