//! Aggregate metrics over order records.
//!
//! Every function accepts an empty slice and returns a zero, an empty series,
//! or `None` rather than failing.

use chrono::{NaiveDate, TimeDelta};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::dataset::{CategoricalField, OrderRecord};

/// Orders placed on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// A point of a moving average. `value` is `None` until the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RollingPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Occurrences of one categorical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: usize,
}

/// Mean of a per-record duration within one date group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupMean {
    pub date: NaiveDate,
    pub mean: Option<f64>,
}

/// One equal-width histogram bin. `upper` is exclusive except for the last bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Sum of all present prices.
pub fn total_sales(records: &[OrderRecord]) -> f64 {
    records.iter().filter_map(|r| r.price).sum()
}

/// Mean of delivered minus estimated over records that have both.
pub fn average_delivery_delay(records: &[OrderRecord]) -> Option<TimeDelta> {
    let (sum_ms, count) = records
        .iter()
        .filter_map(OrderRecord::delivery_delay)
        .fold((0i128, 0i128), |(sum, n), delay| {
            (sum + i128::from(delay.num_milliseconds()), n + 1)
        });
    if count == 0 {
        return None;
    }
    Some(TimeDelta::milliseconds((sum_ms.div_euclid(count)) as i64))
}

/// Orders per purchase date, oldest first. Records without a purchase date are skipped.
pub fn daily_order_counts(records: &[OrderRecord]) -> Vec<DailyCount> {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in records.iter().filter_map(OrderRecord::purchase_date) {
        *counts.entry(date).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Trailing simple moving average over consecutive series points.
///
/// Gaps between dates are not filled: the window spans points, not calendar days.
pub fn rolling_average(series: &[DailyCount], window: usize) -> Vec<RollingPoint> {
    let mut running = 0usize;
    series
        .iter()
        .enumerate()
        .map(|(i, point)| {
            running += point.count;
            if window > 0 && i >= window {
                running -= series[i - window].count;
            }
            let value = (window > 0 && i + 1 >= window).then(|| running as f64 / window as f64);
            RollingPoint {
                date: point.date,
                value,
            }
        })
        .collect()
}

/// Busiest day. Ties go to the earliest date.
pub fn peak(series: &[DailyCount]) -> Option<DailyCount> {
    series.iter().copied().fold(None, |best, point| match best {
        Some(b) if b.count >= point.count => Some(b),
        _ => Some(point),
    })
}

/// Most frequent values of a categorical field, at most `n`.
///
/// Sorted by count descending; equal counts keep first-seen order. Absent values are skipped.
pub fn top_n_by_frequency(
    records: &[OrderRecord],
    field: CategoricalField,
    n: usize,
) -> Vec<FrequencyEntry> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for value in records.iter().filter_map(|r| r.categorical(field)) {
        *counts.entry(value).or_default() += 1;
    }

    let mut entries: Vec<FrequencyEntry> = counts
        .into_iter()
        .map(|(value, count)| FrequencyEntry {
            value: value.to_string(),
            count,
        })
        .collect();
    // sort_by is stable, so insertion order breaks ties
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(n);
    entries
}

/// Per-record delivery delay in whole days, for records with both timestamps.
pub fn delivery_delay_distribution(records: &[OrderRecord]) -> Vec<i64> {
    records
        .iter()
        .filter_map(OrderRecord::delivery_delay_days)
        .collect()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64)
}

/// Equal-width histogram between the minimum and maximum value.
///
/// When every value is equal the range is widened by half a unit on each side.
pub fn histogram(values: &[i64], bins: usize) -> Vec<HistogramBin> {
    if bins == 0 || values.is_empty() {
        return Vec::new();
    }

    let min = values.iter().copied().min().unwrap_or_default() as f64;
    let max = values.iter().copied().max().unwrap_or_default() as f64;
    let (lower, upper) = if min == max {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };
    let width = (upper - lower) / bins as f64;

    let mut counts = vec![0usize; bins];
    for &value in values {
        let offset = ((value as f64 - lower) / width).floor() as usize;
        counts[offset.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            lower: lower + width * i as f64,
            upper: if i + 1 == bins {
                upper
            } else {
                lower + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

/// Group records by a date key and average a per-record duration (in days) in each group.
///
/// Records without a key are skipped. A group whose durations are all absent
/// is still reported, with a `None` mean.
pub fn mean_duration_by_group<K, D>(records: &[OrderRecord], group_key: K, duration: D) -> Vec<GroupMean>
where
    K: Fn(&OrderRecord) -> Option<NaiveDate>,
    D: Fn(&OrderRecord) -> Option<i64>,
{
    let mut groups: BTreeMap<NaiveDate, (i64, usize)> = BTreeMap::new();
    for record in records {
        let Some(key) = group_key(record) else {
            continue;
        };
        let entry = groups.entry(key).or_insert((0, 0));
        if let Some(days) = duration(record) {
            entry.0 += days;
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(date, (sum, n))| GroupMean {
            date,
            mean: (n > 0).then(|| sum as f64 / n as f64),
        })
        .collect()
}

/// Average approval-to-delivery days, grouped by approval date.
pub fn approval_delivery_by_date(records: &[OrderRecord]) -> Vec<GroupMean> {
    mean_duration_by_group(
        records,
        OrderRecord::approval_date,
        OrderRecord::approval_to_delivery_days,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{date, ts};

    fn order(purchased: &str, price: f64) -> OrderRecord {
        let mut record = OrderRecord::new(purchased);
        record.purchased_at = Some(ts(purchased));
        record.price = Some(price);
        record
    }

    fn delivered(estimated: &str, delivered: &str) -> OrderRecord {
        let mut record = OrderRecord::new("d");
        record.estimated_delivery_at = Some(ts(estimated));
        record.delivered_at = Some(ts(delivered));
        record
    }

    fn categorized(category: Option<&str>) -> OrderRecord {
        let mut record = OrderRecord::new("c");
        record.product_category = category.map(str::to_string);
        record
    }

    fn series(counts: &[usize]) -> Vec<DailyCount> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &count)| DailyCount {
                date: date("2024-01-01") + TimeDelta::days(i as i64),
                count,
            })
            .collect()
    }

    #[test]
    fn test_worked_example() {
        let records = vec![
            order("2024-01-01 09:00:00", 10.0),
            order("2024-01-01 17:00:00", 20.0),
            order("2024-01-02 12:00:00", 30.0),
        ];
        assert_eq!(total_sales(&records), 60.0);
        assert_eq!(
            daily_order_counts(&records),
            vec![
                DailyCount { date: date("2024-01-01"), count: 2 },
                DailyCount { date: date("2024-01-02"), count: 1 },
            ]
        );
    }

    #[test]
    fn test_total_sales_empty_and_missing_prices() {
        assert_eq!(total_sales(&[]), 0.0);

        let mut no_price = order("2024-01-01 00:00:00", 0.0);
        no_price.price = None;
        let records = vec![no_price, order("2024-01-01 00:00:00", 5.5)];
        assert_eq!(total_sales(&records), 5.5);
        assert!(total_sales(&records) >= 0.0);
    }

    #[test]
    fn test_daily_counts_are_chronological() {
        let records = vec![
            order("2024-03-02 09:00:00", 1.0),
            order("2024-01-15 09:00:00", 1.0),
            order("2024-03-02 10:00:00", 1.0),
        ];
        let counts = daily_order_counts(&records);
        assert_eq!(counts[0].date, date("2024-01-15"));
        assert_eq!(counts[1], DailyCount { date: date("2024-03-02"), count: 2 });
    }

    #[test]
    fn test_daily_counts_skip_missing_purchase() {
        let mut missing = order("2024-01-01 00:00:00", 1.0);
        missing.purchased_at = None;
        assert!(daily_order_counts(&[missing]).is_empty());
    }

    #[test]
    fn test_average_delivery_delay() {
        let records = vec![
            delivered("2024-01-10 00:00:00", "2024-01-12 00:00:00"),
            delivered("2024-01-10 00:00:00", "2024-01-07 00:00:00"),
            OrderRecord::new("undelivered"),
        ];
        // (+2 days, -3 days) -> mean -0.5 days
        let avg = average_delivery_delay(&records).unwrap();
        assert_eq!(avg, TimeDelta::hours(-12));
        assert_eq!(crate::dataset::floor_days(avg), -1);
    }

    #[test]
    fn test_average_delivery_delay_absent() {
        assert_eq!(average_delivery_delay(&[]), None);
        assert_eq!(average_delivery_delay(&[OrderRecord::new("x")]), None);
    }

    #[test]
    fn test_rolling_average_constant_series() {
        let points = rolling_average(&series(&[4; 10]), 7);
        assert_eq!(points.len(), 10);
        assert!(points[..6].iter().all(|p| p.value.is_none()));
        assert!(points[6..].iter().all(|p| p.value == Some(4.0)));
    }

    #[test]
    fn test_rolling_average_trailing_window() {
        let points = rolling_average(&series(&[1, 2, 3, 4, 5]), 3);
        let values: Vec<_> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_rolling_average_short_or_zero_window() {
        assert!(rolling_average(&series(&[1, 2]), 7).iter().all(|p| p.value.is_none()));
        assert!(rolling_average(&series(&[1, 2]), 0).iter().all(|p| p.value.is_none()));
        assert!(rolling_average(&[], 7).is_empty());
        let ones: Vec<_> = rolling_average(&series(&[3, 5]), 1).iter().map(|p| p.value).collect();
        assert_eq!(ones, vec![Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_peak_first_occurrence_wins() {
        let s = series(&[1, 5, 2, 5, 3]);
        assert_eq!(peak(&s), Some(DailyCount { date: date("2024-01-02"), count: 5 }));
        assert_eq!(peak(&[]), None);
    }

    #[test]
    fn test_top_n_ordering_and_ties() {
        let records = vec![
            categorized(Some("toys")),
            categorized(Some("garden")),
            categorized(None),
            categorized(Some("garden")),
            categorized(Some("books")),
            categorized(Some("toys")),
            categorized(Some("auto")),
        ];
        let top = top_n_by_frequency(&records, CategoricalField::ProductCategory, 10);
        let values: Vec<_> = top.iter().map(|e| (e.value.as_str(), e.count)).collect();
        assert_eq!(values, vec![("toys", 2), ("garden", 2), ("books", 1), ("auto", 1)]);
    }

    #[test]
    fn test_top_n_bounds() {
        let records = vec![
            categorized(Some("a")),
            categorized(Some("a")),
            categorized(Some("a")),
            categorized(Some("b")),
            categorized(Some("b")),
            categorized(Some("c")),
        ];
        assert!(top_n_by_frequency(&records, CategoricalField::ProductCategory, 0).is_empty());

        for n in 1..5 {
            let top = top_n_by_frequency(&records, CategoricalField::ProductCategory, n);
            assert_eq!(top.len(), n.min(3));
            assert!(top.windows(2).all(|w| w[0].count > w[1].count));
        }
    }

    #[test]
    fn test_top_n_by_city() {
        let mut a = OrderRecord::new("a");
        a.customer_city = Some("sao paulo".to_string());
        let top = top_n_by_frequency(&[a.clone(), a], CategoricalField::CustomerCity, 10);
        assert_eq!(top, vec![FrequencyEntry { value: "sao paulo".to_string(), count: 2 }]);
    }

    #[test]
    fn test_delivery_delay_distribution() {
        let records = vec![
            delivered("2024-01-10 00:00:00", "2024-01-12 06:00:00"),
            delivered("2024-01-10 00:00:00", "2024-01-09 18:00:00"),
            OrderRecord::new("missing"),
        ];
        assert_eq!(delivery_delay_distribution(&records), vec![2, -1]);
        assert!(delivery_delay_distribution(&[]).is_empty());
    }

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1, 2, 3, 4]), Some(2.5));
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram(&[0, 1, 2, 3, 4, 10], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[4].upper, 10.0);
        let counts: Vec<_> = bins.iter().map(|b| b.count).collect();
        // width 2: [0,2) [2,4) [4,6) [6,8) [8,10]
        assert_eq!(counts, vec![2, 2, 1, 0, 1]);
        assert_eq!(counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_histogram_degenerate_inputs() {
        assert!(histogram(&[], 30).is_empty());
        assert!(histogram(&[1, 2], 0).is_empty());

        let single = histogram(&[3, 3, 3], 2);
        assert_eq!(single[0].lower, 2.5);
        assert_eq!(single[1].upper, 3.5);
        assert_eq!(single.iter().map(|b| b.count).sum::<usize>(), 3);
    }

    #[test]
    fn test_mean_duration_by_group() {
        let mut a = OrderRecord::new("a");
        a.approved_at = Some(ts("2024-01-02 10:00:00"));
        a.delivered_at = Some(ts("2024-01-06 10:00:00"));
        let mut b = OrderRecord::new("b");
        b.approved_at = Some(ts("2024-01-02 18:00:00"));
        b.delivered_at = Some(ts("2024-01-04 20:00:00"));
        let mut c = OrderRecord::new("c");
        c.approved_at = Some(ts("2024-01-01 09:00:00"));
        let d = OrderRecord::new("d");

        let means = approval_delivery_by_date(&[a, b, c, d]);
        assert_eq!(
            means,
            vec![
                GroupMean { date: date("2024-01-01"), mean: None },
                GroupMean { date: date("2024-01-02"), mean: Some(3.0) },
            ]
        );
    }

    #[test]
    fn test_mean_duration_by_group_custom_key() {
        let records = vec![
            order("2024-01-01 09:00:00", 10.0),
            order("2024-01-01 10:00:00", 20.0),
        ];
        let means = mean_duration_by_group(&records, OrderRecord::purchase_date, |r| {
            r.price.map(|p| p as i64)
        });
        assert_eq!(means, vec![GroupMean { date: date("2024-01-01"), mean: Some(15.0) }]);
    }
}
