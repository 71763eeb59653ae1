//! Order records, known fields, and timestamp handling.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};

/// An optional point in time. Absent when the source cell was empty or unparseable.
pub type Timestamp = Option<NaiveDateTime>;

const SECONDS_PER_DAY: i64 = 86_400;

/// Formats tried in order when parsing a timestamp cell.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Export format for timestamps.
pub const TIMESTAMP_EXPORT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// The eight columns every order dataset must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderField {
    OrderId,
    PurchasedAt,
    ApprovedAt,
    DeliveredAt,
    EstimatedDeliveryAt,
    Price,
    ProductCategory,
    CustomerCity,
}

impl OrderField {
    /// All known fields, in canonical order.
    pub const ALL: [OrderField; 8] = [
        OrderField::OrderId,
        OrderField::PurchasedAt,
        OrderField::ApprovedAt,
        OrderField::DeliveredAt,
        OrderField::EstimatedDeliveryAt,
        OrderField::Price,
        OrderField::ProductCategory,
        OrderField::CustomerCity,
    ];

    /// Column names accepted for this field. The first entry is the canonical name.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            OrderField::OrderId => &["order_id", "id"],
            OrderField::PurchasedAt => &[
                "order_purchase_timestamp",
                "purchase_timestamp",
                "purchased_at",
            ],
            OrderField::ApprovedAt => &["order_approved_at", "approved_at"],
            OrderField::DeliveredAt => &["order_delivered_customer_date", "delivered_at"],
            OrderField::EstimatedDeliveryAt => &[
                "order_estimated_delivery_date",
                "estimated_delivery_at",
            ],
            OrderField::Price => &["price"],
            OrderField::ProductCategory => &[
                "product_category_name_english",
                "product_category_name",
                "product_category",
            ],
            OrderField::CustomerCity => &["customer_city", "city"],
        }
    }

    /// Canonical column name.
    pub fn canonical_name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Resolve a column name to a known field.
    pub fn from_column_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.aliases().iter().any(|alias| *alias == name))
    }

    /// Whether this field holds a timestamp.
    pub fn is_timestamp(self) -> bool {
        matches!(
            self,
            OrderField::PurchasedAt
                | OrderField::ApprovedAt
                | OrderField::DeliveredAt
                | OrderField::EstimatedDeliveryAt
        )
    }
}

/// Categorical fields that can be ranked by frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    ProductCategory,
    CustomerCity,
}

/// A single order line item.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    /// Order identifier
    pub order_id: String,

    /// When the order was placed
    pub purchased_at: Timestamp,

    /// When payment was approved
    pub approved_at: Timestamp,

    /// When the order reached the customer
    pub delivered_at: Timestamp,

    /// Promised delivery date
    pub estimated_delivery_at: Timestamp,

    /// Item price
    pub price: Option<f64>,

    /// Product category name
    pub product_category: Option<String>,

    /// Customer city
    pub customer_city: Option<String>,

    /// Pass-through columns, aligned with the dataset layout's extra columns
    pub extra: Vec<Option<String>>,
}

impl OrderRecord {
    /// Create a record with only the identifier set.
    pub fn new(order_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            purchased_at: None,
            approved_at: None,
            delivered_at: None,
            estimated_delivery_at: None,
            price: None,
            product_category: None,
            customer_city: None,
            extra: Vec::new(),
        }
    }

    /// Calendar date of purchase.
    pub fn purchase_date(&self) -> Option<NaiveDate> {
        self.purchased_at.map(|ts| ts.date())
    }

    /// Calendar date of approval.
    pub fn approval_date(&self) -> Option<NaiveDate> {
        self.approved_at.map(|ts| ts.date())
    }

    /// Delivered minus estimated. Negative means early.
    pub fn delivery_delay(&self) -> Option<TimeDelta> {
        Some(self.delivered_at? - self.estimated_delivery_at?)
    }

    /// Delivery delay in whole days, floored.
    pub fn delivery_delay_days(&self) -> Option<i64> {
        self.delivery_delay().map(floor_days)
    }

    /// Days from approval to delivery, floored.
    pub fn approval_to_delivery_days(&self) -> Option<i64> {
        Some(floor_days(self.delivered_at? - self.approved_at?))
    }

    /// Value of a categorical field.
    pub fn categorical(&self, field: CategoricalField) -> Option<&str> {
        match field {
            CategoricalField::ProductCategory => self.product_category.as_deref(),
            CategoricalField::CustomerCity => self.customer_city.as_deref(),
        }
    }

    /// Timestamp value of a timestamp field.
    pub fn timestamp(&self, field: OrderField) -> Timestamp {
        match field {
            OrderField::PurchasedAt => self.purchased_at,
            OrderField::ApprovedAt => self.approved_at,
            OrderField::DeliveredAt => self.delivered_at,
            OrderField::EstimatedDeliveryAt => self.estimated_delivery_at,
            _ => None,
        }
    }

    /// Set a timestamp field. Non-timestamp fields are ignored.
    pub fn set_timestamp(&mut self, field: OrderField, value: Timestamp) {
        match field {
            OrderField::PurchasedAt => self.purchased_at = value,
            OrderField::ApprovedAt => self.approved_at = value,
            OrderField::DeliveredAt => self.delivered_at = value,
            OrderField::EstimatedDeliveryAt => self.estimated_delivery_at = value,
            _ => {}
        }
    }

    /// Render a known field as export text. Absent values render as `None`.
    pub fn field_text(&self, field: OrderField) -> Option<String> {
        match field {
            OrderField::OrderId => Some(self.order_id.clone()),
            OrderField::Price => self.price.map(|p| p.to_string()),
            OrderField::ProductCategory => self.product_category.clone(),
            OrderField::CustomerCity => self.customer_city.clone(),
            ts_field => self.timestamp(ts_field).map(format_timestamp),
        }
    }
}

/// Whole days in a duration, rounded toward negative infinity.
pub fn floor_days(delta: TimeDelta) -> i64 {
    let mut secs = delta.num_seconds();
    if delta.subsec_nanos() < 0 {
        secs -= 1;
    }
    secs.div_euclid(SECONDS_PER_DAY)
}

/// Parse a timestamp cell. Empty cells and unrecognised formats yield `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Format a timestamp for export.
pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_EXPORT_FORMAT).to_string()
}
