/// A master product row, immutable after load.
///
/// Deduped on `product_id`; `price` has already had a leading currency
/// symbol stripped and has been coerced to `0.0` if unparseable.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub product_id: String,
    pub category: String,
    pub price: f64,
    pub supplier_id: i64,
    pub supplier_name: String,
    pub store_id: i64,
    pub store_name: String,
}

/// A master customer row, immutable after load. Missing fields default to
/// `"Unknown"`; `marital_status` coerces non-numeric values to `0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Customer {
    pub customer_id: String,
    pub gender: String,
    pub age: String,
    pub occupation: String,
    pub city_category: String,
    pub stay_in_current_city_years: String,
    pub marital_status: u8,
}

impl Customer {
    /// The fallback row created when a stream transaction references a
    /// customer absent from master data.
    pub fn unknown(customer_id: &str) -> Self {
        Self {
            customer_id: customer_id.to_string(),
            gender: "Unknown".to_string(),
            age: "Unknown".to_string(),
            occupation: "Unknown".to_string(),
            city_category: "Unknown".to_string(),
            stay_in_current_city_years: "Unknown".to_string(),
            marital_status: 0,
        }
    }
}

/// A single row read off the transactional stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub order_id: String,
    pub customer_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub date: String,
}

/// The canonical date dimension row derived from a free-form date string.
/// `full_date` (ISO `YYYY-MM-DD`) is the dimension's natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRecord {
    pub full_date: String,
    pub day: u32,
    pub month: u32,
    pub month_name: String,
    pub quarter: u8,
    pub year: i32,
    pub week: u32,
    pub weekday: String,
    pub season: String,
}

/// One resolved `FactSales` row, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    pub customer_key: i64,
    pub product_key: i64,
    pub supplier_key: i64,
    pub store_key: i64,
    pub date_key: i64,
    pub order_id: String,
    pub quantity: i64,
    pub revenue: f64,
}

/// Round to two decimal places the way the warehouse's `Revenue` column
/// expects; `f64::round` rounds half away from zero, matching the
/// documented `round(quantity * price, 2)` formula.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
