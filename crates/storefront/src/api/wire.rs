//! Raw record shapes as they appear on the wire.
//!
//! Two shapes exist: snake_case records from the REST backend and camelCase
//! records in the bundled mock catalog. Neither leaves the `api` module.

use chrono::{DateTime, NaiveDate, Utc};
use marketplace_core::OrderStatus;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// REST backend
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub images: Vec<String>,
    pub category: String,
    #[serde(default = "default_condition")]
    pub condition: String,
    pub seller_name: String,
    #[serde(default)]
    pub is_auction: bool,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub auction_end_time: Option<DateTime<Utc>>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current_bid: Option<Decimal>,
    #[serde(default)]
    pub bid_count: u32,
    pub brand: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiPagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiProductPage {
    pub products: Vec<ApiProduct>,
    pub pagination: ApiPagination,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub member_since: DateTime<Utc>,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiAuthResponse {
    pub access_token: String,
    pub user: ApiUser,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiLoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiRegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBidResponse {
    #[serde(with = "rust_decimal::serde::float")]
    pub bid_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub current_bid: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiBid {
    pub user_name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrderItem {
    pub product_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: u32,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiOrder {
    pub id: String,
    pub items: Vec<ApiOrderItem>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub shipping_amount: Decimal,
    pub status: String,
    pub tracking_number: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
}

/// FastAPI error body: `{"detail": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub detail: serde_json::Value,
}

fn default_condition() -> String {
    "New".to_string()
}

/// Backend timestamps: RFC 3339, or an offset-less ISO 8601 string read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| raw.parse::<NaiveDateTime>().ok().map(|dt| dt.and_utc()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: '{raw}'")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::de::Error;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            Option::<String>::deserialize(deserializer)?
                .map(|raw| {
                    super::parse(&raw)
                        .ok_or_else(|| D::Error::custom(format!("invalid timestamp: '{raw}'")))
                })
                .transpose()
        }
    }
}

// =============================================================================
// Mock catalog
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockProduct {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub original_price: Option<Decimal>,
    pub image: String,
    pub seller: String,
    #[serde(default)]
    pub rating: f64,
    /// Bid count (auctions only).
    #[serde(default)]
    pub bids: u32,
    /// Advertised time left such as "2d 14h" (auctions only).
    pub time_left: Option<String>,
    #[serde(default)]
    pub is_auction: bool,
    pub category: String,
    pub condition: Option<String>,
    pub brand: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockUserProfile {
    pub id: u64,
    pub name: String,
    pub email: String,
    pub avatar: String,
    pub rating: f64,
    pub member_since: i32,
}

/// A sample order for the catalog's profile account.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockOrder {
    pub id: String,
    pub date: NaiveDate,
    pub status: OrderStatus,
    pub product_id: u64,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockCatalog {
    pub categories: Vec<String>,
    pub products: Vec<MockProduct>,
    pub user_profile: MockUserProfile,
    #[serde(default)]
    pub orders: Vec<MockOrder>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    #[test]
    fn test_timestamp_accepts_offset_and_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(timestamp::parse("2025-01-15T10:00:00Z"), Some(expected));
        assert_eq!(timestamp::parse("2025-01-15T12:00:00+02:00"), Some(expected));
        assert_eq!(timestamp::parse("2025-01-15T10:00:00"), Some(expected));

        let fractional = timestamp::parse("2030-01-01T12:00:00.123456").unwrap();
        assert_eq!(fractional.nanosecond(), 123_456_000);

        assert_eq!(timestamp::parse("yesterday"), None);
    }

    #[test]
    fn test_bid_record_with_naive_timestamp() {
        let raw = serde_json::json!({
            "user_name": "Jane",
            "amount": 310.0,
            "created_at": "2025-03-02T08:30:00.250000"
        });
        let bid: ApiBid = serde_json::from_value(raw).unwrap();
        assert_eq!(bid.created_at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_missing_or_null_auction_end() {
        let base = serde_json::json!({
            "id": "p1",
            "name": "Lamp",
            "price": 20.0,
            "category": "Home",
            "seller_name": "Shop"
        });
        let product: ApiProduct = serde_json::from_value(base.clone()).unwrap();
        assert_eq!(product.auction_end_time, None);

        let mut with_null = base;
        with_null
            .as_object_mut()
            .unwrap()
            .insert("auction_end_time".to_string(), serde_json::Value::Null);
        let product: ApiProduct = serde_json::from_value(with_null).unwrap();
        assert_eq!(product.auction_end_time, None);
    }

    #[test]
    fn test_invalid_timestamp_is_an_error() {
        let raw = serde_json::json!({
            "user_name": "Jane",
            "amount": 310.0,
            "created_at": "soon"
        });
        assert!(serde_json::from_value::<ApiBid>(raw).is_err());
    }
}
