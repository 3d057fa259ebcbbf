//! Account, order and bid history records.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, OrderId, Price, ProductId, UserId};

/// A signed-in marketplace user.
///
/// This is the record persisted as the "current user" between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub avatar: Option<String>,
    /// Seller feedback rating out of 5.
    pub rating: f64,
    pub member_since: DateTime<Utc>,
    pub is_verified: bool,
}

impl User {
    /// Year shown as "Member since".
    #[must_use]
    pub fn member_since_year(&self) -> i32 {
        self.member_since.year()
    }
}

/// Fulfilment state of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Processing,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// One purchased product within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    pub image: Option<String>,
}

/// A past order as listed in the profile area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub items: Vec<OrderItem>,
    pub total: Price,
    pub tax: Price,
    pub shipping: Price,
    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderSummary {
    /// Units across all items.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |sum, item| sum.saturating_add(item.quantity))
    }
}

/// One entry of an auction's bid history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRecord {
    /// Bidder display name.
    pub bidder: String,
    pub amount: Price,
    pub placed_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn order_status_uses_display_labels_on_the_wire() {
        let status: OrderStatus = serde_json::from_str("\"In Transit\"").unwrap();
        assert_eq!(status, OrderStatus::InTransit);
        assert_eq!(status.label(), "In Transit");
    }

    #[test]
    fn order_item_count_sums_quantities() {
        let item = |quantity| OrderItem {
            product_id: ProductId::from(1_u64),
            name: "Jordan 10 Retro Steel".to_owned(),
            price: Price::from_cents(19_999),
            quantity,
            image: None,
        };
        let order = OrderSummary {
            id: OrderId::new("o-1"),
            items: vec![item(1), item(2)],
            total: Price::from_cents(64_797),
            tax: Price::from_cents(4_800),
            shipping: Price::ZERO,
            status: OrderStatus::Delivered,
            tracking_number: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap(),
        };
        assert_eq!(order.item_count(), 3);
    }

    #[test]
    fn member_since_year() {
        let user = User {
            id: UserId::new("1"),
            name: "John Doe".to_owned(),
            email: Email::parse("john.doe@example.com").unwrap(),
            avatar: None,
            rating: 4.9,
            member_since: Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap(),
            is_verified: true,
        };
        assert_eq!(user.member_since_year(), 2019);
    }
}
