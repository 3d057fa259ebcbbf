//! The unified product schema.
//!
//! Mock catalog records and REST backend records arrive in different shapes;
//! both are converted into [`Product`] at the data-access boundary, so the
//! rest of the client only ever sees this type.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auction::TimeLeft;
use crate::types::{Price, ProductId};

/// A marketplace listing (read-only on the client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Listing price; for auctions, the opening price.
    pub price: Price,
    /// Pre-discount price shown struck through, if any.
    pub original_price: Option<Price>,
    pub images: Vec<String>,
    pub category: String,
    /// "New", "Used", "Refurbished" or "For parts".
    pub condition: String,
    pub brand: Option<String>,
    /// Seller display name.
    pub seller: String,
    pub rating: f64,
    pub review_count: u32,
    pub listing: Listing,
}

/// How a product is sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Listing {
    /// Fixed-price listing.
    BuyItNow,
    /// Timed auction.
    Auction(Auction),
}

/// Auction-only listing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    /// Highest bid so far; `None` until the first bid.
    pub current_bid: Option<Price>,
    pub bid_count: u32,
    pub ends: AuctionEnd,
}

/// When an auction closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuctionEnd {
    /// Absolute close time reported by the backend.
    At(DateTime<Utc>),
    /// Advertised time-left (mock catalog), counted from when it is shown.
    Advertised(TimeLeft),
    /// No close time published.
    Unknown,
}

impl AuctionEnd {
    /// Time remaining as of `now`, or `None` when no close time is known.
    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> Option<TimeLeft> {
        match *self {
            Self::At(end) => Some(TimeLeft::until(end, now)),
            Self::Advertised(left) => Some(left),
            Self::Unknown => None,
        }
    }
}

/// The product fields copied into a cart line or watchlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: Option<String>,
    pub seller: String,
}

impl Product {
    /// Minimal product with defaults for the descriptive fields.
    #[must_use]
    pub fn new(
        id: ProductId,
        name: impl Into<String>,
        price: Price,
        seller: impl Into<String>,
        listing: Listing,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            price,
            original_price: None,
            images: Vec::new(),
            category: String::new(),
            condition: "New".to_owned(),
            brand: None,
            seller: seller.into(),
            rating: 0.0,
            review_count: 0,
            listing,
        }
    }

    /// Primary image URL.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn is_auction(&self) -> bool {
        matches!(self.listing, Listing::Auction(_))
    }

    #[must_use]
    pub const fn auction(&self) -> Option<&Auction> {
        match &self.listing {
            Listing::Auction(auction) => Some(auction),
            Listing::BuyItNow => None,
        }
    }

    /// Price to beat: the current bid for auctions that have one, otherwise
    /// the listing price.
    #[must_use]
    pub fn current_price(&self) -> Price {
        self.auction()
            .and_then(|auction| auction.current_bid)
            .unwrap_or(self.price)
    }

    /// Time remaining on an auction as of `now`.
    #[must_use]
    pub fn time_left(&self, now: DateTime<Utc>) -> Option<TimeLeft> {
        self.auction().and_then(|auction| auction.ends.time_left(now))
    }

    /// Fields copied into cart lines and watchlist entries.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            price: self.price,
            image: self.image().map(str::to_owned),
            seller: self.seller.clone(),
        }
    }
}
