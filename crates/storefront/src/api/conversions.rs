//! Wire record conversion into `marketplace_core` types.

use chrono::{TimeZone, Utc};
use marketplace_core::{
    Auction, AuctionEnd, BidRecord, Email, Listing, OrderId, OrderItem, OrderStatus, OrderSummary,
    Price, Product, ProductId, TimeLeft, User, UserId,
};
use tracing::warn;

use super::ApiError;
use super::wire::{
    ApiBid, ApiOrder, ApiOrderItem, ApiProduct, ApiUser, MockOrder, MockProduct,
    MockUserProfile,
};

// =============================================================================
// REST backend
// =============================================================================

pub fn convert_api_product(p: ApiProduct) -> Product {
    let listing = if p.is_auction {
        Listing::Auction(Auction {
            current_bid: p.current_bid.map(Price::new),
            bid_count: p.bid_count,
            ends: p.auction_end_time.map_or(AuctionEnd::Unknown, AuctionEnd::At),
        })
    } else {
        Listing::BuyItNow
    };

    Product {
        id: ProductId::from(p.id),
        name: p.name,
        description: p.description,
        price: Price::new(p.price),
        original_price: p.original_price.map(Price::new),
        images: p.images,
        category: p.category,
        condition: p.condition,
        brand: p.brand,
        seller: p.seller_name,
        rating: p.rating,
        review_count: p.review_count,
        listing,
    }
}

/// Convert a user record. The backend validates emails on signup, so a
/// malformed one here is a contract violation.
pub fn convert_api_user(u: ApiUser) -> Result<User, ApiError> {
    let email = Email::parse(&u.email).map_err(|e| {
        ApiError::Rejected(format!("backend returned invalid email for user {}: {e}", u.id))
    })?;
    Ok(User {
        id: UserId::from(u.id),
        name: u.name,
        email,
        avatar: u.avatar,
        rating: u.rating,
        member_since: u.member_since,
        is_verified: u.is_verified,
    })
}

pub fn convert_api_bid(b: ApiBid) -> BidRecord {
    BidRecord {
        bidder: b.user_name,
        amount: Price::new(b.amount),
        placed_at: b.created_at,
    }
}

fn convert_api_order_item(i: ApiOrderItem) -> OrderItem {
    OrderItem {
        product_id: ProductId::from(i.product_id),
        name: i.name,
        price: Price::new(i.price),
        quantity: i.quantity,
        image: i.image,
    }
}

pub fn convert_api_order(o: ApiOrder) -> OrderSummary {
    let status = parse_order_status(&o.status).unwrap_or_else(|| {
        warn!(order_id = %o.id, status = %o.status, "Unknown order status, showing as Processing");
        OrderStatus::Processing
    });
    OrderSummary {
        id: OrderId::from(o.id),
        items: o.items.into_iter().map(convert_api_order_item).collect(),
        total: Price::new(o.total_amount),
        tax: Price::new(o.tax_amount),
        shipping: Price::new(o.shipping_amount),
        status,
        tracking_number: o.tracking_number,
        created_at: o.created_at,
    }
}

fn parse_order_status(status: &str) -> Option<OrderStatus> {
    match status {
        "Processing" => Some(OrderStatus::Processing),
        "In Transit" => Some(OrderStatus::InTransit),
        "Delivered" => Some(OrderStatus::Delivered),
        "Cancelled" => Some(OrderStatus::Cancelled),
        _ => None,
    }
}

// =============================================================================
// Mock catalog
// =============================================================================

pub fn convert_mock_product(p: MockProduct) -> Product {
    let listing = if p.is_auction {
        Listing::Auction(Auction {
            current_bid: None,
            bid_count: p.bids,
            ends: p
                .time_left
                .as_deref()
                .map_or(AuctionEnd::Unknown, |s| {
                    AuctionEnd::Advertised(TimeLeft::parse(s))
                }),
        })
    } else {
        Listing::BuyItNow
    };

    Product {
        id: ProductId::from(p.id),
        name: p.name,
        description: p.description,
        price: Price::new(p.price),
        original_price: p.original_price.map(Price::new),
        images: vec![p.image],
        category: p.category,
        condition: p.condition.unwrap_or_else(|| "New".to_string()),
        brand: p.brand,
        seller: p.seller,
        rating: p.rating,
        review_count: 0,
        listing,
    }
}

/// Build the mock account for `email`, based on the catalog's profile.
pub fn convert_mock_profile(profile: &MockUserProfile, email: Email) -> User {
    let member_since = Utc
        .with_ymd_and_hms(profile.member_since, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    User {
        id: UserId::from(profile.id),
        name: profile.name.clone(),
        email,
        avatar: Some(profile.avatar.clone()),
        rating: profile.rating,
        member_since,
        is_verified: false,
    }
}

/// Build a one-item sample order for `product`.
pub fn convert_mock_order(o: &MockOrder, product: &Product) -> OrderSummary {
    let created_at = o
        .date
        .and_hms_opt(0, 0, 0)
        .map_or_else(Utc::now, |dt| dt.and_utc());
    OrderSummary {
        id: OrderId::new(o.id.as_str()),
        items: vec![OrderItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity: 1,
            image: product.image().map(str::to_owned),
        }],
        total: product.price,
        tax: Price::ZERO,
        shipping: Price::ZERO,
        status: o.status,
        tracking_number: o.tracking_number.clone(),
        created_at,
    }
}
