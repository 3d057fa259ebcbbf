//! Plain-text views.
//!
//! Every view writes to any `io::Write` so the one-shot commands and the
//! interactive shop share the same output.

use std::io::{self, Write};

use chrono::Utc;
use marketplace_core::{
    BidRecord, Cart, CartSummary, Listing, OrderSummary, Price, Product, User, Watchlist,
};
use marketplace_storefront::api::ProductPage;
use marketplace_storefront::{Notice, ProductDetail};

pub fn notice(out: &mut impl Write, notice: &Notice) -> io::Result<()> {
    let tag = if notice.is_error() { "error" } else { "ok" };
    writeln!(out, "[{tag}] {notice}")
}

/// One line per product plus the paging footer.
pub fn products(out: &mut impl Write, page: &ProductPage) -> io::Result<()> {
    if page.products.is_empty() {
        return writeln!(out, "No products found.");
    }
    for product in &page.products {
        writeln!(
            out,
            "{:>4}  {:<48} {:>10}  {}",
            product.id,
            truncate(&product.name, 48),
            product.current_price().to_string(),
            listing_label(product),
        )?;
    }
    writeln!(
        out,
        "Page {} of {} ({} products)",
        page.current_page,
        page.total_pages.max(1),
        page.total_count
    )
}

pub fn categories(out: &mut impl Write, categories: &[String]) -> io::Result<()> {
    for category in categories {
        writeln!(out, "  {category}")?;
    }
    Ok(())
}

pub fn detail(out: &mut impl Write, detail: &ProductDetail) -> io::Result<()> {
    let product = &detail.product;
    writeln!(out, "{} (#{})", product.name, product.id)?;
    match product.original_price {
        Some(original) if original > product.price => {
            writeln!(out, "  Price:      {} (was {original})", product.price)?;
        }
        _ => writeln!(out, "  Price:      {}", product.price)?,
    }
    writeln!(out, "  Condition:  {}", product.condition)?;
    if let Some(brand) = &product.brand {
        writeln!(out, "  Brand:      {brand}")?;
    }
    writeln!(out, "  Category:   {}", product.category)?;
    writeln!(
        out,
        "  Seller:     {} ({:.1}, {} reviews)",
        product.seller, product.rating, product.review_count
    )?;

    if let Some(auction) = product.auction() {
        let current = auction
            .current_bid
            .map_or_else(|| "no bids yet".to_string(), |bid| bid.to_string());
        writeln!(
            out,
            "  Current bid: {current} ({} bids)",
            auction.bid_count
        )?;
        match detail.time_left() {
            Some(left) => writeln!(out, "  Time left:  {left}")?,
            None => writeln!(out, "  Time left:  unknown")?,
        }
        if let Some(form) = detail.bid_form.as_ref().filter(|form| form.is_open()) {
            writeln!(
                out,
                "  Minimum bid: {} (suggested {})",
                form.minimum_bid(),
                form.suggested_bid()
            )?;
        } else {
            writeln!(out, "  Bidding has closed.")?;
        }
    } else {
        writeln!(out, "  Buy It Now")?;
    }

    if !product.description.is_empty() {
        writeln!(out)?;
        writeln!(out, "  {}", product.description)?;
    }
    Ok(())
}

pub fn cart(out: &mut impl Write, cart: &Cart, summary: &CartSummary) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty.");
    }
    for line in cart.lines() {
        writeln!(
            out,
            "{:>4}  {:<40} {:>3} x {:>10} = {:>10}",
            line.product_id(),
            truncate(&line.product.name, 40),
            line.quantity(),
            line.product.price.to_string(),
            line.line_total().to_string(),
        )?;
    }
    writeln!(out, "  Items:     {}", summary.item_count)?;
    writeln!(out, "  Subtotal:  {}", summary.subtotal)?;
    writeln!(out, "  Shipping:  {}", shipping_label(summary.shipping))?;
    writeln!(out, "  Tax:       {}", summary.tax)?;
    writeln!(out, "  Total:     {}", summary.total)
}

pub fn watchlist(out: &mut impl Write, watchlist: &Watchlist) -> io::Result<()> {
    if watchlist.is_empty() {
        return writeln!(out, "Your watchlist is empty.");
    }
    for entry in watchlist.entries() {
        writeln!(
            out,
            "{:>4}  {:<48} {:>10}  {}",
            entry.product_id(),
            truncate(&entry.product.name, 48),
            entry.product.price.to_string(),
            entry.product.seller,
        )?;
    }
    Ok(())
}

pub fn user(out: &mut impl Write, user: &User) -> io::Result<()> {
    let verified = if user.is_verified { " (verified)" } else { "" };
    writeln!(out, "{}{verified}", user.name)?;
    writeln!(out, "  Email:        {}", user.email.as_str())?;
    writeln!(out, "  Rating:       {:.1}", user.rating)?;
    writeln!(out, "  Member since: {}", user.member_since_year())
}

pub fn orders(out: &mut impl Write, orders: &[OrderSummary]) -> io::Result<()> {
    if orders.is_empty() {
        return writeln!(out, "No orders yet.");
    }
    for order in orders {
        writeln!(
            out,
            "{}  {}  {:<11} {} item(s)  {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status.label(),
            order.item_count(),
            order.total,
        )?;
        for item in &order.items {
            writeln!(out, "      {} x{}", item.name, item.quantity)?;
        }
        if let Some(tracking) = &order.tracking_number {
            writeln!(out, "      Tracking: {tracking}")?;
        }
    }
    Ok(())
}

pub fn bids(out: &mut impl Write, bids: &[BidRecord]) -> io::Result<()> {
    if bids.is_empty() {
        return writeln!(out, "No bids yet.");
    }
    for bid in bids {
        writeln!(
            out,
            "{}  {:>10}  {}",
            bid.placed_at.format("%Y-%m-%d %H:%M"),
            bid.amount.to_string(),
            bid.bidder,
        )?;
    }
    Ok(())
}

fn listing_label(product: &Product) -> String {
    match &product.listing {
        Listing::BuyItNow => "Buy It Now".to_string(),
        Listing::Auction(auction) => match product.time_left(Utc::now()) {
            Some(left) => format!("Auction, {} bids, {left}", auction.bid_count),
            None => format!("Auction, {} bids", auction.bid_count),
        },
    }
}

fn shipping_label(shipping: Price) -> String {
    if shipping == Price::ZERO {
        "Free".to_string()
    } else {
        shipping.to_string()
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::ProductId;

    use super::*;

    fn item(id: &str, cents: i64) -> Product {
        Product::new(
            ProductId::new(id),
            format!("Item {id}"),
            Price::from_cents(cents),
            "seller",
            Listing::BuyItNow,
        )
    }

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer name", 10), "a much ...");
    }

    #[test]
    fn test_cart_shows_free_shipping_and_total() {
        let mut cart = Cart::new();
        cart.add(&item("a", 1000), 2);
        cart.add(&item("b", 500), 1);
        let summary = cart.summary(rust_decimal::Decimal::ZERO);

        let text = rendered(|out| self::cart(out, &cart, &summary));
        assert!(text.contains("Items:     3"));
        assert!(text.contains("Shipping:  Free"));
        assert!(text.contains("Total:     $25.00"));
    }

    #[test]
    fn test_empty_views() {
        assert_eq!(
            rendered(|out| products(out, &ProductPage::empty())),
            "No products found.\n"
        );
        assert_eq!(
            rendered(|out| watchlist(out, &Watchlist::new())),
            "Your watchlist is empty.\n"
        );
        assert_eq!(rendered(|out| bids(out, &[])), "No bids yet.\n");
    }

    #[test]
    fn test_notice_tags_errors() {
        let text = rendered(|out| notice(out, &Notice::error("Bid failed", "Too low")));
        assert_eq!(text, "[error] Bid failed: Too low\n");
    }
}
