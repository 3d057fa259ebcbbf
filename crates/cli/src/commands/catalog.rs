//! Catalog browsing and one-shot bidding.

use std::io::Write;

use clap::{Args, ValueEnum};
use marketplace_core::{Price, ProductId};
use marketplace_storefront::Storefront;
use marketplace_storefront::api::{ListingKind, ProductQuery, SortKey};
use rust_decimal::Decimal;

use super::{CommandResult, fallback, outcome};
use crate::render;

/// Filters for `mkt products`.
#[derive(Debug, Args)]
pub struct ProductsArgs {
    /// Search text (lists the whole catalog when omitted)
    pub text: Option<String>,

    /// Only this category
    #[arg(short, long)]
    pub category: Option<String>,

    /// Lowest listing price
    #[arg(long, value_parser = parse_price)]
    pub min_price: Option<Price>,

    /// Highest listing price
    #[arg(long, value_parser = parse_price)]
    pub max_price: Option<Price>,

    /// Item condition (e.g. New, Used)
    #[arg(long)]
    pub condition: Option<String>,

    /// Listing type
    #[arg(short, long, value_enum)]
    pub listing: Option<ListingArg>,

    /// Brand
    #[arg(short, long)]
    pub brand: Option<String>,

    /// Ordering (relevance, newest, price-low, price-high, ending-soon)
    #[arg(short, long, default_value = "relevance")]
    pub sort: SortKey,

    /// Page number
    #[arg(short, long, default_value_t = 1)]
    pub page: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ListingArg {
    Auction,
    BuyItNow,
}

impl From<ListingArg> for ListingKind {
    fn from(arg: ListingArg) -> Self {
        match arg {
            ListingArg::Auction => Self::Auction,
            ListingArg::BuyItNow => Self::BuyItNow,
        }
    }
}

impl ProductsArgs {
    /// Apply these filters on top of `base` (which carries the page size).
    #[must_use]
    pub fn into_query(self, base: ProductQuery) -> ProductQuery {
        ProductQuery {
            text: self.text,
            category: self.category,
            min_price: self.min_price,
            max_price: self.max_price,
            condition: self.condition,
            listing: self.listing.map(ListingKind::from),
            brand: self.brand,
            sort: self.sort,
            page: self.page.max(1),
            ..base
        }
    }
}

/// Parse a dollar amount such as `120`, `99.5` or `$45.00`.
pub fn parse_price(input: &str) -> Result<Price, String> {
    let trimmed = input.trim();
    let amount: Decimal = trimmed
        .strip_prefix('$')
        .unwrap_or(trimmed)
        .parse()
        .map_err(|_| format!("not a price: '{input}'"))?;
    if amount.is_sign_negative() {
        return Err(format!("price cannot be negative: '{input}'"));
    }
    Ok(Price::new(amount))
}

pub async fn products(
    storefront: &Storefront,
    args: ProductsArgs,
    out: &mut impl Write,
) -> CommandResult {
    let query = args.into_query(storefront.query());
    let loaded = storefront.browse(&query).await;
    render::products(out, &loaded.value)?;
    fallback(loaded.notice)
}

pub async fn categories(storefront: &Storefront, out: &mut impl Write) -> CommandResult {
    let loaded = storefront.categories().await;
    render::categories(out, &loaded.value)?;
    fallback(loaded.notice)
}

pub async fn show(storefront: &Storefront, id: &str, out: &mut impl Write) -> CommandResult {
    let loaded = storefront.open_product(&ProductId::new(id)).await;
    if let Some(detail) = &loaded.value {
        render::detail(out, detail)?;
    }
    fallback(loaded.notice)
}

pub async fn bids(storefront: &Storefront, id: &str, out: &mut impl Write) -> CommandResult {
    let loaded = storefront.bid_history(&ProductId::new(id)).await;
    render::bids(out, &loaded.value)?;
    fallback(loaded.notice)
}

pub async fn bid(
    storefront: &mut Storefront,
    id: &str,
    amount: &str,
    out: &mut impl Write,
) -> CommandResult {
    let loaded = storefront.open_product(&ProductId::new(id)).await;
    let Some(mut detail) = loaded.value else {
        return fallback(loaded.notice);
    };
    let notice = storefront.place_bid(&mut detail, amount).await;
    outcome(out, &notice)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("120").unwrap(), Price::from_cents(12_000));
        assert_eq!(parse_price(" $45.50 ").unwrap(), Price::from_cents(4550));
        assert!(parse_price("cheap").is_err());
        assert!(parse_price("-1").is_err());
    }

    #[test]
    fn test_args_into_query_keeps_page_size() {
        let args = ProductsArgs {
            text: Some("jordan".to_string()),
            category: None,
            min_price: Some(Price::from_cents(10_000)),
            max_price: None,
            condition: None,
            listing: Some(ListingArg::BuyItNow),
            brand: None,
            sort: SortKey::PriceHighToLow,
            page: 0,
        };
        let base = ProductQuery {
            page_size: 5,
            ..ProductQuery::default()
        };

        let query = args.into_query(base);
        assert_eq!(query.page_size, 5);
        assert_eq!(query.page, 1);
        assert_eq!(query.listing, Some(ListingKind::BuyItNow));
        assert_eq!(query.text_filter(), Some("jordan"));
    }
}
