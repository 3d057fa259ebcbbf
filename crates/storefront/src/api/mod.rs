//! Marketplace data access.
//!
//! # Architecture
//!
//! - [`MarketplaceApi`] is the one seam between storefront state and data
//! - [`HttpApi`] talks to the REST backend (`reqwest`, `moka` cache)
//! - [`MockApi`] serves the built-in static catalog with mock auth
//! - Wire records of either shape are converted into `marketplace_core`
//!   types before they leave this module
//!
//! # Example
//!
//! ```rust,ignore
//! use marketplace_storefront::api::{MarketplaceApi, MockApi, ProductQuery};
//!
//! let api = MockApi::new()?;
//! let page = api.list_products(&ProductQuery::search("jordan")).await?;
//! let product = api.get_product(&page.products[0].id).await?;
//! ```

mod conversions;
mod http;
mod mock;
mod wire;

pub use http::HttpApi;
pub use mock::MockApi;

use async_trait::async_trait;
use marketplace_core::{BidRecord, OrderSummary, Price, Product, ProductId, User};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur when talking to the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The token is missing, expired or revoked (HTTP 401).
    #[error("Unauthorized")]
    Unauthorized,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend refused the request (e.g. bid too low, email taken).
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Any other non-success status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
}

impl ApiError {
    /// Whether the stored session must be discarded.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Bearer token for authenticated calls.
#[derive(Clone)]
pub struct AccessToken(SecretString);

impl AccessToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for the `Authorization` header or storage.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Result of a successful login or registration.
#[derive(Debug, Clone)]
pub struct AuthGrant {
    pub token: AccessToken,
    pub user: User,
}

/// Fields a user may change on their profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Backend response to an accepted bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BidReceipt {
    pub amount: Price,
    pub current_bid: Price,
}

/// Product list ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Catalog order, or text-match score for searches.
    #[default]
    Relevance,
    Newest,
    PriceLowToHigh,
    PriceHighToLow,
    /// Running auctions only, soonest close first.
    EndingSoon,
}

impl std::str::FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "relevance" => Ok(Self::Relevance),
            "newest" => Ok(Self::Newest),
            "price-low" => Ok(Self::PriceLowToHigh),
            "price-high" => Ok(Self::PriceHighToLow),
            "ending-soon" => Ok(Self::EndingSoon),
            other => Err(format!(
                "unknown sort '{other}' (expected relevance, newest, price-low, price-high, ending-soon)"
            )),
        }
    }
}

/// Listing variant filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKind {
    Auction,
    BuyItNow,
}

/// Product list/search filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProductQuery {
    /// Free-text search; `None` lists the catalog.
    pub text: Option<String>,
    /// Exact category; "All Categories" is treated as no filter.
    pub category: Option<String>,
    pub min_price: Option<Price>,
    pub max_price: Option<Price>,
    pub condition: Option<String>,
    pub listing: Option<ListingKind>,
    pub brand: Option<String>,
    pub sort: SortKey,
    /// 1-based page number.
    pub page: u32,
    /// Products per page.
    pub page_size: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            text: None,
            category: None,
            min_price: None,
            max_price: None,
            condition: None,
            listing: None,
            brand: None,
            sort: SortKey::Relevance,
            page: 1,
            page_size: 20,
        }
    }
}

impl ProductQuery {
    /// Text search with default paging.
    #[must_use]
    pub fn search(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// The category filter, ignoring the "All Categories" pseudo-category.
    #[must_use]
    pub fn category_filter(&self) -> Option<&str> {
        self.category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "All Categories")
    }

    /// The trimmed search text, ignoring blank input.
    #[must_use]
    pub fn text_filter(&self) -> Option<&str> {
        self.text.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
}

impl ProductPage {
    /// An empty page, used as the fallback when the backend fails.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            products: Vec::new(),
            current_page: 1,
            total_pages: 0,
            total_count: 0,
        }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current_page > 1
    }
}

/// The data-access collaborator behind the storefront.
#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// List or search products.
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError>;

    /// Fetch one product.
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError>;

    /// All category names.
    async fn categories(&self) -> Result<Vec<String>, ApiError>;

    /// Submit a bid.
    async fn place_bid(
        &self,
        token: &AccessToken,
        id: &ProductId,
        amount: Price,
    ) -> Result<BidReceipt, ApiError>;

    /// Bid history, newest first.
    async fn bid_history(&self, id: &ProductId) -> Result<Vec<BidRecord>, ApiError>;

    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthGrant, ApiError>;

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthGrant, ApiError>;

    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError>;

    /// The user the token belongs to.
    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError>;

    /// The signed-in user's profile.
    async fn profile(&self, token: &AccessToken) -> Result<User, ApiError>;

    async fn update_profile(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError>;

    /// Order history, newest first.
    async fn orders(&self, token: &AccessToken) -> Result<Vec<OrderSummary>, ApiError>;

    /// Server-side watchlist mirror.
    async fn watchlist(&self, token: &AccessToken) -> Result<Vec<Product>, ApiError>;

    async fn watch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError>;

    async fn unwatch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError>;
}

/// Number of pages needed for `total` items.
pub(crate) fn page_count(total: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    u32::try_from(total.div_ceil(u64::from(page_size))).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 20), 0);
        assert_eq!(page_count(20, 20), 1);
        assert_eq!(page_count(21, 20), 2);
        assert_eq!(page_count(5, 0), 0);
    }

    #[test]
    fn test_page_navigation() {
        let page = ProductPage {
            current_page: 2,
            total_pages: 3,
            ..ProductPage::empty()
        };
        assert!(page.has_next());
        assert!(page.has_prev());
        assert!(!ProductPage::empty().has_prev());
    }

    #[test]
    fn test_category_filter_ignores_all_categories() {
        let mut query = ProductQuery {
            category: Some("All Categories".to_string()),
            ..ProductQuery::default()
        };
        assert_eq!(query.category_filter(), None);
        query.category = Some("sneakers".to_string());
        assert_eq!(query.category_filter(), Some("sneakers"));
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("price-low".parse(), Ok(SortKey::PriceLowToHigh));
        assert_eq!("ending-soon".parse(), Ok(SortKey::EndingSoon));
        assert!("cheapest".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("eyJhbGciOi");
        assert_eq!(format!("{token:?}"), "AccessToken([REDACTED])");
        assert_eq!(token.expose(), "eyJhbGciOi");
    }
}
