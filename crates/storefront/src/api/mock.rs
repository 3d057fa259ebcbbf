//! Built-in static catalog with mock authentication.
//!
//! Products never change. Bids, sessions and watchlists live in memory for
//! the lifetime of the [`MockApi`] and are layered over the catalog on read.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use marketplace_core::{
    BidRecord, Email, Listing, OrderSummary, Price, Product, ProductId, User, UserId,
};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::conversions::{convert_mock_order, convert_mock_product, convert_mock_profile};
use super::wire::{MockCatalog, MockOrder, MockUserProfile};
use super::{
    AccessToken, ApiError, AuthGrant, BidReceipt, ListingKind, MarketplaceApi, ProductPage,
    ProductQuery, ProfileUpdate, SortKey, page_count,
};

const CATALOG_JSON: &str = include_str!("../../data/mock_catalog.json");
const TOKEN_PREFIX: &str = "mock-";

/// In-memory marketplace over the bundled catalog.
#[derive(Clone)]
pub struct MockApi {
    inner: Arc<MockApiInner>,
}

struct MockApiInner {
    products: Vec<Product>,
    categories: Vec<String>,
    profile: MockUserProfile,
    orders: Vec<MockOrder>,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    /// Signed-in users by token.
    sessions: HashMap<String, User>,
    /// Bids per product, oldest first.
    bids: HashMap<ProductId, Vec<BidRecord>>,
    watchlists: HashMap<UserId, Vec<ProductId>>,
}

impl MockApi {
    /// Load the bundled catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the bundled catalog is malformed.
    pub fn new() -> Result<Self, ApiError> {
        Self::from_json(CATALOG_JSON)
    }

    /// Load a catalog in the bundled format.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] if `raw` is not a valid catalog.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let catalog: MockCatalog = serde_json::from_str(raw)?;
        debug!(products = catalog.products.len(), "Loaded mock catalog");
        Ok(Self {
            inner: Arc::new(MockApiInner {
                products: catalog.products.into_iter().map(convert_mock_product).collect(),
                categories: catalog.categories,
                profile: catalog.user_profile,
                orders: catalog.orders,
                state: Mutex::new(MockState::default()),
            }),
        })
    }

    /// Catalog product with recorded bids applied.
    fn view(product: &Product, state: &MockState) -> Product {
        let mut product = product.clone();
        if let (Listing::Auction(auction), Some(bids)) =
            (&mut product.listing, state.bids.get(&product.id))
        {
            auction.bid_count += u32::try_from(bids.len()).unwrap_or(u32::MAX);
            auction.current_bid = bids.last().map(|bid| bid.amount).or(auction.current_bid);
        }
        product
    }

    fn find(&self, id: &ProductId) -> Result<&Product, ApiError> {
        self.inner
            .products
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))
    }

    /// Resolve a token to its user.
    ///
    /// Tokens issued by an earlier process are not in `sessions`; any token
    /// with the mock prefix resolves to the catalog profile account.
    fn session(&self, token: &AccessToken) -> Result<User, ApiError> {
        if let Some(user) = self.inner.state.lock().sessions.get(token.expose()) {
            return Ok(user.clone());
        }
        if !token.expose().starts_with(TOKEN_PREFIX) {
            return Err(ApiError::Unauthorized);
        }
        let email = Email::parse(&self.inner.profile.email)
            .map_err(|e| ApiError::Rejected(format!("catalog profile email: {e}")))?;
        Ok(convert_mock_profile(&self.inner.profile, email))
    }

    fn issue(&self, user: User) -> AuthGrant {
        let token = format!("{TOKEN_PREFIX}{}", Uuid::new_v4());
        self.inner
            .state
            .lock()
            .sessions
            .insert(token.clone(), user.clone());
        AuthGrant {
            token: AccessToken::new(token),
            user,
        }
    }

    fn matches(product: &Product, query: &ProductQuery) -> bool {
        let eq = |a: &str, b: &str| a.eq_ignore_ascii_case(b);

        if let Some(text) = query.text_filter()
            && !product.name.to_lowercase().contains(&text.to_lowercase())
        {
            return false;
        }
        if let Some(category) = query.category_filter()
            && !eq(&product.category, category)
        {
            return false;
        }
        if query.min_price.is_some_and(|min| product.price < min)
            || query.max_price.is_some_and(|max| product.price > max)
        {
            return false;
        }
        if let Some(condition) = &query.condition
            && !eq(&product.condition, condition)
        {
            return false;
        }
        if let Some(brand) = &query.brand
            && !product.brand.as_deref().is_some_and(|b| eq(b, brand))
        {
            return false;
        }
        match query.listing {
            Some(ListingKind::Auction) if !product.is_auction() => return false,
            Some(ListingKind::BuyItNow) if product.is_auction() => return false,
            _ => {}
        }
        query.sort != SortKey::EndingSoon || product.is_auction()
    }
}

#[async_trait]
impl MarketplaceApi for MockApi {
    #[instrument(skip(self), fields(page = query.page))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let now = Utc::now();
        let mut products: Vec<Product> = {
            let state = self.inner.state.lock();
            self.inner
                .products
                .iter()
                .filter(|p| Self::matches(p, query))
                .map(|p| Self::view(p, &state))
                .collect()
        };

        match query.sort {
            SortKey::Relevance => {}
            SortKey::Newest => products.reverse(),
            SortKey::PriceLowToHigh => products.sort_by_key(Product::current_price),
            SortKey::PriceHighToLow => {
                products.sort_by_key(|p| std::cmp::Reverse(p.current_price()));
            }
            SortKey::EndingSoon => products.sort_by_key(|p| {
                p.time_left(now).map_or(u64::MAX, |left| left.total_seconds())
            }),
        }

        let page_size = query.page_size.max(1);
        let page = query.page.max(1);
        let total_count = u64::try_from(products.len()).unwrap_or(u64::MAX);
        let skip = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);

        Ok(ProductPage {
            products: products.into_iter().skip(skip).take(take).collect(),
            current_page: page,
            total_pages: page_count(total_count, page_size),
            total_count,
        })
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let product = self.find(id)?;
        Ok(Self::view(product, &self.inner.state.lock()))
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.inner.categories.clone())
    }

    #[instrument(skip(self, token), fields(product_id = %id, amount = %amount))]
    async fn place_bid(
        &self,
        token: &AccessToken,
        id: &ProductId,
        amount: Price,
    ) -> Result<BidReceipt, ApiError> {
        let user = self.session(token)?;
        let product = self.find(id)?;

        let mut state = self.inner.state.lock();
        let current = Self::view(product, &state);
        let Some(auction) = current.auction() else {
            return Err(ApiError::Rejected("This item is not an auction".to_string()));
        };
        if auction
            .ends
            .time_left(Utc::now())
            .is_some_and(|left| left.is_expired())
        {
            return Err(ApiError::Rejected("This auction has ended".to_string()));
        }
        let current_price = current.current_price();
        if amount <= current_price {
            return Err(ApiError::Rejected(format!(
                "Bid amount must be higher than current bid of {current_price}"
            )));
        }

        state.bids.entry(id.clone()).or_default().push(BidRecord {
            bidder: user.name,
            amount,
            placed_at: Utc::now(),
        });
        info!("Bid recorded");

        Ok(BidReceipt {
            amount,
            current_bid: amount,
        })
    }

    async fn bid_history(&self, id: &ProductId) -> Result<Vec<BidRecord>, ApiError> {
        self.find(id)?;
        let state = self.inner.state.lock();
        Ok(state
            .bids
            .get(id)
            .map(|bids| bids.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthGrant, ApiError> {
        let email = Email::parse(email).map_err(|e| ApiError::Rejected(e.to_string()))?;
        if password.expose_secret().is_empty() {
            return Err(ApiError::Rejected("Password is required".to_string()));
        }
        let user = convert_mock_profile(&self.inner.profile, email);
        Ok(self.issue(user))
    }

    #[instrument(skip(self, password))]
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthGrant, ApiError> {
        let email = Email::parse(email).map_err(|e| ApiError::Rejected(e.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::Rejected("Name is required".to_string()));
        }
        if password.expose_secret().is_empty() {
            return Err(ApiError::Rejected("Password is required".to_string()));
        }

        let user = User {
            id: UserId::new(Uuid::new_v4().to_string()),
            name: name.to_string(),
            email,
            avatar: Some(self.inner.profile.avatar.clone()),
            rating: 5.0,
            member_since: Utc::now(),
            is_verified: false,
        };
        Ok(self.issue(user))
    }

    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        self.inner.state.lock().sessions.remove(token.expose());
        Ok(())
    }

    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError> {
        self.session(token)
    }

    async fn profile(&self, token: &AccessToken) -> Result<User, ApiError> {
        self.session(token)
    }

    #[instrument(skip(self, token))]
    async fn update_profile(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let mut user = self.session(token)?;
        if let Some(name) = &update.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ApiError::Rejected("Name is required".to_string()));
            }
            user.name = name.to_string();
        }
        if let Some(avatar) = &update.avatar {
            user.avatar = Some(avatar.clone());
        }
        self.inner
            .state
            .lock()
            .sessions
            .insert(token.expose().to_string(), user.clone());
        Ok(user)
    }

    async fn orders(&self, token: &AccessToken) -> Result<Vec<OrderSummary>, ApiError> {
        let user = self.session(token)?;
        if user.id != UserId::from(self.inner.profile.id) {
            return Ok(Vec::new());
        }
        let mut orders: Vec<OrderSummary> = self
            .inner
            .orders
            .iter()
            .filter_map(|order| {
                let product = self.find(&ProductId::from(order.product_id)).ok()?;
                Some(convert_mock_order(order, product))
            })
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn watchlist(&self, token: &AccessToken) -> Result<Vec<Product>, ApiError> {
        let user = self.session(token)?;
        let state = self.inner.state.lock();
        let ids = state.watchlists.get(&user.id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.find(id).ok())
            .map(|p| Self::view(p, &state))
            .collect())
    }

    async fn watch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError> {
        let user = self.session(token)?;
        self.find(id)?;
        let mut state = self.inner.state.lock();
        let ids = state.watchlists.entry(user.id).or_default();
        if !ids.contains(id) {
            ids.push(id.clone());
        }
        Ok(())
    }

    async fn unwatch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError> {
        let user = self.session(token)?;
        if let Some(ids) = self.inner.state.lock().watchlists.get_mut(&user.id) {
            ids.retain(|watched| watched != id);
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marketplace_core::{AuctionEnd, TimeLeft};

    use super::*;

    fn api() -> MockApi {
        MockApi::new().unwrap()
    }

    fn password() -> SecretString {
        SecretString::from("hunter2".to_string())
    }

    #[tokio::test]
    async fn test_catalog_loads() {
        let api = api();
        let page = api.list_products(&ProductQuery::default()).await.unwrap();
        assert_eq!(page.total_count, 12);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.products.len(), 12);
        assert_eq!(page.products[0].name, "Undefeated x Jordan 4 Retro 2025");

        let categories = api.categories().await.unwrap();
        assert_eq!(categories.first().map(String::as_str), Some("Motors"));
    }

    #[tokio::test]
    async fn test_mock_auction_parses_time_left() {
        let product = api().get_product(&ProductId::new("1")).await.unwrap();
        let auction = product.auction().unwrap();
        assert_eq!(auction.bid_count, 12);
        assert_eq!(auction.ends, AuctionEnd::Advertised(TimeLeft::new(2, 14, 0, 0)));
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let result = api().get_product(&ProductId::new("999")).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive() {
        let page = api()
            .list_products(&ProductQuery::search("KOBE"))
            .await
            .unwrap();
        assert_eq!(page.total_count, 2);
        assert!(page.products.iter().all(|p| p.name.contains("Kobe")));
    }

    #[tokio::test]
    async fn test_filters_and_sort() {
        let query = ProductQuery {
            category: Some("clothing, shoes & accessories".to_string()),
            listing: Some(ListingKind::BuyItNow),
            sort: SortKey::PriceLowToHigh,
            ..ProductQuery::default()
        };
        let page = api().list_products(&query).await.unwrap();
        let prices: Vec<Price> = page.products.iter().map(|p| p.price).collect();
        assert_eq!(
            prices,
            vec![
                Price::from_cents(18_999),
                Price::from_cents(24_999),
                Price::from_cents(32_999),
            ]
        );
    }

    #[tokio::test]
    async fn test_ending_soon_lists_auctions_only() {
        let query = ProductQuery {
            sort: SortKey::EndingSoon,
            ..ProductQuery::default()
        };
        let page = api().list_products(&query).await.unwrap();
        assert!(page.products.iter().all(Product::is_auction));
        assert_eq!(page.products[0].id, ProductId::new("9"));
    }

    #[tokio::test]
    async fn test_paging() {
        let query = ProductQuery {
            page: 3,
            page_size: 5,
            ..ProductQuery::default()
        };
        let page = api().list_products(&query).await.unwrap();
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.products.len(), 2);
        assert!(!page.has_next());
    }

    #[tokio::test]
    async fn test_login_synthesizes_profile() {
        let api = api();
        let grant = api.login("jane@example.com", &password()).await.unwrap();
        assert!(grant.token.expose().starts_with(TOKEN_PREFIX));
        assert_eq!(grant.user.name, "John Doe");
        assert_eq!(grant.user.email.as_str(), "jane@example.com");
        assert_eq!(grant.user.member_since_year(), 2019);

        let me = api.current_user(&grant.token).await.unwrap();
        assert_eq!(me, grant.user);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_input() {
        let api = api();
        assert!(matches!(
            api.login("not-an-email", &password()).await,
            Err(ApiError::Rejected(_))
        ));
        assert!(matches!(
            api.login("jane@example.com", &SecretString::from(String::new())).await,
            Err(ApiError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_register_uses_given_name() {
        let grant = api()
            .register("Jane Smith", "jane@example.com", &password())
            .await
            .unwrap();
        assert_eq!(grant.user.name, "Jane Smith");
        assert_ne!(grant.user.id, UserId::from(1_u64));
    }

    #[tokio::test]
    async fn test_foreign_token_is_unauthorized() {
        let result = api().current_user(&AccessToken::new("eyJhbGciOi")).await;
        assert!(matches!(result, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_place_bid_updates_product() {
        let api = api();
        let grant = api.login("jane@example.com", &password()).await.unwrap();
        let id = ProductId::new("1");

        let low = api.place_bid(&grant.token, &id, Price::from_cents(29_999)).await;
        assert!(matches!(low, Err(ApiError::Rejected(_))));

        let receipt = api
            .place_bid(&grant.token, &id, Price::from_cents(31_000))
            .await
            .unwrap();
        assert_eq!(receipt.current_bid, Price::from_cents(31_000));

        let product = api.get_product(&id).await.unwrap();
        assert_eq!(product.current_price(), Price::from_cents(31_000));
        assert_eq!(product.auction().unwrap().bid_count, 13);

        let history = api.bid_history(&id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].bidder, "John Doe");
    }

    #[tokio::test]
    async fn test_bid_on_buy_it_now_rejected() {
        let api = api();
        let grant = api.login("jane@example.com", &password()).await.unwrap();
        let result = api
            .place_bid(&grant.token, &ProductId::new("2"), Price::from_cents(50_000))
            .await;
        assert!(matches!(result, Err(ApiError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_watchlist_mirror() {
        let api = api();
        let grant = api.login("jane@example.com", &password()).await.unwrap();
        let id = ProductId::new("4");

        api.watch(&grant.token, &id).await.unwrap();
        api.watch(&grant.token, &id).await.unwrap();
        assert_eq!(api.watchlist(&grant.token).await.unwrap().len(), 1);

        api.unwatch(&grant.token, &id).await.unwrap();
        assert!(api.watchlist(&grant.token).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_profile_orders_newest_first() {
        let api = api();
        let grant = api.login("john.doe@example.com", &password()).await.unwrap();
        let orders = api.orders(&grant.token).await.unwrap();
        let ids: Vec<&str> = orders.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["ORD-001", "ORD-002", "ORD-003"]);
    }

    #[tokio::test]
    async fn test_logout_forgets_session() {
        let api = api();
        let grant = api
            .register("Jane Smith", "jane@example.com", &password())
            .await
            .unwrap();
        api.logout(&grant.token).await.unwrap();

        // Falls back to the catalog profile once the session is gone
        let me = api.current_user(&grant.token).await.unwrap();
        assert_eq!(me.name, "John Doe");
    }
}
