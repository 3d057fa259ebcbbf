//! REST backend client.
//!
//! Uses `reqwest` 0.13 for HTTP. Product, listing-page and category reads are
//! cached with `moka` for the configured TTL; authenticated calls never are.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use marketplace_core::{BidRecord, OrderSummary, Price, Product, ProductId, User};
use moka::future::Cache;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, error, instrument, warn};
use url::Url;

use super::conversions::{
    convert_api_bid, convert_api_order, convert_api_product, convert_api_user,
};
use super::wire::{
    ApiAuthResponse, ApiBid, ApiBidResponse, ApiErrorBody, ApiLoginRequest, ApiOrder,
    ApiProduct, ApiProductPage, ApiRegisterRequest, ApiUser,
};
use super::{
    AccessToken, ApiError, AuthGrant, BidReceipt, ListingKind, MarketplaceApi, ProductPage,
    ProductQuery, ProfileUpdate, SortKey,
};

/// Cached response values.
#[derive(Debug, Clone)]
enum CacheValue {
    Product(Box<Product>),
    Page(ProductPage),
    Categories(Vec<String>),
}

// =============================================================================
// HttpApi
// =============================================================================

/// Client for the marketplace REST backend.
#[derive(Clone)]
pub struct HttpApi {
    inner: Arc<HttpApiInner>,
}

struct HttpApiInner {
    client: reqwest::Client,
    /// Backend base URL with the `/api` segment appended.
    base: Url,
    cache: Cache<String, CacheValue>,
}

impl HttpApi {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &Url, cache_ttl: Duration, timeout: Duration) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(cache_ttl)
            .support_invalidation_closures()
            .build();

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        let mut base = base_url.clone();
        base.set_query(None);
        base.set_fragment(None);
        if let Ok(mut segments) = base.path_segments_mut() {
            segments.pop_if_empty().push("api");
        }

        Ok(Self {
            inner: Arc::new(HttpApiInner {
                client,
                base,
                cache,
            }),
        })
    }

    /// Build `<base>/api/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.inner.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL for a list or search request.
    fn products_url(&self, query: &ProductQuery) -> Url {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        let url = if let Some(text) = query.text_filter() {
            pairs.push(("q", text.to_string()));
            pairs.push(("page", query.page.to_string()));
            pairs.push(("limit", query.page_size.to_string()));
            if let Some(category) = query.category_filter() {
                pairs.push(("category", category.to_string()));
            }
            self.endpoint(&["products", "search"])
        } else {
            pairs.push(("page", query.page.to_string()));
            pairs.push(("limit", query.page_size.to_string()));
            if let Some(category) = query.category_filter() {
                pairs.push(("category", category.to_string()));
            }
            if let Some(min) = query.min_price {
                pairs.push(("min_price", min.amount().to_string()));
            }
            if let Some(max) = query.max_price {
                pairs.push(("max_price", max.amount().to_string()));
            }
            if let Some(condition) = &query.condition {
                pairs.push(("condition", condition.clone()));
            }
            if let Some(listing) = query.listing {
                let listing_type = match listing {
                    ListingKind::Auction => "Auction",
                    ListingKind::BuyItNow => "Buy It Now",
                };
                pairs.push(("listing_type", listing_type.to_string()));
            }
            if let Some(brand) = &query.brand {
                pairs.push(("brand", brand.clone()));
            }
            if let Some((sort_by, sort_order)) = sort_params(query.sort) {
                pairs.push(("sort_by", sort_by.to_string()));
                pairs.push(("sort_order", sort_order.to_string()));
            }
            self.endpoint(&["products", ""])
        };

        with_query(url, &pairs)
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if status.is_server_error() {
                error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "Backend returned server error"
                );
            } else {
                debug!(status = %status, "Backend rejected request");
            }
            return Err(status_error(status, &body));
        }

        Ok(body)
    }

    /// Send a request and decode the JSON response body.
    async fn fetch<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            ApiError::Parse(e)
        })
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        self.inner.client.get(url)
    }

    fn authed(
        &self,
        method: reqwest::Method,
        url: Url,
        token: &AccessToken,
    ) -> reqwest::RequestBuilder {
        self.inner
            .client
            .request(method, url)
            .bearer_auth(token.expose())
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate a cached product.
    pub async fn invalidate_product(&self, id: &ProductId) {
        self.inner.cache.invalidate(&product_cache_key(id)).await;
    }

    /// Invalidate every cached product page.
    pub fn invalidate_pages(&self) {
        let result = self
            .inner
            .cache
            .invalidate_entries_if(|key, _| key.starts_with(PAGE_CACHE_PREFIX));
        if let Err(e) = result {
            warn!(error = %e, "Failed to invalidate cached product pages");
        }
    }
}

#[async_trait]
impl MarketplaceApi for HttpApi {
    #[instrument(skip(self), fields(page = query.page, text = ?query.text_filter()))]
    async fn list_products(&self, query: &ProductQuery) -> Result<ProductPage, ApiError> {
        let cache_key = format!("{PAGE_CACHE_PREFIX}{query:?}");
        let cacheable = query.text_filter().is_none();

        // Only plain listings are cached; searches always hit the backend
        if cacheable
            && let Some(CacheValue::Page(page)) = self.inner.cache.get(&cache_key).await
        {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let data: ApiProductPage = self.fetch(self.get(self.products_url(query))).await?;
        let page = ProductPage {
            products: data.products.into_iter().map(convert_api_product).collect(),
            current_page: data.pagination.current_page,
            total_pages: data.pagination.total_pages,
            total_count: data.pagination.total_count,
        };

        if cacheable {
            self.inner
                .cache
                .insert(cache_key, CacheValue::Page(page.clone()))
                .await;
        }

        Ok(page)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn get_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        let cache_key = product_cache_key(id);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let data: ApiProduct = self
            .fetch(self.get(self.endpoint(&["products", id.as_str()])))
            .await?;
        let product = convert_api_product(data);

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        let cache_key = "categories".to_string();

        if let Some(CacheValue::Categories(categories)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories: Vec<String> = self
            .fetch(self.get(self.endpoint(&["products", "categories"])))
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Categories(categories.clone()))
            .await;

        Ok(categories)
    }

    #[instrument(skip(self, token), fields(product_id = %id, amount = %amount))]
    async fn place_bid(
        &self,
        token: &AccessToken,
        id: &ProductId,
        amount: Price,
    ) -> Result<BidReceipt, ApiError> {
        let url = with_query(
            self.endpoint(&["products", id.as_str(), "bid"]),
            &[("bid_amount", amount.amount().to_string())],
        );
        let data: ApiBidResponse = self
            .fetch(self.authed(reqwest::Method::POST, url, token))
            .await?;

        // Cached product and pages still show the previous high bid
        self.invalidate_product(id).await;
        self.invalidate_pages();

        Ok(BidReceipt {
            amount: Price::new(data.bid_amount),
            current_bid: Price::new(data.current_bid),
        })
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn bid_history(&self, id: &ProductId) -> Result<Vec<BidRecord>, ApiError> {
        let bids: Vec<ApiBid> = self
            .fetch(self.get(self.endpoint(&["products", id.as_str(), "bids"])))
            .await?;
        Ok(bids.into_iter().map(convert_api_bid).collect())
    }

    #[instrument(skip(self, password))]
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthGrant, ApiError> {
        let body = ApiLoginRequest {
            email,
            password: password.expose_secret(),
        };
        let data: ApiAuthResponse = self
            .fetch(
                self.inner
                    .client
                    .post(self.endpoint(&["auth", "login"]))
                    .json(&body),
            )
            .await?;
        auth_grant(data)
    }

    #[instrument(skip(self, password))]
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthGrant, ApiError> {
        let body = ApiRegisterRequest {
            name,
            email,
            password: password.expose_secret(),
        };
        let data: ApiAuthResponse = self
            .fetch(
                self.inner
                    .client
                    .post(self.endpoint(&["auth", "register"]))
                    .json(&body),
            )
            .await?;
        auth_grant(data)
    }

    #[instrument(skip(self, token))]
    async fn logout(&self, token: &AccessToken) -> Result<(), ApiError> {
        self.send(self.authed(
            reqwest::Method::POST,
            self.endpoint(&["auth", "logout"]),
            token,
        ))
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token))]
    async fn current_user(&self, token: &AccessToken) -> Result<User, ApiError> {
        let data: ApiUser = self
            .fetch(self.authed(reqwest::Method::GET, self.endpoint(&["auth", "me"]), token))
            .await?;
        convert_api_user(data)
    }

    #[instrument(skip(self, token))]
    async fn profile(&self, token: &AccessToken) -> Result<User, ApiError> {
        let data: ApiUser = self
            .fetch(self.authed(
                reqwest::Method::GET,
                self.endpoint(&["users", "profile"]),
                token,
            ))
            .await?;
        convert_api_user(data)
    }

    #[instrument(skip(self, token))]
    async fn update_profile(
        &self,
        token: &AccessToken,
        update: &ProfileUpdate,
    ) -> Result<User, ApiError> {
        let data: ApiUser = self
            .fetch(
                self.authed(
                    reqwest::Method::PUT,
                    self.endpoint(&["users", "profile"]),
                    token,
                )
                .json(update),
            )
            .await?;
        convert_api_user(data)
    }

    #[instrument(skip(self, token))]
    async fn orders(&self, token: &AccessToken) -> Result<Vec<OrderSummary>, ApiError> {
        let orders: Vec<ApiOrder> = self
            .fetch(self.authed(
                reqwest::Method::GET,
                self.endpoint(&["users", "orders"]),
                token,
            ))
            .await?;
        Ok(orders.into_iter().map(convert_api_order).collect())
    }

    #[instrument(skip(self, token))]
    async fn watchlist(&self, token: &AccessToken) -> Result<Vec<Product>, ApiError> {
        let products: Vec<ApiProduct> = self
            .fetch(self.authed(
                reqwest::Method::GET,
                self.endpoint(&["users", "watchlist"]),
                token,
            ))
            .await?;
        Ok(products.into_iter().map(convert_api_product).collect())
    }

    #[instrument(skip(self, token), fields(product_id = %id))]
    async fn watch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError> {
        self.send(self.authed(
            reqwest::Method::POST,
            self.endpoint(&["users", "watchlist", id.as_str()]),
            token,
        ))
        .await?;
        Ok(())
    }

    #[instrument(skip(self, token), fields(product_id = %id))]
    async fn unwatch(&self, token: &AccessToken, id: &ProductId) -> Result<(), ApiError> {
        self.send(self.authed(
            reqwest::Method::DELETE,
            self.endpoint(&["users", "watchlist", id.as_str()]),
            token,
        ))
        .await?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

const PAGE_CACHE_PREFIX: &str = "products:";

fn product_cache_key(id: &ProductId) -> String {
    format!("product:{id}")
}

fn auth_grant(data: ApiAuthResponse) -> Result<AuthGrant, ApiError> {
    Ok(AuthGrant {
        token: AccessToken::new(data.access_token),
        user: convert_api_user(data.user)?,
    })
}

/// Backend `(sort_by, sort_order)` for a sort key; `None` keeps the backend default.
const fn sort_params(sort: SortKey) -> Option<(&'static str, &'static str)> {
    match sort {
        SortKey::Relevance => None,
        SortKey::Newest => Some(("created_at", "desc")),
        SortKey::PriceLowToHigh => Some(("price", "asc")),
        SortKey::PriceHighToLow => Some(("price", "desc")),
        SortKey::EndingSoon => Some(("ending_soon", "asc")),
    }
}

fn with_query(mut url: Url, pairs: &[(&str, String)]) -> Url {
    if !pairs.is_empty() {
        let mut query = url.query_pairs_mut();
        for (key, value) in pairs {
            query.append_pair(key, value);
        }
    }
    url
}

/// Map a non-success response to an error.
fn status_error(status: StatusCode, body: &str) -> ApiError {
    let detail = error_detail(body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized,
        StatusCode::NOT_FOUND => ApiError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
            ApiError::Rejected(detail)
        }
        other => ApiError::Status {
            status: other.as_u16(),
            detail,
        },
    }
}

/// The `detail` field of an error body, or the start of the raw body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            detail: serde_json::Value::String(detail),
        }) => detail,
        Ok(ApiErrorBody { detail }) => detail.to_string(),
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn api(base: &str) -> HttpApi {
        HttpApi::new(
            &Url::parse(base).unwrap(),
            Duration::from_secs(60),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_appends_api_prefix() {
        let client = api("https://shop.example.com");
        assert_eq!(
            client.endpoint(&["auth", "me"]).as_str(),
            "https://shop.example.com/api/auth/me"
        );

        let nested = api("https://example.com/marketplace/");
        assert_eq!(
            nested.endpoint(&["products", "categories"]).as_str(),
            "https://example.com/marketplace/api/products/categories"
        );
    }

    #[tokio::test]
    async fn test_bid_invalidation_clears_pages_only() {
        let client = api("https://shop.example.com");
        let cache = &client.inner.cache;
        let page_key = format!("{PAGE_CACHE_PREFIX}{:?}", ProductQuery::default());
        let page = ProductPage {
            products: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total_count: 0,
        };
        cache.insert(page_key.clone(), CacheValue::Page(page)).await;
        cache
            .insert("categories".to_string(), CacheValue::Categories(vec!["Home".to_string()]))
            .await;

        client.invalidate_pages();

        assert!(cache.get(&page_key).await.is_none());
        assert!(cache.get("categories").await.is_some());
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let api = api("https://shop.example.com");
        assert_eq!(
            api.endpoint(&["products", "a/b c"]).as_str(),
            "https://shop.example.com/api/products/a%2Fb%20c"
        );
    }

    #[test]
    fn test_search_url() {
        let api = api("https://shop.example.com");
        let query = ProductQuery {
            category: Some("All Categories".to_string()),
            ..ProductQuery::search("jordan 4")
        };
        assert_eq!(
            api.products_url(&query).as_str(),
            "https://shop.example.com/api/products/search?q=jordan+4&page=1&limit=20"
        );
    }

    #[test]
    fn test_list_url_with_filters() {
        let api = api("https://shop.example.com");
        let query = ProductQuery {
            category: Some("Electronics".to_string()),
            min_price: Some(Price::from_cents(10_000)),
            max_price: Some(Price::new(Decimal::new(5005, 1))),
            listing: Some(ListingKind::BuyItNow),
            sort: SortKey::PriceHighToLow,
            page: 2,
            ..ProductQuery::default()
        };
        assert_eq!(
            api.products_url(&query).as_str(),
            "https://shop.example.com/api/products/?page=2&limit=20&category=Electronics\
             &min_price=100.00&max_price=500.5&listing_type=Buy+It+Now\
             &sort_by=price&sort_order=desc"
        );
    }

    #[test]
    fn test_blank_search_lists_catalog() {
        let api = api("https://shop.example.com");
        let url = api.products_url(&ProductQuery::search("   "));
        assert_eq!(url.path(), "/api/products/");
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(StatusCode::UNAUTHORIZED, "").is_unauthorized());

        let err = status_error(
            StatusCode::BAD_REQUEST,
            r#"{"detail":"Bid amount must be higher than current bid of $300.0"}"#,
        );
        let ApiError::Rejected(detail) = &err else {
            panic!("expected rejection, got {err:?}");
        };
        assert!(detail.starts_with("Bid amount must be higher"));

        let err = status_error(StatusCode::NOT_FOUND, r#"{"detail":"Product not found"}"#);
        assert!(matches!(err, ApiError::NotFound(detail) if detail == "Product not found"));

        let err = status_error(StatusCode::BAD_GATEWAY, "upstream down");
        assert!(matches!(
            err,
            ApiError::Status { status: 502, detail } if detail == "upstream down"
        ));
    }

    #[test]
    fn test_error_detail_non_string() {
        let detail = error_detail(r#"{"detail":[{"loc":["body","email"],"msg":"invalid"}]}"#);
        assert!(detail.contains("invalid"));
    }
}
