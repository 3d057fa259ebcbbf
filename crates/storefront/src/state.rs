//! Session-scoped application state.
//!
//! [`Storefront`] owns the cart, the watchlist, the auth session and the
//! data-access handle. Front ends hold one `Storefront` and call its intents;
//! nothing else mutates the cart or watchlist.
//!
//! Backend failures never escape as errors from an intent. Reads fall back
//! to an empty value with a [`Notice`]; writes report a [`Notice`].

use std::sync::Arc;

use chrono::Utc;
use marketplace_core::{
    BidForm, BidRecord, Cart, CartSummary, LineUpdate, OrderSummary, Product, ProductId, TimeLeft,
    User, Watchlist,
};
use secrecy::SecretString;
use tracing::{debug, info, instrument, warn};

use crate::api::{
    ApiError, HttpApi, MarketplaceApi, MockApi, ProductPage, ProductQuery, ProfileUpdate,
};
use crate::auth::{AuthError, AuthSession};
use crate::config::{DataSource, StorefrontConfig};
use crate::countdown::CountdownTimer;
use crate::error::StorefrontError;
use crate::notice::Notice;
use crate::storage::{FileStore, KeyValueStore};

/// A read result with its fallback notice.
///
/// On failure `value` holds the empty fallback and `notice` says why.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub notice: Option<Notice>,
}

impl<T> Loaded<T> {
    const fn ok(value: T) -> Self {
        Self {
            value,
            notice: None,
        }
    }

    const fn fallback(value: T, notice: Notice) -> Self {
        Self {
            value,
            notice: Some(notice),
        }
    }
}

// =============================================================================
// ProductDetail
// =============================================================================

/// An open product-detail view.
///
/// Auctions carry a bid form and, when the close time is known, a running
/// countdown. Dropping the detail stops the countdown.
#[derive(Debug)]
pub struct ProductDetail {
    pub product: Product,
    pub bid_form: Option<BidForm>,
    pub countdown: Option<CountdownTimer>,
}

impl ProductDetail {
    fn open(product: Product) -> Self {
        let now = Utc::now();
        let bid_form = BidForm::new(&product, now).ok();
        let countdown = product.time_left(now).map(CountdownTimer::start);
        Self {
            product,
            bid_form,
            countdown,
        }
    }

    /// Current countdown value, for auctions with a known close time.
    #[must_use]
    pub fn time_left(&self) -> Option<TimeLeft> {
        self.countdown.as_ref().map(CountdownTimer::current)
    }

    /// Close the bid form once the countdown has expired.
    pub fn refresh(&mut self) {
        if self.time_left().is_some_and(|left| left.is_expired())
            && let Some(form) = &mut self.bid_form
        {
            form.close();
        }
    }
}

// =============================================================================
// Storefront
// =============================================================================

/// The storefront application state.
pub struct Storefront {
    config: StorefrontConfig,
    api: Arc<dyn MarketplaceApi>,
    auth: AuthSession,
    cart: Cart,
    watchlist: Watchlist,
}

impl Storefront {
    /// Assemble a storefront from its collaborators, restoring any saved
    /// session from `store`.
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        api: Arc<dyn MarketplaceApi>,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            api,
            auth: AuthSession::restore(store),
            cart: Cart::new(),
            watchlist: Watchlist::new(),
        }
    }

    /// Build a storefront configured from `MARKETPLACE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the storefront
    /// cannot be built from it.
    pub fn from_env() -> Result<Self, StorefrontError> {
        Self::from_config(StorefrontConfig::from_env()?)
    }

    /// Build a storefront configured from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`Storefront::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorefrontError> {
        Self::from_config(StorefrontConfig::from_lookup(lookup)?)
    }

    /// Build the data source and file storage named by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the mock catalog cannot be loaded, the HTTP client
    /// cannot be built or the storage file cannot be read.
    pub fn from_config(config: StorefrontConfig) -> Result<Self, StorefrontError> {
        let api: Arc<dyn MarketplaceApi> = match &config.data_source {
            DataSource::Mock => Arc::new(MockApi::new()?),
            DataSource::Api(url) => Arc::new(HttpApi::new(
                url,
                config.cache_ttl,
                config.request_timeout,
            )?),
        };
        let store = FileStore::open(&config.storage_path)?;
        info!(
            data_source = ?config.data_source,
            storage = %store.path().display(),
            "Storefront ready"
        );
        Ok(Self::new(config, api, Box::new(store)))
    }

    #[must_use]
    pub const fn config(&self) -> &StorefrontConfig {
        &self.config
    }

    #[must_use]
    pub const fn cart(&self) -> &Cart {
        &self.cart
    }

    #[must_use]
    pub const fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.auth.user()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    /// A blank query with the configured page size.
    #[must_use]
    pub fn query(&self) -> ProductQuery {
        ProductQuery {
            page_size: self.config.page_size,
            ..ProductQuery::default()
        }
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// List or search products. Falls back to an empty page.
    #[instrument(skip(self, query), fields(page = query.page))]
    pub async fn browse(&self, query: &ProductQuery) -> Loaded<ProductPage> {
        match self.api.list_products(query).await {
            Ok(page) => Loaded::ok(page),
            Err(error) => {
                warn!(%error, "Product listing failed, showing empty page");
                Loaded::fallback(
                    ProductPage::empty(),
                    Notice::error("Couldn't load products", api_message(&error)),
                )
            }
        }
    }

    /// All category names. Falls back to an empty list.
    pub async fn categories(&self) -> Loaded<Vec<String>> {
        match self.api.categories().await {
            Ok(categories) => Loaded::ok(categories),
            Err(error) => {
                warn!(%error, "Category listing failed");
                Loaded::fallback(
                    Vec::new(),
                    Notice::error("Couldn't load categories", api_message(&error)),
                )
            }
        }
    }

    /// Fetch one product.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Loaded<Option<Product>> {
        match self.api.get_product(id).await {
            Ok(product) => Loaded::ok(Some(product)),
            Err(error) => {
                warn!(%error, "Product lookup failed");
                Loaded::fallback(
                    None,
                    Notice::error("Product unavailable", api_message(&error)),
                )
            }
        }
    }

    /// Open a product-detail view, starting its countdown for auctions.
    pub async fn open_product(&self, id: &ProductId) -> Loaded<Option<ProductDetail>> {
        let Loaded { value, notice } = self.product(id).await;
        Loaded {
            value: value.map(ProductDetail::open),
            notice,
        }
    }

    /// Bid history, newest first. Falls back to an empty list.
    pub async fn bid_history(&self, id: &ProductId) -> Loaded<Vec<BidRecord>> {
        match self.api.bid_history(id).await {
            Ok(bids) => Loaded::ok(bids),
            Err(error) => {
                warn!(%error, product_id = %id, "Bid history failed");
                Loaded::fallback(
                    Vec::new(),
                    Notice::error("Couldn't load bids", api_message(&error)),
                )
            }
        }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Add `quantity` of `product` to the cart.
    pub fn add_to_cart(&mut self, product: &Product, quantity: u32) -> Notice {
        let total = self.cart.add(product, quantity);
        debug!(product_id = %product.id, quantity = total, "Added to cart");
        Notice::info(
            "Added to cart",
            format!("{} has been added to your cart.", product.name),
        )
    }

    /// Remove a line; `None` when the product was not in the cart.
    pub fn remove_from_cart(&mut self, id: &ProductId) -> Option<Notice> {
        self.cart.remove(id).map(|line| {
            Notice::info(
                "Removed from cart",
                format!("{} has been removed from your cart.", line.product.name),
            )
        })
    }

    /// Set a line's quantity; below 1 removes the line.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: u32) -> LineUpdate {
        self.cart.update_quantity(id, quantity)
    }

    pub fn clear_cart(&mut self) {
        self.cart.clear();
    }

    /// Cart totals with the configured tax rate.
    #[must_use]
    pub fn cart_summary(&self) -> CartSummary {
        self.cart.summary(self.config.tax_rate)
    }

    // =========================================================================
    // Watchlist
    // =========================================================================

    /// Watch `product`, mirroring to the server when signed in.
    pub async fn watch(&mut self, product: &Product) -> Notice {
        let added = self.watchlist.add(product);
        if added && let Some(token) = self.auth.token().cloned() {
            let result = self.api.watch(&token, &product.id).await;
            self.mirror_result(result, "watch");
        }
        Notice::info(
            "Added to watchlist",
            format!("{} has been added to your watchlist.", product.name),
        )
    }

    /// Stop watching a product; `None` when it was not watched.
    pub async fn unwatch(&mut self, id: &ProductId) -> Option<Notice> {
        if !self.watchlist.remove(id) {
            return None;
        }
        if let Some(token) = self.auth.token().cloned() {
            let result = self.api.unwatch(&token, id).await;
            self.mirror_result(result, "unwatch");
        }
        Some(Notice::info(
            "Removed from watchlist",
            "The item has been removed from your watchlist.",
        ))
    }

    /// Watch or unwatch `product`. Returns whether it is now watched.
    pub async fn toggle_watch(&mut self, product: &Product) -> bool {
        if self.watchlist.contains(&product.id) {
            self.unwatch(&product.id).await;
            false
        } else {
            self.watch(product).await;
            true
        }
    }

    /// Merge the server-side watchlist into the local one.
    ///
    /// Returns `None` when signed out. Local entries are never dropped.
    #[instrument(skip(self))]
    pub async fn sync_watchlist(&mut self) -> Option<Notice> {
        let token = self.auth.token().cloned()?;
        match self.api.watchlist(&token).await {
            Ok(products) => {
                let added = products
                    .iter()
                    .filter(|product| self.watchlist.add(product))
                    .count();
                debug!(added, "Merged server watchlist");
                Some(Notice::info(
                    "Watchlist synced",
                    format!("{} items watched.", self.watchlist.len()),
                ))
            }
            Err(error) => {
                warn!(%error, "Watchlist sync failed, keeping local watchlist");
                self.auth.check_unauthorized(&error);
                Some(Notice::error("Couldn't sync watchlist", api_message(&error)))
            }
        }
    }

    fn mirror_result(&mut self, result: Result<(), ApiError>, action: &str) {
        if let Err(error) = result {
            warn!(%error, action, "Watchlist mirror failed, keeping local watchlist");
            self.auth.check_unauthorized(&error);
        }
    }

    // =========================================================================
    // Bidding
    // =========================================================================

    /// Validate and submit a bid from the detail view.
    ///
    /// The displayed product is left as is; a fresh `open_product` shows the
    /// backend's updated bid state.
    #[instrument(skip(self, detail), fields(product_id = %detail.product.id))]
    pub async fn place_bid(&mut self, detail: &mut ProductDetail, input: &str) -> Notice {
        detail.refresh();
        let Some(form) = &detail.bid_form else {
            return Notice::error("Bidding unavailable", "This item is not an auction.");
        };
        let amount = match form.validate(input) {
            Ok(amount) => amount,
            Err(error) => return Notice::error("Invalid bid", capitalize(&error.to_string())),
        };
        let Some(token) = self.auth.token().cloned() else {
            return Notice::error("Sign in required", "Please sign in to place a bid.");
        };

        match self.api.place_bid(&token, &detail.product.id, amount).await {
            Ok(receipt) => {
                info!(amount = %receipt.amount, "Bid placed");
                Notice::info(
                    "Bid placed",
                    format!("Your bid of {} has been placed.", receipt.amount),
                )
            }
            Err(error) => {
                self.auth.check_unauthorized(&error);
                Notice::error("Bid failed", api_message(&error))
            }
        }
    }

    // =========================================================================
    // Account
    // =========================================================================

    /// Sign in. Cart and watchlist are untouched either way.
    pub async fn login(&mut self, email: &str, password: &SecretString) -> Notice {
        match self.auth.login(self.api.as_ref(), email, password).await {
            Ok(user) => Notice::info("Welcome back", format!("Signed in as {}.", user.name)),
            Err(error) => {
                warn!(%error, "Login failed");
                Notice::error("Sign in failed", auth_message(&error))
            }
        }
    }

    /// Create an account and sign in.
    pub async fn register(
        &mut self,
        name: &str,
        email: &str,
        password: &SecretString,
    ) -> Notice {
        match self
            .auth
            .register(self.api.as_ref(), name, email, password)
            .await
        {
            Ok(user) => Notice::info("Welcome", format!("Account created for {}.", user.name)),
            Err(error) => {
                warn!(%error, "Registration failed");
                Notice::error("Registration failed", auth_message(&error))
            }
        }
    }

    pub async fn logout(&mut self) -> Notice {
        match self.auth.logout(self.api.as_ref()).await {
            Ok(()) => Notice::info("Signed out", "You have been signed out."),
            Err(error) => Notice::error("Sign out incomplete", auth_message(&error)),
        }
    }

    /// Re-validate the saved session against the backend.
    ///
    /// Returns `None` when signed out or still valid.
    pub async fn refresh_session(&mut self) -> Option<Notice> {
        match self.auth.refresh(self.api.as_ref()).await {
            Ok(_) => None,
            Err(error) => Some(Notice::error("Session check failed", auth_message(&error))),
        }
    }

    /// The signed-in user's profile, refreshed from the backend.
    pub async fn profile(&mut self) -> Loaded<Option<User>> {
        let Some(token) = self.auth.token().cloned() else {
            return Loaded::fallback(None, sign_in_notice());
        };
        match self.api.profile(&token).await {
            Ok(user) => {
                if let Err(error) = self.auth.set_user(user.clone()) {
                    warn!(%error, "Failed to save refreshed profile");
                }
                Loaded::ok(Some(user))
            }
            Err(error) => {
                self.auth.check_unauthorized(&error);
                Loaded::fallback(
                    self.auth.user().cloned(),
                    Notice::error("Couldn't load profile", api_message(&error)),
                )
            }
        }
    }

    /// Change the display name or avatar.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Notice {
        let Some(token) = self.auth.token().cloned() else {
            return sign_in_notice();
        };
        match self.api.update_profile(&token, update).await {
            Ok(user) => {
                let name = user.name.clone();
                match self.auth.set_user(user) {
                    Ok(()) => Notice::info("Profile updated", format!("Saved changes for {name}.")),
                    Err(error) => Notice::error(
                        "Profile updated",
                        format!("Saved on the server, but not locally: {error}"),
                    ),
                }
            }
            Err(error) => {
                self.auth.check_unauthorized(&error);
                Notice::error("Profile update failed", api_message(&error))
            }
        }
    }

    /// Order history, newest first. Falls back to an empty list.
    pub async fn orders(&mut self) -> Loaded<Vec<OrderSummary>> {
        let Some(token) = self.auth.token().cloned() else {
            return Loaded::fallback(Vec::new(), sign_in_notice());
        };
        let result = self.api.orders(&token).await;
        self.authed_list(result, "Couldn't load orders")
    }

    fn authed_list<T>(&mut self, result: Result<Vec<T>, ApiError>, title: &str) -> Loaded<Vec<T>> {
        match result {
            Ok(items) => Loaded::ok(items),
            Err(error) => {
                warn!(%error, "{title}");
                self.auth.check_unauthorized(&error);
                Loaded::fallback(Vec::new(), Notice::error(title, api_message(&error)))
            }
        }
    }
}

impl std::fmt::Debug for Storefront {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storefront")
            .field("config", &self.config)
            .field("auth", &self.auth)
            .field("cart", &self.cart)
            .field("watchlist", &self.watchlist)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Messages
// =============================================================================

fn sign_in_notice() -> Notice {
    Notice::error("Sign in required", "Please sign in to continue.")
}

fn api_message(error: &ApiError) -> String {
    match error {
        ApiError::Rejected(detail) | ApiError::NotFound(detail) => detail.clone(),
        ApiError::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
        ApiError::Http(_) => "Couldn't reach the marketplace. Please try again.".to_string(),
        ApiError::Parse(_) | ApiError::Status { .. } => {
            "The marketplace returned an unexpected response.".to_string()
        }
    }
}

fn auth_message(error: &AuthError) -> String {
    match error {
        AuthError::InvalidEmail(_) => "Please enter a valid email address.".to_string(),
        AuthError::MissingName => "Please enter your name.".to_string(),
        AuthError::EmptyPassword => "Please enter your password.".to_string(),
        AuthError::Api(error) => api_message(error),
        AuthError::Storage(_) => "Couldn't save your session on this device.".to_string(),
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
