//! Marketplace storefront client library.
//!
//! Everything a front end needs to run the storefront: configuration, the
//! data-access seam with its REST and mock implementations, the persisted
//! auth session, auction countdowns and the [`Storefront`] state object
//! that owns the cart and watchlist.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod config;
pub mod countdown;
pub mod error;
pub mod notice;
pub mod state;
pub mod storage;

pub use config::StorefrontConfig;
pub use error::StorefrontError;
pub use notice::{Notice, NoticeLevel};
pub use state::{Loaded, ProductDetail, Storefront};
