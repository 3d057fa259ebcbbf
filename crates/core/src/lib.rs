//! Marketplace Core - Domain types and client-side shopping state.
//!
//! This crate provides the types shared by every marketplace component:
//! - `storefront` - Data access, auth session and application state
//! - `cli` - Terminal front end (`mkt`)
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O,
//! no HTTP clients, no timers. The storefront crate drives these types from
//! user intents and owns the side effects.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and emails
//! - [`product`] - The unified, read-only product schema
//! - [`cart`] - Cart lines, quantities and derived totals
//! - [`watchlist`] - Saved-for-later products
//! - [`auction`] - Countdown arithmetic and client-side bid checks
//! - [`user`] - Account, order and bid history records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auction;
pub mod cart;
pub mod product;
pub mod types;
pub mod user;
pub mod watchlist;

pub use auction::{BidError, BidForm, TimeLeft};
pub use cart::{Cart, CartLine, CartSummary, LineUpdate};
pub use product::{Auction, AuctionEnd, Listing, Product, ProductSnapshot};
pub use types::*;
pub use user::{BidRecord, OrderItem, OrderStatus, OrderSummary, User};
pub use watchlist::{Watchlist, WatchlistEntry};
