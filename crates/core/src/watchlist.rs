//! Saved-for-later products.

use serde::{Deserialize, Serialize};

use crate::product::{Product, ProductSnapshot};
use crate::types::ProductId;

/// A watched product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub product: ProductSnapshot,
}

impl WatchlistEntry {
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }
}

/// Insertion-ordered set of watched products, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watchlist {
    entries: Vec<WatchlistEntry>,
}

impl Watchlist {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Watch `product`. Returns `false` if it was already watched, in which
    /// case its snapshot is refreshed in place.
    pub fn add(&mut self, product: &Product) -> bool {
        let snapshot = product.snapshot();
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.product.id == product.id)
        {
            entry.product = snapshot;
            return false;
        }
        self.entries.push(WatchlistEntry { product: snapshot });
        true
    }

    /// Stop watching `product_id`. Returns whether it was watched.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.product_id() != product_id);
        self.entries.len() != before
    }

    /// Watch `product` if it is not watched, otherwise stop watching it.
    /// Returns whether it is watched afterwards.
    pub fn toggle(&mut self, product: &Product) -> bool {
        if self.remove(&product.id) {
            false
        } else {
            self.add(product)
        }
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.product_id() == product_id)
    }

    #[must_use]
    pub fn entries(&self) -> &[WatchlistEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
