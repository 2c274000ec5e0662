//! Item catalog: the base price and stock bounds of every tradeable item.
//!
//! Markets are seeded lazily from the catalog the first time a location's
//! prices are read. Items absent from the catalog are not tradeable anywhere.

use std::collections::BTreeMap;

use caravan_types::{ItemId, MarketPriceRecord};
use serde::{Deserialize, Serialize};

/// Catalog data for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Immutable anchor price.
    pub base_price: u32,
    /// Stock a market starts with.
    pub default_stock: u32,
    /// Ceiling for restock and player sales.
    pub max_stock: u32,
}

impl CatalogEntry {
    /// A fresh price record for a newly seeded market.
    pub fn seed_record(&self) -> MarketPriceRecord {
        MarketPriceRecord::seeded(self.base_price, self.default_stock.min(self.max_stock))
    }
}

/// All tradeable items keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCatalog {
    items: BTreeMap<ItemId, CatalogEntry>,
}

impl ItemCatalog {
    /// An empty catalog.
    pub const fn new() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }

    /// Add or replace an item.
    pub fn insert(&mut self, id: impl Into<ItemId>, entry: CatalogEntry) {
        self.items.insert(id.into(), entry);
    }

    /// Look up an item.
    pub fn get(&self, id: &ItemId) -> Option<&CatalogEntry> {
        self.items.get(id)
    }

    /// Whether the item is tradeable.
    pub fn contains(&self, id: &ItemId) -> bool {
        self.items.contains_key(id)
    }

    /// Iterate over all items in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemId, &CatalogEntry)> {
        self.items.iter()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The goods traded along the default caravan routes.
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        for (id, base_price, default_stock, max_stock) in [
            ("bread", 5, 40, 80),
            ("water", 2, 60, 120),
            ("dried_meat", 12, 25, 50),
            ("grain", 4, 50, 100),
            ("salt", 8, 30, 60),
            ("herbs", 10, 20, 40),
            ("cloth", 18, 15, 30),
            ("rope", 9, 20, 40),
            ("lamp_oil", 14, 15, 30),
            ("iron_ore", 25, 10, 25),
            ("tools", 45, 6, 15),
            ("spices", 60, 5, 12),
            ("silk", 120, 3, 8),
            ("healing_salve", 35, 8, 16),
        ] {
            catalog.insert(
                id,
                CatalogEntry {
                    base_price,
                    default_stock,
                    max_stock,
                },
            );
        }
        catalog
    }
}
