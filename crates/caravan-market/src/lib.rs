//! Dynamic market pricing for the Caravan simulation core.
//!
//! Every location keeps its own price and stock for each catalog item. Prices
//! fluctuate around an immutable base price, lean with the time of day and
//! respond to temporary market events. The player's charisma shifts the
//! price of each trade.
//!
//! # Modules
//!
//! - [`catalog`] -- Base prices and stock bounds of tradeable items.
//! - [`pricing`] -- Price formulas, time-of-day bias and charisma modifier.
//! - [`engine`] -- [`MarketPriceEngine`]: lazy seeding, ticks, events, trades.
//! - [`error`] -- Error types.

pub mod catalog;
pub mod engine;
pub mod error;
pub mod pricing;

pub use catalog::{CatalogEntry, ItemCatalog};
pub use engine::{
    MarketConfig, MarketEvent, MarketPriceEngine, MarketTickReport, PriceTable, TradeReceipt,
};
pub use error::MarketError;
