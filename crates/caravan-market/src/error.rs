//! Error types for the caravan-market crate.
//!
//! Unknown items are not errors: pricing and trade calls return `None` for
//! them. Errors here are reserved for trades that cannot execute and for
//! saved records that cannot be restored.

use caravan_types::{ItemId, LocationId};

/// Errors that can occur while executing a trade.
#[derive(Debug, thiserror::Error)]
pub enum MarketError {
    /// The market does not hold enough units for the purchase.
    #[error("insufficient stock of {item} at {location}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Market location.
        location: LocationId,
        /// Item requested.
        item: ItemId,
        /// Units requested.
        requested: u32,
        /// Units in stock.
        available: u32,
    },

    /// The market cannot take more units of the item.
    #[error("market at {location} cannot hold {offered} more {item} (stock {stock}, max {max_stock})")]
    StockFull {
        /// Market location.
        location: LocationId,
        /// Item offered.
        item: ItemId,
        /// Units offered.
        offered: u32,
        /// Units currently in stock.
        stock: u32,
        /// Stock ceiling for the item.
        max_stock: u32,
    },

    /// A saved market record breaks the price floor or stock ceiling.
    #[error("invalid market record for {item} at {location}: {reason}")]
    InvalidRecord {
        /// Market location.
        location: LocationId,
        /// Item of the record.
        item: ItemId,
        /// What is wrong with it.
        reason: String,
    },

    /// A trade total or stock count overflowed.
    #[error("arithmetic overflow in market computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },
}
