//! Error types for the caravan-survival crate.
//!
//! Vital arithmetic uses checked [`Decimal`](rust_decimal::Decimal)
//! operations; an overflow is reported rather than wrapped or panicking, and
//! the caller skips the tick without touching the vitals.

/// Errors that can occur during survival computations.
#[derive(Debug, thiserror::Error)]
pub enum SurvivalError {
    /// An arithmetic overflow occurred during a vital computation.
    #[error("arithmetic overflow in vital computation: {context}")]
    ArithmeticOverflow {
        /// Description of what was being computed.
        context: String,
    },

    /// The vitals configuration cannot be used.
    #[error("invalid vitals configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong.
        reason: String,
    },
}
