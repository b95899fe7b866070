use crate::arb::types::{ExchangeId, PairKey};
use alloy::primitives::Address;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single price-source call.
///
/// Caught at the scheduler boundary; the evaluator never sees one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// Connectivity problem; the source is skipped for this cycle only
    #[error("{exchange} unavailable: {reason}")]
    SourceUnavailable {
        /// Exchange that failed
        exchange: ExchangeId,
        /// Transport error text
        reason: String,
    },

    /// The call did not settle within the fetch timeout. Handled exactly like
    /// `SourceUnavailable`, counted separately.
    #[error("{exchange} timed out after {}ms", after.as_millis())]
    TimedOut {
        /// Exchange that timed out
        exchange: ExchangeId,
        /// The timeout that elapsed
        after: Duration,
    },

    /// The exchange has no market for the pair (no pool, empty reserves)
    #[error("{exchange} has no market for {pair}")]
    QuoteUnavailable {
        /// Exchange queried
        exchange: ExchangeId,
        /// Pair that has no market
        pair: PairKey,
    },
}

impl SourceError {
    /// Build a `SourceUnavailable` from any displayable transport error
    pub fn unavailable(exchange: &ExchangeId, reason: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable {
            exchange: exchange.clone(),
            reason: reason.to_string(),
        }
    }

    /// Exchange the error belongs to
    #[must_use]
    pub fn exchange(&self) -> &ExchangeId {
        match self {
            Self::SourceUnavailable { exchange, .. }
            | Self::TimedOut { exchange, .. }
            | Self::QuoteUnavailable { exchange, .. } => exchange,
        }
    }

    /// Transient failures are expected to clear by the next cycle
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::QuoteUnavailable { .. })
    }
}

/// Failure to simulate one candidate. Aborts that candidate only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// A monetary value does not fit 36 digits with 18 fractional digits,
    /// or could not be computed at all
    #[error("computation overflow in {quantity}: {detail}")]
    ComputationOverflow {
        /// Name of the quantity being computed
        quantity: &'static str,
        /// What went wrong
        detail: String,
    },
}

/// Invalid token pair construction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenPairError {
    /// Both sides of the pair are the same token
    #[error("token pair needs two distinct tokens, got {0} twice")]
    IdenticalTokens(Address),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_error_display() {
        let err = SourceError::TimedOut {
            exchange: ExchangeId::from("sushiswap"),
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "sushiswap timed out after 250ms");
        assert!(err.is_transient());
    }

    #[test]
    fn test_quote_unavailable_is_persistent() {
        let err = SourceError::QuoteUnavailable {
            exchange: ExchangeId::from("uniswap_v2"),
            pair: PairKey {
                token0: Address::ZERO,
                token1: Address::repeat_byte(1),
            },
        };
        assert!(!err.is_transient());
        assert_eq!(err.exchange().as_str(), "uniswap_v2");
    }
}
