use crate::arb::error::TokenPairError;
use crate::utils::decimal::trimmed;
use alloy::primitives::Address;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use derive_more::Display;
use serde::Serialize;
use std::fmt;

/// Name of an integrated exchange, e.g. `uniswap_v3` or `sushiswap`.
///
/// Ordering is plain string ordering; fresh quotes are sorted by it so that
/// downstream comparison is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize)]
pub struct ExchangeId(String);

impl ExchangeId {
    /// Create an exchange id from its name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The exchange name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExchangeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An ERC-20 token as configured for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Token {
    /// The token contract address
    pub address: Address,
    /// Ticker symbol, used for logs and persistence
    pub symbol: String,
    /// Decimal precision of the token's base unit
    pub decimals: u8,
}

impl Token {
    /// Create a new token
    #[must_use]
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }
}

/// Cache key of a token pair: both addresses in canonical order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PairKey {
    /// The lower address
    pub token0: Address,
    /// The higher address
    pub token1: Address,
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}

/// An unordered pair of two distinct tokens.
///
/// The constructor sorts the tokens by address, so `(A, B)` and `(B, A)` build
/// the same value. This is the same ordering Uniswap pools use for
/// `token0`/`token1`, so a pool's native price orientation matches the pair's.
///
/// Every price in this crate is quoted as units of `token1` per one `token0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TokenPair {
    /// Token with the lower address
    token0: Token,
    /// Token with the higher address
    token1: Token,
}

impl TokenPair {
    /// Build a pair from two tokens in any order.
    ///
    /// # Errors
    /// * If both tokens have the same address
    pub fn new(a: Token, b: Token) -> Result<Self, TokenPairError> {
        if a.address == b.address {
            return Err(TokenPairError::IdenticalTokens(a.address));
        }
        let (token0, token1) = if a.address < b.address { (a, b) } else { (b, a) };
        Ok(Self { token0, token1 })
    }

    /// The token with the lower address (the base of every price)
    #[must_use]
    pub fn token0(&self) -> &Token {
        &self.token0
    }

    /// The token with the higher address (the quote unit of every price)
    #[must_use]
    pub fn token1(&self) -> &Token {
        &self.token1
    }

    /// Canonical cache key
    #[must_use]
    pub fn key(&self) -> PairKey {
        PairKey {
            token0: self.token0.address,
            token1: self.token1.address,
        }
    }
}

impl fmt::Display for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0.symbol, self.token1.symbol)
    }
}

/// A point-in-time price observation from one exchange.
///
/// Quotes are never edited. A newer observation for the same exchange and
/// pair replaces the old one in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    /// Exchange that produced the quote
    exchange: ExchangeId,
    /// Pair the quote is for
    pair: TokenPair,
    /// Units of token1 per one token0
    price: BigDecimal,
    /// Available depth in token1 units; `None` when unknown
    liquidity: Option<BigDecimal>,
    /// When the source observed the price
    observed_at: DateTime<Utc>,
}

impl PriceQuote {
    /// Create a quote without liquidity information
    #[must_use]
    pub fn new(
        exchange: ExchangeId,
        pair: TokenPair,
        price: BigDecimal,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            exchange,
            pair,
            price,
            liquidity: None,
            observed_at,
        }
    }

    /// Return a copy of this quote carrying the given depth
    #[must_use]
    pub fn with_liquidity(self, liquidity: Option<BigDecimal>) -> Self {
        Self { liquidity, ..self }
    }

    /// Exchange that produced the quote
    #[must_use]
    pub fn exchange(&self) -> &ExchangeId {
        &self.exchange
    }

    /// Pair the quote is for
    #[must_use]
    pub fn pair(&self) -> &TokenPair {
        &self.pair
    }

    /// Units of token1 per one token0
    #[must_use]
    pub fn price(&self) -> &BigDecimal {
        &self.price
    }

    /// Liquidity depth, if the source reported one
    #[must_use]
    pub fn liquidity(&self) -> Option<&BigDecimal> {
        self.liquidity.as_ref()
    }

    /// Observation time
    #[must_use]
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}

/// A directional spread whose simulated net profit cleared the threshold.
///
/// `buy_price < sell_price` always holds. The record has no identity of its
/// own; the persistent sink assigns one on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArbitrageOpportunity {
    /// Pair being arbitraged
    pub pair: TokenPair,
    /// Exchange to buy token0 on
    pub buy_exchange: ExchangeId,
    /// Exchange to sell token0 on
    pub sell_exchange: ExchangeId,
    /// Price on the buy exchange
    pub buy_price: BigDecimal,
    /// Price on the sell exchange
    pub sell_price: BigDecimal,
    /// `sell_price - buy_price`
    pub price_difference: BigDecimal,
    /// Difference relative to the buy price, in percent
    pub price_difference_percentage: BigDecimal,
    /// Trade size assumed by the simulation, in the reference unit
    pub trade_amount: BigDecimal,
    /// Gross profit before costs
    pub estimated_profit: BigDecimal,
    /// Expected slippage cost
    pub slippage_cost: BigDecimal,
    /// Flat gas estimate
    pub gas_cost: BigDecimal,
    /// Gross profit minus slippage and gas
    pub net_profit: BigDecimal,
    /// When the opportunity was materialized
    pub detected_at: DateTime<Utc>,
}

impl ArbitrageOpportunity {
    /// The opportunity with its detection timestamp cleared, for comparing
    /// two evaluations of the same quotes.
    #[must_use]
    pub fn without_timestamp(&self) -> Self {
        Self {
            detected_at: DateTime::<Utc>::default(),
            ..self.clone()
        }
    }
}

impl fmt::Display for ArbitrageOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} buy on {} @ {} sell on {} @ {} net {}",
            self.pair,
            self.buy_exchange,
            trimmed(&self.buy_price),
            self.sell_exchange,
            trimmed(&self.sell_price),
            trimmed(&self.net_profit)
        )
    }
}
