//! Finds every directional spread among the fresh quotes of one pair.
//!
//! The evaluator only answers "does a spread exist"; whether it is worth
//! acting on is decided by the simulator.

use crate::arb::types::{ExchangeId, PriceQuote, TokenPair};
use crate::utils::decimal::round_monetary;
use bigdecimal::{BigDecimal, Zero};
use itertools::Itertools;

/// A positive directional spread before any cost adjustment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The pair
    pub pair: TokenPair,
    /// Cheaper exchange
    pub buy_exchange: ExchangeId,
    /// Dearer exchange
    pub sell_exchange: ExchangeId,
    /// Price on the buy side
    pub buy_price: BigDecimal,
    /// Price on the sell side
    pub sell_price: BigDecimal,
    /// Depth on the buy side, if known
    pub buy_liquidity: Option<BigDecimal>,
    /// Depth on the sell side, if known
    pub sell_liquidity: Option<BigDecimal>,
}

impl Candidate {
    /// Build a candidate if buying at `buy` and selling at `sell` is a positive
    /// spread once both prices are rounded to 18 fractional digits
    fn directional(pair: &TokenPair, buy: &PriceQuote, sell: &PriceQuote) -> Option<Self> {
        let (buy_price, sell_price) = (round_monetary(buy.price()), round_monetary(sell.price()));
        if sell_price <= buy_price {
            return None;
        }
        Some(Self {
            pair: pair.clone(),
            buy_exchange: buy.exchange().clone(),
            sell_exchange: sell.exchange().clone(),
            buy_price,
            sell_price,
            buy_liquidity: buy.liquidity().cloned(),
            sell_liquidity: sell.liquidity().cloned(),
        })
    }

    /// `sell_price - buy_price`
    #[must_use]
    pub fn spread(&self) -> BigDecimal {
        &self.sell_price - &self.buy_price
    }
}

/// Evaluate the fresh quotes of one pair.
///
/// Both directions of every unordered exchange pair are checked; a direction
/// is a candidate iff its sell price is strictly greater than its buy price
/// at 18 fractional digits. Prices equal at that scale produce nothing. Fewer than two distinct exchanges produce
/// nothing.
///
/// # Arguments
/// * `pair` - The pair being evaluated
/// * `fresh` - Fresh quotes, as returned by `QuoteCache::fresh_quotes`
///
/// # Returns
/// Candidates ordered by exchange, the `X -> Y` direction before `Y -> X`
#[must_use]
pub fn evaluate(pair: &TokenPair, fresh: &[(ExchangeId, PriceQuote)]) -> Vec<Candidate> {
    let quotes: Vec<&PriceQuote> = fresh
        .iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .dedup_by(|a, b| a.0 == b.0)
        .map(|(_, quote)| quote)
        .collect();

    if quotes.len() < 2 {
        return Vec::new();
    }

    quotes
        .iter()
        .tuple_combinations()
        .flat_map(|(x, y)| {
            [
                Candidate::directional(pair, x, y),
                Candidate::directional(pair, y, x),
            ]
        })
        .flatten()
        .collect()
}

/// Spread between the highest and lowest fresh price, in percent of the lowest.
///
/// # Returns
/// `None` with fewer than two quotes or a non-positive lowest price
#[must_use]
pub fn price_spread(fresh: &[(ExchangeId, PriceQuote)]) -> Option<BigDecimal> {
    if fresh.len() < 2 {
        return None;
    }
    let (min, max) = fresh
        .iter()
        .map(|(_, quote)| quote.price())
        .minmax()
        .into_option()?;
    if min <= &BigDecimal::zero() {
        return None;
    }
    Some((max - min) / min * BigDecimal::from(100))
}
