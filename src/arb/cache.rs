//! Latest quote per (exchange, pair), with staleness filtering.

use crate::arb::types::{ExchangeId, PairKey, PriceQuote, TokenPair};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// A cached quote and the wall-clock time it was received
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The quote, replaced wholesale on update
    pub quote: PriceQuote,
    /// When the cache received the quote
    pub received_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Age of the entry relative to `now`
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.received_at)
    }
}

/// Shared quote store.
///
/// Keys are sharded across independent locks, so updates for different
/// (exchange, pair) keys do not contend, while a read of a key always observes
/// either the previous or the next complete entry. Nothing here is async and
/// no guard escapes a method.
#[derive(Debug, Default)]
pub struct QuoteCache {
    /// Entries keyed by exchange and canonical pair
    entries: DashMap<(ExchangeId, PairKey), CacheEntry>,
}

impl QuoteCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `quote` as the latest for its exchange and pair, received now
    pub fn update(&self, quote: PriceQuote) {
        self.update_at(quote, Utc::now());
    }

    /// Store `quote` with an explicit receipt time
    pub fn update_at(&self, quote: PriceQuote, received_at: DateTime<Utc>) {
        let key = (quote.exchange().clone(), quote.pair().key());
        self.entries.insert(key, CacheEntry { quote, received_at });
    }

    /// Current entry for an exchange and pair, fresh or not
    #[must_use]
    pub fn get(&self, exchange: &ExchangeId, pair: &TokenPair) -> Option<CacheEntry> {
        self.entries
            .get(&(exchange.clone(), pair.key()))
            .map(|entry| entry.value().clone())
    }

    /// All quotes for `pair` whose age is within `window`, ordered by exchange.
    ///
    /// # Arguments
    /// * `pair` - The pair to look up
    /// * `now` - Reference time for age computation
    /// * `window` - Staleness window; an entry exactly `window` old is fresh
    ///
    /// # Returns
    /// `(exchange, quote)` tuples sorted by exchange id
    #[must_use]
    pub fn fresh_quotes(
        &self,
        pair: &TokenPair,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Vec<(ExchangeId, PriceQuote)> {
        let key = pair.key();
        let mut fresh: Vec<(ExchangeId, PriceQuote)> = self
            .entries
            .iter()
            .filter(|entry| entry.key().1 == key && entry.value().age(now) <= window)
            .map(|entry| (entry.key().0.clone(), entry.value().quote.clone()))
            .collect();
        fresh.sort_by(|a, b| a.0.cmp(&b.0));
        fresh
    }

    /// Number of cached entries, including stale ones
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
