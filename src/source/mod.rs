//! # Price Sources
//!
//! One adapter per integrated exchange. The scheduler and evaluator only see
//! the [`PriceSource`] trait, so adding an exchange means adding an adapter.

use crate::arb::error::SourceError;
use crate::arb::types::{ExchangeId, PriceQuote, TokenPair};
use crate::config::{ExchangeConfig, ExchangeKind};
use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::{Provider, RootProvider};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use derive_more::Display;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Uniswap V2 style constant-product pools
pub mod uniswap_v2;
/// Uniswap V3 style concentrated-liquidity pools
pub mod uniswap_v3;

pub use uniswap_v2::UniswapV2Source;
pub use uniswap_v3::UniswapV3Source;

/// Result of a source health check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum HealthStatus {
    /// Responding normally
    #[display("ok")]
    Ok,
    /// Responding, but slowly
    #[display("degraded")]
    Degraded,
    /// Not responding; skipped for the cycle
    #[display("down")]
    Down,
}

impl HealthStatus {
    /// Whether the scheduler should fetch from the source
    #[must_use]
    pub fn is_usable(self) -> bool {
        self != Self::Down
    }
}

/// Uniform contract for exchange integrations.
///
/// Every price is units of `pair.token1()` per one `pair.token0()`.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Exchange identifier
    fn exchange(&self) -> &ExchangeId;

    /// Fetch the current price for a pair.
    ///
    /// # Errors
    /// * `SourceUnavailable` on connectivity failure
    /// * `QuoteUnavailable` if the exchange has no market for the pair
    async fn get_price(&self, pair: &TokenPair) -> Result<PriceQuote, SourceError>;

    /// Fetch liquidity depth for a pair, in token1 units. `None` means unknown.
    ///
    /// # Errors
    /// * `SourceUnavailable` on connectivity failure
    /// * `QuoteUnavailable` if the exchange has no market for the pair
    async fn get_liquidity(&self, pair: &TokenPair) -> Result<Option<BigDecimal>, SourceError>;

    /// Check the source without side effects
    async fn health_check(&self) -> HealthStatus;
}

/// Health check shared by the on-chain adapters: fetch the code deployed at
/// the adapter's factory. A failed request or an address with no contract
/// is down.
///
/// # Arguments
/// * `id` - Exchange being checked, for logging
/// * `provider` - RPC provider
/// * `factory` - The adapter's factory contract
/// * `degraded_after` - Latency above which the source counts as degraded
pub async fn check_factory(
    id: &ExchangeId,
    provider: &RootProvider<Ethereum>,
    factory: Address,
    degraded_after: Duration,
) -> HealthStatus {
    let started = Instant::now();
    let code_len = match provider.get_code_at(factory).await {
        Ok(code) => {
            if code.is_empty() {
                log::warn!("source::check_factory: {id}: no contract at factory {factory}");
            }
            Some(code.len())
        }
        Err(e) => {
            log::warn!("source::check_factory: {id}: code request for {factory} failed: {e}");
            None
        }
    };
    factory_status(code_len, started.elapsed(), degraded_after)
}

/// Status from the factory code length (`None` when the request failed) and
/// the request latency
fn factory_status(code_len: Option<usize>, elapsed: Duration, degraded_after: Duration) -> HealthStatus {
    match code_len {
        None | Some(0) => HealthStatus::Down,
        Some(_) if elapsed > degraded_after => HealthStatus::Degraded,
        Some(_) => HealthStatus::Ok,
    }
}

/// Build one adapter per configured exchange.
///
/// # Arguments
/// * `exchanges` - Exchange definitions from the config
/// * `provider` - Shared RPC provider
/// * `degraded_after` - Health-check latency threshold
///
/// # Returns
/// Adapters in configuration order
#[must_use]
pub fn create_sources(
    exchanges: &[ExchangeConfig],
    provider: &RootProvider<Ethereum>,
    degraded_after: Duration,
) -> Vec<Arc<dyn PriceSource>> {
    exchanges
        .iter()
        .map(|exchange| -> Arc<dyn PriceSource> {
            let id = ExchangeId::new(exchange.name.clone());
            match exchange.kind {
                ExchangeKind::V2 => Arc::new(UniswapV2Source::new(
                    id,
                    exchange.factory,
                    provider.clone(),
                    degraded_after,
                )),
                ExchangeKind::V3 { fee } => Arc::new(UniswapV3Source::new(
                    id,
                    exchange.factory,
                    fee,
                    provider.clone(),
                    degraded_after,
                )),
            }
        })
        .collect()
}
