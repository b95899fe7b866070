use crate::arb::error::SourceError;
use crate::arb::types::{ExchangeId, PairKey, PriceQuote, TokenPair};
use crate::source::{check_factory, HealthStatus, PriceSource};
use crate::utils::decimal::{from_raw, is_positive, normalize};
use alloy::network::Ethereum;
use alloy::primitives::Address;
use alloy::providers::RootProvider;
use alloy::sol;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::Utc;
use dashmap::DashMap;
use std::time::Duration;

sol! {
    #[sol(rpc)]
    interface IUniswapV2Factory {
        function getPair(address tokenA, address tokenB) external view returns (address pair);
    }

    #[sol(rpc)]
    interface IUniswapV2Pair {
        function getReserves() external view returns (uint112 reserve0, uint112 reserve1, uint32 blockTimestampLast);
    }
}

/// Normalized reserves of a V2 pool, in whole token units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reserves {
    /// token0 reserve
    pub reserve0: BigDecimal,
    /// token1 reserve
    pub reserve1: BigDecimal,
}

impl Reserves {
    /// Normalize raw reserves by token decimals
    #[must_use]
    pub fn from_raw(raw0: &BigDecimal, raw1: &BigDecimal, pair: &TokenPair) -> Self {
        Self {
            reserve0: normalize(raw0, pair.token0().decimals),
            reserve1: normalize(raw1, pair.token1().decimals),
        }
    }

    /// Spot price in token1 per token0. `None` for an empty pool.
    #[must_use]
    pub fn price(&self) -> Option<BigDecimal> {
        if !is_positive(&self.reserve0) || !is_positive(&self.reserve1) {
            return None;
        }
        Some(&self.reserve1 / &self.reserve0)
    }
}

/// Any Uniswap V2 fork (Uniswap, SushiSwap, Aerodrome classic pools, ...)
/// identified by its factory address.
pub struct UniswapV2Source {
    /// Exchange identifier
    id: ExchangeId,
    /// Factory contract
    factory: Address,
    /// RPC provider
    provider: RootProvider<Ethereum>,
    /// Pool addresses already resolved through the factory
    pools: DashMap<PairKey, Address>,
    /// Health-check latency threshold
    degraded_after: Duration,
}

impl UniswapV2Source {
    /// Create an adapter for the fork deployed at `factory`
    #[must_use]
    pub fn new(
        id: ExchangeId,
        factory: Address,
        provider: RootProvider<Ethereum>,
        degraded_after: Duration,
    ) -> Self {
        Self {
            id,
            factory,
            provider,
            pools: DashMap::new(),
            degraded_after,
        }
    }

    /// Resolve the pool for a pair through the factory, caching hits
    async fn pool(&self, pair: &TokenPair) -> Result<Address, SourceError> {
        let key = pair.key();
        if let Some(pool) = self.pools.get(&key) {
            return Ok(*pool);
        }

        let factory = IUniswapV2Factory::new(self.factory, &self.provider);
        let pool = factory
            .getPair(key.token0, key.token1)
            .call()
            .await
            .map_err(|e| SourceError::unavailable(&self.id, e))?
            .pair;

        if pool == Address::ZERO {
            return Err(SourceError::QuoteUnavailable {
                exchange: self.id.clone(),
                pair: key,
            });
        }
        self.pools.insert(key, pool);
        Ok(pool)
    }

    /// Current normalized reserves of the pair's pool
    async fn reserves(&self, pair: &TokenPair) -> Result<Reserves, SourceError> {
        let pool = IUniswapV2Pair::new(self.pool(pair).await?, &self.provider);
        let reserves = pool
            .getReserves()
            .call()
            .await
            .map_err(|e| SourceError::unavailable(&self.id, e))?;

        let raw0 = from_raw(reserves.reserve0)
            .ok_or_else(|| SourceError::unavailable(&self.id, "unparseable reserve0"))?;
        let raw1 = from_raw(reserves.reserve1)
            .ok_or_else(|| SourceError::unavailable(&self.id, "unparseable reserve1"))?;
        Ok(Reserves::from_raw(&raw0, &raw1, pair))
    }
}

#[async_trait]
impl PriceSource for UniswapV2Source {
    fn exchange(&self) -> &ExchangeId {
        &self.id
    }

    async fn get_price(&self, pair: &TokenPair) -> Result<PriceQuote, SourceError> {
        let reserves = self.reserves(pair).await?;
        let price = reserves.price().ok_or_else(|| SourceError::QuoteUnavailable {
            exchange: self.id.clone(),
            pair: pair.key(),
        })?;

        log::debug!(
            "source::uniswap_v2: {} {} price {} (reserves {} / {})",
            self.id,
            pair,
            price,
            reserves.reserve0,
            reserves.reserve1
        );

        Ok(PriceQuote::new(self.id.clone(), pair.clone(), price, Utc::now())
            .with_liquidity(Some(reserves.reserve1)))
    }

    async fn get_liquidity(&self, pair: &TokenPair) -> Result<Option<BigDecimal>, SourceError> {
        let reserves = self.reserves(pair).await?;
        Ok(is_positive(&reserves.reserve1).then_some(reserves.reserve1))
    }

    async fn health_check(&self) -> HealthStatus {
        check_factory(&self.id, &self.provider, self.factory, self.degraded_after).await
    }
}
