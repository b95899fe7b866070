use crate::arb::error::SourceError;
use crate::arb::types::{ExchangeId, PairKey, PriceQuote, TokenPair};
use crate::source::{check_factory, HealthStatus, PriceSource};
use crate::utils::decimal::{decimal_base, from_raw, is_positive, normalize};
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
    interface IUniswapV3Factory {
        function getPool(address tokenA, address tokenB, uint24 fee) external view returns (address pool);
    }

    #[sol(rpc)]
    interface IUniswapV3Pool {
        function slot0() external view returns (uint160 sqrtPriceX96, int24 tick, uint16 observationIndex, uint16 observationCardinality, uint16 observationCardinalityNext, uint8 feeProtocol, bool unlocked);
        function liquidity() external view returns (uint128);
    }
}

/// `2^96`, the fixed-point base of `sqrtPriceX96`
fn q96() -> BigDecimal {
    BigDecimal::from(1_u64 << 48) * BigDecimal::from(1_u64 << 48)
}

/// Price in token1 per token0 from a pool's `sqrtPriceX96`.
///
/// `(sqrtPriceX96 / 2^96)^2` is the raw ratio of base units; scaling by
/// `10^(decimals0 - decimals1)` turns it into whole-token units.
#[must_use]
pub fn price_from_sqrt(sqrt_price_x96: &BigDecimal, pair: &TokenPair) -> Option<BigDecimal> {
    if !is_positive(sqrt_price_x96) {
        return None;
    }
    let ratio = sqrt_price_x96 / q96();
    let raw = &ratio * &ratio;
    let (d0, d1) = (pair.token0().decimals, pair.token1().decimals);
    let price = if d0 >= d1 {
        raw * decimal_base(d0 - d1)
    } else {
        raw / decimal_base(d1 - d0)
    };
    Some(price)
}

/// Virtual token1 reserve `L * sqrtP` in whole token1 units
#[must_use]
pub fn depth_from_liquidity(
    liquidity: &BigDecimal,
    sqrt_price_x96: &BigDecimal,
    pair: &TokenPair,
) -> BigDecimal {
    normalize(&(liquidity * sqrt_price_x96 / q96()), pair.token1().decimals)
}

/// A Uniswap V3 factory at one fee tier
pub struct UniswapV3Source {
    /// Exchange identifier
    id: ExchangeId,
    /// Factory contract
    factory: Address,
    /// Fee tier in hundredths of a bip (500 = 0.05%)
    fee: u32,
    /// RPC provider
    provider: RootProvider<Ethereum>,
    /// Pool addresses already resolved through the factory
    pools: DashMap<PairKey, Address>,
    /// Health-check latency threshold
    degraded_after: Duration,
}

impl UniswapV3Source {
    /// Create an adapter for the factory at `factory` and fee tier `fee`
    #[must_use]
    pub fn new(
        id: ExchangeId,
        factory: Address,
        fee: u32,
        provider: RootProvider<Ethereum>,
        degraded_after: Duration,
    ) -> Self {
        Self {
            id,
            factory,
            fee,
            provider,
            pools: DashMap::new(),
            degraded_after,
        }
    }

    /// Error for a pair this exchange cannot quote
    fn no_market(&self, pair: &TokenPair) -> SourceError {
        SourceError::QuoteUnavailable {
            exchange: self.id.clone(),
            pair: pair.key(),
        }
    }

    /// Resolve the pool for a pair at this fee tier, caching hits
    async fn pool(&self, pair: &TokenPair) -> Result<Address, SourceError> {
        let key = pair.key();
        if let Some(pool) = self.pools.get(&key) {
            return Ok(*pool);
        }

        let fee = self
            .fee
            .try_into()
            .map_err(|_| {
                SourceError::unavailable(&self.id, format!("invalid fee tier {}", self.fee))
            })?;
        let factory = IUniswapV3Factory::new(self.factory, &self.provider);
        let pool = factory
            .getPool(key.token0, key.token1, fee)
            .call()
            .await
            .map_err(|e| SourceError::unavailable(&self.id, e))?
            .pool;

        if pool == Address::ZERO {
            return Err(self.no_market(pair));
        }
        self.pools.insert(key, pool);
        Ok(pool)
    }

    /// Current `sqrtPriceX96` of a pool
    async fn sqrt_price(&self, pool: Address) -> Result<BigDecimal, SourceError> {
        let slot0 = IUniswapV3Pool::new(pool, &self.provider)
            .slot0()
            .call()
            .await
            .map_err(|e| SourceError::unavailable(&self.id, e))?;
        from_raw(slot0.sqrtPriceX96)
            .ok_or_else(|| SourceError::unavailable(&self.id, "unparseable sqrtPriceX96"))
    }
}

#[async_trait]
impl PriceSource for UniswapV3Source {
    fn exchange(&self) -> &ExchangeId {
        &self.id
    }

    async fn get_price(&self, pair: &TokenPair) -> Result<PriceQuote, SourceError> {
        let sqrt_price = self.sqrt_price(self.pool(pair).await?).await?;
        let price = price_from_sqrt(&sqrt_price, pair).ok_or_else(|| self.no_market(pair))?;

        log::debug!("source::uniswap_v3: {} {} price {}", self.id, pair, price);

        Ok(PriceQuote::new(self.id.clone(), pair.clone(), price, Utc::now()))
    }

    async fn get_liquidity(&self, pair: &TokenPair) -> Result<Option<BigDecimal>, SourceError> {
        let pool = self.pool(pair).await?;
        let sqrt_price = self.sqrt_price(pool).await?;
        let liquidity = IUniswapV3Pool::new(pool, &self.provider)
            .liquidity()
            .call()
            .await
            .map_err(|e| SourceError::unavailable(&self.id, e))?
            ._0;
        let liquidity = from_raw(liquidity)
            .ok_or_else(|| SourceError::unavailable(&self.id, "unparseable liquidity"))?;

        let depth = depth_from_liquidity(&liquidity, &sqrt_price, pair);
        Ok(is_positive(&depth).then_some(depth))
    }

    async fn health_check(&self) -> HealthStatus {
        check_factory(&self.id, &self.provider, self.factory, self.degraded_after).await
    }
}
