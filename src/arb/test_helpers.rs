use crate::arb::error::SourceError;
use crate::arb::types::{ArbitrageOpportunity, ExchangeId, PriceQuote, Token, TokenPair};
use crate::source::{HealthStatus, PriceSource};
use alloy::primitives::{address, Address};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const WETH: Address = address!("4200000000000000000000000000000000000006");
const USDC: Address = address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
const DAI: Address = address!("50c5725949A6F0c72E6C4a641F24049A917DB0Cb");

#[allow(dead_code)]
pub fn dec(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

#[allow(dead_code)]
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

#[allow(dead_code)]
pub fn weth() -> Token {
    Token::new(WETH, "WETH", 18)
}

#[allow(dead_code)]
pub fn usdc() -> Token {
    Token::new(USDC, "USDC", 6)
}

#[allow(dead_code)]
pub fn dai() -> Token {
    Token::new(DAI, "DAI", 18)
}

#[allow(dead_code)]
pub fn weth_usdc() -> TokenPair {
    TokenPair::new(weth(), usdc()).unwrap()
}

#[allow(dead_code)]
pub fn weth_dai() -> TokenPair {
    TokenPair::new(weth(), dai()).unwrap()
}

#[allow(dead_code)]
pub fn quote_for(pair: &TokenPair, exchange: &str, price: &str) -> PriceQuote {
    PriceQuote::new(ExchangeId::from(exchange), pair.clone(), dec(price), t0())
}

/// WETH/USDC quote observed at `t0()`
#[allow(dead_code)]
pub fn quote(exchange: &str, price: &str) -> PriceQuote {
    quote_for(&weth_usdc(), exchange, price)
}

/// Fresh-quote list as the cache would return it
#[allow(dead_code)]
pub fn fresh(quotes: &[(&str, &str)]) -> Vec<(ExchangeId, PriceQuote)> {
    quotes
        .iter()
        .map(|(exchange, price)| (ExchangeId::from(*exchange), quote(exchange, price)))
        .collect()
}

/// WETH/USDC opportunity with the given route and net profit
#[allow(dead_code)]
pub fn opportunity(buy: &str, sell: &str, net_profit: &str) -> ArbitrageOpportunity {
    ArbitrageOpportunity {
        pair: weth_usdc(),
        buy_exchange: ExchangeId::from(buy),
        sell_exchange: ExchangeId::from(sell),
        buy_price: dec("3000"),
        sell_price: dec("3050"),
        price_difference: dec("50"),
        price_difference_percentage: dec("1.666666666666666667"),
        trade_amount: dec("1000"),
        estimated_profit: dec("16.666666666666666667"),
        slippage_cost: dec("0.016666666666666667"),
        gas_cost: dec("5"),
        net_profit: dec(net_profit),
        detected_at: t0(),
    }
}

/// What a [`MockSource`] does on `get_price`
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Script {
    /// Answer with this price
    Price(&'static str),
    /// Fail with `SourceUnavailable`
    Unavailable,
    /// Fail with `QuoteUnavailable`
    NoMarket,
    /// Sleep, then answer with this price
    Slow(Duration, &'static str),
}

/// What a [`MockSource`] does on `get_liquidity`
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum DepthScript {
    /// Answer with this depth, or unknown
    Depth(Option<BigDecimal>),
    /// Fail with `SourceUnavailable`
    Unavailable,
    /// Sleep, then answer
    Slow(Duration),
}

/// Counts `get_price` calls in progress across every source sharing it
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

#[allow(dead_code)]
impl Gauge {
    fn enter(&self) -> GaugeGuard<'_> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard(self)
    }

    /// Most calls ever in progress at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct GaugeGuard<'a>(&'a Gauge);

impl Drop for GaugeGuard<'_> {
    fn drop(&mut self) {
        self.0.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Scripted in-process price source
#[allow(dead_code)]
pub struct MockSource {
    id: ExchangeId,
    script: Mutex<Script>,
    depth: DepthScript,
    health: HealthStatus,
    gauge: Option<Arc<Gauge>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl MockSource {
    pub fn new(id: &str, script: Script) -> Self {
        Self {
            id: ExchangeId::from(id),
            script: Mutex::new(script),
            depth: DepthScript::Depth(None),
            health: HealthStatus::Ok,
            gauge: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_health(mut self, health: HealthStatus) -> Self {
        self.health = health;
        self
    }

    /// Depth reported by `get_liquidity`; quotes carry none
    pub fn with_liquidity(mut self, liquidity: &str) -> Self {
        self.depth = DepthScript::Depth(Some(dec(liquidity)));
        self
    }

    pub fn with_depth(mut self, depth: DepthScript) -> Self {
        self.depth = depth;
        self
    }

    /// Report `get_price` calls to a shared gauge
    pub fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = Some(gauge);
        self
    }

    pub fn set(&self, script: Script) {
        *self.script.lock() = script;
    }

    /// Number of `get_price` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub fn mock(id: &str, script: Script) -> Arc<MockSource> {
    Arc::new(MockSource::new(id, script))
}

#[async_trait]
impl PriceSource for MockSource {
    fn exchange(&self) -> &ExchangeId {
        &self.id
    }

    async fn get_price(&self, pair: &TokenPair) -> Result<PriceQuote, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _active = self.gauge.as_deref().map(Gauge::enter);
        let script = self.script.lock().clone();
        let price = match script {
            Script::Price(price) => price,
            Script::Unavailable => return Err(SourceError::unavailable(&self.id, "connection refused")),
            Script::NoMarket => {
                return Err(SourceError::QuoteUnavailable {
                    exchange: self.id.clone(),
                    pair: pair.key(),
                })
            }
            Script::Slow(delay, price) => {
                tokio::time::sleep(delay).await;
                price
            }
        };
        Ok(PriceQuote::new(self.id.clone(), pair.clone(), dec(price), Utc::now()))
    }

    async fn get_liquidity(&self, _pair: &TokenPair) -> Result<Option<BigDecimal>, SourceError> {
        match &self.depth {
            DepthScript::Depth(depth) => Ok(depth.clone()),
            DepthScript::Unavailable => Err(SourceError::unavailable(&self.id, "depth call reverted")),
            DepthScript::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Some(dec("1000000")))
            }
        }
    }

    async fn health_check(&self) -> HealthStatus {
        self.health
    }
}
