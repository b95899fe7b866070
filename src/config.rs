//! Runtime configuration from environment variables.
//!
//! `.env` is loaded first if present. Every variable has a default except
//! `DATABASE_URL`, which is only needed for persistence.

use crate::arb::scheduler::ScanSettings;
use crate::arb::simulator::{SimulationParams, SlippageModel};
use crate::arb::types::{Token, TokenPair};
use crate::utils::constants::{
    DAI, DEFAULT_RPC_URL, SUSHISWAP_V2_FACTORY, UNISWAP_V2_FACTORY, UNISWAP_V3_DEFAULT_FEE,
    UNISWAP_V3_FACTORY, USDC, WETH,
};
use crate::utils::decimal::is_positive;
use alloy::primitives::Address;
use bigdecimal::{BigDecimal, Zero};
use eyre::{eyre, Result, WrapErr};
use std::collections::HashSet;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Pool model of an exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeKind {
    /// Constant-product pools behind a `getPair` factory
    V2,
    /// Concentrated-liquidity pools behind a `getPool` factory
    V3 {
        /// Fee tier in hundredths of a bip
        fee: u32,
    },
}

/// One integrated exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeConfig {
    /// Exchange name used in logs and records
    pub name: String,
    /// Factory contract
    pub factory: Address,
    /// Pool model
    pub kind: ExchangeKind,
}

impl ExchangeConfig {
    /// Parse `name=v2:<factory>` or `name=v3:<factory>:<fee>`
    ///
    /// # Errors
    /// * If the entry is malformed or the address or fee does not parse
    pub fn parse(entry: &str) -> Result<Self> {
        let (name, spec) = entry
            .split_once('=')
            .ok_or_else(|| eyre!("exchange `{entry}` is not `name=kind:factory`"))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(eyre!("exchange `{entry}` has an empty name"));
        }

        let parts: Vec<&str> = spec.split(':').map(str::trim).collect();
        let kind = match parts.as_slice() {
            ["v2", _] => ExchangeKind::V2,
            ["v3", _, fee] => ExchangeKind::V3 {
                fee: fee
                    .parse()
                    .wrap_err_with(|| format!("exchange `{name}` has invalid fee `{fee}`"))?,
            },
            _ => return Err(eyre!("exchange `{entry}` must be `v2:<factory>` or `v3:<factory>:<fee>`")),
        };
        let factory = Address::from_str(parts[1])
            .wrap_err_with(|| format!("exchange `{name}` has invalid factory `{}`", parts[1]))?;

        Ok(Self {
            name: name.to_string(),
            factory,
            kind,
        })
    }
}

/// Parse one token as `SYMBOL:address:decimals`
fn parse_token(entry: &str) -> Result<Token> {
    let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
    let [symbol, address, decimals] = parts.as_slice() else {
        return Err(eyre!("token `{entry}` is not `SYMBOL:address:decimals`"));
    };
    let address =
        Address::from_str(address).wrap_err_with(|| format!("token `{symbol}` has invalid address"))?;
    let decimals = decimals
        .parse()
        .wrap_err_with(|| format!("token `{symbol}` has invalid decimals `{decimals}`"))?;
    Ok(Token::new(address, *symbol, decimals))
}

/// Parse a pair as `SYM:addr:dec/SYM:addr:dec`
///
/// # Errors
/// * If either token is malformed or both have the same address
pub fn parse_pair(entry: &str) -> Result<TokenPair> {
    let (a, b) = entry
        .split_once('/')
        .ok_or_else(|| eyre!("pair `{entry}` is not `TOKEN/TOKEN`"))?;
    Ok(TokenPair::new(parse_token(a)?, parse_token(b)?)?)
}

/// Split a comma separated list, dropping blanks
fn list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Uniswap V2, SushiSwap V2 and Uniswap V3 (0.05%) on Base
#[must_use]
pub fn default_exchanges() -> Vec<ExchangeConfig> {
    vec![
        ExchangeConfig {
            name: "uniswap_v2".to_string(),
            factory: UNISWAP_V2_FACTORY,
            kind: ExchangeKind::V2,
        },
        ExchangeConfig {
            name: "sushiswap".to_string(),
            factory: SUSHISWAP_V2_FACTORY,
            kind: ExchangeKind::V2,
        },
        ExchangeConfig {
            name: "uniswap_v3".to_string(),
            factory: UNISWAP_V3_FACTORY,
            kind: ExchangeKind::V3 {
                fee: UNISWAP_V3_DEFAULT_FEE,
            },
        },
    ]
}

/// WETH/USDC and WETH/DAI on Base
///
/// # Errors
/// Never in practice; the addresses are distinct constants
pub fn default_pairs() -> Result<Vec<TokenPair>> {
    let weth = Token::new(WETH, "WETH", 18);
    Ok(vec![
        TokenPair::new(weth.clone(), Token::new(USDC, "USDC", 6))?,
        TokenPair::new(weth, Token::new(DAI, "DAI", 18))?,
    ])
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP RPC endpoint
    pub rpc_url: Url,
    /// Postgres URL, if persistence is enabled
    pub database_url: Option<String>,
    /// Database pool size
    pub db_pool_size: usize,
    /// Exchanges to scan
    pub exchanges: Vec<ExchangeConfig>,
    /// Pairs to monitor
    pub pairs: Vec<TokenPair>,
    /// Time between cycles
    pub scan_interval: Duration,
    /// Per-fetch timeout
    pub fetch_timeout: Duration,
    /// Health-check latency above which a source is degraded
    pub degraded_latency: Duration,
    /// Maximum quote age used for evaluation
    pub staleness_window: Duration,
    /// Concurrent fetch limit
    pub max_in_flight: usize,
    /// Notional trade size
    pub trade_amount: BigDecimal,
    /// Inclusive minimum net profit
    pub min_profit: BigDecimal,
    /// Flat gas estimate
    pub gas_cost: BigDecimal,
    /// Slippage fraction (fallback fraction when depth-aware)
    pub slippage: BigDecimal,
    /// Use the depth-aware slippage model
    pub depth_aware_slippage: bool,
    /// Cycles between metrics reports
    pub report_every: u64,
    /// Days of history kept by the cleanup task
    pub retention_days: u32,
    /// Capacity of the persistence channel
    pub sink_capacity: usize,
    /// Optional log file
    pub log_file: Option<String>,
}

impl Config {
    /// Load from the process environment after reading `.env`.
    ///
    /// # Errors
    /// * If any variable is set but does not parse
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    ///
    /// # Errors
    /// * If any variable is set but does not parse, or values are out of range
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let exchanges = match var("GLINT_EXCHANGES") {
            Some(value) => list(&value)
                .map(ExchangeConfig::parse)
                .collect::<Result<Vec<_>>>()
                .wrap_err("GLINT_EXCHANGES")?,
            None => default_exchanges(),
        };
        let pairs = match var("GLINT_PAIRS") {
            Some(value) => list(&value)
                .map(parse_pair)
                .collect::<Result<Vec<_>>>()
                .wrap_err("GLINT_PAIRS")?,
            None => default_pairs()?,
        };

        let rpc_url = match var("GLINT_RPC_URL") {
            Some(value) => Url::parse(value.trim()).wrap_err("GLINT_RPC_URL")?,
            None => Url::parse(DEFAULT_RPC_URL)?,
        };

        let config = Self {
            rpc_url,
            database_url: var("DATABASE_URL"),
            db_pool_size: parse_or(&var, "GLINT_DB_POOL_SIZE", || 15)?,
            exchanges,
            pairs,
            scan_interval: Duration::from_secs(parse_or(&var, "GLINT_SCAN_INTERVAL_SECS", || 30)?),
            fetch_timeout: Duration::from_millis(parse_or(&var, "GLINT_FETCH_TIMEOUT_MS", || 5000)?),
            degraded_latency: Duration::from_millis(parse_or(
                &var,
                "GLINT_DEGRADED_LATENCY_MS",
                || 1500,
            )?),
            staleness_window: Duration::from_secs(parse_or(&var, "GLINT_STALENESS_SECS", || 60)?),
            max_in_flight: parse_or(&var, "GLINT_MAX_IN_FLIGHT", || 16)?,
            trade_amount: parse_or(&var, "GLINT_TRADE_AMOUNT", || BigDecimal::from(1000))?,
            min_profit: parse_or(&var, "GLINT_MIN_PROFIT", || BigDecimal::from(10))?,
            gas_cost: parse_or(&var, "GLINT_GAS_COST", || BigDecimal::from(5))?,
            slippage: parse_or(&var, "GLINT_SLIPPAGE", || BigDecimal::new(1.into(), 3))?,
            depth_aware_slippage: parse_or(&var, "GLINT_DEPTH_AWARE_SLIPPAGE", || false)?,
            report_every: parse_or(&var, "GLINT_REPORT_EVERY", || 100)?,
            retention_days: parse_or(&var, "GLINT_RETENTION_DAYS", || 30)?,
            sink_capacity: parse_or(&var, "GLINT_SINK_CAPACITY", || 1024)?,
            log_file: var("GLINT_LOG_FILE"),
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks across fields
    fn validate(&self) -> Result<()> {
        if self.exchanges.is_empty() {
            return Err(eyre!("GLINT_EXCHANGES must name at least one exchange"));
        }
        let mut names = HashSet::new();
        if let Some(dup) = self.exchanges.iter().find(|e| !names.insert(e.name.as_str())) {
            return Err(eyre!("GLINT_EXCHANGES names `{}` twice", dup.name));
        }
        if self.pairs.is_empty() {
            return Err(eyre!("GLINT_PAIRS must name at least one pair"));
        }
        if self.scan_interval.is_zero() {
            return Err(eyre!("GLINT_SCAN_INTERVAL_SECS must be positive"));
        }
        if self.fetch_timeout.is_zero() {
            return Err(eyre!("GLINT_FETCH_TIMEOUT_MS must be positive"));
        }
        if self.staleness_window.is_zero() {
            return Err(eyre!("GLINT_STALENESS_SECS must be positive"));
        }
        if self.max_in_flight == 0 {
            return Err(eyre!("GLINT_MAX_IN_FLIGHT must be positive"));
        }
        if !is_positive(&self.trade_amount) {
            return Err(eyre!("GLINT_TRADE_AMOUNT must be positive"));
        }
        if self.gas_cost < BigDecimal::zero() {
            return Err(eyre!("GLINT_GAS_COST must not be negative"));
        }
        if self.slippage < BigDecimal::zero() || self.slippage >= BigDecimal::from(1) {
            return Err(eyre!("GLINT_SLIPPAGE must be in [0, 1)"));
        }
        Ok(())
    }

    /// Scheduler timing derived from the config.
    ///
    /// # Errors
    /// * If the staleness window does not fit a `chrono::Duration`
    pub fn scan_settings(&self) -> Result<ScanSettings> {
        Ok(ScanSettings {
            scan_interval: self.scan_interval,
            fetch_timeout: self.fetch_timeout,
            staleness_window: chrono::Duration::from_std(self.staleness_window)
                .wrap_err("GLINT_STALENESS_SECS")?,
            max_in_flight_fetches: self.max_in_flight,
            report_every: self.report_every,
        })
    }

    /// Simulator parameters derived from the config
    #[must_use]
    pub fn simulation_params(&self) -> SimulationParams {
        let slippage = if self.depth_aware_slippage {
            SlippageModel::DepthAware {
                fallback: self.slippage.clone(),
            }
        } else {
            SlippageModel::Flat {
                fraction: self.slippage.clone(),
            }
        };
        SimulationParams {
            trade_amount: self.trade_amount.clone(),
            gas_cost: self.gas_cost.clone(),
            min_profit: self.min_profit.clone(),
            slippage,
        }
    }

    /// `DATABASE_URL`, or an error for commands that need it.
    ///
    /// # Errors
    /// * If `DATABASE_URL` is not set
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| eyre!("DATABASE_URL must be set"))
    }
}

/// Parse `key` if set, otherwise use `default`
fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: impl FnOnce() -> T,
) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| eyre!("{key}: invalid value `{value}`: {e}")),
        None => Ok(default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.rpc_url.as_str(), "https://mainnet.base.org/");
        assert_eq!(config.exchanges.len(), 3);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.pairs[0].to_string(), "WETH/USDC");
        assert_eq!(config.scan_interval, Duration::from_secs(30));
        assert_eq!(config.database_url, None);

        let params = config.simulation_params();
        assert_eq!(params, SimulationParams::default());
        assert_eq!(
            config.scan_settings().unwrap().staleness_window,
            chrono::Duration::seconds(60)
        );
    }

    #[test]
    fn test_exchange_parsing() {
        let config = load(&[(
            "GLINT_EXCHANGES",
            "uni=v2:0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6, univ3=v3:0x33128a8fC17869897dcE68Ed026d694621f6FDfD:3000",
        )])
        .unwrap();

        assert_eq!(config.exchanges[0].name, "uni");
        assert_eq!(config.exchanges[0].kind, ExchangeKind::V2);
        assert_eq!(config.exchanges[1].factory, UNISWAP_V3_FACTORY);
        assert_eq!(config.exchanges[1].kind, ExchangeKind::V3 { fee: 3000 });
    }

    #[test]
    fn test_bad_exchange_is_rejected() {
        assert!(load(&[("GLINT_EXCHANGES", "uni=v4:0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6")]).is_err());
        assert!(load(&[("GLINT_EXCHANGES", "uni=v2:nothex")]).is_err());
        assert!(load(&[("GLINT_EXCHANGES", "v2:0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6")]).is_err());
        assert!(load(&[(
            "GLINT_EXCHANGES",
            "a=v2:0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6,a=v2:0x71524B4f93c58fcbF659783284E38825f0622859"
        )])
        .is_err());
    }

    #[test]
    fn test_pair_parsing_is_order_independent() {
        let pair = parse_pair(
            "USDC:0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913:6/WETH:0x4200000000000000000000000000000000000006:18",
        )
        .unwrap();
        assert_eq!(pair.token0().symbol, "WETH");
        assert_eq!(pair.token1().decimals, 6);

        assert!(parse_pair(
            "WETH:0x4200000000000000000000000000000000000006:18/WETH:0x4200000000000000000000000000000000000006:18"
        )
        .is_err());
        assert!(parse_pair("WETH:0x4200000000000000000000000000000000000006").is_err());
    }

    #[test]
    fn test_simulation_overrides() {
        let config = load(&[
            ("GLINT_TRADE_AMOUNT", "2500"),
            ("GLINT_MIN_PROFIT", "1.5"),
            ("GLINT_SLIPPAGE", "0.002"),
            ("GLINT_DEPTH_AWARE_SLIPPAGE", "true"),
        ])
        .unwrap();
        let params = config.simulation_params();

        assert_eq!(params.trade_amount, BigDecimal::from(2500));
        assert_eq!(params.min_profit, BigDecimal::from_str("1.5").unwrap());
        assert_eq!(
            params.slippage,
            SlippageModel::DepthAware {
                fallback: BigDecimal::from_str("0.002").unwrap()
            }
        );
    }

    #[test]
    fn test_invalid_values_name_the_variable() {
        let err = load(&[("GLINT_SCAN_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("GLINT_SCAN_INTERVAL_SECS"));

        assert!(load(&[("GLINT_SLIPPAGE", "1.5")]).is_err());
        assert!(load(&[("GLINT_TRADE_AMOUNT", "0")]).is_err());
        assert!(load(&[("GLINT_MAX_IN_FLIGHT", "0")]).is_err());
    }

    #[test]
    fn test_zero_staleness_window_is_rejected() {
        let err = load(&[("GLINT_STALENESS_SECS", "0")]).unwrap_err();
        assert!(err.to_string().contains("GLINT_STALENESS_SECS"));
        assert!(load(&[("GLINT_STALENESS_SECS", "1")]).is_ok());
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let config = load(&[("GLINT_PAIRS", "  "), ("DATABASE_URL", "")]).unwrap();
        assert_eq!(config.pairs.len(), 2);
        assert!(config.require_database_url().is_err());
    }
}
