//! Net profit simulation for candidate spreads.
//!
//! All arithmetic is exact `BigDecimal`; every monetary intermediate is
//! rounded half up to 18 fractional digits and must fit `NUMERIC(36,18)`.

use crate::arb::error::SimulationError;
use crate::arb::evaluator::Candidate;
use crate::arb::types::ArbitrageOpportunity;
use crate::utils::decimal::{is_positive, to_storage_precision};
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};

/// How slippage cost is estimated from gross profit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlippageModel {
    /// Fixed fraction of gross profit
    Flat {
        /// e.g. `0.001` for 0.1%
        fraction: BigDecimal,
    },
    /// `trade_amount / min(buy depth, sell depth)`, capped at 10%.
    /// Falls back to `fallback` when either depth is unknown or zero.
    DepthAware {
        /// Fraction used when depth is unknown
        fallback: BigDecimal,
    },
}

impl SlippageModel {
    /// Whether the model consumes liquidity depth
    #[must_use]
    pub fn uses_depth(&self) -> bool {
        matches!(self, Self::DepthAware { .. })
    }

    /// Slippage fraction for a trade of `trade_amount` against the candidate's depths
    fn fraction(&self, trade_amount: &BigDecimal, candidate: &Candidate) -> BigDecimal {
        match self {
            Self::Flat { fraction } => fraction.clone(),
            Self::DepthAware { fallback } => {
                let depth = match (&candidate.buy_liquidity, &candidate.sell_liquidity) {
                    (Some(buy), Some(sell)) => buy.min(sell),
                    _ => return fallback.clone(),
                };
                if !is_positive(depth) {
                    return fallback.clone();
                }
                // capped at 10%
                (trade_amount / depth).min(BigDecimal::new(1.into(), 1))
            }
        }
    }
}

/// Simulation parameters, all in the reference unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationParams {
    /// Notional trade size
    pub trade_amount: BigDecimal,
    /// Flat gas cost estimate
    pub gas_cost: BigDecimal,
    /// Inclusive minimum net profit
    pub min_profit: BigDecimal,
    /// Slippage estimation
    pub slippage: SlippageModel,
}

/// Result of simulating one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Simulation {
    /// The simulated candidate
    pub candidate: Candidate,
    /// Trade size used
    pub trade_amount: BigDecimal,
    /// `sell - buy`
    pub price_difference: BigDecimal,
    /// `(sell - buy) / buy * 100`
    pub price_difference_percentage: BigDecimal,
    /// `trade_amount * (sell - buy) / buy`
    pub gross_profit: BigDecimal,
    /// `gross_profit * slippage fraction`
    pub slippage_cost: BigDecimal,
    /// Gas estimate used
    pub gas_cost: BigDecimal,
    /// `gross - slippage - gas`
    pub net_profit: BigDecimal,
    /// `net_profit >= min_profit`
    pub qualifies: bool,
}

impl Simulation {
    /// Materialize the opportunity record
    #[must_use]
    pub fn into_opportunity(self, detected_at: DateTime<Utc>) -> ArbitrageOpportunity {
        ArbitrageOpportunity {
            pair: self.candidate.pair,
            buy_exchange: self.candidate.buy_exchange,
            sell_exchange: self.candidate.sell_exchange,
            buy_price: self.candidate.buy_price,
            sell_price: self.candidate.sell_price,
            price_difference: self.price_difference,
            price_difference_percentage: self.price_difference_percentage,
            trade_amount: self.trade_amount,
            estimated_profit: self.gross_profit,
            slippage_cost: self.slippage_cost,
            gas_cost: self.gas_cost,
            net_profit: self.net_profit,
            detected_at,
        }
    }
}

/// Simulates candidates against fixed parameters. Pure; no side effects.
#[derive(Debug, Clone)]
pub struct ProfitSimulator {
    /// Parameters shared by every simulation
    params: SimulationParams,
}

impl ProfitSimulator {
    /// Create a simulator
    #[must_use]
    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    /// The simulator's parameters
    #[must_use]
    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Simulate one candidate.
    ///
    /// # Errors
    /// * `ComputationOverflow` if the buy price is not positive
    /// * `ComputationOverflow` if any monetary value exceeds 18 integer digits
    pub fn simulate(&self, candidate: &Candidate) -> Result<Simulation, SimulationError> {
        if !is_positive(&candidate.buy_price) {
            return Err(SimulationError::ComputationOverflow {
                quantity: "gross_profit",
                detail: format!("buy price {} is not positive", candidate.buy_price),
            });
        }
        let p = &self.params;

        let difference = fit("price_difference", &candidate.spread())?;
        let percentage = fit(
            "price_difference_percentage",
            &(&difference / &candidate.buy_price * BigDecimal::from(100)),
        )?;
        let trade_amount = fit("trade_amount", &p.trade_amount)?;
        let gross = fit(
            "gross_profit",
            &(&trade_amount * &difference / &candidate.buy_price),
        )?;
        let fraction = p.slippage.fraction(&trade_amount, candidate);
        let slippage = fit("slippage_cost", &(&gross * fraction))?;
        let gas = fit("gas_cost", &p.gas_cost)?;
        let net = fit("net_profit", &(&gross - &slippage - &gas))?;
        let qualifies = net >= p.min_profit;

        Ok(Simulation {
            candidate: candidate.clone(),
            trade_amount,
            price_difference: difference,
            price_difference_percentage: percentage,
            gross_profit: gross,
            slippage_cost: slippage,
            gas_cost: gas,
            net_profit: net,
            qualifies,
        })
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            trade_amount: BigDecimal::from(1000),
            gas_cost: BigDecimal::from(5),
            min_profit: BigDecimal::from(10),
            slippage: SlippageModel::Flat {
                fraction: BigDecimal::new(1.into(), 3),
            },
        }
    }
}

/// Round to storage precision or report which quantity overflowed
fn fit(quantity: &'static str, value: &BigDecimal) -> Result<BigDecimal, SimulationError> {
    to_storage_precision(value).ok_or_else(|| SimulationError::ComputationOverflow {
        quantity,
        detail: format!("{value} exceeds 18 integer digits"),
    })
}

/// Simulated net profit summed over qualifying simulations
#[must_use]
pub fn total_net_profit(simulations: &[Simulation]) -> BigDecimal {
    simulations
        .iter()
        .filter(|s| s.qualifies)
        .fold(BigDecimal::zero(), |acc, s| acc + &s.net_profit)
}
