use crate::arb::types::ArbitrageOpportunity;
use crate::models::{storage_value, DBAddress};
use crate::utils::decimal::trimmed;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use eyre::Result;
use std::fmt;
use uuid::Uuid;

/// A persisted arbitrage opportunity
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schemas::arbitrage_opportunities)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Opportunity {
    /// Row ID
    pub id: Uuid,
    /// Lower token address
    pub token0_address: DBAddress,
    /// Lower token symbol
    pub token0_symbol: String,
    /// Higher token address
    pub token1_address: DBAddress,
    /// Higher token symbol
    pub token1_symbol: String,
    /// Cheaper exchange
    pub buy_exchange: String,
    /// Dearer exchange
    pub sell_exchange: String,
    /// Price on the buy exchange
    pub buy_price: BigDecimal,
    /// Price on the sell exchange
    pub sell_price: BigDecimal,
    /// `sell_price - buy_price`
    pub price_difference: BigDecimal,
    /// Difference as a percentage of the buy price
    pub price_difference_percentage: BigDecimal,
    /// Notional trade size
    pub trade_amount: BigDecimal,
    /// Gross profit
    pub estimated_profit: BigDecimal,
    /// Slippage estimate
    pub slippage_cost: BigDecimal,
    /// Gas estimate
    pub gas_cost: BigDecimal,
    /// Net profit
    pub net_profit: BigDecimal,
    /// When the spread was evaluated
    pub detected_at: DateTime<Utc>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Opportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}: buy {} @ {}, sell {} @ {}, net {}",
            self.detected_at.format("%Y-%m-%d %H:%M:%S"),
            self.token0_symbol,
            self.token1_symbol,
            self.buy_exchange,
            trimmed(&self.buy_price),
            self.sell_exchange,
            trimmed(&self.sell_price),
            trimmed(&self.net_profit)
        )
    }
}

/// A new opportunity row
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schemas::arbitrage_opportunities)]
pub struct NewOpportunity {
    /// Row ID, generated on conversion
    pub id: Uuid,
    /// Lower token address
    pub token0_address: DBAddress,
    /// Lower token symbol
    pub token0_symbol: String,
    /// Higher token address
    pub token1_address: DBAddress,
    /// Higher token symbol
    pub token1_symbol: String,
    /// Cheaper exchange
    pub buy_exchange: String,
    /// Dearer exchange
    pub sell_exchange: String,
    /// Price on the buy exchange
    pub buy_price: BigDecimal,
    /// Price on the sell exchange
    pub sell_price: BigDecimal,
    /// `sell_price - buy_price`
    pub price_difference: BigDecimal,
    /// Difference as a percentage of the buy price
    pub price_difference_percentage: BigDecimal,
    /// Notional trade size
    pub trade_amount: BigDecimal,
    /// Gross profit
    pub estimated_profit: BigDecimal,
    /// Slippage estimate
    pub slippage_cost: BigDecimal,
    /// Gas estimate
    pub gas_cost: BigDecimal,
    /// Net profit
    pub net_profit: BigDecimal,
    /// When the spread was evaluated
    pub detected_at: DateTime<Utc>,
}

impl TryFrom<&ArbitrageOpportunity> for NewOpportunity {
    type Error = eyre::Report;

    /// Round every monetary value to the column precision.
    ///
    /// # Errors
    /// * If a value does not fit `NUMERIC(36,18)`
    fn try_from(opp: &ArbitrageOpportunity) -> Result<Self> {
        let (token0, token1) = (opp.pair.token0(), opp.pair.token1());
        Ok(Self {
            id: Uuid::new_v4(),
            token0_address: token0.address.into(),
            token0_symbol: token0.symbol.clone(),
            token1_address: token1.address.into(),
            token1_symbol: token1.symbol.clone(),
            buy_exchange: opp.buy_exchange.to_string(),
            sell_exchange: opp.sell_exchange.to_string(),
            buy_price: storage_value("buy_price", &opp.buy_price)?,
            sell_price: storage_value("sell_price", &opp.sell_price)?,
            price_difference: storage_value("price_difference", &opp.price_difference)?,
            price_difference_percentage: storage_value(
                "price_difference_percentage",
                &opp.price_difference_percentage,
            )?,
            trade_amount: storage_value("trade_amount", &opp.trade_amount)?,
            estimated_profit: storage_value("estimated_profit", &opp.estimated_profit)?,
            slippage_cost: storage_value("slippage_cost", &opp.slippage_cost)?,
            gas_cost: storage_value("gas_cost", &opp.gas_cost)?,
            net_profit: storage_value("net_profit", &opp.net_profit)?,
            detected_at: opp.detected_at,
        })
    }
}
