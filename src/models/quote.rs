use crate::arb::types::PriceQuote;
use crate::models::{storage_value, DBAddress};
use crate::utils::decimal::trimmed;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{Insertable, Queryable, Selectable};
use eyre::Result;
use std::fmt;
use uuid::Uuid;

/// A persisted price quote
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schemas::price_quotes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Quote {
    /// Row ID
    pub id: Uuid,
    /// Quoting exchange
    pub exchange: String,
    /// Lower token address
    pub token0_address: DBAddress,
    /// Lower token symbol
    pub token0_symbol: String,
    /// Higher token address
    pub token1_address: DBAddress,
    /// Higher token symbol
    pub token1_symbol: String,
    /// token1 per token0
    pub price: BigDecimal,
    /// Depth in token1 units, if known
    pub liquidity: Option<BigDecimal>,
    /// When the exchange reported the price
    pub observed_at: DateTime<Utc>,
    /// When the row was written
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}/{}: {}",
            self.observed_at.format("%Y-%m-%d %H:%M:%S"),
            self.exchange,
            self.token0_symbol,
            self.token1_symbol,
            trimmed(&self.price)
        )?;
        if let Some(depth) = &self.liquidity {
            write!(f, " (depth {})", trimmed(depth))?;
        }
        Ok(())
    }
}

/// A new price quote row
#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schemas::price_quotes)]
pub struct NewQuote {
    /// Row ID, generated on conversion
    pub id: Uuid,
    /// Quoting exchange
    pub exchange: String,
    /// Lower token address
    pub token0_address: DBAddress,
    /// Lower token symbol
    pub token0_symbol: String,
    /// Higher token address
    pub token1_address: DBAddress,
    /// Higher token symbol
    pub token1_symbol: String,
    /// token1 per token0
    pub price: BigDecimal,
    /// Depth in token1 units, if known
    pub liquidity: Option<BigDecimal>,
    /// When the exchange reported the price
    pub observed_at: DateTime<Utc>,
}

impl TryFrom<&PriceQuote> for NewQuote {
    type Error = eyre::Report;

    fn try_from(quote: &PriceQuote) -> Result<Self> {
        let (token0, token1) = (quote.pair().token0(), quote.pair().token1());
        Ok(Self {
            id: Uuid::new_v4(),
            exchange: quote.exchange().to_string(),
            token0_address: token0.address.into(),
            token0_symbol: token0.symbol.clone(),
            token1_address: token1.address.into(),
            token1_symbol: token1.symbol.clone(),
            price: storage_value("price", quote.price())?,
            liquidity: quote
                .liquidity()
                .map(|depth| storage_value("liquidity", depth))
                .transpose()?,
            observed_at: quote.observed_at(),
        })
    }
}
