//! Database rows for quotes and opportunities.

use crate::utils::decimal::to_storage_precision;
use bigdecimal::BigDecimal;
use eyre::{eyre, Result};

/// Checksummed address column
pub mod address;
/// `arbitrage_opportunities` rows
pub mod opportunity;
/// `price_quotes` rows
pub mod quote;

pub use address::DBAddress;
pub use opportunity::{NewOpportunity, Opportunity};
pub use quote::{NewQuote, Quote};

/// Round to the `NUMERIC(36,18)` column scale, refusing values that overflow it
pub(crate) fn storage_value(column: &str, value: &BigDecimal) -> Result<BigDecimal> {
    to_storage_precision(value).ok_or_else(|| eyre!("{column} {value} exceeds NUMERIC(36,18)"))
}
