use alloy::primitives::Address;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use eyre::Error;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// A database address type
/// Wrap Alloy's Address for strict typing. Stored as checksummed text.
#[derive(Debug, FromSqlRow, AsExpression, Clone, Copy, PartialEq, Eq)]
#[diesel(sql_type = Text)]
pub struct DBAddress {
    /// The address
    pub value: Address,
}

impl DBAddress {
    /// Create a new database address
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self { value: address }
    }
}

impl From<Address> for DBAddress {
    fn from(address: Address) -> Self {
        Self::new(address)
    }
}

impl fmt::Display for DBAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl FromStr for DBAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        let address = Address::parse_checksummed(s, None)?;
        Ok(Self { value: address })
    }
}

impl ToSql<Text, Pg> for DBAddress {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        let address = format!("{}", self.value);
        out.write_all(address.as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for DBAddress {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let addr = Address::parse_checksummed(std::str::from_utf8(bytes.as_bytes())?, None)?;
        Ok(Self { value: addr })
    }
}
