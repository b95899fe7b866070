use crate::models::{NewQuote, Quote};
use crate::schemas::price_quotes::dsl::*;
use chrono::{DateTime, Utc};
use diesel::sql_types::Timestamptz;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, QueryDsl, QueryResult,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

/// Raw-SQL row types, kept out of scope of the `dsl::*` glob whose
/// column unit structs would clash with `QueryableByName` field bindings
mod rows {
    use bigdecimal::BigDecimal;
    use chrono::{DateTime, Utc};
    use diesel::sql_types::{BigInt, Nullable, Numeric, Text, Timestamptz};
    use diesel::QueryableByName;

    /// Quote figures for one exchange and pair
    #[derive(QueryableByName, Debug, Clone)]
    pub struct ExchangeQuoteStats {
        /// Exchange
        #[diesel(sql_type = Text)]
        pub exchange: String,
        /// Base token symbol
        #[diesel(sql_type = Text)]
        pub token0_symbol: String,
        /// Quote token symbol
        #[diesel(sql_type = Text)]
        pub token1_symbol: String,
        /// Quotes recorded
        #[diesel(sql_type = BigInt)]
        pub quotes: i64,
        /// Mean price
        #[diesel(sql_type = Nullable<Numeric>)]
        pub average_price: Option<BigDecimal>,
        /// Latest observation
        #[diesel(sql_type = Timestamptz)]
        pub last_update: DateTime<Utc>,
    }
}

pub use rows::ExchangeQuoteStats;

/// Queries over `price_quotes`
pub struct QuoteService;

impl QuoteService {
    /// Insert one quote
    ///
    /// # Errors
    /// * If the insert fails
    pub async fn insert(conn: &mut AsyncPgConnection, row: &NewQuote) -> QueryResult<usize> {
        diesel::insert_into(price_quotes)
            .values(row)
            .execute(conn)
            .await
    }

    /// Quotes observed in `[from, to)`, newest first, optionally for one exchange
    ///
    /// # Arguments
    /// * `from` - Inclusive lower bound
    /// * `to` - Exclusive upper bound
    /// * `exchange_name` - Only this exchange, if given
    /// * `limit` - Maximum rows
    ///
    /// # Errors
    /// * If the query fails
    pub async fn in_range(
        conn: &mut AsyncPgConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        exchange_name: Option<&str>,
        limit: i64,
    ) -> QueryResult<Vec<Quote>> {
        let mut query = price_quotes
            .filter(observed_at.ge(from).and(observed_at.lt(to)))
            .into_boxed();
        if let Some(name) = exchange_name {
            query = query.filter(exchange.eq(name));
        }
        query
            .order(observed_at.desc())
            .limit(limit)
            .select(Quote::as_select())
            .load(conn)
            .await
    }

    /// Per exchange and pair figures since `since`
    ///
    /// # Errors
    /// * If the query fails
    pub async fn exchange_stats(
        conn: &mut AsyncPgConnection,
        since: DateTime<Utc>,
    ) -> QueryResult<Vec<ExchangeQuoteStats>> {
        diesel::sql_query(
            "SELECT exchange, token0_symbol, token1_symbol,
                    COUNT(*) AS quotes,
                    AVG(price) AS average_price,
                    MAX(observed_at) AS last_update
             FROM price_quotes
             WHERE observed_at >= $1
             GROUP BY exchange, token0_symbol, token1_symbol
             ORDER BY exchange, token0_symbol, token1_symbol",
        )
        .bind::<Timestamptz, _>(since)
        .load(conn)
        .await
    }

    /// Delete quotes observed before `cutoff`
    ///
    /// # Errors
    /// * If the delete fails
    pub async fn delete_before(
        conn: &mut AsyncPgConnection,
        cutoff: DateTime<Utc>,
    ) -> QueryResult<usize> {
        diesel::delete(price_quotes.filter(observed_at.lt(cutoff)))
            .execute(conn)
            .await
    }
}
