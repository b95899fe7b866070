use crate::models::{DBAddress, NewOpportunity, Opportunity};
use crate::schemas::arbitrage_opportunities::dsl::*;
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use diesel::sql_types::Timestamptz;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl, QueryResult,
    SelectableHelper,
};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

/// Raw-SQL row types, kept out of scope of the `dsl::*` glob whose
/// column unit structs would clash with `QueryableByName` field bindings
mod rows {
    use bigdecimal::BigDecimal;
    use diesel::sql_types::{BigInt, Nullable, Numeric, Text};
    use diesel::QueryableByName;

    /// Aggregate figures over a window of opportunities
    #[derive(QueryableByName, Debug, Clone)]
    pub struct OpportunityStats {
        /// Number of opportunities
        #[diesel(sql_type = BigInt)]
        pub total: i64,
        /// Sum of net profit
        #[diesel(sql_type = Nullable<Numeric>)]
        pub total_net_profit: Option<BigDecimal>,
        /// Mean net profit
        #[diesel(sql_type = Nullable<Numeric>)]
        pub average_net_profit: Option<BigDecimal>,
        /// Largest net profit
        #[diesel(sql_type = Nullable<Numeric>)]
        pub best_net_profit: Option<BigDecimal>,
    }

    /// The buy/sell route seen most often
    #[derive(QueryableByName, Debug, Clone, PartialEq, Eq)]
    pub struct RouteCount {
        /// Buy side
        #[diesel(sql_type = Text)]
        pub buy_exchange: String,
        /// Sell side
        #[diesel(sql_type = Text)]
        pub sell_exchange: String,
        /// Opportunities on the route
        #[diesel(sql_type = BigInt)]
        pub opportunities: i64,
    }
}

pub use rows::{OpportunityStats, RouteCount};

/// Queries over `arbitrage_opportunities`
pub struct OpportunityService;

impl OpportunityService {
    /// Insert one opportunity
    ///
    /// # Errors
    /// * If the insert fails
    pub async fn insert(conn: &mut AsyncPgConnection, row: &NewOpportunity) -> QueryResult<usize> {
        diesel::insert_into(arbitrage_opportunities)
            .values(row)
            .execute(conn)
            .await
    }

    /// Most recent opportunities, newest first
    ///
    /// # Errors
    /// * If the query fails
    pub async fn recent(conn: &mut AsyncPgConnection, limit: i64) -> QueryResult<Vec<Opportunity>> {
        arbitrage_opportunities
            .order(detected_at.desc())
            .limit(limit)
            .select(Opportunity::as_select())
            .load(conn)
            .await
    }

    /// Opportunities detected in `[from, to)`, oldest first
    ///
    /// # Errors
    /// * If the query fails
    pub async fn in_range(
        conn: &mut AsyncPgConnection,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> QueryResult<Vec<Opportunity>> {
        arbitrage_opportunities
            .filter(detected_at.ge(from).and(detected_at.lt(to)))
            .order(detected_at.asc())
            .select(Opportunity::as_select())
            .load(conn)
            .await
    }

    /// Opportunities for a pair, given its tokens in either order
    ///
    /// # Errors
    /// * If the query fails
    pub async fn by_pair(
        conn: &mut AsyncPgConnection,
        token_a: Address,
        token_b: Address,
        limit: i64,
    ) -> QueryResult<Vec<Opportunity>> {
        let (a, b) = (DBAddress::new(token_a), DBAddress::new(token_b));
        arbitrage_opportunities
            .filter(
                token0_address
                    .eq(a)
                    .and(token1_address.eq(b))
                    .or(token0_address.eq(b).and(token1_address.eq(a))),
            )
            .order(detected_at.desc())
            .limit(limit)
            .select(Opportunity::as_select())
            .load(conn)
            .await
    }

    /// Count and profit figures since `since`
    ///
    /// # Errors
    /// * If the query fails
    pub async fn stats(
        conn: &mut AsyncPgConnection,
        since: DateTime<Utc>,
    ) -> QueryResult<OpportunityStats> {
        diesel::sql_query(
            "SELECT COUNT(*) AS total,
                    SUM(net_profit) AS total_net_profit,
                    AVG(net_profit) AS average_net_profit,
                    MAX(net_profit) AS best_net_profit
             FROM arbitrage_opportunities
             WHERE detected_at >= $1",
        )
        .bind::<Timestamptz, _>(since)
        .get_result(conn)
        .await
    }

    /// Most frequent buy/sell route since `since`
    ///
    /// # Errors
    /// * If the query fails
    pub async fn top_route(
        conn: &mut AsyncPgConnection,
        since: DateTime<Utc>,
    ) -> QueryResult<Option<RouteCount>> {
        diesel::sql_query(
            "SELECT buy_exchange, sell_exchange, COUNT(*) AS opportunities
             FROM arbitrage_opportunities
             WHERE detected_at >= $1
             GROUP BY buy_exchange, sell_exchange
             ORDER BY opportunities DESC, buy_exchange, sell_exchange
             LIMIT 1",
        )
        .bind::<Timestamptz, _>(since)
        .get_result(conn)
        .await
        .optional()
    }

    /// Delete opportunities detected before `cutoff`
    ///
    /// # Errors
    /// * If the delete fails
    pub async fn delete_before(
        conn: &mut AsyncPgConnection,
        cutoff: DateTime<Utc>,
    ) -> QueryResult<usize> {
        diesel::delete(arbitrage_opportunities.filter(detected_at.lt(cutoff)))
            .execute(conn)
            .await
    }
}
