//! Rolling analysis over recent opportunities and quote sets.

use crate::arb::types::{ArbitrageOpportunity, ExchangeId, PriceQuote};
use bigdecimal::{BigDecimal, Zero};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

/// Opportunities kept for analysis
const HISTORY_LIMIT: usize = 1000;

/// Per-exchange contribution to detected opportunities
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeContribution {
    /// Times the exchange was the cheap side
    pub as_buy_side: u64,
    /// Times the exchange was the expensive side
    pub as_sell_side: u64,
    /// Net profit of every opportunity the exchange took part in
    pub total_net_profit: BigDecimal,
}

/// Summary of the analyzer's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketSummary {
    /// Opportunities in the window
    pub opportunities: usize,
    /// Mean net profit over the window
    pub average_net_profit: BigDecimal,
    /// Pair with the highest summed net profit
    pub most_profitable_pair: Option<String>,
    /// Buy/sell route with the highest summed net profit
    pub best_route: Option<(ExchangeId, ExchangeId)>,
    /// Every exchange that took part in an opportunity since start
    pub exchanges: BTreeMap<ExchangeId, ExchangeContribution>,
}

impl fmt::Display for MarketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} opportunities, avg net {}",
            self.opportunities, self.average_net_profit
        )?;
        if let Some(pair) = &self.most_profitable_pair {
            write!(f, ", top pair {pair}")?;
        }
        if let Some((buy, sell)) = &self.best_route {
            write!(f, ", top route {buy} -> {sell}")?;
        }
        Ok(())
    }
}

/// Keeps the last opportunities and derives market statistics from them
#[derive(Debug, Default)]
pub struct OpportunityAnalyzer {
    /// Most recent opportunities, oldest first
    history: VecDeque<ArbitrageOpportunity>,
    /// Contribution per exchange since start
    exchanges: HashMap<ExchangeId, ExchangeContribution>,
}

impl OpportunityAnalyzer {
    /// Create an empty analyzer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an opportunity to the window
    pub fn record(&mut self, opportunity: &ArbitrageOpportunity) {
        let buy = self
            .exchanges
            .entry(opportunity.buy_exchange.clone())
            .or_default();
        buy.as_buy_side += 1;
        buy.total_net_profit += &opportunity.net_profit;

        let sell = self
            .exchanges
            .entry(opportunity.sell_exchange.clone())
            .or_default();
        sell.as_sell_side += 1;
        sell.total_net_profit += &opportunity.net_profit;

        self.history.push_back(opportunity.clone());
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }

    /// Number of opportunities in the window
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the window is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Summarize the window
    #[must_use]
    pub fn summary(&self) -> MarketSummary {
        let mut by_pair: HashMap<String, BigDecimal> = HashMap::new();
        let mut by_route: HashMap<(ExchangeId, ExchangeId), BigDecimal> = HashMap::new();
        let mut total = BigDecimal::zero();

        for opp in &self.history {
            total += &opp.net_profit;
            *by_pair.entry(opp.pair.to_string()).or_default() += &opp.net_profit;
            *by_route
                .entry((opp.buy_exchange.clone(), opp.sell_exchange.clone()))
                .or_default() += &opp.net_profit;
        }

        let average_net_profit = if self.history.is_empty() {
            BigDecimal::zero()
        } else {
            total / BigDecimal::from(self.history.len() as u64)
        };

        MarketSummary {
            opportunities: self.history.len(),
            average_net_profit,
            most_profitable_pair: top(by_pair),
            best_route: top(by_route),
            exchanges: self
                .exchanges
                .iter()
                .map(|(exchange, contribution)| (exchange.clone(), contribution.clone()))
                .collect(),
        }
    }
}

/// Key with the largest value; ties go to the smallest key
fn top<K: Ord>(totals: HashMap<K, BigDecimal>) -> Option<K> {
    totals
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(key, _)| key)
}

/// How closely exchanges agree on a price: `1 - mean(|p - mean| / mean)`,
/// floored at zero. A single quote scores a perfect 1.
#[must_use]
pub fn market_efficiency(fresh: &[(ExchangeId, PriceQuote)]) -> BigDecimal {
    let one = BigDecimal::from(1);
    if fresh.len() < 2 {
        return one;
    }
    let count = BigDecimal::from(fresh.len() as u64);
    let mean = fresh
        .iter()
        .fold(BigDecimal::zero(), |acc, (_, q)| acc + q.price())
        / &count;
    if mean <= BigDecimal::zero() {
        return one;
    }
    let deviation = fresh
        .iter()
        .fold(BigDecimal::zero(), |acc, (_, q)| {
            acc + ((q.price() - &mean) / &mean).abs()
        })
        / &count;
    (one - deviation).max(BigDecimal::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;

    #[test]
    fn test_summary_picks_top_pair_and_route() {
        let mut analyzer = OpportunityAnalyzer::new();
        analyzer.record(&opportunity("a", "b", "12"));
        analyzer.record(&opportunity("a", "b", "14"));
        analyzer.record(&opportunity("c", "b", "22"));

        let summary = analyzer.summary();
        assert_eq!(summary.opportunities, 3);
        assert_eq!(summary.average_net_profit, dec("16"));
        assert_eq!(summary.most_profitable_pair.as_deref(), Some("WETH/USDC"));
        assert_eq!(
            summary.best_route,
            Some((ExchangeId::from("a"), ExchangeId::from("b")))
        );

        let b = &summary.exchanges[&ExchangeId::from("b")];
        assert_eq!(b.as_sell_side, 3);
        assert_eq!(b.as_buy_side, 0);
        assert_eq!(b.total_net_profit, dec("48"));
        assert_eq!(summary.exchanges[&ExchangeId::from("c")].as_buy_side, 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut analyzer = OpportunityAnalyzer::new();
        for _ in 0..(HISTORY_LIMIT + 5) {
            analyzer.record(&opportunity("a", "b", "11"));
        }
        assert_eq!(analyzer.len(), HISTORY_LIMIT);
        assert_eq!(analyzer.summary().opportunities, HISTORY_LIMIT);
        // contributions are not windowed
        let a = &analyzer.summary().exchanges[&ExchangeId::from("a")];
        assert_eq!(a.as_buy_side, (HISTORY_LIMIT + 5) as u64);

        assert!(OpportunityAnalyzer::new().is_empty());
        assert_eq!(OpportunityAnalyzer::new().summary().best_route, None);
    }

    #[test]
    fn test_market_efficiency() {
        assert_eq!(market_efficiency(&fresh(&[("a", "3000")])), dec("1"));
        assert_eq!(
            market_efficiency(&fresh(&[("a", "3000"), ("b", "3000")])),
            dec("1")
        );
        // mean 100, deviations 0.1 and 0.1
        assert_eq!(
            market_efficiency(&fresh(&[("a", "90"), ("b", "110")])),
            dec("0.9")
        );
    }
}
