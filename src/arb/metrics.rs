//! Scan counters per exchange and per cycle.

use crate::arb::error::SourceError;
use crate::arb::types::ExchangeId;
use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use eyre::Result;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Fetch outcomes for one exchange
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExchangeStats {
    /// Quotes fetched successfully
    pub successes: u64,
    /// Connectivity failures
    pub source_unavailable: u64,
    /// Fetches that hit the timeout
    pub timeouts: u64,
    /// Pairs with no market on the exchange
    pub quote_unavailable: u64,
    /// Transient failures since the last success
    pub consecutive_failures: u64,
    /// Sum of successful fetch latencies
    pub total_latency_ms: u64,
    /// Last successful fetch
    pub last_success: Option<DateTime<Utc>>,
    /// Last error message
    pub last_error: Option<String>,
}

impl ExchangeStats {
    /// All fetch attempts
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.successes + self.source_unavailable + self.timeouts + self.quote_unavailable
    }

    /// Mean latency of successful fetches
    #[must_use]
    pub fn average_latency_ms(&self) -> u64 {
        self.total_latency_ms.checked_div(self.successes).unwrap_or(0)
    }
}

/// Snapshot of all counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    /// When collection started
    pub started_at: DateTime<Utc>,
    /// Completed cycles
    pub cycles: u64,
    /// Pairs skipped because a previous cycle was still on them
    pub skipped_pairs: u64,
    /// Pairs that had fewer than two fresh quotes
    pub insufficient_pairs: u64,
    /// Candidates found by the evaluator
    pub candidates: u64,
    /// Candidates rejected by a simulation error
    pub rejected_candidates: u64,
    /// Opportunities emitted
    pub opportunities: u64,
    /// Net profit summed over emitted opportunities
    pub total_simulated_profit: BigDecimal,
    /// Per exchange, ordered by name
    pub exchanges: BTreeMap<ExchangeId, ExchangeStats>,
}

impl MetricsReport {
    /// Pretty JSON export
    ///
    /// # Errors
    /// * If serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for MetricsReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cycles={} candidates={} opportunities={} rejected={} skipped={} insufficient={} profit={}",
            self.cycles,
            self.candidates,
            self.opportunities,
            self.rejected_candidates,
            self.skipped_pairs,
            self.insufficient_pairs,
            self.total_simulated_profit
        )?;
        for (exchange, stats) in &self.exchanges {
            write!(
                f,
                "\n  {exchange}: ok={}/{} unavailable={} timeouts={} no_market={} streak={} avg={}ms",
                stats.successes,
                stats.attempts(),
                stats.source_unavailable,
                stats.timeouts,
                stats.quote_unavailable,
                stats.consecutive_failures,
                stats.average_latency_ms()
            )?;
        }
        Ok(())
    }
}

/// Thread-safe collector shared by every scan task.
///
/// Each call takes the lock once, updates, and releases.
#[derive(Debug)]
pub struct ScanMetrics {
    /// Counters
    inner: Mutex<MetricsReport>,
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanMetrics {
    /// Start collecting
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsReport {
                started_at: Utc::now(),
                cycles: 0,
                skipped_pairs: 0,
                insufficient_pairs: 0,
                candidates: 0,
                rejected_candidates: 0,
                opportunities: 0,
                total_simulated_profit: BigDecimal::zero(),
                exchanges: BTreeMap::new(),
            }),
        }
    }

    /// Register an exchange so it shows up in reports before its first fetch
    pub fn register(&self, exchange: &ExchangeId) {
        self.inner
            .lock()
            .exchanges
            .entry(exchange.clone())
            .or_default();
    }

    /// Record a successful fetch
    pub fn record_success(&self, exchange: &ExchangeId, latency: Duration) {
        let mut inner = self.inner.lock();
        let stats = inner.exchanges.entry(exchange.clone()).or_default();
        stats.successes += 1;
        stats.consecutive_failures = 0;
        stats.total_latency_ms += u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        stats.last_success = Some(Utc::now());
    }

    /// Record a failed fetch
    pub fn record_failure(&self, error: &SourceError) {
        let mut inner = self.inner.lock();
        let stats = inner.exchanges.entry(error.exchange().clone()).or_default();
        match error {
            SourceError::SourceUnavailable { .. } => stats.source_unavailable += 1,
            SourceError::TimedOut { .. } => stats.timeouts += 1,
            SourceError::QuoteUnavailable { .. } => stats.quote_unavailable += 1,
        }
        if error.is_transient() {
            stats.consecutive_failures += 1;
        }
        stats.last_error = Some(error.to_string());
    }

    /// Record the outcome of one pair scan
    pub fn record_pair(&self, skipped: bool, insufficient: bool, candidates: usize, rejected: usize) {
        let mut inner = self.inner.lock();
        inner.skipped_pairs += u64::from(skipped);
        inner.insufficient_pairs += u64::from(insufficient);
        inner.candidates += candidates as u64;
        inner.rejected_candidates += rejected as u64;
    }

    /// Record an emitted opportunity
    pub fn record_opportunity(&self, net_profit: &BigDecimal) {
        let mut inner = self.inner.lock();
        inner.opportunities += 1;
        inner.total_simulated_profit += net_profit;
    }

    /// Record a finished cycle
    pub fn record_cycle(&self) {
        self.inner.lock().cycles += 1;
    }

    /// Stats for one exchange
    #[must_use]
    pub fn exchange(&self, exchange: &ExchangeId) -> Option<ExchangeStats> {
        self.inner.lock().exchanges.get(exchange).cloned()
    }

    /// Copy of every counter
    #[must_use]
    pub fn report(&self) -> MetricsReport {
        self.inner.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arb::types::PairKey;
    use alloy::primitives::Address;

    #[test]
    fn test_failure_streak_resets_on_success() {
        let metrics = ScanMetrics::new();
        let ex = ExchangeId::from("a");

        metrics.record_failure(&SourceError::unavailable(&ex, "connection refused"));
        metrics.record_failure(&SourceError::TimedOut {
            exchange: ex.clone(),
            after: Duration::from_secs(5),
        });
        let stats = metrics.exchange(&ex).unwrap();
        assert_eq!(stats.consecutive_failures, 2);
        assert_eq!(stats.timeouts, 1);
        assert_eq!(stats.source_unavailable, 1);

        metrics.record_success(&ex, Duration::from_millis(40));
        metrics.record_success(&ex, Duration::from_millis(60));
        let stats = metrics.exchange(&ex).unwrap();
        assert_eq!(stats.consecutive_failures, 0);
        assert_eq!(stats.attempts(), 4);
        assert_eq!(stats.average_latency_ms(), 50);
    }

    #[test]
    fn test_no_market_does_not_count_as_streak() {
        let metrics = ScanMetrics::new();
        let ex = ExchangeId::from("a");
        metrics.record_failure(&SourceError::QuoteUnavailable {
            exchange: ex.clone(),
            pair: PairKey {
                token0: Address::ZERO,
                token1: Address::repeat_byte(2),
            },
        });

        let stats = metrics.exchange(&ex).unwrap();
        assert_eq!(stats.quote_unavailable, 1);
        assert_eq!(stats.consecutive_failures, 0);
    }

    #[test]
    fn test_report_totals() {
        let metrics = ScanMetrics::new();
        metrics.register(&ExchangeId::from("z"));
        metrics.record_pair(false, false, 2, 1);
        metrics.record_pair(true, false, 0, 0);
        metrics.record_opportunity(&BigDecimal::from(12));
        metrics.record_cycle();

        let report = metrics.report();
        assert_eq!(report.cycles, 1);
        assert_eq!(report.candidates, 2);
        assert_eq!(report.rejected_candidates, 1);
        assert_eq!(report.skipped_pairs, 1);
        assert_eq!(report.total_simulated_profit, BigDecimal::from(12));
        assert!(report.exchanges.contains_key(&ExchangeId::from("z")));
        assert!(report.to_string().contains("z: ok=0/0"));
        assert!(report.to_json().unwrap().contains("\"cycles\": 1"));
    }

    #[test]
    fn test_display_one_line_per_exchange() {
        let metrics = ScanMetrics::new();
        metrics.register(&ExchangeId::from("b"));
        metrics.register(&ExchangeId::from("a"));
        metrics.record_success(&ExchangeId::from("a"), Duration::from_millis(10));

        let text = metrics.report().to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("cycles=0"));
        assert!(lines[1].starts_with("  a: ok=1/1"));
        assert!(lines[2].starts_with("  b: ok=0/0"));
        assert!(!text.ends_with('\n'));
    }
}
