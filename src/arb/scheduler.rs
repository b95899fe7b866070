//! Recurring scan cycles across every configured pair and exchange.
//!
//! A cycle health-checks the sources, then scans all pairs concurrently. A
//! pair scan moves through Fetching (one bounded, timed fetch per exchange)
//! and Evaluating (fresh quotes → evaluator → simulator → sink). A pair is
//! never scanned by two cycles at once; a cycle that finds a pair still in
//! flight skips it.

use crate::arb::analyzer::{market_efficiency, MarketSummary, OpportunityAnalyzer};
use crate::arb::cache::QuoteCache;
use crate::arb::error::SourceError;
use crate::arb::evaluator::{evaluate, price_spread};
use crate::arb::metrics::{ExchangeStats, MetricsReport, ScanMetrics};
use crate::arb::simulator::ProfitSimulator;
use crate::arb::sink::ResultSink;
use crate::arb::types::{ArbitrageOpportunity, ExchangeId, PairKey, PriceQuote, TokenPair};
use crate::source::{HealthStatus, PriceSource};
use chrono::Utc;
use futures::future::join_all;
use itertools::Itertools;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Semaphore};
use tokio::time::{interval, timeout, timeout_at, MissedTickBehavior};

/// Timing and concurrency knobs of the scheduler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Time between cycle starts
    pub scan_interval: Duration,
    /// Budget for one source call (price plus optional depth)
    pub fetch_timeout: Duration,
    /// Maximum quote age used for evaluation
    pub staleness_window: chrono::Duration,
    /// Fetches allowed in flight across all pairs
    pub max_in_flight_fetches: usize,
    /// Cycles between metrics reports in the log; 0 disables
    pub report_every: u64,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(5),
            staleness_window: chrono::Duration::seconds(60),
            max_in_flight_fetches: 16,
            report_every: 100,
        }
    }
}

/// What happened to one pair in one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairOutcome {
    /// A previous cycle was still scanning the pair
    Skipped,
    /// Fewer than two exchanges had fresh quotes; nothing to compare
    InsufficientFreshQuotes {
        /// Distinct exchanges with fresh quotes
        fresh: usize,
    },
    /// Quotes were compared
    Evaluated {
        /// Positive spreads found
        candidates: usize,
        /// Spreads that cleared the threshold
        opportunities: Vec<ArbitrageOpportunity>,
        /// Candidates dropped by a simulation error
        rejected: usize,
    },
}

/// Per-pair result of a cycle
#[derive(Debug, Clone)]
pub struct PairReport {
    /// The pair
    pub pair: TokenPair,
    /// Sources that returned a quote this cycle
    pub fetched: usize,
    /// Sources that failed or timed out this cycle
    pub failed: usize,
    /// Evaluation result
    pub outcome: PairOutcome,
}

/// Result of one cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Sources skipped after a failed health check
    pub skipped_sources: Vec<ExchangeId>,
    /// One entry per configured pair
    pub pairs: Vec<PairReport>,
    /// Wall time of the cycle
    pub elapsed: Duration,
}

impl CycleReport {
    /// Opportunities emitted during the cycle
    #[must_use]
    pub fn opportunities(&self) -> Vec<&ArbitrageOpportunity> {
        self.pairs
            .iter()
            .filter_map(|p| match &p.outcome {
                PairOutcome::Evaluated { opportunities, .. } => Some(opportunities),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

/// Live health of a source joined with its fetch history
#[derive(Debug, Clone)]
pub struct SourceHealth {
    /// Exchange
    pub exchange: ExchangeId,
    /// Result of a fresh health check
    pub status: HealthStatus,
    /// Fetch counters, if the exchange has been scanned
    pub stats: Option<ExchangeStats>,
}

/// Marks a pair as in flight until dropped
struct InFlightGuard<'a> {
    /// Set the key was inserted into
    set: &'a Mutex<HashSet<PairKey>>,
    /// The claimed pair
    key: PairKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

/// Drives scan cycles
pub struct ScanScheduler {
    /// One adapter per exchange
    sources: Vec<Arc<dyn PriceSource>>,
    /// Monitored pairs
    pairs: Vec<TokenPair>,
    /// Latest quotes
    cache: QuoteCache,
    /// Profit model
    simulator: ProfitSimulator,
    /// Output
    sink: Arc<dyn ResultSink>,
    /// Timing knobs
    settings: ScanSettings,
    /// Counters
    metrics: ScanMetrics,
    /// Rolling opportunity analysis
    analyzer: Mutex<OpportunityAnalyzer>,
    /// Pairs currently being scanned
    in_flight: Mutex<HashSet<PairKey>>,
    /// Bounds concurrent fetches
    fetch_permits: Semaphore,
    /// Cycles started
    cycles: AtomicU64,
}

impl ScanScheduler {
    /// Create a scheduler
    ///
    /// # Arguments
    /// * `sources` - One adapter per exchange
    /// * `pairs` - Pairs to monitor
    /// * `simulator` - Profit model
    /// * `sink` - Where quotes and opportunities are recorded
    /// * `settings` - Timing and concurrency
    #[must_use]
    pub fn new(
        sources: Vec<Arc<dyn PriceSource>>,
        pairs: Vec<TokenPair>,
        simulator: ProfitSimulator,
        sink: Arc<dyn ResultSink>,
        settings: ScanSettings,
    ) -> Self {
        let metrics = ScanMetrics::new();
        for source in &sources {
            metrics.register(source.exchange());
        }
        Self {
            fetch_permits: Semaphore::new(settings.max_in_flight_fetches.max(1)),
            sources,
            pairs,
            cache: QuoteCache::new(),
            simulator,
            sink,
            settings,
            metrics,
            analyzer: Mutex::new(OpportunityAnalyzer::new()),
            in_flight: Mutex::new(HashSet::new()),
            cycles: AtomicU64::new(0),
        }
    }

    /// The quote cache
    #[must_use]
    pub fn cache(&self) -> &QuoteCache {
        &self.cache
    }

    /// Snapshot of the scan counters
    #[must_use]
    pub fn metrics(&self) -> MetricsReport {
        self.metrics.report()
    }

    /// Summary of recent opportunities
    #[must_use]
    pub fn market_summary(&self) -> MarketSummary {
        self.analyzer.lock().summary()
    }

    /// Run cycles on the configured interval until `shutdown` flips to `true`.
    ///
    /// Each tick spawns its cycle, so a slow cycle never delays the next tick;
    /// pairs still in flight are skipped by the newer cycle.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.settings.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        log::info!(
            "arb::scheduler: scanning {} pairs on {} exchanges every {}s",
            self.pairs.len(),
            self.sources.len(),
            self.settings.scan_interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let scheduler = Arc::clone(&self);
                    tokio::spawn(async move {
                        scheduler.run_cycle().await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        log::info!("arb::scheduler: stopped\n{}", self.metrics.report());
    }

    /// Run one cycle over every pair.
    pub async fn run_cycle(&self) -> CycleReport {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let started = Instant::now();

        let (active, skipped_sources) = self.usable_sources().await;
        if !skipped_sources.is_empty() {
            log::warn!(
                "arb::scheduler: cycle {cycle} skipping down sources: {}",
                skipped_sources.iter().join(", ")
            );
        }

        let pairs = join_all(self.pairs.iter().map(|pair| self.scan_pair(pair, &active))).await;
        self.metrics.record_cycle();

        let report = CycleReport {
            cycle,
            skipped_sources,
            pairs,
            elapsed: started.elapsed(),
        };
        log::info!(
            "arb::scheduler: cycle {} finished in {}ms with {} opportunities",
            cycle,
            report.elapsed.as_millis(),
            report.opportunities().len()
        );

        if self.settings.report_every > 0 && cycle % self.settings.report_every == 0 {
            log::info!("arb::scheduler: metrics\n{}", self.metrics.report());
            log::info!("arb::scheduler: market {}", self.market_summary());
        }
        report
    }

    /// Health-check every source. Returns the usable ones and the names of
    /// the ones that are down.
    async fn usable_sources(&self) -> (Vec<Arc<dyn PriceSource>>, Vec<ExchangeId>) {
        let statuses = join_all(self.sources.iter().map(|source| self.check(source))).await;

        let mut active = Vec::with_capacity(self.sources.len());
        let mut down = Vec::new();
        for (source, status) in self.sources.iter().zip(statuses) {
            if !status.is_usable() {
                down.push(source.exchange().clone());
                continue;
            }
            if status == HealthStatus::Degraded {
                log::warn!("arb::scheduler: {} is degraded", source.exchange());
            }
            active.push(Arc::clone(source));
        }
        (active, down)
    }

    /// Health check bounded by the fetch timeout
    async fn check(&self, source: &Arc<dyn PriceSource>) -> HealthStatus {
        timeout(self.settings.fetch_timeout, source.health_check())
            .await
            .unwrap_or(HealthStatus::Down)
    }

    /// Live health of every source alongside its counters
    pub async fn health(&self) -> Vec<SourceHealth> {
        let statuses = join_all(self.sources.iter().map(|source| self.check(source))).await;
        self.sources
            .iter()
            .zip(statuses)
            .map(|(source, status)| SourceHealth {
                exchange: source.exchange().clone(),
                status,
                stats: self.metrics.exchange(source.exchange()),
            })
            .collect()
    }

    /// Claim a pair for this cycle, or `None` if another cycle holds it
    fn try_claim(&self, key: PairKey) -> Option<InFlightGuard<'_>> {
        if self.in_flight.lock().insert(key) {
            Some(InFlightGuard {
                set: &self.in_flight,
                key,
            })
        } else {
            None
        }
    }

    /// Fetch one pair from every source, then evaluate it.
    pub async fn scan_pair(&self, pair: &TokenPair, sources: &[Arc<dyn PriceSource>]) -> PairReport {
        let Some(_guard) = self.try_claim(pair.key()) else {
            log::debug!("arb::scheduler: {pair} still in flight, skipping");
            self.metrics.record_pair(true, false, 0, 0);
            return PairReport {
                pair: pair.clone(),
                fetched: 0,
                failed: 0,
                outcome: PairOutcome::Skipped,
            };
        };

        let results = join_all(sources.iter().map(|source| self.fetch(source, pair))).await;

        let (mut fetched, mut failed) = (0, 0);
        for result in results {
            match result {
                Ok((quote, latency)) => {
                    self.metrics.record_success(quote.exchange(), latency);
                    self.cache.update(quote.clone());
                    self.sink.record_quote(quote);
                    fetched += 1;
                }
                Err(e) => {
                    match &e {
                        SourceError::QuoteUnavailable { .. } => {
                            log::debug!("arb::scheduler: {pair}: {e}");
                        }
                        _ => log::warn!("arb::scheduler: {pair}: {e}"),
                    }
                    self.metrics.record_failure(&e);
                    failed += 1;
                }
            }
        }

        PairReport {
            pair: pair.clone(),
            fetched,
            failed,
            outcome: self.evaluate_pair(pair),
        }
    }

    /// One source call under the fetch timeout.
    ///
    /// The depth lookup shares the price call's deadline; if it fails or runs
    /// out of time the quote is kept with unknown depth.
    async fn fetch(
        &self,
        source: &Arc<dyn PriceSource>,
        pair: &TokenPair,
    ) -> Result<(PriceQuote, Duration), SourceError> {
        let exchange = source.exchange();
        let _permit = self
            .fetch_permits
            .acquire()
            .await
            .map_err(|e| SourceError::unavailable(exchange, e))?;

        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.settings.fetch_timeout;
        let timed_out = || SourceError::TimedOut {
            exchange: exchange.clone(),
            after: self.settings.fetch_timeout,
        };

        let mut quote = timeout_at(deadline, source.get_price(pair))
            .await
            .map_err(|_| timed_out())??;

        if self.simulator.params().slippage.uses_depth() && quote.liquidity().is_none() {
            match timeout_at(deadline, source.get_liquidity(pair)).await {
                Ok(Ok(depth)) => quote = quote.with_liquidity(depth),
                Ok(Err(e)) => log::debug!("arb::scheduler: {pair}: depth unknown: {e}"),
                Err(_) => log::debug!("arb::scheduler: {pair}: {}", timed_out()),
            }
        }

        Ok((quote, started.elapsed()))
    }

    /// Evaluate the pair from whatever fresh quotes the cache holds now
    fn evaluate_pair(&self, pair: &TokenPair) -> PairOutcome {
        let now = Utc::now();
        let fresh = self
            .cache
            .fresh_quotes(pair, now, self.settings.staleness_window);
        let exchanges = fresh.iter().map(|(exchange, _)| exchange).dedup().count();
        if exchanges < 2 {
            log::debug!("arb::scheduler: {pair}: {exchanges} fresh quotes, nothing to compare");
            self.metrics.record_pair(false, true, 0, 0);
            return PairOutcome::InsufficientFreshQuotes { fresh: exchanges };
        }

        if log::log_enabled!(log::Level::Debug) {
            log::debug!(
                "arb::scheduler: {pair}: {exchanges} exchanges, spread {}%, efficiency {}",
                price_spread(&fresh).map_or_else(|| "-".to_string(), |s| s.round(4).to_string()),
                market_efficiency(&fresh).round(6)
            );
        }

        let candidates = evaluate(pair, &fresh);
        let mut opportunities = Vec::new();
        let mut rejected = 0;

        for candidate in &candidates {
            match self.simulator.simulate(candidate) {
                Ok(simulation) if simulation.qualifies => {
                    let opportunity = simulation.into_opportunity(now);
                    log::info!("arb::scheduler: opportunity {opportunity}");
                    self.metrics.record_opportunity(&opportunity.net_profit);
                    self.analyzer.lock().record(&opportunity);
                    self.sink.record_opportunity(opportunity.clone());
                    opportunities.push(opportunity);
                }
                Ok(simulation) => log::debug!(
                    "arb::scheduler: {pair} {} -> {} net {} below threshold",
                    candidate.buy_exchange,
                    candidate.sell_exchange,
                    simulation.net_profit
                ),
                Err(e) => {
                    log::warn!(
                        "arb::scheduler: {pair} {} -> {} rejected: {e}",
                        candidate.buy_exchange,
                        candidate.sell_exchange
                    );
                    rejected += 1;
                }
            }
        }

        self.metrics
            .record_pair(false, false, candidates.len(), rejected);
        PairOutcome::Evaluated {
            candidates: candidates.len(),
            opportunities,
            rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arb::simulator::{SimulationParams, SlippageModel};
    use crate::arb::sink::MemorySink;
    use crate::arb::test_helpers::*;

    fn scheduler(
        sources: Vec<Arc<MockSource>>,
        params: SimulationParams,
        settings: ScanSettings,
    ) -> (ScanScheduler, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn PriceSource>)
            .collect();
        let scheduler = ScanScheduler::new(
            sources,
            vec![weth_usdc()],
            ProfitSimulator::new(params),
            sink.clone(),
            settings,
        );
        (scheduler, sink)
    }

    fn default_scheduler(sources: Vec<Arc<MockSource>>) -> (ScanScheduler, Arc<MemorySink>) {
        scheduler(sources, SimulationParams::default(), ScanSettings::default())
    }

    #[tokio::test]
    async fn test_small_spread_records_quotes_only() {
        let (scheduler, sink) = default_scheduler(vec![
            mock("a", Script::Price("3000.00")),
            mock("b", Script::Price("3015.00")),
        ]);

        let report = scheduler.run_cycle().await;

        assert_eq!(sink.quotes().len(), 2);
        assert!(sink.opportunities().is_empty());
        assert_eq!(
            report.pairs[0].outcome,
            PairOutcome::Evaluated {
                candidates: 1,
                opportunities: vec![],
                rejected: 0
            }
        );
    }

    #[tokio::test]
    async fn test_wide_spread_emits_one_opportunity() {
        let (scheduler, sink) = default_scheduler(vec![
            mock("a", Script::Price("3000.00")),
            mock("b", Script::Price("3050.00")),
        ]);

        let report = scheduler.run_cycle().await;

        let opportunities = sink.opportunities();
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].buy_exchange.as_str(), "a");
        assert_eq!(opportunities[0].sell_exchange.as_str(), "b");
        assert_eq!(opportunities[0].net_profit, dec("11.65"));
        assert_eq!(report.opportunities().len(), 1);
        assert_eq!(scheduler.metrics().opportunities, 1);
        assert_eq!(scheduler.market_summary().opportunities, 1);
    }

    #[tokio::test]
    async fn test_partial_failure_uses_remaining_sources() {
        let (scheduler, sink) = default_scheduler(vec![
            mock("a", Script::Price("3000")),
            mock("b", Script::Unavailable),
            mock("c", Script::Price("3050")),
        ]);

        let report = scheduler.run_cycle().await;
        let pair = &report.pairs[0];

        assert_eq!(pair.fetched, 2);
        assert_eq!(pair.failed, 1);
        assert_eq!(sink.opportunities().len(), 1);
        assert_eq!(sink.opportunities()[0].sell_exchange.as_str(), "c");

        let stats = scheduler.metrics().exchanges[&ExchangeId::from("b")].clone();
        assert_eq!(stats.source_unavailable, 1);
        assert_eq!(stats.consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_no_market_counts_separately() {
        let (scheduler, _sink) = default_scheduler(vec![
            mock("a", Script::Price("3000")),
            mock("b", Script::NoMarket),
        ]);

        let report = scheduler.run_cycle().await;

        assert_eq!(
            report.pairs[0].outcome,
            PairOutcome::InsufficientFreshQuotes { fresh: 1 }
        );
        let stats = scheduler.metrics().exchanges[&ExchangeId::from("b")].clone();
        assert_eq!(stats.quote_unavailable, 1);
    }

    #[tokio::test]
    async fn test_slow_source_times_out_without_stalling() {
        let settings = ScanSettings {
            fetch_timeout: Duration::from_millis(50),
            ..ScanSettings::default()
        };
        let (scheduler, sink) = scheduler(
            vec![
                mock("a", Script::Price("3000")),
                mock("b", Script::Slow(Duration::from_secs(2), "3100")),
                mock("c", Script::Price("3050")),
            ],
            SimulationParams::default(),
            settings,
        );

        let started = Instant::now();
        let report = scheduler.run_cycle().await;

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(report.pairs[0].failed, 1);
        assert_eq!(sink.quotes().len(), 2);
        assert_eq!(sink.opportunities().len(), 1);
        assert_eq!(
            scheduler.metrics().exchanges[&ExchangeId::from("b")].timeouts,
            1
        );
    }

    #[tokio::test]
    async fn test_cached_quote_survives_a_failed_cycle() {
        let b = mock("b", Script::Price("3050"));
        let (scheduler, sink) = default_scheduler(vec![mock("a", Script::Price("3000")), b.clone()]);

        scheduler.run_cycle().await;
        b.set(Script::Unavailable);
        let report = scheduler.run_cycle().await;

        assert_eq!(report.pairs[0].failed, 1);
        // b's quote from the first cycle is still fresh
        assert_eq!(sink.opportunities().len(), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_is_not_used() {
        let (scheduler, sink) = default_scheduler(vec![
            mock("a", Script::Price("3000")),
            mock("b", Script::Price("3050")),
        ]);
        // would be the best buy side if it were fresh
        scheduler
            .cache()
            .update_at(quote("c", "2000"), Utc::now() - chrono::Duration::minutes(5));

        scheduler.run_cycle().await;

        let opportunities = sink.opportunities();
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].buy_exchange.as_str(), "a");
    }

    #[tokio::test]
    async fn test_pair_in_flight_is_skipped() {
        let a = mock("a", Script::Price("3000"));
        let (scheduler, _sink) = default_scheduler(vec![a.clone(), mock("b", Script::Price("3050"))]);

        let guard = scheduler.try_claim(weth_usdc().key());
        assert!(guard.is_some());
        let report = scheduler.run_cycle().await;

        assert_eq!(report.pairs[0].outcome, PairOutcome::Skipped);
        assert_eq!(a.calls(), 0);

        drop(guard);
        let report = scheduler.run_cycle().await;
        assert_ne!(report.pairs[0].outcome, PairOutcome::Skipped);
        assert_eq!(a.calls(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_cycles_never_share_a_pair() {
        let (scheduler, _sink) = default_scheduler(vec![
            mock("a", Script::Slow(Duration::from_millis(200), "3000")),
            mock("b", Script::Price("3050")),
        ]);

        let (first, second) = tokio::join!(scheduler.run_cycle(), scheduler.run_cycle());
        let skipped = [first, second]
            .iter()
            .filter(|r| r.pairs[0].outcome == PairOutcome::Skipped)
            .count();
        assert_eq!(skipped, 1);
    }

    #[tokio::test]
    async fn test_down_source_is_not_fetched() {
        let down = Arc::new(MockSource::new("b", Script::Price("3050")).with_health(HealthStatus::Down));
        let (scheduler, _sink) = default_scheduler(vec![mock("a", Script::Price("3000")), down.clone()]);

        let report = scheduler.run_cycle().await;

        assert_eq!(report.skipped_sources, vec![ExchangeId::from("b")]);
        assert_eq!(down.calls(), 0);
        assert_eq!(
            report.pairs[0].outcome,
            PairOutcome::InsufficientFreshQuotes { fresh: 1 }
        );

        let health = scheduler.health().await;
        assert_eq!(health[1].status, HealthStatus::Down);
    }

    #[tokio::test]
    async fn test_depth_aware_fetches_liquidity() {
        let params = SimulationParams {
            slippage: SlippageModel::DepthAware { fallback: dec("0.001") },
            ..SimulationParams::default()
        };
        let (scheduler, sink) = scheduler(
            vec![
                Arc::new(MockSource::new("a", Script::Price("3000")).with_liquidity("100000")),
                Arc::new(MockSource::new("b", Script::Price("3050")).with_liquidity("200000")),
            ],
            params,
            ScanSettings::default(),
        );

        scheduler.run_cycle().await;

        let quotes = sink.quotes();
        assert!(quotes.iter().all(|q| q.liquidity().is_some()));
        // 1% slippage on 16.67 gross
        assert_eq!(sink.opportunities()[0].slippage_cost, dec("0.166666666666666667"));
    }

    #[tokio::test]
    async fn test_fetches_bounded_by_permits() {
        let gauge = Arc::new(Gauge::default());
        let slow = |id: &str, price| {
            Arc::new(
                MockSource::new(id, Script::Slow(Duration::from_millis(30), price))
                    .with_gauge(Arc::clone(&gauge)),
            )
        };
        let (scheduler, sink) = scheduler(
            vec![slow("a", "3000"), slow("b", "3050"), slow("c", "3010")],
            SimulationParams::default(),
            ScanSettings {
                max_in_flight_fetches: 1,
                ..ScanSettings::default()
            },
        );

        let report = scheduler.run_cycle().await;

        assert_eq!(report.pairs[0].fetched, 3);
        assert_eq!(sink.quotes().len(), 3);
        assert_eq!(gauge.peak(), 1);
    }

    #[tokio::test]
    async fn test_fetches_run_concurrently_within_permits() {
        let gauge = Arc::new(Gauge::default());
        let slow = |id: &str, price| {
            Arc::new(
                MockSource::new(id, Script::Slow(Duration::from_millis(50), price))
                    .with_gauge(Arc::clone(&gauge)),
            )
        };
        let (scheduler, _sink) = default_scheduler(vec![
            slow("a", "3000"),
            slow("b", "3050"),
            slow("c", "3010"),
        ]);

        scheduler.run_cycle().await;

        assert_eq!(gauge.peak(), 3);
    }

    #[tokio::test]
    async fn test_depth_failure_keeps_quote_without_depth() {
        let params = SimulationParams {
            slippage: SlippageModel::DepthAware { fallback: dec("0.001") },
            ..SimulationParams::default()
        };
        let (scheduler, sink) = scheduler(
            vec![
                Arc::new(MockSource::new("a", Script::Price("3000")).with_depth(DepthScript::Unavailable)),
                Arc::new(
                    MockSource::new("b", Script::Price("3050"))
                        .with_depth(DepthScript::Slow(Duration::from_secs(2))),
                ),
            ],
            params,
            ScanSettings {
                fetch_timeout: Duration::from_millis(50),
                ..ScanSettings::default()
            },
        );

        let report = scheduler.run_cycle().await;

        assert_eq!(report.pairs[0].fetched, 2);
        assert_eq!(report.pairs[0].failed, 0);
        let quotes = sink.quotes();
        assert_eq!(quotes.len(), 2);
        assert!(quotes.iter().all(|q| q.liquidity().is_none()));
        // flat fallback on unknown depth
        let opportunities = sink.opportunities();
        assert_eq!(opportunities[0].slippage_cost, dec("0.016666666666666667"));
        assert_eq!(opportunities[0].net_profit, dec("11.65"));
    }

    #[tokio::test]
    async fn test_health_reflects_scan_history() {
        let (scheduler, _sink) = default_scheduler(vec![
            mock("a", Script::Price("3000")),
            mock("b", Script::Unavailable),
        ]);

        scheduler.run_cycle().await;
        scheduler.run_cycle().await;
        let health = scheduler.health().await;

        let a = health[0].stats.clone().unwrap();
        assert_eq!(a.successes, 2);
        assert_eq!(a.consecutive_failures, 0);
        let b = health[1].stats.clone().unwrap();
        assert_eq!(b.attempts(), 2);
        assert_eq!(b.consecutive_failures, 2);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (scheduler, sink) = scheduler(
            vec![mock("a", Script::Price("3000")), mock("b", Script::Price("3050"))],
            SimulationParams::default(),
            ScanSettings {
                scan_interval: Duration::from_millis(20),
                ..ScanSettings::default()
            },
        );
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(Arc::new(scheduler).run(rx));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();

        assert!(!sink.quotes().is_empty());
    }
}
