//! Where quotes and opportunities go once the scan is done with them.

use crate::arb::types::{ArbitrageOpportunity, PriceQuote};
use parking_lot::Mutex;

/// Append-only output of the scan.
///
/// Both calls are fire-and-forget: implementations must return immediately
/// and handle their own failures (log, drop). A sink never fails a scan.
pub trait ResultSink: Send + Sync {
    /// Record a fetched quote, profitable or not
    fn record_quote(&self, quote: PriceQuote);

    /// Record an opportunity that cleared the profit threshold
    fn record_opportunity(&self, opportunity: ArbitrageOpportunity);
}

/// Keeps everything in memory. Used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    /// Recorded quotes in arrival order
    quotes: Mutex<Vec<PriceQuote>>,
    /// Recorded opportunities in arrival order
    opportunities: Mutex<Vec<ArbitrageOpportunity>>,
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the recorded quotes
    #[must_use]
    pub fn quotes(&self) -> Vec<PriceQuote> {
        self.quotes.lock().clone()
    }

    /// Copy of the recorded opportunities
    #[must_use]
    pub fn opportunities(&self) -> Vec<ArbitrageOpportunity> {
        self.opportunities.lock().clone()
    }
}

impl ResultSink for MemorySink {
    fn record_quote(&self, quote: PriceQuote) {
        self.quotes.lock().push(quote);
    }

    fn record_opportunity(&self, opportunity: ArbitrageOpportunity) {
        log::info!("arb::sink: {opportunity}");
        self.opportunities.lock().push(opportunity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arb::test_helpers::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.record_quote(quote("a", "3000"));
        sink.record_quote(quote("b", "3050"));
        sink.record_opportunity(opportunity("a", "b", "11.65"));

        let quotes = sink.quotes();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[1].exchange().as_str(), "b");
        assert_eq!(sink.opportunities()[0].net_profit, dec("11.65"));
    }
}
