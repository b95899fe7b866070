//! # Arbitrage Module
//!
//! Cross-exchange spread detection. Quotes flow from the price sources into
//! the [`cache::QuoteCache`], the [`evaluator`] turns fresh quotes into
//! candidate spreads, the [`simulator`] prices them, and the
//! [`scheduler::ScanScheduler`] drives the whole thing on an interval.

/// Rolling statistics over detected opportunities
pub mod analyzer;
/// Latest quote per exchange and pair
pub mod cache;
/// Error types
pub mod error;
/// Pairwise spread detection
pub mod evaluator;
/// Fetch and scan counters
pub mod metrics;
/// Scan cycles
pub mod scheduler;
/// Net profit simulation
pub mod simulator;
/// Output of the scan
pub mod sink;
/// Test helpers and utilities
#[cfg(test)]
pub mod test_helpers;
/// Tokens, pairs, quotes, opportunities
pub mod types;
