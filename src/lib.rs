/*!
 * # Glint - Cross-DEX Arbitrage Detection and Simulation
 *
 * Glint watches a set of token pairs across several decentralized exchanges,
 * compares the latest quotes, and simulates whether a cross-exchange spread
 * would clear a profit threshold after slippage and gas. It detects and
 * records; it never trades.
 *
 * ## Module Structure
 *
 * - `arb`: Quote cache, spread evaluation, profit simulation, scan scheduling
 * - `bot`: Long-running mode
 * - `config`: Configuration from the environment
 * - `db_service`: Persistence of quotes and opportunities
 * - `models`: Database rows
 * - `notify`: Slack alerts
 * - `schemas`: Database schema definitions
 * - `source`: Exchange price source adapters
 * - `utils`: Utility functions and helpers
 */

/// Arbitrage detection and simulation
pub mod arb;
/// Long-running mode
pub mod bot;
/// Configuration management for the system
pub mod config;
/// Database interaction for persistent storage
pub mod db_service;
/// Data models for the application
pub mod models;
/// Notifications
pub mod notify;
/// Database schema definitions
pub mod schemas;
/// Exchange price sources
pub mod source;
/// Utility functions and helpers
pub mod utils;
