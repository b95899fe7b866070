mod opportunity_service;
mod quote_service;
/// Database-backed result sink
pub mod recorder;
/// Periodic cleanup of old rows
pub mod retention;

pub use opportunity_service::{OpportunityService, OpportunityStats, RouteCount};
pub use quote_service::{ExchangeQuoteStats, QuoteService};
pub use recorder::ChannelSink;
