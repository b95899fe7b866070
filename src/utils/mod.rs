/// App context
pub mod app_context;
/// Constants
pub mod constants;
/// Database pool
pub mod db_connect;
/// Fixed-precision decimals
pub mod decimal;
/// Logger
pub mod logger;
