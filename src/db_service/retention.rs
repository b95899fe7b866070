use crate::db_service::{OpportunityService, QuoteService};
use crate::utils::db_connect::DbPool;
use chrono::{Duration, Utc};
use eyre::Result;
use tokio::sync::watch;

/// Time between cleanup runs
const CLEANUP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Delete quotes and opportunities older than `days`.
///
/// # Returns
/// `(quotes, opportunities)` deleted
///
/// # Errors
/// * If the database connection or a delete fails
pub async fn cleanup(db: &DbPool, days: u32) -> Result<(usize, usize)> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));
    let mut conn = db.get().await?;
    let quotes = QuoteService::delete_before(&mut conn, cutoff).await?;
    let opportunities = OpportunityService::delete_before(&mut conn, cutoff).await?;

    log::info!(
        "db_service::retention: deleted {quotes} quotes and {opportunities} opportunities older than {days} days"
    );
    Ok((quotes, opportunities))
}

/// Run `cleanup` once a day until `shutdown` flips to `true`.
pub async fn retention(db: DbPool, days: u32, mut shutdown: watch::Receiver<bool>) {
    loop {
        if let Err(e) = cleanup(&db, days).await {
            log::error!("db_service::retention: cleanup failed: {e}");
        }

        tokio::select! {
            () = tokio::time::sleep(CLEANUP_INTERVAL) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}
