//! Long-running mode: the scan loop plus housekeeping until Ctrl-C.

use crate::arb::scheduler::ScanScheduler;
use crate::arb::simulator::ProfitSimulator;
use crate::arb::sink::ResultSink;
use crate::db_service::{retention::retention, ChannelSink};
use crate::notify::SlackNotifier;
use crate::source::create_sources;
use crate::utils::app_context::AppContext;
use eyre::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long shutdown waits for queued records to be written
const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a scheduler over the configured exchanges and pairs.
///
/// # Errors
/// * If the scan settings are out of range
pub fn build_scheduler(ctx: &AppContext, sink: Arc<dyn ResultSink>) -> Result<ScanScheduler> {
    let config = &ctx.config;
    let sources = create_sources(&config.exchanges, &ctx.provider, config.degraded_latency);
    Ok(ScanScheduler::new(
        sources,
        config.pairs.clone(),
        ProfitSimulator::new(config.simulation_params()),
        sink,
        config.scan_settings()?,
    ))
}

/// The bot
pub struct Bot {
    /// Shared connections and config
    ctx: AppContext,
}

impl Bot {
    /// Create a bot
    #[must_use]
    pub const fn new(ctx: AppContext) -> Self {
        Self { ctx }
    }

    /// Run the scan loop and the retention task until Ctrl-C.
    ///
    /// # Errors
    /// * If `DATABASE_URL` is not set
    /// * If the scheduler cannot be built
    /// * If the Ctrl-C handler cannot be installed
    pub async fn start(self) -> Result<()> {
        let db = self.ctx.db()?.clone();
        let notifier = SlackNotifier::from_env();
        let (sink, writer) =
            ChannelSink::spawn(db.clone(), notifier.clone(), self.ctx.config.sink_capacity);

        let scheduler = Arc::new(build_scheduler(&self.ctx, Arc::new(sink))?);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        // Spawn scan task
        let scan = tokio::spawn(Arc::clone(&scheduler).run(shutdown_rx.clone()));

        // Spawn retention task
        let days = self.ctx.config.retention_days;
        let cleanup = tokio::spawn(async move {
            log::info!("bot: starting retention task ({days} days)");
            retention(db, days, shutdown_rx).await;
        });

        if let Some(notifier) = &notifier {
            if let Err(e) = notifier.send("glint started").await {
                log::warn!("bot: slack startup message failed: {e}");
            }
        }

        tokio::signal::ctrl_c().await?;
        log::info!("bot: received shutdown signal, waiting for tasks to complete...");
        shutdown_tx.send_replace(true);

        if let Err(e) = scan.await {
            log::error!("bot: scan task failed: {e}");
        }
        if let Err(e) = cleanup.await {
            log::error!("bot: retention task failed: {e}");
        }

        log::info!("bot: final metrics\n{}", scheduler.metrics());
        // the writer exits once the last sink clone is gone
        drop(scheduler);
        if tokio::time::timeout(FLUSH_TIMEOUT, writer).await.is_err() {
            log::warn!("bot: writer did not drain within {}s", FLUSH_TIMEOUT.as_secs());
        }
        Ok(())
    }
}
