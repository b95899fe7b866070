//! Persistence behind the [`ResultSink`] interface.
//!
//! The scan side only does a `try_send` into a bounded channel; a writer task
//! owns the database connection. A full channel drops the record with a
//! warning, so database latency never reaches the scan loop.

use crate::arb::sink::ResultSink;
use crate::arb::types::{ArbitrageOpportunity, PriceQuote};
use crate::db_service::{OpportunityService, QuoteService};
use crate::models::{NewOpportunity, NewQuote};
use crate::notify::SlackNotifier;
use crate::utils::db_connect::DbPool;
use eyre::Result;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

/// One event for the writer
#[derive(Debug, Clone)]
pub enum Record {
    /// A fetched quote
    Quote(PriceQuote),
    /// A qualifying opportunity
    Opportunity(ArbitrageOpportunity),
}

impl Record {
    /// Short name for logs
    fn kind(&self) -> &'static str {
        match self {
            Self::Quote(_) => "quote",
            Self::Opportunity(_) => "opportunity",
        }
    }
}

/// Non-blocking sink feeding the writer task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    /// Sending half of the record channel
    tx: mpsc::Sender<Record>,
}

impl ChannelSink {
    /// Create a sink and the receiving half of its channel
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Record>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Create a sink whose records are written to `db`, with optional Slack
    /// alerts for opportunities.
    ///
    /// # Returns
    /// The sink and the writer task handle. The writer exits once every
    /// clone of the sink is dropped.
    #[must_use]
    pub fn spawn(
        db: DbPool,
        notifier: Option<SlackNotifier>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (sink, rx) = Self::new(capacity);
        let writer = tokio::spawn(write_records(rx, db, notifier));
        (sink, writer)
    }

    /// Queue a record without waiting
    fn send(&self, record: Record) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                log::warn!("db_service::recorder: channel full, dropping {}", record.kind());
            }
            Err(TrySendError::Closed(record)) => {
                log::error!("db_service::recorder: writer stopped, dropping {}", record.kind());
            }
        }
    }
}

impl ResultSink for ChannelSink {
    fn record_quote(&self, quote: PriceQuote) {
        self.send(Record::Quote(quote));
    }

    fn record_opportunity(&self, opportunity: ArbitrageOpportunity) {
        self.send(Record::Opportunity(opportunity));
    }
}

/// Writer loop: persist each record, log failures, keep going
async fn write_records(
    mut rx: mpsc::Receiver<Record>,
    db: DbPool,
    notifier: Option<SlackNotifier>,
) {
    log::info!("db_service::recorder: writer started");
    while let Some(record) = rx.recv().await {
        if let Err(e) = persist(&db, &record).await {
            log::error!("db_service::recorder: failed to persist {}: {e}", record.kind());
        }

        if let (Record::Opportunity(opportunity), Some(notifier)) = (record, &notifier) {
            let notifier = notifier.clone();
            tokio::spawn(async move {
                if let Err(e) = notifier.send_opportunity(&opportunity).await {
                    log::warn!("db_service::recorder: slack alert failed: {e}");
                }
            });
        }
    }
    log::info!("db_service::recorder: writer stopped");
}

/// Write one record
async fn persist(db: &DbPool, record: &Record) -> Result<()> {
    let mut conn = db.get().await?;
    match record {
        Record::Quote(quote) => {
            QuoteService::insert(&mut conn, &NewQuote::try_from(quote)?).await?;
        }
        Record::Opportunity(opportunity) => {
            OpportunityService::insert(&mut conn, &NewOpportunity::try_from(opportunity)?).await?;
        }
    }
    Ok(())
}
