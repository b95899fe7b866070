//! Glint command line.

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use eyre::{Error, Result};
use glint::arb::analyzer::MarketSummary;
use glint::arb::scheduler::{CycleReport, PairOutcome};
use glint::arb::sink::{MemorySink, ResultSink};
use glint::bot::{build_scheduler, Bot};
use glint::config::{parse_pair, Config};
use glint::db_service::{retention, ChannelSink, OpportunityService, QuoteService};
use glint::notify::SlackNotifier;
use glint::utils::app_context::AppContext;
use glint::utils::decimal::trimmed;
use glint::utils::logger::setup_logger;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan on the configured interval until Ctrl-C (default)
    Start,
    /// Run a single scan cycle and print the result
    Once {
        /// Keep results in memory instead of writing them to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Run one dry cycle, then report each exchange's health and fetch history
    Health {
        /// Print the scan metrics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Opportunity and quote statistics
    Stats {
        /// Look-back window in days
        #[arg(long, default_value_t = 7)]
        days: u32,
    },
    /// Most recent opportunities, optionally for one pair or a time range
    Recent {
        /// Number of opportunities
        #[arg(long, default_value_t = 20)]
        limit: i64,
        /// Only this pair, as `SYM:address:decimals/SYM:address:decimals`
        #[arg(long, conflicts_with_all = ["since", "until"])]
        pair: Option<String>,
        /// Start of the range (RFC 3339); defaults to 24 hours before `until`
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// End of the range (RFC 3339); defaults to now
        #[arg(long)]
        until: Option<DateTime<Utc>>,
    },
    /// Recorded price quotes in a time range
    Quotes {
        /// Only this exchange
        #[arg(long)]
        exchange: Option<String>,
        /// Start of the range (RFC 3339); defaults to one hour before `until`
        #[arg(long)]
        since: Option<DateTime<Utc>>,
        /// End of the range (RFC 3339); defaults to now
        #[arg(long)]
        until: Option<DateTime<Utc>>,
        /// Maximum quotes
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },
    /// Delete rows older than the retention window
    Cleanup {
        /// Retention in days; defaults to GLINT_RETENTION_DAYS
        #[arg(long)]
        days: Option<u32>,
    },
    /// Send slack message
    Slack { message: String },
    /// Send slack error message
    SlackError { message: String },
}

fn print_report(report: &CycleReport) {
    println!(
        "Cycle {} finished in {}ms",
        report.cycle,
        report.elapsed.as_millis()
    );
    for source in &report.skipped_sources {
        println!("  skipped {source}: down");
    }
    for pair in &report.pairs {
        let outcome = match &pair.outcome {
            PairOutcome::Skipped => "still in flight".to_string(),
            PairOutcome::InsufficientFreshQuotes { fresh } => {
                format!("{fresh} fresh quote(s), nothing to compare")
            }
            PairOutcome::Evaluated {
                candidates,
                opportunities,
                rejected,
            } => format!(
                "{candidates} spread(s), {} opportunity(ies), {rejected} rejected",
                opportunities.len()
            ),
        };
        println!(
            "  {}: {} fetched, {} failed, {}",
            pair.pair, pair.fetched, pair.failed, outcome
        );
    }
    for opportunity in report.opportunities() {
        println!("  -> {opportunity}");
    }
}

async fn run_once(ctx: AppContext, dry_run: bool) -> Result<(), Error> {
    if dry_run {
        let sink = Arc::new(MemorySink::new());
        let scheduler = build_scheduler(&ctx, sink.clone())?;
        print_report(&scheduler.run_cycle().await);
        print_summary(&scheduler.market_summary());
        println!(
            "{} quotes and {} opportunities recorded in memory",
            sink.quotes().len(),
            sink.opportunities().len()
        );
        return Ok(());
    }

    let (sink, writer) = ChannelSink::spawn(
        ctx.db()?.clone(),
        SlackNotifier::from_env(),
        ctx.config.sink_capacity,
    );
    let sink: Arc<dyn ResultSink> = Arc::new(sink);
    let scheduler = build_scheduler(&ctx, sink)?;
    print_report(&scheduler.run_cycle().await);
    print_summary(&scheduler.market_summary());

    drop(scheduler);
    writer.await?;
    Ok(())
}

fn print_summary(summary: &MarketSummary) {
    println!("Market: {summary}");
    for (exchange, contribution) in &summary.exchanges {
        println!(
            "  {exchange}: bought on {} times, sold on {} times, net {}",
            contribution.as_buy_side,
            contribution.as_sell_side,
            trimmed(&contribution.total_net_profit)
        );
    }
}

async fn check_health(ctx: AppContext, json: bool) -> Result<(), Error> {
    // fetch counters start empty; one dry cycle fills them
    let scheduler = build_scheduler(&ctx, Arc::new(MemorySink::new()))?;
    scheduler.run_cycle().await;

    if json {
        println!("{}", scheduler.metrics().to_json()?);
        return Ok(());
    }

    for source in scheduler.health().await {
        println!("{}: {}", source.exchange, source.status);
        if let Some(stats) = source.stats {
            println!(
                "  {}/{} fetches ok, {} consecutive failures, average latency {}ms",
                stats.successes,
                stats.attempts(),
                stats.consecutive_failures,
                stats.average_latency_ms()
            );
            if let Some(error) = &stats.last_error {
                println!("  last error: {error}");
            }
        }
    }

    let Some(db) = &ctx.db else {
        return Ok(());
    };
    let now = Utc::now();
    let mut conn = db.get().await?;
    println!("Last recorded quotes:");
    for row in QuoteService::exchange_stats(&mut conn, now - Duration::days(1)).await? {
        println!(
            "  {} {}/{}: {}s ago",
            row.exchange,
            row.token0_symbol,
            row.token1_symbol,
            (now - row.last_update).num_seconds()
        );
    }
    Ok(())
}

async fn print_stats(ctx: AppContext, days: u32) -> Result<(), Error> {
    let since = Utc::now() - Duration::days(i64::from(days));
    let mut conn = ctx.db()?.get().await?;

    let stats = OpportunityService::stats(&mut conn, since).await?;
    println!("Opportunities in the last {days} days: {}", stats.total);
    if let Some(total) = &stats.total_net_profit {
        println!("  total net profit: {}", trimmed(total));
    }
    if let Some(average) = &stats.average_net_profit {
        println!("  average net profit: {}", trimmed(&average.with_scale(6)));
    }
    if let Some(best) = &stats.best_net_profit {
        println!("  best net profit: {}", trimmed(best));
    }
    if let Some(route) = OpportunityService::top_route(&mut conn, since).await? {
        println!(
            "  most active route: buy {} / sell {} ({} times)",
            route.buy_exchange, route.sell_exchange, route.opportunities
        );
    }

    println!("Quotes:");
    for row in QuoteService::exchange_stats(&mut conn, since).await? {
        println!(
            "  {} {}/{}: {} quotes, average {}, last {}",
            row.exchange,
            row.token0_symbol,
            row.token1_symbol,
            row.quotes,
            row.average_price
                .map_or_else(|| "-".to_string(), |p| trimmed(&p.with_scale(6)).to_string()),
            row.last_update.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn print_recent(
    ctx: AppContext,
    limit: i64,
    pair: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) -> Result<(), Error> {
    let mut conn = ctx.db()?.get().await?;
    let opportunities = if let Some(pair) = pair {
        let pair = parse_pair(&pair)?;
        OpportunityService::by_pair(&mut conn, pair.token0().address, pair.token1().address, limit)
            .await?
    } else if since.is_some() || until.is_some() {
        let until = until.unwrap_or_else(Utc::now);
        let since = since.unwrap_or(until - Duration::days(1));
        OpportunityService::in_range(&mut conn, since, until).await?
    } else {
        OpportunityService::recent(&mut conn, limit).await?
    };
    println!("Found {} opportunities", opportunities.len());
    for opportunity in opportunities {
        println!("  {opportunity}");
    }
    Ok(())
}

async fn print_quotes(
    ctx: AppContext,
    exchange: Option<String>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
    limit: i64,
) -> Result<(), Error> {
    let until = until.unwrap_or_else(Utc::now);
    let since = since.unwrap_or(until - Duration::hours(1));
    let mut conn = ctx.db()?.get().await?;
    let quotes = QuoteService::in_range(&mut conn, since, until, exchange.as_deref(), limit).await?;
    println!("Found {} quotes", quotes.len());
    for quote in quotes {
        println!("  {quote}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    setup_logger(config.log_file.as_deref())?;

    let cli = Cli::parse();

    // Slack commands need no connections
    match &cli.command {
        Some(Commands::Slack { message }) => {
            return SlackNotifier::new()?.send(message).await;
        }
        Some(Commands::SlackError { message }) => {
            return SlackNotifier::new()?.send_error(message).await;
        }
        _ => {}
    }

    let ctx = AppContext::new(config)?;

    match cli.command {
        Some(Commands::Once { dry_run }) => run_once(ctx, dry_run).await?,
        Some(Commands::Health { json }) => check_health(ctx, json).await?,
        Some(Commands::Stats { days }) => print_stats(ctx, days).await?,
        Some(Commands::Recent {
            limit,
            pair,
            since,
            until,
        }) => print_recent(ctx, limit, pair, since, until).await?,
        Some(Commands::Quotes {
            exchange,
            since,
            until,
            limit,
        }) => print_quotes(ctx, exchange, since, until, limit).await?,
        Some(Commands::Cleanup { days }) => {
            let days = days.unwrap_or(ctx.config.retention_days);
            let (quotes, opportunities) = retention::cleanup(ctx.db()?, days).await?;
            println!("Deleted {quotes} quotes and {opportunities} opportunities");
        }
        Some(Commands::Start) | None => Bot::new(ctx).start().await?,
        Some(Commands::Slack { .. } | Commands::SlackError { .. }) => {}
    }

    Ok(())
}
