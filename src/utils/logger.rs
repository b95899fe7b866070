use chrono::Local;
use eyre::Result;
use fern::Dispatch;

/// Sets up the application logger with console and optional file output.
///
/// # Arguments
/// * `log_file` - Also append log lines to this file
///
/// # Errors
/// * If log file creation fails
/// * If a logger is already installed
pub fn setup_logger(log_file: Option<&str>) -> Result<()> {
    let mut dispatch = Dispatch::new()
        // Set logging level from RUST_LOG env var or default to Info
        .level(
            std::env::var("RUST_LOG")
                .ok()
                .and_then(|level| level.parse().ok())
                .unwrap_or(log::LevelFilter::Info),
        )
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ));
        })
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
