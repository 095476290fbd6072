//! Logging setup for embedders
//!
//! The engine itself only emits through the `log` facade; embedders that
//! have no logger of their own can initialise flexi_logger here. Tests
//! and examples use the same entry point.

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle, TS_DASHES_BLANK_COLONS_DOT_BLANK};
use log::Record;

// Global static logger handle for flexi_logger
static LOGGER_HANDLE: std::sync::OnceLock<std::sync::Mutex<LoggerHandle>> =
    std::sync::OnceLock::new();

/// Initialise logging with flexi_logger.
///
/// * `log_level` - level spec, defaults to `info`
/// * `log_format` - `"text"` (default) or `"json"`
/// * `log_file` - log to this file instead of stderr when given
///
/// Calling this more than once keeps the first configuration; use
/// [`reconfigure_logging`] for runtime level changes.
pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if LOGGER_HANDLE.get().is_some() {
        return Ok(());
    }

    let level_str = log_level.unwrap_or("info");
    let mut logger = Logger::try_with_str(level_str)?;

    logger = match log_format {
        Some("json") => logger.format(json_format),
        _ => logger.format(simple_format),
    };

    if let Some(file_path) = log_file {
        let file_spec = FileSpec::try_from(std::path::Path::new(file_path))?;
        logger = logger.log_to_file(file_spec);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(std::sync::Mutex::new(handle));

    Ok(())
}

/// Reconfigure the log level at runtime.
///
/// # Limitations
/// Only the level can change at runtime; format and file output are
/// fixed at initialisation, a constraint of flexi_logger's design.
pub fn reconfigure_logging(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(handle_mutex) = LOGGER_HANDLE.get() {
        if let Ok(mut handle) = handle_mutex.lock() {
            let _ = handle.parse_and_push_temp_spec(log_level);
            Ok(())
        } else {
            Err("Could not acquire logger handle lock".into())
        }
    } else {
        Err("Logger handle not initialised. Call init_logging first.".into())
    }
}

fn simple_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    write!(
        w,
        "{} [{}] {}",
        now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK),
        record.level(),
        record.args()
    )
}

fn json_format(
    w: &mut dyn std::io::Write,
    now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let entry = serde_json::json!({
        "timestamp": now.format(TS_DASHES_BLANK_COLONS_DOT_BLANK).to_string(),
        "level": record.level().to_string(),
        "target": record.target(),
        "message": record.args().to_string(),
    });
    write!(w, "{}", entry)
}
