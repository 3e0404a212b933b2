//! Stderr logger for feedback runs.
//!
//! Each record is one line, `  elapsed_s LEVEL module: message`, where
//! `elapsed_s` counts seconds since installation and `module` is the last
//! path segment of the record target (`feedback`, `measure`, ...).

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

/// Environment variable consulted by [`init_from_env`] and [`init_tracing`].
pub const LOG_ENV: &str = "SLM_FEEDBACK_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = format_line(
            self.started.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

fn format_line(elapsed: f64, level: Level, target: &str, args: &fmt::Arguments<'_>) -> String {
    let module = target.rsplit("::").next().unwrap_or(target);
    format!("{elapsed:>9.3}s {level:<5} {module}: {args}")
}

fn level_from_env(value: Option<&str>) -> LevelFilter {
    value
        .and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

/// Install the stderr logger with the provided level filter.
///
/// Only the first call installs a logger; later calls keep the original level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install the stderr logger with the level named by `SLM_FEEDBACK_LOG`
/// (`error`, `warn`, `info`, `debug`, `trace`, `off`), defaulting to `info`.
pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    let value = std::env::var(LOG_ENV).ok();
    init_with_level(level_from_env(value.as_deref()))
}

/// Install a `tracing` subscriber instead of the stderr logger.
///
/// Directives come from `SLM_FEEDBACK_LOG`, then `RUST_LOG`, then `info`.
/// Spans are reported when they close, which times each transform and
/// measurement.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt;

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
