//! Logger module for the Veld runtime
//!
//! Go-style simple logging: `[LEVEL] message`
//!
//! # Usage
//!
//! ```rust
//! use veld_runtime::util::logger;
//!
//! logger::init();
//! tracing::info!("Hello, {}", "world");
//! ```

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

static INIT: OnceCell<()> = OnceCell::new();

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

impl LogLevel {
    /// Parse a config string; unknown values fall back to `Info`.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "trace" => LogLevel::Trace,
            "debug" => LogLevel::Debug,
            "warn" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Initialize logger with default configuration (INFO level)
pub fn init() {
    init_with_level(LogLevel::Info);
}

/// Initialize logger with custom level (Go style: `[LEVEL] message`)
///
/// Repeated calls are no-ops, so tests may init freely.
pub fn init_with_level(level: LogLevel) {
    INIT.get_or_init(|| {
        let filter = tracing_subscriber::filter::LevelFilter::from_level(level.into());

        // [LEVEL] 前缀，不显示时间、不显示模块路径、无颜色
        let layer = tracing_subscriber::fmt::layer()
            .without_time()
            .with_target(false)
            .with_level(true)
            .with_ansi(false)
            .compact()
            .with_filter(filter);

        Registry::default().with(layer).init();
    });
}

/// Initialize logger for debug use (DEBUG level)
pub fn init_debug() {
    init_with_level(LogLevel::Debug);
}
