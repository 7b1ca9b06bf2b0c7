//! Logging collaborator for the crawl engine
//!
//! The crawler never writes to the console directly. Every message goes
//! through a [`CrawlLogger`], which by default forwards to `tracing`.

use chrono::Local;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Severity of a crawl log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Trace-level noise such as dropped links
    Insignificant,
    Normal,
    /// Phase transitions and other milestones
    Emphasis,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Insignificant => "INSIGNIFICANT",
            Self::Normal => "NORMAL",
            Self::Emphasis => "EMPHASIS",
            Self::Success => "SUCCESS",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Sink for crawl log messages
///
/// `prefix` replaces the implementation's default prefix when given.
/// Emission must not block; it is called from worker tasks between awaits.
pub trait CrawlLogger: Send + Sync {
    fn log(&self, severity: Severity, message: &str, prefix: Option<&str>);

    /// Awaitable form of [`log`](Self::log)
    ///
    /// Sinks that write to slow targets can override this; the default emits
    /// synchronously and resolves immediately.
    fn log_async<'a>(
        &'a self,
        severity: Severity,
        message: &'a str,
        prefix: Option<&'a str>,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move { self.log(severity, message, prefix) })
    }

    fn insignificant(&self, message: &str) {
        self.log(Severity::Insignificant, message, None);
    }

    fn normal(&self, message: &str) {
        self.log(Severity::Normal, message, None);
    }

    fn emphasis(&self, message: &str) {
        self.log(Severity::Emphasis, message, None);
    }

    fn success(&self, message: &str) {
        self.log(Severity::Success, message, None);
    }

    fn warning(&self, message: &str) {
        self.log(Severity::Warning, message, None);
    }

    fn error(&self, message: &str) {
        self.log(Severity::Error, message, None);
    }
}

/// What [`TracingLogger`] prepends when no prefix is supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrefixMode {
    /// `[dd/mm/YYYY HH:MM:SS.fff] `
    #[default]
    Timestamp,
    /// `[dd/mm/YYYY HH:MM:SS.fff] [SEVERITY] `
    TimestampAndSeverity,
}

/// Formats the current local time as a log prefix
pub fn timestamp_prefix() -> String {
    format!("[{}] ", Local::now().format("%d/%m/%Y %H:%M:%S%.3f"))
}

/// Default logger: forwards every entry to `tracing`
///
/// | Severity | tracing level |
/// |----------|---------------|
/// | Insignificant | debug |
/// | Normal, Emphasis, Success | info |
/// | Warning | warn |
/// | Error | error |
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger {
    mode: PrefixMode,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mode: PrefixMode) -> Self {
        Self { mode }
    }

    fn default_prefix(&self, severity: Severity) -> String {
        match self.mode {
            PrefixMode::Timestamp => timestamp_prefix(),
            PrefixMode::TimestampAndSeverity => {
                format!("{}[{}] ", timestamp_prefix(), severity.name())
            }
        }
    }
}

impl CrawlLogger for TracingLogger {
    fn log(&self, severity: Severity, message: &str, prefix: Option<&str>) {
        let line = match prefix {
            Some(prefix) => format!("{}{}", prefix, message),
            None => format!("{}{}", self.default_prefix(severity), message),
        };

        match severity {
            Severity::Insignificant => tracing::debug!(severity = %severity, "{}", line),
            Severity::Normal | Severity::Emphasis | Severity::Success => {
                tracing::info!(severity = %severity, "{}", line)
            }
            Severity::Warning => tracing::warn!(severity = %severity, "{}", line),
            Severity::Error => tracing::error!(severity = %severity, "{}", line),
        }
    }
}

/// A single captured log entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub severity: Severity,
    pub message: String,
}

/// Logger that keeps entries in memory
///
/// Prefixes are discarded so assertions can match on message text.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of entries at `severity` whose message contains `needle`
    pub fn count_matching(&self, severity: Severity, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.severity == severity && e.message.contains(needle))
            .count()
    }
}

impl CrawlLogger for RecordingLogger {
    fn log(&self, severity: Severity, message: &str, _prefix: Option<&str>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                severity,
                message: message.to_string(),
            });
    }
}
