//! Pluggable query logging.
//!
//! The pipeline reports request/response milestones through a capability
//! trait rather than a fixed backend: any conforming implementation can be
//! substituted, the default is a no-op, and nothing in the core depends on a
//! log call for correctness.

use std::sync::Arc;

/// Log verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Everything, including per-chunk noise.
    Trace,
    /// Request/response lifecycle events.
    Debug,
    /// Notable events only.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
    /// Suppress all log callbacks.
    Off,
}

impl LogLevel {
    /// Environment variable consulted by [`LogLevel::from_env`].
    pub const ENV_VAR: &'static str = "COLSTORE_LOG";

    /// Read the level from `COLSTORE_LOG`.
    ///
    /// Unset or unrecognized values fall back to `Info`; `OFF` suppresses
    /// all callbacks.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var(Self::ENV_VAR) {
            Ok(value) => Self::parse(&value).unwrap_or(Self::Info),
            Err(_) => Self::Info,
        }
    }

    /// Parse a level name, case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "off" => Some(Self::Off),
            _ => None,
        }
    }
}

/// One structured log event from the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct LogEntry<'a> {
    /// Component that produced the entry.
    pub module: &'a str,
    /// Human-readable event description.
    pub message: &'a str,
    /// Endpoint the request targets.
    pub endpoint: Option<&'a str>,
    /// Request method and target.
    pub target: Option<&'a str>,
    /// Response status, for after-response entries.
    pub status: Option<u16>,
}

impl<'a> LogEntry<'a> {
    /// Create an entry with only module and message set.
    #[must_use]
    pub fn new(module: &'a str, message: &'a str) -> Self {
        Self {
            module,
            message,
            endpoint: None,
            target: None,
            status: None,
        }
    }
}

/// Capability trait for receiving pipeline log events.
///
/// Implementations must be cheap and must not block: calls happen on the
/// request path. They carry no control-flow meaning: the pipeline behaves
/// identically with the no-op sink.
pub trait QueryLog: Send + Sync {
    /// Trace-level event.
    fn trace(&self, entry: &LogEntry<'_>);
    /// Debug-level event.
    fn debug(&self, entry: &LogEntry<'_>);
    /// Info-level event.
    fn info(&self, entry: &LogEntry<'_>);
    /// Warn-level event.
    fn warn(&self, entry: &LogEntry<'_>);
    /// Error-level event.
    fn error(&self, entry: &LogEntry<'_>);
}

/// The default sink: discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopQueryLog;

impl QueryLog for NopQueryLog {
    fn trace(&self, _entry: &LogEntry<'_>) {}
    fn debug(&self, _entry: &LogEntry<'_>) {}
    fn info(&self, _entry: &LogEntry<'_>) {}
    fn warn(&self, _entry: &LogEntry<'_>) {}
    fn error(&self, _entry: &LogEntry<'_>) {}
}

/// Sink forwarding to the `tracing` ecosystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingQueryLog;

impl QueryLog for TracingQueryLog {
    fn trace(&self, e: &LogEntry<'_>) {
        tracing::trace!(module = e.module, endpoint = e.endpoint, target = e.target, status = e.status, "{}", e.message);
    }

    fn debug(&self, e: &LogEntry<'_>) {
        tracing::debug!(module = e.module, endpoint = e.endpoint, target = e.target, status = e.status, "{}", e.message);
    }

    fn info(&self, e: &LogEntry<'_>) {
        tracing::info!(module = e.module, endpoint = e.endpoint, target = e.target, status = e.status, "{}", e.message);
    }

    fn warn(&self, e: &LogEntry<'_>) {
        tracing::warn!(module = e.module, endpoint = e.endpoint, target = e.target, status = e.status, "{}", e.message);
    }

    fn error(&self, e: &LogEntry<'_>) {
        tracing::error!(module = e.module, endpoint = e.endpoint, target = e.target, status = e.status, "{}", e.message);
    }
}

/// Level-filtered handle the pipeline logs through.
#[derive(Clone)]
pub(crate) struct Log {
    level: LogLevel,
    sink: Arc<dyn QueryLog>,
}

impl Log {
    pub(crate) fn new(level: LogLevel, sink: Arc<dyn QueryLog>) -> Self {
        Self { level, sink }
    }

    fn enabled(&self, level: LogLevel) -> bool {
        self.level != LogLevel::Off && level >= self.level
    }

    pub(crate) fn debug(&self, entry: &LogEntry<'_>) {
        if self.enabled(LogLevel::Debug) {
            self.sink.debug(entry);
        }
    }

    pub(crate) fn error(&self, entry: &LogEntry<'_>) {
        if self.enabled(LogLevel::Error) {
            self.sink.error(entry);
        }
    }
}

impl std::fmt::Debug for Log {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Log").field("level", &self.level).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl QueryLog for Recorder {
        fn trace(&self, e: &LogEntry<'_>) {
            self.events.lock().unwrap().push(format!("trace:{}", e.message));
        }
        fn debug(&self, e: &LogEntry<'_>) {
            self.events.lock().unwrap().push(format!("debug:{}", e.message));
        }
        fn info(&self, e: &LogEntry<'_>) {
            self.events.lock().unwrap().push(format!("info:{}", e.message));
        }
        fn warn(&self, e: &LogEntry<'_>) {
            self.events.lock().unwrap().push(format!("warn:{}", e.message));
        }
        fn error(&self, e: &LogEntry<'_>) {
            self.events.lock().unwrap().push(format!("error:{}", e.message));
        }
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_off_suppresses_everything() {
        let recorder = Arc::new(Recorder::default());
        let log = Log::new(LogLevel::Off, recorder.clone());
        log.debug(&LogEntry::new("test", "hidden"));
        log.error(&LogEntry::new("test", "hidden"));
        assert!(recorder.events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_level_threshold() {
        let recorder = Arc::new(Recorder::default());
        let log = Log::new(LogLevel::Error, recorder.clone());
        log.debug(&LogEntry::new("test", "below threshold"));
        log.error(&LogEntry::new("test", "surfaced"));
        assert_eq!(
            recorder.events.lock().unwrap().as_slice(),
            ["error:surfaced"]
        );
    }
}
