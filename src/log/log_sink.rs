use crate::log::log_level::LogLevel;

/// Destination for operational log lines.
///
/// Every long-lived relay component holds an `Arc<dyn LogSink>`; the `sink_*!`
/// macros call [`LogSink::log`] with the caller's module path as `target`.
pub trait LogSink: Send + Sync {
    fn log(&self, level: LogLevel, msg: &str, target: &'static str);
}
