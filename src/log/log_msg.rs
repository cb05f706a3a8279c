use std::time::{SystemTime, UNIX_EPOCH};

use crate::log::log_level::LogLevel;

/// A single log event on its way to a sink or the logger thread.
#[derive(Debug, Clone)]
pub struct LogMsg {
    pub level: LogLevel,
    /// Milliseconds since the Unix epoch.
    pub ts_ms: u128,
    pub text: String,
    /// Module path of the call site.
    pub target: &'static str,
}

impl LogMsg {
    pub fn new(
        level: LogLevel,
        text: impl Into<String>,
        target: &'static str,
        ts_ms: u128,
    ) -> Self {
        Self {
            level,
            ts_ms,
            text: text.into(),
            target,
        }
    }

    /// Renders the line the way it lands in the log file.
    ///
    /// ```rust,ignore
    /// // [INFO ] 1700000000000 | rustyrelay::signaling::router | client a registered
    /// ```
    #[must_use]
    pub fn render(&self) -> String {
        format!(
            "[{}] {} | {} | {}",
            self.level.label(),
            self.ts_ms,
            self.target,
            self.text
        )
    }
}

/// Wall-clock milliseconds; 0 if the clock is before the epoch.
#[must_use]
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}
