use std::sync::mpsc;

use crate::log::{
    log_level::LogLevel,
    log_msg::{LogMsg, now_millis},
    log_sink::LogSink,
};

/// Cloneable producer side of the process [`Logger`](crate::log::logger::Logger).
///
/// Each connection thread gets its own clone (as `Arc<dyn LogSink>`).
/// Enqueueing never blocks: when the bounded queue is full the line is dropped,
/// so a burst of relay traffic cannot stall routing on disk I/O.
#[derive(Clone)]
pub struct LoggerHandle {
    pub(super) tx: mpsc::SyncSender<LogMsg>,
}

impl LogSink for LoggerHandle {
    #[inline]
    fn log(&self, level: LogLevel, msg: &str, target: &'static str) {
        let _ = self.try_log(level, msg, target);
    }
}

impl LoggerHandle {
    /// Attempts to enqueue a log line without blocking.
    ///
    /// # Errors
    /// - `TrySendError::Full` when the queue is at capacity (line dropped).
    /// - `TrySendError::Disconnected` when the logger thread is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), mpsc::TrySendError<LogMsg>> {
        self.tx
            .try_send(LogMsg::new(level, text, target, now_millis()))
    }
}
