/// Severity of a relay log line.
///
/// Variants are ordered from most verbose to most severe, so a level can be
/// compared against a threshold (`level >= LogLevel::Warn`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Per-frame detail (raw inbound text, every outbound frame).
    Trace,
    /// Routing decisions that are useful while debugging a client.
    Debug,
    /// Connection lifecycle: accepted, registered, disconnected.
    Info,
    /// Dropped frames, unresolved targets, failed sends.
    Warn,
    /// Transport failures that end a connection or stop the server.
    Error,
}

impl LogLevel {
    /// Fixed-width label used in log files and on stderr.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warn => "WARN ",
            Self::Error => "ERROR",
        }
    }
}
