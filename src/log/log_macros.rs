//! Leveled logging macros over a [`LogSink`](crate::log::log_sink::LogSink).
//!
//! # Feature Flags
//! Specific log levels are controlled by cargo features:
//! `log-trace`, `log-debug`, `log-info`, `log-warn`, `log-error`.
//!
//! If a feature is disabled, the corresponding macro expands to a dead branch:
//! the arguments are still type-checked but nothing is formatted at runtime.

#[macro_export]
macro_rules! sink_log {
    ($sink:expr, $lvl:expr, $($arg:tt)*) => {{
        let __msg = format!($($arg)*);
        $sink.log($lvl, &__msg, module_path!());
    }};
}

// ---------------------- TRACE ----------------------
#[cfg(feature = "log-trace")]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Trace, $($arg)*)
    };
}
#[cfg(not(feature = "log-trace"))]
#[macro_export]
macro_rules! sink_trace {
    ($sink:expr, $($arg:tt)*) => {
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Trace, $($arg)*)
        }
    };
}

// ---------------------- DEBUG ----------------------
#[cfg(feature = "log-debug")]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Debug, $($arg)*)
    };
}
#[cfg(not(feature = "log-debug"))]
#[macro_export]
macro_rules! sink_debug {
    ($sink:expr, $($arg:tt)*) => {
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Debug, $($arg)*)
        }
    };
}

// ---------------------- INFO ----------------------
#[cfg(feature = "log-info")]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Info, $($arg)*)
    };
}
#[cfg(not(feature = "log-info"))]
#[macro_export]
macro_rules! sink_info {
    ($sink:expr, $($arg:tt)*) => {
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Info, $($arg)*)
        }
    };
}

// ---------------------- WARN ----------------------
#[cfg(feature = "log-warn")]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Warn, $($arg)*)
    };
}
#[cfg(not(feature = "log-warn"))]
#[macro_export]
macro_rules! sink_warn {
    ($sink:expr, $($arg:tt)*) => {
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Warn, $($arg)*)
        }
    };
}

// ---------------------- ERROR ----------------------
#[cfg(feature = "log-error")]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Error, $($arg)*)
    };
}
#[cfg(not(feature = "log-error"))]
#[macro_export]
macro_rules! sink_error {
    ($sink:expr, $($arg:tt)*) => {
        if false {
            $crate::sink_log!($sink, $crate::log::log_level::LogLevel::Error, $($arg)*)
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::log::{MemoryLogSink, log_level::LogLevel, log_sink::LogSink};

    #[test]
    fn enabled_levels_reach_the_sink_with_module_target() {
        let mem = Arc::new(MemoryLogSink::new());
        let sink: Arc<dyn LogSink> = mem.clone();

        crate::sink_info!(sink, "client {} registered as {}", "a", "viewer");
        crate::sink_warn!(sink, "target {} not found", "ghost");

        assert!(mem.contains(LogLevel::Info, "client a registered as viewer"));
        assert!(mem.contains(LogLevel::Warn, "target ghost not found"));
        assert!(
            mem.lines()
                .iter()
                .all(|m| m.target == "rustyrelay::log::log_macros::tests")
        );
    }

    #[cfg(not(feature = "log-trace"))]
    #[test]
    fn disabled_levels_are_compiled_out() {
        let mem = Arc::new(MemoryLogSink::new());
        let sink: Arc<dyn LogSink> = mem.clone();

        crate::sink_trace!(sink, "raw frame {}", "{}");
        assert!(mem.lines().is_empty());
    }
}
