//! Unified logging infrastructure for the Dire Wolf core.
//!
//! Dependency-free by design so `direwolf-core` stays usable standalone
//! (no tracing/log backend forced on downstream crates); `direwolf-cli`
//! layers its own structured event logger on top for user-facing
//! telemetry.

use std::fmt;

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Logging configuration: a minimum level plus per-subsystem toggles
/// matching the core's actual stages: demod/clock recovery, HDLC
/// framing and retry, PTT/DTMF.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to record.
    pub level: LogLevel,

    /// AFSK/baseband demodulation and AGC (subsystems `AFSK`,
    /// `BASEBAND`, `AGC`, `SCRAMBLER`).
    pub enable_demod: bool,
    /// PLL bit-clock recovery (subsystems `PLL`, `TIMING`).
    pub enable_timing: bool,
    /// HDLC framing, CRC, and the bit-flip retry engine (subsystems
    /// `HDLC`, `AX25`, `RETRY`).
    pub enable_framing: bool,
    /// PTT sequencing and the DTMF codec (subsystems `PTT`, `DTMF`).
    pub enable_control: bool,

    /// Maximum number of log entries to keep (for memory management).
    pub max_entries: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            enable_demod: true,
            enable_timing: true,
            enable_framing: true,
            enable_control: true,
            max_entries: 1000,
        }
    }
}

impl LogConfig {
    /// Verbose logging for debugging.
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            enable_demod: true,
            enable_timing: true,
            enable_framing: true,
            enable_control: true,
            max_entries: 5000,
        }
    }

    /// Quiet logging for production.
    pub fn quiet() -> Self {
        Self {
            level: LogLevel::Warn,
            enable_demod: false,
            enable_timing: false,
            enable_framing: false,
            enable_control: false,
            max_entries: 100,
        }
    }

    /// Disable all logging.
    pub fn disabled() -> Self {
        Self {
            level: LogLevel::Error,
            enable_demod: false,
            enable_timing: false,
            enable_framing: false,
            enable_control: false,
            max_entries: 0,
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub subsystem: &'static str,
    pub message: String,
}

/// Logger that collects structured log entries, in-process (no I/O
/// backend): the CLI crate drains or forwards these as it sees fit.
#[derive(Debug, Clone)]
pub struct SignalLogger {
    config: LogConfig,
    entries: Vec<LogEntry>,
}

impl SignalLogger {
    pub fn new(config: LogConfig) -> Self {
        let capacity = config.max_entries.min(1000);
        Self {
            config,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Log a message at the specified level.
    pub fn log(&mut self, level: LogLevel, subsystem: &'static str, message: impl fmt::Display) {
        if level < self.config.level {
            return;
        }

        let enabled = match subsystem {
            "PLL" | "TIMING" => self.config.enable_timing,
            "AFSK" | "BASEBAND" | "AGC" | "SCRAMBLER" => self.config.enable_demod,
            "HDLC" | "AX25" | "RETRY" => self.config.enable_framing,
            "PTT" | "DTMF" => self.config.enable_control,
            _ => true, // Unknown subsystems always log
        };

        if !enabled {
            return;
        }

        let entry = LogEntry {
            level,
            subsystem,
            message: message.to_string(),
        };

        if self.config.max_entries > 0 {
            if self.entries.len() >= self.config.max_entries {
                self.entries.remove(0);
            }
            self.entries.push(entry);
        }

        #[cfg(any(test, debug_assertions))]
        {
            eprintln!("[{}] {}: {}", level, subsystem, message);
        }
    }

    /// Convenience methods for each log level.
    pub fn trace(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Trace, subsystem, message);
    }

    pub fn debug(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Debug, subsystem, message);
    }

    pub fn info(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Info, subsystem, message);
    }

    pub fn warn(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Warn, subsystem, message);
    }

    pub fn error(&mut self, subsystem: &'static str, message: impl fmt::Display) {
        self.log(LogLevel::Error, subsystem, message);
    }

    /// Get all log entries.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Get entries for a specific subsystem.
    pub fn entries_for_subsystem(&self, subsystem: &str) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .filter(|e| e.subsystem == subsystem)
            .collect()
    }

    /// Get entries at or above a specific level.
    pub fn entries_at_level(&self, level: LogLevel) -> Vec<&LogEntry> {
        self.entries.iter().filter(|e| e.level >= level).collect()
    }

    /// Clear all entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Get count of entries at each level: (trace, debug, info, warn, error).
    pub fn level_counts(&self) -> (usize, usize, usize, usize, usize) {
        let mut counts = (0, 0, 0, 0, 0);
        for entry in &self.entries {
            match entry.level {
                LogLevel::Trace => counts.0 += 1,
                LogLevel::Debug => counts.1 += 1,
                LogLevel::Info => counts.2 += 1,
                LogLevel::Warn => counts.3 += 1,
                LogLevel::Error => counts.4 += 1,
            }
        }
        counts
    }
}

impl Default for SignalLogger {
    fn default() -> Self {
        Self::new(LogConfig::default())
    }
}

impl fmt::Display for SignalLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .entries
            .iter()
            .map(|e| format!("[{}] {}: {}", e.level, e.subsystem, e.message))
            .collect::<Vec<_>>()
            .join("\n");
        write!(f, "{rendered}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_filtering_by_level() {
        let config = LogConfig {
            level: LogLevel::Info,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.trace("HDLC", "trace message");
        logger.debug("HDLC", "debug message");
        logger.info("HDLC", "info message");
        logger.warn("HDLC", "warn message");

        assert_eq!(logger.entries().len(), 2); // info and warn only
    }

    #[test]
    fn subsystem_filtering() {
        let config = LogConfig {
            level: LogLevel::Debug,
            enable_timing: false,
            enable_demod: true,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("PLL", "pll message");
        logger.info("AFSK", "afsk message");

        assert_eq!(logger.entries().len(), 1); // AFSK only
        assert_eq!(logger.entries()[0].subsystem, "AFSK");
    }

    #[test]
    fn max_entries_limit() {
        let config = LogConfig {
            level: LogLevel::Debug,
            max_entries: 3,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);

        logger.info("RETRY", "message 1");
        logger.info("RETRY", "message 2");
        logger.info("RETRY", "message 3");
        logger.info("RETRY", "message 4");

        assert_eq!(logger.entries().len(), 3);
        assert!(logger.entries()[0].message.contains("message 2"));
    }

    #[test]
    fn control_subsystem_toggle_gates_ptt_and_dtmf() {
        let config = LogConfig {
            level: LogLevel::Debug,
            enable_control: false,
            ..Default::default()
        };
        let mut logger = SignalLogger::new(config);
        logger.warn("PTT", "assert failed");
        logger.info("DTMF", "decoded digit");
        assert!(logger.entries().is_empty());
    }
}
