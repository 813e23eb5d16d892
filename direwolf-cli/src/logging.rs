//! Structured logging for decoded frames and session telemetry.

use crate::config::{LogFormat, LogTarget, LoggingConfig};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Structured log event types emitted by the CLI while a session runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    /// A frame was decoded and passed its FCS (or was recovered by the
    /// retry engine and passed its sanity test).
    FrameDecoded {
        timestamp: DateTime<Utc>,
        channel: usize,
        subchannel: usize,
        slicer: usize,
        audio_level: f32,
        retry_category: String,
        sanity: String,
    },

    /// The retry engine was invoked on a frame with a bad FCS.
    FrameRetried {
        timestamp: DateTime<Utc>,
        attempts_tried: usize,
        category: String,
    },

    /// The audio source could not keep up with the sample pump.
    Underrun { timestamp: DateTime<Utc>, device: String },

    /// A PTT transition failed or timed out.
    PttFault { timestamp: DateTime<Utc>, reason: String },

    /// Aggregate statistics for the elapsed session.
    Statistics(StatisticsEvent),

    /// General info message.
    Info { message: String },

    /// Warning message.
    Warn { message: String },

    /// Error message.
    Error {
        message: String,
        details: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEvent {
    pub timestamp: DateTime<Utc>,
    pub duration_secs: f64,
    pub total_frames: usize,
    pub total_retried: usize,
    pub total_dropped: usize,
    pub audio_level: StatSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSummary {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub samples: usize,
}

/// Logger that outputs structured logs in one of several formats.
pub struct StructuredLogger {
    config: LoggingConfig,
    writer: Box<dyn Write + Send>,
    start_time: DateTime<Utc>,
}

impl StructuredLogger {
    pub fn new(config: LoggingConfig) -> Result<Self> {
        let writer: Box<dyn Write + Send> = match &config.target {
            LogTarget::Stdout => Box::new(io::stdout()),
            LogTarget::Stderr => Box::new(io::stderr()),
            LogTarget::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or_else(|| color_eyre::eyre::eyre!("File path required for file logging"))?;
                Box::new(BufWriter::new(File::create(path)?))
            }
        };

        Ok(Self {
            config,
            writer,
            start_time: Utc::now(),
        })
    }

    pub fn log(&mut self, event: LogEvent) -> Result<()> {
        let output = match self.config.format {
            LogFormat::Json => self.format_json(&event)?,
            LogFormat::Logfmt => self.format_logfmt(&event)?,
            LogFormat::Pretty => self.format_pretty(&event)?,
        };

        writeln!(self.writer, "{}", output)?;
        self.writer.flush()?;

        Ok(())
    }

    fn format_json(&self, event: &LogEvent) -> Result<String> {
        Ok(serde_json::to_string(event)?)
    }

    fn format_logfmt(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().to_rfc3339();

        let msg = match event {
            LogEvent::FrameDecoded {
                channel,
                subchannel,
                slicer,
                audio_level,
                retry_category,
                sanity,
                ..
            } => format!(
                "ts=\"{}\" type=frame_decoded chan={} subchan={} slicer={} level={:.3} retry={} sanity={}",
                ts, channel, subchannel, slicer, audio_level, retry_category, sanity
            ),
            LogEvent::FrameRetried {
                attempts_tried,
                category,
                ..
            } => format!(
                "ts=\"{}\" type=frame_retried attempts={} category={}",
                ts, attempts_tried, category
            ),
            LogEvent::Underrun { device, .. } => {
                format!("ts=\"{}\" type=underrun device=\"{}\"", ts, device)
            }
            LogEvent::PttFault { reason, .. } => {
                format!("ts=\"{}\" type=ptt_fault reason=\"{}\"", ts, reason)
            }
            LogEvent::Statistics(s) => format!(
                "ts=\"{}\" type=statistics duration_secs={:.2} total_frames={} retried={} dropped={} level_mean={:.3}",
                ts, s.duration_secs, s.total_frames, s.total_retried, s.total_dropped, s.audio_level.mean
            ),
            LogEvent::Info { message } => format!("ts=\"{}\" level=info msg=\"{}\"", ts, message),
            LogEvent::Warn { message } => format!("ts=\"{}\" level=warn msg=\"{}\"", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("ts=\"{}\" level=error msg=\"{}\" details=\"{}\"", ts, message, d)
                } else {
                    format!("ts=\"{}\" level=error msg=\"{}\"", ts, message)
                }
            }
        };

        Ok(msg)
    }

    fn format_pretty(&self, event: &LogEvent) -> Result<String> {
        let ts = Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");

        let msg = match event {
            LogEvent::FrameDecoded {
                channel,
                subchannel,
                slicer,
                audio_level,
                retry_category,
                sanity,
                ..
            } => format!(
                "[{}] FRAME chan={}/{} slicer={} level={:.3} retry={} sanity={}",
                ts, channel, subchannel, slicer, audio_level, retry_category, sanity
            ),
            LogEvent::FrameRetried {
                attempts_tried,
                category,
                ..
            } => format!(
                "[{}] RETRY attempts={} category={}",
                ts, attempts_tried, category
            ),
            LogEvent::Underrun { device, .. } => format!("[{}] UNDERRUN device={}", ts, device),
            LogEvent::PttFault { reason, .. } => format!("[{}] PTT FAULT: {}", ts, reason),
            LogEvent::Statistics(s) => format!(
                "[{}] STATISTICS ({:.2}s): frames={} retried={} dropped={} | audio level: μ={:.3} σ={:.3} [{:.3},{:.3}]",
                ts,
                s.duration_secs,
                s.total_frames,
                s.total_retried,
                s.total_dropped,
                s.audio_level.mean,
                s.audio_level.stddev,
                s.audio_level.min,
                s.audio_level.max
            ),
            LogEvent::Info { message } => format!("[{}] INFO: {}", ts, message),
            LogEvent::Warn { message } => format!("[{}] WARN: {}", ts, message),
            LogEvent::Error { message, details } => {
                if let Some(d) = details {
                    format!("[{}] ERROR: {} | {}", ts, message, d)
                } else {
                    format!("[{}] ERROR: {}", ts, message)
                }
            }
        };

        Ok(msg)
    }

    pub fn elapsed(&self) -> f64 {
        (Utc::now() - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}
