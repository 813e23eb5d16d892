//! Dire Wolf error types with granular categories

use thiserror::Error;

/// Top-level error type for all Dire Wolf core operations
#[derive(Debug, Error)]
pub enum DireWolfError {
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("DTMF error: {0}")]
    Dtmf(#[from] DtmfError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Audio/PTT I/O errors. Recoverable: the caller retries or, for PTT,
/// degrades the output method to `None`. Never aborts the pipeline.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("short read from {source}: expected {expected} bytes, got {actual}")]
    ShortRead {
        source: String,
        expected: usize,
        actual: usize,
    },

    #[error("audio device {device} returned a negative/error read")]
    DeviceError { device: String },

    #[error("device inactivity timeout on {device} after {retries} retries")]
    InactivityTimeout { device: String, retries: u32 },

    #[error("failed to open PTT device {device}: {reason}")]
    PttOpenFailed { device: String, reason: String },

    #[error("failed to assert PTT on {device}: {reason}")]
    PttAssertFailed { device: String, reason: String },
}

/// Frame decode errors, surfaced by the HDLC framer and retry engine.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("FCS mismatch: expected {expected:#06x}, got {actual:#06x}")]
    BadCrc { expected: u16, actual: u16 },

    #[error("candidate passed CRC but failed sanity check at {level:?}")]
    SanityFailed { level: crate::retry::SanityTest },

    #[error("frame length {len} octets outside valid range {min}..={max}")]
    BadLength { len: usize, min: usize, max: usize },

    #[error("frame aborted: {reason}")]
    Aborted { reason: AbortReason },
}

/// Why the HDLC framer discarded an in-progress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Abort octet `0xFE` or 7 consecutive 1 bits seen.
    AbortFlag,
    /// Closing flag arrived but fewer than the minimum octet count had
    /// been accumulated.
    TooShort,
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::AbortFlag => write!(f, "abort flag or 7 consecutive ones"),
            AbortReason::TooShort => write!(f, "frame shorter than minimum packet length"),
        }
    }
}

/// DTMF text/tone-sequence decode errors.
#[derive(Debug, Error)]
pub enum DtmfError {
    #[error("invalid digit {digit:?} at position {position}")]
    InvalidDigit { digit: char, position: usize },

    #[error("column {column} out of range 1..=4 at position {position}")]
    ColumnOutOfRange { column: u8, position: usize },

    #[error("7 ones in a row while decoding multipress sequence at position {position}")]
    RunawayRepeat { position: usize },

    #[error("letter outside allowed Maidenhead range at position {position}")]
    GridRangeExceeded { position: usize },

    #[error("call10 payload must be exactly 10 digits, got {len}")]
    Call10BadLength { len: usize },

    #[error("checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { expected: u8, computed: u8 },

    #[error("no satellite grid entry for code {code:?}")]
    UnknownSatelliteGrid { code: String },
}

/// Startup configuration errors. Unlike the other categories these can
/// abort the process (§6 exit code 1); at runtime a contradictory
/// setting is clamped and logged instead of propagated.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "channel {channel} selects contradictory modem variants: profiles={profiles:?} multi_freq={multi_freq} multi_slicer={multi_slicer}"
    )]
    ContradictoryVariant {
        channel: usize,
        profiles: String,
        multi_freq: bool,
        multi_slicer: bool,
    },

    #[error("channel {channel}: decimated sample rate {rate} Hz below 4x baud ({baud})")]
    SampleRateTooLow {
        channel: usize,
        rate: usize,
        baud: usize,
    },

    #[error("channel {channel}: mark frequency equals space frequency ({freq} Hz)")]
    MarkEqualsSpace { channel: usize, freq: f64 },

    #[error("channel {channel}: interleave factor {factor} not yet supported (future work)")]
    UnsupportedInterleave { channel: usize, factor: usize },

    #[error("invalid profile letter {letter:?} for channel {channel}")]
    InvalidProfileLetter { channel: usize, letter: char },
}

/// Result type alias for Dire Wolf core operations
pub type Result<T> = std::result::Result<T, DireWolfError>;
