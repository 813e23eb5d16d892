//! Configuration types for the Dire Wolf core (§4.12, §6).
//!
//! Plain `serde`-derived structs with `Default` impls providing the
//! documented defaults.

use serde::{Deserialize, Serialize};

use crate::demod::Profile;
use crate::retry::{FixBits, SanityTest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModemTypeConfig {
    Afsk,
    Baseband,
    Scrambled,
    Off,
}

impl Default for ModemTypeConfig {
    fn default() -> Self {
        ModemTypeConfig::Afsk
    }
}

/// Modem timing/tuning settings independent of channel plumbing (§6
/// `modem_type`/`baud`/`mark_freq`/`space_freq`/`profiles`/
/// `num_freq`/`offset`/`decimate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModemConfig {
    pub modem_type: ModemTypeConfig,
    pub baud: usize,
    pub mark_freq_hz: f64,
    pub space_freq_hz: f64,
    /// Profile letters, e.g. `["E"]`; more than one implies interleaving
    /// (§9 Open Question — unsupported, rejected at construction).
    pub profiles: Vec<char>,
    pub num_freq: usize,
    pub offset_hz: f64,
    pub decimate: usize,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            modem_type: ModemTypeConfig::Afsk,
            baud: 1200,
            mark_freq_hz: 1200.0,
            space_freq_hz: 2200.0,
            profiles: vec!['E'],
            num_freq: 1,
            offset_hz: 0.0,
            decimate: 1,
        }
    }
}

impl ModemConfig {
    pub fn profile(&self) -> Result<Profile, crate::errors::ConfigError> {
        let letter = self.profiles.first().copied().unwrap_or('E');
        match letter {
            'A' => Ok(Profile::A),
            'B' => Ok(Profile::B),
            'C' => Ok(Profile::C),
            'D' => Ok(Profile::D),
            'E' => Ok(Profile::E),
            'F' => Ok(Profile::F),
            'G' => Ok(Profile::G),
            other => Err(crate::errors::ConfigError::InvalidProfileLetter {
                channel: 0,
                letter: other,
            }),
        }
    }
}

/// Bit-flip retry effort and sanity filter (§4.6, §6 `fix_bits`/
/// `sanity_test`/`passall`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    pub fix_bits: RetryEffortConfig,
    pub sanity_test: SanityTestConfig,
    /// Emit frames even with a bad CRC after all retries are exhausted.
    pub passall: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetryEffortConfig {
    None,
    Single,
    Double,
    Triple,
    TwoSep,
}

impl From<RetryEffortConfig> for FixBits {
    fn from(value: RetryEffortConfig) -> Self {
        match value {
            RetryEffortConfig::None => FixBits::None,
            RetryEffortConfig::Single => FixBits::InvertSingle,
            RetryEffortConfig::Double => FixBits::InvertDouble,
            RetryEffortConfig::Triple => FixBits::InvertTriple,
            RetryEffortConfig::TwoSep => FixBits::InvertTwoSep,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SanityTestConfig {
    None,
    Ax25,
    Aprs,
}

impl From<SanityTestConfig> for SanityTest {
    fn from(value: SanityTestConfig) -> Self {
        match value {
            SanityTestConfig::None => SanityTest::None,
            SanityTestConfig::Ax25 => SanityTest::Ax25,
            SanityTestConfig::Aprs => SanityTest::Apras,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            fix_bits: RetryEffortConfig::None,
            sanity_test: SanityTestConfig::None,
            passall: false,
        }
    }
}

/// CSMA/timing settings (§6 `slottime`/`persist`/`txdelay`/`txtail`),
/// in 10-ms units except `persist`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingConfig {
    pub slottime: u32,
    pub persist: u8,
    pub txdelay: u32,
    pub txtail: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            slottime: 10,
            persist: 63,
            txdelay: 30,
            txtail: 10,
        }
    }
}

/// PTT back-end selection and per-channel wiring (§4.8, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PttConfig {
    pub method: PttMethod,
    pub device: Option<String>,
    pub line: Option<String>,
    pub gpio_number: Option<u32>,
    pub lpt_bit: Option<u8>,
    pub invert: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PttMethod {
    None,
    Serial,
    Gpio,
    Lpt,
    Hamlib,
    Cm108,
}

impl Default for PttConfig {
    fn default() -> Self {
        Self {
            method: PttMethod::None,
            device: None,
            line: None,
            gpio_number: None,
            lpt_bit: None,
            invert: false,
        }
    }
}

/// Full per-channel configuration: the union of everything §6's table
/// lists as per-channel.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub modem: ModemConfig,
    pub retry: RetryConfig,
    pub timing: TimingConfig,
    pub ptt: PttConfig,
}
