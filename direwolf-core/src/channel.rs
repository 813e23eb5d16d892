//! The logical radio channel data model (§3 "Channel").
//!
//! A `Channel` owns the modem parameters for one audio channel: which
//! demodulator family to run, its timing, and which of the three
//! mutually-exclusive multiplicity options (profile letters, slicers,
//! frequency offsets) is active.

use crate::demod::Profile;
use crate::errors::ConfigError;

/// Demodulator family selection (§6 `modem_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemFamily {
    Afsk,
    Baseband,
    Scrambled,
    Off,
}

/// Which of the three multiplicity options a channel uses. Exactly one
/// may be active per §3's invariant (or none, i.e. a single plain
/// demodulator).
#[derive(Debug, Clone, PartialEq)]
pub enum Multiplicity {
    Single,
    Profiles(Vec<Profile>),
    Slicers(usize),
    Frequencies { count: usize, offset_hz: f64 },
}

/// A logical radio channel: modem family, tone pair, timing, and
/// multiplicity option (§3).
#[derive(Debug, Clone)]
pub struct Channel {
    pub index: usize,
    pub modem: ModemFamily,
    pub baud: usize,
    pub mark_freq_hz: f64,
    pub space_freq_hz: f64,
    pub sample_rate: usize,
    pub decimate: usize,
    pub multiplicity: Multiplicity,
}

impl Channel {
    /// Construct a channel, validating the invariants from §3:
    /// exactly one multiplicity option active, decimated sample rate
    /// >= 4x baud, mark != space (AFSK only).
    pub fn new(
        index: usize,
        modem: ModemFamily,
        baud: usize,
        mark_freq_hz: f64,
        space_freq_hz: f64,
        sample_rate: usize,
        decimate: usize,
        multiplicity: Multiplicity,
    ) -> Result<Self, ConfigError> {
        let decimated_rate = sample_rate / decimate.max(1);
        if decimated_rate < 4 * baud {
            return Err(ConfigError::SampleRateTooLow {
                channel: index,
                rate: decimated_rate,
                baud,
            });
        }
        if modem == ModemFamily::Afsk && (mark_freq_hz - space_freq_hz).abs() < f64::EPSILON {
            return Err(ConfigError::MarkEqualsSpace {
                channel: index,
                freq: mark_freq_hz,
            });
        }
        if let Multiplicity::Profiles(profiles) = &multiplicity {
            if profiles.len() > 1 {
                return Err(ConfigError::UnsupportedInterleave {
                    channel: index,
                    factor: profiles.len(),
                });
            }
        }

        Ok(Self {
            index,
            modem,
            baud,
            mark_freq_hz,
            space_freq_hz,
            sample_rate,
            decimate,
            multiplicity,
        })
    }

    /// Sample rate after decimation, the rate the demodulator and PLL
    /// actually operate at.
    pub fn decimated_sample_rate(&self) -> usize {
        self.sample_rate / self.decimate.max(1)
    }

    /// Number of parallel slicers this channel's multiplicity implies
    /// (1 unless the "+" multi-slicer option is active).
    pub fn num_slicers(&self) -> usize {
        match &self.multiplicity {
            Multiplicity::Slicers(n) => (*n).max(1),
            _ => 1,
        }
    }

    pub fn profile(&self) -> Profile {
        match &self.multiplicity {
            Multiplicity::Profiles(profiles) => {
                profiles.first().copied().unwrap_or(Profile::default_for_baud(self.baud))
            }
            _ => Profile::default_for_baud(self.baud),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_channel(multiplicity: Multiplicity) -> Result<Channel, ConfigError> {
        Channel::new(
            0,
            ModemFamily::Afsk,
            1200,
            1200.0,
            2200.0,
            44_100,
            1,
            multiplicity,
        )
    }

    #[test]
    fn rejects_sample_rate_below_four_times_baud() {
        let result = Channel::new(
            0,
            ModemFamily::Afsk,
            9600,
            1200.0,
            2200.0,
            9600 * 3,
            1,
            Multiplicity::Single,
        );
        assert!(matches!(result, Err(ConfigError::SampleRateTooLow { .. })));
    }

    #[test]
    fn rejects_mark_equal_to_space_for_afsk() {
        let result = Channel::new(
            0,
            ModemFamily::Afsk,
            1200,
            1200.0,
            1200.0,
            44_100,
            1,
            Multiplicity::Single,
        );
        assert!(matches!(result, Err(ConfigError::MarkEqualsSpace { .. })));
    }

    #[test]
    fn rejects_interleaved_multi_letter_profiles() {
        let result = base_channel(Multiplicity::Profiles(vec![
            crate::demod::Profile::E,
            crate::demod::Profile::E,
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::UnsupportedInterleave { .. })
        ));
    }

    #[test]
    fn accepts_single_profile_and_reports_one_slicer() {
        let channel = base_channel(Multiplicity::Single).unwrap();
        assert_eq!(channel.num_slicers(), 1);
    }

    #[test]
    fn multi_slicer_reports_configured_count() {
        let channel = base_channel(Multiplicity::Slicers(5)).unwrap();
        assert_eq!(channel.num_slicers(), 5);
    }
}
