//! Baseband / scrambled-baseband demodulator for 9600-baud G3RUH/K9NG
//! (§4.3), plus the self-synchronizing descrambler (§6 "Scrambler
//! (9600)").

use std::collections::VecDeque;

use super::{slicer_offsets, Agc};

/// A direct-form FIR low-pass filter, Hamming-windowed sinc design.
#[derive(Debug, Clone)]
struct FirFilter {
    coeffs: Vec<f32>,
    history: VecDeque<f32>,
}

impl FirFilter {
    /// `cutoff` is normalized frequency (cycles/sample, i.e. `hz /
    /// sample_rate`), matching §4.3's `baud * 0.59 / Fs`.
    fn windowed_lowpass(num_taps: usize, cutoff: f64) -> Self {
        let num_taps = num_taps.max(3);
        let m = (num_taps - 1) as f64;
        let mut coeffs = vec![0.0f64; num_taps];
        for (n, c) in coeffs.iter_mut().enumerate() {
            let x = n as f64 - m / 2.0;
            let sinc = if x.abs() < 1e-12 {
                2.0 * cutoff
            } else {
                (2.0 * std::f64::consts::PI * cutoff * x).sin() / (std::f64::consts::PI * x)
            };
            let window = 0.54 - 0.46 * (2.0 * std::f64::consts::PI * n as f64 / m).cos();
            *c = sinc * window;
        }
        let dc_gain: f64 = coeffs.iter().sum();
        if dc_gain.abs() > 1e-9 {
            for c in coeffs.iter_mut() {
                *c /= dc_gain;
            }
        }
        Self {
            coeffs: coeffs.into_iter().map(|c| c as f32).collect(),
            history: VecDeque::from(vec![0.0f32; num_taps]),
        }
    }

    fn filter(&mut self, sample: f32) -> f32 {
        self.history.push_back(sample);
        if self.history.len() > self.coeffs.len() {
            self.history.pop_front();
        }
        self.coeffs
            .iter()
            .zip(self.history.iter().rev())
            .map(|(c, s)| c * s)
            .sum()
    }
}

/// Number of FIR taps per §4.3's sizing formula.
fn fir_num_taps(sample_rate: usize, baud: usize) -> usize {
    let taps = 72.0 * 9600.0 / (44_100.0 * 2.0) * (sample_rate as f64 / baud as f64);
    (taps.round() as usize).max(3) | 1 // force odd length for a symmetric center tap
}

/// Zero-stuff-upsample-by-2 + Hamming low-pass + AGC + slice (§4.3,
/// steps 1-5). Descrambling (step 6) happens outside this type, at the
/// PLL's sampling instant — see [`Descrambler`].
#[derive(Debug, Clone)]
pub struct BasebandDemod {
    lpf: FirFilter,
    agc: Agc,
    offsets: Vec<f32>,
}

impl BasebandDemod {
    pub fn new(sample_rate: usize, baud: usize, num_slicers: usize) -> Self {
        let num_taps = fir_num_taps(sample_rate, baud);
        let cutoff = baud as f64 * 0.59 / sample_rate as f64;
        Self {
            lpf: FirFilter::windowed_lowpass(num_taps, cutoff),
            agc: Agc::new(),
            offsets: slicer_offsets(num_slicers),
        }
    }

    /// Process one (already decimated) sample and return the two
    /// upsampled-by-2 raw sliced bits per slicer, in order, plus the
    /// current audio level.
    pub fn process_sample(&mut self, sample: i16) -> (Vec<Vec<u8>>, f32) {
        let s = sample as f32 / 16_384.0;
        let first = self.lpf.filter(s);
        let second = self.lpf.filter(0.0); // the zero-stuffed half-sample

        let mut outputs = Vec::with_capacity(2);
        for value in [first, second] {
            let normalized = self.agc.normalize(value);
            let bits = self
                .offsets
                .iter()
                .map(|&offset| if normalized > offset { 1u8 } else { 0u8 })
                .collect();
            outputs.push(bits);
        }
        (outputs, self.agc.audio_level())
    }
}

/// Self-synchronizing G3RUH/K9NG descrambler, polynomial `x^17 + x^12
/// + 1` (§4.3/§6): `out = in ^ lfsr[16] ^ lfsr[11]`, then `lfsr =
/// (lfsr << 1) | in`, masked to 17 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Descrambler {
    lfsr: u32,
}

const LFSR_MASK: u32 = (1 << 17) - 1;

impl Descrambler {
    pub fn new() -> Self {
        Self { lfsr: 0 }
    }

    /// Snapshot the shift-register state so the retry engine can
    /// restart descrambling from the same point for every candidate.
    pub fn state(&self) -> u32 {
        self.lfsr
    }

    pub fn restore(&mut self, state: u32) {
        self.lfsr = state & LFSR_MASK;
    }

    pub fn descramble_bit(&mut self, in_bit: u8) -> u8 {
        let in_bit = in_bit & 1;
        let bit16 = (self.lfsr >> 16) & 1;
        let bit11 = (self.lfsr >> 11) & 1;
        let out = in_bit ^ (bit16 as u8) ^ (bit11 as u8);
        self.lfsr = ((self.lfsr << 1) | in_bit as u32) & LFSR_MASK;
        out
    }
}

/// The transmit-side self-synchronizing scrambler. Same polynomial and
/// tap positions as [`Descrambler`], but the bit shifted into the
/// register is the *output* bit, not the input one — that's what makes
/// the pair self-synchronizing: `descramble(scramble(bits, s), s) ==
/// bits` for any starting state `s`, because both sides' registers
/// evolve from the same sequence of transmitted bits. Feeding the
/// input bit into both registers (as a naive read of the XOR formula
/// suggests) is NOT an involution and diverges from the real bit
/// stream after a few dozen bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scrambler {
    lfsr: u32,
}

impl Scrambler {
    pub fn new() -> Self {
        Self { lfsr: 0 }
    }

    pub fn state(&self) -> u32 {
        self.lfsr
    }

    pub fn restore(&mut self, state: u32) {
        self.lfsr = state & LFSR_MASK;
    }

    pub fn scramble_bit(&mut self, in_bit: u8) -> u8 {
        let in_bit = in_bit & 1;
        let bit16 = (self.lfsr >> 16) & 1;
        let bit11 = (self.lfsr >> 11) & 1;
        let out = in_bit ^ (bit16 as u8) ^ (bit11 as u8);
        self.lfsr = ((self.lfsr << 1) | out as u32) & LFSR_MASK;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descramble_scramble_roundtrip() {
        // Long enough to run well past the ~24-26 bit point where
        // feeding the scrambler's *input* bit into its register
        // (rather than its *output* bit) would have diverged from the
        // descrambler — a 19-bit vector here would have hidden that
        // regression.
        let bits: Vec<u8> = (0..80).map(|i| ((i * 2654435761u32) >> 13) as u8 & 1).collect();

        let mut scrambler = Scrambler::new();
        let scrambled: Vec<u8> = bits.iter().map(|&b| scrambler.scramble_bit(b)).collect();

        let mut descrambler = Descrambler::new();
        let recovered: Vec<u8> = scrambled
            .iter()
            .map(|&b| descrambler.descramble_bit(b))
            .collect();

        assert_eq!(recovered, bits);
    }

    proptest::proptest! {
        #[test]
        fn scramble_descramble_roundtrip_prop(
            lfsr0 in 0u32..(1u32 << 17),
            bits in proptest::collection::vec(0u8..=1, 0..256),
        ) {
            let mut scrambler = Scrambler::new();
            scrambler.restore(lfsr0);
            let scrambled: Vec<u8> = bits.iter().map(|&b| scrambler.scramble_bit(b)).collect();

            let mut descrambler = Descrambler::new();
            descrambler.restore(lfsr0);
            let recovered: Vec<u8> = scrambled
                .iter()
                .map(|&b| descrambler.descramble_bit(b))
                .collect();

            proptest::prop_assert_eq!(recovered, bits);
        }
    }

    #[test]
    fn state_restore_reproduces_descrambled_output() {
        let mut d1 = Descrambler::new();
        let prefix = [1u8, 0, 1, 1, 0];
        for &b in &prefix {
            d1.descramble_bit(b);
        }
        let saved_state = d1.state();

        let tail = [1u8, 1, 0, 1];
        let out1: Vec<u8> = tail.iter().map(|&b| d1.descramble_bit(b)).collect();

        let mut d2 = Descrambler::new();
        d2.restore(saved_state);
        let out2: Vec<u8> = tail.iter().map(|&b| d2.descramble_bit(b)).collect();

        assert_eq!(out1, out2);
    }

    #[test]
    fn fir_tap_count_is_odd_and_positive() {
        assert_eq!(fir_num_taps(38_400, 9600) % 2, 1);
        assert!(fir_num_taps(38_400, 9600) > 0);
    }

    #[test]
    fn baseband_demod_doubles_sample_rate() {
        let mut demod = BasebandDemod::new(38_400, 9600, 1);
        let (outputs, _level) = demod.process_sample(8000);
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].len(), 1);
    }
}
