//! Raw Receive Bit Block (§3): the captured run of demod bits between
//! two HDLC flags, handed from the framer to the retry engine when the
//! FCS check fails.

/// Identifies which (channel, subchannel, slicer) produced a captured
/// bit block, for reporting and for routing a recovered frame back to
/// its origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamId {
    pub channel: usize,
    pub subchannel: usize,
    pub slicer: usize,
}

/// A captured bit sequence awaiting FCS/retry processing.
///
/// Destroyed after one decode attempt cycle (consumed by value by
/// [`crate::retry::recover`]).
#[derive(Debug, Clone)]
pub struct RawBitBlock {
    pub stream: StreamId,
    /// Captured audio level (0 = silence, 100 = nominal peak), for
    /// reporting alongside a successfully decoded frame.
    pub audio_level: f32,
    /// Demodulated bits, LSB-first per octet, between the opening and
    /// closing flags (flags themselves excluded).
    pub bits: Vec<u8>,
    /// Scrambler LFSR state captured the instant before the first data
    /// bit, so the retry engine can restart descrambling from the same
    /// point for every candidate. `None` for non-scrambled modems.
    pub scrambler_state_at_start: Option<u32>,
    /// The pre-descramble channel bits underlying `bits`, same length
    /// and alignment, present only for scrambled modems. A single
    /// flipped channel bit changes three positions of the descrambled
    /// output (the LFSR's two taps plus the bit itself), so the retry
    /// engine must flip candidates here and re-descramble from
    /// `scrambler_state_at_start`, not flip `bits` directly (§4.6).
    pub scrambled_bits: Option<Vec<u8>>,
}

impl RawBitBlock {
    pub fn new(stream: StreamId, audio_level: f32) -> Self {
        Self {
            stream,
            audio_level,
            bits: Vec::new(),
            scrambler_state_at_start: None,
            scrambled_bits: None,
        }
    }

    pub fn push_bit(&mut self, bit: u8) {
        self.bits.push(bit & 1);
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}
