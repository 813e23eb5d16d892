//! Bit-flip retry engine (§4.6): when a captured frame fails its FCS,
//! search a bounded set of candidate bit inversions and re-check CRC
//! (plus an optional sanity filter) on each one, keeping the first
//! success at the lowest effort level.
//!
//! Operates purely on the flat, already-destuffed bit vector produced
//! by [`crate::hdlc::BitFramer`] (one bit per wire bit of the frame
//! body, FCS included) — candidates are built by flipping bits in that
//! vector, repacking to octets, and re-running [`crate::crc::verify`].

use rayon::prelude::*;

use crate::ax25::Ax25Frame;
use crate::demod::baseband::Descrambler;
use crate::hdlc::pack_lsb_first;
use crate::rrbb::RawBitBlock;

/// How hard to work at recovering a frame that failed FCS, in
/// increasing order of search cost (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FixBits {
    /// Accept only frames whose FCS is already correct.
    None,
    /// Try every single-bit inversion.
    InvertSingle,
    /// Try every pair of bit inversions (O(N^2)).
    InvertDouble,
    /// Try every triple of bit inversions (O(N^3); expensive, used
    /// sparingly).
    InvertTriple,
    /// Try every pair of bit inversions separated by at least half the
    /// frame length, on the theory that a single burst error is
    /// unlikely to hit both ends at once.
    InvertTwoSep,
}

impl Default for FixBits {
    fn default() -> Self {
        FixBits::None
    }
}

/// Post-CRC plausibility filter applied to a recovered candidate before
/// it's accepted, per §4.6's sanity-check table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SanityTest {
    /// No additional filtering beyond the FCS match.
    None,
    /// Address field structure must parse and every callsign character
    /// must be alphanumeric or space.
    Ax25,
    /// AX.25 structure plus APRS conventions: UI frame (control
    /// 0x03), PID 0xF0, and an information field that is either
    /// printable ASCII or a MIC-E-style high-bit-set first byte.
    Apras,
}

impl Default for SanityTest {
    fn default() -> Self {
        SanityTest::None
    }
}

/// A frame recovered by the retry engine, alongside the effort level
/// that found it (for logging/reporting, §4.10's `FrameRetried` event).
#[derive(Debug, Clone)]
pub struct RecoveredFrame {
    pub octets: Vec<u8>,
    pub effort: FixBits,
    /// Bit positions (0-based, within the candidate bit vector) that
    /// were flipped to produce this candidate. Empty when `effort` is
    /// `FixBits::None`.
    pub flipped_bits: Vec<usize>,
}

/// Attempt to recover a frame from a raw bit block whose FCS did not
/// check out on the first pass, trying every effort level up to and
/// including `max_effort` and returning the first (lowest-effort)
/// success.
///
/// Per §4.6, bit 0 (the first bit of the captured block) is eligible
/// for flipping like any other — no special-casing of frame boundaries.
pub fn recover(
    block: &RawBitBlock,
    max_effort: FixBits,
    sanity: SanityTest,
) -> Option<RecoveredFrame> {
    if let Some(frame) = try_candidate(block, &[], sanity) {
        return Some(RecoveredFrame {
            octets: frame,
            effort: FixBits::None,
            flipped_bits: Vec::new(),
        });
    }
    if max_effort == FixBits::None {
        return None;
    }

    let n = candidate_len(block);
    if n == 0 {
        return None;
    }

    if let Some((octets, flips)) = search_single(block, sanity) {
        return Some(RecoveredFrame {
            octets,
            effort: FixBits::InvertSingle,
            flipped_bits: flips,
        });
    }
    if max_effort < FixBits::InvertDouble {
        return None;
    }

    if let Some((octets, flips)) = search_double(block, sanity) {
        return Some(RecoveredFrame {
            octets,
            effort: FixBits::InvertDouble,
            flipped_bits: flips,
        });
    }
    if max_effort < FixBits::InvertTriple && max_effort != FixBits::InvertTwoSep {
        return None;
    }

    if max_effort == FixBits::InvertTwoSep {
        if let Some((octets, flips)) = search_two_sep(block, sanity) {
            return Some(RecoveredFrame {
                octets,
                effort: FixBits::InvertTwoSep,
                flipped_bits: flips,
            });
        }
        return None;
    }

    search_triple(block, sanity).map(|(octets, flips)| RecoveredFrame {
        octets,
        effort: FixBits::InvertTriple,
        flipped_bits: flips,
    })
}

/// Number of flippable positions for `block`: the scrambled channel-bit
/// count when scrambled info is present (candidates are built and
/// flipped there), otherwise the plain descrambled bit count.
fn candidate_len(block: &RawBitBlock) -> usize {
    match &block.scrambled_bits {
        Some(scrambled) if block.scrambler_state_at_start.is_some() => scrambled.len(),
        _ => block.bits.len(),
    }
}

/// Build one candidate bit vector with `positions` flipped, in whichever
/// domain recovery must operate in. For scrambled channels (both
/// `scrambled_bits` and `scrambler_state_at_start` present) this flips
/// the *channel* bits and re-descrambles from the restored LFSR state,
/// since a single flipped channel bit changes three positions of the
/// already-descrambled output (the two LFSR taps plus the bit itself) —
/// flipping `bits` directly would not be searching for a single
/// channel-bit error at all (§4.6). Non-scrambled blocks flip `bits`
/// directly, as there is no distinction between the two domains.
fn candidate_bits(block: &RawBitBlock, positions: &[usize]) -> Option<Vec<u8>> {
    match (&block.scrambled_bits, block.scrambler_state_at_start) {
        (Some(scrambled), Some(state)) => {
            if positions.iter().any(|&p| p >= scrambled.len()) {
                return None;
            }
            let mut flipped = scrambled.clone();
            for &p in positions {
                flipped[p] ^= 1;
            }
            let mut descrambler = Descrambler::new();
            descrambler.restore(state);
            Some(
                flipped
                    .into_iter()
                    .map(|b| descrambler.descramble_bit(b))
                    .collect(),
            )
        }
        _ => {
            if positions.iter().any(|&p| p >= block.bits.len()) {
                return None;
            }
            let mut flipped = block.bits.clone();
            for &p in positions {
                flipped[p] ^= 1;
            }
            Some(flipped)
        }
    }
}

/// Flip the bits at `positions`, repack, and check CRC plus the
/// requested sanity test. Returns the decoded octets on success.
fn try_candidate(block: &RawBitBlock, positions: &[usize], sanity: SanityTest) -> Option<Vec<u8>> {
    let bits = candidate_bits(block, positions)?;
    if bits.len() % 8 != 0 {
        return None;
    }
    let octets = pack_lsb_first(&bits);
    if !crate::crc::verify(&octets) {
        return None;
    }
    if passes_sanity(&octets, sanity) {
        Some(octets)
    } else {
        None
    }
}

fn passes_sanity(octets: &[u8], sanity: SanityTest) -> bool {
    match sanity {
        SanityTest::None => true,
        SanityTest::Ax25 => ax25_sane(octets),
        SanityTest::Apras => ax25_sane(octets) && aprs_sane(octets),
    }
}

fn ax25_sane(octets: &[u8]) -> bool {
    let Some(frame) = Ax25Frame::parse(octets) else {
        return false;
    };
    frame.addresses.iter().all(|addr| {
        addr.callsign
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == ' ')
    })
}

/// §4.6's APRS info-byte allowlist: printable ASCII, CR/LF, the MIC-E
/// control-character range, and the handful of specific high-bit
/// bytes MIC-E/Base91 payloads use. Every info byte must be in this
/// set — a single high-bit byte does not waive the check for the rest
/// of the payload.
fn is_aprs_info_byte(b: u8) -> bool {
    matches!(
        b,
        0x20..=0x7e | 0x0a | 0x0d | 0x1c..=0x1f | 0x7f | 0x80 | 0x9f | 0xb0 | 0xbe | 0xc2 | 0xf8
    )
}

fn aprs_sane(octets: &[u8]) -> bool {
    let Some(frame) = Ax25Frame::parse(octets) else {
        return false;
    };
    if frame.control != 0x03 || frame.pid != 0xF0 {
        return false;
    }
    if frame.info.is_empty() {
        return false;
    }
    frame.info.iter().all(|&b| is_aprs_info_byte(b))
}

fn search_single(block: &RawBitBlock, sanity: SanityTest) -> Option<(Vec<u8>, Vec<usize>)> {
    let n = candidate_len(block);
    (0..n)
        .into_par_iter()
        .find_map_first(|i| try_candidate(block, &[i], sanity).map(|o| (o, vec![i])))
}

fn search_double(block: &RawBitBlock, sanity: SanityTest) -> Option<(Vec<u8>, Vec<usize>)> {
    let n = candidate_len(block);
    (0..n).into_par_iter().find_map_first(|i| {
        (i + 1..n).find_map(|j| try_candidate(block, &[i, j], sanity).map(|o| (o, vec![i, j])))
    })
}

fn search_triple(block: &RawBitBlock, sanity: SanityTest) -> Option<(Vec<u8>, Vec<usize>)> {
    let n = candidate_len(block);
    (0..n).into_par_iter().find_map_first(|i| {
        (i + 1..n).find_map(|j| {
            (j + 1..n)
                .find_map(|k| try_candidate(block, &[i, j, k], sanity).map(|o| (o, vec![i, j, k])))
        })
    })
}

/// Pairs separated by at least half the frame's bit length: a coarser,
/// cheaper alternative to the full `O(n^2)` double search aimed at two
/// independent single-bit burst errors far apart in the frame.
fn search_two_sep(block: &RawBitBlock, sanity: SanityTest) -> Option<(Vec<u8>, Vec<usize>)> {
    let n = candidate_len(block);
    let min_sep = n / 2;
    (0..n).into_par_iter().find_map_first(|i| {
        (i + min_sep..n).find_map(|j| try_candidate(block, &[i, j], sanity).map(|o| (o, vec![i, j])))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ax25::{Address, Ax25Frame};
    use crate::hdlc::unpack_lsb_first;
    use crate::rrbb::{RawBitBlock, StreamId};

    fn sample_frame_bits() -> Vec<u8> {
        let frame = Ax25Frame {
            addresses: vec![
                Address {
                    callsign: "APDW15".to_string(),
                    ssid: 0,
                    is_last: false,
                    command_bit: false,
                },
                Address {
                    callsign: "WB2OSZ".to_string(),
                    ssid: 9,
                    is_last: true,
                    command_bit: true,
                },
            ],
            control: 0x03,
            pid: 0xF0,
            info: b">retry test".to_vec(),
        };
        unpack_lsb_first(&frame.to_wire())
    }

    fn block_with_bits(bits: Vec<u8>) -> RawBitBlock {
        let mut block = RawBitBlock::new(
            StreamId {
                channel: 0,
                subchannel: 0,
                slicer: 0,
            },
            80.0,
        );
        block.bits = bits;
        block
    }

    #[test]
    fn clean_frame_recovers_at_effort_none() {
        let block = block_with_bits(sample_frame_bits());
        let recovered = recover(&block, FixBits::InvertDouble, SanityTest::None).unwrap();
        assert_eq!(recovered.effort, FixBits::None);
        assert!(recovered.flipped_bits.is_empty());
    }

    #[test]
    fn single_bit_error_recovers_with_invert_single() {
        let mut bits = sample_frame_bits();
        bits[10] ^= 1;
        let block = block_with_bits(bits);
        let recovered = recover(&block, FixBits::InvertSingle, SanityTest::None).unwrap();
        assert_eq!(recovered.effort, FixBits::InvertSingle);
        assert_eq!(recovered.flipped_bits.len(), 1);
    }

    #[test]
    fn single_bit_error_not_recovered_at_effort_none() {
        let mut bits = sample_frame_bits();
        bits[10] ^= 1;
        let block = block_with_bits(bits);
        assert!(recover(&block, FixBits::None, SanityTest::None).is_none());
    }

    #[test]
    fn two_bit_error_recovers_with_invert_double() {
        let mut bits = sample_frame_bits();
        bits[3] ^= 1;
        bits[40] ^= 1;
        let block = block_with_bits(bits);
        let recovered = recover(&block, FixBits::InvertDouble, SanityTest::None).unwrap();
        assert!(recovered.effort <= FixBits::InvertDouble);
        assert_eq!(recovered.flipped_bits.len().min(2), recovered.flipped_bits.len());
    }

    #[test]
    fn scrambled_single_channel_bit_error_recovers_via_redescrambling() {
        // A single flipped *channel* bit fans out to three positions in
        // the descrambled output (the LFSR's two taps plus the bit
        // itself), so a correct retry must flip the channel bit and
        // re-descramble, not flip one descrambled bit directly.
        use crate::demod::baseband::Scrambler;

        let clean_bits = sample_frame_bits();
        let start_state = 0x1ABCDu32 & ((1 << 17) - 1);

        let mut scrambler = Scrambler::new();
        scrambler.restore(start_state);
        let scrambled: Vec<u8> = clean_bits
            .iter()
            .map(|&b| scrambler.scramble_bit(b))
            .collect();

        let flip_at = 10;
        let mut corrupted_scrambled = scrambled.clone();
        corrupted_scrambled[flip_at] ^= 1;

        let mut descrambler = Descrambler::new();
        descrambler.restore(start_state);
        let observed_bits: Vec<u8> = corrupted_scrambled
            .iter()
            .map(|&b| descrambler.descramble_bit(b))
            .collect();
        // The single channel-bit error must have corrupted more than one
        // descrambled bit position, or this test isn't exercising the
        // scenario it claims to.
        assert_ne!(observed_bits, clean_bits);

        let mut block = block_with_bits(observed_bits);
        block.scrambled_bits = Some(corrupted_scrambled);
        block.scrambler_state_at_start = Some(start_state);

        let recovered = recover(&block, FixBits::InvertSingle, SanityTest::None).unwrap();
        assert_eq!(recovered.effort, FixBits::InvertSingle);
        assert_eq!(recovered.flipped_bits, vec![flip_at]);
        assert_eq!(recovered.octets, pack_lsb_first(&clean_bits));
    }

    #[test]
    fn sanity_filter_rejects_non_ax25_garbage_that_passes_crc() {
        // A random byte string that happens to carry a valid FCS but
        // whose address field is not well-formed AX.25 should be
        // rejected once an Ax25 sanity test is requested.
        let garbage_body = vec![0xffu8; 20];
        let framed = crate::crc::append_fcs(&garbage_body);
        let block = block_with_bits(unpack_lsb_first(&framed));
        assert!(recover(&block, FixBits::None, SanityTest::Ax25).is_none());
    }

    #[test]
    fn effort_ordering_is_monotonic() {
        assert!(FixBits::None < FixBits::InvertSingle);
        assert!(FixBits::InvertSingle < FixBits::InvertDouble);
        assert!(FixBits::InvertDouble < FixBits::InvertTriple);
        assert!(FixBits::InvertTriple < FixBits::InvertTwoSep);
    }

    fn aprs_frame_with_info(info: &[u8]) -> Vec<u8> {
        let frame = Ax25Frame {
            addresses: vec![
                Address {
                    callsign: "APDW15".to_string(),
                    ssid: 0,
                    is_last: false,
                    command_bit: false,
                },
                Address {
                    callsign: "WB2OSZ".to_string(),
                    ssid: 9,
                    is_last: true,
                    command_bit: true,
                },
            ],
            control: 0x03,
            pid: 0xF0,
            info: info.to_vec(),
        };
        frame.to_wire()
    }

    #[test]
    fn aprs_sanity_allows_newline_in_info_field() {
        // §4.6's allowed set names 0x0A explicitly; a payload carrying
        // it must not be rejected.
        let wire = aprs_frame_with_info(b"line one\nline two");
        assert!(aprs_sane(&wire));
    }

    #[test]
    fn aprs_sanity_rejects_garbage_even_with_high_bit_first_byte() {
        // A high-bit first byte must not waive the per-byte check for
        // the rest of the payload (every byte here is outside the
        // allowed set apart from the first).
        let wire = aprs_frame_with_info(&[0x80, 0x01, 0x02, 0x03]);
        assert!(!aprs_sane(&wire));
    }

    #[test]
    fn aprs_sanity_accepts_mic_e_style_payload() {
        let wire = aprs_frame_with_info(&[0x1c, b'a', b'b', 0xb0, 0xc2]);
        assert!(aprs_sane(&wire));
    }
}
