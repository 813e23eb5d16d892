//! Concurrency wiring (§5/§5.1): one demod-pipeline task per channel,
//! one retry-engine worker per channel, a shared frame sink, and a
//! transmit sequencer driving PTT timing. Stages communicate over
//! `crossbeam_channel::bounded` queues of owned values, matching §5's
//! "cross-thread communication is by bounded queues of owned values."

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;

use crossbeam::channel::{bounded, Receiver, Sender};
use rand::Rng;

use crate::ax25;
use crate::channel::{Channel, ModemFamily};
use crate::crc;
use crate::demod::afsk::AfskDemod;
use crate::demod::baseband::{BasebandDemod, Descrambler};
use crate::hdlc::{self, BitFramer, FramerEvent};
use crate::pll::Pll;
use crate::ptt::PttController;
use crate::retry::{self, FixBits, SanityTest};
use crate::rrbb::{RawBitBlock, StreamId};

/// A frame the pipeline is confident in (good FCS) or has recovered via
/// the retry engine, ready for the frame sink (§5).
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub stream: StreamId,
    pub octets: Vec<u8>,
    pub audio_level: f32,
    pub retry_effort: FixBits,
}

/// A frame whose FCS failed on the first pass, queued for the retry
/// worker. Carries the original (uncorrected) octets too, so a
/// `passall` channel can still emit something if retry exhausts its
/// budget without success.
#[derive(Debug, Clone)]
struct PendingRetry {
    block: RawBitBlock,
    original_octets: Vec<u8>,
}

enum DemodState {
    Afsk(AfskDemod),
    Baseband(BasebandDemod),
    Off,
}

struct SlicerState {
    pll: Pll,
    framer: BitFramer,
    descrambler: Option<Descrambler>,
    scrambler_state_at_frame_start: Option<u32>,
}

/// Owns one channel's demod state, PLL(s), and framer(s) end to end —
/// "the demod-pipeline task per channel... entirely single-threaded
/// within its channel" (§5). Retry is deliberately NOT inline here: a
/// bad-FCS frame is handed off as a [`PendingRetry`] so the (possibly
/// expensive) bit-flip search never blocks this channel's sample loop.
struct ChannelPipeline {
    channel_index: usize,
    demod: DemodState,
    slicers: Vec<SlicerState>,
}

enum FrameOutcome {
    Good(DecodedFrame),
    NeedsRetry(PendingRetry),
}

impl ChannelPipeline {
    fn new(channel: &Channel) -> Self {
        let num_slicers = channel.num_slicers();
        let sample_rate = channel.decimated_sample_rate();
        let demod = match channel.modem {
            ModemFamily::Afsk => DemodState::Afsk(AfskDemod::new(
                channel.mark_freq_hz,
                channel.space_freq_hz,
                sample_rate,
                channel.baud,
                channel.profile(),
                num_slicers,
            )),
            ModemFamily::Baseband | ModemFamily::Scrambled => {
                DemodState::Baseband(BasebandDemod::new(sample_rate, channel.baud, num_slicers))
            }
            ModemFamily::Off => DemodState::Off,
        };
        let scrambled = channel.modem == ModemFamily::Scrambled;
        let slicers = (0..num_slicers)
            .map(|_| SlicerState {
                pll: Pll::new(channel.baud, sample_rate),
                framer: BitFramer::new(),
                descrambler: if scrambled {
                    Some(Descrambler::new())
                } else {
                    None
                },
                scrambler_state_at_frame_start: None,
            })
            .collect();
        Self {
            channel_index: channel.index,
            demod,
            slicers,
        }
    }

    /// Feed one (already decimated) sample through demod -> PLL ->
    /// framer for every slicer, returning any frames completed this
    /// sample (almost always none, occasionally one per slicer).
    fn process_sample(&mut self, sample: i16) -> Vec<FrameOutcome> {
        let mut outcomes = Vec::new();
        // Both arms produce one bit sequence per slicer, in time order;
        // AFSK yields one bit per slicer per sample, baseband yields two
        // (the zero-stuffed upsample-by-2) that must be transposed out
        // of its per-half-sample-then-per-slicer layout.
        let (per_slicer_bits, audio_level): (Vec<Vec<u8>>, f32) = match &mut self.demod {
            DemodState::Afsk(d) => {
                let (bits, level) = d.process_sample(sample);
                (bits.into_iter().map(|b| vec![b]).collect(), level)
            }
            DemodState::Baseband(d) => {
                let (half_sample_bits, level) = d.process_sample(sample);
                let mut per_slicer = vec![Vec::with_capacity(2); self.slicers.len()];
                for half in half_sample_bits {
                    for (slicer_idx, bit) in half.into_iter().enumerate() {
                        per_slicer[slicer_idx].push(bit);
                    }
                }
                (per_slicer, level)
            }
            DemodState::Off => return outcomes,
        };

        for (slicer_idx, demod_bits) in per_slicer_bits.into_iter().enumerate() {
            for demod_bit in demod_bits {
                let slicer = &mut self.slicers[slicer_idx];
                let in_frame = slicer.framer.in_frame();
                let Some(sampled) = slicer.pll.advance(demod_bit, in_frame) else {
                    continue;
                };
                let bit = match &mut slicer.descrambler {
                    Some(descrambler) => descrambler.descramble_bit(sampled),
                    None => sampled,
                };
                let was_in_frame = slicer.framer.in_frame();
                let event = slicer.framer.push_bit_with_shadow(bit, sampled);
                if !was_in_frame && slicer.framer.in_frame() {
                    slicer.scrambler_state_at_frame_start =
                        slicer.descrambler.as_ref().map(Descrambler::state);
                }
                if let FramerEvent::FrameComplete(octets) = event {
                    let stream = StreamId {
                        channel: self.channel_index,
                        subchannel: 0,
                        slicer: slicer_idx,
                    };
                    let scrambled_bits = if slicer.descrambler.is_some() {
                        Some(slicer.framer.take_last_shadow_bits())
                    } else {
                        None
                    };
                    outcomes.push(self.finish_frame(
                        stream,
                        octets,
                        audio_level,
                        slicer_idx,
                        scrambled_bits,
                    ));
                }
            }
        }
        outcomes
    }

    fn finish_frame(
        &self,
        stream: StreamId,
        octets: Vec<u8>,
        audio_level: f32,
        slicer_idx: usize,
        scrambled_bits: Option<Vec<u8>>,
    ) -> FrameOutcome {
        if crc::verify(&octets) {
            return FrameOutcome::Good(DecodedFrame {
                stream,
                octets,
                audio_level,
                retry_effort: FixBits::None,
            });
        }
        let block = RawBitBlock {
            stream,
            audio_level,
            bits: hdlc::unpack_lsb_first(&octets),
            scrambler_state_at_start: self.slicers[slicer_idx].scrambler_state_at_frame_start,
            scrambled_bits,
        };
        FrameOutcome::NeedsRetry(PendingRetry {
            block,
            original_octets: octets,
        })
    }
}

/// Run one channel's demod-pipeline task to completion (until
/// `samples` closes). `retry_tx` is bounded: a burst of bad-FCS frames
/// applies backpressure here rather than unbounded buffering, matching
/// §5.1's "shared-resource policy."
pub fn run_demod_pipeline(
    channel: Channel,
    samples: Receiver<i16>,
    good_frames: Sender<DecodedFrame>,
    retry_queue: Sender<PendingRetryHandle>,
) {
    let mut pipeline = ChannelPipeline::new(&channel);
    for sample in samples {
        for outcome in pipeline.process_sample(sample) {
            match outcome {
                FrameOutcome::Good(frame) => {
                    let _ = good_frames.send(frame);
                }
                FrameOutcome::NeedsRetry(pending) => {
                    let _ = retry_queue.send(PendingRetryHandle(pending));
                }
            }
        }
    }
}

/// Opaque handle so [`PendingRetry`] (which intentionally has no public
/// fields — retry internals are this module's business, not a caller's)
/// can still cross the public `run_demod_pipeline`/`run_retry_worker`
/// boundary.
pub struct PendingRetryHandle(PendingRetry);

/// Run one channel's retry-engine worker to completion (§5: "one
/// worker for the retry engine per channel, fed by completed RRBBs").
pub fn run_retry_worker(
    pending: Receiver<PendingRetryHandle>,
    good_frames: Sender<DecodedFrame>,
    fix_bits: FixBits,
    sanity: SanityTest,
    passall: bool,
) {
    for PendingRetryHandle(item) in pending {
        let stream = item.block.stream;
        let audio_level = item.block.audio_level;
        match retry::recover(&item.block, fix_bits, sanity) {
            Some(recovered) => {
                let _ = good_frames.send(DecodedFrame {
                    stream,
                    octets: recovered.octets,
                    audio_level,
                    retry_effort: recovered.effort,
                });
            }
            None if passall => {
                let _ = good_frames.send(DecodedFrame {
                    stream,
                    octets: item.original_octets,
                    audio_level,
                    retry_effort: FixBits::None,
                });
            }
            None => {}
        }
    }
}

/// Spawn the demod-pipeline and retry-worker threads for one channel,
/// wired together with bounded queues. Returns their join handles so
/// the caller can wait for clean shutdown once `samples` closes.
pub fn spawn_channel(
    channel: Channel,
    samples: Receiver<i16>,
    good_frames: Sender<DecodedFrame>,
    fix_bits: FixBits,
    sanity: SanityTest,
    passall: bool,
    queue_depth: usize,
) -> [JoinHandle<()>; 2] {
    let (retry_tx, retry_rx) = bounded::<PendingRetryHandle>(queue_depth.max(1));
    let demod_frames = good_frames.clone();
    let demod_handle = std::thread::Builder::new()
        .name(format!("direwolf-demod-{}", channel.index))
        .spawn(move || run_demod_pipeline(channel, samples, demod_frames, retry_tx))
        .expect("failed to spawn demod-pipeline thread");
    let retry_handle = std::thread::Builder::new()
        .name("direwolf-retry".to_string())
        .spawn(move || run_retry_worker(retry_rx, good_frames, fix_bits, sanity, passall))
        .expect("failed to spawn retry-worker thread");
    [demod_handle, retry_handle]
}

/// CSMA/p-persistence transmit gate (§5/§6): draw a random byte once
/// per `slottime`; transmit once it's `<= persist`.
pub fn persistence_test(persist: u8, rng: &mut impl Rng) -> bool {
    rng.gen::<u8>() <= persist
}

/// Drives one channel's transmit sequence: PTT-on, TX-delay, hand the
/// stuffed bit-stream to the caller-supplied modulator hook, TX-tail,
/// PTT-off. Modulating bits to an audio waveform is the host-DSP/audio-
/// output boundary this crate doesn't cross (audio-out modulation has
/// no collaborating component in this system) — `emit` is given
/// the already flag-delimited, bit-stuffed stream and is responsible
/// for turning it into audio.
pub struct TransmitSequencer {
    ptt: PttController,
    txdelay_ms: u64,
    txtail_ms: u64,
}

impl TransmitSequencer {
    pub fn new(ptt: PttController, txdelay_10ms: u32, txtail_10ms: u32) -> Self {
        Self {
            ptt,
            txdelay_ms: u64::from(txdelay_10ms) * 10,
            txtail_ms: u64::from(txtail_10ms) * 10,
        }
    }

    /// Transmit `frame_octets` (control/PID/info/FCS, addresses already
    /// included), blocking for the configured delay/tail. `emit` is
    /// called once with the flag-delimited, stuffed bit-stream once
    /// TX-delay has elapsed.
    pub fn transmit(
        &mut self,
        frame_octets: &[u8],
        sleep: impl Fn(std::time::Duration),
        emit: impl FnOnce(&[u8]),
    ) -> Result<(), crate::errors::IoError> {
        self.ptt.assert()?;
        sleep(std::time::Duration::from_millis(self.txdelay_ms));

        let body_bits = hdlc::unpack_lsb_first(frame_octets);
        let stuffed = hdlc::stuff(&body_bits);
        emit(&stuffed);

        sleep(std::time::Duration::from_millis(self.txtail_ms));
        self.ptt.release()?;
        Ok(())
    }
}

/// A frame-sink thread: receives decoded frames from every channel's
/// pipeline and hands them to `handler`, deduplicating by content
/// within a short window (§5: "the sink deduplicates by content within
/// a short time window (~100 ms)"). `now_ms` supplies a monotonic
/// millisecond clock so the sink stays independent of any real-time
/// source (tests can drive it with a fake clock).
pub fn run_frame_sink(
    frames: Receiver<DecodedFrame>,
    mut now_ms: impl FnMut() -> u64,
    mut handler: impl FnMut(DecodedFrame),
) {
    const DEDUP_WINDOW_MS: u64 = 100;
    let mut recent: Vec<(u64, Vec<u8>)> = Vec::new();

    for frame in frames {
        let now = now_ms();
        recent.retain(|(seen_at, _)| now.saturating_sub(*seen_at) <= DEDUP_WINDOW_MS);
        if recent.iter().any(|(_, octets)| *octets == frame.octets) {
            continue;
        }
        recent.push((now, frame.octets.clone()));
        handler(frame);
    }
}

/// Parses a decoded frame's address/control/PID layout, for sinks that
/// want structured AX.25 access rather than raw octets.
pub fn parse_decoded(frame: &DecodedFrame) -> Option<ax25::Ax25Frame> {
    ax25::Ax25Frame::parse(&frame.octets)
}

/// A channel the caller can signal "stop" on by dropping the sender —
/// a thin alias documenting intent at call sites that build the
/// per-channel sample queues.
pub type SampleQueue = (Sender<i16>, Receiver<i16>);

pub fn sample_queue(depth: usize) -> SampleQueue {
    bounded(depth.max(1))
}

/// A one-shot shutdown signal: dropping the paired `std::sync::mpsc`
/// sender unblocks a thread parked on `recv`, used to coordinate
/// draining the queues before deasserting PTT (§5: "Shutdown drains
/// all queues and deasserts PTT before exit").
pub fn shutdown_signal() -> (std_mpsc::Sender<()>, std_mpsc::Receiver<()>) {
    std_mpsc::channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Multiplicity;

    fn test_channel() -> Channel {
        Channel::new(
            0,
            ModemFamily::Afsk,
            1200,
            1200.0,
            2200.0,
            44_100,
            1,
            Multiplicity::Single,
        )
        .unwrap()
    }

    #[test]
    fn demod_pipeline_passes_silence_without_panicking() {
        let channel = test_channel();
        let (sample_tx, sample_rx) = sample_queue(1024);
        let (good_tx, good_rx) = bounded::<DecodedFrame>(16);
        let (retry_tx, _retry_rx) = bounded::<PendingRetryHandle>(16);

        let channel_clone = channel.clone();
        let handle = std::thread::spawn(move || {
            run_demod_pipeline(channel_clone, sample_rx, good_tx, retry_tx);
        });

        for _ in 0..1000 {
            sample_tx.send(0).unwrap();
        }
        drop(sample_tx);
        handle.join().unwrap();
        assert!(good_rx.try_recv().is_err());
    }

    #[test]
    fn persistence_test_is_monotonic_in_persist_value() {
        struct FixedRng(u8);
        impl rand::RngCore for FixedRng {
            fn next_u32(&mut self) -> u32 {
                self.0 as u32
            }
            fn next_u64(&mut self) -> u64 {
                self.0 as u64
            }
            fn fill_bytes(&mut self, dest: &mut [u8]) {
                dest.fill(self.0);
            }
            fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
                self.fill_bytes(dest);
                Ok(())
            }
        }
        let mut low = FixedRng(200);
        let mut high = FixedRng(200);
        assert!(!persistence_test(100, &mut low));
        assert!(persistence_test(255, &mut high));
    }

    #[test]
    fn frame_sink_drops_duplicate_content_within_window() {
        let (frame_tx, frame_rx) = bounded::<DecodedFrame>(8);
        let stream = StreamId {
            channel: 0,
            subchannel: 0,
            slicer: 0,
        };
        let frame = DecodedFrame {
            stream,
            octets: vec![1, 2, 3],
            audio_level: 50.0,
            retry_effort: FixBits::None,
        };
        frame_tx.send(frame.clone()).unwrap();
        let mut dup = frame;
        dup.stream.slicer = 1; // different slicer, identical content
        frame_tx.send(dup).unwrap();
        drop(frame_tx);

        let mut received = Vec::new();
        let mut clock = 0u64;
        run_frame_sink(
            frame_rx,
            || {
                clock += 1;
                clock
            },
            |f| received.push(f),
        );
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn transmit_sequencer_asserts_then_releases_ptt() {
        let mut registry = crate::ptt::DeviceRegistry::new();
        let ptt_config = crate::config::PttConfig::default();
        let ptt = PttController::new(&ptt_config, &mut registry);
        let mut sequencer = TransmitSequencer::new(ptt, 0, 0);

        let mut emitted = None;
        sequencer
            .transmit(&[0xAB, 0xCD], |_| {}, |bits| emitted = Some(bits.to_vec()))
            .unwrap();
        assert!(emitted.is_some());
    }
}
