mod config;
mod frame_decoder;
mod logging;
mod telemetry;

use std::io::Read;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{eyre, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};

use config::{CliConfig, LogLevel as CliLogLevel};
use direwolf_core::audio::{AudioSource, DeviceFormat};
use direwolf_core::channel::{Channel, ModemFamily, Multiplicity};
use direwolf_core::config::{ChannelConfig, ModemTypeConfig};
use direwolf_core::pipeline;
use logging::{LogEvent, StatisticsEvent, StructuredLogger};
use telemetry::TelemetryAggregator;

const RETRY_QUEUE_DEPTH: usize = 256;
const GOOD_FRAME_QUEUE_DEPTH: usize = 256;

#[derive(Parser, Debug)]
#[command(author, version, about = "Software TNC for AFSK/9600-baud packet radio", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: String,

    /// Audio source: a WAV file path, "-" for stdin, or "udp:PORT".
    #[arg(short, long)]
    input: Option<String>,

    /// Enable verbose diagnostic output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Cli::parse();

    match run(&args) {
        Ok(()) => Ok(()),
        Err(err) => {
            eprintln!("error: {:?}", err);
            std::process::exit(1);
        }
    }
}

fn run(args: &Cli) -> Result<()> {
    let mut config = CliConfig::from_file(&args.config)
        .wrap_err_with(|| format!("failed to load config from {}", args.config))?;

    if args.verbose {
        config.terminal.logging.level = CliLogLevel::Debug;
    }

    let mut logger = StructuredLogger::new(config.terminal.logging.clone())?;
    logger.log(LogEvent::Info {
        message: format!("direwolf-cli starting with config {}", args.config),
    })?;

    let source = match &args.input {
        Some(s) => parse_input(s),
        None => AudioSource::default(),
    };

    let (sample_rate, per_channel_samples) = match source {
        AudioSource::File(path) => read_wav(&path)?,
        AudioSource::Stdin => read_stdin(&config)?,
        AudioSource::Udp { port } => read_udp(&config, port)?,
    };

    if config.channels.is_empty() {
        return Err(eyre!("configuration defines no channels"));
    }

    let channels: Vec<Channel> = config
        .channels
        .iter()
        .enumerate()
        .map(|(idx, cfg)| build_channel(idx, cfg, sample_rate))
        .collect::<Result<_, _>>()
        .wrap_err("invalid channel configuration")?;

    let total_samples: usize = channels
        .iter()
        .map(|c| {
            per_channel_samples
                .get(c.index)
                .map(Vec::len)
                .unwrap_or(0)
        })
        .sum();

    let progress = ProgressBar::new(total_samples as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} samples")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let (good_tx, good_rx) = crossbeam::channel::bounded(GOOD_FRAME_QUEUE_DEPTH);
    let mut worker_handles = Vec::new();

    for (idx, channel) in channels.into_iter().enumerate() {
        let cfg = &config.channels[idx];
        let samples = per_channel_samples.get(idx).cloned().unwrap_or_default();
        let (sample_tx, sample_rx) = pipeline::sample_queue(4096);

        let handles = pipeline::spawn_channel(
            channel,
            sample_rx,
            good_tx.clone(),
            cfg.retry.fix_bits.into(),
            cfg.retry.sanity_test.into(),
            cfg.retry.passall,
            RETRY_QUEUE_DEPTH,
        );
        worker_handles.extend(handles);

        for sample in samples {
            sample_tx
                .send(sample)
                .map_err(|_| eyre!("channel {} demod thread terminated unexpectedly", idx))?;
            progress.inc(1);
        }
    }
    drop(good_tx);

    for handle in worker_handles {
        handle
            .join()
            .map_err(|_| eyre!("a channel worker thread panicked"))?;
    }
    progress.finish_and_clear();

    let mut telemetry = TelemetryAggregator::new(config.terminal.telemetry_interval_secs);
    let start = Instant::now();

    pipeline::run_frame_sink(
        good_rx,
        || start.elapsed().as_millis() as u64,
        |frame| {
            let was_retried = frame.retry_effort != direwolf_core::retry::FixBits::None;
            telemetry.record_frame(frame.audio_level, was_retried);

            match pipeline::parse_decoded(&frame) {
                Some(parsed) => {
                    println!("{}", frame_decoder::summarize(&parsed));
                    let _ = logger.log(LogEvent::FrameDecoded {
                        timestamp: chrono::Utc::now(),
                        channel: frame.stream.channel,
                        subchannel: frame.stream.subchannel,
                        slicer: frame.stream.slicer,
                        audio_level: frame.audio_level,
                        retry_category: format!("{:?}", frame.retry_effort),
                        sanity: "ok".to_string(),
                    });
                }
                None => {
                    telemetry.record_dropped();
                    let _ = logger.log(LogEvent::Warn {
                        message: format!(
                            "frame on channel {} failed AX.25 address parsing",
                            frame.stream.channel
                        ),
                    });
                }
            }

            if was_retried {
                let _ = logger.log(LogEvent::FrameRetried {
                    timestamp: chrono::Utc::now(),
                    attempts_tried: 1,
                    category: format!("{:?}", frame.retry_effort),
                });
            }
        },
    );

    let stats_event = StatisticsEvent {
        timestamp: chrono::Utc::now(),
        duration_secs: logger.elapsed(),
        total_frames: telemetry.total_frames(),
        total_retried: telemetry.total_retried(),
        total_dropped: telemetry.total_dropped(),
        audio_level: telemetry.compute_statistics(),
    };
    logger.log(LogEvent::Statistics(stats_event))?;

    Ok(())
}

fn parse_input(s: &str) -> AudioSource {
    if s == "-" {
        AudioSource::Stdin
    } else if let Some(port_str) = s.strip_prefix("udp:") {
        match port_str.parse() {
            Ok(port) => AudioSource::Udp { port },
            Err(_) => AudioSource::File(s.to_string()),
        }
    } else {
        AudioSource::File(s.to_string())
    }
}

/// Build a core [`Channel`] from its CLI configuration, resolving the
/// multiplicity option from `num_freq`/`profiles` (§3: "exactly one
/// multiplicity option active").
fn build_channel(
    index: usize,
    cfg: &ChannelConfig,
    sample_rate: usize,
) -> Result<Channel, direwolf_core::errors::ConfigError> {
    let modem = match cfg.modem.modem_type {
        ModemTypeConfig::Afsk => ModemFamily::Afsk,
        ModemTypeConfig::Baseband => ModemFamily::Baseband,
        ModemTypeConfig::Scrambled => ModemFamily::Scrambled,
        ModemTypeConfig::Off => ModemFamily::Off,
    };

    let multiplicity = if cfg.modem.num_freq > 1 {
        Multiplicity::Frequencies {
            count: cfg.modem.num_freq,
            offset_hz: cfg.modem.offset_hz,
        }
    } else if !cfg.modem.profiles.is_empty() {
        Multiplicity::Profiles(vec![cfg.modem.profile()?])
    } else {
        Multiplicity::Single
    };

    Channel::new(
        index,
        modem,
        cfg.modem.baud,
        cfg.modem.mark_freq_hz,
        cfg.modem.space_freq_hz,
        sample_rate,
        cfg.modem.decimate,
        multiplicity,
    )
}

/// Read a WAV file into per-channel signed 16-bit sample sequences.
/// Only 16-bit integer PCM is supported, the format a capture card or
/// `arecord` produces for Dire Wolf's own audio-in path.
fn read_wav(path: &str) -> Result<(usize, Vec<Vec<i16>>)> {
    let mut reader =
        hound::WavReader::open(path).wrap_err_with(|| format!("failed to open WAV file {}", path))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(eyre!(
            "unsupported WAV format: expected 16-bit PCM, got {:?} {}-bit",
            spec.sample_format,
            spec.bits_per_sample
        ));
    }

    let num_channels = spec.channels as usize;
    let mut per_channel = vec![Vec::new(); num_channels.max(1)];
    for (i, sample) in reader.samples::<i16>().enumerate() {
        let sample = sample.wrap_err("failed to read WAV sample")?;
        per_channel[i % num_channels.max(1)].push(sample);
    }

    Ok((spec.sample_rate as usize, per_channel))
}

/// Read raw PCM from stdin until EOF, using the configured device
/// format (no self-describing header on a raw stream).
fn read_stdin(config: &CliConfig) -> Result<(usize, Vec<Vec<i16>>)> {
    let mut raw = Vec::new();
    std::io::stdin()
        .read_to_end(&mut raw)
        .wrap_err("failed to read audio from stdin")?;

    let format = DeviceFormat {
        width: config.device.width.into(),
        num_channels: config.channels.len().max(1),
    };
    let per_channel = direwolf_core::audio::pump_buffer(&raw, &format)
        .map_err(|e| eyre!("failed to pump stdin audio: {}", e))?;

    Ok((config.device.sample_rate, per_channel))
}

/// Read raw PCM from a UDP socket until a read timeout elapses (a fixed
/// capture window, since this CLI runs in batch mode rather than as a
/// resident daemon).
fn read_udp(config: &CliConfig, port: u16) -> Result<(usize, Vec<Vec<i16>>)> {
    let socket = UdpSocket::bind(("0.0.0.0", port))
        .wrap_err_with(|| format!("failed to bind UDP audio socket on port {}", port))?;
    socket
        .set_read_timeout(Some(Duration::from_secs(2)))
        .wrap_err("failed to set UDP read timeout")?;

    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match socket.recv(&mut buf) {
            Ok(0) => break,
            Ok(n) => raw.extend_from_slice(&buf[..n]),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break;
            }
            Err(e) => return Err(e).wrap_err("failed to read from UDP audio socket"),
        }
    }

    let format = DeviceFormat {
        width: config.device.width.into(),
        num_channels: config.channels.len().max(1),
    };
    let per_channel = direwolf_core::audio::pump_buffer(&raw, &format)
        .map_err(|e| eyre!("failed to pump UDP audio: {}", e))?;

    Ok((config.device.sample_rate, per_channel))
}
