//! Session telemetry sampling and statistical aggregation.

use crate::logging::{StatSummary, StatisticsEvent};
use chrono::Utc;
use std::time::Instant;

/// Accumulates per-frame telemetry and computes running statistics for
/// the periodic `StatisticsEvent` emitted while a session runs.
pub struct TelemetryAggregator {
    audio_level_samples: Vec<f64>,

    last_sample_time: Instant,
    start_time: Instant,
    total_frames: usize,
    total_retried: usize,
    total_dropped: usize,

    sample_interval_secs: f64,
}

impl TelemetryAggregator {
    pub fn new(sample_interval_secs: f64) -> Self {
        Self {
            audio_level_samples: Vec::new(),
            last_sample_time: Instant::now(),
            start_time: Instant::now(),
            total_frames: 0,
            total_retried: 0,
            total_dropped: 0,
            sample_interval_secs,
        }
    }

    /// Record the outcome of one decoded or attempted frame.
    pub fn record_frame(&mut self, audio_level: f32, was_retried: bool) {
        self.total_frames += 1;
        if was_retried {
            self.total_retried += 1;
        }
        self.audio_level_samples.push(audio_level as f64);
    }

    /// Record a frame that was not recoverable and dropped.
    pub fn record_dropped(&mut self) {
        self.total_dropped += 1;
    }

    /// Whether enough time has passed to emit another statistics sample.
    pub fn should_sample(&self) -> bool {
        self.last_sample_time.elapsed().as_secs_f64() >= self.sample_interval_secs
    }

    /// Generate a statistics event and reset the sampling timer.
    pub fn sample(&mut self) -> Option<StatisticsEvent> {
        if !self.should_sample() {
            return None;
        }

        let event = StatisticsEvent {
            timestamp: Utc::now(),
            duration_secs: self.start_time.elapsed().as_secs_f64(),
            total_frames: self.total_frames,
            total_retried: self.total_retried,
            total_dropped: self.total_dropped,
            audio_level: self.compute_stat_summary(&self.audio_level_samples),
        };

        self.last_sample_time = Instant::now();

        Some(event)
    }

    /// Final statistics summary over the whole session.
    pub fn compute_statistics(&self) -> StatSummary {
        self.compute_stat_summary(&self.audio_level_samples)
    }

    fn compute_stat_summary(&self, samples: &[f64]) -> StatSummary {
        if samples.is_empty() {
            return StatSummary {
                mean: 0.0,
                stddev: 0.0,
                min: 0.0,
                max: 0.0,
                samples: 0,
            };
        }

        let mean = self.mean(samples).unwrap_or(0.0);
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
        let stddev = variance.sqrt();
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        StatSummary {
            mean,
            stddev,
            min,
            max,
            samples: samples.len(),
        }
    }

    fn mean(&self, samples: &[f64]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        Some(samples.iter().sum::<f64>() / samples.len() as f64)
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn total_retried(&self) -> usize {
        self.total_retried
    }

    pub fn total_dropped(&self) -> usize {
        self.total_dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_frames_and_retries() {
        let mut agg = TelemetryAggregator::new(60.0);
        agg.record_frame(0.5, false);
        agg.record_frame(0.6, true);
        agg.record_dropped();

        assert_eq!(agg.total_frames(), 2);
        assert_eq!(agg.total_retried(), 1);
        assert_eq!(agg.total_dropped(), 1);
    }

    #[test]
    fn stat_summary_on_empty_samples_is_zeroed() {
        let agg = TelemetryAggregator::new(60.0);
        let summary = agg.compute_statistics();
        assert_eq!(summary.samples, 0);
        assert_eq!(summary.mean, 0.0);
    }

    #[test]
    fn stat_summary_tracks_min_and_max() {
        let mut agg = TelemetryAggregator::new(60.0);
        agg.record_frame(0.2, false);
        agg.record_frame(0.8, false);
        let summary = agg.compute_statistics();
        assert_eq!(summary.samples, 2);
        assert!((summary.min - 0.2).abs() < 1e-9);
        assert!((summary.max - 0.8).abs() < 1e-9);
    }
}
