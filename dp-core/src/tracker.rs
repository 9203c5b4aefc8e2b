//! Behavioral signal tracking
//!
//! Accumulates interaction events (touch, keystrokes, motion) between
//! generation passes and reduces them to behavioral signatures on demand.
//! Callers push events explicitly with their own timestamps; the tracker owns
//! no event source, which keeps every reduction replayable in tests.
//!
//! Motion sampling for the MEMS and orientation probes goes through
//! [`sample_window`] instead: a bounded collection loop over a channel that
//! stops at a deadline or a sample cap, whichever comes first.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tracing::debug;

use crate::signals::types::{GaitData, KeystrokeData, TouchData};
use crate::stats;

/// Walking cadence band in Hz; spectral peaks outside it are not steps
const WALKING_BAND: (f64, f64) = (0.5, 3.0);

/// Motion sample rate assumed for gait spectral analysis, in Hz
const GAIT_SAMPLE_RATE: f64 = 50.0;

/// Minimum magnitude samples before a gait signature is meaningful
const MIN_GAIT_SAMPLES: usize = 100;

/// Rhythm vector keeps the most recent dwell times only
const RHYTHM_WINDOW: usize = 20;

/// Hard cap on every event buffer
const MAX_BUFFER: usize = 4096;

// ============================================================================
// Event types
// ============================================================================

/// One touch contact observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchSample {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
    pub radius: f64,
    /// Milliseconds, caller's clock
    pub timestamp_ms: f64,
}

// ============================================================================
// Behavioral tracker
// ============================================================================

#[derive(Default)]
struct TrackerState {
    recording: bool,
    touches: Vec<TouchSample>,
    /// Key identifier -> press timestamp, awaiting release
    pending_keys: HashMap<String, f64>,
    dwell_times: Vec<f64>,
    flight_times: Vec<f64>,
    press_timestamps: Vec<f64>,
    last_release_ms: Option<f64>,
    /// Acceleration vector magnitudes, assumed ~50 Hz
    motion_magnitudes: Vec<f64>,
}

/// Accumulates interaction events and reduces them to behavioral signatures
pub struct BehavioralTracker {
    state: Mutex<TrackerState>,
}

impl BehavioralTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
        }
    }

    /// Begin accepting events. Events pushed while stopped are dropped.
    pub fn start(&self) {
        self.state.lock().recording = true;
    }

    /// Stop accepting events; accumulated buffers are kept for reduction.
    pub fn stop(&self) {
        self.state.lock().recording = false;
    }

    /// Drop all accumulated events.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        let recording = state.recording;
        *state = TrackerState::default();
        state.recording = recording;
    }

    pub fn record_touch(&self, sample: TouchSample) {
        let mut state = self.state.lock();
        if !state.recording || state.touches.len() >= MAX_BUFFER {
            return;
        }
        state.touches.push(sample);
    }

    /// Record a key press. Dwell time completes on the matching release.
    pub fn key_down(&self, key_id: &str, timestamp_ms: f64) {
        let mut state = self.state.lock();
        if !state.recording || state.press_timestamps.len() >= MAX_BUFFER {
            return;
        }
        // Flight time spans from the previous release to this press
        if let Some(last_up) = state.last_release_ms {
            let flight = timestamp_ms - last_up;
            if flight >= 0.0 {
                state.flight_times.push(flight);
            }
        }
        state.press_timestamps.push(timestamp_ms);
        state.pending_keys.insert(key_id.to_string(), timestamp_ms);
    }

    /// Record a key release. Unmatched releases are ignored.
    pub fn key_up(&self, key_id: &str, timestamp_ms: f64) {
        let mut state = self.state.lock();
        if !state.recording {
            return;
        }
        if let Some(down) = state.pending_keys.remove(key_id) {
            let dwell = timestamp_ms - down;
            if dwell >= 0.0 {
                state.dwell_times.push(dwell);
            }
            state.last_release_ms = Some(timestamp_ms);
        }
    }

    /// Record one acceleration vector for gait analysis.
    pub fn record_motion(&self, acceleration: [f64; 3]) {
        let mut state = self.state.lock();
        if !state.recording || state.motion_magnitudes.len() >= MAX_BUFFER {
            return;
        }
        let magnitude = (acceleration[0].powi(2)
            + acceleration[1].powi(2)
            + acceleration[2].powi(2))
        .sqrt();
        state.motion_magnitudes.push(magnitude);
    }

    /// Reduce recorded touches. `None` when nothing was recorded.
    pub fn touch_signature(&self, max_touch_points: u32) -> Option<TouchData> {
        let state = self.state.lock();
        if state.touches.is_empty() {
            return None;
        }
        let n = state.touches.len() as f64;
        let average_pressure = state.touches.iter().map(|t| t.pressure).sum::<f64>() / n;
        let average_radius = state.touches.iter().map(|t| t.radius).sum::<f64>() / n;

        // Velocity between consecutive contacts, px/ms
        let mut velocities = Vec::new();
        for pair in state.touches.windows(2) {
            let dt = pair[1].timestamp_ms - pair[0].timestamp_ms;
            if dt > 0.0 {
                let dx = pair[1].x - pair[0].x;
                let dy = pair[1].y - pair[0].y;
                velocities.push((dx * dx + dy * dy).sqrt() / dt);
            }
        }
        if velocities.len() > 10 {
            velocities.drain(..velocities.len() - 10);
        }

        Some(TouchData {
            average_pressure,
            average_radius,
            max_touch_points,
            touch_support: max_touch_points > 0,
            swipe_velocity_profile: velocities,
        })
    }

    /// Reduce recorded keystrokes. Needs at least two presses.
    pub fn keystroke_signature(&self) -> Option<KeystrokeData> {
        let state = self.state.lock();
        if state.press_timestamps.len() < 2 {
            return None;
        }

        let avg = |v: &[f64]| {
            if v.is_empty() {
                0.0
            } else {
                v.iter().sum::<f64>() / v.len() as f64
            }
        };

        let rhythm_start = state.dwell_times.len().saturating_sub(RHYTHM_WINDOW);
        let rhythm = state.dwell_times[rhythm_start..].to_vec();

        // Words per minute, 5 keystrokes per word convention
        let total_ms = state.press_timestamps[state.press_timestamps.len() - 1]
            - state.press_timestamps[0];
        let estimated_wpm = if total_ms > 0.0 {
            (state.press_timestamps.len() as f64 / 5.0) / (total_ms / 60_000.0)
        } else {
            0.0
        };

        Some(KeystrokeData {
            average_dwell_time: avg(&state.dwell_times),
            average_flight_time: avg(&state.flight_times),
            rhythm,
            variance: stats::variance(&state.dwell_times),
            estimated_wpm,
        })
    }

    /// Reduce recorded motion to a walking-pattern signature.
    ///
    /// Requires [`MIN_GAIT_SAMPLES`] magnitudes; below that the spectral
    /// estimate is noise and `None` is returned. The step frequency is the
    /// strongest spectral peak inside the walking band.
    pub fn gait_signature(&self) -> Option<GaitData> {
        let state = self.state.lock();
        let magnitudes = &state.motion_magnitudes;
        if magnitudes.len() < MIN_GAIT_SAMPLES {
            return None;
        }

        let peaks = stats::frequency_peaks(magnitudes, GAIT_SAMPLE_RATE, 5);
        let step_frequency = peaks
            .iter()
            .copied()
            .find(|f| (WALKING_BAND.0..=WALKING_BAND.1).contains(f))
            .unwrap_or(0.0);

        let max = magnitudes.iter().copied().fold(f64::MIN, f64::max);
        let min = magnitudes.iter().copied().fold(f64::MAX, f64::min);
        let amplitude = max - min;

        // Left/right step symmetry approximated by comparing the amplitude of
        // the two halves of the window
        let half = magnitudes.len() / 2;
        let half_amplitude = |slice: &[f64]| {
            let hi = slice.iter().copied().fold(f64::MIN, f64::max);
            let lo = slice.iter().copied().fold(f64::MAX, f64::min);
            hi - lo
        };
        let a1 = half_amplitude(&magnitudes[..half]);
        let a2 = half_amplitude(&magnitudes[half..]);
        let symmetry_score = 1.0 - (a1 - a2).abs() / a1.max(a2).max(0.001);

        Some(GaitData {
            step_frequency,
            step_regularity: 1.0 / (1.0 + stats::variance(magnitudes)),
            amplitude,
            frequency_peaks: peaks,
            symmetry_score,
            sample_count: magnitudes.len(),
        })
    }
}

impl Default for BehavioralTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Sampling window
// ============================================================================

/// Collect motion samples from a channel for a bounded window.
///
/// Returns when the duration elapses, the sample cap is reached, or the
/// sender side closes, whichever happens first. The partial buffer is always
/// returned; a short window is a small sample set, not an error.
pub async fn sample_window(
    rx: &mut mpsc::Receiver<[f64; 3]>,
    duration: Duration,
    max_samples: usize,
) -> Vec<[f64; 3]> {
    let deadline = Instant::now() + duration;
    let mut samples = Vec::new();

    loop {
        if samples.len() >= max_samples {
            break;
        }
        tokio::select! {
            _ = sleep_until(deadline) => break,
            received = rx.recv() => match received {
                Some(sample) => samples.push(sample),
                None => break,
            },
        }
    }

    debug!(count = samples.len(), "Motion sampling window closed");
    samples
}

// ============================================================================
// Tests
// ============================================================================
