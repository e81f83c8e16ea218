use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct ClockState {
    /// Media position in nanoseconds
    position_ns: AtomicU64,
    paused: AtomicBool,
    /// Set on seek so the audio source drops stale samples
    clear_buffer: AtomicBool,
}

/// Master clock driven by audio samples handed to the output device.
///
/// The clock counts samples, not wall time, so it keeps reporting media time
/// when the sink plays faster or slower than 1x.
#[derive(Clone)]
pub struct AudioClock {
    state: Arc<ClockState>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClock {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            state: Arc::new(ClockState {
                position_ns: AtomicU64::new(0),
                paused: AtomicBool::new(true),
                clear_buffer: AtomicBool::new(false),
            }),
            sample_rate,
            channels,
        }
    }

    /// Position in seconds
    pub fn position(&self) -> f64 {
        self.state.position_ns.load(Ordering::Relaxed) as f64 / 1e9
    }

    /// Jump to a position and flag the audio buffer for clearing.
    pub fn set_position(&self, seconds: f64) {
        let ns = (seconds.max(0.0) * 1e9) as u64;
        self.state.position_ns.store(ns, Ordering::Relaxed);
        self.state.clear_buffer.store(true, Ordering::Relaxed);
    }

    /// Returns true once after each `set_position`.
    pub fn should_clear_buffer(&self) -> bool {
        self.state.clear_buffer.swap(false, Ordering::Relaxed)
    }

    /// Advance by interleaved samples consumed. Ignored while paused.
    pub fn advance_samples(&self, samples: u64) {
        if self.is_paused() {
            return;
        }
        let per_second = self.sample_rate as u64 * self.channels as u64;
        if per_second == 0 {
            return;
        }
        let delta_ns = samples * 1_000_000_000 / per_second;
        self.state.position_ns.fetch_add(delta_ns, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused.load(Ordering::Relaxed)
    }

    pub fn pause(&self) {
        self.state.paused.store(true, Ordering::Relaxed);
    }

    pub fn resume(&self) {
        self.state.paused.store(false, Ordering::Relaxed);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{assert_abs_diff_eq, F64_EPSILON};

    #[test]
    fn paused_clock_does_not_move() {
        let clock = AudioClock::new(48_000, 2);
        clock.advance_samples(96_000);
        assert_abs_diff_eq!(clock.position(), 0.0, epsilon = F64_EPSILON);
    }

    #[test]
    fn one_second_of_stereo_samples() {
        let clock = AudioClock::new(48_000, 2);
        clock.resume();
        clock.advance_samples(96_000);
        assert_abs_diff_eq!(clock.position(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn seek_flags_buffer_clear_once() {
        let clock = AudioClock::new(44_100, 2);
        clock.set_position(12.5);
        assert_abs_diff_eq!(clock.position(), 12.5, epsilon = 1e-6);
        assert!(clock.should_clear_buffer());
        assert!(!clock.should_clear_buffer());
    }

    #[test]
    fn clones_share_state() {
        let clock = AudioClock::new(44_100, 2);
        let other = clock.clone();
        other.resume();
        assert!(!clock.is_paused());
    }
}
