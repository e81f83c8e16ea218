//! Shared test helpers: float assertions and a backend that records calls.

pub use approx::assert_abs_diff_eq;

use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use crate::backend::MediaBackend;
use crate::error::PlaybackError;
use crate::locator::Locator;
use crate::player::PlayerState;

pub const F64_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    PlayLocator(Locator),
    Play,
    Pause,
    Stop,
    SetRate(f32),
}

#[derive(Default)]
struct Shared {
    calls: Vec<(Call, ThreadId)>,
    state: Option<PlayerState>,
    end_reached: bool,
    fail_open: bool,
    failure: Option<String>,
}

/// Mock widget that mimics the real state transitions and logs every call
/// together with the thread it ran on.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    shared: Arc<Mutex<Shared>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.shared.lock().calls.iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn call_threads(&self) -> Vec<ThreadId> {
        self.shared.lock().calls.iter().map(|(_, t)| *t).collect()
    }

    pub fn clear_calls(&self) {
        self.shared.lock().calls.clear();
    }

    pub fn set_state(&self, state: PlayerState) {
        self.shared.lock().state = Some(state);
    }

    /// Pretend the media ran out.
    pub fn finish(&self) {
        let mut shared = self.shared.lock();
        shared.state = Some(PlayerState::Ended);
        shared.end_reached = true;
    }

    pub fn fail_next_open(&self) {
        self.shared.lock().fail_open = true;
    }

    /// Pretend the decoder gave up mid-playback.
    pub fn fail_at_runtime(&self, reason: &str) {
        let mut shared = self.shared.lock();
        shared.state = Some(PlayerState::Stopped);
        shared.failure = Some(reason.to_string());
    }

    fn record(&self, call: Call) -> parking_lot::MutexGuard<'_, Shared> {
        let mut shared = self.shared.lock();
        shared.calls.push((call, thread::current().id()));
        shared
    }
}

impl MediaBackend for RecordingBackend {
    fn play_locator(&mut self, locator: &Locator) -> Result<(), PlaybackError> {
        let mut shared = self.record(Call::PlayLocator(locator.clone()));
        if std::mem::take(&mut shared.fail_open) {
            shared.state = Some(PlayerState::Stopped);
            return Err(PlaybackError::Open {
                locator: locator.clone(),
                source: anyhow::anyhow!("unplayable"),
            });
        }
        shared.state = Some(PlayerState::Playing);
        Ok(())
    }

    fn play(&mut self) {
        let mut shared = self.record(Call::Play);
        if shared.state == Some(PlayerState::Paused) {
            shared.state = Some(PlayerState::Playing);
        }
    }

    fn pause(&mut self) {
        let mut shared = self.record(Call::Pause);
        if shared.state == Some(PlayerState::Playing) {
            shared.state = Some(PlayerState::Paused);
        }
    }

    fn stop(&mut self) {
        self.record(Call::Stop).state = Some(PlayerState::Stopped);
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        self.record(Call::SetRate(rate));
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.state() == PlayerState::Playing
    }

    fn state(&self) -> PlayerState {
        self.shared.lock().state.unwrap_or(PlayerState::Stopped)
    }

    fn take_end_reached(&mut self) -> bool {
        std::mem::take(&mut self.shared.lock().end_reached)
    }

    fn take_failure(&mut self) -> Option<String> {
        self.shared.lock().failure.take()
    }
}
