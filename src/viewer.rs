//! A single video pane: three attributes forwarded to an embedded widget.
//!
//! Every attribute assignment becomes an [`AttributeChange`]. On the UI
//! thread the change runs at once; from anywhere else it is posted to the
//! window's dispatcher and runs on the next frame. Either way the widget is
//! only ever touched from the UI thread.

use tracing::{debug, warn};

use crate::backend::MediaBackend;
use crate::dispatch::UiHandle;
use crate::error::{DispatchError, ViewerError};
use crate::locator::Locator;
use crate::player::PlayerState;

/// Index of a pane in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewerId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeChange {
    FilePath(Option<Locator>),
    PlaybackRate(f32),
    PausePlayback(bool),
}

/// A change addressed to one viewer, as carried by the dispatcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Posted {
    pub viewer: ViewerId,
    pub change: AttributeChange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerAttributes {
    pub file_path: Option<Locator>,
    pub playback_rate: f32,
    pub pause_playback: bool,
}

impl Default for ViewerAttributes {
    fn default() -> Self {
        Self {
            file_path: None,
            playback_rate: 1.0,
            pause_playback: false,
        }
    }
}

pub struct ViewerControl<B> {
    id: ViewerId,
    backend: B,
    attributes: ViewerAttributes,
    ui: UiHandle<Posted>,
    last_error: Option<String>,
}

impl<B: MediaBackend> ViewerControl<B> {
    pub fn new(id: ViewerId, backend: B, ui: UiHandle<Posted>) -> Self {
        Self {
            id,
            backend,
            attributes: ViewerAttributes::default(),
            ui,
            last_error: None,
        }
    }

    /// Apply a change now if on the UI thread, otherwise post it there.
    pub fn apply(&mut self, change: AttributeChange) -> Result<(), ViewerError> {
        if !self.ui.is_owner_thread() {
            debug!(viewer = self.id.0, ?change, "posting change to UI thread");
            self.ui.post(Posted {
                viewer: self.id,
                change,
            })?;
            return Ok(());
        }
        self.execute(change)
    }

    fn execute(&mut self, change: AttributeChange) -> Result<(), ViewerError> {
        match change {
            AttributeChange::FilePath(locator) => {
                let unchanged = locator.is_some() && locator == self.attributes.file_path;
                self.attributes.file_path = locator.clone();
                match locator {
                    // Reassigning the loaded media keeps its position
                    Some(locator) if unchanged && self.is_loaded() => {
                        debug!(viewer = self.id.0, %locator, "file path unchanged");
                    }
                    Some(locator) => {
                        debug!(viewer = self.id.0, %locator, "play");
                        match self.backend.play_locator(&locator) {
                            Ok(()) => self.last_error = None,
                            Err(e) => return Err(self.report(e.into())),
                        }
                    }
                    None => {
                        debug!(viewer = self.id.0, "stop");
                        self.backend.stop();
                    }
                }
            }
            AttributeChange::PlaybackRate(rate) => {
                self.attributes.playback_rate = rate;
                debug!(viewer = self.id.0, rate, "set rate");
                if let Err(e) = self.backend.set_rate(rate) {
                    return Err(self.report(e.into()));
                }
            }
            AttributeChange::PausePlayback(pause) => {
                self.attributes.pause_playback = pause;
                if pause && self.backend.is_playing() {
                    debug!(viewer = self.id.0, "pause");
                    self.backend.pause();
                } else if !pause && self.backend.state() == PlayerState::Paused {
                    debug!(viewer = self.id.0, "resume");
                    self.backend.play();
                }
            }
        }
        Ok(())
    }

    /// Media is open and the last open succeeded.
    fn is_loaded(&self) -> bool {
        self.last_error.is_none() && self.backend.state() != PlayerState::Stopped
    }

    fn report(&mut self, error: ViewerError) -> ViewerError {
        warn!(viewer = self.id.0, "{error}");
        self.last_error = Some(error.to_string());
        error
    }

    pub fn set_file_path(&mut self, locator: Option<Locator>) -> Result<(), ViewerError> {
        self.apply(AttributeChange::FilePath(locator))
    }

    /// Parse and assign a locator typed by the user. Blank text stops playback;
    /// malformed text is rejected and leaves the pane as it was.
    pub fn set_file_path_str(&mut self, input: &str) -> Result<(), ViewerError> {
        let locator = Locator::parse(input).map_err(|e| self.report(e.into()))?;
        self.set_file_path(locator)
    }

    pub fn set_playback_rate(&mut self, rate: f32) -> Result<(), ViewerError> {
        self.apply(AttributeChange::PlaybackRate(rate))
    }

    pub fn set_pause_playback(&mut self, pause: bool) -> Result<(), ViewerError> {
        self.apply(AttributeChange::PausePlayback(pause))
    }

    /// Per-frame housekeeping: collect widget failures and handle end of media.
    pub fn poll(&mut self) -> Result<(), ViewerError> {
        if let Some(reason) = self.backend.take_failure() {
            warn!(viewer = self.id.0, %reason, "playback error");
            self.last_error = Some(reason);
        }
        if self.backend.take_end_reached() {
            // TODO: advance to the next entry once panes carry a playlist.
            debug!(viewer = self.id.0, "end reached, clearing file path");
            self.set_file_path(None)?;
        }
        Ok(())
    }

    pub fn handle(&self) -> ViewerHandle {
        ViewerHandle {
            id: self.id,
            ui: self.ui.clone(),
        }
    }

    pub fn id(&self) -> ViewerId {
        self.id
    }

    pub fn attributes(&self) -> &ViewerAttributes {
        &self.attributes
    }

    pub fn file_path(&self) -> Option<&Locator> {
        self.attributes.file_path.as_ref()
    }

    pub fn playback_rate(&self) -> f32 {
        self.attributes.playback_rate
    }

    pub fn pause_playback(&self) -> bool {
        self.attributes.pause_playback
    }

    pub fn state(&self) -> PlayerState {
        self.backend.state()
    }

    pub fn is_playing(&self) -> bool {
        self.backend.is_playing()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

/// Thread-safe setter surface for one viewer. Every call is posted to the
/// UI thread, including calls made on it.
#[derive(Clone)]
pub struct ViewerHandle {
    id: ViewerId,
    ui: UiHandle<Posted>,
}

impl ViewerHandle {
    pub fn post(&self, change: AttributeChange) -> Result<(), DispatchError> {
        self.ui.post(Posted {
            viewer: self.id,
            change,
        })
    }

    pub fn set_file_path(&self, locator: Option<Locator>) -> Result<(), DispatchError> {
        self.post(AttributeChange::FilePath(locator))
    }

    pub fn set_playback_rate(&self, rate: f32) -> Result<(), DispatchError> {
        self.post(AttributeChange::PlaybackRate(rate))
    }

    pub fn set_pause_playback(&self, pause: bool) -> Result<(), DispatchError> {
        self.post(AttributeChange::PausePlayback(pause))
    }
}
