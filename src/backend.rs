//! The operation surface a [`ViewerControl`](crate::viewer::ViewerControl)
//! drives, and its FFmpeg implementation.

use egui::{Context, TextureId};
use tracing::{debug, warn};

use crate::error::PlaybackError;
use crate::locator::Locator;
use crate::player::{PlayerState, VideoPlayer, MAX_RATE};

/// What a pane needs to draw the current picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoFrame {
    pub texture: TextureId,
    pub size: [u32; 2],
}

/// An embedded media widget. All calls happen on the UI thread.
pub trait MediaBackend {
    /// Load `locator` and start playing it.
    fn play_locator(&mut self, locator: &Locator) -> Result<(), PlaybackError>;
    /// Resume the current media.
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError>;
    fn is_playing(&self) -> bool;
    fn state(&self) -> PlayerState;
    /// True once for each time the media ran to its end.
    fn take_end_reached(&mut self) -> bool;
    /// Runtime failure reported since the last call, if any.
    fn take_failure(&mut self) -> Option<String> {
        None
    }
    fn update(&mut self, _ctx: &Context) {}
    fn frame(&self) -> Option<VideoFrame> {
        None
    }
    /// `(position, duration)` in seconds while media is loaded.
    fn progress(&self) -> Option<(f64, f64)> {
        None
    }
}

/// [`MediaBackend`] over [`VideoPlayer`]. Holds no player while stopped.
pub struct FfmpegBackend {
    ctx: Context,
    player: Option<VideoPlayer>,
    rate: f32,
}

impl FfmpegBackend {
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            player: None,
            rate: 1.0,
        }
    }
}

impl MediaBackend for FfmpegBackend {
    fn play_locator(&mut self, locator: &Locator) -> Result<(), PlaybackError> {
        // Release the old decoder and audio device before opening another
        self.player = None;
        let mut player =
            VideoPlayer::open(locator, self.ctx.clone()).map_err(|source| PlaybackError::Open {
                locator: locator.clone(),
                source,
            })?;
        if self.rate != 1.0 {
            player.set_rate(self.rate);
        }
        player.play();
        self.player = Some(player);
        Ok(())
    }

    fn play(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.play();
        }
    }

    fn pause(&mut self) {
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
    }

    fn stop(&mut self) {
        // Dropping the player joins its decoder thread
        if let Some(mut player) = self.player.take() {
            debug!(locator = %player.locator(), "stopping");
            player.stop();
        }
    }

    fn set_rate(&mut self, rate: f32) -> Result<(), PlaybackError> {
        if !(rate > 0.0 && rate <= MAX_RATE) {
            warn!(rate, "rejecting playback rate");
            return Err(PlaybackError::Rate(rate));
        }
        self.rate = rate;
        if let Some(player) = self.player.as_mut() {
            player.set_rate(rate);
        }
        Ok(())
    }

    fn is_playing(&self) -> bool {
        self.player.as_ref().is_some_and(VideoPlayer::is_playing)
    }

    fn state(&self) -> PlayerState {
        self.player
            .as_ref()
            .map_or(PlayerState::Stopped, VideoPlayer::state)
    }

    fn take_end_reached(&mut self) -> bool {
        self.player
            .as_mut()
            .is_some_and(VideoPlayer::take_end_reached)
    }

    fn take_failure(&mut self) -> Option<String> {
        self.player.as_mut().and_then(VideoPlayer::take_failure)
    }

    fn update(&mut self, ctx: &Context) {
        if let Some(player) = self.player.as_mut() {
            player.update(ctx);
        }
    }

    fn progress(&self) -> Option<(f64, f64)> {
        self.player
            .as_ref()
            .map(|player| (player.position(), player.duration()))
    }

    fn frame(&self) -> Option<VideoFrame> {
        self.player.as_ref().map(|player| {
            let (width, height) = player.video_size();
            VideoFrame {
                texture: player.texture().id(),
                size: [width, height],
            }
        })
    }
}
