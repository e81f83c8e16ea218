//! Three synchronized video panes driven through a single pause toggle.
//!
//! Each pane is a [`ViewerControl`] wrapping a [`MediaBackend`]; the stock
//! backend is [`FfmpegBackend`], an FFmpeg decoder with rodio audio rendered
//! into an egui texture. Attribute changes made off the UI thread travel
//! through the window's [`UiDispatcher`](dispatch::UiDispatcher).

pub mod backend;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod locator;
pub mod player;
pub mod runtime;
pub mod ui;
pub mod viewer;
pub mod window;

#[cfg(test)]
pub(crate) mod test_utils;

pub use backend::{FfmpegBackend, MediaBackend};
pub use locator::Locator;
pub use player::{PlayerState, VideoPlayer};
pub use viewer::{AttributeChange, ViewerControl, ViewerHandle, ViewerId};
pub use window::MainWindow;
