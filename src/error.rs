use std::path::PathBuf;

use thiserror::Error;

use crate::locator::Locator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocatorError {
    #[error("malformed locator {input:?}: {reason}")]
    Malformed { input: String, reason: String },
    #[error("locator contains a NUL byte")]
    ContainsNul,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("failed to open {locator}: {source:#}")]
    Open {
        locator: Locator,
        #[source]
        source: anyhow::Error,
    },
    #[error("unsupported playback rate: {0}")]
    Rate(f32),
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to initialize FFmpeg: {0}")]
    Init(#[from] ffmpeg_next::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("UI dispatch queue is full")]
    QueueFull,
    #[error("UI dispatcher has been dropped")]
    Disconnected,
    #[error("dispatch queue drained off the owner thread")]
    NotOwner,
}

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error(transparent)]
    InvalidLocator(#[from] LocatorError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("config declares {0} panes, the window has 3")]
    TooManyPanes(usize),
    #[error("config pane file: {0}")]
    Locator(#[from] LocatorError),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Args(#[from] pico_args::Error),
    #[error("got {0} locators, the window has 3 panes")]
    TooManyLocators(usize),
    #[error(transparent)]
    Locator(#[from] LocatorError),
}
