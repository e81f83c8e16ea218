//! TOML configuration: window size, runtime location and per-pane presets.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::locator::Locator;
use crate::window::PANE_COUNT;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime_dir: Option<PathBuf>,
    pub window: WindowConfig,
    pub panes: Vec<PaneConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1600.0,
            height: 600.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaneConfig {
    pub file: Option<String>,
    pub rate: Option<f32>,
    pub paused: Option<bool>,
}

/// Startup state for one pane, after merging the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanePreset {
    pub locator: Option<Locator>,
    pub rate: Option<f32>,
    pub paused: bool,
}

impl Config {
    /// `<config dir>/multiview/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("multiview").join("config.toml"))
    }

    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.panes.len() > PANE_COUNT {
            return Err(ConfigError::TooManyPanes(config.panes.len()));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text, path)?;
        info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// An explicit path must exist; a missing default file means defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("no config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Pane presets with command-line locators taking the place of configured
    /// files, pane by pane.
    pub fn pane_presets(
        &self,
        overrides: &[Locator],
    ) -> Result<[PanePreset; PANE_COUNT], ConfigError> {
        let mut presets: [PanePreset; PANE_COUNT] = Default::default();
        for (preset, pane) in presets.iter_mut().zip(&self.panes) {
            preset.locator = match &pane.file {
                Some(file) => Locator::parse(file)?,
                None => None,
            };
            preset.rate = pane.rate;
            preset.paused = pane.paused.unwrap_or(false);
        }
        for (preset, locator) in presets.iter_mut().zip(overrides) {
            preset.locator = Some(locator.clone());
        }
        Ok(presets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_is_default() {
        let config = Config::from_toml("", Path::new("x.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.window.width, 1600.0);
    }

    #[test]
    fn parses_panes() {
        let text = r#"
            runtime_dir = "/opt/ffmpeg"

            [window]
            width = 1200.0

            [[panes]]
            file = "a.mp4"
            rate = 0.5

            [[panes]]
            paused = true
        "#;
        let config = Config::from_toml(text, Path::new("x.toml")).unwrap();
        assert_eq!(config.runtime_dir, Some(PathBuf::from("/opt/ffmpeg")));
        assert_eq!(config.window.width, 1200.0);
        assert_eq!(config.window.height, 600.0);
        assert_eq!(config.panes.len(), 2);
        assert_eq!(config.panes[0].file.as_deref(), Some("a.mp4"));
        assert_eq!(config.panes[1].paused, Some(true));
    }

    #[test]
    fn more_than_three_panes_is_an_error() {
        let text = "[[panes]]\n[[panes]]\n[[panes]]\n[[panes]]\n";
        let err = Config::from_toml(text, Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyPanes(4)));
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = Config::from_toml("window = 3", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn loads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[panes]]\nfile = \"clip.mkv\"").unwrap();
        let config = Config::load_or_default(Some(file.path())).unwrap();
        assert_eq!(config.panes[0].file.as_deref(), Some("clip.mkv"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn command_line_overrides_files() {
        let config = Config {
            panes: vec![
                PaneConfig {
                    file: Some("a.mp4".into()),
                    rate: Some(2.0),
                    paused: None,
                },
                PaneConfig {
                    file: Some("b.mp4".into()),
                    rate: None,
                    paused: Some(true),
                },
            ],
            ..Config::default()
        };
        let presets = config.pane_presets(&[Locator::from_path("cli.mp4")]).unwrap();
        assert_eq!(presets[0].locator, Some(Locator::from_path("cli.mp4")));
        assert_eq!(presets[0].rate, Some(2.0));
        assert_eq!(presets[1].locator, Some(Locator::from_path("b.mp4")));
        assert!(presets[1].paused);
        assert_eq!(presets[2], PanePreset::default());
    }
}
