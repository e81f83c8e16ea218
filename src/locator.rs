//! Media locators: a local path or a URL understood by FFmpeg.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

pub use crate::error::LocatorError;

/// Where a pane's media comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    File(PathBuf),
    Url(Url),
}

impl Locator {
    /// Parse user text into a locator.
    ///
    /// Returns `Ok(None)` for empty or whitespace-only input, which callers
    /// treat as "no media". Text containing `://` must be a valid URL;
    /// `file://` URLs are turned back into paths. Anything else is a path.
    pub fn parse(input: &str) -> Result<Option<Self>, LocatorError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if trimmed.contains('\0') {
            return Err(LocatorError::ContainsNul);
        }

        if trimmed.contains("://") {
            let url = Url::parse(trimmed).map_err(|e| LocatorError::Malformed {
                input: trimmed.to_string(),
                reason: e.to_string(),
            })?;
            if url.scheme() == "file" {
                let path = url.to_file_path().map_err(|()| LocatorError::Malformed {
                    input: trimmed.to_string(),
                    reason: "file URL does not name a local path".to_string(),
                })?;
                return Ok(Some(Self::File(path)));
            }
            return Ok(Some(Self::Url(url)));
        }

        Ok(Some(Self::File(PathBuf::from(trimmed))))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// The string handed to FFmpeg's demuxer.
    pub fn as_input(&self) -> &Path {
        match self {
            Self::File(path) => path,
            Self::Url(url) => Path::new(url.as_str()),
        }
    }

    /// Short label for pane headers.
    pub fn display_name(&self) -> String {
        match self {
            Self::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            Self::Url(url) => url.as_str().to_string(),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{url}"),
        }
    }
}
