//! Locating and starting the native media runtime.
//!
//! Bundled FFmpeg libraries live next to the executable under
//! `ffmpeg/<os>-<arch>`, with `x86` for 32-bit processes and `x64` otherwise.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::RuntimeError;

pub const RUNTIME_DIR_NAME: &str = "ffmpeg";

fn os_tag() -> &'static str {
    if cfg!(windows) {
        "win"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

fn arch_tag() -> &'static str {
    if cfg!(target_pointer_width = "32") {
        "x86"
    } else {
        "x64"
    }
}

/// e.g. `win-x64`
pub fn platform_dir_name() -> String {
    format!("{}-{}", os_tag(), arch_tag())
}

pub fn resolve_runtime_dir(exe_dir: &Path) -> PathBuf {
    exe_dir.join(RUNTIME_DIR_NAME).join(platform_dir_name())
}

pub fn default_runtime_dir() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    exe.parent().map(resolve_runtime_dir)
}

/// `dir` in front of an existing search path value.
pub fn prepend_search_path(dir: &Path, existing: Option<OsString>) -> Option<OsString> {
    let mut paths = vec![dir.to_path_buf()];
    if let Some(existing) = existing {
        paths.extend(env::split_paths(&existing).filter(|p| p != dir));
    }
    env::join_paths(paths).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct NativeRuntime {
    pub dir: Option<PathBuf>,
    pub bundled: bool,
}

impl NativeRuntime {
    /// Window title naming where the FFmpeg libraries came from.
    pub fn window_title(&self, app: &str) -> String {
        if self.bundled {
            app.to_string()
        } else {
            format!("{app} (system FFmpeg)")
        }
    }
}

/// Resolve the runtime directory, expose it to the loader, and start FFmpeg.
///
/// Must run before any other thread is spawned.
pub fn init(dir_override: Option<PathBuf>) -> Result<NativeRuntime, RuntimeError> {
    let dir = dir_override.or_else(default_runtime_dir);
    let bundled = dir.as_deref().is_some_and(Path::is_dir);

    match (&dir, bundled) {
        (Some(dir), true) => {
            info!(dir = %dir.display(), "using bundled media runtime");
            expose_to_loader(dir);
        }
        (Some(dir), false) => {
            info!(dir = %dir.display(), "no bundled media runtime, using system libraries")
        }
        (None, _) => warn!("could not determine executable directory"),
    }

    ffmpeg_next::init()?;
    info!("FFmpeg initialized");

    Ok(NativeRuntime { dir, bundled })
}

#[cfg(windows)]
fn expose_to_loader(dir: &Path) {
    match prepend_search_path(dir, env::var_os("PATH")) {
        Some(path) => env::set_var("PATH", path),
        None => warn!(dir = %dir.display(), "runtime directory cannot be placed on PATH"),
    }
}

#[cfg(not(windows))]
fn expose_to_loader(dir: &Path) {
    // The dynamic loader reads its search path at process start only
    tracing::debug!(dir = %dir.display(), "runtime directory must be on the loader path at launch");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_marks_system_libraries() {
        let bundled = NativeRuntime {
            dir: Some(PathBuf::from("/opt/multiview/ffmpeg")),
            bundled: true,
        };
        assert_eq!(bundled.window_title("multiview"), "multiview");

        let system = NativeRuntime {
            dir: None,
            bundled: false,
        };
        assert_eq!(system.window_title("multiview"), "multiview (system FFmpeg)");
    }

    #[test]
    fn runtime_dir_sits_under_the_executable() {
        let dir = resolve_runtime_dir(Path::new("/opt/multiview"));
        assert!(dir.starts_with("/opt/multiview/ffmpeg"));
        assert_eq!(dir.file_name().unwrap(), platform_dir_name().as_str());
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn sixty_four_bit_picks_x64() {
        assert!(platform_dir_name().ends_with("-x64"));
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn thirty_two_bit_picks_x86() {
        assert!(platform_dir_name().ends_with("-x86"));
    }

    #[test]
    fn prepend_puts_dir_first_without_duplicates() {
        let dir = PathBuf::from("rt");
        let existing = env::join_paths([PathBuf::from("a"), PathBuf::from("rt")]).unwrap();
        let joined = prepend_search_path(&dir, Some(existing)).unwrap();
        let parts: Vec<PathBuf> = env::split_paths(&joined).collect();
        assert_eq!(parts, vec![PathBuf::from("rt"), PathBuf::from("a")]);
    }
}
