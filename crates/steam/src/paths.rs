use std::path::{Path, PathBuf};

use crate::SteamError;
use crate::vdf::load_library_folders;

/// Folder name of the game under `steamapps/common`.
pub const GAME_INSTALL_DIR: &str = "Team Fortress 2";

/// Mod directory inside the install that holds `console.log`.
pub const GAME_DIR_NAME: &str = "tf";

/// Provides access to Steam directory paths.
pub struct Paths {
    base_dir: PathBuf,
}

impl Paths {
    /// Creates a new `Paths` instance with auto-detected Steam directory.
    pub fn new() -> Result<Self, SteamError> {
        let base_dir = get_base_dir()?;
        tracing::debug!(base = %base_dir.display(), "steam installation detected");
        Ok(Self { base_dir })
    }

    /// Creates a new `Paths` instance with a custom base directory.
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Returns the Steam base directory.
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Returns the `steamapps` directory of the base library.
    pub fn steamapps_dir(&self) -> PathBuf {
        self.base_dir.join("steamapps")
    }

    /// Returns the path to `libraryfolders.vdf`.
    pub fn library_folders_path(&self) -> PathBuf {
        self.steamapps_dir().join("libraryfolders.vdf")
    }

    /// Returns every library root: the base directory first, then each
    /// existing extra library listed in `libraryfolders.vdf`.
    ///
    /// A missing or unreadable manifest leaves just the base directory.
    pub fn library_folders(&self) -> Vec<PathBuf> {
        let mut libs = vec![self.base_dir.clone()];

        let extra = match load_library_folders(&self.library_folders_path()) {
            Ok(extra) => extra,
            Err(e) => {
                tracing::debug!(error = %e, "no extra steam libraries");
                return libs;
            }
        };

        for lib in extra {
            if lib.exists() && !libs.contains(&lib) {
                libs.push(lib);
            }
        }
        libs
    }

    /// Returns the game's mod directory in the first library that has it.
    pub fn find_game_dir(&self) -> Result<PathBuf, SteamError> {
        self.library_folders()
            .iter()
            .map(|lib| game_dir_in(lib))
            .find(|dir| dir.is_dir())
            .ok_or(SteamError::GameNotFound)
    }

    /// Returns the path the game writes its console log to.
    ///
    /// The file itself only exists once the game ran with `-condebug`.
    pub fn console_log_path(&self, log_name: &str) -> Result<PathBuf, SteamError> {
        Ok(self.find_game_dir()?.join(log_name))
    }
}

/// Mod directory of the game inside a library root.
fn game_dir_in(lib: &Path) -> PathBuf {
    lib.join("steamapps")
        .join("common")
        .join(GAME_INSTALL_DIR)
        .join(GAME_DIR_NAME)
}

// Platform-specific base directory detection.
#[cfg(target_os = "windows")]
fn get_base_dir() -> Result<PathBuf, SteamError> {
    crate::paths_windows::get_base_dir()
}

#[cfg(not(target_os = "windows"))]
fn get_base_dir() -> Result<PathBuf, SteamError> {
    crate::paths_linux::get_base_dir()
}
