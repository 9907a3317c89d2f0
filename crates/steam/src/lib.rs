//! Locates the Steam installation, its library folders, and the game's
//! `console.log` inside them.

pub mod paths;
#[cfg(not(target_os = "windows"))]
mod paths_linux;
#[cfg(target_os = "windows")]
mod paths_windows;
pub mod vdf;

// Re-export primary types.
pub use paths::{GAME_DIR_NAME, GAME_INSTALL_DIR, Paths};
pub use vdf::{load_library_folders, parse_library_folders};

/// Errors for Steam lookups.
#[derive(Debug, thiserror::Error)]
pub enum SteamError {
    #[error("steam installation not found")]
    NotFound,

    #[error("game not found in any steam library")]
    GameNotFound,

    #[error("I/O error: {0}")]
    Io(String),
}
