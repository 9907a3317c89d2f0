use std::path::{Path, PathBuf};

use winreg::RegKey;
use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};

use crate::SteamError;

/// Well-known install folders tried when the registry has nothing usable.
const FALLBACK_DIRS: &[&str] = &[
    r"C:\Program Files (x86)\Steam",
    r"C:\Program Files\Steam",
    r"D:\Steam",
    r"D:\SteamLibrary",
    r"E:\Steam",
    r"E:\SteamLibrary",
];

/// Returns the Steam base directory on Windows using the registry.
pub(crate) fn get_base_dir() -> Result<PathBuf, SteamError> {
    // Registry locations of the Steam install path, checked in order.
    let registry_keys = [
        (
            RegKey::predef(HKEY_LOCAL_MACHINE),
            r"SOFTWARE\WOW6432Node\Valve\Steam",
            "InstallPath",
        ),
        (
            RegKey::predef(HKEY_LOCAL_MACHINE),
            r"SOFTWARE\Valve\Steam",
            "InstallPath",
        ),
        (
            RegKey::predef(HKEY_CURRENT_USER),
            r"SOFTWARE\Valve\Steam",
            "SteamPath",
        ),
    ];

    for (root, subkey, value) in &registry_keys {
        if let Ok(path) = read_steam_registry(root, subkey, value) {
            if is_steam_dir(&path) {
                return Ok(path);
            }
        }
    }

    FALLBACK_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|path| is_steam_dir(path))
        .ok_or(SteamError::NotFound)
}

fn read_steam_registry(root: &RegKey, subkey: &str, value: &str) -> Result<PathBuf, SteamError> {
    let key = root
        .open_subkey(subkey)
        .map_err(|_| SteamError::NotFound)?;
    let install_path: String = key.get_value(value).map_err(|_| SteamError::NotFound)?;
    Ok(PathBuf::from(install_path))
}

fn is_steam_dir(path: &Path) -> bool {
    path.join("steam.exe").exists()
}
