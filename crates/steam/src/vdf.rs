//! Text VDF reader for `steamapps/libraryfolders.vdf`.
//!
//! Only the quoted-string token stream is needed: every value that follows
//! a `"path"` key is a library root. Nesting braces are ignored.

use std::fs;
use std::path::{Path, PathBuf};

use crate::SteamError;

/// Reads `libraryfolders.vdf` and returns the library roots it lists.
pub fn load_library_folders(path: &Path) -> Result<Vec<PathBuf>, SteamError> {
    let data = fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            SteamError::NotFound
        } else {
            SteamError::Io(format!("failed to read {}: {e}", path.display()))
        }
    })?;
    Ok(parse_library_folders(&String::from_utf8_lossy(&data)))
}

/// Extracts library roots from text VDF content.
pub fn parse_library_folders(text: &str) -> Vec<PathBuf> {
    let tokens = quoted_strings(text);
    tokens
        .windows(2)
        .filter(|pair| pair[0].eq_ignore_ascii_case("path"))
        .map(|pair| PathBuf::from(&pair[1]))
        .collect()
}

/// Returns every `"..."` token in order, with `\\` and `\"` unescaped.
fn quoted_strings(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c != '"' {
            continue;
        }

        let mut token = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => match chars.next() {
                    Some(next @ ('\\' | '"')) => token.push(next),
                    Some(other) => {
                        token.push('\\');
                        token.push(other);
                    }
                    None => token.push('\\'),
                },
                _ => token.push(c),
            }
        }

        // An unterminated trailing token is dropped.
        if closed {
            tokens.push(token);
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
"libraryfolders"
{
	"0"
	{
		"path"		"C:\\Program Files (x86)\\Steam"
		"label"		""
		"apps"
		{
			"440"		"27415616543"
		}
	}
	"1"
	{
		"path"		"D:\\SteamLibrary"
	}
}
"#;

    #[test]
    fn parses_paths_and_unescapes() {
        let libs = parse_library_folders(SAMPLE);
        assert_eq!(
            libs,
            vec![
                PathBuf::from(r"C:\Program Files (x86)\Steam"),
                PathBuf::from(r"D:\SteamLibrary"),
            ]
        );
    }

    #[test]
    fn path_key_is_case_insensitive() {
        let libs = parse_library_folders(r#""PATH" "/mnt/games""#);
        assert_eq!(libs, vec![PathBuf::from("/mnt/games")]);
    }

    #[test]
    fn lone_backslash_is_kept() {
        let tokens = quoted_strings(r#""E:\Games""#);
        assert_eq!(tokens, vec![r"E:\Games".to_string()]);
    }

    #[test]
    fn empty_and_garbage_input() {
        assert!(parse_library_folders("").is_empty());
        assert!(parse_library_folders("{{{ }}} no quotes here").is_empty());
        assert!(parse_library_folders(r#""path""#).is_empty());
        assert!(parse_library_folders(r#""path" "/unterminated"#).is_empty());
    }

    #[test]
    fn load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let result = load_library_folders(&tmp.path().join("libraryfolders.vdf"));
        assert!(matches!(result, Err(SteamError::NotFound)));
    }

    #[test]
    fn load_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("libraryfolders.vdf");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_library_folders(&path).unwrap().len(), 2);
    }
}
