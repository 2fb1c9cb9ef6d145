// src/settings/io.rs
//! Settings file access. Nothing here logs: settings load before the
//! subscriber exists, so callers report what was read afterwards.

use std::fs;
use std::io::{self, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use directories_next::ProjectDirs;

const QUALIFIER: &str = "";
const ORGANIZATION: &str = "";
const APPLICATION: &str = "sheetrest";
const CONFIG_FILE: &str = "settings.json";

/// `<config dir>/sheetrest/settings.json`. The directory is not created;
/// the file is optional and only ever read.
pub fn config_path() -> io::Result<PathBuf> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION)
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .ok_or_else(|| {
            io::Error::new(
                ErrorKind::NotFound,
                "Could not determine project directories for settings.",
            )
        })
}

/// Load settings from the platform config dir, with the path they came from.
/// `None` when there is no config dir or no file in it.
pub fn load_settings_from_file<T: for<'de> serde::de::Deserialize<'de>>() -> io::Result<Option<(T, PathBuf)>> {
    let Ok(path) = config_path() else {
        return Ok(None);
    };
    Ok(load_settings_from_path(&path)?.map(|settings| (settings, path)))
}

/// `None` for a missing file; a file that does not parse is `InvalidData`.
pub fn load_settings_from_path<T: for<'de> serde::de::Deserialize<'de>>(
    config_file: &Path,
) -> io::Result<Option<T>> {
    match fs::File::open(config_file) {
        Ok(file) => {
            let reader = BufReader::new(file);
            serde_json::from_reader(reader).map(Some).map_err(|e| {
                io::Error::new(
                    ErrorKind::InvalidData,
                    format!("Failed to parse settings file {:?}: {}", config_file, e),
                )
            })
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
