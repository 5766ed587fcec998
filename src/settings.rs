use crate::query::Dialect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_SETTINGS_PATH: &str = "settings.default.ron";
pub const OVERRIDE_SETTINGS_PATH: &str = "settings.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub database: Database,
    pub output: Output,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Database {
    pub backend: Dialect,
    /// Database file used when `backend` is sqlite.
    pub sqlite_path: PathBuf,
    /// Dotenv file holding the Postgres credentials.
    pub env_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Output {
    pub format: OutputFormat,
    pub max_rows: usize,
    pub max_cell_width: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: Database {
                backend: Dialect::Sqlite,
                sqlite_path: PathBuf::from("neovex.db"),
                env_file: PathBuf::from(".env"),
            },
            output: Output {
                format: OutputFormat::Table,
                max_rows: 50,
                max_cell_width: 40,
            },
        }
    }
}

impl Settings {
    /// Reads the settings files from the working directory.
    pub fn load() -> Settings {
        Self::load_from(
            Path::new(DEFAULT_SETTINGS_PATH),
            Path::new(OVERRIDE_SETTINGS_PATH),
        )
    }

    /// The override file replaces the defaults wholesale when it parses.
    pub fn load_from(default_path: &Path, override_path: &Path) -> Settings {
        let settings = read_ron(default_path).unwrap_or_default();
        read_ron(override_path).unwrap_or(settings)
    }
}

fn read_ron(path: &Path) -> Option<Settings> {
    if !path.exists() {
        return None;
    }
    let content = fs::read_to_string(path)
        .map_err(|e| warn!(path = %path.display(), error = %e, "unreadable settings file"))
        .ok()?;
    ron::from_str(&content)
        .map_err(|e| warn!(path = %path.display(), error = %e, "invalid settings file"))
        .ok()
}
