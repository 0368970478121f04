// src/infra/paths.rs — Config and data locations
//
// FRONTDESK_HOME overrides everything; otherwise config lives in ~/.frontdesk/
// and data (the SQLite session store) in XDG_DATA_HOME/frontdesk.

use directories::{BaseDirs, ProjectDirs};
use std::path::PathBuf;

fn frontdesk_home() -> Option<PathBuf> {
    std::env::var_os("FRONTDESK_HOME").map(PathBuf::from)
}

fn home_dir() -> PathBuf {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Configuration directory: $FRONTDESK_HOME/ or ~/.frontdesk/
pub fn config_dir() -> PathBuf {
    if let Some(home) = frontdesk_home() {
        return home;
    }
    home_dir().join(".frontdesk")
}

/// Data directory: $FRONTDESK_HOME/data/ or the platform data dir
pub fn data_dir() -> PathBuf {
    if let Some(home) = frontdesk_home() {
        return home.join("data");
    }
    ProjectDirs::from("", "", "frontdesk")
        .map(|p| p.data_local_dir().to_path_buf())
        .unwrap_or_else(|| config_dir().join("data"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default SQLite session database
pub fn sessions_db_path() -> PathBuf {
    data_dir().join("sessions.db")
}
