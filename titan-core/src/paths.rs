use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "titan_games.toml";
pub const LOG_FILE: &str = "titan.log";
pub const LOCK_FILE: &str = "launch.lock";

pub fn titan_root(home: &Path) -> PathBuf {
    home.join(".titan")
}

pub fn config_path(home: &Path) -> PathBuf {
    titan_root(home).join(CONFIG_FILE)
}

pub fn log_path(home: &Path) -> PathBuf {
    titan_root(home).join(LOG_FILE)
}

pub fn lock_path(home: &Path) -> PathBuf {
    titan_root(home).join(LOCK_FILE)
}
