use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "typerace";
const HISTORY_FILE: &str = "history.db";
const CONFIG_FILE: &str = "config.json";

/// Where typerace keeps its files.
///
/// History lives in the XDG state dir (`~/.local/state/typerace` on Linux),
/// falling back to the local data dir where the platform has no state dir.
pub struct AppDirs;

impl AppDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("", "", APP_NAME)
    }

    pub fn history_db_path() -> Option<PathBuf> {
        let dirs = Self::project()?;
        let dir = dirs.state_dir().unwrap_or_else(|| dirs.data_local_dir());
        Some(dir.join(HISTORY_FILE))
    }

    pub fn config_path() -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_namespaced_per_app() {
        if let Some(path) = AppDirs::history_db_path() {
            assert!(path.ends_with(HISTORY_FILE));
            assert!(path.to_string_lossy().contains(APP_NAME));
        }
        if let Some(path) = AppDirs::config_path() {
            assert!(path.ends_with(CONFIG_FILE));
            assert!(path.to_string_lossy().contains(APP_NAME));
        }
    }
}
