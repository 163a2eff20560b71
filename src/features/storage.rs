use std::path::{Path, PathBuf};

#[cfg(test)]
use std::sync::{Mutex, OnceLock};

pub const DATA_DIR_ENV: &str = "GANYMEDE_DATA_DIR";
const HISTORY_DB_FILE: &str = "history.db";
const PREFERENCES_FILE: &str = "preferences.json";

#[cfg(test)]
pub fn test_env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Picks the first usable directory: the env override, the directory handed
/// over by the app, the Android app-data locations, then the system temp dir.
pub fn resolve_data_dir(preferred: Option<&Path>) -> PathBuf {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Ok(custom) = std::env::var(DATA_DIR_ENV) {
        if !custom.trim().is_empty() {
            candidates.push(PathBuf::from(custom));
        }
    }
    if let Some(dir) = preferred {
        candidates.push(dir.to_path_buf());
    }
    candidates.push(PathBuf::from("/data/user/0/com.joviansapps.ganymede/files"));
    candidates.push(PathBuf::from("/data/data/com.joviansapps.ganymede/files"));

    for dir in candidates {
        if ensure_dir(&dir) {
            return dir;
        }
    }
    std::env::temp_dir()
}

fn ensure_dir(dir: &Path) -> bool {
    match std::fs::metadata(dir) {
        Ok(meta) => meta.is_dir(),
        Err(_) => std::fs::create_dir_all(dir).is_ok(),
    }
}

pub fn history_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(HISTORY_DB_FILE)
}

pub fn preferences_path(data_dir: &Path) -> PathBuf {
    data_dir.join(PREFERENCES_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins() {
        let _guard = test_env_lock().lock().unwrap_or_else(|e| e.into_inner());
        let env_dir = tempfile::tempdir().unwrap();
        let preferred = tempfile::tempdir().unwrap();
        std::env::set_var(DATA_DIR_ENV, env_dir.path());
        let resolved = resolve_data_dir(Some(preferred.path()));
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(resolved, env_dir.path());
    }

    #[test]
    fn preferred_dir_is_created() {
        let _guard = test_env_lock().lock().unwrap_or_else(|e| e.into_inner());
        std::env::remove_var(DATA_DIR_ENV);
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("files");
        let resolved = resolve_data_dir(Some(&nested));
        assert_eq!(resolved, nested);
        assert!(nested.is_dir());
        assert_eq!(history_db_path(&resolved), nested.join("history.db"));
        assert_eq!(preferences_path(&resolved), nested.join("preferences.json"));
    }
}
