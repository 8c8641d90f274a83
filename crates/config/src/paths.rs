//! Path utilities

use std::path::{Path, PathBuf};

/// Data directory (~/.conductor)
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".conductor")
}

/// Config file location
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Default demo database location
pub fn database_path() -> PathBuf {
    data_dir().join("data").join("data.db")
}

/// Evaluation output directory
pub fn results_dir() -> PathBuf {
    data_dir().join("results")
}

/// Ensure directory exists
pub async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(path).await
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_live_under_data_dir() {
        let base = data_dir();
        assert!(config_path().starts_with(&base));
        assert!(database_path().starts_with(&base));
        assert!(results_dir().starts_with(&base));
        assert!(database_path().ends_with("data/data.db"));
    }

    #[test]
    fn test_expand_home_plain_path_untouched() {
        assert_eq!(expand_home("/tmp/db.sqlite"), PathBuf::from("/tmp/db.sqlite"));
        assert_eq!(expand_home("relative/db"), PathBuf::from("relative/db"));
    }

    #[test]
    fn test_expand_home_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/x/y.db"), home.join("x").join("y.db"));
        }
    }
}
