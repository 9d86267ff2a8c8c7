use anyhow::{Context, Result};
use formwork_config::{ConfigLoader, FormworkConfig};
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "formwork.toml";

/// Load the effective configuration
///
/// An explicit path must exist. Without one, `./formwork.toml` is used when
/// present and built-in defaults otherwise.
pub async fn load(path: Option<&Path>) -> Result<FormworkConfig> {
    let path: Option<PathBuf> = match path {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
            candidate.exists().then_some(candidate)
        }
    };

    let Some(path) = path else {
        return Ok(FormworkConfig::default());
    };

    ConfigLoader::load_from_file(&path)
        .await
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_path_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formwork.toml");
        std::fs::write(&path, "[render]\nlocale = \"de\"\n").unwrap();

        let config = load(Some(&path)).await.unwrap();
        assert_eq!(config.render.locale, "de");
    }

    #[tokio::test]
    async fn test_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(Some(&dir.path().join("absent.toml"))).await.unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }

    #[tokio::test]
    async fn test_invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("formwork.json");
        std::fs::write(&path, r#"{"undo": {"max_history": 0}}"#).unwrap();
        assert!(load(Some(&path)).await.is_err());
    }
}
