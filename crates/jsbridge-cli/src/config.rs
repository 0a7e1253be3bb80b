//! Configuration file parsing for jsbridge.toml.

use jsbridge::BridgeConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Config file names, in lookup order
const CONFIG_NAMES: &[&str] = &["jsbridge.toml", ".jsbridgerc.toml"];

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Engine settings for every context the CLI creates
    #[serde(default)]
    pub runtime: BridgeConfig,
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return read_config(path);
    }

    let cwd = std::env::current_dir()?;
    match find_config_file(&cwd) {
        Some(path) => read_config(&path),
        None => Ok(Config::default()),
    }
}

fn read_config(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Search for a config file in `start` and its parent directories.
fn find_config_file(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);
    while let Some(current) = dir {
        for name in CONFIG_NAMES {
            let path = current.join(name);
            if path.exists() {
                return Some(path);
            }
        }
        dir = current.parent();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_table() {
        let config: Config = toml::from_str(
            r#"
            [runtime]
            memory_limit = 67108864
            strict = true
            "#,
        )
        .unwrap();
        assert_eq!(config.runtime.memory_limit, Some(64 * 1024 * 1024));
        assert!(config.runtime.strict);
        assert!(config.runtime.timezone_trampoline);
    }

    #[test]
    fn test_empty_file() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.runtime, BridgeConfig::default());
    }

    #[test]
    fn test_find_in_parent() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join("jsbridge.toml"), "[runtime]\nstrict = true\n").unwrap();

        let found = find_config_file(&nested).unwrap();
        assert_eq!(found, root.path().join("jsbridge.toml"));
        assert!(read_config(&found).unwrap().runtime.strict);
    }

    #[test]
    fn test_explicit_missing_file() {
        let root = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&root.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_parse_error_names_file() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("jsbridge.toml");
        std::fs::write(&path, "[runtime]\nstrict = \"yes\"\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("jsbridge.toml"));
    }
}
