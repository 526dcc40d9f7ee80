//! Configuration loading from enumcheck.toml.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

/// Main configuration structure for enumcheck.toml.
#[derive(Debug, Deserialize, Default)]
pub struct EnumcheckConfig {
    /// List of class names or patterns to ignore.
    pub ignore: Option<Vec<String>>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// Output format configuration.
#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    /// Output format: "plain" or "json".
    pub format: Option<String>,
}

/// Loads configuration from enumcheck.toml if it exists.
pub fn load_config(root: &Path) -> Result<Option<EnumcheckConfig>> {
    let path = root.join("enumcheck.toml");
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let cfg = toml::from_str(&content).context("Invalid enumcheck.toml")?;
    Ok(Some(cfg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_none() {
        let dir = std::env::temp_dir().join(format!("enumcheck_cfg_none_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        assert!(load_config(&dir).unwrap().is_none());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_fields() {
        let dir = std::env::temp_dir().join(format!("enumcheck_cfg_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("enumcheck.toml"),
            "ignore = [\"com/generated/*\"]\n[output]\nformat = \"json\"\n",
        )
        .unwrap();

        let cfg = load_config(&dir).unwrap().expect("config present");
        assert_eq!(cfg.ignore.as_deref(), Some(&["com/generated/*".to_string()][..]));
        assert_eq!(
            cfg.output.and_then(|o| o.format).as_deref(),
            Some("json")
        );
        fs::remove_dir_all(&dir).ok();
    }
}
