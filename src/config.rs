use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::matcher::Tolerances;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("FACEGATE_CONFIG_PATH").unwrap_or("/usr/local/etc/facegate/config.toml"))
});

pub static DEFAULT_STORE_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(
        option_env!("FACEGATE_STORE_PATH").unwrap_or("/usr/local/etc/facegate/identities.json"),
    )
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Max distance for two captures to count as the same enrolled face
    pub strict_tolerance: f64,
    /// Max distance accepted at login
    pub lenient_tolerance: f64,
    pub store_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let tolerances = Tolerances::default();
        Self {
            strict_tolerance: tolerances.strict,
            lenient_tolerance: tolerances.lenient,
            store_path: DEFAULT_STORE_PATH.to_path_buf(),
        }
    }
}

impl Config {
    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            strict: self.strict_tolerance,
            lenient: self.lenient_tolerance,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("strict_tolerance", self.strict_tolerance),
            ("lenient_tolerance", self.lenient_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{key} must be a non-negative number, got {value}");
            }
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config at {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validating config {}", path.display()))?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(Some(&tmp.path().join("absent.toml"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.tolerances(), Tolerances::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "lenient_tolerance = 0.45\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.lenient_tolerance, 0.45);
        assert_eq!(cfg.strict_tolerance, 0.5);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "strict_tolerance = -0.1\n").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("etc").join("config.toml");
        let cfg = Config {
            strict_tolerance: 0.4,
            lenient_tolerance: 0.55,
            store_path: tmp.path().join("ids.json"),
        };
        save_config(&cfg, Some(&path)).unwrap();
        assert_eq!(load_config(Some(&path)).unwrap(), cfg);
    }
}
