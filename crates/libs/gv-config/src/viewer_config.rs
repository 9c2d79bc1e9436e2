//! Viewer configuration types.

use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use gv_store::{resolver::PathCase, store::RunStore};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::prelude::*;

/// Storage root used when nothing else is configured.
pub const DEFAULT_STORAGE_ROOT: &str = "comfyui_api_outputs";
/// Address the HTTP server listens on by default.
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
/// One year; run artifacts never change once written.
pub const DEFAULT_IMAGE_MAX_AGE_S: u64 = 31_536_000;

/// Environment variable overriding the storage root.
pub const ENV_STORAGE_ROOT: &str = "COMFYUI_OUT_DIR";
/// Environment variable overriding the bind address.
pub const ENV_BIND: &str = "GV_BIND";
/// Environment variable overriding the path case policy.
pub const ENV_PATH_CASE: &str = "GV_PATH_CASE";

/// Where runs live and how paths below it are compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per run.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Case policy for the confinement check.
    #[serde(default)]
    pub path_case: PathCase,
    /// Upper bound on threads checking run directories while listing.
    #[serde(default = "default_fan_out")]
    pub scan_fan_out: usize,
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:3000`.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// `max-age` sent with image responses.
    #[serde(default = "default_image_max_age_s")]
    pub image_max_age_s: u64,
}

/// Complete viewer configuration. Missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_STORAGE_ROOT)
}

fn default_fan_out() -> usize {
    gv_store::allowlist::DEFAULT_SCAN_FAN_OUT
}

fn default_bind() -> String {
    String::from(DEFAULT_BIND)
}

fn default_image_max_age_s() -> u64 {
    DEFAULT_IMAGE_MAX_AGE_S
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            path_case: PathCase::default(),
            scan_fan_out: default_fan_out(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            image_max_age_s: default_image_max_age_s(),
        }
    }
}

impl StorageConfig {
    /// Open a [`RunStore`] over the configured root.
    pub fn open(&self) -> RunStore {
        RunStore::new(&self.root)
            .with_path_case(self.path_case)
            .with_scan_fan_out(self.scan_fan_out)
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|_| Error::InvalidBind(self.bind.clone()))
    }
}

impl ViewerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(file_path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(file_path)?;
        let config = Self::from_toml(&contents)?;
        info!("Loaded configuration from {}", file_path.display());
        Ok(config)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(value: &str) -> Result<Self> {
        let config: Self = toml::from_str(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `COMFYUI_OUT_DIR`, `GV_BIND` and `GV_PATH_CASE`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the environment keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(root) = lookup(ENV_STORAGE_ROOT).filter(|value| !value.trim().is_empty()) {
            config.storage.root = PathBuf::from(root.trim());
        }
        if let Some(bind) = lookup(ENV_BIND) {
            config.server.bind = bind.trim().to_string();
        }
        if let Some(path_case) = lookup(ENV_PATH_CASE) {
            config.storage.path_case = parse_path_case(&path_case)?;
        }
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot check on its own.
    pub fn validate(&self) -> Result<()> {
        if self.storage.scan_fan_out == 0 {
            return Err(Error::InvalidFanOut);
        }
        self.server.bind_addr()?;
        Ok(())
    }
}

/// Parse a path case policy name.
pub fn parse_path_case(value: &str) -> Result<PathCase> {
    match value.trim().to_ascii_lowercase().as_str() {
        "sensitive" => Ok(PathCase::Sensitive),
        "insensitive" => Ok(PathCase::Insensitive),
        _ => Err(Error::InvalidPathCase(value.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    pub fn deserialize() -> Result<()> {
        let content = r#"
            # Grid viewer configuration

            [storage]
            root = "/srv/comfyui_api_outputs"
            path_case = "insensitive"
            scan_fan_out = 4

            [server]
            bind = "0.0.0.0:8080"
            image_max_age_s = 3600
        "#;
        let config = ViewerConfig::from_toml(content)?;
        assert_eq!(config.storage.root, PathBuf::from("/srv/comfyui_api_outputs"));
        assert_eq!(config.storage.path_case, PathCase::Insensitive);
        assert_eq!(config.storage.scan_fan_out, 4);
        assert_eq!(config.server.bind_addr()?.port(), 8080);
        assert_eq!(config.server.image_max_age_s, 3600);
        Ok(())
    }

    #[test]
    fn missing_sections_take_defaults() -> Result<()> {
        let config = ViewerConfig::from_toml("")?;
        assert_eq!(config, ViewerConfig::default());

        let config = ViewerConfig::from_toml("[server]\nimage_max_age_s = 5\n")?;
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.storage.root, PathBuf::from(DEFAULT_STORAGE_ROOT));
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            ViewerConfig::from_toml("[storage]\nscan_fan_out = 0\n"),
            Err(Error::InvalidFanOut)
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[server]\nbind = \"localhost\"\n"),
            Err(Error::InvalidBind(_))
        ));
        assert!(matches!(
            ViewerConfig::from_toml("[storage]\npath_case = \"sometimes\"\n"),
            Err(Error::Deserialization(_))
        ));
    }

    #[test]
    fn environment_overrides() -> Result<()> {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_STORAGE_ROOT, " /data/runs "),
            (ENV_BIND, "127.0.0.1:0"),
            (ENV_PATH_CASE, "Insensitive"),
        ]);
        let config = ViewerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()))?;
        assert_eq!(config.storage.root, PathBuf::from("/data/runs"));
        assert_eq!(config.server.bind, "127.0.0.1:0");
        assert_eq!(config.storage.path_case, PathCase::Insensitive);

        let config = ViewerConfig::from_lookup(|_| None)?;
        assert_eq!(config, ViewerConfig::default());

        assert!(matches!(
            ViewerConfig::from_lookup(|key| (key == ENV_PATH_CASE).then(|| String::from("maybe"))),
            Err(Error::InvalidPathCase(_))
        ));
        Ok(())
    }

    #[test]
    fn from_file_reads_toml() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gvd.toml");
        std::fs::write(&path, "[storage]\nroot = \"runs\"\n")?;
        let config = ViewerConfig::from_file(&path)?;
        assert_eq!(config.storage.open().root(), Path::new("runs"));
        Ok(())
    }
}
