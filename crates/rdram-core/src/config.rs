//! TOML configuration
//!
//! Every section is optional; a missing file means defaults.
//!
//! ```toml
//! title = "Super Mario 64"
//!
//! [process]
//! name = "mupen64plus"
//!
//! [discovery]
//! method = "signature-then-heuristic"
//!
//! [input]
//! controller_address = 0x7f3a_2000_1000
//!
//! [[titles]]
//! id = "mk64-us"
//! name = "Mario Kart 64"
//! addresses = { coins = 0x8016_0000 }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::discovery::DiscoveryConfig;
use crate::error::{Error, Result};
use crate::input::DirectInputConfig;
use crate::profile::{ProfileRegistry, TitleDefinition};

pub const DEFAULT_PROCESS_NAME: &str = "mupen64plus";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    /// Executable name fragment used when no pid is given
    pub name: String,
    pub pid: Option<u32>,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROCESS_NAME.to_string(),
            pid: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Free-text title resolved against the profile registry
    pub title: Option<String>,
    /// Exported profile applied on top of the title's table
    pub profile: Option<PathBuf>,
    pub process: ProcessConfig,
    pub discovery: DiscoveryConfig,
    pub input: DirectInputConfig,
    /// Extra titles, matched after the built-in ones
    pub titles: Vec<TitleDefinition>,
}

impl BridgeConfig {
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        debug!("Loaded config from {}", path.as_ref().display());
        Self::from_toml(&content)
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        match Self::load(&path) {
            Err(e) if e.is_not_found() => {
                warn!(
                    "Config file {} not found, using defaults",
                    path.as_ref().display()
                );
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn registry(&self) -> Result<ProfileRegistry> {
        ProfileRegistry::with_definitions(&self.titles)
    }

    fn validate(&self) -> Result<()> {
        let discovery = &self.discovery;
        if discovery.min_size == 0 || discovery.min_size > discovery.max_size {
            return Err(Error::Config(format!(
                "discovery size band {:#x}-{:#x} is empty",
                discovery.min_size, discovery.max_size
            )));
        }
        if discovery.poll_interval_ms == 0 {
            return Err(Error::Config(
                "discovery.poll_interval_ms must be positive".to_string(),
            ));
        }
        self.input.check_stride()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::DiscoveryMethod;
    use crate::profile::Field;
    use tempfile::tempdir;

    #[test]
    fn test_empty_config_is_default() {
        let config = BridgeConfig::from_toml("").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.process.name, DEFAULT_PROCESS_NAME);
        assert_eq!(
            config.discovery.method,
            DiscoveryMethod::SignatureThenHeuristic
        );
    }

    #[test]
    fn test_full_config() {
        let config = BridgeConfig::from_toml(
            r#"
            title = "Mario Kart 64"

            [process]
            pid = 4242

            [discovery]
            method = "heuristic"
            max_size = 0x800000

            [input]
            controller_address = 0x7f3a20001000
            stride = 8

            [[titles]]
            id = "mk64-us"
            name = "Mario Kart 64"
            aliases = ["mk64"]
            addresses = { coins = 0x80160000 }
            "#,
        )
        .unwrap();

        assert_eq!(config.process.pid, Some(4242));
        assert_eq!(config.process.name, DEFAULT_PROCESS_NAME);
        assert_eq!(config.discovery.method, DiscoveryMethod::Heuristic);
        assert_eq!(config.discovery.max_size, 0x80_0000);
        assert_eq!(config.discovery.min_size, DiscoveryConfig::default().min_size);
        assert_eq!(config.input.controller_address, Some(0x7f3a_2000_1000));
        assert_eq!(config.input.stride, 8);

        let registry = config.registry().unwrap();
        let table = registry.table_for(config.title.as_deref().unwrap());
        assert_eq!(table.get(Field::Coins), 0x8016_0000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            BridgeConfig::from_toml("[discovery]\nmin_size = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml("[input]\nstride = 0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml("[input]\ncontroller_address = 0x9000\nstride = 2"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            BridgeConfig::from_toml("[discovery]\nmethod = \"guess\""),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let config = BridgeConfig::load_or_default(dir.path().join("rdram.toml")).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rdram.toml");
        fs::write(&path, "title = \"sm64\"\n").unwrap();

        let config = BridgeConfig::load(&path).unwrap();
        assert_eq!(config.title.as_deref(), Some("sm64"));
    }
}
