use super::VaultConfig;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Load configuration from the given path, falling back to defaults on error.
pub fn load_config(path: &Path) -> VaultConfig {
    let contents = match fs::read_to_string(path) {
        Ok(data) => {
            info!(path = %path.display(), "Loaded base config");
            data
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                "Falling back to default config: {err}"
            );
            return VaultConfig::default();
        }
    };

    match parse_config(&contents) {
        Ok(cfg) => {
            debug!("Parsed configuration from disk");
            cfg
        }
        Err(err) => {
            warn!(path = %path.display(), "Invalid config TOML: {err}");
            VaultConfig::default()
        }
    }
}

pub fn parse_config(contents: &str) -> Result<VaultConfig, toml::de::Error> {
    toml::from_str(contents)
}

pub fn serialize_config(config: &VaultConfig) -> Result<String, toml::ser::Error> {
    toml::to_string(config)
}
