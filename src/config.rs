// Configuration for the verifier: JSON file, then .env / environment overrides

use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::digest::Digest;
use crate::error::{MerkleError, Result};
use crate::registry::{Principal, RootRegistry};

pub const ENV_CONFIG_PATH: &str = "MERKLE_VERIFIER_CONFIG";
pub const ENV_AUTHORIZED_PRINCIPAL: &str = "MERKLE_AUTHORIZED_PRINCIPAL";
pub const ENV_GENESIS_ROOT: &str = "MERKLE_GENESIS_ROOT";
pub const ENV_IDENTIFIER_ENCODING: &str = "MERKLE_IDENTIFIER_ENCODING";
pub const ENV_LOG_LEVEL: &str = "MERKLE_LOG_LEVEL";

/// How transaction identifiers read from input are turned into bytes.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierEncoding {
    /// `0x`-prefixed (or bare) hex, decoded before hashing
    Hex,
    /// UTF-8 text hashed as-is
    Raw,
}

impl Default for IdentifierEncoding {
    fn default() -> Self {
        IdentifierEncoding::Hex
    }
}

impl std::str::FromStr for IdentifierEncoding {
    type Err = MerkleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hex" => Ok(IdentifierEncoding::Hex),
            "raw" => Ok(IdentifierEncoding::Raw),
            other => Err(MerkleError::Config(format!(
                "unknown identifier encoding '{}' (expected hex or raw)",
                other
            ))),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    /// The only principal allowed to replace the registry root
    #[serde(default)]
    pub authorized_principal: String,
    #[serde(default)]
    pub genesis_root: Option<Digest>,
    #[serde(default)]
    pub identifier_encoding: IdentifierEncoding,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            authorized_principal: String::new(),
            genesis_root: None,
            identifier_encoding: IdentifierEncoding::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Defaults, then the config file, then `.env` and process environment.
    ///
    /// An explicitly given path must exist; the default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = get_config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        dotenvy::dotenv().ok();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            MerkleError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&json)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Apply `MERKLE_*` overrides from `lookup` (the environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(principal) = lookup(ENV_AUTHORIZED_PRINCIPAL) {
            self.authorized_principal = principal;
        }
        if let Some(root) = lookup(ENV_GENESIS_ROOT) {
            self.genesis_root = if root.trim().is_empty() {
                None
            } else {
                Some(Digest::from_hex(&root).map_err(|e| {
                    MerkleError::Config(format!("{}: {}", ENV_GENESIS_ROOT, e))
                })?)
            };
        }
        if let Some(encoding) = lookup(ENV_IDENTIFIER_ENCODING) {
            self.identifier_encoding = encoding.parse()?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.authorized_principal.trim().is_empty() {
            return Err(MerkleError::Config(format!(
                "authorized_principal is not set (config file or {})",
                ENV_AUTHORIZED_PRINCIPAL
            )));
        }
        Ok(())
    }

    /// Registry guarded by the configured principal, seeded with the genesis root if any.
    pub fn build_registry(&self) -> Result<RootRegistry> {
        self.validate()?;
        let principal = Principal::new(self.authorized_principal.as_str());
        Ok(match self.genesis_root {
            Some(genesis) => RootRegistry::with_genesis(principal, genesis),
            None => RootRegistry::new(principal),
        })
    }
}

pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return PathBuf::from(path);
    }
    let home = if cfg!(windows) {
        std::env::var("USERPROFILE").unwrap_or_else(|_| "C:\\Users\\Default".to_string())
    } else {
        std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string())
    };
    PathBuf::from(home)
        .join(".merkle_verifier")
        .join("config.json")
}
