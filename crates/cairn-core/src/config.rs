//! Configuration system for cairn.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CAIRN_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/cairn/config.toml
//!   3. ~/.config/cairn/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::node::{NodeKey, NodeRoles};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CairnConfig {
    pub node: NodeConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Display name announced to peers. Empty = hostname.
    pub name: String,
    /// Role names this node advertises ("peer", "api").
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Operator-configured peers, registered with Static provenance at
    /// startup. Malformed entries are skipped, not fatal.
    pub static_nodes: Vec<StaticNodeEntry>,
}

/// One statically configured peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StaticNodeEntry {
    /// Ed25519 public key, hex-encoded (64 chars).
    pub public_key: String,
    pub name: String,
    /// Role names ("peer", "api"). Unknown names are ignored.
    pub roles: Vec<String>,
}

impl StaticNodeEntry {
    /// Decode the hex public key. None if it is not exactly 32 bytes.
    pub fn parse_key(&self) -> Option<NodeKey> {
        let bytes = hex::decode(&self.public_key).ok()?;
        if bytes.len() != 32 {
            return None;
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&bytes);
        Some(key)
    }

    /// Combine the recognized role names into a mask.
    pub fn parse_roles(&self) -> NodeRoles {
        parse_role_names(&self.roles)
    }
}

/// Fold recognized role names into a mask; unknown names contribute nothing.
pub fn parse_role_names(names: &[String]) -> NodeRoles {
    let mut roles = NodeRoles::NONE;
    for name in names {
        if let Some(role) = NodeRoles::from_name(name) {
            roles |= role;
        }
    }
    roles
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for CairnConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            roles: vec!["peer".to_string()],
        }
    }
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            static_nodes: Vec::new(),
        }
    }
}

impl Default for StaticNodeEntry {
    fn default() -> Self {
        Self {
            public_key: String::new(),
            name: String::new(),
            roles: Vec::new(),
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("cairn")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl CairnConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            CairnConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CAIRN_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&CairnConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CAIRN_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CAIRN_NODE__NAME") {
            self.node.name = v;
        }
        if let Ok(v) = std::env::var("CAIRN_NODE__ROLES") {
            self.node.roles = v.split(',').map(|s| s.trim().to_string()).collect();
        }
    }
}
