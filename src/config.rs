//! Configuration management for the peerip daemon.
//!
//! The config is a TOML file with `node`, `network`, `discovery` and
//! `logging` sections. Discovery tunables left out of the file fall back to
//! the defaults of the selected network profile.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::network::ip_discovery::DiscoveryParams;
use crate::network_type::NetworkType;

/// Get the platform-specific data directory for peerip
pub fn get_data_dir() -> PathBuf {
    if cfg!(windows) {
        // Windows: %APPDATA%\peerip
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("peerip")
    } else {
        // Linux/Mac: ~/.peerip
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".peerip")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub node: NodeConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    "testnet".to_string()
}

impl NodeConfig {
    pub fn network_type(&self) -> NetworkType {
        match self.network.to_lowercase().as_str() {
            "mainnet" => NetworkType::Mainnet,
            "devnet" => NetworkType::Devnet,
            _ => NetworkType::Testnet,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub listen_address: String,
    /// Manually configured public address; when set, discovery is skipped
    #[serde(default)]
    pub external_address: Option<String>,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

impl NetworkConfig {
    pub fn full_listen_address(&self, network_type: &NetworkType) -> String {
        if self.listen_address.contains(':') {
            self.listen_address.clone()
        } else {
            format!(
                "{}:{}",
                self.listen_address,
                network_type.default_p2p_port()
            )
        }
    }

    /// The configured external address, if any, with whitespace removed
    pub fn configured_external_address(&self) -> Option<&str> {
        self.external_address
            .as_deref()
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub min_peers_for_ip_discovery: Option<usize>,
    #[serde(default)]
    pub peer_discovery_retry_interval_ms: Option<u64>,
    #[serde(default)]
    pub conn_std_deadline_secs: Option<u64>,
}

impl DiscoveryConfig {
    pub fn resolve(&self, network_type: &NetworkType) -> DiscoveryParams {
        DiscoveryParams {
            min_peers_for_ip_discovery: self
                .min_peers_for_ip_discovery
                .unwrap_or_else(|| network_type.min_peers_for_ip_discovery()),
            peer_discovery_retry_interval: self
                .peer_discovery_retry_interval_ms
                .map(Duration::from_millis)
                .unwrap_or_else(|| network_type.peer_discovery_retry_interval()),
            conn_std_deadline: self
                .conn_std_deadline_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| network_type.conn_std_deadline()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// "pretty" or "json"
    pub format: String,
    /// "stdout" or "file"
    pub output: String,
    #[serde(default)]
    pub file_path: String,
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, AppError> {
        let contents = fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| AppError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), AppError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Load the config at `path`, writing the defaults there first if the
    /// file does not exist yet.
    pub fn load_or_create(path: &str) -> Result<Self, AppError> {
        if fs::metadata(path).is_ok() {
            return Self::load_from_file(path);
        }

        let config = Self::default();
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        config.save_to_file(path)?;
        tracing::info!("📝 Created default config at {}", path);
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.discovery.min_peers_for_ip_discovery == Some(0) {
            return Err(AppError::Config(
                "discovery.min_peers_for_ip_discovery must be at least 1".to_string(),
            ));
        }
        if self.discovery.peer_discovery_retry_interval_ms == Some(0) {
            return Err(AppError::Config(
                "discovery.peer_discovery_retry_interval_ms must be positive".to_string(),
            ));
        }
        if self.discovery.conn_std_deadline_secs == Some(0) {
            return Err(AppError::Config(
                "discovery.conn_std_deadline_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig {
                name: "peerip node".to_string(),
                network: default_network(),
            },
            network: NetworkConfig {
                listen_address: "0.0.0.0".to_string(),
                external_address: None,
                bootstrap_peers: vec![],
            },
            discovery: DiscoveryConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
                output: "stdout".to_string(),
                file_path: get_data_dir().join("logs").to_string_lossy().to_string(),
            },
        }
    }
}
