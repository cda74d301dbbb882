//! Node configuration.
//!
//! A node reads one TOML file:
//!
//! ```toml
//! [node]
//! name = "merge"
//!
//! [network]
//! listen_port = 5001
//! next_hop = "127.0.0.1:5002"
//!
//! [files]
//! data_file = "students.txt"
//! output_file = "grades.txt"
//! ```
//!
//! Only `[node] name` is mandatory. Without `next_hop` the node is the end
//! of the pipeline and surviving packages are dropped after the chain.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node: NodeSection,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub files: FileSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSection {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSection {
    /// Local UDP port; 0 picks an ephemeral one.
    #[serde(default)]
    pub listen_port: u16,
    /// `host:port` of the downstream node.
    #[serde(default)]
    pub next_hop: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileSection {
    #[serde(default)]
    pub data_file: Option<PathBuf>,
    #[serde(default)]
    pub output_file: Option<PathBuf>,
}

impl NodeConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: NodeSection { name: name.into() },
            network: NetworkSection::default(),
            files: FileSection::default(),
        }
    }

    pub fn with_listen_port(mut self, port: u16) -> Self {
        self.network.listen_port = port;
        self
    }

    pub fn with_next_hop(mut self, next_hop: impl Into<String>) -> Self {
        self.network.next_hop = Some(next_hop.into());
        self
    }

    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.data_file = Some(path.into());
        self
    }

    pub fn with_output_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.output_file = Some(path.into());
        self
    }

    pub fn from_toml_str(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: NodeConfig = toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.name.trim().is_empty() {
            return Err(ConfigError::Invalid("node name must not be empty".into()));
        }
        if let Some(hop) = &self.network.next_hop {
            let valid = hop
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
            if !valid {
                return Err(ConfigError::Invalid(format!(
                    "next_hop must be host:port, got {hop:?}"
                )));
            }
        }
        Ok(())
    }

    /// Look up a setting by its dotted name, e.g. `files.data_file`.
    pub fn setting(&self, name: &str) -> Option<String> {
        match name {
            "node.name" => Some(self.node.name.clone()),
            "network.listen_port" => Some(self.network.listen_port.to_string()),
            "network.next_hop" => self.network.next_hop.clone(),
            "files.data_file" => self.files.data_file.as_ref().map(|p| p.display().to_string()),
            "files.output_file" => self
                .files
                .output_file
                .as_ref()
                .map(|p| p.display().to_string()),
            _ => None,
        }
    }
}

/// Source of node configurations.
pub trait ConfigLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<NodeConfig, ConfigError>;
}

/// Reads and validates a TOML file from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlConfigLoader;

impl ConfigLoader for TomlConfigLoader {
    fn load(&self, path: &Path) -> Result<NodeConfig, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        NodeConfig::from_toml_str(&source, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_only_needs_a_name() {
        let config = NodeConfig::from_toml_str("[node]\nname = \"solo\"\n", Path::new("t")).unwrap();
        assert_eq!(config.node.name, "solo");
        assert_eq!(config.network.listen_port, 0);
        assert!(config.network.next_hop.is_none());
        assert!(config.files.data_file.is_none());
    }

    #[test]
    fn next_hop_must_carry_a_port() {
        let config = NodeConfig::new("n").with_next_hop("localhost");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        let config = NodeConfig::new("n").with_next_hop("localhost:99999");
        assert!(config.validate().is_err());
        let config = NodeConfig::new("n").with_next_hop("[::1]:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(NodeConfig::new("  ").validate().is_err());
    }

    #[test]
    fn settings_by_dotted_name() {
        let config = NodeConfig::new("grading")
            .with_listen_port(5003)
            .with_data_file("in.txt");
        assert_eq!(config.setting("node.name").as_deref(), Some("grading"));
        assert_eq!(config.setting("network.listen_port").as_deref(), Some("5003"));
        assert_eq!(config.setting("files.data_file").as_deref(), Some("in.txt"));
        assert_eq!(config.setting("files.output_file"), None);
        assert_eq!(config.setting("no.such"), None);
    }
}
