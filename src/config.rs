use anyhow::{Result, Context as AnyhowContext};
use serde::{Serialize, Deserialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings of the kubernetes flavor plugin, loadable from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Working directory of the certificate authority.
    pub ssl_dir: PathBuf,
    /// Location recorded for node bundles. Defaults to `ssl_dir`.
    pub bundle_prefix: Option<PathBuf>,
    /// Extra SAN address every node certificate carries (the apiserver service IP).
    pub apiserver_service_ip: String,
    pub admin_base_name: String,
    pub admin_common_name: String,
    pub node_base_name: String,
    pub node_cn_prefix: String,
    pub properties_key: String,
    pub script_timeout_secs: u64,
    pub verify_bundle: bool,
    pub shell: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            ssl_dir: PathBuf::from("ssl"),
            bundle_prefix: None,
            apiserver_service_ip: "10.3.0.1".to_string(),
            admin_base_name: "admin".to_string(),
            admin_common_name: "kube-admin".to_string(),
            node_base_name: "apiserver".to_string(),
            node_cn_prefix: "kube-apiserver-".to_string(),
            properties_key: "SSL".to_string(),
            script_timeout_secs: 120,
            verify_bundle: true,
            shell: "bash".to_string(),
        }
    }
}

impl PluginConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document means "all defaults".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn script_timeout(&self) -> Duration {
        Duration::from_secs(self.script_timeout_secs)
    }
}
