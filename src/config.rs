//! Configuration Management
//!
//! Handles persistent configuration storage for cloudgraph.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_WORKERS: usize = 16;

const IN_CLUSTER_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const IN_CLUSTER_CA_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const IN_CLUSTER_NAME: &str = "in-cluster";

/// Connection settings for one Kubernetes cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct KubernetesConfig {
    /// API server URL
    pub server: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// File holding the bearer token (read when `token` is unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_file: Option<PathBuf>,
    /// PEM bundle trusted in addition to the built-in roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_file: Option<PathBuf>,
    /// Name the cluster node gets; defaults to the server host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_name: Option<String>,
}

impl KubernetesConfig {
    pub fn effective_cluster_name(&self) -> String {
        self.cluster_name.clone().unwrap_or_else(|| {
            url::Url::parse(&self.server)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .unwrap_or_else(|| self.server.clone())
        })
    }

    /// Bearer token, reading `token_file` if needed
    pub fn effective_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.token_file {
            Some(path) => read_token(path).map(Some),
            None => Ok(None),
        }
    }

    /// Contents of `ca_file`, if one is set
    pub fn ca_pem(&self) -> Result<Option<Vec<u8>>> {
        self.ca_file
            .as_ref()
            .map(|path| {
                std::fs::read(path)
                    .with_context(|| format!("Failed to read CA file {}", path.display()))
            })
            .transpose()
    }
}

fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read token file {}", path.display()))?;
    Ok(token.trim().to_string())
}

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// AWS regions to collect
    #[serde(default)]
    pub regions: Vec<String>,
    /// Endpoint override for all AWS services
    #[serde(default)]
    pub aws_endpoint: Option<String>,
    /// Bearer token for a signing proxy or emulator
    #[serde(default)]
    pub aws_token: Option<String>,
    #[serde(default)]
    pub kubernetes: Option<KubernetesConfig>,
    /// Worker pool size
    #[serde(default)]
    pub workers: Option<usize>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudgraph").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective regions (CLI > config > environment > default)
    pub fn effective_regions(&self, cli: &[String]) -> Vec<String> {
        if !cli.is_empty() {
            return cli.to_vec();
        }
        if !self.regions.is_empty() {
            return self.regions.clone();
        }
        std::env::var("AWS_REGION")
            .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
            .ok()
            .filter(|r| !r.is_empty())
            .map(|r| vec![r])
            .unwrap_or_else(|| vec![DEFAULT_REGION.to_string()])
    }

    /// Get effective worker count (CLI > config > default)
    pub fn effective_workers(&self, cli: Option<usize>) -> usize {
        cli.or(self.workers).unwrap_or(DEFAULT_WORKERS).max(1)
    }

    /// Get effective cluster (config > in-cluster environment)
    pub fn effective_kubernetes(&self) -> Option<KubernetesConfig> {
        if let Some(kubernetes) = &self.kubernetes {
            return Some(kubernetes.clone());
        }

        in_cluster(
            std::env::var("KUBERNETES_SERVICE_HOST").ok(),
            std::env::var("KUBERNETES_SERVICE_PORT").ok(),
        )
    }

    /// Set regions and save
    pub fn set_regions(&mut self, regions: Vec<String>) -> Result<()> {
        self.regions = regions;
        self.save()
    }
}

/// Service-account settings of a pod, given the service host and port
fn in_cluster(host: Option<String>, port: Option<String>) -> Option<KubernetesConfig> {
    let host = host.filter(|h| !h.is_empty())?;
    let port = port.filter(|p| !p.is_empty()).unwrap_or_else(|| "443".to_string());
    Some(KubernetesConfig {
        server: format!("https://{}:{}", host, port),
        token: None,
        token_file: Some(PathBuf::from(IN_CLUSTER_TOKEN_FILE)),
        ca_file: Some(PathBuf::from(IN_CLUSTER_CA_FILE)),
        cluster_name: Some(IN_CLUSTER_NAME.to_string()),
    })
}
