//! Keychain implementation for credential management

use super::{Anonymous, AuthConfig, Authenticator, ConfigAuthenticator, DockerAuthEntry, DockerConfig};
use crate::reference::is_default_registry;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Server URL Docker Hub credentials are stored under by `docker login`
const DOCKER_HUB_SERVER_URL: &str = "https://index.docker.io/v1/";

/// Trait for types that can resolve authentication for a registry domain
pub trait Keychain: Send + Sync {
    fn resolve(&self, registry: &str) -> Result<Box<dyn Authenticator>>;
}

/// Keychain backed by Docker config files and credential helpers.
///
/// The config is read on first use and never reloaded.
pub struct DefaultKeychain {
    paths: Vec<PathBuf>,
    config: OnceLock<DockerConfig>,
}

impl DefaultKeychain {
    pub fn new() -> Self {
        Self::with_config_paths(Self::config_paths())
    }

    /// Keychain reading the first parseable config among `paths`
    pub fn with_config_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            config: OnceLock::new(),
        }
    }

    /// Get paths to check for Docker config
    fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(docker_config) = std::env::var("DOCKER_CONFIG") {
            paths.push(PathBuf::from(docker_config).join("config.json"));
        }

        if let Ok(auth_file) = std::env::var("REGISTRY_AUTH_FILE") {
            paths.push(PathBuf::from(auth_file));
        }

        if let Ok(xdg_runtime) = std::env::var("XDG_RUNTIME_DIR") {
            paths.push(PathBuf::from(xdg_runtime).join("containers/auth.json"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".docker/config.json"));
        }

        paths
    }

    fn config(&self) -> &DockerConfig {
        self.config.get_or_init(|| self.load_config())
    }

    fn load_config(&self) -> DockerConfig {
        for path in &self.paths {
            if !path.exists() {
                continue;
            }
            debug!("Checking Docker config at: {}", path.display());
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<DockerConfig>(&content) {
                    Ok(config) => {
                        debug!("Loaded Docker config from: {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        warn!("Failed to parse Docker config at {}: {}", path.display(), e);
                    }
                },
                Err(e) => {
                    warn!("Failed to read Docker config at {}: {}", path.display(), e);
                }
            }
        }

        DockerConfig::default()
    }

    /// Keys a registry may be stored under in the auths section
    fn normalize_registry(registry: &str) -> Vec<String> {
        let mut variants = vec![registry.to_string()];

        if is_default_registry(registry) {
            variants.push("docker.io".to_string());
            variants.push("index.docker.io".to_string());
            variants.push(DOCKER_HUB_SERVER_URL.to_string());
            variants.push("https://index.docker.io/v2/".to_string());
        } else if !registry.starts_with("http://") && !registry.starts_with("https://") {
            variants.push(format!("https://{}", registry));
            variants.push(format!("http://{}", registry));
            variants.push(format!("https://{}/v1/", registry));
            variants.push(format!("https://{}/v2/", registry));
        }

        variants
    }

    fn find_auth_entry<'a>(
        config: &'a DockerConfig,
        registry: &str,
    ) -> Option<&'a DockerAuthEntry> {
        Self::normalize_registry(registry)
            .iter()
            .find_map(|variant| config.auths.get(variant))
    }

    fn credential_helper<'a>(config: &'a DockerConfig, registry: &str) -> Option<&'a str> {
        config
            .cred_helpers
            .get(registry)
            .or(config.creds_store.as_ref())
            .map(String::as_str)
    }

    fn execute_credential_helper(helper: &str, registry: &str) -> Result<AuthConfig> {
        let helper_name = format!("docker-credential-{}", helper);
        let helper_path = which::which(&helper_name)
            .with_context(|| format!("Credential helper {} not found in PATH", helper_name))?;
        let server_url = if is_default_registry(registry) {
            DOCKER_HUB_SERVER_URL
        } else {
            registry
        };

        debug!("Executing credential helper: {} for {}", helper_name, server_url);

        let mut child = Command::new(&helper_path)
            .arg("get")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to spawn credential helper: {}", helper_name))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(server_url.as_bytes())?;
            stdin.write_all(b"\n")?;
        }

        let output = child.wait_with_output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Credential helper {} failed: {}", helper_name, stderr.trim());
        }

        #[derive(serde::Deserialize)]
        struct HelperResponse {
            #[serde(rename = "Username")]
            username: Option<String>,
            #[serde(rename = "Secret")]
            secret: Option<String>,
        }

        let response: HelperResponse = serde_json::from_slice(&output.stdout)
            .context("Failed to parse credential helper response")?;

        // Helpers report identity tokens with this sentinel username
        if response.username.as_deref() == Some("<token>") {
            return Ok(AuthConfig {
                identity_token: response.secret,
                ..Default::default()
            });
        }

        Ok(AuthConfig {
            username: response.username,
            password: response.secret,
            ..Default::default()
        })
    }
}

impl Default for DefaultKeychain {
    fn default() -> Self {
        Self::new()
    }
}

impl Keychain for DefaultKeychain {
    fn resolve(&self, registry: &str) -> Result<Box<dyn Authenticator>> {
        let config = self.config();

        if let Some(auth_entry) = Self::find_auth_entry(config, registry) {
            debug!("Found auth entry for {}", registry);
            let auth_config = auth_entry.to_auth_config();
            if auth_config.is_anonymous() {
                return Ok(Box::new(Anonymous));
            }
            return Ok(Box::new(ConfigAuthenticator::new(auth_config)));
        }

        if let Some(helper) = Self::credential_helper(config, registry) {
            debug!("Trying credential helper: {} for {}", helper, registry);
            match Self::execute_credential_helper(helper, registry) {
                Ok(auth_config) => return Ok(Box::new(ConfigAuthenticator::new(auth_config))),
                Err(e) => warn!("Credential helper failed: {}", e),
            }
        }

        debug!("No credentials found for {}, using anonymous", registry);
        Ok(Box::new(Anonymous))
    }
}

/// Keychain with a fixed set of credentials per registry
#[derive(Debug, Clone, Default)]
pub struct StaticKeychain {
    entries: HashMap<String, AuthConfig>,
}

impl StaticKeychain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, registry: impl Into<String>, auth: AuthConfig) -> Self {
        self.entries.insert(registry.into(), auth);
        self
    }
}

impl Keychain for StaticKeychain {
    fn resolve(&self, registry: &str) -> Result<Box<dyn Authenticator>> {
        match self.entries.get(registry) {
            Some(auth) => Ok(Box::new(ConfigAuthenticator::new(auth.clone()))),
            None => Ok(Box::new(Anonymous)),
        }
    }
}
