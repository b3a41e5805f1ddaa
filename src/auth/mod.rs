//! Credential selection for registry access
//!
//! Explicit credentials from a [`DockerOption`] win over anything configured
//! on the machine: a username/password pair first, then a bearer token, and
//! only then the [`Keychain`] lookup for the registry domain.

use crate::config::DockerOption;
use base64::Engine;
use oci_client::secrets::RegistryAuth;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

mod keychain;

pub use keychain::{DefaultKeychain, Keychain, StaticKeychain};

/// The credential chosen for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Defer to the keychain, which may itself yield anonymous access
    Keychain,
    Basic { username: String, password: String },
    Bearer(String),
}

impl Credential {
    /// Convert into the auth presented to the registry at `domain`.
    ///
    /// Keychain failures fall through to anonymous access.
    pub fn into_registry_auth(self, domain: &str, keychain: &dyn Keychain) -> RegistryAuth {
        match self {
            Credential::Basic { username, password } => RegistryAuth::Basic(username, password),
            Credential::Bearer(token) => RegistryAuth::Bearer(token),
            Credential::Keychain => match keychain
                .resolve(domain)
                .and_then(|auth| auth.authorization())
            {
                Ok(config) => config.to_registry_auth(),
                Err(e) => {
                    warn!("Keychain lookup for {} failed, using anonymous: {}", domain, e);
                    RegistryAuth::Anonymous
                }
            },
        }
    }
}

/// Pick the credential mechanism for `option`, first match wins.
pub fn resolve_credential(option: &DockerOption) -> Credential {
    if !option.username.is_empty() && !option.password.is_empty() {
        debug!("Using basic auth for user {}", option.username);
        return Credential::Basic {
            username: option.username.clone(),
            password: option.password.clone(),
        };
    }

    if !option.registry_token.is_empty() {
        debug!("Using registry bearer token");
        return Credential::Bearer(option.registry_token.clone());
    }

    debug!("No explicit credentials, deferring to keychain");
    Credential::Keychain
}

/// Authentication configuration containing credentials
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_token: Option<String>,
}

impl AuthConfig {
    pub fn new(username: String, password: String) -> Self {
        Self {
            username: Some(username),
            password: Some(password),
            ..Default::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_none()
            && self.password.is_none()
            && self.auth.is_none()
            && self.identity_token.is_none()
            && self.registry_token.is_none()
    }

    /// Convert to oci-client RegistryAuth
    pub fn to_registry_auth(&self) -> RegistryAuth {
        if self.is_anonymous() {
            return RegistryAuth::Anonymous;
        }

        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            return RegistryAuth::Basic(username.clone(), password.clone());
        }

        if let Some(auth) = &self.auth {
            match base64::engine::general_purpose::STANDARD.decode(auth) {
                Ok(decoded) => {
                    if let Ok(decoded_str) = String::from_utf8(decoded) {
                        if let Some((user, pass)) = decoded_str.split_once(':') {
                            return RegistryAuth::Basic(user.to_string(), pass.to_string());
                        }
                    }
                }
                Err(e) => warn!("Failed to decode auth entry: {}", e),
            }
        }

        if let Some(token) = self.registry_token.as_ref().or(self.identity_token.as_ref()) {
            return RegistryAuth::Bearer(token.clone());
        }

        RegistryAuth::Anonymous
    }
}

/// Trait for types that can provide authentication
pub trait Authenticator: Send + Sync {
    fn authorization(&self) -> anyhow::Result<AuthConfig>;
}

/// Anonymous authenticator
pub struct Anonymous;

impl Authenticator for Anonymous {
    fn authorization(&self) -> anyhow::Result<AuthConfig> {
        Ok(AuthConfig::anonymous())
    }
}

/// Authenticator that returns a fixed AuthConfig
pub struct ConfigAuthenticator {
    config: AuthConfig,
}

impl ConfigAuthenticator {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

impl Authenticator for ConfigAuthenticator {
    fn authorization(&self) -> anyhow::Result<AuthConfig> {
        Ok(self.config.clone())
    }
}

/// Docker config file structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DockerConfig {
    #[serde(default)]
    pub auths: HashMap<String, DockerAuthEntry>,
    #[serde(rename = "credHelpers", default)]
    pub cred_helpers: HashMap<String, String>,
    #[serde(rename = "credsStore", skip_serializing_if = "Option::is_none")]
    pub creds_store: Option<String>,
}

/// Entry in the Docker config auths section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DockerAuthEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "identitytoken", skip_serializing_if = "Option::is_none")]
    pub identity_token: Option<String>,
    #[serde(rename = "registrytoken", skip_serializing_if = "Option::is_none")]
    pub registry_token: Option<String>,
}

impl DockerAuthEntry {
    pub fn to_auth_config(&self) -> AuthConfig {
        AuthConfig {
            username: self.username.clone(),
            password: self.password.clone(),
            auth: self.auth.clone(),
            identity_token: self.identity_token.clone(),
            registry_token: self.registry_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests;
