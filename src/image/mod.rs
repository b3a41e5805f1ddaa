//! Resolved remote images and their identity strings

use crate::reference::{ImageReference, DEFAULT_NAMESPACE};
use crate::registry::{ImageDescriptor, ImageHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};


/// The image config blob, as much of it as identity derivation needs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub architecture: String,
    #[serde(default)]
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub config: ContainerConfig,
    pub rootfs: RootFs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerConfig {
    #[serde(rename = "Env", default)]
    pub env: Option<Vec<String>>,
    #[serde(rename = "Cmd", default)]
    pub cmd: Option<Vec<String>>,
    #[serde(rename = "WorkingDir", default)]
    pub working_dir: Option<String>,
    #[serde(rename = "User", default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub fs_type: String,
    pub diff_ids: Vec<String>,
}

/// Content-based identifier of an image: the digest of its config blob
pub fn id(handle: &ImageHandle) -> String {
    handle.config_digest().to_string()
}

/// Uncompressed layer digests, base layer first
pub fn layer_ids(handle: &ImageHandle) -> Vec<String> {
    handle.config.rootfs.diff_ids.clone()
}

/// An image fetched from a registry, carrying the identity of the reference it was fetched by
#[derive(Debug, Clone)]
pub struct RemoteImage {
    name: String,
    handle: ImageHandle,
    reference: ImageReference,
    descriptor: ImageDescriptor,
}

impl RemoteImage {
    pub fn new(
        name: String,
        handle: ImageHandle,
        reference: ImageReference,
        descriptor: ImageDescriptor,
    ) -> Self {
        Self {
            name,
            handle,
            reference,
            descriptor,
        }
    }

    /// Name the caller asked for, verbatim
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> String {
        id(&self.handle)
    }

    pub fn layer_ids(&self) -> Vec<String> {
        layer_ids(&self.handle)
    }

    /// `repository:tag`, or nothing when the reference pins a digest
    pub fn repo_tags(&self) -> Vec<String> {
        match self.reference.tag() {
            Some(tag) => vec![format!("{}:{}", self.repository_name(), tag)],
            None => Vec::new(),
        }
    }

    /// `repository@digest` for the digest the registry returned
    pub fn repo_digests(&self) -> Vec<String> {
        vec![format!(
            "{}@{}",
            self.repository_name(),
            self.descriptor.digest
        )]
    }

    /// Repository name as the Docker CLI prints it.
    ///
    /// Images on the default registry drop the registry and the implicit
    /// `library/` namespace; everything else is `registry/repository`.
    pub fn repository_name(&self) -> String {
        repository_name(&self.reference)
    }

    pub fn handle(&self) -> &ImageHandle {
        &self.handle
    }

    pub fn reference(&self) -> &ImageReference {
        &self.reference
    }

    pub fn descriptor(&self) -> &ImageDescriptor {
        &self.descriptor
    }

    pub fn summary(&self) -> ImageSummary {
        let config = &self.handle.config;
        ImageSummary {
            name: self.name.clone(),
            id: self.id(),
            repo_tags: self.repo_tags(),
            repo_digests: self.repo_digests(),
            layer_ids: self.layer_ids(),
            os: config.os.clone(),
            architecture: config.architecture.clone(),
            created: config.created,
        }
    }
}

pub fn repository_name(reference: &ImageReference) -> String {
    let repository = reference.repository();
    if !reference.is_default_registry() {
        return format!("{}/{}", reference.registry(), repository);
    }

    // https://docs.docker.com/docker-hub/official_repos
    repository
        .strip_prefix(DEFAULT_NAMESPACE)
        .unwrap_or(repository)
        .to_string()
}

/// Serializable view of a [`RemoteImage`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageSummary {
    pub name: String,
    #[serde(rename = "ID")]
    pub id: String,
    pub repo_tags: Vec<String>,
    pub repo_digests: Vec<String>,
    #[serde(rename = "LayerIDs")]
    pub layer_ids: Vec<String>,
    pub os: String,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}
