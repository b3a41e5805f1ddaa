//! Registry client seam
//!
//! [`Registry`] is the narrow surface the resolver needs from a registry:
//! fetch an index, fetch a descriptor, and materialize an image. [`OciRegistry`]
//! implements it with `oci-client`; tests substitute their own.

use crate::image::ConfigFile;
use crate::reference::ImageReference;
use crate::remote::TransportOptions;
use async_trait::async_trait;
use oci_client::errors::OciDistributionError;
use oci_client::manifest::{OciImageIndex, OciImageManifest, OciManifest};
use oci_client::Client;
use thiserror::Error;
use tracing::debug;


pub const OCI_IMAGE_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_INDEX_MEDIA_TYPE: &str = "application/vnd.oci.image.index.v1+json";
pub const DOCKER_SCHEMA1_MEDIA_TYPE: &str = "application/vnd.docker.distribution.manifest.v1+json";
pub const DOCKER_SCHEMA1_SIGNED_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";

#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry only serves a legacy schema 1 manifest
    #[error("unsupported schema 1 manifest: {0}")]
    Schema1(String),

    /// An index was requested but the registry returned a single image manifest
    #[error("unexpected media type for an image index: {0}")]
    NotAnIndex(String),

    #[error("config digest mismatch: manifest names {expected}, content hashes to {actual}")]
    ConfigDigestMismatch { expected: String, actual: String },

    #[error("failed to decode image config")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Distribution(OciDistributionError),
}

impl From<OciDistributionError> for RegistryError {
    fn from(e: OciDistributionError) -> Self {
        match e {
            OciDistributionError::UnsupportedSchemaVersionError(1) => {
                RegistryError::Schema1(DOCKER_SCHEMA1_MEDIA_TYPE.to_string())
            }
            OciDistributionError::UnsupportedMediaTypeError(media_type)
                if is_schema1_media_type(&media_type) =>
            {
                RegistryError::Schema1(media_type)
            }
            other => RegistryError::Distribution(other),
        }
    }
}

pub fn is_schema1_media_type(media_type: &str) -> bool {
    media_type.starts_with(DOCKER_SCHEMA1_MEDIA_TYPE)
        || media_type.starts_with(DOCKER_SCHEMA1_SIGNED_MEDIA_TYPE)
}

/// Registry metadata for a fetched reference
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    pub reference: ImageReference,
    /// Digest of the top-level manifest the reference points at
    pub digest: String,
    pub media_type: String,
    pub manifest: OciManifest,
}

impl ImageDescriptor {
    pub fn new(reference: ImageReference, digest: String, manifest: OciManifest) -> Self {
        let media_type = manifest_media_type(&manifest);
        Self {
            reference,
            digest,
            media_type,
            manifest,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self.manifest, OciManifest::ImageIndex(_))
    }
}

/// A single-platform image: its manifest and decoded config
#[derive(Debug, Clone)]
pub struct ImageHandle {
    pub manifest: OciImageManifest,
    pub manifest_digest: String,
    pub config: ConfigFile,
}

impl ImageHandle {
    /// Decode `raw_config`, checking it against the digest the manifest names.
    pub fn new(
        manifest: OciImageManifest,
        manifest_digest: String,
        raw_config: &str,
    ) -> Result<Self, RegistryError> {
        let expected = &manifest.config.digest;
        if expected.starts_with("sha256:") {
            let actual = format!("sha256:{}", sha256::digest(raw_config));
            if &actual != expected {
                return Err(RegistryError::ConfigDigestMismatch {
                    expected: expected.clone(),
                    actual,
                });
            }
        }

        let config = serde_json::from_str(raw_config)?;
        Ok(Self {
            manifest,
            manifest_digest,
            config,
        })
    }

    /// Digest of the image config blob
    pub fn config_digest(&self) -> &str {
        &self.manifest.config.digest
    }
}

#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch the manifest index for `reference`.
    async fn index(
        &self,
        reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<OciImageIndex, RegistryError>;

    /// Fetch the descriptor `reference` points at.
    async fn get(
        &self,
        reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<ImageDescriptor, RegistryError>;

    /// Materialize the image a descriptor names, picking a platform from an index.
    async fn image(
        &self,
        descriptor: &ImageDescriptor,
        transport: &TransportOptions,
    ) -> Result<ImageHandle, RegistryError>;
}

/// [`Registry`] over `oci-client`.
///
/// A client is built per call so TLS and platform settings never outlive the
/// fetch they were configured for.
#[derive(Debug, Default, Clone, Copy)]
pub struct OciRegistry;

impl OciRegistry {
    pub fn new() -> Self {
        Self
    }

    fn client(&self, transport: &TransportOptions) -> Client {
        Client::new(transport.client_config())
    }
}

#[async_trait]
impl Registry for OciRegistry {
    async fn index(
        &self,
        reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<OciImageIndex, RegistryError> {
        debug!("Fetching index for {}", reference);

        let (manifest, _digest) = self
            .client(transport)
            .pull_manifest(reference.as_oci(), &transport.auth)
            .await?;

        match manifest {
            OciManifest::ImageIndex(index) => Ok(index),
            image @ OciManifest::Image(_) => {
                Err(RegistryError::NotAnIndex(manifest_media_type(&image)))
            }
        }
    }

    async fn get(
        &self,
        reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<ImageDescriptor, RegistryError> {
        debug!("Fetching descriptor for {}", reference);

        let (manifest, digest) = self
            .client(transport)
            .pull_manifest(reference.as_oci(), &transport.auth)
            .await?;

        Ok(ImageDescriptor::new(reference.clone(), digest, manifest))
    }

    async fn image(
        &self,
        descriptor: &ImageDescriptor,
        transport: &TransportOptions,
    ) -> Result<ImageHandle, RegistryError> {
        let pinned = descriptor.reference.with_digest(&descriptor.digest);
        debug!("Fetching manifest and config for {}", pinned);

        let (manifest, manifest_digest, config) = self
            .client(transport)
            .pull_manifest_and_config(pinned.as_oci(), &transport.auth)
            .await?;

        ImageHandle::new(manifest, manifest_digest, &config)
    }
}

/// Media type of a manifest, falling back to the OCI type when it is unset.
pub fn manifest_media_type(manifest: &OciManifest) -> String {
    match manifest {
        OciManifest::Image(image) => image
            .media_type
            .clone()
            .unwrap_or_else(|| OCI_IMAGE_MEDIA_TYPE.to_string()),
        OciManifest::ImageIndex(index) => index
            .media_type
            .clone()
            .unwrap_or_else(|| OCI_INDEX_MEDIA_TYPE.to_string()),
    }
}
