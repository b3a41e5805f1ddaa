//! In-memory registry and fixtures shared by unit tests

use crate::reference::ImageReference;
use crate::registry::{ImageDescriptor, ImageHandle, Registry, RegistryError};
use crate::remote::TransportOptions;
use async_trait::async_trait;
use oci_client::errors::OciDistributionError;
use oci_client::manifest::{
    ImageIndexEntry, OciDescriptor, OciImageIndex, OciImageManifest, OciManifest, Platform,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const DIGEST: &str = "sha256:abcd0123456789abcdef0123456789abcdef0123456789abcdef0123456789ab";
pub const LAYER_1: &str = "sha256:1111111111111111111111111111111111111111111111111111111111111111";
pub const LAYER_2: &str = "sha256:2222222222222222222222222222222222222222222222222222222222222222";

pub const CONFIG: &str = r#"{"architecture":"arm64","os":"linux","created":"2024-01-02T03:04:05Z","config":{"Env":["PATH=/usr/bin:/bin"]},"rootfs":{"type":"layers","diff_ids":["sha256:1111111111111111111111111111111111111111111111111111111111111111","sha256:2222222222222222222222222222222222222222222222222222222222222222"]}}"#;

pub fn config_digest() -> String {
    format!("sha256:{}", sha256::digest(CONFIG))
}

pub fn image_manifest() -> OciImageManifest {
    OciImageManifest {
        config: OciDescriptor {
            media_type: "application/vnd.oci.image.config.v1+json".to_string(),
            digest: config_digest(),
            size: CONFIG.len() as i64,
            ..Default::default()
        },
        layers: vec![OciDescriptor {
            media_type: "application/vnd.oci.image.layer.v1.tar+gzip".to_string(),
            digest: LAYER_1.to_string(),
            size: 1024,
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn index_entry(os: &str, architecture: &str) -> ImageIndexEntry {
    ImageIndexEntry {
        media_type: "application/vnd.oci.image.manifest.v1+json".to_string(),
        digest: format!("sha256:{:0>64}", format!("{}{}", os.len(), architecture.len())),
        size: 512,
        platform: Some(Platform {
            architecture: architecture.to_string(),
            os: os.to_string(),
            os_version: None,
            os_features: None,
            variant: None,
            features: None,
        }),
        annotations: None,
    }
}

pub fn index(manifests: Vec<ImageIndexEntry>) -> OciImageIndex {
    OciImageIndex {
        schema_version: 2,
        media_type: Some("application/vnd.oci.image.index.v1+json".to_string()),
        manifests,
        artifact_type: None,
        annotations: None,
    }
}

/// What the fake returns from [`Registry::index`]
pub enum IndexResponse {
    Index(OciImageIndex),
    Schema1,
    NotAnIndex,
    Failure,
}

/// Registry answering from memory and recording how it was called
pub struct FakeRegistry {
    index: IndexResponse,
    digest: String,
    fail_get: bool,
    config: String,
    pub index_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
    pub transports: Mutex<Vec<TransportOptions>>,
}

impl FakeRegistry {
    pub fn new(index: IndexResponse) -> Self {
        Self {
            index,
            digest: DIGEST.to_string(),
            fail_get: false,
            config: CONFIG.to_string(),
            index_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            transports: Mutex::new(Vec::new()),
        }
    }

    pub fn single_arch() -> Self {
        Self::new(IndexResponse::NotAnIndex)
    }

    pub fn failing_get(mut self) -> Self {
        self.fail_get = true;
        self
    }

    pub fn with_config(mut self, config: &str) -> Self {
        self.config = config.to_string();
        self
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn last_transport(&self) -> Option<TransportOptions> {
        self.transports.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn index(
        &self,
        _reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<OciImageIndex, RegistryError> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.transports.lock().unwrap().push(transport.clone());
        match &self.index {
            IndexResponse::Index(index) => Ok(index.clone()),
            IndexResponse::Schema1 => Err(OciDistributionError::UnsupportedMediaTypeError(
                "application/vnd.docker.distribution.manifest.v1+prettyjws".to_string(),
            )
            .into()),
            IndexResponse::NotAnIndex => Err(RegistryError::NotAnIndex(
                "application/vnd.oci.image.manifest.v1+json".to_string(),
            )),
            IndexResponse::Failure => Err(OciDistributionError::GenericError(Some(
                "registry unavailable".to_string(),
            ))
            .into()),
        }
    }

    async fn get(
        &self,
        reference: &ImageReference,
        transport: &TransportOptions,
    ) -> Result<ImageDescriptor, RegistryError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.transports.lock().unwrap().push(transport.clone());
        if self.fail_get {
            return Err(OciDistributionError::GenericError(Some("unauthorized".to_string())).into());
        }
        Ok(ImageDescriptor::new(
            reference.clone(),
            self.digest.clone(),
            OciManifest::Image(image_manifest()),
        ))
    }

    async fn image(
        &self,
        descriptor: &ImageDescriptor,
        _transport: &TransportOptions,
    ) -> Result<ImageHandle, RegistryError> {
        ImageHandle::new(image_manifest(), descriptor.digest.clone(), &self.config)
    }
}
