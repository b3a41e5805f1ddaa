//! Remote image resolution
//!
//! [`Resolver::try_remote`] runs the whole pipeline for one image: pick a
//! credential, resolve the platform, configure the transport, fetch the
//! descriptor, materialize the image and wrap it with its identity.

use crate::auth::{resolve_credential, Keychain};
use crate::config::DockerOption;
use crate::error::{Error, Result};
use crate::image::RemoteImage;
use crate::platform::{resolve_platform, Platform};
use crate::reference::ImageReference;
use crate::registry::Registry;
use oci_client::client::ClientConfig;
use oci_client::manifest::ImageIndexEntry;
use oci_client::secrets::RegistryAuth;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};


/// Connection options for one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub insecure_skip_tls_verify: bool,
    pub platform: Option<Platform>,
    pub auth: RegistryAuth,
}

impl TransportOptions {
    pub fn new(insecure_skip_tls_verify: bool, auth: RegistryAuth) -> Self {
        Self {
            insecure_skip_tls_verify,
            platform: None,
            auth,
        }
    }

    pub fn with_platform(mut self, platform: Option<Platform>) -> Self {
        self.platform = platform;
        self
    }

    /// Client configuration for these options.
    ///
    /// Without a platform the client keeps its default index resolution.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            accept_invalid_certificates: self.insecure_skip_tls_verify,
            ..Default::default()
        };

        if let Some(platform) = self.platform.clone() {
            config.platform_resolver = Some(Box::new(move |entries: &[ImageIndexEntry]| {
                select_manifest(&platform, entries)
            }));
        }

        config
    }
}

/// Digest of the first index entry matching `platform`
pub fn select_manifest(platform: &Platform, entries: &[ImageIndexEntry]) -> Option<String> {
    entries
        .iter()
        .find(|entry| {
            entry
                .platform
                .as_ref()
                .is_some_and(|candidate| platform.matches(candidate))
        })
        .map(|entry| entry.digest.clone())
}

/// Resolves image references against a registry.
///
/// Holds no per-resolution state, so one resolver can serve concurrent calls.
pub struct Resolver<R: ?Sized> {
    registry: Arc<R>,
    keychain: Arc<dyn Keychain>,
}

impl<R: ?Sized> Clone for Resolver<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            keychain: Arc::clone(&self.keychain),
        }
    }
}

impl<R> Resolver<R>
where
    R: Registry + ?Sized,
{
    pub fn new(registry: Arc<R>, keychain: Arc<dyn Keychain>) -> Self {
        Self { registry, keychain }
    }

    /// Fetch `reference` and wrap it as a [`RemoteImage`] named `image_name`.
    pub async fn try_remote(
        &self,
        cancel: &CancellationToken,
        image_name: &str,
        reference: &ImageReference,
        option: &DockerOption,
    ) -> Result<RemoteImage> {
        let auth = cancellable(cancel, reference, self.registry_auth(reference, option)).await?;
        let transport = TransportOptions::new(option.insecure_skip_tls_verify, auth);

        let platform = cancellable(
            cancel,
            reference,
            resolve_platform(self.registry.as_ref(), reference, &option.platform, &transport),
        )
        .await??;
        if let Some(platform) = &platform {
            debug!("Constraining {} to platform {}", reference, platform);
        }
        let transport = transport.with_platform(platform);

        info!("Fetching {}", reference);
        let descriptor = cancellable(cancel, reference, self.registry.get(reference, &transport))
            .await?
            .map_err(|source| Error::Fetch {
                reference: reference.to_string(),
                source,
            })?;

        let handle = cancellable(
            cancel,
            reference,
            self.registry.image(&descriptor, &transport),
        )
        .await?
        .map_err(|source| Error::Image {
            reference: reference.to_string(),
            source,
        })?;

        info!("Fetched {} ({})", reference, descriptor.digest);
        Ok(RemoteImage::new(
            image_name.to_string(),
            handle,
            reference.clone(),
            descriptor,
        ))
    }

    /// Credential for `reference`.
    ///
    /// Keychain lookups may run a credential helper process, so they run on
    /// the blocking pool.
    async fn registry_auth(
        &self,
        reference: &ImageReference,
        option: &DockerOption,
    ) -> RegistryAuth {
        let credential = resolve_credential(option);
        let keychain = Arc::clone(&self.keychain);
        let domain = reference.registry().to_string();

        match tokio::task::spawn_blocking(move || {
            credential.into_registry_auth(&domain, keychain.as_ref())
        })
        .await
        {
            Ok(auth) => auth,
            Err(e) => {
                warn!("Credential lookup for {} did not complete: {}", reference, e);
                RegistryAuth::Anonymous
            }
        }
    }
}

/// Run `future` unless `cancel` fires first.
async fn cancellable<F, T>(
    cancel: &CancellationToken,
    reference: &ImageReference,
    future: F,
) -> Result<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled {
            reference: reference.to_string(),
        }),
        output = future => Ok(output),
    }
}
