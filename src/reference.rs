//! Parsed image references

use oci_client::Reference;
use std::fmt;
use std::str::FromStr;

/// Registry domain used when a reference names none.
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// Legacy alias of [`DEFAULT_REGISTRY`] still written by some tooling.
pub const DEFAULT_REGISTRY_ALIAS: &str = "index.docker.io";

/// Implicit namespace of official images on the default registry.
pub const DEFAULT_NAMESPACE: &str = "library/";

/// An image reference split into registry, repository and tag or digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    inner: Reference,
}

impl ImageReference {
    /// Parse a reference such as `alpine:3.18` or `ghcr.io/org/app@sha256:...`
    pub fn parse(image: &str) -> Result<Self, oci_client::ParseError> {
        let inner = Reference::try_from(image)?;
        Ok(Self { inner })
    }

    /// Registry domain, e.g. `docker.io` or `localhost:5000`
    pub fn registry(&self) -> &str {
        self.inner.registry()
    }

    /// Repository path within the registry, e.g. `library/alpine`
    pub fn repository(&self) -> &str {
        self.inner.repository()
    }

    /// The tag, unless the reference pins a digest.
    ///
    /// `repo:tag@digest` is a digest reference and reports no tag.
    pub fn tag(&self) -> Option<&str> {
        if self.inner.digest().is_some() {
            return None;
        }
        self.inner.tag()
    }

    pub fn digest(&self) -> Option<&str> {
        self.inner.digest()
    }

    /// Whether the registry is the default registry under either of its names.
    pub fn is_default_registry(&self) -> bool {
        is_default_registry(self.registry())
    }

    /// The same repository pinned to `digest`.
    pub fn with_digest(&self, digest: &str) -> Self {
        Self {
            inner: Reference::with_digest(
                self.registry().to_string(),
                self.repository().to_string(),
                digest.to_string(),
            ),
        }
    }

    pub fn as_oci(&self) -> &Reference {
        &self.inner
    }
}

pub fn is_default_registry(registry: &str) -> bool {
    registry == DEFAULT_REGISTRY || registry == DEFAULT_REGISTRY_ALIAS
}

impl FromStr for ImageReference {
    type Err = oci_client::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Reference> for ImageReference {
    fn from(inner: Reference) -> Self {
        Self { inner }
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.whole())
    }
}
