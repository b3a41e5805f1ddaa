//! Platform parsing and wildcard resolution
//!
//! A platform is written `os/arch[/variant][:osversion]`. The OS may be the
//! wildcard `*`, in which case the OS of the first entry in the image's
//! manifest index is substituted.

use crate::error::{Error, Result};
use crate::reference::ImageReference;
use crate::registry::{Registry, RegistryError};
use crate::remote::TransportOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;


const OS_WILDCARD: &str = "*/";

/// A concrete target platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub os_version: Option<String>,
}

impl Platform {
    pub fn new(os: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            architecture: architecture.into(),
            variant: None,
            os_version: None,
        }
    }

    /// Whether an index entry's platform satisfies this one.
    ///
    /// The variant and OS version are only compared when this platform sets them.
    pub fn matches(&self, other: &oci_client::manifest::Platform) -> bool {
        if self.os != other.os || self.architecture != other.architecture {
            return false;
        }
        if let Some(variant) = &self.variant {
            if other.variant.as_deref() != Some(variant.as_str()) {
                return false;
            }
        }
        if let Some(os_version) = &self.os_version {
            if other.os_version.as_deref() != Some(os_version.as_str()) {
                return false;
            }
        }
        true
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parse_error = |reason: &str| Error::PlatformParse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let (spec, os_version) = match s.trim().split_once(':') {
            Some((spec, version)) if !version.is_empty() => (spec, Some(version.to_string())),
            Some(_) => return Err(parse_error("empty os version")),
            None => (s.trim(), None),
        };

        let parts: Vec<&str> = spec.split('/').collect();
        if parts.len() > 3 {
            return Err(parse_error("too many slashes"));
        }
        if parts.len() < 2 {
            return Err(parse_error("expected os/arch"));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(parse_error("empty component"));
        }

        Ok(Platform {
            os: parts[0].to_string(),
            architecture: parts[1].to_string(),
            variant: parts.get(2).map(|v| v.to_string()),
            os_version,
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(variant) = &self.variant {
            write!(f, "/{}", variant)?;
        }
        if let Some(os_version) = &self.os_version {
            write!(f, ":{}", os_version)?;
        }
        Ok(())
    }
}

/// Turn a user-supplied platform string into a constraint for `reference`.
///
/// Returns `None` when there is nothing to constrain: the input is empty, or
/// the input has an OS wildcard and the image is not multi-arch.
pub async fn resolve_platform<R>(
    registry: &R,
    reference: &ImageReference,
    platform: &str,
    transport: &TransportOptions,
) -> Result<Option<Platform>>
where
    R: Registry + ?Sized,
{
    let platform = platform.trim();
    if platform.is_empty() {
        return Ok(None);
    }

    let Some(arch_spec) = platform.strip_prefix(OS_WILDCARD) else {
        return platform.parse().map(Some);
    };

    let index = match registry.index(reference, transport).await {
        Ok(index) => index,
        Err(e @ (RegistryError::Schema1(_) | RegistryError::NotAnIndex(_))) => {
            debug!("Ignored --platform as the image is not multi-arch: {}", e);
            return Ok(None);
        }
        Err(source) => {
            return Err(Error::Index {
                reference: reference.to_string(),
                source,
            })
        }
    };

    let Some(first) = index.manifests.first() else {
        debug!("Ignored --platform as the image is not multi-arch: empty index");
        return Ok(None);
    };
    let Some(first_platform) = &first.platform else {
        debug!("Ignored --platform as the first index entry has no platform");
        return Ok(None);
    };

    // e.g. */amd64 => linux/amd64
    let resolved = format!("{}/{}", first_platform.os, arch_spec);
    debug!("Resolved platform {} to {}", platform, resolved);
    resolved.parse().map(Some)
}
