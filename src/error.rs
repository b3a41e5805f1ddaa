//! Errors returned while resolving a remote image

use crate::registry::RegistryError;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("platform parse error: {input:?}: {reason}")]
    PlatformParse { input: String, reason: String },

    #[error("remote index error for {reference}")]
    Index {
        reference: String,
        #[source]
        source: RegistryError,
    },

    #[error("remote fetch error for {reference}")]
    Fetch {
        reference: String,
        #[source]
        source: RegistryError,
    },

    #[error("remote image error for {reference}")]
    Image {
        reference: String,
        #[source]
        source: RegistryError,
    },

    #[error("resolution of {reference} was cancelled")]
    Cancelled { reference: String },
}

impl Error {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}
