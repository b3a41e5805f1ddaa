pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod image;
pub mod platform;
pub mod reference;
pub mod registry;
pub mod remote;

#[cfg(test)]
mod test_support;

pub use config::DockerOption;
pub use error::{Error, Result};
pub use image::RemoteImage;
pub use reference::ImageReference;
pub use remote::Resolver;
