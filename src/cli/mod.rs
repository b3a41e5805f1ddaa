use crate::config::DockerOption;
use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "regscan")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve images in a remote registry and print their identity
    Inspect {
        /// Image references (e.g., alpine:3.18, ghcr.io/org/app@sha256:...)
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,

        /// Maximum number of images resolved at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Show version information
    Version,
}

/// Registry access flags; unset flags fall back to the config file
#[derive(Args, Debug, Default, Clone)]
pub struct RegistryArgs {
    /// Target platform (e.g., linux/arm64, or */arm64 to take the OS from the image)
    #[arg(long, env = "REGSCAN_PLATFORM")]
    pub platform: Option<String>,

    /// Username for basic auth
    #[arg(long, env = "REGSCAN_USERNAME")]
    pub username: Option<String>,

    /// Password for basic auth
    #[arg(long, env = "REGSCAN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token for the registry
    #[arg(long, env = "REGSCAN_REGISTRY_TOKEN", hide_env_values = true)]
    pub registry_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long)]
    pub insecure: bool,
}

impl RegistryArgs {
    /// Overlay the flags that were given onto `defaults`
    pub fn apply(&self, defaults: &DockerOption) -> DockerOption {
        let mut option = defaults.clone();
        if let Some(platform) = &self.platform {
            option.platform = platform.clone();
        }
        if let Some(username) = &self.username {
            option.username = username.clone();
        }
        if let Some(password) = &self.password {
            option.password = password.clone();
        }
        if let Some(token) = &self.registry_token {
            option.registry_token = token.clone();
        }
        if self.insecure {
            option.insecure_skip_tls_verify = true;
        }
        option
    }
}
