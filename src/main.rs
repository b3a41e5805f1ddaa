use anyhow::{Context, Result};
use clap::Parser;
use regscan::{
    auth::DefaultKeychain,
    cli::{Cli, Commands},
    config::{Config, DockerOption},
    registry::OciRegistry,
    ImageReference, RemoteImage, Resolver,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Inspect {
            images,
            registry,
            concurrency,
        } => {
            let config = Config::load()?;
            let option = registry.apply(&config.docker);
            let concurrency = concurrency.unwrap_or(config.concurrency).max(1);

            let failed = inspect(images, option, concurrency).await?;
            if failed > 0 {
                anyhow::bail!("{} image(s) could not be resolved", failed);
            }
        }
        Commands::Version => {
            println!("regscan {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

/// Resolve `images` concurrently, printing each as JSON. Returns the number of failures.
async fn inspect(images: Vec<String>, option: DockerOption, concurrency: usize) -> Result<usize> {
    let resolver = Resolver::new(Arc::new(OciRegistry::new()), Arc::new(DefaultKeychain::new()));
    let option = Arc::new(option);
    let permits = Arc::new(Semaphore::new(concurrency));
    let cancel = CancellationToken::new();

    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight resolutions");
            ctrl_c.cancel();
        }
    });

    let mut tasks = JoinSet::new();
    for image in images {
        let resolver = resolver.clone();
        let option = Arc::clone(&option);
        let permits = Arc::clone(&permits);
        let cancel = cancel.clone();

        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await?;
            let result = resolve_one(&resolver, &cancel, &image, &option).await;
            Ok::<_, anyhow::Error>((image, result))
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (image, result) = joined.context("Resolution task panicked")??;
        match result {
            Ok(remote) => {
                let json = serde_json::to_string_pretty(&remote.summary())?;
                println!("{}", json);
            }
            Err(e) => {
                error!("Failed to resolve {}: {:#}", image, e);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

async fn resolve_one(
    resolver: &Resolver<OciRegistry>,
    cancel: &CancellationToken,
    image: &str,
    option: &DockerOption,
) -> Result<RemoteImage> {
    let reference = ImageReference::parse(image)
        .with_context(|| format!("Failed to parse image reference: {}", image))?;

    info!("Resolving {}", reference);
    let remote = resolver
        .try_remote(cancel, image, &reference, option)
        .await?;
    Ok(remote)
}
