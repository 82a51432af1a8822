mod config;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    Explorer, ExplorerEvent, ExplorerState, HttpProcessingClient, ImageFile,
    InMemoryPreviewRegistry, MissingProcessingClient, ProcessingClient, Settings,
};
use shared::domain::{Algorithm, ColorSpace, ColorSpaceMode};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

/// Runs one white-balance exploration against the processing service.
#[derive(Parser, Debug)]
struct Args {
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    image: PathBuf,
    /// Repeat to compare several algorithms.
    #[arg(long = "algorithm")]
    algorithms: Vec<Algorithm>,
    #[arg(long)]
    mode: Option<ColorSpaceMode>,
    #[arg(long)]
    input_space: Option<ColorSpace>,
    #[arg(long)]
    processing_space: Option<ColorSpace>,
    #[arg(long)]
    split: Option<Algorithm>,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    #[arg(long)]
    json: bool,
}

impl Args {
    fn explorer_settings(&self) -> Settings {
        let mut settings = Settings::default();
        if !self.algorithms.is_empty() {
            settings.set_algorithms(&self.algorithms);
        }
        // Explicit spaces imply manual mode unless a mode was given.
        let overrides = self.input_space.is_some() || self.processing_space.is_some();
        let mode = self.mode.unwrap_or(if overrides {
            ColorSpaceMode::Manual
        } else {
            ColorSpaceMode::Auto
        });
        settings.set_color_space_mode(mode);
        if let Some(space) = self.input_space {
            settings.set_input_color_space(space);
        }
        if let Some(space) = self.processing_space {
            settings.set_processing_space(space);
        }
        settings
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = config::load_settings()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let base_url = match &args.api_base_url {
        Some(raw) => config::configured_base_url(raw)?,
        None => config.api_base_url.clone(),
    };
    let processor = build_processor(
        base_url.as_deref(),
        Duration::from_secs(config.request_timeout_secs),
    )?;

    let previews = Arc::new(InMemoryPreviewRegistry::new());
    let explorer = Explorer::with_settings(processor, previews.clone(), args.explorer_settings());

    let mut events = explorer.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ExplorerEvent::StateChanged) => {}
                Ok(event) => debug!(?event, "explorer event"),
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event log lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let file = ImageFile::from_path(&args.image).await?;
    explorer.select_image(file).await?;
    explorer.settled().await;

    if let Some(algorithm) = args.split {
        if !explorer.set_split_view_algorithm(Some(algorithm)).await {
            warn!(%algorithm, "no result for requested split view algorithm");
        }
    }

    let state = explorer.state().await;
    if let Some(error) = &state.error {
        explorer.shutdown().await;
        bail!("{}", error.message());
    }

    if let Some(out_dir) = &args.out_dir {
        write_results(out_dir, &state).await?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_summary(&state);
    }

    explorer.shutdown().await;
    debug!(
        created = previews.created(),
        released = previews.released(),
        "preview handles"
    );
    Ok(())
}

fn build_processor(
    base_url: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn ProcessingClient>> {
    match base_url {
        Some(base_url) => {
            let processor = HttpProcessingClient::new(base_url, Some(timeout))?;
            info!(base_url = processor.base_url(), "using processing service");
            Ok(Arc::new(processor))
        }
        None => {
            warn!("no processing service configured; every batch will fail");
            Ok(Arc::new(MissingProcessingClient))
        }
    }
}

async fn write_results(out_dir: &Path, state: &ExplorerState) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("failed to create '{}'", out_dir.display()))?;
    for image in &state.processed_images {
        let path = out_dir.join(format!("{}.png", image.algorithm));
        tokio::fs::write(&path, &image.image_png)
            .await
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        info!(path = %path.display(), "wrote result");
    }
    Ok(())
}

fn print_summary(state: &ExplorerState) {
    if let Some(image) = &state.image {
        println!(
            "{} ({}, {} bytes)",
            image.name, image.mime_type, image.size_bytes
        );
    }
    println!(
        "color spaces: {} mode, input {}, processing {}",
        state.color_space_mode, state.input_color_space, state.processing_space
    );
    for image in &state.processed_images {
        let marker = if Some(image.algorithm) == state.split_view_algorithm {
            "*"
        } else {
            " "
        };
        println!(
            "{marker} {:<12} before {} after {}",
            image.algorithm.label(),
            format_rgb(image.avg_rgb_before),
            format_rgb(image.avg_rgb_after)
        );
    }
}

fn format_rgb(rgb: Option<[f32; 3]>) -> String {
    match rgb {
        Some([r, g, b]) => format!("({r:.3}, {g:.3}, {b:.3})"),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
