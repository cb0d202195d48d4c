//! `stage` command: makes artboards of a cached design ready in the engine.
//!
//! The engine is started from the configured `[render]` command. Ctrl-C
//! cancels the staging; commands already acknowledged by the engine stay.

use clap::Args;
use octostage::fonts::{DirectoryFontSource, FontSource};
use octostage::orchestrator::DesignLoader;
use octostage::render::ProcessBackend;
use octostage::{ArtboardId, Collaborator, DesignId, PageId, StageError};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct StageArgs {
    /// Design id
    #[arg(long)]
    pub design: String,

    /// Artboard to stage (repeatable)
    #[arg(long = "artboard", value_name = "ID")]
    pub artboards: Vec<String>,

    /// Stage every artboard of a page (repeatable)
    #[arg(long = "page", value_name = "ID")]
    pub pages: Vec<String>,

    /// Stage every available artboard
    #[arg(long, conflicts_with_all = ["artboards", "pages"])]
    pub all: bool,
}

pub fn run(args: StageArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("stage");

    if !args.all && args.artboards.is_empty() && args.pages.is_empty() {
        return Err(CliError::Config(
            "nothing to stage: pass --artboard, --page or --all".to_string(),
        ));
    }

    runner.block_on(stage(args, runner))
}

async fn stage(args: StageArgs, runner: &CliRunner) -> Result<(), CliError> {
    let config = runner.config();
    let design_id = DesignId::from(args.design);

    let cache = Arc::new(runner.content_cache());
    let manifest = cache.read_manifest(&design_id).await?;

    let process_config = config
        .process_backend_config()
        .ok_or(StageError::NotConfigured(Collaborator::RenderBackend))?;
    let backend = Arc::new(ProcessBackend::spawn(&process_config)?);

    let fonts = DirectoryFontSource::new(&config.font_source_config());
    info!(faces = fonts.face_count(), "Font index built");
    let fonts: Arc<dyn FontSource> = Arc::new(fonts);

    let loader = DesignLoader::builder(design_id.clone(), manifest)
        .content_store(cache)
        .render_backend(backend.clone())
        .font_source(fonts)
        .config(config.loader_config())
        .build()?;

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            interrupt.cancel();
        }
    });

    let started = Instant::now();
    let result = stage_targets(&loader, &args.artboards, &args.pages, args.all, &cancel).await;
    let elapsed = started.elapsed();

    let stats = loader.stats();
    info!(
        elapsed_ms = elapsed.as_millis() as u64,
        readiness_requests = stats.readiness.total_requests,
        coalesced = stats.readiness.coalesced_requests,
        assets = stats.assets_loaded,
        "Staging finished"
    );

    let staged = loader.with_design(|design| {
        design
            .artboard_ids()
            .into_iter()
            .filter(|id| loader.is_artboard_ready(id))
            .collect::<Vec<_>>()
    });
    for artboard_id in &staged {
        println!("ready  {}", artboard_id);
    }
    println!(
        "{} artboard(s) ready, {} asset(s) staged in {:.2}s",
        staged.len(),
        stats.assets_loaded,
        elapsed.as_secs_f64()
    );

    backend.shutdown().await;
    result.map_err(CliError::from)
}

async fn stage_targets(
    loader: &DesignLoader,
    artboards: &[String],
    pages: &[String],
    all: bool,
    cancel: &CancellationToken,
) -> Result<(), StageError> {
    if all {
        let ids = loader.with_design(|design| {
            design
                .artboards()
                .filter(|artboard| artboard.available)
                .map(|artboard| artboard.id.clone())
                .collect::<Vec<_>>()
        });
        return loader.ensure_artboards_ready(&ids, cancel).await;
    }

    for page in pages {
        loader.ensure_page_ready(&PageId::from(page.as_str()), cancel).await?;
    }
    let ids: Vec<ArtboardId> = artboards
        .iter()
        .map(|id| ArtboardId::from(id.as_str()))
        .collect();
    loader.ensure_artboards_ready(&ids, cancel).await
}
