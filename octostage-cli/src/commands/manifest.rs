//! `manifest` command: lists a cached design.

use clap::Args;
use octostage::design::Design;
use octostage::DesignId;

use crate::error::CliError;
use crate::runner::CliRunner;

#[derive(Debug, Args)]
pub struct ManifestArgs {
    /// Design id
    #[arg(long)]
    pub design: String,
}

pub fn run(args: ManifestArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("manifest");

    let design_id = DesignId::from(args.design);
    let cache = runner.content_cache();
    let manifest = runner.block_on(cache.read_manifest(&design_id))?;
    let design = Design::new(design_id.clone(), &manifest)?;

    println!("Design {}", design_id);
    println!("  cache: {}", cache.design_directory(&design_id).display());
    println!();

    for page in design.pages() {
        println!("Page {} ({})", page.id, page.name);
        for artboard_id in design.page_artboards(&page.id)? {
            print_artboard(&design, &artboard_id);
        }
        println!();
    }

    let unpaged: Vec<_> = design
        .artboards()
        .filter(|artboard| artboard.page_id.is_none())
        .map(|artboard| artboard.id.clone())
        .collect();
    if !unpaged.is_empty() {
        println!("Without page");
        for artboard_id in &unpaged {
            print_artboard(&design, artboard_id);
        }
    }

    Ok(())
}

fn print_artboard(design: &Design, artboard_id: &octostage::ArtboardId) {
    let Some(artboard) = design.artboard(artboard_id) else {
        return;
    };

    let mut line = format!("  {} {}", artboard.id, artboard.name);
    if let Some(component_id) = &artboard.component_id {
        line.push_str(&format!(" [component {}]", component_id));
    }
    if !artboard.available {
        line.push_str(" (unavailable)");
    }
    println!("{}", line);
}
