use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use sprite_recolor::{
    clut::{palette_to_clut, patcher::ClutPatcher, Chapter},
    palette::PaletteBlob,
    state::GlobalConfig,
};

/// Writes chapter palettes into the character color table binary.
#[derive(Parser, Debug)]
struct Args {
    /// Sprite blob whose palette becomes the chapter 1 entry
    #[arg(long)]
    ch1: Option<PathBuf>,
    /// Sprite blob for chapters 2 and 3
    #[arg(long)]
    ch23: Option<PathBuf>,
    /// Sprite blob for chapter 4
    #[arg(long)]
    ch4: Option<PathBuf>,
    /// Template color table binary (defaults to the configured one)
    #[arg(long)]
    template: Option<PathBuf>,
    #[arg(long)]
    output: PathBuf,
    /// Working staging store (defaults to the user data directory)
    #[arg(long)]
    store: Option<PathBuf>,
}

pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = GlobalConfig::load().context("loading global config")?;

    let sources = [
        (Chapter::One, args.ch1),
        (Chapter::TwoThree, args.ch23),
        (Chapter::Four, args.ch4),
    ];
    let mut batch = vec![];
    for (chapter, path) in sources {
        let Some(path) = path else { continue };
        let blob = PaletteBlob::from_file(&path)
            .with_context(|| format!("loading sprite {}", path.display()))?;
        let clut = palette_to_clut(blob.palette_bytes())?;
        info!("Chapter {:?} palette from {}", chapter, path.display());
        batch.push((chapter, clut.iter().map(|&v| v as i32).collect::<Vec<i32>>()));
    }
    if batch.is_empty() {
        bail!("nothing to patch: pass at least one of --ch1, --ch23, --ch4");
    }

    let Some(template) = args.template.or(config.clut_template.clone()) else {
        bail!("no template binary: pass --template or set clut_template in the config");
    };
    let working = match args.store {
        Some(path) => path,
        None => config.working_store_path()?,
    };

    let mut patcher = ClutPatcher::new();
    patcher.initialize(&working, config.bundled_store.as_deref())?;
    patcher
        .commit_chapters(&batch, &template, &args.output)
        .with_context(|| format!("patching {}", template.display()))?;
    patcher.release()?;
    Ok(())
}
