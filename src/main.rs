use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sprite_recolor::{
    common::Rgb,
    editor::{EditSession, SectionEditor},
    persist,
    section::SectionMapping,
    state::GlobalConfig,
};

#[derive(Parser, Debug)]
#[command(about = "Recolor sprite palettes by named section")]
struct Args {
    /// Directory of section mappings (overrides the global config)
    #[arg(long)]
    mappings: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store default paths in the global config
    Config {
        #[arg(long)]
        mappings_dir: Option<PathBuf>,
        #[arg(long)]
        clut_template: Option<PathBuf>,
        #[arg(long)]
        bundled_store: Option<PathBuf>,
    },
    /// List jobs that have a section mapping
    Jobs,
    /// List the editable sections of a job
    Sections { job: String },
    /// Apply base colors to sections of a sprite and save the result
    Recolor {
        job: String,
        /// Sprite or theme blob to read
        #[arg(long)]
        input: PathBuf,
        /// Where to write the recolored blob
        #[arg(long)]
        output: PathBuf,
        /// Section=RRGGBB, may be repeated
        #[arg(long = "set")]
        sets: Vec<String>,
        /// Section to restore from the input, may be repeated
        #[arg(long = "reset")]
        resets: Vec<String>,
        /// Write a PNG preview of one frame
        #[arg(long)]
        preview: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        frame: u32,
        #[arg(long, default_value_t = 0)]
        palette: u8,
    },
}

fn parse_assignment(arg: &str) -> Result<(&str, Rgb)> {
    let Some((name, color)) = arg.split_once('=') else {
        bail!("expected Section=RRGGBB, got '{}'", arg);
    };
    let color: Rgb = color
        .parse()
        .with_context(|| format!("invalid color for section '{}'", name))?;
    Ok((name.trim(), color))
}

fn load_mapping(mappings_dir: &Path, job: &str) -> Result<SectionMapping> {
    let path = persist::mapping_path(mappings_dir, job);
    SectionMapping::from_file(&path)
        .with_context(|| format!("loading section mapping {}", path.display()))
}

pub fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut config = GlobalConfig::load().context("loading global config")?;
    let mappings = args.mappings.or(config.mappings_dir.clone());
    let require_mappings = || {
        mappings.clone().ok_or_else(|| {
            anyhow!("no mappings directory: pass --mappings or set mappings_dir in the config")
        })
    };

    match args.command {
        Command::Config {
            mappings_dir,
            clut_template,
            bundled_store,
        } => {
            config.mappings_dir = mappings_dir.or(config.mappings_dir);
            config.clut_template = clut_template.or(config.clut_template);
            config.bundled_store = bundled_store.or(config.bundled_store);
            config.save().context("saving global config")?;
        }
        Command::Jobs => {
            for job in persist::available_jobs(&require_mappings()?)? {
                println!("{}", job);
            }
        }
        Command::Sections { job } => {
            let mapping = load_mapping(&require_mappings()?, &job)?;
            for id in mapping.editable_sections() {
                let section = mapping.section(id)?;
                let linked = mapping
                    .linked(id)
                    .iter()
                    .map(|&l| mapping.section(l).map(|s| s.name()))
                    .collect::<sprite_recolor::error::Result<Vec<_>>>()?;
                if linked.is_empty() {
                    println!("{} ({})", section.name(), section.display_name());
                } else {
                    println!(
                        "{} ({}) -> {}",
                        section.name(),
                        section.display_name(),
                        linked.join(", ")
                    );
                }
            }
        }
        Command::Recolor {
            job,
            input,
            output,
            sets,
            resets,
            preview,
            frame,
            palette,
        } => {
            let editor = SectionEditor::new(load_mapping(&require_mappings()?, &job)?);
            let mut session = EditSession::open(&input)
                .with_context(|| format!("loading sprite {}", input.display()))?;

            for arg in &sets {
                let (name, color) = parse_assignment(arg)?;
                let id = editor.mapping().find(name)?;
                info!("Setting {} to {}", name, color);
                editor.apply_linked_section_color(&mut session, id, color)?;
            }
            for name in &resets {
                let id = editor.mapping().find(name)?;
                editor.reset_section(&mut session, id)?;
            }

            session.blob().save_to_file(&output)?;
            if let Some(preview) = preview {
                let bitmap = session
                    .blob()
                    .decode_sprite(&config.layout, palette, frame)?;
                bitmap.write_png(&preview)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments_parse_name_and_color() {
        let (name, color) = parse_assignment("Cape=#FF8000").unwrap();
        assert_eq!(name, "Cape");
        assert_eq!(color, Rgb::new(255, 128, 0));
        assert!(parse_assignment("Cape").is_err());
        assert!(parse_assignment("Cape=blue").is_err());
    }
}
