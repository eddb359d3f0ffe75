use std::{
    fs,
    path::{Path, PathBuf},
};

use json_pretty_compact::PrettyCompactFormatter;
use log::info;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Serializer;

use crate::{
    error::{Error, Result},
    state::GlobalConfig,
};

pub fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    info!("Saving {}", path.display());
    let formatter = PrettyCompactFormatter::new();
    let mut data_bytes = vec![];
    let mut ser = Serializer::with_formatter(&mut data_bytes, formatter);
    data.serialize(&mut ser)?;
    let parent = path
        .parent()
        .ok_or_else(|| Error::Argument(format!("no parent directory for {}", path.display())))?;
    fs::create_dir_all(parent)?;
    fs::write(path, &data_bytes)?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    info!("Loading {}", path.display());
    let data_bytes = fs::read(path)?;
    let data: T = serde_json::from_slice(&data_bytes)?;
    Ok(data)
}

/// Loads the config at `path`, falling back to defaults if it does not exist yet.
pub fn load_global_config(path: &Path) -> Result<GlobalConfig> {
    if !path.exists() {
        info!("No config at {}, using defaults", path.display());
        return Ok(GlobalConfig::default());
    }
    load_json(path)
}

pub fn save_global_config(path: &Path, config: &GlobalConfig) -> Result<()> {
    save_json(path, config)
}

/// Path of the section mapping for `job` inside `mappings_dir`.
pub fn mapping_path(mappings_dir: &Path, job: &str) -> PathBuf {
    mappings_dir.join(format!("{}.json", job))
}

/// Job names (file stems) of every mapping in `mappings_dir`, sorted.
pub fn available_jobs(mappings_dir: &Path) -> Result<Vec<String>> {
    if !mappings_dir.is_dir() {
        return Ok(vec![]);
    }
    let pattern = format!("{}/*.json", mappings_dir.display());
    let mut jobs = vec![];
    for entry in glob::glob(&pattern)? {
        let path = entry?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            jobs.push(stem.to_string());
        }
    }
    jobs.sort();
    Ok(jobs)
}
