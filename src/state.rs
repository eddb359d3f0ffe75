use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    persist,
    sprite::SpriteLayout,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Directory of section-mapping JSON files, one per job.
    pub mappings_dir: Option<PathBuf>,
    /// Template staging store shipped with the tool.
    pub bundled_store: Option<PathBuf>,
    /// Per-user staging store; seeded from `bundled_store` when missing.
    pub working_store: Option<PathBuf>,
    /// Template color-table binary that commits are applied to.
    pub clut_template: Option<PathBuf>,
    pub layout: SpriteLayout,
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", "SpriteRecolor")
        .ok_or_else(|| Error::NotFound("unable to open global config directory".to_string()))
}

pub fn get_global_config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

impl GlobalConfig {
    pub fn load() -> Result<Self> {
        persist::load_global_config(&get_global_config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        persist::save_global_config(&get_global_config_path()?, self)
    }

    /// Working staging store, defaulting to the user data directory.
    pub fn working_store_path(&self) -> Result<PathBuf> {
        match &self.working_store {
            Some(path) => Ok(path.clone()),
            None => Ok(project_dirs()?.data_dir().join("charclut.sqlite")),
        }
    }
}
