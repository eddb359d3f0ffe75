// Stages color table entries and flattens them into a template binary.
use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

use super::{
    check_magic, clamp_values, clut_offset, store::StagingStore, Chapter, ClutData, ClutKey,
    CLUT_LEN,
};
use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PatcherState {
    Uninitialized,
    StagingReady,
    Patched,
}

/// Copies the template and overwrites the region of every mapped key.
/// Keys missing from the offset table are skipped. Nothing is returned
/// unless every region fits.
pub fn patch_template(template: &[u8], entries: &[(ClutKey, ClutData)]) -> Result<Vec<u8>> {
    check_magic(template)?;
    let mut out = template.to_vec();
    for (key, values) in entries {
        let Some(offset) = clut_offset(*key) else {
            debug!("no table offset for color table key {}, skipping", key);
            continue;
        };
        let region = out.get_mut(offset..offset + CLUT_LEN).ok_or_else(|| {
            Error::Format(format!(
                "color table binary is {} bytes, region {key} ends at {}",
                template.len(),
                offset + CLUT_LEN
            ))
        })?;
        region.copy_from_slice(values);
    }
    Ok(out)
}

#[derive(Debug)]
pub struct ClutPatcher {
    state: PatcherState,
    working: Option<PathBuf>,
    store: Option<StagingStore>,
}

impl Default for ClutPatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ClutPatcher {
    pub fn new() -> Self {
        ClutPatcher {
            state: PatcherState::Uninitialized,
            working: None,
            store: None,
        }
    }

    pub fn state(&self) -> PatcherState {
        self.state
    }

    pub fn working_store(&self) -> Option<&Path> {
        self.working.as_deref()
    }

    /// Opens the working store, seeding it from `bundled` if it does not exist.
    pub fn initialize(&mut self, working: &Path, bundled: Option<&Path>) -> Result<()> {
        self.release()?;
        self.store = Some(StagingStore::open_or_seed(working, bundled)?);
        self.working = Some(working.to_path_buf());
        self.state = PatcherState::StagingReady;
        Ok(())
    }

    // Reopens the working store after a commit released it.
    fn store_mut(&mut self) -> Result<&mut StagingStore> {
        let working = self.working.as_ref().ok_or_else(|| {
            Error::State("staging store has not been initialized".to_string())
        })?;
        if self.store.is_none() {
            self.store = Some(StagingStore::open(working)?);
            self.state = PatcherState::StagingReady;
        }
        self.store
            .as_mut()
            .ok_or_else(|| Error::State("staging store is closed".to_string()))
    }

    /// Clamps and upserts one entry. `values` must hold exactly 48 integers.
    pub fn stage_entry(&mut self, primary: i64, secondary: i64, values: &[i32]) -> Result<()> {
        let data = clamp_values(values)?;
        self.store_mut()?.upsert(ClutKey::new(primary, secondary), &data)
    }

    /// Writes `output` as a copy of `template` with every staged entry of
    /// `staging` applied. A template without the marker aborts before
    /// anything is written.
    pub fn commit(&mut self, template: &Path, staging: &Path, output: &Path) -> Result<()> {
        if self.state == PatcherState::Uninitialized {
            return Err(Error::State(
                "commit attempted before the staging store was initialized".to_string(),
            ));
        }
        self.release()?;
        if !staging.exists() {
            return Err(Error::NotFound(format!(
                "staging store {}",
                staging.display()
            )));
        }

        let reader = StagingStore::open(staging)?;
        let entries = reader.entries()?;
        reader.release()?;

        let template_bytes = fs::read(template)?;
        let patched = patch_template(&template_bytes, &entries)?;
        fs::write(output, patched)?;
        info!(
            "Patched {} staged color table entries from {} into {}",
            entries.len(),
            template.display(),
            output.display()
        );
        self.state = PatcherState::Patched;
        Ok(())
    }

    /// Stages one entry per chapter in a single transaction, then commits.
    /// If any entry is malformed or staging fails, no binary is written.
    pub fn commit_chapters(
        &mut self,
        batch: &[(Chapter, Vec<i32>)],
        template: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut entries = vec![];
        for (chapter, values) in batch {
            entries.push((chapter.key(), clamp_values(values)?));
        }
        self.store_mut()?.upsert_batch(&entries)?;

        let working = self.working.clone().ok_or_else(|| {
            Error::State("staging store has not been initialized".to_string())
        })?;
        self.commit(template, &working, output)
    }

    /// Closes the working store connection so the file can be replaced.
    pub fn release(&mut self) -> Result<()> {
        match self.store.take() {
            Some(store) => store.release(),
            None => Ok(()),
        }
    }
}
