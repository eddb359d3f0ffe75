// Section-based recoloring of a loaded palette blob.
use std::path::Path;

use hashbrown::{hash_map::Entry, HashMap};
use log::{debug, info};

use crate::{
    common::{ColorIdx, Rgb},
    error::{Error, Result},
    palette::PaletteBlob,
    section::{JobSection, Role, SectionId, SectionMapping},
    shade::ShadeModel,
};

// Primary index and sorted tracked indices. Two sections with the same shape
// share a model regardless of which mapping they came from.
type ShadeKey = (ColorIdx, Vec<ColorIdx>);

/// One editing session over one blob. Owns the blob and the shade models
/// captured from its pristine palette; nothing here is shared globally.
#[derive(Debug)]
pub struct EditSession {
    blob: PaletteBlob,
    shade_models: HashMap<ShadeKey, ShadeModel>,
}

impl EditSession {
    pub fn new(blob: PaletteBlob) -> Self {
        EditSession {
            blob,
            shade_models: HashMap::new(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(PaletteBlob::from_file(path)?))
    }

    pub fn blob(&self) -> &PaletteBlob {
        &self.blob
    }

    pub fn blob_mut(&mut self) -> &mut PaletteBlob {
        &mut self.blob
    }

    pub fn into_blob(self) -> PaletteBlob {
        self.blob
    }

    // Built from the pristine snapshot the first time a section is applied.
    fn shade_model(&mut self, section: &JobSection, primary: ColorIdx) -> Result<&ShadeModel> {
        let mut tracked: Vec<ColorIdx> = section.tracked_indices().collect();
        tracked.sort_unstable();
        match self.shade_models.entry((primary, tracked)) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let mut original = HashMap::new();
                for &idx in &e.key().1 {
                    original.insert(idx, self.blob.original_color(idx)?);
                }
                let model = ShadeModel::new(&original, primary)?;
                debug!(
                    "captured shade relationships for '{}' around index {}",
                    section.name(),
                    primary
                );
                Ok(e.insert(model))
            }
        }
    }
}

/// Applies base colors to the sections of one mapping.
#[derive(Debug)]
pub struct SectionEditor {
    mapping: SectionMapping,
}

impl SectionEditor {
    pub fn new(mapping: SectionMapping) -> Self {
        SectionEditor { mapping }
    }

    pub fn mapping(&self) -> &SectionMapping {
        &self.mapping
    }

    /// Sets the section's primary to `base` and regenerates its derived
    /// entries. Accent entries keep whatever they currently hold.
    pub fn apply_section_color(
        &self,
        session: &mut EditSession,
        id: SectionId,
        base: Rgb,
    ) -> Result<()> {
        let section = self.mapping.section(id)?;
        let Some(primary) = section.primary_index() else {
            debug!("section '{}' has no base entry, nothing to apply", section.name());
            return Ok(());
        };

        for (idx, role) in section.entries() {
            let color = match role {
                Role::Accent | Role::AccentShadow => continue,
                _ if idx == primary => base,
                Role::Shadow | Role::Highlight | Role::Dark | Role::Base => {
                    session.shade_model(section, primary)?.generate_shade(idx, base)?
                }
            };
            session.blob.set_color(idx, color)?;
        }
        Ok(())
    }

    /// Applies to `id` and to every section linked from it.
    pub fn apply_linked_section_color(
        &self,
        session: &mut EditSession,
        id: SectionId,
        base: Rgb,
    ) -> Result<()> {
        self.apply_section_color(session, id, base)?;
        for &linked in self.mapping.linked(id) {
            self.apply_section_color(session, linked, base)?;
        }
        Ok(())
    }

    /// Restores the section's entries byte-for-byte from the pristine snapshot.
    pub fn reset_section(&self, session: &mut EditSession, id: SectionId) -> Result<()> {
        let section = self.mapping.section(id)?;
        for &idx in section.indices() {
            session.blob.reset_index(idx)?;
        }
        Ok(())
    }

    pub fn reset_all(&self, session: &mut EditSession) {
        info!("Resetting palette for {}", self.mapping.job());
        session.blob.reset();
    }

    /// Current color at the section's primary index.
    pub fn base_color(&self, session: &EditSession, id: SectionId) -> Result<Rgb> {
        let section = self.mapping.section(id)?;
        let primary = section.primary_index().ok_or_else(|| {
            Error::NotFound(format!("base entry of section '{}'", section.name()))
        })?;
        session.blob.color(primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        color::{encode, Hsl},
        palette::PALETTE_BYTES,
    };

    fn blob() -> PaletteBlob {
        let mut bytes = vec![0u8; PALETTE_BYTES + 16];
        for (i, b) in bytes[PALETTE_BYTES..].iter_mut().enumerate() {
            *b = 0xA0 | i as u8;
        }
        let mut blob = PaletteBlob::load(bytes).unwrap();
        let colors = [
            (1, Rgb::new(40, 40, 40)),
            (2, Rgb::new(230, 200, 20)),
            (3, Rgb::new(77, 77, 77)),
            (4, Rgb::new(128, 128, 128)),
            (5, Rgb::new(190, 190, 190)),
            (6, Rgb::new(60, 20, 90)),
            (7, Rgb::new(120, 40, 180)),
        ];
        for (idx, c) in colors {
            blob.set_color(idx, c).unwrap();
        }
        PaletteBlob::load(blob.serialize()).unwrap()
    }

    fn editor() -> SectionEditor {
        let cape = JobSection::new(
            "Cape",
            "Cape",
            vec![3, 4, 5, 2],
            vec![Role::Shadow, Role::Base, Role::Highlight, Role::Accent],
            Some("Hood".into()),
        )
        .unwrap();
        let hood = JobSection::new(
            "Hood",
            "Hood",
            vec![6, 7, 1],
            vec![Role::Dark, Role::Highlight, Role::AccentShadow],
            None,
        )
        .unwrap();
        SectionEditor::new(SectionMapping::new("Knight", "knight.bin", vec![cape, hood]).unwrap())
    }

    #[test]
    fn base_is_written_exactly_and_shadow_follows() {
        let editor = editor();
        let mut session = EditSession::new(blob());
        let cape = editor.mapping().find("Cape").unwrap();
        editor
            .apply_section_color(&mut session, cape, Rgb::new(255, 0, 0))
            .unwrap();

        assert_eq!(session.blob().color(4).unwrap(), Rgb::new(255, 0, 0));
        let shadow = Hsl::from_rgb(session.blob().color(3).unwrap());
        let ratio = Hsl::from_rgb(session.blob().original_color(3).unwrap()).l
            / Hsl::from_rgb(session.blob().original_color(4).unwrap()).l;
        assert!((shadow.l - 0.5 * ratio).abs() < 0.02);
        assert_eq!(session.blob().color(3).unwrap().green, 0);
    }

    #[test]
    fn accents_are_never_touched() {
        let editor = editor();
        let mut session = EditSession::new(blob());
        let before = session.blob().serialize();
        let cape = editor.mapping().find("Cape").unwrap();
        let hood = editor.mapping().find("Hood").unwrap();
        for c in [Rgb::new(255, 0, 0), Rgb::new(0, 90, 255), Rgb::new(12, 250, 9)] {
            editor.apply_linked_section_color(&mut session, cape, c).unwrap();
            editor.apply_section_color(&mut session, hood, c).unwrap();
        }
        let after = session.blob().serialize();
        // index 2 (accent) and index 1 (accent_shadow)
        assert_eq!(&after[4..6], &before[4..6]);
        assert_eq!(&after[2..4], &before[2..4]);
        assert_ne!(&after[8..10], &before[8..10]);
    }

    #[test]
    fn dark_acts_as_base_without_one() {
        let editor = editor();
        let mut session = EditSession::new(blob());
        let hood = editor.mapping().find("Hood").unwrap();
        editor
            .apply_section_color(&mut session, hood, Rgb::new(0, 0, 255))
            .unwrap();
        assert_eq!(session.blob().color(6).unwrap(), Rgb::new(0, 0, 255));
        assert_eq!(editor.base_color(&session, hood).unwrap(), Rgb::new(0, 0, 255));
    }

    #[test]
    fn linked_sections_follow_their_primary() {
        let editor = editor();
        let mut session = EditSession::new(blob());
        let cape = editor.mapping().find("Cape").unwrap();
        editor
            .apply_linked_section_color(&mut session, cape, Rgb::new(0, 255, 0))
            .unwrap();
        assert_eq!(session.blob().color(6).unwrap(), Rgb::new(0, 255, 0));
    }

    #[test]
    fn reset_section_restores_load_bytes() {
        let editor = editor();
        let original = blob().serialize();
        let mut session = EditSession::new(blob());
        let cape = editor.mapping().find("Cape").unwrap();
        let hood = editor.mapping().find("Hood").unwrap();
        for c in [Rgb::new(255, 0, 0), Rgb::new(3, 3, 3), Rgb::new(200, 180, 255)] {
            editor.apply_linked_section_color(&mut session, cape, c).unwrap();
            editor.apply_section_color(&mut session, hood, c).unwrap();
        }

        editor.reset_section(&mut session, cape).unwrap();
        let after = session.blob().serialize();
        for idx in [2usize, 3, 4, 5] {
            assert_eq!(&after[idx * 2..idx * 2 + 2], &original[idx * 2..idx * 2 + 2]);
        }
        // Hood was not reset.
        assert_ne!(&after[12..14], &original[12..14]);

        editor.reset_all(&mut session);
        assert_eq!(session.blob().serialize(), original);
    }

    #[test]
    fn shade_ratios_come_from_the_pristine_palette() {
        let editor = editor();
        let cape = editor.mapping().find("Cape").unwrap();

        let mut fresh = EditSession::new(blob());
        editor.apply_section_color(&mut fresh, cape, Rgb::new(90, 30, 200)).unwrap();

        let mut reused = EditSession::new(blob());
        editor.apply_section_color(&mut reused, cape, Rgb::new(255, 255, 0)).unwrap();
        editor.apply_section_color(&mut reused, cape, Rgb::new(90, 30, 200)).unwrap();

        assert_eq!(fresh.blob().palette(), reused.blob().palette());
    }

    fn cape_editor(job: &str, shadow: ColorIdx, base: ColorIdx) -> SectionEditor {
        let cape = JobSection::new(
            "Cape",
            "Cape",
            vec![shadow, base],
            vec![Role::Shadow, Role::Base],
            None,
        )
        .unwrap();
        SectionEditor::new(SectionMapping::new(job, "shared.bin", vec![cape]).unwrap())
    }

    #[test]
    fn same_section_name_in_two_mappings_shares_one_session() {
        let knight = cape_editor("Knight", 3, 4);
        let archer = cape_editor("Archer", 6, 7);
        let mut session = EditSession::new(blob());

        let id = knight.mapping().find("Cape").unwrap();
        knight
            .apply_section_color(&mut session, id, Rgb::new(255, 0, 0))
            .unwrap();
        let id = archer.mapping().find("Cape").unwrap();
        archer
            .apply_section_color(&mut session, id, Rgb::new(0, 0, 255))
            .unwrap();

        assert_eq!(session.blob().color(4).unwrap(), Rgb::new(255, 0, 0));
        assert_eq!(session.blob().color(7).unwrap(), Rgb::new(0, 0, 255));
        let shadow = session.blob().color(6).unwrap();
        assert_eq!((shadow.red, shadow.green), (0, 0));
        assert!(shadow.blue > 0);
    }

    #[test]
    fn red_shadow_through_a_loaded_blob() {
        let mut bytes = vec![0u8; PALETTE_BYTES];
        bytes[6..8].copy_from_slice(&encode(77, 77, 77).to_le_bytes());
        bytes[8..10].copy_from_slice(&encode(128, 128, 128).to_le_bytes());
        let mut session = EditSession::new(PaletteBlob::load(bytes).unwrap());

        let editor = cape_editor("Knight", 3, 4);
        let cape = editor.mapping().find("Cape").unwrap();
        editor
            .apply_section_color(&mut session, cape, Rgb::new(255, 0, 0))
            .unwrap();

        assert_eq!(session.blob().color(4).unwrap(), Rgb::new(255, 0, 0));
        let shadow = session.blob().color(3).unwrap();
        let hsl = Hsl::from_rgb(shadow);
        assert!((hsl.l - 0.3).abs() < 0.02, "lightness {}", hsl.l);
        assert!(hsl.h.abs() < 1.0);
        assert_eq!((shadow.green, shadow.blue), (0, 0));
    }
}
