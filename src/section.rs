// Named groups of palette indices and their recoloring roles.
use std::{fmt, path::Path, str::FromStr};

use hashbrown::HashMap;
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    common::{ColorIdx, PALETTE_SIZE},
    error::{Error, Result},
    persist::load_json,
};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Shadow,
    Dark,
    Base,
    Highlight,
    Accent,
    AccentShadow,
}

impl Role {
    /// Accent roles are never recolored by a section apply.
    pub fn is_protected(self) -> bool {
        matches!(self, Role::Accent | Role::AccentShadow)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Shadow => "shadow",
            Role::Dark => "dark",
            Role::Base => "base",
            Role::Highlight => "highlight",
            Role::Accent => "accent",
            Role::AccentShadow => "accent_shadow",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "shadow" => Ok(Role::Shadow),
            "dark" => Ok(Role::Dark),
            "base" => Ok(Role::Base),
            "highlight" => Ok(Role::Highlight),
            "accent" => Ok(Role::Accent),
            "accent_shadow" => Ok(Role::AccentShadow),
            _ => Err(Error::Argument(format!("unknown role '{s}'"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobSection {
    name: String,
    display_name: String,
    indices: Vec<ColorIdx>,
    roles: Vec<Role>,
    linked_to: Option<String>,
}

impl JobSection {
    pub fn new(
        name: &str,
        display_name: &str,
        indices: Vec<ColorIdx>,
        roles: Vec<Role>,
        linked_to: Option<String>,
    ) -> Result<Self> {
        let bad = |msg: String| Error::Argument(format!("section '{name}': {msg}"));
        if indices.is_empty() {
            return Err(bad("no indices".to_string()));
        }
        if indices.len() != roles.len() {
            return Err(bad(format!(
                "{} indices but {} roles",
                indices.len(),
                roles.len()
            )));
        }
        if let Some(idx) = indices.iter().find(|&&i| i as usize >= PALETTE_SIZE) {
            return Err(bad(format!("index {idx} outside the palette")));
        }
        if let Some(idx) = indices.iter().duplicates().next() {
            return Err(bad(format!("index {idx} listed twice")));
        }

        let section = JobSection {
            name: name.to_string(),
            display_name: display_name.to_string(),
            indices,
            roles,
            linked_to,
        };
        let needs_primary = section
            .roles
            .iter()
            .any(|r| matches!(r, Role::Shadow | Role::Highlight));
        if needs_primary && section.primary_index().is_none() {
            return Err(bad("shadow/highlight roles without a base".to_string()));
        }
        Ok(section)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn indices(&self) -> &[ColorIdx] {
        &self.indices
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn linked_to(&self) -> Option<&str> {
        self.linked_to.as_deref()
    }

    pub fn entries(&self) -> impl Iterator<Item = (ColorIdx, Role)> + '_ {
        self.indices.iter().copied().zip(self.roles.iter().copied())
    }

    fn index_with_role(&self, role: Role) -> Option<ColorIdx> {
        self.entries().find(|&(_, r)| r == role).map(|(i, _)| i)
    }

    /// The user-editable index: the "base" entry, else "dark" standing in for it.
    pub fn primary_index(&self) -> Option<ColorIdx> {
        self.index_with_role(Role::Base)
            .or_else(|| self.index_with_role(Role::Dark))
    }

    /// Indices whose color is derived from or equal to the primary.
    pub fn tracked_indices(&self) -> impl Iterator<Item = ColorIdx> + '_ {
        self.entries()
            .filter(|(_, r)| !r.is_protected())
            .map(|(i, _)| i)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub usize);

#[derive(Clone, Debug)]
pub struct SectionMapping {
    job: String,
    sprite: String,
    sections: Vec<JobSection>,
    by_name: HashMap<String, SectionId>,
    // Section -> sections that follow it when it is recolored.
    links: HashMap<SectionId, Vec<SectionId>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SectionDoc {
    name: String,
    display_name: String,
    // Wider than ColorIdx so out-of-range entries reach validation.
    indices: Vec<i64>,
    roles: Vec<String>,
    #[serde(default)]
    linked_to: Option<String>,
}

#[derive(Deserialize)]
struct MappingDoc {
    job: String,
    sprite: String,
    sections: Vec<SectionDoc>,
}

impl SectionMapping {
    pub fn new(job: &str, sprite: &str, sections: Vec<JobSection>) -> Result<Self> {
        let mut by_name = HashMap::new();
        for (i, section) in sections.iter().enumerate() {
            if by_name
                .insert(section.name().to_string(), SectionId(i))
                .is_some()
            {
                return Err(Error::Argument(format!(
                    "duplicate section name '{}'",
                    section.name()
                )));
            }
        }

        let mut links: HashMap<SectionId, Vec<SectionId>> = HashMap::new();
        for (i, section) in sections.iter().enumerate() {
            if let Some(target) = section.linked_to() {
                let target_id = *by_name.get(target).ok_or_else(|| {
                    Error::NotFound(format!(
                        "section '{}' links to unknown section '{}'",
                        section.name(),
                        target
                    ))
                })?;
                if target_id != SectionId(i) {
                    links.entry(SectionId(i)).or_default().push(target_id);
                }
            }
        }

        Ok(SectionMapping {
            job: job.to_string(),
            sprite: sprite.to_string(),
            sections,
            by_name,
            links,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: MappingDoc = serde_json::from_str(json)?;
        Self::from_doc(doc)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_doc(load_json(path)?)
    }

    fn from_doc(doc: MappingDoc) -> Result<Self> {
        let sections = doc
            .sections
            .into_iter()
            .map(|s| {
                let indices = s
                    .indices
                    .iter()
                    .map(|&i| {
                        ColorIdx::try_from(i).map_err(|_| {
                            Error::Argument(format!(
                                "section '{}': index {i} outside the palette",
                                s.name
                            ))
                        })
                    })
                    .collect::<Result<Vec<ColorIdx>>>()?;
                let roles = s
                    .roles
                    .iter()
                    .map(|r| r.parse())
                    .collect::<Result<Vec<Role>>>()?;
                JobSection::new(&s.name, &s.display_name, indices, roles, s.linked_to)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(&doc.job, &doc.sprite, sections)
    }

    pub fn job(&self) -> &str {
        &self.job
    }

    pub fn sprite(&self) -> &str {
        &self.sprite
    }

    pub fn sections(&self) -> &[JobSection] {
        &self.sections
    }

    pub fn ids(&self) -> impl Iterator<Item = SectionId> {
        (0..self.sections.len()).map(SectionId)
    }

    pub fn section(&self, id: SectionId) -> Result<&JobSection> {
        self.sections
            .get(id.0)
            .ok_or_else(|| Error::NotFound(format!("section #{}", id.0)))
    }

    pub fn find(&self, name: &str) -> Result<SectionId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::NotFound(format!("section '{name}'")))
    }

    /// Sections recolored together with `id`.
    pub fn linked(&self, id: SectionId) -> &[SectionId] {
        self.links.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sections to present for editing. A link target is hidden behind the
    /// section linking to it; with two-way links the earlier one is kept.
    pub fn editable_sections(&self) -> Vec<SectionId> {
        self.ids()
            .filter(|&id| {
                let first_linker = self
                    .ids()
                    .find(|&other| other != id && self.linked(other).contains(&id));
                match first_linker {
                    None => true,
                    Some(linker) => {
                        let links_out = !self.linked(id).is_empty();
                        links_out && linker > id
                    }
                }
            })
            .collect()
    }
}
