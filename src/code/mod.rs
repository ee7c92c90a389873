// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sketch source assembled from notebook cells
//!
//! Fragments live in four sections, each keyed by cell id. `generate` turns
//! them into one sketch file; `import_from_code` reads such a file back,
//! renumbering cells. Only the JSON form preserves cell ids exactly.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

mod render;

pub use render::INCLUDE_LINE;

/// Logical region of the generated sketch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Globals,
    Setup,
    Loop,
    Functions,
}

impl Section {
    /// Storage and JSON order
    pub const ALL: [Section; 4] = [
        Section::Globals,
        Section::Setup,
        Section::Loop,
        Section::Functions,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Globals => "globals",
            Section::Setup => "setup",
            Section::Loop => "loop",
            Section::Functions => "functions",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Section {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "globals" => Ok(Section::Globals),
            "setup" => Ok(Section::Setup),
            "loop" => Ok(Section::Loop),
            "functions" => Ok(Section::Functions),
            other => Err(BridgeError::UnknownSection(other.to_string())),
        }
    }
}

/// The four section maps of one sketch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodeSectionStore {
    globals: IndexMap<String, String>,
    setup: IndexMap<String, String>,
    #[serde(rename = "loop")]
    loop_: IndexMap<String, String>,
    functions: IndexMap<String, String>,
}

impl CodeSectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cells of one section, keyed by cell id in insertion order
    pub fn cells(&self, section: Section) -> &IndexMap<String, String> {
        match section {
            Section::Globals => &self.globals,
            Section::Setup => &self.setup,
            Section::Loop => &self.loop_,
            Section::Functions => &self.functions,
        }
    }

    fn cells_mut(&mut self, section: Section) -> &mut IndexMap<String, String> {
        match section {
            Section::Globals => &mut self.globals,
            Section::Setup => &mut self.setup,
            Section::Loop => &mut self.loop_,
            Section::Functions => &mut self.functions,
        }
    }

    pub fn is_empty(&self) -> bool {
        Section::ALL.iter().all(|s| self.cells(*s).is_empty())
    }

    /// Store the trimmed `text` under `cell_id`, replacing any previous content.
    pub fn add_code(&mut self, section: &str, cell_id: &str, text: &str) -> Result<()> {
        let section: Section = section.parse()?;
        self.cells_mut(section)
            .insert(cell_id.to_string(), text.trim().to_string());
        Ok(())
    }

    /// Remove one cell, or the whole section when `cell_id` is `None`.
    pub fn remove_code(&mut self, section: &str, cell_id: Option<&str>) -> Result<()> {
        let section: Section = section.parse()?;
        let cells = self.cells_mut(section);
        match cell_id {
            None => cells.clear(),
            Some(id) => {
                cells.shift_remove(id).ok_or_else(|| {
                    BridgeError::InvalidArgument(format!(
                        "Cell '{}' not found in section '{}'",
                        id, section
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Replace an existing cell.
    ///
    /// Without an id, the cell is located by content: the last cell containing
    /// every line of `text`.
    pub fn replace_code(&mut self, section: &str, text: &str, cell_id: Option<&str>) -> Result<()> {
        let section: Section = section.parse()?;
        let id = match cell_id {
            Some(id) => id.to_string(),
            None => self.find_cell(section, text).ok_or_else(|| {
                BridgeError::InvalidArgument(format!(
                    "No cell in section '{}' matches the given code",
                    section
                ))
            })?,
        };
        let cells = self.cells_mut(section);
        if !cells.contains_key(&id) {
            return Err(BridgeError::InvalidArgument(format!(
                "Cell '{}' not found in section '{}'",
                id, section
            )));
        }
        cells.insert(id, text.trim().to_string());
        Ok(())
    }

    fn find_cell(&self, section: Section, text: &str) -> Option<String> {
        let needles: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if needles.is_empty() {
            return None;
        }
        self.cells(section)
            .iter()
            .filter(|(_, code)| needles.iter().all(|n| code.contains(n)))
            .map(|(id, _)| id.clone())
            .last()
    }

    /// Fragments of a section in insertion order
    pub fn get_section(&self, section: &str) -> Result<Vec<&str>> {
        let section: Section = section.parse()?;
        Ok(self.cells(section).values().map(String::as_str).collect())
    }

    pub fn clear(&mut self) {
        for section in Section::ALL {
            self.cells_mut(section).clear();
        }
    }

    /// Complete sketch source
    pub fn generate(&self) -> String {
        render::generate(self)
    }

    pub fn export_as_code(&self) -> String {
        self.generate()
    }

    /// Replace all sections with the contents of a generated sketch.
    ///
    /// Cells are renumbered from `0` within each section, one per line. Lines
    /// matching the include line, a placeholder comment, or a bare brace are
    /// dropped. On error the store is left untouched.
    pub fn import_from_code(&mut self, text: &str) -> Result<()> {
        *self = render::parse(text)?;
        Ok(())
    }

    pub fn export_as_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for section in Section::ALL {
            let cells = self
                .cells(section)
                .iter()
                .map(|(id, text)| (id.clone(), serde_json::Value::from(text.as_str())))
                .collect();
            object.insert(section.as_str().to_string(), serde_json::Value::Object(cells));
        }
        serde_json::Value::Object(object)
    }

    /// Replace all sections from `{section: {cell_id: text}}`.
    ///
    /// Missing sections become empty. Any other top-level key is rejected.
    pub fn import_from_json(&mut self, data: &serde_json::Value) -> Result<()> {
        let object = data.as_object().ok_or_else(|| {
            BridgeError::InvalidSections("expected an object of sections".to_string())
        })?;
        let unknown: Vec<&str> = object
            .keys()
            .filter(|k| k.parse::<Section>().is_err())
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(BridgeError::InvalidSections(unknown.join(", ")));
        }

        let mut store = CodeSectionStore::new();
        for (key, cells) in object {
            let section: Section = key.parse()?;
            *store.cells_mut(section) = IndexMap::deserialize(cells)?;
        }
        *self = store;
        Ok(())
    }
}
