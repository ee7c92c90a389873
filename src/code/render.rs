// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Sketch text generation and the reverse parser
//!
//! Generated layout:
//!
//! ```text
//! #include <Arduino.h>
//!
//! //**Global variables**
//! int led = 13;
//!
//! //**Functions**
//! // No functions defined
//!
//! //**Setup**
//! void setup() {
//! 	pinMode(led, OUTPUT);
//! }
//!
//! //**Loop**
//! void loop() {
//! 	//Loop code goes here
//! }
//! ```

use super::{CodeSectionStore, Section};
use crate::error::{BridgeError, Result};

pub const INCLUDE_LINE: &str = "#include <Arduino.h>";

const GENERATION_ORDER: [Section; 4] = [
    Section::Globals,
    Section::Functions,
    Section::Setup,
    Section::Loop,
];

fn marker(section: Section) -> &'static str {
    match section {
        Section::Globals => "//**Global variables**",
        Section::Functions => "//**Functions**",
        Section::Setup => "//**Setup**",
        Section::Loop => "//**Loop**",
    }
}

fn placeholder(section: Section) -> &'static str {
    match section {
        Section::Globals => "// No global variables defined",
        Section::Functions => "// No functions defined",
        Section::Setup => "//Setup code goes here",
        Section::Loop => "//Loop code goes here",
    }
}

/// Opening line of the function body a section is wrapped in
fn wrapper(section: Section) -> Option<&'static str> {
    match section {
        Section::Setup => Some("void setup() {"),
        Section::Loop => Some("void loop() {"),
        Section::Globals | Section::Functions => None,
    }
}

pub(super) fn generate(store: &CodeSectionStore) -> String {
    let mut out = String::new();
    out.push_str(INCLUDE_LINE);
    out.push_str("\n\n");

    for section in GENERATION_ORDER {
        out.push_str(marker(section));
        out.push('\n');

        let cells = store.cells(section);
        let lines: Vec<&str> = if cells.is_empty() {
            vec![placeholder(section)]
        } else {
            cells.values().flat_map(|code| code.lines()).collect()
        };

        match wrapper(section) {
            Some(open) => {
                out.push_str(open);
                out.push('\n');
                for line in lines {
                    out.push('\t');
                    out.push_str(line);
                    out.push('\n');
                }
                out.push_str("}\n");
            }
            None => {
                for line in lines {
                    out.push_str(line);
                    out.push('\n');
                }
            }
        }
        out.push('\n');
    }
    out
}

/// Section switched to by a marker or function-signature line
fn section_start(line: &str) -> Option<Section> {
    if let Some(section) = GENERATION_ORDER.into_iter().find(|s| marker(*s) == line) {
        return Some(section);
    }
    if line.starts_with("void setup()") {
        Some(Section::Setup)
    } else if line.starts_with("void loop()") {
        Some(Section::Loop)
    } else {
        None
    }
}

fn is_boilerplate(line: &str) -> bool {
    line == INCLUDE_LINE
        || line == "{"
        || line == "}"
        || GENERATION_ORDER.iter().any(|s| placeholder(*s) == line)
}

/// Rebuild a store from sketch text, one cell per non-blank line.
///
/// Lossy: a line equal to the include line, to a section placeholder comment,
/// or to a bare `{` or `}` is dropped, even when it came from a user fragment.
/// Importing generated text therefore does not always give back the cells
/// that produced it.
pub(super) fn parse(text: &str) -> Result<CodeSectionStore> {
    let mut store = CodeSectionStore::new();
    let mut current: Option<Section> = None;
    let mut next_id = 0usize;

    for (number, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || is_boilerplate(line) {
            continue;
        }
        if let Some(section) = section_start(line) {
            if current != Some(section) {
                current = Some(section);
                next_id = 0;
            }
            continue;
        }
        let section = current.ok_or_else(|| {
            BridgeError::Format(format!(
                "line {} appears before any section marker: {}",
                number + 1,
                line
            ))
        })?;
        store
            .cells_mut(section)
            .insert(next_id.to_string(), line.to_string());
        next_id += 1;
    }
    Ok(store)
}
