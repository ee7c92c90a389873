// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Supported boards and their fully-qualified board names.

use crate::error::{BridgeError, Result};

/// Board used when a project does not pick one
pub const DEFAULT_BOARD: &str = "uno";

/// (name, FQBN) pairs the build tool knows how to target
pub const SUPPORTED_BOARDS: &[(&str, &str)] = &[
    ("uno", "arduino:avr:uno"),
    ("nano", "arduino:avr:nano"),
];

/// Resolve a board name (case-insensitive) to its canonical name and FQBN.
pub fn lookup(name: &str) -> Result<(&'static str, &'static str)> {
    let key = name.trim().to_lowercase();
    SUPPORTED_BOARDS
        .iter()
        .find(|(board, _)| *board == key)
        .copied()
        .ok_or_else(|| {
            let names: Vec<&str> = SUPPORTED_BOARDS.iter().map(|(board, _)| *board).collect();
            BridgeError::InvalidArgument(format!(
                "Board '{}' is not supported. Supported: {}",
                name,
                names.join(", ")
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(lookup(" UNO ").unwrap(), ("uno", "arduino:avr:uno"));
        assert_eq!(lookup("nano").unwrap().1, "arduino:avr:nano");
    }

    #[test]
    fn test_lookup_unknown_lists_supported() {
        let err = lookup("mega").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
        assert!(err.to_string().contains("uno, nano"));
    }

    #[test]
    fn test_default_board_is_supported() {
        assert!(lookup(DEFAULT_BOARD).is_ok());
    }
}
