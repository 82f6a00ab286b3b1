//! JSON persistence for gridstone spreadsheets.
//!
//! A spreadsheet round-trips as `{ "version": ..., "cells": { name: raw } }`
//! where each raw string is exactly what `set_contents_of_cell` accepts —
//! formulas keep their `=` prefix. Loading replays the engine's public edit
//! operation cell by cell. A formula may be replayed before the cells it
//! references exist; edits never read referenced cells, so a single pass in
//! any order reconstructs the sheet.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridstone_engine::error::EngineError;
use gridstone_engine::spreadsheet::Spreadsheet;

/// Failures while saving or loading a spreadsheet document.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cell {name} could not be replayed: {source}")]
    Replay { name: String, source: EngineError },
}

/// On-disk document shape. `BTreeMap` keeps saved output stable.
#[derive(Debug, Serialize, Deserialize)]
struct Document {
    version: String,
    cells: BTreeMap<String, String>,
}

/// Serializes `sheet` to a JSON string.
pub fn to_json(sheet: &Spreadsheet) -> Result<String, IoError> {
    let document = Document {
        version: sheet.version().to_string(),
        cells: sheet
            .raw_contents()
            .map(|(name, raw)| (name.to_string(), raw))
            .collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Rebuilds a spreadsheet from a JSON string by replaying every cell edit.
/// The result reads as unchanged until the next edit.
pub fn from_json(json: &str) -> Result<Spreadsheet, IoError> {
    let document: Document = serde_json::from_str(json)?;
    let mut sheet = Spreadsheet::new();
    sheet.set_version(document.version);
    for (name, raw) in &document.cells {
        sheet
            .set_contents_of_cell(name, raw)
            .map_err(|source| IoError::Replay {
                name: name.clone(),
                source,
            })?;
    }
    sheet.mark_saved();
    Ok(sheet)
}

/// Writes `sheet` to `path` and marks it saved.
pub fn save(sheet: &mut Spreadsheet, path: impl AsRef<Path>) -> Result<(), IoError> {
    let json = to_json(sheet)?;
    fs::write(path, json)?;
    sheet.mark_saved();
    Ok(())
}

/// Loads a spreadsheet from `path`.
pub fn load(path: impl AsRef<Path>) -> Result<Spreadsheet, IoError> {
    let json = fs::read_to_string(path)?;
    from_json(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridstone_engine::cell::{CellContent, Value};
    use gridstone_engine::formula::Formula;

    fn sample_sheet() -> Spreadsheet {
        let mut sheet = Spreadsheet::new();
        sheet.set_contents_of_cell("A1", "5").unwrap();
        sheet.set_contents_of_cell("B1", "=A1*2").unwrap();
        sheet.set_contents_of_cell("C1", "note").unwrap();
        sheet
    }

    #[test]
    fn test_json_roundtrip() {
        let sheet = sample_sheet();
        let json = to_json(&sheet).unwrap();
        let loaded = from_json(&json).unwrap();

        assert_eq!(
            loaded.get_cell_contents("A1").unwrap(),
            CellContent::Number(5.0)
        );
        assert_eq!(
            loaded.get_cell_contents("B1").unwrap(),
            CellContent::Formula(Formula::new("A1*2").unwrap())
        );
        assert_eq!(
            loaded.get_cell_contents("C1").unwrap(),
            CellContent::Text("note".to_string())
        );
        assert_eq!(loaded.get_cell_value("B1").unwrap(), Value::Number(10.0));
        assert!(!loaded.is_changed());
    }

    #[test]
    fn test_formulas_keep_their_prefix_on_disk() {
        let sheet = sample_sheet();
        let json = to_json(&sheet).unwrap();
        assert!(json.contains("\"=A1*2\""));
    }

    #[test]
    fn test_saved_output_is_stable() {
        let sheet = sample_sheet();
        assert_eq!(to_json(&sheet).unwrap(), to_json(&sheet).unwrap());
    }

    #[test]
    fn test_replay_order_does_not_matter() {
        // The formula cell sorts before the literal it references.
        let json = r#"{
            "version": "default",
            "cells": { "A1": "=Z9+1", "Z9": "41" }
        }"#;
        let sheet = from_json(json).unwrap();
        assert_eq!(sheet.get_cell_value("A1").unwrap(), Value::Number(42.0));
    }

    #[test]
    fn test_version_roundtrips() {
        let mut sheet = sample_sheet();
        sheet.set_version("ps6");
        let loaded = from_json(&to_json(&sheet).unwrap()).unwrap();
        assert_eq!(loaded.version(), "ps6");
    }

    #[test]
    fn test_bad_formula_reports_the_cell() {
        let json = r#"{
            "version": "default",
            "cells": { "A1": "=2++3" }
        }"#;
        match from_json(json) {
            Err(IoError::Replay { name, .. }) => assert_eq!(name, "A1"),
            other => panic!("expected replay error, got {other:?}"),
        }
    }

    #[test]
    fn test_circular_document_is_rejected() {
        let json = r#"{
            "version": "default",
            "cells": { "A1": "=B1", "B1": "=A1" }
        }"#;
        assert!(matches!(from_json(json), Err(IoError::Replay { .. })));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(matches!(from_json("{"), Err(IoError::Json(_))));
    }

    #[test]
    fn test_save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sheet.json");

        let mut sheet = sample_sheet();
        assert!(sheet.is_changed());
        save(&mut sheet, &path).unwrap();
        assert!(!sheet.is_changed());

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.get_cell_value("B1").unwrap(), Value::Number(10.0));
        assert_eq!(
            loaded.names_of_nonempty_cells().count(),
            sheet.names_of_nonempty_cells().count()
        );
    }

    #[test]
    fn test_load_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(IoError::Io(_))));
    }
}
