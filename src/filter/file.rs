//! Filter sets on disk and on the clipboard: a JSON array of [`FilterRecord`].

use std::fs;
use std::path::Path;

use super::definition::FilterRecord;
use super::matcher::CompiledFilter;
use crate::error::FilterFileError;

/// Conventional extension for saved filter sets.
pub const FILTER_FILE_EXTENSION: &str = "flt";

/// Parse a filter set, rejecting it if any definition would not compile.
pub fn from_json(raw: &str) -> Result<Vec<FilterRecord>, FilterFileError> {
    let records: Vec<FilterRecord> = serde_json::from_str(raw)?;
    for (position, record) in records.iter().enumerate() {
        CompiledFilter::compile(&record.definition)
            .map_err(|source| FilterFileError::Invalid { position, source })?;
    }
    Ok(records)
}

pub fn to_json(records: &[FilterRecord]) -> Result<String, FilterFileError> {
    Ok(serde_json::to_string_pretty(records)?)
}

pub fn load_filters(path: &Path) -> Result<Vec<FilterRecord>, FilterFileError> {
    let raw = fs::read_to_string(path).map_err(|source| FilterFileError::Read {
        path: path.display().to_string(),
        source,
    })?;
    from_json(&raw)
}

pub fn save_filters(path: &Path, records: &[FilterRecord]) -> Result<(), FilterFileError> {
    let json = to_json(records)?;
    fs::write(path, json).map_err(|source| FilterFileError::Write {
        path: path.display().to_string(),
        source,
    })
}
