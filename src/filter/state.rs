use std::sync::Arc;

use super::definition::{FilterKind, FilterRecord, Rgb};
use super::matcher::CompiledFilter;
use crate::error::FilterError;
use crate::navigator;

/// Stable identity of a filter for the lifetime of its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterId(pub(crate) u64);

/// A filter in the list: its record, compiled matcher and latest hits.
#[derive(Debug, Clone)]
pub struct FilterState {
    id: FilterId,
    record: FilterRecord,
    compiled: Arc<CompiledFilter>,
    name: String,
    hits: Vec<usize>,
}

impl FilterState {
    pub(crate) fn new(id: FilterId, record: FilterRecord) -> Result<Self, FilterError> {
        let compiled = Arc::new(CompiledFilter::compile(&record.definition)?);
        Ok(Self {
            id,
            record,
            compiled,
            name: String::new(),
            hits: Vec::new(),
        })
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn record(&self) -> &FilterRecord {
        &self.record
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.record.enabled
    }

    pub fn is_excluding(&self) -> bool {
        self.record.definition.excluded
    }

    pub fn compiled(&self) -> &Arc<CompiledFilter> {
        &self.compiled
    }

    /// Marker filters that look for `marker`.
    pub fn targets_marker(&self, marker: u8) -> bool {
        self.record.definition.kind == FilterKind::Marker && self.compiled.is_marker(marker)
    }

    pub fn foreground(&self) -> Option<Rgb> {
        self.record.foreground
    }

    pub fn background(&self) -> Option<Rgb> {
        self.record.background
    }

    /// Line numbers matched in the last published pass, ascending.
    pub fn hits(&self) -> &[usize] {
        &self.hits
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    /// Next (or previous) hit relative to `current_line`, wrapping around.
    ///
    /// Returns `None` when there are no hits.
    pub fn find_next_hit(&self, current_line: usize, backward: bool) -> Option<usize> {
        if self.hits.is_empty() {
            return None;
        }
        Some(navigator::find_next(&self.hits, current_line, backward))
    }

    /// Replace the record, recompiling first so a bad edit leaves the
    /// filter untouched.
    pub(crate) fn replace_record(&mut self, record: FilterRecord) -> Result<(), FilterError> {
        let compiled = CompiledFilter::compile(&record.definition)?;
        self.compiled = Arc::new(compiled);
        self.record = record;
        Ok(())
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) -> bool {
        let changed = self.record.enabled != enabled;
        self.record.enabled = enabled;
        changed
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_hits(&mut self, hits: Vec<usize>) {
        self.hits = hits;
    }

    pub(crate) fn clear_hits(&mut self) {
        self.hits.clear();
    }
}
