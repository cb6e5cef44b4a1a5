use std::collections::HashMap;

use super::definition::FilterRecord;
use super::state::{FilterId, FilterState};
use crate::error::FilterError;
use crate::pipeline::ActiveFilter;

const LETTER_NAMES: usize = 26;

/// What changed in a [`FilterList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    Added { index: usize },
    Edited { index: usize },
    Removed { index: usize, was_enabled: bool },
    Cleared { any_enabled: bool },
    Moved { from: usize, to: usize },
    /// `index` is `None` for enable-all / disable-all.
    EnablementChanged { index: Option<usize>, changed: bool },
}

impl FilterEvent {
    /// Whether the rendered document can differ after this change.
    pub fn needs_refilter(&self) -> bool {
        match self {
            FilterEvent::Added { .. } | FilterEvent::Edited { .. } | FilterEvent::Moved { .. } => {
                true
            }
            FilterEvent::Removed { was_enabled, .. } => *was_enabled,
            FilterEvent::Cleared { any_enabled } => *any_enabled,
            FilterEvent::EnablementChanged { changed, .. } => *changed,
        }
    }
}

type Listener = Box<dyn FnMut(&FilterEvent) + Send>;

/// Ordered filters. Position decides both the display name and match priority.
#[derive(Default)]
pub struct FilterList {
    filters: Vec<FilterState>,
    next_id: u64,
    listeners: Vec<Listener>,
}

impl FilterList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked after every mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&FilterEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FilterState> {
        self.filters.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterState> {
        self.filters.iter()
    }

    pub fn find_by_name(&self, name: &str) -> Option<(usize, &FilterState)> {
        self.filters.iter().enumerate().find(|(_, f)| f.name() == name)
    }

    pub fn records(&self) -> Vec<FilterRecord> {
        self.filters.iter().map(|f| f.record().clone()).collect()
    }

    pub fn any_enabled(&self) -> bool {
        self.filters.iter().any(FilterState::is_enabled)
    }

    pub fn add(&mut self, record: FilterRecord) -> Result<FilterId, FilterError> {
        let id = FilterId(self.next_id);
        let state = FilterState::new(id, record)?;
        self.next_id += 1;
        self.filters.push(state);
        let index = self.filters.len() - 1;
        self.rename_from(index);
        self.emit(FilterEvent::Added { index });
        Ok(id)
    }

    /// Add several records; nothing is added if any of them is invalid.
    pub fn extend(&mut self, records: Vec<FilterRecord>) -> Result<Vec<FilterId>, FilterError> {
        let mut states = Vec::with_capacity(records.len());
        for (offset, record) in records.into_iter().enumerate() {
            states.push(FilterState::new(FilterId(self.next_id + offset as u64), record)?);
        }

        let start = self.filters.len();
        self.next_id += states.len() as u64;
        let ids = states.iter().map(FilterState::id).collect();
        self.filters.extend(states);
        self.rename_from(start);
        for index in start..self.filters.len() {
            self.emit(FilterEvent::Added { index });
        }
        Ok(ids)
    }

    pub fn edit(&mut self, index: usize, record: FilterRecord) -> Result<(), FilterError> {
        self.check_index(index)?;
        self.filters[index].replace_record(record)?;
        self.emit(FilterEvent::Edited { index });
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<FilterRecord, FilterError> {
        self.check_index(index)?;
        let removed = self.filters.remove(index);
        self.rename_from(index);
        self.emit(FilterEvent::Removed {
            index,
            was_enabled: removed.is_enabled(),
        });
        Ok(removed.record().clone())
    }

    pub fn remove_all(&mut self) {
        let any_enabled = self.any_enabled();
        self.filters.clear();
        self.emit(FilterEvent::Cleared { any_enabled });
    }

    /// Move a filter one place up (higher priority). Returns its new index.
    pub fn move_up(&mut self, index: usize) -> Result<usize, FilterError> {
        self.check_index(index)?;
        if index == 0 {
            return Ok(index);
        }
        self.swap(index, index - 1);
        Ok(index - 1)
    }

    /// Move a filter one place down (lower priority). Returns its new index.
    pub fn move_down(&mut self, index: usize) -> Result<usize, FilterError> {
        self.check_index(index)?;
        if index + 1 == self.filters.len() {
            return Ok(index);
        }
        self.swap(index, index + 1);
        Ok(index + 1)
    }

    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<bool, FilterError> {
        self.check_index(index)?;
        let changed = self.filters[index].set_enabled(enabled);
        self.emit(FilterEvent::EnablementChanged {
            index: Some(index),
            changed,
        });
        Ok(changed)
    }

    pub fn toggle_enabled(&mut self, index: usize) -> Result<bool, FilterError> {
        self.check_index(index)?;
        let enabled = !self.filters[index].is_enabled();
        self.set_enabled(index, enabled)?;
        Ok(enabled)
    }

    pub fn enable_all(&mut self) -> bool {
        self.set_all(true)
    }

    pub fn disable_all(&mut self) -> bool {
        self.set_all(false)
    }

    /// Capture the enabled filters, in list order, for one pass.
    pub fn snapshot(&self) -> Vec<ActiveFilter> {
        self.filters
            .iter()
            .filter(|f| f.is_enabled())
            .map(|f| ActiveFilter {
                id: f.id(),
                matcher: f.compiled().clone(),
                excluded: f.is_excluding(),
                foreground: f.foreground(),
                background: f.background(),
            })
            .collect()
    }

    /// Publish a pass's hits. Filters absent from `hits` end up with none.
    pub(crate) fn commit_hits(&mut self, hits: Vec<(FilterId, Vec<usize>)>) {
        let mut by_id: HashMap<FilterId, Vec<usize>> = hits.into_iter().collect();
        for filter in &mut self.filters {
            match by_id.remove(&filter.id()) {
                Some(lines) => filter.set_hits(lines),
                None => filter.clear_hits(),
            }
        }
    }

    fn set_all(&mut self, enabled: bool) -> bool {
        let mut changed = false;
        for filter in &mut self.filters {
            changed |= filter.set_enabled(enabled);
        }
        self.emit(FilterEvent::EnablementChanged {
            index: None,
            changed,
        });
        changed
    }

    fn swap(&mut self, from: usize, to: usize) {
        self.filters.swap(from, to);
        self.rename_from(from.min(to));
        self.emit(FilterEvent::Moved { from, to });
    }

    fn rename_from(&mut self, start: usize) {
        for (i, filter) in self.filters.iter_mut().enumerate().skip(start) {
            filter.set_name(filter_name(i));
        }
    }

    fn check_index(&self, index: usize) -> Result<(), FilterError> {
        if index < self.filters.len() {
            Ok(())
        } else {
            Err(FilterError::IndexOutOfRange {
                index,
                len: self.filters.len(),
            })
        }
    }

    fn emit(&mut self, event: FilterEvent) {
        tracing::debug!(?event, "filter list changed");
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// `a`..`z` for the first 26 positions, then the position itself.
pub fn filter_name(index: usize) -> String {
    if index < LETTER_NAMES {
        char::from(b'a' + index as u8).to_string()
    } else {
        index.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterDefinition;
    use std::sync::{Arc, Mutex};

    fn record(pattern: &str) -> FilterRecord {
        FilterRecord::new(FilterDefinition::text(pattern))
    }

    fn names(list: &FilterList) -> Vec<String> {
        list.iter().map(|f| f.name().to_string()).collect()
    }

    #[test]
    fn test_filter_names() {
        assert_eq!(filter_name(0), "a");
        assert_eq!(filter_name(25), "z");
        assert_eq!(filter_name(26), "26");
        assert_eq!(filter_name(40), "40");
    }

    #[test]
    fn test_names_follow_position() {
        let mut list = FilterList::new();
        for p in ["one", "two", "three"] {
            list.add(record(p)).unwrap();
        }
        assert_eq!(names(&list), ["a", "b", "c"]);

        list.remove(0).unwrap();
        assert_eq!(names(&list), ["a", "b"]);
        assert_eq!(list.get(0).unwrap().record().definition.pattern, "two");

        let new_index = list.move_down(0).unwrap();
        assert_eq!(new_index, 1);
        assert_eq!(list.find_by_name("a").unwrap().1.record().definition.pattern, "three");
    }

    #[test]
    fn test_move_at_edges_is_noop() {
        let mut list = FilterList::new();
        list.add(record("x")).unwrap();
        list.add(record("y")).unwrap();
        assert_eq!(list.move_up(0).unwrap(), 0);
        assert_eq!(list.move_down(1).unwrap(), 1);
        assert!(list.move_up(2).is_err());
    }

    #[test]
    fn test_invalid_add_leaves_list_unchanged() {
        let mut list = FilterList::new();
        list.add(record("ok")).unwrap();
        let bad = FilterRecord::new(FilterDefinition::regex("(("));
        assert!(list.add(bad).is_err());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_extend_is_all_or_nothing() {
        let mut list = FilterList::new();
        let records = vec![record("a"), FilterRecord::new(FilterDefinition::marker(0))];
        assert!(list.extend(records).is_err());
        assert!(list.is_empty());

        let ids = list.extend(vec![record("a"), record("b")]).unwrap();
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(names(&list), ["a", "b"]);
    }

    #[test]
    fn test_events_and_refilter_hints() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let mut list = FilterList::new();
        list.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        list.add(record("a").disabled()).unwrap();
        list.remove(0).unwrap();
        list.add(record("b")).unwrap();
        list.enable_all();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert!(seen[0].needs_refilter());
        assert_eq!(
            seen[1],
            FilterEvent::Removed {
                index: 0,
                was_enabled: false
            }
        );
        assert!(!seen[1].needs_refilter());
        assert!(!seen[3].needs_refilter());
    }

    #[test]
    fn test_snapshot_only_enabled_in_order() {
        let mut list = FilterList::new();
        list.add(record("a")).unwrap();
        list.add(record("b").disabled()).unwrap();
        list.add(FilterRecord::new(FilterDefinition::text("c").excluding(true)))
            .unwrap();
        let snapshot = list.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot[0].excluded);
        assert!(snapshot[1].excluded);
        assert_eq!(snapshot[1].id, list.get(2).unwrap().id());
    }

    #[test]
    fn test_commit_hits_clears_missing() {
        let mut list = FilterList::new();
        let a = list.add(record("a")).unwrap();
        list.add(record("b")).unwrap();
        list.commit_hits(vec![(a, vec![1, 4])]);
        list.commit_hits(vec![(a, vec![2])]);
        assert_eq!(list.get(0).unwrap().hits(), &[2]);
        assert!(list.get(1).unwrap().hits().is_empty());
    }
}
