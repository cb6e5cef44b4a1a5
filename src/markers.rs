use std::collections::BTreeMap;

use crate::error::MarkerError;
use crate::filter::MARKER_RANGE;

/// User-attached markers, keyed by 0-based line index.
///
/// Each line's markers are kept sorted and unique. Lines without markers
/// have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerSet {
    lines: BTreeMap<usize, Vec<u8>>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `marker` to the line, or remove it if already present.
    ///
    /// Returns `true` when the marker was added.
    pub fn toggle(&mut self, index: usize, marker: u8) -> Result<bool, MarkerError> {
        if !MARKER_RANGE.contains(&marker) {
            return Err(MarkerError::OutOfRange(marker));
        }

        let markers = self.lines.entry(index).or_default();
        let added = match markers.binary_search(&marker) {
            Ok(pos) => {
                markers.remove(pos);
                false
            }
            Err(pos) => {
                markers.insert(pos, marker);
                true
            }
        };
        if markers.is_empty() {
            self.lines.remove(&index);
        }
        Ok(added)
    }

    /// Markers on a line, empty if none.
    pub fn markers(&self, index: usize) -> &[u8] {
        self.lines.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether any line carries `marker`.
    pub fn in_use(&self, marker: u8) -> bool {
        self.lines.values().any(|m| m.contains(&marker))
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Marked line indexes with their markers, in line order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.lines.iter().map(|(i, m)| (*i, m.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut set = MarkerSet::new();
        assert_eq!(set.toggle(4, 2), Ok(true));
        assert_eq!(set.markers(4), &[2]);
        assert_eq!(set.toggle(4, 2), Ok(false));
        assert!(set.markers(4).is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn test_markers_kept_sorted() {
        let mut set = MarkerSet::new();
        for m in [5, 1, 9, 3] {
            set.toggle(0, m).unwrap();
        }
        assert_eq!(set.markers(0), &[1, 3, 5, 9]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut set = MarkerSet::new();
        assert_eq!(set.toggle(0, 0), Err(MarkerError::OutOfRange(0)));
        assert_eq!(set.toggle(0, 10), Err(MarkerError::OutOfRange(10)));
        assert!(set.is_empty());
    }

    #[test]
    fn test_in_use_and_iter() {
        let mut set = MarkerSet::new();
        set.toggle(8, 4).unwrap();
        set.toggle(2, 4).unwrap();
        set.toggle(2, 1).unwrap();
        assert!(set.in_use(4));
        assert!(!set.in_use(7));
        let lines: Vec<usize> = set.iter().map(|(i, _)| i).collect();
        assert_eq!(lines, vec![2, 8]);
    }
}
