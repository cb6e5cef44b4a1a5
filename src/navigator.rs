//! Circular next/previous hit lookup over a filter's ascending hit lines.

/// Return the hit after (or before, when `backward`) `current_line`, wrapping
/// around at either end.
///
/// `current_line` does not need to be a hit itself. The result is always an
/// element of `hits`.
///
/// # Panics
///
/// Panics if `hits` is empty; callers check the hit count first.
pub fn find_next(hits: &[usize], current_line: usize, backward: bool) -> usize {
    assert!(!hits.is_empty(), "find_next called with no hits");
    let last = hits.len() - 1;

    let index = match hits.binary_search(&current_line) {
        Ok(i) => {
            if backward {
                if i == 0 { last } else { i - 1 }
            } else if i == last {
                0
            } else {
                i + 1
            }
        }
        // Insertion point: index of the first hit greater than current_line.
        Err(p) => {
            if backward {
                if p == 0 { last } else { p - 1 }
            } else if p <= last {
                p
            } else {
                0
            }
        }
    };

    hits[index]
}

/// Like [`find_next`] but skips hits the view currently hides.
///
/// Keeps stepping through the hits until `is_visible` accepts one, giving
/// up once the walk comes back to the first candidate. Returns `None` when
/// every hit is hidden or there are no hits at all.
pub fn find_next_visible(
    hits: &[usize],
    current_line: usize,
    backward: bool,
    is_visible: impl Fn(usize) -> bool,
) -> Option<usize> {
    if hits.is_empty() {
        return None;
    }

    let first = find_next(hits, current_line, backward);
    let mut candidate = first;
    loop {
        if is_visible(candidate) {
            return Some(candidate);
        }
        candidate = find_next(hits, candidate, backward);
        if candidate == first {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HITS: [usize; 3] = [3, 7, 12];

    #[test]
    fn test_found_moves_to_neighbour() {
        assert_eq!(find_next(&HITS, 7, false), 12);
        assert_eq!(find_next(&HITS, 7, true), 3);
    }

    #[test]
    fn test_found_wraps_at_ends() {
        assert_eq!(find_next(&HITS, 12, false), 3);
        assert_eq!(find_next(&HITS, 3, true), 12);
    }

    #[test]
    fn test_not_found_uses_insertion_point() {
        assert_eq!(find_next(&HITS, 5, false), 7);
        assert_eq!(find_next(&HITS, 5, true), 3);
    }

    #[test]
    fn test_not_found_wraps_past_ends() {
        assert_eq!(find_next(&HITS, 20, false), 3);
        assert_eq!(find_next(&HITS, 1, true), 12);
        assert_eq!(find_next(&HITS, 0, false), 3);
        assert_eq!(find_next(&HITS, 0, true), 12);
    }

    #[test]
    fn test_single_hit_always_returns_it() {
        assert_eq!(find_next(&[4], 4, false), 4);
        assert_eq!(find_next(&[4], 4, true), 4);
        assert_eq!(find_next(&[4], 9, false), 4);
    }

    #[test]
    #[should_panic(expected = "no hits")]
    fn test_empty_hits_is_contract_violation() {
        find_next(&[], 1, false);
    }

    #[test]
    fn test_visible_skips_hidden_hits() {
        let hidden = [7];
        let next = find_next_visible(&HITS, 3, false, |line| !hidden.contains(&line));
        assert_eq!(next, Some(12));
        let prev = find_next_visible(&HITS, 12, true, |line| !hidden.contains(&line));
        assert_eq!(prev, Some(3));
    }

    #[test]
    fn test_visible_none_when_all_hidden() {
        assert_eq!(find_next_visible(&HITS, 3, false, |_| false), None);
        assert_eq!(find_next_visible(&[], 3, false, |_| true), None);
    }

    #[test]
    fn test_visible_can_land_on_current_line() {
        // Only the current line is visible: the walk wraps back to it.
        assert_eq!(find_next_visible(&HITS, 7, false, |line| line == 7), Some(7));
    }
}
