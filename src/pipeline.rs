//! One filtering pass: every line against every enabled filter.
//!
//! Excluding filters are tried first (stable, so list order is kept inside
//! each group). Every enabled filter records its hits, but only the first
//! filter that matches a line decides how the line looks. When including
//! filters are active, a line none of them accepts is excluded.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::filter::{CompiledFilter, FilterId, Rgb};
use crate::markers::MarkerSet;

/// A source line. Numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub number: usize,
    pub text: Arc<str>,
}

impl Line {
    pub fn new(number: usize, text: impl Into<Arc<str>>) -> Self {
        Self {
            number,
            text: text.into(),
        }
    }
}

/// Number a decoded document.
pub fn number_lines<I, S>(texts: I) -> Vec<Line>
where
    I: IntoIterator<Item = S>,
    S: Into<Arc<str>>,
{
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| Line::new(i + 1, text))
        .collect()
}

/// An enabled filter as captured at the start of a pass.
#[derive(Debug, Clone)]
pub struct ActiveFilter {
    pub id: FilterId,
    pub matcher: Arc<CompiledFilter>,
    pub excluded: bool,
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub excluded_foreground: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            excluded_foreground: Rgb::GRAY,
        }
    }
}

/// A line as rendered after a pass. `None` colours mean the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedLine {
    pub number: usize,
    pub text: Arc<str>,
    pub markers: Vec<u8>,
    pub excluded: bool,
    pub foreground: Option<Rgb>,
    pub background: Option<Rgb>,
}

impl AnnotatedLine {
    pub(crate) fn plain(line: &Line, markers: &[u8]) -> Self {
        Self {
            number: line.number,
            text: line.text.clone(),
            markers: markers.to_vec(),
            excluded: false,
            foreground: None,
            background: None,
        }
    }

    fn exclude(&mut self, palette: &Palette) {
        self.excluded = true;
        self.foreground = Some(palette.excluded_foreground);
        self.background = None;
    }
}

/// Everything a pass reads, captured when the pass is requested.
#[derive(Debug, Clone)]
pub struct PassInput {
    pub generation: u64,
    pub lines: Arc<[Line]>,
    pub markers: Arc<MarkerSet>,
    pub filters: Vec<ActiveFilter>,
    pub palette: Palette,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutput {
    pub generation: u64,
    pub lines: Vec<AnnotatedLine>,
    /// Hits per enabled filter; disabled filters are absent.
    pub hits: Vec<(FilterId, Vec<usize>)>,
}

/// Markers of a line. Line numbers start at 1; a line numbered 0 has none.
fn line_markers<'a>(markers: &'a MarkerSet, line: &Line) -> &'a [u8] {
    line.number
        .checked_sub(1)
        .map_or(&[], |index| markers.markers(index))
}

/// Run a full pass. Returns `None` if `cancel` fires before it completes.
pub fn run(input: &PassInput, cancel: &CancellationToken) -> Option<PassOutput> {
    let started = Instant::now();
    let mut output = Vec::with_capacity(input.lines.len());

    if input.filters.is_empty() {
        for line in input.lines.iter() {
            if cancel.is_cancelled() {
                return None;
            }
            output.push(AnnotatedLine::plain(line, line_markers(&input.markers, line)));
        }
        debug!(lines = output.len(), "pass finished without filters");
        return Some(PassOutput {
            generation: input.generation,
            lines: output,
            hits: Vec::new(),
        });
    }

    let mut active: Vec<&ActiveFilter> = input.filters.iter().collect();
    active.sort_by_key(|f| !f.excluded);
    let has_including = active.iter().any(|f| !f.excluded);
    let mut hits: Vec<Vec<usize>> = vec![Vec::new(); active.len()];

    for line in input.lines.iter() {
        if cancel.is_cancelled() {
            debug!(generation = input.generation, "pass cancelled");
            return None;
        }

        let markers = line_markers(&input.markers, line);
        let mut annotated = AnnotatedLine::plain(line, markers);
        let mut matched_any = false;

        for (slot, filter) in active.iter().enumerate() {
            if !filter.matcher.matches(&line.text, markers) {
                continue;
            }
            hits[slot].push(line.number);
            if matched_any {
                continue;
            }
            matched_any = true;
            if filter.excluded {
                annotated.exclude(&input.palette);
            } else {
                annotated.foreground = filter.foreground;
                annotated.background = filter.background;
            }
        }

        if !matched_any && has_including {
            annotated.exclude(&input.palette);
        }
        output.push(annotated);
    }

    debug!(
        generation = input.generation,
        lines = output.len(),
        filters = active.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pass finished"
    );

    Some(PassOutput {
        generation: input.generation,
        lines: output,
        hits: active
            .iter()
            .map(|f| f.id)
            .zip(hits)
            .collect(),
    })
}
