//! A loaded document together with its filters, markers and rendered view.
//!
//! Every change that can alter the rendered document asks [`Refilter`] for a
//! new pass and hands back its [`PassHandle`]. The caller awaits the handle
//! (usually on another task) and feeds the output back through
//! [`DocumentSession::apply`], which ignores anything but the latest pass.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{FilterError, MarkerError, TaskError};
use crate::filter::{CompiledFilter, FilterDefinition, FilterList, FilterRecord};
use crate::markers::MarkerSet;
use crate::navigator;
use crate::pipeline::{AnnotatedLine, Line, Palette, PassOutput, number_lines};
use crate::queue::TaskHandle;
use crate::refilter::{DEFAULT_DEBOUNCE, Refilter};
use crate::view::{ViewOptions, export_text};

pub type PassHandle = TaskHandle<PassOutput>;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub palette: Palette,
    pub view: ViewOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            palette: Palette::default(),
            view: ViewOptions::default(),
        }
    }
}

pub struct DocumentSession {
    lines: Arc<[Line]>,
    markers: MarkerSet,
    filters: FilterList,
    refilter: Refilter,
    palette: Palette,
    view: ViewOptions,
    rendered: Vec<AnnotatedLine>,
    published: u64,
}

impl DocumentSession {
    /// Create an empty session. Needs a tokio runtime.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            lines: Arc::from(Vec::new()),
            markers: MarkerSet::new(),
            filters: FilterList::new(),
            refilter: Refilter::new(config.debounce),
            palette: config.palette,
            view: config.view,
            rendered: Vec::new(),
            published: 0,
        }
    }

    /// Replace the document. Markers and hits belong to the old document
    /// and are dropped together with its rendering.
    pub fn load(&mut self, texts: Vec<String>) -> PassHandle {
        self.lines = number_lines(texts).into();
        self.markers.clear();
        self.filters.commit_hits(Vec::new());
        self.rendered = self
            .lines
            .iter()
            .map(|line| AnnotatedLine::plain(line, &[]))
            .collect();
        info!(lines = self.lines.len(), "document loaded");
        self.request_refilter()
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Lines as of the last published pass.
    pub fn rendered(&self) -> &[AnnotatedLine] {
        &self.rendered
    }

    pub fn visible_lines(&self) -> Vec<&AnnotatedLine> {
        self.view.project(&self.rendered)
    }

    pub fn filters(&self) -> &FilterList {
        &self.filters
    }

    /// Direct list access, for subscribing to its events.
    ///
    /// Mutations made through this bypass automatic re-filtering; follow
    /// them with [`request_refilter`](Self::request_refilter).
    pub fn filters_mut(&mut self) -> &mut FilterList {
        &mut self.filters
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn view(&self) -> ViewOptions {
        self.view
    }

    /// Change the projection. Rendering is untouched, so no pass is needed.
    pub fn set_view(&mut self, view: ViewOptions) {
        self.view = view;
    }

    pub fn palette(&self) -> Palette {
        self.palette
    }

    /// Generation of the last output applied.
    pub fn published_generation(&self) -> u64 {
        self.published
    }

    pub fn add_filter(&mut self, record: FilterRecord) -> Result<PassHandle, FilterError> {
        self.filters.add(record)?;
        Ok(self.request_refilter())
    }

    pub fn add_filters(&mut self, records: Vec<FilterRecord>) -> Result<PassHandle, FilterError> {
        self.filters.extend(records)?;
        Ok(self.request_refilter())
    }

    pub fn edit_filter(
        &mut self,
        index: usize,
        record: FilterRecord,
    ) -> Result<PassHandle, FilterError> {
        self.filters.edit(index, record)?;
        Ok(self.request_refilter())
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<Option<PassHandle>, FilterError> {
        let removed = self.filters.remove(index)?;
        Ok(self.refilter_if(removed.enabled))
    }

    pub fn remove_all_filters(&mut self) -> Option<PassHandle> {
        let any_enabled = self.filters.any_enabled();
        self.filters.remove_all();
        self.refilter_if(any_enabled)
    }

    /// Returns the filter's new index and the pass its new priority needs.
    pub fn move_filter_up(
        &mut self,
        index: usize,
    ) -> Result<(usize, Option<PassHandle>), FilterError> {
        let to = self.filters.move_up(index)?;
        Ok((to, self.refilter_if(to != index)))
    }

    pub fn move_filter_down(
        &mut self,
        index: usize,
    ) -> Result<(usize, Option<PassHandle>), FilterError> {
        let to = self.filters.move_down(index)?;
        Ok((to, self.refilter_if(to != index)))
    }

    pub fn set_filter_enabled(
        &mut self,
        index: usize,
        enabled: bool,
    ) -> Result<Option<PassHandle>, FilterError> {
        let changed = self.filters.set_enabled(index, enabled)?;
        Ok(self.refilter_if(changed))
    }

    pub fn toggle_filter_enabled(&mut self, index: usize) -> Result<PassHandle, FilterError> {
        self.filters.toggle_enabled(index)?;
        Ok(self.request_refilter())
    }

    pub fn enable_all(&mut self) -> Option<PassHandle> {
        let changed = self.filters.enable_all();
        self.refilter_if(changed)
    }

    pub fn disable_all(&mut self) -> Option<PassHandle> {
        let changed = self.filters.disable_all();
        self.refilter_if(changed)
    }

    /// Toggle a marker on a 0-based line index.
    ///
    /// A pass is only requested when an enabled marker filter looks for
    /// this marker. Returns whether the marker was added.
    pub fn toggle_marker(
        &mut self,
        index: usize,
        marker: u8,
    ) -> Result<(bool, Option<PassHandle>), MarkerError> {
        if index >= self.lines.len() {
            return Err(MarkerError::LineOutOfRange {
                index,
                len: self.lines.len(),
            });
        }
        let added = self.markers.toggle(index, marker)?;

        // Keep the rendered marker column current without waiting for a pass.
        if let Some(line) = self.rendered.get_mut(index) {
            line.markers = self.markers.markers(index).to_vec();
        }

        let watched = self
            .filters
            .iter()
            .any(|f| f.is_enabled() && f.targets_marker(marker));
        Ok((added, self.refilter_if(watched)))
    }

    /// Queue a pass over the current document, markers and enabled filters.
    pub fn request_refilter(&mut self) -> PassHandle {
        self.refilter.submit(
            self.lines.clone(),
            Arc::new(self.markers.clone()),
            self.filters.snapshot(),
            self.palette,
        )
    }

    /// Publish a pass. Output from anything but the latest request is
    /// dropped and `false` returned.
    pub fn apply(&mut self, output: PassOutput) -> bool {
        if !self.refilter.is_current(output.generation) {
            debug!(
                generation = output.generation,
                latest = self.refilter.latest(),
                "dropping stale pass output"
            );
            return false;
        }
        self.filters.commit_hits(output.hits);
        self.rendered = output.lines;
        // Markers toggled while the pass ran without a pass of their own.
        for (index, line) in self.rendered.iter_mut().enumerate() {
            let current = self.markers.markers(index);
            if line.markers != current {
                line.markers = current.to_vec();
            }
        }
        self.published = output.generation;
        true
    }

    /// Await a pass and publish it.
    pub async fn complete(&mut self, handle: PassHandle) -> Result<bool, TaskError> {
        let output = handle.join().await?;
        Ok(self.apply(output))
    }

    /// Next (or previous) hit of the filter at `filter_index`, wrapping.
    ///
    /// `None` when the filter has no hits, when it excludes and only
    /// filtered lines are shown, or when every hit is hidden.
    pub fn find_next_hit(
        &self,
        filter_index: usize,
        current_line: usize,
        backward: bool,
    ) -> Option<usize> {
        let filter = self.filters.get(filter_index)?;
        if filter.hits().is_empty() {
            return None;
        }
        if self.view.only_filtered && filter.is_excluding() {
            return None;
        }
        if !self.view.is_projecting() {
            return filter.find_next_hit(current_line, backward);
        }
        navigator::find_next_visible(filter.hits(), current_line, backward, |n| {
            self.is_line_visible(n)
        })
    }

    /// Search the visible lines for an ad hoc filter, starting after
    /// `current_line` and wrapping around to it.
    pub fn find_text(
        &self,
        definition: &FilterDefinition,
        current_line: usize,
        backward: bool,
    ) -> Result<Option<usize>, FilterError> {
        let matcher = CompiledFilter::compile(definition)?;
        let total = self.lines.len();
        if total == 0 {
            return Ok(None);
        }

        let start = current_line.clamp(1, total);
        for step in 1..=total {
            let number = if backward {
                (start - 1 + total - step % total) % total + 1
            } else {
                (start - 1 + step) % total + 1
            };
            if !self.is_line_visible(number) {
                continue;
            }
            let line = &self.lines[number - 1];
            if matcher.matches(&line.text, self.markers.markers(number - 1)) {
                return Ok(Some(number));
            }
        }
        Ok(None)
    }

    /// Resolve a requested line number to one that can be shown.
    ///
    /// Out of range numbers are clamped. Under a projection the first
    /// visible line at or after `number` wins, else the last visible one.
    pub fn go_to_line(&self, number: usize) -> Option<usize> {
        let total = self.lines.len();
        if total == 0 {
            return None;
        }
        let target = number.clamp(1, total);
        if !self.view.is_projecting() {
            return Some(target);
        }
        (target..=total)
            .find(|&n| self.is_line_visible(n))
            .or_else(|| (1..target).rev().find(|&n| self.is_line_visible(n)))
    }

    /// Visible lines as text, for saving or copying.
    pub fn export_visible(&self, with_line_numbers: bool) -> String {
        export_text(&self.visible_lines(), with_line_numbers)
    }

    fn is_line_visible(&self, number: usize) -> bool {
        number
            .checked_sub(1)
            .and_then(|i| self.rendered.get(i))
            .is_some_and(|line| self.view.is_visible(line))
    }

    fn refilter_if(&mut self, needed: bool) -> Option<PassHandle> {
        needed.then(|| self.request_refilter())
    }
}
