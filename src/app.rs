use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::style::{Color, Stylize};
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::Config;
use crate::filter::{
    FILTER_FILE_EXTENSION, FilterDefinition, FilterKind, FilterRecord, Rgb, load_filters,
    save_filters,
};
use crate::pipeline::{AnnotatedLine, PassOutput};
use crate::session::{DocumentSession, PassHandle, SessionConfig};
use crate::source::{DocumentSource, FileSource, TextSource};
use crate::state::{PromptKind, ViewerState};
use crate::status::{DEFAULT_STATUS_TIMEOUT, StatusBoard};
use crate::ui::{Ui, UiEvent, poll_input};
use crate::view::ViewOptions;

/// Document path meaning standard input.
pub const STDIN_PATH: &str = "-";

/// Extension of the file the visible lines are saved to.
pub const VISIBLE_LINES_EXTENSION: &str = "filtered.txt";

/// Application runtime: loads the document and filters, then either
/// prints one pass or runs the interactive viewer.
pub async fn run(config: Config) -> Result<()> {
    let mut session = DocumentSession::new(SessionConfig {
        debounce: config.debounce,
        view: config.view,
        ..SessionConfig::default()
    });

    let texts = load_document(&config.file).await?;
    let mut pending = session.load(texts);

    if let Some(path) = &config.filters_file {
        let records = load_filters(path)?;
        info!(path = %path.display(), filters = records.len(), "filters loaded");
        pending = session.add_filters(records)?;
    }
    if !config.filters.is_empty() {
        pending = session.add_filters(config.filters.clone())?;
    }

    if config.print {
        session
            .complete(pending)
            .await
            .context("Filtering pass did not complete")?;
        return print_document(&session, config.line_numbers);
    }
    run_viewer(config, session, pending).await
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == STDIN_PATH
}

/// Read the document from a file, or from standard input for `-`.
async fn load_document(path: &Path) -> Result<Vec<String>> {
    if !is_stdin(path) {
        return FileSource::new(path).load().await;
    }
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read standard input")?;
    TextSource::new(text).load().await
}

async fn run_viewer(
    config: Config,
    mut session: DocumentSession,
    first_pass: PassHandle,
) -> Result<()> {
    // Completed passes come back to the loop through this channel
    let (tx, mut rx) = mpsc::channel::<PassOutput>(16);
    forward(first_pass, &tx);

    let status = StatusBoard::new();
    let mut viewer = ViewerState::new();
    let mut ui = Ui::new()?;

    let mut last_draw = Instant::now();
    let draw_interval = Duration::from_millis(33);

    let res = loop {
        while let Ok(output) = rx.try_recv() {
            session.apply(output);
        }

        let event = match poll_input(&viewer) {
            Ok(event) => event,
            Err(e) => break Err(e),
        };
        if event == UiEvent::Quit {
            break Ok(());
        }
        if let Some(handle) =
            handle_event(event, &config, &mut session, &mut viewer, &status).await
        {
            forward(handle, &tx);
        }

        if last_draw.elapsed() >= draw_interval {
            if let Err(e) = ui.draw(&session, &mut viewer, &status) {
                break Err(e);
            }
            last_draw = Instant::now();
        } else {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };

    // Ensure UI is restored even if error
    let _ = ui.restore();
    res
}

/// Wait for a pass off the UI loop and hand its output back.
fn forward(handle: PassHandle, tx: &mpsc::Sender<PassOutput>) {
    let tx = tx.clone();
    tokio::spawn(async move {
        if let Ok(output) = handle.join().await {
            let _ = tx.send(output).await;
        }
    });
}

async fn handle_event(
    event: UiEvent,
    config: &Config,
    session: &mut DocumentSession,
    viewer: &mut ViewerState,
    status: &StatusBoard,
) -> Option<PassHandle> {
    let visible: Vec<usize> = session.visible_lines().iter().map(|l| l.number).collect();
    let filter = viewer.selected_filter;

    match event {
        UiEvent::Quit | UiEvent::None => None,
        UiEvent::MoveSelection(delta) => {
            viewer.move_selection(&visible, delta);
            None
        }
        UiEvent::Top => {
            viewer.select_first(&visible);
            None
        }
        UiEvent::Bottom => {
            viewer.select_last(&visible);
            None
        }

        UiEvent::ToggleFilterPanel => {
            viewer.filter_panel_open = !viewer.filter_panel_open;
            if !viewer.filter_panel_open {
                viewer.editing = None;
            }
            None
        }
        UiEvent::FocusNext => {
            viewer.toggle_focus();
            None
        }
        UiEvent::InputChar(c) => {
            viewer.input_mut().push(c);
            None
        }
        UiEvent::Backspace => {
            viewer.input_mut().pop();
            None
        }
        UiEvent::ToggleInputRegex => {
            viewer.input_is_regex = !viewer.input_is_regex;
            None
        }
        UiEvent::ToggleInputCase => {
            viewer.input_case_sensitive = !viewer.input_case_sensitive;
            None
        }
        UiEvent::ToggleInputExclude => {
            viewer.input_excluding = !viewer.input_excluding;
            None
        }
        UiEvent::ToggleInputLogic => {
            viewer.input_is_logic = !viewer.input_is_logic;
            None
        }
        UiEvent::AddFilter => {
            if viewer.filter_input.is_empty() {
                return None;
            }
            let definition = viewer.input_definition();
            let result = match viewer.editing {
                Some(index) => {
                    let record = edited_record(session, index, definition);
                    session.edit_filter(index, record).map(|handle| (index, handle))
                }
                None => session
                    .add_filter(definition.into())
                    .map(|handle| (session.filters().len() - 1, handle)),
            };
            match result {
                Ok((index, handle)) => {
                    viewer.filter_input.clear();
                    viewer.editing = None;
                    viewer.selected_filter = index;
                    Some(handle)
                }
                Err(e) => {
                    status.post(e.to_string(), Some(DEFAULT_STATUS_TIMEOUT));
                    None
                }
            }
        }
        UiEvent::EditFilter => {
            let definition = session.filters().get(filter)?.record().definition.clone();
            if definition.kind == FilterKind::Marker {
                status.post(
                    "Marker filters have no pattern to edit",
                    Some(DEFAULT_STATUS_TIMEOUT),
                );
                return None;
            }
            viewer.load_definition(filter, &definition);
            None
        }
        UiEvent::ToggleFilterEnabled => session.toggle_filter_enabled(filter).ok(),
        UiEvent::DeleteFilter => {
            let handle = session.remove_filter(filter).ok().flatten();
            viewer.editing = None;
            viewer.clamp_filter_selection(session.filters().len());
            handle
        }
        UiEvent::RemoveAllFilters => {
            viewer.editing = None;
            viewer.selected_filter = 0;
            session.remove_all_filters()
        }
        UiEvent::EnableAll => session.enable_all(),
        UiEvent::DisableAll => session.disable_all(),
        UiEvent::SelectFilterUp => {
            viewer.select_filter_up();
            None
        }
        UiEvent::SelectFilterDown => {
            viewer.select_filter_down(session.filters().len());
            None
        }
        UiEvent::MoveFilterUp | UiEvent::MoveFilterDown => {
            let moved = if event == UiEvent::MoveFilterUp {
                session.move_filter_up(filter)
            } else {
                session.move_filter_down(filter)
            };
            let (to, handle) = moved.ok()?;
            viewer.selected_filter = to;
            viewer.editing = None;
            handle
        }

        UiEvent::NextHit | UiEvent::PreviousHit => {
            jump_to_hit(session, viewer, status, filter, event == UiEvent::PreviousHit);
            None
        }
        UiEvent::JumpToHit { name, backward } => {
            match session.filters().find_by_name(&name.to_string()) {
                Some((index, _)) => {
                    viewer.selected_filter = index;
                    jump_to_hit(session, viewer, status, index, backward);
                }
                None => status.post(format!("No filter named {name}"), Some(DEFAULT_STATUS_TIMEOUT)),
            }
            None
        }
        UiEvent::ToggleMarker(marker) => {
            let index = viewer.resolve_selection(&visible)?.checked_sub(1)?;
            match session.toggle_marker(index, marker) {
                Ok((_, handle)) => handle,
                Err(e) => {
                    status.post(e.to_string(), Some(DEFAULT_STATUS_TIMEOUT));
                    None
                }
            }
        }
        UiEvent::ToggleOnlyFiltered | UiEvent::ToggleHideEmpty => {
            let mut view: ViewOptions = session.view();
            if event == UiEvent::ToggleOnlyFiltered {
                view.only_filtered = !view.only_filtered;
            } else {
                view.hide_empty = !view.hide_empty;
            }
            session.set_view(view);
            if let Some(line) = session.go_to_line(viewer.selected_line) {
                viewer.selected_line = line;
            }
            None
        }

        UiEvent::OpenPrompt(kind) => {
            viewer.open_prompt(kind);
            None
        }
        UiEvent::CancelPrompt => {
            viewer.prompt = None;
            None
        }
        UiEvent::SubmitPrompt => {
            let prompt = viewer.prompt.take()?;
            match prompt.kind {
                PromptKind::Find => {
                    if prompt.text.is_empty() {
                        return None;
                    }
                    let needle = viewer.find_definition(&prompt.text);
                    find_text(session, viewer, status, &needle, false);
                    viewer.last_find = Some(needle);
                }
                PromptKind::GoToLine => match prompt.text.trim().parse::<usize>() {
                    Ok(number) => {
                        if let Some(line) = session.go_to_line(number) {
                            viewer.selected_line = line;
                        }
                    }
                    Err(_) => status.post(
                        format!("'{}' is not a line number", prompt.text),
                        Some(DEFAULT_STATUS_TIMEOUT),
                    ),
                },
            }
            None
        }
        UiEvent::FindAgain { backward } => {
            match viewer.last_find.clone() {
                Some(needle) => find_text(session, viewer, status, &needle, backward),
                None => status.post("Nothing to find yet; press f", Some(DEFAULT_STATUS_TIMEOUT)),
            }
            None
        }

        UiEvent::Reload => {
            if is_stdin(&config.file) {
                status.post("Standard input cannot be reloaded", Some(DEFAULT_STATUS_TIMEOUT));
                return None;
            }
            match FileSource::new(&config.file).load().await {
                Ok(texts) => {
                    let handle = session.load(texts);
                    viewer.selected_line = session.go_to_line(viewer.selected_line).unwrap_or(0);
                    status.post(
                        format!("Reloaded {} lines", session.line_count()),
                        Some(DEFAULT_STATUS_TIMEOUT),
                    );
                    Some(handle)
                }
                Err(e) => {
                    warn!(error = %e, "reloading document failed");
                    status.post(format!("{e:#}"), Some(DEFAULT_STATUS_TIMEOUT));
                    None
                }
            }
        }
        UiEvent::SaveVisible { with_numbers } => {
            let path = sibling_path(config, VISIBLE_LINES_EXTENSION);
            let mut text = session.export_visible(with_numbers);
            if !text.is_empty() {
                text.push('\n');
            }
            match tokio::fs::write(&path, text).await {
                Ok(()) => status.post(
                    format!("Saved {} lines to {}", session.visible_lines().len(), path.display()),
                    Some(DEFAULT_STATUS_TIMEOUT),
                ),
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "saving lines failed");
                    status.post(
                        format!("Failed to write {}: {e}", path.display()),
                        Some(DEFAULT_STATUS_TIMEOUT),
                    );
                }
            }
            None
        }
        UiEvent::SaveFilters => {
            let path = filters_path(config);
            match save_filters(&path, &session.filters().records()) {
                Ok(()) => status.post(
                    format!("Saved filters to {}", path.display()),
                    Some(DEFAULT_STATUS_TIMEOUT),
                ),
                Err(e) => {
                    warn!(error = %e, "saving filters failed");
                    status.post(e.to_string(), Some(DEFAULT_STATUS_TIMEOUT));
                }
            }
            None
        }
    }
}

/// The record at `index` with a new definition; colours, enablement and
/// description are kept.
fn edited_record(
    session: &DocumentSession,
    index: usize,
    definition: FilterDefinition,
) -> FilterRecord {
    match session.filters().get(index) {
        Some(current) => FilterRecord {
            definition,
            ..current.record().clone()
        },
        None => definition.into(),
    }
}

fn jump_to_hit(
    session: &DocumentSession,
    viewer: &mut ViewerState,
    status: &StatusBoard,
    filter: usize,
    backward: bool,
) {
    match session.find_next_hit(filter, viewer.selected_line, backward) {
        Some(line) => viewer.selected_line = line,
        None => status.post("No hits", Some(DEFAULT_STATUS_TIMEOUT)),
    }
}

fn find_text(
    session: &DocumentSession,
    viewer: &mut ViewerState,
    status: &StatusBoard,
    needle: &FilterDefinition,
    backward: bool,
) {
    match session.find_text(needle, viewer.selected_line, backward) {
        Ok(Some(line)) => viewer.selected_line = line,
        Ok(None) => status.post(
            format!("'{}' not found", needle.pattern),
            Some(DEFAULT_STATUS_TIMEOUT),
        ),
        Err(e) => status.post(e.to_string(), Some(DEFAULT_STATUS_TIMEOUT)),
    }
}

/// A file next to the document, or in the working directory for stdin.
fn sibling_path(config: &Config, extension: &str) -> PathBuf {
    if is_stdin(&config.file) {
        PathBuf::from("stdin").with_extension(extension)
    } else {
        config.file.with_extension(extension)
    }
}

fn filters_path(config: &Config) -> PathBuf {
    config
        .filters_file
        .clone()
        .unwrap_or_else(|| sibling_path(config, FILTER_FILE_EXTENSION))
}

fn print_document(session: &DocumentSession, line_numbers: bool) -> Result<()> {
    let styled = io::stdout().is_terminal();
    let mut out = io::stdout().lock();
    for line in session.visible_lines() {
        write_line(&mut out, line, line_numbers, styled)?;
    }
    out.flush()?;

    let mut err = io::stderr().lock();
    for filter in session.filters().iter() {
        writeln!(
            err,
            "{} {:>8} hits  {}",
            filter.name(),
            filter.hit_count(),
            filter.record().definition.display_pattern()
        )?;
    }
    Ok(())
}

fn write_line(
    out: &mut impl Write,
    line: &AnnotatedLine,
    number: bool,
    styled: bool,
) -> io::Result<()> {
    let text = if number {
        format!("{} {}", line.number, line.text)
    } else {
        line.text.to_string()
    };
    if !styled {
        return writeln!(out, "{text}");
    }
    let mut content = text.stylize();
    if let Some(fg) = line.foreground {
        content = content.with(crossterm_color(fg));
    }
    if let Some(bg) = line.background {
        content = content.on(crossterm_color(bg));
    }
    writeln!(out, "{content}")
}

fn crossterm_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.0,
        g: rgb.1,
        b: rgb.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, foreground: Option<Rgb>) -> AnnotatedLine {
        AnnotatedLine {
            number: 12,
            text: text.into(),
            markers: Vec::new(),
            excluded: false,
            foreground,
            background: None,
        }
    }

    #[test]
    fn test_plain_output() {
        let mut out = Vec::new();
        write_line(&mut out, &line("hello", Some(Rgb(9, 9, 9))), true, false).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "12 hello\n");
    }

    #[test]
    fn test_styled_output_carries_colour() {
        let mut out = Vec::new();
        write_line(&mut out, &line("hello", Some(Rgb(1, 2, 3))), false, true).unwrap();
        let written = String::from_utf8(out).unwrap();
        assert!(written.contains("hello"));
        assert!(written.contains("38;2;1;2;3"));
    }

    struct Harness {
        config: Config,
        session: DocumentSession,
        viewer: ViewerState,
        status: StatusBoard,
    }

    impl Harness {
        async fn new(lines: &[&str], file: PathBuf) -> Self {
            let mut session = DocumentSession::new(SessionConfig {
                debounce: Duration::from_millis(1),
                ..SessionConfig::default()
            });
            let handle = session.load(lines.iter().map(|l| l.to_string()).collect());
            session.complete(handle).await.unwrap();
            let config = Config {
                file,
                filters_file: None,
                filters: Vec::new(),
                view: ViewOptions::default(),
                debounce: Duration::from_millis(1),
                print: false,
                line_numbers: false,
                log_file: None,
            };
            Self {
                config,
                session,
                viewer: ViewerState::new(),
                status: StatusBoard::new(),
            }
        }

        /// Handle an event and wait for any pass it started.
        async fn send(&mut self, event: UiEvent) -> bool {
            let handle = handle_event(
                event,
                &self.config,
                &mut self.session,
                &mut self.viewer,
                &self.status,
            )
            .await;
            match handle {
                Some(handle) => {
                    assert_eq!(self.session.complete(handle).await, Ok(true));
                    true
                }
                None => false,
            }
        }

        async fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.send(UiEvent::InputChar(c)).await;
            }
        }

        async fn add(&mut self, record: FilterRecord) {
            let handle = self.session.add_filter(record).unwrap();
            self.session.complete(handle).await.unwrap();
        }

        fn only_filtered(&mut self) {
            self.session.set_view(ViewOptions {
                only_filtered: true,
                hide_empty: false,
            });
        }
    }

    #[tokio::test]
    async fn test_edit_filter_keeps_colours() {
        let red = Rgb(255, 0, 0);
        let mut h = Harness::new(&["err one", "warn two"], "app.log".into()).await;
        h.add(FilterRecord::new(FilterDefinition::text("err")).with_colors(Some(red), None))
            .await;

        h.send(UiEvent::EditFilter).await;
        assert_eq!(h.viewer.filter_input, "err");
        assert_eq!(h.viewer.editing, Some(0));
        assert!(h.viewer.is_typing());

        for _ in 0..3 {
            h.send(UiEvent::Backspace).await;
        }
        h.type_text("warn").await;
        assert!(h.send(UiEvent::AddFilter).await);

        assert_eq!(h.session.filters().len(), 1);
        let filter = h.session.filters().get(0).unwrap();
        assert_eq!(filter.record().definition.pattern, "warn");
        assert_eq!(filter.foreground(), Some(red));
        assert_eq!(filter.hits(), &[2]);
        assert_eq!(h.viewer.editing, None);
        assert!(h.viewer.filter_input.is_empty());
    }

    #[tokio::test]
    async fn test_jump_to_hits_by_filter_name() {
        let mut h = Harness::new(&["a x", "b y", "c x", "d y"], "app.log".into()).await;
        h.add(FilterRecord::new(FilterDefinition::text("x"))).await;
        h.add(FilterRecord::new(FilterDefinition::text("y"))).await;

        h.send(UiEvent::JumpToHit { name: 'b', backward: false }).await;
        assert_eq!(h.viewer.selected_line, 2);
        assert_eq!(h.viewer.selected_filter, 1);
        h.send(UiEvent::JumpToHit { name: 'b', backward: false }).await;
        assert_eq!(h.viewer.selected_line, 4);
        h.send(UiEvent::JumpToHit { name: 'a', backward: true }).await;
        assert_eq!(h.viewer.selected_line, 3);
        assert_eq!(h.viewer.selected_filter, 0);

        h.send(UiEvent::JumpToHit { name: 'q', backward: false }).await;
        assert_eq!(h.viewer.selected_line, 3);
        assert_eq!(h.status.latest().as_deref(), Some("No filter named q"));
    }

    #[tokio::test]
    async fn test_enable_disable_and_remove_all() {
        let mut h = Harness::new(&["a", "b"], "app.log".into()).await;
        h.add(FilterRecord::new(FilterDefinition::text("a"))).await;
        h.add(FilterRecord::new(FilterDefinition::text("b"))).await;

        assert!(h.send(UiEvent::DisableAll).await);
        assert!(h.session.filters().iter().all(|f| !f.is_enabled()));
        assert!(!h.send(UiEvent::DisableAll).await);
        assert!(h.send(UiEvent::EnableAll).await);
        assert_eq!(h.session.filters().get(1).unwrap().hits(), &[2]);

        assert!(h.send(UiEvent::RemoveAllFilters).await);
        assert!(h.session.filters().is_empty());
        assert!(h.session.rendered().iter().all(|l| !l.excluded));
    }

    #[tokio::test]
    async fn test_marker_lands_on_highlighted_line() {
        let mut h = Harness::new(&["keep 1", "drop 2", "keep 3"], "app.log".into()).await;
        h.add(FilterRecord::new(FilterDefinition::text("keep"))).await;
        h.only_filtered();
        // Line 2 is hidden, so line 3 is the one highlighted.
        h.viewer.selected_line = 2;

        h.send(UiEvent::ToggleMarker(3)).await;
        assert!(h.session.markers().markers(1).is_empty());
        assert_eq!(h.session.markers().markers(2), &[3]);
        assert_eq!(h.viewer.selected_line, 3);
    }

    #[tokio::test]
    async fn test_find_and_go_to_prompts() {
        let mut h = Harness::new(&["alpha", "beta", "Alpha two"], "app.log".into()).await;

        h.send(UiEvent::OpenPrompt(PromptKind::Find)).await;
        h.type_text("alpha").await;
        h.send(UiEvent::SubmitPrompt).await;
        assert_eq!(h.viewer.selected_line, 3);
        assert!(h.viewer.prompt.is_none());
        assert!(h.viewer.filter_input.is_empty());
        h.send(UiEvent::FindAgain { backward: false }).await;
        assert_eq!(h.viewer.selected_line, 1);

        h.send(UiEvent::OpenPrompt(PromptKind::GoToLine)).await;
        h.type_text("2").await;
        h.send(UiEvent::SubmitPrompt).await;
        assert_eq!(h.viewer.selected_line, 2);

        h.send(UiEvent::OpenPrompt(PromptKind::GoToLine)).await;
        h.type_text("two").await;
        h.send(UiEvent::SubmitPrompt).await;
        assert_eq!(h.viewer.selected_line, 2);
        assert_eq!(
            h.status.latest().as_deref(),
            Some("'two' is not a line number")
        );
    }

    #[tokio::test]
    async fn test_reload_and_save_visible_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        std::fs::write(&path, "x1\ny\nx2\n").unwrap();

        let mut h = Harness::new(&[], path.clone()).await;
        assert!(h.send(UiEvent::Reload).await);
        assert_eq!(h.session.line_count(), 3);

        h.add(FilterRecord::new(FilterDefinition::text("x"))).await;
        h.only_filtered();
        h.send(UiEvent::SaveVisible { with_numbers: true }).await;
        let saved = std::fs::read_to_string(dir.path().join("app.filtered.txt")).unwrap();
        assert_eq!(saved, "1 x1\n3 x2\n");

        std::fs::write(&path, "y\nx3\n").unwrap();
        assert!(h.send(UiEvent::Reload).await);
        assert_eq!(h.session.line_count(), 2);
        assert_eq!(h.session.filters().get(0).unwrap().hits(), &[2]);
    }

    #[tokio::test]
    async fn test_stdin_document_is_not_reloaded() {
        let mut h = Harness::new(&["a"], STDIN_PATH.into()).await;
        assert!(!h.send(UiEvent::Reload).await);
        assert_eq!(h.session.line_count(), 1);
        assert_eq!(
            sibling_path(&h.config, VISIBLE_LINES_EXTENSION),
            PathBuf::from("stdin.filtered.txt")
        );
    }
}
