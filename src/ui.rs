use crate::filter::Rgb;
use crate::pipeline::AnnotatedLine;
use crate::session::DocumentSession;
use crate::state::{FilterFocus, PromptKind, ViewerState};
use crate::status::StatusBoard;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use std::io;
use std::time::Duration;

const PAGE: isize = 20;
const FILTER_PANEL_MAX_ROWS: u16 = 10;

pub struct Ui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl Ui {
    pub fn new() -> anyhow::Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    pub fn restore(&mut self) -> anyhow::Result<()> {
        crossterm::terminal::disable_raw_mode()?;
        crossterm::execute!(
            self.terminal.backend_mut(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::cursor::Show
        )?;
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn draw(
        &mut self,
        session: &DocumentSession,
        viewer: &mut ViewerState,
        status: &StatusBoard,
    ) -> anyhow::Result<()> {
        self.terminal.draw(|frame| {
            let mut constraints = vec![Constraint::Min(3), Constraint::Length(2)];
            if viewer.filter_panel_open {
                let rows = (session.filters().len() as u16).min(FILTER_PANEL_MAX_ROWS);
                constraints.push(Constraint::Length(rows + 5));
            }
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(constraints)
                .split(frame.area());

            draw_document(frame, chunks[0], session, viewer);
            draw_status_bar(frame, chunks[1], session, viewer, status);
            if viewer.filter_panel_open {
                draw_filter_panel(frame, chunks[2], session, viewer);
            }
        })?;
        Ok(())
    }
}

fn draw_document(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    session: &DocumentSession,
    viewer: &mut ViewerState,
) {
    let visible = session.visible_lines();
    let numbers: Vec<usize> = visible.iter().map(|l| l.number).collect();
    let height = area.height.saturating_sub(2) as usize;
    viewer.scroll_to_selection(&numbers, height);

    let selected = viewer
        .selected_position(&numbers)
        .map(|pos| numbers[pos])
        .unwrap_or(0);
    let width = session.line_count().to_string().len();

    let rows: Vec<Line> = visible
        .iter()
        .skip(viewer.scroll)
        .take(height)
        .map(|line| {
            let row = document_row(line, width);
            if line.number == selected {
                apply_line_modifier(row, Modifier::REVERSED)
            } else {
                row
            }
        })
        .collect();

    let title = format!(
        "Document ({} of {} lines shown)",
        visible.len(),
        session.line_count()
    );
    let para = Paragraph::new(rows).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(para, area);
}

fn document_row(line: &AnnotatedLine, width: usize) -> Line<'static> {
    let markers: String = line
        .markers
        .iter()
        .map(|m| char::from(b'0' + m))
        .collect();
    let mut style = Style::default();
    if let Some(fg) = line.foreground {
        style = style.fg(color(fg));
    }
    if let Some(bg) = line.background {
        style = style.bg(color(bg));
    }
    Line::from(vec![
        Span::styled(format!("{markers:>3} "), Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("{:>width$} ", line.number),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(line.text.to_string(), style),
    ])
}

fn draw_status_bar(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    session: &DocumentSession,
    viewer: &ViewerState,
    status: &StatusBoard,
) {
    let view = session.view();
    let message = match &viewer.prompt {
        Some(prompt) => {
            let label = match prompt.kind {
                PromptKind::Find => "Find",
                PromptKind::GoToLine => "Go to line",
            };
            format!("{label}: {}_  (Enter:go, Esc:cancel)", prompt.text)
        }
        None => status.latest().unwrap_or_else(|| {
            "[/] Filters  n/N:Hits  Alt+a..z:Hits of filter  1-9:Markers  f/]/[:Find  g:Go to  \
             o:Only filtered  e:Hide empty  +/-:Enable/disable all  R:Reload  w/W:Save lines  \
             s:Save filters  q:Quit"
                .into()
        }),
    };
    let text = format!(
        "Line {}/{}  Filters: {}  Only filtered: {}  Hide empty: {}  | {}",
        viewer.selected_line,
        session.line_count(),
        session.filters().len(),
        view.only_filtered,
        view.hide_empty,
        message,
    );
    let para = Paragraph::new(text).block(Block::default().borders(Borders::TOP));
    frame.render_widget(para, area);
}

fn draw_filter_panel(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    session: &DocumentSession,
    viewer: &ViewerState,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(2)])
        .split(area);

    let action = match viewer.editing.and_then(|i| session.filters().get(i)) {
        Some(filter) => format!("Editing {}", filter.name()),
        None => "Filter Input".to_string(),
    };
    let input_title = format!(
        "{action} (focus={}): r:regex={} c:case={} x:exclude={} l:logic={}",
        match viewer.filter_focus {
            FilterFocus::Input => "input, Alt+key toggles",
            FilterFocus::List => "list",
        },
        viewer.input_is_regex,
        viewer.input_case_sensitive,
        viewer.input_excluding,
        viewer.input_is_logic,
    );
    let input = Paragraph::new(viewer.filter_input.clone())
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, rows[0]);

    let items: Vec<ListItem> = session
        .filters()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let sel = if i == viewer.selected_filter { ">" } else { " " };
            let chk = if f.is_enabled() { "[x]" } else { "[ ]" };
            let definition = &f.record().definition;
            let mut pattern_style = Style::default().add_modifier(Modifier::BOLD);
            if let Some(fg) = f.foreground() {
                pattern_style = pattern_style.fg(color(fg));
            }
            if let Some(bg) = f.background() {
                pattern_style = pattern_style.bg(color(bg));
            }
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} {} {:>2} {:<5} ", sel, chk, f.name(), definition.flags())),
                Span::styled(definition.display_pattern(), pattern_style),
                Span::raw(format!("  ({} hits)", f.hit_count())),
            ]))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(
        "Filters (Space:toggle, E:edit, d:delete, D:delete all, j/k:select, J/K:move, Tab:switch focus)",
    ));
    frame.render_widget(list, rows[1]);
}

fn apply_line_modifier(line: Line<'_>, modifier: Modifier) -> Line<'_> {
    let spans = line
        .spans
        .into_iter()
        .map(|mut s| {
            s.style = s.style.add_modifier(modifier);
            s
        })
        .collect::<Vec<_>>();
    Line::from(spans)
}

fn color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Quit,
    None,
    MoveSelection(isize),
    Top,
    Bottom,

    ToggleFilterPanel,
    FocusNext,
    InputChar(char),
    Backspace,
    AddFilter,
    ToggleInputRegex,
    ToggleInputCase,
    ToggleInputExclude,
    ToggleInputLogic,
    ToggleFilterEnabled,
    DeleteFilter,
    SelectFilterUp,
    SelectFilterDown,
    MoveFilterUp,
    MoveFilterDown,

    NextHit,
    PreviousHit,
    ToggleMarker(u8),
    ToggleOnlyFiltered,
    ToggleHideEmpty,
    SaveFilters,

    EditFilter,
    EnableAll,
    DisableAll,
    RemoveAllFilters,
    /// Next or previous hit of the filter with this name.
    JumpToHit { name: char, backward: bool },
    OpenPrompt(PromptKind),
    SubmitPrompt,
    CancelPrompt,
    /// Repeat the last search.
    FindAgain { backward: bool },
    Reload,
    SaveVisible { with_numbers: bool },
}

pub fn poll_input(state: &ViewerState) -> anyhow::Result<UiEvent> {
    if event::poll(Duration::from_millis(10))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return Ok(map_key(key, state));
            }
        }
    }
    Ok(UiEvent::None)
}

/// Translate a key press. While typing a filter, plain characters go to
/// the input and the input toggles need Alt. Elsewhere Alt plus a filter's
/// letter jumps to its hits, backwards with Shift.
pub fn map_key(key: KeyEvent, state: &ViewerState) -> UiEvent {
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let plain = key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT;

    if state.is_prompting() {
        return match key.code {
            KeyCode::Enter => UiEvent::SubmitPrompt,
            KeyCode::Esc => UiEvent::CancelPrompt,
            KeyCode::Backspace => UiEvent::Backspace,
            KeyCode::Char(c) if plain => UiEvent::InputChar(c),
            _ => UiEvent::None,
        };
    }

    match key.code {
        KeyCode::Up => return UiEvent::MoveSelection(-1),
        KeyCode::Down => return UiEvent::MoveSelection(1),
        KeyCode::PageUp => return UiEvent::MoveSelection(-PAGE),
        KeyCode::PageDown => return UiEvent::MoveSelection(PAGE),
        KeyCode::Home => return UiEvent::Top,
        KeyCode::End => return UiEvent::Bottom,
        KeyCode::Tab if state.filter_panel_open => return UiEvent::FocusNext,
        KeyCode::Esc if state.filter_panel_open => return UiEvent::ToggleFilterPanel,
        KeyCode::Esc => return UiEvent::Quit,
        KeyCode::Enter if state.filter_panel_open => return UiEvent::AddFilter,
        KeyCode::Char(c) if alt && state.is_typing() => {
            return match c {
                'r' => UiEvent::ToggleInputRegex,
                'c' => UiEvent::ToggleInputCase,
                'x' => UiEvent::ToggleInputExclude,
                'l' => UiEvent::ToggleInputLogic,
                _ => UiEvent::None,
            };
        }
        KeyCode::Char(c) if alt && c.is_ascii_alphabetic() => {
            return UiEvent::JumpToHit {
                name: c.to_ascii_lowercase(),
                backward: c.is_ascii_uppercase(),
            };
        }
        _ => {}
    }

    if state.is_typing() {
        return match key.code {
            KeyCode::Backspace => UiEvent::Backspace,
            KeyCode::Char(c) if plain => UiEvent::InputChar(c),
            _ => UiEvent::None,
        };
    }
    if alt {
        return UiEvent::None;
    }

    let list_focus = state.filter_panel_open && state.filter_focus == FilterFocus::List;
    match key.code {
        KeyCode::Char('q') => UiEvent::Quit,
        KeyCode::Char('/') => UiEvent::ToggleFilterPanel,
        KeyCode::Char('n') => UiEvent::NextHit,
        KeyCode::Char('N') => UiEvent::PreviousHit,
        KeyCode::Char('o') => UiEvent::ToggleOnlyFiltered,
        KeyCode::Char('e') => UiEvent::ToggleHideEmpty,
        KeyCode::Char('s') => UiEvent::SaveFilters,
        KeyCode::Char('f') => UiEvent::OpenPrompt(PromptKind::Find),
        KeyCode::Char(']') => UiEvent::FindAgain { backward: false },
        KeyCode::Char('[') => UiEvent::FindAgain { backward: true },
        KeyCode::Char('g') => UiEvent::OpenPrompt(PromptKind::GoToLine),
        KeyCode::Char('+') => UiEvent::EnableAll,
        KeyCode::Char('-') => UiEvent::DisableAll,
        KeyCode::Char('R') => UiEvent::Reload,
        KeyCode::Char('w') => UiEvent::SaveVisible { with_numbers: false },
        KeyCode::Char('W') => UiEvent::SaveVisible { with_numbers: true },
        KeyCode::Char(c @ '1'..='9') => UiEvent::ToggleMarker(c as u8 - b'0'),
        KeyCode::Char('r') if list_focus => UiEvent::ToggleInputRegex,
        KeyCode::Char('c') if list_focus => UiEvent::ToggleInputCase,
        KeyCode::Char('x') if list_focus => UiEvent::ToggleInputExclude,
        KeyCode::Char('l') if list_focus => UiEvent::ToggleInputLogic,
        KeyCode::Char(' ') if list_focus => UiEvent::ToggleFilterEnabled,
        KeyCode::Char('E') if list_focus => UiEvent::EditFilter,
        KeyCode::Char('d') if list_focus => UiEvent::DeleteFilter,
        KeyCode::Char('D') if list_focus => UiEvent::RemoveAllFilters,
        KeyCode::Char('k') if list_focus => UiEvent::SelectFilterUp,
        KeyCode::Char('j') if list_focus => UiEvent::SelectFilterDown,
        KeyCode::Char('K') if list_focus => UiEvent::MoveFilterUp,
        KeyCode::Char('J') if list_focus => UiEvent::MoveFilterDown,
        _ => UiEvent::None,
    }
}
