use crate::filter::FilterDefinition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Find,
    GoToLine,
}

/// A one-line question asked in the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterFocus {
    #[default]
    Input,
    List,
}

/// Viewer-only state: selection, scrolling and the filter panel's input.
#[derive(Debug, Default)]
pub struct ViewerState {
    // Line number of the selected line; 0 when the document is empty
    pub selected_line: usize,
    // Index into the visible lines of the first row on screen
    pub scroll: usize,
    pub filter_panel_open: bool,
    pub filter_focus: FilterFocus,
    pub filter_input: String,
    pub input_is_regex: bool,
    pub input_case_sensitive: bool,
    pub input_excluding: bool,
    pub input_is_logic: bool,
    pub selected_filter: usize,
    // Filter whose definition is loaded into the input, if any
    pub editing: Option<usize>,
    pub prompt: Option<Prompt>,
    pub last_find: Option<FilterDefinition>,
}

impl ViewerState {
    pub fn new() -> Self {
        Self {
            selected_line: 1,
            ..Self::default()
        }
    }

    pub fn is_typing(&self) -> bool {
        self.filter_panel_open && self.filter_focus == FilterFocus::Input
    }

    pub fn is_prompting(&self) -> bool {
        self.prompt.is_some()
    }

    /// The filter described by the panel's input line.
    pub fn input_definition(&self) -> FilterDefinition {
        self.definition_for(self.filter_input.clone())
            .excluding(self.input_excluding)
    }

    /// A search for `text` using the input's matching flags.
    pub fn find_definition(&self, text: &str) -> FilterDefinition {
        self.definition_for(text.to_string())
    }

    fn definition_for(&self, pattern: String) -> FilterDefinition {
        let mut def = FilterDefinition::text(pattern).case_sensitive(self.input_case_sensitive);
        def.is_regex = self.input_is_regex;
        // Regex takes precedence; both at once is rejected on compile.
        def.is_logic = self.input_is_logic && !self.input_is_regex;
        def
    }

    /// Put an existing filter into the input line for editing.
    pub fn load_definition(&mut self, index: usize, def: &FilterDefinition) {
        self.filter_input = def.pattern.clone();
        self.input_is_regex = def.is_regex;
        self.input_case_sensitive = def.case_sensitive;
        self.input_excluding = def.excluded;
        self.input_is_logic = def.is_logic;
        self.editing = Some(index);
        self.filter_panel_open = true;
        self.filter_focus = FilterFocus::Input;
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        self.prompt = Some(Prompt {
            kind,
            text: String::new(),
        });
    }

    /// Text typed goes to the prompt when one is open, else to the filter input.
    pub fn input_mut(&mut self) -> &mut String {
        match &mut self.prompt {
            Some(prompt) => &mut prompt.text,
            None => &mut self.filter_input,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.filter_focus = match self.filter_focus {
            FilterFocus::Input => FilterFocus::List,
            FilterFocus::List => FilterFocus::Input,
        };
    }

    /// Move the selection by `delta` rows within `visible` line numbers.
    pub fn move_selection(&mut self, visible: &[usize], delta: isize) {
        let Some(pos) = self.selected_position(visible) else {
            self.selected_line = 0;
            return;
        };
        let last = visible.len() - 1;
        let target = pos.saturating_add_signed(delta).min(last);
        self.selected_line = visible[target];
    }

    pub fn select_first(&mut self, visible: &[usize]) {
        self.selected_line = visible.first().copied().unwrap_or(0);
    }

    pub fn select_last(&mut self, visible: &[usize]) {
        self.selected_line = visible.last().copied().unwrap_or(0);
    }

    /// Row of the selection among `visible`: the selected line itself, or
    /// the nearest visible line after it when it is hidden.
    pub fn selected_position(&self, visible: &[usize]) -> Option<usize> {
        if visible.is_empty() {
            return None;
        }
        let pos = visible.partition_point(|&n| n < self.selected_line);
        Some(pos.min(visible.len() - 1))
    }

    /// Snap a hidden selection onto the line highlighted in its place and
    /// return that line.
    pub fn resolve_selection(&mut self, visible: &[usize]) -> Option<usize> {
        let line = visible[self.selected_position(visible)?];
        self.selected_line = line;
        Some(line)
    }

    /// Keep the selection on screen for a panel `height` rows tall.
    pub fn scroll_to_selection(&mut self, visible: &[usize], height: usize) {
        let Some(pos) = self.selected_position(visible) else {
            self.scroll = 0;
            return;
        };
        let height = height.max(1);
        if pos < self.scroll {
            self.scroll = pos;
        } else if pos >= self.scroll + height {
            self.scroll = pos + 1 - height;
        }
        self.scroll = self.scroll.min(visible.len().saturating_sub(height));
    }

    pub fn select_filter_up(&mut self) {
        self.selected_filter = self.selected_filter.saturating_sub(1);
    }

    pub fn select_filter_down(&mut self, filter_count: usize) {
        if self.selected_filter + 1 < filter_count {
            self.selected_filter += 1;
        }
    }

    /// Keep the filter selection valid after the list shrank.
    pub fn clamp_filter_selection(&mut self, filter_count: usize) {
        self.selected_filter = self.selected_filter.min(filter_count.saturating_sub(1));
    }
}
