use repodeck_core::app::SearchProjection;
use repodeck_core::commander::KeyBindings;
use repodeck_core::domain::Repository;
use std::collections::VecDeque;

/// Lines of command output kept for the output pane
pub const OUTPUT_LIMIT: usize = 200;
const MESSAGE_LIMIT: usize = 3;

/// The TUI Model - the complete UI state
#[derive(Debug, Default)]
pub struct TuiModel {
    /// Searchable repositories from the store
    pub projection: SearchProjection,

    /// Index of the selected match
    pub cursor: usize,

    /// `(key, description)` pairs shown in the footer
    pub bindings: Vec<(String, String)>,

    /// Output of the most recent read-only action
    pub output: OutputPane,

    /// Recent status lines, newest last
    pub messages: VecDeque<Status>,

    /// Actions started but not yet finished
    pub running: usize,

    /// Set by an exit action; printed once the UI is gone
    pub exit_message: Option<String>,

    /// Whether the application should quit
    pub should_quit: bool,
}

#[derive(Debug, Default)]
pub struct OutputPane {
    pub title: String,
    pub lines: VecDeque<String>,
}

impl OutputPane {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Info(String),
    Error(String),
}

impl TuiModel {
    pub fn new(projection: SearchProjection, bindings: &KeyBindings) -> Self {
        Self {
            projection,
            bindings: bindings
                .iter()
                .map(|(key, command)| {
                    let desc = if command.desc.is_empty() { &command.cmd } else { &command.desc };
                    (key.clone(), desc.clone())
                })
                .collect(),
            ..Self::default()
        }
    }

    pub fn query(&self) -> &str {
        self.projection.query()
    }

    pub fn selected(&self) -> Option<&Repository> {
        self.projection.get(self.cursor)
    }

    pub fn set_query(&mut self, query: String) {
        self.projection.set_query(query);
        self.cursor = 0;
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let last = self.projection.len().saturating_sub(1);
        self.cursor = self.cursor.saturating_add_signed(delta).min(last);
    }

    pub fn start_output(&mut self, title: impl Into<String>) {
        self.output.title = title.into();
        self.output.lines.clear();
    }

    pub fn push_output(&mut self, line: String) {
        if self.output.lines.len() == OUTPUT_LIMIT {
            self.output.lines.pop_front();
        }
        self.output.lines.push_back(line);
    }

    pub fn push_status(&mut self, status: Status) {
        if self.messages.len() == MESSAGE_LIMIT {
            self.messages.pop_front();
        }
        self.messages.push_back(status);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push_status(Status::Info(message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push_status(Status::Error(message.into()));
    }
}
