use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use repodeck_core::domain::Repository;
use super::model::{Status, TuiModel};

/// The View component of MVU - responsible for rendering the model
pub struct TuiView;

impl TuiView {
    /// Render the whole screen; `is_cloned` decides the per-row marker
    pub fn render(model: &TuiModel, frame: &mut Frame, is_cloned: &dyn Fn(&Repository) -> bool) {
        let output_height = if model.output.is_empty() { 0 } else { 10 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),             // Title bar
                Constraint::Length(3),             // Query
                Constraint::Min(0),                // Repositories
                Constraint::Length(output_height), // Command output
                Constraint::Length(3),             // Status
                Constraint::Length(1),             // Key bindings
            ])
            .split(frame.area());

        Self::render_title_bar(model, frame, chunks[0]);
        Self::render_query(model, frame, chunks[1]);
        Self::render_repo_list(model, frame, chunks[2], is_cloned);
        if output_height > 0 {
            Self::render_output(model, frame, chunks[3]);
        }
        Self::render_status_bar(model, frame, chunks[4]);
        Self::render_bindings(model, frame, chunks[5]);
    }

    fn render_title_bar(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let mut title = format!(
            "repodeck - {}/{} repositories",
            model.projection.len(),
            model.projection.total()
        );
        if model.running > 0 {
            title.push_str(&format!(" [{} RUNNING]", model.running));
        }

        let paragraph = Paragraph::new(title)
            .style(Style::default().fg(Color::White).bg(Color::Blue))
            .alignment(Alignment::Center);
        frame.render_widget(paragraph, area);
    }

    fn render_query(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan)),
            Span::raw(model.query()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]);
        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Search"));
        frame.render_widget(paragraph, area);
    }

    fn render_repo_list(model: &TuiModel, frame: &mut Frame, area: Rect, is_cloned: &dyn Fn(&Repository) -> bool) {
        let block = Block::default().borders(Borders::ALL).title("Repositories");

        if model.projection.is_empty() {
            let message = if model.projection.total() == 0 {
                "No repositories cached. Run `repodeck cache` first."
            } else {
                "No repositories match the query."
            };
            let paragraph = Paragraph::new(message)
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = model
            .projection
            .iter()
            .map(|repo| {
                let (marker, color) = if is_cloned(repo) {
                    ("●", Color::Green)
                } else {
                    ("○", Color::DarkGray)
                };
                let mut spans = vec![
                    Span::styled(marker, Style::default().fg(color)),
                    Span::raw(" "),
                    Span::styled(repo.display_name(), Style::default().add_modifier(Modifier::BOLD)),
                ];
                if repo.is_fork {
                    spans.push(Span::styled(" (fork)", Style::default().fg(Color::Magenta)));
                }
                if !repo.description.is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", repo.description),
                        Style::default().fg(Color::Gray),
                    ));
                }
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(model.cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn render_output(model: &TuiModel, frame: &mut Frame, area: Rect) {
        // only the tail fits
        let visible = area.height.saturating_sub(2) as usize;
        let skip = model.output.lines.len().saturating_sub(visible);
        let lines: Vec<Line> = model
            .output
            .lines
            .iter()
            .skip(skip)
            .map(|line| Line::from(line.as_str()))
            .collect();

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(model.output.title.as_str()))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_status_bar(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let line = match model.messages.back() {
            Some(Status::Info(message)) => Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Green))),
            Some(Status::Error(message)) => Line::from(Span::styled(message.as_str(), Style::default().fg(Color::Red))),
            None => Line::from(Span::styled(
                "Type to search, Up/Down to select, Esc to quit",
                Style::default().fg(Color::Gray),
            )),
        };
        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL).title("Status"));
        frame.render_widget(paragraph, area);
    }

    fn render_bindings(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let mut spans = Vec::new();
        for (key, desc) in &model.bindings {
            if !spans.is_empty() {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(key.as_str(), Style::default().fg(Color::Yellow)));
            spans.push(Span::raw(format!(" {desc}")));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
