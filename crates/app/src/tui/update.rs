use crossterm::event::{KeyCode, KeyModifiers};
use repodeck_core::commander::ActionOutcome;
use repodeck_core::domain::Repository;
use super::model::TuiModel;

/// What the event loop should do after a key press
#[derive(Debug, Clone, PartialEq)]
pub enum TuiMessage {
    /// Resolve the binding for `key` against the selected repository
    Resolve { key: String, repo: Repository },

    /// Leave the UI
    Quit,

    /// No action needed
    None,
}

/// The Update function - handles user input and updates the model
pub struct TuiUpdate;

impl TuiUpdate {
    /// Handle a key press and update the model accordingly
    pub fn handle_key(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> TuiMessage {
        if let Some(msg) = Self::handle_global_keys(model, key, modifiers) {
            return msg;
        }
        if Self::handle_input_keys(model, key, modifiers) {
            return TuiMessage::None;
        }

        let Some(key) = Self::key_id(key, modifiers) else {
            return TuiMessage::None;
        };
        match model.selected() {
            Some(repo) => TuiMessage::Resolve { key, repo: repo.clone() },
            None => {
                model.error(format!("{key}: no repository selected"));
                TuiMessage::None
            }
        }
    }

    fn handle_global_keys(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> Option<TuiMessage> {
        match key {
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Self::quit(model)),
            KeyCode::Esc if model.query().is_empty() => Some(Self::quit(model)),
            KeyCode::Esc => {
                model.set_query(String::new());
                Some(TuiMessage::None)
            }
            _ => None,
        }
    }

    /// Query editing and list navigation; true when the key was consumed
    fn handle_input_keys(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> bool {
        match key {
            KeyCode::Up => model.move_cursor(-1),
            KeyCode::Down => model.move_cursor(1),
            KeyCode::PageUp => model.move_cursor(-10),
            KeyCode::PageDown => model.move_cursor(10),
            KeyCode::Backspace => {
                let mut query = model.query().to_string();
                query.pop();
                model.set_query(query);
            }
            KeyCode::Char(c) if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                let mut query = model.query().to_string();
                query.push(c);
                model.set_query(query);
            }
            _ => return false,
        }
        true
    }

    fn quit(model: &mut TuiModel) -> TuiMessage {
        model.should_quit = true;
        TuiMessage::Quit
    }

    /// The binding identifier for a key press, e.g. `ctrl+o`, `enter`, `f5`
    pub fn key_id(key: KeyCode, modifiers: KeyModifiers) -> Option<String> {
        let base = match key {
            KeyCode::Char(c) => c.to_ascii_lowercase().to_string(),
            KeyCode::Enter => "enter".to_string(),
            KeyCode::Tab => "tab".to_string(),
            KeyCode::BackTab => "shift+tab".to_string(),
            KeyCode::Delete => "delete".to_string(),
            KeyCode::Left => "left".to_string(),
            KeyCode::Right => "right".to_string(),
            KeyCode::F(n) => format!("f{n}"),
            _ => return None,
        };

        let mut id = String::new();
        if modifiers.contains(KeyModifiers::CONTROL) {
            id.push_str("ctrl+");
        }
        if modifiers.contains(KeyModifiers::ALT) {
            id.push_str("alt+");
        }
        id.push_str(&base);
        Some(id)
    }

    /// Record a finished action in the status line
    pub fn handle_outcome(model: &mut TuiModel, label: &str, outcome: &ActionOutcome) {
        model.running = model.running.saturating_sub(1);
        match outcome {
            Ok(()) => model.info(format!("{label}: done")),
            Err(err) => model.error(format!("{label}: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repodeck_core::app::SearchProjection;
    use repodeck_core::commander::{ActionError, KeyBindings};
    use crate::tui::model::Status;

    fn model() -> TuiModel {
        let repos = ["api", "web", "cli"]
            .iter()
            .map(|name| Repository {
                remote_id: name.to_string(),
                owner: "octo".to_string(),
                name: name.to_string(),
                ..Repository::default()
            })
            .collect();
        TuiModel::new(SearchProjection::new(repos), &KeyBindings::defaults())
    }

    fn press(model: &mut TuiModel, key: KeyCode) -> TuiMessage {
        TuiUpdate::handle_key(model, key, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_filters_and_resets_cursor() {
        let mut model = model();
        press(&mut model, KeyCode::Down);
        assert_eq!(model.cursor, 1);

        for c in "web".chars() {
            assert_eq!(press(&mut model, KeyCode::Char(c)), TuiMessage::None);
        }
        assert_eq!(model.query(), "web");
        assert_eq!(model.cursor, 0);
        assert_eq!(model.projection.len(), 1);

        press(&mut model, KeyCode::Backspace);
        assert_eq!(model.query(), "we");
    }

    #[test]
    fn test_escape_clears_query_then_quits() {
        let mut model = model();
        press(&mut model, KeyCode::Char('x'));

        assert_eq!(press(&mut model, KeyCode::Esc), TuiMessage::None);
        assert_eq!(model.query(), "");
        assert!(!model.should_quit);

        assert_eq!(press(&mut model, KeyCode::Esc), TuiMessage::Quit);
        assert!(model.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut model = model();
        let msg = TuiUpdate::handle_key(&mut model, KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(msg, TuiMessage::Quit);
    }

    #[test]
    fn test_bound_keys_resolve_against_selection() {
        let mut model = model();
        press(&mut model, KeyCode::Down);

        match TuiUpdate::handle_key(&mut model, KeyCode::Char('o'), KeyModifiers::CONTROL) {
            TuiMessage::Resolve { key, repo } => {
                assert_eq!(key, "ctrl+o");
                assert_eq!(repo.name, "cli");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert!(matches!(press(&mut model, KeyCode::Enter), TuiMessage::Resolve { key, .. } if key == "enter"));
    }

    #[test]
    fn test_bound_key_without_selection_reports_error() {
        let mut model = TuiModel::default();
        assert_eq!(press(&mut model, KeyCode::Enter), TuiMessage::None);
        assert_eq!(
            model.messages.back(),
            Some(&Status::Error("enter: no repository selected".to_string()))
        );
    }

    #[test]
    fn test_key_ids() {
        assert_eq!(TuiUpdate::key_id(KeyCode::Char('P'), KeyModifiers::CONTROL).as_deref(), Some("ctrl+p"));
        assert_eq!(TuiUpdate::key_id(KeyCode::Char('x'), KeyModifiers::ALT).as_deref(), Some("alt+x"));
        assert_eq!(TuiUpdate::key_id(KeyCode::F(5), KeyModifiers::NONE).as_deref(), Some("f5"));
        assert_eq!(
            TuiUpdate::key_id(KeyCode::Enter, KeyModifiers::CONTROL | KeyModifiers::ALT).as_deref(),
            Some("ctrl+alt+enter")
        );
        assert_eq!(TuiUpdate::key_id(KeyCode::Home, KeyModifiers::NONE), None);
    }

    #[test]
    fn test_outcome_updates_status() {
        let mut model = model();
        model.running = 1;
        TuiUpdate::handle_outcome(&mut model, "ctrl+p", &Err(ActionError::Abandoned));
        assert_eq!(model.running, 0);
        assert!(matches!(model.messages.back(), Some(Status::Error(msg)) if msg.starts_with("ctrl+p: ")));

        TuiUpdate::handle_outcome(&mut model, "ctrl+o", &Ok(()));
        assert_eq!(model.running, 0);
        assert_eq!(model.messages.back(), Some(&Status::Info("ctrl+o: done".to_string())));
    }
}
