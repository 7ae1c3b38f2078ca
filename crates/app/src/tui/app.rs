use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use crossterm::event::{self, Event, KeyEventKind};
use repodeck_core::commander::{Completion, Mode};
use repodeck_core::domain::Repository;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::services::AppService;
use super::model::TuiModel;
use super::terminal::{self, Tui};
use super::update::{TuiMessage, TuiUpdate};
use super::view::TuiView;

const TICK: Duration = Duration::from_millis(50);

/// Event loop state that does not belong in the model
struct Runtime<'a> {
    service: &'a AppService,
    pending: Vec<(String, Completion)>,
    output_tx: Sender<String>,
    output_rx: Receiver<String>,
}

/// Run the search UI until the user quits. Returns the message of the
/// exit action that ended it, if any.
pub fn run(service: &AppService) -> Result<Option<String>> {
    let mut model = TuiModel::new(service.projection()?, service.commander().bindings());
    let (output_tx, output_rx) = crossbeam_channel::unbounded();
    let mut runtime = Runtime {
        service,
        pending: Vec::new(),
        output_tx,
        output_rx,
    };

    let mut terminal = terminal::enter()?;
    let result = runtime.event_loop(&mut terminal, &mut model);
    let restored = terminal::leave(&mut terminal);
    result?;
    restored?;

    if !runtime.pending.is_empty() {
        info!(count = runtime.pending.len(), "leaving with actions still running");
    }
    Ok(model.exit_message)
}

impl Runtime<'_> {
    fn event_loop(&mut self, terminal: &mut Tui, model: &mut TuiModel) -> Result<()> {
        let repofs = self.service.repofs().clone();
        let is_cloned = move |repo: &Repository| repofs.is_cloned(repo);

        while !model.should_quit {
            self.drain(model);
            terminal.draw(|frame| TuiView::render(model, frame, &is_cloned))?;

            if !event::poll(TICK)? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if let TuiMessage::Resolve { key, repo } = TuiUpdate::handle_key(model, key.code, key.modifiers) {
                    self.dispatch(terminal, model, &key, &repo)?;
                }
            }
        }
        Ok(())
    }

    /// Pull captured output and finished actions into the model
    fn drain(&mut self, model: &mut TuiModel) {
        for line in self.output_rx.try_iter() {
            model.push_output(line);
        }

        self.pending.retain(|(label, completion)| match completion.try_wait() {
            Some(outcome) => {
                TuiUpdate::handle_outcome(model, label, &outcome);
                false
            }
            None => true,
        });
    }

    fn dispatch(&mut self, terminal: &mut Tui, model: &mut TuiModel, key: &str, repo: &Repository) -> Result<()> {
        let mut action = match self.service.commander().resolve(key, repo) {
            Ok(action) => action,
            Err(err) => {
                warn!(key, repo = %repo.display_name(), error = %err, "failed to resolve key");
                model.error(err.to_string());
                return Ok(());
            }
        };

        if let Some(message) = action.exit_message() {
            model.exit_message = Some(message.to_string());
            model.should_quit = true;
            return Ok(());
        }

        let label = format!("{key} {}", repo.display_name());
        debug!(%label, mode = %action.mode(), "dispatching action");
        match action.mode() {
            Mode::Interactive => {
                let outcome = terminal::suspended(terminal, || action.run())?;
                model.running += 1;
                TuiUpdate::handle_outcome(model, &label, &outcome);
            }
            Mode::ReadOnly => {
                model.start_output(action.command().unwrap_or_default().to_string());
                action.stream_output(self.output_tx.clone());
                self.start(model, label, action.run_async());
            }
            Mode::Background => {
                self.start(model, label, action.run_async());
            }
        }
        Ok(())
    }

    fn start(&mut self, model: &mut TuiModel, label: String, completion: Completion) {
        model.running += 1;
        model.info(format!("{label}: started"));
        self.pending.push((label, completion));
    }
}
