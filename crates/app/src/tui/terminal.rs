use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Switch to raw mode on the alternate screen
pub fn enter() -> Result<Tui> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")
}

/// Give the terminal back to the shell
pub fn leave(terminal: &mut Tui) -> Result<()> {
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Hand the terminal to a child process, then take it back
pub fn suspended<T>(terminal: &mut Tui, f: impl FnOnce() -> T) -> Result<T> {
    leave(terminal)?;
    let value = f();

    enable_raw_mode().context("Failed to enable raw mode")?;
    execute!(terminal.backend_mut(), EnterAlternateScreen).context("Failed to enter alternate screen")?;
    terminal.clear().context("Failed to clear terminal")?;
    Ok(value)
}
