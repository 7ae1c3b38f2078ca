//! repodeck application library: adapters, composition root, CLI and TUI.

pub mod adapters;
pub mod cli;
pub mod logging;
pub mod services;
pub mod tui;
