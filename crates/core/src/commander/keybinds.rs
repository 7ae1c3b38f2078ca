use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::app_action;
use crate::error::ConfigError;

/// Keys the interface keeps for itself
pub const RESERVED_KEYS: [&str; 2] = ["ctrl+c", "ctrl+m"];

/// How an action's process relates to the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Fire and forget; output is discarded
    #[default]
    Background,
    /// Output is captured and streamed to the caller
    ReadOnly,
    /// The process takes over the terminal until it exits
    Interactive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Background => "background",
            Mode::ReadOnly => "readonly",
            Mode::Interactive => "interactive",
        })
    }
}

/// A command template bound to a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCommand {
    pub cmd: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub mode: Mode,
}

impl KeyCommand {
    pub fn new(cmd: impl Into<String>, desc: impl Into<String>, mode: Mode) -> Self {
        Self {
            cmd: cmd.into(),
            desc: desc.into(),
            mode,
        }
    }
}

/// Key identifier to command, ordered by key for stable listings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyBindings(BTreeMap<String, KeyCommand>);

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn defaults() -> Self {
        let mut bindings = Self::new();
        bindings.insert(
            "ctrl+o",
            KeyCommand::new("open '{{ .Repo.HTMLURL }}'", "open in browser", Mode::Background),
        );
        bindings.insert(
            "ctrl+p",
            KeyCommand::new(
                "git clone '{{ .Repo.CloneSSHURL }}' '{{ .CloneDir }}'",
                "clone repository",
                Mode::ReadOnly,
            ),
        );
        bindings.insert(
            "enter",
            KeyCommand::new(":exit {{ .CloneDir }}", "print clone directory and exit", Mode::Background),
        );
        bindings
    }

    pub fn insert(&mut self, key: impl Into<String>, command: KeyCommand) -> Option<KeyCommand> {
        self.0.insert(key.into(), command)
    }

    pub fn get(&self, key: &str) -> Option<&KeyCommand> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyCommand)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Reject reserved keys and built-in commands naming an unknown action
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, command) in &self.0 {
            if RESERVED_KEYS.contains(&key.as_str()) {
                return Err(ConfigError::ReservedKey { key: key.clone() });
            }

            if app_action::matches(&command.cmd) && app_action::parse(&command.cmd).is_none() {
                return Err(ConfigError::UnknownAppAction {
                    key: key.clone(),
                    command: command.cmd.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Deserialize user bindings layered over [`KeyBindings::defaults`]; a user
/// entry for a default key replaces it
pub fn deserialize_over_defaults<'de, D>(deserializer: D) -> Result<KeyBindings, D::Error>
where
    D: Deserializer<'de>,
{
    let user = BTreeMap::<String, KeyCommand>::deserialize(deserializer)?;
    let mut bindings = KeyBindings::defaults();
    bindings.extend(user);
    Ok(bindings)
}

impl Extend<(String, KeyCommand)> for KeyBindings {
    fn extend<T: IntoIterator<Item = (String, KeyCommand)>>(&mut self, iter: T) {
        self.0.extend(iter);
    }
}

impl FromIterator<(String, KeyCommand)> for KeyBindings {
    fn from_iter<T: IntoIterator<Item = (String, KeyCommand)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
