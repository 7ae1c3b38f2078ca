//! Built-in application actions embedded in command strings.
//!
//! A command beginning with [`SENTINEL`] names a built-in instead of a shell
//! command, e.g. `:exit {{ CloneDir }}`.

use std::fmt;

pub const SENTINEL: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    /// Fork the selected repository (not yet available)
    Fork,
    /// Leave the application, printing the argument text
    Exit,
}

impl AppAction {
    pub const ALL: [AppAction; 2] = [AppAction::Fork, AppAction::Exit];

    pub fn name(self) -> &'static str {
        match self {
            AppAction::Fork => "fork",
            AppAction::Exit => "exit",
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        let name = token.strip_prefix(SENTINEL)?;
        Self::ALL
            .into_iter()
            .find(|action| action.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AppAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", SENTINEL, self.name())
    }
}

/// True when `s` uses the built-in syntax, known action or not
pub fn matches(s: &str) -> bool {
    s.starts_with(SENTINEL)
}

/// Split a built-in command into its action and trailing argument text.
///
/// The first whitespace-delimited token must be a known action; the rest is
/// returned with the separating whitespace removed.
pub fn parse(s: &str) -> Option<(AppAction, &str)> {
    if !matches(s) {
        return None;
    }

    let (token, rest) = match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    };

    AppAction::from_token(token).map(|action| (action, rest))
}
