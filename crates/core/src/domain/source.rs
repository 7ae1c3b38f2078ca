use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::ConfigError;

/// Supported hosting providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    GitHub,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::GitHub => "github",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "github" => Ok(ProviderType::GitHub),
            _ => Err(ConfigError::UnsupportedProvider {
                name: s.to_string(),
            }),
        }
    }
}

/// A credential, either written inline or read from an environment variable
/// (`env:NAME`) at the time it is resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Inline(String),
    Env(String),
}

impl Credential {
    const ENV_PREFIX: &'static str = "env:";

    /// Resolve to the secret value. A missing variable resolves to an empty
    /// credential, which providers treat as anonymous access.
    pub fn resolve(&self) -> String {
        match self {
            Credential::Inline(value) => value.clone(),
            Credential::Env(name) => std::env::var(name).unwrap_or_else(|_| {
                warn!(var = %name, "credential environment variable is not set");
                String::new()
            }),
        }
    }
}

impl Default for Credential {
    fn default() -> Self {
        Credential::Inline(String::new())
    }
}

impl FromStr for Credential {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.strip_prefix(Self::ENV_PREFIX) {
            Some(name) => Credential::Env(name.to_string()),
            None => Credential::Inline(s.to_string()),
        })
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Inline(value) => f.write_str(value),
            Credential::Env(name) => write!(f, "{}{}", Self::ENV_PREFIX, name),
        }
    }
}

/// One configured remote account to synchronize repositories from
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "type")]
    #[serde_as(as = "DisplayFromStr")]
    pub provider: ProviderType,
    pub username: String,
    #[serde(rename = "token", default)]
    #[serde_as(as = "DisplayFromStr")]
    pub credential: Credential,
}

impl Source {
    pub fn new(provider: ProviderType, username: impl Into<String>, credential: Credential) -> Self {
        Self {
            provider,
            username: username.into(),
            credential,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingUsername {
                provider: self.provider.to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_from_str() {
        assert_eq!("github".parse::<ProviderType>().unwrap(), ProviderType::GitHub);
        assert_eq!("GitHub".parse::<ProviderType>().unwrap(), ProviderType::GitHub);

        let err = "gitlab".parse::<ProviderType>().unwrap_err();
        assert!(err.to_string().contains("gitlab"), "error should name the type: {err}");
    }

    #[test]
    fn test_credential_parse_and_resolve() {
        let inline: Credential = "token value".parse().unwrap();
        assert_eq!(inline, Credential::Inline("token value".to_string()));
        assert_eq!(inline.resolve(), "token value");

        let env: Credential = "env:REPODECK_TEST_CREDENTIAL_SET".parse().unwrap();
        assert_eq!(env, Credential::Env("REPODECK_TEST_CREDENTIAL_SET".to_string()));
        std::env::set_var("REPODECK_TEST_CREDENTIAL_SET", "secret");
        assert_eq!(env.resolve(), "secret");
        assert_eq!(env.to_string(), "env:REPODECK_TEST_CREDENTIAL_SET");

        let missing: Credential = "env:REPODECK_TEST_CREDENTIAL_UNSET".parse().unwrap();
        assert_eq!(missing.resolve(), "");
    }

    #[test]
    fn test_source_validate() {
        let valid = Source::new(ProviderType::GitHub, "octo", Credential::default());
        assert!(valid.validate().is_ok());

        let no_username = Source::new(ProviderType::GitHub, "  ", Credential::default());
        assert!(no_username.validate().is_err());
    }
}
