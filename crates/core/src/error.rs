use thiserror::Error;

/// Configuration errors, surfaced at load time before any core operation runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unsupported provider type: {name}")]
    UnsupportedProvider { name: String },

    #[error("source username is required for {provider} source")]
    MissingUsername { provider: String },

    #[error("concurrency must be greater than 0")]
    InvalidConcurrency,

    #[error("key '{key}' is reserved")]
    ReservedKey { key: String },

    #[error("invalid command for key {key}: unknown built-in action '{command}'")]
    UnknownAppAction { key: String, command: String },

    #[error("default clone directory is required")]
    MissingDefaultCloneDir,

    #[error("match is required for clone directory matcher {index}")]
    MissingMatch { index: usize },

    #[error("directory is required for clone directory matcher {index}")]
    MissingMatchDirectory { index: usize },

    #[error("invalid match pattern for clone directory matcher {index}: {source}")]
    InvalidGlob {
        index: usize,
        source: glob::PatternError,
    },

    #[error("invalid clone directory template '{template}': {source}")]
    InvalidDirTemplate {
        template: String,
        source: crate::commander::RenderError,
    },
}

/// Repository store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("store error: {source}")]
    Backend { source: anyhow::Error },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}
