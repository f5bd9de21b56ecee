use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors from the reasoning service. All of them end in the keyword fallback.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("no credential configured")]
    Disabled,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    #[error("empty response")]
    EmptyResponse,

    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("plan rejected by validator")]
    InvalidPlan,
}

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("missing parameter for {0}")]
    MissingParameter(&'static str),

    #[error("command '{0}' is not allowed")]
    NotAllowed(String),

    #[error("unsupported url: {0}")]
    BadUrl(String),

    #[error("path does not exist: {0}")]
    NoSuchPath(PathBuf),

    #[error("'{0}' timed out after {1} seconds")]
    Timeout(String, u64),

    #[error("failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("ledger io error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ledger json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LedgerError::Io {
            path: path.into(),
            source,
        }
    }
}
