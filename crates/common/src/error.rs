use std::path::PathBuf;

use thiserror::Error;

/// Coarse error classification surfaced to operators and used by the apply
/// engine to pick an op status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Io,
    Parse,
    Git,
    Conflict,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Io => "io",
            Self::Parse => "parse",
            Self::Git => "git",
            Self::Conflict => "conflict",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{what} '{name}' not found")]
    NotFound { what: &'static str, name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{}: {source}", path.display())]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("failed to execute `{operation}`: {source}")]
    CommandExecution {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("`{operation}` failed: {stderr}")]
    CommandFailed {
        operation: &'static str,
        stderr: String,
    },

    #[error("ref '{reference}' not found in {url}")]
    RefNotFound { reference: String, url: String },

    #[error("{} already exists", path.display())]
    Conflict { path: PathBuf },
}

impl Error {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    #[must_use]
    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoAt {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn parse(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn command_execution(operation: &'static str, source: std::io::Error) -> Self {
        Self::CommandExecution { operation, source }
    }

    #[must_use]
    pub fn command_failed(operation: &'static str, stderr: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation,
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } | Self::RefNotFound { .. } => ErrorKind::NotFound,
            Self::Io(e) | Self::IoAt { source: e, .. }
                if e.kind() == std::io::ErrorKind::NotFound =>
            {
                ErrorKind::NotFound
            },
            Self::Io(_) | Self::IoAt { .. } => ErrorKind::Io,
            Self::Yaml(_) | Self::Parse { .. } => ErrorKind::Parse,
            Self::CommandExecution { .. } | Self::CommandFailed { .. } => ErrorKind::Git,
            Self::Conflict { .. } => ErrorKind::Conflict,
        }
    }

    /// Returns `true` when the error means "the thing is not there" rather
    /// than "something went wrong while getting it".
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

pub type Result<T> = std::result::Result<T, Error>;
