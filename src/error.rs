use std::fmt;

/// The error type shared by every backend and pipeline stage.
///
/// Variants mirror the error kinds laid out in the system design: a bad
/// user input (`Parse`), an unknown target/cue/chase (`NotFound`), a
/// malformed wire packet (`Protocol`), a request that never got an ack or
/// reply in time (`Timeout`), conflicting writes in a single batch
/// (`Conflict`), an I/O failure talking to a vendor (`Transport`), or a bad
/// config file (`Config`).
#[derive(Debug, thiserror::Error)]
pub enum DiscoError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Timeout(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Transport(String),

    #[error("{0}")]
    Config(String),

    /// The union of several errors, accumulated while processing a batch
    /// that must not stop at the first failure.
    #[error("{}", join_display(.0))]
    Many(Vec<DiscoError>),
}

fn join_display(errs: &[DiscoError]) -> String {
    errs.iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DiscoError {
    /// Folds an optional accumulator and a new error into one, the Rust
    /// equivalent of Go's `errors.Join(errs, err)`.
    pub fn join(acc: Option<DiscoError>, new: DiscoError) -> DiscoError {
        match acc {
            None => new,
            Some(DiscoError::Many(mut v)) => {
                v.push(new);
                DiscoError::Many(v)
            }
            Some(e) => DiscoError::Many(vec![e, new]),
        }
    }

    /// Folds an optional accumulator with an optional new error, only
    /// producing `Some` when there is something to report.
    pub fn join_opt(acc: Option<DiscoError>, new: Option<DiscoError>) -> Option<DiscoError> {
        match (acc, new) {
            (None, None) => None,
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (Some(a), Some(b)) => Some(DiscoError::join(Some(a), b)),
        }
    }
}

impl From<std::num::ParseFloatError> for DiscoError {
    fn from(e: std::num::ParseFloatError) -> Self {
        DiscoError::Parse(e.to_string())
    }
}

impl From<std::num::ParseIntError> for DiscoError {
    fn from(e: std::num::ParseIntError) -> Self {
        DiscoError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for DiscoError {
    fn from(e: std::io::Error) -> Self {
        DiscoError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for DiscoError {
    fn from(e: serde_json::Error) -> Self {
        DiscoError::Config(e.to_string())
    }
}

impl From<serde_yaml::Error> for DiscoError {
    fn from(e: serde_yaml::Error) -> Self {
        DiscoError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for DiscoError {
    fn from(e: reqwest::Error) -> Self {
        DiscoError::Transport(e.to_string())
    }
}

/// Helper for formatting a duration-like error context, used across the
/// provider adaptors: `hue: target: message`.
pub fn tagged(provider: &str, target: &str, e: impl fmt::Display) -> DiscoError {
    DiscoError::Transport(format!("{provider}: {target}: {e}"))
}
