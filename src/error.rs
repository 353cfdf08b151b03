use std::error::Error;
use std::fmt;

/// Crate-wide error type. `Contract` marks programming-contract violations
/// (caller bugs, not recoverable runtime conditions).
#[derive(Debug)]
pub enum LocusViewError {
    String(String),
    Contract(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl LocusViewError {
    pub fn contract(msg: impl Into<String>) -> Self {
        LocusViewError::Contract(msg.into())
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, LocusViewError::Contract(_))
    }
}

impl Error for LocusViewError {}

impl fmt::Display for LocusViewError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LocusViewError::String(s) => write!(f, "{s}"),
            LocusViewError::Contract(s) => write!(f, "contract violation: {s}"),
            LocusViewError::Io(e) => write!(f, "{e}"),
            LocusViewError::Serde(e) => write!(f, "{e}"),
        }
    }
}

impl From<String> for LocusViewError {
    fn from(err: String) -> Self {
        LocusViewError::String(err)
    }
}

impl From<&str> for LocusViewError {
    fn from(err: &str) -> Self {
        LocusViewError::String(err.to_string())
    }
}

impl From<std::io::Error> for LocusViewError {
    fn from(err: std::io::Error) -> Self {
        LocusViewError::Io(err)
    }
}

impl From<serde_json::Error> for LocusViewError {
    fn from(err: serde_json::Error) -> Self {
        LocusViewError::Serde(err)
    }
}

pub type Result<T> = std::result::Result<T, LocusViewError>;
