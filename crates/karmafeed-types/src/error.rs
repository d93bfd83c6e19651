use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid {kind} id: {input}")]
    InvalidId { kind: &'static str, input: String },

    #[error("unknown karma source: {0}")]
    UnknownKarmaSource(String),
}
