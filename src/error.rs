//! Crate error type
//!
//! Only container-level failures surface as errors: a transaction envelope
//! that cannot be interpreted at all. Per-instruction problems (unrecognized
//! shape, short payload, failed sanity check) are silent skips, never errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("transaction envelope carries no message")]
    MissingMessage,

    #[error("malformed transaction input: {0}")]
    MalformedInput(#[from] serde_json::Error),
}
