//! Error types for the move solver

use thiserror::Error;

use crate::TileId;

/// Errors returned to callers of the solver and its text/JSON surfaces.
///
/// Search outcomes (infeasible model, timeout) are not errors: they resolve
/// to the unchanged table and are reported through
/// [`SolveStatus`](crate::solver::SolveStatus).
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("table meld {index} is malformed: {meld}")]
    InvalidMeld { index: usize, meld: String },

    #[error("tile {0} appears more than once across table and rack")]
    DuplicateTile(TileId),

    #[error("invalid tile '{input}': {reason}")]
    ParseTile { input: String, reason: String },

    #[error("invalid meld '{input}': {reason}")]
    ParseMeld { input: String, reason: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
