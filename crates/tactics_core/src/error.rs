//! Error types for the tactical core.

use thiserror::Error;

use crate::terrain::GridCoord;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the tactical core.
///
/// The per-tick operations (path requests, sight queries, projectile
/// updates) degrade to defined fallbacks instead of returning errors.
/// The only runtime error they surface is an unreachable path goal.
#[derive(Debug, Error)]
pub enum GameError {
    /// The open set was exhausted before the goal tile was reached.
    #[error("No path from {start} to {end}")]
    PathNotFound {
        /// Requested start tile.
        start: GridCoord,
        /// Requested goal tile.
        end: GridCoord,
    },

    /// Terrain tile data does not match the declared dimensions.
    #[error("Terrain size mismatch: expected {expected} tiles, got {actual}")]
    TerrainSizeMismatch {
        /// Tiles implied by width x height.
        expected: usize,
        /// Tiles actually supplied.
        actual: usize,
    },

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Failed to read a data file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
