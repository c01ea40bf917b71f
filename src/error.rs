//! Error types for shaping and configuration

use thiserror::Error;

/// Errors raised while reshaping a frame for load
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("column '{0}' not found in frame")]
    MissingColumn(String),

    /// A rename would leave two columns with the same name
    #[error("duplicate column '{0}' after rename")]
    DuplicateColumn(String),

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid game date '{0}'")]
    InvalidDate(String),
}

/// Errors raised while reading configuration from the environment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{0} not set")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
