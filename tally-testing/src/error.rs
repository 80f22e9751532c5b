//! Harness error types

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// Conditions that stop a run before any test executes
///
/// Everything that goes wrong at module or test level becomes an
/// [`Outcome`](crate::Outcome) instead.
#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("test root '{}' does not exist", path.display())]
    RootNotFound { path: PathBuf },

    #[error("test root '{}' is not a directory", path.display())]
    RootNotDirectory { path: PathBuf },

    #[error("test root '{}' is not readable: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}
