//! Core error classification (§7 of SPEC_FULL.md). Arithmetic degeneracies
//! and invariant violations are handled locally (or via `debug_assert!`) and
//! never reach this type; this enum only carries the errors a caller must
//! react to.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("resource allocation failed: {0}")]
    Resource(String),

    #[error("no exit is accessible in this simulation set")]
    NoAccessibleExit,
}

pub type SimResult<T> = Result<T, SimulationError>;
