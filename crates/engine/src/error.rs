//! Engine error types.
//!
//! These are the structural failures: a malformed name, a malformed formula,
//! or an edit that would create a circular reference. Evaluation failures
//! are not errors — they come back as [`crate::cell::Value::Error`] values
//! so one broken cell never aborts reads of the others.

use thiserror::Error;

use crate::formula::FormatError;
use crate::recalc::CycleError;

/// Failures raised by spreadsheet operations. Every variant leaves the
/// spreadsheet exactly as it was before the offending call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The cell name does not match the lexical rule after normalization,
    /// or the caller's validator rejected it.
    #[error("invalid cell name `{0}`")]
    InvalidName(String),

    /// The contents began with `=` but the rest is not a valid formula.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Applying the edit would create a circular reference.
    #[error(transparent)]
    Circular(#[from] CycleError),
}
