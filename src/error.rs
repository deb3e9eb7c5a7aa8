//! Error types for the credit engine
//!
//! Condition-level data problems (missing variables, uncomparable values) are
//! never surfaced as errors; they simply do not match. The variants below
//! cover lookups and plumbing failures.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Credit engine error types
#[derive(Error, Debug)]
pub enum Error {
    /// Battery id is not registered in the catalog
    #[error("Unknown battery: {0}\nThe battery may have been deleted; stale results referencing it are skipped")]
    UnknownBattery(u64),

    /// Result id is not registered
    #[error("Unknown result: {0}")]
    UnknownResult(u64),

    /// Operator symbol is not one of the six supported comparisons
    #[error("Invalid operator: {0}\nExpected one of EQUALS, LESSTHAN, GREATERTHAN, GREATERTHANEQUALTO, LESSTHANEQUALTO, NOTEQUALTO")]
    InvalidOperator(String),

    /// Experiment variable definition could not be parsed
    #[error("Invalid experiment variable: {0}")]
    InvalidVariable(String),

    /// Experiment template definition could not be parsed
    #[error("Invalid experiment template: {0}")]
    InvalidTemplate(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Job queue closed (runner dropped)
    #[error("Job queue closed (runner dropped)")]
    QueueClosed,

    /// Labor marketplace collaborator failed
    #[error("Labor market error: {0}")]
    LaborMarket(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
