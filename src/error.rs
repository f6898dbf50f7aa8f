//! Rich diagnostic error types for the phronesis decision core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Collaborator failures (oracles, storage)
//! are modeled as explicit error values and recovered locally at every call
//! site where a cycle must keep running.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the decision core.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text, sources) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

/// Errors from the reasoning and embedding collaborators.
///
/// These never abort a cognitive cycle: every call site recovers by
/// defaulting (select "respond", merge ADD, quality 0.0).
#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("oracle is not available at {url}")]
    #[diagnostic(
        code(phronesis::oracle::unavailable),
        help("Check that the model server is running and reachable.")
    )]
    Unavailable { url: String },

    #[error("oracle request failed: {message}")]
    #[diagnostic(
        code(phronesis::oracle::request_failed),
        help("Check network connectivity and that the configured model is pulled.")
    )]
    Request { message: String },

    #[error("malformed oracle response: {message}")]
    #[diagnostic(
        code(phronesis::oracle::malformed),
        help("The model returned a response that does not match the expected contract.")
    )]
    Malformed { message: String },
}

// ---------------------------------------------------------------------------
// Action errors
// ---------------------------------------------------------------------------

/// Errors raised inside capability handlers.
///
/// The executor converts these into non-fatal `{error}` results; they are
/// recorded in the cycle context and the cycle continues.
#[derive(Debug, Error, Diagnostic)]
pub enum ActionError {
    #[error("action not found: \"{name}\"")]
    #[diagnostic(
        code(phronesis::action::not_found),
        help("Register the capability first or check the catalog with `registry.catalog()`.")
    )]
    NotFound { name: String },

    #[error("action \"{action}\" failed: {message}")]
    #[diagnostic(
        code(phronesis::action::failed),
        help("The handler reported an error. The cycle continues; the next selection round sees the failure.")
    )]
    Failed { action: String, message: String },

    #[error("action \"{action}\" requires context key \"{key}\"")]
    #[diagnostic(
        code(phronesis::action::missing_context),
        help("A required context key was neither provided as input nor produced by an earlier action.")
    )]
    MissingContext { action: String, key: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),
}

/// Convenience alias for capability handlers.
pub type ActionResult<T> = std::result::Result<T, ActionError>;

// ---------------------------------------------------------------------------
// Document errors
// ---------------------------------------------------------------------------

/// Errors from loading or saving the persisted user document.
///
/// A failed load or save never corrupts in-memory state: the store only
/// mutates after a successful decode.
#[derive(Debug, Error, Diagnostic)]
pub enum DocumentError {
    #[error("failed to read user document at \"{path}\"")]
    #[diagnostic(
        code(phronesis::document::read),
        help("Check that the path exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write user document at \"{path}\"")]
    #[diagnostic(
        code(phronesis::document::write),
        help("Check that the directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse user document at \"{path}\": {message}")]
    #[diagnostic(
        code(phronesis::document::parse),
        help(
            "The document is not valid JSON for the expected schema. \
             Records written before utility tracking load with defaulted fields."
        )
    )]
    Parse { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors from loading or saving the TOML configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config at \"{path}\"")]
    #[diagnostic(
        code(phronesis::config::read),
        help("Check that the path exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config at \"{path}\"")]
    #[diagnostic(
        code(phronesis::config::write),
        help("Check that the directory exists and is writable.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(phronesis::config::parse),
        help("The file is not valid TOML for the expected schema. All sections are optional.")
    )]
    Parse { message: String },
}
