//! Typed failures for the plumbing around the engine.
//!
//! The engine itself has no error type: nothing inside a reconciliation run
//! is allowed to fail.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} appears to be a placeholder value; replace with your real key")]
    Placeholder(&'static str),

    #[error("missing secret {name}: set {env} or mount {path}")]
    MissingSecret {
        name: &'static str,
        env: &'static str,
        path: &'static str,
    },
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unparseable response body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("malformed record {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write snapshot to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
