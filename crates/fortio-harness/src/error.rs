//! Harness failures that are not conformance results.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: Box<HarnessError>,
    },
    #[error("case `{case}`: unknown operation `{operation}`")]
    UnknownOperation { case: String, operation: String },
    #[error("case `{case}`: {reason}")]
    BadInput { case: String, reason: String },
}
