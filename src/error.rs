//! Fatal error types
//!
//! Failures scoped to a single object, field or row never show up here; they
//! are handled where they occur. These are the ones that abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// The raw input file could not be opened
    #[error("cannot open input file {}", .path.display())]
    InputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The SQLite database could not be opened or configured
    #[error("cannot open store at {location}")]
    StoreOpen {
        location: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement of the schema script failed
    #[error("schema statement #{index} failed: {statement}")]
    SchemaStatement {
        index: usize,
        statement: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A line of the intermediate NDJSON file did not decode
    #[error("malformed NDJSON at line {line}: {message}")]
    NdjsonLine { line: usize, message: String },
}
