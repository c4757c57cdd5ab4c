//! # Kiln - property export ETL
//!
//! Recovers valid JSON objects from a corrupted property export, flattens
//! them into a relational layout and loads that into SQLite.
//!
//! ## Modules
//!
//! - **recover**: brace-counting object recovery and NDJSON I/O
//! - **melt**: flatten raw records into `properties` and its child tables
//! - **load**: SQLite store, schema script and two-phase key resolution
//! - **pipeline**: the end-to-end batch run
//!
//! ## Quick Start
//!
//! ```rust
//! use kiln::melt::flatten;
//! use kiln::recover::recover_objects;
//!
//! # fn main() -> anyhow::Result<()> {
//! let raw = r#"[
//!   {"Property_Title": "12 Oak Street", "Valuation": [{"ARV": "310000"}]},
//!   {"Property_Title": "broken", "Bed": },
//! "#;
//!
//! let (records, stats) = recover_objects(raw.as_bytes())?;
//! assert_eq!(stats.recovered, 1);
//!
//! let tables = flatten(&records);
//! assert_eq!(tables.properties.len(), 1);
//! assert_eq!(tables.valuation.rows[0]["arv"], 310000);
//! # Ok(())
//! # }
//! ```

use anyhow::Result;
use std::io::{BufRead, Write};

pub mod error;
pub mod load;
pub mod melt;
pub mod pipeline;
pub mod recover;

// Re-export commonly used types for convenience
pub use error::EtlError;
pub use load::{load_flattened, LoadReport, SqliteStore};
pub use melt::{flatten, Flattened, Table};
pub use pipeline::{run, PipelineConfig, PipelineReport};
pub use recover::{extract_valid_objects, recover_objects, ScanStats};

/// Stream recovered objects from `reader` to `writer` as NDJSON
pub fn recover_json<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<ScanStats> {
    let mut objects = recover::RecoveredObjects::new(reader);
    for object in objects.by_ref() {
        let object = object?;
        serde_json::to_writer(&mut writer, &object)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(objects.stats())
}
