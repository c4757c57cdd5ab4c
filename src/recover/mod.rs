//! Object recovery - pull valid JSON objects out of a corrupted dump
//!
//! The raw export is nominally a JSON array of objects, but it can be
//! truncated or carry broken objects in the middle. The scanner finds object
//! boundaries by counting braces line by line and tries to decode each
//! candidate on its own, so one bad object never costs the others.
//!
//! Recovered objects are written as newline-delimited JSON, which is what the
//! flattening stage reads back.

pub mod ndjson;
pub mod scanner;

pub use ndjson::{read_ndjson, write_ndjson};
pub use scanner::{recover_objects, ObjectScanner, RecoveredObjects, ScanStats};

use crate::error::EtlError;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Scan `input_path`, write every recovered object to `output_path` as
/// NDJSON and return the scan statistics.
///
/// Failing to open the input is fatal. Objects that fail to decode are
/// skipped and only show up in [`ScanStats::discarded`].
pub fn extract_valid_objects(input_path: &Path, output_path: &Path) -> Result<ScanStats> {
    info!(input = %input_path.display(), "extracting valid JSON objects");

    let file = File::open(input_path).map_err(|source| EtlError::InputOpen {
        path: input_path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }

    let (objects, stats) = recover_objects(BufReader::new(file))?;

    let out = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    write_ndjson(BufWriter::new(out), &objects)?;

    info!(
        recovered = stats.recovered,
        discarded = stats.discarded,
        lines = stats.lines,
        output = %output_path.display(),
        "extraction complete"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::io::Write as _;

    #[test]
    fn test_extract_writes_one_object_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.json");
        let output = dir.path().join("out").join("clean.ndjson");

        let mut f = File::create(&input).unwrap();
        writeln!(f, "[").unwrap();
        writeln!(f, "  {{").unwrap();
        writeln!(f, "    \"Property_Title\": \"A\",").unwrap();
        writeln!(f, "    \"Valuation\": [{{\"ARV\": 1}}]").unwrap();
        writeln!(f, "  }},").unwrap();
        writeln!(f, "  {{").unwrap();
        writeln!(f, "    \"Property_Title\": \"B\" \"oops\"").unwrap();
        writeln!(f, "  }},").unwrap();
        writeln!(f, "  {{\"Property_Title\": \"C\"}}").unwrap();
        writeln!(f, "]").unwrap();
        drop(f);

        let stats = extract_valid_objects(&input, &output).unwrap();
        assert_eq!(stats.recovered, 2);
        assert_eq!(stats.discarded, 3);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                json!({"Property_Title": "A", "Valuation": [{"ARV": 1}]}),
                json!({"Property_Title": "C"}),
            ]
        );
    }

    #[test]
    fn test_missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = extract_valid_objects(
            &dir.path().join("does-not-exist.json"),
            &dir.path().join("out.ndjson"),
        )
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::InputOpen { .. })
        ));
    }

    #[test]
    fn test_empty_input_writes_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("empty.json");
        let output = dir.path().join("empty.ndjson");
        File::create(&input).unwrap();

        let stats = extract_valid_objects(&input, &output).unwrap();
        assert_eq!(stats.recovered, 0);
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    }
}
