//! The batch run: extract -> flatten -> load
//!
//! Stages run strictly one after another. The NDJSON file is fully written
//! and flushed before it is read back, and the store is opened only once the
//! tables are built. The store handle lives for the load stage only.

use crate::load::{load_flattened, LoadReport, SqliteStore, DEFAULT_SCHEMA};
use crate::melt::{duplicate_keys, flatten, EntityWriter};
use crate::recover::{extract_valid_objects, read_ndjson, ScanStats};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// How many duplicate keys are listed in the log
const DUPLICATE_SAMPLE: usize = 10;

/// Paths and switches for one run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Raw, possibly corrupted JSON export
    pub input: PathBuf,

    /// Where the recovered NDJSON is written and read back from
    pub ndjson: PathBuf,

    /// DDL script; the built-in schema is used when unset
    pub schema_script: Option<PathBuf>,

    /// SQLite database file
    pub database: PathBuf,

    /// Also write every flattened table as `<table>.jsonl` here
    pub dump_dir: Option<PathBuf>,

    /// Stop after flattening
    pub skip_load: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            input: PathBuf::from("./data/fake_property_data_new.json"),
            ndjson: PathBuf::from("./data/clean_data_new.ndjson"),
            schema_script: None,
            database: PathBuf::from("./data/home.db"),
            dump_dir: None,
            skip_load: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub scan: ScanStats,
    /// Natural keys seen on more than one record before deduplication
    pub duplicate_keys: usize,
    /// Rows per flattened table, parent first
    pub tables: Vec<(String, usize)>,
    /// Absent when loading was skipped
    pub load: Option<LoadReport>,
    pub elapsed_ms: u64,
}

/// Run the whole pipeline once
pub fn run(config: &PipelineConfig) -> Result<PipelineReport> {
    let timer = Instant::now();
    info!("ETL pipeline started");

    // Extract
    let scan = extract_valid_objects(&config.input, &config.ndjson)?;

    let file = File::open(&config.ndjson)
        .with_context(|| format!("Failed to open {}", config.ndjson.display()))?;
    let records = read_ndjson(BufReader::new(file))?;
    info!(records = records.len(), "extract completed");

    // Transform
    let duplicates = duplicate_keys(&records);
    if !duplicates.is_empty() {
        let sample: Vec<&str> = duplicates
            .iter()
            .take(DUPLICATE_SAMPLE)
            .map(|(key, _)| key.as_str())
            .collect();
        warn!(count = duplicates.len(), sample = ?sample, "duplicate external_id values, keeping first");
    }

    let flattened = flatten(&records);
    let tables = flattened.row_counts();
    for (table, rows) in &tables {
        info!(table = %table, rows, "transformed");
    }

    if let Some(dir) = &config.dump_dir {
        let mut writer = EntityWriter::new_file_writer(dir)?;
        writer.write_table(&flattened.properties)?;
        for child in flattened.children() {
            writer.write_table(child)?;
        }
        writer.flush()?;
        info!(dir = %dir.display(), "flattened tables written");
    }

    // Load
    let load = if config.skip_load {
        info!("load skipped");
        None
    } else {
        let mut store = SqliteStore::open(&config.database)?;
        match &config.schema_script {
            Some(path) => store.run_sql_script(path)?,
            None => store.run_sql(DEFAULT_SCHEMA)?,
        };
        let report = load_flattened(&mut store, flattened)?;
        info!(database = %config.database.display(), "all data loaded");
        Some(report)
    };

    Ok(PipelineReport {
        scan,
        duplicate_keys: duplicates.len(),
        tables,
        load,
        elapsed_ms: timer.elapsed().as_millis() as u64,
    })
}
