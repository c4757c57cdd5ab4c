//! kiln-etl: recover, flatten and load a property export into SQLite
//!
//! Usage:
//!   # Default layout: ./data/fake_property_data_new.json -> ./data/home.db
//!   kiln-etl
//!
//!   # Explicit paths, keep the flattened tables around
//!   kiln-etl --input dump.json --database out.db --dump-dir ./tables
//!
//!   # Only recover and flatten, print a JSON report
//!   kiln-etl --skip-load --json
//!
//! Logging goes to stderr and honours RUST_LOG (default: info).

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::Result;
use clap::Parser;
use kiln::pipeline::{run, PipelineConfig, PipelineReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kiln-etl")]
#[command(about = "Load a corrupted property export into SQLite", long_about = None)]
struct Args {
    /// Raw JSON export (default: ./data/fake_property_data_new.json)
    #[arg(long, short = 'i', env = "KILN_INPUT")]
    input: Option<PathBuf>,

    /// Intermediate NDJSON file (default: ./data/clean_data_new.ndjson)
    #[arg(long, env = "KILN_NDJSON")]
    ndjson: Option<PathBuf>,

    /// SQL script creating the tables (default: built-in schema)
    #[arg(long, env = "KILN_SCHEMA")]
    schema: Option<PathBuf>,

    /// SQLite database file (default: ./data/home.db)
    #[arg(long, short = 'd', env = "KILN_DATABASE")]
    database: Option<PathBuf>,

    /// Also write each flattened table as <table>.jsonl in this directory
    #[arg(long, env = "KILN_DUMP_DIR")]
    dump_dir: Option<PathBuf>,

    /// Stop after flattening
    #[arg(long)]
    skip_load: bool,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Build config
    let mut config = PipelineConfig::default();
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(ndjson) = args.ndjson {
        config.ndjson = ndjson;
    }
    if let Some(database) = args.database {
        config.database = database;
    }
    config.schema_script = args.schema;
    config.dump_dir = args.dump_dir;
    config.skip_load = args.skip_load;

    let report = run(&config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn print_summary(report: &PipelineReport) {
    println!("Recovered objects: {} ({} discarded)", report.scan.recovered, report.scan.discarded);
    if report.duplicate_keys > 0 {
        println!("Duplicate titles:  {}", report.duplicate_keys);
    }

    println!();
    println!("{:<12} {:>10} {:>10} {:>10}", "table", "rows", "loaded", "orphans");
    for (table, rows) in &report.tables {
        let load = report.load.as_ref().and_then(|l| l.get(table));
        match load {
            Some(l) if l.skipped => println!("{:<12} {:>10} {:>10} {:>10}", table, rows, "skipped", l.orphans),
            Some(l) => println!("{:<12} {:>10} {:>10} {:>10}", table, rows, l.loaded, l.orphans),
            None => println!("{:<12} {:>10} {:>10} {:>10}", table, rows, "-", "-"),
        }
    }

    println!();
    println!("Finished in {} ms", report.elapsed_ms);
}
