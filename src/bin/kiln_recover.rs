//! kiln-recover: pull the valid JSON objects out of a corrupted dump
//!
//! Usage:
//!   # Read from file, NDJSON to stdout
//!   kiln-recover dump.json
//!
//!   # Read from stdin, write to a file
//!   cat dump.json | kiln-recover --output clean.ndjson

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use clap::Parser;
use kiln::error::EtlError;
use kiln::recover_json;
use std::fs::File;
use std::io::{stdin, stdout, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kiln-recover")]
#[command(about = "Recover valid JSON objects from a corrupted dump as NDJSON", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (use stdout if omitted)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            let file = File::open(path).map_err(|source| EtlError::InputOpen {
                path: path.clone(),
                source,
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(stdin())),
    };

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(stdout().lock())),
    };

    let stats = recover_json(reader, writer)?;
    info!(
        recovered = stats.recovered,
        discarded = stats.discarded,
        lines = stats.lines,
        "done"
    );

    Ok(())
}
