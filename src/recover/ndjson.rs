use crate::error::EtlError;
use anyhow::{Context, Result};
use serde_json::Value;
use std::io::{BufRead, Write};

/// Write values as newline-delimited JSON, one compact value per line.
/// Returns the number of lines written.
pub fn write_ndjson<W: Write>(mut writer: W, values: &[Value]) -> Result<usize> {
    for value in values {
        serde_json::to_writer(&mut writer, value).context("Failed to serialize value")?;
        writer.write_all(b"\n").context("Failed to write value")?;
    }
    writer.flush().context("Failed to flush writer")?;
    Ok(values.len())
}

/// Read newline-delimited JSON back into memory.
///
/// Blank lines are skipped. The file is produced by the recovery stage, so a
/// line that does not decode means something went badly wrong and is fatal.
pub fn read_ndjson<R: BufRead>(mut reader: R) -> Result<Vec<Value>> {
    let mut values = Vec::new();
    let mut buf = Vec::new();
    let mut line_no = 0usize;

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .context("Failed to read NDJSON line")?;
        if read == 0 {
            break;
        }
        line_no += 1;

        while matches!(buf.last(), Some(b'\n' | b'\r' | b' ' | b'\t')) {
            buf.pop();
        }
        if buf.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        // simd-json parses in place, which is why the buffer is mutable
        let value: Value = simd_json::serde::from_slice(&mut buf).map_err(|e| EtlError::NdjsonLine {
            line: line_no,
            message: e.to_string(),
        })?;
        values.push(value);
    }

    Ok(values)
}
