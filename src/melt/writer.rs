use crate::melt::types::Table;
use anyhow::{Context, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes flattened tables to JSON Lines files, one file per table
pub struct EntityWriter {
    dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl EntityWriter {
    /// Create a writer that puts `<table>.jsonl` files in `output_dir`
    pub fn new_file_writer<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        Ok(EntityWriter {
            dir: output_dir.as_ref().to_path_buf(),
            writers: HashMap::new(),
        })
    }

    /// Append every row of `table` to its file. Returns the rows written.
    pub fn write_table(&mut self, table: &Table) -> Result<usize> {
        let writer = match self.writers.entry(table.name.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.dir.join(format!("{}.jsonl", table.name));
                let file = File::create(&path)
                    .with_context(|| format!("Failed to open file: {}", path.display()))?;
                entry.insert(BufWriter::new(file))
            }
        };
        write_rows(writer, table)
    }

    /// Flush all writers
    pub fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}

/// Write the rows of a table as JSON Lines to any writer
pub fn write_rows<W: Write>(writer: &mut W, table: &Table) -> Result<usize> {
    for row in &table.rows {
        let json = serde_json::to_string(row).context("Failed to serialize row")?;
        writeln!(writer, "{}", json).context("Failed to write row")?;
    }
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> Table {
        let mut table = Table::new("hoa");
        table.push(serde_json::from_value(json!({"external_id": "A", "hoa_amount": 95})).unwrap());
        table.push(serde_json::from_value(json!({"external_id": "B", "hoa_flag": "No"})).unwrap());
        table
    }

    #[test]
    fn test_write_rows() {
        let mut buffer = Vec::new();
        let n = write_rows(&mut buffer, &table()).unwrap();

        assert_eq!(n, 2);
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "{\"external_id\":\"A\",\"hoa_amount\":95}\n{\"external_id\":\"B\",\"hoa_flag\":\"No\"}\n"
        );
    }

    #[test]
    fn test_file_writer_creates_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = EntityWriter::new_file_writer(dir.path().join("tables")).unwrap();

        writer.write_table(&table()).unwrap();
        writer.write_table(&Table::new("taxes")).unwrap();
        writer.flush().unwrap();

        let hoa = std::fs::read_to_string(dir.path().join("tables/hoa.jsonl")).unwrap();
        assert_eq!(hoa.lines().count(), 2);
        let taxes = std::fs::read_to_string(dir.path().join("tables/taxes.jsonl")).unwrap();
        assert!(taxes.is_empty());
    }

    #[test]
    fn test_repeated_table_appends_to_the_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = EntityWriter::new_file_writer(dir.path()).unwrap();

        writer.write_table(&table()).unwrap();
        writer.write_table(&table()).unwrap();
        writer.flush().unwrap();

        let hoa = std::fs::read_to_string(dir.path().join("hoa.jsonl")).unwrap();
        assert_eq!(hoa.lines().count(), 4);
    }
}
