use crate::error::EtlError;
use crate::load::script::split_statements;
use crate::melt::types::Table;
use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Owned handle on the SQLite database. The connection is closed when the
/// store is dropped.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {}", parent.display()))?;
            }
        }

        let location = path.display().to_string();
        let conn = Connection::open(path).map_err(|source| EtlError::StoreOpen {
            location: location.clone(),
            source,
        })?;
        Self::configure(conn, location)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| EtlError::StoreOpen {
            location: ":memory:".to_string(),
            source,
        })?;
        Self::configure(conn, ":memory:".to_string())
    }

    fn configure(conn: Connection, location: String) -> Result<Self> {
        // Reading the header surfaces unreadable or non-database files here
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .and_then(|_| conn.query_row("PRAGMA schema_version", [], |row| row.get::<_, i64>(0)))
            .map_err(|source| EtlError::StoreOpen { location, source })?;
        Ok(SqliteStore { conn })
    }

    /// Run a DDL script file, see [`SqliteStore::run_sql`]
    pub fn run_sql_script(&self, path: &Path) -> Result<usize> {
        let sql = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read SQL script {}", path.display()))?;
        self.run_sql(&sql)
    }

    /// Execute each `;`-separated, non-blank statement in order, each on its
    /// own. The first failure aborts. Returns the number of statements run.
    pub fn run_sql(&self, sql: &str) -> Result<usize> {
        let statements = split_statements(sql);
        for (index, statement) in statements.iter().enumerate() {
            self.conn
                .execute_batch(statement)
                .map_err(|source| EtlError::SchemaStatement {
                    index: index + 1,
                    statement: statement.to_string(),
                    source,
                })?;
        }
        info!(statements = statements.len(), "SQL script executed");
        Ok(statements.len())
    }

    /// Columns of a table as the database knows them
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
            .with_context(|| format!("Failed to inspect table {table}"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    /// Append all rows of `table` to the table of the same name, in one
    /// transaction. Columns the destination does not have are left out.
    /// Returns the number of rows inserted.
    pub fn append(&mut self, table: &Table) -> Result<usize> {
        if table.is_empty() {
            return Ok(0);
        }

        let known = self.table_columns(&table.name)?;
        if known.is_empty() {
            anyhow::bail!("table {} does not exist", table.name);
        }

        let (columns, unknown): (Vec<&String>, Vec<&String>) =
            table.columns.iter().partition(|c| known.contains(*c));
        if !unknown.is_empty() {
            warn!(table = %table.name, columns = ?unknown, "dropping columns missing from the table");
        }
        if columns.is_empty() {
            anyhow::bail!("no column of {} matches the table schema", table.name);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(&table.name),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            (1..=columns.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", "),
        );
        debug!(%sql, "prepared insert");

        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;
        {
            let mut stmt = tx.prepare(&sql).context("Failed to prepare insert")?;
            for row in &table.rows {
                let values = columns
                    .iter()
                    .map(|c| to_sql_value(row.get(c.as_str()).unwrap_or(&Value::Null)));
                stmt.execute(params_from_iter(values))
                    .with_context(|| format!("Failed to insert into {}", table.name))?;
            }
        }
        tx.commit().context("Failed to commit insert")?;

        Ok(table.len())
    }

    /// Natural key to surrogate key, read back from `properties`
    pub fn external_id_map(&self) -> Result<HashMap<String, i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT property_id, external_id FROM properties")
            .context("Failed to query property keys")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(0)?)))?;

        let mut mapping = HashMap::new();
        for row in rows {
            let (external_id, property_id) = row?;
            mapping.insert(external_id, property_id);
        }
        Ok(mapping)
    }

    /// Run a read query and return every row as JSON values
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Vec<Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let width = stmt.column_count();
        let mut rows = stmt.query([])?;

        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sql_value(row.get::<_, SqlValue>(i)?));
            }
            out.push(values);
        }
        Ok(out)
    }

    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |row| row.get(0))
            .with_context(|| format!("Failed to count rows of {table}"))?;
        Ok(n as usize)
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => n.as_f64().map(SqlValue::Real).unwrap_or(SqlValue::Null),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        // Nested structures are kept as their JSON text
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(i) => Value::from(i),
        SqlValue::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::from(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .run_sql("CREATE TABLE items (item_id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, price REAL, meta TEXT)")
            .unwrap();
        store
    }

    fn table(rows: Vec<Value>) -> Table {
        let mut table = Table::new("items");
        for row in rows {
            table.push(serde_json::from_value(row).unwrap());
        }
        table
    }

    #[test]
    fn test_append_and_query_back() {
        let mut store = store();
        let inserted = store
            .append(&table(vec![
                json!({"name": "a", "price": 1.5, "meta": {"k": 1}}),
                json!({"name": "b", "price": null}),
            ]))
            .unwrap();

        assert_eq!(inserted, 2);
        let rows = store.query_rows("SELECT name, price, meta FROM items ORDER BY item_id").unwrap();
        assert_eq!(
            rows,
            vec![
                vec![json!("a"), json!(1.5), json!("{\"k\":1}")],
                vec![json!("b"), Value::Null, Value::Null],
            ]
        );
    }

    #[test]
    fn test_unknown_columns_are_left_out() {
        let mut store = store();
        store
            .append(&table(vec![json!({"name": "a", "colour": "red"})]))
            .unwrap();
        assert_eq!(store.count_rows("items").unwrap(), 1);
    }

    #[test]
    fn test_empty_table_is_a_no_op() {
        let mut store = store();
        assert_eq!(store.append(&Table::new("missing_table")).unwrap(), 0);
    }

    #[test]
    fn test_append_to_missing_table_fails() {
        let mut store = store();
        let mut t = table(vec![json!({"name": "a"})]);
        t.name = "nope".to_string();
        assert!(store.append(&t).is_err());
    }

    #[test]
    fn test_failing_statement_is_reported() {
        let store = store();
        let err = store
            .run_sql("CREATE TABLE ok (id INTEGER);\nCREATE TABL broken (id INTEGER);")
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::SchemaStatement { index: 2, .. })
        ));
        // Statements before the failure stay applied
        assert!(store.table_columns("ok").unwrap().contains(&"id".to_string()));
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("home.db");
        let store = SqliteStore::open(&path).unwrap();
        store.run_sql("CREATE TABLE t (x INTEGER)").unwrap();
        drop(store);
        assert!(path.exists());
    }

    #[test]
    fn test_open_directory_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SqliteStore::open(dir.path()).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::StoreOpen { .. })
        ));
    }

    #[test]
    fn test_open_non_database_file_is_a_store_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("home.db");
        std::fs::write(&path, "not a database\n".repeat(128)).unwrap();

        let err = SqliteStore::open(&path).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<EtlError>(),
            Some(EtlError::StoreOpen { .. })
        ));
    }
}
