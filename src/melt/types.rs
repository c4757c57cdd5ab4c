use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// One row of a flattened table. An absent key and an explicit `null` both
/// mean "missing".
pub type Row = Map<String, Value>;

/// Column holding the natural key on every flattened table
pub const EXTERNAL_ID: &str = "external_id";

/// A named, in-memory table of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Destination table name, e.g. "properties", "valuation"
    pub name: String,

    /// Columns in first-appearance order
    pub columns: Vec<String>,

    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Table {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Create an empty table with a declared column list
    pub fn with_columns<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Table::new(name);
        for column in columns {
            table.add_column(column.into());
        }
        table
    }

    fn add_column(&mut self, column: String) {
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
    }

    /// Append a row, registering any column not seen before
    pub fn push(&mut self, row: Row) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, with `Null` standing in for absent keys
    pub fn column_values<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.rows.iter().map(move |row| row.get(column).unwrap_or(&Value::Null))
    }

    /// Remove columns from the declaration and from every row
    pub fn drop_columns(&mut self, columns: &[&str]) {
        self.columns.retain(|c| !columns.contains(&c.as_str()));
        for row in &mut self.rows {
            for column in columns {
                row.remove(*column);
            }
        }
    }

    /// Keep the first row for each distinct value of `column`.
    /// Returns how many rows were dropped.
    pub fn dedup_by(&mut self, column: &str) -> usize {
        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows
            .retain(|row| seen.insert(row.get(column).cloned().unwrap_or(Value::Null).to_string()));
        before - self.rows.len()
    }
}

/// True when the field is absent or null
pub fn is_missing(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Null))
}

/// The output of flattening a batch of raw records: the parent table and
/// its child tables
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Flattened {
    pub properties: Table,
    pub leads: Table,
    pub valuation: Table,
    pub hoa: Table,
    pub rehab: Table,
    pub taxes: Table,
}

impl Flattened {
    /// Child tables in load order
    pub fn children(&self) -> [&Table; 5] {
        [&self.leads, &self.valuation, &self.hoa, &self.rehab, &self.taxes]
    }

    pub fn into_children(self) -> (Table, [Table; 5]) {
        (
            self.properties,
            [self.leads, self.valuation, self.hoa, self.rehab, self.taxes],
        )
    }

    /// (table name, row count) for every table, parent first
    pub fn row_counts(&self) -> Vec<(String, usize)> {
        std::iter::once(&self.properties)
            .chain(self.children())
            .map(|t| (t.name.clone(), t.len()))
            .collect()
    }
}
