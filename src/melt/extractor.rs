use crate::melt::plan::{
    EntitySpec, RowFilter, RowSource, HOA, LEADS, PROPERTIES, REHAB, TAXES, TITLE_COLUMN,
    TITLE_FIELD, VALUATION,
};
use crate::melt::types::{is_missing, Flattened, Row, Table, EXTERNAL_ID};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// Natural key of a raw record: the trimmed title.
///
/// Numbers and booleans are keyed by their text form. A record without a
/// usable title has no key.
pub fn natural_key(record: &Value) -> Option<String> {
    match record.get(TITLE_FIELD)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Execute one extraction plan over all raw records.
///
/// Select/explode, rename, coerce, filter, then deduplicate on the natural
/// key when the plan asks for it.
pub fn project(spec: &EntitySpec, records: &[Value]) -> Table {
    let mut table = Table::with_columns(spec.table, spec.columns());
    let mut keyless = 0usize;

    for record in records {
        let Some(key) = natural_key(record) else {
            keyless += 1;
            continue;
        };

        match spec.source {
            RowSource::Record => {
                let row = select_fields(spec, record, &key);
                push_filtered(spec, &mut table, row);
            }
            RowSource::Explode(field) => {
                for row in explode_array(record.get(field), &key, spec.fields) {
                    push_filtered(spec, &mut table, row);
                }
            }
        }
    }

    if keyless > 0 {
        debug!(table = spec.table, records = keyless, "skipped records without a title");
    }

    if spec.unique_key {
        let dropped = table.dedup_by(EXTERNAL_ID);
        if dropped > 0 {
            debug!(table = spec.table, dropped, "dropped duplicate natural keys");
        }
    }

    table
}

fn select_fields(spec: &EntitySpec, record: &Value, key: &str) -> Row {
    let mut row = Map::new();
    row.insert(EXTERNAL_ID.to_string(), Value::String(key.to_string()));
    if spec.keep_title {
        row.insert(TITLE_COLUMN.to_string(), Value::String(key.to_string()));
    }
    for (field, column) in spec.fields {
        let value = record.get(*field).cloned().unwrap_or(Value::Null);
        row.insert(column.to_string(), value);
    }
    row
}

fn push_filtered(spec: &EntitySpec, table: &mut Table, mut row: Row) {
    for (column, coerce) in spec.coerce {
        if let Some(value) = row.get_mut(*column) {
            *value = coerce.apply(value);
        }
    }

    if let RowFilter::AnyPresent(columns) = spec.filter {
        if columns.iter().all(|c| is_missing(row.get(*c))) {
            return;
        }
    }

    table.push(row);
}

/// Explode an array-of-objects field into one row per element, each carrying
/// the parent's natural key.
///
/// Absent, null, `false`, empty and otherwise falsy fields give no rows.
/// Elements that are not objects are skipped.
pub fn explode_array(field: Option<&Value>, key: &str, renames: &[(&str, &str)]) -> Vec<Row> {
    let items = match field {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) | Some(Value::Bool(false)) => return Vec::new(),
        Some(other) => {
            if is_truthy(other) {
                debug!(key, "nested field is not an array, ignoring");
            }
            return Vec::new();
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(obj) = item else {
            debug!(key, "skipping non-object array element");
            continue;
        };

        let mut row = Map::new();
        row.insert(EXTERNAL_ID.to_string(), Value::String(key.to_string()));
        for (name, value) in obj {
            let column = renames
                .iter()
                .find(|(from, _)| *from == name.as_str())
                .map(|(_, to)| to.to_string())
                .unwrap_or_else(|| name.clone());
            if column == EXTERNAL_ID {
                continue;
            }
            row.insert(column, value.clone());
        }
        rows.push(row);
    }
    rows
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() != Some(0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

pub fn normalize_properties(records: &[Value]) -> Table {
    project(&PROPERTIES, records)
}

pub fn normalize_leads(records: &[Value]) -> Table {
    project(&LEADS, records)
}

pub fn normalize_valuation(records: &[Value]) -> Table {
    project(&VALUATION, records)
}

pub fn normalize_hoa(records: &[Value]) -> Table {
    project(&HOA, records)
}

pub fn normalize_rehab(records: &[Value]) -> Table {
    project(&REHAB, records)
}

pub fn normalize_taxes(records: &[Value]) -> Table {
    project(&TAXES, records)
}

/// Flatten a batch of raw records into the parent table and all children
pub fn flatten(records: &[Value]) -> Flattened {
    Flattened {
        properties: normalize_properties(records),
        leads: normalize_leads(records),
        valuation: normalize_valuation(records),
        hoa: normalize_hoa(records),
        rehab: normalize_rehab(records),
        taxes: normalize_taxes(records),
    }
}

/// Natural keys that occur on more than one raw record, with their counts,
/// in order of first appearance
pub fn duplicate_keys(records: &[Value]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();

    for key in records.iter().filter_map(natural_key) {
        let count = counts.entry(key.clone()).or_insert(0);
        if *count == 0 {
            order.push(key);
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|key| {
            let n = counts[&key];
            (n > 1).then_some((key, n))
        })
        .collect()
}
