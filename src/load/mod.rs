//! Loading flattened tables into SQLite
//!
//! Loading is two-phase. Phase one appends and commits every parent row.
//! Phase two reads the complete `external_id -> property_id` mapping back
//! from the store, and only then are child tables resolved and appended.
//! Nothing is rolled back if a later child load fails.

pub mod keys;
pub mod script;
pub mod store;

pub use keys::{attach_property_id, PROPERTY_ID};
pub use script::{split_statements, DEFAULT_SCHEMA};
pub use store::SqliteStore;

use crate::melt::plan::child_spec;
use crate::melt::types::Flattened;
use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

/// Outcome of loading one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableLoad {
    pub table: String,
    pub loaded: usize,
    /// Child rows whose natural key had no parent
    pub orphans: usize,
    /// The table had no rows and was not touched
    pub skipped: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub tables: Vec<TableLoad>,
}

impl LoadReport {
    pub fn get(&self, table: &str) -> Option<&TableLoad> {
        self.tables.iter().find(|t| t.table == table)
    }
}

/// Load the parent table, resolve surrogate keys, then load every child
pub fn load_flattened(store: &mut SqliteStore, flattened: Flattened) -> Result<LoadReport> {
    let (properties, children) = flattened.into_children();
    let mut report = LoadReport::default();

    // Phase 1: parents, committed before anything reads them back
    let loaded = store
        .append(&properties)
        .context("Failed to load properties")?;
    info!(table = %properties.name, rows = loaded, "properties loaded");
    report.tables.push(TableLoad {
        table: properties.name.clone(),
        loaded,
        orphans: 0,
        skipped: properties.is_empty(),
    });

    // Phase 2: the full key map, before any child load
    let mapping = store.external_id_map()?;
    info!(keys = mapping.len(), "resolved property keys");

    for child in children {
        let name = child.name.clone();
        let transient = child_spec(&name).map(|s| s.transient).unwrap_or(&[]);
        let (resolved, orphans) = attach_property_id(child, &mapping, transient);

        if orphans > 0 {
            info!(table = %name, orphans, "dropped rows without a parent property");
        }

        if resolved.is_empty() {
            info!(table = %name, "table is empty, skipped");
            report.tables.push(TableLoad {
                table: name,
                loaded: 0,
                orphans,
                skipped: true,
            });
            continue;
        }

        let loaded = store
            .append(&resolved)
            .with_context(|| format!("Failed to load {name}"))?;
        info!(table = %name, rows = loaded, "table loaded");
        report.tables.push(TableLoad {
            table: name,
            loaded,
            orphans,
            skipped: false,
        });
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::flatten;
    use serde_json::json;

    fn loaded_store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.run_sql(DEFAULT_SCHEMA).unwrap();
        store
    }

    #[test]
    fn test_children_reference_loaded_parents() {
        let records = vec![
            json!({
                "Property_Title": "A",
                "SQFT_Total": "1000 sqft",
                "Source": "MLS",
                "Taxes": "1200",
                "Valuation": [{"ARV": 1}, {"ARV": 2}, {"ARV": 3}],
                "HOA": [{"HOA": 50, "HOA_Flag": "Yes"}],
                "Rehab": [{"Paint": "Yes", "Mystery_Field": 1}]
            }),
            json!({"Property_Title": "B"}),
        ];

        let mut store = loaded_store();
        let report = load_flattened(&mut store, flatten(&records)).unwrap();

        assert_eq!(report.get("properties").unwrap().loaded, 2);
        assert_eq!(report.get("valuation").unwrap().loaded, 3);
        assert_eq!(report.get("hoa").unwrap().loaded, 1);
        assert_eq!(report.get("rehab").unwrap().loaded, 1);
        assert_eq!(report.get("taxes").unwrap().loaded, 1);
        assert_eq!(report.get("leads").unwrap().loaded, 1);

        let rows = store
            .query_rows(
                "SELECT COUNT(*) FROM valuation v JOIN properties p ON p.property_id = v.property_id \
                 WHERE p.external_id = 'A'",
            )
            .unwrap();
        assert_eq!(rows, vec![vec![json!(3)]]);

        let sqft = store
            .query_rows("SELECT sqft_total FROM properties WHERE external_id = 'A'")
            .unwrap();
        assert_eq!(sqft, vec![vec![json!(1000.0)]]);
    }

    #[test]
    fn test_orphan_children_never_load() {
        let mut flattened = flatten(&[json!({
            "Property_Title": "A",
            "Valuation": [{"ARV": 1}]
        })]);
        // A child whose parent never made it into the properties table
        flattened
            .valuation
            .push(serde_json::from_value(json!({"external_id": "ghost", "arv": 9})).unwrap());

        let mut store = loaded_store();
        let report = load_flattened(&mut store, flattened).unwrap();

        let valuation = report.get("valuation").unwrap();
        assert_eq!(valuation.loaded, 1);
        assert_eq!(valuation.orphans, 1);
        assert_eq!(
            store.query_rows("SELECT arv FROM valuation").unwrap(),
            vec![vec![json!(1.0)]]
        );
        let nulls = store
            .query_rows("SELECT COUNT(*) FROM valuation WHERE property_id IS NULL")
            .unwrap();
        assert_eq!(nulls, vec![vec![json!(0)]]);
    }

    #[test]
    fn test_empty_batch_skips_every_table() {
        let mut store = loaded_store();
        let report = load_flattened(&mut store, flatten(&[])).unwrap();

        assert_eq!(report.tables.len(), 6);
        assert!(report.tables.iter().all(|t| t.skipped && t.loaded == 0));
        assert_eq!(store.count_rows("properties").unwrap(), 0);
    }
}
