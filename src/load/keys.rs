use crate::melt::types::{Table, EXTERNAL_ID};
use serde_json::Value;
use std::collections::HashMap;

/// Foreign key column written onto child tables
pub const PROPERTY_ID: &str = "property_id";

/// Replace the natural key of every row with the parent's surrogate key.
///
/// Rows whose `external_id` is not in `mapping` are dropped, never loaded
/// with a null foreign key. `external_id` and the `transient` columns are
/// removed. Returns the resolved table and the number of orphans dropped.
pub fn attach_property_id(
    mut table: Table,
    mapping: &HashMap<String, i64>,
    transient: &[&str],
) -> (Table, usize) {
    let before = table.len();

    table.rows.retain_mut(|row| {
        let property_id = row
            .get(EXTERNAL_ID)
            .and_then(Value::as_str)
            .and_then(|key| mapping.get(key));
        match property_id {
            Some(id) => {
                row.insert(PROPERTY_ID.to_string(), Value::from(*id));
                true
            }
            None => false,
        }
    });
    let orphans = before - table.len();

    if !table.columns.iter().any(|c| c == PROPERTY_ID) {
        table.columns.insert(0, PROPERTY_ID.to_string());
    }
    let mut dropped = vec![EXTERNAL_ID];
    dropped.extend_from_slice(transient);
    table.drop_columns(&dropped);

    (table, orphans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_orphans_are_dropped() {
        let mut table = Table::with_columns("leads", ["external_id", "property_title", "source"]);
        for row in [
            json!({"external_id": "A", "property_title": "A", "source": "MLS"}),
            json!({"external_id": "ghost", "property_title": "ghost", "source": "MLS"}),
            json!({"external_id": "B", "property_title": "B", "source": null}),
        ] {
            table.push(serde_json::from_value(row).unwrap());
        }
        let mapping = HashMap::from([("A".to_string(), 1), ("B".to_string(), 2)]);

        let (resolved, orphans) = attach_property_id(table, &mapping, &["property_title"]);

        assert_eq!(orphans, 1);
        assert_eq!(resolved.columns, vec!["property_id", "source"]);
        let ids: Vec<&Value> = resolved.column_values("property_id").collect();
        assert_eq!(ids, vec![&json!(1), &json!(2)]);
        assert!(resolved.rows.iter().all(|r| !r.contains_key("external_id")));
    }

    #[test]
    fn test_empty_mapping_drops_everything() {
        let mut table = Table::new("taxes");
        table.push(serde_json::from_value(json!({"external_id": "A", "taxes_amount": 10})).unwrap());

        let (resolved, orphans) = attach_property_id(table, &HashMap::new(), &[]);
        assert!(resolved.is_empty());
        assert_eq!(orphans, 1);
    }
}
