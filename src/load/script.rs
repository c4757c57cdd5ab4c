/// DDL shipped with the crate, used when no script path is configured
pub const DEFAULT_SCHEMA: &str = include_str!("../../sql/create_tables.sql");

/// Split a script on `;` into trimmed, non-blank statements.
///
/// This is a plain split, so a `;` inside a string literal or trigger body
/// breaks the statement. The shipped schema has neither.
pub fn split_statements(sql: &str) -> Vec<&str> {
    sql.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_skips_blank_statements() {
        let sql = "CREATE TABLE a (x INT);\n\n  ;\nCREATE TABLE b (y INT);\n";
        assert_eq!(
            split_statements(sql),
            vec!["CREATE TABLE a (x INT)", "CREATE TABLE b (y INT)"]
        );
    }

    #[test]
    fn test_default_schema_has_every_table() {
        let statements = split_statements(DEFAULT_SCHEMA);
        for table in ["properties", "leads", "valuation", "hoa", "rehab", "taxes"] {
            let create = format!("CREATE TABLE {table} (");
            assert!(
                statements.iter().any(|s| s.contains(&create)),
                "missing CREATE TABLE for {table}"
            );
        }
    }
}
