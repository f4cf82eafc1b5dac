//! Row sources and the query-safety guard
//!
//! The engine never talks to a database itself. Hosts construct something
//! implementing [`RowSource`] and pass it down with an explicit lifecycle;
//! there is no module-level connection state anywhere. Before a query
//! reaches a source it must pass [`check_query`], a best-effort denylist --
//! not a SQL parser.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{EngineError, Result};
use crate::spec::TableSpec;

/// An ordered sequence of row mappings, or a database failure
///
/// The engine treats implementations as opaque: given a query string and
/// positional parameters, rows come back in order or the call fails.
pub trait RowSource {
    /// Execute a query with positional parameters
    fn query(&mut self, sql: &str, params: &[Value]) -> Result<Vec<Map<String, Value>>>;
}

static SELECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*select\b").expect("valid select pattern"));

static DENYLIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Statement separator followed by a mutating verb
        r"(?i);\s*(drop|delete|truncate|alter|create|insert|update)\b",
        r"(?i)union\s+select",
        r"(?i)exec\s*\(",
        r"(?i)script>",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid denylist pattern"))
    .collect()
});

/// Reject non-SELECT statements and a small set of dangerous token patterns
pub fn check_query(sql: &str) -> Result<()> {
    if !SELECT_RE.is_match(sql) {
        return Err(EngineError::Validation(
            "only SELECT statements are allowed".to_string(),
        ));
    }

    for pattern in DENYLIST.iter() {
        if pattern.is_match(sql) {
            return Err(EngineError::Validation(format!(
                "query rejected by safety check: matches '{}'",
                pattern.as_str()
            )));
        }
    }

    Ok(())
}

/// Run a checked query against a source
pub fn fetch_rows(
    source: &mut dyn RowSource,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Map<String, Value>>> {
    check_query(sql)?;
    source.query(sql, params)
}

/// Turn a checked query's rows into a table spec anchored at `start`
///
/// This closes the loop the request layer used to close: query results land
/// on a sheet as a header+rows table.
pub fn query_to_table(
    source: &mut dyn RowSource,
    sql: &str,
    params: &[Value],
    name: Option<String>,
    start: Option<String>,
) -> Result<TableSpec> {
    let rows = fetch_rows(source, sql, params)?;

    if rows.is_empty() {
        return Err(EngineError::Validation(
            "query returned no rows; a table needs at least one".to_string(),
        ));
    }

    Ok(TableSpec {
        name,
        start,
        rows,
        style: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticRows(Vec<Map<String, Value>>);

    impl RowSource for StaticRows {
        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Map<String, Value>>> {
            Ok(self.0.clone())
        }
    }

    struct FailingSource;

    impl RowSource for FailingSource {
        fn query(&mut self, _sql: &str, _params: &[Value]) -> Result<Vec<Map<String, Value>>> {
            Err(EngineError::Database("connection refused".to_string()))
        }
    }

    fn rows(json: &str) -> Vec<Map<String, Value>> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_select_statements_pass() {
        assert!(check_query("SELECT * FROM sales").is_ok());
        assert!(check_query("  select id, name from users where id = $1").is_ok());
    }

    #[test]
    fn test_non_select_rejected() {
        assert!(check_query("DELETE FROM sales").is_err());
        assert!(check_query("UPDATE users SET name = 'x'").is_err());
        assert!(check_query("").is_err());
    }

    #[test]
    fn test_denylist_patterns() {
        assert!(check_query("SELECT 1; DROP TABLE users").is_err());
        assert!(check_query("SELECT 1; delete from t").is_err());
        assert!(check_query("SELECT a FROM t UNION SELECT b FROM u").is_err());
        assert!(check_query("SELECT EXEC(x)").is_err());
        assert!(check_query("SELECT '<script>'").is_err());
    }

    #[test]
    fn test_denylist_is_best_effort_not_a_parser() {
        // A semicolon inside a literal still trips the check; that is the
        // documented tradeoff of a denylist
        assert!(check_query("SELECT '; drop table x' FROM t").is_err());
    }

    #[test]
    fn test_fetch_rows_checks_first() {
        let mut source = FailingSource;
        // The guard fires before the source is consulted
        assert!(matches!(
            fetch_rows(&mut source, "DROP TABLE x", &[]),
            Err(EngineError::Validation(_))
        ));
        // A clean query reaches the source and surfaces its failure
        assert!(matches!(
            fetch_rows(&mut source, "SELECT 1", &[]),
            Err(EngineError::Database(_))
        ));
    }

    #[test]
    fn test_query_to_table() {
        let mut source = StaticRows(rows(
            r#"[{"product": "A", "qty": 1}, {"product": "B", "qty": 2}]"#,
        ));

        let table = query_to_table(
            &mut source,
            "SELECT product, qty FROM sales",
            &[],
            Some("Sales".to_string()),
            Some("B2".to_string()),
        )
        .unwrap();

        assert_eq!(table.name.as_deref(), Some("Sales"));
        assert_eq!(table.start.as_deref(), Some("B2"));
        assert_eq!(table.rows.len(), 2);
        let keys: Vec<&String> = table.rows[0].keys().collect();
        assert_eq!(keys, ["product", "qty"]);
    }

    #[test]
    fn test_query_to_table_rejects_empty_result() {
        let mut source = StaticRows(Vec::new());
        assert!(matches!(
            query_to_table(&mut source, "SELECT 1", &[], None, None),
            Err(EngineError::Validation(_))
        ));
    }
}
