//! Execution of composed criteria.

use rusqlite::types::ToSqlOutput;
use rusqlite::{Connection, ToSql, params_from_iter};
use tracing::debug;

use crate::error::{BackendError, SearchError, StorageError, StorageResult};
use crate::search::{Criteria, SqlParam};

impl ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlParam::String(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
        })
    }
}

/// Returns the ids of every row matching `criteria`, in id order.
pub(crate) fn list(conn: &Connection, criteria: &Criteria) -> StorageResult<Vec<i64>> {
    let query = criteria.to_sql();
    debug!(sql = %query.sql, params = query.params.len(), "executing criteria");

    let run = || -> rusqlite::Result<Vec<i64>> {
        let mut stmt = conn.prepare(&query.sql)?;
        let ids = stmt
            .query_map(params_from_iter(query.params.iter()), |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    };

    run().map_err(|e| query_failed(&query.sql, e))
}

fn query_failed(sql: &str, err: rusqlite::Error) -> StorageError {
    StorageError::Backend(BackendError::QueryFailed {
        backend_name: "sqlite".to_string(),
        message: format!("{} ({})", err, sql),
    })
}

/// Returns the id of the single row matching `criteria`.
///
/// # Errors
///
/// * `SearchError::NonUniqueResult` - If more than one row matches
pub(crate) fn unique_result(conn: &Connection, criteria: &Criteria) -> StorageResult<Option<i64>> {
    let ids = list(conn, criteria)?;
    match ids.as_slice() {
        [] => Ok(None),
        [id] => Ok(Some(*id)),
        _ => Err(SearchError::NonUniqueResult { count: ids.len() }.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SqlFragment;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE item (item_id INTEGER PRIMARY KEY, tag TEXT);
             INSERT INTO item (item_id, tag) VALUES (1, 'a'), (2, 'b'), (3, 'b');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_list_binds_params_in_order() {
        let conn = conn();
        let mut criteria = Criteria::new("item", "i", "item_id");
        criteria.add(SqlFragment::with_params(
            "i.tag = ? OR i.item_id = ?",
            vec![SqlParam::string("b"), SqlParam::integer(1)],
        ));

        assert_eq!(list(&conn, &criteria).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_unique_result() {
        let conn = conn();

        let mut criteria = Criteria::new("item", "i", "item_id");
        criteria.add(SqlFragment::with_params("i.tag = ?", vec![SqlParam::string("a")]));
        assert_eq!(unique_result(&conn, &criteria).unwrap(), Some(1));

        let mut criteria = Criteria::new("item", "i", "item_id");
        criteria.add(SqlFragment::with_params("i.tag = ?", vec![SqlParam::string("b")]));
        assert!(unique_result(&conn, &criteria).is_err());

        let mut criteria = Criteria::new("item", "i", "item_id");
        criteria.add(SqlFragment::unsatisfiable());
        assert_eq!(unique_result(&conn, &criteria).unwrap(), None);
    }

    #[test]
    fn test_failing_query_reports_sql() {
        let conn = conn();
        let criteria = Criteria::new("missing_table", "m", "missing_id");

        let err = list(&conn, &criteria).unwrap_err();
        match err {
            StorageError::Backend(BackendError::QueryFailed { message, .. }) => {
                assert!(message.contains("missing_table"));
            }
            other => panic!("expected QueryFailed, got {:?}", other),
        }
    }
}
