//! Query criteria.
//!
//! A [`Criteria`] is rooted at one record table and accumulates joins and
//! restrictions. Joins are keyed by an association path (`patient`,
//! `patient.names`, ...): asking for the same path twice returns the alias
//! created the first time, so a composition joins each path at most once.
//!
//! Placeholders are anonymous (`?`); parameters are kept in the order their
//! placeholders appear in the rendered SQL.

use std::collections::HashMap;

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// A predicate no row satisfies.
    pub fn unsatisfiable() -> Self {
        Self::new("1 = 0")
    }

    /// Combines with another fragment using AND.
    pub fn and(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) AND ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// Combines with another fragment using OR.
    pub fn or(mut self, other: SqlFragment) -> Self {
        if !self.sql.is_empty() && !other.sql.is_empty() {
            self.sql = format!("({}) OR ({})", self.sql, other.sql);
        } else if !other.sql.is_empty() {
            self.sql = other.sql;
        }
        self.params.extend(other.params);
        self
    }

    /// ORs fragments together; `None` if there are none.
    pub fn any(fragments: impl IntoIterator<Item = SqlFragment>) -> Option<SqlFragment> {
        fragments.into_iter().reduce(SqlFragment::or)
    }

    /// ANDs fragments together; `None` if there are none.
    pub fn all(fragments: impl IntoIterator<Item = SqlFragment>) -> Option<SqlFragment> {
        fragments.into_iter().reduce(SqlFragment::and)
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// How a joined table is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    /// Rows without a match are dropped.
    Inner,
    /// Rows without a match are kept.
    Left,
}

impl JoinType {
    fn keyword(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
        }
    }
}

/// A join on an association path.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub path: String,
    pub table: String,
    pub alias: String,
    pub join_type: JoinType,
    /// The join condition.
    pub on: String,
}

/// A composable query over one record table.
#[derive(Debug, Clone)]
pub struct Criteria {
    table: String,
    alias: String,
    id_column: String,
    joins: Vec<Join>,
    aliases: HashMap<String, usize>,
    restrictions: Vec<SqlFragment>,
}

impl Criteria {
    /// Creates criteria over `table` (aliased `alias`) whose rows are
    /// identified by `id_column`.
    pub fn new(
        table: impl Into<String>,
        alias: impl Into<String>,
        id_column: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            alias: alias.into(),
            id_column: id_column.into(),
            joins: Vec::new(),
            aliases: HashMap::new(),
            restrictions: Vec::new(),
        }
    }

    /// Qualifies a column of the root table.
    pub fn root_column(&self, column: &str) -> String {
        format!("{}.{}", self.alias, column)
    }

    /// The alias already created for `path`, if any.
    pub fn alias_of(&self, path: &str) -> Option<&str> {
        self.aliases
            .get(path)
            .map(|&idx| self.joins[idx].alias.as_str())
    }

    /// Joins `table` on `path` and returns its alias.
    ///
    /// The join condition is `<table>.<column> = <parent>.<parent_column>`,
    /// where the parent is the alias of the path's prefix (`patient` for
    /// `patient.names`) or the root for single-segment paths. The parent must
    /// already be aliased. If `path` is already joined, its existing alias is
    /// returned and nothing is added.
    pub fn create_alias(
        &mut self,
        path: &str,
        table: &str,
        join_type: JoinType,
        parent_column: &str,
        column: &str,
    ) -> String {
        if let Some(alias) = self.alias_of(path) {
            return alias.to_string();
        }

        let parent_alias = path
            .rsplit_once('.')
            .and_then(|(parent, _)| self.alias_of(parent))
            .unwrap_or(&self.alias)
            .to_string();
        let alias = format!("j_{}", path.replace('.', "_"));

        self.joins.push(Join {
            path: path.to_string(),
            table: table.to_string(),
            alias: alias.clone(),
            join_type,
            on: format!("{}.{} = {}.{}", alias, column, parent_alias, parent_column),
        });
        self.aliases.insert(path.to_string(), self.joins.len() - 1);

        alias
    }

    /// Adds a restriction; restrictions are ANDed.
    pub fn add(&mut self, restriction: SqlFragment) {
        if !restriction.is_empty() {
            self.restrictions.push(restriction);
        }
    }

    /// The joins in creation order.
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Renders the query selecting each matching root id once, in id order.
    pub fn to_sql(&self) -> SqlFragment {
        let id = self.root_column(&self.id_column);
        let mut sql = format!("SELECT DISTINCT {} FROM {} {}", id, self.table, self.alias);

        for join in &self.joins {
            sql.push_str(&format!(
                " {} {} {} ON {}",
                join.join_type.keyword(),
                join.table,
                join.alias,
                join.on
            ));
        }

        let mut params = Vec::new();
        if !self.restrictions.is_empty() {
            let clauses: Vec<String> = self
                .restrictions
                .iter()
                .map(|r| format!("({})", r.sql))
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            for restriction in &self.restrictions {
                params.extend(restriction.params.iter().cloned());
            }
        }

        sql.push_str(&format!(" ORDER BY {}", id));
        SqlFragment::with_params(sql, params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_and_or() {
        let a = SqlFragment::with_params("a = ?", vec![SqlParam::integer(1)]);
        let b = SqlFragment::with_params("b = ?", vec![SqlParam::string("x")]);

        let combined = a.clone().or(b.clone());
        assert_eq!(combined.sql, "(a = ?) OR (b = ?)");
        assert_eq!(
            combined.params,
            vec![SqlParam::integer(1), SqlParam::string("x")]
        );

        let combined = SqlFragment::new("").and(b);
        assert_eq!(combined.sql, "b = ?");
    }

    #[test]
    fn test_any_of_nothing_is_none() {
        assert!(SqlFragment::any(Vec::new()).is_none());
        let one = SqlFragment::any(vec![SqlFragment::new("x = 1")]).unwrap();
        assert_eq!(one.sql, "x = 1");
    }

    #[test]
    fn test_empty_criteria() {
        let criteria = Criteria::new("condition", "c", "condition_id");
        let sql = criteria.to_sql();
        assert_eq!(
            sql.sql,
            "SELECT DISTINCT c.condition_id FROM condition c ORDER BY c.condition_id"
        );
        assert!(sql.params.is_empty());
    }

    #[test]
    fn test_alias_is_reused() {
        let mut criteria = Criteria::new("condition", "c", "condition_id");

        let first = criteria.create_alias("patient", "patient", JoinType::Inner, "patient_id", "patient_id");
        let again = criteria.create_alias("patient", "patient", JoinType::Inner, "patient_id", "patient_id");

        assert_eq!(first, "j_patient");
        assert_eq!(first, again);
        assert_eq!(criteria.joins().len(), 1);
    }

    #[test]
    fn test_nested_alias_joins_parent() {
        let mut criteria = Criteria::new("condition", "c", "condition_id");
        criteria.create_alias("patient", "patient", JoinType::Inner, "patient_id", "patient_id");
        let names = criteria.create_alias(
            "patient.names",
            "person_name",
            JoinType::Inner,
            "patient_id",
            "patient_id",
        );

        assert_eq!(names, "j_patient_names");
        assert_eq!(
            criteria.joins()[1].on,
            "j_patient_names.patient_id = j_patient.patient_id"
        );
    }

    #[test]
    fn test_restrictions_render_in_order() {
        let mut criteria = Criteria::new("allergy", "a", "allergy_id");
        criteria.add(SqlFragment::with_params("a.voided = ?", vec![SqlParam::integer(0)]));
        criteria.add(SqlFragment::new(""));
        criteria.add(SqlFragment::with_params(
            "a.allergen_type = ?",
            vec![SqlParam::string("FOOD")],
        ));

        let sql = criteria.to_sql();
        assert_eq!(
            sql.sql,
            "SELECT DISTINCT a.allergy_id FROM allergy a WHERE (a.voided = ?) AND (a.allergen_type = ?) ORDER BY a.allergy_id"
        );
        assert_eq!(
            sql.params,
            vec![SqlParam::integer(0), SqlParam::string("FOOD")]
        );
    }
}
