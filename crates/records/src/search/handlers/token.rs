//! Token parameter SQL handler.

use crate::types::TokenParam;

use super::super::criteria::{SqlFragment, SqlParam};

/// Handles token parameter SQL generation.
pub struct TokenHandler;

impl TokenHandler {
    /// Builds SQL matching a token against a concept and its mappings.
    ///
    /// - `code` matches the concept UUID or the code of any mapping
    /// - `system|code` matches a mapping with that system and code
    pub fn concept_sql(concept_alias: &str, mapping_alias: &str, token: &TokenParam) -> SqlFragment {
        match &token.system {
            Some(system) => SqlFragment::with_params(
                format!(
                    "{}.system = ? AND {}.code = ?",
                    mapping_alias, mapping_alias
                ),
                vec![SqlParam::string(system), SqlParam::string(&token.code)],
            ),
            None => SqlFragment::with_params(
                format!("{}.uuid = ? OR {}.code = ?", concept_alias, mapping_alias),
                vec![
                    SqlParam::string(&token.code),
                    SqlParam::string(&token.code),
                ],
            ),
        }
    }

    /// Builds SQL matching `column` against one of `values`.
    pub fn in_sql(column: &str, values: &[&str]) -> SqlFragment {
        match values {
            [] => SqlFragment::unsatisfiable(),
            [single] => SqlFragment::with_params(
                format!("{} = ?", column),
                vec![SqlParam::string(*single)],
            ),
            _ => {
                let placeholders = vec!["?"; values.len()].join(", ");
                SqlFragment::with_params(
                    format!("{} IN ({})", column, placeholders),
                    values.iter().map(|v| SqlParam::string(*v)).collect(),
                )
            }
        }
    }
}
