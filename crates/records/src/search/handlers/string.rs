//! String parameter SQL handler.

use super::super::criteria::{SqlFragment, SqlParam};

/// Handles string parameter SQL generation.
pub struct StringHandler;

impl StringHandler {
    /// Builds a prefix match of `column` against `value`.
    ///
    /// `LIKE` ignores ASCII case only, so the value is bound as given:
    /// other letters must match the stored spelling.
    pub fn prefix(column: &str, value: &str) -> SqlFragment {
        SqlFragment::with_params(
            format!("{} LIKE ? || '%' ESCAPE '\\'", column),
            vec![SqlParam::string(Self::escape_like(value))],
        )
    }

    /// Builds a prefix match of any of `columns` against `value`.
    pub fn prefix_any(columns: &[&str], value: &str) -> Option<SqlFragment> {
        SqlFragment::any(columns.iter().map(|column| Self::prefix(column, value)))
    }

    /// Builds an exact match.
    pub fn exact(column: &str, value: &str) -> SqlFragment {
        SqlFragment::with_params(format!("{} = ?", column), vec![SqlParam::string(value)])
    }

    fn escape_like(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_prefix() {
        let frag = StringHandler::prefix("n.given_name", "Hor");

        assert!(frag.sql.contains("n.given_name LIKE ?"));
        assert!(frag.sql.contains("|| '%'"));
        assert_eq!(frag.params, vec![SqlParam::string("Hor")]);
    }

    #[test]
    fn test_string_prefix_keeps_non_ascii_spelling() {
        let frag = StringHandler::prefix("n.given_name", "Élodie");
        assert_eq!(frag.params, vec![SqlParam::string("Élodie")]);
    }

    #[test]
    fn test_string_prefix_escapes_wildcards() {
        let frag = StringHandler::prefix("n.given_name", "50%_off");
        assert_eq!(frag.params, vec![SqlParam::string("50\\%\\_off")]);
    }

    #[test]
    fn test_string_prefix_any() {
        let frag = StringHandler::prefix_any(&["n.given_name", "n.family_name"], "h").unwrap();

        assert!(frag.sql.contains(" OR "));
        assert_eq!(frag.params.len(), 2);
        assert!(StringHandler::prefix_any(&[], "h").is_none());
    }

    #[test]
    fn test_string_exact() {
        let frag = StringHandler::exact("i.identifier", "101-6");
        assert_eq!(frag.sql, "i.identifier = ?");
        assert!(!frag.sql.contains("LIKE"));
    }
}
