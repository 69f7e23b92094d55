//! Reference parameter SQL handler.

use tracing::warn;

use crate::types::ReferenceParam;

use super::super::criteria::{Criteria, JoinType, SqlFragment, SqlParam};
use super::StringHandler;

/// Handles patient reference SQL generation.
pub struct ReferenceHandler;

impl ReferenceHandler {
    /// Builds SQL matching the patient referenced through `path`.
    ///
    /// The patient is joined on the root's `patient_id`; chained fields join
    /// its names or identifiers. Joins are shared across all values of a
    /// composition. Returns `None` for a chain field that is not searchable.
    pub fn build_sql(
        criteria: &mut Criteria,
        path: &str,
        param: &ReferenceParam,
    ) -> Option<SqlFragment> {
        let patient = criteria.create_alias(path, "patient", JoinType::Inner, "patient_id", "patient_id");

        match param.chain.as_deref() {
            None | Some("_id") => {
                let id = ReferenceParam::id(&param.value).value;
                Some(SqlFragment::with_params(
                    format!("{}.uuid = ?", patient),
                    vec![SqlParam::string(id)],
                ))
            }
            Some(field @ ("given" | "family" | "name")) => {
                let names = Self::names_alias(criteria, path);
                let columns: Vec<String> = match field {
                    "given" => vec![format!("{}.given_name", names)],
                    "family" => vec![format!("{}.family_name", names)],
                    _ => ["given_name", "middle_name", "family_name"]
                        .iter()
                        .map(|c| format!("{}.{}", names, c))
                        .collect(),
                };
                let columns: Vec<&str> = columns.iter().map(String::as_str).collect();

                StringHandler::prefix_any(&columns, &param.value)
                    .map(|m| SqlFragment::new(format!("{}.voided = 0", names)).and(m))
            }
            Some("identifier") => {
                let identifiers = criteria.create_alias(
                    &format!("{}.identifiers", path),
                    "patient_identifier",
                    JoinType::Inner,
                    "patient_id",
                    "patient_id",
                );
                Some(
                    SqlFragment::new(format!("{}.voided = 0", identifiers)).and(
                        StringHandler::exact(
                            &format!("{}.identifier", identifiers),
                            &param.value,
                        ),
                    ),
                )
            }
            Some(other) => {
                warn!(chain = other, "ignoring reference value with unsupported chain");
                None
            }
        }
    }

    fn names_alias(criteria: &mut Criteria, path: &str) -> String {
        criteria.create_alias(
            &format!("{}.names", path),
            "person_name",
            JoinType::Inner,
            "patient_id",
            "patient_id",
        )
    }
}
