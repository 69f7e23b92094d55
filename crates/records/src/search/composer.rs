//! Criteria composition.
//!
//! Turns a search parameter set into one [`Criteria`]. Every slot is built by
//! its own function returning at most one fragment: values within a slot are
//! ORed, slots are ANDed, and an absent slot contributes nothing.
//!
//! Values that do not map onto the stored vocabulary are dropped from their
//! slot. A present slot whose values were all dropped contributes
//! `1 = 0`, so the search matches nothing rather than silently widening.

use tracing::warn;

use crate::error::StorageResult;
use crate::types::{
    AllergySearchParams, ConditionSearchParams, DateRangeParam, ReferenceAndListParam,
    TokenOrListParam, TokenParam,
};
use crate::vocabulary::{
    ALLERGY_CATEGORY_SYSTEM, ALLERGY_CLINICAL_SYSTEM, CONDITION_CLINICAL_SYSTEM,
    REACTION_SEVERITY_SYSTEM, VocabularyMapper,
    allergen_type_from_category, allergy_status_to_voided, condition_status_from_code,
};

use super::criteria::{Criteria, JoinType, SqlFragment, SqlParam};
use super::handlers::{DateHandler, ReferenceHandler, TokenHandler};

/// Root table, alias and id column of condition queries.
pub const CONDITION_ROOT: (&str, &str, &str) = ("condition", "c", "condition_id");

/// Root table, alias and id column of allergy queries.
pub const ALLERGY_ROOT: (&str, &str, &str) = ("allergy", "a", "allergy_id");

/// Builds the criteria selecting the non-voided conditions matching `params`.
pub fn condition_criteria(params: &ConditionSearchParams) -> Criteria {
    let (table, alias, id) = CONDITION_ROOT;
    let mut criteria = Criteria::new(table, alias, id);

    criteria.add(SqlFragment::new(format!("{}.voided = 0", alias)));

    if let Some(patient) = &params.patient {
        handle_reference(&mut criteria, "patient", patient);
    }
    if let Some(subject) = &params.subject {
        handle_reference(&mut criteria, "subject", subject);
    }
    if let Some(code) = &params.code {
        let fragment = handle_concept_tokens(&mut criteria, "code", "condition_coded", code);
        add_opt(&mut criteria, fragment);
    }
    if let Some(status) = &params.clinical_status {
        let fragment = handle_condition_status(&criteria, status);
        add_opt(&mut criteria, fragment);
    }
    if let Some(onset) = &params.onset_date {
        let column = criteria.root_column("onset_date");
        add_opt(&mut criteria, handle_date_range(&column, onset));
    }
    if let Some(recorded) = &params.recorded_date {
        let column = criteria.root_column("date_created");
        add_opt(&mut criteria, handle_date_range(&column, recorded));
    }

    criteria
}

/// Builds the criteria selecting the allergies matching `params`.
///
/// Voided allergies are excluded unless the clinical status slot asks for
/// inactive ones.
pub fn allergy_criteria(
    params: &AllergySearchParams,
    vocabulary: &VocabularyMapper<'_>,
) -> StorageResult<Criteria> {
    let (table, alias, id) = ALLERGY_ROOT;
    let mut criteria = Criteria::new(table, alias, id);

    let voided = handle_allergy_status(&criteria, params.clinical_status.as_ref());
    add_opt(&mut criteria, voided);

    if let Some(patient) = &params.patient {
        handle_reference(&mut criteria, "patient", patient);
    }
    if let Some(category) = &params.category {
        let fragment = handle_category(&criteria, category);
        add_opt(&mut criteria, fragment);
    }
    if let Some(allergen) = &params.allergen {
        let fragment = handle_concept_tokens(&mut criteria, "allergen", "coded_allergen", allergen);
        add_opt(&mut criteria, fragment);
    }
    if let Some(severity) = &params.severity {
        let fragment = handle_severity(&mut criteria, severity, vocabulary)?;
        add_opt(&mut criteria, fragment);
    }
    if let Some(manifestation) = &params.manifestation {
        let fragment = handle_manifestation(&mut criteria, manifestation);
        add_opt(&mut criteria, fragment);
    }

    Ok(criteria)
}

fn add_opt(criteria: &mut Criteria, fragment: Option<SqlFragment>) {
    if let Some(fragment) = fragment {
        criteria.add(fragment);
    }
}

/// ORs the fragments built from a slot's values.
///
/// `None` for an empty slot; `1 = 0` when values were given but none could
/// be mapped.
fn or_slot<T: std::fmt::Debug>(
    slot: &str,
    values: &[T],
    mut build: impl FnMut(&T) -> Option<SqlFragment>,
) -> Option<SqlFragment> {
    if values.is_empty() {
        return None;
    }

    let fragments: Vec<SqlFragment> = values
        .iter()
        .filter_map(|value| {
            let fragment = build(value);
            if fragment.is_none() {
                warn!(slot, ?value, "dropping unrecognized search value");
            }
            fragment
        })
        .collect();

    Some(SqlFragment::any(fragments).unwrap_or_else(SqlFragment::unsatisfiable))
}

/// Token codes that map onto a stored value. Tokens without a system are
/// read as codes of `system`; tokens from another system are dropped.
fn mapped_codes<T>(
    slot: &str,
    tokens: &[TokenParam],
    system: &str,
    map: impl Fn(&str) -> Option<T>,
) -> Option<Vec<T>> {
    if tokens.is_empty() {
        return None;
    }

    let mapped = tokens
        .iter()
        .filter_map(|token| {
            let in_system = token.system.as_deref().is_none_or(|given| given == system);
            let value = in_system.then(|| map(&token.code)).flatten();
            if value.is_none() {
                warn!(slot, code = %token.code, "dropping unrecognized search value");
            }
            value
        })
        .collect();

    Some(mapped)
}

fn handle_reference(criteria: &mut Criteria, slot: &str, and_list: &ReferenceAndListParam) {
    for or_list in &and_list.values {
        let fragment = or_slot(slot, &or_list.values, |reference| {
            ReferenceHandler::build_sql(criteria, "patient", reference)
        });
        add_opt(criteria, fragment);
    }
}

/// Joins the concept stored in `column` and its mappings.
fn concept_aliases(criteria: &mut Criteria, path: &str, column: &str) -> (String, String) {
    let concept = criteria.create_alias(path, "concept", JoinType::Left, column, "concept_id");
    let mappings = criteria.create_alias(
        &format!("{}.mappings", path),
        "concept_mapping",
        JoinType::Left,
        "concept_id",
        "concept_id",
    );
    (concept, mappings)
}

fn handle_concept_tokens(
    criteria: &mut Criteria,
    path: &str,
    column: &str,
    tokens: &TokenOrListParam,
) -> Option<SqlFragment> {
    if tokens.is_empty() {
        return None;
    }

    let (concept, mappings) = concept_aliases(criteria, path, column);
    or_slot(path, &tokens.values, |token| {
        Some(TokenHandler::concept_sql(&concept, &mappings, token))
    })
}

fn handle_manifestation(criteria: &mut Criteria, tokens: &TokenOrListParam) -> Option<SqlFragment> {
    if tokens.is_empty() {
        return None;
    }

    criteria.create_alias("reactions", "allergy_reaction", JoinType::Inner, "allergy_id", "allergy_id");
    let (concept, mappings) = concept_aliases(criteria, "reactions.concept", "reaction_concept_id");
    or_slot("manifestation", &tokens.values, |token| {
        Some(TokenHandler::concept_sql(&concept, &mappings, token))
    })
}

fn handle_condition_status(criteria: &Criteria, tokens: &TokenOrListParam) -> Option<SqlFragment> {
    let statuses = mapped_codes(
        "clinical_status",
        &tokens.values,
        CONDITION_CLINICAL_SYSTEM,
        condition_status_from_code,
    )?;
    let values: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();

    Some(TokenHandler::in_sql(
        &criteria.root_column("clinical_status"),
        &values,
    ))
}

fn handle_category(criteria: &Criteria, tokens: &TokenOrListParam) -> Option<SqlFragment> {
    let types = mapped_codes(
        "category",
        &tokens.values,
        ALLERGY_CATEGORY_SYSTEM,
        allergen_type_from_category,
    )?;
    let values: Vec<&str> = types.iter().map(|t| t.as_str()).collect();

    Some(TokenHandler::in_sql(&criteria.root_column("allergen_type"), &values))
}

fn handle_severity(
    criteria: &mut Criteria,
    tokens: &TokenOrListParam,
    vocabulary: &VocabularyMapper<'_>,
) -> StorageResult<Option<SqlFragment>> {
    if tokens.is_empty() {
        return Ok(None);
    }

    let mut uuids = Vec::new();
    for token in &tokens.values {
        let in_system = token
            .system
            .as_deref()
            .is_none_or(|system| system == REACTION_SEVERITY_SYSTEM);
        let uuid = if in_system {
            vocabulary.severity_concept_uuid(&token.code)?
        } else {
            None
        };
        match uuid {
            Some(uuid) => uuids.push(uuid),
            None => warn!(slot = "severity", code = %token.code, "dropping unrecognized search value"),
        }
    }
    if uuids.is_empty() {
        return Ok(Some(SqlFragment::unsatisfiable()));
    }

    let severity = criteria.create_alias("severity", "concept", JoinType::Left, "severity_concept_id", "concept_id");
    let values: Vec<&str> = uuids.iter().map(String::as_str).collect();
    Ok(Some(TokenHandler::in_sql(&format!("{}.uuid", severity), &values)))
}

/// The voided restriction for allergies.
fn handle_allergy_status(
    criteria: &Criteria,
    tokens: Option<&TokenOrListParam>,
) -> Option<SqlFragment> {
    let voided_column = criteria.root_column("voided");
    let default = SqlFragment::with_params(format!("{} = ?", voided_column), vec![SqlParam::integer(0)]);

    let Some(tokens) = tokens else {
        return Some(default);
    };
    let Some(flags) = mapped_codes(
        "clinical_status",
        &tokens.values,
        ALLERGY_CLINICAL_SYSTEM,
        allergy_status_to_voided,
    ) else {
        return Some(default);
    };

    let active = flags.contains(&false);
    let inactive = flags.contains(&true);
    match (active, inactive) {
        (true, true) => None,
        (true, false) => Some(default),
        (false, true) => Some(SqlFragment::with_params(
            format!("{} = ?", voided_column),
            vec![SqlParam::integer(1)],
        )),
        (false, false) => Some(SqlFragment::unsatisfiable()),
    }
}

fn handle_date_range(column: &str, range: &DateRangeParam) -> Option<SqlFragment> {
    SqlFragment::all(
        range
            .bounds
            .iter()
            .map(|bound| DateHandler::build_sql(column, bound)),
    )
}
