//! Date parameter SQL handler.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::types::{DateParam, DatePrecision, SearchPrefix};

use super::super::criteria::{SqlFragment, SqlParam};

/// Formats a timestamp the way it is stored, so that stored values and
/// bounds compare correctly as text.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Handles date parameter SQL generation.
pub struct DateHandler;

impl DateHandler {
    /// Builds SQL comparing `column` with a date parameter.
    ///
    /// Comparisons respect the precision of the literal: `eq2024-01-15`
    /// matches the whole day, `gt2024-01` matches from February onwards.
    pub fn build_sql(column: &str, param: &DateParam) -> SqlFragment {
        let (start, end) = param.range();

        match param.prefix {
            SearchPrefix::Eq => Self::between(column, start, end),
            SearchPrefix::Ne => SqlFragment::with_params(
                format!("({} < ? OR {} >= ?)", column, column),
                vec![Self::bound(start), Self::bound(end)],
            ),
            SearchPrefix::Gt | SearchPrefix::Sa => Self::compare(column, ">=", end),
            SearchPrefix::Lt | SearchPrefix::Eb => Self::compare(column, "<", start),
            SearchPrefix::Ge => Self::compare(column, ">=", start),
            SearchPrefix::Le => Self::compare(column, "<", end),
            SearchPrefix::Ap => {
                let margin = Self::approximation_margin(param.precision);
                Self::between(column, start - margin, end + margin)
            }
        }
    }

    fn between(column: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> SqlFragment {
        SqlFragment::with_params(
            format!("{} >= ? AND {} < ?", column, column),
            vec![Self::bound(start), Self::bound(end)],
        )
    }

    fn compare(column: &str, op: &str, value: DateTime<Utc>) -> SqlFragment {
        SqlFragment::with_params(
            format!("{} {} ?", column, op),
            vec![Self::bound(value)],
        )
    }

    fn bound(value: DateTime<Utc>) -> SqlParam {
        SqlParam::string(format_timestamp(&value))
    }

    fn approximation_margin(precision: DatePrecision) -> Duration {
        match precision {
            DatePrecision::Year => Duration::days(365),
            DatePrecision::Month => Duration::days(30),
            DatePrecision::Day => Duration::days(1),
            DatePrecision::Hour => Duration::hours(1),
            DatePrecision::Minute => Duration::minutes(10),
            DatePrecision::Second | DatePrecision::Millisecond => Duration::seconds(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn param(s: &str) -> DateParam {
        DateParam::parse(s).unwrap()
    }

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2017, 1, 12, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2017-01-12T00:00:00.000000Z");
    }

    #[test]
    fn test_date_eq_day() {
        let frag = DateHandler::build_sql("c.onset_date", &param("eq2017-01-12"));

        assert_eq!(frag.sql, "c.onset_date >= ? AND c.onset_date < ?");
        assert_eq!(
            frag.params,
            vec![
                SqlParam::string("2017-01-12T00:00:00.000000Z"),
                SqlParam::string("2017-01-13T00:00:00.000000Z"),
            ]
        );
    }

    #[test]
    fn test_date_gt_excludes_whole_interval() {
        let frag = DateHandler::build_sql("c.onset_date", &param("gt2017-01"));

        assert_eq!(frag.sql, "c.onset_date >= ?");
        assert_eq!(
            frag.params,
            vec![SqlParam::string("2017-02-01T00:00:00.000000Z")]
        );
    }

    #[test]
    fn test_date_le_includes_whole_interval() {
        let frag = DateHandler::build_sql("c.onset_date", &param("le2017-01-12"));

        assert_eq!(frag.sql, "c.onset_date < ?");
        assert_eq!(
            frag.params,
            vec![SqlParam::string("2017-01-13T00:00:00.000000Z")]
        );
    }

    #[test]
    fn test_date_ne() {
        let frag = DateHandler::build_sql("c.onset_date", &param("ne2017"));

        assert!(frag.sql.contains(" OR "));
        assert_eq!(frag.params.len(), 2);
    }

    #[test]
    fn test_date_ap_widens_range() {
        let frag = DateHandler::build_sql("c.onset_date", &param("ap2017-01-12"));

        assert_eq!(
            frag.params,
            vec![
                SqlParam::string("2017-01-11T00:00:00.000000Z"),
                SqlParam::string("2017-01-14T00:00:00.000000Z"),
            ]
        );
    }
}
