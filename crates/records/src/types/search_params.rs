//! Search parameter types.
//!
//! A search is described by a parameter set ([`ConditionSearchParams`],
//! [`AllergySearchParams`]) made of independently optional slots. Values
//! within one slot are ORed; distinct slots are ANDed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Comparison prefixes for date parameters.
///
/// See: https://build.fhir.org/search.html#prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchPrefix {
    /// Equal (default).
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
    /// Starts after.
    Sa,
    /// Ends before.
    Eb,
    /// Approximately equal.
    Ap,
}

impl fmt::Display for SearchPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchPrefix::Eq => write!(f, "eq"),
            SearchPrefix::Ne => write!(f, "ne"),
            SearchPrefix::Gt => write!(f, "gt"),
            SearchPrefix::Lt => write!(f, "lt"),
            SearchPrefix::Ge => write!(f, "ge"),
            SearchPrefix::Le => write!(f, "le"),
            SearchPrefix::Sa => write!(f, "sa"),
            SearchPrefix::Eb => write!(f, "eb"),
            SearchPrefix::Ap => write!(f, "ap"),
        }
    }
}

impl FromStr for SearchPrefix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eq" => Ok(SearchPrefix::Eq),
            "ne" => Ok(SearchPrefix::Ne),
            "gt" => Ok(SearchPrefix::Gt),
            "lt" => Ok(SearchPrefix::Lt),
            "ge" => Ok(SearchPrefix::Ge),
            "le" => Ok(SearchPrefix::Le),
            "sa" => Ok(SearchPrefix::Sa),
            "eb" => Ok(SearchPrefix::Eb),
            "ap" => Ok(SearchPrefix::Ap),
            _ => Err(format!("unknown search prefix: {}", s)),
        }
    }
}

impl SearchPrefix {
    /// Extracts a prefix from the beginning of a value string.
    ///
    /// Returns the prefix and the remaining value.
    pub fn extract(value: &str) -> (Self, &str) {
        if value.len() >= 2 && value.is_char_boundary(2) {
            let prefix = &value[..2];
            if let Ok(p) = prefix.parse() {
                return (p, &value[2..]);
            }
        }
        (SearchPrefix::Eq, value)
    }
}

/// Precision of a date search literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    /// Year only (e.g., "2024")
    Year,
    /// Year and month (e.g., "2024-01")
    Month,
    /// Full date (e.g., "2024-01-15")
    Day,
    /// Date and time to hours (e.g., "2024-01-15T10")
    Hour,
    /// Date and time to minutes (e.g., "2024-01-15T10:30")
    Minute,
    /// Date and time to seconds (e.g., "2024-01-15T10:30:00")
    Second,
    /// Full precision with milliseconds
    Millisecond,
}

impl DatePrecision {
    /// Parse precision from an ISO date string.
    pub fn from_date_string(s: &str) -> Self {
        // Remove the timezone suffix of the time part for length calculation
        let base = match s.split_once('T') {
            Some((date, time)) => {
                let time = time.split(['+', '-', 'Z']).next().unwrap_or(time);
                date.len() + 1 + time.len()
            }
            None => s.len(),
        };

        match base {
            4 => DatePrecision::Year,
            7 => DatePrecision::Month,
            10 => DatePrecision::Day,
            13 => DatePrecision::Hour,
            16 => DatePrecision::Minute,
            19 => DatePrecision::Second,
            _ => DatePrecision::Millisecond,
        }
    }

    /// Returns the exclusive end of the interval that starts at `start`.
    pub fn interval_end(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            DatePrecision::Year => start
                .checked_add_months(Months::new(12))
                .unwrap_or(start),
            DatePrecision::Month => start.checked_add_months(Months::new(1)).unwrap_or(start),
            DatePrecision::Day => start + Duration::days(1),
            DatePrecision::Hour => start + Duration::hours(1),
            DatePrecision::Minute => start + Duration::minutes(1),
            DatePrecision::Second => start + Duration::seconds(1),
            DatePrecision::Millisecond => start + Duration::milliseconds(1),
        }
    }
}

impl fmt::Display for DatePrecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatePrecision::Year => write!(f, "year"),
            DatePrecision::Month => write!(f, "month"),
            DatePrecision::Day => write!(f, "day"),
            DatePrecision::Hour => write!(f, "hour"),
            DatePrecision::Minute => write!(f, "minute"),
            DatePrecision::Second => write!(f, "second"),
            DatePrecision::Millisecond => write!(f, "millisecond"),
        }
    }
}

/// A single date comparison, e.g. `ge2020-01-01`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParam {
    pub prefix: SearchPrefix,
    /// Start of the interval denoted by the literal.
    pub value: DateTime<Utc>,
    pub precision: DatePrecision,
}

impl DateParam {
    /// Creates a day-precision parameter.
    pub fn day(prefix: SearchPrefix, date: NaiveDate) -> Self {
        Self {
            prefix,
            value: Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)),
            precision: DatePrecision::Day,
        }
    }

    /// Parses a prefixed date literal such as `eq2017-01-12` or `gt2020-03`.
    pub fn parse(s: &str) -> Result<Self, SearchError> {
        let (prefix, literal) = SearchPrefix::extract(s.trim());
        let precision = DatePrecision::from_date_string(literal);

        let value = parse_date_literal(literal, precision).ok_or_else(|| {
            SearchError::InvalidParameter {
                parameter: "date".to_string(),
                message: format!("cannot parse date literal '{}'", literal),
            }
        })?;

        Ok(Self {
            prefix,
            value,
            precision,
        })
    }

    /// The half-open interval `[start, end)` covered by the literal.
    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.value, self.precision.interval_end(self.value))
    }
}

fn parse_date_literal(literal: &str, precision: DatePrecision) -> Option<DateTime<Utc>> {
    let midnight = |date: NaiveDate| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN));

    match precision {
        DatePrecision::Year => {
            let year: i32 = literal.parse().ok()?;
            NaiveDate::from_ymd_opt(year, 1, 1).map(midnight)
        }
        DatePrecision::Month => {
            let year: i32 = literal.get(..4)?.parse().ok()?;
            let month: u32 = literal.get(5..7)?.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1).map(midnight)
        }
        DatePrecision::Day => NaiveDate::parse_from_str(literal, "%Y-%m-%d")
            .ok()
            .map(midnight),
        DatePrecision::Hour => {
            NaiveDateTime::parse_from_str(&format!("{}:00", literal), "%Y-%m-%dT%H:%M")
                .ok()
                .map(|dt| Utc.from_utc_datetime(&dt))
        }
        _ => DateTime::parse_from_rfc3339(literal)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                DateTime::parse_from_str(literal, "%Y-%m-%dT%H:%M%:z")
                    .map(|dt| dt.with_timezone(&Utc))
                    .ok()
            })
            .or_else(|| {
                ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(literal, fmt).ok())
                    .map(|dt| Utc.from_utc_datetime(&dt))
            }),
    }
}

/// Date comparisons that must all hold (e.g. `ge2020-01-01` and `lt2021-01-01`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRangeParam {
    pub bounds: Vec<DateParam>,
}

impl DateRangeParam {
    /// A range with a single comparison.
    pub fn single(param: DateParam) -> Self {
        Self {
            bounds: vec![param],
        }
    }

    /// Adds a comparison.
    pub fn and(mut self, param: DateParam) -> Self {
        self.bounds.push(param);
        self
    }

    /// Parses a range from prefixed literals.
    pub fn parse<'a>(literals: impl IntoIterator<Item = &'a str>) -> Result<Self, SearchError> {
        let bounds = literals
            .into_iter()
            .map(DateParam::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { bounds })
    }
}

/// A token value: a code with an optional code system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenParam {
    pub system: Option<String>,
    pub code: String,
}

impl TokenParam {
    /// A code with no system.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            system: None,
            code: code.into(),
        }
    }

    /// A code within a system.
    pub fn with_system(system: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            code: code.into(),
        }
    }

    /// Parses `code`, `system|code` or `|code`.
    pub fn parse(s: &str) -> Self {
        match s.split_once('|') {
            Some((system, code)) if !system.is_empty() => Self::with_system(system, code),
            Some((_, code)) => Self::new(code),
            None => Self::new(s),
        }
    }
}

/// Token values ORed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenOrListParam {
    pub values: Vec<TokenParam>,
}

impl TokenOrListParam {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token.
    pub fn add(mut self, token: TokenParam) -> Self {
        self.values.push(token);
        self
    }

    /// Builds a list of system-less codes.
    pub fn of_codes<'a>(codes: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            values: codes.into_iter().map(TokenParam::new).collect(),
        }
    }

    /// Returns true if the list has no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A reference to a patient, optionally qualified by one of its fields
/// (e.g. `subject.given=Horatio`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceParam {
    /// The field of the referenced patient to match on; `None` matches its UUID.
    pub chain: Option<String>,
    pub value: String,
}

impl ReferenceParam {
    /// A reference by id; a `Patient/` prefix is stripped.
    pub fn id(value: &str) -> Self {
        let id = value.rsplit('/').next().unwrap_or(value);
        Self {
            chain: None,
            value: id.to_string(),
        }
    }

    /// A reference qualified by a field of the referenced patient.
    pub fn chained(chain: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            chain: Some(chain.into()),
            value: value.into(),
        }
    }
}

/// References ORed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceOrListParam {
    pub values: Vec<ReferenceParam>,
}

impl ReferenceOrListParam {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a reference.
    pub fn add(mut self, reference: ReferenceParam) -> Self {
        self.values.push(reference);
        self
    }
}

/// OR-lists of references ANDed together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceAndListParam {
    pub values: Vec<ReferenceOrListParam>,
}

impl ReferenceAndListParam {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an OR-list.
    pub fn add(mut self, list: ReferenceOrListParam) -> Self {
        self.values.push(list);
        self
    }

    /// Shorthand for a single reference.
    pub fn of(reference: ReferenceParam) -> Self {
        Self::new().add(ReferenceOrListParam::new().add(reference))
    }
}

/// Search parameters for conditions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionSearchParams {
    pub patient: Option<ReferenceAndListParam>,
    pub subject: Option<ReferenceAndListParam>,
    pub code: Option<TokenOrListParam>,
    pub clinical_status: Option<TokenOrListParam>,
    pub onset_date: Option<DateRangeParam>,
    pub recorded_date: Option<DateRangeParam>,
}

impl ConditionSearchParams {
    /// A parameter set with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, param: ReferenceAndListParam) -> Self {
        self.patient = Some(param);
        self
    }

    pub fn with_subject(mut self, param: ReferenceAndListParam) -> Self {
        self.subject = Some(param);
        self
    }

    pub fn with_code(mut self, param: TokenOrListParam) -> Self {
        self.code = Some(param);
        self
    }

    pub fn with_clinical_status(mut self, param: TokenOrListParam) -> Self {
        self.clinical_status = Some(param);
        self
    }

    pub fn with_onset_date(mut self, param: DateRangeParam) -> Self {
        self.onset_date = Some(param);
        self
    }

    pub fn with_recorded_date(mut self, param: DateRangeParam) -> Self {
        self.recorded_date = Some(param);
        self
    }
}

/// Search parameters for allergies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllergySearchParams {
    pub patient: Option<ReferenceAndListParam>,
    pub category: Option<TokenOrListParam>,
    pub allergen: Option<TokenOrListParam>,
    pub severity: Option<TokenOrListParam>,
    pub manifestation: Option<TokenOrListParam>,
    pub clinical_status: Option<TokenOrListParam>,
}

impl AllergySearchParams {
    /// A parameter set with every slot empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_patient(mut self, param: ReferenceAndListParam) -> Self {
        self.patient = Some(param);
        self
    }

    pub fn with_category(mut self, param: TokenOrListParam) -> Self {
        self.category = Some(param);
        self
    }

    pub fn with_allergen(mut self, param: TokenOrListParam) -> Self {
        self.allergen = Some(param);
        self
    }

    pub fn with_severity(mut self, param: TokenOrListParam) -> Self {
        self.severity = Some(param);
        self
    }

    pub fn with_manifestation(mut self, param: TokenOrListParam) -> Self {
        self.manifestation = Some(param);
        self
    }

    pub fn with_clinical_status(mut self, param: TokenOrListParam) -> Self {
        self.clinical_status = Some(param);
        self
    }
}
