//! Desired remote field values and how each kind compares.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};
use std::collections::BTreeSet;

use crate::tracker::UserRef;

/// The value a remote field should hold. `None` members mean "unset".
///
/// Each variant carries its own comparison rule, see [`Desired::matches`].
#[derive(Debug, Clone, PartialEq)]
pub enum Desired {
    /// Plain text, compared verbatim.
    Text(Option<String>),
    /// A number, compared numerically.
    Number(Option<f64>),
    /// `{id}` object, compared by id.
    Reference(Option<String>),
    /// Single `{id}` stored as a one-element array.
    ///
    /// Matches only when the remote array holds exactly that element, so
    /// surplus remote values get collapsed.
    ReferenceArray(Option<String>),
    /// A user, compared by account id (or name, for users without one).
    Identity(Option<UserRef>),
    /// `{value}` option, compared by value.
    Choice(Option<String>),
    /// Sorted, deduplicated label set.
    Labels(BTreeSet<String>),
    /// A timestamp, compared by calendar day.
    Date(Option<DateTime<Utc>>),
}

impl Desired {
    /// Text value with empty strings treated as unset.
    #[must_use]
    pub fn text(value: Option<String>) -> Self {
        Self::Text(value.filter(|s| !s.is_empty()))
    }

    /// Option value with blank strings treated as unset.
    #[must_use]
    pub fn choice(value: Option<&str>) -> Self {
        Self::Choice(value.filter(|s| !s.trim().is_empty()).map(str::to_string))
    }

    /// Labels from a free-text keyword list split on commas and spaces.
    #[must_use]
    pub fn labels(keywords: Option<&str>) -> Self {
        Self::Labels(
            keywords
                .unwrap_or("")
                .split([',', ' '])
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns true if the remote value already satisfies this one.
    ///
    /// `current` is `None` when the field is absent or `null`.
    #[must_use]
    pub fn matches(&self, current: Option<&Value>) -> bool {
        let current = current.filter(|v| !is_blank(v));
        match (self, current) {
            (Self::Text(None), c)
            | (Self::Number(None), c)
            | (Self::Reference(None), c)
            | (Self::ReferenceArray(None), c)
            | (Self::Identity(None), c)
            | (Self::Choice(None), c)
            | (Self::Date(None), c) => c.is_none(),

            (_, None) => matches!(self, Self::Labels(labels) if labels.is_empty()),

            (Self::Text(Some(want)), Some(c)) => c.as_str() == Some(want.as_str()),
            (Self::Number(Some(want)), Some(c)) => c.as_f64() == Some(*want),
            (Self::Reference(Some(want)), Some(c)) => member(c, "id") == Some(want.as_str()),
            (Self::ReferenceArray(Some(want)), Some(c)) => match c.as_array() {
                Some(items) => items.len() == 1 && member(&items[0], "id") == Some(want.as_str()),
                None => false,
            },
            (Self::Identity(Some(want)), Some(c)) => match &want.account_id {
                Some(account_id) => member(c, "accountId") == Some(account_id.as_str()),
                None => member(c, "name") == want.name.as_deref(),
            },
            (Self::Choice(Some(want)), Some(c)) => member(c, "value") == Some(want.as_str()),
            (Self::Labels(want), Some(c)) => {
                let have: BTreeSet<&str> = c
                    .as_array()
                    .map(|items| items.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                have.len() == want.len() && want.iter().all(|w| have.contains(w.as_str()))
            }
            (Self::Date(Some(want)), Some(c)) => {
                c.as_str().and_then(parse_remote_date) == Some(want.date_naive())
            }
        }
    }

    /// Wire value written by an update; `None` clears the field.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Text(v) => v.as_ref().map(|s| json!(s)),
            Self::Number(v) => v.map(|n| json!(n)),
            Self::Reference(v) => v.as_ref().map(|id| json!({ "id": id })),
            Self::ReferenceArray(v) => v.as_ref().map(|id| json!([{ "id": id }])),
            Self::Identity(v) => v.as_ref().map(|user| json!(user)),
            Self::Choice(v) => v.as_ref().map(|value| json!({ "value": value })),
            Self::Labels(labels) if labels.is_empty() => None,
            Self::Labels(labels) => Some(json!(labels)),
            Self::Date(v) => v.map(|t| json!(t.to_rfc3339_opts(SecondsFormat::Millis, true))),
        }
    }
}

/// Null, empty strings and empty arrays all count as "unset" remotely.
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn member<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Parses the tracker's timestamp formats (`…+0000` as well as RFC 3339).
fn parse_remote_date(text: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .ok()
        .map(|t| t.with_timezone(&Utc).date_naive())
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unset_matches_only_blank_values() {
        let unset = Desired::Text(None);
        assert!(unset.matches(None));
        assert!(unset.matches(Some(&json!(""))));
        assert!(unset.matches(Some(&Value::Null)));
        assert!(!unset.matches(Some(&json!("x"))));
    }

    #[test]
    fn references_compare_by_id() {
        let want = Desired::Reference(Some("3".to_string()));
        assert!(want.matches(Some(&json!({ "id": "3", "name": "major" }))));
        assert!(!want.matches(Some(&json!({ "id": "4" }))));
        assert!(!want.matches(None));
    }

    #[test]
    fn reference_arrays_collapse_surplus_values() {
        let want = Desired::ReferenceArray(Some("7".to_string()));
        assert!(want.matches(Some(&json!([{ "id": "7" }]))));
        assert!(!want.matches(Some(&json!([{ "id": "7" }, { "id": "8" }]))));

        let unset = Desired::ReferenceArray(None);
        assert!(unset.matches(Some(&json!([]))));
        assert!(!unset.matches(Some(&json!([{ "id": "7" }]))));
    }

    #[test]
    fn identities_compare_by_account_id_not_display_name() {
        let want = Desired::Identity(Some(UserRef {
            account_id: Some("abc".to_string()),
            name: Some("Steven".to_string()),
        }));
        assert!(want.matches(Some(&json!({ "accountId": "abc", "displayName": "S. L." }))));
        assert!(!want.matches(Some(&json!({ "accountId": "def", "name": "Steven" }))));
    }

    #[test]
    fn labels_ignore_order_and_duplicates() {
        let want = Desired::labels(Some("b a, a  c"));
        assert!(want.matches(Some(&json!(["c", "b", "a"]))));
        assert!(!want.matches(Some(&json!(["a", "b"]))));
        assert_eq!(want.to_json(), Some(json!(["a", "b", "c"])));

        let none = Desired::labels(Some("  "));
        assert!(none.matches(None));
        assert_eq!(none.to_json(), None);
    }

    #[test]
    fn dates_compare_by_day() {
        let want = Desired::Date(Some(Utc.with_ymd_and_hms(2018, 6, 13, 21, 57, 5).unwrap()));
        assert!(want.matches(Some(&json!("2018-06-13T08:00:00.000+0000"))));
        assert!(want.matches(Some(&json!("2018-06-13T21:57:05.000Z"))));
        assert!(!want.matches(Some(&json!("2018-06-14T00:00:00.000+0000"))));
        assert_eq!(want.to_json(), Some(json!("2018-06-13T21:57:05.000Z")));
    }

    #[test]
    fn choices_compare_by_value() {
        let want = Desired::choice(Some("design"));
        assert!(want.matches(Some(&json!({ "value": "design", "id": "1" }))));
        assert_eq!(want.to_json(), Some(json!({ "value": "design" })));
        assert_eq!(Desired::choice(Some(" ")), Desired::Choice(None));
    }
}
