//! Minimal field-level changes between a desired and a fetched issue.
//!
//! [`compute_diff`] is pure: a field ends up in the [`FieldDiff`] exactly
//! when its desired value does not match what the tracker returned. Once
//! the diff is applied, computing it again against the updated issue
//! yields an empty diff.

mod desired;
mod state;

pub use desired::Desired;
pub use state::{DesiredState, ResolvedRefs, DEFAULT_SUMMARY};

use crate::tracker::IssueFields;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Field id to new value; `None` clears the field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldDiff {
    changes: BTreeMap<String, Option<Value>>,
}

impl FieldDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn contains(&self, field_id: &str) -> bool {
        self.changes.contains_key(field_id)
    }

    /// The change for one field: `Some(None)` means "clear".
    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<Option<&Value>> {
        self.changes.get(field_id).map(Option::as_ref)
    }

    pub fn field_ids(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// The `fields` object of an update request; cleared fields become `null`.
    #[must_use]
    pub fn to_request_fields(&self) -> Map<String, Value> {
        self.changes
            .iter()
            .map(|(id, value)| (id.clone(), value.clone().unwrap_or(Value::Null)))
            .collect()
    }
}

/// Compares every desired field against the fetched issue.
#[must_use]
pub fn compute_diff(desired: &DesiredState, current: &IssueFields) -> FieldDiff {
    let changes = desired
        .iter()
        .filter(|(id, want)| !want.matches(current.get(id)))
        .map(|(id, want)| (id.to_string(), want.to_json()))
        .collect();
    FieldDiff { changes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::UserRef;
    use chrono::{TimeZone, Utc};
    use proptest::collection::{btree_map, btree_set};
    use proptest::option;
    use proptest::prelude::*;
    use serde_json::json;

    fn fields(value: Value) -> IssueFields {
        serde_json::from_value(value).unwrap()
    }

    fn apply(diff: &FieldDiff, current: &mut IssueFields) {
        for (id, value) in diff.to_request_fields() {
            current.values.insert(id, value);
        }
    }

    fn desired_value() -> impl Strategy<Value = Desired> {
        prop_oneof![
            option::of("[a-z ]{0,8}").prop_map(Desired::text),
            option::of(-1000_i32..1000)
                .prop_map(|n| Desired::Number(n.map(f64::from).filter(|n| *n != 0.0))),
            option::of("[0-9]{1,3}").prop_map(Desired::Reference),
            option::of("[0-9]{1,3}").prop_map(Desired::ReferenceArray),
            option::of((option::of("[a-f0-9]{4}"), option::of("[a-z]{1,6}"))).prop_map(|user| {
                Desired::Identity(user.map(|(account_id, name)| UserRef { account_id, name }))
            }),
            option::of("[a-z]{1,6}").prop_map(|v| Desired::choice(v.as_deref())),
            btree_set("[a-z]{1,4}", 0..4).prop_map(Desired::Labels),
            option::of(0_i64..2_000_000_000)
                .prop_map(|s| Desired::Date(s.map(|s| Utc.timestamp_opt(s, 0).unwrap()))),
        ]
    }

    fn remote_value() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            "[a-z ]{0,8}".prop_map(Value::from),
            (-5_i32..5).prop_map(Value::from),
            "[0-9]{1,3}".prop_map(|id| json!({ "id": id })),
            proptest::collection::vec("[0-9]{1,3}", 0..3)
                .prop_map(|ids| json!(ids.iter().map(|id| json!({ "id": id })).collect::<Vec<_>>())),
            "[a-z]{1,6}".prop_map(|v| json!({ "value": v })),
            proptest::collection::vec("[a-z]{1,4}", 0..4).prop_map(|l| json!(l)),
            "[a-f0-9]{4}".prop_map(|a| json!({ "accountId": a })),
        ]
    }

    fn field_ids() -> impl Strategy<Value = String> {
        "[a-c]"
    }

    proptest! {
        #[test]
        fn applying_a_diff_makes_the_next_diff_empty(
            wanted in btree_map(field_ids(), desired_value(), 0..4),
            existing in btree_map(field_ids(), remote_value(), 0..4),
        ) {
            let mut desired = DesiredState::new();
            for (id, value) in wanted {
                desired.set(id, value);
            }
            let mut current = IssueFields::default();
            current.values.extend(existing);

            let diff = compute_diff(&desired, &current);
            apply(&diff, &mut current);

            prop_assert!(compute_diff(&desired, &current).is_empty());
        }

        #[test]
        fn diff_contains_exactly_the_mismatched_fields(
            wanted in btree_map(field_ids(), desired_value(), 0..4),
            existing in btree_map(field_ids(), remote_value(), 0..4),
        ) {
            let mut desired = DesiredState::new();
            for (id, value) in wanted {
                desired.set(id, value);
            }
            let mut current = IssueFields::default();
            current.values.extend(existing);

            let diff = compute_diff(&desired, &current);

            for (id, want) in desired.iter() {
                prop_assert_eq!(diff.contains(id), !want.matches(current.get(id)));
            }
            prop_assert!(diff.field_ids().all(|id| desired.get(id).is_some()));
        }
    }

    #[test]
    fn only_priority_changes_when_it_resolves_differently() {
        let mut desired = DesiredState::new();
        desired.set("summary", Desired::Text(Some("Crash in parser".to_string())));
        desired.set("priority", Desired::Reference(Some("3".to_string())));

        let current = fields(json!({
            "summary": "Crash in parser",
            "priority": { "id": "2", "name": "minor" }
        }));

        let diff = compute_diff(&desired, &current);

        assert_eq!(diff.len(), 1);
        assert_eq!(
            Value::Object(diff.to_request_fields()),
            json!({ "priority": { "id": "3" } })
        );
    }

    #[test]
    fn clears_fields_only_when_set_remotely() {
        let mut desired = DesiredState::new();
        desired.set("priority", Desired::Reference(None));
        desired.set("security", Desired::Reference(None));
        desired.set("labels", Desired::labels(None));

        let current = fields(json!({
            "priority": { "id": "2" },
            "security": null,
            "labels": []
        }));

        let diff = compute_diff(&desired, &current);

        assert_eq!(diff.field_ids().collect::<Vec<_>>(), vec!["priority"]);
        assert_eq!(diff.get("priority"), Some(None));
        assert_eq!(
            Value::Object(diff.to_request_fields()),
            json!({ "priority": null })
        );
    }

    #[test]
    fn sets_security_level_for_sensitive_tickets() {
        let mut desired = DesiredState::new();
        desired.set("security", Desired::Reference(Some("10000".to_string())));

        let unset = compute_diff(&desired, &fields(json!({ "security": null })));
        assert_eq!(unset.get("security"), Some(Some(&json!({ "id": "10000" }))));

        let other = compute_diff(&desired, &fields(json!({ "security": { "id": "10001" } })));
        assert!(other.contains("security"));

        let same = compute_diff(&desired, &fields(json!({ "security": { "id": "10000" } })));
        assert!(same.is_empty());
    }
}
