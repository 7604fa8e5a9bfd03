//! Wire types exchanged with the remote tracker.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A remote user reference.
///
/// Serializes to `{"accountId": ..., "name": ...}`, which is also the shape
/// identity fields take in an update request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Any remote entity addressed by name and id (component, version, ...).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedEntity {
    pub id: String,
    pub name: String,
}

/// A field from the remote schema listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDef {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
}

impl FieldDef {
    /// Identifier used in update requests: the key when present, else the id.
    #[must_use]
    pub fn update_id(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.id)
    }
}

/// The remote project.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
}

/// A remote issue as returned by a lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteIssue {
    pub id: String,
    pub key: String,
    pub fields: IssueFields,
}

/// The field bag of a remote issue.
///
/// Comments, attachments and links are typed; every other field stays a
/// raw JSON value and is compared by the diff engine.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub comment: Option<CommentPage>,
    #[serde(default)]
    pub attachment: Option<Vec<RemoteAttachment>>,
    #[serde(default)]
    pub issuelinks: Option<Vec<IssueLink>>,
    #[serde(flatten)]
    pub values: Map<String, Value>,
}

impl IssueFields {
    /// Returns a raw field value, treating JSON `null` as absent.
    #[must_use]
    pub fn get(&self, field_id: &str) -> Option<&Value> {
        self.values.get(field_id).filter(|v| !v.is_null())
    }

    /// Remote comments in display order.
    #[must_use]
    pub fn comments(&self) -> &[RemoteComment] {
        self.comment.as_ref().map_or(&[], |page| page.comments.as_slice())
    }

    /// Remote attachments.
    #[must_use]
    pub fn attachments(&self) -> &[RemoteAttachment] {
        self.attachment.as_deref().unwrap_or(&[])
    }

    /// Remote issue links.
    #[must_use]
    pub fn links(&self) -> &[IssueLink] {
        self.issuelinks.as_deref().unwrap_or(&[])
    }
}

/// The embedded comment listing of an issue.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<RemoteComment>,
}

/// A remote comment.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteComment {
    pub id: String,
    #[serde(default)]
    pub body: String,
}

/// A remote attachment.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAttachment {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Link type descriptor, used both in configuration and in link requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkType {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LinkType {
    /// Returns true if `other` designates the same link type.
    #[must_use]
    pub fn matches(&self, other: &LinkType) -> bool {
        match (&self.id, &other.id) {
            (Some(a), Some(b)) => a == b,
            _ => self.name.is_some() && self.name == other.name,
        }
    }
}

/// A reference to an issue by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    pub key: String,
}

/// An existing link between two issues.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    #[serde(default)]
    pub inward_issue: Option<IssueRef>,
    #[serde(default)]
    pub outward_issue: Option<IssueRef>,
}

impl IssueLink {
    /// Key of the issue at the other end of the link.
    #[must_use]
    pub fn other_key(&self) -> Option<&str> {
        self.outward_issue
            .as_ref()
            .or(self.inward_issue.as_ref())
            .map(|issue| issue.key.as_str())
    }
}

/// Request body for a new link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIssueLink {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    pub inward_issue: IssueRef,
    pub outward_issue: IssueRef,
}

/// Request body for a new component.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComponent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub project: String,
    pub project_id: String,
}

/// Request body for a new version.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewVersion {
    pub name: String,
    pub description: String,
    pub project: String,
    pub project_id: String,
    pub released: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    pub overdue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn splits_typed_and_raw_fields() {
        let issue: RemoteIssue = serde_json::from_value(json!({
            "id": "10001",
            "key": "ICU-1",
            "fields": {
                "summary": "hello",
                "security": null,
                "comment": { "comments": [ { "id": "1", "body": "first" } ] },
                "attachment": [ { "id": "7", "filename": "a.txt", "size": 12 } ],
                "issuelinks": [
                    { "type": { "id": "3" }, "outwardIssue": { "key": "ICU-2" } }
                ]
            }
        }))
        .unwrap();

        assert_eq!(issue.fields.get("summary"), Some(&json!("hello")));
        assert_eq!(issue.fields.get("security"), None);
        assert_eq!(issue.fields.comments()[0].body, "first");
        assert_eq!(issue.fields.attachments()[0].size, 12);
        assert_eq!(issue.fields.links()[0].other_key(), Some("ICU-2"));
    }

    #[test]
    fn missing_collections_are_empty() {
        let fields: IssueFields = serde_json::from_value(json!({ "attachment": null })).unwrap();
        assert!(fields.comments().is_empty());
        assert!(fields.attachments().is_empty());
        assert!(fields.links().is_empty());
    }

    #[test]
    fn link_types_match_by_id_then_name() {
        let by_id = LinkType {
            id: Some("3".to_string()),
            name: None,
        };
        let by_name = LinkType {
            id: None,
            name: Some("Relates".to_string()),
        };
        let both = LinkType {
            id: Some("3".to_string()),
            name: Some("Relates".to_string()),
        };

        assert!(by_id.matches(&both));
        assert!(by_name.matches(&both));
        assert!(!by_id.matches(&by_name));
    }

    #[test]
    fn user_ref_skips_missing_members() {
        let user = UserRef {
            account_id: Some("abc".to_string()),
            name: None,
        };
        assert_eq!(serde_json::to_value(&user).unwrap(), json!({ "accountId": "abc" }));
    }
}
