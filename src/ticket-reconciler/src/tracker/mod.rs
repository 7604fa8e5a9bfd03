//! Remote issue tracker access.
//!
//! The engine only talks to the tracker through [`IssueTracker`]; the
//! [`JiraClient`] is the production implementation. Every call made by the
//! engine goes through [`with_timeout`] so a hung request can never stall
//! the batch indefinitely.

mod error;
mod jira;
mod types;

pub use error::TrackerError;
pub use jira::JiraClient;
pub use types::{
    CommentPage, FieldDef, IssueFields, IssueLink, IssueRef, LinkType, NamedEntity, NewComponent,
    NewIssueLink, NewVersion, Project, RemoteAttachment, RemoteComment, RemoteIssue, UserRef,
};

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::future::Future;
use std::time::Duration;

/// Operations the reconciliation engine needs from the remote tracker.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Looks up a project by key.
    async fn project(&self, key: &str) -> Result<Project, TrackerError>;

    /// Fetches an issue with its description, comments, attachments and links.
    async fn find_issue(&self, key: &str) -> Result<RemoteIssue, TrackerError>;

    /// Writes a set of field changes in one request.
    async fn update_issue(
        &self,
        key: &str,
        fields: &Map<String, Value>,
        notify_users: bool,
    ) -> Result<(), TrackerError>;

    async fn list_issue_types(&self) -> Result<Vec<NamedEntity>, TrackerError>;
    async fn list_fields(&self) -> Result<Vec<FieldDef>, TrackerError>;
    async fn list_components(&self, project: &str) -> Result<Vec<NamedEntity>, TrackerError>;
    async fn list_priorities(&self) -> Result<Vec<NamedEntity>, TrackerError>;
    async fn list_versions(&self, project: &str) -> Result<Vec<NamedEntity>, TrackerError>;
    async fn list_statuses(&self) -> Result<Vec<NamedEntity>, TrackerError>;

    async fn create_component(&self, body: &NewComponent) -> Result<NamedEntity, TrackerError>;
    async fn create_version(&self, body: &NewVersion) -> Result<NamedEntity, TrackerError>;
    async fn create_link(&self, body: &NewIssueLink) -> Result<(), TrackerError>;

    async fn add_comment(&self, key: &str, body: &str) -> Result<RemoteComment, TrackerError>;

    /// Replaces a comment body. The author is never changed.
    async fn update_comment(
        &self,
        key: &str,
        comment_id: &str,
        body: &str,
    ) -> Result<(), TrackerError>;

    /// Uploads one file; the tracker answers with the attachments it created.
    async fn add_attachment(
        &self,
        key: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Vec<RemoteAttachment>, TrackerError>;

    async fn delete_attachment(&self, attachment_id: &str) -> Result<(), TrackerError>;

    async fn user_by_account_id(&self, account_id: &str) -> Result<UserRef, TrackerError>;
}

/// Runs a tracker call, failing with [`TrackerError::Timeout`] once `limit` elapses.
///
/// # Errors
///
/// Returns the call's own error, or [`TrackerError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, TrackerError>
where
    F: Future<Output = Result<T, TrackerError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| TrackerError::Timeout(limit))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_fast_calls() {
        let result = with_timeout(Duration::from_secs(1), async { Ok::<_, TrackerError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_slow_calls() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, TrackerError>(())
        })
        .await;

        assert!(matches!(result, Err(TrackerError::Timeout(d)) if d == Duration::from_millis(50)));
    }
}
