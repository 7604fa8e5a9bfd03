//! Jira REST (v2) implementation of [`IssueTracker`].

use super::{
    FieldDef, IssueTracker, NamedEntity, NewComponent, NewIssueLink, NewVersion, Project,
    RemoteAttachment, RemoteComment, RemoteIssue, TrackerError, UserRef,
};
use async_trait::async_trait;
use base64::Engine;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Jira client authenticated with basic auth (user + API token).
pub struct JiraClient {
    api: Url,
    auth_header: String,
    client: reqwest::Client,
}

impl JiraClient {
    /// Builds a client for `base_url` (e.g. `https://example.atlassian.net`).
    ///
    /// `timeout` bounds every HTTP exchange at the transport level.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError`] if the URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(
        base_url: &str,
        user: &str,
        token: &str,
        timeout: Duration,
    ) -> Result<Self, TrackerError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            base.set_path(&format!("{}/", base.path()));
        }
        let api = base.join("rest/api/2/")?;

        let creds = format!("{user}:{token}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(creds);

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api,
            auth_header: format!("Basic {encoded}"),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, TrackerError> {
        Ok(self.api.join(path)?)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, TrackerError> {
        let response = request
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TrackerError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TrackerError> {
        debug!(url = %url, "GET");
        let response = self.send(self.client.get(url)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &impl serde::Serialize,
    ) -> Result<T, TrackerError> {
        debug!(url = %url, "POST");
        let response = self.send(self.client.post(url).json(body)).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Jira error payload: `{"errorMessages": [...], "errors": {"field": "msg"}}`.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: Map<String, Value>,
}

/// Flattens a Jira error payload into one line, falling back to the raw body.
fn error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return body.trim().to_string();
    };

    let mut parts = parsed.error_messages;
    parts.extend(parsed.errors.iter().map(|(field, message)| match message {
        Value::String(text) => format!("{field}: {text}"),
        other => format!("{field}: {other}"),
    }));

    if parts.is_empty() {
        body.trim().to_string()
    } else {
        parts.join("; ")
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn project(&self, key: &str) -> Result<Project, TrackerError> {
        self.get_json(self.endpoint(&format!("project/{key}"))?).await
    }

    async fn find_issue(&self, key: &str) -> Result<RemoteIssue, TrackerError> {
        let mut url = self.endpoint(&format!("issue/{key}"))?;
        url.query_pairs_mut()
            .append_pair("fields", "*all")
            .append_pair("properties", "description");
        self.get_json(url).await
    }

    async fn update_issue(
        &self,
        key: &str,
        fields: &Map<String, Value>,
        notify_users: bool,
    ) -> Result<(), TrackerError> {
        let mut url = self.endpoint(&format!("issue/{key}"))?;
        url.query_pairs_mut()
            .append_pair("notifyUsers", if notify_users { "true" } else { "false" });
        debug!(url = %url, "PUT");
        self.send(self.client.put(url).json(&json!({ "fields": fields })))
            .await?;
        Ok(())
    }

    async fn list_issue_types(&self) -> Result<Vec<NamedEntity>, TrackerError> {
        self.get_json(self.endpoint("issuetype")?).await
    }

    async fn list_fields(&self) -> Result<Vec<FieldDef>, TrackerError> {
        self.get_json(self.endpoint("field")?).await
    }

    async fn list_components(&self, project: &str) -> Result<Vec<NamedEntity>, TrackerError> {
        self.get_json(self.endpoint(&format!("project/{project}/components"))?)
            .await
    }

    async fn list_priorities(&self) -> Result<Vec<NamedEntity>, TrackerError> {
        self.get_json(self.endpoint("priority")?).await
    }

    async fn list_versions(&self, project: &str) -> Result<Vec<NamedEntity>, TrackerError> {
        self.get_json(self.endpoint(&format!("project/{project}/versions"))?)
            .await
    }

    async fn list_statuses(&self) -> Result<Vec<NamedEntity>, TrackerError> {
        self.get_json(self.endpoint("status")?).await
    }

    async fn create_component(&self, body: &NewComponent) -> Result<NamedEntity, TrackerError> {
        self.post_json(self.endpoint("component")?, body).await
    }

    async fn create_version(&self, body: &NewVersion) -> Result<NamedEntity, TrackerError> {
        self.post_json(self.endpoint("version")?, body).await
    }

    async fn create_link(&self, body: &NewIssueLink) -> Result<(), TrackerError> {
        let url = self.endpoint("issueLink")?;
        debug!(url = %url, "POST");
        self.send(self.client.post(url).json(body)).await?;
        Ok(())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<RemoteComment, TrackerError> {
        self.post_json(
            self.endpoint(&format!("issue/{key}/comment"))?,
            &json!({ "body": body }),
        )
        .await
    }

    async fn update_comment(
        &self,
        key: &str,
        comment_id: &str,
        body: &str,
    ) -> Result<(), TrackerError> {
        let url = self.endpoint(&format!("issue/{key}/comment/{comment_id}"))?;
        debug!(url = %url, "PUT");
        self.send(self.client.put(url).json(&json!({ "body": body })))
            .await?;
        Ok(())
    }

    async fn add_attachment(
        &self,
        key: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Vec<RemoteAttachment>, TrackerError> {
        let url = self.endpoint(&format!("issue/{key}/attachments"))?;
        debug!(url = %url, filename, "POST multipart");
        let form = Form::new().part("file", Part::bytes(content).file_name(filename.to_string()));
        let response = self
            .send(
                self.client
                    .post(url)
                    .header("X-Atlassian-Token", "no-check")
                    .multipart(form),
            )
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn delete_attachment(&self, attachment_id: &str) -> Result<(), TrackerError> {
        let url = self.endpoint(&format!("attachment/{attachment_id}"))?;
        debug!(url = %url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn user_by_account_id(&self, account_id: &str) -> Result<UserRef, TrackerError> {
        let mut url = self.endpoint("user")?;
        url.query_pairs_mut().append_pair("accountId", account_id);
        self.get_json(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_api_root_with_or_without_trailing_slash() {
        let plain = JiraClient::new("https://x.example.com", "u", "t", Duration::from_secs(5)).unwrap();
        let slashed =
            JiraClient::new("https://x.example.com/", "u", "t", Duration::from_secs(5)).unwrap();
        let nested =
            JiraClient::new("https://x.example.com/jira", "u", "t", Duration::from_secs(5)).unwrap();

        assert_eq!(plain.api.as_str(), "https://x.example.com/rest/api/2/");
        assert_eq!(slashed.api.as_str(), "https://x.example.com/rest/api/2/");
        assert_eq!(nested.api.as_str(), "https://x.example.com/jira/rest/api/2/");
    }

    #[test]
    fn encodes_basic_auth_header() {
        let client = JiraClient::new("https://x.example.com", "bot", "secret", Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.auth_header, "Basic Ym90OnNlY3JldA==");
    }

    #[test]
    fn flattens_jira_error_payloads() {
        let body = r#"{"errorMessages":["Issue does not exist"],"errors":{"priority":"invalid"}}"#;
        assert_eq!(
            error_message(body),
            "Issue does not exist; priority: invalid"
        );
    }

    #[test]
    fn keeps_non_json_error_bodies() {
        assert_eq!(error_message("  Bad Gateway \n"), "Bad Gateway");
    }
}
