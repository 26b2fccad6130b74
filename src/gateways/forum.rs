//! Forum gateway: posting the reservation reply.
//!
//! The trait is the seam for testing; `DiscourseClient` is the production
//! implementation over the Discourse REST API.

use std::future::Future;
use std::time::Duration;

use serde_json::json;
use tracing::debug;

use super::error::GatewayError;
use crate::types::TopicId;

/// Posts replies on the forum.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct MockForum {
///     posts: Mutex<Vec<(TopicId, String)>>,
/// }
///
/// impl ForumGateway for MockForum {
///     async fn create_post(&self, topic: TopicId, body: String) -> Result<(), GatewayError> {
///         self.posts.lock().unwrap().push((topic, body));
///         Ok(())
///     }
/// }
/// ```
pub trait ForumGateway {
    /// Posts `body` as a reply on `topic`.
    fn create_post(
        &self,
        topic: TopicId,
        body: String,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;
}

impl<T: ForumGateway + Send + Sync> ForumGateway for std::sync::Arc<T> {
    fn create_post(
        &self,
        topic: TopicId,
        body: String,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send {
        (**self).create_post(topic, body)
    }
}

/// A Discourse API client scoped to one forum instance.
#[derive(Clone)]
pub struct DiscourseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_username: String,
}

impl DiscourseClient {
    /// Creates a client for the forum at `base_url` (no trailing slash),
    /// with a bounded per-request timeout.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        api_username: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::from_reqwest("failed to build forum HTTP client", e))?;
        Ok(DiscourseClient {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            api_username: api_username.into(),
        })
    }

    /// Returns the forum base URL (used for composing topic hyperlinks).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl std::fmt::Debug for DiscourseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscourseClient")
            .field("base_url", &self.base_url)
            .field("api_username", &self.api_username)
            .finish_non_exhaustive()
    }
}

impl ForumGateway for DiscourseClient {
    async fn create_post(&self, topic: TopicId, body: String) -> Result<(), GatewayError> {
        let url = format!("{}/posts.json", self.base_url);
        debug!(topic_id = %topic, "posting reservation reply");

        let response = self
            .http
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("Api-Username", &self.api_username)
            .json(&json!({
                "topic_id": topic.as_u64(),
                "raw": body,
            }))
            .send()
            .await
            .map_err(|e| GatewayError::from_reqwest("forum post request failed", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::from_status(
                format!("forum rejected reply on topic {}", topic),
                status.as_u16(),
            ));
        }
        Ok(())
    }
}
