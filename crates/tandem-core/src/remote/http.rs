//! HTTP implementation of the remote store contract

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;

use crate::models::{Task, TaskChanges, TaskDraft, TaskId, UserId};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};

const HTTP_TIMEOUT_SECS: u64 = 10;

/// Remote store client over the Tandem REST API
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    auth_token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Create a client for the given API base URL.
    ///
    /// The URL must include a scheme; a trailing slash is stripped.
    pub fn new(base_url: impl Into<String>, auth_token: Option<String>) -> RemoteResult<Self> {
        let base_url = normalize_base_url(base_url.into())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|error| RemoteError::Network(error.to_string()))?;
        Ok(Self {
            base_url,
            auth_token,
            client,
        })
    }

    /// Probe the API health endpoint; used by clients to seed connectivity.
    pub async fn is_reachable(&self) -> bool {
        let url = format!("{}/v1/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&B>,
    ) -> RemoteResult<reqwest::Response> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                RemoteError::DeadlineExceeded(error.to_string())
            } else {
                RemoteError::Network(error.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

impl RemoteStore for HttpRemoteStore {
    async fn get_task(&self, id: &TaskId) -> RemoteResult<Option<Task>> {
        let path = format!("/v1/tasks/{id}");
        match self.send::<()>(reqwest::Method::GET, &path, None).await {
            Ok(response) => {
                let task = response
                    .json::<Task>()
                    .await
                    .map_err(|error| RemoteError::Invalid(error.to_string()))?;
                Ok(Some(task))
            }
            Err(RemoteError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn create_task(&self, draft: &TaskDraft) -> RemoteResult<Task> {
        let response = self
            .send(reqwest::Method::POST, "/v1/tasks", Some(draft))
            .await?;
        response
            .json::<Task>()
            .await
            .map_err(|error| RemoteError::Invalid(error.to_string()))
    }

    async fn update_task(&self, id: &TaskId, changes: &TaskChanges) -> RemoteResult<()> {
        let path = format!("/v1/tasks/{id}");
        self.send(reqwest::Method::PATCH, &path, Some(changes))
            .await?;
        Ok(())
    }

    async fn delete_task(&self, id: &TaskId) -> RemoteResult<()> {
        let path = format!("/v1/tasks/{id}");
        self.send::<()>(reqwest::Method::DELETE, &path, None)
            .await?;
        Ok(())
    }

    async fn complete_task(&self, id: &TaskId, user_id: &UserId) -> RemoteResult<()> {
        #[derive(Serialize)]
        struct CompleteBody<'a> {
            user_id: &'a UserId,
        }

        let path = format!("/v1/tasks/{id}/complete");
        self.send(
            reqwest::Method::POST,
            &path,
            Some(&CompleteBody { user_id }),
        )
        .await?;
        Ok(())
    }
}

fn classify_status(status: StatusCode, body: &str) -> RemoteError {
    let message = format!("{} ({})", compact_text(body), status.as_u16());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::PermissionDenied(message),
        StatusCode::NOT_FOUND => RemoteError::NotFound(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RemoteError::DeadlineExceeded(message)
        }
        StatusCode::CONFLICT => RemoteError::Aborted(message),
        StatusCode::TOO_MANY_REQUESTS => RemoteError::Unavailable(message),
        status if status.is_server_error() => RemoteError::Unavailable(message),
        _ => RemoteError::Invalid(message),
    }
}

/// Truncate response bodies for error messages.
fn compact_text(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        "no response body".to_string()
    } else {
        trimmed.chars().take(180).collect()
    }
}

fn normalize_base_url(raw: String) -> RemoteResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RemoteError::Invalid(
            "base URL must not be empty".to_string(),
        ));
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        Ok(trimmed.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::Invalid(
            "base URL must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_rejects_invalid_values() {
        assert!(normalize_base_url(String::new()).is_err());
        assert!(normalize_base_url("api.example.com".to_string()).is_err());
        assert_eq!(
            normalize_base_url("https://api.example.com/".to_string()).unwrap(),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_classify_status_maps_taxonomy() {
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, ""),
            RemoteError::PermissionDenied(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, ""),
            RemoteError::NotFound(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "try later"),
            RemoteError::Unavailable(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::CONFLICT, ""),
            RemoteError::Aborted(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::UNPROCESSABLE_ENTITY, ""),
            RemoteError::Invalid(_)
        ));
    }

    #[test]
    fn test_transient_classification() {
        assert!(RemoteError::Unavailable("x".to_string()).is_transient());
        assert!(RemoteError::Network("x".to_string()).is_transient());
        assert!(!RemoteError::PermissionDenied("x".to_string()).is_transient());
        assert!(!RemoteError::Invalid("x".to_string()).is_transient());
    }
}
