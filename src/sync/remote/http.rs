use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};

use super::{FieldUpdate, ProgressRecord, RemoteError, RemoteStore};
use crate::session::Identity;
use crate::sync::config::RemoteConfig;

const PROGRESS_PATH: &str = "api/progress";
const ITEM_PATH: &str = "api/progress/item";

/// Header carrying the opaque learner id
const USER_HEADER: &str = "X-User-Id";

/// HTTP client for the progress endpoints
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, config: &RemoteConfig) -> Result<Self, RemoteError> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RemoteError::InvalidUrl(
                "URL must start with http:// or https://".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Build full URL for a path
    fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorize(&self, request: RequestBuilder, identity: &Identity) -> RequestBuilder {
        let request = request.header(USER_HEADER, &identity.user_id);
        match &identity.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-success statuses to errors
    async fn check(response: Response) -> Result<Response, RemoteError> {
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(RemoteError::AuthFailed),
            status if !status.is_success() => Err(RemoteError::Server {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            }),
            _ => Ok(response),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, identity: &Identity) -> Result<ProgressRecord, RemoteError> {
        let request = self.authorize(self.client.get(self.url(PROGRESS_PATH)), identity);
        let response = Self::check(request.send().await?).await?;

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn replace(&self, identity: &Identity, record: &ProgressRecord) -> Result<(), RemoteError> {
        let request = self
            .authorize(self.client.post(self.url(PROGRESS_PATH)), identity)
            .json(record);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    async fn upsert(&self, identity: &Identity, update: &FieldUpdate) -> Result<(), RemoteError> {
        let request = self
            .authorize(self.client.post(self.url(ITEM_PATH)), identity)
            .json(update);
        Self::check(request.send().await?).await?;
        Ok(())
    }
}
