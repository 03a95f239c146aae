//! Where the terminal client sends its requests.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::api::{
    AutocompleteRequest, AutocompleteResponse, ComposerRequest, ComposerResponse, ErrorBody,
    QuickEditRequest, QuickEditResponse,
};
use crate::error::{AiError, Result};

/// The three endpoints as seen by a client.
///
/// Implemented in-process by [`crate::AiService`] and over HTTP by
/// [`RemoteBackend`].
#[async_trait]
pub trait Backend: Send + Sync {
    async fn autocomplete(&self, req: AutocompleteRequest) -> Result<AutocompleteResponse>;
    async fn quick_edit(&self, req: QuickEditRequest) -> Result<QuickEditResponse>;
    async fn compose(&self, req: ComposerRequest) -> Result<ComposerResponse>;
}

/// Talks to a running `notepai-server`.
pub struct RemoteBackend {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(%url, "posting");
        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            let body = serde_json::from_slice::<ErrorBody>(&bytes)
                .map(|e| e.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn autocomplete(&self, req: AutocompleteRequest) -> Result<AutocompleteResponse> {
        self.post("autocomplete", &req).await
    }

    async fn quick_edit(&self, req: QuickEditRequest) -> Result<QuickEditResponse> {
        self.post("quickedit", &req).await
    }

    async fn compose(&self, req: ComposerRequest) -> Result<ComposerResponse> {
        self.post("composer", &req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let backend = RemoteBackend::new("http://127.0.0.1:3000/");
        assert_eq!(backend.url("quickedit"), "http://127.0.0.1:3000/quickedit");
        let backend = RemoteBackend::new("http://host/api");
        assert_eq!(backend.url("composer"), "http://host/api/composer");
    }
}
