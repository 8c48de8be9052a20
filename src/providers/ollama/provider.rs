use async_trait::async_trait;
use reqwest::IntoUrl;
use std::time::Duration;

use super::api;
use crate::providers::{http_client, Error, ErrorKind, ModelProvider};

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::RequestFailed(_) => None,
            api::Error::InternalError(_) => Some(ErrorKind::InternalError),
            api::Error::InvalidApiBase(_) | api::Error::InvalidEndpoint(_) => {
                Some(ErrorKind::Connection)
            }
            api::Error::NotFound(_) => Some(ErrorKind::NotFound),
            api::Error::BadRequest(_) => Some(ErrorKind::BadRequest),
            api::Error::UnspecifiedError(_) => Some(ErrorKind::UnspecifiedError),
        };

        match (kind, value) {
            (_, api::Error::RequestFailed(err)) => err.into(),
            (kind, value) => Error::from_source(
                kind.unwrap_or(ErrorKind::UnspecifiedError),
                Box::new(value),
            ),
        }
    }
}

pub(crate) struct OllamaProvider {
    name: String,
    api: api::OllamaApi,
}

impl OllamaProvider {
    pub(crate) const SERVICE_NAME: &'static str = "ollama";

    pub(crate) fn with_api_base<U: IntoUrl>(
        api_base: U,
        timeout: Duration,
    ) -> Result<OllamaProvider, Error> {
        Ok(OllamaProvider {
            name: Self::SERVICE_NAME.to_string(),
            api: api::OllamaApi::with_api_base(api_base, http_client(timeout)?)?,
        })
    }

    pub(crate) fn new(timeout: Duration) -> Result<OllamaProvider, Error> {
        Self::with_api_base(api::OLLAMA_DEFAULT_ENDPOINT, timeout)
    }

    /// Returns whether an Ollama server answers at the API base. Only
    /// connection failures count as "asleep"; any other error means
    /// something is listening.
    pub(crate) async fn is_awake(&self) -> bool {
        match self.api.version().await {
            Ok(version) => {
                log::debug!("ollama {} is running", version);
                true
            }
            Err(err) => {
                let err: Error = err.into();

                !matches!(err.kind(), ErrorKind::Connection | ErrorKind::TimedOut)
            }
        }
    }
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let tags = self.api.tags().await?;

        Ok(tags.into_iter().map(|t| t.name).collect())
    }
}
