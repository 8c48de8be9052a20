use async_trait::async_trait;
use reqwest::IntoUrl;
use std::time::Duration;

use crate::providers::{http_client, openai::api, Error, ErrorKind, ModelProvider};

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        let kind = match &value {
            api::Error::Authentication(_) | api::Error::PermissionDenied(_) => {
                Some(ErrorKind::Authentication)
            }
            api::Error::BadRequest(_)
            | api::Error::InvalidApiBase(_)
            | api::Error::InvalidEndpoint(_) => Some(ErrorKind::BadRequest),
            api::Error::InternalError(_) => Some(ErrorKind::InternalError),
            api::Error::NotFound(_) => Some(ErrorKind::NotFound),
            api::Error::RateLimit(_) => Some(ErrorKind::ExcessUsage),
            api::Error::UnknownStatus(_) => Some(ErrorKind::UnspecifiedError),
            api::Error::ApiOverloaded(_) => Some(ErrorKind::ApiOverloaded),

            api::Error::RequestFailed(_) => None,
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

/// Lists models through the OpenAI `/v1/models` route. Any service exposing
/// the same route (Groq, Together, DeepInfra, vLLM, ...) is served by this
/// provider under its own service name.
pub(crate) struct OpenAIProvider {
    name: String,
    api: api::OpenAIApi,
}

impl OpenAIProvider {
    pub(crate) const SERVICE_NAME: &'static str = "openai";

    pub(crate) fn new<U: IntoUrl>(
        name: &str,
        api_key: Option<&str>,
        api_base: U,
        timeout: Duration,
    ) -> Result<OpenAIProvider, Error> {
        Ok(OpenAIProvider {
            name: name.to_string(),
            api: api::OpenAIApi::new(api_key, api_base, http_client(timeout)?)?,
        })
    }

    pub(crate) fn with_api_key(api_key: &str, timeout: Duration) -> Result<OpenAIProvider, Error> {
        Self::new(
            Self::SERVICE_NAME,
            Some(api_key),
            api::DEFAULT_API_BASE,
            timeout,
        )
    }
}

#[async_trait]
impl ModelProvider for OpenAIProvider {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let models = self.api.models().await?;

        Ok(models.into_iter().map(|m| m.id).collect())
    }
}
