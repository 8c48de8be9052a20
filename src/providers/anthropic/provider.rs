use async_trait::async_trait;
use reqwest::IntoUrl;
use std::time::Duration;

use super::api;
use crate::providers::apireq::status_kind;
use crate::providers::{http_client, Error, ErrorKind, ModelProvider};

impl From<api::Error> for Error {
    fn from(value: api::Error) -> Self {
        match value {
            api::Error::RequestFailed(err) => err.into(),
            api::Error::Status { status, .. } => {
                let kind = status_kind(status);
                Error::from_source(kind, Box::new(value))
            }
            value @ (api::Error::InvalidApiBase(_) | api::Error::InvalidEndpoint(_)) => {
                Error::from_source(ErrorKind::BadRequest, Box::new(value))
            }
        }
    }
}

pub(crate) struct AnthropicProvider {
    name: String,
    api: api::AnthropicApi,
}

impl AnthropicProvider {
    pub(crate) const SERVICE_NAME: &'static str = "anthropic";

    pub(crate) fn new<U: IntoUrl>(
        api_key: &str,
        api_base: U,
        timeout: Duration,
    ) -> Result<AnthropicProvider, Error> {
        Ok(AnthropicProvider {
            name: Self::SERVICE_NAME.to_string(),
            api: api::AnthropicApi::new(api_key, api_base, http_client(timeout)?)?,
        })
    }

    pub(crate) fn with_api_key(api_key: &str, timeout: Duration) -> Result<AnthropicProvider, Error> {
        Self::new(api_key, api::DEFAULT_API_BASE, timeout)
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn service_name(&self) -> &str {
        &self.name
    }

    async fn list_models(&self) -> Result<Vec<String>, Error> {
        let models = self.api.models().await?;

        Ok(models.into_iter().map(|m| m.id).collect())
    }
}
