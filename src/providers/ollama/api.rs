use reqwest::{Client, IntoUrl, Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use crate::providers::apireq::{endpoint, ReqwestError, Url};

pub(super) const OLLAMA_DEFAULT_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Error)]
pub(super) enum Error {
    #[error("invalid ollama api base: {0}")]
    InvalidApiBase(reqwest::Error),

    #[error("invalid ollama endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    #[error("a request to ollama failed: {0}")]
    RequestFailed(#[from] ReqwestError),

    #[error("failed to query ollama resource: {0}")]
    NotFound(String),

    #[error("request to the ollama api failed: {0}")]
    BadRequest(String),

    #[error("ollama encountered an internal error: {0}")]
    InternalError(String),

    #[error("the ollama API returned an unspecified error: {0}")]
    UnspecifiedError(String),
}

/* === IO === */

// Structures to deseralize /api/tags and /api/version

#[derive(Debug, Deserialize)]
pub(super) struct Tag {
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct TagsList {
    models: Vec<Tag>,
}

#[derive(Debug, Deserialize)]
struct Version {
    version: String,
}

// Errors
#[derive(Debug, Deserialize)]
struct ApiError {
    error: String,
}

fn error_from_status(status: StatusCode, message: String) -> Error {
    match status {
        StatusCode::NOT_FOUND => Error::NotFound(message),
        code => match code.as_u16() {
            400..=499 => Error::BadRequest(message),
            500..=599 => Error::InternalError(message),
            _ => Error::UnspecifiedError(message),
        },
    }
}

pub(super) struct OllamaApi {
    api_base: Url,
    client: Client,
}

impl OllamaApi {
    pub(super) fn with_api_base<U: IntoUrl>(api_base: U, client: Client) -> Result<OllamaApi, Error> {
        Ok(OllamaApi {
            api_base: api_base.into_url().map_err(Error::InvalidApiBase)?,
            client,
        })
    }

    async fn maybe_parse_api_error(res: Response) -> Result<Response, Error> {
        let status = res.status();

        if status.is_success() {
            return Ok(res);
        }

        // Ollama sometimes answers errors with plain text, e.g. from a proxy.
        let body = res.text().await.map_err(|e| Error::RequestFailed(e.into()))?;

        let message = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) => err.error,
            Err(_) => body,
        };

        Err(error_from_status(status, message))
    }

    async fn get(&self, path: &str) -> Result<Response, Error> {
        let url = endpoint(&self.api_base, path)?;

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Self::maybe_parse_api_error(res).await
    }

    pub(super) async fn tags(&self) -> Result<Vec<Tag>, Error> {
        let tags: TagsList = self
            .get("api/tags")
            .await?
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(tags.models)
    }

    /// The version of the server, which is much cheaper to fetch than the
    /// model listing.
    pub(super) async fn version(&self) -> Result<String, Error> {
        let version: Version = self
            .get("api/version")
            .await?
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(version.version)
    }
}
