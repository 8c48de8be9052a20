use reqwest::{Client, IntoUrl};
use serde::Deserialize;

use crate::providers::apireq::{self, endpoint, Url};

pub(super) const DEFAULT_API_BASE: &str = "https://api.openai.com";

#[derive(thiserror::Error, Debug)]
pub(super) enum Error {
    /// The API Base is not a URL that can be used in a network request
    #[error("invalid api base")]
    InvalidApiBase(#[source] reqwest::Error),

    /// Endpoint URL is invalid
    #[error("invalid endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    /// Some issue with the request
    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        apireq::ReqwestError,
    ),

    /// Your request was malformed or missing some required parameters,
    /// such as a token or an input.
    #[error("{}", .0.message)]
    BadRequest(ApiErrorPayload),

    /// An "Authentication" Error is an umbrella error with three possiblities:
    /// (1) Invalid Authentication
    /// (2) The requesting API key is not correct.
    /// (3) Your account is not part of an organization.
    #[error("{}", .0.message)]
    Authentication(ApiErrorPayload),

    /// You don't have access to the requested resource.
    #[error("{}", .0.message)]
    PermissionDenied(ApiErrorPayload),

    /// Requested resource does not exist.
    #[error("{}", .0.message)]
    NotFound(ApiErrorPayload),

    /// You have hit your assigned rate limit.
    #[error("{}", .0.message)]
    RateLimit(ApiErrorPayload),

    /// The service has an internal issue
    #[error("{}", .0.message)]
    InternalError(ApiErrorPayload),

    /// The engine is currently overloaded, please try again later
    #[error("{}", .0.message)]
    ApiOverloaded(ApiErrorPayload),

    /// Some unknown error was returned by the API
    #[error("{}", .0.message)]
    UnknownStatus(ApiErrorPayload),
}

impl Error {
    fn from_status(status: u16, payload: ApiErrorPayload) -> Error {
        match status {
            400 | 422 => Error::BadRequest(payload),
            401 => Error::Authentication(payload),
            403 => Error::PermissionDenied(payload),
            404 => Error::NotFound(payload),
            429 => Error::RateLimit(payload),
            500 => Error::InternalError(payload),
            503 => Error::ApiOverloaded(payload),
            _ => Error::UnknownStatus(payload),
        }
    }
}

/* Structures to deseralize /v1/models */

#[derive(Deserialize, Debug)]
pub(super) struct ModelObject {
    pub id: String,
}

#[derive(Deserialize, Debug)]
struct ModelList {
    data: Vec<ModelObject>,
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorPayload {
    message: String,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

impl ApiErrorPayload {
    /// OpenAI-compatible services do not all follow the OpenAI error
    /// shape; fall back to the raw body.
    fn from_body(body: String) -> ApiErrorPayload {
        match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(res) => res.error,
            Err(_) => ApiErrorPayload { message: body },
        }
    }
}

pub(super) struct OpenAIApi {
    api_base: Url,
    api_key: Option<String>,
    client: Client,
}

impl OpenAIApi {
    pub(super) fn new<U: IntoUrl>(
        api_key: Option<&str>,
        api_base: U,
        client: Client,
    ) -> Result<OpenAIApi, Error> {
        let api_base = api_base.into_url().map_err(Error::InvalidApiBase)?;

        Ok(OpenAIApi {
            api_base,
            api_key: api_key.map(|k| k.to_string()),
            client,
        })
    }

    pub(super) async fn models(&self) -> Result<Vec<ModelObject>, Error> {
        let url = endpoint(&self.api_base, "v1/models")?;

        let mut req = self.client.get(url);

        if let Some(api_key) = &self.api_key {
            req = req.bearer_auth(api_key);
        }

        let res = req.send().await.map_err(|e| Error::RequestFailed(e.into()))?;

        let status = res.status();

        if !status.is_success() {
            let body = res
                .text()
                .await
                .map_err(|e| Error::RequestFailed(e.into()))?;

            return Err(Error::from_status(
                status.as_u16(),
                ApiErrorPayload::from_body(body),
            ));
        }

        let list: ModelList = res
            .json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        Ok(list.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_list_deserialization() {
        let raw = r#"{
            "object": "list",
            "data": [
                { "id": "gpt-4o-mini", "object": "model", "created": 1721172741, "owned_by": "system" },
                { "id": "llama-3.1-8b-instant", "object": "model" }
            ]
        }"#;

        let list: ModelList = serde_json::from_str(raw).unwrap();

        assert_eq!(list.data.len(), 2);
        assert_eq!(list.data[0].id, "gpt-4o-mini");
        assert_eq!(list.data[1].id, "llama-3.1-8b-instant");
    }

    #[test]
    fn test_error_payload_fallback() {
        let payload = ApiErrorPayload::from_body(
            r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#
                .to_string(),
        );
        assert_eq!(payload.message, "Incorrect API key provided");

        let payload = ApiErrorPayload::from_body("Bad Gateway".to_string());
        assert_eq!(payload.message, "Bad Gateway");
    }

    #[test]
    fn test_status_mapping() {
        let payload = || ApiErrorPayload::from_body("x".to_string());

        assert!(matches!(
            Error::from_status(401, payload()),
            Error::Authentication(_)
        ));
        assert!(matches!(Error::from_status(429, payload()), Error::RateLimit(_)));
        assert!(matches!(
            Error::from_status(503, payload()),
            Error::ApiOverloaded(_)
        ));
        assert!(matches!(
            Error::from_status(502, payload()),
            Error::UnknownStatus(_)
        ));
    }
}
