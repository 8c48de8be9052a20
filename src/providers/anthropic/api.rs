use reqwest::{Client, IntoUrl, StatusCode};
use serde::Deserialize;

use crate::providers::apireq::{self, endpoint, Url};

pub(super) const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

// The largest page the models route accepts.
const PAGE_LIMIT: u32 = 1000;

#[derive(thiserror::Error, Debug)]
pub(super) enum Error {
    #[error("invalid anthropic api base")]
    InvalidApiBase(#[source] reqwest::Error),

    #[error("invalid anthropic endpoint")]
    InvalidEndpoint(
        #[from]
        #[source]
        url::ParseError,
    ),

    #[error("{}", .0)]
    RequestFailed(
        #[from]
        #[source]
        apireq::ReqwestError,
    ),

    /// The API answered with a non-success status
    #[error("{} ({})", .payload.message, .status)]
    Status {
        status: StatusCode,
        payload: ApiErrorPayload,
    },
}

/* Structures to deseralize /v1/models */

#[derive(Deserialize, Debug)]
pub(super) struct ModelInfo {
    pub id: String,
}

#[derive(Deserialize, Debug)]
struct ModelPage {
    data: Vec<ModelInfo>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

/* API Errors */

#[derive(Deserialize, Debug)]
pub(super) struct ApiErrorPayload {
    pub message: String,
}

#[derive(Deserialize, Debug)]
struct ApiErrorResponse {
    error: ApiErrorPayload,
}

impl ApiErrorPayload {
    fn from_body(body: String) -> ApiErrorPayload {
        match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(res) => res.error,
            Err(_) => ApiErrorPayload { message: body },
        }
    }
}

pub(super) struct AnthropicApi {
    api_base: Url,
    api_key: String,
    client: Client,
}

impl AnthropicApi {
    pub(super) fn new<U: IntoUrl>(
        api_key: &str,
        api_base: U,
        client: Client,
    ) -> Result<AnthropicApi, Error> {
        Ok(AnthropicApi {
            api_base: api_base.into_url().map_err(Error::InvalidApiBase)?,
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn page(&self, after_id: Option<&str>) -> Result<ModelPage, Error> {
        let mut url = endpoint(&self.api_base, "v1/models")?;

        {
            let mut query = url.query_pairs_mut();

            query.append_pair("limit", &PAGE_LIMIT.to_string());

            if let Some(after_id) = after_id {
                query.append_pair("after_id", after_id);
            }
        }

        let res = self
            .client
            .get(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .send()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))?;

        let status = res.status();

        if !status.is_success() {
            let body = res
                .text()
                .await
                .map_err(|e| Error::RequestFailed(e.into()))?;

            return Err(Error::Status {
                status,
                payload: ApiErrorPayload::from_body(body),
            });
        }

        res.json()
            .await
            .map_err(|e| Error::RequestFailed(e.into()))
    }

    /// Lists every model, following pagination until the API reports no
    /// more pages. A cursor which does not advance ends the listing.
    pub(super) async fn models(&self) -> Result<Vec<ModelInfo>, Error> {
        let mut models = Vec::new();
        let mut after_id: Option<String> = None;

        loop {
            let page = self.page(after_id.as_deref()).await?;

            models.extend(page.data);

            match (page.has_more, page.last_id) {
                (true, Some(last_id)) if after_id.as_deref() != Some(last_id.as_str()) => {
                    after_id = Some(last_id)
                }
                (true, _) => {
                    log::warn!("anthropic returned a page cursor which does not advance, stopping");
                    break;
                }
                _ => break,
            }
        }

        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::serve;

    #[test]
    fn test_model_page_deserialization() {
        let raw = r#"{
            "data": [
                {
                    "type": "model",
                    "id": "claude-3-5-sonnet-20241022",
                    "display_name": "Claude 3.5 Sonnet (New)",
                    "created_at": "2024-10-22T00:00:00Z"
                }
            ],
            "has_more": true,
            "first_id": "claude-3-5-sonnet-20241022",
            "last_id": "claude-3-5-sonnet-20241022"
        }"#;

        let page: ModelPage = serde_json::from_str(raw).unwrap();

        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].id, "claude-3-5-sonnet-20241022");
        assert!(page.has_more);
        assert_eq!(page.last_id.as_deref(), Some("claude-3-5-sonnet-20241022"));
    }

    #[test]
    fn test_error_payload() {
        let payload = ApiErrorPayload::from_body(
            r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#
                .to_string(),
        );
        assert_eq!(payload.message, "invalid x-api-key");

        let payload = ApiErrorPayload::from_body("upstream connect error".to_string());
        assert_eq!(payload.message, "upstream connect error");
    }

    fn api(api_base: String) -> AnthropicApi {
        AnthropicApi::new("sk-ant-test", api_base, Client::new()).unwrap()
    }

    #[tokio::test]
    async fn test_pagination() {
        let (api_base, requests) = serve(vec![
            r#"{ "data": [{ "id": "claude-a" }], "has_more": true, "last_id": "claude-a" }"#,
            r#"{ "data": [{ "id": "claude-b" }], "has_more": false, "last_id": "claude-b" }"#,
        ])
        .await;

        let ids: Vec<String> = api(api_base)
            .models()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();

        assert_eq!(ids, vec!["claude-a", "claude-b"]);
        assert_eq!(
            requests.await.unwrap(),
            vec![
                "GET /v1/models?limit=1000 HTTP/1.1",
                "GET /v1/models?limit=1000&after_id=claude-a HTTP/1.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_stalled_cursor_ends_listing() {
        let (api_base, requests) = serve(vec![
            r#"{ "data": [{ "id": "claude-a" }], "has_more": true, "last_id": "claude-a" }"#,
            r#"{ "data": [], "has_more": true, "last_id": "claude-a" }"#,
        ])
        .await;

        let models = api(api_base).models().await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(requests.await.unwrap().len(), 2);
    }
}
