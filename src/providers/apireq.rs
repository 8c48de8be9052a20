//! Helpers shared by the provider APIs for making requests and classifying
//! their failures.

use std::error::Error as StdError;
use std::fmt;

use reqwest::StatusCode;

use crate::providers::{Error as ProviderError, ErrorKind as ProviderErrorKind};

pub(crate) use reqwest::Url;

/// Wrapper around Reqwest's error type to facilitate exclusive matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    ConnectFailed,
    DecodingFailed,
    RedirectPolicyViolated,
    TimedOut,
    UnknownReqwestError,
}

#[derive(Debug)]
pub(crate) struct ReqwestError {
    kind: ErrorKind,
    source: reqwest::Error,
}

impl From<reqwest::Error> for ReqwestError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            ErrorKind::DecodingFailed
        } else if err.is_timeout() {
            ErrorKind::TimedOut
        } else if err.is_redirect() {
            ErrorKind::RedirectPolicyViolated
        } else if err.is_connect() {
            ErrorKind::ConnectFailed
        } else {
            ErrorKind::UnknownReqwestError
        };

        ReqwestError { kind, source: err }
    }
}

impl ReqwestError {
    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for ReqwestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::ConnectFailed => write!(f, "connection failed"),
            ErrorKind::DecodingFailed => write!(f, "decoding failed"),
            ErrorKind::RedirectPolicyViolated => write!(f, "redirect policy violated"),
            ErrorKind::TimedOut => write!(f, "timed out"),
            ErrorKind::UnknownReqwestError => write!(f, "unknown reqwest error"),
        }
    }
}

impl StdError for ReqwestError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

impl From<ReqwestError> for ProviderError {
    fn from(value: ReqwestError) -> Self {
        let kind = match value.kind() {
            ErrorKind::ConnectFailed => ProviderErrorKind::Connection,
            ErrorKind::DecodingFailed | ErrorKind::RedirectPolicyViolated => {
                ProviderErrorKind::UnexpectedResponse
            }
            ErrorKind::TimedOut => ProviderErrorKind::TimedOut,
            ErrorKind::UnknownReqwestError => ProviderErrorKind::UnspecifiedError,
        };

        ProviderError::from_source(kind, Box::new(value))
    }
}

/// Resolves `path` against the API base, keeping any path prefix the base
/// carries (e.g. `https://api.groq.com/openai` + `v1/models`).
pub(crate) fn endpoint(api_base: &Url, path: &str) -> Result<Url, url::ParseError> {
    let mut base = api_base.clone();

    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    base.join(path.trim_start_matches('/'))
}

/// Classifies an unsuccessful HTTP status the way most model APIs use them.
/// Individual APIs override the codes they document differently.
pub(crate) fn status_kind(status: StatusCode) -> ProviderErrorKind {
    match status.as_u16() {
        401 | 403 => ProviderErrorKind::Authentication,
        404 => ProviderErrorKind::NotFound,
        429 => ProviderErrorKind::ExcessUsage,
        503 | 529 => ProviderErrorKind::ApiOverloaded,
        400..=499 => ProviderErrorKind::BadRequest,
        500..=599 => ProviderErrorKind::InternalError,
        _ => ProviderErrorKind::UnspecifiedError,
    }
}
