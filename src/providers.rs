//! Traits and type definitions for querying inference providers.
//!
//! The `providers` module contains the components used to ask an inference
//! service which models it currently serves. The interface for every service is
//! provided by the [`ModelProvider`] trait.
//!
//! ## Model Providers
//!
//! Each API provider (e.g., OpenAI, Anthropic, or Ollama) must implement the
//! [`ModelProvider`] trait to be compatible with xavail. A provider supports two
//! operations:
//! - Service Name: The name the provider is registered under. It must be unique
//!   within a registry, since it is also the key under which models are cached.
//! - Models: The models operation lists the identifiers of all the models the
//!   service is able to serve.
//!
//! A single implementation may back several services. For example, the OpenAI
//! provider is used for every OpenAI-compatible endpoint, each under its own name.
//!
//! ## Error Handling
//!
//! Each API has its own bespoke error systems with varying levels of rigor. For example, the Ollama
//! API documentation does not describe any errors that can be raised by the API, while the OpenAI API
//! is very explicit. In general, providers each have their own error types. These are encapsulated in [`Error`],
//! and the [`ErrorKind`] enum provides an indication of the category of error that was raised.

mod anthropic;
mod apireq;
mod ollama;
mod openai;

pub(crate) use anthropic::AnthropicProvider;
pub(crate) use ollama::OllamaProvider;
pub(crate) use openai::OpenAIProvider;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// The timeout applied to a provider's HTTP client unless the user
/// configures another one.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// This is a list specifying general categories of errors that
/// can be returned by a [`ModelProvider`]. This list may be updated
/// as providers are added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Failed to connect to the underlying API service.
    /// This could be due to network issues like DNS
    /// resolution, connectivity issues, or routing problems.
    Connection,
    /// A request timed out.
    TimedOut,
    /// An API key was not provided or service-specific
    /// permissions are needed.
    Authentication,
    /// A rate limit was reached or a quota was exceeded.
    ExcessUsage,
    /// The servers are overloaded. This is non-fatal
    /// and indicates that a retry may be needed later.
    ApiOverloaded,
    /// The requested resource was not found. For a model listing this
    /// usually means the API base points at the wrong service.
    NotFound,
    /// The request was malformed or is otherwise improper. This
    /// often corresponds to errors with HTTP status codes in
    /// the 400s.
    BadRequest,
    /// The server encountered an error. This often corresponds to
    /// errors with HTTP status codes in the 500s.
    InternalError,
    /// An API response was unable to be deserialized, malformed,
    /// or otherwise violated the assumptions of the client.
    UnexpectedResponse,
    /// An error that does not fit into any of the other categories.
    UnspecifiedError,
}

#[derive(Debug)]
pub(crate) struct Error {
    kind: ErrorKind,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    #[cfg(test)]
    pub(crate) fn from_kind(kind: ErrorKind) -> Error {
        Error { kind, source: None }
    }

    pub(crate) fn from_source(kind: ErrorKind, source: Box<dyn StdError + Send + Sync>) -> Error {
        Error {
            kind,
            source: Some(source),
        }
    }

    pub(crate) fn kind(&self) -> ErrorKind {
        self.kind
    }

    fn message(&self) -> &'static str {
        match self.kind {
            ErrorKind::Connection => "failed to connect to the API service",
            ErrorKind::TimedOut => "request timed out",
            ErrorKind::Authentication => "authentication failed or not provided",
            ErrorKind::ExcessUsage => "rate limit exceeded or quota crossed",
            ErrorKind::ApiOverloaded => "API server(s) are currently overloaded",
            ErrorKind::NotFound => "the requested resource was not found",
            ErrorKind::BadRequest => "the request was bad or malformed",
            ErrorKind::InternalError => "the server encountered an internal error",
            ErrorKind::UnexpectedResponse => "API response was unexpected or malformed",
            ErrorKind::UnspecifiedError => "an unspecified error occurred",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {}", self.message(), source),
            None => write!(f, "{}", self.message()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as _)
    }
}

/// A trait implemented by all model providers.
#[async_trait]
pub(crate) trait ModelProvider: Send + Sync {
    /// Returns the name of the service this provider answers for.
    fn service_name(&self) -> &str;

    /// Returns the identifiers of the models the service currently offers,
    /// in the order the service reports them.
    async fn list_models(&self) -> Result<Vec<String>, Error>;
}

/// Builds the HTTP client shared by the provider APIs.
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::from_source(ErrorKind::UnspecifiedError, Box::new(e)))
}
