//! An umbrella module for the Ollama provider

mod api;
mod provider;

pub(crate) use self::provider::OllamaProvider;
