//! An umbrella module for the OpenAI provider and OpenAI-compatible services

mod api;
mod provider;

pub(crate) use self::provider::OpenAIProvider;
