use std::env::VarError;
use std::time::Duration;

use super::registry::{Error, ServiceRegistry};
use crate::config::{Config, OpenAICompatible, RequestedProviderEnabled};
use crate::providers::{AnthropicProvider, ModelProvider, OllamaProvider, OpenAIProvider};

type Providers = Vec<Box<dyn ModelProvider>>;

const OPENAI_ENV_KEY_VAR: &str = "OPENAI_API_KEY";
const ANTHROPIC_ENV_KEY_VAR: &str = "ANTHROPIC_API_KEY";

fn env_api_key(var: &str) -> Result<Option<String>, Error> {
    match std::env::var(var) {
        Ok(api_key) if api_key.is_empty() => Ok(None),
        Ok(api_key) => Ok(Some(api_key)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => {
            Err(Error::Misconfigured(format!("failed to parse {}", var)))
        }
    }
}

/// Decides whether a key-based provider is activated, and with which key.
fn activated_api_key(
    service: &str,
    enabled: RequestedProviderEnabled,
    configured: Option<&String>,
    env_var: &str,
) -> Result<Option<String>, Error> {
    if enabled == RequestedProviderEnabled::No {
        return Ok(None);
    }

    let api_key = match configured {
        Some(api_key) => Some(api_key.clone()),
        None => env_api_key(env_var)?,
    };

    match (enabled, api_key) {
        (RequestedProviderEnabled::Yes, None) => Err(Error::Misconfigured(format!(
            "the \"{}\" provider is enabled but the API key is not defined, either add it to the config or define {}",
            service, env_var
        ))),
        (_, api_key) => Ok(api_key),
    }
}

async fn add_ollama(
    providers: &mut Providers,
    config: &Config,
    timeout: Duration,
) -> Result<(), Error> {
    let ollama = &config.providers.ollama;

    if ollama.enabled == RequestedProviderEnabled::No {
        return Ok(());
    }

    let provider = match &ollama.api_base {
        Some(api_base) => OllamaProvider::with_api_base(api_base.as_str(), timeout),
        None => OllamaProvider::new(timeout),
    }
    .map_err(|e| Error::ProviderSetup(OllamaProvider::SERVICE_NAME.to_string(), e))?;

    if ollama.enabled == RequestedProviderEnabled::Auto && !provider.is_awake().await {
        log::info!("ollama is not running, skipping it");
        return Ok(());
    }

    providers.push(Box::new(provider));

    Ok(())
}

fn add_openai(
    providers: &mut Providers,
    config: &Config,
    timeout: Duration,
) -> Result<(), Error> {
    let openai = &config.providers.openai;
    let name = OpenAIProvider::SERVICE_NAME;

    let api_key =
        match activated_api_key(name, openai.enabled, openai.api_key.as_ref(), OPENAI_ENV_KEY_VAR)? {
            Some(api_key) => api_key,
            None => return Ok(()),
        };

    let provider = match &openai.api_base {
        Some(api_base) => OpenAIProvider::new(name, Some(&api_key), api_base.as_str(), timeout),
        None => OpenAIProvider::with_api_key(&api_key, timeout),
    }
    .map_err(|e| Error::ProviderSetup(name.to_string(), e))?;

    providers.push(Box::new(provider));

    Ok(())
}

fn add_anthropic(
    providers: &mut Providers,
    config: &Config,
    timeout: Duration,
) -> Result<(), Error> {
    let anthropic = &config.providers.anthropic;
    let name = AnthropicProvider::SERVICE_NAME;

    let api_key = match activated_api_key(
        name,
        anthropic.enabled,
        anthropic.api_key.as_ref(),
        ANTHROPIC_ENV_KEY_VAR,
    )? {
        Some(api_key) => api_key,
        None => return Ok(()),
    };

    let provider = match &anthropic.api_base {
        Some(api_base) => AnthropicProvider::new(&api_key, api_base.as_str(), timeout),
        None => AnthropicProvider::with_api_key(&api_key, timeout),
    }
    .map_err(|e| Error::ProviderSetup(name.to_string(), e))?;

    providers.push(Box::new(provider));

    Ok(())
}

fn add_openai_compatible(
    providers: &mut Providers,
    service: &OpenAICompatible,
    timeout: Duration,
) -> Result<(), Error> {
    let api_key = match (&service.api_key, &service.api_key_env) {
        (Some(api_key), _) => Some(api_key.clone()),
        (None, Some(var)) => {
            let api_key = env_api_key(var)?;

            if api_key.is_none() {
                log::warn!(
                    "{} is not set, querying \"{}\" without an API key",
                    var,
                    service.name
                );
            }

            api_key
        }
        (None, None) => None,
    };

    let provider = OpenAIProvider::new(
        &service.name,
        api_key.as_deref(),
        service.api_base.as_str(),
        timeout,
    )
    .map_err(|e| Error::ProviderSetup(service.name.clone(), e))?;

    providers.push(Box::new(provider));

    Ok(())
}

/// Populate a registry with the available providers
pub(crate) async fn populated_registry(config: &Config) -> Result<ServiceRegistry, Error> {
    let mut providers = Providers::new();
    let timeout = config.providers.timeout();

    add_ollama(&mut providers, config, timeout).await?;
    add_openai(&mut providers, config, timeout)?;
    add_anthropic(&mut providers, config, timeout)?;

    for service in &config.providers.openai_compatible {
        add_openai_compatible(&mut providers, service, timeout)?;
    }

    let registry = ServiceRegistry::from_providers(providers)?;

    log::debug!(
        "registered services: {}",
        registry.service_names().collect::<Vec<_>>().join(", ")
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_enabled_without_key_is_an_error() {
        let result = activated_api_key(
            "openai",
            RequestedProviderEnabled::Yes,
            None,
            "XAVAIL_TEST_UNSET_KEY",
        );

        assert!(matches!(result, Err(Error::Misconfigured(_))));
    }

    #[test]
    fn test_auto_activation_follows_the_key() {
        let key = "sk-test".to_string();

        let active = activated_api_key(
            "openai",
            RequestedProviderEnabled::Auto,
            Some(&key),
            "XAVAIL_TEST_UNSET_KEY",
        )
        .unwrap();
        assert_eq!(active.as_deref(), Some("sk-test"));

        let inactive = activated_api_key(
            "openai",
            RequestedProviderEnabled::Auto,
            None,
            "XAVAIL_TEST_UNSET_KEY",
        )
        .unwrap();
        assert!(inactive.is_none());

        let disabled = activated_api_key(
            "openai",
            RequestedProviderEnabled::No,
            Some(&key),
            "XAVAIL_TEST_UNSET_KEY",
        )
        .unwrap();
        assert!(disabled.is_none());
    }

    #[tokio::test]
    async fn test_compatible_services_are_registered() {
        let config = parse_config(
            r#"
            [providers.ollama]
            enabled = "no"

            [providers.openai]
            enabled = "no"

            [providers.anthropic]
            enabled = "no"

            [[providers.openai_compatible]]
            name = "groq"
            api_base = "https://api.groq.com/openai"
            api_key = "gsk-test"

            [[providers.openai_compatible]]
            name = "local-vllm"
            api_base = "http://localhost:8000"
            "#,
        )
        .unwrap();

        let registry = populated_registry(&config).await.unwrap();
        let names: Vec<&str> = registry.service_names().collect();

        assert_eq!(names, vec!["groq", "local-vllm"]);
    }

    #[tokio::test]
    async fn test_conflicting_service_name() {
        let config = parse_config(
            r#"
            [providers.ollama]
            enabled = "no"

            [providers.openai]
            enabled = "yes"
            api_key = "sk-test"

            [providers.anthropic]
            enabled = "no"

            [[providers.openai_compatible]]
            name = "openai"
            api_base = "https://openai-proxy.internal"
            "#,
        )
        .unwrap();

        let result = populated_registry(&config).await;

        assert!(matches!(result, Err(Error::DuplicateService(name)) if name == "openai"));
    }
}
