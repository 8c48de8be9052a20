use thiserror::Error;

use crate::providers::ModelProvider;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// Two providers were registered under the same service name
    #[error("service \"{0}\" is configured more than once")]
    DuplicateService(String),
    /// A provider is enabled but lacks the settings it needs
    #[error("{0}")]
    Misconfigured(String),
    /// A provider could not be constructed from its settings
    #[error("failed to set up service \"{0}\": {1}")]
    ProviderSetup(String, #[source] crate::providers::Error),
}

#[derive(Default)]
pub(crate) struct ServiceRegistry {
    providers: Vec<Box<dyn ModelProvider>>,
}

impl ServiceRegistry {
    pub(crate) fn new() -> ServiceRegistry {
        ServiceRegistry::default()
    }

    /// Builds a registry from a list of providers, rejecting duplicate names.
    pub(crate) fn from_providers<I>(providers: I) -> Result<ServiceRegistry, Error>
    where
        I: IntoIterator<Item = Box<dyn ModelProvider>>,
    {
        let mut registry = ServiceRegistry::new();

        for provider in providers {
            registry.add_provider(provider)?;
        }

        Ok(registry)
    }

    pub(crate) fn add_provider(&mut self, provider: Box<dyn ModelProvider>) -> Result<(), Error> {
        let name = provider.service_name();

        if self.contains(name) {
            return Err(Error::DuplicateService(name.to_string()));
        }

        self.providers.push(provider);

        Ok(())
    }

    pub(crate) fn contains(&self, service_name: &str) -> bool {
        self.provider(service_name).is_some()
    }

    pub(crate) fn provider(&self, service_name: &str) -> Option<&dyn ModelProvider> {
        self.providers
            .iter()
            .find(|p| p.service_name() == service_name)
            .map(|p| p.as_ref())
    }

    pub(crate) fn providers(&self) -> impl Iterator<Item = &dyn ModelProvider> {
        self.providers.iter().map(|p| p.as_ref())
    }

    pub(crate) fn service_names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.service_name())
    }

    pub(crate) fn len(&self) -> usize {
        self.providers.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::FakeProvider;

    #[test]
    fn test_registration_order_is_kept() {
        let registry = ServiceRegistry::from_providers([
            Box::new(FakeProvider::serving("ollama", &[])) as Box<dyn ModelProvider>,
            Box::new(FakeProvider::serving("openai", &[])),
            Box::new(FakeProvider::serving("groq", &[])),
        ])
        .unwrap();

        let names: Vec<&str> = registry.service_names().collect();

        assert_eq!(names, vec!["ollama", "openai", "groq"]);
        assert_eq!(registry.len(), 3);
        assert!(registry.contains("groq"));
        assert!(registry.provider("anthropic").is_none());
    }

    #[test]
    fn test_duplicate_service_is_rejected() {
        let result = ServiceRegistry::from_providers([
            Box::new(FakeProvider::serving("openai", &["a"])) as Box<dyn ModelProvider>,
            Box::new(FakeProvider::serving("openai", &["b"])),
        ]);

        assert!(matches!(result, Err(Error::DuplicateService(name)) if name == "openai"));
    }

    #[test]
    fn test_empty() {
        let registry = ServiceRegistry::new();

        assert!(registry.is_empty());
        assert_eq!(registry.providers().count(), 0);
    }
}
