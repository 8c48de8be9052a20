//! Lists the models available across every registered service.
//!
//! Querying every provider is slow, so the merged listing is kept as a
//! [`Snapshot`] and reused until it is older than the cache TTL. A query for a
//! single service always goes to the provider and never touches the cache.
//!
//! A refresh dispatches one query per provider, with at most
//! [`MAX_CONCURRENT_QUERIES`] in flight, and merges results in the order the
//! queries complete. Every query runs to completion: a failing provider is
//! logged and contributes no live models, but it does not abort the refresh.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use thiserror::Error;

use crate::cache::{self, cache_ttl, ModelEntry, Snapshot, SnapshotStore};
use crate::providers;
use crate::registry::registry::ServiceRegistry;

/// Upper bound on provider queries in flight during a refresh.
pub(crate) const MAX_CONCURRENT_QUERIES: usize = 10;

/// Service name to models which are always considered available for it.
pub(crate) type AddedModels = BTreeMap<String, Vec<String>>;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// No provider is registered under the requested name
    #[error("service \"{0}\" is not available")]
    UnknownService(String),
    /// The provider of a single-service query failed
    #[error("failed to list the models of service \"{service}\": {source}")]
    Provider {
        service: String,
        #[source]
        source: providers::Error,
    },
    /// A refreshed snapshot could not be written to the cache
    #[error("failed to save the model cache: {0}")]
    Persist(#[source] cache::Error),
}

/// The merged listing of all services.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AvailableModels {
    models: Vec<ModelEntry>,
}

impl AvailableModels {
    pub(crate) fn contains(&self, model_name: &str) -> bool {
        self.models.iter().any(|m| m.model_name == model_name)
    }

    /// The entries for `model_name`, one per service offering it, in listing
    /// order.
    pub(crate) fn offering<'a>(
        &'a self,
        model_name: &'a str,
    ) -> impl Iterator<Item = &'a ModelEntry> + 'a {
        self.models
            .iter()
            .filter(move |m| m.model_name == model_name)
    }
}

impl From<Vec<ModelEntry>> for AvailableModels {
    fn from(models: Vec<ModelEntry>) -> Self {
        AvailableModels { models }
    }
}

pub(crate) struct ModelAvailabilityCache {
    registry: ServiceRegistry,
    added_models: AddedModels,
    store: Arc<dyn SnapshotStore>,
    use_cache: bool,
    clock: Clock,
}

impl ModelAvailabilityCache {
    pub(crate) fn new(
        registry: ServiceRegistry,
        added_models: AddedModels,
        store: Arc<dyn SnapshotStore>,
        use_cache: bool,
    ) -> ModelAvailabilityCache {
        ModelAvailabilityCache {
            registry,
            added_models,
            store,
            use_cache,
            clock: Box::new(Utc::now),
        }
    }

    /// Replaces the source of the current time used to judge freshness and to
    /// stamp new snapshots.
    #[cfg(test)]
    pub(crate) fn with_clock<F>(mut self, clock: F) -> ModelAvailabilityCache
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub(crate) fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Lists available models.
    ///
    /// With `service`, only that service is queried, live, and its entries are
    /// unranked. Provider errors are returned to the caller in this mode.
    ///
    /// Without `service`, the cached snapshot is returned when it is still
    /// fresh; otherwise every service is queried and the result is cached.
    /// Provider errors are logged and never returned in this mode.
    pub(crate) async fn list_available_models(
        &self,
        service: Option<&str>,
    ) -> Result<Vec<ModelEntry>, Error> {
        match service {
            Some(service) => self.query_service(service).await,
            None => {
                if let Some(snapshot) = self.fresh_snapshot() {
                    return Ok(snapshot.models);
                }

                Ok(self.refresh().await?.models)
            }
        }
    }

    pub(crate) async fn available_models(&self) -> Result<AvailableModels, Error> {
        self.list_available_models(None).await.map(AvailableModels::from)
    }

    async fn query_service(&self, service: &str) -> Result<Vec<ModelEntry>, Error> {
        let provider = self
            .registry
            .provider(service)
            .ok_or_else(|| Error::UnknownService(service.to_string()))?;

        let models = provider
            .list_models()
            .await
            .map_err(|source| Error::Provider {
                service: service.to_string(),
                source,
            })?;

        Ok(models
            .into_iter()
            .map(|model| ModelEntry::unranked(model, service))
            .collect())
    }

    /// Returns the stored snapshot if caching is enabled and it is within the
    /// TTL. Unreadable snapshots count as absent.
    fn fresh_snapshot(&self) -> Option<Snapshot> {
        if !self.use_cache {
            return None;
        }

        let snapshot = match self.store.read() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                log::debug!("no cached model listing");
                return None;
            }
            Err(err) => {
                log::debug!("ignoring unusable model cache: {}", err);
                return None;
            }
        };

        let now = (self.clock)();

        if snapshot.is_fresh_at(now, cache_ttl()) {
            log::debug!("using model listing cached at {}", snapshot.timestamp);
            Some(snapshot)
        } else {
            log::debug!("cached model listing from {} expired", snapshot.timestamp);
            None
        }
    }

    /// Queries every registered service, ranks the merged result and stores
    /// it, replacing any previous snapshot.
    pub(crate) async fn refresh(&self) -> Result<Snapshot, Error> {
        let limit = self.registry.len().clamp(1, MAX_CONCURRENT_QUERIES);

        let mut completed = stream::iter(self.registry.providers())
            .map(|provider| async move { (provider.service_name(), provider.list_models().await) })
            .buffer_unordered(limit);

        let mut merged = Vec::new();

        while let Some((service, result)) = completed.next().await {
            match result {
                Ok(models) => {
                    log::info!("service \"{}\" lists {} models", service, models.len());

                    merged.extend(
                        models
                            .into_iter()
                            .map(|model| ModelEntry::unranked(model, service)),
                    );
                }
                Err(err) => log::warn!("service query failed for \"{}\": {}", service, err),
            }

            if let Some(added) = self.added_models.get(service) {
                merged.extend(
                    added
                        .iter()
                        .map(|model| ModelEntry::unranked(model.as_str(), service)),
                );
            }
        }

        let snapshot = Snapshot::ranked((self.clock)(), merged);

        self.store.write(&snapshot).map_err(Error::Persist)?;

        Ok(snapshot)
    }
}
