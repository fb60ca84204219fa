//! Provider lookup table built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use fxhistory_common::ProviderId;
use tracing::warn;

use crate::error::{HistoryError, HistoryResult};
use crate::provider::RateProvider;

/// How a request picks its provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderSelection {
    /// Use the configured default.
    Default,
    /// Use the named provider, falling back to the default when unknown.
    Named(ProviderId),
}

impl ProviderSelection {
    /// Build from an optional caller-supplied id.
    pub fn from_optional(id: Option<&str>) -> Self {
        match id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) => ProviderSelection::Named(ProviderId::new(id)),
            None => ProviderSelection::Default,
        }
    }
}

/// Immutable registry of rate providers keyed by id.
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn RateProvider>>,
    default_id: ProviderId,
}

impl ProviderRegistry {
    /// Create a registry. Fails when `default_id` is not among `providers`.
    pub fn new(
        providers: Vec<Arc<dyn RateProvider>>,
        default_id: ProviderId,
    ) -> HistoryResult<Self> {
        let mut table: HashMap<ProviderId, Arc<dyn RateProvider>> = HashMap::new();
        for provider in providers {
            let id = provider.id().clone();
            if table.contains_key(&id) {
                warn!(provider = %id, "Duplicate provider registration ignored");
                continue;
            }
            table.insert(id, provider);
        }

        if !table.contains_key(&default_id) {
            return Err(HistoryError::UnknownProvider(default_id.to_string()));
        }

        Ok(Self {
            providers: table,
            default_id,
        })
    }

    /// Look up a provider by exact id.
    pub fn get(&self, id: &ProviderId) -> Option<Arc<dyn RateProvider>> {
        self.providers.get(id).cloned()
    }

    /// The configured default provider.
    pub fn default_provider(&self) -> Arc<dyn RateProvider> {
        // Presence checked in `new`; the table is never mutated afterwards.
        self.providers[&self.default_id].clone()
    }

    pub fn default_id(&self) -> &ProviderId {
        &self.default_id
    }

    /// Resolve a selection to a provider.
    pub fn resolve(&self, selection: &ProviderSelection) -> Arc<dyn RateProvider> {
        match selection {
            ProviderSelection::Default => self.default_provider(),
            ProviderSelection::Named(id) => match self.get(id) {
                Some(provider) => provider,
                None => {
                    warn!(
                        provider = %id,
                        default = %self.default_id,
                        "Exchange rate provider not found, using default"
                    );
                    self.default_provider()
                }
            },
        }
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self.providers.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }
}
