//! Named providers plus their model aliases.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use fleet_core::provider::Provider;
use fleet_settings::ProviderSettings;

use crate::command::CommandProvider;

struct CatalogEntry {
    provider: Arc<dyn Provider>,
    aliases: BTreeMap<String, String>,
}

impl CatalogEntry {
    fn resolve_model(&self, requested: Option<&str>) -> String {
        let wanted = requested
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.provider.default_model());
        self.aliases
            .get(wanted)
            .cloned()
            .unwrap_or_else(|| wanted.to_owned())
    }
}

/// Public description of a configured provider.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub default_model: String,
    pub timeout_secs: u64,
    pub aliases: BTreeMap<String, String>,
}

/// Provider type tag → implementation.
#[derive(Default)]
pub struct ProviderCatalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl ProviderCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// One [`CommandProvider`] per configured entry.
    pub fn from_settings(providers: &BTreeMap<String, ProviderSettings>) -> Self {
        let mut catalog = Self::new();
        for (name, settings) in providers {
            let aliases = settings.aliases.clone();
            let provider = CommandProvider::new(name.clone(), settings.clone());
            catalog.insert_with_aliases(Arc::new(provider), aliases);
        }
        catalog
    }

    /// Register a provider under its own name, replacing any previous entry.
    pub fn insert(&mut self, provider: Arc<dyn Provider>) {
        self.insert_with_aliases(provider, BTreeMap::new());
    }

    pub fn insert_with_aliases(
        &mut self,
        provider: Arc<dyn Provider>,
        aliases: BTreeMap<String, String>,
    ) {
        let name = provider.name().to_owned();
        let _ = self.entries.insert(name, CatalogEntry { provider, aliases });
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.entries.get(name).map(|e| e.provider.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a requested model for `provider`.
    ///
    /// Empty or absent ⇒ the provider's default (itself alias-resolved);
    /// a known alias ⇒ its full name; anything else passes through.
    /// `None` when the provider is unknown.
    pub fn resolve_model(&self, provider: &str, requested: Option<&str>) -> Option<String> {
        self.entries
            .get(provider)
            .map(|entry| entry.resolve_model(requested))
    }

    pub fn info(&self) -> Vec<ProviderInfo> {
        self.entries
            .iter()
            .map(|(name, entry)| ProviderInfo {
                name: name.clone(),
                default_model: entry.provider.default_model().to_owned(),
                timeout_secs: entry.provider.timeout().as_secs(),
                aliases: entry.aliases.clone(),
            })
            .collect()
    }
}
