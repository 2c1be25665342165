//! Registry for managing named retry executors.
//!
//! The seam by which wiring code obtains executors: a name-keyed cache plus
//! a process-wide default policy. The registry holds no retry logic of its
//! own.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::warn;

use crate::config::RetryConfig;
use crate::retry::Retry;

/// Name-keyed cache of [`Retry`] executors sharing a default policy.
pub struct RetryRegistry<T, E> {
    default_config: Arc<RetryConfig<T, E>>,
    entries: Arc<RwLock<HashMap<Arc<str>, Retry<T, E>>>>,
}

impl<T, E> Clone for RetryRegistry<T, E> {
    fn clone(&self) -> Self {
        Self { default_config: self.default_config.clone(), entries: self.entries.clone() }
    }
}

impl<T, E> std::fmt::Debug for RetryRegistry<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryRegistry")
            .field("default_config", &self.default_config)
            .field("entries", &self.entries.read().expect("retry registry poisoned").len())
            .finish()
    }
}

impl<T, E> RetryRegistry<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    /// Registry whose unnamed creations use `default_config`.
    pub fn new(default_config: RetryConfig<T, E>) -> Self {
        Self {
            default_config: Arc::new(default_config),
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registry using the documented policy defaults.
    pub fn with_defaults() -> Self {
        Self::new(RetryConfig::with_defaults())
    }

    /// The policy used when a name is first seen without its own config.
    pub fn default_config(&self) -> &RetryConfig<T, E> {
        &self.default_config
    }

    /// Return the executor cached under `name`, creating it from the
    /// default policy on first use.
    pub fn retry(&self, name: &str) -> Retry<T, E> {
        self.get_or_create(name, None)
    }

    /// Return the executor cached under `name`, creating it from `config`
    /// on first use. A previously cached executor wins over `config`.
    pub fn retry_with_config(&self, name: &str, config: RetryConfig<T, E>) -> Retry<T, E> {
        self.get_or_create(name, Some(config))
    }

    fn get_or_create(&self, name: &str, config: Option<RetryConfig<T, E>>) -> Retry<T, E> {
        if let Some(existing) = self.find(name) {
            return existing;
        }
        let mut entries = self.entries.write().expect("retry registry poisoned");
        // Re-check under the write lock; another caller may have won the race.
        if let Some(existing) = entries.get(name) {
            return existing.clone();
        }
        let config = config.unwrap_or_else(|| self.default_config.as_ref().clone());
        let name: Arc<str> = Arc::from(name);
        let created = Retry::new(name.clone(), config);
        entries.insert(name, created.clone());
        created
    }

    /// Replace whatever is cached under `name` with a fresh executor built
    /// from `config`. Existing handles to the old executor keep working;
    /// the replacement only affects future lookups.
    pub fn replace(&self, name: &str, config: RetryConfig<T, E>) -> Retry<T, E> {
        let mut entries = self.entries.write().expect("retry registry poisoned");
        if entries.contains_key(name) {
            warn!(target: "reattempt::registry", name = %name, "retry executor replaced; last registration wins");
        }
        let name: Arc<str> = Arc::from(name);
        let created = Retry::new(name.clone(), config);
        entries.insert(name, created.clone());
        created
    }

    /// Look up an executor without creating one.
    pub fn find(&self, name: &str) -> Option<Retry<T, E>> {
        self.entries.read().expect("retry registry poisoned").get(name).cloned()
    }

    /// Drop the executor cached under `name`, returning it if present.
    pub fn remove(&self, name: &str) -> Option<Retry<T, E>> {
        self.entries.write().expect("retry registry poisoned").remove(name)
    }

    /// Names of all cached executors, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().expect("retry registry poisoned");
        let mut names: Vec<String> = entries.keys().map(|name| name.to_string()).collect();
        names.sort();
        names
    }
}

impl<T, E> Default for RetryRegistry<T, E>
where
    T: Send + Sync + 'static,
    E: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::with_defaults()
    }
}
