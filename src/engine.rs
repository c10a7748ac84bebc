//! The cache engine: owns the index and ties source, exclusion rules,
//! persistence and the published query view together.
//!
//! All mutation goes through `&mut self`, so one owner serializes every
//! update, reconcile and flush. Readers use the [`WordCounts`] handle from
//! [`WordCountCache::query`], which is republished after each mutation.

use std::time::Duration;

use tracing::{debug, info};

use crate::error::CacheError;
use crate::exclusion::ExclusionConfig;
use crate::persist::{FlushOutcome, Persistence};
use crate::query::WordCounts;
use crate::reconcile::{self, ReconcileStats};
use crate::source::{DocumentEvent, DocumentSource};
use crate::store::IndexStore;
use crate::updater::{self, UpdateOutcome};
use crate::{DocumentId, DEFAULT_EXTENSIONS};

pub struct WordCountCache<S: DocumentSource> {
    source: S,
    store: IndexStore,
    config: ExclusionConfig,
    extensions: Vec<String>,
    persistence: Persistence,
    query: WordCounts,
}

impl<S: DocumentSource> WordCountCache<S> {
    /// Load the snapshot (if any) and publish it. No reconciliation happens
    /// here; cached counts are served until [`reconcile`](Self::reconcile) runs.
    pub fn open(source: S, config: ExclusionConfig, persistence: Persistence) -> Self {
        let store = persistence.load();
        let query = WordCounts::new();
        query.publish(&store);
        Self {
            source,
            store,
            config: config.normalized(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            persistence,
            query,
        }
    }

    /// Count documents with these extensions instead of the defaults.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter()
            .map(|e| e.trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn query(&self) -> WordCounts {
        self.query.clone()
    }

    pub fn store(&self) -> &IndexStore {
        &self.store
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &ExclusionConfig {
        &self.config
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    fn publish(&self) {
        self.query.publish(&self.store);
    }

    /// Full pass over the source. On a listing failure the index is untouched.
    pub fn reconcile(&mut self) -> Result<ReconcileStats, CacheError> {
        let stats = reconcile::reconcile(&mut self.store, &self.source, &self.config, &self.extensions)?;
        self.publish();
        Ok(stats)
    }

    /// Startup pass with one retry on an empty listing.
    pub fn initial_reconcile(&mut self, retry_delay: Duration) -> Result<ReconcileStats, CacheError> {
        let stats = reconcile::initial_reconcile(
            &mut self.store,
            &self.source,
            &self.config,
            &self.extensions,
            retry_delay,
        )?;
        self.publish();
        Ok(stats)
    }

    pub fn handle_event(&mut self, event: &DocumentEvent) -> Vec<(DocumentId, UpdateOutcome)> {
        let outcomes = updater::apply_event(&mut self.store, &self.source, &self.config, &self.extensions, event);
        if outcomes.iter().any(|(_, o)| o.changed()) {
            self.publish();
        }
        outcomes
    }

    pub fn update_file(&mut self, id: &DocumentId) -> UpdateOutcome {
        let outcome = updater::update_file(&mut self.store, &self.source, &self.config, &self.extensions, id, None);
        if outcome.changed() {
            self.publish();
        }
        outcome
    }

    pub fn remove_file(&mut self, id: &DocumentId) -> UpdateOutcome {
        let outcome = updater::remove_file(&mut self.store, id);
        if outcome.changed() {
            self.publish();
        }
        outcome
    }

    /// Install new exclusion rules and reconcile so the index matches them.
    /// The rules are kept even if the reconcile fails.
    pub fn set_config(&mut self, config: ExclusionConfig) -> Result<ReconcileStats, CacheError> {
        let config = config.normalized();
        info!(
            folders = ?config.excluded_folders,
            files = ?config.excluded_files,
            "Exclusion settings changed, reconciling"
        );
        self.config = config;
        self.reconcile()
    }

    pub fn flush(&mut self) -> FlushOutcome {
        self.persistence.flush(&mut self.store)
    }

    /// Final flush before the engine is dropped.
    pub fn shutdown(mut self) -> FlushOutcome {
        let outcome = self.flush();
        debug!(outcome = ?outcome, "Cache shut down");
        outcome
    }
}
