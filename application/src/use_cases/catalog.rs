//! Tool catalog store and refresh use case.
//!
//! [`CatalogStore`] is created at startup and injected wherever the catalog
//! is read. Readers take a cheap `Arc` snapshot; discovery swaps in a new
//! snapshot wholesale, so a reader never sees a half-updated catalog.

use crate::ports::tool_discovery::{Credentials, DiscoveryError, ToolDiscoveryPort};
use chrono::Utc;
use std::sync::{Arc, RwLock};
use thiserror::Error;
use toolgate_domain::ToolCatalog;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Discovery returned no tools")]
    Empty,
}

#[derive(Debug, Default)]
pub struct CatalogStore {
    current: RwLock<Arc<ToolCatalog>>,
}

impl CatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<ToolCatalog> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the snapshot atomically.
    pub fn replace(&self, catalog: ToolCatalog) -> Arc<ToolCatalog> {
        let catalog = Arc::new(catalog);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = catalog.clone();
        catalog
    }
}

/// Re-run discovery and swap the catalog. On failure the previous snapshot
/// stays in place.
pub struct RefreshCatalogUseCase {
    discovery: Arc<dyn ToolDiscoveryPort>,
    store: Arc<CatalogStore>,
}

impl RefreshCatalogUseCase {
    pub fn new(discovery: Arc<dyn ToolDiscoveryPort>, store: Arc<CatalogStore>) -> Self {
        Self { discovery, store }
    }

    pub async fn execute(&self, credentials: &Credentials) -> Result<Arc<ToolCatalog>, CatalogError> {
        let descriptors = match self.discovery.discover(credentials).await {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "Tool discovery failed, keeping previous catalog");
                return Err(e.into());
            }
        };
        if descriptors.is_empty() {
            warn!("Tool discovery returned an empty list, keeping previous catalog");
            return Err(CatalogError::Empty);
        }

        let catalog = self
            .store
            .replace(ToolCatalog::from_descriptors(descriptors, Utc::now()));
        info!(
            tools = catalog.len(),
            write_tools = catalog.write_tools().count(),
            "Tool catalog refreshed"
        );
        Ok(catalog)
    }
}
