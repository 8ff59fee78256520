use crate::catalog::config::CatalogConfig;
use crate::catalog::models::Catalog;
use crate::catalog::{CatalogError, builder, source};
use reqwest::Client;
use serde::Serialize;
use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
    time::Instant,
};
use tracing::{error, info, warn};

/// Process-wide holder of the last good catalog.
///
/// Catalogs are built off to the side and swapped in whole, so readers see
/// either the previous catalog or the new one and a failed refresh never
/// blanks a working catalog.
#[derive(Clone)]
pub struct CatalogStore {
    slot: Arc<RwLock<Arc<Catalog>>>,
    config: Arc<CatalogConfig>,
    http: Client,
    cache_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshSource {
    Remote,
    Cache,
    Retained,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshOutcome {
    pub source: RefreshSource,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CatalogStore {
    pub fn new(config: CatalogConfig, http: Client, cache_path: PathBuf) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(Catalog::default()))),
            config: Arc::new(config),
            http,
            cache_path,
        }
    }

    pub fn get(&self) -> Arc<Catalog> {
        match self.slot.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        match self.slot.write() {
            Ok(mut guard) => *guard = next.clone(),
            Err(poisoned) => *poisoned.into_inner() = next.clone(),
        }
        next
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Builds a catalog from workbook bytes and swaps it in on success.
    pub async fn load_bytes(&self, bytes: Vec<u8>) -> Result<Arc<Catalog>, CatalogError> {
        let started = Instant::now();
        let config = self.config.clone();
        let catalog = tokio::task::spawn_blocking(move || builder::build(bytes, &config))
            .await
            .map_err(|err| CatalogError::Workbook(format!("build task failed: {err}")))??;
        crate::metrics::catalog_loaded(catalog.items.len(), started.elapsed().as_millis());
        Ok(self.replace(catalog))
    }

    /// Loads an uploaded workbook and keeps it as the local cache copy.
    pub async fn load_upload(&self, bytes: Vec<u8>) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = self.load_bytes(bytes.clone()).await?;
        self.write_cache(&bytes).await;
        Ok(catalog)
    }

    /// Loads whatever workbook was last cached on disk, if any.
    pub async fn load_cached(&self) -> Result<Arc<Catalog>, CatalogError> {
        let bytes = tokio::fs::read(&self.cache_path).await.map_err(|err| {
            CatalogError::SourceFetch(format!("{}: {err}", self.cache_path.display()))
        })?;
        self.load_bytes(bytes).await
    }

    /// Re-fetches the configured source. On fetch failure the cached workbook
    /// is tried; if that fails too the current catalog is kept.
    pub async fn refresh(&self) -> RefreshOutcome {
        let fetched = source::fetch_bytes(self.config.source.as_ref(), &self.http).await;
        let fetch_error = match fetched {
            Ok(bytes) => match self.load_bytes(bytes.clone()).await {
                Ok(catalog) => {
                    self.write_cache(&bytes).await;
                    info!(
                        target = "showroom.catalog",
                        items = catalog.items.len(),
                        sheet = %catalog.sheet_name,
                        header_row = catalog.header_row,
                        "catalog loaded from source"
                    );
                    return RefreshOutcome {
                        source: RefreshSource::Remote,
                        count: catalog.items.len(),
                        error: None,
                    };
                }
                Err(err) => err,
            },
            Err(err) => err,
        };
        error!(target = "showroom.catalog", error = %fetch_error, "catalog refresh failed");

        match self.load_cached().await {
            Ok(catalog) => {
                info!(
                    target = "showroom.catalog",
                    items = catalog.items.len(),
                    "catalog loaded from local cache"
                );
                RefreshOutcome {
                    source: RefreshSource::Cache,
                    count: catalog.items.len(),
                    error: Some(fetch_error.to_string()),
                }
            }
            Err(cache_err) => {
                let current = self.get();
                warn!(
                    target = "showroom.catalog",
                    error = %cache_err,
                    items = current.items.len(),
                    "no usable cached workbook; keeping current catalog"
                );
                RefreshOutcome {
                    source: RefreshSource::Retained,
                    count: current.items.len(),
                    error: Some(fetch_error.to_string()),
                }
            }
        }
    }

    async fn write_cache(&self, bytes: &[u8]) {
        if let Some(parent) = self.cache_path.parent()
            && let Err(err) = tokio::fs::create_dir_all(parent).await
        {
            warn!(target = "showroom.catalog", error = %err, "unable to create cache dir");
            return;
        }
        if let Err(err) = tokio::fs::write(&self.cache_path, bytes).await {
            warn!(
                target = "showroom.catalog",
                path = %self.cache_path.display(),
                error = %err,
                "unable to cache workbook"
            );
        }
    }
}
