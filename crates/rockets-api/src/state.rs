//! Shared application state.

use std::sync::Arc;

use rockets_bus::Bus;
use rockets_messaging::Deduplicator;
use rockets_messaging::in_memory::InMemoryDeduplicator;
use rockets_messaging::redis_deduplicator::RedisDeduplicator;
use rockets_rocket::application::event_handlers::event_bus;
use rockets_rocket::application::processor::MessageProcessor;
use rockets_rocket::application::query_handlers::{RocketQuery, RocketQueryResponse, query_bus};
use rockets_rocket::domain::repository::RocketRepository;
use rockets_rocket::infrastructure::in_memory_repository::InMemoryRocketRepository;
use rockets_sync::in_memory::InMemoryLockStore;
use rockets_sync::redis_store::RedisLockStore;
use rockets_sync::{LockStore, MutexService};
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::error::AppError;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Ingestion pipeline behind `POST /messages`.
    pub processor: MessageProcessor,
    /// Read side behind `GET /rockets`.
    pub queries: Arc<Bus<RocketQuery, RocketQueryResponse>>,
}

impl AppState {
    /// Wires the pipeline and query side over the given stores.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RocketRepository>,
        lock_store: Arc<dyn LockStore>,
        deduplicator: Arc<dyn Deduplicator>,
        config: &AppConfig,
    ) -> Self {
        let events = Arc::new(event_bus(Arc::clone(&repository), config.guard));
        let mutex = MutexService::new(lock_store, config.mutex.clone());
        let processor =
            MessageProcessor::new(events, mutex, deduplicator).with_dedup_ttl(config.dedup_ttl);

        Self {
            processor,
            queries: Arc::new(query_bus(repository)),
        }
    }

    /// Connects the configured coordination store and wires the state.
    ///
    /// # Errors
    ///
    /// Returns `AppError::LockStore` or `AppError::Deduplication` if Redis is
    /// configured but unreachable.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let (lock_store, deduplicator): (Arc<dyn LockStore>, Arc<dyn Deduplicator>) =
            match &config.redis_url {
                Some(url) => {
                    info!("using redis coordination store");
                    (
                        Arc::new(RedisLockStore::connect(url).await?),
                        Arc::new(RedisDeduplicator::connect(url).await?),
                    )
                }
                None => {
                    warn!("REDIS_URL not set, coordinating within this process only");
                    (
                        Arc::new(InMemoryLockStore::new()),
                        Arc::new(InMemoryDeduplicator::new()),
                    )
                }
            };
        info!(guard = %config.guard, "rocket state guard configured");

        Ok(Self::new(
            Arc::new(InMemoryRocketRepository::new()),
            lock_store,
            deduplicator,
            config,
        ))
    }
}
