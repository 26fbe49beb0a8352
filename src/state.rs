use crate::application::ports::connectivity::ConnectivityService;
use crate::application::ports::offline_store::OfflineStore;
use crate::application::ports::remote_store::RemoteStore;
use crate::application::ports::session::SessionProvider;
use crate::application::services::{PosService, RemoteApplier, SyncEngine, SyncQueueWriter};
use crate::infrastructure::connectivity::ConnectivityMonitor;
use crate::infrastructure::database::ConnectionPool;
use crate::infrastructure::jobs::{SyncAgent, SyncAgentHandle};
use crate::infrastructure::offline::SqliteOfflineStore;
use crate::infrastructure::remote::PostgrestRemoteStore;
use crate::infrastructure::session::SessionSlot;
use crate::shared::config::AppConfig;
use std::sync::Arc;

/// Composition root: one instance per device process.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub pool: ConnectionPool,
    pub offline_store: Arc<dyn OfflineStore>,
    pub remote: Arc<dyn RemoteStore>,
    pub connectivity: Arc<ConnectivityMonitor>,
    pub session: Arc<SessionSlot>,
    pub queue_writer: Arc<SyncQueueWriter>,
    pub applier: Arc<RemoteApplier>,
    pub sync_engine: Arc<SyncEngine>,
    pub pos_service: Arc<PosService>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate().map_err(anyhow::Error::msg)?;
        std::fs::create_dir_all(&config.storage.data_dir)?;

        let pool = ConnectionPool::from_config(&config.database).await?;
        pool.migrate().await?;
        let remote: Arc<dyn RemoteStore> = Arc::new(PostgrestRemoteStore::from_config(&config.remote)?);

        tracing::info!(
            target: "sync::agent",
            database = %config.database.url,
            remote = config.remote.url.as_deref().unwrap_or_default(),
            "local store ready"
        );
        Ok(Self::assemble(config, pool, remote, true))
    }

    /// Wires the services around an opened, migrated pool and a remote store.
    pub fn assemble(
        config: AppConfig,
        pool: ConnectionPool,
        remote: Arc<dyn RemoteStore>,
        initially_online: bool,
    ) -> Self {
        let offline_store: Arc<dyn OfflineStore> =
            Arc::new(SqliteOfflineStore::new(pool.get_pool().clone()));
        let connectivity = Arc::new(ConnectivityMonitor::new(initially_online));
        let session = Arc::new(SessionSlot::default());

        let queue_writer = Arc::new(SyncQueueWriter::new(Arc::clone(&offline_store)));
        let applier = Arc::new(RemoteApplier::new(Arc::clone(&remote)));
        let connectivity_port: Arc<dyn ConnectivityService> = connectivity.clone();
        let session_port: Arc<dyn SessionProvider> = session.clone();

        let sync_engine = Arc::new(SyncEngine::new(
            Arc::clone(&offline_store),
            Arc::clone(&applier),
            Arc::clone(&connectivity_port),
            Arc::clone(&session_port),
        ));
        let pos_service = Arc::new(PosService::new(
            Arc::clone(&applier),
            Arc::clone(&queue_writer),
            connectivity_port,
            session_port,
        ));

        Self {
            config,
            pool,
            offline_store,
            remote,
            connectivity,
            session,
            queue_writer,
            applier,
            sync_engine,
            pos_service,
        }
    }

    pub fn start_sync_agent(&self) -> SyncAgentHandle {
        SyncAgent::spawn(
            Arc::clone(&self.sync_engine),
            self.connectivity.clone(),
            &self.config.sync,
        )
    }
}
