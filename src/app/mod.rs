use std::{net::SocketAddr, sync::Arc};

use derive_more::Deref;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::{AppConfig, Collections, StoreConfig},
    store::{validate_name, DocumentStore, PgDocumentStore},
    web::types::SUBSCRIBER_KEY,
    Result,
};

// ###################################
// ->  Structs
// ###################################
pub struct App {
    pub app_state: AppState,
    pub listener: TcpListener,
}
impl App {
    pub fn new(app_state: AppState, listener: TcpListener) -> Self {
        App {
            app_state,
            listener,
        }
    }

    /// Builds the PostgreSQL backed store and binds the listener.
    /// The store connects lazily, an unreachable database does not fail the build.
    pub async fn build_from_config(config: &AppConfig) -> Result<Self> {
        let store_config = &config.store_config;
        let collections = store_config.collections.clone();
        validate_name(&collections.catalog)?;
        validate_name(&collections.subscribers)?;

        let store = PgDocumentStore::init(
            store_config.connection_options()?,
            store_config.max_connections,
            store_config.acquire_timeout(),
        )
        .with_unique_key(collections.subscribers.clone(), SUBSCRIBER_KEY)?;

        let app_state = AppState::new(Arc::new(store), collections, StoreInfo::from(store_config));

        let addr = SocketAddr::from((config.net_config.host, config.net_config.app_port));
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!("{:<20} - {}", "Listening on:", addr);

        let app = App::new(app_state, listener);
        Ok(app)
    }
}

/// Whether `DATABASE_URL` and `DATABASE_NAME` were set, reported by the diagnostics endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreInfo {
    pub url_configured: bool,
    pub name_configured: bool,
}

impl From<&StoreConfig> for StoreInfo {
    fn from(store_config: &StoreConfig) -> Self {
        StoreInfo {
            url_configured: store_config.url_from_env,
            name_configured: store_config.name_from_env,
        }
    }
}

pub struct InternalState {
    pub store: Arc<dyn DocumentStore>,
    pub collections: Collections,
    pub store_info: StoreInfo,
}

/// Application state containing all global data.
/// It implements `Deref` to easily access the fields on `InternalState`
/// Uses an `Arc` so it can be cloned around.
#[derive(Clone, Deref)]
pub struct AppState(Arc<InternalState>);

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collections: Collections,
        store_info: StoreInfo,
    ) -> Self {
        AppState(Arc::new(InternalState {
            store,
            collections,
            store_info,
        }))
    }
}
