//! Spawns the app on a random port on top of an in-memory store.
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, OnceLock},
};

use anyhow::Result;
use reqwest::Response;
use serde_json::{json, Value};
use teedrop::{
    config::Collections,
    init_dbg_tracing,
    store::{DocumentStore, InMemoryDocumentStore},
    web::types::SUBSCRIBER_KEY,
    App, AppState, StoreInfo,
};
use tokio::net::TcpListener;

/// Trying to bind port 0 will trigger an OS scan for an available port
/// which will then be bound to the application.
const TEST_SOCK_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), 0);

/// Set `TEST_LOG` to see the application logs while testing.
fn init_test_subscriber() {
    static SUBSCRIBER: OnceLock<()> = OnceLock::new();
    SUBSCRIBER.get_or_init(|| {
        if std::env::var("TEST_LOG").is_ok() {
            init_dbg_tracing();
        }
    });
}

pub struct TestApp {
    pub addr: SocketAddr,
    pub http_client: reqwest::Client,
    pub store: Arc<InMemoryDocumentStore>,
    pub collections: Collections,
}

impl TestApp {
    /// Serves the app in a separate task, returning once the listener is bound.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_store_info(StoreInfo::default()).await
    }

    pub async fn spawn_with_store_info(store_info: StoreInfo) -> Result<Self> {
        init_test_subscriber();

        let collections = Collections::default();
        let store = Arc::new(
            InMemoryDocumentStore::new()
                .with_unique_key(collections.subscribers.clone(), SUBSCRIBER_KEY),
        );
        let app_state = AppState::new(store.clone(), collections.clone(), store_info);

        let listener = TcpListener::bind(TEST_SOCK_ADDR).await?;
        let addr = listener.local_addr()?;

        tokio::spawn(teedrop::serve(App::new(app_state, listener)));

        Ok(TestApp {
            addr,
            http_client: reqwest::Client::new(),
            store,
            collections,
        })
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.http_client
            .get(format!("http://{}{path}", self.addr))
            .send()
            .await
    }

    pub async fn post_subscribe(&self, body: &Value) -> reqwest::Result<Response> {
        self.http_client
            .post(format!("http://{}/api/subscribe", self.addr))
            .json(body)
            .send()
            .await
    }

    /// Inserts a catalog document directly into the store.
    pub async fn insert_tee(&self, tee: Value) -> Result<()> {
        let document = tee
            .as_object()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("tee fixture must be a json object"))?;
        self.store
            .create_document(&self.collections.catalog, document)
            .await?;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.store.count(&self.collections.subscribers)
    }
}

/// A valid catalog document.
pub fn tee(slug: &str, release_month: &str, status: &str) -> Value {
    json!({
        "name": format!("Tee {slug}"),
        "slug": slug,
        "description": "Heavyweight cotton, numbered print.",
        "price": 42.5,
        "image": format!("https://cdn.example.com/tees/{slug}.png"),
        "gallery": [format!("https://cdn.example.com/tees/{slug}-back.png")],
        "colorway": "Bone",
        "release_month": release_month,
        "status": status,
        "tags": ["limited", "drop"],
    })
}
