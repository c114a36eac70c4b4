//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own databases, a scripted
//! satellite API and a live continuation runner, so an import started over
//! HTTP drains end to end exactly as it would in production.

use anyhow::Result;
use async_trait::async_trait;
use casino_sync_server::background::{
    ChannelDispatcher, ContinuationRunner, ProcessConfig, TriggerAuth,
};
use casino_sync_server::content::{ContentStore, EntityKind, SqliteContentStore};
use casino_sync_server::jobs::Pipeline;
use casino_sync_server::satellite::{CatalogApi, ListQuery, PageResponse};
use casino_sync_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use casino_sync_server::SqliteKvStore;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::constants::*;

fn brand_record(id: i64, name: &str) -> JsonValue {
    json!({
        "id": id,
        "name": name,
        "url": format!("https://brands.example.com/{id}"),
        "image": format!("https://cdn.example.com/brands/{id}.png"),
        "yearEstablished": 2000 + id,
        "platform": "NetGames",
    })
}

fn slot_record(id: i64, name: &str) -> JsonValue {
    json!({
        "id": id,
        "name": name,
        "url": format!("https://slots.example.com/{id}"),
        "image": format!("https://cdn.example.com/slots/{id}.png"),
        "payoutPercentage": 96.5,
        "rows": 3,
        "reels": 5,
        "paylines": 20,
        "minBet": 0.1,
        "maxBet": 100,
        "maxProfit": 250000,
        "volatility": "medium",
        "hasJackpot": true,
        "hasProgressiveSlot": false,
        "hasAutoPlay": true,
        "hasBonusBuy": false,
        "isMegaways": false,
        "hasHoldAndWin": false,
        "softwareProvider": {"id": 5, "name": "NetEnt"},
    })
}

/// Scripted satellite API serving an in-memory dataset.
pub struct ScriptedCatalog {
    brands: Mutex<Vec<JsonValue>>,
    slots: Mutex<Vec<JsonValue>>,
    fail_requests: AtomicBool,
    /// Number of options listing fetches served (or refused).
    pub options_calls: AtomicUsize,
    /// Number of page fetches served (or refused).
    pub page_calls: AtomicUsize,
}

impl ScriptedCatalog {
    /// Three brands and two slots, the standard dataset most tests use.
    pub fn with_default_dataset() -> Self {
        ScriptedCatalog {
            brands: Mutex::new(vec![
                brand_record(BRAND_1_ID, BRAND_1_NAME),
                brand_record(BRAND_2_ID, BRAND_2_NAME),
                brand_record(BRAND_3_ID, BRAND_3_NAME),
            ]),
            slots: Mutex::new(vec![
                slot_record(SLOT_1_ID, SLOT_1_NAME),
                slot_record(SLOT_2_ID, SLOT_2_NAME),
            ]),
            fail_requests: AtomicBool::new(false),
            options_calls: AtomicUsize::new(0),
            page_calls: AtomicUsize::new(0),
        }
    }

    /// A satellite with no records at all.
    pub fn empty() -> Self {
        ScriptedCatalog {
            brands: Mutex::new(vec![]),
            slots: Mutex::new(vec![]),
            fail_requests: AtomicBool::new(false),
            options_calls: AtomicUsize::new(0),
            page_calls: AtomicUsize::new(0),
        }
    }

    /// A satellite that refuses every request.
    pub fn failing() -> Self {
        let catalog = Self::with_default_dataset();
        catalog.fail_requests.store(true, Ordering::SeqCst);
        catalog
    }

    /// Removes one record from the dataset, as if it were deleted on the
    /// satellite side.
    pub fn remove_record(&self, kind: EntityKind, id: i64) {
        let records = match kind {
            EntityKind::Brand => &self.brands,
            EntityKind::Slot => &self.slots,
        };
        records.lock().unwrap().retain(|r| r["id"] != id);
    }

    fn records(&self, kind: EntityKind) -> Vec<JsonValue> {
        match kind {
            EntityKind::Brand => self.brands.lock().unwrap().clone(),
            EntityKind::Slot => self.slots.lock().unwrap().clone(),
        }
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn get_options(&self, kind: EntityKind, _query: &ListQuery) -> Result<Vec<JsonValue>> {
        self.options_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            anyhow::bail!("scripted satellite failure");
        }
        Ok(self.records(kind))
    }

    async fn get_page(
        &self,
        kind: EntityKind,
        page: u32,
        per_page: u32,
        _query: &ListQuery,
    ) -> Result<PageResponse> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_requests.load(Ordering::SeqCst) {
            anyhow::bail!("scripted satellite failure");
        }
        let start = ((page.saturating_sub(1)) * per_page) as usize;
        let data = self
            .records(kind)
            .into_iter()
            .skip(start)
            .take(per_page as usize)
            .collect();
        Ok(PageResponse { data })
    }
}

/// Test server instance with isolated databases
///
/// When dropped, the server and the continuation runner shut down and temp
/// resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Content store for direct database access in tests
    pub content_store: Arc<dyn ContentStore>,

    /// The scripted satellite, exposed for its call counters
    pub catalog: Arc<ScriptedCatalog>,

    // Private fields - keep resources alive until drop
    _temp_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestServer {
    /// Spawns a new test server on a random port with the standard dataset.
    pub async fn spawn() -> Self {
        Self::spawn_with_catalog(ScriptedCatalog::with_default_dataset()).await
    }

    /// Spawns a new test server backed by the given scripted satellite.
    pub async fn spawn_with_catalog(catalog: ScriptedCatalog) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let kv_store =
            Arc::new(SqliteKvStore::new(temp_dir.path().join("jobs.db")).expect("Failed to open job store"));
        let content_store: Arc<dyn ContentStore> = Arc::new(
            SqliteContentStore::new(temp_dir.path().join("content.db"))
                .expect("Failed to open content store"),
        );
        let catalog = Arc::new(catalog);

        let (dispatcher, continuation_rx) = ChannelDispatcher::new(16);
        let pipeline = Arc::new(Pipeline::new(
            kv_store,
            content_store.clone(),
            catalog.clone(),
            Arc::new(dispatcher),
            Arc::new(TriggerAuth::new(Duration::from_secs(60))),
            ProcessConfig::default(),
            TEST_PER_PAGE,
        ));

        let shutdown = CancellationToken::new();
        let runner = ContinuationRunner::new(continuation_rx, pipeline.registry());
        tokio::spawn(runner.run(shutdown.clone()));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            port,
            metrics_port: 0,
            requests_logging_level: RequestsLoggingLevel::None,
        };
        let app = make_app(config, pipeline, "test".to_owned());

        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        TestServer {
            base_url,
            port,
            content_store,
            catalog,
            _temp_dir: temp_dir,
            shutdown,
        }
    }

    /// Seeds a published entry directly into the content store.
    pub fn seed_entry(&self, kind: EntityKind, external_id: i64, title: &str) {
        self.content_store
            .insert_entry(kind, external_id, title)
            .expect("Failed to seed entry");
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Polls `condition` until it holds or a 5 second deadline passes.
pub async fn wait_until<F>(description: &str, condition: F)
where
    F: Fn() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if condition() {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting until {description}");
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
