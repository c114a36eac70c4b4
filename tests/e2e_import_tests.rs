//! End-to-end tests for the import pipelines
//!
//! Each test starts a real server with a scripted satellite, kicks the
//! pipelines over HTTP and lets the continuation runner drain them.

mod common;

use casino_sync_server::content::{EntityKind, EntryStatus};
use common::{
    ScriptedCatalog, TestClient, TestServer, BRAND_1_ID, BRAND_1_NAME, BRAND_2_NAME, BRAND_3_NAME,
    SLOT_1_ID, SLOT_1_NAME, SLOT_2_ID,
};
use serde_json::json;
use std::sync::atomic::Ordering;

const ALL_STAGES: [&str; 4] = ["brandSync", "brandImport", "slotSync", "slotImport"];

fn all_completed(status: &serde_json::Value) -> bool {
    ALL_STAGES
        .iter()
        .all(|stage| status[*stage]["status"] == "completed")
}

// =============================================================================
// Full Pipeline Flow
// =============================================================================

#[tokio::test]
async fn test_full_import_materializes_catalog() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.run_import().await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let status = client.wait_for_status(all_completed).await;

    // Completion replaces the whole record, so only status and percent remain
    assert_eq!(status["brandImport"]["percent"], 100);
    assert!(status["brandImport"].get("total").is_none());

    let brands = server.content_store.entries(EntityKind::Brand).unwrap();
    assert_eq!(brands.len(), 3);
    assert!(brands.iter().all(|e| e.status == EntryStatus::Published));
    let titles: Vec<&str> = brands.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec![BRAND_1_NAME, BRAND_2_NAME, BRAND_3_NAME]);

    let slots = server.content_store.entries(EntityKind::Slot).unwrap();
    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].title, SLOT_1_NAME);
}

#[tokio::test]
async fn test_import_fills_mapped_fields() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client.wait_for_status(all_completed).await;

    let fields = server
        .content_store
        .entry_fields(EntityKind::Brand, BRAND_1_ID)
        .unwrap();
    assert_eq!(fields.get("year_established"), Some(&json!(2011)));
    assert_eq!(fields.get("platform"), Some(&json!("NetGames")));
    assert_eq!(
        fields.get("url"),
        Some(&json!(format!("https://brands.example.com/{BRAND_1_ID}")))
    );
    // The matching field is never written as a meta field
    assert!(fields.get("brand_id").is_none());

    let fields = server
        .content_store
        .entry_fields(EntityKind::Slot, SLOT_1_ID)
        .unwrap();
    assert_eq!(fields.get("payout_percentage"), Some(&json!(96.5)));
    assert_eq!(fields.get("min_bet"), Some(&json!(0.1)));
    assert_eq!(fields.get("rows"), Some(&json!(3)));
    assert_eq!(fields.get("volatility"), Some(&json!("medium")));
    assert_eq!(fields.get("is_mega_ways"), Some(&json!(false)));
    assert_eq!(
        fields.get("software_provider"),
        Some(&json!({"id": 5, "name": "NetEnt"}))
    );
}

#[tokio::test]
async fn test_pipelines_page_through_the_satellite() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client.wait_for_status(all_completed).await;

    // One options fetch per sync stage
    assert_eq!(server.catalog.options_calls.load(Ordering::SeqCst), 2);
    // Three brands at two per page, plus two slots on a single page
    assert_eq!(server.catalog.page_calls.load(Ordering::SeqCst), 3);
}

// =============================================================================
// Reconciliation Edge Cases
// =============================================================================

#[tokio::test]
async fn test_sync_refreshes_known_entries_and_drafts_missing_ones() {
    let server = TestServer::spawn().await;
    server.seed_entry(EntityKind::Brand, BRAND_1_ID, "Stale Name");
    server.seed_entry(EntityKind::Brand, 99, "Ghost Casino");
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client.wait_for_status(all_completed).await;

    let refreshed = server
        .content_store
        .find_entry(EntityKind::Brand, BRAND_1_ID)
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.title, BRAND_1_NAME);
    assert_eq!(refreshed.status, EntryStatus::Published);

    let ghost = server
        .content_store
        .find_entry(EntityKind::Brand, 99)
        .unwrap()
        .unwrap();
    assert_eq!(ghost.status, EntryStatus::Draft);
    assert_eq!(ghost.title, "Ghost Casino");
}

#[tokio::test]
async fn test_import_is_skipped_when_nothing_is_local() {
    let server = TestServer::spawn_with_catalog(ScriptedCatalog::empty()).await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    let status = client
        .wait_for_status(|s| {
            s["brandSync"]["status"] == "completed"
                && s["brandImport"]["status"] == "skipped"
                && s["slotImport"]["status"] == "skipped"
        })
        .await;

    assert_eq!(status["slotSync"]["status"], "completed");
    // No local entries means no pages were ever requested
    assert_eq!(server.catalog.page_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unreachable_satellite_leaves_local_entries_untouched() {
    let server = TestServer::spawn_with_catalog(ScriptedCatalog::failing()).await;
    server.seed_entry(EntityKind::Brand, 50, "Resilient Casino");
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client
        .wait_for_status(|s| {
            s["brandSync"]["status"] == "completed"
                && s["brandImport"]["status"] == "completed"
                && s["slotImport"]["status"] == "skipped"
        })
        .await;

    // The failed listing fetch must not draft or delete anything
    let entry = server
        .content_store
        .find_entry(EntityKind::Brand, 50)
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Published);
    assert_eq!(entry.title, "Resilient Casino");

    // The failed page fetch must not write any fields
    let fields = server
        .content_store
        .entry_fields(EntityKind::Brand, 50)
        .unwrap();
    assert!(fields.is_empty());

    assert_eq!(server.catalog.options_calls.load(Ordering::SeqCst), 2);
    assert_eq!(server.catalog.page_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_run_drafts_entries_removed_remotely() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client.wait_for_status(all_completed).await;
    assert_eq!(
        server.content_store.count_entries(EntityKind::Slot).unwrap(),
        2
    );

    // Slot 22 disappears from the satellite between runs
    server.catalog.remove_record(EntityKind::Slot, SLOT_2_ID);
    client.clear_status().await;

    client.run_import().await;
    client.wait_for_status(all_completed).await;

    let removed = server
        .content_store
        .find_entry(EntityKind::Slot, SLOT_2_ID)
        .unwrap()
        .unwrap();
    assert_eq!(removed.status, EntryStatus::Draft);

    let kept = server
        .content_store
        .find_entry(EntityKind::Slot, SLOT_1_ID)
        .unwrap()
        .unwrap();
    assert_eq!(kept.status, EntryStatus::Published);
}
