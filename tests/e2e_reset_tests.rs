//! End-to-end tests for the reset job and status lifecycle.

mod common;

use casino_sync_server::content::EntityKind;
use common::{wait_until, TestClient, TestServer, BRAND_1_ID, SLOT_1_ID};

#[tokio::test]
async fn test_reset_wipes_both_entity_kinds() {
    let server = TestServer::spawn().await;
    server.seed_entry(EntityKind::Brand, BRAND_1_ID, "Seeded Brand");
    server.seed_entry(EntityKind::Brand, 77, "Another Brand");
    server.seed_entry(EntityKind::Slot, SLOT_1_ID, "Seeded Slot");
    let client = TestClient::new(server.base_url.clone());

    let response = client.reset_data().await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let store = server.content_store.clone();
    wait_until("the content store is empty", move || {
        store.count_entries(EntityKind::Brand).unwrap() == 0
            && store.count_entries(EntityKind::Slot).unwrap() == 0
    })
    .await;
}

#[tokio::test]
async fn test_reset_leaves_job_statuses_alone() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client
        .wait_for_status(|s| s["brandImport"]["status"] == "completed")
        .await;

    client.reset_data().await;
    let store = server.content_store.clone();
    wait_until("the content store is empty", move || {
        store.count_entries(EntityKind::Brand).unwrap() == 0
    })
    .await;

    // A reset run clears data, not the last run's status records
    let status = client.get_status().await;
    assert_eq!(status["brandImport"]["status"], "completed");
}

#[tokio::test]
async fn test_clear_status_does_not_touch_content() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.run_import().await;
    client
        .wait_for_status(|s| {
            ["brandSync", "brandImport", "slotSync", "slotImport"]
                .iter()
                .all(|stage| s[*stage]["status"] == "completed")
        })
        .await;

    let response = client.clear_status().await;
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let status = client.get_status().await;
    for stage in ["brandSync", "brandImport", "slotSync", "slotImport"] {
        assert_eq!(status[stage]["status"], "idle");
        assert_eq!(status[stage]["percent"], 0);
    }

    assert_eq!(
        server
            .content_store
            .count_entries(EntityKind::Brand)
            .unwrap(),
        3
    );
}
