//! Resumable upload protocol integration tests.

mod helpers;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{Duration, Utc};
use serde_json::Value;

use helpers::{fixtures, setup_test_app, TestApp};

async fn head_upload(app: &TestApp, id: &str) -> axum_test::TestResponse {
    app.client()
        .method(axum::http::Method::HEAD, &format!("/tus/{id}"))
        .add_header("Authorization", app.bearer())
        .await
}

fn upload_metadata(item_id: &str, filename: &str, filetype: &str) -> String {
    format!(
        "itemId {},filename {},filetype {}",
        BASE64.encode(item_id),
        BASE64.encode(filename),
        BASE64.encode(filetype)
    )
}

/// Open a transfer and return its upload id from the Location header.
async fn create_transfer(app: &TestApp, length: usize, metadata: &str) -> String {
    let response = app
        .client()
        .post("/tus")
        .add_header("Authorization", app.bearer())
        .add_header("Upload-Length", length.to_string())
        .add_header("Upload-Metadata", metadata)
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());

    let location = response.header("location");
    location
        .to_str()
        .unwrap()
        .strip_prefix("/tus/")
        .expect("Location should point at the upload")
        .to_string()
}

async fn patch_chunk(
    app: &TestApp,
    id: &str,
    offset: usize,
    chunk: &[u8],
) -> axum_test::TestResponse {
    app.client()
        .patch(&format!("/tus/{id}"))
        .add_header("Authorization", app.bearer())
        .add_header("Content-Type", "application/offset+octet-stream")
        .add_header("Upload-Offset", offset.to_string())
        .bytes(chunk.to_vec().into())
        .await
}

#[tokio::test]
async fn test_chunked_upload_completes_and_ingests() {
    let app = setup_test_app().await;
    let png = fixtures::png_bytes(32, 32);
    let split = png.len() / 2;

    let id = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-tus-1", "chunked.png", "image/png"),
    )
    .await;

    // First half: committed, not complete.
    let response = patch_chunk(&app, &id, 0, &png[..split]).await;
    assert_eq!(response.status_code(), 204);
    assert_eq!(response.header("upload-offset"), split.to_string());

    // Progress survives between requests.
    let head = head_upload(&app, &id).await;
    assert_eq!(head.status_code(), 200);
    assert_eq!(head.header("upload-offset"), split.to_string());
    assert_eq!(head.header("upload-length"), png.len().to_string());

    // Second half completes the transfer and runs ingestion.
    let response = patch_chunk(&app, &id, split, &png[split..]).await;
    assert_eq!(response.status_code(), 200, "{}", response.text());
    let body = response.json::<Value>();
    assert_eq!(body["skipped"], false);
    assert_eq!(body["media"]["filename"], "chunked.png");
    assert_eq!(body["media"]["item_id"], "item-tus-1");
    assert_eq!(body["media"]["width"], 32);
    assert_eq!(body["media"]["filesize"].as_i64().unwrap() as usize, png.len());

    // Session is gone once ingested.
    let head = head_upload(&app, &id).await;
    assert_eq!(head.status_code(), 404);
}

#[tokio::test]
async fn test_offset_mismatch_conflicts_without_consuming_bytes() {
    let app = setup_test_app().await;
    let png = fixtures::png_bytes(16, 16);

    let id = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-tus-2", "offset.png", "image/png"),
    )
    .await;

    let response = patch_chunk(&app, &id, 5, &png[5..10]).await;
    assert_eq!(response.status_code(), 409);

    // Offset unchanged; the upload can proceed from zero.
    let head = head_upload(&app, &id).await;
    assert_eq!(head.header("upload-offset"), "0");

    let response = patch_chunk(&app, &id, 0, &png).await;
    assert_eq!(response.status_code(), 200);
}

#[tokio::test]
async fn test_create_requires_item_id_and_valid_type() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/tus")
        .add_header("Authorization", app.bearer())
        .add_header("Upload-Length", "100")
        .add_header(
            "Upload-Metadata",
            format!("filename {}", BASE64.encode("x.png")),
        )
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(response.text().contains("itemId is required"));

    let response = app
        .client()
        .post("/tus")
        .add_header("Authorization", app.bearer())
        .add_header("Upload-Length", "100")
        .add_header(
            "Upload-Metadata",
            upload_metadata("item-bad-type", "x.txt", "text/plain"),
        )
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(response
        .text()
        .contains("Invalid file type. Only photos and videos are allowed."));

    let response = app
        .client()
        .post("/tus")
        .add_header("Authorization", app.bearer())
        .add_header("Upload-Length", "0")
        .add_header(
            "Upload-Metadata",
            upload_metadata("item-empty", "x.png", "image/png"),
        )
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_create_rejects_used_item_id() {
    let app = setup_test_app().await;
    let png = fixtures::png_bytes(8, 8);

    // Land the item through a completed transfer first.
    let id = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-used", "used.png", "image/png"),
    )
    .await;
    let response = patch_chunk(&app, &id, 0, &png).await;
    assert_eq!(response.status_code(), 200);

    let response = app
        .client()
        .post("/tus")
        .add_header("Authorization", app.bearer())
        .add_header("Upload-Length", png.len().to_string())
        .add_header(
            "Upload-Metadata",
            upload_metadata("item-used", "again.png", "image/png"),
        )
        .await;
    assert_eq!(response.status_code(), 409);
    assert!(response.text().contains("itemId is already used"));
}

#[tokio::test]
async fn test_wrong_content_type_rejected() {
    let app = setup_test_app().await;

    let id = create_transfer(
        &app,
        100,
        &upload_metadata("item-ct", "ct.png", "image/png"),
    )
    .await;

    let response = app
        .client()
        .patch(&format!("/tus/{id}"))
        .add_header("Authorization", app.bearer())
        .add_header("Content-Type", "application/octet-stream")
        .add_header("Upload-Offset", "0")
        .bytes(vec![0u8; 10].into())
        .await;
    assert_eq!(response.status_code(), 415);
}

#[tokio::test]
async fn test_terminate_discards_transfer() {
    let app = setup_test_app().await;
    let png = fixtures::png_bytes(8, 8);

    let id = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-term", "term.png", "image/png"),
    )
    .await;
    patch_chunk(&app, &id, 0, &png[..4]).await;

    let response = app
        .client()
        .delete(&format!("/tus/{id}"))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), 204);

    let head = head_upload(&app, &id).await;
    assert_eq!(head.status_code(), 404);

    // Terminating twice is a 404, not an error.
    let response = app
        .client()
        .delete(&format!("/tus/{id}"))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_reaper_removes_only_expired_sessions() {
    let app = setup_test_app().await;

    let stale = create_transfer(
        &app,
        100,
        &upload_metadata("item-stale", "stale.png", "image/png"),
    )
    .await;
    let fresh = create_transfer(
        &app,
        100,
        &upload_metadata("item-fresh", "fresh.png", "image/png"),
    )
    .await;

    // Backdate one session past the expiration window.
    sqlx::query("UPDATE upload_sessions SET created_at = $1 WHERE id = $2")
        .bind(Utc::now() - Duration::hours(72))
        .bind(&stale)
        .execute(&app.pool)
        .await
        .unwrap();

    let reaper = app.state.reaper();
    assert_eq!(reaper.sweep_once().await.unwrap(), 1);

    let head = head_upload(&app, &stale).await;
    assert_eq!(head.status_code(), 404);

    let head = head_upload(&app, &fresh).await;
    assert_eq!(head.status_code(), 200);

    // A second sweep finds nothing.
    assert_eq!(reaper.sweep_once().await.unwrap(), 0);
}

#[tokio::test]
async fn test_completed_duplicate_returns_existing_record() {
    let app = setup_test_app().await;
    let png = fixtures::png_bytes(8, 8);

    // Open two transfers for the same item before either lands.
    let first = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-race", "race.png", "image/png"),
    )
    .await;
    let second = create_transfer(
        &app,
        png.len(),
        &upload_metadata("item-race", "race2.png", "image/png"),
    )
    .await;

    let response = patch_chunk(&app, &first, 0, &png).await;
    assert_eq!(response.status_code(), 200);
    let winner = response.json::<Value>();
    assert_eq!(winner["skipped"], false);

    // The slower transfer completes but its bytes lose to the winner.
    let response = patch_chunk(&app, &second, 0, &png).await;
    assert_eq!(response.status_code(), 200);
    let loser = response.json::<Value>();
    assert_eq!(loser["skipped"], true);
    assert_eq!(
        loser["media"]["id"].as_i64().unwrap(),
        winner["media"]["id"].as_i64().unwrap()
    );
}
