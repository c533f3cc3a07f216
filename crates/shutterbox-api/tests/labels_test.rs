//! Label attachment and aggregation integration tests.

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use serde_json::{json, Value};

use helpers::{fixtures, setup_test_app, TestApp};

async fn upload_png(app: &TestApp, item_id: &str, filename: &str) -> Value {
    let part = Part::bytes(fixtures::png_bytes(16, 16))
        .file_name(filename.to_string())
        .mime_type("image/png");
    let form = MultipartForm::new().add_part("file", part);

    let response = app
        .client()
        .post(&format!("/file/{item_id}"))
        .add_header("Authorization", app.bearer())
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    response.json::<Value>()
}

#[tokio::test]
async fn test_set_and_get_labels() {
    let app = setup_test_app().await;
    let media = upload_png(&app, "item-l1", "tagged.png").await;
    let media_id = media["media"]["id"].as_i64().unwrap();

    let response = app
        .client()
        .post("/labels/item-l1")
        .add_header("Authorization", app.bearer())
        .json(&json!(["beach", "sunset"]))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .get(&format!("/labels/{media_id}"))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), 200);
    let labels = response.json::<Value>();
    let names: Vec<&str> = labels
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["labelname"].as_str().unwrap())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"beach"));
    assert!(names.contains(&"sunset"));
}

#[tokio::test]
async fn test_labels_replaced_wholesale() {
    let app = setup_test_app().await;
    let media = upload_png(&app, "item-l2", "relabel.png").await;
    let media_id = media["media"]["id"].as_i64().unwrap();

    for names in [json!(["old-a", "old-b"]), json!(["new-only"])] {
        let response = app
            .client()
            .post("/labels/item-l2")
            .add_header("Authorization", app.bearer())
            .json(&names)
            .await;
        assert_eq!(response.status_code(), 204);
    }

    let response = app
        .client()
        .get(&format!("/labels/{media_id}"))
        .add_header("Authorization", app.bearer())
        .await;
    let labels = response.json::<Value>();
    assert_eq!(labels.as_array().unwrap().len(), 1);
    assert_eq!(labels[0]["labelname"], "new-only");

    // Replacing with an empty list clears them; the listing answers 204.
    let response = app
        .client()
        .post("/labels/item-l2")
        .add_header("Authorization", app.bearer())
        .json(&json!([]))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .get(&format!("/labels/{media_id}"))
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), 204);
}

#[tokio::test]
async fn test_labels_for_unknown_item_id() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post("/labels/never-uploaded")
        .add_header("Authorization", app.bearer())
        .json(&json!(["dog"]))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_count_by_label() {
    let app = setup_test_app().await;
    upload_png(&app, "item-c1", "one.png").await;
    upload_png(&app, "item-c2", "two.png").await;

    for (item, names) in [
        ("item-c1", json!(["animal", "dog"])),
        ("item-c2", json!(["animal"])),
    ] {
        let response = app
            .client()
            .post(&format!("/labels/{item}"))
            .add_header("Authorization", app.bearer())
            .json(&names)
            .await;
        assert_eq!(response.status_code(), 204);
    }

    let response = app
        .client()
        .get("/metadata-count-by-label")
        .add_header("Authorization", app.bearer())
        .await;
    assert_eq!(response.status_code(), 200);

    let counts = response.json::<Value>();
    let find = |name: &str| {
        counts
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["labelname"] == name)
            .map(|c| c["count"].as_i64().unwrap())
    };
    assert_eq!(find("animal"), Some(2));
    assert_eq!(find("dog"), Some(1));
}

#[tokio::test]
async fn test_labels_scoped_per_owner() {
    let app = setup_test_app().await;
    let (_, other_key) = app.create_user("labeller").await;

    let media = upload_png(&app, "item-scope", "scoped.png").await;
    let media_id = media["media"]["id"].as_i64().unwrap();

    let response = app
        .client()
        .post("/labels/item-scope")
        .add_header("Authorization", app.bearer())
        .json(&json!(["private"]))
        .await;
    assert_eq!(response.status_code(), 204);

    // Another account sees neither the labels nor the item.
    let response = app
        .client()
        .get(&format!("/labels/{media_id}"))
        .add_header("Authorization", format!("Bearer {other_key}"))
        .await;
    assert_eq!(response.status_code(), 204);

    let response = app
        .client()
        .post("/labels/item-scope")
        .add_header("Authorization", format!("Bearer {other_key}"))
        .json(&json!(["stolen"]))
        .await;
    assert_eq!(response.status_code(), 404);
}
