use std::collections::HashMap;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use dexview::{CatalogApi, HttpCatalogClient};
use serde_json::json;

const SPRITES: &str = "http://sprites.test/pokemon";

async fn list(Query(q): Query<HashMap<String, String>>) -> impl IntoResponse {
    let limit: u32 = q.get("limit").and_then(|v| v.parse().ok()).unwrap_or(20);
    let offset: u32 = q.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
    let results: Vec<_> = (offset + 1..=offset + limit)
        .map(|n| json!({ "name": format!("mon-{n}"), "url": format!("http://api.test/pokemon/{n}/") }))
        .collect();
    Json(json!({
        "count": 1302,
        "next": format!("http://api.test/pokemon?offset={}&limit={limit}", offset + limit),
        "previous": null,
        "results": results,
    }))
}

async fn detail(Path(id): Path<String>) -> impl IntoResponse {
    match id.as_str() {
        "1" => Json(json!({
            "id": 1,
            "name": "bulbasaur",
            "height": 7,
            "weight": 69,
            "types": [
                { "slot": 1, "type": { "name": "grass", "url": "" } },
                { "slot": 2, "type": { "name": "poison", "url": "" } }
            ],
            "sprites": { "front_default": null }
        }))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/api/v2/pokemon", get(list))
        .route("/api/v2/pokemon/:id", get(detail))
        .route(
            "/broken/pokemon",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/garbled/pokemon", get(|| async { "{\"count\": \"many\"}" }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn lists_a_page_with_limit_and_offset() {
    let base = spawn_server().await;
    let client = HttpCatalogClient::new(format!("{base}/api/v2"), SPRITES);

    let page = client.list_items(20, 40).await.unwrap();
    assert_eq!(page.total_count, 1302);
    assert_eq!(page.items.len(), 20);
    assert_eq!(page.items[0].name, "mon-41");
    assert_eq!(page.items[0].id(), Some("41"));
    assert_eq!(
        page.next_cursor.as_deref(),
        Some("http://api.test/pokemon?offset=60&limit=20")
    );
    assert!(page.previous_cursor.is_none());
}

#[tokio::test]
async fn detail_falls_back_to_conventional_sprite() {
    let base = spawn_server().await;
    let client = HttpCatalogClient::new(format!("{base}/api/v2/"), SPRITES);

    let item = client.get_item_by_id("1").await.unwrap();
    assert_eq!(item.identifier, 1);
    assert_eq!(item.name, "bulbasaur");
    assert_eq!(item.height, 7);
    assert_eq!(item.weight, 69);
    assert_eq!(item.categories, vec!["grass", "poison"]);
    assert_eq!(item.image_locator, "http://sprites.test/pokemon/1.png");
}

#[tokio::test]
async fn missing_item_reports_not_found() {
    let base = spawn_server().await;
    let client = HttpCatalogClient::new(format!("{base}/api/v2"), SPRITES);

    let err = client.get_item_by_id("25").await.unwrap_err();
    assert_eq!(err.to_string(), "item 25 not found");
    assert_eq!(err.status, Some(404));
}

#[tokio::test]
async fn server_error_on_list_carries_status() {
    let base = spawn_server().await;
    let client = HttpCatalogClient::new(format!("{base}/broken"), SPRITES);

    let err = client.list_items(20, 0).await.unwrap_err();
    assert_eq!(err.status, Some(500));
    assert!(err.message.starts_with("failed to fetch item list"), "{err}");
}

#[tokio::test]
async fn unexpected_body_shape_is_rejected() {
    let base = spawn_server().await;
    let client = HttpCatalogClient::new(format!("{base}/garbled"), SPRITES);

    let err = client.list_items(20, 0).await.unwrap_err();
    assert!(err.message.starts_with("malformed item list"), "{err}");
    assert_eq!(err.status, None);
}

#[tokio::test]
async fn unreachable_host_is_a_transport_error() {
    // bind then drop so the port is closed
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = HttpCatalogClient::new(format!("http://{addr}/api/v2"), SPRITES);

    let err = client.list_items(20, 0).await.unwrap_err();
    assert_eq!(err.status, None);
    assert!(err.message.starts_with("request failed"), "{err}");
}
