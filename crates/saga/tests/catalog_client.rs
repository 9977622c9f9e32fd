//! Tests for the HTTP catalog client against a local catalog stub.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use saga::{HttpInventoryClient, InventoryClient, SagaError};
use serde_json::{Value, json};
use url::Url;

type Calls = Arc<Mutex<Vec<(String, String, Value)>>>;

async fn get_book(Path(isbn): Path<String>) -> Result<Json<Value>, StatusCode> {
    if isbn == "slow" {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
    match isbn.as_str() {
        "978-0" => Ok(Json(json!({
            "id": "ignored",
            "isbn": "978-0",
            "title": "The Pragmatic Programmer",
            "author": "Hunt",
            "publisher": "Addison-Wesley",
            "supplier": "Fahasa",
            "price": 120000,
            "photos": ["cover.jpg"],
            "inventory": 4
        }))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn change_inventory(
    State(calls): State<Calls>,
    Path((isbn, action)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> StatusCode {
    if isbn == "missing" {
        return StatusCode::NOT_FOUND;
    }
    if isbn == "broken" {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    calls.lock().unwrap().push((isbn, action, body));
    StatusCode::NO_CONTENT
}

async fn spawn_catalog() -> (SocketAddr, Calls) {
    let calls: Calls = Arc::default();
    let app = Router::new()
        .route("/books/{isbn}", get(get_book))
        .route("/books/{isbn}/inventory/{action}", post(change_inventory))
        .with_state(Arc::clone(&calls));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (addr, calls)
}

fn client(addr: SocketAddr) -> HttpInventoryClient {
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    HttpInventoryClient::new(base, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_lookup_decodes_book() {
    let (addr, _) = spawn_catalog().await;

    let book = client(addr).lookup("978-0").await.unwrap();

    assert_eq!(book.title, "The Pragmatic Programmer");
    assert_eq!(book.price, 120000);
    assert_eq!(book.inventory, 4);
    assert_eq!(book.photos, vec!["cover.jpg".to_string()]);
}

#[tokio::test]
async fn test_lookup_not_found() {
    let (addr, _) = spawn_catalog().await;

    let err = client(addr).lookup("nope").await.unwrap_err();

    assert!(matches!(err, SagaError::BookNotFound { ref isbn } if isbn == "nope"));
}

#[tokio::test]
async fn test_lookup_server_error_is_fatal() {
    let (addr, _) = spawn_catalog().await;

    let err = client(addr).lookup("broken").await.unwrap_err();

    assert!(matches!(err, SagaError::InventoryService(_)));
}

#[tokio::test]
async fn test_lookup_times_out() {
    let (addr, _) = spawn_catalog().await;
    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let client = HttpInventoryClient::new(base, Duration::from_millis(100)).unwrap();

    let err = client.lookup("slow").await.unwrap_err();

    assert!(matches!(err, SagaError::InventoryService(ref msg) if msg.contains("timed out")));
}

#[tokio::test]
async fn test_reduce_and_restore_send_quantity() {
    let (addr, calls) = spawn_catalog().await;
    let client = client(addr);

    client.reduce_inventory("978-0", 2).await.unwrap();
    client.restore_inventory("978-0", 2).await.unwrap();

    let calls = calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("978-0".to_string(), "reduce".to_string(), json!({ "quantity": 2 })),
            ("978-0".to_string(), "restore".to_string(), json!({ "quantity": 2 })),
        ]
    );
}

#[tokio::test]
async fn test_reduce_errors() {
    let (addr, _) = spawn_catalog().await;
    let client = client(addr);

    assert!(matches!(
        client.reduce_inventory("missing", 1).await,
        Err(SagaError::BookNotFound { .. })
    ));
    assert!(matches!(
        client.reduce_inventory("broken", 1).await,
        Err(SagaError::InventoryService(_))
    ));
}

#[tokio::test]
async fn test_unreachable_catalog_is_fatal() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(addr).lookup("978-0").await.unwrap_err();

    assert!(matches!(err, SagaError::InventoryService(_)));
}
