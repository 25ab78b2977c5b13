#![allow(dead_code)]

use eventhub::api::ApiClient;
use eventhub::store::{self, AppState, Db, seed};
use serde_json::Value;
use tokio::net::TcpListener;

pub const ADMIN_ID: u64 = 1;
pub const DEMO_ID: u64 = 2;
/// Seeded event with a capacity of 8.
pub const WORKSHOP_ID: u64 = 3;

/// Starts a store over the seeded document and returns its base URL.
pub async fn spawn_store() -> String {
    spawn_store_with(seed::document().unwrap()).await
}

pub async fn spawn_store_with(doc: Value) -> String {
    let db = Db::in_memory(doc).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(store::serve(listener, AppState::new(db)));
    format!("http://{addr}")
}

pub async fn client() -> ApiClient {
    ApiClient::new(&spawn_store().await)
}

/// A base URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
