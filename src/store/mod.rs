//! Mock collection store: `/users`, `/events` and `/registrations` served as
//! plain JSON CRUD over a single document.

pub mod db;
pub mod error;
pub mod seed;

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use db::Db;
pub use error::StoreError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
}

impl AppState {
    pub fn new(db: Db) -> Self {
        Self { db: Arc::new(db) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/db", get(snapshot))
        .route("/{collection}", get(list).post(create))
        .route(
            "/{collection}/{id}",
            get(fetch).put(replace).patch(patch).delete(remove),
        )
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("collection store listening on {addr}");
    }
    axum::serve(listener, router(state)).await
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn snapshot(State(state): State<AppState>) -> Json<Value> {
    Json(state.db.snapshot().await)
}

async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(filters): Query<HashMap<String, String>>,
) -> Result<Json<Vec<Value>>, StoreError> {
    Ok(Json(state.db.list(&collection, &filters).await?))
}

async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), StoreError> {
    let Json(body) = body?;
    let created = state.db.insert(&collection, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn fetch(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, StoreError> {
    Ok(Json(state.db.get(&collection, &id).await?))
}

async fn replace(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, StoreError> {
    let Json(body) = body?;
    Ok(Json(state.db.replace(&collection, &id, body).await?))
}

async fn patch(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, StoreError> {
    let Json(body) = body?;
    Ok(Json(state.db.patch(&collection, &id, body).await?))
}

async fn remove(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> Result<Json<Value>, StoreError> {
    Ok(Json(state.db.delete(&collection, &id).await?))
}
