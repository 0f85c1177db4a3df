//! An in-process stand-in for the remote genealogy API.
//!
//! Knows one account (`alice` / `secret`, token `tok-alice`) and keeps individuals in
//! memory. Every create/update body is recorded so tests can inspect what was sent.

#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use client_lib::config::Config;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const TOKEN: &str = "tok-alice";
pub const USER_ID: &str = "6f1c1f5e-3b3a-4d59-9d4e-1f2f5c7b9a10";
const STAMP: &str = "2024-01-01T00:00:00.000000";

#[derive(Default)]
pub struct MockApi {
    pub individuals: Mutex<Vec<Value>>,
    pub bodies: Mutex<Vec<Value>>,
    next_id: Mutex<u32>,
}

impl MockApi {
    pub async fn seed(&self, given_names: &str, surname: &str) -> String {
        let id = self.next_id().await;
        self.individuals.lock().await.push(json!({
            "id": id,
            "user_id": USER_ID,
            "gedcom_id": format!("@I{}@", id),
            "given_names": given_names,
            "surname": surname,
            "sex": null,
            "birth_date": null,
            "birth_place": null,
            "death_date": null,
            "death_place": null,
            "note": null,
            "created_at": STAMP,
            "updated_at": STAMP
        }));
        id
    }

    async fn next_id(&self) -> String {
        let mut next = self.next_id.lock().await;
        *next += 1;
        next.to_string()
    }
}

pub struct MockServer {
    pub api: Arc<MockApi>,
    pub base_url: String,
}

impl MockServer {
    pub async fn start() -> Self {
        let api = Arc::new(MockApi::default());
        let app = Router::new()
            .route("/api/auth/login", post(login))
            .route("/api/auth/register", post(register))
            .route("/api/auth/me", get(me))
            .route("/api/auth/regenerate-api-key", post(regenerate_api_key))
            .route("/api/individuals", get(list).post(create))
            .route("/api/individuals/{id}", put(update).delete(delete))
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            api,
            base_url: format!("http://{}", address),
        }
    }

    pub fn config(&self) -> Config {
        Config::new(&self.base_url).unwrap()
    }
}

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

fn profile(api_key: Option<&str>) -> Value {
    let mut user = json!({
        "id": USER_ID,
        "username": "alice",
        "email": "alice@example.test",
        "is_active": true,
        "created_at": STAMP
    });
    if let Some(key) = api_key {
        user["api_key"] = json!(key);
    }
    user
}

async fn login(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["username"] == "alice" && body["password"] == "secret" {
        Ok(Json(json!({
            "access_token": TOKEN,
            "token_type": "bearer",
            "expires_in": 1800
        })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn register(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["username"] == "taken" {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut user = profile(Some("key-1"));
    user["username"] = body["username"].clone();
    user["email"] = body["email"].clone();
    Ok(Json(user))
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(profile(None)))
}

async fn regenerate_api_key(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(profile(Some("key-2"))))
}

async fn list(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(Value::Array(api.individuals.lock().await.clone())))
}

async fn create(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    api.bodies.lock().await.push(body.clone());
    if !body["gedcom_id"].is_string() {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }

    let id = api.next_id().await;
    let mut record = Map::new();
    for field in [
        "given_names",
        "surname",
        "sex",
        "birth_date",
        "birth_place",
        "death_date",
        "death_place",
        "note",
    ] {
        record.insert(field.to_string(), body.get(field).cloned().unwrap_or(Value::Null));
    }
    record.insert("id".to_string(), json!(id));
    record.insert("user_id".to_string(), json!(USER_ID));
    record.insert("gedcom_id".to_string(), body["gedcom_id"].clone());
    record.insert("created_at".to_string(), json!(STAMP));
    record.insert("updated_at".to_string(), json!(STAMP));

    let record = Value::Object(record);
    api.individuals.lock().await.push(record.clone());
    Ok(Json(record))
}

async fn update(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    api.bodies.lock().await.push(body.clone());
    let mut individuals = api.individuals.lock().await;
    let record = individuals
        .iter_mut()
        .find(|record| record["id"] == id.as_str())
        .ok_or(StatusCode::NOT_FOUND)?;
    if let (Some(target), Some(changes)) = (record.as_object_mut(), body.as_object()) {
        for (field, value) in changes {
            target.insert(field.clone(), value.clone());
        }
        target.insert("updated_at".to_string(), json!("2024-02-01T00:00:00Z"));
    }
    Ok(Json(record.clone()))
}

async fn delete(
    State(api): State<Arc<MockApi>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    let mut individuals = api.individuals.lock().await;
    let before = individuals.len();
    individuals.retain(|record| record["id"] != id.as_str());
    if individuals.len() == before {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({ "message": "Individual deleted successfully" })))
}
