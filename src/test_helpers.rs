//! Shared fixtures for unit tests.

use crate::models::SkipReason;
use crate::registry::{PluginRegistry, RegistryError, RegistryPayload};
use async_trait::async_trait;
use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Start a loopback server that mimics the plugin information API.
///
/// Known slugs: `akismet`, `classic-editor`, `premium` (no date), `gone`
/// (`null` body), `blank` (empty body), `broken` (invalid JSON) and `slow`
/// (answers after two seconds). Everything else is a 404.
pub async fn spawn_fake_registry() -> String {
    let app = Router::new()
        .route(
            "/akismet.json",
            get(|| async {
                Json(json!({
                    "name": "Akismet Anti-spam",
                    "slug": "akismet",
                    "last_updated": "2024-06-01 3:45pm GMT"
                }))
            }),
        )
        .route(
            "/classic-editor.json",
            get(|| async {
                Json(json!({
                    "name": "Classic Editor",
                    "slug": "classic-editor",
                    "last_updated": "2020-01-01 9:00am GMT"
                }))
            }),
        )
        .route(
            "/premium.json",
            get(|| async { Json(json!({"error": "Plugin not found."})) }),
        )
        .route("/gone.json", get(|| async { "null" }))
        .route("/blank.json", get(|| async { "" }))
        .route("/broken.json", get(|| async { "{\"last_updated\": " }))
        .route(
            "/slow.json",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"last_updated": "2024-01-01"}))
            }),
        );

    serve(app).await
}

/// Serve `app` on an ephemeral loopback port and return its base URL.
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A loopback URL nothing is listening on.
pub async fn unused_local_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// In-memory registry keyed by slug.
#[derive(Default)]
pub struct StaticRegistry {
    responses: HashMap<String, Result<Value, SkipReason>>,
    requested: Mutex<Vec<String>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `slug` with `value`.
    pub fn with_json(mut self, slug: &str, value: Value) -> Self {
        self.responses.insert(slug.to_string(), Ok(value));
        self
    }

    /// Answer `slug` with a `last_updated` field.
    pub fn with_date(self, slug: &str, last_updated: &str) -> Self {
        self.with_json(slug, json!({ "slug": slug, "last_updated": last_updated }))
    }

    /// Fail `slug` the way `reason` describes.
    pub fn with_failure(mut self, slug: &str, reason: SkipReason) -> Self {
        self.responses.insert(slug.to_string(), Err(reason));
        self
    }

    /// Slugs looked up so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl PluginRegistry for StaticRegistry {
    fn base_url(&self) -> &str {
        "memory://registry"
    }

    async fn plugin_info(&self, slug: &str) -> Result<RegistryPayload, RegistryError> {
        self.requested.lock().unwrap().push(slug.to_string());

        match self.responses.get(slug) {
            Some(Ok(value)) => {
                let payload = RegistryPayload::new(value.clone());
                if payload.is_empty() {
                    Err(RegistryError::EmptyBody)
                } else {
                    Ok(payload)
                }
            }
            Some(Err(SkipReason::HttpStatus(code))) => Err(RegistryError::Status(*code)),
            Some(Err(SkipReason::EmptyBody)) => Err(RegistryError::EmptyBody),
            Some(Err(SkipReason::InvalidJson)) => {
                Err(RegistryError::InvalidJson("expected value".to_string()))
            }
            Some(Err(_)) => Err(RegistryError::Transport("connection refused".to_string())),
            None => Err(RegistryError::Status(404)),
        }
    }
}

/// Write a plugin main file with a standard header block.
pub fn write_plugin(root: &Path, relative: &str, name: &str) {
    let header = format!(
        "<?php\n/**\n * Plugin Name: {}\n * Description: Test plugin.\n * Version: 1.0\n */\n",
        name
    );
    write_file(root, relative, &header);
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}
