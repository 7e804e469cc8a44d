//! HTTP server wiring for the card API.
//!
//! Holds the runtime configuration and assembles the router with its
//! request tracing and timeout layers.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
  time::Duration,
};

use axum::{Json, Router, error_handling::HandleErrorLayer, http::StatusCode};
use pipecard_api::{ApiState, api_router};
use pipecard_core::{
  schema::{DEFAULT_MAX_CARD_BYTES, SchemaRegistry},
  store::{CardStore, PipelineStore},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower::{BoxError, ServiceBuilder, timeout::TimeoutLayer};
use tower_http::trace::TraceLayer;

/// Message returned when a request outlives `request_timeout_secs`.
pub const TIMEOUT_MESSAGE: &str = "request timed out";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PIPECARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  /// Ceiling on the byte length of a card's `data`.
  pub max_card_bytes:       usize,
  /// Enabled schema names; `None` enables every built-in.
  pub schemas:              Option<Vec<String>>,
  pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "127.0.0.1".to_string(),
      port:                 8080,
      store_path:           PathBuf::from("pipecard.db"),
      max_card_bytes:       DEFAULT_MAX_CARD_BYTES,
      schemas:              None,
      request_timeout_secs: 30,
    }
  }
}

impl ServerConfig {
  /// Build the schema registry this configuration enables.
  pub fn schema_registry(&self) -> pipecard_core::Result<SchemaRegistry> {
    match &self.schemas {
      Some(names) => SchemaRegistry::builtin_subset(self.max_card_bytes, names),
      None => Ok(SchemaRegistry::builtin(self.max_card_bytes)),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the served application: the card API nested under `/api`, behind
/// request tracing and a per-request deadline. A request that exceeds the
/// deadline has its handler future dropped, so no further lookup or write is
/// started, and is answered with 408 and a JSON error body.
pub fn app<S>(store: Arc<S>, schemas: SchemaRegistry, config: &ServerConfig) -> Router
where
  S: PipelineStore + CardStore + 'static,
{
  let state = ApiState::new(store.clone(), store, schemas);
  Router::new()
    .nest("/api", api_router(state))
    .layer(
      ServiceBuilder::new()
        .layer(HandleErrorLayer::new(handle_timeout))
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
    )
    .layer(TraceLayer::new_for_http())
}

async fn handle_timeout(err: BoxError) -> (StatusCode, Json<Value>) {
  tracing::warn!(error = %err, "request abandoned at deadline");
  (StatusCode::REQUEST_TIMEOUT, Json(json!({ "error": TIMEOUT_MESSAGE })))
}

#[cfg(test)]
mod tests {
  use super::*;

  use std::sync::atomic::{AtomicUsize, Ordering};

  use axum::{body::Body, http::Request};
  use pipecard_core::{
    card::{Card, NewCard},
    pipeline::{Build, Repository, Stage, Step},
    store::CreateOutcome,
  };
  use pipecard_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  /// Answers the repository lookup, then stalls on the build lookup. Counts
  /// every call made after the stall.
  #[derive(Default)]
  struct StalledStore {
    later_calls: AtomicUsize,
  }

  impl StalledStore {
    fn later_calls(&self) -> usize { self.later_calls.load(Ordering::SeqCst) }
  }

  impl PipelineStore for StalledStore {
    type Error = std::io::Error;

    async fn find_repository<'a>(
      &'a self,
      namespace: &'a str,
      name: &'a str,
    ) -> Result<Option<Repository>, Self::Error> {
      Ok(Some(Repository { id: 1, namespace: namespace.into(), name: name.into() }))
    }

    async fn find_build(&self, repo_id: i64, number: i64) -> Result<Option<Build>, Self::Error> {
      tokio::time::sleep(Duration::from_secs(60)).await;
      Ok(Some(Build { id: 10, repo_id, number }))
    }

    async fn find_stage(&self, build_id: i64, number: isize) -> Result<Option<Stage>, Self::Error> {
      self.later_calls.fetch_add(1, Ordering::SeqCst);
      Ok(Some(Stage { id: 20, build_id, number, name: "test".into() }))
    }

    async fn find_step(&self, stage_id: i64, number: isize) -> Result<Option<Step>, Self::Error> {
      self.later_calls.fetch_add(1, Ordering::SeqCst);
      Ok(Some(Step { id: 30, stage_id, number, name: "unit".into() }))
    }
  }

  impl CardStore for StalledStore {
    type Error = std::io::Error;

    async fn create_card(&self, _card: NewCard) -> Result<CreateOutcome, Self::Error> {
      self.later_calls.fetch_add(1, Ordering::SeqCst);
      Ok(CreateOutcome::AlreadyExists)
    }

    async fn find_card_by_step(&self, _step_id: i64) -> Result<Option<Card>, Self::Error> {
      self.later_calls.fetch_add(1, Ordering::SeqCst);
      Ok(None)
    }
  }

  #[test]
  fn config_defaults_apply_without_sources() {
    let cfg: ServerConfig = config::Config::builder()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.max_card_bytes, DEFAULT_MAX_CARD_BYTES);
    assert_eq!(cfg.schema_registry().unwrap().names().count(), 4);
  }

  #[test]
  fn config_overrides_and_schema_subset() {
    let cfg: ServerConfig = config::Config::builder()
      .set_override("port", 9000)
      .unwrap()
      .set_override("max_card_bytes", 512)
      .unwrap()
      .set_override("schemas", vec!["table", "markdown"])
      .unwrap()
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap();

    assert_eq!(cfg.port, 9000);
    let registry = cfg.schema_registry().unwrap();
    assert_eq!(registry.max_bytes(), 512);
    assert_eq!(registry.names().collect::<Vec<_>>(), ["markdown", "table"]);
  }

  #[test]
  fn unknown_configured_schema_fails() {
    let cfg = ServerConfig {
      schemas: Some(vec!["table".into(), "chart".into()]),
      ..ServerConfig::default()
    };
    assert!(cfg.schema_registry().is_err());
  }

  #[test]
  fn expand_tilde_leaves_other_paths_alone() {
    assert_eq!(expand_tilde(Path::new("/tmp/cards.db")), PathBuf::from("/tmp/cards.db"));
    assert_eq!(expand_tilde(Path::new("cards.db")), PathBuf::from("cards.db"));
  }

  #[tokio::test]
  async fn app_serves_card_routes() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let repo = store.insert_repository("acme", "widgets").await.unwrap();
    let build = store.insert_build(repo.id, 42).await.unwrap();
    let stage = store.insert_stage(build.id, 2, "test").await.unwrap();
    store.insert_step(stage.id, 3, "unit").await.unwrap();

    let cfg = ServerConfig::default();
    let app = app(Arc::new(store), cfg.schema_registry().unwrap(), &cfg);

    let req = Request::builder()
      .method("POST")
      .uri("/api/repos/acme/widgets/builds/42/stages/2/steps/3/cards")
      .body(Body::from(r##"{"schema":"markdown","data":"# Coverage: 91%"}"##))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let card: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(card["data"], "# Coverage: 91%");
  }

  #[tokio::test]
  async fn deadline_abandons_resolution_midway() {
    let store = Arc::new(StalledStore::default());
    let cfg = ServerConfig { request_timeout_secs: 1, ..ServerConfig::default() };
    let app = app(store.clone(), cfg.schema_registry().unwrap(), &cfg);

    let req = Request::builder()
      .method("POST")
      .uri("/api/repos/acme/widgets/builds/42/stages/2/steps/3/cards")
      .body(Body::from(r#"{"schema":"markdown","data":"late"}"#))
      .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], TIMEOUT_MESSAGE);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.later_calls(), 0);
  }
}
