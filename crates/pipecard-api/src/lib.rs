//! JSON REST API for step cards.
//!
//! Exposes an axum [`Router`] over any [`PipelineStore`] and [`CardStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", pipecard_api::api_router(state))
//! ```

pub mod cards;
pub mod error;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use pipecard_core::{
  schema::SchemaRegistry,
  store::{CardStore, PipelineStore},
};

pub use error::ApiError;

/// Route template shared by the create and read endpoints.
pub const CARDS_PATH: &str =
  "/repos/{namespace}/{name}/builds/{build}/stages/{stage}/steps/{step}/cards";

/// Room for the request envelope (`schema`, keys, whitespace) on top of the
/// registry's ceiling on `data`.
pub const BODY_ENVELOPE_BYTES: usize = 64 * 1024;

// ─── Application state ────────────────────────────────────────────────────────

/// Capabilities injected into every handler.
pub struct ApiState<P, C> {
  pub pipeline: Arc<P>,
  pub cards:    Arc<C>,
  pub schemas:  Arc<SchemaRegistry>,
}

impl<P, C> ApiState<P, C> {
  pub fn new(pipeline: Arc<P>, cards: Arc<C>, schemas: SchemaRegistry) -> Self {
    Self { pipeline, cards, schemas: Arc::new(schemas) }
  }
}

impl<P, C> Clone for ApiState<P, C> {
  fn clone(&self) -> Self {
    Self {
      pipeline: Arc::clone(&self.pipeline),
      cards:    Arc::clone(&self.cards),
      schemas:  Arc::clone(&self.schemas),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type. Request bodies are capped at the schema registry's
/// ceiling plus [`BODY_ENVELOPE_BYTES`], so `max_card_bytes` governs what is
/// accepted rather than axum's default limit.
pub fn api_router<P, C>(state: ApiState<P, C>) -> Router<()>
where
  P: PipelineStore + 'static,
  C: CardStore + 'static,
{
  let body_limit = state.schemas.max_bytes().saturating_add(BODY_ENVELOPE_BYTES);
  Router::new()
    .route(CARDS_PATH, get(cards::get_one::<P, C>).post(cards::create::<P, C>))
    .layer(DefaultBodyLimit::max(body_limit))
    .with_state(state)
}
