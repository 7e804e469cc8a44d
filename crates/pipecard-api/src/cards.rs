//! Handlers for step card endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/repos/:namespace/:name/builds/:build/stages/:stage/steps/:step/cards` | Body: [`CardBody`]; returns 200 + stored card |
//! | `GET`  | same | 404 naming the `card` level if the step has none |
//!
//! Every failure answers with a `{"error": ...}` body, including rejected
//! path segments and bodies over the router's size limit (400). A request
//! that outlives the server's deadline is dropped and answered with 408.
//!
//! Every request runs parse → resolve → validate → persist and stops at the
//! first failure.

use axum::{
  Json,
  extract::{
    Path, State,
    rejection::{BytesRejection, PathRejection},
  },
};
use bytes::Bytes;
use pipecard_core::{
  Error, Level,
  card::{Card, NewCard},
  resolve::{StepAddress, resolve},
  store::{CardStore, CreateOutcome, PipelineStore},
};
use serde::Deserialize;
use serde_json::value::RawValue;

use crate::{ApiState, error::ApiError};

// ─── Request shapes ───────────────────────────────────────────────────────────

/// Raw path segments. Numbers stay strings until [`StepAddress::parse`] so a
/// bad segment is reported against its field.
#[derive(Debug, Deserialize)]
pub struct StepPath {
  pub namespace: String,
  pub name:      String,
  pub build:     String,
  pub stage:     String,
  pub step:      String,
}

impl StepPath {
  fn parse(self) -> Result<StepAddress, Error> {
    StepAddress::parse(self.namespace, self.name, &self.build, &self.stage, &self.step)
  }
}

/// JSON body accepted by `POST .../cards`.
#[derive(Debug, Deserialize)]
pub struct CardBody {
  #[serde(default)]
  pub schema: String,
  /// Schema-defined payload, kept as the caller's exact JSON text.
  pub data:   Box<RawValue>,
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST .../steps/:step/cards` — body: `{"schema": "...", "data": ...}`
pub async fn create<P, C>(
  State(state): State<ApiState<P, C>>,
  path: Result<Path<StepPath>, PathRejection>,
  body: Result<Bytes, BytesRejection>,
) -> Result<Json<Card>, ApiError>
where
  P: PipelineStore,
  C: CardStore,
{
  let Path(path) = path?;
  let addr = path.parse()?;
  let body = body?;
  let body: CardBody =
    serde_json::from_slice(&body).map_err(|e| Error::MalformedBody(e.to_string()))?;

  let resolved = resolve(state.pipeline.as_ref(), &addr).await?;

  state.schemas.validate(&body.schema, body.data.get().as_bytes())?;

  let step_id = resolved.step.id;
  let card = NewCard {
    build_id: resolved.build.id,
    stage_id: resolved.stage.id,
    step_id,
    schema:   body.schema,
    data:     body.data,
  };

  match state.cards.create_card(card).await.map_err(Error::store)? {
    CreateOutcome::Created(card) => {
      tracing::info!(card_id = card.id, step_id, schema = %card.schema, "card created");
      Ok(Json(card))
    }
    CreateOutcome::AlreadyExists => {
      tracing::warn!(step_id, "duplicate card rejected");
      Err(Error::CardExists(step_id).into())
    }
  }
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET .../steps/:step/cards`
pub async fn get_one<P, C>(
  State(state): State<ApiState<P, C>>,
  path: Result<Path<StepPath>, PathRejection>,
) -> Result<Json<Card>, ApiError>
where
  P: PipelineStore,
  C: CardStore,
{
  let Path(path) = path?;
  let addr = path.parse()?;
  let resolved = resolve(state.pipeline.as_ref(), &addr).await?;

  let card = state
    .cards
    .find_card_by_step(resolved.step.id)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found(Level::Card, format!("for step {}", addr.step)))?;
  Ok(Json(card))
}
