//! Card types — schema-tagged payloads attached to a single step.
//!
//! `data` is kept as raw JSON text end to end so the stored bytes are exactly
//! what the caller sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// A validated card ready for the writer. Owning identities come from
/// [`resolve`](crate::resolve::resolve), never from the caller.
#[derive(Debug, Clone)]
pub struct NewCard {
  pub build_id: i64,
  pub stage_id: i64,
  pub step_id:  i64,
  pub schema:   String,
  pub data:     Box<RawValue>,
}

/// A persisted card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
  /// Store-assigned record identity.
  pub id:         i64,
  pub build_id:   i64,
  pub stage_id:   i64,
  pub step_id:    i64,
  pub schema:     String,
  pub data:       Box<RawValue>,
  /// Set by the store at insert time.
  pub created_at: DateTime<Utc>,
}

impl Card {
  pub fn from_new(id: i64, new: NewCard, created_at: DateTime<Utc>) -> Self {
    Card {
      id,
      build_id: new.build_id,
      stage_id: new.stage_id,
      step_id: new.step_id,
      schema: new.schema,
      data: new.data,
      created_at,
    }
  }
}
