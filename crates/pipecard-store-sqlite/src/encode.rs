//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings; card data as the raw JSON
//! text the caller submitted.

use chrono::{DateTime, Utc};
use pipecard_core::card::Card;
use serde_json::value::RawValue;

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Raw values read directly from a `cards` row.
pub struct RawCard {
  pub id:         i64,
  pub build_id:   i64,
  pub stage_id:   i64,
  pub step_id:    i64,
  pub schema:     String,
  pub data:       String,
  pub created_at: String,
}

impl RawCard {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(RawCard {
      id:         row.get(0)?,
      build_id:   row.get(1)?,
      stage_id:   row.get(2)?,
      step_id:    row.get(3)?,
      schema:     row.get(4)?,
      data:       row.get(5)?,
      created_at: row.get(6)?,
    })
  }

  pub fn into_card(self) -> Result<Card> {
    Ok(Card {
      id:         self.id,
      build_id:   self.build_id,
      stage_id:   self.stage_id,
      step_id:    self.step_id,
      schema:     self.schema,
      data:       RawValue::from_string(self.data)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
