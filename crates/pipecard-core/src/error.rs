//! Error types for `pipecard-core`.

use std::{fmt, num::ParseIntError};

use thiserror::Error;

/// The hierarchy level at which a lookup came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Repository,
  Build,
  Stage,
  Step,
  Card,
}

impl Level {
  pub fn as_str(self) -> &'static str {
    match self {
      Level::Repository => "repository",
      Level::Build => "build",
      Level::Stage => "stage",
      Level::Step => "step",
      Level::Card => "card",
    }
  }
}

impl fmt::Display for Level {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Caller-visible failure category. Each maps to exactly one response
/// status in the API layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Input,
  NotFound,
  Conflict,
  Storage,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {field} {value:?}: {source}")]
  InvalidNumber {
    field:  &'static str,
    value:  String,
    #[source]
    source: ParseIntError,
  },

  #[error("malformed request body: {0}")]
  MalformedBody(String),

  #[error("{level} {key} not found")]
  NotFound { level: Level, key: String },

  #[error("schema must not be empty")]
  EmptySchema,

  #[error("unknown schema: {0:?}")]
  UnknownSchema(String),

  #[error("card data is {size} bytes, exceeding the {limit} byte limit")]
  PayloadTooLarge { size: usize, limit: usize },

  #[error("card data is not valid {schema:?}: {reason}")]
  InvalidPayload { schema: String, reason: String },

  #[error("a card already exists for step {0}")]
  CardExists(i64),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn not_found(level: Level, key: impl fmt::Display) -> Self {
    Error::NotFound { level, key: key.to_string() }
  }

  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Error::Store(Box::new(e))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Error::InvalidNumber { .. }
      | Error::MalformedBody(_)
      | Error::EmptySchema
      | Error::UnknownSchema(_)
      | Error::PayloadTooLarge { .. }
      | Error::InvalidPayload { .. } => ErrorKind::Input,
      Error::NotFound { .. } => ErrorKind::NotFound,
      Error::CardExists(_) => ErrorKind::Conflict,
      Error::Store(_) => ErrorKind::Storage,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn not_found_message_names_the_level() {
    let err = Error::not_found(Level::Step, 99);
    assert_eq!(err.to_string(), "step 99 not found");
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[test]
  fn parse_failures_are_input_errors() {
    let source = "abc".parse::<i64>().unwrap_err();
    let err = Error::InvalidNumber { field: "build", value: "abc".into(), source };
    assert_eq!(err.kind(), ErrorKind::Input);
    assert!(err.to_string().starts_with("invalid build \"abc\""));
  }
}
