//! Card schema validation.
//!
//! A [`SchemaRegistry`] maps schema identifiers to structural rules. New
//! schemas are added with [`SchemaRegistry::register`]; resolution and
//! persistence never look at schema names.
//!
//! | Schema | Rule |
//! |--------|------|
//! | `json` | any JSON value |
//! | `table` | object with `rows`: equal-width arrays of scalar cells; optional `columns`: strings matching the row width |
//! | `markdown` | a JSON string |
//! | `adaptive-card` | object with `"type": "AdaptiveCard"`; `body`, if present, is an array |

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{Error, Result};

/// Default payload ceiling in bytes.
pub const DEFAULT_MAX_CARD_BYTES: usize = 1024 * 1024;

// ─── Rules ───────────────────────────────────────────────────────────────────

/// A structural check over a parsed payload. Returns a human-readable
/// reason on failure.
pub trait SchemaRule: Send + Sync {
  fn check(&self, data: &Value) -> Result<(), String>;
}

impl<F> SchemaRule for F
where
  F: Fn(&Value) -> Result<(), String> + Send + Sync,
{
  fn check(&self, data: &Value) -> Result<(), String> { self(data) }
}

/// Any JSON value.
pub struct AnyJson;

impl SchemaRule for AnyJson {
  fn check(&self, _data: &Value) -> Result<(), String> { Ok(()) }
}

/// Rows of scalar cells, all the same width.
pub struct Table;

impl SchemaRule for Table {
  fn check(&self, data: &Value) -> Result<(), String> {
    let obj = data.as_object().ok_or("expected an object")?;
    let rows = obj
      .get("rows")
      .ok_or("missing \"rows\"")?
      .as_array()
      .ok_or("\"rows\" must be an array")?;

    let mut width = None;
    for (i, row) in rows.iter().enumerate() {
      let cells = row
        .as_array()
        .ok_or_else(|| format!("row {i} must be an array"))?;
      if let Some(c) = cells.iter().position(|c| c.is_array() || c.is_object()) {
        return Err(format!("row {i} cell {c} must be a scalar"));
      }
      match width {
        None => width = Some(cells.len()),
        Some(w) if w != cells.len() => {
          return Err(format!("row {i} has {} columns, expected {w}", cells.len()));
        }
        Some(_) => {}
      }
    }

    if let Some(columns) = obj.get("columns") {
      let columns = columns.as_array().ok_or("\"columns\" must be an array")?;
      if !columns.iter().all(Value::is_string) {
        return Err("\"columns\" must contain only strings".into());
      }
      if let Some(w) = width
        && w != columns.len()
      {
        return Err(format!("{} columns declared but rows have {w}", columns.len()));
      }
    }

    Ok(())
  }
}

/// A markdown document carried as a JSON string.
pub struct Markdown;

impl SchemaRule for Markdown {
  fn check(&self, data: &Value) -> Result<(), String> {
    if data.is_string() { Ok(()) } else { Err("expected a string".into()) }
  }
}

/// The envelope of an Adaptive Card document.
pub struct AdaptiveCard;

impl SchemaRule for AdaptiveCard {
  fn check(&self, data: &Value) -> Result<(), String> {
    let obj = data.as_object().ok_or("expected an object")?;
    if obj.get("type").and_then(Value::as_str) != Some("AdaptiveCard") {
      return Err("\"type\" must be \"AdaptiveCard\"".into());
    }
    match obj.get("body") {
      Some(body) if !body.is_array() => Err("\"body\" must be an array".into()),
      _ => Ok(()),
    }
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The set of recognised schemas plus the payload size ceiling.
///
/// Cloning is cheap — rules are reference-counted.
#[derive(Clone)]
pub struct SchemaRegistry {
  rules:     BTreeMap<String, Arc<dyn SchemaRule>>,
  max_bytes: usize,
}

impl SchemaRegistry {
  /// An empty registry. Every schema is unknown until registered.
  pub fn new(max_bytes: usize) -> Self {
    Self { rules: BTreeMap::new(), max_bytes }
  }

  /// A registry with every built-in schema.
  pub fn builtin(max_bytes: usize) -> Self {
    Self::new(max_bytes)
      .register("json", AnyJson)
      .register("table", Table)
      .register("markdown", Markdown)
      .register("adaptive-card", AdaptiveCard)
  }

  /// A registry with only the named built-ins enabled. Fails with
  /// [`Error::UnknownSchema`] on a name that is not built in.
  pub fn builtin_subset<I, S>(max_bytes: usize, names: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let all = Self::builtin(max_bytes);
    let mut enabled = Self::new(max_bytes);
    for name in names {
      let name = name.as_ref();
      let rule = all
        .rules
        .get(name)
        .ok_or_else(|| Error::UnknownSchema(name.to_owned()))?;
      enabled.rules.insert(name.to_owned(), Arc::clone(rule));
    }
    Ok(enabled)
  }

  /// Add or replace the rule for `name`.
  pub fn register(mut self, name: impl Into<String>, rule: impl SchemaRule + 'static) -> Self {
    self.rules.insert(name.into(), Arc::new(rule));
    self
  }

  pub fn max_bytes(&self) -> usize { self.max_bytes }

  pub fn names(&self) -> impl Iterator<Item = &str> { self.rules.keys().map(String::as_str) }

  /// Validate `data` under `schema`.
  ///
  /// The size ceiling is checked before the payload is parsed.
  pub fn validate(&self, schema: &str, data: &[u8]) -> Result<()> {
    if schema.is_empty() {
      return Err(Error::EmptySchema);
    }
    let rule = self
      .rules
      .get(schema)
      .ok_or_else(|| Error::UnknownSchema(schema.to_owned()))?;

    if data.len() > self.max_bytes {
      return Err(Error::PayloadTooLarge { size: data.len(), limit: self.max_bytes });
    }

    let invalid = |reason: String| Error::InvalidPayload { schema: schema.to_owned(), reason };
    let value: Value = serde_json::from_slice(data).map_err(|e| invalid(e.to_string()))?;
    rule.check(&value).map_err(invalid)
  }
}

impl std::fmt::Debug for SchemaRegistry {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SchemaRegistry")
      .field("schemas", &self.rules.keys().collect::<Vec<_>>())
      .field("max_bytes", &self.max_bytes)
      .finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ErrorKind;

  fn registry() -> SchemaRegistry { SchemaRegistry::builtin(DEFAULT_MAX_CARD_BYTES) }

  fn reason(err: Error) -> String {
    match err {
      Error::InvalidPayload { reason, .. } => reason,
      other => panic!("expected InvalidPayload, got {other:?}"),
    }
  }

  // ── Schema names ──────────────────────────────────────────────────────────

  #[test]
  fn empty_schema_is_rejected() {
    let err = registry().validate("", b"{}").unwrap_err();
    assert!(matches!(err, Error::EmptySchema));
    assert_eq!(err.kind(), ErrorKind::Input);
  }

  #[test]
  fn unknown_schema_is_rejected_regardless_of_data() {
    for data in [&b"{}"[..], &b"not json"[..], &b""[..]] {
      let err = registry().validate("chart", data).unwrap_err();
      assert!(matches!(err, Error::UnknownSchema(ref s) if s == "chart"));
    }
  }

  #[test]
  fn registered_rule_is_used() {
    let reg = SchemaRegistry::new(1024).register("number", |v: &Value| {
      if v.is_number() { Ok(()) } else { Err("expected a number".to_string()) }
    });
    assert!(reg.validate("number", b"12").is_ok());
    assert_eq!(reason(reg.validate("number", b"\"12\"").unwrap_err()), "expected a number");
    assert!(matches!(reg.validate("table", b"{}").unwrap_err(), Error::UnknownSchema(_)));
  }

  #[test]
  fn builtin_subset_enables_only_named_schemas() {
    let reg = SchemaRegistry::builtin_subset(1024, ["table"]).unwrap();
    assert_eq!(reg.names().collect::<Vec<_>>(), ["table"]);
    assert!(matches!(reg.validate("json", b"{}").unwrap_err(), Error::UnknownSchema(_)));

    let err = SchemaRegistry::builtin_subset(1024, ["table", "chart"]).unwrap_err();
    assert!(matches!(err, Error::UnknownSchema(ref s) if s == "chart"));
  }

  // ── Size ──────────────────────────────────────────────────────────────────

  #[test]
  fn oversized_payload_is_rejected_even_if_valid() {
    let reg = SchemaRegistry::builtin(16);
    let data = br#"{"rows":[["a","b"],["c","d"]]}"#;
    assert!(Table.check(&serde_json::from_slice(data).unwrap()).is_ok());

    let err = reg.validate("table", data).unwrap_err();
    assert!(matches!(err, Error::PayloadTooLarge { size, limit: 16 } if size == data.len()));
  }

  #[test]
  fn oversized_garbage_reports_size_not_syntax() {
    let reg = SchemaRegistry::builtin(4);
    let err = reg.validate("json", b"{{{{{{{{").unwrap_err();
    assert!(matches!(err, Error::PayloadTooLarge { .. }));
  }

  #[test]
  fn payload_at_limit_is_accepted() {
    let reg = SchemaRegistry::builtin(4);
    assert!(reg.validate("json", b"1234").is_ok());
  }

  // ── json ──────────────────────────────────────────────────────────────────

  #[test]
  fn json_accepts_any_value_but_not_bad_syntax() {
    for data in [&b"null"[..], &b"[1,2]"[..], &b"\"s\""[..], &br#"{"a":{}}"#[..]] {
      assert!(registry().validate("json", data).is_ok());
    }
    assert!(matches!(
      registry().validate("json", b"{\"a\":").unwrap_err(),
      Error::InvalidPayload { .. }
    ));
  }

  // ── table ─────────────────────────────────────────────────────────────────

  #[test]
  fn table_accepts_equal_width_rows() {
    let reg = registry();
    assert!(reg.validate("table", br#"{"rows":[["a","b"]]}"#).is_ok());
    assert!(reg.validate("table", br#"{"rows":[]}"#).is_ok());
    assert!(
      reg
        .validate("table", br#"{"columns":["k","v"],"rows":[["a",1],["b",null]]}"#)
        .is_ok()
    );
  }

  #[test]
  fn table_rejects_ragged_rows() {
    let err = registry().validate("table", br#"{"rows":[["a","b"],["c"]]}"#).unwrap_err();
    assert_eq!(reason(err), "row 1 has 1 columns, expected 2");
  }

  #[test]
  fn table_rejects_missing_rows_and_nested_cells() {
    let reg = registry();
    assert_eq!(reason(reg.validate("table", b"{}").unwrap_err()), "missing \"rows\"");
    assert_eq!(reason(reg.validate("table", b"[]").unwrap_err()), "expected an object");
    assert_eq!(
      reason(reg.validate("table", br#"{"rows":[["a",{"b":1}]]}"#).unwrap_err()),
      "row 0 cell 1 must be a scalar"
    );
  }

  #[test]
  fn table_columns_must_match_row_width() {
    let err = registry()
      .validate("table", br#"{"columns":["k"],"rows":[["a","b"]]}"#)
      .unwrap_err();
    assert_eq!(reason(err), "1 columns declared but rows have 2");
  }

  // ── markdown / adaptive-card ──────────────────────────────────────────────

  #[test]
  fn markdown_requires_a_string() {
    assert!(registry().validate("markdown", br##""# Results""##).is_ok());
    assert!(registry().validate("markdown", b"{}").is_err());
  }

  #[test]
  fn adaptive_card_requires_type_and_array_body() {
    let reg = registry();
    assert!(reg.validate("adaptive-card", br#"{"type":"AdaptiveCard","body":[]}"#).is_ok());
    assert!(reg.validate("adaptive-card", br#"{"type":"AdaptiveCard"}"#).is_ok());
    assert!(reg.validate("adaptive-card", br#"{"type":"Card"}"#).is_err());
    assert!(reg.validate("adaptive-card", br#"{"type":"AdaptiveCard","body":{}}"#).is_err());
  }
}
