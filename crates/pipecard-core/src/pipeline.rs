//! Pipeline hierarchy entities — read-only to this crate.
//!
//! Repositories, builds, stages and steps are produced by the execution
//! engine. The card create path only ever looks them up by their
//! parent-scoped keys.

use serde::{Deserialize, Serialize};

/// A repository, unique by `(namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
  pub id:        i64,
  pub namespace: String,
  pub name:      String,
}

/// One execution of a repository's pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
  pub id:      i64,
  pub repo_id: i64,
  /// Repository-scoped sequence number.
  pub number:  i64,
}

/// An ordered group of steps within a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
  pub id:       i64,
  pub build_id: i64,
  /// Build-scoped sequence number.
  pub number:   isize,
  pub name:     String,
}

/// A single executed unit of work within a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
  pub id:       i64,
  pub stage_id: i64,
  /// Stage-scoped sequence number.
  pub number:   isize,
  pub name:     String,
}
