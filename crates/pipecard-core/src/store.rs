//! Store capabilities consumed by the card create path.
//!
//! [`PipelineStore`] is the read-only view of the execution engine's
//! hierarchy; [`CardStore`] persists cards. Both are injected into the API
//! layer, which depends on these abstractions rather than any backend.

use std::future::Future;

use crate::{
  card::{Card, NewCard},
  pipeline::{Build, Repository, Stage, Step},
};

// ─── Outcome ─────────────────────────────────────────────────────────────────

/// Result of [`CardStore::create_card`].
///
/// A step holds at most one card. The check and the insert are a single
/// atomic operation in the backend, so concurrent creates for the same step
/// yield exactly one `Created`.
#[derive(Debug, Clone)]
pub enum CreateOutcome {
  Created(Card),
  AlreadyExists,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Lookups over the pipeline hierarchy. Every method returns `None` when no
/// entity matches the key.
pub trait PipelineStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Find a repository by `(namespace, name)`.
  fn find_repository<'a>(
    &'a self,
    namespace: &'a str,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Repository>, Self::Error>> + Send + 'a;

  /// Find a build by its repository-scoped number.
  fn find_build(
    &self,
    repo_id: i64,
    number: i64,
  ) -> impl Future<Output = Result<Option<Build>, Self::Error>> + Send + '_;

  /// Find a stage by its build-scoped number.
  fn find_stage(
    &self,
    build_id: i64,
    number: isize,
  ) -> impl Future<Output = Result<Option<Stage>, Self::Error>> + Send + '_;

  /// Find a step by its stage-scoped number.
  fn find_step(
    &self,
    stage_id: i64,
    number: isize,
  ) -> impl Future<Output = Result<Option<Step>, Self::Error>> + Send + '_;
}

/// Card persistence keyed by owning step.
pub trait CardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `card` unless its step already has one. The returned card
  /// carries the store-assigned `id` and `created_at`, and is visible to
  /// [`find_card_by_step`](Self::find_card_by_step) once this resolves.
  fn create_card(
    &self,
    card: NewCard,
  ) -> impl Future<Output = Result<CreateOutcome, Self::Error>> + Send + '_;

  /// Retrieve the card attached to a step. Returns `None` if there is none.
  fn find_card_by_step(
    &self,
    step_id: i64,
  ) -> impl Future<Output = Result<Option<Card>, Self::Error>> + Send + '_;
}
