//! Identity resolution: `(namespace, name, build, stage, step)` to the four
//! internal identities a card is keyed by.
//!
//! Lookups run strictly top-down and stop at the first level that does not
//! exist. Nothing here writes.

use crate::{
  Error, Level, Result,
  pipeline::{Build, Repository, Stage, Step},
  store::PipelineStore,
};

// ─── Address ─────────────────────────────────────────────────────────────────

/// A parsed step address. Construct with [`StepAddress::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepAddress {
  pub namespace: String,
  pub name:      String,
  pub build:     i64,
  pub stage:     isize,
  pub step:      isize,
}

impl StepAddress {
  /// Parse raw path segments. Numeric segments that do not parse are input
  /// errors naming the offending field; no lookup is implied by a failure
  /// here.
  pub fn parse(
    namespace: impl Into<String>,
    name: impl Into<String>,
    build: &str,
    stage: &str,
    step: &str,
  ) -> Result<Self> {
    Ok(Self {
      namespace: namespace.into(),
      name:      name.into(),
      build:     parse_number("build", build)?,
      stage:     parse_number("stage", stage)?,
      step:      parse_number("step", step)?,
    })
  }
}

fn parse_number<T>(field: &'static str, raw: &str) -> Result<T>
where
  T: std::str::FromStr<Err = std::num::ParseIntError>,
{
  raw.parse().map_err(|source| Error::InvalidNumber {
    field,
    value: raw.to_owned(),
    source,
  })
}

// ─── Resolution ──────────────────────────────────────────────────────────────

/// The fully resolved hierarchy for one step.
#[derive(Debug, Clone)]
pub struct Resolved {
  pub repository: Repository,
  pub build:      Build,
  pub stage:      Stage,
  pub step:       Step,
}

/// Resolve `addr` against `store`, failing with [`Error::NotFound`] at the
/// first missing level. Backend failures surface as [`Error::Store`].
pub async fn resolve<P>(store: &P, addr: &StepAddress) -> Result<Resolved>
where
  P: PipelineStore,
{
  let repository = store
    .find_repository(&addr.namespace, &addr.name)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| {
      Error::not_found(Level::Repository, format!("{}/{}", addr.namespace, addr.name))
    })?;

  let build = store
    .find_build(repository.id, addr.build)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found(Level::Build, addr.build))?;

  let stage = store
    .find_stage(build.id, addr.stage)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found(Level::Stage, addr.stage))?;

  let step = store
    .find_step(stage.id, addr.step)
    .await
    .map_err(Error::store)?
    .ok_or_else(|| Error::not_found(Level::Step, addr.step))?;

  Ok(Resolved { repository, build, stage, step })
}
