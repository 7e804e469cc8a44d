//! [`SqliteStore`] — the SQLite implementation of [`PipelineStore`] and
//! [`CardStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;

use pipecard_core::{
  card::{Card, NewCard},
  pipeline::{Build, Repository, Stage, Step},
  store::{CardStore, CreateOutcome, PipelineStore},
};

use crate::{
  Result,
  encode::{RawCard, encode_dt},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A card store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Seeding ───────────────────────────────────────────────────────────────
  //
  // Builds, stages and steps belong to the execution engine. These inserts
  // exist so a fresh database (and the test suites) can hold a pipeline.

  pub async fn insert_repository(&self, namespace: &str, name: &str) -> Result<Repository> {
    let (ns, nm) = (namespace.to_owned(), name.to_owned());
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO repos (repo_namespace, repo_name) VALUES (?1, ?2)",
          rusqlite::params![ns, nm],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Repository { id, namespace: namespace.to_owned(), name: name.to_owned() })
  }

  pub async fn insert_build(&self, repo_id: i64, number: i64) -> Result<Build> {
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO builds (build_repo_id, build_number) VALUES (?1, ?2)",
          rusqlite::params![repo_id, number],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Build { id, repo_id, number })
  }

  pub async fn insert_stage(&self, build_id: i64, number: isize, name: &str) -> Result<Stage> {
    let nm = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO stages (stage_build_id, stage_number, stage_name) VALUES (?1, ?2, ?3)",
          rusqlite::params![build_id, number, nm],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Stage { id, build_id, number, name: name.to_owned() })
  }

  pub async fn insert_step(&self, stage_id: i64, number: isize, name: &str) -> Result<Step> {
    let nm = name.to_owned();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO steps (step_stage_id, step_number, step_name) VALUES (?1, ?2, ?3)",
          rusqlite::params![stage_id, number, nm],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Step { id, stage_id, number, name: name.to_owned() })
  }
}

// ─── PipelineStore impl ──────────────────────────────────────────────────────

impl PipelineStore for SqliteStore {
  type Error = crate::Error;

  async fn find_repository<'a>(
    &'a self,
    namespace: &'a str,
    name: &'a str,
  ) -> Result<Option<Repository>> {
    let (ns, nm) = (namespace.to_owned(), name.to_owned());

    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT repo_id, repo_namespace, repo_name FROM repos
                 WHERE repo_namespace = ?1 AND repo_name = ?2",
                rusqlite::params![ns, nm],
                |row| {
                  Ok(Repository {
                    id:        row.get(0)?,
                    namespace: row.get(1)?,
                    name:      row.get(2)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_build(&self, repo_id: i64, number: i64) -> Result<Option<Build>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT build_id, build_repo_id, build_number FROM builds
                 WHERE build_repo_id = ?1 AND build_number = ?2",
                rusqlite::params![repo_id, number],
                |row| {
                  Ok(Build {
                    id:      row.get(0)?,
                    repo_id: row.get(1)?,
                    number:  row.get(2)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_stage(&self, build_id: i64, number: isize) -> Result<Option<Stage>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT stage_id, stage_build_id, stage_number, stage_name FROM stages
                 WHERE stage_build_id = ?1 AND stage_number = ?2",
                rusqlite::params![build_id, number],
                |row| {
                  Ok(Stage {
                    id:       row.get(0)?,
                    build_id: row.get(1)?,
                    number:   row.get(2)?,
                    name:     row.get(3)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }

  async fn find_step(&self, stage_id: i64, number: isize) -> Result<Option<Step>> {
    Ok(
      self
        .conn
        .call(move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT step_id, step_stage_id, step_number, step_name FROM steps
                 WHERE step_stage_id = ?1 AND step_number = ?2",
                rusqlite::params![stage_id, number],
                |row| {
                  Ok(Step {
                    id:       row.get(0)?,
                    stage_id: row.get(1)?,
                    number:   row.get(2)?,
                    name:     row.get(3)?,
                  })
                },
              )
              .optional()?,
          )
        })
        .await?,
    )
  }
}

// ─── CardStore impl ──────────────────────────────────────────────────────────

impl CardStore for SqliteStore {
  type Error = crate::Error;

  async fn create_card(&self, card: NewCard) -> Result<CreateOutcome> {
    let created_at = Utc::now();

    let build_id   = card.build_id;
    let stage_id   = card.stage_id;
    let step_id    = card.step_id;
    let schema     = card.schema.clone();
    let data       = card.data.get().to_owned();
    let created    = encode_dt(created_at);

    // Single statement: the uniqueness check and the insert cannot interleave
    // with a concurrent create for the same step.
    let inserted: Option<i64> = self
      .conn
      .call(move |conn| {
        let rows = conn.execute(
          "INSERT INTO cards (
             card_build, card_stage, card_step, card_schema, card_data, card_created
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (card_step) DO NOTHING",
          rusqlite::params![build_id, stage_id, step_id, schema, data, created],
        )?;
        Ok((rows == 1).then(|| conn.last_insert_rowid()))
      })
      .await?;

    match inserted {
      Some(id) => Ok(CreateOutcome::Created(Card::from_new(id, card, created_at))),
      None => {
        tracing::debug!(step_id, "card insert skipped, step already carded");
        Ok(CreateOutcome::AlreadyExists)
      }
    }
  }

  async fn find_card_by_step(&self, step_id: i64) -> Result<Option<Card>> {
    let raw: Option<RawCard> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT card_id, card_build, card_stage, card_step,
                      card_schema, card_data, card_created
               FROM cards WHERE card_step = ?1",
              rusqlite::params![step_id],
              RawCard::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCard::into_card).transpose()
  }
}
