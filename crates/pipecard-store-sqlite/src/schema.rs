//! SQL schema for the card store.
//!
//! The pipeline tables mirror what the execution engine writes; this crate
//! only reads them, apart from the seed helpers on
//! [`SqliteStore`](crate::SqliteStore).

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS repos (
    repo_id        INTEGER PRIMARY KEY AUTOINCREMENT,
    repo_namespace TEXT NOT NULL,
    repo_name      TEXT NOT NULL,
    UNIQUE (repo_namespace, repo_name)
);

CREATE TABLE IF NOT EXISTS builds (
    build_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    build_repo_id INTEGER NOT NULL REFERENCES repos(repo_id),
    build_number  INTEGER NOT NULL,
    UNIQUE (build_repo_id, build_number)
);

CREATE TABLE IF NOT EXISTS stages (
    stage_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    stage_build_id INTEGER NOT NULL REFERENCES builds(build_id),
    stage_number   INTEGER NOT NULL,
    stage_name     TEXT NOT NULL DEFAULT '',
    UNIQUE (stage_build_id, stage_number)
);

CREATE TABLE IF NOT EXISTS steps (
    step_id       INTEGER PRIMARY KEY AUTOINCREMENT,
    step_stage_id INTEGER NOT NULL REFERENCES stages(stage_id),
    step_number   INTEGER NOT NULL,
    step_name     TEXT NOT NULL DEFAULT '',
    UNIQUE (step_stage_id, step_number)
);

-- At most one card per step. Cards are never updated or deleted here.
CREATE TABLE IF NOT EXISTS cards (
    card_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    card_build   INTEGER NOT NULL REFERENCES builds(build_id),
    card_stage   INTEGER NOT NULL REFERENCES stages(stage_id),
    card_step    INTEGER NOT NULL REFERENCES steps(step_id),
    card_schema  TEXT NOT NULL,
    card_data    TEXT NOT NULL,   -- raw JSON exactly as submitted
    card_created TEXT NOT NULL,   -- RFC 3339 UTC; server-assigned
    UNIQUE (card_step)
);

CREATE INDEX IF NOT EXISTS cards_build_idx ON cards(card_build);

PRAGMA user_version = 1;
";
