//! SQL schema for the Ladder SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS items (
    item_id        TEXT PRIMARY KEY,
    category_id    TEXT    NOT NULL,
    prompt         TEXT    NOT NULL,
    correct_answer TEXT    NOT NULL,
    explanation    TEXT,
    difficulty     INTEGER NOT NULL,
    times_answered INTEGER NOT NULL DEFAULT 0,
    times_correct  INTEGER NOT NULL DEFAULT 0,
    updated_at     TEXT    NOT NULL,
    CHECK (times_correct <= times_answered)
);

CREATE TABLE IF NOT EXISTS sessions (
    session_id TEXT PRIMARY KEY,
    subject_id TEXT NOT NULL,
    status     TEXT NOT NULL,   -- 'active' | 'paused' | 'completed' | 'abandoned'
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS ratings_overall (
    subject_id   TEXT PRIMARY KEY,
    value        INTEGER NOT NULL,
    k_factor     REAL    NOT NULL,
    sample_count INTEGER NOT NULL DEFAULT 0,
    updated_at   TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS ratings_category (
    subject_id   TEXT    NOT NULL,
    category_id  TEXT    NOT NULL,
    value        INTEGER NOT NULL,
    k_factor     REAL    NOT NULL,
    sample_count INTEGER NOT NULL DEFAULT 0,
    updated_at   TEXT    NOT NULL,
    PRIMARY KEY (subject_id, category_id)
);

-- The attempt ledger is strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS attempts (
    attempt_id             TEXT PRIMARY KEY,
    session_id             TEXT    NOT NULL REFERENCES sessions(session_id),
    item_id                TEXT    NOT NULL REFERENCES items(item_id),
    subject_id             TEXT    NOT NULL,
    category_id            TEXT    NOT NULL,
    answer                 TEXT    NOT NULL,
    is_correct             INTEGER NOT NULL,
    rating_before          INTEGER NOT NULL,
    rating_after           INTEGER NOT NULL,
    category_rating_before INTEGER NOT NULL,
    category_rating_after  INTEGER NOT NULL,
    item_rating_before     INTEGER NOT NULL,
    item_rating_after      INTEGER NOT NULL,
    expected_score         REAL    NOT NULL,
    answered_at            TEXT    NOT NULL,
    UNIQUE (session_id, item_id)
);

CREATE INDEX IF NOT EXISTS items_category_idx    ON items(category_id);
CREATE INDEX IF NOT EXISTS sessions_subject_idx  ON sessions(subject_id);
CREATE INDEX IF NOT EXISTS attempts_subject_idx  ON attempts(subject_id, category_id);

PRAGMA user_version = 1;
";
