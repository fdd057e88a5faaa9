//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, category ids as their slug and session status as its lowercase
//! name. Integers and reals are read with their native SQLite types.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use ladder_core::{
  ids::CategoryId,
  model::{Attempt, Item, Rating, Session, SessionStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: impl Into<Uuid>) -> String { id.into().hyphenated().to_string() }

pub fn decode_uuid<T: From<Uuid>>(s: &str) -> Result<T> { Ok(Uuid::parse_str(s)?.into()) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── CategoryId / SessionStatus ───────────────────────────────────────────────

pub fn decode_category(s: &str) -> Result<CategoryId> { Ok(CategoryId::new(s)?) }

pub fn encode_status(status: SessionStatus) -> String { status.to_string() }

pub fn decode_status(s: &str) -> Result<SessionStatus> {
  SessionStatus::from_str(s).map_err(|_| Error::UnknownSessionStatus(s.to_owned()))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Columns shared by `ratings_overall` and `ratings_category`.
pub struct RawRating {
  pub subject_id:   String,
  pub category_id:  Option<String>,
  pub value:        i32,
  pub k_factor:     f64,
  pub sample_count: u32,
  pub updated_at:   String,
}

impl RawRating {
  pub fn into_rating(self) -> Result<Rating> {
    Ok(Rating {
      subject_id:   decode_uuid(&self.subject_id)?,
      category:     self.category_id.as_deref().map(decode_category).transpose()?,
      value:        self.value,
      volatility:   self.k_factor,
      sample_count: self.sample_count,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `items` row.
pub struct RawItem {
  pub item_id:        String,
  pub category_id:    String,
  pub prompt:         String,
  pub correct_answer: String,
  pub explanation:    Option<String>,
  pub difficulty:     i32,
  pub times_answered: u32,
  pub times_correct:  u32,
}

/// Column list matching [`RawItem::from_row`].
pub const ITEM_COLUMNS: &str = "item_id, category_id, prompt, correct_answer, explanation, \
                                difficulty, times_answered, times_correct";

impl RawItem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:        row.get(0)?,
      category_id:    row.get(1)?,
      prompt:         row.get(2)?,
      correct_answer: row.get(3)?,
      explanation:    row.get(4)?,
      difficulty:     row.get(5)?,
      times_answered: row.get(6)?,
      times_correct:  row.get(7)?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    Ok(Item {
      item_id:        decode_uuid(&self.item_id)?,
      category:       decode_category(&self.category_id)?,
      prompt:         self.prompt,
      difficulty:     self.difficulty,
      times_answered: self.times_answered,
      times_correct:  self.times_correct,
      correct_answer: self.correct_answer,
      explanation:    self.explanation,
    })
  }
}

/// Raw strings read directly from a `sessions` row.
pub struct RawSession {
  pub session_id: String,
  pub subject_id: String,
  pub status:     String,
  pub created_at: String,
  pub updated_at: String,
}

pub const SESSION_COLUMNS: &str = "session_id, subject_id, status, created_at, updated_at";

impl RawSession {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id: row.get(0)?,
      subject_id: row.get(1)?,
      status:     row.get(2)?,
      created_at: row.get(3)?,
      updated_at: row.get(4)?,
    })
  }

  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      session_id: decode_uuid(&self.session_id)?,
      subject_id: decode_uuid(&self.subject_id)?,
      status:     decode_status(&self.status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from an `attempts` row.
pub struct RawAttempt {
  pub attempt_id:             String,
  pub session_id:             String,
  pub item_id:                String,
  pub subject_id:             String,
  pub category_id:            String,
  pub answer:                 String,
  pub is_correct:             bool,
  pub rating_before:          i32,
  pub rating_after:           i32,
  pub category_rating_before: i32,
  pub category_rating_after:  i32,
  pub item_rating_before:     i32,
  pub item_rating_after:      i32,
  pub expected_score:         f64,
  pub answered_at:            String,
}

pub const ATTEMPT_COLUMNS: &str = "attempt_id, session_id, item_id, subject_id, category_id, \
                                   answer, is_correct, rating_before, rating_after, \
                                   category_rating_before, category_rating_after, \
                                   item_rating_before, item_rating_after, expected_score, \
                                   answered_at";

impl RawAttempt {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      attempt_id:             row.get(0)?,
      session_id:             row.get(1)?,
      item_id:                row.get(2)?,
      subject_id:             row.get(3)?,
      category_id:            row.get(4)?,
      answer:                 row.get(5)?,
      is_correct:             row.get(6)?,
      rating_before:          row.get(7)?,
      rating_after:           row.get(8)?,
      category_rating_before: row.get(9)?,
      category_rating_after:  row.get(10)?,
      item_rating_before:     row.get(11)?,
      item_rating_after:      row.get(12)?,
      expected_score:         row.get(13)?,
      answered_at:            row.get(14)?,
    })
  }

  pub fn into_attempt(self) -> Result<Attempt> {
    Ok(Attempt {
      attempt_id:             decode_uuid(&self.attempt_id)?,
      session_id:             decode_uuid(&self.session_id)?,
      item_id:                decode_uuid(&self.item_id)?,
      subject_id:             decode_uuid(&self.subject_id)?,
      category:               decode_category(&self.category_id)?,
      answer:                 self.answer,
      is_correct:             self.is_correct,
      rating_before:          self.rating_before,
      rating_after:           self.rating_after,
      category_rating_before: self.category_rating_before,
      category_rating_after:  self.category_rating_after,
      item_rating_before:     self.item_rating_before,
      item_rating_after:      self.item_rating_after,
      expected_score:         self.expected_score,
      answered_at:            decode_dt(&self.answered_at)?,
    })
  }
}
