//! [`SqliteStore`], the SQLite implementation of [`PracticeStore`].

use std::{
  path::Path,
  sync::{Arc, Mutex, PoisonError},
  time::Duration,
};

use chrono::Utc;
use ladder_core::{
  Classify, answer,
  config::EngineConfig,
  ids::{CategoryId, ItemId, SessionId, SubjectId},
  model::{Attempt, AttemptOutcome, CategoryRating, Item, NewItem, Rating, Session, SessionStatus},
  priority::{CategoryPriority, CategoryStanding, category_priorities},
  rating::{RatingPolicy, subject_volatility},
  record::{AttemptInput, check_session, plan_attempt},
  select::{CandidateSelector, ScoredCandidate, SubjectRatings},
  store::{AttemptSubmission, PracticeStore, RatingUpdate, SelectionRequest},
};
use rusqlite::{Connection, OptionalExtension as _, Transaction, TransactionBehavior, params};
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  encode::{
    ATTEMPT_COLUMNS, ITEM_COLUMNS, RawAttempt, RawItem, RawRating, RawSession, SESSION_COLUMNS,
    decode_category, encode_dt, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Ladder practice store backed by a single SQLite file.
///
/// Cloning is cheap: the connection, configuration and selector are all
/// reference-counted. Several stores (or processes) may open the same file;
/// the attempt ledger's unique index keeps recording exactly-once across all
/// of them.
#[derive(Clone)]
pub struct SqliteStore {
  conn:     tokio_rusqlite::Connection,
  config:   Arc<EngineConfig>,
  selector: Arc<Mutex<CandidateSelector>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with the default configuration.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, EngineConfig::default()).await
  }

  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open_with(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, config).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(EngineConfig::default()).await
  }

  pub async fn open_in_memory_with(config: EngineConfig) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, config).await
  }

  async fn init(conn: tokio_rusqlite::Connection, config: EngineConfig) -> Result<Self> {
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    conn
      .call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;

    Ok(Self {
      conn,
      config: Arc::new(config),
      selector: Arc::new(Mutex::new(CandidateSelector::from_entropy())),
    })
  }

  /// Replace the source of selection jitter, e.g. with a seeded selector.
  #[must_use]
  pub fn with_selector(mut self, selector: CandidateSelector) -> Self {
    self.selector = Arc::new(Mutex::new(selector));
    self
  }

  pub fn config(&self) -> &EngineConfig { &self.config }
}

// ─── Transactions ────────────────────────────────────────────────────────────

/// Why a write transaction did not commit.
enum TxError {
  Sqlite(rusqlite::Error),
  /// A domain rejection or decode failure; rolled back and returned as-is.
  Abort(Error),
}

impl From<rusqlite::Error> for TxError {
  fn from(e: rusqlite::Error) -> Self { Self::Sqlite(e) }
}

impl From<Error> for TxError {
  fn from(e: Error) -> Self { Self::Abort(e) }
}

impl From<ladder_core::Error> for TxError {
  fn from(e: ladder_core::Error) -> Self { Self::Abort(e.into()) }
}

/// Run `f` inside a `BEGIN IMMEDIATE` transaction, committing only if it
/// succeeds. Dropping the transaction on any error rolls every write back.
///
/// Taking the write lock up front means concurrent writers queue on the busy
/// timeout instead of failing a read-to-write lock upgrade.
fn in_transaction<T>(
  conn: &mut Connection,
  f: impl FnOnce(&Transaction<'_>) -> Result<T, TxError>,
) -> std::result::Result<Result<T>, tokio_rusqlite::Error> {
  let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
  match f(&tx) {
    Ok(value) => {
      tx.commit()?;
      Ok(Ok(value))
    }
    Err(TxError::Abort(e)) => Ok(Err(e)),
    Err(TxError::Sqlite(e)) => Err(e.into()),
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(err, _)
      if err.code == rusqlite::ErrorCode::ConstraintViolation
        && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── Row access ──────────────────────────────────────────────────────────────
//
// Plain functions over a `Connection` so that they run unchanged on a bare
// connection or inside a caller's transaction (`Transaction` derefs to
// `Connection`) without committing on their own.

fn load_item(conn: &Connection, item_id: &str) -> rusqlite::Result<Option<RawItem>> {
  conn
    .query_row(
      &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
      params![item_id],
      RawItem::from_row,
    )
    .optional()
}

fn load_session(conn: &Connection, session_id: &str) -> rusqlite::Result<Option<RawSession>> {
  conn
    .query_row(
      &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE session_id = ?1"),
      params![session_id],
      RawSession::from_row,
    )
    .optional()
}

fn overall_rating(
  conn: &Connection,
  subject_id: &str,
  policy: &RatingPolicy,
) -> rusqlite::Result<RawRating> {
  let created = conn.execute(
    "INSERT INTO ratings_overall (subject_id, value, k_factor, sample_count, updated_at)
     VALUES (?1, ?2, ?3, 0, ?4)
     ON CONFLICT (subject_id) DO NOTHING",
    params![
      subject_id,
      policy.initial_rating(),
      subject_volatility(0),
      encode_dt(Utc::now()),
    ],
  )?;
  if created > 0 {
    debug!(subject = subject_id, "initialised overall rating");
  }

  conn.query_row(
    "SELECT subject_id, value, k_factor, sample_count, updated_at
     FROM ratings_overall WHERE subject_id = ?1",
    params![subject_id],
    |row| {
      Ok(RawRating {
        subject_id:   row.get(0)?,
        category_id:  None,
        value:        row.get(1)?,
        k_factor:     row.get(2)?,
        sample_count: row.get(3)?,
        updated_at:   row.get(4)?,
      })
    },
  )
}

fn raw_category_rating(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRating> {
  Ok(RawRating {
    subject_id:   row.get(0)?,
    category_id:  row.get(1)?,
    value:        row.get(2)?,
    k_factor:     row.get(3)?,
    sample_count: row.get(4)?,
    updated_at:   row.get(5)?,
  })
}

fn category_rating(
  conn: &Connection,
  subject_id: &str,
  category_id: &str,
  policy: &RatingPolicy,
) -> rusqlite::Result<RawRating> {
  let created = conn.execute(
    "INSERT INTO ratings_category
       (subject_id, category_id, value, k_factor, sample_count, updated_at)
     VALUES (?1, ?2, ?3, ?4, 0, ?5)
     ON CONFLICT (subject_id, category_id) DO NOTHING",
    params![
      subject_id,
      category_id,
      policy.initial_rating(),
      subject_volatility(0),
      encode_dt(Utc::now()),
    ],
  )?;
  if created > 0 {
    debug!(subject = subject_id, category = category_id, "initialised category rating");
  }

  conn.query_row(
    "SELECT subject_id, category_id, value, k_factor, sample_count, updated_at
     FROM ratings_category WHERE subject_id = ?1 AND category_id = ?2",
    params![subject_id, category_id],
    raw_category_rating,
  )
}

fn category_ratings(conn: &Connection, subject_id: &str) -> rusqlite::Result<Vec<RawRating>> {
  let mut stmt = conn.prepare(
    "SELECT subject_id, category_id, value, k_factor, sample_count, updated_at
     FROM ratings_category WHERE subject_id = ?1
     ORDER BY category_id",
  )?;
  let rows = stmt
    .query_map(params![subject_id], raw_category_rating)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

fn fetch_rating(
  conn: &Connection,
  subject_id: &str,
  category_id: Option<&str>,
  policy: &RatingPolicy,
) -> rusqlite::Result<RawRating> {
  match category_id {
    None => overall_rating(conn, subject_id, policy),
    Some(category_id) => category_rating(conn, subject_id, category_id, policy),
  }
}

/// Overwrite a rating row. The volatility is always derived from the sample
/// count, never written independently.
fn store_rating(
  conn: &Connection,
  subject_id: &str,
  category_id: Option<&str>,
  value: i32,
  sample_count: u32,
  updated_at: &str,
) -> rusqlite::Result<()> {
  let k_factor = subject_volatility(sample_count);
  match category_id {
    None => conn.execute(
      "UPDATE ratings_overall
       SET value = ?2, k_factor = ?3, sample_count = ?4, updated_at = ?5
       WHERE subject_id = ?1",
      params![subject_id, value, k_factor, sample_count, updated_at],
    )?,
    Some(category_id) => conn.execute(
      "UPDATE ratings_category
       SET value = ?3, k_factor = ?4, sample_count = ?5, updated_at = ?6
       WHERE subject_id = ?1 AND category_id = ?2",
      params![subject_id, category_id, value, k_factor, sample_count, updated_at],
    )?,
  };
  Ok(())
}

/// Append to the ledger. A second row for the same `(session, item)` pair
/// is rejected by the unique index and aborts the transaction.
fn insert_attempt(conn: &Connection, attempt: &Attempt) -> Result<(), TxError> {
  conn
    .execute(
      &format!(
        "INSERT INTO attempts ({ATTEMPT_COLUMNS})
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
      ),
      params![
        encode_uuid(attempt.attempt_id),
        encode_uuid(attempt.session_id),
        encode_uuid(attempt.item_id),
        encode_uuid(attempt.subject_id),
        attempt.category.as_str(),
        attempt.answer,
        attempt.is_correct,
        attempt.rating_before,
        attempt.rating_after,
        attempt.category_rating_before,
        attempt.category_rating_after,
        attempt.item_rating_before,
        attempt.item_rating_after,
        attempt.expected_score,
        encode_dt(attempt.answered_at),
      ],
    )
    .map_err(|e| {
      if is_unique_violation(&e) {
        TxError::from(ladder_core::Error::DuplicateAttempt {
          session: attempt.session_id,
          item:    attempt.item_id,
        })
      } else {
        TxError::Sqlite(e)
      }
    })?;
  Ok(())
}

/// Items of the session's pool: not yet attempted in `session_id`,
/// optionally restricted to one category.
fn unattempted_items(
  conn: &Connection,
  session_id: &str,
  category_id: Option<&str>,
) -> rusqlite::Result<Vec<RawItem>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ITEM_COLUMNS} FROM items i
     WHERE NOT EXISTS (
       SELECT 1 FROM attempts a WHERE a.session_id = ?1 AND a.item_id = i.item_id
     )
     AND (?2 IS NULL OR i.category_id = ?2)"
  ))?;
  let rows = stmt
    .query_map(params![session_id, category_id], RawItem::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

// ─── Attempt recording ───────────────────────────────────────────────────────

/// The whole attempt protocol, run on the caller's transaction.
fn record_in_tx(
  tx: &Transaction<'_>,
  submission: &AttemptSubmission,
  policy: &RatingPolicy,
) -> Result<AttemptOutcome, TxError> {
  let now = Utc::now();
  let item_id = encode_uuid(submission.item_id);
  let subject_id = encode_uuid(submission.subject_id);

  let item = load_item(tx, &item_id)?
    .ok_or(ladder_core::Error::ItemNotFound(submission.item_id))?
    .into_item()?;
  let session = load_session(tx, &encode_uuid(submission.session_id))?
    .ok_or(ladder_core::Error::SessionNotFound(submission.session_id))?
    .into_session()?;
  check_session(&session, submission.subject_id)?;

  let overall = overall_rating(tx, &subject_id, policy)?.into_rating()?;
  let category =
    category_rating(tx, &subject_id, item.category.as_str(), policy)?.into_rating()?;

  let plan = plan_attempt(
    AttemptInput {
      subject_id:      submission.subject_id,
      session:         &session,
      item:            &item,
      overall:         &overall,
      category_rating: &category,
      answer:          &submission.answer,
      answered_at:     now,
    },
    policy,
  )?;

  insert_attempt(tx, &plan.attempt)?;

  let updated_at = encode_dt(now);
  store_rating(
    tx,
    &subject_id,
    None,
    plan.overall.subject_new_rating,
    overall.sample_count.saturating_add(1),
    &updated_at,
  )?;
  store_rating(
    tx,
    &subject_id,
    Some(item.category.as_str()),
    plan.category.subject_new_rating,
    category.sample_count.saturating_add(1),
    &updated_at,
  )?;
  tx.execute(
    "UPDATE items
     SET difficulty     = ?2,
         times_answered = times_answered + 1,
         times_correct  = times_correct + ?3,
         updated_at     = ?4
     WHERE item_id = ?1",
    params![item_id, plan.item_difficulty, u32::from(plan.attempt.is_correct), updated_at],
  )?;

  Ok(plan.into_outcome(item.explanation))
}

// ─── PracticeStore impl ──────────────────────────────────────────────────────

impl PracticeStore for SqliteStore {
  type Error = Error;

  // ── Items & sessions ──────────────────────────────────────────────────────

  async fn upsert_item(&self, item: NewItem) -> Result<Item> {
    let policy = self.config.rating;
    let difficulty = item
      .initial_difficulty
      .map_or_else(|| policy.initial_rating(), |d| policy.bounds.clamp(f64::from(d)));
    let item_id = encode_uuid(item.item_id);
    let now = encode_dt(Utc::now());

    let raw: RawItem = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO items (
             item_id, category_id, prompt, correct_answer, explanation,
             difficulty, times_answered, times_correct, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, 0, ?7)
           ON CONFLICT (item_id) DO UPDATE SET
             category_id    = excluded.category_id,
             prompt         = excluded.prompt,
             correct_answer = excluded.correct_answer,
             explanation    = excluded.explanation,
             updated_at     = excluded.updated_at",
          params![
            item_id,
            item.category.as_str(),
            item.prompt,
            item.correct_answer,
            item.explanation,
            difficulty,
            now,
          ],
        )?;
        Ok(
          conn.query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE item_id = ?1"),
            params![item_id],
            RawItem::from_row,
          )?,
        )
      })
      .await?;

    raw.into_item()
  }

  async fn get_item(&self, id: ItemId) -> Result<Option<Item>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_item(conn, &id_str)?))
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn start_session(&self, subject: SubjectId) -> Result<Session> {
    let now = Utc::now();
    let session = Session {
      session_id: SessionId::new(),
      subject_id: subject,
      status:     SessionStatus::Active,
      created_at: now,
      updated_at: now,
    };

    let id_str = encode_uuid(session.session_id);
    let subject_str = encode_uuid(subject);
    let status_str = encode_status(session.status);
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!("INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?4)"),
          params![id_str, subject_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    debug!(session = %session.session_id, subject = %subject, "started session");
    Ok(session)
  }

  async fn get_session(&self, id: SessionId) -> Result<Option<Session>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(load_session(conn, &id_str)?))
      .await?;
    raw.map(RawSession::into_session).transpose()
  }

  async fn set_session_status(&self, id: SessionId, status: SessionStatus) -> Result<Session> {
    let id_str = encode_uuid(id);

    let session = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let mut session = load_session(tx, &id_str)?
            .ok_or(ladder_core::Error::SessionNotFound(id))?
            .into_session()?;
          if !session.status.can_transition_to(status) {
            return Err(
              ladder_core::Error::InvalidTransition { from: session.status, to: status }.into(),
            );
          }

          session.status = status;
          session.updated_at = Utc::now();
          tx.execute(
            "UPDATE sessions SET status = ?2, updated_at = ?3 WHERE session_id = ?1",
            params![id_str, encode_status(status), encode_dt(session.updated_at)],
          )?;
          Ok(session)
        })
      })
      .await??;

    debug!(session = %id, %status, "session status changed");
    Ok(session)
  }

  // ── Ratings ───────────────────────────────────────────────────────────────

  async fn get_overall_rating(&self, subject: SubjectId) -> Result<Rating> {
    let policy = self.config.rating;
    let subject_str = encode_uuid(subject);
    let raw = self
      .conn
      .call(move |conn| Ok(overall_rating(conn, &subject_str, &policy)?))
      .await?;
    raw.into_rating()
  }

  async fn get_or_init_category(&self, subject: SubjectId, category: CategoryId) -> Result<Rating> {
    let policy = self.config.rating;
    let subject_str = encode_uuid(subject);
    let raw = self
      .conn
      .call(move |conn| Ok(category_rating(conn, &subject_str, category.as_str(), &policy)?))
      .await?;
    raw.into_rating()
  }

  async fn init_category_ratings(&self, subject: SubjectId) -> Result<Vec<Rating>> {
    let policy = self.config.rating;
    let subject_str = encode_uuid(subject);

    let raws = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let created = tx.execute(
            "INSERT INTO ratings_category
               (subject_id, category_id, value, k_factor, sample_count, updated_at)
             SELECT DISTINCT ?1, category_id, ?2, ?3, 0, ?4 FROM items WHERE true
             ON CONFLICT (subject_id, category_id) DO NOTHING",
            params![
              subject_str,
              policy.initial_rating(),
              subject_volatility(0),
              encode_dt(Utc::now()),
            ],
          )?;
          debug!(subject = %subject_str, created, "initialised category ratings");
          Ok(category_ratings(tx, &subject_str)?)
        })
      })
      .await??;

    raws.into_iter().map(RawRating::into_rating).collect()
  }

  async fn update_rating(&self, update: RatingUpdate) -> Result<Rating> {
    let policy = self.config.rating;
    let subject_str = encode_uuid(update.subject_id);
    let value = policy.bounds.clamp(f64::from(update.value));

    let raw = self
      .conn
      .call(move |conn| {
        in_transaction(conn, |tx| {
          let category = update.category.as_ref().map(CategoryId::as_str);
          let current = fetch_rating(tx, &subject_str, category, &policy)?;
          let samples = current.sample_count.saturating_add(update.sample_increment);
          store_rating(tx, &subject_str, category, value, samples, &encode_dt(Utc::now()))?;
          Ok(fetch_rating(tx, &subject_str, category, &policy)?)
        })
      })
      .await??;

    raw.into_rating()
  }

  async fn list_category_ratings(&self, subject: SubjectId) -> Result<Vec<CategoryRating>> {
    let subject_str = encode_uuid(subject);

    let rows: Vec<(RawRating, u32, u32)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.subject_id, r.category_id, r.value, r.k_factor, r.sample_count,
                  r.updated_at,
                  COUNT(a.attempt_id),
                  COALESCE(SUM(a.is_correct), 0)
           FROM ratings_category r
           LEFT JOIN attempts a
             ON a.subject_id = r.subject_id AND a.category_id = r.category_id
           WHERE r.subject_id = ?1
           GROUP BY r.subject_id, r.category_id
           ORDER BY r.category_id",
        )?;
        let rows = stmt
          .query_map(params![subject_str], |row| {
            Ok((raw_category_rating(row)?, row.get(6)?, row.get(7)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    rows
      .into_iter()
      .map(|(raw, attempts, correct)| {
        Ok(CategoryRating::new(raw.into_rating()?, attempts, correct))
      })
      .collect()
  }

  // ── Selection ─────────────────────────────────────────────────────────────

  async fn category_priorities(&self, subject: SubjectId) -> Result<Vec<CategoryPriority>> {
    let policy = self.config.rating;
    let subject_str = encode_uuid(subject);

    let (overall, rows): (RawRating, Vec<(String, Option<i32>, u32, u32)>) = self
      .conn
      .call(move |conn| {
        let overall = overall_rating(conn, &subject_str, &policy)?;
        let mut stmt = conn.prepare(
          "WITH categories AS (
             SELECT category_id FROM items
             UNION
             SELECT category_id FROM ratings_category WHERE subject_id = ?1
           )
           SELECT c.category_id,
                  r.value,
                  (SELECT COUNT(*) FROM attempts a
                   WHERE a.subject_id = ?1 AND a.category_id = c.category_id),
                  (SELECT COUNT(*) FROM items i WHERE i.category_id = c.category_id)
           FROM categories c
           LEFT JOIN ratings_category r
             ON r.subject_id = ?1 AND r.category_id = c.category_id",
        )?;
        let rows = stmt
          .query_map(params![subject_str], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok((overall, rows))
      })
      .await?;

    let standings = rows
      .into_iter()
      .map(|(category, rating, attempts, available_items)| {
        Ok(CategoryStanding {
          category: decode_category(&category)?,
          rating: rating.unwrap_or(overall.value),
          attempts,
          available_items,
        })
      })
      .collect::<Result<Vec<_>>>()?;

    Ok(category_priorities(standings, policy.bounds, &self.config.priority))
  }

  async fn select_next<'a>(
    &'a self,
    subject: SubjectId,
    session: SessionId,
    request: &'a SelectionRequest,
  ) -> Result<Option<ScoredCandidate>> {
    let current = self
      .get_session(session)
      .await?
      .ok_or(ladder_core::Error::SessionNotFound(session))?;
    check_session(&current, subject)?;

    let policy = self.config.rating;
    let subject_str = encode_uuid(subject);
    let session_str = encode_uuid(session);
    let category = request.category.clone();

    let (overall, categories, pool) = self
      .conn
      .call(move |conn| {
        let overall = overall_rating(conn, &subject_str, &policy)?;
        let categories = category_ratings(conn, &subject_str)?;
        let pool = unattempted_items(
          conn,
          &session_str,
          category.as_ref().map(CategoryId::as_str),
        )?;
        Ok((overall, categories, pool))
      })
      .await?;

    let overall = overall.into_rating()?;
    let categories = categories
      .into_iter()
      .map(RawRating::into_rating)
      .collect::<Result<Vec<_>>>()?;
    let pool = pool
      .into_iter()
      .map(RawItem::into_item)
      .collect::<Result<Vec<_>>>()?;

    let ratings = SubjectRatings::new(&overall, &categories);
    let weights = request.weights.as_ref().unwrap_or(&self.config.selection);
    let pool_size = pool.len();

    let picked = self
      .selector
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .select(&ratings, pool, weights);

    match &picked {
      Some(c) => debug!(
        %session,
        item = %c.item.item_id,
        score = c.score,
        pool_size,
        "selected next item"
      ),
      None => debug!(%session, "no suitable item"),
    }
    Ok(picked)
  }

  // ── Attempts ──────────────────────────────────────────────────────────────

  async fn record_attempt(&self, submission: AttemptSubmission) -> Result<AttemptOutcome> {
    answer::validate(&submission.answer)?;

    let policy = self.config.rating;
    let session_id = submission.session_id;
    let item_id = submission.item_id;

    let result = self
      .conn
      .call(move |conn| in_transaction(conn, |tx| record_in_tx(tx, &submission, &policy)))
      .await?;

    match &result {
      Ok(outcome) => info!(
        session = %session_id,
        item = %item_id,
        correct = outcome.is_correct,
        overall_delta = outcome.deltas.overall,
        category_delta = outcome.deltas.category,
        item_delta = outcome.deltas.item,
        "recorded attempt"
      ),
      Err(e) if e.is_conflict() => {
        warn!(session = %session_id, item = %item_id, "duplicate attempt rejected")
      }
      Err(_) => {}
    }
    result
  }

  async fn list_attempts(&self, session: SessionId) -> Result<Vec<Attempt>> {
    let session_str = encode_uuid(session);

    let raws: Vec<RawAttempt> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ATTEMPT_COLUMNS} FROM attempts
           WHERE session_id = ?1
           ORDER BY answered_at, rowid"
        ))?;
        let rows = stmt
          .query_map(params![session_str], RawAttempt::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAttempt::into_attempt).collect()
  }
}
