//! The `PracticeStore` trait and supporting request types.
//!
//! The trait is implemented by storage backends (e.g. `ladder-store-sqlite`).
//! Higher layers (`ladder-cli`, an HTTP layer) depend on this abstraction,
//! not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  error::Classify,
  ids::{CategoryId, ItemId, SessionId, SubjectId},
  model::{Attempt, AttemptOutcome, CategoryRating, Item, NewItem, Rating, Session, SessionStatus},
  priority::CategoryPriority,
  select::{ScoredCandidate, SelectionWeights},
};

// ─── Request types ───────────────────────────────────────────────────────────

/// Parameters for [`PracticeStore::select_next`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectionRequest {
  /// Only consider items from this category.
  pub category: Option<CategoryId>,
  /// Override the configured weights for this call.
  pub weights:  Option<SelectionWeights>,
}

/// Input to [`PracticeStore::record_attempt`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptSubmission {
  pub session_id: SessionId,
  pub item_id:    ItemId,
  pub subject_id: SubjectId,
  pub answer:     String,
}

/// Input to [`PracticeStore::update_rating`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
  pub subject_id:       SubjectId,
  /// `None` updates the overall rating.
  pub category:         Option<CategoryId>,
  pub value:            i32,
  pub sample_increment: u32,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a practice-engine storage backend.
///
/// Rating rows are created lazily on first read. Attempts are append-only;
/// at most one exists per `(session, item)` pair, and recording one applies
/// every rating mutation atomically with the ledger insert.
pub trait PracticeStore: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;

  // ── Items & sessions (collaborator boundary) ──────────────────────────

  /// Insert an item, or refresh the content fields of an existing one.
  /// Difficulty and answer counters of an existing item are left alone.
  fn upsert_item(
    &self,
    item: NewItem,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    id: ItemId,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  /// Open a new, active session owned by `subject`.
  fn start_session(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    id: SessionId,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Move a session along its lifecycle. Invalid transitions are rejected.
  fn set_session_status(
    &self,
    id: SessionId,
    status: SessionStatus,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  // ── Ratings ───────────────────────────────────────────────────────────

  /// The subject's overall rating, created with the default value if absent.
  fn get_overall_rating(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// The subject's rating in `category`, created if absent.
  fn get_or_init_category(
    &self,
    subject: SubjectId,
    category: CategoryId,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// Ensure a micro-rating exists for every category that has items.
  fn init_category_ratings(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Vec<Rating>, Self::Error>> + Send + '_;

  /// Overwrite a rating value and bump its sample count; the volatility is
  /// recomputed from the new count.
  fn update_rating(
    &self,
    update: RatingUpdate,
  ) -> impl Future<Output = Result<Rating, Self::Error>> + Send + '_;

  /// Micro-ratings with attempt aggregates derived from the ledger.
  fn list_category_ratings(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Vec<CategoryRating>, Self::Error>> + Send + '_;

  // ── Selection ─────────────────────────────────────────────────────────

  /// Categories ranked by how much the subject should practise them next.
  fn category_priorities(
    &self,
    subject: SubjectId,
  ) -> impl Future<Output = Result<Vec<CategoryPriority>, Self::Error>> + Send + '_;

  /// The best not-yet-attempted item for this session.
  ///
  /// `Ok(None)` means no suitable item exists; an `Err` means selection
  /// itself failed and the caller may retry with a relaxed request.
  fn select_next<'a>(
    &'a self,
    subject: SubjectId,
    session: SessionId,
    request: &'a SelectionRequest,
  ) -> impl Future<Output = Result<Option<ScoredCandidate>, Self::Error>> + Send + 'a;

  // ── Attempts ──────────────────────────────────────────────────────────

  /// Score and persist one answer in a single transaction.
  ///
  /// A second submission for the same `(session, item)` pair fails with a
  /// conflict and leaves every rating untouched.
  ///
  /// The session is checked before the ledger is consulted: a resubmission
  /// to a session that is no longer active (or not owned by the subject)
  /// fails with a precondition error, not a conflict, even if the item was
  /// already answered there.
  fn record_attempt(
    &self,
    submission: AttemptSubmission,
  ) -> impl Future<Output = Result<AttemptOutcome, Self::Error>> + Send + '_;

  /// The session's attempts in the order they were answered.
  fn list_attempts(
    &self,
    session: SessionId,
  ) -> impl Future<Output = Result<Vec<Attempt>, Self::Error>> + Send + '_;
}
