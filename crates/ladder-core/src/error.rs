//! Error types for `ladder-core`.

use thiserror::Error;

use crate::{
  ids::{ItemId, SessionId, SubjectId},
  model::SessionStatus,
};

#[derive(Debug, Error)]
pub enum Error {
  // ── Validation ────────────────────────────────────────────────────────

  #[error("answer is empty")]
  EmptyAnswer,

  #[error("invalid category slug: {0:?}")]
  InvalidCategory(String),

  #[error("invalid session transition: {from} -> {to}")]
  InvalidTransition { from: SessionStatus, to: SessionStatus },

  // ── Not found ─────────────────────────────────────────────────────────

  #[error("item not found: {0}")]
  ItemNotFound(ItemId),

  #[error("session not found: {0}")]
  SessionNotFound(SessionId),

  // ── Precondition ──────────────────────────────────────────────────────

  #[error("session {session} is {status}, not active")]
  SessionNotActive { session: SessionId, status: SessionStatus },

  #[error("session {session} does not belong to subject {subject}")]
  SessionNotOwned { session: SessionId, subject: SubjectId },

  // ── Conflict ──────────────────────────────────────────────────────────

  #[error("item {item} was already answered in session {session}")]
  DuplicateAttempt { session: SessionId, item: ItemId },
}

/// Coarse classification of an error, for callers that map errors onto
/// transport-level responses or retry policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  /// Malformed input, rejected before any computation.
  Validation,
  NotFound,
  /// The request is well-formed but the session does not admit it.
  Precondition,
  /// The `(session, item)` pair has already been scored.
  Conflict,
  /// Storage failure; the enclosing transaction was rolled back.
  Persistence,
}

/// Errors that can be sorted into an [`ErrorKind`].
pub trait Classify {
  fn kind(&self) -> ErrorKind;

  /// Whether the error means "already answered" rather than a failure.
  fn is_conflict(&self) -> bool { self.kind() == ErrorKind::Conflict }
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::EmptyAnswer | Self::InvalidCategory(_) | Self::InvalidTransition { .. } => {
        ErrorKind::Validation
      }
      Self::ItemNotFound(_) | Self::SessionNotFound(_) => ErrorKind::NotFound,
      Self::SessionNotActive { .. } | Self::SessionNotOwned { .. } => ErrorKind::Precondition,
      Self::DuplicateAttempt { .. } => ErrorKind::Conflict,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
