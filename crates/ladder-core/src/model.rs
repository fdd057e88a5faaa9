//! Data model: ratings, items, sessions and the attempt ledger.
//!
//! Ratings are mutable rows owned by the attempt recorder. Attempts are
//! immutable facts: once written, no field is ever updated. Aggregates such
//! as per-category success rates are always derived from the ledger on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  ids::{AttemptId, CategoryId, ItemId, SessionId, SubjectId},
  rating::{self, RatingStats},
};

// ─── Ratings ─────────────────────────────────────────────────────────────────

/// A learner's rating, either overall (`category == None`) or for a single
/// category (a "micro-rating").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rating {
  pub subject_id:   SubjectId,
  pub category:     Option<CategoryId>,
  pub value:        i32,
  /// The K-factor; always `subject_volatility(sample_count)`.
  pub volatility:   f64,
  pub sample_count: u32,
  pub updated_at:   DateTime<Utc>,
}

impl Rating {
  /// A freshly initialised rating with no samples.
  pub fn initial(
    subject_id: SubjectId,
    category: Option<CategoryId>,
    value: i32,
  ) -> Self {
    Self {
      subject_id,
      category,
      value,
      volatility: rating::subject_volatility(0),
      sample_count: 0,
      updated_at: Utc::now(),
    }
  }

  pub fn stats(&self) -> RatingStats {
    RatingStats { rating: self.value, samples: self.sample_count }
  }
}

/// A micro-rating joined with aggregates computed from the attempt ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRating {
  #[serde(flatten)]
  pub rating:       Rating,
  pub attempts:     u32,
  pub correct:      u32,
  /// `correct / attempts`, or `0.0` with no attempts.
  pub success_rate: f64,
}

impl CategoryRating {
  pub fn new(rating: Rating, attempts: u32, correct: u32) -> Self {
    let success_rate = if attempts == 0 {
      0.0
    } else {
      f64::from(correct) / f64::from(attempts)
    };
    Self { rating, attempts, correct, success_rate }
  }
}

// ─── Items ───────────────────────────────────────────────────────────────────

/// A practice item. Its difficulty is a rating in its own right and moves
/// under the same law as a learner's, winning when answered incorrectly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
  pub item_id:        ItemId,
  pub category:       CategoryId,
  pub prompt:         String,
  pub difficulty:     i32,
  pub times_answered: u32,
  pub times_correct:  u32,
  /// Never serialised; answers are checked server-side only.
  #[serde(skip_serializing, default)]
  pub correct_answer: String,
  pub explanation:    Option<String>,
}

impl Item {
  pub fn stats(&self) -> RatingStats {
    RatingStats { rating: self.difficulty, samples: self.times_answered }
  }
}

/// Input to [`crate::store::PracticeStore::upsert_item`].
///
/// Difficulty and answer counters are owned by the engine: they are only
/// taken from `initial_difficulty` when the item is first inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
  #[serde(default)]
  pub item_id:            ItemId,
  pub category:           CategoryId,
  pub prompt:             String,
  pub correct_answer:     String,
  #[serde(default)]
  pub explanation:        Option<String>,
  #[serde(default)]
  pub initial_difficulty: Option<i32>,
}

impl NewItem {
  pub fn new(
    category: CategoryId,
    prompt: impl Into<String>,
    correct_answer: impl Into<String>,
  ) -> Self {
    Self {
      item_id: ItemId::new(),
      category,
      prompt: prompt.into(),
      correct_answer: correct_answer.into(),
      explanation: None,
      initial_difficulty: None,
    }
  }
}

// ─── Sessions ────────────────────────────────────────────────────────────────

/// Lifecycle of a practice session.
///
/// `Active` and `Paused` may alternate; either may end as `Completed` or
/// `Abandoned`, after which no transition is allowed.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
  Active,
  Paused,
  Completed,
  Abandoned,
}

impl SessionStatus {
  pub fn is_terminal(self) -> bool { matches!(self, Self::Completed | Self::Abandoned) }

  pub fn can_transition_to(self, next: Self) -> bool {
    if self.is_terminal() {
      return false;
    }
    match (self, next) {
      (Self::Active, Self::Paused) | (Self::Paused, Self::Active) => true,
      (Self::Active | Self::Paused, Self::Completed | Self::Abandoned) => true,
      _ => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub session_id: SessionId,
  pub subject_id: SubjectId,
  pub status:     SessionStatus,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

// ─── Attempts ────────────────────────────────────────────────────────────────

/// One immutable record of a subject answering one item within one session.
/// At most one exists per `(session_id, item_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
  pub attempt_id:             AttemptId,
  pub session_id:             SessionId,
  pub item_id:                ItemId,
  pub subject_id:             SubjectId,
  pub category:               CategoryId,
  pub answer:                 String,
  pub is_correct:             bool,
  pub rating_before:          i32,
  pub rating_after:           i32,
  pub category_rating_before: i32,
  pub category_rating_after:  i32,
  pub item_rating_before:     i32,
  pub item_rating_after:      i32,
  /// Probability of a correct answer predicted from the overall rating.
  pub expected_score:         f64,
  pub answered_at:            DateTime<Utc>,
}

/// Signed rating movements produced by one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingDeltas {
  pub overall:  i32,
  pub category: i32,
  pub item:     i32,
}

/// What the caller gets back from a successfully recorded attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
  pub attempt:     Attempt,
  pub is_correct:  bool,
  pub explanation: Option<String>,
  pub deltas:      RatingDeltas,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn session_transitions() {
    use SessionStatus::*;

    assert!(Active.can_transition_to(Paused));
    assert!(Paused.can_transition_to(Active));
    assert!(Active.can_transition_to(Completed));
    assert!(Paused.can_transition_to(Abandoned));

    assert!(!Active.can_transition_to(Active));
    assert!(!Completed.can_transition_to(Active));
    assert!(!Abandoned.can_transition_to(Paused));
    assert!(Completed.is_terminal());
  }

  #[test]
  fn session_status_string_form() {
    assert_eq!(SessionStatus::Abandoned.to_string(), "abandoned");
    assert_eq!("paused".parse::<SessionStatus>().unwrap(), SessionStatus::Paused);
    assert!("finished".parse::<SessionStatus>().is_err());
  }

  #[test]
  fn success_rate_is_derived() {
    let rating = Rating::initial(SubjectId::new(), None, 500);
    assert_eq!(CategoryRating::new(rating.clone(), 0, 0).success_rate, 0.0);
    assert_eq!(CategoryRating::new(rating, 4, 3).success_rate, 0.75);
  }

  #[test]
  fn item_serialisation_hides_answer() {
    let item = Item {
      item_id:        ItemId::new(),
      category:       CategoryId::new("algebra").unwrap(),
      prompt:         "2 + 2".into(),
      difficulty:     500,
      times_answered: 0,
      times_correct:  0,
      correct_answer: "4".into(),
      explanation:    None,
    };
    let json = serde_json::to_value(&item).unwrap();
    assert!(json.get("correct_answer").is_none());
  }
}
