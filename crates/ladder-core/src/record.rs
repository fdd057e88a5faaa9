//! Attempt scoring: everything the attempt recorder decides before it
//! touches storage.
//!
//! A storage backend loads the session, item and both learner ratings inside
//! its transaction, hands them to [`plan_attempt`], then persists the
//! resulting [`AttemptPlan`] in that same transaction. Two independent
//! matches are scored: overall rating vs item difficulty, and category
//! rating vs item difficulty. The item's new difficulty comes from the
//! overall match.

use chrono::{DateTime, Utc};

use crate::{
  Error, Result, answer,
  ids::{AttemptId, SubjectId},
  model::{Attempt, AttemptOutcome, Item, Rating, RatingDeltas, Session, SessionStatus},
  rating::{CombinedUpdate, RatingPolicy, combined_update},
};

/// Check that `session` accepts answers from `subject`.
pub fn check_session(session: &Session, subject: SubjectId) -> Result<()> {
  if session.subject_id != subject {
    return Err(Error::SessionNotOwned { session: session.session_id, subject });
  }
  if session.status != SessionStatus::Active {
    return Err(Error::SessionNotActive {
      session: session.session_id,
      status:  session.status,
    });
  }
  Ok(())
}

/// The state an attempt is scored against.
#[derive(Debug, Clone, Copy)]
pub struct AttemptInput<'a> {
  pub subject_id:      SubjectId,
  pub session:         &'a Session,
  pub item:            &'a Item,
  pub overall:         &'a Rating,
  pub category_rating: &'a Rating,
  pub answer:          &'a str,
  pub answered_at:     DateTime<Utc>,
}

/// The mutations one attempt produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptPlan {
  pub attempt:         Attempt,
  pub overall:         CombinedUpdate,
  pub category:        CombinedUpdate,
  pub item_difficulty: i32,
}

impl AttemptPlan {
  pub fn deltas(&self) -> RatingDeltas {
    RatingDeltas {
      overall:  self.overall.subject_delta,
      category: self.category.subject_delta,
      item:     self.overall.item_delta,
    }
  }

  pub fn into_outcome(self, explanation: Option<String>) -> AttemptOutcome {
    let deltas = self.deltas();
    AttemptOutcome {
      is_correct: self.attempt.is_correct,
      attempt: self.attempt,
      explanation,
      deltas,
    }
  }
}

/// Validate and score one attempt.
pub fn plan_attempt(input: AttemptInput<'_>, policy: &RatingPolicy) -> Result<AttemptPlan> {
  answer::validate(input.answer)?;
  check_session(input.session, input.subject_id)?;

  let item = input.item;
  let is_correct = answer::is_correct(input.answer, &item.correct_answer);

  let overall = combined_update(input.overall.stats(), item.stats(), is_correct, policy);
  let category =
    combined_update(input.category_rating.stats(), item.stats(), is_correct, policy);

  let attempt = Attempt {
    attempt_id: AttemptId::new(),
    session_id: input.session.session_id,
    item_id: item.item_id,
    subject_id: input.subject_id,
    category: item.category.clone(),
    answer: input.answer.trim().to_owned(),
    is_correct,
    rating_before: input.overall.value,
    rating_after: overall.subject_new_rating,
    category_rating_before: input.category_rating.value,
    category_rating_after: category.subject_new_rating,
    item_rating_before: item.difficulty,
    item_rating_after: overall.item_new_rating,
    expected_score: overall.expected_score,
    answered_at: input.answered_at,
  };

  Ok(AttemptPlan {
    item_difficulty: overall.item_new_rating,
    attempt,
    overall,
    category,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ids::{CategoryId, ItemId, SessionId};

  struct Fixture {
    subject:  SubjectId,
    session:  Session,
    item:     Item,
    overall:  Rating,
    category: Rating,
  }

  fn fixture() -> Fixture {
    let subject = SubjectId::new();
    let algebra = CategoryId::new("algebra").unwrap();
    let now = Utc::now();
    Fixture {
      subject,
      session: Session {
        session_id: SessionId::new(),
        subject_id: subject,
        status: SessionStatus::Active,
        created_at: now,
        updated_at: now,
      },
      item: Item {
        item_id: ItemId::new(),
        category: algebra.clone(),
        prompt: "x + 1 = 3".into(),
        difficulty: 500,
        times_answered: 0,
        times_correct: 0,
        correct_answer: "2".into(),
        explanation: Some("subtract 1".into()),
      },
      overall: Rating::initial(subject, None, 500),
      category: Rating::initial(subject, Some(algebra), 400),
    }
  }

  fn input<'a>(f: &'a Fixture, answer: &'a str) -> AttemptInput<'a> {
    AttemptInput {
      subject_id:      f.subject,
      session:         &f.session,
      item:            &f.item,
      overall:         &f.overall,
      category_rating: &f.category,
      answer,
      answered_at:     Utc::now(),
    }
  }

  #[test]
  fn correct_answer_scores_both_matches() {
    let f = fixture();
    let plan = plan_attempt(input(&f, " 2 "), &RatingPolicy::default()).unwrap();

    assert!(plan.attempt.is_correct);
    assert_eq!(plan.attempt.expected_score, 0.5);
    assert_eq!(plan.attempt.rating_before, 500);
    assert_eq!(plan.attempt.rating_after, 550);
    assert_eq!(plan.attempt.category_rating_before, 400);
    assert!(plan.attempt.category_rating_after > 400);
    assert_eq!(plan.attempt.item_rating_after, 470);
    assert_eq!(plan.item_difficulty, 470);
    assert_eq!(plan.attempt.answer, "2");

    let deltas = plan.deltas();
    assert_eq!(deltas.overall, 50);
    assert_eq!(deltas.item, -30);
    // The weaker category rating was expected to lose, so it gains more.
    assert!(deltas.category > deltas.overall);
  }

  #[test]
  fn wrong_answer_lets_the_item_win() {
    let f = fixture();
    let plan = plan_attempt(input(&f, "3"), &RatingPolicy::default()).unwrap();
    assert!(!plan.attempt.is_correct);
    assert!(plan.deltas().overall < 0);
    assert!(plan.deltas().item > 0);
  }

  #[test]
  fn blank_answer_is_a_validation_error() {
    let f = fixture();
    let err = plan_attempt(input(&f, "   "), &RatingPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyAnswer));
  }

  #[test]
  fn foreign_session_is_rejected() {
    let mut f = fixture();
    f.session.subject_id = SubjectId::new();
    let err = plan_attempt(input(&f, "2"), &RatingPolicy::default()).unwrap_err();
    assert!(matches!(err, Error::SessionNotOwned { .. }));
  }

  #[test]
  fn inactive_session_is_rejected() {
    let mut f = fixture();
    f.session.status = SessionStatus::Paused;
    let err = plan_attempt(input(&f, "2"), &RatingPolicy::default()).unwrap_err();
    assert!(matches!(
      err,
      Error::SessionNotActive { status: SessionStatus::Paused, .. }
    ));
  }

  #[test]
  fn outcome_carries_explanation() {
    let f = fixture();
    let plan = plan_attempt(input(&f, "2"), &RatingPolicy::default()).unwrap();
    let outcome = plan.into_outcome(f.item.explanation.clone());
    assert!(outcome.is_correct);
    assert_eq!(outcome.explanation.as_deref(), Some("subtract 1"));
    assert_eq!(outcome.deltas.overall, 50);
  }
}
