//! Answer checking.
//!
//! Submitted and canonical answers are compared by exact equality after the
//! same normalisation: surrounding whitespace trimmed, internal runs of
//! whitespace collapsed to one space, and Unicode lowercasing.

use crate::{Error, Result};

/// Normalise an answer for comparison.
pub fn normalize(answer: &str) -> String {
  answer
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase()
}

/// Normalise a submitted answer, rejecting one that is empty afterwards.
pub fn validate(answer: &str) -> Result<String> {
  let normalized = normalize(answer);
  if normalized.is_empty() {
    return Err(Error::EmptyAnswer);
  }
  Ok(normalized)
}

/// Whether `submitted` matches `canonical` under the normalisation policy.
pub fn is_correct(submitted: &str, canonical: &str) -> bool {
  normalize(submitted) == normalize(canonical)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn matches_ignore_case_and_spacing() {
    assert!(is_correct("Paris", "paris"));
    assert!(is_correct("  new   york ", "New York"));
    assert!(is_correct("ÉTÉ", "été"));
    assert!(is_correct("42", "42"));
  }

  #[test]
  fn near_misses_are_incorrect() {
    assert!(!is_correct("newyork", "New York"));
    assert!(!is_correct("42.0", "42"));
    assert!(!is_correct("Paris.", "Paris"));
  }

  #[test]
  fn blank_answers_are_rejected() {
    assert!(matches!(validate(""), Err(Error::EmptyAnswer)));
    assert!(matches!(validate(" \t\n"), Err(Error::EmptyAnswer)));
    assert_eq!(validate(" B ").unwrap(), "b");
  }
}
