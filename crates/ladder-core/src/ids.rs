//! Strongly typed identifiers.
//!
//! Subjects, sessions, items and attempts are keyed by UUIDs wrapped in
//! distinct newtypes so that a session id can never be passed where an item
//! id is expected. Categories are keyed by a validated slug.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

macro_rules! uuid_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub Uuid);

    impl $name {
      /// Generate a fresh random identifier.
      pub fn new() -> Self { Self(Uuid::new_v4()) }
    }

    impl Default for $name {
      fn default() -> Self { Self::new() }
    }

    impl From<Uuid> for $name {
      fn from(id: Uuid) -> Self { Self(id) }
    }

    impl From<$name> for Uuid {
      fn from(id: $name) -> Self { id.0 }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl FromStr for $name {
      type Err = uuid::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
      }
    }
  };
}

uuid_id! {
  /// The authenticated learner. Supplied by the surrounding auth layer.
  SubjectId
}

uuid_id! {
  /// A practice session; the key of the one-attempt-per-item invariant.
  SessionId
}

uuid_id! {
  /// A practice item (question).
  ItemId
}

uuid_id! {
  /// A row in the attempt ledger.
  AttemptId
}

// ─── CategoryId ──────────────────────────────────────────────────────────────

const MAX_CATEGORY_LEN: usize = 64;

/// A skill category, identified by a lowercase slug such as `"algebra"` or
/// `"reading-comprehension"`.
///
/// Construction validates the slug: it must start with an ASCII lowercase
/// letter or digit, contain only `[a-z0-9_-]`, and be at most 64 bytes long.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryId(String);

impl CategoryId {
  pub fn new(slug: impl Into<String>) -> Result<Self> {
    let slug = slug.into();
    let valid_first = slug
      .bytes()
      .next()
      .is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    let valid_rest = slug
      .bytes()
      .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');

    if !valid_first || !valid_rest || slug.len() > MAX_CATEGORY_LEN {
      return Err(Error::InvalidCategory(slug));
    }
    Ok(Self(slug))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for CategoryId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl FromStr for CategoryId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl TryFrom<String> for CategoryId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self> { Self::new(s) }
}

impl From<CategoryId> for String {
  fn from(id: CategoryId) -> Self { id.0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn category_slugs_are_validated() {
    assert!(CategoryId::new("algebra").is_ok());
    assert!(CategoryId::new("reading-comprehension").is_ok());
    assert!(CategoryId::new("unit_3").is_ok());
    assert!(CategoryId::new("7th-grade").is_ok());

    assert!(CategoryId::new("").is_err());
    assert!(CategoryId::new("Algebra").is_err());
    assert!(CategoryId::new("-leading-dash").is_err());
    assert!(CategoryId::new("has space").is_err());
    assert!(CategoryId::new("x".repeat(65)).is_err());
  }

  #[test]
  fn category_deserialization_rejects_bad_slugs() {
    let ok: CategoryId = serde_json::from_str("\"geometry\"").unwrap();
    assert_eq!(ok.as_str(), "geometry");
    assert!(serde_json::from_str::<CategoryId>("\"Geometry!\"").is_err());
  }

  #[test]
  fn uuid_ids_roundtrip_through_strings() {
    let id = ItemId::new();
    let parsed: ItemId = id.to_string().parse().unwrap();
    assert_eq!(id, parsed);
  }
}
