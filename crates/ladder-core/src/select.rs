//! Candidate selection: pick the next item whose difficulty best fits the
//! learner.
//!
//! Each candidate gets three scores:
//!
//! | score | meaning |
//! |-------|---------|
//! | appropriateness | `1.0` within `tolerance` of the learner's rating, then a linear falloff to a floor |
//! | relevance | appropriateness scaled by the caller's weight for the item's category |
//! | jitter | uniform noise in `[0, 1)` from an injected RNG |
//!
//! The composite is a weighted sum of the three. With a jitter weight of zero
//! the ranking is fully deterministic (ties break on item id).

use std::collections::{BTreeMap, HashMap};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use crate::{
  ids::CategoryId,
  model::{Item, Rating},
  rating::expected_score,
};

// ─── Weights ─────────────────────────────────────────────────────────────────

/// Tunable weights of the composite score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionWeights {
  pub appropriateness:     f64,
  pub relevance:           f64,
  pub jitter:              f64,
  /// Rating gap within which an item counts as a perfect fit.
  pub tolerance:           f64,
  /// Gap at which appropriateness would reach zero before the floor applies.
  pub falloff:             f64,
  pub min_appropriateness: f64,
  /// Per-category multipliers for relevance; absent categories weigh `1.0`.
  pub category_weights:    BTreeMap<CategoryId, f64>,
}

impl Default for SelectionWeights {
  fn default() -> Self {
    Self {
      appropriateness:     0.6,
      relevance:           0.3,
      jitter:              0.1,
      tolerance:           200.0,
      falloff:             400.0,
      min_appropriateness: 0.1,
      category_weights:    BTreeMap::new(),
    }
  }
}

impl SelectionWeights {
  pub fn category_weight(&self, category: &CategoryId) -> f64 {
    self.category_weights.get(category).copied().unwrap_or(1.0)
  }

  /// Bias relevance toward `category`.
  #[must_use]
  pub fn favor(mut self, category: CategoryId, weight: f64) -> Self {
    self.category_weights.insert(category, weight);
    self
  }

  /// Disable jitter so rankings are reproducible.
  #[must_use]
  pub fn without_jitter(mut self) -> Self {
    self.jitter = 0.0;
    self
  }

  /// How well an item `diff` rating points away from the learner fits.
  /// Never negative.
  pub fn appropriateness(&self, diff: f64) -> f64 {
    let gap = diff.abs();
    if gap <= self.tolerance {
      return 1.0;
    }
    (1.0 - gap / self.falloff).max(self.min_appropriateness).max(0.0)
  }
}

// ─── Learner ratings ─────────────────────────────────────────────────────────

/// A learner's ratings as seen by the selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectRatings {
  pub overall:     i32,
  pub by_category: HashMap<CategoryId, i32>,
}

impl SubjectRatings {
  pub fn new(overall: &Rating, categories: &[Rating]) -> Self {
    let by_category = categories
      .iter()
      .filter_map(|r| r.category.clone().map(|c| (c, r.value)))
      .collect();
    Self { overall: overall.value, by_category }
  }

  /// The rating to match against an item in `category`, falling back to the
  /// overall rating when the learner has no micro-rating there yet.
  pub fn for_category(&self, category: &CategoryId) -> i32 {
    self.by_category.get(category).copied().unwrap_or(self.overall)
  }
}

// ─── Scored candidates ───────────────────────────────────────────────────────

/// A candidate item with its breakdown of scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
  pub item:            Item,
  /// The learner rating the item was matched against.
  pub subject_rating:  i32,
  pub expected_score:  f64,
  pub appropriateness: f64,
  pub relevance:       f64,
  pub jitter:          f64,
  pub score:           f64,
}

// ─── Selector ────────────────────────────────────────────────────────────────

/// Ranks candidate items. Holds the source of jitter.
#[derive(Debug, Clone)]
pub struct CandidateSelector<R = StdRng> {
  rng: R,
}

impl CandidateSelector<StdRng> {
  pub fn from_entropy() -> Self { Self::new(StdRng::from_entropy()) }

  /// A selector with reproducible jitter.
  pub fn seeded(seed: u64) -> Self { Self::new(StdRng::seed_from_u64(seed)) }
}

impl<R: Rng> CandidateSelector<R> {
  pub fn new(rng: R) -> Self { Self { rng } }

  /// Score every item in `pool`, best first.
  pub fn rank(
    &mut self,
    ratings: &SubjectRatings,
    pool: Vec<Item>,
    weights: &SelectionWeights,
  ) -> Vec<ScoredCandidate> {
    let mut ranked: Vec<ScoredCandidate> = pool
      .into_iter()
      .map(|item| self.score(ratings, item, weights))
      .collect();

    ranked.sort_by(|a, b| {
      b.score
        .total_cmp(&a.score)
        .then_with(|| a.item.item_id.cmp(&b.item.item_id))
    });
    ranked
  }

  /// The best item in `pool`, or `None` when the pool is empty.
  pub fn select(
    &mut self,
    ratings: &SubjectRatings,
    pool: Vec<Item>,
    weights: &SelectionWeights,
  ) -> Option<ScoredCandidate> {
    self.rank(ratings, pool, weights).into_iter().next()
  }

  fn score(
    &mut self,
    ratings: &SubjectRatings,
    item: Item,
    weights: &SelectionWeights,
  ) -> ScoredCandidate {
    let subject_rating = ratings.for_category(&item.category);
    let learner = f64::from(subject_rating);
    let difficulty = f64::from(item.difficulty);

    let appropriateness = weights.appropriateness(learner - difficulty);
    let relevance = weights.category_weight(&item.category) * appropriateness;
    let jitter = if weights.jitter > 0.0 {
      self.rng.gen_range(0.0..1.0)
    } else {
      0.0
    };
    let score = weights.appropriateness * appropriateness
      + weights.relevance * relevance
      + weights.jitter * jitter;

    ScoredCandidate {
      subject_rating,
      expected_score: expected_score(learner, difficulty),
      appropriateness,
      relevance,
      jitter,
      score,
      item,
    }
  }
}
