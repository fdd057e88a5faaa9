//! Rating math: the paired-comparison update law shared by learners and items.
//!
//! A learner answering an item is treated as a match between two rated
//! players. The learner "wins" with a correct answer and the item wins
//! otherwise. Both sides are updated independently, each with its own
//! experience-dependent volatility (K-factor).
//!
//! Everything in this module is pure and total: out-of-range or non-finite
//! inputs are clamped rather than rejected.

use serde::{Deserialize, Serialize};

/// Lowest rating any learner or item can hold.
pub const RATING_FLOOR: i32 = 200;
/// Highest rating any learner or item can hold.
pub const RATING_CEILING: i32 = 800;
/// Rating assigned to rows created on first use and to new items.
pub const DEFAULT_RATING: i32 = 500;

/// Learner volatility with no experience.
pub const SUBJECT_VOLATILITY_CEILING: f64 = 100.0;
/// Learner volatility once the schedule has fully decayed.
pub const SUBJECT_VOLATILITY_FLOOR: f64 = 10.0;

/// Breakpoints of the learner schedule as `(sample_count, k)`. Between two
/// breakpoints the volatility is interpolated linearly; past the last one it
/// stays at the floor.
const SUBJECT_SCHEDULE: [(u32, f64); 5] = [
  (0, SUBJECT_VOLATILITY_CEILING),
  (30, SUBJECT_VOLATILITY_CEILING),
  (100, 60.0),
  (300, 30.0),
  (600, SUBJECT_VOLATILITY_FLOOR),
];

pub const ITEM_VOLATILITY_HIGH: f64 = 60.0;
pub const ITEM_VOLATILITY_MEDIUM: f64 = 40.0;
pub const ITEM_VOLATILITY_LOW: f64 = 20.0;

// ─── Bounds & policy ─────────────────────────────────────────────────────────

/// Inclusive clamp applied to every rating the engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingBounds {
  pub floor:   i32,
  pub ceiling: i32,
}

impl RatingBounds {
  pub const DEFAULT: Self = Self { floor: RATING_FLOOR, ceiling: RATING_CEILING };

  /// Round `value` to the nearest integer and clamp it into the bounds.
  /// NaN maps to the floor.
  pub fn clamp(&self, value: f64) -> i32 {
    let lo = f64::from(self.floor);
    let hi = f64::from(self.ceiling);
    if value.is_nan() {
      return self.floor;
    }
    value.round().max(lo).min(hi) as i32
  }

  pub fn span(&self) -> f64 { f64::from(self.ceiling - self.floor) }
}

impl Default for RatingBounds {
  fn default() -> Self { Self::DEFAULT }
}

/// Deployment-tunable parameters of the update law.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingPolicy {
  pub bounds:         RatingBounds,
  /// Value given to lazily created rating rows.
  pub default_rating: i32,
  /// Cap on the magnitude of a single update, if any.
  pub max_change:     Option<f64>,
}

impl Default for RatingPolicy {
  fn default() -> Self {
    Self {
      bounds:         RatingBounds::DEFAULT,
      default_rating: DEFAULT_RATING,
      max_change:     None,
    }
  }
}

impl RatingPolicy {
  /// The default rating, clamped into the configured bounds.
  pub fn initial_rating(&self) -> i32 { self.bounds.clamp(f64::from(self.default_rating)) }
}

// ─── Core formulas ───────────────────────────────────────────────────────────

/// Probability that a player rated `a` beats a player rated `b`.
pub fn expected_score(a: f64, b: f64) -> f64 {
  if a == b {
    return 0.5;
  }
  1.0 / (1.0 + 10f64.powf((b - a) / 400.0))
}

/// Apply one observation to `current` using the default 200–800 bounds.
///
/// `actual` is `1.0` for a win and `0.0` for a loss.
pub fn new_rating(
  current: i32,
  k: f64,
  actual: f64,
  expected: f64,
  max_change: Option<f64>,
) -> i32 {
  new_rating_within(RatingBounds::DEFAULT, current, k, actual, expected, max_change)
}

/// [`new_rating`] with explicit bounds.
pub fn new_rating_within(
  bounds: RatingBounds,
  current: i32,
  k: f64,
  actual: f64,
  expected: f64,
  max_change: Option<f64>,
) -> i32 {
  let mut delta = k * (actual - expected);
  if delta.is_nan() {
    delta = 0.0;
  }
  if let Some(cap) = max_change.filter(|c| !c.is_nan()) {
    let cap = cap.abs();
    delta = delta.max(-cap).min(cap);
  }
  bounds.clamp(f64::from(current) + delta.round())
}

/// Learner K-factor after `sample_count` rated attempts.
///
/// Linear interpolation between fixed breakpoints: 100 for the first 30
/// attempts, 60 at 100, 30 at 300, and the floor of 10 from 600 on.
pub fn subject_volatility(sample_count: u32) -> f64 {
  for pair in SUBJECT_SCHEDULE.windows(2) {
    let (x0, k0) = pair[0];
    let (x1, k1) = pair[1];
    if sample_count < x1 {
      let t = f64::from(sample_count - x0) / f64::from(x1 - x0);
      return k0 + (k1 - k0) * t;
    }
  }
  SUBJECT_VOLATILITY_FLOOR
}

/// Item K-factor after `times_rated` answers. Items settle faster than
/// learners, so the schedule is a coarse three-tier step.
pub fn item_volatility(times_rated: u32) -> f64 {
  match times_rated {
    0..20 => ITEM_VOLATILITY_HIGH,
    20..=50 => ITEM_VOLATILITY_MEDIUM,
    _ => ITEM_VOLATILITY_LOW,
  }
}

// ─── Combined update ─────────────────────────────────────────────────────────

/// Current value and experience of one side of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingStats {
  pub rating:  i32,
  pub samples: u32,
}

/// Result of scoring one learner-vs-item match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CombinedUpdate {
  pub subject_new_rating: i32,
  pub item_new_rating:    i32,
  /// The learner's predicted probability of answering correctly.
  pub expected_score:     f64,
  /// `1.0` when correct, `0.0` otherwise.
  pub actual_score:       f64,
  pub subject_delta:      i32,
  pub item_delta:         i32,
  /// Learner volatility after this sample is counted.
  pub subject_volatility: f64,
  /// Item volatility after this sample is counted.
  pub item_volatility:    f64,
}

/// Score one answer, updating the learner and the item independently.
///
/// The item's actual score is the complement of the learner's and its
/// expected score is `1 - expected_score(subject, item)`. Each side moves by
/// its own current volatility, so the two deltas need not cancel.
pub fn combined_update(
  subject: RatingStats,
  item: RatingStats,
  is_correct: bool,
  policy: &RatingPolicy,
) -> CombinedUpdate {
  let expected = expected_score(f64::from(subject.rating), f64::from(item.rating));
  let actual = if is_correct { 1.0 } else { 0.0 };

  let subject_new_rating = new_rating_within(
    policy.bounds,
    subject.rating,
    subject_volatility(subject.samples),
    actual,
    expected,
    policy.max_change,
  );
  let item_new_rating = new_rating_within(
    policy.bounds,
    item.rating,
    item_volatility(item.samples),
    1.0 - actual,
    1.0 - expected,
    policy.max_change,
  );

  CombinedUpdate {
    subject_new_rating,
    item_new_rating,
    expected_score: expected,
    actual_score: actual,
    subject_delta: subject_new_rating - subject.rating,
    item_delta: item_new_rating - item.rating,
    subject_volatility: subject_volatility(subject.samples.saturating_add(1)),
    item_volatility: item_volatility(item.samples.saturating_add(1)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const EPS: f64 = 1e-12;

  #[test]
  fn expected_score_is_symmetric() {
    for a in (0..=1000).step_by(37) {
      for b in (0..=1000).step_by(53) {
        let (a, b) = (f64::from(a), f64::from(b));
        let sum = expected_score(a, b) + expected_score(b, a);
        assert!((sum - 1.0).abs() < EPS, "a={a} b={b} sum={sum}");
      }
    }
  }

  #[test]
  fn expected_score_of_equal_ratings_is_half() {
    for r in [200.0, 437.0, 500.0, 800.0, -3.0] {
      assert_eq!(expected_score(r, r), 0.5);
    }
  }

  #[test]
  fn expected_score_is_monotonic() {
    let mut previous = 0.0;
    for a in (200..=800).step_by(25) {
      let e = expected_score(f64::from(a), 500.0);
      assert!(e > previous, "not increasing in a at {a}");
      previous = e;
    }

    let mut previous = 1.0;
    for b in (200..=800).step_by(25) {
      let e = expected_score(500.0, f64::from(b));
      assert!(e < previous, "not decreasing in b at {b}");
      previous = e;
    }
  }

  #[test]
  fn new_rating_stays_in_bounds() {
    assert_eq!(new_rating(200, 100.0, 0.0, 1.0, None), RATING_FLOOR);
    assert_eq!(new_rating(800, 100.0, 1.0, 0.0, None), RATING_CEILING);
    assert_eq!(new_rating(500, 1e9, 1.0, 0.0, None), RATING_CEILING);
    assert_eq!(new_rating(500, f64::INFINITY, 0.0, 1.0, None), RATING_FLOOR);
    assert_eq!(new_rating(500, f64::NAN, 1.0, 0.5, None), 500);
    assert_eq!(new_rating(-40, 10.0, 1.0, 0.5, None), RATING_FLOOR);
  }

  #[test]
  fn new_rating_caps_delta_magnitude() {
    assert_eq!(new_rating(500, 100.0, 1.0, 0.0, Some(25.0)), 525);
    assert_eq!(new_rating(500, 100.0, 0.0, 1.0, Some(25.0)), 475);
    // A cap larger than the delta has no effect.
    assert_eq!(new_rating(500, 100.0, 1.0, 0.5, Some(80.0)), 550);
  }

  #[test]
  fn correct_answer_at_even_odds_with_full_volatility() {
    let e = expected_score(500.0, 500.0);
    assert_eq!(e, 0.5);
    assert_eq!(new_rating(500, 100.0, 1.0, e, None), 550);
  }

  #[test]
  fn subject_volatility_never_increases() {
    let mut previous = f64::INFINITY;
    for n in 0..2000 {
      let k = subject_volatility(n);
      assert!(k <= previous, "volatility rose at {n}");
      previous = k;
    }
    assert_eq!(subject_volatility(0), SUBJECT_VOLATILITY_CEILING);
    assert_eq!(subject_volatility(1000), SUBJECT_VOLATILITY_FLOOR);
    assert_eq!(subject_volatility(u32::MAX), SUBJECT_VOLATILITY_FLOOR);
    assert!(subject_volatility(0) > subject_volatility(1000));
  }

  #[test]
  fn item_volatility_has_three_tiers() {
    assert_eq!(item_volatility(0), ITEM_VOLATILITY_HIGH);
    assert_eq!(item_volatility(19), ITEM_VOLATILITY_HIGH);
    assert_eq!(item_volatility(20), ITEM_VOLATILITY_MEDIUM);
    assert_eq!(item_volatility(50), ITEM_VOLATILITY_MEDIUM);
    assert_eq!(item_volatility(51), ITEM_VOLATILITY_LOW);
  }

  #[test]
  fn combined_update_moves_sides_in_opposite_directions() {
    let learner = RatingStats { rating: 500, samples: 0 };
    let item = RatingStats { rating: 500, samples: 0 };
    let policy = RatingPolicy::default();

    let won = combined_update(learner, item, true, &policy);
    assert_eq!(won.expected_score, 0.5);
    assert_eq!(won.actual_score, 1.0);
    assert_eq!(won.subject_new_rating, 550);
    assert_eq!(won.subject_delta, 50);
    assert_eq!(won.item_new_rating, 470);
    assert_eq!(won.item_delta, -30);

    let lost = combined_update(learner, item, false, &policy);
    assert_eq!(lost.subject_new_rating, 450);
    assert_eq!(lost.item_new_rating, 530);
  }

  #[test]
  fn combined_update_reports_post_sample_volatility() {
    let learner = RatingStats { rating: 500, samples: 599 };
    let item = RatingStats { rating: 500, samples: 19 };
    let update = combined_update(learner, item, true, &RatingPolicy::default());
    assert_eq!(update.subject_volatility, subject_volatility(600));
    assert_eq!(update.item_volatility, ITEM_VOLATILITY_MEDIUM);
  }

  #[test]
  fn combined_update_respects_policy_bounds() {
    let policy = RatingPolicy {
      bounds: RatingBounds { floor: 400, ceiling: 600 },
      ..RatingPolicy::default()
    };
    let learner = RatingStats { rating: 590, samples: 0 };
    let item = RatingStats { rating: 410, samples: 0 };
    let update = combined_update(learner, item, true, &policy);
    assert_eq!(update.subject_new_rating, 600);
    assert!(update.item_new_rating >= 400);
  }
}
