//! Category priorities: which category a learner should practise next when
//! the caller has no preference.
//!
//! Weak categories rank first: the priority grows with the distance between
//! the learner's rating and the rating ceiling. Categories with few attempts
//! get a fixed boost so that every category is sampled early on, and
//! categories without any items are zeroed out.

use serde::{Deserialize, Serialize};

use crate::{ids::CategoryId, rating::RatingBounds};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriorityConfig {
  /// Below this many attempts a category counts as under-experienced.
  pub min_attempts:            u32,
  pub under_experienced_boost: f64,
}

impl Default for PriorityConfig {
  fn default() -> Self { Self { min_attempts: 5, under_experienced_boost: 0.25 } }
}

/// What is known about one category for one learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryStanding {
  pub category:        CategoryId,
  pub rating:          i32,
  pub attempts:        u32,
  pub available_items: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryPriority {
  pub category:        CategoryId,
  pub rating:          i32,
  pub attempts:        u32,
  pub available_items: u32,
  /// `(ceiling - rating) / (ceiling - floor)`, in `[0, 1]`.
  pub gap:             f64,
  pub boost:           f64,
  pub priority:        f64,
}

/// Rank categories, highest priority first. Ties break on category id.
pub fn category_priorities(
  standings: Vec<CategoryStanding>,
  bounds: RatingBounds,
  config: &PriorityConfig,
) -> Vec<CategoryPriority> {
  let span = bounds.span();

  let mut ranked: Vec<CategoryPriority> = standings
    .into_iter()
    .map(|s| {
      let gap = if span > 0.0 {
        (f64::from(bounds.ceiling - s.rating) / span).max(0.0).min(1.0)
      } else {
        0.0
      };
      let boost = if s.attempts < config.min_attempts {
        config.under_experienced_boost
      } else {
        0.0
      };
      let availability = if s.available_items == 0 { 0.0 } else { 1.0 };

      CategoryPriority {
        priority: (gap + boost) * availability,
        category: s.category,
        rating: s.rating,
        attempts: s.attempts,
        available_items: s.available_items,
        gap,
        boost,
      }
    })
    .collect();

  ranked.sort_by(|a, b| {
    b.priority
      .total_cmp(&a.priority)
      .then_with(|| a.category.cmp(&b.category))
  });
  ranked
}

#[cfg(test)]
mod tests {
  use super::*;

  fn standing(slug: &str, rating: i32, attempts: u32, items: u32) -> CategoryStanding {
    CategoryStanding {
      category: CategoryId::new(slug).unwrap(),
      rating,
      attempts,
      available_items: items,
    }
  }

  fn order(ranked: &[CategoryPriority]) -> Vec<&str> {
    ranked.iter().map(|p| p.category.as_str()).collect()
  }

  #[test]
  fn weaker_categories_rank_higher() {
    let ranked = category_priorities(
      vec![
        standing("algebra", 700, 10, 5),
        standing("geometry", 300, 10, 5),
        standing("statistics", 500, 10, 5),
      ],
      RatingBounds::DEFAULT,
      &PriorityConfig::default(),
    );
    assert_eq!(order(&ranked), ["geometry", "statistics", "algebra"]);
    assert!((ranked[0].gap - 500.0 / 600.0).abs() < 1e-12);
  }

  #[test]
  fn empty_categories_sink_to_the_bottom() {
    let ranked = category_priorities(
      vec![
        standing("algebra", 790, 50, 3),
        standing("geometry", 200, 0, 0),
      ],
      RatingBounds::DEFAULT,
      &PriorityConfig::default(),
    );
    assert_eq!(order(&ranked), ["algebra", "geometry"]);
    assert_eq!(ranked[1].priority, 0.0);
  }

  #[test]
  fn under_experienced_categories_are_boosted() {
    let ranked = category_priorities(
      vec![
        standing("algebra", 500, 20, 5),
        standing("geometry", 540, 2, 5),
      ],
      RatingBounds::DEFAULT,
      &PriorityConfig::default(),
    );
    assert_eq!(order(&ranked), ["geometry", "algebra"]);
    assert_eq!(ranked[0].boost, 0.25);
    assert_eq!(ranked[1].boost, 0.0);
  }

  #[test]
  fn ties_break_on_category() {
    let ranked = category_priorities(
      vec![standing("zoology", 500, 9, 1), standing("art", 500, 9, 1)],
      RatingBounds::DEFAULT,
      &PriorityConfig::default(),
    );
    assert_eq!(order(&ranked), ["art", "zoology"]);
  }

  #[test]
  fn no_categories_no_priorities() {
    let ranked =
      category_priorities(Vec::new(), RatingBounds::DEFAULT, &PriorityConfig::default());
    assert!(ranked.is_empty());
  }
}
