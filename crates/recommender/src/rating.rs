//! Implicit rating transform
//!
//! Maps interaction kinds onto the numeric scale the factorization model is
//! fitted on. The scheme is binary: positive kinds (by default only
//! `purchase`) map to the top of the scale and every other kind, known or
//! not, maps to the bottom. Interaction intensity (repeat views, recency,
//! dwell time) is discarded.

use crate::interaction::{Interaction, InteractionKind};
use std::collections::BTreeSet;

/// Closed rating interval shared by the transform and the model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingScale {
    pub lower: f32,
    pub upper: f32,
}

impl RatingScale {
    pub const fn new(lower: f32, upper: f32) -> Self {
        Self { lower, upper }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.lower, self.upper)
    }

    pub fn midpoint(&self) -> f32 {
        (self.lower + self.upper) / 2.0
    }

    pub fn is_valid(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite() && self.lower < self.upper
    }
}

impl Default for RatingScale {
    fn default() -> Self {
        Self::new(1.0, 3.0)
    }
}

/// One training observation
#[derive(Debug, Clone, PartialEq)]
pub struct Rating {
    pub user_id: String,
    pub product_id: String,
    pub value: f32,
}

impl Rating {
    pub fn new(user_id: impl Into<String>, product_id: impl Into<String>, value: f32) -> Self {
        Self {
            user_id: user_id.into(),
            product_id: product_id.into(),
            value,
        }
    }
}

/// Ratings for one full training pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    ratings: Vec<Rating>,
}

impl TrainingSet {
    pub fn new(ratings: Vec<Rating>) -> Self {
        Self { ratings }
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }
}

impl FromIterator<Rating> for TrainingSet {
    fn from_iter<I: IntoIterator<Item = Rating>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Maps interaction kinds to ratings
#[derive(Debug, Clone)]
pub struct RatingTransform {
    scale: RatingScale,
    positive_kinds: BTreeSet<InteractionKind>,
}

impl Default for RatingTransform {
    fn default() -> Self {
        Self::new(RatingScale::default())
    }
}

impl RatingTransform {
    /// Transform with `purchase` as the only positive kind
    pub fn new(scale: RatingScale) -> Self {
        Self {
            scale,
            positive_kinds: BTreeSet::from([InteractionKind::Purchase]),
        }
    }

    pub fn with_positive_kinds<I>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = InteractionKind>,
    {
        self.positive_kinds = kinds.into_iter().collect();
        self
    }

    pub fn scale(&self) -> RatingScale {
        self.scale
    }

    pub fn to_rating(&self, kind: &InteractionKind) -> f32 {
        if self.positive_kinds.contains(kind) {
            self.scale.upper
        } else {
            self.scale.lower
        }
    }

    /// Build the training set for one pass
    ///
    /// Every interaction contributes its own rating, so repeated views or
    /// purchases of a product weigh more in the fit and the global mean. The
    /// result is ordered by `(user_id, product_id, value)` so that the same
    /// history always yields the same training set regardless of row order.
    pub fn build_training_set(&self, interactions: &[Interaction]) -> TrainingSet {
        let mut ratings: Vec<Rating> = interactions
            .iter()
            .map(|i| {
                Rating::new(
                    i.user_id.as_str(),
                    i.product_id.as_str(),
                    self.to_rating(&i.kind),
                )
            })
            .collect();

        ratings.sort_by(|a, b| {
            a.user_id
                .cmp(&b.user_id)
                .then_with(|| a.product_id.cmp(&b.product_id))
                .then_with(|| a.value.total_cmp(&b.value))
        });

        TrainingSet::new(ratings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purchase_maps_to_upper_bound() {
        let transform = RatingTransform::default();
        assert_eq!(transform.to_rating(&InteractionKind::Purchase), 3.0);
    }

    #[test]
    fn test_other_kinds_map_to_lower_bound() {
        let transform = RatingTransform::default();
        assert_eq!(transform.to_rating(&InteractionKind::View), 1.0);
        assert_eq!(transform.to_rating(&InteractionKind::parse("wishlist")), 1.0);
        assert_eq!(transform.to_rating(&InteractionKind::parse("")), 1.0);
    }

    #[test]
    fn test_custom_positive_kinds() {
        let transform = RatingTransform::new(RatingScale::new(0.0, 5.0)).with_positive_kinds([
            InteractionKind::Purchase,
            InteractionKind::parse("add_to_cart"),
        ]);

        assert_eq!(transform.to_rating(&InteractionKind::parse("add_to_cart")), 5.0);
        assert_eq!(transform.to_rating(&InteractionKind::Purchase), 5.0);
        assert_eq!(transform.to_rating(&InteractionKind::View), 0.0);
    }

    #[test]
    fn test_build_training_set_keeps_repeated_interactions() {
        let transform = RatingTransform::default();
        let interactions = vec![
            Interaction::new("u2", "p1", InteractionKind::View),
            Interaction::new("u1", "p1", InteractionKind::View),
            Interaction::new("u1", "p1", InteractionKind::Purchase),
            Interaction::new("u1", "p1", InteractionKind::View),
        ];

        let set = transform.build_training_set(&interactions);
        assert_eq!(
            set.ratings(),
            &[
                Rating::new("u1", "p1", 1.0),
                Rating::new("u1", "p1", 1.0),
                Rating::new("u1", "p1", 3.0),
                Rating::new("u2", "p1", 1.0),
            ]
        );
    }

    #[test]
    fn test_build_training_set_is_order_independent() {
        let transform = RatingTransform::default();
        let forward = vec![
            Interaction::new("u2", "p2", InteractionKind::View),
            Interaction::new("u1", "p3", InteractionKind::Purchase),
            Interaction::new("u1", "p1", InteractionKind::View),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        assert_eq!(
            transform.build_training_set(&forward),
            transform.build_training_set(&reversed)
        );
        assert_eq!(transform.build_training_set(&forward).ratings()[0].product_id, "p1");
    }

    #[test]
    fn test_scale_helpers() {
        let scale = RatingScale::default();
        assert_eq!(scale.midpoint(), 2.0);
        assert_eq!(scale.clamp(5.0), 3.0);
        assert_eq!(scale.clamp(-1.0), 1.0);
        assert!(scale.is_valid());
        assert!(!RatingScale::new(3.0, 1.0).is_valid());
    }
}
