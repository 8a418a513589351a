//! State machine governing how clicks accumulate into reference points.
//!
//! The point set holds zero, one, or two points by construction. A third
//! click discards both prior points and starts a new measurement; this is
//! intentional UX policy, not an error.

use serde::{Deserialize, Serialize};

/// A user-marked point in image-native pixel coordinates.
///
/// Ordering (1st, 2nd) matters for display labeling only; distance is
/// symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: f64,
}

impl ReferencePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point, in native pixels.
    pub fn distance_to(&self, other: &ReferencePoint) -> f64 {
        ((other.x - self.x).powi(2) + (other.y - self.y).powi(2)).sqrt()
    }
}

/// Selection state for one calibration attempt.
///
/// Re-entrant: there is no terminal state, the machine accepts clicks for as
/// many attempts as the user makes in a session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Empty,
    OnePoint(ReferencePoint),
    TwoPoints(ReferencePoint, ReferencePoint),
}

impl SelectionState {
    /// Seed the machine from previously saved points, e.g. when a prior
    /// calibration record is loaded. Extra points beyond two are ignored.
    pub fn from_points(points: &[ReferencePoint]) -> Self {
        match points {
            [] => SelectionState::Empty,
            [p] => SelectionState::OnePoint(*p),
            [p1, p2, ..] => SelectionState::TwoPoints(*p1, *p2),
        }
    }

    /// Apply a click that produced the image-space point `p`.
    ///
    /// From `TwoPoints`, the click discards both prior points and starts a
    /// new measurement with `p` as its first point.
    pub fn click(self, p: ReferencePoint) -> Self {
        match self {
            SelectionState::Empty => SelectionState::OnePoint(p),
            SelectionState::OnePoint(p1) => SelectionState::TwoPoints(p1, p),
            SelectionState::TwoPoints(_, _) => SelectionState::OnePoint(p),
        }
    }

    /// Discard all points.
    pub fn reset(self) -> Self {
        SelectionState::Empty
    }

    /// Points in selection order.
    pub fn points(&self) -> Vec<ReferencePoint> {
        match self {
            SelectionState::Empty => Vec::new(),
            SelectionState::OnePoint(p) => vec![*p],
            SelectionState::TwoPoints(p1, p2) => vec![*p1, *p2],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SelectionState::Empty => 0,
            SelectionState::OnePoint(_) => 1,
            SelectionState::TwoPoints(_, _) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, SelectionState::Empty)
    }

    /// Whether both reference points have been marked.
    pub fn is_complete(&self) -> bool {
        matches!(self, SelectionState::TwoPoints(_, _))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clicks_accumulate_then_third_resets() {
        let state = SelectionState::default();
        assert!(state.is_empty());

        let state = state.click(ReferencePoint::new(10.0, 10.0));
        assert_eq!(state.points(), vec![ReferencePoint::new(10.0, 10.0)]);

        let state = state.click(ReferencePoint::new(20.0, 20.0));
        assert_eq!(
            state.points(),
            vec![
                ReferencePoint::new(10.0, 10.0),
                ReferencePoint::new(20.0, 20.0)
            ]
        );
        assert!(state.is_complete());

        // Third click discards both prior points, no confirmation, no append.
        let state = state.click(ReferencePoint::new(30.0, 30.0));
        assert_eq!(state.points(), vec![ReferencePoint::new(30.0, 30.0)]);
    }

    #[test]
    fn test_reset_from_any_state() {
        let p = ReferencePoint::new(1.0, 2.0);
        assert!(SelectionState::Empty.reset().is_empty());
        assert!(SelectionState::OnePoint(p).reset().is_empty());
        assert!(SelectionState::TwoPoints(p, p).reset().is_empty());
    }

    #[test]
    fn test_seed_from_saved_record_points() {
        let points = vec![ReferencePoint::new(200.0, 200.0), ReferencePoint::new(600.0, 200.0)];
        let state = SelectionState::from_points(&points);
        assert!(state.is_complete());
        assert_eq!(state.points(), points);
    }

    #[test]
    fn test_machine_is_reentrant_after_reset() {
        let state = SelectionState::default()
            .click(ReferencePoint::new(1.0, 1.0))
            .click(ReferencePoint::new(2.0, 2.0))
            .reset()
            .click(ReferencePoint::new(3.0, 3.0));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = ReferencePoint::new(200.0, 200.0);
        let b = ReferencePoint::new(600.0, 200.0);
        assert_eq!(a.distance_to(&b), 400.0);
        assert_eq!(b.distance_to(&a), 400.0);
    }
}
