//! Tripwire tracker: per (alarm, target) position memory across ticks.
//!
//! ```text
//! Unseen ──observe──▶ Tracked { previous = current = p }
//! Tracked ──observe (new tick)──▶ Tracked { previous = old current, current = p }
//! Tracked ──observe (same tick)──▶ Tracked { previous unchanged, current = p }
//! ```
//!
//! Entries are created lazily and never pruned.

use std::collections::HashMap;

use omnisim_types::{NodeId, Point};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TripwireState {
    #[default]
    Unseen,
    Tracked {
        previous: Point,
        current: Point,
        last_tick: u64,
    },
}

impl TripwireState {
    /// Displacement of the last move, `current - previous`.
    pub fn displacement(&self) -> Option<(f64, f64)> {
        match *self {
            TripwireState::Unseen => None,
            TripwireState::Tracked {
                previous, current, ..
            } => Some((current.x - previous.x, current.y - previous.y)),
        }
    }

    /// Heading of the last move in degrees, `None` when the target did not
    /// move.
    pub fn heading(&self) -> Option<f64> {
        let (dx, dy) = self.displacement()?;
        (dx != 0.0 || dy != 0.0).then(|| dy.atan2(dx).to_degrees())
    }
}

#[derive(Debug, Default)]
pub struct TripwireTracker {
    states: HashMap<(NodeId, NodeId), TripwireState>,
}

impl TripwireTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `position` of `target` as seen by `alarm` at `tick` and return
    /// the updated state.
    pub fn observe(
        &mut self,
        alarm: NodeId,
        target: NodeId,
        position: Point,
        tick: u64,
    ) -> TripwireState {
        let state = self.states.entry((alarm, target)).or_default();
        *state = match *state {
            TripwireState::Unseen => TripwireState::Tracked {
                previous: position,
                current: position,
                last_tick: tick,
            },
            TripwireState::Tracked {
                previous,
                last_tick,
                ..
            } if last_tick == tick => TripwireState::Tracked {
                previous,
                current: position,
                last_tick,
            },
            TripwireState::Tracked { current, .. } => TripwireState::Tracked {
                previous: current,
                current: position,
                last_tick: tick,
            },
        };
        *state
    }

    pub fn state(&self, alarm: NodeId, target: NodeId) -> TripwireState {
        self.states
            .get(&(alarm, target))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALARM: NodeId = NodeId(0);
    const ROBOT: NodeId = NodeId(1);

    #[test]
    fn first_observation_sets_both_positions() {
        let mut tracker = TripwireTracker::new();
        assert_eq!(tracker.state(ALARM, ROBOT), TripwireState::Unseen);
        let p = Point::new(5.0, -2.0);
        let state = tracker.observe(ALARM, ROBOT, p, 1);
        assert_eq!(
            state,
            TripwireState::Tracked {
                previous: p,
                current: p,
                last_tick: 1
            }
        );
        assert_eq!(state.heading(), None);
    }

    #[test]
    fn later_tick_shifts_current_into_previous() {
        let mut tracker = TripwireTracker::new();
        tracker.observe(ALARM, ROBOT, Point::new(5.0, -2.0), 1);
        let state = tracker.observe(ALARM, ROBOT, Point::new(5.0, 2.0), 2);
        assert_eq!(state.displacement(), Some((0.0, 4.0)));
        assert!((state.heading().unwrap() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn same_tick_does_not_shift_previous() {
        let mut tracker = TripwireTracker::new();
        tracker.observe(ALARM, ROBOT, Point::new(0.0, 0.0), 1);
        tracker.observe(ALARM, ROBOT, Point::new(1.0, 0.0), 2);
        let state = tracker.observe(ALARM, ROBOT, Point::new(2.0, 0.0), 2);
        assert_eq!(
            state,
            TripwireState::Tracked {
                previous: Point::new(0.0, 0.0),
                current: Point::new(2.0, 0.0),
                last_tick: 2
            }
        );
    }

    #[test]
    fn pairs_are_independent() {
        let mut tracker = TripwireTracker::new();
        tracker.observe(ALARM, ROBOT, Point::new(0.0, 0.0), 1);
        tracker.observe(NodeId(5), ROBOT, Point::new(9.0, 9.0), 1);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.state(NodeId(5), NodeId(6)), TripwireState::Unseen);
    }
}
