//! Avatar positions for the range check.
//!
//! Movement and physics live outside the authority. They reach it through
//! the [`PositionSource`] seam; [`PositionTable`] is the implementation
//! fed by client position reports.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::Rejection;

/// A point in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Where a participant's avatar currently is.
pub trait PositionSource {
    fn position(&self, player: PlayerId) -> Option<Vec2>;
}

/// Latest reported position per participant.
#[derive(Debug, Clone, Default)]
pub struct PositionTable {
    positions: HashMap<PlayerId, Vec2>,
}

impl PositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a report, replacing the previous one.
    ///
    /// # Errors
    /// [`Rejection::InvalidPosition`] for NaN or infinite coordinates.
    pub fn report(&mut self, player: PlayerId, at: Vec2) -> Result<(), Rejection> {
        if !at.is_finite() {
            return Err(Rejection::InvalidPosition);
        }
        self.positions.insert(player, at);
        Ok(())
    }

    pub fn forget(&mut self, player: PlayerId) {
        self.positions.remove(&player);
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

impl PositionSource for PositionTable {
    fn position(&self, player: PlayerId) -> Option<Vec2> {
        self.positions.get(&player).copied()
    }
}

impl PositionSource for HashMap<PlayerId, Vec2> {
    fn position(&self, player: PlayerId) -> Option<Vec2> {
        self.get(&player).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_is_euclidean() {
        assert_eq!(Vec2::new(0.0, 0.0).distance(Vec2::new(3.0, 4.0)), 5.0);
    }

    #[test]
    fn test_report_rejects_non_finite() {
        let mut table = PositionTable::new();
        assert_eq!(
            table.report(PlayerId(1), Vec2::new(f32::NAN, 0.0)),
            Err(Rejection::InvalidPosition)
        );
        assert_eq!(table.position(PlayerId(1)), None);

        table.report(PlayerId(1), Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(table.position(PlayerId(1)), Some(Vec2::new(1.0, 2.0)));
        table.forget(PlayerId(1));
        assert_eq!(table.position(PlayerId(1)), None);
    }
}
