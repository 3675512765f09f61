//! Lobby settings and their validator.
//!
//! The host submits a whole [`LobbySettings`] record; the authority never
//! stores it as-is. [`LobbySettings::validated`] clamps every field into
//! its range and then applies the roster-dependent limits, so whatever the
//! client sends, the stored copy is always playable.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Per-lobby rules, replicated read-only to every participant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LobbySettings {
    pub max_participants: usize,
    pub hostile_count: usize,
    pub voting_seconds: u32,
    pub move_speed: f32,
    pub kill_cooldown_seconds: u32,
    pub tasks_per_benign: u32,
}

impl LobbySettings {
    pub const MAX_PARTICIPANTS: RangeInclusive<usize> = 4..=15;
    pub const HOSTILE_COUNT: RangeInclusive<usize> = 1..=3;
    pub const VOTING_SECONDS: RangeInclusive<u32> = 30..=180;
    pub const MOVE_SPEED: RangeInclusive<f32> = 0.5..=5.0;
    pub const KILL_COOLDOWN_SECONDS: RangeInclusive<u32> = 5..=60;
    pub const TASKS_PER_BENIGN: RangeInclusive<u32> = 1..=10;

    /// Returns a copy with every field forced into its legal range.
    ///
    /// After the per-field clamp:
    /// - `hostile_count ≤ max(1, eligible_count - 1)`
    /// - `max_participants ≥ connected_count`
    ///
    /// A non-finite `move_speed` is replaced with the default.
    pub fn validated(self, ctx: SettingsContext) -> Self {
        let defaults = Self::default();
        let move_speed = if self.move_speed.is_finite() {
            clamp(self.move_speed, &Self::MOVE_SPEED)
        } else {
            defaults.move_speed
        };

        let hostile_cap = ctx.eligible_count.saturating_sub(1).max(1);
        let hostile_count =
            clamp(self.hostile_count, &Self::HOSTILE_COUNT).min(hostile_cap);
        let max_participants =
            clamp(self.max_participants, &Self::MAX_PARTICIPANTS)
                .max(ctx.connected_count);

        let repaired = Self {
            max_participants,
            hostile_count,
            voting_seconds: clamp(self.voting_seconds, &Self::VOTING_SECONDS),
            move_speed,
            kill_cooldown_seconds: clamp(
                self.kill_cooldown_seconds,
                &Self::KILL_COOLDOWN_SECONDS,
            ),
            tasks_per_benign: clamp(
                self.tasks_per_benign,
                &Self::TASKS_PER_BENIGN,
            ),
        };

        if repaired != self {
            tracing::debug!(raw = ?self, ?repaired, "settings repaired");
        }
        repaired
    }
}

impl Default for LobbySettings {
    fn default() -> Self {
        Self {
            max_participants: 10,
            hostile_count: 1,
            voting_seconds: 120,
            move_speed: 1.0,
            kill_cooldown_seconds: 30,
            tasks_per_benign: 5,
        }
    }
}

/// Roster facts the validator needs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettingsContext {
    /// Participants present before the current match (not late joiners).
    pub eligible_count: usize,
    /// Everyone currently in the roster.
    pub connected_count: usize,
}

fn clamp<T: PartialOrd + Copy>(value: T, range: &RangeInclusive<T>) -> T {
    if value < *range.start() {
        *range.start()
    } else if value > *range.end() {
        *range.end()
    } else {
        value
    }
}
