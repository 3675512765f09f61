//! Elimination validation and cooldowns.
//!
//! A client request names only a target. Everything else is read from the
//! authority's own tables, and the checks below short-circuit on the first
//! failure. Order:
//!
//! 1. requester is alive
//! 2. requester is off cooldown
//! 3. target has an avatar
//! 4. target is alive
//! 5. target is not the requester
//! 6. target is within kill range
//! 7. not hostile-on-hostile
//!
//! With `require_hostile_requester` set, a non-hostile requester is
//! rejected before step 1.

use std::collections::BTreeMap;
use std::time::Duration;

use skulk_protocol::PlayerId;

use crate::{AliveState, AliveStore, PositionSource, Rejection, RoleTable, TrueRole};

// ---------------------------------------------------------------------------
// CooldownTable
// ---------------------------------------------------------------------------

/// When each participant may act again, as an offset on the lobby clock.
///
/// No entry means ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CooldownTable {
    ends: BTreeMap<PlayerId, Duration>,
}

impl CooldownTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a cooldown of `length` from `now`. Returns the end time.
    pub fn arm(&mut self, player: PlayerId, now: Duration, length: Duration) -> Duration {
        let end = now + length;
        self.ends.insert(player, end);
        end
    }

    pub fn set(&mut self, player: PlayerId, end: Duration) {
        self.ends.insert(player, end);
    }

    pub fn end(&self, player: PlayerId) -> Option<Duration> {
        self.ends.get(&player).copied()
    }

    pub fn is_ready(&self, player: PlayerId, now: Duration) -> bool {
        self.remaining(player, now).is_zero()
    }

    pub fn remaining(&self, player: PlayerId, now: Duration) -> Duration {
        self.end(player)
            .map_or(Duration::ZERO, |end| end.saturating_sub(now))
    }

    pub fn remove(&mut self, player: PlayerId) {
        self.ends.remove(&player);
    }

    pub fn clear(&mut self) {
        self.ends.clear();
    }

    /// End times in milliseconds, for replication.
    pub fn to_millis(&self) -> Vec<(PlayerId, u64)> {
        self.ends
            .iter()
            .map(|(id, end)| (*id, end.as_millis() as u64))
            .collect()
    }

    pub fn replace_millis(&mut self, ends: impl IntoIterator<Item = (PlayerId, u64)>) {
        self.ends = ends
            .into_iter()
            .map(|(id, ms)| (id, Duration::from_millis(ms)))
            .collect();
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Everything the validator reads for one request.
pub struct EliminationCheck<'a, P: PositionSource + ?Sized> {
    pub requester: PlayerId,
    pub target: PlayerId,
    pub now: Duration,
    pub kill_range: f32,
    pub require_hostile_requester: bool,
    pub roles: &'a RoleTable,
    pub alive: &'a AliveStore,
    pub cooldowns: &'a CooldownTable,
    pub positions: &'a P,
}

/// Runs the pipeline. `Ok` means the elimination may be applied.
pub fn validate_elimination<P: PositionSource + ?Sized>(
    check: &EliminationCheck<'_, P>,
) -> Result<(), Rejection> {
    let requester = check.requester;
    let target = check.target;
    let requester_role = check.roles.get(requester);

    if check.require_hostile_requester && requester_role != Some(TrueRole::Hostile) {
        return Err(Rejection::RequesterNotHostile(requester));
    }

    match check.alive.get(requester) {
        Some(AliveState::Alive) => {}
        Some(AliveState::Eliminated) => return Err(Rejection::RequesterEliminated(requester)),
        None => return Err(Rejection::NotSpawned(requester)),
    }

    let remaining = check.cooldowns.remaining(requester, check.now);
    if !remaining.is_zero() {
        return Err(Rejection::OnCooldown {
            requester,
            remaining_ms: remaining.as_millis() as u64,
        });
    }

    match check.alive.get(target) {
        Some(AliveState::Alive) => {}
        Some(AliveState::Eliminated) => return Err(Rejection::TargetEliminated(target)),
        None => return Err(Rejection::UnknownTarget(target)),
    }

    if target == requester {
        return Err(Rejection::SelfTarget);
    }

    let from = check
        .positions
        .position(requester)
        .ok_or(Rejection::PositionUnknown(requester))?;
    let to = check
        .positions
        .position(target)
        .ok_or(Rejection::PositionUnknown(target))?;
    let distance = from.distance(to);
    if distance > check.kill_range {
        return Err(Rejection::OutOfRange {
            distance,
            range: check.kill_range,
        });
    }

    if requester_role == Some(TrueRole::Hostile)
        && check.roles.get(target) == Some(TrueRole::Hostile)
    {
        return Err(Rejection::FriendlyFire);
    }

    Ok(())
}
