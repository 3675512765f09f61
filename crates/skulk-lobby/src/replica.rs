//! Client-side read replica.
//!
//! A [`ClientReplica`] applies [`GameEvent`]s from the authority to one
//! observer's local view. It never writes authoritative state; the only
//! decisions it makes are presentational (what to draw) or advisory (which
//! targets are worth requesting an elimination on).

use std::time::Duration;

use skulk_protocol::PlayerId;

use crate::{
    AliveState, AliveStore, CooldownTable, GameEvent, LobbySettings, MatchOutcome, MatchPhase,
    Participant, PerceivedRole, PerceptionCache, PositionSource, RosterSnapshot, TrueRole,
    VisibilityChange, VisibilityGate,
};

/// One observer's view of a lobby.
#[derive(Debug, Clone)]
pub struct ClientReplica {
    local: PlayerId,
    phase: MatchPhase,
    settings: Option<LobbySettings>,
    roster: Option<RosterSnapshot>,
    alive: AliveStore,
    cooldowns: CooldownTable,
    own_role: Option<TrueRole>,
    perceptions: PerceptionCache,
    gate: VisibilityGate,
    last_outcome: Option<(MatchOutcome, Vec<(PlayerId, TrueRole)>)>,
}

impl ClientReplica {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            phase: MatchPhase::default(),
            settings: None,
            roster: None,
            alive: AliveStore::new(),
            cooldowns: CooldownTable::new(),
            own_role: None,
            perceptions: PerceptionCache::new(),
            gate: VisibilityGate::new(local),
            last_outcome: None,
        }
    }

    /// Applies one event. Returns the avatars whose visibility flipped.
    pub fn apply(&mut self, event: GameEvent) -> Vec<VisibilityChange> {
        match event {
            GameEvent::Roster(snapshot) => {
                let stale = self
                    .roster
                    .as_ref()
                    .is_some_and(|held| held.revision > snapshot.revision);
                if !stale {
                    self.roster = Some(snapshot);
                }
            }
            GameEvent::Settings { settings } => self.settings = Some(settings),
            GameEvent::Phase { phase } => {
                if phase == MatchPhase::MatchInProgress {
                    self.last_outcome = None;
                } else {
                    self.own_role = None;
                    self.perceptions.clear();
                }
                self.phase = phase;
            }
            GameEvent::AliveStates { states } => {
                self.alive.replace(states);
                return self.gate.recompute(&self.alive);
            }
            GameEvent::AliveChanged { player, state } => {
                if self.alive.set(player, state) {
                    return self.gate.on_alive_changed(player, &self.alive);
                }
            }
            GameEvent::AvatarDespawned { player } => {
                self.alive.despawn(player);
                self.cooldowns.remove(player);
                self.perceptions.forget(player);
                return self.gate.on_alive_changed(player, &self.alive);
            }
            GameEvent::Cooldowns { ends } => self.cooldowns.replace_millis(ends),
            GameEvent::CooldownChanged { player, ends_at_ms } => {
                self.cooldowns
                    .set(player, Duration::from_millis(ends_at_ms));
            }
            GameEvent::OwnRole { role } => self.own_role = Some(role),
            GameEvent::PerceivedRole(push) => self.perceptions.apply(push),
            GameEvent::EliminationEffect { victim } => {
                tracing::trace!(%victim, "elimination effect");
            }
            GameEvent::MatchEnded { outcome, roles } => {
                self.last_outcome = Some((outcome, roles));
            }
        }
        Vec::new()
    }

    pub fn local(&self) -> PlayerId {
        self.local
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn settings(&self) -> Option<&LobbySettings> {
        self.settings.as_ref()
    }

    pub fn participants(&self) -> &[Participant] {
        self.roster
            .as_ref()
            .map(|r| r.participants.as_slice())
            .unwrap_or_default()
    }

    pub fn participant(&self, id: PlayerId) -> Option<&Participant> {
        self.participants().iter().find(|p| p.id == id)
    }

    pub fn alive_state(&self, id: PlayerId) -> Option<AliveState> {
        self.alive.get(id)
    }

    pub fn own_role(&self) -> Option<TrueRole> {
        self.own_role
    }

    /// What this observer has been told about `target`.
    pub fn perceived(&self, target: PlayerId) -> Option<PerceivedRole> {
        self.perceptions.get(target)
    }

    pub fn perceptions(&self) -> &PerceptionCache {
        &self.perceptions
    }

    pub fn is_visible(&self, target: PlayerId) -> bool {
        self.gate.is_visible(target)
    }

    /// End time of a participant's cooldown on the lobby clock.
    pub fn cooldown_end(&self, id: PlayerId) -> Option<Duration> {
        self.cooldowns.end(id)
    }

    pub fn cooldown_ready(&self, now: Duration) -> bool {
        self.cooldowns.is_ready(self.local, now)
    }

    pub fn last_outcome(&self) -> Option<&(MatchOutcome, Vec<(PlayerId, TrueRole)>)> {
        self.last_outcome.as_ref()
    }

    /// Targets worth asking the authority about.
    ///
    /// Drops ghosts, self, perceived fellow hostiles and anything out of
    /// `range`. Advisory only; the authority re-checks everything.
    pub fn elimination_candidates<P: PositionSource + ?Sized>(
        &self,
        positions: &P,
        range: f32,
    ) -> Vec<PlayerId> {
        if self.phase != MatchPhase::MatchInProgress || !self.alive.is_alive(self.local) {
            return Vec::new();
        }
        let Some(origin) = positions.position(self.local) else {
            return Vec::new();
        };
        self.alive
            .iter()
            .filter(|(id, state)| *id != self.local && state.is_alive())
            .filter(|(id, _)| self.perceptions.get(*id) != Some(PerceivedRole::Hostile))
            .filter(|(id, _)| {
                positions
                    .position(*id)
                    .is_some_and(|at| origin.distance(at) <= range)
            })
            .map(|(id, _)| id)
            .collect()
    }
}
