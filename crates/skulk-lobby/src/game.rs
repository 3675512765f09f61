//! The authoritative state of one hosted lobby.
//!
//! [`GameSession`] owns every write to the roster, settings, phase, roles,
//! alive states and cooldowns. It does no I/O: each operation returns the
//! events to deliver as `(Recipient, GameEvent)` pairs, or a [`Rejection`]
//! that the caller logs and drops. The lobby actor wraps it with a clock,
//! a channel and a return-to-lobby alarm.

use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use skulk_protocol::{PlayerId, Recipient};
use tracing::info;

use crate::{
    AliveState, AliveStore, CooldownTable, EliminationCheck, GameAction, GameEvent, LobbyConfig,
    LobbySettings, MatchOutcome, MatchPhase, PositionTable, Rejection, RoleTable, Roster,
    SettingsContext, Vec2, assign_roles, check_outcome, perception_pushes, pushes_for_observer,
    validate_elimination,
};

/// Events produced by one operation, in delivery order.
pub type Outbound = Vec<(Recipient, GameEvent)>;

/// One lobby's match state.
pub struct GameSession {
    config: LobbyConfig,
    /// What the host last asked for; `settings` is this, validated against
    /// the current roster.
    requested: LobbySettings,
    settings: LobbySettings,
    phase: MatchPhase,
    roster: Roster,
    roles: RoleTable,
    alive: AliveStore,
    cooldowns: CooldownTable,
    positions: PositionTable,
    rng: StdRng,
}

impl GameSession {
    /// Creates a session seeded from the OS.
    pub fn new(config: LobbyConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Creates a session whose role draws are reproducible.
    pub fn seeded(config: LobbyConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    /// Creates a session with a caller-supplied generator.
    pub fn with_rng(config: LobbyConfig, rng: StdRng) -> Self {
        let requested = config.initial_settings;
        Self {
            settings: requested.validated(SettingsContext::default()),
            requested,
            config,
            phase: MatchPhase::LobbyOpen,
            roster: Roster::new(),
            roles: RoleTable::new(),
            alive: AliveStore::new(),
            cooldowns: CooldownTable::new(),
            positions: PositionTable::new(),
            rng,
        }
    }

    // -- Accessors -------------------------------------------------------

    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    pub fn settings(&self) -> &LobbySettings {
        &self.settings
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The truth table. Never serialize this to a client.
    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn alive(&self) -> &AliveStore {
        &self.alive
    }

    pub fn cooldowns(&self) -> &CooldownTable {
        &self.cooldowns
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    // -- Connection lifecycle --------------------------------------------

    /// Adds a participant. Mid-match arrivals are marked as late joiners.
    ///
    /// The newcomer receives a full snapshot; everyone else receives the
    /// new roster. Connecting twice is a no-op.
    ///
    /// # Errors
    /// [`Rejection::LobbyFull`] at the `max_participants` cap.
    pub fn connect(&mut self, player: PlayerId) -> Result<Outbound, Rejection> {
        if self.roster.contains(player) {
            return Ok(Vec::new());
        }
        let max = self.settings.max_participants;
        if self.roster.len() >= max {
            return Err(Rejection::LobbyFull { max });
        }

        let late = self.phase.is_in_match();
        self.roster.add(player, "", late);
        info!(
            %player,
            late,
            participants = self.roster.len(),
            "participant joined"
        );

        let mut out = Vec::new();
        if self.phase.is_lobby_open() {
            out.extend(self.revalidate_settings());
        }
        out.push((Recipient::AllExcept(player), self.roster_event()));
        out.extend(self.snapshot_for(player));
        Ok(out)
    }

    /// Removes a participant and everything tied to it. Idempotent.
    ///
    /// Mid-match this despawns its avatar and may end the match.
    pub fn disconnect(&mut self, player: PlayerId) -> Outbound {
        let Some(removed) = self.roster.remove(player) else {
            return Vec::new();
        };
        info!(
            %player,
            new_host = ?removed.new_host,
            participants = self.roster.len(),
            "participant left"
        );

        self.roles.remove(player);
        self.cooldowns.remove(player);
        self.positions.forget(player);

        let mut out = vec![(Recipient::All, self.roster_event())];
        if self.alive.despawn(player).is_some() {
            out.push((Recipient::All, GameEvent::AvatarDespawned { player }));
        }
        match self.phase {
            MatchPhase::LobbyOpen => out.extend(self.revalidate_settings()),
            MatchPhase::MatchInProgress if self.config.auto_end => {
                out.extend(self.check_win());
            }
            _ => {}
        }
        out
    }

    /// Full replicated state for one participant, plus its own role and
    /// perceptions when a match is running.
    pub fn snapshot_for(&self, player: PlayerId) -> Outbound {
        let to = Recipient::Player(player);
        let mut out = vec![
            (
                to,
                GameEvent::Settings {
                    settings: self.settings,
                },
            ),
            (to, GameEvent::Phase { phase: self.phase }),
            (to, self.roster_event()),
            (
                to,
                GameEvent::AliveStates {
                    states: self.alive.to_vec(),
                },
            ),
            (
                to,
                GameEvent::Cooldowns {
                    ends: self.cooldowns.to_millis(),
                },
            ),
        ];
        if self.phase.is_in_match() {
            if let Some(role) = self.roles.get(player) {
                out.push((to, GameEvent::OwnRole { role }));
            }
            out.extend(
                pushes_for_observer(&self.roles, player)
                    .into_iter()
                    .map(|push| (to, GameEvent::PerceivedRole(push))),
            );
        }
        out
    }

    // -- Client actions --------------------------------------------------

    /// Dispatches a client action to its operation.
    pub fn apply(
        &mut self,
        sender: PlayerId,
        action: GameAction,
        now: Duration,
    ) -> Result<Outbound, Rejection> {
        match action {
            GameAction::SubmitName { name } => self.submit_name(sender, &name),
            GameAction::SetReady { ready } => self.set_ready(sender, ready),
            GameAction::UpdateSettings { settings } => self.update_settings(sender, settings),
            GameAction::StartMatch => self.start_match(sender, now),
            GameAction::RequestElimination { target } => {
                self.request_elimination(sender, target, now)
            }
            GameAction::ReportPosition { position } => {
                self.report_position(sender, position).map(|()| Vec::new())
            }
        }
    }

    pub fn submit_name(&mut self, player: PlayerId, name: &str) -> Result<Outbound, Rejection> {
        if self.roster.set_name(player, name)? {
            Ok(vec![(Recipient::All, self.roster_event())])
        } else {
            Ok(Vec::new())
        }
    }

    pub fn set_ready(&mut self, player: PlayerId, ready: bool) -> Result<Outbound, Rejection> {
        self.require_phase(MatchPhase::LobbyOpen)?;
        if self.roster.set_ready(player, ready)? {
            Ok(vec![(Recipient::All, self.roster_event())])
        } else {
            Ok(Vec::new())
        }
    }

    /// Replaces the settings with a validated copy of `raw`. Host only,
    /// lobby phase only.
    pub fn update_settings(
        &mut self,
        player: PlayerId,
        raw: LobbySettings,
    ) -> Result<Outbound, Rejection> {
        self.require_host(player)?;
        self.require_phase(MatchPhase::LobbyOpen)?;
        self.requested = raw;
        Ok(self.revalidate_settings().into_iter().collect())
    }

    /// Starts a match: assigns roles, spawns avatars and distributes
    /// perceptions.
    ///
    /// # Errors
    /// In check order: [`Rejection::NotHost`], [`Rejection::WrongPhase`],
    /// [`Rejection::NotEnoughParticipants`], [`Rejection::NotReady`],
    /// [`Rejection::TooManyHostiles`].
    pub fn start_match(&mut self, player: PlayerId, now: Duration) -> Result<Outbound, Rejection> {
        self.require_host(player)?;
        self.require_phase(MatchPhase::LobbyOpen)?;

        let eligible: Vec<PlayerId> = self.roster.eligible().map(|p| p.id).collect();
        if eligible.len() < self.config.min_eligible {
            return Err(Rejection::NotEnoughParticipants {
                required: self.config.min_eligible,
                actual: eligible.len(),
            });
        }
        if let Some(unready) = self.roster.first_unready() {
            return Err(Rejection::NotReady(unready));
        }
        let hostile_count = self.settings.hostile_count;
        if hostile_count >= eligible.len() {
            return Err(Rejection::TooManyHostiles {
                hostile_count,
                eligible: eligible.len(),
            });
        }

        let assigned = assign_roles(&eligible, hostile_count, &mut self.rng);
        self.roles.install(assigned.iter().copied())?;
        self.advance(MatchPhase::MatchInProgress);

        // Every avatar gets a ready timer, so the replicated table carries
        // no hint of who is hostile.
        self.alive.despawn_all();
        self.cooldowns.clear();
        self.positions.clear();
        for (id, _) in &assigned {
            self.alive.spawn(*id);
            self.cooldowns.set(*id, now);
        }
        info!(
            participants = eligible.len(),
            hostiles = hostile_count,
            "match started"
        );

        let mut out = vec![
            (Recipient::All, GameEvent::Phase { phase: self.phase }),
            (
                Recipient::All,
                GameEvent::AliveStates {
                    states: self.alive.to_vec(),
                },
            ),
            (
                Recipient::All,
                GameEvent::Cooldowns {
                    ends: self.cooldowns.to_millis(),
                },
            ),
        ];
        out.extend(
            assigned
                .iter()
                .map(|&(id, role)| (Recipient::Player(id), GameEvent::OwnRole { role })),
        );
        out.extend(
            perception_pushes(&self.roles, self.roster.ids())
                .into_iter()
                .map(|(observer, push)| {
                    (Recipient::Player(observer), GameEvent::PerceivedRole(push))
                }),
        );
        Ok(out)
    }

    /// Validates and applies an elimination.
    pub fn request_elimination(
        &mut self,
        requester: PlayerId,
        target: PlayerId,
        now: Duration,
    ) -> Result<Outbound, Rejection> {
        self.require_phase(MatchPhase::MatchInProgress)?;
        validate_elimination(&EliminationCheck {
            requester,
            target,
            now,
            kill_range: self.config.kill_range,
            require_hostile_requester: self.config.require_hostile_requester,
            roles: &self.roles,
            alive: &self.alive,
            cooldowns: &self.cooldowns,
            positions: &self.positions,
        })?;

        self.alive.kill(target)?;
        let cooldown = Duration::from_secs(u64::from(self.settings.kill_cooldown_seconds));
        let ends_at = self.cooldowns.arm(requester, now, cooldown);
        info!(%requester, %target, "participant eliminated");

        let mut out = vec![
            (
                Recipient::All,
                GameEvent::AliveChanged {
                    player: target,
                    state: AliveState::Eliminated,
                },
            ),
            (
                Recipient::All,
                GameEvent::CooldownChanged {
                    player: requester,
                    ends_at_ms: ends_at.as_millis() as u64,
                },
            ),
            (Recipient::All, GameEvent::EliminationEffect { victim: target }),
        ];
        if self.config.auto_end {
            out.extend(self.check_win());
        }
        Ok(out)
    }

    /// Stores a position report from a living avatar.
    pub fn report_position(&mut self, player: PlayerId, at: Vec2) -> Result<(), Rejection> {
        self.require_phase(MatchPhase::MatchInProgress)?;
        match self.alive.get(player) {
            Some(AliveState::Alive) => self.positions.report(player, at),
            Some(AliveState::Eliminated) => Err(Rejection::AlreadyEliminated(player)),
            None => Err(Rejection::NotSpawned(player)),
        }
    }

    // -- Authority-side operations ---------------------------------------

    /// Ends the running match with `outcome`.
    ///
    /// # Errors
    /// [`Rejection::WrongPhase`] outside `MatchInProgress`.
    pub fn end_match(&mut self, outcome: MatchOutcome) -> Result<Outbound, Rejection> {
        self.require_phase(MatchPhase::MatchInProgress)?;
        Ok(self.finish(outcome))
    }

    /// Reopens the lobby after `PostMatch`.
    ///
    /// # Errors
    /// [`Rejection::WrongPhase`] outside `PostMatch`.
    pub fn return_to_lobby(&mut self) -> Result<Outbound, Rejection> {
        self.require_phase(MatchPhase::PostMatch)?;
        self.advance(MatchPhase::LobbyOpen);
        info!("lobby reopened");

        let mut out = vec![(Recipient::All, GameEvent::Phase { phase: self.phase })];
        out.extend(self.revalidate_settings());
        Ok(out)
    }

    /// Brings an eliminated avatar back.
    pub fn revive(&mut self, player: PlayerId) -> Result<Outbound, Rejection> {
        self.require_phase(MatchPhase::MatchInProgress)?;
        self.alive.revive(player)?;
        info!(%player, "participant revived");
        Ok(vec![(
            Recipient::All,
            GameEvent::AliveChanged {
                player,
                state: AliveState::Alive,
            },
        )])
    }

    // -- Internals -------------------------------------------------------

    fn finish(&mut self, outcome: MatchOutcome) -> Outbound {
        let mut roles: Vec<_> = self.roles.iter().collect();
        roles.sort_by_key(|(id, _)| *id);

        self.roles.clear();
        self.alive.despawn_all();
        self.cooldowns.clear();
        self.positions.clear();
        self.roster.reset_after_match();
        self.advance(MatchPhase::PostMatch);
        info!(%outcome, "match ended");

        vec![
            (Recipient::All, GameEvent::MatchEnded { outcome, roles }),
            (Recipient::All, GameEvent::Phase { phase: self.phase }),
            (Recipient::All, GameEvent::AliveStates { states: Vec::new() }),
            (Recipient::All, GameEvent::Cooldowns { ends: Vec::new() }),
            (Recipient::All, self.roster_event()),
        ]
    }

    fn check_win(&mut self) -> Outbound {
        if !self.phase.is_in_match() {
            return Vec::new();
        }
        match check_outcome(&self.roles, &self.alive) {
            Some(outcome) => self.finish(outcome),
            None => Vec::new(),
        }
    }

    /// Re-derives `settings` from the host's request and the roster.
    /// Returns a broadcast when the stored copy changed.
    fn revalidate_settings(&mut self) -> Option<(Recipient, GameEvent)> {
        let ctx = SettingsContext {
            eligible_count: self.roster.eligible_count(),
            connected_count: self.roster.len(),
        };
        let validated = self.requested.validated(ctx);
        if validated == self.settings {
            return None;
        }
        self.settings = validated;
        Some((
            Recipient::All,
            GameEvent::Settings {
                settings: validated,
            },
        ))
    }

    fn roster_event(&self) -> GameEvent {
        GameEvent::Roster(self.roster.snapshot())
    }

    fn advance(&mut self, to: MatchPhase) {
        debug_assert!(
            self.phase.can_transition_to(to),
            "illegal phase transition {} -> {to}",
            self.phase
        );
        self.phase = self.phase.next();
    }

    fn require_phase(&self, expected: MatchPhase) -> Result<(), Rejection> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(Rejection::WrongPhase { actual: self.phase })
        }
    }

    fn require_host(&self, player: PlayerId) -> Result<(), Rejection> {
        match self.roster.get(player) {
            Some(p) if p.is_host => Ok(()),
            Some(_) => Err(Rejection::NotHost(player)),
            None => Err(Rejection::UnknownParticipant(player)),
        }
    }
}
