//! Authoritative lobby and match core for Skulk.
//!
//! Each hosted lobby runs as an isolated Tokio task (actor model) that
//! owns a [`GameSession`]: the roster, settings, match phase, hidden
//! roles, alive states and cooldowns. Clients never write any of it; they
//! send [`GameAction`]s and receive [`GameEvent`]s.
//!
//! # Key types
//!
//! - [`perceive`]: what one role is shown about another
//! - [`LobbySettings`]: host-editable rules and their validator
//! - [`Roster`], [`MatchPhase`], [`AliveStore`]: replicated state
//! - [`assign_roles`], [`perception_pushes`]: match start
//! - [`validate_elimination`]: the elimination pipeline
//! - [`GameSession`]: the authority, free of I/O
//! - [`LobbyHandle`] / [`LobbyDirectory`]: running lobbies
//! - [`ClientReplica`]: an observer's read-only view

mod alive;
mod assignment;
mod config;
mod directory;
mod elimination;
mod error;
mod game;
mod lobby;
mod messages;
mod outcome;
mod perception;
mod phase;
mod position;
mod replica;
mod role;
mod roster;
mod settings;
mod visibility;

pub use alive::{AliveState, AliveStore};
pub use assignment::assign_roles;
pub use config::LobbyConfig;
pub use directory::LobbyDirectory;
pub use elimination::{CooldownTable, EliminationCheck, validate_elimination};
pub use error::{LobbyError, Rejection};
pub use game::{GameSession, Outbound};
pub use lobby::{LobbyHandle, LobbyInfo, PlayerSender, spawn_lobby};
pub use messages::{GameAction, GameEvent};
pub use outcome::{MatchOutcome, check_outcome};
pub use perception::{PerceivedRolePush, PerceptionCache, perception_pushes, pushes_for_observer};
pub use phase::MatchPhase;
pub use position::{PositionSource, PositionTable, Vec2};
pub use replica::ClientReplica;
pub use role::{PerceivedRole, RoleTable, TrueRole, perceive};
pub use roster::{MAX_NAME_CHARS, Participant, Removed, Roster, RosterSnapshot, sanitize_name};
pub use settings::{LobbySettings, SettingsContext};
pub use visibility::{VisibilityChange, VisibilityGate, is_renderable};
