//! The roster: who is in the lobby, in join order.

use serde::{Deserialize, Serialize};
use skulk_protocol::PlayerId;

use crate::Rejection;

/// Longest display name, in characters, accepted from a client.
pub const MAX_NAME_CHARS: usize = 20;

/// One participant's replicated record. Roles are never part of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: PlayerId,
    pub display_name: String,
    pub is_ready: bool,
    pub is_host: bool,
    /// Connected while a match was running; sits out until the next round.
    pub joined_during_match: bool,
}

impl Participant {
    /// Takes part in the next role assignment.
    pub fn is_eligible(&self) -> bool {
        !self.joined_during_match
    }
}

/// The roster as replicated to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// Bumped on every mutation. Replicas drop snapshots older than the
    /// one they hold.
    pub revision: u64,
    pub participants: Vec<Participant>,
}

/// Result of removing a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    pub participant: Participant,
    /// Set when the removed participant was host and someone remains.
    pub new_host: Option<PlayerId>,
}

/// Ordered participant list. Mutated only by the authority.
///
/// Invariants: while non-empty exactly one participant is host, and the
/// host is always ready.
#[derive(Debug, Default)]
pub struct Roster {
    participants: Vec<Participant>,
    revision: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a participant. The first one in becomes host.
    ///
    /// Returns `false` (and changes nothing) if `id` is already present.
    pub fn add(&mut self, id: PlayerId, name: &str, joined_during_match: bool) -> bool {
        if self.contains(id) {
            return false;
        }
        let is_host = self.participants.is_empty();
        self.participants.push(Participant {
            id,
            display_name: sanitize_name(name, id),
            is_ready: is_host,
            is_host,
            joined_during_match,
        });
        self.touch();
        true
    }

    /// Removes a participant, promoting the earliest remaining one if the
    /// host left. Idempotent: `None` if `id` is not present.
    pub fn remove(&mut self, id: PlayerId) -> Option<Removed> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        let participant = self.participants.remove(index);

        let mut new_host = None;
        if participant.is_host {
            if let Some(next) = self.participants.first_mut() {
                next.is_host = true;
                next.is_ready = true;
                new_host = Some(next.id);
                tracing::info!(player_id = %next.id, "host promoted");
            }
        }
        self.touch();
        Some(Removed {
            participant,
            new_host,
        })
    }

    /// Sets the ready flag. The caller checks the phase.
    ///
    /// The host stays ready whatever it asks for. Returns whether the
    /// stored flag changed.
    ///
    /// # Errors
    /// - [`Rejection::UnknownParticipant`]
    /// - [`Rejection::LateJoiner`]: late joiners can't ready up
    pub fn set_ready(&mut self, id: PlayerId, ready: bool) -> Result<bool, Rejection> {
        let participant = self.get_mut(id)?;
        if participant.joined_during_match {
            return Err(Rejection::LateJoiner(id));
        }
        let ready = ready || participant.is_host;
        if participant.is_ready == ready {
            return Ok(false);
        }
        participant.is_ready = ready;
        self.touch();
        Ok(true)
    }

    /// Sets the display name after sanitizing it. Returns whether it
    /// changed.
    ///
    /// # Errors
    /// [`Rejection::UnknownParticipant`]
    pub fn set_name(&mut self, id: PlayerId, raw: &str) -> Result<bool, Rejection> {
        let name = sanitize_name(raw, id);
        let participant = self.get_mut(id)?;
        if participant.display_name == name {
            return Ok(false);
        }
        participant.display_name = name;
        self.touch();
        Ok(true)
    }

    /// Ends a round: everyone becomes eligible and only the host stays
    /// ready.
    pub fn reset_after_match(&mut self) {
        for p in &mut self.participants {
            p.joined_during_match = false;
            p.is_ready = p.is_host;
        }
        self.touch();
    }

    pub fn get(&self, id: PlayerId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.participants.iter().find(|p| p.is_host).map(|p| p.id)
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.get(id).is_some_and(|p| p.is_host)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.participants.iter().map(|p| p.id)
    }

    /// Eligible participants in join order.
    pub fn eligible(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_eligible())
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }

    /// The first eligible participant that is not ready, if any.
    pub fn first_unready(&self) -> Option<PlayerId> {
        self.eligible().find(|p| !p.is_ready).map(|p| p.id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            revision: self.revision,
            participants: self.participants.clone(),
        }
    }

    fn get_mut(&mut self, id: PlayerId) -> Result<&mut Participant, Rejection> {
        self.participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(Rejection::UnknownParticipant(id))
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

/// Trims and strips control characters. Falls back to `Player N` when the
/// result is empty or longer than [`MAX_NAME_CHARS`].
pub fn sanitize_name(raw: &str, id: PlayerId) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    let trimmed = cleaned.trim();
    let len = trimmed.chars().count();
    if (1..=MAX_NAME_CHARS).contains(&len) {
        trimmed.to_owned()
    } else {
        format!("Player {}", id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn roster_of(n: u64) -> Roster {
        let mut roster = Roster::new();
        for i in 1..=n {
            roster.add(pid(i), &format!("p{i}"), false);
        }
        roster
    }

    #[test]
    fn test_add_first_participant_becomes_ready_host() {
        let roster = roster_of(3);
        assert_eq!(roster.host(), Some(pid(1)));
        let host = roster.get(pid(1)).unwrap();
        assert!(host.is_ready);
        assert!(!roster.get(pid(2)).unwrap().is_host);
        assert!(!roster.get(pid(2)).unwrap().is_ready);
    }

    #[test]
    fn test_add_existing_id_is_noop() {
        let mut roster = roster_of(2);
        let revision = roster.revision();
        assert!(!roster.add(pid(2), "again", true));
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.revision(), revision);
        assert_eq!(roster.get(pid(2)).unwrap().display_name, "p2");
    }

    #[test]
    fn test_remove_host_promotes_earliest_remaining() {
        let mut roster = roster_of(3);
        let removed = roster.remove(pid(1)).unwrap();
        assert_eq!(removed.new_host, Some(pid(2)));
        assert_eq!(roster.host(), Some(pid(2)));
        assert!(roster.get(pid(2)).unwrap().is_ready);
        assert_eq!(roster.iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn test_remove_unknown_is_idempotent() {
        let mut roster = roster_of(2);
        assert!(roster.remove(pid(2)).is_some());
        assert!(roster.remove(pid(2)).is_none());
        assert_eq!(roster.len(), 1);
    }

    #[test]
    fn test_remove_last_leaves_no_host() {
        let mut roster = roster_of(1);
        let removed = roster.remove(pid(1)).unwrap();
        assert_eq!(removed.new_host, None);
        assert!(roster.is_empty());
        assert_eq!(roster.host(), None);
    }

    #[test]
    fn test_set_ready_host_cannot_unready() {
        let mut roster = roster_of(2);
        assert_eq!(roster.set_ready(pid(1), false), Ok(false));
        assert!(roster.get(pid(1)).unwrap().is_ready);
    }

    #[test]
    fn test_set_ready_late_joiner_is_rejected() {
        let mut roster = roster_of(2);
        roster.add(pid(9), "late", true);
        assert_eq!(
            roster.set_ready(pid(9), true),
            Err(Rejection::LateJoiner(pid(9)))
        );
        assert_eq!(
            roster.set_ready(pid(42), true),
            Err(Rejection::UnknownParticipant(pid(42)))
        );
    }

    #[test]
    fn test_first_unready_ignores_late_joiners() {
        let mut roster = roster_of(3);
        assert_eq!(roster.first_unready(), Some(pid(2)));
        roster.set_ready(pid(2), true).unwrap();
        roster.set_ready(pid(3), true).unwrap();
        roster.add(pid(4), "late", true);
        assert_eq!(roster.first_unready(), None);
        assert_eq!(roster.eligible_count(), 3);
    }

    #[test]
    fn test_reset_after_match_clears_late_and_ready() {
        let mut roster = roster_of(2);
        roster.set_ready(pid(2), true).unwrap();
        roster.add(pid(3), "late", true);

        roster.reset_after_match();

        assert!(roster.iter().all(|p| !p.joined_during_match));
        assert!(roster.get(pid(1)).unwrap().is_ready);
        assert!(!roster.get(pid(2)).unwrap().is_ready);
        assert_eq!(roster.eligible_count(), 3);
    }

    #[test]
    fn test_set_name_sanitizes_input() {
        let mut roster = roster_of(1);
        assert_eq!(roster.set_name(pid(1), "  Ada  "), Ok(true));
        assert_eq!(roster.get(pid(1)).unwrap().display_name, "Ada");
        assert_eq!(roster.set_name(pid(1), "Ada"), Ok(false));
    }

    #[test]
    fn test_sanitize_name_falls_back_on_empty_or_long() {
        assert_eq!(sanitize_name("   ", pid(7)), "Player 7");
        assert_eq!(sanitize_name(&"x".repeat(21), pid(7)), "Player 7");
        assert_eq!(sanitize_name(&"é".repeat(20), pid(7)), "é".repeat(20));
        assert_eq!(sanitize_name("a\u{7}b", pid(7)), "ab");
    }

    #[test]
    fn test_mutations_bump_revision() {
        let mut roster = Roster::new();
        assert_eq!(roster.revision(), 0);
        roster.add(pid(1), "a", false);
        roster.add(pid(2), "b", false);
        roster.set_ready(pid(2), true).unwrap();
        assert_eq!(roster.snapshot().revision, 3);
    }
}
