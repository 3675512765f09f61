//! The ghost visibility rule.
//!
//! Living observers see only the living. Eliminated observers see everyone.
//! Everyone sees themselves.

use std::collections::BTreeMap;

use skulk_protocol::PlayerId;

use crate::{AliveState, AliveStore};

/// Whether `target` should be drawn for `observer`.
///
/// An observer without an avatar (`None`) counts as living.
pub fn is_renderable(
    observer: PlayerId,
    observer_state: Option<AliveState>,
    target: PlayerId,
    target_state: AliveState,
) -> bool {
    if observer == target {
        return true;
    }
    match target_state {
        AliveState::Alive => true,
        AliveState::Eliminated => observer_state == Some(AliveState::Eliminated),
    }
}

/// A change in whether a remote avatar is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityChange {
    pub target: PlayerId,
    pub visible: bool,
}

/// One observer's render set, kept in step with an [`AliveStore`].
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    local: PlayerId,
    visible: BTreeMap<PlayerId, bool>,
}

impl VisibilityGate {
    pub fn new(local: PlayerId) -> Self {
        Self {
            local,
            visible: BTreeMap::new(),
        }
    }

    pub fn local(&self) -> PlayerId {
        self.local
    }

    /// Re-evaluates every avatar. Despawned avatars drop out as hidden.
    pub fn recompute(&mut self, alive: &AliveStore) -> Vec<VisibilityChange> {
        let observer_state = alive.get(self.local);
        let mut next = BTreeMap::new();
        let mut changes = Vec::new();

        for (target, state) in alive.iter() {
            let visible = is_renderable(self.local, observer_state, target, state);
            if self.visible.get(&target) != Some(&visible) {
                changes.push(VisibilityChange { target, visible });
            }
            next.insert(target, visible);
        }
        for (&target, &was_visible) in &self.visible {
            if was_visible && !next.contains_key(&target) {
                changes.push(VisibilityChange {
                    target,
                    visible: false,
                });
            }
        }

        self.visible = next;
        changes
    }

    /// Applies one avatar's state change.
    ///
    /// When the avatar is the local observer's own, every target is
    /// re-evaluated.
    pub fn on_alive_changed(
        &mut self,
        changed: PlayerId,
        alive: &AliveStore,
    ) -> Vec<VisibilityChange> {
        if changed == self.local {
            return self.recompute(alive);
        }
        let Some(state) = alive.get(changed) else {
            return match self.visible.remove(&changed) {
                Some(true) => vec![VisibilityChange {
                    target: changed,
                    visible: false,
                }],
                _ => Vec::new(),
            };
        };
        let visible = is_renderable(self.local, alive.get(self.local), changed, state);
        if self.visible.insert(changed, visible) == Some(visible) {
            Vec::new()
        } else {
            vec![VisibilityChange {
                target: changed,
                visible,
            }]
        }
    }

    pub fn is_visible(&self, target: PlayerId) -> bool {
        self.visible.get(&target).copied().unwrap_or(false)
    }

    /// Targets currently drawn.
    pub fn visible(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.visible.iter().filter(|(_, v)| **v).map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    #[test]
    fn test_is_renderable_rule() {
        use AliveState::{Alive, Eliminated};
        let (me, other) = (pid(1), pid(2));

        assert!(is_renderable(me, Some(Alive), other, Alive));
        assert!(is_renderable(me, Some(Eliminated), other, Alive));
        assert!(!is_renderable(me, Some(Alive), other, Eliminated));
        assert!(is_renderable(me, Some(Eliminated), other, Eliminated));
        assert!(!is_renderable(me, None, other, Eliminated));
        assert!(is_renderable(me, Some(Eliminated), me, Eliminated));
    }

    fn store(states: &[(u64, AliveState)]) -> AliveStore {
        let mut store = AliveStore::new();
        store.replace(states.iter().map(|(id, s)| (pid(*id), *s)));
        store
    }

    #[test]
    fn test_gate_hides_ghost_from_living_observer() {
        let mut alive = store(&[
            (1, AliveState::Alive),
            (2, AliveState::Alive),
            (3, AliveState::Alive),
        ]);
        let mut gate = VisibilityGate::new(pid(1));
        gate.recompute(&alive);
        assert!(gate.is_visible(pid(2)));

        alive.kill(pid(2)).unwrap();
        let changes = gate.on_alive_changed(pid(2), &alive);

        assert_eq!(
            changes,
            vec![VisibilityChange {
                target: pid(2),
                visible: false
            }]
        );
        assert!(gate.is_visible(pid(3)));
    }

    #[test]
    fn test_gate_local_death_reveals_all_ghosts() {
        let mut alive = store(&[
            (1, AliveState::Alive),
            (2, AliveState::Eliminated),
            (3, AliveState::Eliminated),
            (4, AliveState::Alive),
        ]);
        let mut gate = VisibilityGate::new(pid(1));
        gate.recompute(&alive);
        assert!(!gate.is_visible(pid(2)));
        assert!(!gate.is_visible(pid(3)));

        alive.kill(pid(1)).unwrap();
        let mut changes = gate.on_alive_changed(pid(1), &alive);
        changes.sort_by_key(|c| c.target);

        assert_eq!(
            changes,
            vec![
                VisibilityChange {
                    target: pid(2),
                    visible: true
                },
                VisibilityChange {
                    target: pid(3),
                    visible: true
                },
            ]
        );
        assert!(gate.is_visible(pid(1)));
        assert!(gate.is_visible(pid(4)));
    }

    #[test]
    fn test_gate_despawn_hides_target() {
        let mut alive = store(&[(1, AliveState::Alive), (2, AliveState::Alive)]);
        let mut gate = VisibilityGate::new(pid(1));
        gate.recompute(&alive);

        alive.despawn(pid(2));
        let changes = gate.on_alive_changed(pid(2), &alive);

        assert_eq!(changes.len(), 1);
        assert!(!gate.is_visible(pid(2)));
        assert_eq!(gate.visible().collect::<Vec<_>>(), vec![pid(1)]);
    }
}
