//! Role assignment at match start.

use rand::Rng;
use rand::seq::SliceRandom;
use skulk_protocol::PlayerId;

use crate::TrueRole;

/// Splits `eligible` into `hostile_count` hostiles and benign for the rest.
///
/// The list is shuffled uniformly and the first `hostile_count` entries
/// become hostile. The count is capped at the list length; the caller has
/// already checked it is smaller. Output keeps the input order.
pub fn assign_roles<R: Rng + ?Sized>(
    eligible: &[PlayerId],
    hostile_count: usize,
    rng: &mut R,
) -> Vec<(PlayerId, TrueRole)> {
    let mut shuffled = eligible.to_vec();
    shuffled.shuffle(rng);
    let hostiles = &shuffled[..hostile_count.min(shuffled.len())];

    eligible
        .iter()
        .map(|&id| {
            let role = if hostiles.contains(&id) {
                TrueRole::Hostile
            } else {
                TrueRole::Benign
            };
            (id, role)
        })
        .collect()
}
