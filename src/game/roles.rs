//! Role Assignment
//!
//! Decides how many impostors a round has and deals roles and characters.

use std::collections::BTreeMap;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::core::id::{CharacterId, PlayerId};
use crate::game::state::Role;

/// Role and sprite dealt to one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    /// Secret role.
    pub role: Role,
    /// Sprite.
    pub character: CharacterId,
}

/// Number of impostors for a round of `num_players`.
///
/// Tiered on purpose: one impostor up to 6 players, two up to 13,
/// then one per seven players but never fewer than two.
pub fn impostor_count(num_players: usize) -> usize {
    if num_players <= 6 {
        1
    } else if num_players <= 13 {
        2
    } else {
        (num_players / 7).max(2)
    }
}

/// Deal roles and characters.
///
/// Roles, characters and player order are shuffled independently and then
/// zipped, so any player can end up with any role/character pair.
pub fn assign_roles<R: Rng + ?Sized>(
    player_ids: &[PlayerId],
    rng: &mut R,
) -> BTreeMap<PlayerId, Assignment> {
    let num_players = player_ids.len();
    let num_impostors = impostor_count(num_players).min(num_players);

    let mut roles: Vec<Role> = std::iter::repeat(Role::Impostor)
        .take(num_impostors)
        .chain(std::iter::repeat(Role::Crewmate).take(num_players - num_impostors))
        .collect();
    let mut characters: Vec<CharacterId> = (1..=num_players).map(CharacterId::from_slot).collect();
    let mut order = player_ids.to_vec();

    roles.shuffle(rng);
    characters.shuffle(rng);
    order.shuffle(rng);

    order
        .into_iter()
        .zip(roles)
        .zip(characters)
        .map(|((id, role), character)| (id, Assignment { role, character }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ids(n: usize) -> Vec<PlayerId> {
        (0..n).map(|i| PlayerId::from_bytes([i as u8; 16])).collect()
    }

    #[test]
    fn test_impostor_count_boundaries() {
        assert_eq!(impostor_count(1), 1);
        assert_eq!(impostor_count(6), 1);
        assert_eq!(impostor_count(7), 2);
        assert_eq!(impostor_count(13), 2);
        assert_eq!(impostor_count(14), 2);
        assert_eq!(impostor_count(20), 2);
        assert_eq!(impostor_count(21), 3);
        assert_eq!(impostor_count(35), 5);
    }

    #[test]
    fn test_assignment_counts() {
        let mut rng = StdRng::seed_from_u64(42);
        let players = ids(10);
        let dealt = assign_roles(&players, &mut rng);

        assert_eq!(dealt.len(), 10);
        let impostors = dealt.values().filter(|a| a.role == Role::Impostor).count();
        assert_eq!(impostors, 2);

        let characters: BTreeSet<_> = dealt.values().map(|a| a.character.clone()).collect();
        assert_eq!(characters.len(), 10);
    }

    #[test]
    fn test_same_seed_same_deal() {
        let players = ids(8);
        let a = assign_roles(&players, &mut StdRng::seed_from_u64(7));
        let b = assign_roles(&players, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_player_can_be_impostor() {
        // Over many seeds each of the 5 players is dealt the impostor role at least once
        let players = ids(5);
        let mut seen = BTreeSet::new();
        for seed in 0..200 {
            let dealt = assign_roles(&players, &mut StdRng::seed_from_u64(seed));
            for (id, a) in dealt {
                if a.role == Role::Impostor {
                    seen.insert(id);
                }
            }
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn test_empty_roster() {
        let dealt = assign_roles(&[], &mut StdRng::seed_from_u64(1));
        assert!(dealt.is_empty());
    }

    proptest! {
        #[test]
        fn prop_roles_and_characters_are_consistent(n in 1usize..40, seed in any::<u64>()) {
            let players = ids(n);
            let dealt = assign_roles(&players, &mut StdRng::seed_from_u64(seed));

            let impostors = dealt.values().filter(|a| a.role == Role::Impostor).count();
            prop_assert_eq!(impostors, impostor_count(n).min(n));
            prop_assert_eq!(dealt.len() - impostors, n - impostors);

            let characters: BTreeSet<_> = dealt.values().map(|a| a.character.clone()).collect();
            prop_assert_eq!(characters.len(), n);
            prop_assert!(players.iter().all(|id| dealt.contains_key(id)));
        }

        #[test]
        fn prop_impostor_count_is_a_minority_above_six(n in 7usize..500) {
            let k = impostor_count(n);
            prop_assert!(k >= 2);
            prop_assert!(k * 2 < n);
        }
    }
}
