//! Turn arithmetic: rounds, snake order, roster floor and completion.
//!
//! Everything here is a pure function of the pick counter and league format
//! so the engine's transitions can be checked without a store.

use crate::draft::error::DraftError;
use crate::util::{PickNumber, PlayerId};

/// Round of `pick` for `players` players, from 1.
pub fn round_for_pick(pick: PickNumber, players: usize) -> u32 {
    let n = players_u32(players);
    (pick.saturating_sub(1) / n) + 1
}

/// Position of `pick` inside its round, from 1.
pub fn pick_in_round(pick: PickNumber, players: usize) -> u32 {
    let n = players_u32(players);
    (pick.saturating_sub(1) % n) + 1
}

/// Whether `round` runs back to front.
pub const fn is_reversed_round(round: u32, snake: bool) -> bool {
    snake && round % 2 == 0
}

/// Index into the league's player order of whoever holds `pick`.
///
/// Forward rounds go `0..n`; reversed rounds (snake order, even round) go
/// `n-1..=0`, so the last player of a round picks again first in the next.
pub fn turn_index(pick: PickNumber, players: usize, snake: bool) -> usize {
    let round = round_for_pick(pick, players);
    let position = pick_in_round(pick, players) as usize;
    if is_reversed_round(round, snake) {
        players - position
    } else {
        position - 1
    }
}

/// Players holding the next `count` picks starting at `from_pick`.
pub fn upcoming_turns(
    from_pick: PickNumber,
    order: &[PlayerId],
    snake: bool,
    count: usize,
) -> Vec<(PickNumber, PlayerId)> {
    if order.is_empty() {
        return Vec::new();
    }
    (0..count)
        .filter_map(|offset| u32::try_from(offset).ok())
        .map(|offset| {
            let pick = from_pick + offset;
            (pick, order[turn_index(pick, order.len(), snake)])
        })
        .collect()
}

/// On-clock turns a player still gets after the current round within the
/// nominal schedule of `max_assets_per_player` rounds.
pub const fn remaining_nominal_turns(current_round: u32, max_assets_per_player: u32) -> u32 {
    max_assets_per_player.saturating_sub(current_round)
}

/// Inputs of the roster-floor check for a turn that leaves the current slot
/// unredeemed.
#[derive(Debug, Clone, Copy)]
pub struct SkipFloor {
    /// Player's committed allocations before this batch.
    pub asset_count: u32,
    /// Picks in this batch.
    pub requested: u32,
    /// Player's banked picks before this batch.
    pub accumulated: u32,
    /// Round on the clock.
    pub current_round: u32,
    /// League roster floor.
    pub min_assets_per_player: u32,
    /// League roster cap (nominal round count).
    pub max_assets_per_player: u32,
}

impl SkipFloor {
    /// Banked picks left after the turn, counting the slot being skipped.
    pub const fn remaining_slots_if_skipped(&self) -> u32 {
        (self.accumulated + 1).saturating_sub(self.requested)
    }

    /// Best roster size the player can still reach.
    ///
    /// Banked slots are redeemed alongside the slot of a later on-clock turn,
    /// so every one of them counts while such a turn remains. In the last
    /// nominal round there is no later turn to redeem the skipped slot on.
    pub const fn reachable(&self) -> u32 {
        let committed = self.asset_count + self.requested;
        let banked = self.remaining_slots_if_skipped();
        let turns = remaining_nominal_turns(self.current_round, self.max_assets_per_player);
        if turns == 0 {
            committed + banked.saturating_sub(1)
        } else {
            committed + banked + turns
        }
    }

    /// Fail with `CannotSkipBelowMinimum` when the floor becomes unreachable.
    pub fn check(&self) -> Result<(), DraftError> {
        let reachable = self.reachable();
        if reachable < self.min_assets_per_player {
            return Err(DraftError::CannotSkipBelowMinimum {
                reachable,
                minimum: self.min_assets_per_player,
            });
        }
        Ok(())
    }
}

/// Draft completion rule: the league holds at least `players * max`
/// allocations and every player holds at least `min`.
pub fn is_draft_complete(
    total_allocations: u64,
    asset_counts: impl IntoIterator<Item = u32>,
    players: usize,
    min_assets_per_player: u32,
    max_assets_per_player: u32,
) -> bool {
    let target = players as u64 * u64::from(max_assets_per_player);
    total_allocations >= target
        && asset_counts
            .into_iter()
            .all(|count| count >= min_assets_per_player)
}

fn players_u32(players: usize) -> u32 {
    u32::try_from(players).unwrap_or(u32::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_math() {
        assert_eq!(round_for_pick(1, 4), 1);
        assert_eq!(round_for_pick(4, 4), 1);
        assert_eq!(round_for_pick(5, 4), 2);
        assert_eq!(pick_in_round(5, 4), 1);
        assert_eq!(pick_in_round(8, 4), 4);
        assert_eq!(round_for_pick(3, 1), 3);
        assert_eq!(pick_in_round(3, 1), 1);
    }

    #[test]
    fn test_snake_symmetry_four_players() {
        let order = [1, 2, 3, 4];
        let turns: Vec<PlayerId> = upcoming_turns(1, &order, true, 8)
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(turns, vec![1, 2, 3, 4, 4, 3, 2, 1]);
    }

    #[test]
    fn test_linear_order_wraps() {
        let order = [1, 2, 3];
        let turns: Vec<PlayerId> = upcoming_turns(1, &order, false, 7)
            .into_iter()
            .map(|(_, p)| p)
            .collect();
        assert_eq!(turns, vec![1, 2, 3, 1, 2, 3, 1]);
    }

    #[test]
    fn test_snake_round_three_runs_forward_again() {
        assert_eq!(turn_index(9, 4, true), 0);
        assert_eq!(turn_index(12, 4, true), 3);
        assert_eq!(turn_index(13, 4, true), 3);
    }

    #[test]
    fn test_skip_floor_last_reachable_slot() {
        // 2 committed, nothing banked, last nominal round, floor 3.
        let floor = SkipFloor {
            asset_count: 2,
            requested: 0,
            accumulated: 0,
            current_round: 3,
            min_assets_per_player: 3,
            max_assets_per_player: 3,
        };
        assert_eq!(floor.remaining_slots_if_skipped(), 1);
        assert_eq!(floor.reachable(), 2);
        assert!(matches!(
            floor.check(),
            Err(DraftError::CannotSkipBelowMinimum {
                reachable: 2,
                minimum: 3
            })
        ));
    }

    #[test]
    fn test_skip_floor_allows_early_skip() {
        let floor = SkipFloor {
            asset_count: 0,
            requested: 0,
            accumulated: 0,
            current_round: 1,
            min_assets_per_player: 3,
            max_assets_per_player: 6,
        };
        assert!(floor.check().is_ok());
    }

    #[test]
    fn test_skip_floor_counts_skipped_slot_while_turns_remain() {
        // Floor equals cap: the skipped slot is redeemed with a later turn.
        let floor = SkipFloor {
            asset_count: 0,
            requested: 0,
            accumulated: 0,
            current_round: 1,
            min_assets_per_player: 3,
            max_assets_per_player: 3,
        };
        assert_eq!(floor.reachable(), 3);
        assert!(floor.check().is_ok());

        let second_to_last = SkipFloor {
            asset_count: 1,
            current_round: 2,
            ..floor
        };
        assert_eq!(second_to_last.reachable(), 3);
        assert!(second_to_last.check().is_ok());
    }

    #[test]
    fn test_skip_floor_counts_unused_banked_picks() {
        // Redeeming one of two banked picks leaves one banked plus the skip.
        let floor = SkipFloor {
            asset_count: 1,
            requested: 1,
            accumulated: 2,
            current_round: 4,
            min_assets_per_player: 3,
            max_assets_per_player: 4,
        };
        assert_eq!(floor.remaining_slots_if_skipped(), 2);
        assert_eq!(floor.reachable(), 3);
        assert!(floor.check().is_ok());
    }

    #[test]
    fn test_completion_needs_total_and_floor() {
        assert!(is_draft_complete(2, [1, 1], 2, 1, 1));
        assert!(!is_draft_complete(1, [1, 0], 2, 1, 1));
        assert!(!is_draft_complete(4, [4, 0], 2, 1, 2));
        assert!(is_draft_complete(4, [2, 2], 2, 2, 2));
    }
}
