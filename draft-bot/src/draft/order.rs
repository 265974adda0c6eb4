// Snake-draft turn order math.
//
// Pure functions over (pick_number, player_count): the scheduler keeps no
// state of its own, so the ordering can be tested exhaustively without an
// engine behind it.

/// The round containing `pick_number` (0-based). Zero when there are no
/// players yet.
pub fn current_round(pick_number: u64, player_count: usize) -> u64 {
    if player_count == 0 {
        return 0;
    }
    pick_number / player_count as u64
}

/// The index into the pick order holding `pick_number`.
///
/// Even rounds run forward (0..N-1); odd rounds snake backward (N-1..0), so
/// whoever picked last in a round picks first in the next. `None` when there
/// are no players.
pub fn current_index(pick_number: u64, player_count: usize) -> Option<usize> {
    if player_count == 0 {
        return None;
    }
    let pos_in_round = (pick_number % player_count as u64) as usize;
    if current_round(pick_number, player_count) % 2 == 0 {
        Some(pos_in_round)
    } else {
        Some(player_count - 1 - pos_in_round)
    }
}

/// Whether every round has been exhausted after `pick_number` committed
/// picks. A draft with no players never finishes (it is not yet playable).
pub fn has_finished(pick_number: u64, player_count: usize, rounds: u32) -> bool {
    player_count != 0 && current_round(pick_number, player_count) >= u64::from(rounds)
}
