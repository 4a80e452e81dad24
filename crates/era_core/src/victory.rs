//! Elimination timers and win detection.
//!
//! A player with no city-family building starts an elimination timer;
//! regaining any city resets the timer completely. When the timer
//! runs out the player is defeated for good. The game is won once
//! exactly one player in a multiplayer session remains undefeated.

use crate::map::GameMap;
use crate::players::{Player, PlayerId};

/// Ticks a player may survive without a city before elimination.
pub const ELIMINATION_TICKS: u64 = 600;

/// Run the victory pass for one tick. Returns the winner once one is
/// decided; a single-player session never produces a winner.
pub fn run_victory_pass(players: &mut [Player], map: &GameMap, tick: u64) -> Option<PlayerId> {
    for player in players.iter_mut() {
        if player.is_defeated {
            continue;
        }
        let has_city = map
            .buildings()
            .any(|(_, b)| b.owner == player.id && b.kind.is_city_family());
        if has_city {
            player.no_city_since = None;
            continue;
        }
        match player.no_city_since {
            None => player.no_city_since = Some(tick),
            Some(since) if tick.saturating_sub(since) >= ELIMINATION_TICKS => {
                player.is_defeated = true;
            }
            Some(_) => {}
        }
    }

    if players.len() < 2 {
        return None;
    }
    let mut alive = players.iter().filter(|p| !p.is_defeated);
    match (alive.next(), alive.next()) {
        (Some(winner), None) => Some(winner.id),
        _ => None,
    }
}
