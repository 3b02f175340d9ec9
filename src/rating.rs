// Team rating calculations.
//
// Elo with a fixed K is the canonical post-match rating update; the
// points/level ladder is the separate team-progression track shown on
// profiles. Both are applied when a match result is recorded.

use serde::{Deserialize, Serialize};

/// Rating assigned to a team with no prior record.
pub const STARTING_RATING: f64 = 1000.0;

/// Fixed K-factor for every rated match.
pub const K_FACTOR: f64 = 32.0;

/// Points assigned to a brand-new team (level 2 on the ladder).
pub const STARTING_POINTS: i32 = 200;

const BASE_WIN_POINTS: i32 = 50;
const BASE_LOSE_POINTS: i32 = -30;

/// Expected score for a team rated `rating` against `opponent_rating`.
pub fn expected_score(rating: f64, opponent_rating: f64) -> f64 {
    1.0 / (1.0 + 10.0_f64.powf((opponent_rating - rating) / 400.0))
}

/// Outcome of rating a decided match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingUpdate {
    pub winner_old: f64,
    pub winner_new: f64,
    pub winner_delta: f64,
    pub loser_old: f64,
    pub loser_new: f64,
    pub loser_delta: f64,
}

/// Rate a decided match between two teams.
///
/// winner' = winner + K * (1 - expected_winner), and symmetrically
/// loser' = loser + K * (0 - expected_loser). No floor is applied: a long
/// losing streak can push a rating below zero.
pub fn rate_match(winner_rating: f64, loser_rating: f64) -> RatingUpdate {
    let expected_winner = expected_score(winner_rating, loser_rating);
    let expected_loser = expected_score(loser_rating, winner_rating);

    let winner_new = winner_rating + K_FACTOR * (1.0 - expected_winner);
    let loser_new = loser_rating + K_FACTOR * (0.0 - expected_loser);

    RatingUpdate {
        winner_old: winner_rating,
        winner_new,
        winner_delta: winner_new - winner_rating,
        loser_old: loser_rating,
        loser_new,
        loser_delta: loser_new - loser_rating,
    }
}

/// Level for a points total on the 10-step ladder. New teams start at
/// 200 points (level 2); level 10 is the cap at 1700+.
pub fn level_from_points(points: i32) -> i32 {
    match points {
        p if p < 100 => 1,
        p if p < 300 => 2,
        p if p < 500 => 3,
        p if p < 700 => 4,
        p if p < 900 => 5,
        p if p < 1100 => 6,
        p if p < 1300 => 7,
        p if p < 1500 => 8,
        p if p < 1700 => 9,
        _ => 10,
    }
}

/// Points change for (winner, loser) on the progression ladder.
///
/// Base +50 / -30, scaled by 1 + gap/1000 on the upset side: beating a
/// stronger team earns more, losing to a weaker one costs more.
pub fn points_change(winner_points: i32, loser_points: i32) -> (i32, i32) {
    let gap = (winner_points - loser_points).abs();
    let multiplier = 1.0 + gap as f64 / 1000.0;

    if winner_points < loser_points {
        ((BASE_WIN_POINTS as f64 * multiplier) as i32, BASE_LOSE_POINTS)
    } else {
        (
            BASE_WIN_POINTS,
            (BASE_LOSE_POINTS as f64 * multiplier) as i32,
        )
    }
}

/// Apply a points change, flooring at zero.
pub fn apply_points(points: i32, change: i32) -> i32 {
    (points + change).max(0)
}
