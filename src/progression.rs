// Winner advancement arithmetic and the group-to-playoff seeding pattern.
//
// Advancement is purely positional: match N of round R feeds slot
// (N odd -> team1, N even -> team2) of match ceil(N/2) in round R+1.
// No re-seeding happens between rounds.

use serde::{Deserialize, Serialize};

/// Which team column of the destination match receives the winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    First,
    Second,
}

/// Destination of a completed match's winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NextSlot {
    pub round: i32,
    pub match_number: i32,
    pub slot: Slot,
}

/// Compute where the winner of (round, match_number) advances to.
///
/// The destination may not exist (the completed match was the final);
/// the storage layer discovers that by the absence of the row.
pub fn next_slot(round: i32, match_number: i32) -> NextSlot {
    NextSlot {
        round: round + 1,
        match_number: (match_number + 1) / 2,
        slot: if match_number % 2 == 1 {
            Slot::First
        } else {
            Slot::Second
        },
    }
}

/// Quarterfinal pairings for the 8 group-stage qualifiers, ordered
/// [A1, A2, B1, B2, C1, C2, D1, D2].
///
/// The cross pattern (A1,B2), (C1,D2), (B1,A2), (D1,C2) keeps teams from
/// the same group apart in round 1. Pair order is the match_number order.
pub fn playoff_pairs(qualified: &[i64]) -> Result<[(i64, i64); 4], QualifierCountError> {
    if qualified.len() != 8 {
        return Err(QualifierCountError {
            got: qualified.len(),
        });
    }
    Ok([
        (qualified[0], qualified[3]), // A1 vs B2
        (qualified[4], qualified[7]), // C1 vs D2
        (qualified[2], qualified[1]), // B1 vs A2
        (qualified[6], qualified[5]), // D1 vs C2
    ])
}

/// Playoff seeding needs exactly 8 qualifiers (top 2 of 4 groups).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("playoff seeding needs 8 qualified teams, got {got}")]
pub struct QualifierCountError {
    pub got: usize,
}
