// Single-elimination bracket construction: seeding, walkovers, and
// placeholder rounds for a fixed-size bracket.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BracketFormat {
    SingleElimination,
}

impl BracketFormat {
    /// Parse a format string (from DB) into a BracketFormat.
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "single_elimination" => Some(Self::SingleElimination),
            _ => None,
        }
    }

    /// Serialize to a DB-storable string.
    pub fn to_str_name(&self) -> &'static str {
        match self {
            Self::SingleElimination => "single_elimination",
        }
    }
}

/// Lifecycle status of a bracket match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Walkover,
    InProgress,
    Completed,
    Disputed,
    Nullified,
}

impl MatchStatus {
    pub fn from_str_name(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "walkover" => Some(Self::Walkover),
            "in_progress" => Some(Self::InProgress),
            "completed" => Some(Self::Completed),
            "disputed" => Some(Self::Disputed),
            "nullified" => Some(Self::Nullified),
            _ => None,
        }
    }

    pub fn to_str_name(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Walkover => "walkover",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Disputed => "disputed",
            Self::Nullified => "nullified",
        }
    }
}

/// One match to be persisted when a bracket is generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSpec {
    pub round: i32,
    pub match_number: i32,
    pub team1_id: Option<i64>,
    pub team2_id: Option<i64>,
    pub winner_id: Option<i64>,
    pub status: MatchStatus,
}

/// Full bracket layout: round-1 pairings plus empty placeholder matches
/// for every later round.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketPlan {
    pub bracket_size: usize,
    pub rounds: u32,
    pub matches: Vec<MatchSpec>,
}

/// Smallest power of two >= n (minimum 2, so even a single entrant gets
/// a one-match bracket).
pub fn next_power_of_two(n: usize) -> usize {
    n.max(2).next_power_of_two()
}

/// Build a single-elimination bracket for the given teams.
///
/// Teams are seeded into slots in registration order; trailing slots stay
/// empty when fewer teams than slots. The bracket size is the smallest
/// power of two covering `max_teams` (or the team count when unset), so a
/// non-power-of-two capacity widens to the next bracket size instead of
/// losing rounds.
///
/// Round 1 pairs slots (0,1), (2,3), ...:
/// - both slots filled -> pending match,
/// - exactly one filled -> walkover, winner set immediately,
/// - both empty -> pending placeholder (tournament not yet full).
///
/// Rounds 2..=rounds are created empty; the progression engine fills them
/// as results come in. match_number restarts at 1 in every round.
pub fn build_bracket(approved_teams: &[i64], max_teams: Option<u32>) -> BracketPlan {
    let capacity = match max_teams {
        Some(m) => (m as usize).max(approved_teams.len()),
        None => approved_teams.len(),
    };
    let bracket_size = next_power_of_two(capacity);
    let rounds = bracket_size.ilog2();

    let mut slots: Vec<Option<i64>> = vec![None; bracket_size];
    for (i, &team_id) in approved_teams.iter().enumerate() {
        if i < bracket_size {
            slots[i] = Some(team_id);
        }
    }

    let mut matches = Vec::with_capacity(bracket_size - 1);

    let mut match_number = 1;
    for pair in slots.chunks(2) {
        let (team1_id, team2_id) = (pair[0], pair[1]);
        let spec = match (team1_id, team2_id) {
            (Some(t1), None) => MatchSpec {
                round: 1,
                match_number,
                team1_id: Some(t1),
                team2_id: None,
                winner_id: Some(t1),
                status: MatchStatus::Walkover,
            },
            (None, Some(t2)) => MatchSpec {
                round: 1,
                match_number,
                team1_id: None,
                team2_id: Some(t2),
                winner_id: Some(t2),
                status: MatchStatus::Walkover,
            },
            _ => MatchSpec {
                round: 1,
                match_number,
                team1_id,
                team2_id,
                winner_id: None,
                status: MatchStatus::Pending,
            },
        };
        matches.push(spec);
        match_number += 1;
    }

    for round in 2..=rounds {
        let matches_in_round = bracket_size >> round;
        for match_number in 1..=matches_in_round {
            matches.push(MatchSpec {
                round: round as i32,
                match_number: match_number as i32,
                team1_id: None,
                team2_id: None,
                winner_id: None,
                status: MatchStatus::Pending,
            });
        }
    }

    BracketPlan {
        bracket_size,
        rounds,
        matches,
    }
}
