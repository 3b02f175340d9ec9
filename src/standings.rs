// Group-stage standings: derived tables computed from pairwise match
// results, never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Group labels used by the group stage. 16 teams split into 4 groups of 4.
pub const GROUP_NAMES: [&str; 4] = ["A", "B", "C", "D"];

/// How many teams advance from each group into the playoff bracket.
pub const QUALIFIERS_PER_GROUP: usize = 2;

/// A group-stage match as stored; `played = false` rows carry default
/// scores and are ignored by the calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMatch {
    pub id: i64,
    pub group_name: String,
    pub team1_id: i64,
    pub team2_id: i64,
    pub team1_score: i32,
    pub team2_score: i32,
    pub played: bool,
}

/// One row of a group table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub team_id: i64,
    pub matches_played: i32,
    pub wins: i32,
    pub draws: i32,
    pub losses: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub goal_difference: i32,
    pub points: i32,
}

impl Standing {
    fn new(team_id: i64) -> Self {
        Self {
            team_id,
            matches_played: 0,
            wins: 0,
            draws: 0,
            losses: 0,
            goals_for: 0,
            goals_against: 0,
            goal_difference: 0,
            points: 0,
        }
    }
}

/// Compute the standings table for every group.
///
/// Each group's table holds every team that appears in one of its matches,
/// zero-initialized, then accumulated over the played matches only: win = 3
/// points, draw = 1 each, goals added symmetrically. Goal difference is
/// derived once at the end rather than per match.
///
/// Tables are sorted by (points, goal_difference, goals_for) descending.
/// The sort is stable, so true ties keep first-appearance order. A group
/// with no played matches yields an all-zero table.
pub fn compute_standings(
    matches: &[GroupMatch],
    group_names: &[&str],
) -> BTreeMap<String, Vec<Standing>> {
    let mut standings = BTreeMap::new();

    for &group in group_names {
        let group_matches: Vec<&GroupMatch> =
            matches.iter().filter(|m| m.group_name == group).collect();

        // Every team in the group gets a row, played or not
        let mut table: Vec<Standing> = Vec::new();
        for m in &group_matches {
            for team_id in [m.team1_id, m.team2_id] {
                if !table.iter().any(|s| s.team_id == team_id) {
                    table.push(Standing::new(team_id));
                }
            }
        }

        for m in &group_matches {
            if !m.played {
                continue;
            }
            let (s1, s2) = (m.team1_score, m.team2_score);

            {
                let row = row_mut(&mut table, m.team1_id);
                row.matches_played += 1;
                row.goals_for += s1;
                row.goals_against += s2;
                match s1.cmp(&s2) {
                    std::cmp::Ordering::Greater => {
                        row.wins += 1;
                        row.points += 3;
                    }
                    std::cmp::Ordering::Equal => {
                        row.draws += 1;
                        row.points += 1;
                    }
                    std::cmp::Ordering::Less => row.losses += 1,
                }
            }
            {
                let row = row_mut(&mut table, m.team2_id);
                row.matches_played += 1;
                row.goals_for += s2;
                row.goals_against += s1;
                match s2.cmp(&s1) {
                    std::cmp::Ordering::Greater => {
                        row.wins += 1;
                        row.points += 3;
                    }
                    std::cmp::Ordering::Equal => {
                        row.draws += 1;
                        row.points += 1;
                    }
                    std::cmp::Ordering::Less => row.losses += 1,
                }
            }
        }

        for row in &mut table {
            row.goal_difference = row.goals_for - row.goals_against;
        }

        table.sort_by(|a, b| {
            (b.points, b.goal_difference, b.goals_for)
                .cmp(&(a.points, a.goal_difference, a.goals_for))
        });

        standings.insert(group.to_string(), table);
    }

    standings
}

/// Take the top qualifiers from each group, in group order:
/// [A1, A2, B1, B2, C1, C2, D1, D2] for the default 4x2 layout.
///
/// Groups with fewer teams than `QUALIFIERS_PER_GROUP` contribute what
/// they have; the caller enforces the total required for playoff seeding.
pub fn qualifiers(
    standings: &BTreeMap<String, Vec<Standing>>,
    group_names: &[&str],
) -> Vec<i64> {
    let mut qualified = Vec::new();
    for &group in group_names {
        if let Some(table) = standings.get(group) {
            qualified.extend(
                table
                    .iter()
                    .take(QUALIFIERS_PER_GROUP)
                    .map(|s| s.team_id),
            );
        }
    }
    qualified
}

fn row_mut(table: &mut [Standing], team_id: i64) -> &mut Standing {
    table
        .iter_mut()
        .find(|s| s.team_id == team_id)
        .expect("team row initialized from the same match list")
}
