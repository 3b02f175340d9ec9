// Database access layer (sqlx). Holds the schema plus every engine
// operation that has to be transactional: bracket generation, match
// completion/advancement, group-stage lifecycle, and rating updates.
// The algorithmic parts live in the pure modules; this layer feeds them
// rows and writes their output back, all-or-nothing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::bracket::{self, BracketFormat, MatchStatus};
use crate::error::Error;
use crate::progression::{self, NextSlot, Slot};
use crate::rating::{self, RatingUpdate};
use crate::standings::{self, GroupMatch, Standing, GROUP_NAMES};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub rating: f64,
    pub points: i64,
    pub level: i64,
    pub wins: i64,
    pub losses: i64,
    pub draws: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tournament {
    pub id: i64,
    pub name: String,
    pub max_teams: Option<i64>,
    pub status: String,
    pub registration_open: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Registration {
    pub id: i64,
    pub tournament_id: i64,
    pub team_id: i64,
    pub status: String,
    pub registered_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Bracket {
    pub id: i64,
    pub tournament_id: i64,
    pub format: String,
    pub style: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BracketMatch {
    pub id: i64,
    pub bracket_id: i64,
    pub round: i64,
    pub match_number: i64,
    pub team1_id: Option<i64>,
    pub team2_id: Option<i64>,
    pub winner_id: Option<i64>,
    pub team1_score: Option<i64>,
    pub team2_score: Option<i64>,
    pub status: String,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupStageMatch {
    pub id: i64,
    pub tournament_id: i64,
    pub group_name: String,
    pub team1_id: i64,
    pub team2_id: i64,
    pub team1_score: i64,
    pub team2_score: i64,
    pub played: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// A bracket match joined with team names, for display.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BracketMatchView {
    pub id: i64,
    pub round: i64,
    pub match_number: i64,
    pub team1_id: Option<i64>,
    pub team1_name: Option<String>,
    pub team2_id: Option<i64>,
    pub team2_name: Option<String>,
    pub winner_id: Option<i64>,
    pub winner_name: Option<String>,
    pub team1_score: Option<i64>,
    pub team2_score: Option<i64>,
    pub status: String,
}

/// Result of generating a bracket.
#[derive(Debug, Clone, Serialize)]
pub struct BracketSummary {
    pub bracket_id: i64,
    pub bracket_size: usize,
    pub rounds: u32,
    pub total_teams: usize,
}

/// A full bracket with its matches, ordered by (round, match_number).
#[derive(Debug, Clone, Serialize)]
pub struct BracketView {
    pub bracket_id: i64,
    pub format: String,
    pub style: String,
    pub matches: Vec<BracketMatchView>,
}

/// Result of recording a match score.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreUpdate {
    pub match_id: i64,
    pub winner_id: Option<i64>,
}

/// Result of completing a match. `advanced_to` is None exactly when the
/// match was the final, in which case `tournament_complete` is true.
#[derive(Debug, Clone, Serialize)]
pub struct MatchCompletion {
    pub match_id: i64,
    pub winner_id: i64,
    pub advanced_to: Option<NextSlot>,
    pub tournament_complete: bool,
    pub rating: Option<RatingUpdate>,
}

/// A registered team with its display name, as returned by the group
/// stage endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupTeam {
    pub team_id: i64,
    pub name: String,
}

/// Group stage snapshot: registered teams, raw matches, derived tables.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStageView {
    pub teams: Vec<GroupTeam>,
    pub matches: Vec<GroupStageMatch>,
    pub standings: BTreeMap<String, Vec<Standing>>,
}

/// Result of finalizing the group stage into playoff matches.
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeSummary {
    pub qualified_team_ids: Vec<i64>,
    pub bracket_id: i64,
}

pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let db = Self { pool };
        db.run_migrations().await?;
        Ok(db)
    }

    async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                rating REAL NOT NULL DEFAULT 1000,
                points INTEGER NOT NULL DEFAULT 200,
                level INTEGER NOT NULL DEFAULT 2,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                draws INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournaments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                max_teams INTEGER,
                status TEXT NOT NULL DEFAULT 'upcoming',
                registration_open INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournament_registrations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                status TEXT NOT NULL DEFAULT 'pending',
                registered_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(tournament_id, team_id)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tournament_brackets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tournament_id INTEGER NOT NULL UNIQUE REFERENCES tournaments(id) ON DELETE CASCADE,
                format TEXT NOT NULL DEFAULT 'single_elimination',
                style TEXT NOT NULL DEFAULT 'esports',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bracket_matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bracket_id INTEGER NOT NULL REFERENCES tournament_brackets(id) ON DELETE CASCADE,
                round INTEGER NOT NULL,
                match_number INTEGER NOT NULL,
                team1_id INTEGER REFERENCES teams(id),
                team2_id INTEGER REFERENCES teams(id),
                winner_id INTEGER REFERENCES teams(id),
                team1_score INTEGER,
                team2_score INTEGER,
                status TEXT NOT NULL DEFAULT 'pending',
                completed_at TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(bracket_id, round, match_number)
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS group_stage_matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                tournament_id INTEGER NOT NULL REFERENCES tournaments(id) ON DELETE CASCADE,
                group_name TEXT NOT NULL,
                team1_id INTEGER NOT NULL REFERENCES teams(id),
                team2_id INTEGER NOT NULL REFERENCES teams(id),
                team1_score INTEGER NOT NULL DEFAULT 0,
                team2_score INTEGER NOT NULL DEFAULT 0,
                played INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
        "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ── Teams ─────────────────────────────────────────────────────────

    pub async fn create_team(&self, name: &str) -> Result<Team, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "INSERT INTO teams (name) VALUES (?) RETURNING id, name, rating, points, level, wins, losses, draws, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT id, name, rating, points, level, wins, losses, draws, created_at FROM teams ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_team(&self, id: i64) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT id, name, rating, points, level, wins, losses, draws, created_at FROM teams WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Leaderboard ordering: best rating first.
    pub async fn list_teams_by_rating(&self) -> Result<Vec<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>(
            "SELECT id, name, rating, points, level, wins, losses, draws, created_at FROM teams ORDER BY rating DESC, id",
        )
        .fetch_all(&self.pool)
        .await
    }

    // ── Tournaments ───────────────────────────────────────────────────

    pub async fn create_tournament(
        &self,
        name: &str,
        max_teams: Option<i64>,
    ) -> Result<Tournament, sqlx::Error> {
        sqlx::query_as::<_, Tournament>(
            "INSERT INTO tournaments (name, max_teams) VALUES (?, ?) RETURNING id, name, max_teams, status, registration_open, created_at, updated_at",
        )
        .bind(name)
        .bind(max_teams)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn list_tournaments(&self) -> Result<Vec<Tournament>, sqlx::Error> {
        sqlx::query_as::<_, Tournament>(
            "SELECT id, name, max_teams, status, registration_open, created_at, updated_at FROM tournaments ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn get_tournament(&self, id: i64) -> Result<Option<Tournament>, sqlx::Error> {
        sqlx::query_as::<_, Tournament>(
            "SELECT id, name, max_teams, status, registration_open, created_at, updated_at FROM tournaments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn update_tournament_status(
        &self,
        id: i64,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tournaments SET status = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(status)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_registration_open(&self, id: i64, open: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE tournaments SET registration_open = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(open)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // ── Registrations ─────────────────────────────────────────────────

    pub async fn register_team(
        &self,
        tournament_id: i64,
        team_id: i64,
    ) -> Result<Registration, sqlx::Error> {
        sqlx::query_as::<_, Registration>(
            "INSERT INTO tournament_registrations (tournament_id, team_id) VALUES (?, ?) RETURNING id, tournament_id, team_id, status, registered_at",
        )
        .bind(tournament_id)
        .bind(team_id)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn set_registration_status(
        &self,
        registration_id: i64,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE tournament_registrations SET status = ? WHERE id = ?")
            .bind(status)
            .bind(registration_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_registrations(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<Registration>, sqlx::Error> {
        sqlx::query_as::<_, Registration>(
            "SELECT id, tournament_id, team_id, status, registered_at FROM tournament_registrations WHERE tournament_id = ? ORDER BY registered_at, id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Team ids eligible for bracket/group placement, in registration order.
    pub async fn approved_team_ids(&self, tournament_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT team_id FROM tournament_registrations WHERE tournament_id = ? AND status IN ('approved', 'confirmed') ORDER BY registered_at, id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    // ── Bracket generation ────────────────────────────────────────────

    /// Generate (or destructively regenerate) the tournament's bracket.
    ///
    /// Approved teams are seeded in registration order; the whole write
    /// runs in one transaction so a failure never leaves a partial
    /// bracket behind.
    pub async fn generate_bracket(
        &self,
        tournament_id: i64,
        format: BracketFormat,
        style: &str,
    ) -> Result<BracketSummary, Error> {
        let mut tx = self.pool.begin().await?;

        let max_teams: Option<Option<i64>> =
            sqlx::query_scalar("SELECT max_teams FROM tournaments WHERE id = ?")
                .bind(tournament_id)
                .fetch_optional(&mut *tx)
                .await?;
        let max_teams = max_teams.ok_or(Error::NotFound("Tournament"))?;

        let rows: Vec<(i64,)> = sqlx::query_as(
            "SELECT team_id FROM tournament_registrations WHERE tournament_id = ? AND status IN ('approved', 'confirmed') ORDER BY registered_at, id",
        )
        .bind(tournament_id)
        .fetch_all(&mut *tx)
        .await?;
        let team_ids: Vec<i64> = rows.into_iter().map(|(id,)| id).collect();

        if team_ids.is_empty() {
            return Err(Error::Validation(
                "no approved teams to build a bracket from".to_string(),
            ));
        }

        let existing: Option<i64> =
            sqlx::query_scalar("SELECT id FROM tournament_brackets WHERE tournament_id = ?")
                .bind(tournament_id)
                .fetch_optional(&mut *tx)
                .await?;

        let bracket_id = match existing {
            Some(id) => {
                sqlx::query("DELETE FROM bracket_matches WHERE bracket_id = ?")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "UPDATE tournament_brackets SET format = ?, style = ?, updated_at = datetime('now') WHERE id = ?",
                )
                .bind(format.to_str_name())
                .bind(style)
                .bind(id)
                .execute(&mut *tx)
                .await?;
                id
            }
            None => {
                sqlx::query_scalar(
                    "INSERT INTO tournament_brackets (tournament_id, format, style) VALUES (?, ?, ?) RETURNING id",
                )
                .bind(tournament_id)
                .bind(format.to_str_name())
                .bind(style)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let plan = bracket::build_bracket(&team_ids, max_teams.map(|m| m as u32));
        for spec in &plan.matches {
            sqlx::query(
                "INSERT INTO bracket_matches (bracket_id, round, match_number, team1_id, team2_id, winner_id, status) VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(bracket_id)
            .bind(spec.round)
            .bind(spec.match_number)
            .bind(spec.team1_id)
            .bind(spec.team2_id)
            .bind(spec.winner_id)
            .bind(spec.status.to_str_name())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            tournament_id,
            bracket_id,
            teams = team_ids.len(),
            rounds = plan.rounds,
            "bracket generated"
        );

        Ok(BracketSummary {
            bracket_id,
            bracket_size: plan.bracket_size,
            rounds: plan.rounds,
            total_teams: team_ids.len(),
        })
    }

    pub async fn get_bracket(
        &self,
        tournament_id: i64,
    ) -> Result<Option<BracketView>, sqlx::Error> {
        let bracket: Option<Bracket> = sqlx::query_as(
            "SELECT id, tournament_id, format, style, created_at, updated_at FROM tournament_brackets WHERE tournament_id = ?",
        )
        .bind(tournament_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(bracket) = bracket else {
            return Ok(None);
        };

        let matches = sqlx::query_as::<_, BracketMatchView>(
            r#"
            SELECT
                bm.id, bm.round, bm.match_number,
                bm.team1_id, t1.name AS team1_name,
                bm.team2_id, t2.name AS team2_name,
                bm.winner_id, tw.name AS winner_name,
                bm.team1_score, bm.team2_score, bm.status
            FROM bracket_matches bm
            LEFT JOIN teams t1 ON bm.team1_id = t1.id
            LEFT JOIN teams t2 ON bm.team2_id = t2.id
            LEFT JOIN teams tw ON bm.winner_id = tw.id
            WHERE bm.bracket_id = ?
            ORDER BY bm.round, bm.match_number
        "#,
        )
        .bind(bracket.id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BracketView {
            bracket_id: bracket.id,
            format: bracket.format,
            style: bracket.style,
            matches,
        }))
    }

    pub async fn get_match(&self, match_id: i64) -> Result<Option<BracketMatch>, sqlx::Error> {
        sqlx::query_as::<_, BracketMatch>(
            "SELECT id, bracket_id, round, match_number, team1_id, team2_id, winner_id, team1_score, team2_score, status, completed_at, created_at, updated_at FROM bracket_matches WHERE id = ?",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
    }

    // ── Match moderation & progression ────────────────────────────────

    /// Record a match score. The winner is derived by comparison; a tie
    /// leaves winner_id unset, so the match cannot be completed until a
    /// decisive score is entered.
    pub async fn update_match_score(
        &self,
        match_id: i64,
        team1_score: i64,
        team2_score: i64,
    ) -> Result<ScoreUpdate, Error> {
        let mut tx = self.pool.begin().await?;

        let teams: Option<(Option<i64>, Option<i64>)> =
            sqlx::query_as("SELECT team1_id, team2_id FROM bracket_matches WHERE id = ?")
                .bind(match_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (team1_id, team2_id) = teams.ok_or(Error::NotFound("Match"))?;

        let winner_id = match team1_score.cmp(&team2_score) {
            std::cmp::Ordering::Greater => team1_id,
            std::cmp::Ordering::Less => team2_id,
            std::cmp::Ordering::Equal => None,
        };

        sqlx::query(
            "UPDATE bracket_matches SET team1_score = ?, team2_score = ?, winner_id = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(team1_score)
        .bind(team2_score)
        .bind(winner_id)
        .bind(match_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(ScoreUpdate {
            match_id,
            winner_id,
        })
    }

    /// Complete a decided match and advance the winner.
    ///
    /// The read of the source row, the status flip, and the write into
    /// the destination slot share one transaction, so two completions
    /// feeding the same next-round match can never interleave partial
    /// state. When no destination row exists the match was the final:
    /// the tournament is marked completed and the finalists are rated.
    pub async fn complete_match(&self, match_id: i64) -> Result<MatchCompletion, Error> {
        let mut tx = self.pool.begin().await?;

        let m: Option<BracketMatch> = sqlx::query_as(
            "SELECT id, bracket_id, round, match_number, team1_id, team2_id, winner_id, team1_score, team2_score, status, completed_at, created_at, updated_at FROM bracket_matches WHERE id = ?",
        )
        .bind(match_id)
        .fetch_optional(&mut *tx)
        .await?;
        let m = m.ok_or(Error::NotFound("Match"))?;

        let winner_id = m.winner_id.ok_or_else(|| {
            Error::StateConflict("match winner has not been determined".to_string())
        })?;

        let completed_at = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE bracket_matches SET status = ?, completed_at = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(MatchStatus::Completed.to_str_name())
        .bind(&completed_at)
        .bind(match_id)
        .execute(&mut *tx)
        .await?;

        let dest = progression::next_slot(m.round as i32, m.match_number as i32);
        let update = match dest.slot {
            Slot::First => sqlx::query(
                "UPDATE bracket_matches SET team1_id = ?, updated_at = datetime('now') WHERE bracket_id = ? AND round = ? AND match_number = ?",
            ),
            Slot::Second => sqlx::query(
                "UPDATE bracket_matches SET team2_id = ?, updated_at = datetime('now') WHERE bracket_id = ? AND round = ? AND match_number = ?",
            ),
        }
        .bind(winner_id)
        .bind(m.bracket_id)
        .bind(dest.round)
        .bind(dest.match_number)
        .execute(&mut *tx)
        .await?;

        // No destination row: this was the final.
        let is_final = update.rows_affected() == 0;
        let mut rating_update = None;

        if is_final {
            let tournament_id: i64 = sqlx::query_scalar(
                "SELECT tournament_id FROM tournament_brackets WHERE id = ?",
            )
            .bind(m.bracket_id)
            .fetch_one(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE tournaments SET status = 'completed', updated_at = datetime('now') WHERE id = ?",
            )
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

            let loser_id = [m.team1_id, m.team2_id]
                .into_iter()
                .flatten()
                .find(|&id| id != winner_id);

            // A walkover final has no loser to rate.
            if let Some(loser_id) = loser_id {
                rating_update = Some(rate_teams_tx(&mut tx, winner_id, loser_id).await?);
            }

            tracing::info!(tournament_id, winner_id, "tournament decided");
        }

        tx.commit().await?;

        Ok(MatchCompletion {
            match_id,
            winner_id,
            advanced_to: (!is_final).then_some(dest),
            tournament_complete: is_final,
            rating: rating_update,
        })
    }

    // ── Group stage ───────────────────────────────────────────────────

    /// Create the group stage: 16 teams drawn at random into groups A-D,
    /// each group playing all-vs-all. Destructively replaces any previous
    /// group matches for the tournament.
    pub async fn create_group_stage(
        &self,
        tournament_id: i64,
    ) -> Result<BTreeMap<String, Vec<i64>>, Error> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM tournaments WHERE id = ?")
            .bind(tournament_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(Error::NotFound("Tournament"));
        }

        let mut team_ids = self.approved_team_ids(tournament_id).await?;

        let needed = GROUP_NAMES.len() * 4;
        if team_ids.len() < needed {
            return Err(Error::Validation(format!(
                "group stage needs at least {needed} approved teams, got {}",
                team_ids.len()
            )));
        }

        {
            use rand::seq::SliceRandom;
            let mut rng = rand::thread_rng();
            team_ids.shuffle(&mut rng);
        }

        let mut groups: BTreeMap<String, Vec<i64>> = BTreeMap::new();
        for (i, &team_id) in team_ids.iter().take(needed).enumerate() {
            groups
                .entry(GROUP_NAMES[i % GROUP_NAMES.len()].to_string())
                .or_default()
                .push(team_id);
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM group_stage_matches WHERE tournament_id = ?")
            .bind(tournament_id)
            .execute(&mut *tx)
            .await?;

        for (group_name, members) in &groups {
            for i in 0..members.len() {
                for j in (i + 1)..members.len() {
                    sqlx::query(
                        "INSERT INTO group_stage_matches (tournament_id, group_name, team1_id, team2_id) VALUES (?, ?, ?, ?)",
                    )
                    .bind(tournament_id)
                    .bind(group_name)
                    .bind(members[i])
                    .bind(members[j])
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;

        tracing::info!(tournament_id, "group stage created");

        Ok(groups)
    }

    /// Record a group match result in place.
    pub async fn update_group_match(
        &self,
        tournament_id: i64,
        match_id: i64,
        team1_score: i64,
        team2_score: i64,
        played: bool,
    ) -> Result<(), Error> {
        let result = sqlx::query(
            "UPDATE group_stage_matches SET team1_score = ?, team2_score = ?, played = ?, updated_at = datetime('now') WHERE id = ? AND tournament_id = ?",
        )
        .bind(team1_score)
        .bind(team2_score)
        .bind(played)
        .bind(match_id)
        .bind(tournament_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Group match"));
        }
        Ok(())
    }

    /// Group stage snapshot with standings recomputed from the stored
    /// matches on every read.
    pub async fn get_group_stage(&self, tournament_id: i64) -> Result<GroupStageView, Error> {
        let teams = sqlx::query_as::<_, GroupTeam>(
            r#"
            SELECT tr.team_id, t.name
            FROM tournament_registrations tr
            JOIN teams t ON tr.team_id = t.id
            WHERE tr.tournament_id = ? AND tr.status IN ('approved', 'confirmed')
            ORDER BY tr.registered_at, tr.id
        "#,
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await?;

        let matches = self.group_matches(tournament_id).await?;
        let standings = standings::compute_standings(&to_group_matches(&matches), &GROUP_NAMES);

        Ok(GroupStageView {
            teams,
            matches,
            standings,
        })
    }

    /// Close the group stage: take each group's top 2 and seed them into
    /// quarterfinals with the cross-group pattern, plus empty semifinal
    /// and final placeholders.
    ///
    /// Validation happens before any write, so a failed finalization
    /// leaves the existing bracket matches untouched.
    pub async fn finalize_group_stage(
        &self,
        tournament_id: i64,
    ) -> Result<FinalizeSummary, Error> {
        let mut tx = self.pool.begin().await?;

        let matches: Vec<GroupStageMatch> = sqlx::query_as(
            "SELECT id, tournament_id, group_name, team1_id, team2_id, team1_score, team2_score, played, created_at, updated_at FROM group_stage_matches WHERE tournament_id = ? ORDER BY group_name, id",
        )
        .bind(tournament_id)
        .fetch_all(&mut *tx)
        .await?;

        let standings = standings::compute_standings(&to_group_matches(&matches), &GROUP_NAMES);
        let qualified = standings::qualifiers(&standings, &GROUP_NAMES);

        let pairs = progression::playoff_pairs(&qualified)
            .map_err(|e| Error::Validation(e.to_string()))?;

        let bracket_id: Option<i64> =
            sqlx::query_scalar("SELECT id FROM tournament_brackets WHERE tournament_id = ?")
                .bind(tournament_id)
                .fetch_optional(&mut *tx)
                .await?;
        let bracket_id = bracket_id.ok_or_else(|| {
            Error::StateConflict("generate the tournament bracket before finalizing".to_string())
        })?;

        sqlx::query("DELETE FROM bracket_matches WHERE bracket_id = ?")
            .bind(bracket_id)
            .execute(&mut *tx)
            .await?;

        for (i, (team1_id, team2_id)) in pairs.into_iter().enumerate() {
            sqlx::query(
                "INSERT INTO bracket_matches (bracket_id, round, match_number, team1_id, team2_id, status) VALUES (?, 1, ?, ?, ?, 'pending')",
            )
            .bind(bracket_id)
            .bind(i as i64 + 1)
            .bind(team1_id)
            .bind(team2_id)
            .execute(&mut *tx)
            .await?;
        }

        // Empty semifinals and final, filled by advancement.
        for match_number in 1..=2 {
            sqlx::query(
                "INSERT INTO bracket_matches (bracket_id, round, match_number, status) VALUES (?, 2, ?, 'pending')",
            )
            .bind(bracket_id)
            .bind(match_number)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            "INSERT INTO bracket_matches (bracket_id, round, match_number, status) VALUES (?, 3, 1, 'pending')",
        )
        .bind(bracket_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(tournament_id, bracket_id, "group stage finalized into playoffs");

        Ok(FinalizeSummary {
            qualified_team_ids: qualified,
            bracket_id,
        })
    }

    async fn group_matches(
        &self,
        tournament_id: i64,
    ) -> Result<Vec<GroupStageMatch>, sqlx::Error> {
        sqlx::query_as::<_, GroupStageMatch>(
            "SELECT id, tournament_id, group_name, team1_id, team2_id, team1_score, team2_score, played, created_at, updated_at FROM group_stage_matches WHERE tournament_id = ? ORDER BY group_name, id",
        )
        .bind(tournament_id)
        .fetch_all(&self.pool)
        .await
    }

    // ── Ratings ───────────────────────────────────────────────────────

    /// Rate a decided match between two teams and persist both the Elo
    /// rating and the points/level progression.
    pub async fn apply_match_rating(
        &self,
        winner_id: i64,
        loser_id: i64,
    ) -> Result<RatingUpdate, Error> {
        let mut tx = self.pool.begin().await?;
        let update = rate_teams_tx(&mut tx, winner_id, loser_id).await?;
        tx.commit().await?;
        Ok(update)
    }
}

/// Shared rating write path: used by the standalone rating endpoint and
/// by final-match completion.
async fn rate_teams_tx(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    winner_id: i64,
    loser_id: i64,
) -> Result<RatingUpdate, Error> {
    let winner: Option<(f64, i64)> =
        sqlx::query_as("SELECT rating, points FROM teams WHERE id = ?")
            .bind(winner_id)
            .fetch_optional(&mut **tx)
            .await?;
    let (winner_rating, winner_points) = winner.ok_or(Error::NotFound("Winner team"))?;

    let loser: Option<(f64, i64)> =
        sqlx::query_as("SELECT rating, points FROM teams WHERE id = ?")
            .bind(loser_id)
            .fetch_optional(&mut **tx)
            .await?;
    let (loser_rating, loser_points) = loser.ok_or(Error::NotFound("Loser team"))?;

    let update = rating::rate_match(winner_rating, loser_rating);
    let (winner_gain, loser_loss) =
        rating::points_change(winner_points as i32, loser_points as i32);
    let new_winner_points = rating::apply_points(winner_points as i32, winner_gain);
    let new_loser_points = rating::apply_points(loser_points as i32, loser_loss);

    sqlx::query(
        "UPDATE teams SET rating = ?, points = ?, level = ?, wins = wins + 1 WHERE id = ?",
    )
    .bind(update.winner_new)
    .bind(new_winner_points)
    .bind(rating::level_from_points(new_winner_points))
    .bind(winner_id)
    .execute(&mut **tx)
    .await?;

    sqlx::query(
        "UPDATE teams SET rating = ?, points = ?, level = ?, losses = losses + 1 WHERE id = ?",
    )
    .bind(update.loser_new)
    .bind(new_loser_points)
    .bind(rating::level_from_points(new_loser_points))
    .bind(loser_id)
    .execute(&mut **tx)
    .await?;

    Ok(update)
}

fn to_group_matches(rows: &[GroupStageMatch]) -> Vec<GroupMatch> {
    rows.iter()
        .map(|m| GroupMatch {
            id: m.id,
            group_name: m.group_name.clone(),
            team1_id: m.team1_id,
            team2_id: m.team2_id,
            team1_score: m.team1_score as i32,
            team2_score: m.team2_score as i32,
            played: m.played,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::new("sqlite::memory:").await.unwrap()
    }

    /// Tournament with `n` teams registered and approved, in order.
    async fn tournament_with_teams(
        db: &Database,
        n: usize,
        max_teams: Option<i64>,
    ) -> (i64, Vec<i64>) {
        let t = db.create_tournament("Cup", max_teams).await.unwrap();
        let mut team_ids = Vec::new();
        for i in 0..n {
            let team = db.create_team(&format!("Team {i}")).await.unwrap();
            let reg = db.register_team(t.id, team.id).await.unwrap();
            db.set_registration_status(reg.id, "approved").await.unwrap();
            team_ids.push(team.id);
        }
        (t.id, team_ids)
    }

    fn find_match<'a>(
        matches: &'a [BracketMatchView],
        round: i64,
        number: i64,
    ) -> &'a BracketMatchView {
        matches
            .iter()
            .find(|m| m.round == round && m.match_number == number)
            .unwrap()
    }

    #[tokio::test]
    async fn test_team_crud_defaults() {
        let db = test_db().await;
        let team = db.create_team("Night Raid").await.unwrap();
        assert_eq!(team.rating, 1000.0);
        assert_eq!(team.points, 200);
        assert_eq!(team.level, 2);
        assert_eq!(team.wins, 0);

        let fetched = db.get_team(team.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Night Raid");
        assert!(db.get_team(999).await.unwrap().is_none());

        db.create_team("Second").await.unwrap();
        assert_eq!(db.list_teams().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_tournament_crud() {
        let db = test_db().await;
        let t = db.create_tournament("Spring Cup", Some(16)).await.unwrap();
        assert_eq!(t.status, "upcoming");
        assert!(t.registration_open);
        assert_eq!(t.max_teams, Some(16));

        assert!(db.update_tournament_status(t.id, "active").await.unwrap());
        let t = db.get_tournament(t.id).await.unwrap().unwrap();
        assert_eq!(t.status, "active");

        assert!(db.set_registration_open(t.id, false).await.unwrap());
        let t = db.get_tournament(t.id).await.unwrap().unwrap();
        assert!(!t.registration_open);

        assert!(!db.update_tournament_status(999, "active").await.unwrap());
    }

    #[tokio::test]
    async fn test_registration_eligibility_and_order() {
        let db = test_db().await;
        let t = db.create_tournament("Cup", None).await.unwrap();
        let a = db.create_team("A").await.unwrap();
        let b = db.create_team("B").await.unwrap();
        let c = db.create_team("C").await.unwrap();

        let ra = db.register_team(t.id, a.id).await.unwrap();
        let rb = db.register_team(t.id, b.id).await.unwrap();
        let rc = db.register_team(t.id, c.id).await.unwrap();
        assert_eq!(ra.status, "pending");

        // pending rows are not eligible
        assert!(db.approved_team_ids(t.id).await.unwrap().is_empty());

        db.set_registration_status(ra.id, "approved").await.unwrap();
        db.set_registration_status(rb.id, "rejected").await.unwrap();
        db.set_registration_status(rc.id, "confirmed").await.unwrap();

        // approved + confirmed, in registration order
        assert_eq!(db.approved_team_ids(t.id).await.unwrap(), vec![a.id, c.id]);
    }

    #[tokio::test]
    async fn test_generate_bracket_full_16() {
        let db = test_db().await;
        let (tid, teams) = tournament_with_teams(&db, 16, Some(16)).await;

        let summary = db
            .generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        assert_eq!(summary.bracket_size, 16);
        assert_eq!(summary.rounds, 4);
        assert_eq!(summary.total_teams, 16);

        let view = db.get_bracket(tid).await.unwrap().unwrap();
        assert_eq!(view.matches.len(), 15);
        assert_eq!(view.matches.iter().filter(|m| m.round == 4).count(), 1);

        let first = find_match(&view.matches, 1, 1);
        assert_eq!(first.team1_id, Some(teams[0]));
        assert_eq!(first.team2_id, Some(teams[1]));
        assert_eq!(first.status, "pending");
    }

    #[tokio::test]
    async fn test_generate_bracket_walkovers() {
        let db = test_db().await;
        let (tid, teams) = tournament_with_teams(&db, 5, Some(8)).await;

        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let view = db.get_bracket(tid).await.unwrap().unwrap();

        let third = find_match(&view.matches, 1, 3);
        assert_eq!(third.status, "walkover");
        assert_eq!(third.winner_id, Some(teams[4]));
        assert_eq!(third.team2_id, None);

        let fourth = find_match(&view.matches, 1, 4);
        assert_eq!(fourth.status, "pending");
        assert_eq!(fourth.team1_id, None);
        assert_eq!(fourth.team2_id, None);
    }

    #[tokio::test]
    async fn test_generate_bracket_errors() {
        let db = test_db().await;
        let err = db
            .generate_bracket(999, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let t = db.create_tournament("Empty", Some(8)).await.unwrap();
        let err = db
            .generate_bracket(t.id, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_regenerate_replaces_matches() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 4, Some(4)).await;

        let first = db
            .generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let second = db
            .generate_bracket(tid, BracketFormat::SingleElimination, "minimal")
            .await
            .unwrap();

        // Same bracket row, fresh matches, updated style
        assert_eq!(first.bracket_id, second.bracket_id);
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        assert_eq!(view.style, "minimal");
        assert_eq!(view.matches.len(), 3);
    }

    #[tokio::test]
    async fn test_update_match_score_derives_winner() {
        let db = test_db().await;
        let (tid, teams) = tournament_with_teams(&db, 4, Some(4)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        let m1 = find_match(&view.matches, 1, 1);

        let update = db.update_match_score(m1.id, 2, 1).await.unwrap();
        assert_eq!(update.winner_id, Some(teams[0]));

        // Tie clears the winner
        let update = db.update_match_score(m1.id, 1, 1).await.unwrap();
        assert_eq!(update.winner_id, None);

        let err = db.update_match_score(9999, 1, 0).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_complete_match_requires_winner() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 4, Some(4)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        let m1 = find_match(&view.matches, 1, 1);

        let err = db.complete_match(m1.id).await.unwrap_err();
        assert!(matches!(err, Error::StateConflict(_)));

        let err = db.complete_match(9999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_completion_advances_in_any_order() {
        let db = test_db().await;
        let (tid, teams) = tournament_with_teams(&db, 8, Some(8)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let view = db.get_bracket(tid).await.unwrap().unwrap();

        // Decide round-1 matches 3 and 4, then complete 4 before 3:
        // both must land in round 2 match 2, on their own slots.
        let m3 = find_match(&view.matches, 1, 3);
        let m4 = find_match(&view.matches, 1, 4);
        db.update_match_score(m3.id, 2, 0).await.unwrap();
        db.update_match_score(m4.id, 0, 2).await.unwrap();

        let done4 = db.complete_match(m4.id).await.unwrap();
        assert_eq!(
            done4.advanced_to,
            Some(NextSlot {
                round: 2,
                match_number: 2,
                slot: Slot::Second
            })
        );
        assert!(!done4.tournament_complete);

        let done3 = db.complete_match(m3.id).await.unwrap();
        assert_eq!(
            done3.advanced_to,
            Some(NextSlot {
                round: 2,
                match_number: 2,
                slot: Slot::First
            })
        );

        let view = db.get_bracket(tid).await.unwrap().unwrap();
        let r2m2 = find_match(&view.matches, 2, 2);
        assert_eq!(r2m2.team1_id, Some(teams[4])); // winner of match 3
        assert_eq!(r2m2.team2_id, Some(teams[7])); // winner of match 4

        let r1m3 = find_match(&view.matches, 1, 3);
        assert_eq!(r1m3.status, "completed");
    }

    #[tokio::test]
    async fn test_final_completes_tournament_and_rates_teams() {
        let db = test_db().await;
        let (tid, teams) = tournament_with_teams(&db, 2, Some(2)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        assert_eq!(view.matches.len(), 1);
        let final_match = &view.matches[0];

        db.update_match_score(final_match.id, 3, 2).await.unwrap();
        let done = db.complete_match(final_match.id).await.unwrap();

        assert!(done.tournament_complete);
        assert_eq!(done.advanced_to, None);
        assert_eq!(done.winner_id, teams[0]);

        let rating = done.rating.unwrap();
        assert!((rating.winner_new - 1016.0).abs() < 1e-9);
        assert!((rating.loser_new - 984.0).abs() < 1e-9);

        let t = db.get_tournament(tid).await.unwrap().unwrap();
        assert_eq!(t.status, "completed");

        let winner = db.get_team(teams[0]).await.unwrap().unwrap();
        assert_eq!(winner.wins, 1);
        assert_eq!(winner.points, 250);
        let loser = db.get_team(teams[1]).await.unwrap().unwrap();
        assert_eq!(loser.losses, 1);
        assert_eq!(loser.points, 170);
    }

    #[tokio::test]
    async fn test_create_group_stage_requires_16() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 10, None).await;
        let err = db.create_group_stage(tid).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = db.create_group_stage(999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_group_stage_layout() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 16, None).await;

        let groups = db.create_group_stage(tid).await.unwrap();
        assert_eq!(groups.len(), 4);
        assert!(groups.values().all(|members| members.len() == 4));

        // 4 teams all-vs-all: 6 matches per group
        let view = db.get_group_stage(tid).await.unwrap();
        assert_eq!(view.matches.len(), 24);
        for group in GROUP_NAMES {
            assert_eq!(
                view.matches.iter().filter(|m| m.group_name == group).count(),
                6
            );
        }
        assert!(view.matches.iter().all(|m| !m.played));
        assert_eq!(view.teams.len(), 16);

        // Every group table exists, zeroed, with 4 rows
        for group in GROUP_NAMES {
            let table = &view.standings[group];
            assert_eq!(table.len(), 4);
            assert!(table.iter().all(|s| s.points == 0));
        }
    }

    #[tokio::test]
    async fn test_update_group_match_and_standings() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 16, None).await;
        db.create_group_stage(tid).await.unwrap();

        let view = db.get_group_stage(tid).await.unwrap();
        let m = view
            .matches
            .iter()
            .find(|m| m.group_name == "A")
            .unwrap();

        db.update_group_match(tid, m.id, 3, 1, true).await.unwrap();

        let view = db.get_group_stage(tid).await.unwrap();
        let table = &view.standings["A"];
        let leader = &table[0];
        assert_eq!(leader.team_id, m.team1_id);
        assert_eq!(leader.points, 3);
        assert_eq!(leader.goal_difference, 2);

        let err = db.update_group_match(tid, 9999, 1, 0, true).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    /// Play out a group decisively: earlier-listed members beat everyone
    /// after them, so the group order is the member order.
    async fn play_out_groups(db: &Database, tid: i64, groups: &BTreeMap<String, Vec<i64>>) {
        let view = db.get_group_stage(tid).await.unwrap();
        for m in &view.matches {
            let members = &groups[&m.group_name];
            let rank1 = members.iter().position(|&t| t == m.team1_id).unwrap();
            let rank2 = members.iter().position(|&t| t == m.team2_id).unwrap();
            let (s1, s2) = if rank1 < rank2 { (2, 0) } else { (0, 2) };
            db.update_group_match(tid, m.id, s1, s2, true).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_finalize_group_stage_seeds_cross_pattern() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 16, Some(16)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();
        let groups = db.create_group_stage(tid).await.unwrap();
        play_out_groups(&db, tid, &groups).await;

        let summary = db.finalize_group_stage(tid).await.unwrap();
        let q = &summary.qualified_team_ids;
        assert_eq!(q.len(), 8);
        // Qualifiers come back in group order: A1 A2 B1 B2 C1 C2 D1 D2
        assert_eq!(q[0], groups["A"][0]);
        assert_eq!(q[1], groups["A"][1]);
        assert_eq!(q[6], groups["D"][0]);

        let view = db.get_bracket(tid).await.unwrap().unwrap();
        // 4 quarterfinals + 2 semifinals + 1 final
        assert_eq!(view.matches.len(), 7);

        let qf1 = find_match(&view.matches, 1, 1);
        assert_eq!((qf1.team1_id, qf1.team2_id), (Some(q[0]), Some(q[3])));
        let qf2 = find_match(&view.matches, 1, 2);
        assert_eq!((qf2.team1_id, qf2.team2_id), (Some(q[4]), Some(q[7])));
        let qf3 = find_match(&view.matches, 1, 3);
        assert_eq!((qf3.team1_id, qf3.team2_id), (Some(q[2]), Some(q[1])));
        let qf4 = find_match(&view.matches, 1, 4);
        assert_eq!((qf4.team1_id, qf4.team2_id), (Some(q[6]), Some(q[5])));

        let sf = find_match(&view.matches, 2, 1);
        assert_eq!(sf.team1_id, None);
        let f = find_match(&view.matches, 3, 1);
        assert_eq!(f.status, "pending");
    }

    #[tokio::test]
    async fn test_finalize_without_bracket_conflicts() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 16, None).await;
        let groups = db.create_group_stage(tid).await.unwrap();
        play_out_groups(&db, tid, &groups).await;

        let err = db.finalize_group_stage(tid).await.unwrap_err();
        assert!(matches!(err, Error::StateConflict(_)));
    }

    #[tokio::test]
    async fn test_finalize_with_too_few_qualifiers_writes_nothing() {
        let db = test_db().await;
        let (tid, _) = tournament_with_teams(&db, 16, Some(16)).await;
        db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
            .await
            .unwrap();

        // No group stage exists: zero qualifiers
        let err = db.finalize_group_stage(tid).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        // The generated bracket is untouched
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        assert_eq!(view.matches.len(), 15);
        assert_eq!(
            view.matches.iter().filter(|m| m.team1_id.is_some()).count(),
            8
        );
    }

    #[tokio::test]
    async fn test_apply_match_rating() {
        let db = test_db().await;
        let winner = db.create_team("W").await.unwrap();
        let loser = db.create_team("L").await.unwrap();

        let update = db.apply_match_rating(winner.id, loser.id).await.unwrap();
        assert!((update.winner_delta - 16.0).abs() < 1e-9);
        assert!((update.loser_delta + 16.0).abs() < 1e-9);

        let w = db.get_team(winner.id).await.unwrap().unwrap();
        assert!((w.rating - 1016.0).abs() < 1e-9);
        assert_eq!(w.wins, 1);
        assert_eq!(w.points, 250);
        assert_eq!(w.level, 2);

        let l = db.get_team(loser.id).await.unwrap().unwrap();
        assert!((l.rating - 984.0).abs() < 1e-9);
        assert_eq!(l.losses, 1);
        assert_eq!(l.points, 170);

        let err = db.apply_match_rating(winner.id, 999).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let leaderboard = db.list_teams_by_rating().await.unwrap();
        assert_eq!(leaderboard[0].id, winner.id);
    }
}
