// HTTP API routes: team/tournament/registration glue plus the bracket,
// group stage, and rating engine operations.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::bracket::BracketFormat;
use crate::db::Database;
use crate::error::Error;
use crate::metrics;

// ── Request types ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CreateTournamentRequest {
    pub name: String,
    pub max_teams: Option<i64>,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Deserialize)]
pub struct RegistrationOpenRequest {
    pub open: bool,
}

#[derive(Deserialize)]
pub struct RegisterTeamRequest {
    pub team_id: i64,
}

#[derive(Deserialize)]
pub struct GenerateBracketRequest {
    pub format: Option<String>,
    pub style: Option<String>,
}

#[derive(Deserialize)]
pub struct MatchScoreRequest {
    pub team1_score: i64,
    pub team2_score: i64,
}

#[derive(Deserialize)]
pub struct GroupMatchResultRequest {
    pub team1_score: i64,
    pub team2_score: i64,
    pub played: bool,
}

#[derive(Deserialize)]
pub struct RateMatchRequest {
    pub winner_id: i64,
    pub loser_id: i64,
}

const TOURNAMENT_STATUSES: [&str; 3] = ["upcoming", "active", "completed"];
const REGISTRATION_STATUSES: [&str; 4] = ["pending", "approved", "confirmed", "rejected"];

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
}

// ── Router ────────────────────────────────────────────────────────────

pub fn router(db: Arc<Database>) -> Router {
    let state = AppState { db };

    Router::new()
        // Teams
        .route("/api/teams", get(list_teams).post(create_team))
        .route("/api/teams/{id}", get(get_team))
        // Tournaments
        .route(
            "/api/tournaments",
            get(list_tournaments).post(create_tournament),
        )
        .route("/api/tournaments/{id}", get(get_tournament))
        .route("/api/tournaments/{id}/status", put(update_tournament_status))
        .route(
            "/api/tournaments/{id}/registration",
            put(set_registration_open),
        )
        // Registrations
        .route(
            "/api/tournaments/{id}/registrations",
            get(list_registrations).post(register_team),
        )
        .route(
            "/api/registrations/{id}/status",
            put(set_registration_status),
        )
        // Bracket
        .route(
            "/api/tournaments/{id}/bracket",
            get(get_bracket).post(generate_bracket),
        )
        // Matches
        .route("/api/matches/{id}", get(get_match))
        .route("/api/matches/{id}/score", put(update_match_score))
        .route("/api/matches/{id}/complete", post(complete_match))
        // Group stage
        .route(
            "/api/tournaments/{id}/group-stage",
            get(get_group_stage).post(create_group_stage),
        )
        .route(
            "/api/tournaments/{id}/group-stage/matches/{match_id}",
            put(update_group_match),
        )
        .route(
            "/api/tournaments/{id}/group-stage/finalize",
            post(finalize_group_stage),
        )
        // Ratings
        .route("/api/ratings", get(list_ratings))
        .route("/api/ratings/match", post(rate_match))
        // Metrics
        .route("/metrics", get(get_metrics))
        .with_state(state)
}

// ── Team handlers ─────────────────────────────────────────────────────

async fn list_teams(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let teams = state.db.list_teams().await?;
    Ok(Json(json!(teams)))
}

async fn create_team(
    State(state): State<AppState>,
    Json(req): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.name.trim().is_empty() {
        return Err(Error::Validation("name is required".to_string()));
    }
    let team = state.db.create_team(req.name.trim()).await?;
    Ok((StatusCode::CREATED, Json(json!(team))))
}

async fn get_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let team = state.db.get_team(id).await?.ok_or(Error::NotFound("Team"))?;
    Ok(Json(json!(team)))
}

// ── Tournament handlers ───────────────────────────────────────────────

async fn list_tournaments(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let tournaments = state.db.list_tournaments().await?;
    Ok(Json(json!(tournaments)))
}

async fn create_tournament(
    State(state): State<AppState>,
    Json(req): Json<CreateTournamentRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.name.trim().is_empty() {
        return Err(Error::Validation("name is required".to_string()));
    }
    if let Some(max) = req.max_teams {
        if max < 2 {
            return Err(Error::Validation(
                "max_teams must be at least 2".to_string(),
            ));
        }
    }
    let tournament = state
        .db
        .create_tournament(req.name.trim(), req.max_teams)
        .await?;
    Ok((StatusCode::CREATED, Json(json!(tournament))))
}

async fn get_tournament(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let tournament = state
        .db
        .get_tournament(id)
        .await?
        .ok_or(Error::NotFound("Tournament"))?;
    Ok(Json(json!(tournament)))
}

async fn update_tournament_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, Error> {
    if !TOURNAMENT_STATUSES.contains(&req.status.as_str()) {
        return Err(Error::Validation(format!(
            "unknown tournament status '{}'",
            req.status
        )));
    }
    if !state.db.update_tournament_status(id, &req.status).await? {
        return Err(Error::NotFound("Tournament"));
    }
    Ok(Json(json!({ "success": true })))
}

async fn set_registration_open(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RegistrationOpenRequest>,
) -> Result<impl IntoResponse, Error> {
    if !state.db.set_registration_open(id, req.open).await? {
        return Err(Error::NotFound("Tournament"));
    }
    Ok(Json(json!({ "success": true })))
}

// ── Registration handlers ─────────────────────────────────────────────

async fn list_registrations(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let registrations = state.db.list_registrations(id).await?;
    Ok(Json(json!(registrations)))
}

async fn register_team(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<RegisterTeamRequest>,
) -> Result<impl IntoResponse, Error> {
    let tournament = state
        .db
        .get_tournament(id)
        .await?
        .ok_or(Error::NotFound("Tournament"))?;
    if !tournament.registration_open {
        return Err(Error::StateConflict(
            "registration is closed for this tournament".to_string(),
        ));
    }
    state
        .db
        .get_team(req.team_id)
        .await?
        .ok_or(Error::NotFound("Team"))?;

    let registration = state.db.register_team(id, req.team_id).await?;
    Ok((StatusCode::CREATED, Json(json!(registration))))
}

async fn set_registration_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, Error> {
    if !REGISTRATION_STATUSES.contains(&req.status.as_str()) {
        return Err(Error::Validation(format!(
            "unknown registration status '{}'",
            req.status
        )));
    }
    if !state.db.set_registration_status(id, &req.status).await? {
        return Err(Error::NotFound("Registration"));
    }
    Ok(Json(json!({ "success": true })))
}

// ── Bracket handlers ──────────────────────────────────────────────────

async fn generate_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<GenerateBracketRequest>,
) -> Result<impl IntoResponse, Error> {
    let format_name = req.format.as_deref().unwrap_or("single_elimination");
    let format = BracketFormat::from_str_name(format_name)
        .ok_or_else(|| Error::Validation(format!("unknown bracket format '{format_name}'")))?;
    let style = req.style.as_deref().unwrap_or("esports");

    let summary = state.db.generate_bracket(id, format, style).await?;
    metrics::BRACKETS_GENERATED_TOTAL.inc();
    Ok(Json(json!(summary)))
}

async fn get_bracket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    match state.db.get_bracket(id).await? {
        Some(view) => Ok(Json(json!(view))),
        None => Ok(Json(json!({ "bracket": null }))),
    }
}

// ── Match handlers ────────────────────────────────────────────────────

async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let m = state.db.get_match(id).await?.ok_or(Error::NotFound("Match"))?;
    Ok(Json(json!(m)))
}

async fn update_match_score(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<MatchScoreRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.team1_score < 0 || req.team2_score < 0 {
        return Err(Error::Validation("scores must be non-negative".to_string()));
    }
    let update = state
        .db
        .update_match_score(id, req.team1_score, req.team2_score)
        .await?;
    Ok(Json(json!(update)))
}

async fn complete_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let completion = state.db.complete_match(id).await?;
    metrics::MATCHES_COMPLETED_TOTAL.inc();
    if completion.tournament_complete {
        metrics::TOURNAMENTS_DECIDED_TOTAL.inc();
    }
    if completion.rating.is_some() {
        metrics::RATING_UPDATES_TOTAL.inc();
    }
    Ok(Json(json!(completion)))
}

// ── Group stage handlers ──────────────────────────────────────────────

async fn create_group_stage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let groups = state.db.create_group_stage(id).await?;
    metrics::GROUP_STAGES_CREATED_TOTAL.inc();
    Ok(Json(json!({ "success": true, "groups": groups })))
}

async fn get_group_stage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let view = state.db.get_group_stage(id).await?;
    Ok(Json(json!(view)))
}

async fn update_group_match(
    State(state): State<AppState>,
    Path((id, match_id)): Path<(i64, i64)>,
    Json(req): Json<GroupMatchResultRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.team1_score < 0 || req.team2_score < 0 {
        return Err(Error::Validation("scores must be non-negative".to_string()));
    }
    state
        .db
        .update_group_match(id, match_id, req.team1_score, req.team2_score, req.played)
        .await?;
    Ok(Json(json!({ "success": true })))
}

async fn finalize_group_stage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, Error> {
    let summary = state.db.finalize_group_stage(id).await?;
    metrics::GROUP_STAGES_FINALIZED_TOTAL.inc();
    Ok(Json(json!(summary)))
}

// ── Rating handlers ───────────────────────────────────────────────────

async fn list_ratings(State(state): State<AppState>) -> Result<impl IntoResponse, Error> {
    let teams = state.db.list_teams_by_rating().await?;
    Ok(Json(json!(teams)))
}

async fn rate_match(
    State(state): State<AppState>,
    Json(req): Json<RateMatchRequest>,
) -> Result<impl IntoResponse, Error> {
    if req.winner_id == req.loser_id {
        return Err(Error::Validation(
            "winner and loser must be different teams".to_string(),
        ));
    }
    let update = state.db.apply_match_rating(req.winner_id, req.loser_id).await?;
    metrics::RATING_UPDATES_TOTAL.inc();
    Ok(Json(json!(update)))
}

// ── Metrics ───────────────────────────────────────────────────────────

async fn get_metrics() -> impl IntoResponse {
    (StatusCode::OK, metrics::gather_metrics())
}
