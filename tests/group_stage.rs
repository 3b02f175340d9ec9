// Integration tests for the group stage: creation, result reporting,
// standings, and finalization into the playoff bracket.

use std::collections::BTreeMap;

use arena_backend::bracket::BracketFormat;
use arena_backend::db::Database;
use arena_backend::error::Error;

async fn test_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

async fn setup_tournament(db: &Database, n: usize) -> (i64, Vec<i64>) {
    let t = db.create_tournament("Regional Qualifier", Some(16)).await.unwrap();
    let mut team_ids = Vec::new();
    for i in 0..n {
        let team = db.create_team(&format!("Club {i}")).await.unwrap();
        let reg = db.register_team(t.id, team.id).await.unwrap();
        db.set_registration_status(reg.id, "confirmed").await.unwrap();
        team_ids.push(team.id);
    }
    (t.id, team_ids)
}

/// Report every group match decisively so that each group finishes in
/// member-list order.
async fn play_out_groups(db: &Database, tid: i64, groups: &BTreeMap<String, Vec<i64>>) {
    let view = db.get_group_stage(tid).await.unwrap();
    for m in &view.matches {
        let members = &groups[&m.group_name];
        let rank1 = members.iter().position(|&t| t == m.team1_id).unwrap();
        let rank2 = members.iter().position(|&t| t == m.team2_id).unwrap();
        let (s1, s2) = if rank1 < rank2 { (3, 1) } else { (1, 3) };
        db.update_group_match(tid, m.id, s1, s2, true).await.unwrap();
    }
}

#[tokio::test]
async fn group_stage_to_playoff_champion() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 16).await;

    db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
        .await
        .unwrap();
    let groups = db.create_group_stage(tid).await.unwrap();
    play_out_groups(&db, tid, &groups).await;

    // Standings reflect the played results: each group's first member
    // won all three matches.
    let view = db.get_group_stage(tid).await.unwrap();
    for (group, members) in &groups {
        let table = &view.standings[group];
        assert_eq!(table[0].team_id, members[0]);
        assert_eq!(table[0].points, 9);
        assert_eq!(table[0].wins, 3);
        assert_eq!(table[1].team_id, members[1]);
        assert_eq!(table[1].points, 6);
    }

    let summary = db.finalize_group_stage(tid).await.unwrap();
    assert_eq!(summary.qualified_team_ids.len(), 8);

    // Quarterfinals never pair two teams from the same group
    let view = db.get_bracket(tid).await.unwrap().unwrap();
    let group_of = |team: i64| {
        groups
            .iter()
            .find(|(_, members)| members.contains(&team))
            .map(|(g, _)| g.clone())
            .unwrap()
    };
    for m in view.matches.iter().filter(|m| m.round == 1) {
        let g1 = group_of(m.team1_id.unwrap());
        let g2 = group_of(m.team2_id.unwrap());
        assert_ne!(g1, g2, "quarterfinal pairs a group against itself");
    }

    // Play the playoffs through: first slot always wins.
    let mut champion = None;
    for round in 1..=3 {
        let view = db.get_bracket(tid).await.unwrap().unwrap();
        let mut ms: Vec<_> = view.matches.iter().filter(|m| m.round == round).collect();
        ms.sort_by_key(|m| m.match_number);
        for m in ms {
            db.update_match_score(m.id, 2, 1).await.unwrap();
            let done = db.complete_match(m.id).await.unwrap();
            if done.tournament_complete {
                champion = Some(done.winner_id);
            }
        }
    }

    // QF1 was A1 vs B2, and the first slot kept winning: A1 takes it all
    assert_eq!(champion, Some(groups["A"][0]));
    let t = db.get_tournament(tid).await.unwrap().unwrap();
    assert_eq!(t.status, "completed");
}

#[tokio::test]
async fn draws_split_points_in_standings() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 16).await;
    db.create_group_stage(tid).await.unwrap();

    let view = db.get_group_stage(tid).await.unwrap();
    let m = view.matches.iter().find(|m| m.group_name == "B").unwrap();
    db.update_group_match(tid, m.id, 2, 2, true).await.unwrap();

    let view = db.get_group_stage(tid).await.unwrap();
    let table = &view.standings["B"];
    for team_id in [m.team1_id, m.team2_id] {
        let row = table.iter().find(|s| s.team_id == team_id).unwrap();
        assert_eq!(row.points, 1);
        assert_eq!(row.draws, 1);
        assert_eq!(row.goal_difference, 0);
    }
}

#[tokio::test]
async fn finalize_requires_a_bracket() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 16).await;
    let groups = db.create_group_stage(tid).await.unwrap();
    play_out_groups(&db, tid, &groups).await;

    let err = db.finalize_group_stage(tid).await.unwrap_err();
    assert!(matches!(err, Error::StateConflict(_)));
}

#[tokio::test]
async fn finalize_without_group_stage_is_rejected() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 16).await;
    db.generate_bracket(tid, BracketFormat::SingleElimination, "esports")
        .await
        .unwrap();

    let err = db.finalize_group_stage(tid).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    // The pre-group bracket is still intact
    let view = db.get_bracket(tid).await.unwrap().unwrap();
    assert_eq!(view.matches.len(), 15);
}

#[tokio::test]
async fn group_stage_needs_sixteen_teams() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 12).await;
    let err = db.create_group_stage(tid).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn recreating_group_stage_resets_results() {
    let db = test_db().await;
    let (tid, _) = setup_tournament(&db, 16).await;
    db.create_group_stage(tid).await.unwrap();

    let view = db.get_group_stage(tid).await.unwrap();
    let m = &view.matches[0];
    db.update_group_match(tid, m.id, 5, 0, true).await.unwrap();

    db.create_group_stage(tid).await.unwrap();
    let view = db.get_group_stage(tid).await.unwrap();
    assert_eq!(view.matches.len(), 24);
    assert!(view.matches.iter().all(|m| !m.played));
}
