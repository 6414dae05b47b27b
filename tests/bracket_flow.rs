use std::collections::HashSet;

use tgm_tournament_engine::*;

fn catalog() -> PresetCatalog {
    PresetCatalog::builtin()
}

fn player(idx: usize) -> String {
    format!("P{idx:02}")
}

/// Lower player number plays faster, so every stage ends in number order.
fn skill(name: &str) -> i64 {
    name[1..].parse().unwrap()
}

fn play(roster: &StageRoster) -> Vec<StageResultEntry> {
    assert_eq!(roster.entries.len(), roster.num_players, "{} is not full", roster.stage_name);
    let scores: Vec<StageScore> = roster
        .entries
        .iter()
        .map(|entry| {
            let diff = skill(&entry.name) * 1_000;
            StageScore {
                name: entry.name.clone(),
                level: 999,
                grade: Some(Grade::GM),
                time: Some((450_000 + diff) as u64),
                time_diff_best: Some(diff),
            }
        })
        .collect();
    get_stage_result(&scores).unwrap()
}

/// Round-robin group assignment, so earlier groups take the extra players.
fn participants(count: usize, groups: usize) -> Vec<Participant> {
    (0..count)
        .map(|idx| Participant {
            name: player(idx),
            group: Some(idx % groups),
        })
        .collect()
}

fn dependency_data(
    metadata: &CompetitionMetadata,
    round_index: usize,
    participants: &[Participant],
    results: &[Vec<Vec<StageResultEntry>>],
) -> Vec<RoundDependencyData> {
    get_dependency_for_round(metadata, round_index)
        .unwrap()
        .into_iter()
        .map(|dep| match dep {
            RoundDependencyKind::FirstRoundEntry => RoundDependencyData::FirstRoundEntry {
                participants: participants.to_vec(),
            },
            RoundDependencyKind::TournamentRoundResult { round_index } => {
                RoundDependencyData::TournamentRoundResult {
                    round_index,
                    stage_results: results[round_index].clone(),
                }
            }
            RoundDependencyKind::QualifierRoundResult => panic!("not a qualifier competition"),
        })
        .collect()
}

/// Plays every round in order and returns the final stage result.
fn run_tournament(preset: &str, num_players: usize) -> Vec<StageResultEntry> {
    let metadata = build_metadata(
        "Flow Cup",
        Some(num_players),
        &MetadataOptions::Preset {
            name: Some(preset.to_string()),
            kind: CompetitionKind::Tournament,
        },
        &catalog(),
    )
    .unwrap();
    let entrants = participants(num_players, metadata.rounds[0].stages.len());
    let mut results: Vec<Vec<Vec<StageResultEntry>>> = Vec::new();

    for (round_index, round) in metadata.rounds.iter().enumerate() {
        let data = dependency_data(&metadata, round_index, &entrants, &results);
        let rosters = setup_round(&metadata, round_index, &data)
            .unwrap()
            .ready()
            .unwrap_or_else(|| panic!("{preset}/{num_players}: {} not ready", round.name));

        assert_eq!(rosters.len(), round.stages.len());
        let names: HashSet<&str> = rosters
            .iter()
            .flat_map(|r| r.entries.iter().map(|e| e.name.as_str()))
            .collect();
        assert_eq!(names.len(), round.num_players(), "{preset}/{num_players}: {}", round.name);

        let round_results: Vec<Vec<StageResultEntry>> = rosters.iter().map(play).collect();
        let finalized = finalize_round(&metadata, round_index, &round_results)
            .unwrap()
            .ready()
            .unwrap();
        let RoundFinalizeResult::SupplementComparisons { comparisons } = finalized else {
            panic!("tournament rounds produce supplement comparisons");
        };
        assert_eq!(comparisons.len(), round.supplement_comparisons.len());
        for (comparison, definition) in comparisons.iter().zip(&round.supplement_comparisons) {
            assert_eq!(comparison.entries.len(), definition.num_players);
        }
        results.push(round_results);
    }
    results.pop().unwrap().remove(0)
}

#[test]
fn test_wildcard12_every_supported_count() {
    for num_players in 8..=12 {
        let final_result = run_tournament("wildcard12", num_players);
        assert_eq!(final_result[0].name(), "P00");
        assert_eq!(final_result[0].rank, 1);
    }
}

#[test]
fn test_single16_every_supported_count() {
    for num_players in 13..=16 {
        let final_result = run_tournament("single16", num_players);
        assert_eq!(final_result.len(), 4);
        assert_eq!(final_result[0].name(), "P00");
    }
}

#[test]
fn test_fed_round_waits_for_partial_results() {
    let metadata = build_metadata(
        "Flow Cup",
        Some(12),
        &MetadataOptions::Preset {
            name: Some("wildcard12".to_string()),
            kind: CompetitionKind::Tournament,
        },
        &catalog(),
    )
    .unwrap();
    let entrants = participants(12, metadata.rounds[0].stages.len());
    let data = dependency_data(&metadata, 0, &entrants, &[]);
    let rosters = setup_round(&metadata, 0, &data).unwrap().ready().unwrap();
    let mut first_round: Vec<Vec<StageResultEntry>> = rosters.iter().map(play).collect();
    first_round[2].pop();

    let data = dependency_data(&metadata, 1, &entrants, &[first_round]);
    assert!(!setup_round(&metadata, 1, &data).unwrap().is_ready());
    assert!(!setup_round(&metadata, 2, &[]).unwrap().is_ready());
}

#[test]
fn test_qualifier8_flow() {
    let metadata = build_metadata(
        "Qualifier Cup",
        Some(8),
        &MetadataOptions::Preset {
            name: None,
            kind: CompetitionKind::QualifierFinal,
        },
        &catalog(),
    )
    .unwrap();
    assert_eq!(metadata.preset.as_deref(), Some("qualifier8"));
    assert_eq!(
        get_dependency_for_round(&metadata, 1).unwrap(),
        vec![RoundDependencyKind::QualifierRoundResult]
    );

    let entrants: Vec<Participant> = (0..8)
        .map(|idx| Participant {
            name: player(idx),
            group: Some(idx),
        })
        .collect();
    let data = vec![RoundDependencyData::FirstRoundEntry { participants: entrants }];
    let heats = setup_round(&metadata, 0, &data).unwrap().ready().unwrap();
    assert_eq!(heats.len(), 6);
    let heat_results: Vec<Vec<StageResultEntry>> = heats.iter().map(play).collect();

    let provisional = qualifier_standings(&metadata.rounds[0], &heat_results[..2]).unwrap();
    assert_eq!(provisional.len(), 8);

    let RoundFinalizeResult::Qualifier { result, .. } = finalize_round(&metadata, 0, &heat_results)
        .unwrap()
        .ready()
        .unwrap()
    else {
        panic!("expected qualifier standings");
    };
    let points: Vec<(&str, u32)> = result.iter().map(|e| (e.name.as_str(), e.points)).collect();
    assert_eq!(
        points,
        vec![
            ("P00", 12),
            ("P01", 10),
            ("P02", 9),
            ("P04", 8),
            ("P03", 7),
            ("P05", 6),
            ("P06", 5),
            ("P07", 3),
        ]
    );

    let data = vec![RoundDependencyData::QualifierRoundResult { result }];
    let final_stage = setup_round(&metadata, 1, &data).unwrap().ready().unwrap();
    let seeded: Vec<(&str, i64)> = final_stage[0]
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.handicap))
        .collect();
    assert_eq!(seeded, vec![("P00", -10), ("P01", -5), ("P02", 0), ("P04", 0)]);

    let final_result = play(&final_stage[0]);
    let outcome = finalize_round(&metadata, 1, &[final_result]).unwrap().ready().unwrap();
    assert_eq!(
        outcome,
        RoundFinalizeResult::SupplementComparisons { comparisons: Vec::new() }
    );
}

#[test]
fn test_manual_games() {
    let metadata = build_metadata("Casuals", None, &MetadataOptions::Manual { num_games: 3 }, &catalog()).unwrap();
    assert_eq!(metadata.rounds.len(), 3);
    for round_index in 0..3 {
        assert!(get_dependency_for_round(&metadata, round_index).unwrap().is_empty());
        let rosters = setup_round(&metadata, round_index, &[]).unwrap().ready().unwrap();
        assert_eq!(rosters.len(), 1);
        assert!(rosters[0].entries.is_empty());
    }
    assert!(setup_round(&metadata, 3, &[]).is_err());
}
