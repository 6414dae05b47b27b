//! Builds the static shape of a competition from a player count and preset.

use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::presets::{PresetCatalog, PresetDefinition, PresetRound};
use crate::snake::SnakeSeeder;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOptions {
    /// Display-only games, no advancement.
    Manual { num_games: usize },
    /// `name: None` selects a preset by player count.
    Preset {
        name: Option<String>,
        kind: CompetitionKind,
    },
}

pub fn build_metadata(
    name: &str,
    num_players: Option<usize>,
    options: &MetadataOptions,
    catalog: &PresetCatalog,
) -> EngineResult<CompetitionMetadata> {
    let metadata = match options {
        MetadataOptions::Manual { num_games } => build_manual(name, num_players, *num_games),
        MetadataOptions::Preset { name: preset_name, kind } => {
            let num_players = num_players.ok_or_else(|| {
                EngineError::InvalidInput("a preset competition needs a player count".to_string())
            })?;
            let preset = catalog.select(preset_name.as_deref(), *kind, num_players)?;
            preset.validate()?;
            let rounds = match preset.kind {
                CompetitionKind::QualifierFinal => qualifier_final_rounds(preset),
                CompetitionKind::Tournament => tournament_rounds(preset, num_players)?,
            };
            CompetitionMetadata {
                name: name.to_string(),
                num_players: Some(num_players),
                preset: Some(preset.name.clone()),
                kind: Some(preset.kind),
                rounds,
            }
        }
    };
    metadata.validate()?;
    info!(
        competition = %metadata.name,
        preset = metadata.preset.as_deref().unwrap_or("manual"),
        rounds = metadata.rounds.len(),
        "built competition metadata"
    );
    Ok(metadata)
}

fn build_manual(name: &str, num_players: Option<usize>, num_games: usize) -> CompetitionMetadata {
    let rounds = (1..=num_games)
        .map(|game| {
            let round_name = format!("Game {game}");
            RoundMetadata {
                stages: vec![StageMetadata {
                    name: round_name.clone(),
                    num_players: MANUAL_STAGE_SIZE,
                    num_winners: 0,
                    num_losers: 0,
                    has_wildcard: false,
                    player_indices: None,
                }],
                name: round_name,
                winners_destination: None,
                losers_destination: None,
                num_wildcard_winners: None,
                supplement_comparisons: Vec::new(),
            }
        })
        .collect();
    CompetitionMetadata {
        name: name.to_string(),
        num_players,
        preset: None,
        kind: None,
        rounds,
    }
}

fn qualifier_final_rounds(preset: &PresetDefinition) -> Vec<RoundMetadata> {
    let heats = preset
        .heats
        .iter()
        .enumerate()
        .map(|(idx, heat)| StageMetadata {
            name: format!("Heat {}", idx + 1),
            num_players: heat.len(),
            num_winners: 0,
            num_losers: heat.len(),
            has_wildcard: false,
            player_indices: Some(heat.clone()),
        })
        .collect();
    let qualifier = RoundMetadata {
        name: "Qualifier".to_string(),
        stages: heats,
        winners_destination: Some(RoundDestination {
            round_index: 1,
            distribution: DistributionMethod::Snake,
            handicap: HandicapMethod::WinnersPure,
        }),
        losers_destination: None,
        num_wildcard_winners: None,
        supplement_comparisons: Vec::new(),
    };
    let final_round = RoundMetadata {
        name: "Final".to_string(),
        stages: vec![StageMetadata {
            name: "Final".to_string(),
            num_players: QUALIFIER_FINAL_SIZE,
            num_winners: 1,
            num_losers: QUALIFIER_FINAL_SIZE - 1,
            has_wildcard: false,
            player_indices: None,
        }],
        winners_destination: None,
        losers_destination: None,
        num_wildcard_winners: None,
        supplement_comparisons: Vec::new(),
    };
    vec![qualifier, final_round]
}

/// Even split for the first round, extra players to the earliest groups.
pub fn first_round_sizes(num_players: usize, groups: usize) -> Vec<usize> {
    if groups == 0 {
        return Vec::new();
    }
    let base = num_players / groups;
    let extra = num_players % groups;
    (0..groups).map(|g| base + usize::from(g < extra)).collect()
}

/// Stage sizes of a later round: every feeder's winners, then every
/// feeder's losers, placed through one shared snake.
fn fed_round_sizes(built: &[RoundMetadata], round_index: usize, groups: usize) -> EngineResult<Vec<usize>> {
    let mut seeder = SnakeSeeder::new(groups);
    let winners = built
        .iter()
        .filter(|r| r.winners_destination.as_ref().map(|d| d.round_index) == Some(round_index))
        .map(|r| r.num_advancing_winners());
    let losers = built
        .iter()
        .filter(|r| r.losers_destination.as_ref().map(|d| d.round_index) == Some(round_index))
        .map(|r| r.num_advancing_losers());
    for count in winners.chain(losers) {
        for _ in 0..count {
            seeder.place()?;
        }
    }
    Ok(seeder.into_counts())
}

fn stage_name(round: &PresetRound, idx: usize) -> String {
    if round.num_stages == 1 {
        round.name.clone()
    } else {
        let letter = (b'A' + (idx % 26) as u8) as char;
        format!("Group {letter}")
    }
}

fn tournament_rounds(preset: &PresetDefinition, num_players: usize) -> EngineResult<Vec<RoundMetadata>> {
    let mut rounds: Vec<RoundMetadata> = Vec::with_capacity(preset.rounds.len());
    for (round_index, preset_round) in preset.rounds.iter().enumerate() {
        let sizes = if round_index == 0 {
            first_round_sizes(num_players, preset_round.num_stages)
        } else {
            fed_round_sizes(&rounds, round_index, preset_round.num_stages)?
        };

        let mut stages = Vec::with_capacity(sizes.len());
        for (idx, size) in sizes.into_iter().enumerate() {
            if size == 0 {
                return Err(EngineError::InvalidConfiguration(format!(
                    "preset {}: {} stage {} would be empty with {num_players} players",
                    preset.name,
                    preset_round.name,
                    idx + 1
                )));
            }
            let (num_winners, num_losers) = preset_round.split(size)?;
            stages.push(StageMetadata {
                name: stage_name(preset_round, idx),
                num_players: size,
                num_winners,
                num_losers,
                has_wildcard: preset_round.wildcard,
                player_indices: None,
            });
        }

        let mut round = RoundMetadata {
            name: preset_round.name.clone(),
            stages,
            winners_destination: preset_round.winners_destination.clone(),
            losers_destination: preset_round.losers_destination.clone(),
            num_wildcard_winners: preset_round
                .wildcard
                .then(|| preset_round.num_wildcard_winners.unwrap_or(0)),
            supplement_comparisons: Vec::new(),
        };
        round.supplement_comparisons = supplement_definitions(&round);
        rounds.push(round);
    }
    Ok(rounds)
}

fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// One definition per boundary placement shared by more than one stage.
pub fn supplement_definitions(round: &RoundMetadata) -> Vec<SupplementComparisonMetadata> {
    let mut out = Vec::new();
    let max_winners = round.stages.iter().map(|s| s.num_winners).max().unwrap_or(0);
    for n in 1..=max_winners {
        let sharing = round.stages.iter().filter(|s| s.num_winners >= n).count();
        if sharing > 1 {
            out.push(SupplementComparisonMetadata {
                rank_id: RankId::TopWinner(n),
                name: format!("{} place", ordinal(n)),
                num_players: sharing,
            });
        }
    }

    let wildcards = round.wildcard_candidates();
    if wildcards > 1 {
        out.push(SupplementComparisonMetadata {
            rank_id: RankId::Wildcard,
            name: "Wildcard".to_string(),
            num_players: wildcards,
        });
    }

    let first_losers = round.stages.first().map(|s| s.num_losers).unwrap_or(0);
    let uniform_losers = round.stages.iter().all(|s| s.num_losers == first_losers);
    if uniform_losers {
        if round.stages.len() > 1 {
            for n in (1..=first_losers).rev() {
                let name = if n == 1 {
                    "Last place".to_string()
                } else {
                    format!("{} to last place", ordinal(n))
                };
                out.push(SupplementComparisonMetadata {
                    rank_id: RankId::Bottom(n),
                    name,
                    num_players: round.stages.len(),
                });
            }
        }
    } else {
        let max_losers = round.stages.iter().map(|s| s.num_losers).max().unwrap_or(0);
        for n in 1..=max_losers {
            let sharing = round.stages.iter().filter(|s| s.num_losers >= n).count();
            if sharing > 1 {
                out.push(SupplementComparisonMetadata {
                    rank_id: RankId::TopLoser(n),
                    name: format!("{} place among losers", ordinal(n)),
                    num_players: sharing,
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(num_players: usize, preset: Option<&str>, kind: CompetitionKind) -> EngineResult<CompetitionMetadata> {
        build_metadata(
            "Test Cup",
            Some(num_players),
            &MetadataOptions::Preset {
                name: preset.map(str::to_string),
                kind,
            },
            &PresetCatalog::builtin(),
        )
    }

    fn sizes(round: &RoundMetadata) -> Vec<usize> {
        round.stages.iter().map(|s| s.num_players).collect()
    }

    #[test]
    fn test_first_round_sizes() {
        assert_eq!(first_round_sizes(13, 4), vec![4, 3, 3, 3]);
        assert_eq!(first_round_sizes(12, 3), vec![4, 4, 4]);
        assert_eq!(first_round_sizes(8, 3), vec![3, 3, 2]);
    }

    #[test]
    fn test_manual() {
        let metadata = build_metadata(
            "Casuals",
            None,
            &MetadataOptions::Manual { num_games: 3 },
            &PresetCatalog::builtin(),
        )
        .unwrap();
        assert!(metadata.is_manual());
        assert_eq!(metadata.rounds.len(), 3);
        assert_eq!(metadata.rounds[2].name, "Game 3");
        assert_eq!(metadata.rounds[0].stages[0].num_players, MANUAL_STAGE_SIZE);
        assert!(metadata.rounds.iter().all(|r| r.supplement_comparisons.is_empty()));
    }

    #[test]
    fn test_qualifier_final_shape() {
        let metadata = build(8, None, CompetitionKind::QualifierFinal).unwrap();
        assert_eq!(metadata.preset.as_deref(), Some("qualifier8"));
        assert_eq!(metadata.rounds.len(), 2);
        assert_eq!(metadata.rounds[0].stages.len(), 6);
        assert_eq!(
            metadata.rounds[0].stages[2].player_indices.as_deref(),
            Some(&[0, 1, 4, 5][..])
        );
        assert_eq!(sizes(&metadata.rounds[1]), vec![4]);
    }

    #[test]
    fn test_wildcard12_at_twelve() {
        let metadata = build(12, None, CompetitionKind::Tournament).unwrap();
        let [round1, repechage, final_round] = &metadata.rounds[..] else {
            panic!("expected three rounds");
        };
        assert_eq!(sizes(round1), vec![4, 4, 4]);
        assert_eq!(sizes(repechage), vec![4, 4]);
        assert_eq!(sizes(final_round), vec![6]);

        let ids: Vec<String> = round1
            .supplement_comparisons
            .iter()
            .map(|d| d.rank_id.to_string())
            .collect();
        assert_eq!(ids, vec!["Tw1", "W", "B2", "B1"]);
        assert!(round1.supplement_comparisons.iter().all(|d| d.num_players == 3));
        assert!(final_round.supplement_comparisons.is_empty());
    }

    #[test]
    fn test_wildcard12_uneven_losers() {
        let metadata = build(8, Some("wildcard12"), CompetitionKind::Tournament).unwrap();
        let round1 = &metadata.rounds[0];
        assert_eq!(sizes(round1), vec![3, 3, 2]);
        let defs: Vec<(String, usize)> = round1
            .supplement_comparisons
            .iter()
            .map(|d| (d.rank_id.to_string(), d.num_players))
            .collect();
        assert_eq!(
            defs,
            vec![("Tw1".to_string(), 3), ("W".to_string(), 3), ("Tl1".to_string(), 2)]
        );
        // 2 regular losers plus 2 wildcard candidates not taken.
        assert_eq!(sizes(&metadata.rounds[1]), vec![2, 2]);
        assert_eq!(sizes(&metadata.rounds[2]), vec![6]);
    }

    #[test]
    fn test_single16_at_thirteen() {
        let metadata = build(13, None, CompetitionKind::Tournament).unwrap();
        assert_eq!(sizes(&metadata.rounds[0]), vec![4, 3, 3, 3]);
        assert_eq!(sizes(&metadata.rounds[1]), vec![4, 4]);
        assert_eq!(sizes(&metadata.rounds[2]), vec![4]);
        let semifinal = &metadata.rounds[1];
        assert_eq!(semifinal.stages[0].name, "Group A");
        assert_eq!(semifinal.stages[0].num_winners, 2);
        assert_eq!(metadata.rounds[2].stages[0].name, "Final");
    }

    #[test]
    fn test_every_preset_and_count_is_consistent() {
        let catalog = PresetCatalog::builtin();
        for preset in catalog.iter() {
            for n in preset.min_players..=preset.max_players {
                let metadata = build(n, Some(&preset.name), preset.kind).unwrap();
                for (round_index, round) in metadata.rounds.iter().enumerate() {
                    for stage in &round.stages {
                        assert_eq!(
                            stage.num_winners + stage.wildcard_slots() + stage.num_losers,
                            stage.num_players
                        );
                    }
                    let entering = if round_index == 0 {
                        match preset.kind {
                            CompetitionKind::Tournament => n,
                            CompetitionKind::QualifierFinal => preset.heats.iter().map(Vec::len).sum(),
                        }
                    } else if preset.kind == CompetitionKind::QualifierFinal {
                        QUALIFIER_FINAL_SIZE
                    } else {
                        let winners: usize = metadata
                            .winner_feeds(round_index)
                            .into_iter()
                            .map(|r| metadata.rounds[r].num_advancing_winners())
                            .sum();
                        let losers: usize = metadata
                            .loser_feeds(round_index)
                            .into_iter()
                            .map(|r| metadata.rounds[r].num_advancing_losers())
                            .sum();
                        winners + losers
                    };
                    assert_eq!(round.num_players(), entering, "{} round {round_index} at {n}", preset.name);
                }
            }
        }
    }

    #[test]
    fn test_preset_needs_player_count() {
        let err = build_metadata(
            "Test Cup",
            None,
            &MetadataOptions::Preset {
                name: None,
                kind: CompetitionKind::Tournament,
            },
            &PresetCatalog::builtin(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn test_too_many_groups_is_fatal() {
        let mut preset = PresetCatalog::builtin().get("single16").cloned().unwrap();
        preset.name = "tiny".to_string();
        preset.min_players = 2;
        let catalog = PresetCatalog::from_presets(vec![preset]).unwrap();
        let err = build_metadata(
            "Test Cup",
            Some(3),
            &MetadataOptions::Preset {
                name: Some("tiny".to_string()),
                kind: CompetitionKind::Tournament,
            },
            &catalog,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(22), "22nd");
    }
}
