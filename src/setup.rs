//! Works out what a round needs from earlier rounds and, once that data is
//! complete, who plays in each of its stages with which handicap.

use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::error::{try_ready, EngineError, EngineResult, Readiness};
use crate::handicap::assign_handicap;
use crate::ranking::compare_stage_score;
use crate::snake::SnakeSeeder;
use crate::types::*;

/// A stage of the round being set up, with its populated players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRoster {
    pub stage_name: String,
    pub num_players: usize,
    pub entries: Vec<StageSetupPlayerEntry>,
}

/// An upstream result entry selected to advance, with the result index it
/// held in its own stage.
#[derive(Debug, Clone, Copy)]
struct Advancing<'a> {
    entry: &'a StageResultEntry,
    source_rank: usize,
}

pub fn get_dependency_for_round(
    metadata: &CompetitionMetadata,
    round_index: usize,
) -> EngineResult<Vec<RoundDependencyKind>> {
    metadata.round(round_index)?;
    if metadata.is_manual() {
        return Ok(Vec::new());
    }
    if round_index == 0 {
        return Ok(vec![RoundDependencyKind::FirstRoundEntry]);
    }
    match metadata.kind {
        Some(CompetitionKind::QualifierFinal) => Ok(vec![RoundDependencyKind::QualifierRoundResult]),
        _ => Ok(upstream_rounds(metadata, round_index)
            .into_iter()
            .map(|idx| RoundDependencyKind::TournamentRoundResult { round_index: idx })
            .collect()),
    }
}

fn upstream_rounds(metadata: &CompetitionMetadata, round_index: usize) -> Vec<usize> {
    let all: BTreeSet<usize> = metadata
        .winner_feeds(round_index)
        .into_iter()
        .chain(metadata.loser_feeds(round_index))
        .collect();
    all.into_iter().collect()
}

pub fn setup_round(
    metadata: &CompetitionMetadata,
    round_index: usize,
    data: &[RoundDependencyData],
) -> EngineResult<Readiness<Vec<StageRoster>>> {
    let round = metadata.round(round_index)?;
    let entries = if metadata.is_manual() {
        Readiness::Ready(vec![Vec::new(); round.stages.len()])
    } else {
        match (metadata.kind, round_index) {
            (Some(CompetitionKind::QualifierFinal), 0) => setup_qualifier_heats(metadata, round, data)?,
            (Some(CompetitionKind::QualifierFinal), _) => setup_qualifier_final(metadata, round, data)?,
            (_, 0) => setup_first_round(metadata, round, data)?,
            _ => setup_fed_round(metadata, round_index, data)?,
        }
    };

    let entries = try_ready!(entries);
    debug!(round = %round.name, stages = entries.len(), "round setup ready");
    Ok(Readiness::Ready(
        round
            .stages
            .iter()
            .zip(entries)
            .map(|(stage, entries)| StageRoster {
                stage_name: stage.name.clone(),
                num_players: stage.num_players,
                entries,
            })
            .collect(),
    ))
}

// ── Dependency lookup ──────────────────────────────────────────────────

fn first_round_entries(data: &[RoundDependencyData]) -> Readiness<&[Participant]> {
    data.iter()
        .find_map(|d| match d {
            RoundDependencyData::FirstRoundEntry { participants } => Some(participants.as_slice()),
            _ => None,
        })
        .map(Readiness::Ready)
        .unwrap_or_else(|| Readiness::NotReady("participants have not been entered".to_string()))
}

fn qualifier_result(data: &[RoundDependencyData]) -> Readiness<&[QualifierResultEntry]> {
    data.iter()
        .find_map(|d| match d {
            RoundDependencyData::QualifierRoundResult { result } => Some(result.as_slice()),
            _ => None,
        })
        .map(Readiness::Ready)
        .unwrap_or_else(|| Readiness::NotReady("qualifier has no result yet".to_string()))
}

/// Stage results of an upstream round, only once every stage is complete.
pub(crate) fn complete_stage_results<'a>(
    round: &RoundMetadata,
    stage_results: &'a [Vec<StageResultEntry>],
) -> EngineResult<Readiness<&'a [Vec<StageResultEntry>]>> {
    if stage_results.len() > round.stages.len() {
        return Err(EngineError::InvalidInput(format!(
            "{} has {} stages but {} results were supplied",
            round.name,
            round.stages.len(),
            stage_results.len()
        )));
    }
    for (idx, stage) in round.stages.iter().enumerate() {
        let recorded = stage_results.get(idx).map(Vec::len).unwrap_or(0);
        if recorded > stage.num_players {
            return Err(EngineError::InvalidInput(format!(
                "{} / {} has {recorded} results for {} players",
                round.name, stage.name, stage.num_players
            )));
        }
        if recorded < stage.num_players {
            return Ok(Readiness::NotReady(format!(
                "{} / {} has {recorded} of {} results",
                round.name, stage.name, stage.num_players
            )));
        }
    }
    Ok(Readiness::Ready(stage_results))
}

fn upstream_results<'a>(
    metadata: &CompetitionMetadata,
    upstream: usize,
    data: &'a [RoundDependencyData],
) -> EngineResult<Readiness<&'a [Vec<StageResultEntry>]>> {
    let round = metadata.round(upstream)?;
    let supplied = data.iter().find_map(|d| match d {
        RoundDependencyData::TournamentRoundResult {
            round_index,
            stage_results,
        } if *round_index == upstream => Some(stage_results.as_slice()),
        _ => None,
    });
    match supplied {
        Some(stage_results) => complete_stage_results(round, stage_results),
        None => Ok(Readiness::NotReady(format!("{} has no results yet", round.name))),
    }
}

// ── First round ────────────────────────────────────────────────────────

fn expected_players(metadata: &CompetitionMetadata) -> EngineResult<usize> {
    metadata.num_players.ok_or_else(|| {
        EngineError::InvalidConfiguration(format!("{} has no player count", metadata.name))
    })
}

fn setup_qualifier_heats(
    metadata: &CompetitionMetadata,
    round: &RoundMetadata,
    data: &[RoundDependencyData],
) -> EngineResult<Readiness<Vec<Vec<StageSetupPlayerEntry>>>> {
    let participants = try_ready!(first_round_entries(data));
    let num_players = expected_players(metadata)?;
    if participants.len() != num_players {
        return Err(EngineError::InvalidInput(format!(
            "{} participants entered for a {num_players} player qualifier",
            participants.len()
        )));
    }

    let mut by_index: Vec<Option<&str>> = vec![None; num_players];
    for participant in participants {
        let index = participant.group.ok_or_else(|| {
            EngineError::InvalidInput(format!("{} has no qualifier index", participant.name))
        })?;
        let slot = by_index.get_mut(index).ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "{} has qualifier index {index}, expected 0..{num_players}",
                participant.name
            ))
        })?;
        if let Some(other) = slot.replace(participant.name.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "{} and {} share qualifier index {index}",
                other, participant.name
            )));
        }
    }

    let mut stages = Vec::with_capacity(round.stages.len());
    for stage in &round.stages {
        let indices = stage.player_indices.as_deref().ok_or_else(|| {
            EngineError::InvalidConfiguration(format!("{} has no seeded players", stage.name))
        })?;
        let mut entries = Vec::with_capacity(indices.len());
        for index in indices {
            let name = by_index.get(*index).copied().flatten().ok_or_else(|| {
                EngineError::InvalidConfiguration(format!(
                    "{} seeds player index {index}, which nobody holds",
                    stage.name
                ))
            })?;
            entries.push(StageSetupPlayerEntry {
                name: name.to_string(),
                handicap: 0,
            });
        }
        stages.push(entries);
    }
    Ok(Readiness::Ready(stages))
}

/// Group sizes a snake can continue from: non-increasing, neighbours within one.
fn is_snake_shaped(sizes: &[usize]) -> bool {
    sizes
        .windows(2)
        .all(|pair| pair[0] >= pair[1] && pair[0] - pair[1] <= 1)
}

fn setup_first_round(
    metadata: &CompetitionMetadata,
    round: &RoundMetadata,
    data: &[RoundDependencyData],
) -> EngineResult<Readiness<Vec<Vec<StageSetupPlayerEntry>>>> {
    let participants = try_ready!(first_round_entries(data));
    let num_players = expected_players(metadata)?;
    if participants.len() != num_players {
        return Err(EngineError::InvalidInput(format!(
            "{} participants entered for a {num_players} player tournament",
            participants.len()
        )));
    }

    let groups = round.stages.len();
    let mut stages: Vec<Vec<StageSetupPlayerEntry>> = vec![Vec::new(); groups];
    let mut seen = HashSet::new();
    for participant in participants {
        if !seen.insert(participant.name.as_str()) {
            return Err(EngineError::InvalidInput(format!(
                "{} was entered twice",
                participant.name
            )));
        }
        let group = participant
            .group
            .filter(|g| *g < groups)
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "{} has group {:?}, expected 0..{groups}",
                    participant.name, participant.group
                ))
            })?;
        stages[group].push(StageSetupPlayerEntry {
            name: participant.name.clone(),
            handicap: 0,
        });
    }

    let observed: Vec<usize> = stages.iter().map(Vec::len).collect();
    let expected: Vec<usize> = round.stages.iter().map(|s| s.num_players).collect();
    if !is_snake_shaped(&observed) || observed != expected {
        return Err(EngineError::InvalidInput(format!(
            "group sizes {observed:?} must be non-increasing and within one of each other (expected {expected:?})"
        )));
    }
    Ok(Readiness::Ready(stages))
}

// ── Later rounds ───────────────────────────────────────────────────────

fn setup_qualifier_final(
    metadata: &CompetitionMetadata,
    round: &RoundMetadata,
    data: &[RoundDependencyData],
) -> EngineResult<Readiness<Vec<Vec<StageSetupPlayerEntry>>>> {
    let result = try_ready!(qualifier_result(data));
    let num_players = expected_players(metadata)?;
    let names: HashSet<&str> = result.iter().map(|e| e.name.as_str()).collect();
    if names.len() < num_players {
        return Ok(Readiness::NotReady(format!(
            "qualifier result has {} of {num_players} players",
            names.len()
        )));
    }

    let stage = round.stages.first().ok_or_else(|| {
        EngineError::InvalidConfiguration(format!("{} has no stage", round.name))
    })?;
    let handicap = metadata
        .rounds
        .first()
        .and_then(|r| r.winners_destination.as_ref())
        .map(|d| d.handicap)
        .unwrap_or(HandicapMethod::WinnersPure);

    let mut standings: Vec<&QualifierResultEntry> = result.iter().collect();
    standings.sort_by_key(|e| e.rank);
    let entries = standings
        .into_iter()
        .take(stage.num_players)
        .enumerate()
        .map(|(position, entry)| StageSetupPlayerEntry {
            name: entry.name.clone(),
            handicap: assign_handicap(handicap, position, position),
        })
        .collect();
    Ok(Readiness::Ready(vec![entries]))
}

fn sort_advancing(batch: &mut [Advancing<'_>]) {
    batch.sort_by(|a, b| compare_stage_score(&b.entry.score, &a.entry.score));
}

/// Wildcard candidates best-first, split into (taken, not taken).
fn split_wildcards<'a>(
    round: &RoundMetadata,
    results: &'a [Vec<StageResultEntry>],
) -> (Vec<Advancing<'a>>, Vec<Advancing<'a>>) {
    let mut candidates: Vec<Advancing<'a>> = round
        .stages
        .iter()
        .zip(results)
        .filter_map(|(stage, result)| {
            let idx = stage.wildcard_index()?;
            Some(Advancing {
                entry: &result[idx],
                source_rank: idx,
            })
        })
        .collect();
    sort_advancing(&mut candidates);
    let taken = round.wildcard_winners().min(candidates.len());
    let rest = candidates.split_off(taken);
    (candidates, rest)
}

fn select_winners<'a>(round: &RoundMetadata, results: &'a [Vec<StageResultEntry>]) -> Vec<Advancing<'a>> {
    let mut out = Vec::new();
    let max_winners = round.stages.iter().map(|s| s.num_winners).max().unwrap_or(0);
    for rank in 0..max_winners {
        let mut batch: Vec<Advancing<'a>> = round
            .stages
            .iter()
            .zip(results)
            .filter(|(stage, _)| stage.num_winners > rank)
            .map(|(_, result)| Advancing {
                entry: &result[rank],
                source_rank: rank,
            })
            .collect();
        sort_advancing(&mut batch);
        out.extend(batch);
    }
    out.extend(split_wildcards(round, results).0);
    out
}

fn select_losers<'a>(round: &RoundMetadata, results: &'a [Vec<StageResultEntry>]) -> Vec<Advancing<'a>> {
    let mut out = split_wildcards(round, results).1;
    let max_losers = round.stages.iter().map(|s| s.num_losers).max().unwrap_or(0);
    for offset in 0..max_losers {
        let mut batch: Vec<Advancing<'a>> = round
            .stages
            .iter()
            .zip(results)
            .filter(|(stage, _)| stage.num_losers > offset)
            .map(|(stage, result)| {
                let idx = stage.first_loser_index() + offset;
                Advancing {
                    entry: &result[idx],
                    source_rank: idx,
                }
            })
            .collect();
        sort_advancing(&mut batch);
        out.extend(batch);
    }
    out
}

fn setup_fed_round(
    metadata: &CompetitionMetadata,
    round_index: usize,
    data: &[RoundDependencyData],
) -> EngineResult<Readiness<Vec<Vec<StageSetupPlayerEntry>>>> {
    let round = metadata.round(round_index)?;

    // Check every feeder before placing anyone.
    let mut ready = Vec::new();
    for upstream in upstream_rounds(metadata, round_index) {
        let results = try_ready!(upstream_results(metadata, upstream, data)?);
        ready.push((upstream, results));
    }
    let results_of = |upstream: usize| {
        ready
            .iter()
            .find(|(idx, _)| *idx == upstream)
            .map(|(_, results)| *results)
            .ok_or_else(|| EngineError::Inconsistent(format!("round {upstream} results went missing")))
    };

    let mut feeds: Vec<(Vec<Advancing<'_>>, HandicapMethod)> = Vec::new();
    for upstream in metadata.winner_feeds(round_index) {
        let source = &metadata.rounds[upstream];
        let handicap = source.winners_destination.as_ref().map(|d| d.handicap).unwrap_or_default();
        feeds.push((select_winners(source, results_of(upstream)?), handicap));
    }
    for upstream in metadata.loser_feeds(round_index) {
        let source = &metadata.rounds[upstream];
        let handicap = source.losers_destination.as_ref().map(|d| d.handicap).unwrap_or_default();
        feeds.push((select_losers(source, results_of(upstream)?), handicap));
    }

    let mut seeder = SnakeSeeder::new(round.stages.len());
    let mut stages: Vec<Vec<StageSetupPlayerEntry>> = vec![Vec::new(); round.stages.len()];
    for (advancing, handicap) in feeds {
        for player in advancing {
            let group = seeder.place()?;
            let slot = stages[group].len();
            stages[group].push(StageSetupPlayerEntry {
                name: player.entry.name().to_string(),
                handicap: assign_handicap(handicap, slot, player.source_rank),
            });
        }
    }

    for (stage, entries) in round.stages.iter().zip(&stages) {
        if entries.len() != stage.num_players {
            return Err(EngineError::Inconsistent(format!(
                "{} / {} received {} players, expected {}",
                round.name,
                stage.name,
                entries.len(),
                stage.num_players
            )));
        }
    }
    Ok(Readiness::Ready(stages))
}
