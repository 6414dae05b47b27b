//! Closes a round once all of its stages are scored.

use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

use crate::error::{try_ready, EngineError, EngineResult, Readiness};
use crate::ranking::{compare_qualifier_score, compare_stage_score, get_qualifier_result, get_supplement_comparison};
use crate::setup::complete_stage_results;
use crate::types::*;

/// Running qualifier table from whatever stage results exist so far, best
/// standing first. `stage_results[i]` belongs to `round.stages[i]`; missing
/// or partial lists are fine, more lists than stages are not.
pub fn qualifier_standings(
    round: &RoundMetadata,
    stage_results: &[Vec<StageResultEntry>],
) -> EngineResult<Vec<QualifierScoreEntry>> {
    if stage_results.len() > round.stages.len() {
        return Err(EngineError::InvalidInput(format!(
            "{} has {} stages but {} results were supplied",
            round.name,
            round.stages.len(),
            stage_results.len()
        )));
    }
    let mut scores: Vec<QualifierScoreEntry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (stage_idx, (stage, results)) in round.stages.iter().zip(stage_results).enumerate() {
        for entry in results {
            let slot = *index.entry(entry.name().to_string()).or_insert_with(|| {
                scores.push(QualifierScoreEntry {
                    name: entry.name().to_string(),
                    points: 0,
                    placements: [0; PLACEMENT_BUCKETS],
                    stage_ranks: vec![None; round.stages.len()],
                    best_game: None,
                });
                scores.len() - 1
            });
            let score = &mut scores[slot];
            score.points += (stage.num_players as u32 + 1).saturating_sub(entry.rank);
            if let Some(bucket) = (entry.rank as usize).checked_sub(1).filter(|b| *b < PLACEMENT_BUCKETS) {
                score.placements[bucket] += 1;
            }
            score.stage_ranks[stage_idx] = Some(entry.rank);
            // Later games win ties, so the last best-sorted game is kept.
            let replace = match &score.best_game {
                Some(best) => compare_stage_score(&entry.score, best) != Ordering::Less,
                None => true,
            };
            if replace {
                score.best_game = Some(entry.score.clone());
            }
        }
    }

    scores.sort_by(|a, b| compare_qualifier_score(b, a));
    Ok(scores)
}

pub fn finalize_round(
    metadata: &CompetitionMetadata,
    round_index: usize,
    stage_results: &[Vec<StageResultEntry>],
) -> EngineResult<Readiness<RoundFinalizeResult>> {
    let round = metadata.round(round_index)?;
    if metadata.is_manual() {
        return Ok(Readiness::Ready(RoundFinalizeResult::SupplementComparisons {
            comparisons: Vec::new(),
        }));
    }
    let results = try_ready!(complete_stage_results(round, stage_results)?);

    let outcome = if metadata.kind == Some(CompetitionKind::QualifierFinal) && round_index == 0 {
        let scores = qualifier_standings(round, results)?;
        let result = get_qualifier_result(&scores);
        RoundFinalizeResult::Qualifier { scores, result }
    } else {
        let mut comparisons = Vec::with_capacity(round.supplement_comparisons.len());
        for definition in &round.supplement_comparisons {
            let collected: Vec<StageResultEntry> = round
                .stages
                .iter()
                .zip(results)
                .filter_map(|(stage, result)| {
                    stage.rank_index(definition.rank_id).map(|idx| result[idx].clone())
                })
                .collect();
            if collected.len() != definition.num_players {
                return Err(EngineError::SupplementCountMismatch {
                    rank_id: definition.rank_id,
                    expected: definition.num_players,
                    actual: collected.len(),
                });
            }
            comparisons.push(SupplementComparison {
                rank_id: definition.rank_id,
                name: definition.name.clone(),
                entries: get_supplement_comparison(&collected)?,
            });
        }
        RoundFinalizeResult::SupplementComparisons { comparisons }
    };
    debug!(round = %round.name, "round finalized");
    Ok(Readiness::Ready(outcome))
}
