//! Score comparators and ranked-result builders.
//!
//! Comparators return `Ordering::Greater` when `a` placed better than `b`.
//! Sorting best-first therefore uses `compare(b, a)`.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{EngineError, EngineResult};
use crate::types::{
    QualifierResultEntry, QualifierScoreEntry, StageResultEntry, StageScore,
    SupplementComparisonEntry,
};

/// Graded beats ungraded. Graded players compare by grade then by time
/// relative to their best (smaller is better); ungraded by level reached.
pub fn compare_stage_score(a: &StageScore, b: &StageScore) -> Ordering {
    match (a.grade, b.grade) {
        (Some(ga), Some(gb)) => ga
            .cmp(&gb)
            .then_with(|| compare_time_diff(a.time_diff_best, b.time_diff_best)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.level.cmp(&b.level),
    }
}

/// Points, then the 1st..4th placement histogram, then the best game.
pub fn compare_qualifier_score(a: &QualifierScoreEntry, b: &QualifierScoreEntry) -> Ordering {
    a.points
        .cmp(&b.points)
        .then_with(|| a.placements.cmp(&b.placements))
        .then_with(|| match (&a.best_game, &b.best_game) {
            (Some(ga), Some(gb)) => compare_best_game(ga, gb),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        })
}

fn compare_best_game(a: &StageScore, b: &StageScore) -> Ordering {
    match (a.grade, b.grade) {
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => a
            .grade
            .cmp(&b.grade)
            .then_with(|| compare_time_diff(a.time_diff_best, b.time_diff_best))
            .then_with(|| a.level.cmp(&b.level)),
    }
}

// A present time beats a missing one; two missing times tie.
fn compare_time_diff(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(ta), Some(tb)) => tb.cmp(&ta),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

pub fn sort_scores_best_first(scores: &mut [StageScore]) {
    scores.sort_by(|a, b| compare_stage_score(b, a));
}

/// 1-based ranks for an already best-first list. Ties reuse the previous
/// rank and later ranks are not compacted (1, 1, 3).
fn assign_ranks<T>(sorted: &[T], compare: impl Fn(&T, &T) -> Ordering) -> Vec<u32> {
    let mut ranks: Vec<u32> = Vec::with_capacity(sorted.len());
    for (idx, item) in sorted.iter().enumerate() {
        let rank = match idx.checked_sub(1) {
            Some(prev) if compare(item, &sorted[prev]) == Ordering::Equal => ranks[prev],
            _ => idx as u32 + 1,
        };
        ranks.push(rank);
    }
    ranks
}

fn time_delta(this: &StageScore, other: &StageScore, label: &str) -> EngineResult<i64> {
    match (this.time_diff_best, other.time_diff_best) {
        (Some(a), Some(b)) => Ok(a - b),
        _ => Err(EngineError::MalformedResult(format!(
            "{} and {} share a grade but a time is missing for {label}",
            this.name, other.name
        ))),
    }
}

fn time_diff_prev(sorted: &[StageScore], idx: usize) -> EngineResult<Option<i64>> {
    let Some(prev) = idx.checked_sub(1).map(|p| &sorted[p]) else {
        return Ok(None);
    };
    let score = &sorted[idx];
    if score.grade.is_some() && score.grade == prev.grade {
        time_delta(score, prev, "the previous rank").map(Some)
    } else {
        Ok(None)
    }
}

fn ensure_unique_names<'a>(names: impl Iterator<Item = &'a str>) -> EngineResult<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(EngineError::InvalidInput(format!(
                "{name} appears more than once in the same result"
            )));
        }
    }
    Ok(())
}

/// Ranks one stage's raw scores.
pub fn get_stage_result(scores: &[StageScore]) -> EngineResult<Vec<StageResultEntry>> {
    ensure_unique_names(scores.iter().map(|s| s.name.as_str()))?;
    let mut sorted = scores.to_vec();
    sort_scores_best_first(&mut sorted);
    let ranks = assign_ranks(&sorted, compare_stage_score);

    let mut out = Vec::with_capacity(sorted.len());
    for (idx, rank) in ranks.into_iter().enumerate() {
        let score = &sorted[idx];
        let top = &sorted[0];
        let time_diff_top = match (score.grade, top.grade) {
            (Some(g), Some(t)) if g.is_max() && t.is_max() => {
                Some(time_delta(score, top, "the top rank")?)
            }
            _ => None,
        };
        out.push(StageResultEntry {
            rank,
            score: score.clone(),
            time_diff_top,
            time_diff_prev: time_diff_prev(&sorted, idx)?,
        });
    }
    Ok(out)
}

/// Ranks same-placement players collected from several stages.
pub fn get_supplement_comparison(
    entries: &[StageResultEntry],
) -> EngineResult<Vec<SupplementComparisonEntry>> {
    ensure_unique_names(entries.iter().map(|e| e.name()))?;
    let mut sorted: Vec<StageScore> = entries.iter().map(|e| e.score.clone()).collect();
    sort_scores_best_first(&mut sorted);
    let ranks = assign_ranks(&sorted, compare_stage_score);

    let mut out = Vec::with_capacity(sorted.len());
    for (idx, rank) in ranks.into_iter().enumerate() {
        out.push(SupplementComparisonEntry {
            rank,
            score: sorted[idx].clone(),
            time_diff_prev: time_diff_prev(&sorted, idx)?,
        });
    }
    Ok(out)
}

/// Final qualifier standings from accumulated point totals.
pub fn get_qualifier_result(scores: &[QualifierScoreEntry]) -> Vec<QualifierResultEntry> {
    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| compare_qualifier_score(b, a));
    let ranks = assign_ranks(&sorted, compare_qualifier_score);

    sorted
        .into_iter()
        .zip(ranks)
        .map(|(entry, rank)| {
            let best = entry.best_game.as_ref();
            QualifierResultEntry {
                rank,
                points: entry.points,
                placements: entry.placements,
                best_game_level: best.map(|g| g.level).unwrap_or(0),
                best_game_grade: best.and_then(|g| g.grade),
                best_game_time: best.and_then(|g| g.time),
                best_game_time_diff_best: best.and_then(|g| g.time_diff_best),
                name: entry.name,
            }
        })
        .collect()
}
