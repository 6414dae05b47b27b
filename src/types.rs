use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::grade::Grade;

// ── Constants ──────────────────────────────────────────────────────────

pub const MANUAL_STAGE_SIZE: usize = 8;
pub const QUALIFIER_FINAL_SIZE: usize = 4;
/// Placement histogram covers 1st through 4th.
pub const PLACEMENT_BUCKETS: usize = 4;

// ── Competition shape ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompetitionKind {
    QualifierFinal,
    Tournament,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandicapMethod {
    #[default]
    None,
    WinnersPure,
    WinnersDest,
    WinnersDest2,
    Losers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistributionMethod {
    #[default]
    Snake,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundDestination {
    pub round_index: usize,
    #[serde(default)]
    pub distribution: DistributionMethod,
    #[serde(default)]
    pub handicap: HandicapMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMetadata {
    pub name: String,
    pub num_players: usize,
    pub num_winners: usize,
    pub num_losers: usize,
    pub has_wildcard: bool,
    /// Fixed global player indices, qualifier heats only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_indices: Option<Vec<usize>>,
}

impl StageMetadata {
    pub fn wildcard_slots(&self) -> usize {
        usize::from(self.has_wildcard)
    }

    /// Result index of the wildcard candidate, right after the winners.
    pub fn wildcard_index(&self) -> Option<usize> {
        self.has_wildcard.then_some(self.num_winners)
    }

    /// Result index of the first loser.
    pub fn first_loser_index(&self) -> usize {
        self.num_winners + self.wildcard_slots()
    }

    /// Result index a supplement placement refers to in this stage, if the
    /// stage has that placement at all.
    pub fn rank_index(&self, rank_id: RankId) -> Option<usize> {
        match rank_id {
            RankId::TopWinner(n) => (n >= 1 && n <= self.num_winners).then(|| n - 1),
            RankId::TopLoser(n) => {
                (n >= 1 && n <= self.num_losers).then(|| self.first_loser_index() + n - 1)
            }
            RankId::Wildcard => self.wildcard_index(),
            RankId::Bottom(n) => {
                (n >= 1 && n <= self.num_losers).then(|| self.num_players - n)
            }
        }
    }
}

/// Which boundary placement a supplement comparison resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RankId {
    /// n-th winner placement across stages, 1-based.
    TopWinner(usize),
    /// n-th loser placement counted from the first loser, 1-based.
    TopLoser(usize),
    Wildcard,
    /// n-th placement from the bottom, 1-based.
    Bottom(usize),
}

impl fmt::Display for RankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankId::TopWinner(n) => write!(f, "Tw{n}"),
            RankId::TopLoser(n) => write!(f, "Tl{n}"),
            RankId::Wildcard => f.write_str("W"),
            RankId::Bottom(n) => write!(f, "B{n}"),
        }
    }
}

impl FromStr for RankId {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parse_n = |digits: &str| {
            digits
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= 1)
                .ok_or_else(|| format!("invalid rank id {raw:?}"))
        };
        if raw == "W" {
            Ok(RankId::Wildcard)
        } else if let Some(rest) = raw.strip_prefix("Tw") {
            parse_n(rest).map(RankId::TopWinner)
        } else if let Some(rest) = raw.strip_prefix("Tl") {
            parse_n(rest).map(RankId::TopLoser)
        } else if let Some(rest) = raw.strip_prefix('B') {
            parse_n(rest).map(RankId::Bottom)
        } else {
            Err(format!("invalid rank id {raw:?}"))
        }
    }
}

impl Serialize for RankId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RankId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementComparisonMetadata {
    pub rank_id: RankId,
    pub name: String,
    pub num_players: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundMetadata {
    pub name: String,
    pub stages: Vec<StageMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winners_destination: Option<RoundDestination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub losers_destination: Option<RoundDestination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_wildcard_winners: Option<usize>,
    #[serde(default)]
    pub supplement_comparisons: Vec<SupplementComparisonMetadata>,
}

impl RoundMetadata {
    pub fn num_players(&self) -> usize {
        self.stages.iter().map(|s| s.num_players).sum()
    }

    pub fn wildcard_candidates(&self) -> usize {
        self.stages.iter().filter(|s| s.has_wildcard).count()
    }

    pub fn wildcard_winners(&self) -> usize {
        self.num_wildcard_winners.unwrap_or(0)
    }

    /// Players this round sends to its winners destination.
    pub fn num_advancing_winners(&self) -> usize {
        self.stages.iter().map(|s| s.num_winners).sum::<usize>() + self.wildcard_winners()
    }

    /// Players this round sends to its losers destination: regular losers
    /// plus wildcard candidates that were not taken.
    pub fn num_advancing_losers(&self) -> usize {
        self.stages.iter().map(|s| s.num_losers).sum::<usize>()
            + self.wildcard_candidates().saturating_sub(self.wildcard_winners())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_players: Option<usize>,
    /// Absent means manual mode: no automatic advancement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CompetitionKind>,
    pub rounds: Vec<RoundMetadata>,
}

impl CompetitionMetadata {
    pub fn is_manual(&self) -> bool {
        self.preset.is_none() || self.kind.is_none()
    }

    pub fn round(&self, round_index: usize) -> EngineResult<&RoundMetadata> {
        self.rounds.get(round_index).ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "round {round_index} does not exist ({} rounds)",
                self.rounds.len()
            ))
        })
    }

    /// Indices of rounds whose winners feed `round_index`, ascending.
    pub fn winner_feeds(&self, round_index: usize) -> Vec<usize> {
        self.rounds
            .iter()
            .enumerate()
            .filter(|(_, r)| r.winners_destination.as_ref().map(|d| d.round_index) == Some(round_index))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Indices of rounds whose losers feed `round_index`, ascending.
    pub fn loser_feeds(&self, round_index: usize) -> Vec<usize> {
        self.rounds
            .iter()
            .enumerate()
            .filter(|(_, r)| r.losers_destination.as_ref().map(|d| d.round_index) == Some(round_index))
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Re-checks the structural invariants of a preset competition.
    pub fn validate(&self) -> EngineResult<()> {
        if self.is_manual() {
            return Ok(());
        }
        for (round_index, round) in self.rounds.iter().enumerate() {
            for stage in &round.stages {
                let sum = stage.num_winners + stage.wildcard_slots() + stage.num_losers;
                if sum != stage.num_players {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "{} / {}: {} winners + {} wildcard + {} losers != {} players",
                        round.name,
                        stage.name,
                        stage.num_winners,
                        stage.wildcard_slots(),
                        stage.num_losers,
                        stage.num_players
                    )));
                }
            }
            if round.wildcard_winners() > round.wildcard_candidates() {
                return Err(EngineError::InvalidConfiguration(format!(
                    "{}: {} wildcard winners but only {} wildcard slots",
                    round.name,
                    round.wildcard_winners(),
                    round.wildcard_candidates()
                )));
            }
            for destination in [&round.winners_destination, &round.losers_destination]
                .into_iter()
                .flatten()
            {
                if destination.round_index <= round_index || destination.round_index >= self.rounds.len() {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "{}: destination round {} is not a later round",
                        round.name, destination.round_index
                    )));
                }
            }
        }
        Ok(())
    }
}

// ── Players and scores ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    /// First-round group (tournament) or global heat index (qualifier).
    #[serde(default)]
    pub group: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageSetupPlayerEntry {
    pub name: String,
    /// Milliseconds; negative is an advantage.
    pub handicap: i64,
}

/// Raw outcome of one player's game in a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageScore {
    pub name: String,
    pub level: u32,
    #[serde(default)]
    pub grade: Option<Grade>,
    /// Milliseconds.
    #[serde(default)]
    pub time: Option<u64>,
    /// Milliseconds relative to the player's (handicap adjusted) best.
    #[serde(default)]
    pub time_diff_best: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResultEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub score: StageScore,
    #[serde(default)]
    pub time_diff_top: Option<i64>,
    #[serde(default)]
    pub time_diff_prev: Option<i64>,
}

impl StageResultEntry {
    pub fn name(&self) -> &str {
        &self.score.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementComparisonEntry {
    pub rank: u32,
    #[serde(flatten)]
    pub score: StageScore,
    #[serde(default)]
    pub time_diff_prev: Option<i64>,
}

/// Running qualifier standing for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifierScoreEntry {
    pub name: String,
    pub points: u32,
    /// Count of 1st..4th place finishes.
    pub placements: [u32; PLACEMENT_BUCKETS],
    /// Rank in each qualifier stage, `None` where the player was not seeded
    /// or the stage has no result yet.
    pub stage_ranks: Vec<Option<u32>>,
    #[serde(default)]
    pub best_game: Option<StageScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualifierResultEntry {
    pub rank: u32,
    pub name: String,
    pub points: u32,
    pub placements: [u32; PLACEMENT_BUCKETS],
    pub best_game_level: u32,
    #[serde(default)]
    pub best_game_grade: Option<Grade>,
    #[serde(default)]
    pub best_game_time: Option<u64>,
    #[serde(default)]
    pub best_game_time_diff_best: Option<i64>,
}

// ── Round dependencies and finalisation ────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RoundDependencyKind {
    FirstRoundEntry,
    QualifierRoundResult,
    #[serde(rename_all = "camelCase")]
    TournamentRoundResult { round_index: usize },
}

/// Caller-supplied data satisfying a [`RoundDependencyKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RoundDependencyData {
    FirstRoundEntry {
        participants: Vec<Participant>,
    },
    QualifierRoundResult {
        result: Vec<QualifierResultEntry>,
    },
    #[serde(rename_all = "camelCase")]
    TournamentRoundResult {
        round_index: usize,
        /// One list per stage, in stage order; a list may be partial.
        stage_results: Vec<Vec<StageResultEntry>>,
    },
}

impl RoundDependencyData {
    pub fn kind(&self) -> RoundDependencyKind {
        match self {
            RoundDependencyData::FirstRoundEntry { .. } => RoundDependencyKind::FirstRoundEntry,
            RoundDependencyData::QualifierRoundResult { .. } => {
                RoundDependencyKind::QualifierRoundResult
            }
            RoundDependencyData::TournamentRoundResult { round_index, .. } => {
                RoundDependencyKind::TournamentRoundResult {
                    round_index: *round_index,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementComparison {
    pub rank_id: RankId,
    pub name: String,
    pub entries: Vec<SupplementComparisonEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RoundFinalizeResult {
    Qualifier {
        scores: Vec<QualifierScoreEntry>,
        result: Vec<QualifierResultEntry>,
    },
    SupplementComparisons {
        comparisons: Vec<SupplementComparison>,
    },
}
