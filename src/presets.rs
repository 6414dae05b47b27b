//! Named competition shapes. Built-ins ship with the engine; more can be
//! loaded from a JSON file (see `config`).

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};
use crate::types::{CompetitionKind, HandicapMethod, RoundDestination, QUALIFIER_FINAL_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetRound {
    pub name: String,
    pub num_stages: usize,
    /// Winners per stage; losers are whoever is left.
    #[serde(default)]
    pub winners: Option<usize>,
    /// Losers per stage; winners are whoever is left.
    #[serde(default)]
    pub losers: Option<usize>,
    /// Each stage has a wildcard slot right after its winners.
    #[serde(default)]
    pub wildcard: bool,
    #[serde(default)]
    pub num_wildcard_winners: Option<usize>,
    #[serde(default)]
    pub winners_destination: Option<RoundDestination>,
    #[serde(default)]
    pub losers_destination: Option<RoundDestination>,
}

impl PresetRound {
    pub fn is_final(&self) -> bool {
        self.winners_destination.is_none() && self.losers_destination.is_none()
    }

    /// Winner and loser counts for a stage of `size` players.
    pub fn split(&self, size: usize) -> EngineResult<(usize, usize)> {
        let wildcard = usize::from(self.wildcard);
        let too_small = || {
            EngineError::InvalidConfiguration(format!(
                "{}: a stage of {size} players cannot hold {:?} winners, {:?} losers and {wildcard} wildcard",
                self.name, self.winners, self.losers
            ))
        };
        match (self.winners, self.losers) {
            (Some(w), Some(l)) => {
                if w + wildcard + l != size {
                    return Err(EngineError::InvalidConfiguration(format!(
                        "{}: {w} winners + {wildcard} wildcard + {l} losers don't add up to stage size {size}",
                        self.name
                    )));
                }
                Ok((w, l))
            }
            (Some(w), None) => {
                let l = size.checked_sub(w + wildcard).ok_or_else(too_small)?;
                Ok((w, l))
            }
            (None, Some(l)) => {
                let w = size.checked_sub(l + wildcard).ok_or_else(too_small)?;
                Ok((w, l))
            }
            (None, None) if self.is_final() => {
                let l = size.checked_sub(1 + wildcard).ok_or_else(too_small)?;
                Ok((1, l))
            }
            (None, None) => Err(EngineError::InvalidConfiguration(format!(
                "{}: round advances players but defines neither winners nor losers",
                self.name
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetDefinition {
    pub name: String,
    pub kind: CompetitionKind,
    pub min_players: usize,
    pub max_players: usize,
    /// Qualifier heats as global player indices.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub heats: Vec<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rounds: Vec<PresetRound>,
}

impl PresetDefinition {
    pub fn supports(&self, num_players: usize) -> bool {
        (self.min_players..=self.max_players).contains(&num_players)
    }

    /// Checks everything that does not depend on the actual player count.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |msg: String| Err(EngineError::InvalidConfiguration(format!("preset {}: {msg}", self.name)));
        if self.min_players == 0 || self.min_players > self.max_players {
            return invalid(format!(
                "player range {}..={} is empty",
                self.min_players, self.max_players
            ));
        }
        match self.kind {
            CompetitionKind::QualifierFinal => {
                let Some(first) = self.heats.first() else {
                    return invalid("qualifier preset has no heats".to_string());
                };
                let heat_size = first.len();
                let mut seen = HashSet::new();
                for (idx, heat) in self.heats.iter().enumerate() {
                    if heat.len() != heat_size {
                        return invalid(format!("heat {} has {} players, expected {heat_size}", idx + 1, heat.len()));
                    }
                    let unique: HashSet<usize> = heat.iter().copied().collect();
                    if unique.len() != heat.len() {
                        return invalid(format!("heat {} lists a player twice", idx + 1));
                    }
                    seen.extend(unique);
                }
                let players = seen.len();
                if self.min_players != players || self.max_players != players || seen.iter().any(|i| *i >= players) {
                    return invalid(format!(
                        "heats must cover player indices 0..{} exactly",
                        self.max_players
                    ));
                }
                if players < QUALIFIER_FINAL_SIZE {
                    return invalid(format!("needs at least {QUALIFIER_FINAL_SIZE} players for the final"));
                }
            }
            CompetitionKind::Tournament => {
                if self.rounds.is_empty() {
                    return invalid("tournament preset has no rounds".to_string());
                }
                for (idx, round) in self.rounds.iter().enumerate() {
                    if round.num_stages == 0 {
                        return invalid(format!("{} has no stages", round.name));
                    }
                    if !round.is_final() && round.winners.is_none() && round.losers.is_none() {
                        return invalid(format!(
                            "{} advances players but defines neither winners nor losers",
                            round.name
                        ));
                    }
                    let wildcard_winners = round.num_wildcard_winners.unwrap_or(0);
                    if wildcard_winners > 0 && !round.wildcard {
                        return invalid(format!("{} has wildcard winners but no wildcard slot", round.name));
                    }
                    if wildcard_winners > round.num_stages {
                        return invalid(format!(
                            "{} takes {wildcard_winners} wildcard winners from {} stages",
                            round.name, round.num_stages
                        ));
                    }
                    for destination in [&round.winners_destination, &round.losers_destination]
                        .into_iter()
                        .flatten()
                    {
                        if destination.round_index <= idx || destination.round_index >= self.rounds.len() {
                            return invalid(format!(
                                "{} sends players to round {}, which is not a later round",
                                round.name, destination.round_index
                            ));
                        }
                    }
                    let fed = self.rounds.iter().any(|r| {
                        [&r.winners_destination, &r.losers_destination]
                            .into_iter()
                            .flatten()
                            .any(|d| d.round_index == idx)
                    });
                    if idx > 0 && !fed {
                        return invalid(format!("{} is never fed by an earlier round", round.name));
                    }
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PresetCatalog {
    presets: Vec<PresetDefinition>,
}

impl PresetCatalog {
    pub fn builtin() -> Self {
        PresetCatalog {
            presets: vec![qualifier8(), wildcard12(), single16()],
        }
    }

    pub fn from_presets(presets: Vec<PresetDefinition>) -> EngineResult<Self> {
        let mut catalog = PresetCatalog::default();
        catalog.merge(presets)?;
        Ok(catalog)
    }

    /// Reads a JSON array of presets.
    pub fn read_file(path: &Path) -> EngineResult<Vec<PresetDefinition>> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Adds presets, replacing any existing preset with the same name.
    pub fn merge(&mut self, presets: Vec<PresetDefinition>) -> EngineResult<()> {
        for preset in presets {
            preset.validate()?;
            match self.presets.iter_mut().find(|p| p.name == preset.name) {
                Some(existing) => *existing = preset,
                None => self.presets.push(preset),
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PresetDefinition> {
        self.presets.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PresetDefinition> {
        self.presets.iter()
    }

    /// Explicit preset by name, or the first preset of `kind` whose player
    /// range contains `num_players`.
    pub fn select(
        &self,
        name: Option<&str>,
        kind: CompetitionKind,
        num_players: usize,
    ) -> EngineResult<&PresetDefinition> {
        let preset = match name {
            Some(name) => self.get(name).ok_or_else(|| {
                EngineError::InvalidConfiguration(format!("unknown preset {name:?}"))
            })?,
            None => self
                .presets
                .iter()
                .find(|p| p.kind == kind && p.supports(num_players))
                .ok_or_else(|| {
                    EngineError::InvalidConfiguration(format!(
                        "no {kind:?} preset supports {num_players} players"
                    ))
                })?,
        };
        if preset.kind != kind {
            return Err(EngineError::InvalidConfiguration(format!(
                "preset {} is {:?}, not {kind:?}",
                preset.name, preset.kind
            )));
        }
        if !preset.supports(num_players) {
            return Err(EngineError::InvalidConfiguration(format!(
                "preset {} supports {}..={} players, got {num_players}",
                preset.name, preset.min_players, preset.max_players
            )));
        }
        Ok(preset)
    }
}

// ── Built-in presets ───────────────────────────────────────────────────

fn destination(round_index: usize, handicap: HandicapMethod) -> Option<RoundDestination> {
    Some(RoundDestination {
        round_index,
        distribution: Default::default(),
        handicap,
    })
}

/// Eight players, three heats each, top four to the final.
fn qualifier8() -> PresetDefinition {
    PresetDefinition {
        name: "qualifier8".to_string(),
        kind: CompetitionKind::QualifierFinal,
        min_players: 8,
        max_players: 8,
        heats: vec![
            vec![0, 1, 2, 3],
            vec![4, 5, 6, 7],
            vec![0, 1, 4, 5],
            vec![2, 3, 6, 7],
            vec![0, 3, 5, 6],
            vec![1, 2, 4, 7],
        ],
        rounds: Vec::new(),
    }
}

/// Groups with one wildcard, a repechage for everyone else, six-player final.
fn wildcard12() -> PresetDefinition {
    PresetDefinition {
        name: "wildcard12".to_string(),
        kind: CompetitionKind::Tournament,
        min_players: 8,
        max_players: 12,
        heats: Vec::new(),
        rounds: vec![
            PresetRound {
                name: "Round 1".to_string(),
                num_stages: 3,
                winners: Some(1),
                losers: None,
                wildcard: true,
                num_wildcard_winners: Some(1),
                winners_destination: destination(2, HandicapMethod::WinnersDest),
                losers_destination: destination(1, HandicapMethod::Losers),
            },
            PresetRound {
                name: "Repechage".to_string(),
                num_stages: 2,
                winners: Some(1),
                losers: None,
                wildcard: false,
                num_wildcard_winners: None,
                winners_destination: destination(2, HandicapMethod::None),
                losers_destination: None,
            },
            PresetRound {
                name: "Final".to_string(),
                num_stages: 1,
                winners: Some(1),
                losers: None,
                wildcard: false,
                num_wildcard_winners: None,
                winners_destination: None,
                losers_destination: None,
            },
        ],
    }
}

/// Four groups, two semifinals, four-player final.
fn single16() -> PresetDefinition {
    PresetDefinition {
        name: "single16".to_string(),
        kind: CompetitionKind::Tournament,
        min_players: 13,
        max_players: 16,
        heats: Vec::new(),
        rounds: vec![
            PresetRound {
                name: "Round 1".to_string(),
                num_stages: 4,
                winners: Some(2),
                losers: None,
                wildcard: false,
                num_wildcard_winners: None,
                winners_destination: destination(1, HandicapMethod::WinnersDest2),
                losers_destination: None,
            },
            PresetRound {
                name: "Semifinal".to_string(),
                num_stages: 2,
                winners: None,
                losers: Some(2),
                wildcard: false,
                num_wildcard_winners: None,
                winners_destination: destination(2, HandicapMethod::WinnersPure),
                losers_destination: None,
            },
            PresetRound {
                name: "Final".to_string(),
                num_stages: 1,
                winners: Some(1),
                losers: None,
                wildcard: false,
                num_wildcard_winners: None,
                winners_destination: None,
                losers_destination: None,
            },
        ],
    }
}
