//! Zig-zag distribution of seeded players across destination groups:
//! `g0, g1, .., gN, gN, .., g1, g0` and repeat.

use crate::error::{EngineError, EngineResult};

/// Folds a position in the repeating `2 * groups` cycle back onto a group
/// index. Positions past the first cycle wrap around.
pub fn snake_group(slot: usize, groups: usize) -> EngineResult<usize> {
    if groups == 0 {
        return Err(EngineError::Inconsistent(
            "snake seeding needs at least one group".to_string(),
        ));
    }
    let slot = slot % (2 * groups);
    if slot < groups {
        Ok(slot)
    } else {
        Ok(2 * groups - 1 - slot)
    }
}

/// Next position in the zig-zag cycle consistent with the current fill
/// counts. Even fills run forward when balanced and odd ones backward; an
/// unbalanced fill must be a single step of exactly one between neighbours.
pub fn next_snake_slot(counts: &[usize]) -> EngineResult<usize> {
    let groups = counts.len();
    if groups == 0 {
        return Err(EngineError::Inconsistent(
            "snake seeding needs at least one group".to_string(),
        ));
    }

    let steps: Vec<usize> = (0..groups - 1)
        .filter(|&i| counts[i] != counts[i + 1])
        .collect();

    match steps.as_slice() {
        [] => {
            if counts[0] % 2 == 0 {
                Ok(0)
            } else {
                Ok(groups)
            }
        }
        [i] => {
            let (left, right) = (counts[*i], counts[*i + 1]);
            if left == right + 1 {
                Ok(i + 1)
            } else if left + 1 == right {
                Ok(2 * groups - 1 - i)
            } else {
                Err(EngineError::Inconsistent(format!(
                    "snake fill counts {counts:?} differ by more than one"
                )))
            }
        }
        _ => Err(EngineError::Inconsistent(format!(
            "snake fill counts {counts:?} are not a single zig-zag step"
        ))),
    }
}

/// Fill counts for a set of destination groups, placing one player at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnakeSeeder {
    counts: Vec<usize>,
}

impl SnakeSeeder {
    pub fn new(groups: usize) -> Self {
        SnakeSeeder {
            counts: vec![0; groups],
        }
    }

    /// Returns the group the next player goes to and records the placement.
    pub fn place(&mut self) -> EngineResult<usize> {
        let slot = next_snake_slot(&self.counts)?;
        let group = snake_group(slot, self.counts.len())?;
        self.counts[group] += 1;
        Ok(group)
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn into_counts(self) -> Vec<usize> {
        self.counts
    }
}
