use serde::Serialize;
use thiserror::Error;

use crate::types::RankId;

/// Fatal engine failures. None of these are retried; callers surface the
/// message as-is.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("malformed result: {0}")]
    MalformedResult(String),

    #[error("supplement comparison {rank_id} expected {expected} players, collected {actual}")]
    SupplementCountMismatch {
        rank_id: RankId,
        expected: usize,
        actual: usize,
    },

    #[error("engine consistency error: {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of an operation that depends on upstream data the caller may not
/// have yet. `NotReady` is expected and recoverable: call again once more
/// results have been recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "value")]
pub enum Readiness<T> {
    Ready(T),
    NotReady(String),
}

impl<T> Readiness<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            Readiness::Ready(value) => Some(value),
            Readiness::NotReady(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Readiness<U> {
        match self {
            Readiness::Ready(value) => Readiness::Ready(f(value)),
            Readiness::NotReady(reason) => Readiness::NotReady(reason),
        }
    }
}

/// Early-returns `NotReady` from a function yielding `EngineResult<Readiness<_>>`.
macro_rules! try_ready {
    ($expr:expr) => {
        match $expr {
            $crate::error::Readiness::Ready(value) => value,
            $crate::error::Readiness::NotReady(reason) => {
                return Ok($crate::error::Readiness::NotReady(reason))
            }
        }
    };
}
pub(crate) use try_ready;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_map_keeps_reason() {
        let pending: Readiness<u32> = Readiness::NotReady("stage 2 incomplete".to_string());
        assert_eq!(
            pending.map(|v| v + 1),
            Readiness::NotReady("stage 2 incomplete".to_string())
        );
        assert_eq!(Readiness::Ready(1).map(|v| v + 1).ready(), Some(2));
    }

    #[test]
    fn test_supplement_mismatch_message() {
        let err = EngineError::SupplementCountMismatch {
            rank_id: RankId::TopWinner(2),
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "supplement comparison Tw2 expected 3 players, collected 2"
        );
    }
}
