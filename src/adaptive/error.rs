use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("player list must not be empty")]
    EmptyPlayers,
    #[error("feature batch must not be empty")]
    EmptyFeatureBatch,
    #[error("feature vector {index} has {found} dimensions, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
    #[error("match size {size} is outside [{min}, {max}]")]
    InvalidMatchSize { size: usize, min: usize, max: usize },
    #[error("duplicate player id: {0}")]
    DuplicatePlayerId(String),
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    #[error("non-finite value for {field}")]
    NonFinite { field: &'static str },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("too many players: {count} exceeds limit {limit}")]
    TooManyPlayers { count: usize, limit: usize },
    #[error("player not in batch: {0}")]
    UnknownPlayer(String),
}

impl EngineError {
    /// Stable machine-readable code surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyPlayers => "EMPTY_PLAYERS",
            Self::EmptyFeatureBatch => "EMPTY_FEATURES",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidMatchSize { .. } => "INVALID_MATCH_SIZE",
            Self::DuplicatePlayerId(_) => "DUPLICATE_PLAYER",
            Self::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            Self::NonFinite { .. } => "NON_FINITE_INPUT",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TooManyPlayers { .. } => "TOO_MANY_PLAYERS",
            Self::UnknownPlayer(_) => "UNKNOWN_PLAYER",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Rejects NaN and infinities; finite out-of-range values are clamped by callers instead.
pub fn ensure_finite(field: &'static str, value: f64) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::NonFinite { field })
    }
}

pub fn ensure_finite_opt(field: &'static str, value: Option<f64>) -> EngineResult<Option<f64>> {
    value.map(|v| ensure_finite(field, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::EmptyPlayers.code(), "EMPTY_PLAYERS");
        assert_eq!(
            EngineError::DuplicatePlayerId("a".into()).code(),
            "DUPLICATE_PLAYER"
        );
    }

    #[test]
    fn finite_check_rejects_nan() {
        assert!(ensure_finite("ability", f64::NAN).is_err());
        assert!(ensure_finite("ability", f64::INFINITY).is_err());
        assert_eq!(ensure_finite("ability", 1.5), Ok(1.5));
        assert_eq!(ensure_finite_opt("prev", None), Ok(None));
    }
}
