//! Engine configuration, resolved before the core runs.

use fastrand::Rng;

use crate::constants::{
    DEFAULT_BOARD_SIZE, DEFAULT_FALLBACK_ITERATIONS, DEFAULT_ITERATIONS, MAX_BOARD_SIZE,
    MIN_BOARD_SIZE,
};
use crate::error::ConfigError;
use crate::playout::PlayoutPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Rows and columns of the board, fixed for the process lifetime
    pub board_size: usize,
    /// Iterations per AI move
    pub iterations: usize,
    /// Iterations for the synchronous search run when the worker fails
    pub fallback_iterations: usize,
    pub policy: PlayoutPolicy,
    /// Seed for reproducible searches; `None` seeds from the OS
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            board_size: DEFAULT_BOARD_SIZE,
            iterations: DEFAULT_ITERATIONS,
            fallback_iterations: DEFAULT_FALLBACK_ITERATIONS,
            policy: PlayoutPolicy::Uniform,
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.board_size < MIN_BOARD_SIZE {
            return Err(ConfigError::BoardTooSmall(self.board_size, MIN_BOARD_SIZE));
        }
        if self.board_size > MAX_BOARD_SIZE {
            return Err(ConfigError::BoardTooLarge(self.board_size, MAX_BOARD_SIZE));
        }
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.fallback_iterations == 0 || self.fallback_iterations > self.iterations {
            return Err(ConfigError::FallbackExceedsBudget {
                fallback: self.fallback_iterations,
                budget: self.iterations,
            });
        }
        if let PlayoutPolicy::NearPlacementBiased { distance: 0 } = self.policy {
            return Err(ConfigError::ZeroNearDistance);
        }
        Ok(())
    }

    /// Random generator for this configuration.
    pub fn rng(&self) -> Rng {
        match self.seed {
            Some(seed) => Rng::with_seed(seed),
            None => Rng::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.board_size, 15);
        assert_eq!(config.policy, PlayoutPolicy::Uniform);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validation_errors() {
        let base = EngineConfig::default();

        let config = EngineConfig { board_size: 4, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::BoardTooSmall(4, 5)));

        let config = EngineConfig { board_size: 30, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::BoardTooLarge(30, 25)));

        let config = EngineConfig { iterations: 0, ..base.clone() };
        assert_eq!(config.validate(), Err(ConfigError::ZeroIterations));

        let config = EngineConfig {
            iterations: 100,
            fallback_iterations: 200,
            ..base.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FallbackExceedsBudget { .. })
        ));

        let config = EngineConfig {
            policy: PlayoutPolicy::NearPlacementBiased { distance: 0 },
            ..base
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroNearDistance));
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let config = EngineConfig {
            seed: Some(123),
            ..EngineConfig::default()
        };
        assert_eq!(config.rng().u64(..), config.rng().u64(..));
    }
}
