//! Engine configuration

use crate::eval::MAX_HOPS_LIMIT;

use thiserror::Error;

/// Error validating [`Config`]
#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Horizon is zero or larger than [`MAX_HOPS_LIMIT`]
    #[error("max hops {0} is out of range 1..={MAX_HOPS_LIMIT}")]
    BadMaxHops(u32),
    /// A piece must keep at least one best move
    #[error("best moves per piece must be positive")]
    NoBestMoves,
    /// The global best move list must not be empty
    #[error("best move list length must be positive")]
    EmptyBestMoveList,
}

/// Engine parameters, fixed for the lifetime of a [`Board`](crate::board::Board)
///
/// # Example
///
/// ```
/// # use tideval::Config;
/// #
/// let config = Config::default().with_max_hops(4);
/// assert!(config.validate().is_ok());
/// assert!(Config::default().with_max_hops(12).validate().is_err());
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Config {
    /// Horizon of the distance calculation, in hops
    pub max_hops: u32,
    /// Number of ranked candidate moves kept per piece
    pub best_moves_per_piece: usize,
    /// Length of the ranked move list kept per side
    pub best_move_list_len: usize,
}

impl Config {
    pub const DEFAULT_MAX_HOPS: u32 = 6;

    pub const fn new() -> Config {
        Config {
            max_hops: Self::DEFAULT_MAX_HOPS,
            best_moves_per_piece: 2,
            best_move_list_len: 20,
        }
    }

    #[must_use]
    pub const fn with_max_hops(mut self, max_hops: u32) -> Config {
        self.max_hops = max_hops;
        self
    }

    #[must_use]
    pub const fn with_best_moves_per_piece(mut self, n: usize) -> Config {
        self.best_moves_per_piece = n;
        self
    }

    #[must_use]
    pub const fn with_best_move_list_len(mut self, n: usize) -> Config {
        self.best_move_list_len = n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_hops == 0 || self.max_hops as usize > MAX_HOPS_LIMIT {
            return Err(ConfigError::BadMaxHops(self.max_hops));
        }
        if self.best_moves_per_piece == 0 {
            return Err(ConfigError::NoBestMoves);
        }
        if self.best_move_list_len == 0 {
            return Err(ConfigError::EmptyBestMoveList);
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert_eq!(Config::default().validate(), Ok(()));
        assert_eq!(Config::default().max_hops, 6);
        assert_eq!(
            Config::default().with_max_hops(0).validate(),
            Err(ConfigError::BadMaxHops(0))
        );
        assert_eq!(Config::default().with_max_hops(8).validate(), Ok(()));
        assert_eq!(
            Config::default().with_max_hops(9).validate(),
            Err(ConfigError::BadMaxHops(9))
        );
        assert_eq!(
            Config::default().with_best_moves_per_piece(0).validate(),
            Err(ConfigError::NoBestMoves)
        );
        assert_eq!(
            Config::default().with_best_move_list_len(0).validate(),
            Err(ConfigError::EmptyBestMoveList)
        );
    }
}
