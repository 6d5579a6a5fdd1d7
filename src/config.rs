//! Solver configuration.
//!
//! Load the search budget from TOML so callers can tune it without code
//! changes:
//!
//! ```
//! use rummikub_move_solver::SolverConfig;
//! use std::time::Duration;
//!
//! let config = SolverConfig::from_toml_str(r#"
//!     time_limit_ms = 2000
//!     node_limit = 500000
//! "#).unwrap();
//!
//! assert_eq!(config.time_limit(), Duration::from_millis(2000));
//! assert_eq!(config.node_limit, Some(500_000));
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Search budget for one solve.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SolverConfig {
    /// Wall-clock budget; exceeding it means "no improving move found".
    pub time_limit_ms: u64,

    /// Optional cap on search nodes, for reproducible budgets.
    pub node_limit: Option<u64>,

    /// Nodes explored between two clock reads.
    pub check_interval: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 30_000,
            node_limit: None,
            check_interval: 256,
        }
    }
}

impl SolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from a TOML string. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn with_time_limit_ms(mut self, ms: u64) -> Self {
        self.time_limit_ms = ms;
        self
    }

    pub fn with_node_limit(mut self, nodes: u64) -> Self {
        self.node_limit = Some(nodes);
        self
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}
