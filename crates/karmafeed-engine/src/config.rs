use std::path::Path;

use karmafeed_ledger::leaderboard::{DEFAULT_LIMIT, DEFAULT_WINDOW_SECS};
use karmafeed_ledger::LeaderboardQuery;
use serde::{Deserialize, Serialize};

use crate::error::FeedError;

/// Tunables of the feed core. Karma amounts are fixed and not listed here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub leaderboard_window_secs: u64,
    pub leaderboard_limit: usize,
    pub max_title_len: usize,
    pub default_post_title: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            leaderboard_window_secs: DEFAULT_WINDOW_SECS,
            leaderboard_limit: DEFAULT_LIMIT,
            max_title_len: 200,
            default_post_title: "Untitled Post".into(),
        }
    }
}

impl FeedConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, FeedError> {
        let config: Self = toml::from_str(text).map_err(|e| FeedError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FeedError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "feed config loaded");
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, FeedError> {
        toml::to_string_pretty(self).map_err(|e| FeedError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), FeedError> {
        if self.leaderboard_window_secs == 0 {
            return Err(FeedError::Config("leaderboard_window_secs must be positive".into()));
        }
        if self.leaderboard_limit == 0 {
            return Err(FeedError::Config("leaderboard_limit must be positive".into()));
        }
        if self.max_title_len == 0 {
            return Err(FeedError::Config("max_title_len must be positive".into()));
        }
        if self.default_post_title.chars().count() > self.max_title_len {
            return Err(FeedError::Config(
                "default_post_title is longer than max_title_len".into(),
            ));
        }
        Ok(())
    }

    /// The leaderboard query these settings describe.
    pub fn leaderboard_query(&self) -> LeaderboardQuery {
        LeaderboardQuery::new(self.leaderboard_window_secs, self.leaderboard_limit)
    }
}
