use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use karmafeed_types::{Comment, KarmaTransaction, Like, Post, User};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Every table of a feed store, as plain rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub posts: Vec<Post>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub likes: Vec<Like>,
    #[serde(default)]
    pub karma_transactions: Vec<KarmaTransaction>,
}

impl FeedSnapshot {
    pub fn to_json(&self) -> StoreResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn write_to(&self, path: &Path) -> StoreResult<()> {
        fs::write(path, self.to_json()?)?;
        tracing::info!(path = %path.display(), "feed snapshot written");
        Ok(())
    }

    pub fn read_from(path: &Path) -> StoreResult<Self> {
        let json = fs::read_to_string(path)?;
        let snapshot = Self::from_json(&json)?;
        tracing::info!(path = %path.display(), version = snapshot.version, "feed snapshot read");
        Ok(snapshot)
    }
}
