//! The crash-safe snapshot: frontier, robots cache, and cooldown map —
//! never the transport or database connections, which are reconstructed
//! fresh on every load (see `spec.md` §9, "persistable state with live
//! resources").

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crawler_core::{CanonicalUrl, HostKey};
use crawler_robots::RobotsEntrySnapshot;

#[derive(Serialize, Deserialize)]
pub struct Snapshot {
    pub frontier: HashMap<HostKey, HashSet<CanonicalUrl>>,
    pub robots: Vec<(HostKey, RobotsEntrySnapshot)>,
    pub cooldowns: HashMap<HostKey, DateTime<Utc>>,
}

impl Snapshot {
    pub fn save(&self, path: &str) -> anyhow::Result<()> {
        let bytes = bincode::serialize(self)?;
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: &str) -> anyhow::Result<Option<Snapshot>> {
        if !std::path::Path::new(path).exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(path)?;
        Ok(Some(bincode::deserialize(&bytes)?))
    }
}
