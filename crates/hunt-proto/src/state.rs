//! Cross-cycle dedup state.
//!
//! The daemon loads this once at the start of every cycle, mutates it while
//! the passes run and writes it back after each pass that searched and at
//! the end. Ids only accumulate
//! until the epoch expires; then every set and the timestamp are replaced
//! together.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HuntState {
    #[serde(default)]
    pub processed_artist_ids: BTreeSet<i64>,
    #[serde(default)]
    pub processed_album_ids: BTreeSet<i64>,
    /// Target ids of upgrade searches; only used when upgrade dedup persists.
    #[serde(default)]
    pub processed_upgrade_ids: BTreeSet<i64>,
    pub last_reset_time: DateTime<Utc>,
}

impl HuntState {
    pub fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            processed_artist_ids: BTreeSet::new(),
            processed_album_ids: BTreeSet::new(),
            processed_upgrade_ids: BTreeSet::new(),
            last_reset_time: now,
        }
    }

    /// Start a new epoch if the current one is older than `interval_hours`.
    ///
    /// Returns whether a reset happened. `interval_hours <= 0` never resets,
    /// and neither does an interval too long to represent.
    pub fn reset_if_expired(&mut self, now: DateTime<Utc>, interval_hours: i64) -> bool {
        if interval_hours <= 0 {
            return false;
        }
        let Some(interval) = Duration::try_hours(interval_hours) else {
            return false;
        };
        if now - self.last_reset_time <= interval {
            return false;
        }
        *self = Self::fresh(now);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.processed_artist_ids.is_empty()
            && self.processed_album_ids.is_empty()
            && self.processed_upgrade_ids.is_empty()
    }
}

pub struct StateStore {
    state_file: PathBuf,
}

impl StateStore {
    pub fn new(state_file: PathBuf) -> Self {
        Self { state_file }
    }

    pub fn path(&self) -> &Path {
        &self.state_file
    }

    /// Read the state, starting a new epoch when the stored one has expired.
    ///
    /// A missing or unreadable file yields a fresh state stamped `now`.
    pub fn load(&self, now: DateTime<Utc>, reset_interval_hours: i64) -> HuntState {
        let mut state = self.read().unwrap_or_else(|| HuntState::fresh(now));

        if state.reset_if_expired(now, reset_interval_hours) {
            info!(
                "State reset: more than {}h since last reset, processed items forgotten",
                reset_interval_hours
            );
        }
        state
    }

    pub fn save(&self, state: &HuntState) -> anyhow::Result<()> {
        if let Some(parent) = self.state_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write beside the target and rename so a crash never leaves half a file.
        let tmp = self.state_file.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(state)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.state_file)?;
        debug!(
            "State saved: {} artist(s), {} album(s), {} upgrade(s)",
            state.processed_artist_ids.len(),
            state.processed_album_ids.len(),
            state.processed_upgrade_ids.len()
        );
        Ok(())
    }

    fn read(&self) -> Option<HuntState> {
        let content = match std::fs::read_to_string(&self.state_file) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No state file at {:?}, starting fresh", self.state_file);
                return None;
            }
            Err(e) => {
                warn!("Could not read state file {:?}: {}", self.state_file, e);
                return None;
            }
        };

        match serde_json::from_str::<HuntState>(&content) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(
                    "State file {:?} is corrupt ({}), starting fresh",
                    self.state_file, e
                );
                None
            }
        }
    }
}
