//! Typed view of the Lidarr v1 catalog payloads.
//!
//! The upstream API omits keys freely, so every field that the daemon reads
//! carries an explicit default here and nothing downstream has to guess:
//!
//! | field                 | default            |
//! |-----------------------|--------------------|
//! | names / titles        | `"Unknown ..."`    |
//! | `monitored`, `hasFile`| `false`            |
//! | statistics counters   | `0`                |
//! | quality / profile ids | `None`             |
//!
//! Quality and profile identifiers are read leniently: anything that is not a
//! JSON integer becomes `None`, which the quality check treats as "no upgrade".

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Quality profiles keyed by profile id.
pub type ProfileMap = HashMap<i64, QualityProfile>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    #[serde(default)]
    pub track_count: i64,
    #[serde(default)]
    pub track_file_count: i64,
    #[serde(default)]
    pub size_on_disk: i64,
}

impl Statistics {
    pub fn missing_tracks(&self) -> i64 {
        (self.track_count - self.track_file_count).max(0)
    }

    pub fn is_incomplete(&self) -> bool {
        self.track_count > self.track_file_count
    }

    /// Every track has a file and something is actually on disk.
    pub fn is_fully_downloaded(&self) -> bool {
        self.track_count == self.track_file_count && self.size_on_disk > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artist {
    pub id: i64,
    #[serde(default = "unknown_artist")]
    pub artist_name: String,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quality_profile_id: Option<i64>,
}

impl Artist {
    pub fn is_incomplete(&self) -> bool {
        self.statistics.is_incomplete()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: i64,
    #[serde(default = "unknown_album")]
    pub title: String,
    #[serde(default)]
    pub artist_id: i64,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub statistics: Statistics,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quality_profile_id: Option<i64>,
    #[serde(default)]
    pub quality: Option<QualityModel>,
    #[serde(default)]
    pub quality_cutoff_not_met: Option<bool>,
    /// Embedded owner, present on `wanted/cutoff` records.
    #[serde(default)]
    pub artist: Option<Artist>,
}

impl Album {
    pub fn is_incomplete(&self) -> bool {
        self.statistics.is_incomplete()
    }

    pub fn quality_id(&self) -> Option<i64> {
        self.quality.as_ref().and_then(QualityModel::id)
    }

    /// Owning artist id, preferring the embedded artist when the flat field is absent.
    pub fn owner_id(&self) -> i64 {
        match (&self.artist, self.artist_id) {
            (Some(artist), 0) => artist.id,
            (_, id) => id,
        }
    }

    pub fn owner_name(&self) -> &str {
        self.artist
            .as_ref()
            .map(|a| a.artist_name.as_str())
            .unwrap_or("Unknown Artist")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: i64,
    #[serde(default = "unknown_track")]
    pub title: String,
    #[serde(default)]
    pub album_id: i64,
    #[serde(default)]
    pub artist_id: i64,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default, deserialize_with = "lenient_int")]
    pub quality_profile_id: Option<i64>,
    #[serde(default)]
    pub quality: Option<QualityModel>,
}

impl Track {
    pub fn is_missing(&self) -> bool {
        !self.has_file
    }

    pub fn quality_id(&self) -> Option<i64> {
        self.quality.as_ref().and_then(QualityModel::id)
    }
}

/// `{"quality": {"id": 6, "name": "MP3-320"}}` as attached to albums and tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityModel {
    #[serde(default)]
    pub quality: Option<QualityDefinition>,
}

impl QualityModel {
    pub fn id(&self) -> Option<i64> {
        self.quality.as_ref().and_then(|q| q.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityDefinition {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityProfile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub cutoff: Option<i64>,
    /// Allowed quality tiers, in upstream order. Passed through untouched.
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

pub fn profile_map(profiles: Vec<QualityProfile>) -> ProfileMap {
    profiles.into_iter().map(|p| (p.id, p)).collect()
}

/// One page of a paginated `wanted/*` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(default)]
    pub page: i64,
    #[serde(default)]
    pub page_size: i64,
    #[serde(default)]
    pub total_records: i64,
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

/// Body returned by `POST command`. An acknowledged command carries an id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandAck {
    #[serde(default, deserialize_with = "lenient_int")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_i64()))
}

fn unknown_artist() -> String {
    "Unknown Artist".to_string()
}

fn unknown_album() -> String {
    "Unknown Album".to_string()
}

fn unknown_track() -> String {
    "Unknown Track".to_string()
}
