//! The read/command surface the daemon needs from Lidarr.
//!
//! The collector and the search workflow only see this trait, so tests can
//! swap the HTTP client for a scripted catalog.

use async_trait::async_trait;
use hunt_proto::catalog::{Album, Artist, Page, QualityProfile, Track};
use std::fmt;

use crate::client::ApiError;

/// Commands accepted by `POST /api/v1/command`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    RefreshArtist { artist_id: i64 },
    MissingAlbumSearch { artist_id: i64 },
    /// `AlbumSearch` scoped to one album.
    AlbumSearch { album_id: i64 },
    /// `AlbumSearch` over every album of an artist.
    ArtistAlbumSearch { artist_id: i64 },
    TrackSearch { track_id: i64 },
}

/// Wire form of a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBody {
    pub name: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artist_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub album_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub track_ids: Vec<i64>,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshArtist { .. } => "RefreshArtist",
            Self::MissingAlbumSearch { .. } => "MissingAlbumSearch",
            Self::AlbumSearch { .. } | Self::ArtistAlbumSearch { .. } => "AlbumSearch",
            Self::TrackSearch { .. } => "TrackSearch",
        }
    }

    pub fn body(&self) -> CommandBody {
        let mut body = CommandBody {
            name: self.name(),
            artist_ids: Vec::new(),
            album_ids: Vec::new(),
            track_ids: Vec::new(),
        };
        match *self {
            Self::RefreshArtist { artist_id }
            | Self::MissingAlbumSearch { artist_id }
            | Self::ArtistAlbumSearch { artist_id } => body.artist_ids.push(artist_id),
            Self::AlbumSearch { album_id } => body.album_ids.push(album_id),
            Self::TrackSearch { track_id } => body.track_ids.push(track_id),
        }
        body
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::RefreshArtist { artist_id }
            | Self::MissingAlbumSearch { artist_id }
            | Self::ArtistAlbumSearch { artist_id } => {
                write!(f, "{}{{artistIds:[{}]}}", self.name(), artist_id)
            }
            Self::AlbumSearch { album_id } => write!(f, "AlbumSearch{{albumIds:[{}]}}", album_id),
            Self::TrackSearch { track_id } => write!(f, "TrackSearch{{trackIds:[{}]}}", track_id),
        }
    }
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn artists(&self) -> Result<Vec<Artist>, ApiError>;

    async fn albums_for_artist(&self, artist_id: i64) -> Result<Vec<Album>, ApiError>;

    async fn tracks_for_album(&self, album_id: i64) -> Result<Vec<Track>, ApiError>;

    async fn quality_profiles(&self) -> Result<Vec<QualityProfile>, ApiError>;

    /// One page (1-based) of albums whose quality cutoff is unmet.
    async fn cutoff_unmet(&self, page: i64, page_size: i64) -> Result<Page<Album>, ApiError>;

    /// Issue a command. `Ok` carries the id upstream assigned to it.
    async fn send_command(&self, command: &Command) -> Result<i64, ApiError>;
}
