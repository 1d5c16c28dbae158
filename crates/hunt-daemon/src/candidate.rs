use std::fmt;

use crate::api::Command;

/// One thing the daemon may act on, with every id the workflow needs so
/// nothing has to be re-fetched between collection and search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub artist_id: i64,
    pub artist_name: String,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Artist with tracks that have no file.
    MissingArtist { missing_tracks: i64 },
    /// Album that is incomplete or below its quality cutoff.
    Album { album_id: i64, title: String },
    /// Track below its quality cutoff.
    Track {
        track_id: i64,
        title: String,
        album_id: i64,
        album_title: String,
    },
    /// Artist owning at least one album below cutoff.
    ArtistUpgrade,
}

impl Candidate {
    pub fn missing_artist(artist_id: i64, artist_name: &str, missing_tracks: i64) -> Self {
        Self {
            artist_id,
            artist_name: artist_name.to_string(),
            target: Target::MissingArtist { missing_tracks },
        }
    }

    pub fn album(artist_id: i64, artist_name: &str, album_id: i64, title: &str) -> Self {
        Self {
            artist_id,
            artist_name: artist_name.to_string(),
            target: Target::Album {
                album_id,
                title: title.to_string(),
            },
        }
    }

    pub fn track(
        artist_id: i64,
        artist_name: &str,
        album_id: i64,
        album_title: &str,
        track_id: i64,
        title: &str,
    ) -> Self {
        Self {
            artist_id,
            artist_name: artist_name.to_string(),
            target: Target::Track {
                track_id,
                title: title.to_string(),
                album_id,
                album_title: album_title.to_string(),
            },
        }
    }

    pub fn artist_upgrade(artist_id: i64, artist_name: &str) -> Self {
        Self {
            artist_id,
            artist_name: artist_name.to_string(),
            target: Target::ArtistUpgrade,
        }
    }

    /// Id of the entity the search is about; this is what dedup records.
    pub fn target_id(&self) -> i64 {
        match self.target {
            Target::MissingArtist { .. } | Target::ArtistUpgrade => self.artist_id,
            Target::Album { album_id, .. } => album_id,
            Target::Track { track_id, .. } => track_id,
        }
    }

    pub fn refresh(&self) -> Command {
        Command::RefreshArtist {
            artist_id: self.artist_id,
        }
    }

    /// Primary search and, where one exists, the broader search tried when
    /// the primary is not acknowledged.
    pub fn search_plan(&self) -> (Command, Option<Command>) {
        let artist_id = self.artist_id;
        match self.target {
            Target::MissingArtist { .. } => (
                Command::MissingAlbumSearch { artist_id },
                Some(Command::ArtistAlbumSearch { artist_id }),
            ),
            Target::Album { album_id, .. } => (
                Command::AlbumSearch { album_id },
                Some(Command::ArtistAlbumSearch { artist_id }),
            ),
            Target::Track { track_id, .. } => (Command::TrackSearch { track_id }, None),
            Target::ArtistUpgrade => (Command::ArtistAlbumSearch { artist_id }, None),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::MissingArtist { missing_tracks } => write!(
                f,
                "{} (id {}, {} missing track(s))",
                self.artist_name, self.artist_id, missing_tracks
            ),
            Target::Album { album_id, title } => {
                write!(f, "{} - {} (album {})", self.artist_name, title, album_id)
            }
            Target::Track {
                track_id,
                title,
                album_id,
                album_title,
            } => write!(
                f,
                "{} - {} - {} (album {}, track {})",
                self.artist_name, album_title, title, album_id, track_id
            ),
            Target::ArtistUpgrade => write!(f, "{} (id {})", self.artist_name, self.artist_id),
        }
    }
}
