//! Builds the candidate list for one pass.
//!
//! Candidates come out in upstream order (artist, then album, then track),
//! which is the order sequential selection walks. A failed read below the
//! artist level only drops that subtree; a failed artist read is reported as
//! [`CollectError::CatalogUnavailable`] so the caller can back off.

use hunt_proto::catalog::{profile_map, Album, Artist, ProfileMap};
use hunt_proto::config::{HuntConfig, UpgradeMode};
use hunt_proto::quality::needs_upgrade;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::api::CatalogApi;
use crate::candidate::Candidate;

/// Records requested per `wanted/cutoff` page.
pub const CUTOFF_PAGE_SIZE: i64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("artist list unavailable")]
    CatalogUnavailable,
}

/// One selection pass of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    MissingArtists,
    MissingAlbums,
    UpgradeAlbums,
    UpgradeTracks,
    UpgradeArtists,
}

impl Pass {
    pub fn label(self) -> &'static str {
        match self {
            Self::MissingArtists => "missing artists",
            Self::MissingAlbums => "missing albums",
            Self::UpgradeAlbums => "album upgrades",
            Self::UpgradeTracks => "track upgrades",
            Self::UpgradeArtists => "artist upgrades",
        }
    }

    pub fn is_upgrade(self) -> bool {
        matches!(
            self,
            Self::UpgradeAlbums | Self::UpgradeTracks | Self::UpgradeArtists
        )
    }

    /// Passes switched on by `hunt`, in the order a cycle runs them.
    pub fn enabled(hunt: &HuntConfig) -> Vec<Pass> {
        let missing = hunt.missing_mode();
        let mut passes = Vec::new();
        if missing.includes_artists() {
            passes.push(Self::MissingArtists);
        }
        if missing.includes_albums() {
            passes.push(Self::MissingAlbums);
        }
        match hunt.upgrade_mode() {
            UpgradeMode::Off => {}
            UpgradeMode::Album => passes.push(Self::UpgradeAlbums),
            UpgradeMode::Track => passes.push(Self::UpgradeTracks),
            UpgradeMode::Artist => passes.push(Self::UpgradeArtists),
        }
        passes
    }
}

pub struct Collector<'a, C: CatalogApi + ?Sized> {
    api: &'a C,
    monitored_only: bool,
}

impl<'a, C: CatalogApi + ?Sized> Collector<'a, C> {
    pub fn new(api: &'a C, monitored_only: bool) -> Self {
        Self {
            api,
            monitored_only,
        }
    }

    pub async fn collect(&self, pass: Pass) -> Result<Vec<Candidate>, CollectError> {
        match pass {
            Pass::MissingArtists => self.missing_artists().await,
            Pass::MissingAlbums => self.missing_albums().await,
            Pass::UpgradeAlbums => self.upgrade_albums().await,
            Pass::UpgradeTracks => self.upgrade_tracks().await,
            Pass::UpgradeArtists => self.upgrade_artists().await,
        }
    }

    /// Monitored artists with at least one track lacking a file.
    pub async fn missing_artists(&self) -> Result<Vec<Candidate>, CollectError> {
        let artists = self.artists().await?;
        Ok(artists
            .iter()
            .filter(|a| a.is_incomplete())
            .map(|a| {
                Candidate::missing_artist(a.id, &a.artist_name, a.statistics.missing_tracks())
            })
            .collect())
    }

    pub async fn missing_albums(&self) -> Result<Vec<Candidate>, CollectError> {
        let mut candidates = Vec::new();
        for artist in self.artists().await? {
            for album in self.albums_of(&artist).await {
                if album.is_incomplete() {
                    candidates.push(Candidate::album(
                        artist.id,
                        &artist.artist_name,
                        album.id,
                        &album.title,
                    ));
                }
            }
        }
        Ok(candidates)
    }

    /// Albums below cutoff, read from `wanted/cutoff` when that works and
    /// from a full library scan otherwise.
    pub async fn upgrade_albums(&self) -> Result<Vec<Candidate>, CollectError> {
        if let Some(candidates) = self.cutoff_unmet_albums().await {
            if !candidates.is_empty() {
                return Ok(candidates);
            }
            debug!("wanted/cutoff returned nothing, scanning the library");
        }

        let Some(profiles) = self.profiles().await else {
            return Ok(Vec::new());
        };
        let mut candidates = Vec::new();
        for artist in self.artists().await? {
            for album in self.upgradeable_albums(&artist, &profiles).await {
                candidates.push(Candidate::album(
                    artist.id,
                    &artist.artist_name,
                    album.id,
                    &album.title,
                ));
            }
        }
        Ok(candidates)
    }

    pub async fn upgrade_tracks(&self) -> Result<Vec<Candidate>, CollectError> {
        let Some(profiles) = self.profiles().await else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        for artist in self.artists().await? {
            for album in self.albums_of(&artist).await {
                let tracks = match self.api.tracks_for_album(album.id).await {
                    Ok(tracks) => tracks,
                    Err(e) => {
                        warn!("Skipping album {} ({}): {}", album.title, album.id, e);
                        continue;
                    }
                };
                let album_profile = album.quality_profile_id.or(artist.quality_profile_id);

                for mut track in tracks {
                    if track.id <= 0 || (self.monitored_only && !track.monitored) {
                        continue;
                    }
                    if track.quality_profile_id.is_none() {
                        track.quality_profile_id = album_profile;
                    }
                    if needs_upgrade(&track, &profiles) {
                        candidates.push(Candidate::track(
                            artist.id,
                            &artist.artist_name,
                            album.id,
                            &album.title,
                            track.id,
                            &track.title,
                        ));
                    }
                }
            }
        }
        Ok(candidates)
    }

    /// Artists owning at least one monitored, present album below cutoff.
    pub async fn upgrade_artists(&self) -> Result<Vec<Candidate>, CollectError> {
        let Some(profiles) = self.profiles().await else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        for artist in self.artists().await? {
            if !self.upgradeable_albums(&artist, &profiles).await.is_empty() {
                candidates.push(Candidate::artist_upgrade(artist.id, &artist.artist_name));
            }
        }
        Ok(candidates)
    }

    /// Every artist that passes the monitored filter.
    async fn artists(&self) -> Result<Vec<Artist>, CollectError> {
        let artists = self
            .api
            .artists()
            .await
            .map_err(|_| CollectError::CatalogUnavailable)?;
        Ok(artists
            .into_iter()
            .filter(|a| a.id > 0 && (!self.monitored_only || a.monitored))
            .collect())
    }

    /// Albums of `artist` that pass the monitored filter. A failed read
    /// yields none.
    async fn albums_of(&self, artist: &Artist) -> Vec<Album> {
        match self.api.albums_for_artist(artist.id).await {
            Ok(albums) => albums
                .into_iter()
                .filter(|a| a.id > 0 && (!self.monitored_only || a.monitored))
                .collect(),
            Err(e) => {
                warn!(
                    "Skipping artist {} ({}): album read failed: {}",
                    artist.artist_name, artist.id, e
                );
                Vec::new()
            }
        }
    }

    async fn upgradeable_albums(&self, artist: &Artist, profiles: &ProfileMap) -> Vec<Album> {
        let mut albums = self.albums_of(artist).await;
        for album in albums.iter_mut() {
            if album.quality_profile_id.is_none() {
                album.quality_profile_id = artist.quality_profile_id;
            }
        }
        albums.retain(|album| needs_upgrade(album, profiles));
        albums
    }

    /// `None` when profiles cannot be read or there are none; the upgrade
    /// pass then has nothing to compare against.
    async fn profiles(&self) -> Option<ProfileMap> {
        match self.api.quality_profiles().await {
            Ok(profiles) if !profiles.is_empty() => Some(profile_map(profiles)),
            Ok(_) => {
                info!("No quality profiles available, cannot determine cutoff unmet items");
                None
            }
            Err(e) => {
                warn!("Quality profiles unavailable ({}), skipping upgrades", e);
                None
            }
        }
    }

    /// Pages through `wanted/cutoff`. `None` if the first page fails; a later
    /// failure keeps what was already read.
    async fn cutoff_unmet_albums(&self) -> Option<Vec<Candidate>> {
        let mut records: Vec<Album> = Vec::new();
        let mut page = 1;
        loop {
            match self.api.cutoff_unmet(page, CUTOFF_PAGE_SIZE).await {
                Ok(result) => {
                    let read = result.records.len();
                    records.extend(result.records);
                    if read == 0 || records.len() as i64 >= result.total_records {
                        break;
                    }
                    page += 1;
                }
                Err(e) if page == 1 => {
                    debug!("wanted/cutoff unavailable ({}), scanning the library", e);
                    return None;
                }
                Err(e) => {
                    warn!(
                        "wanted/cutoff page {} failed ({}), using {} record(s) read so far",
                        page,
                        e,
                        records.len()
                    );
                    break;
                }
            }
        }

        let mut seen = HashSet::new();
        let candidates = records
            .iter()
            .filter(|album| album.id > 0 && album.owner_id() > 0)
            .filter(|album| !self.monitored_only || album.monitored)
            .filter(|album| seen.insert(album.id))
            .map(|album| {
                Candidate::album(album.owner_id(), album.owner_name(), album.id, &album.title)
            })
            .collect();
        Some(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mocks::{album, artist, profile, quality, track, MockCatalog};
    use crate::candidate::Target;

    fn ids(candidates: &[Candidate]) -> Vec<i64> {
        candidates.iter().map(Candidate::target_id).collect()
    }

    fn present(id: i64, artist_id: i64, quality_id: i64) -> Album {
        let mut a = album(id, artist_id, true, 10, 10);
        a.quality = Some(quality(quality_id));
        a
    }

    #[test]
    fn test_enabled_passes_order() {
        let mut hunt = HuntConfig::default();
        hunt.missing_mode = "both".into();
        hunt.upgrade_mode = "track".into();
        assert_eq!(
            Pass::enabled(&hunt),
            vec![Pass::MissingArtists, Pass::MissingAlbums, Pass::UpgradeTracks]
        );

        hunt.missing_mode = "off".into();
        hunt.upgrade_mode = "off".into();
        assert!(Pass::enabled(&hunt).is_empty());

        hunt.missing_mode = "nonsense".into();
        assert_eq!(Pass::enabled(&hunt), vec![Pass::MissingArtists]);
    }

    #[tokio::test]
    async fn test_missing_artists_filters() {
        let api = MockCatalog::with_artists(vec![
            artist(1, "Complete", true, 10, 10),
            artist(2, "Partial", true, 10, 7),
            artist(3, "Unmonitored", false, 10, 2),
        ]);

        let monitored = Collector::new(&api, true).missing_artists().await.unwrap();
        assert_eq!(ids(&monitored), vec![2]);
        assert_eq!(
            monitored[0].target,
            Target::MissingArtist { missing_tracks: 3 }
        );

        let all = Collector::new(&api, false).missing_artists().await.unwrap();
        assert_eq!(ids(&all), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_artist_read_failure_is_distinct_from_empty() {
        let down = MockCatalog::unreachable();
        assert!(matches!(
            Collector::new(&down, true).collect(Pass::MissingArtists).await,
            Err(CollectError::CatalogUnavailable)
        ));

        let empty = MockCatalog::with_artists(vec![]);
        let found = Collector::new(&empty, true)
            .collect(Pass::MissingArtists)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_missing_albums_nested_order() {
        let api = MockCatalog::with_artists(vec![
            artist(1, "A", true, 20, 10),
            artist(2, "B", true, 20, 10),
        ])
        .albums(
            1,
            vec![
                album(10, 1, true, 10, 5),
                album(11, 1, true, 10, 10),
                album(12, 1, false, 10, 0),
            ],
        )
        .albums(2, vec![album(20, 2, true, 10, 0), album(21, 2, true, 5, 4)]);

        let found = Collector::new(&api, true).missing_albums().await.unwrap();
        assert_eq!(ids(&found), vec![10, 20, 21]);
        assert_eq!(found[1].artist_id, 2);
    }

    #[tokio::test]
    async fn test_failed_subtree_is_skipped() {
        let api = MockCatalog::with_artists(vec![
            artist(1, "A", true, 20, 10),
            artist(2, "B", true, 20, 10),
        ])
        .albums(1, vec![album(10, 1, true, 10, 5)])
        .albums(2, vec![album(20, 2, true, 10, 0)])
        .fail_albums_for(1);

        let found = Collector::new(&api, true).missing_albums().await.unwrap();
        assert_eq!(ids(&found), vec![20]);
    }

    #[tokio::test]
    async fn test_upgrade_albums_prefers_cutoff_listing() {
        let mut listed = present(30, 0, 2);
        listed.artist = Some(artist(3, "Embedded", true, 10, 10));
        let mut unmonitored = present(31, 3, 2);
        unmonitored.monitored = false;

        let api = MockCatalog::with_artists(vec![])
            .cutoff(vec![listed, unmonitored])
            .profiles(vec![profile(1, 5)]);

        let found = Collector::new(&api, true).upgrade_albums().await.unwrap();
        assert_eq!(ids(&found), vec![30]);
        assert_eq!(found[0].artist_id, 3);
        assert_eq!(found[0].artist_name, "Embedded");
        assert_eq!(api.cutoff_pages_read(), vec![1]);
    }

    #[tokio::test]
    async fn test_cutoff_listing_is_paged() {
        let records: Vec<Album> = (1..=250).map(|id| present(id, 9, 1)).collect();
        let api = MockCatalog::with_artists(vec![]).cutoff(records);

        let found = Collector::new(&api, true).upgrade_albums().await.unwrap();
        assert_eq!(found.len(), 250);
        assert_eq!(api.cutoff_pages_read(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_upgrade_albums_falls_back_to_scan() {
        let api = MockCatalog::with_artists(vec![artist(1, "A", true, 20, 20)])
            .albums(
                1,
                vec![present(10, 1, 3), present(11, 1, 6), album(12, 1, true, 10, 4)],
            )
            .profiles(vec![profile(1, 5)]);

        // cutoff listing unavailable; album profiles inherited from the artist
        let found = Collector::new(&api, true).upgrade_albums().await.unwrap();
        assert_eq!(ids(&found), vec![10]);
        assert_eq!(api.cutoff_pages_read(), vec![1]);
    }

    #[tokio::test]
    async fn test_upgrade_without_profiles_is_empty() {
        let api = MockCatalog::with_artists(vec![artist(1, "A", true, 20, 20)])
            .albums(1, vec![present(10, 1, 3)]);
        let found = Collector::new(&api, true).upgrade_tracks().await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_upgrade_tracks() {
        let mut unmonitored = track(102, 10, true, 1);
        unmonitored.monitored = false;

        let api = MockCatalog::with_artists(vec![artist(1, "A", true, 3, 3)])
            .albums(1, vec![present(10, 1, 3)])
            .tracks(
                10,
                vec![
                    track(100, 10, true, 2),
                    track(101, 10, false, 2),
                    unmonitored,
                    track(103, 10, true, 8),
                ],
            )
            .profiles(vec![profile(1, 5)]);

        let found = Collector::new(&api, true).upgrade_tracks().await.unwrap();
        assert_eq!(ids(&found), vec![100]);
        match &found[0].target {
            Target::Track {
                album_id,
                album_title,
                ..
            } => {
                assert_eq!(*album_id, 10);
                assert_eq!(album_title, "Album 10");
            }
            other => panic!("unexpected target {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_track_read_skips_only_that_album() {
        let api = MockCatalog::with_artists(vec![artist(1, "A", true, 6, 6)])
            .albums(1, vec![present(10, 1, 3), present(11, 1, 3)])
            .tracks(10, vec![track(100, 10, true, 2)])
            .tracks(11, vec![track(110, 11, true, 2), track(111, 11, true, 9)])
            .fail_tracks_for(10)
            .profiles(vec![profile(1, 5)]);

        let found = Collector::new(&api, true).upgrade_tracks().await.unwrap();
        assert_eq!(ids(&found), vec![110]);
    }

    #[tokio::test]
    async fn test_upgrade_artists() {
        let api = MockCatalog::with_artists(vec![
            artist(1, "Needs upgrade", true, 10, 10),
            artist(2, "Fine", true, 10, 10),
        ])
        .albums(1, vec![present(10, 1, 6), present(11, 1, 2)])
        .albums(2, vec![present(20, 2, 7)])
        .profiles(vec![profile(1, 5)]);

        let found = Collector::new(&api, true).upgrade_artists().await.unwrap();
        assert_eq!(ids(&found), vec![1]);
        assert_eq!(found[0].target, Target::ArtistUpgrade);
    }
}
