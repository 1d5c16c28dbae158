use async_trait::async_trait;
use hunt_proto::config::TimingConfig;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::{CatalogApi, Command};
use crate::candidate::Candidate;
use crate::engine::{CandidateAction, Outcome};

/// Waits taken inside one candidate's workflow.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    /// After an acknowledged refresh, before searching.
    pub refresh_settle: Duration,
    /// After a candidate soft-fails.
    pub soft_fail_backoff: Duration,
}

impl From<&TimingConfig> for Pacing {
    fn from(timing: &TimingConfig) -> Self {
        Self {
            refresh_settle: timing.refresh_settle(),
            soft_fail_backoff: timing.soft_fail_backoff(),
        }
    }
}

/// Refresh the owning artist, let it settle, then search, falling back to a
/// broader search when the first one is not acknowledged.
pub struct SearchWorkflow<'a, C: CatalogApi + ?Sized> {
    api: &'a C,
    pacing: Pacing,
}

impl<'a, C: CatalogApi + ?Sized> SearchWorkflow<'a, C> {
    pub fn new(api: &'a C, pacing: Pacing) -> Self {
        Self { api, pacing }
    }

    async fn search(&self, command: &Command) -> bool {
        match self.api.send_command(command).await {
            Ok(id) => {
                info!("{} command accepted (ID={})", command.name(), id);
                true
            }
            Err(e) => {
                warn!("{} not acknowledged: {}", command, e);
                false
            }
        }
    }

    async fn back_off(&self) {
        tokio::time::sleep(self.pacing.soft_fail_backoff).await;
    }
}

#[async_trait]
impl<'a, C: CatalogApi + ?Sized> CandidateAction<Candidate> for SearchWorkflow<'a, C> {
    async fn act(&self, candidate: &Candidate) -> Outcome {
        info!("Processing {}", candidate);

        match self.api.send_command(&candidate.refresh()).await {
            Ok(id) => {
                info!(
                    "Refresh command accepted (ID={}). Waiting {}s...",
                    id,
                    self.pacing.refresh_settle.as_secs()
                );
                tokio::time::sleep(self.pacing.refresh_settle).await;
            }
            Err(_) => {
                warn!(
                    "Could not refresh artist {}, skipping {}",
                    candidate.artist_name, candidate
                );
                self.back_off().await;
                return Outcome::SoftFail;
            }
        }

        let (primary, fallback) = candidate.search_plan();
        if self.search(&primary).await {
            return Outcome::Success;
        }
        if let Some(fallback) = fallback {
            info!("Falling back to {}", fallback);
            if self.search(&fallback).await {
                return Outcome::Success;
            }
        }

        warn!("No search was accepted for {}", candidate);
        self.back_off().await;
        Outcome::SoftFail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mocks::{artist, MockCatalog};
    use crate::collector::{Collector, Pass};
    use crate::engine::{SelectionEngine, SelectionOrder};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tokio::time::Instant;

    fn pacing() -> Pacing {
        Pacing::from(&TimingConfig::default())
    }

    fn engine() -> SelectionEngine {
        SelectionEngine::with_rng(StdRng::seed_from_u64(0), Duration::from_secs(900))
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_artist_end_to_end() {
        let api = MockCatalog::with_artists(vec![
            artist(1, "Complete", true, 8, 8),
            artist(2, "Incomplete", true, 5, 2),
            artist(3, "Also complete", true, 3, 3),
        ]);

        let candidates = Collector::new(&api, true)
            .collect(Pass::MissingArtists)
            .await
            .unwrap();
        let workflow = SearchWorkflow::new(&api, pacing());
        let report = engine()
            .run(&candidates, 1, SelectionOrder::Sequential, &workflow)
            .await;

        assert_eq!(report.processed, 1);
        assert_eq!(
            api.issued(),
            vec![
                Command::RefreshArtist { artist_id: 2 },
                Command::MissingAlbumSearch { artist_id: 2 },
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unacknowledged_refresh_skips_search() {
        let api = MockCatalog::with_artists(vec![])
            .reject(Command::RefreshArtist { artist_id: 2 });
        let workflow = SearchWorkflow::new(&api, pacing());
        let candidates = vec![Candidate::missing_artist(2, "Incomplete", 3)];

        let start = Instant::now();
        let report = engine()
            .run(&candidates, 1, SelectionOrder::Sequential, &workflow)
            .await;

        assert_eq!(report.processed, 0);
        assert_eq!(report.selected, vec![0]);
        assert_eq!(api.issued(), vec![Command::RefreshArtist { artist_id: 2 }]);
        // soft-fail backoff, then the throttle
        assert_eq!(start.elapsed(), Duration::from_secs(10 + 900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_album_search_fallback() {
        let api = MockCatalog::with_artists(vec![]).reject(Command::AlbumSearch { album_id: 7 });
        let workflow = SearchWorkflow::new(&api, pacing());

        let start = Instant::now();
        let outcome = workflow
            .act(&Candidate::album(3, "Artist", 7, "Album"))
            .await;

        assert_eq!(outcome, Outcome::Success);
        assert_eq!(
            api.issued(),
            vec![
                Command::RefreshArtist { artist_id: 3 },
                Command::AlbumSearch { album_id: 7 },
                Command::ArtistAlbumSearch { artist_id: 3 },
            ]
        );
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_and_fallback_rejected() {
        let api = MockCatalog::with_artists(vec![])
            .reject(Command::MissingAlbumSearch { artist_id: 4 })
            .reject(Command::ArtistAlbumSearch { artist_id: 4 });
        let workflow = SearchWorkflow::new(&api, pacing());

        let start = Instant::now();
        let outcome = workflow
            .act(&Candidate::missing_artist(4, "Artist", 1))
            .await;

        assert_eq!(outcome, Outcome::SoftFail);
        assert_eq!(api.issued().len(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(5 + 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_track_search_has_no_fallback() {
        let api = MockCatalog::with_artists(vec![]).reject(Command::TrackSearch { track_id: 70 });
        let workflow = SearchWorkflow::new(&api, pacing());

        let outcome = workflow
            .act(&Candidate::track(3, "Artist", 7, "Album", 70, "Track"))
            .await;

        assert_eq!(outcome, Outcome::SoftFail);
        assert_eq!(
            api.issued(),
            vec![
                Command::RefreshArtist { artist_id: 3 },
                Command::TrackSearch { track_id: 70 },
            ]
        );
    }
}
