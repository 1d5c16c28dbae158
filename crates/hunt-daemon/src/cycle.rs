//! The outer loop: load state, run each enabled pass, save state, sleep.

use chrono::Utc;
use hunt_proto::config::Config;
use hunt_proto::state::{HuntState, StateStore};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::api::CatalogApi;
use crate::collector::{Collector, Pass};
use crate::engine::{SelectionEngine, SelectionOrder};
use crate::workflow::{Pacing, SearchWorkflow};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub attempted: usize,
    pub processed: usize,
    /// Passes abandoned because the artist list could not be read.
    pub unavailable: usize,
}

pub struct HuntCycle<C: CatalogApi> {
    api: C,
    config: Config,
    passes: Vec<Pass>,
    store: StateStore,
    engine: SelectionEngine,
}

impl<C: CatalogApi> HuntCycle<C> {
    pub fn new(api: C, config: Config) -> Self {
        let engine = SelectionEngine::new(config.timing.sleep_duration());
        Self::with_engine(api, config, engine)
    }

    pub fn with_engine(api: C, config: Config, engine: SelectionEngine) -> Self {
        let passes = Pass::enabled(&config.hunt);
        let store = StateStore::new(config.state.state_file.clone());
        Self {
            api,
            config,
            passes,
            store,
            engine,
        }
    }

    #[cfg(test)]
    pub fn api(&self) -> &C {
        &self.api
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub async fn run_forever(mut self) {
        if self.passes.is_empty() {
            info!("Every hunt mode is off; cycles will only maintain state");
        }
        loop {
            let report = self.run_once().await;
            let delay = self.next_delay(&report);
            if report.unavailable > 0 {
                info!("{} pass(es) skipped: artist list unavailable", report.unavailable);
            }
            info!(
                "Cycle complete: {} processed, {} attempted. Waiting {}s before next cycle...",
                report.processed,
                report.attempted,
                delay.as_secs()
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// A cycle that tried nothing waits the shorter idle delay.
    pub fn next_delay(&self, report: &CycleReport) -> Duration {
        if report.attempted == 0 {
            self.config.timing.idle_delay()
        } else {
            self.config.timing.cycle_delay()
        }
    }

    pub async fn run_once(&mut self) -> CycleReport {
        let hunt = &self.config.hunt;
        let timing = &self.config.timing;
        let mut state = self
            .store
            .load(Utc::now(), self.config.state.reset_interval_hours);
        let mut report = CycleReport::default();

        let order = SelectionOrder::from_flag(hunt.random_selection);
        let collector = Collector::new(&self.api, hunt.monitored_only);
        let workflow = SearchWorkflow::new(&self.api, Pacing::from(timing));

        for &pass in &self.passes {
            info!("=== Checking {} ===", pass.label());

            let mut candidates = match collector.collect(pass).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    error!(
                        "{}: {}. {}s wait...",
                        pass.label(),
                        e,
                        timing.error_backoff().as_secs()
                    );
                    tokio::time::sleep(timing.error_backoff()).await;
                    report.unavailable += 1;
                    continue;
                }
            };

            let found = candidates.len();
            if let Some(done) = processed_set(pass, &mut state, hunt.persist_upgrade_state) {
                candidates.retain(|c| !done.contains(&c.target_id()));
            }
            if candidates.len() < found {
                info!(
                    "Skipping {} already processed item(s) this epoch",
                    found - candidates.len()
                );
            }
            if candidates.is_empty() {
                info!("No {} to process", pass.label());
                continue;
            }
            info!("Found {} candidate(s) for {}", candidates.len(), pass.label());

            let quota = if pass.is_upgrade() {
                hunt.upgrade_items
            } else {
                hunt.missing_items
            };
            let result = self
                .engine
                .run(&candidates, quota, order, &workflow)
                .await;

            debug!("Selection order: {:?}", result.selected);
            if let Some(done) = processed_set(pass, &mut state, hunt.persist_upgrade_state) {
                done.extend(result.succeeded.iter().map(|&i| candidates[i].target_id()));
                // A shutdown mid-cycle must not forget searches already made.
                if !result.succeeded.is_empty() {
                    self.save(&state);
                }
            }
            info!(
                "Finished {}: {} processed, {} attempted, {} candidate(s)",
                pass.label(),
                result.processed,
                result.attempted,
                candidates.len()
            );
            report.attempted += result.attempted;
            report.processed += result.processed;
        }

        self.save(&state);
        report
    }

    fn save(&self, state: &HuntState) {
        if let Err(e) = self.store.save(state) {
            error!("Failed to save state to {:?}: {:#}", self.store.path(), e);
        }
    }
}

/// The id set a pass dedups against, if it keeps one across cycles.
fn processed_set(
    pass: Pass,
    state: &mut HuntState,
    persist_upgrades: bool,
) -> Option<&mut BTreeSet<i64>> {
    match pass {
        Pass::MissingArtists => Some(&mut state.processed_artist_ids),
        Pass::MissingAlbums => Some(&mut state.processed_album_ids),
        _ if persist_upgrades => Some(&mut state.processed_upgrade_ids),
        _ => None,
    }
}
