//! Cutoff check shared by every upgrade pass.
//!
//! An item only qualifies for an upgrade when it is actually present. Absent
//! content belongs to the missing passes and is never reported here.

use crate::catalog::{Album, ProfileMap, Track};

/// Anything that carries a current quality and a profile to compare it with.
pub trait QualityItem {
    /// Whether the item has content on disk.
    fn is_present(&self) -> bool;
    fn quality_profile_id(&self) -> Option<i64>;
    fn quality_id(&self) -> Option<i64>;

    /// Upstream's own verdict, when it sends one.
    fn cutoff_not_met(&self) -> bool {
        false
    }
}

impl QualityItem for Track {
    fn is_present(&self) -> bool {
        !self.is_missing()
    }

    fn quality_profile_id(&self) -> Option<i64> {
        self.quality_profile_id
    }

    fn quality_id(&self) -> Option<i64> {
        Track::quality_id(self)
    }
}

impl QualityItem for Album {
    fn is_present(&self) -> bool {
        self.statistics.is_fully_downloaded()
    }

    fn quality_profile_id(&self) -> Option<i64> {
        self.quality_profile_id
    }

    fn quality_id(&self) -> Option<i64> {
        Album::quality_id(self)
    }

    fn cutoff_not_met(&self) -> bool {
        self.quality_cutoff_not_met.unwrap_or(false)
    }
}

/// True iff `item` is present and its quality sits below its profile's cutoff.
///
/// Unknown or missing profiles, and non-integer quality values, yield `false`.
pub fn needs_upgrade<I: QualityItem + ?Sized>(item: &I, profiles: &ProfileMap) -> bool {
    if !item.is_present() {
        return false;
    }
    if item.cutoff_not_met() {
        return true;
    }

    let Some(profile) = item.quality_profile_id().and_then(|id| profiles.get(&id)) else {
        return false;
    };

    match (item.quality_id(), profile.cutoff) {
        (Some(current), Some(cutoff)) => current < cutoff,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{profile_map, QualityDefinition, QualityModel, QualityProfile, Statistics};

    fn profiles() -> ProfileMap {
        profile_map(vec![QualityProfile {
            id: 1,
            name: "Standard".into(),
            cutoff: Some(5),
            items: vec![],
        }])
    }

    fn quality(id: i64) -> Option<QualityModel> {
        Some(QualityModel {
            quality: Some(QualityDefinition {
                id: Some(id),
                name: None,
            }),
        })
    }

    fn track(has_file: bool, quality_id: i64) -> Track {
        Track {
            id: 1,
            title: "Naima".into(),
            album_id: 2,
            artist_id: 3,
            monitored: true,
            has_file,
            quality_profile_id: Some(1),
            quality: quality(quality_id),
        }
    }

    fn album(stats: Statistics, quality_id: i64) -> Album {
        Album {
            id: 7,
            title: "Giant Steps".into(),
            artist_id: 3,
            monitored: true,
            statistics: stats,
            quality_profile_id: Some(1),
            quality: quality(quality_id),
            quality_cutoff_not_met: None,
            artist: None,
        }
    }

    fn full() -> Statistics {
        Statistics {
            track_count: 7,
            track_file_count: 7,
            size_on_disk: 1_000,
        }
    }

    #[test]
    fn test_track_below_cutoff() {
        assert!(needs_upgrade(&track(true, 3), &profiles()));
    }

    #[test]
    fn test_track_above_cutoff() {
        assert!(!needs_upgrade(&track(true, 7), &profiles()));
        assert!(!needs_upgrade(&track(true, 5), &profiles()));
    }

    #[test]
    fn test_missing_file_never_upgrades() {
        assert!(track(false, 3).is_missing());
        assert!(!track(false, 3).is_present());
        assert!(!needs_upgrade(&track(false, 3), &profiles()));
        assert!(!needs_upgrade(&track(false, 7), &profiles()));
    }

    #[test]
    fn test_unknown_profile() {
        let mut t = track(true, 3);
        t.quality_profile_id = Some(42);
        assert!(!needs_upgrade(&t, &profiles()));
        t.quality_profile_id = None;
        assert!(!needs_upgrade(&t, &profiles()));
    }

    #[test]
    fn test_missing_quality_value() {
        let mut t = track(true, 3);
        t.quality = None;
        assert!(!needs_upgrade(&t, &profiles()));

        let mut p = profiles();
        p.get_mut(&1).unwrap().cutoff = None;
        assert!(!needs_upgrade(&track(true, 3), &p));
    }

    #[test]
    fn test_album_below_cutoff() {
        assert!(needs_upgrade(&album(full(), 3), &profiles()));
        assert!(!needs_upgrade(&album(full(), 6), &profiles()));
    }

    #[test]
    fn test_album_not_fully_downloaded() {
        let partial = Statistics {
            track_count: 7,
            track_file_count: 4,
            size_on_disk: 500,
        };
        assert!(!needs_upgrade(&album(partial, 3), &profiles()));

        let empty = Statistics {
            track_count: 0,
            track_file_count: 0,
            size_on_disk: 0,
        };
        assert!(!needs_upgrade(&album(empty, 3), &profiles()));
    }

    #[test]
    fn test_album_cutoff_flag() {
        let mut a = album(full(), 9);
        a.quality_cutoff_not_met = Some(true);
        assert!(needs_upgrade(&a, &profiles()));

        a.statistics.size_on_disk = 0;
        assert!(!needs_upgrade(&a, &profiles()));
    }
}
