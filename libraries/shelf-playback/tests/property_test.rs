//! Property-based tests for chapter lookup and player settings
//!
//! Uses proptest to verify invariants across many random inputs.

use proptest::prelude::*;
use shelf_core::Chapter;
use shelf_playback::settings::{MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE};
use shelf_playback::{ChapterIndex, PlayerSettingsStore, RateStep};
use shelf_storage::MemoryStore;
use std::sync::Arc;

// ===== Helpers =====

/// Contiguous chapters built from random lengths, starting at `first_start`
fn arbitrary_chapters() -> impl Strategy<Value = Vec<Chapter>> {
    (
        0.0f64..50.0,
        prop::collection::vec(0.5f64..600.0, 0..40),
    )
        .prop_map(|(first_start, lengths)| {
            let mut start = first_start;
            lengths
                .into_iter()
                .enumerate()
                .map(|(i, length)| {
                    let chapter = Chapter::new(i as u32, format!("Chapter {}", i), start, start + length);
                    start += length;
                    chapter
                })
                .collect()
        })
}

/// Reference lookup: the last chapter whose start is not after `time`
fn linear_current(chapters: &[Chapter], time: f64) -> Option<usize> {
    chapters.iter().rposition(|chapter| chapter.start <= time)
}

// ===== Property Tests =====

proptest! {
    /// Property: binary-search lookup agrees with a linear scan
    #[test]
    fn current_matches_linear_scan(chapters in arbitrary_chapters(), time in -10.0f64..30_000.0) {
        let expected = linear_current(&chapters, time);
        let index = ChapterIndex::new(chapters);

        prop_assert_eq!(index.position_at(time), expected);
        prop_assert_eq!(index.current(time).map(|c| c.id), expected.map(|i| i as u32));
    }

    /// Property: neighbours are exactly one list position away from current
    #[test]
    fn neighbours_are_adjacent(chapters in arbitrary_chapters(), time in -10.0f64..30_000.0) {
        let index = ChapterIndex::new(chapters);
        let position = index.lookup(time);

        match position.current {
            Some(current) => {
                let i = current.id as usize;
                prop_assert_eq!(position.next.map(|c| c.id as usize), index.chapters().get(i + 1).map(|_| i + 1));
                prop_assert_eq!(position.previous.map(|c| c.id as usize), i.checked_sub(1));
            }
            None => {
                prop_assert!(position.next.is_none());
                prop_assert!(position.previous.is_none());
            }
        }
    }

    /// Property: any sequence of rate steps stays in range on a 0.01 grid
    #[test]
    fn rate_steps_stay_bounded_and_rounded(
        steps in prop::collection::vec(any::<bool>(), 1..80),
        fine in any::<bool>(),
    ) {
        let mut store = PlayerSettingsStore::load(Arc::new(MemoryStore::new()));
        let step = if fine { RateStep::Twentieth } else { RateStep::Tenth };
        store.set_playback_rate_increment_decrement(step).unwrap();

        for up in steps {
            let rate = if up {
                store.increment_playback_rate().unwrap()
            } else {
                store.decrement_playback_rate().unwrap()
            };

            prop_assert!((MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate));
            let hundredths = rate * 100.0;
            prop_assert!((hundredths - hundredths.round()).abs() < 1e-9, "rate {} drifted", rate);
        }
    }

    /// Property: set_playback_rate never stores an out-of-range value
    #[test]
    fn set_rate_is_clamped(rate in prop::num::f64::ANY) {
        let mut store = PlayerSettingsStore::load(Arc::new(MemoryStore::new()));
        let applied = store.set_playback_rate(rate).unwrap();

        prop_assert!((MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&applied));
        prop_assert_eq!(store.settings().playback_rate, applied);
    }

    /// Property: a step up followed by a step down restores any set rate
    #[test]
    fn increment_then_decrement_restores_rate(
        rate in MIN_PLAYBACK_RATE..MAX_PLAYBACK_RATE,
        fine in any::<bool>(),
    ) {
        let mut store = PlayerSettingsStore::load(Arc::new(MemoryStore::new()));
        let step = if fine { RateStep::Twentieth } else { RateStep::Tenth };
        store.set_playback_rate_increment_decrement(step).unwrap();

        let applied = store.set_playback_rate(rate).unwrap();
        prop_assume!(applied + step.amount() <= MAX_PLAYBACK_RATE);

        store.increment_playback_rate().unwrap();
        let restored = store.decrement_playback_rate().unwrap();

        prop_assert_eq!(restored, applied);
        prop_assert_eq!(store.settings().playback_rate, applied);
    }
}
