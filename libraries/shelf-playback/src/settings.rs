//! Persisted player preferences
//!
//! Every mutation is validated, clamped and written through to the
//! [`KeyValueStore`] before the in-memory copy changes, so a failed write
//! leaves the previous settings in effect.

use serde::{Deserialize, Serialize};
use shelf_storage::{settings, KeyValueStore};
use std::sync::Arc;
use tracing::{debug, warn};

/// Slowest allowed playback rate
pub const MIN_PLAYBACK_RATE: f64 = 0.5;
/// Fastest allowed playback rate
pub const MAX_PLAYBACK_RATE: f64 = 3.0;
/// Shortest allowed jump, in seconds
pub const MIN_JUMP_AMOUNT: f64 = 1.0;
/// Longest allowed jump, in seconds
pub const MAX_JUMP_AMOUNT: f64 = 300.0;

/// Step used by rate increment/decrement
///
/// Persisted as the numeric step (`0.1` or `0.05`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum RateStep {
    #[default]
    Tenth,
    Twentieth,
}

impl RateStep {
    /// Step size
    pub fn amount(self) -> f64 {
        match self {
            Self::Tenth => 0.1,
            Self::Twentieth => 0.05,
        }
    }
}

impl TryFrom<f64> for RateStep {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if (value - 0.1).abs() < 1e-9 {
            Ok(Self::Tenth)
        } else if (value - 0.05).abs() < 1e-9 {
            Ok(Self::Twentieth)
        } else {
            Err(format!("unsupported playback rate step: {}", value))
        }
    }
}

impl From<RateStep> for f64 {
    fn from(step: RateStep) -> Self {
        step.amount()
    }
}

/// Player preferences
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSettings {
    /// Show progress relative to the current chapter
    pub use_chapter_track: bool,
    /// Seconds skipped by jump forward
    pub jump_forward_amount: f64,
    /// Seconds skipped by jump backward
    pub jump_backward_amount: f64,
    pub playback_rate: f64,
    pub playback_rate_increment_decrement: RateStep,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            use_chapter_track: false,
            jump_forward_amount: 10.0,
            jump_backward_amount: 10.0,
            playback_rate: 1.0,
            playback_rate_increment_decrement: RateStep::Tenth,
        }
    }
}

impl PlayerSettings {
    /// Copy with every numeric field forced into its valid range
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            use_chapter_track: self.use_chapter_track,
            jump_forward_amount: clamp_jump(self.jump_forward_amount, defaults.jump_forward_amount),
            jump_backward_amount: clamp_jump(
                self.jump_backward_amount,
                defaults.jump_backward_amount,
            ),
            playback_rate: clamp_rate(self.playback_rate, defaults.playback_rate),
            playback_rate_increment_decrement: self.playback_rate_increment_decrement,
        }
    }
}

/// Partial settings change; `None` fields are left alone
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlayerSettingsUpdate {
    pub use_chapter_track: Option<bool>,
    pub jump_forward_amount: Option<f64>,
    pub jump_backward_amount: Option<f64>,
    pub playback_rate: Option<f64>,
    pub playback_rate_increment_decrement: Option<RateStep>,
}

/// Player preferences backed by a key-value store
pub struct PlayerSettingsStore {
    store: Arc<dyn KeyValueStore>,
    settings: PlayerSettings,
}

impl PlayerSettingsStore {
    /// Load persisted settings, falling back to defaults
    pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let settings = match settings::get_setting::<PlayerSettings>(
            store.as_ref(),
            settings::SETTING_PLAYER_SETTINGS,
        ) {
            Ok(Some(persisted)) => persisted.sanitized(),
            Ok(None) => PlayerSettings::default(),
            Err(e) => {
                warn!(error = %e, "Stored player settings are unreadable, using defaults");
                PlayerSettings::default()
            }
        };

        debug!(?settings, "Loaded player settings");
        Self { store, settings }
    }

    /// Current settings
    pub fn settings(&self) -> PlayerSettings {
        self.settings
    }

    pub fn set_use_chapter_track(&mut self, enabled: bool) -> shelf_storage::Result<()> {
        self.commit(PlayerSettings {
            use_chapter_track: enabled,
            ..self.settings
        })
    }

    /// Returns the applied (clamped) amount
    pub fn set_jump_forward_amount(&mut self, seconds: f64) -> shelf_storage::Result<f64> {
        let amount = clamp_jump(seconds, self.settings.jump_forward_amount);
        self.commit(PlayerSettings {
            jump_forward_amount: amount,
            ..self.settings
        })?;
        Ok(amount)
    }

    /// Returns the applied (clamped) amount
    pub fn set_jump_backward_amount(&mut self, seconds: f64) -> shelf_storage::Result<f64> {
        let amount = clamp_jump(seconds, self.settings.jump_backward_amount);
        self.commit(PlayerSettings {
            jump_backward_amount: amount,
            ..self.settings
        })?;
        Ok(amount)
    }

    /// Returns the applied rate, clamped and rounded to hundredths
    pub fn set_playback_rate(&mut self, rate: f64) -> shelf_storage::Result<f64> {
        let rate = clamp_rate(rate, self.settings.playback_rate);
        self.commit(PlayerSettings {
            playback_rate: rate,
            ..self.settings
        })?;
        Ok(rate)
    }

    pub fn set_playback_rate_increment_decrement(
        &mut self,
        step: RateStep,
    ) -> shelf_storage::Result<()> {
        self.commit(PlayerSettings {
            playback_rate_increment_decrement: step,
            ..self.settings
        })
    }

    /// Merge a partial update and persist it with a single write
    pub fn update_settings(
        &mut self,
        update: PlayerSettingsUpdate,
    ) -> shelf_storage::Result<PlayerSettings> {
        let current = self.settings;
        let next = PlayerSettings {
            use_chapter_track: update.use_chapter_track.unwrap_or(current.use_chapter_track),
            jump_forward_amount: update
                .jump_forward_amount
                .map_or(current.jump_forward_amount, |v| {
                    clamp_jump(v, current.jump_forward_amount)
                }),
            jump_backward_amount: update
                .jump_backward_amount
                .map_or(current.jump_backward_amount, |v| {
                    clamp_jump(v, current.jump_backward_amount)
                }),
            playback_rate: update
                .playback_rate
                .map_or(current.playback_rate, |v| clamp_rate(v, current.playback_rate)),
            playback_rate_increment_decrement: update
                .playback_rate_increment_decrement
                .unwrap_or(current.playback_rate_increment_decrement),
        };
        self.commit(next)?;
        Ok(self.settings)
    }

    /// Raise the rate by one step; returns the new rate
    pub fn increment_playback_rate(&mut self) -> shelf_storage::Result<f64> {
        let step = self.settings.playback_rate_increment_decrement.amount();
        self.step_playback_rate(step)
    }

    /// Lower the rate by one step; returns the new rate
    pub fn decrement_playback_rate(&mut self) -> shelf_storage::Result<f64> {
        let step = self.settings.playback_rate_increment_decrement.amount();
        self.step_playback_rate(-step)
    }

    fn step_playback_rate(&mut self, delta: f64) -> shelf_storage::Result<f64> {
        // Rounding cancels drift from repeated 0.1/0.05 additions
        let rate = round2(self.settings.playback_rate + delta)
            .clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE);
        self.commit(PlayerSettings {
            playback_rate: rate,
            ..self.settings
        })?;
        Ok(rate)
    }

    fn commit(&mut self, next: PlayerSettings) -> shelf_storage::Result<()> {
        let next = next.sanitized();
        if next == self.settings {
            return Ok(());
        }
        settings::set_setting(self.store.as_ref(), settings::SETTING_PLAYER_SETTINGS, &next)?;
        self.settings = next;
        debug!(settings = ?self.settings, "Player settings updated");
        Ok(())
    }
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp into range and snap to the 0.01 grid rate steps move on
fn clamp_rate(rate: f64, fallback: f64) -> f64 {
    if rate.is_finite() {
        round2(rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE))
    } else {
        fallback
    }
}

fn clamp_jump(seconds: f64, fallback: f64) -> f64 {
    if seconds.is_finite() {
        seconds.clamp(MIN_JUMP_AMOUNT, MAX_JUMP_AMOUNT)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelf_storage::MemoryStore;

    fn fresh() -> (Arc<MemoryStore>, PlayerSettingsStore) {
        let store = Arc::new(MemoryStore::new());
        let settings = PlayerSettingsStore::load(store.clone());
        (store, settings)
    }

    fn persisted(store: &MemoryStore) -> PlayerSettings {
        settings::get_setting(store, settings::SETTING_PLAYER_SETTINGS)
            .unwrap()
            .unwrap()
    }

    #[test]
    fn defaults() {
        let (_, store) = fresh();
        let s = store.settings();
        assert!(!s.use_chapter_track);
        assert_eq!(s.jump_forward_amount, 10.0);
        assert_eq!(s.jump_backward_amount, 10.0);
        assert_eq!(s.playback_rate, 1.0);
        assert_eq!(s.playback_rate_increment_decrement, RateStep::Tenth);
    }

    #[test]
    fn setters_persist() {
        let (backing, mut store) = fresh();

        store.set_use_chapter_track(true).unwrap();
        store.set_jump_forward_amount(30.0).unwrap();
        store.set_playback_rate(1.25).unwrap();
        store
            .set_playback_rate_increment_decrement(RateStep::Twentieth)
            .unwrap();

        let saved = persisted(&backing);
        assert!(saved.use_chapter_track);
        assert_eq!(saved.jump_forward_amount, 30.0);
        assert_eq!(saved.playback_rate, 1.25);
        assert_eq!(saved.playback_rate_increment_decrement, RateStep::Twentieth);

        let reloaded = PlayerSettingsStore::load(backing);
        assert_eq!(reloaded.settings(), store.settings());
    }

    #[test]
    fn values_are_clamped() {
        let (_, mut store) = fresh();
        assert_eq!(store.set_playback_rate(10.0).unwrap(), MAX_PLAYBACK_RATE);
        assert_eq!(store.set_playback_rate(0.1).unwrap(), MIN_PLAYBACK_RATE);
        assert_eq!(store.set_jump_backward_amount(0.0).unwrap(), MIN_JUMP_AMOUNT);
        assert_eq!(store.set_jump_forward_amount(900.0).unwrap(), MAX_JUMP_AMOUNT);

        // Non-finite input keeps the current value
        assert_eq!(store.set_playback_rate(f64::NAN).unwrap(), MIN_PLAYBACK_RATE);
    }

    #[test]
    fn increment_rounds_away_float_drift() {
        let (_, mut store) = fresh();
        for _ in 0..3 {
            store.increment_playback_rate().unwrap();
        }
        // 1.0 + 0.1 + 0.1 + 0.1 is 1.3000000000000003 without rounding
        assert_eq!(store.settings().playback_rate, 1.3);

        store
            .set_playback_rate_increment_decrement(RateStep::Twentieth)
            .unwrap();
        assert_eq!(store.decrement_playback_rate().unwrap(), 1.25);
    }

    #[test]
    fn stepping_stops_at_bounds() {
        let (_, mut store) = fresh();
        for _ in 0..50 {
            store.increment_playback_rate().unwrap();
        }
        assert_eq!(store.settings().playback_rate, MAX_PLAYBACK_RATE);

        for _ in 0..50 {
            store.decrement_playback_rate().unwrap();
        }
        assert_eq!(store.settings().playback_rate, MIN_PLAYBACK_RATE);
    }

    #[test]
    fn off_grid_rates_are_snapped_so_steps_reverse() {
        let (backing, mut store) = fresh();
        assert_eq!(store.set_playback_rate(1.234).unwrap(), 1.23);
        assert_eq!(persisted(&backing).playback_rate, 1.23);

        assert_eq!(store.increment_playback_rate().unwrap(), 1.33);
        assert_eq!(store.decrement_playback_rate().unwrap(), 1.23);

        let update = PlayerSettingsUpdate {
            playback_rate: Some(1.787),
            ..PlayerSettingsUpdate::default()
        };
        assert_eq!(store.update_settings(update).unwrap().playback_rate, 1.79);
    }

    #[test]
    fn off_grid_persisted_rate_is_snapped_on_load() {
        let backing = Arc::new(MemoryStore::new());
        let stored = PlayerSettings {
            playback_rate: 1.456,
            ..PlayerSettings::default()
        };
        settings::set_setting(backing.as_ref(), settings::SETTING_PLAYER_SETTINGS, &stored).unwrap();

        let store = PlayerSettingsStore::load(backing);
        assert_eq!(store.settings().playback_rate, 1.46);
    }

    #[test]
    fn partial_update_merges() {
        let (backing, mut store) = fresh();
        store.set_jump_forward_amount(45.0).unwrap();

        let updated = store
            .update_settings(PlayerSettingsUpdate {
                jump_backward_amount: Some(5.0),
                playback_rate: Some(5.0),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(updated.jump_forward_amount, 45.0);
        assert_eq!(updated.jump_backward_amount, 5.0);
        assert_eq!(updated.playback_rate, MAX_PLAYBACK_RATE);
        assert_eq!(persisted(&backing), updated);
    }

    #[test]
    fn corrupt_value_falls_back_to_defaults() {
        let backing = Arc::new(MemoryStore::new());
        settings::set_setting(
            backing.as_ref(),
            settings::SETTING_PLAYER_SETTINGS,
            &"not an object",
        )
        .unwrap();

        let store = PlayerSettingsStore::load(backing);
        assert_eq!(store.settings(), PlayerSettings::default());
    }

    #[test]
    fn out_of_range_persisted_values_are_sanitized() {
        let backing = Arc::new(MemoryStore::new());
        settings::set_setting(
            backing.as_ref(),
            settings::SETTING_PLAYER_SETTINGS,
            &serde_json::json!({"playbackRate": 8.0, "jumpForwardAmount": -3}),
        )
        .unwrap();

        let s = PlayerSettingsStore::load(backing).settings();
        assert_eq!(s.playback_rate, MAX_PLAYBACK_RATE);
        assert_eq!(s.jump_forward_amount, MIN_JUMP_AMOUNT);
        assert_eq!(s.jump_backward_amount, 10.0);
    }

    #[test]
    fn rate_step_wire_format() {
        let json = serde_json::to_value(PlayerSettings::default()).unwrap();
        assert_eq!(json["playbackRateIncrementDecrement"], 0.1);
        assert_eq!(json["useChapterTrack"], false);

        assert_eq!(
            serde_json::from_value::<RateStep>(serde_json::json!(0.05)).unwrap(),
            RateStep::Twentieth
        );
        assert!(serde_json::from_value::<RateStep>(serde_json::json!(0.2)).is_err());
    }
}
