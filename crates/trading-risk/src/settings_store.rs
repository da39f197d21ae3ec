//! Per-user risk settings storage.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, info};
use trading_core::error::SettingsError;
use trading_core::types::Position;

use crate::profiles::find_profile;
use crate::{EffectiveRiskSettings, RiskSettings, RiskSettingsUpdate};

/// Holds each user's global risk configuration.
///
/// Settings are created lazily from the configured defaults the first time a user
/// is read, and are only ever replaced as a whole.
pub struct RiskSettingsStore {
    defaults: RiskSettings,
    settings: RwLock<HashMap<String, RiskSettings>>,
}

impl Default for RiskSettingsStore {
    fn default() -> Self {
        Self::new(RiskSettings::default())
    }
}

impl RiskSettingsStore {
    /// Create a store that seeds new users with `defaults`.
    pub fn new(defaults: RiskSettings) -> Self {
        Self {
            defaults,
            settings: RwLock::new(HashMap::new()),
        }
    }

    /// Get a user's settings, creating them from the defaults if unset.
    pub fn get(&self, user_id: &str) -> RiskSettings {
        if let Some(existing) = self.settings.read().get(user_id) {
            return existing.clone();
        }

        let mut settings = self.settings.write();
        settings
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating default risk settings");
                self.defaults.clone()
            })
            .clone()
    }

    /// Replace a user's settings. Nothing changes if validation fails.
    pub fn update(
        &self,
        user_id: &str,
        update: &RiskSettingsUpdate,
    ) -> Result<RiskSettings, SettingsError> {
        let validated = update.validate()?;
        self.settings
            .write()
            .insert(user_id.to_string(), validated.clone());
        info!(user_id, "Risk settings replaced");
        Ok(validated)
    }

    /// Copy a named profile's values into a user's settings.
    pub fn apply_profile(
        &self,
        user_id: &str,
        profile_name: &str,
    ) -> Result<RiskSettings, SettingsError> {
        let profile = find_profile(profile_name)
            .ok_or_else(|| SettingsError::UnknownProfile(profile_name.to_string()))?;

        let mut settings = self.settings.write();
        let entry = settings
            .entry(user_id.to_string())
            .or_insert_with(|| self.defaults.clone());
        profile.apply_to(entry);
        info!(user_id, profile = profile.name, "Risk profile applied");
        Ok(entry.clone())
    }

    /// Effective thresholds for a position, resolved through its owner's settings.
    pub fn effective_for(&self, position: &Position) -> EffectiveRiskSettings {
        self.get(&position.user_id).effective_for(position)
    }

    /// The defaults used for new users.
    pub fn defaults(&self) -> &RiskSettings {
        &self.defaults
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use trading_core::error::ValidationError;
    use trading_core::types::Direction;

    #[test]
    fn test_get_returns_defaults_for_new_user() {
        let store = RiskSettingsStore::default();
        assert_eq!(store.get("alice"), RiskSettings::default());
    }

    #[test]
    fn test_custom_defaults() {
        let defaults = RiskSettings {
            global_stop_loss_percent: dec!(3),
            ..Default::default()
        };
        let store = RiskSettingsStore::new(defaults);
        assert_eq!(store.get("bob").global_stop_loss_percent, dec!(3));
    }

    #[test]
    fn test_partial_update_rejected_without_change() {
        let store = RiskSettingsStore::default();
        let mut update = RiskSettingsUpdate::from(&RiskSettings::default());
        update.global_stop_loss_percent = Some(dec!(7));
        store.update("alice", &update).unwrap();

        let mut partial = update.clone();
        partial.global_stop_loss_percent = Some(dec!(1));
        partial.default_take_profit_percent = None;

        let err = store.update("alice", &partial).unwrap_err();
        assert_eq!(
            err,
            SettingsError::Validation(ValidationError::MissingFields(vec![
                "default_take_profit_percent".to_string()
            ]))
        );
        assert_eq!(store.get("alice").global_stop_loss_percent, dec!(7));
    }

    #[test]
    fn test_apply_profile() {
        let store = RiskSettingsStore::default();
        let settings = store.apply_profile("alice", "conservative").unwrap();
        assert_eq!(settings.global_stop_loss_percent, dec!(2));
        assert_eq!(store.get("alice").global_take_profit_percent, dec!(4));
    }

    #[test]
    fn test_apply_unknown_profile_is_rejected() {
        let store = RiskSettingsStore::default();
        let before = store.get("alice");
        let err = store.apply_profile("alice", "yolo").unwrap_err();
        assert_eq!(err, SettingsError::UnknownProfile("yolo".to_string()));
        assert_eq!(store.get("alice"), before);
    }

    #[test]
    fn test_profile_is_copied_not_linked() {
        let store = RiskSettingsStore::default();
        store.apply_profile("alice", "aggressive").unwrap();

        let mut update = RiskSettingsUpdate::from(&store.get("alice"));
        update.global_stop_loss_percent = Some(dec!(6));
        store.update("alice", &update).unwrap();

        assert_eq!(store.get("alice").global_stop_loss_percent, dec!(6));
        assert_eq!(
            crate::find_profile("aggressive").unwrap().stop_loss_percent,
            dec!(10)
        );
    }

    #[test]
    fn test_effective_for_uses_owner_settings() {
        let store = RiskSettingsStore::default();
        store.apply_profile("carol", "swing-trader").unwrap();
        let position = Position::open("carol", "ETH", Direction::Long, dec!(2000), dec!(1));
        assert_eq!(store.effective_for(&position).stop_loss_percent, dec!(7));
    }
}
