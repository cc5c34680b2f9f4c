//! Game-time tracking and duration-bound effect expiry.
//!
//! Durations are floating-point minutes so combat rounds (6 seconds) fit;
//! effects are keyed by `(target, source)` and a re-application replaces the
//! old entry instead of stacking.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::events::{GameEvent, NotificationHub};

/// One combat round of game time.
pub const ROUND_MINUTES: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Spell,
    Condition,
    Buff,
    Debuff,
    Poison,
    Disease,
}

/// A timed effect on a combatant. Targets and casters are referenced by
/// name, never by pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveEffect {
    pub kind: EffectKind,
    pub source: String,
    pub target: String,
    pub duration_minutes: f64,
    pub remaining_minutes: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub concentration: bool,
    #[serde(default)]
    pub caster: Option<String>,
    /// Free-form payload for consumers (save DCs, rider text, ...).
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ActiveEffect {
    pub fn new(
        kind: EffectKind,
        source: impl Into<String>,
        target: impl Into<String>,
        duration_minutes: f64,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
            duration_minutes,
            remaining_minutes: duration_minutes,
            description: String::new(),
            concentration: false,
            caster: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn concentration_of(mut self, caster: impl Into<String>) -> Self {
        self.concentration = true;
        self.caster = Some(caster.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_minutes <= 0.0
    }
}

/// Elapsed game time plus the set of active effects.
#[derive(Default)]
pub struct Timeline {
    elapsed_minutes: f64,
    effects: IndexMap<(String, String), ActiveEffect>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed_minutes
    }

    /// Advance game time, expiring every effect whose remaining duration
    /// runs out. Publishes one expiry event per expired effect, one
    /// time-advanced event per call, and an hour-passed event when the
    /// elapsed whole-hour count grows. Returns the expired effects.
    pub fn advance_time(
        &mut self,
        minutes: f64,
        reason: &str,
        hub: Option<&NotificationHub>,
    ) -> Vec<ActiveEffect> {
        if minutes <= 0.0 {
            return Vec::new();
        }

        let old_elapsed = self.elapsed_minutes;
        self.elapsed_minutes += minutes;

        for effect in self.effects.values_mut() {
            effect.remaining_minutes -= minutes;
        }
        let expired_keys: Vec<(String, String)> = self
            .effects
            .iter()
            .filter(|(_, e)| e.is_expired())
            .map(|(k, _)| k.clone())
            .collect();

        let mut expired = Vec::new();
        for key in expired_keys {
            if let Some(effect) = self.effects.shift_remove(&key) {
                if let Some(hub) = hub {
                    hub.publish(GameEvent::EffectExpired {
                        source: effect.source.clone(),
                        target: effect.target.clone(),
                        kind: effect.kind,
                        reason: None,
                    });
                }
                expired.push(effect);
            }
        }

        if let Some(hub) = hub {
            hub.publish(GameEvent::TimeAdvanced {
                minutes,
                elapsed_minutes: self.elapsed_minutes,
                reason: reason.to_string(),
            });

            let old_hours = (old_elapsed / 60.0) as u64;
            let new_hours = (self.elapsed_minutes / 60.0) as u64;
            if new_hours > old_hours {
                hub.publish(GameEvent::HourPassed {
                    hours: new_hours - old_hours,
                    total_hours: new_hours,
                });
            }
        }

        tracing::debug!(
            minutes,
            elapsed = self.elapsed_minutes,
            expired = expired.len(),
            reason,
            "time advanced"
        );
        expired
    }

    /// Track a new effect. A second effect with the same `(target, source)`
    /// key replaces the first (refresh, not stack).
    pub fn add_effect(&mut self, mut effect: ActiveEffect) {
        if effect.remaining_minutes > effect.duration_minutes {
            effect.remaining_minutes = effect.duration_minutes;
        }
        let key = (effect.target.clone(), effect.source.clone());
        self.effects.shift_remove(&key);
        self.effects.insert(key, effect);
    }

    pub fn remove_effect(&mut self, target: &str, source: &str) -> Option<ActiveEffect> {
        self.effects
            .shift_remove(&(target.to_string(), source.to_string()))
    }

    /// Break a caster's concentration: removes every concentration-flagged
    /// effect whose caster matches, publishing an expiry event for each.
    pub fn remove_concentration_effects(
        &mut self,
        caster: &str,
        hub: Option<&NotificationHub>,
    ) -> Vec<ActiveEffect> {
        let keys: Vec<(String, String)> = self
            .effects
            .iter()
            .filter(|(_, e)| e.concentration && e.caster.as_deref() == Some(caster))
            .map(|(k, _)| k.clone())
            .collect();

        let mut removed = Vec::new();
        for key in keys {
            if let Some(effect) = self.effects.shift_remove(&key) {
                if let Some(hub) = hub {
                    hub.publish(GameEvent::EffectExpired {
                        source: effect.source.clone(),
                        target: effect.target.clone(),
                        kind: effect.kind,
                        reason: Some("concentration_broken".to_string()),
                    });
                }
                removed.push(effect);
            }
        }
        removed
    }

    pub fn effects_for(&self, target: &str) -> Vec<&ActiveEffect> {
        self.effects
            .values()
            .filter(|e| e.target == target)
            .collect()
    }

    pub fn all_effects(&self) -> Vec<&ActiveEffect> {
        self.effects.values().collect()
    }

    pub fn clear_all_effects(&mut self) {
        self.effects.clear();
    }
}

/// Parse a duration string to minutes: "1 minute", "8 hours", "10 rounds"
/// (one round = 6 seconds), with "up to" / "Concentration," prefixes
/// stripped. Unparseable input ("Instantaneous", "Until dispelled") is None.
pub fn parse_duration_to_minutes(duration: &str) -> Option<f64> {
    let lower = duration.to_lowercase().replace(',', " ");
    let words: Vec<&str> = lower
        .split_whitespace()
        .filter(|w| !matches!(*w, "up" | "to" | "concentration"))
        .collect();

    for pair in words.windows(2) {
        let Ok(value) = pair[0].parse::<f64>() else {
            continue;
        };
        let per_unit = match pair[1].trim_end_matches('s') {
            "second" | "sec" => 1.0 / 60.0,
            "minute" | "min" => 1.0,
            "hour" | "hr" => 60.0,
            "round" => ROUND_MINUTES,
            _ => continue,
        };
        return Some(value * per_unit);
    }
    None
}
