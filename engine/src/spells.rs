//! Spell definitions, as deserialized from content files.

use serde::{Deserialize, Deserializer, Serialize};

use crate::timeline::parse_duration_to_minutes;
use crate::{Ability, DamageType};

/// What a successful save does to the damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnSuccess {
    Half,
    Negates,
    #[default]
    Full,
}

// Content files say "half", "none" or "negates"; anything else is the rare
// spell that hurts the same either way.
impl<'de> Deserialize<'de> for OnSuccess {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.to_lowercase().as_str() {
            "half" => OnSuccess::Half,
            "none" | "negates" => OnSuccess::Negates,
            _ => OnSuccess::Full,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDamage {
    pub dice: String,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    /// Prose describing per-slot-level scaling, e.g. "the damage increases by
    /// 1d6 for each slot level above 3rd".
    #[serde(default)]
    pub higher_levels: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSave {
    pub ability: Ability,
    #[serde(default)]
    pub on_success: OnSuccess,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellSpec {
    pub id: String,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub damage: Option<SpellDamage>,
    #[serde(default)]
    pub saving_throw: Option<SpellSave>,
    /// Duration prose ("Instantaneous", "Concentration, up to 1 minute").
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub concentration: bool,
}

impl SpellSpec {
    /// Timed-effect duration in minutes, when the spell has one.
    pub fn effect_duration_minutes(&self) -> Option<f64> {
        parse_duration_to_minutes(self.duration.as_deref()?)
    }
}
