use std::collections::{HashSet, VecDeque};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub mod api;
pub mod combat;
pub mod content;
pub mod creature;
pub mod dice;
pub mod events;
pub mod initiative;
pub mod life;
pub mod spells;
pub mod timeline;

pub use combat::{
    resolve_attack, resolve_saving_throw_effect, resolve_spell_save, AttackOutcome, CombatError,
    SaveEffect, SaveEffectOutcome, SpellSaveOutcome, SpellTargetOutcome,
};
pub use creature::{
    vantage_from_conditions, AttackSpec, Creature, SavingThrowOutcome, SneakAttack, Spellcasting,
};
pub use dice::{double_damage_dice, roll_notation, DiceError, DiceNotation, RollOutcome};
pub use events::{EventKind, GameEvent, NotificationHub};
pub use initiative::{TurnEntry, TurnTracker};
pub use life::{DeathSaveOutcome, DeathSaveRecord, LifeError};
pub use spells::{OnSuccess, SpellDamage, SpellSave, SpellSpec};
pub use timeline::{parse_duration_to_minutes, ActiveEffect, EffectKind, Timeline, ROUND_MINUTES};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AdMode {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl AdMode {
    /// Advantage and disadvantage cancel; like modes are idempotent.
    pub fn combine(self, other: AdMode) -> AdMode {
        use AdMode::*;
        match (self, other) {
            (Advantage, Disadvantage) | (Disadvantage, Advantage) => Normal,
            (Normal, x) | (x, Normal) => x,
            (Advantage, Advantage) => Advantage,
            (Disadvantage, Disadvantage) => Disadvantage,
        }
    }

    /// Both flags set cancel out to a normal roll.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> AdMode {
        match (advantage, disadvantage) {
            (true, false) => AdMode::Advantage,
            (false, true) => AdMode::Disadvantage,
            _ => AdMode::Normal,
        }
    }
}

/// A resolved d20 roll: every die that hit the table plus the one kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct D20Roll {
    pub raw: Vec<i32>,
    pub kept: i32,
}

enum DiceSource {
    Seeded(ChaCha8Rng),
    /// Fixed roll sequence for tests; exhausting it is a test bug.
    Scripted(VecDeque<i32>),
}

pub struct Dice {
    source: DiceSource,
}

impl Dice {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            source: DiceSource::Seeded(ChaCha8Rng::seed_from_u64(seed)),
        }
    }

    pub fn from_scripted(rolls: Vec<i32>) -> Self {
        Self {
            source: DiceSource::Scripted(rolls.into()),
        }
    }

    pub fn roll_die(&mut self, sides: u32) -> i32 {
        match &mut self.source {
            DiceSource::Seeded(rng) => rng.gen_range(1..=sides as i32),
            DiceSource::Scripted(queue) => queue.pop_front().expect("scripted dice exhausted"),
        }
    }

    pub fn d20(&mut self, mode: AdMode) -> D20Roll {
        match mode {
            AdMode::Normal => {
                let r = self.roll_die(20);
                D20Roll {
                    raw: vec![r],
                    kept: r,
                }
            }
            AdMode::Advantage => {
                let a = self.roll_die(20);
                let b = self.roll_die(20);
                D20Roll {
                    raw: vec![a, b],
                    kept: a.max(b),
                }
            }
            AdMode::Disadvantage => {
                let a = self.roll_die(20);
                let b = self.roll_die(20);
                D20Roll {
                    raw: vec![a, b],
                    kept: a.min(b),
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ability {
    Str,
    Dex,
    Con,
    Int,
    Wis,
    Cha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScores {
    #[serde(rename = "str")]
    pub str_: i32,
    pub dex: i32,
    pub con: i32,
    #[serde(rename = "int")]
    pub int_: i32,
    pub wis: i32,
    pub cha: i32,
}

impl AbilityScores {
    pub fn mod_of(&self, ability: Ability) -> i32 {
        let score = match ability {
            Ability::Str => self.str_,
            Ability::Dex => self.dex,
            Ability::Con => self.con,
            Ability::Int => self.int_,
            Ability::Wis => self.wis,
            Ability::Cha => self.cha,
        };
        ability_mod(score)
    }
}

/// Ability modifier = floor((score - 10) / 2) for integer scores.
pub fn ability_mod(score: i32) -> i32 {
    // `div_euclid` with positive divisor matches mathematical floor division.
    (score - 10).div_euclid(2)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    Bludgeoning,
    Piercing,
    Slashing,
    Fire,
    Cold,
    Lightning,
    Acid,
    Poison,
    Psychic,
    Radiant,
    Necrotic,
    Thunder,
    Force,
}

/// Immunity zeroes, resistance halves (floor), vulnerability doubles.
pub fn adjust_damage_by_type(
    raw: i32,
    dtype: DamageType,
    resistances: &HashSet<DamageType>,
    vulnerabilities: &HashSet<DamageType>,
    immunities: &HashSet<DamageType>,
) -> i32 {
    if immunities.contains(&dtype) {
        return 0;
    }
    let mut dmg = raw;
    if resistances.contains(&dtype) {
        dmg /= 2;
    }
    if vulnerabilities.contains(&dtype) {
        dmg *= 2;
    }
    dmg
}
