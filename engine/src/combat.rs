//! Combat resolution: single-target attacks, saving-throw effects, and
//! multi-target spell saves with upcasting.
//!
//! Resolvers take the dice source and an optional notification hub
//! explicitly; nothing here reaches for ambient state.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::creature::SavingThrowOutcome;
use crate::dice::{double_damage_dice, roll_notation, DiceError, DiceNotation};
use crate::events::{GameEvent, NotificationHub, SpellTargetResult};
use crate::spells::{OnSuccess, SpellSpec};
use crate::{Ability, AdMode, Creature, Dice};

#[derive(Debug, Error)]
pub enum CombatError {
    #[error("{target} has no saving-throw capability")]
    InvalidTarget { target: String },
    #[error("{caster} has no spellcasting ability")]
    InvalidCaster { caster: String },
    #[error("spell '{spell}' does not require a saving throw")]
    NoSavingThrow { spell: String },
    #[error("spell '{spell}' has no damage")]
    NoDamage { spell: String },
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// Full record of one resolved attack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttackOutcome {
    pub attacker: String,
    pub defender: String,
    /// The natural die result, 1..=20.
    pub roll: i32,
    pub attack_bonus: i32,
    pub target_ac: i32,
    pub hit: bool,
    pub critical_hit: bool,
    pub advantage: bool,
    pub disadvantage: bool,
    pub damage: i32,
    pub bonus_damage: i32,
    pub bonus_damage_dice: Option<String>,
}

impl AttackOutcome {
    pub fn total_attack(&self) -> i32 {
        self.roll + self.attack_bonus
    }
}

impl fmt::Display for AttackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.critical_hit {
            "CRITICAL HIT"
        } else if self.hit {
            "HIT"
        } else if self.roll == 1 {
            "MISS (natural 1)"
        } else {
            "MISS"
        };
        let vantage = if self.advantage {
            " (advantage)"
        } else if self.disadvantage {
            " (disadvantage)"
        } else {
            ""
        };
        write!(
            f,
            "{} attacks {}: {}+{}={} vs AC {} - {}{}",
            self.attacker,
            self.defender,
            self.roll,
            self.attack_bonus,
            self.total_attack(),
            self.target_ac,
            status,
            vantage
        )?;
        if self.hit {
            write!(f, " for {} damage", self.damage + self.bonus_damage)?;
        }
        Ok(())
    }
}

/// Resolve one attack: d20 + bonus vs AC, natural 20 always hits (and
/// doubles the damage dice, not the modifier), natural 1 always misses.
/// Bonus (sneak-attack) damage rolls separately and is never doubled by the
/// main attack's critical status.
#[allow(clippy::too_many_arguments)]
pub fn resolve_attack(
    dice: &mut Dice,
    attacker: &Creature,
    defender: &mut Creature,
    attack_bonus: i32,
    damage_dice: &str,
    advantage: bool,
    disadvantage: bool,
    apply_damage: bool,
    hub: Option<&NotificationHub>,
) -> Result<AttackOutcome, CombatError> {
    let mode = AdMode::from_flags(advantage, disadvantage);
    let roll = dice.d20(mode).kept;

    let critical_hit = roll == 20;
    let critical_miss = roll == 1;
    let hit = if critical_hit {
        true
    } else if critical_miss {
        false
    } else {
        roll + attack_bonus >= defender.ac
    };

    let mut damage = 0;
    let mut bonus_damage = 0;
    let mut bonus_damage_dice = None;

    if hit {
        let notation = if critical_hit {
            double_damage_dice(damage_dice)
        } else {
            damage_dice.to_string()
        };
        damage = roll_notation(dice, &notation, AdMode::Normal)?.total.max(0);

        if attacker.can_sneak_attack(advantage, disadvantage) {
            if let Some(sneak_dice) = attacker.sneak_attack_dice() {
                let sneak_dice = sneak_dice.to_string();
                bonus_damage = roll_notation(dice, &sneak_dice, AdMode::Normal)?.total.max(0);
                if let Some(hub) = hub {
                    hub.publish(GameEvent::SneakAttack {
                        attacker: attacker.name.clone(),
                        dice: sneak_dice.clone(),
                        damage: bonus_damage,
                    });
                }
                bonus_damage_dice = Some(sneak_dice);
            }
        }

        if apply_damage {
            let total = damage + bonus_damage;
            let hp_before = defender.current_hp;
            // Damage to a combatant already at 0 HP feeds death saves, not HP.
            let hp_after = if hp_before == 0 {
                0
            } else {
                (hp_before - total).max(0)
            };
            if let Some(hub) = hub {
                hub.publish(GameEvent::DamageDealt {
                    attacker: attacker.name.clone(),
                    target: defender.name.clone(),
                    item: None,
                    damage_rolled: total,
                    damage_after_resistance: total,
                    damage_actual: hp_before - hp_after,
                    damage_type: None,
                    resisted: false,
                    hp_before,
                    hp_after,
                });
            }
            defender.take_damage(total, hub);
        }
    }

    let outcome = AttackOutcome {
        attacker: attacker.name.clone(),
        defender: defender.name.clone(),
        roll,
        attack_bonus,
        target_ac: defender.ac,
        hit,
        critical_hit,
        advantage,
        disadvantage,
        damage,
        bonus_damage,
        bonus_damage_dice,
    };
    tracing::debug!(
        attacker = %outcome.attacker,
        defender = %outcome.defender,
        roll,
        hit,
        critical_hit,
        "attack resolved"
    );
    Ok(outcome)
}

/// A save-or-suffer effect outside the spell system (traps, breath, poison
/// needles). Defaults to 1d6 damage with no mitigation on a success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveEffect {
    #[serde(default)]
    pub damage_dice: Option<String>,
    #[serde(default)]
    pub half_on_success: bool,
    #[serde(default)]
    pub negate_on_success: bool,
    #[serde(default)]
    pub description: Option<String>,
}

const DEFAULT_EFFECT_DICE: &str = "1d6";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveEffectOutcome {
    pub save: SavingThrowOutcome,
    pub damage_rolled: i32,
    pub damage_taken: i32,
}

/// Resolve a single-target saving-throw effect. On a successful save,
/// `negate_on_success` zeroes the damage, `half_on_success` floors it to
/// half, and neither means it lands in full anyway.
pub fn resolve_saving_throw_effect(
    dice: &mut Dice,
    target: &mut Creature,
    ability: Ability,
    dc: i32,
    effect: &SaveEffect,
    apply_damage: bool,
    hub: Option<&NotificationHub>,
) -> Result<SaveEffectOutcome, CombatError> {
    let save = target
        .make_saving_throw(dice, ability, dc, hub)
        .ok_or_else(|| CombatError::InvalidTarget {
            target: target.name.clone(),
        })?;

    let notation = effect.damage_dice.as_deref().unwrap_or(DEFAULT_EFFECT_DICE);
    let damage_rolled = roll_notation(dice, notation, AdMode::Normal)?.total.max(0);

    let damage_taken = if save.success {
        if effect.negate_on_success {
            0
        } else if effect.half_on_success {
            damage_rolled / 2
        } else {
            damage_rolled
        }
    } else {
        damage_rolled
    };

    if apply_damage {
        target.take_damage(damage_taken, hub);
    }

    Ok(SaveEffectOutcome {
        save,
        damage_rolled,
        damage_taken,
    })
}

/// Per-target line of a resolved spell save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellTargetOutcome {
    pub name: String,
    pub save: SavingThrowOutcome,
    pub damage_rolled: i32,
    pub damage_taken: i32,
    pub effect: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellSaveOutcome {
    pub spell_id: String,
    pub spell_name: String,
    pub caster: String,
    pub save_dc: i32,
    pub save_ability: Ability,
    pub upcast_level: Option<u8>,
    pub targets: Vec<SpellTargetOutcome>,
}

/// Resolve a save-based spell against a caller-supplied target list. Damage
/// is rolled once (with upcast scaling) and shared by every target; targets
/// without the saving-throw capability are skipped silently.
pub fn resolve_spell_save(
    dice: &mut Dice,
    caster: &Creature,
    targets: &mut [&mut Creature],
    spell: &SpellSpec,
    upcast_level: Option<u8>,
    apply_damage: bool,
    hub: Option<&NotificationHub>,
) -> Result<SpellSaveOutcome, CombatError> {
    let save_spec = spell
        .saving_throw
        .as_ref()
        .ok_or_else(|| CombatError::NoSavingThrow {
            spell: spell.name.clone(),
        })?;
    let save_dc = caster
        .spell_save_dc()
        .ok_or_else(|| CombatError::InvalidCaster {
            caster: caster.name.clone(),
        })?;

    let damage_rolled = roll_spell_save_damage(dice, spell, upcast_level)?;

    let effect_text = match save_spec.on_success {
        OnSuccess::Half => "half damage on a successful save",
        OnSuccess::Negates => "no damage on a successful save",
        OnSuccess::Full => "full damage even on a successful save",
    };

    let mut outcomes = Vec::new();
    for target in targets.iter_mut() {
        // Inanimate or otherwise save-incapable targets are skipped silently.
        let Some(save) = target.make_saving_throw(dice, save_spec.ability, save_dc, hub) else {
            continue;
        };

        let damage_taken = if save.success {
            match save_spec.on_success {
                OnSuccess::Half => damage_rolled / 2,
                OnSuccess::Negates => 0,
                OnSuccess::Full => damage_rolled,
            }
        } else {
            damage_rolled
        };

        if apply_damage {
            target.take_damage(damage_taken, hub);
        }

        outcomes.push(SpellTargetOutcome {
            name: target.name.clone(),
            save,
            damage_rolled,
            damage_taken,
            effect: effect_text.to_string(),
        });
    }

    let outcome = SpellSaveOutcome {
        spell_id: spell.id.clone(),
        spell_name: spell.name.clone(),
        caster: caster.name.clone(),
        save_dc,
        save_ability: save_spec.ability,
        upcast_level,
        targets: outcomes,
    };

    if let Some(hub) = hub {
        hub.publish(GameEvent::SpellCast {
            caster: outcome.caster.clone(),
            spell_id: outcome.spell_id.clone(),
            spell_name: outcome.spell_name.clone(),
            spell_level: spell.level,
            upcast_level,
            save_dc,
            save_ability: save_spec.ability,
            targets: outcome
                .targets
                .iter()
                .map(|t| SpellTargetResult {
                    name: t.name.clone(),
                    save: Some(t.save),
                    damage_rolled: t.damage_rolled,
                    damage_taken: t.damage_taken,
                })
                .collect(),
        });
    }
    tracing::debug!(
        caster = %outcome.caster,
        spell = %outcome.spell_name,
        save_dc,
        targets = outcome.targets.len(),
        "spell save resolved"
    );

    Ok(outcome)
}

/// Roll a spell's damage once. When cast above its base level and the damage
/// block declares a per-level bonus, the bonus dice are rolled once per slot
/// level above base and summed in.
pub fn roll_spell_save_damage(
    dice: &mut Dice,
    spell: &SpellSpec,
    upcast_level: Option<u8>,
) -> Result<i32, CombatError> {
    let damage = spell.damage.as_ref().ok_or_else(|| CombatError::NoDamage {
        spell: spell.name.clone(),
    })?;

    let mut total = roll_notation(dice, &damage.dice, AdMode::Normal)?.total;

    if let Some(upcast) = upcast_level {
        if upcast > spell.level {
            if let Some(bonus) = damage
                .higher_levels
                .as_deref()
                .and_then(per_level_bonus_dice)
            {
                for _ in spell.level..upcast {
                    total += bonus.roll(dice, AdMode::Normal)?.total;
                }
            }
        }
    }

    Ok(total.max(0))
}

/// Pull the per-level bonus dice out of "higher levels" prose: a dice token
/// followed by "per"/"for each" and then "[slot] level".
fn per_level_bonus_dice(text: &str) -> Option<DiceNotation> {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric() && c != '+' && c != '-'))
        .collect();

    for (i, word) in words.iter().enumerate() {
        let Ok(dice) = DiceNotation::parse(word) else {
            continue;
        };
        let rest = &words[i + 1..];
        let tail = match rest {
            ["per", tail @ ..] => tail,
            ["for", "each", tail @ ..] => tail,
            _ => continue,
        };
        let names_level = match tail {
            ["slot", "level", ..] => true,
            ["level", ..] => true,
            _ => false,
        };
        if names_level {
            return Some(dice);
        }
    }
    None
}
