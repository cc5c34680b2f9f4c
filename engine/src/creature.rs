//! Combatant model.
//!
//! One concrete `Creature` struct covers monsters, NPCs and player
//! characters; capabilities that only some combatants have (saving throws,
//! spellcasting, bonus damage, death saves) are optional fields chosen at
//! construction time. Resolvers check for the capability instead of assuming
//! it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::events::{GameEvent, NotificationHub};
use crate::life::DeathSaveRecord;
use crate::{Ability, AbilityScores, AdMode, DamageType, Dice};

/// Spell-save-DC capability: DC = 8 + proficiency + casting-ability modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spellcasting {
    pub ability: Ability,
}

/// Bonus-damage ("sneak attack") capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SneakAttack {
    pub dice: String,
}

/// A named attack routine, as found in encounter content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackSpec {
    pub name: String,
    pub to_hit: i32,
    pub dice: String,
    #[serde(default)]
    pub damage_type: Option<DamageType>,
    #[serde(default)]
    pub ranged: bool,
}

/// Outcome of a single saving throw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SavingThrowOutcome {
    pub ability: Ability,
    pub dc: i32,
    pub roll: i32,
    pub modifier: i32,
    pub total: i32,
    pub success: bool,
}

fn default_proficiency() -> i32 {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Creature {
    pub name: String,
    pub max_hp: i32,
    pub current_hp: i32,
    pub ac: i32,
    /// Saving-throw capability; absent for inanimate targets.
    #[serde(default)]
    pub abilities: Option<AbilityScores>,
    #[serde(default = "default_proficiency")]
    pub proficiency_bonus: i32,
    #[serde(default)]
    pub save_proficiencies: HashSet<Ability>,
    #[serde(default)]
    pub spellcasting: Option<Spellcasting>,
    #[serde(default)]
    pub sneak_attack: Option<SneakAttack>,
    #[serde(default)]
    pub attacks: Vec<AttackSpec>,
    #[serde(default)]
    pub resistances: HashSet<DamageType>,
    #[serde(default)]
    pub vulnerabilities: HashSet<DamageType>,
    #[serde(default)]
    pub immunities: HashSet<DamageType>,
    /// Death-save-capable combatants drop unconscious at 0 HP; the rest die.
    #[serde(default)]
    pub uses_death_saves: bool,
    #[serde(default)]
    pub(crate) death: Option<DeathSaveRecord>,
    #[serde(default)]
    conditions: HashSet<String>,
}

impl Creature {
    pub fn new(name: impl Into<String>, max_hp: i32, ac: i32) -> Self {
        Self {
            name: name.into(),
            max_hp,
            current_hp: max_hp,
            ac,
            abilities: None,
            proficiency_bonus: default_proficiency(),
            save_proficiencies: HashSet::new(),
            spellcasting: None,
            sneak_attack: None,
            attacks: Vec::new(),
            resistances: HashSet::new(),
            vulnerabilities: HashSet::new(),
            immunities: HashSet::new(),
            uses_death_saves: false,
            death: None,
            conditions: HashSet::new(),
        }
    }

    pub fn with_abilities(mut self, scores: AbilityScores) -> Self {
        self.abilities = Some(scores);
        self
    }

    pub fn with_proficiency_bonus(mut self, bonus: i32) -> Self {
        self.proficiency_bonus = bonus;
        self
    }

    pub fn with_save_proficiency(mut self, ability: Ability) -> Self {
        self.save_proficiencies.insert(ability);
        self
    }

    pub fn with_spellcasting(mut self, ability: Ability) -> Self {
        self.spellcasting = Some(Spellcasting { ability });
        self
    }

    pub fn with_sneak_attack(mut self, dice: impl Into<String>) -> Self {
        self.sneak_attack = Some(SneakAttack { dice: dice.into() });
        self
    }

    pub fn with_attack(mut self, attack: AttackSpec) -> Self {
        self.attacks.push(attack);
        self
    }

    pub fn with_death_saves(mut self) -> Self {
        self.uses_death_saves = true;
        self
    }

    pub fn with_resistance(mut self, dtype: DamageType) -> Self {
        self.resistances.insert(dtype);
        self
    }

    /* ---------------- identity ---------------- */

    pub fn is_alive(&self) -> bool {
        self.current_hp > 0
    }

    pub fn is_dead(&self) -> bool {
        if self.uses_death_saves {
            self.death.as_ref().is_some_and(|d| d.dead)
        } else {
            self.current_hp == 0
        }
    }

    /// At 0 HP with death saves still pending (not stabilized, not dead).
    pub fn is_unconscious(&self) -> bool {
        self.uses_death_saves && self.current_hp == 0 && !self.is_dead()
    }

    pub fn is_stabilized(&self) -> bool {
        self.death.as_ref().is_some_and(|d| d.stabilized)
    }

    pub fn death_saves(&self) -> Option<&DeathSaveRecord> {
        self.death.as_ref()
    }

    /* ---------------- conditions ---------------- */

    pub fn has_condition(&self, name: &str) -> bool {
        self.conditions.contains(&name.to_lowercase())
    }

    pub fn add_condition(&mut self, name: &str) {
        self.conditions.insert(name.to_lowercase());
    }

    pub fn remove_condition(&mut self, name: &str) {
        self.conditions.remove(&name.to_lowercase());
    }

    pub fn conditions(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().map(String::as_str)
    }

    /* ---------------- optional capabilities ---------------- */

    /// Saving-throw modifier, or None when the combatant cannot save at all.
    pub fn save_mod(&self, ability: Ability) -> Option<i32> {
        let scores = self.abilities.as_ref()?;
        let prof = if self.save_proficiencies.contains(&ability) {
            self.proficiency_bonus
        } else {
            0
        };
        Some(scores.mod_of(ability) + prof)
    }

    /// Roll a saving throw against a DC; None when the capability is absent.
    pub fn make_saving_throw(
        &self,
        dice: &mut Dice,
        ability: Ability,
        dc: i32,
        hub: Option<&NotificationHub>,
    ) -> Option<SavingThrowOutcome> {
        let modifier = self.save_mod(ability)?;
        let roll = dice.d20(AdMode::Normal).kept;
        let total = roll + modifier;
        let outcome = SavingThrowOutcome {
            ability,
            dc,
            roll,
            modifier,
            total,
            success: total >= dc,
        };
        if let Some(hub) = hub {
            hub.publish(GameEvent::SavingThrow {
                character: self.name.clone(),
                ability,
                dc,
                roll,
                modifier,
                total,
                success: outcome.success,
            });
        }
        Some(outcome)
    }

    pub fn spell_save_dc(&self) -> Option<i32> {
        let casting = self.spellcasting.as_ref()?;
        let scores = self.abilities.as_ref()?;
        Some(8 + self.proficiency_bonus + scores.mod_of(casting.ability))
    }

    /// Bonus damage rides on advantage and is denied under disadvantage.
    pub fn can_sneak_attack(&self, advantage: bool, disadvantage: bool) -> bool {
        self.sneak_attack.is_some() && advantage && !disadvantage
    }

    pub fn sneak_attack_dice(&self) -> Option<&str> {
        self.sneak_attack.as_ref().map(|s| s.dice.as_str())
    }

    /* ---------------- damage intake ---------------- */

    /// Apply damage. At 0 HP this feeds the death-save record instead of HP:
    /// an ordinary hit is an automatic failure, a hit of max HP or more is
    /// instant death. Dropping from positive HP to 0 creates the record with
    /// no failure recorded.
    pub fn take_damage(&mut self, amount: i32, hub: Option<&NotificationHub>) {
        let amount = amount.max(0);
        if self.is_dead() {
            return;
        }

        if self.current_hp == 0 && self.uses_death_saves {
            let record = self.death.get_or_insert_with(DeathSaveRecord::default);
            record.stabilized = false;
            if amount >= self.max_hp {
                record.failures = 3;
                record.dead = true;
                if let Some(hub) = hub {
                    hub.publish(GameEvent::MassiveDamageDeath {
                        character: self.name.clone(),
                        damage: amount,
                    });
                    hub.publish(GameEvent::CharacterDeath {
                        name: self.name.clone(),
                    });
                }
            } else {
                record.failures = (record.failures + 1).min(3);
                let failures = record.failures;
                let dead = failures >= 3;
                record.dead = dead;
                if let Some(hub) = hub {
                    hub.publish(GameEvent::DamageAtZeroHp {
                        character: self.name.clone(),
                        damage: amount,
                        failures,
                    });
                    if dead {
                        hub.publish(GameEvent::CharacterDeath {
                            name: self.name.clone(),
                        });
                    }
                }
            }
            return;
        }

        let before = self.current_hp;
        self.current_hp = (self.current_hp - amount).max(0);
        if before > 0 && self.current_hp == 0 {
            if self.uses_death_saves {
                self.death = Some(DeathSaveRecord::default());
                self.add_condition("unconscious");
            } else if let Some(hub) = hub {
                hub.publish(GameEvent::CharacterDeath {
                    name: self.name.clone(),
                });
            }
        }
    }

    /// Heal; waking from 0 HP clears the death-save record.
    pub fn heal(&mut self, amount: i32) {
        if amount <= 0 || self.is_dead() {
            return;
        }
        let was_down = self.current_hp == 0;
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
        if was_down && self.current_hp > 0 {
            self.death = None;
            self.remove_condition("unconscious");
        }
    }

    pub fn heal_full(&mut self) {
        self.heal(self.max_hp);
    }
}

/// Net advantage/disadvantage from the conditions on both sides of an attack.
/// Prone favors melee attackers and penalizes ranged ones; a restrained or
/// unconscious target is easy prey; a poisoned or restrained attacker rolls
/// at disadvantage.
pub fn vantage_from_conditions(attacker: &Creature, target: &Creature, ranged: bool) -> AdMode {
    let mut net = AdMode::Normal;

    if attacker.has_condition("poisoned") || attacker.has_condition("restrained") {
        net = net.combine(AdMode::Disadvantage);
    }
    if target.has_condition("restrained") || target.has_condition("unconscious") {
        net = net.combine(AdMode::Advantage);
    }
    if target.has_condition("prone") {
        net = net.combine(if ranged {
            AdMode::Disadvantage
        } else {
            AdMode::Advantage
        });
    }

    net
}
