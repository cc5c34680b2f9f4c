//! Config-driven orchestration: load an encounter (builtin or file) and run
//! the whole fight through the resolvers, producing an ordered event trace.
//!
//! This is the reference caller for the resolution core; real frontends
//! drive the same pieces interactively.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::combat::resolve_attack;
use crate::content;
use crate::creature::vantage_from_conditions;
use crate::events::{GameEvent, NotificationHub};
use crate::initiative::TurnTracker;
use crate::spells::SpellSpec;
use crate::timeline::{Timeline, ROUND_MINUTES};
use crate::{adjust_damage_by_type, Ability, AdMode, Creature, Dice};

const DEFAULT_MAX_ROUNDS: u32 = 30;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterConfig {
    pub encounter_id: Option<String>,
    pub encounter_path: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncounterSpec {
    pub name: String,
    #[serde(default)]
    pub xp_award: i32,
    pub party: Vec<Creature>,
    pub enemies: Vec<Creature>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct EncounterResult {
    pub encounter: String,
    pub winner: String,
    pub rounds: u32,
    pub xp_awarded: i32,
    pub events: Vec<GameEvent>,
}

/// Look up one spell from the builtin spell list.
pub fn builtin_spell(id: &str) -> Result<SpellSpec> {
    for (_, raw) in content::builtin_spells() {
        let spells: Vec<SpellSpec> =
            serde_json::from_str(raw).context("failed to parse builtin spells JSON")?;
        if let Some(spell) = spells.into_iter().find(|s| s.id == id) {
            return Ok(spell);
        }
    }
    bail!("spell '{}' not found in builtin content", id)
}

fn load_encounter(cfg: &EncounterConfig) -> Result<EncounterSpec> {
    if let Some(path) = &cfg.encounter_path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read encounter file: {}", path))?;
        let is_yaml = Path::new(path)
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let spec = if is_yaml {
            serde_yaml::from_str(&text)
                .with_context(|| format!("failed to parse encounter YAML: {}", path))?
        } else {
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse encounter JSON: {}", path))?
        };
        return Ok(spec);
    }

    let id = cfg
        .encounter_id
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("encounter_id or encounter_path required"))?;
    let builtins = content::builtin_encounters();
    let raw = builtins
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("unknown builtin encounter '{}'", id))?;
    serde_json::from_str(raw).with_context(|| format!("failed to parse builtin encounter '{}'", id))
}

/// "Goblin" + "Goblin" → "Goblin 1" + "Goblin 2".
fn number_duplicates(creatures: &mut [Creature]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for c in creatures.iter() {
        *counts.entry(c.name.clone()).or_default() += 1;
    }
    let mut seen: HashMap<String, usize> = HashMap::new();
    for c in creatures.iter_mut() {
        if counts[&c.name] > 1 {
            let n = seen.entry(c.name.clone()).or_default();
            *n += 1;
            c.name = format!("{} {}", c.name, n);
        }
    }
}

fn pair_mut<T>(slice: &mut [T], a: usize, b: usize) -> (&mut T, &mut T) {
    assert_ne!(a, b);
    if a < b {
        let (left, right) = slice.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = slice.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

pub fn simulate_encounter(cfg: EncounterConfig) -> Result<EncounterResult> {
    let spec = load_encounter(&cfg)?;
    if spec.party.is_empty() || spec.enemies.is_empty() {
        bail!("encounter '{}' needs both a party and enemies", spec.name);
    }

    let party_len = spec.party.len();
    let mut creatures: Vec<Creature> = spec.party;
    creatures.extend(spec.enemies);
    number_duplicates(&mut creatures);

    let party_list: Vec<String> = creatures[..party_len]
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let party_names: HashSet<String> = party_list.iter().cloned().collect();
    let enemy_names: Vec<String> = creatures[party_len..]
        .iter()
        .map(|c| c.name.clone())
        .collect();

    let hub = NotificationHub::new();
    let events: Rc<RefCell<Vec<GameEvent>>> = Rc::default();
    {
        let sink = Rc::clone(&events);
        hub.subscribe_all(move |e| sink.borrow_mut().push(e.clone()));
    }

    tracing::info!(encounter = %spec.name, seed = cfg.seed, "encounter start");
    hub.publish(GameEvent::CombatStart {
        party: party_list.clone(),
        enemies: enemy_names.clone(),
    });

    let mut dice = Dice::from_seed(cfg.seed);
    let mut tracker = TurnTracker::new();
    for c in &creatures {
        let modifier = c
            .abilities
            .as_ref()
            .map(|a| a.mod_of(Ability::Dex))
            .unwrap_or(0);
        tracker.add_combatant(&mut dice, &c.name, modifier);
    }

    let mut timeline = Timeline::new();
    let max_rounds = cfg.max_rounds.unwrap_or(DEFAULT_MAX_ROUNDS);
    let side_standing = |creatures: &[Creature], party: bool, party_names: &HashSet<String>| {
        creatures
            .iter()
            .any(|c| party_names.contains(&c.name) == party && c.is_alive())
    };

    let mut winner: Option<&str> = None;
    while tracker.round < max_rounds {
        let party_up = side_standing(&creatures, true, &party_names);
        let enemies_up = side_standing(&creatures, false, &party_names);
        if !enemies_up {
            winner = Some("party");
            break;
        }
        if !party_up {
            winner = Some("enemies");
            break;
        }

        let Some(entry) = tracker.current_combatant() else {
            break;
        };
        let actor_name = entry.name.clone();
        let Some(actor_idx) = creatures.iter().position(|c| c.name == actor_name) else {
            tracker.next_turn();
            continue;
        };

        if creatures[actor_idx].is_unconscious() && !creatures[actor_idx].is_stabilized() {
            let _ = creatures[actor_idx].make_death_save(&mut dice, Some(&hub));
        } else if creatures[actor_idx].is_alive() {
            let actor_is_party = party_names.contains(&actor_name);
            let target_idx = creatures
                .iter()
                .position(|c| party_names.contains(&c.name) != actor_is_party && c.is_alive());
            let attack = creatures[actor_idx].attacks.first().cloned();
            if let (Some(target_idx), Some(attack)) = (target_idx, attack) {
                let mode = vantage_from_conditions(
                    &creatures[actor_idx],
                    &creatures[target_idx],
                    attack.ranged,
                );
                let (advantage, disadvantage) = match mode {
                    AdMode::Advantage => (true, false),
                    AdMode::Disadvantage => (false, true),
                    AdMode::Normal => (false, false),
                };
                let (attacker, defender) = pair_mut(&mut creatures, actor_idx, target_idx);
                let outcome = resolve_attack(
                    &mut dice,
                    attacker,
                    defender,
                    attack.to_hit,
                    &attack.dice,
                    advantage,
                    disadvantage,
                    false,
                    Some(&hub),
                )
                .with_context(|| format!("attack by {} failed to resolve", attacker.name))?;

                if outcome.hit {
                    let rolled = outcome.damage + outcome.bonus_damage;
                    let adjusted = match attack.damage_type {
                        Some(dtype) => adjust_damage_by_type(
                            rolled,
                            dtype,
                            &defender.resistances,
                            &defender.vulnerabilities,
                            &defender.immunities,
                        ),
                        None => rolled,
                    };
                    let hp_before = defender.current_hp;
                    let hp_after = if hp_before == 0 {
                        0
                    } else {
                        (hp_before - adjusted).max(0)
                    };
                    hub.publish(GameEvent::DamageDealt {
                        attacker: attacker.name.clone(),
                        target: defender.name.clone(),
                        item: Some(attack.name.clone()),
                        damage_rolled: rolled,
                        damage_after_resistance: adjusted,
                        damage_actual: hp_before - hp_after,
                        damage_type: attack.damage_type,
                        resisted: adjusted < rolled,
                        hp_before,
                        hp_after,
                    });
                    defender.take_damage(adjusted, Some(&hub));
                }
            }
        }

        // Only the permanently dead leave the order; downed combatants keep
        // their slot.
        let newly_dead: Vec<String> = creatures
            .iter()
            .filter(|c| c.is_dead())
            .map(|c| c.name.clone())
            .collect();
        for name in newly_dead {
            tracker.remove_combatant(&name);
        }
        if tracker.all_combatants().is_empty() {
            break;
        }

        let round_before = tracker.round;
        tracker.next_turn();
        if tracker.round > round_before {
            timeline.advance_time(ROUND_MINUTES, "combat round", Some(&hub));
        }
    }

    let rounds = tracker.round + 1;
    let casualties: Vec<String> = creatures
        .iter()
        .filter(|c| c.is_dead())
        .map(|c| c.name.clone())
        .collect();

    let winner = match winner {
        Some(w) => w,
        None => "fled",
    };
    if winner == "fled" {
        hub.publish(GameEvent::CombatFled {
            party: party_list,
            enemies: enemy_names,
        });
    } else {
        let victors: Vec<String> = creatures
            .iter()
            .filter(|c| party_names.contains(&c.name) == (winner == "party") && c.is_alive())
            .map(|c| c.name.clone())
            .collect();
        let xp = if winner == "party" { spec.xp_award } else { 0 };
        hub.publish(GameEvent::CombatEnd {
            victors,
            casualties,
            xp_awarded: xp,
        });
    }

    tracing::info!(encounter = %spec.name, winner, rounds, "encounter finished");
    drop(hub);
    let events = Rc::try_unwrap(events)
        .map(RefCell::into_inner)
        .unwrap_or_else(|rc| rc.borrow().clone());

    Ok(EncounterResult {
        encounter: spec.name,
        winner: winner.to_string(),
        rounds,
        xp_awarded: if winner == "party" { spec.xp_award } else { 0 },
        events,
    })
}
