use std::cell::RefCell;
use std::rc::Rc;

use engine::{Creature, Dice, EventKind, GameEvent, LifeError, NotificationHub};

fn hero() -> Creature {
    Creature::new("Hero", 10, 16).with_death_saves()
}

fn downed_hero() -> Creature {
    let mut hero = hero();
    hero.take_damage(10, None);
    hero
}

fn recorder(hub: &NotificationHub, kind: EventKind) -> Rc<RefCell<Vec<GameEvent>>> {
    let seen: Rc<RefCell<Vec<GameEvent>>> = Rc::default();
    let sink = Rc::clone(&seen);
    hub.subscribe(kind, move |e| sink.borrow_mut().push(e.clone()));
    seen
}

#[test]
fn dropping_to_zero_creates_record_without_a_failure() {
    let mut hero = hero();
    assert!(hero.death_saves().is_none());

    hero.take_damage(12, None);

    assert_eq!(hero.current_hp, 0);
    assert!(hero.is_unconscious());
    assert!(hero.has_condition("unconscious"));
    let record = hero.death_saves().unwrap();
    assert_eq!(record.failures, 0);
    assert_eq!(record.successes, 0);
}

#[test]
fn damage_at_zero_hp_is_an_automatic_failure() {
    let mut hero = downed_hero();
    hero.take_damage(5, None);
    assert_eq!(hero.death_saves().unwrap().failures, 1);
    assert_eq!(hero.current_hp, 0);
}

#[test]
fn three_hits_while_down_are_fatal() {
    let hub = NotificationHub::new();
    let deaths = recorder(&hub, EventKind::CharacterDeath);

    let mut hero = downed_hero();
    hero.take_damage(5, Some(&hub));
    hero.take_damage(3, Some(&hub));
    hero.take_damage(4, Some(&hub));

    assert_eq!(hero.death_saves().unwrap().failures, 3);
    assert!(hero.is_dead());
    assert_eq!(deaths.borrow().len(), 1);

    // Further damage is a no-op once dead.
    hero.take_damage(5, Some(&hub));
    assert_eq!(deaths.borrow().len(), 1);
}

#[test]
fn massive_damage_while_down_is_instant_death() {
    let hub = NotificationHub::new();
    let massive = recorder(&hub, EventKind::MassiveDamageDeath);

    let mut hero = downed_hero();
    hero.take_damage(10, Some(&hub));

    assert!(hero.is_dead());
    assert_eq!(hero.death_saves().unwrap().failures, 3);
    assert_eq!(massive.borrow().len(), 1);
}

#[test]
fn death_save_success_and_failure_tally() {
    let mut hero = downed_hero();

    let mut dice = Dice::from_scripted(vec![15]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.successes, 1);
    assert_eq!(outcome.failures, 0);

    let mut dice = Dice::from_scripted(vec![7]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.successes, 1);
    assert_eq!(outcome.failures, 1);
}

#[test]
fn natural_twenty_wakes_with_one_hp() {
    let mut hero = downed_hero();
    // Bank some history first so the reset is observable.
    let mut dice = Dice::from_scripted(vec![15, 4, 20]);
    hero.make_death_save(&mut dice, None).unwrap();
    hero.make_death_save(&mut dice, None).unwrap();

    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.natural_20);
    assert!(outcome.conscious);
    assert_eq!(hero.current_hp, 1);
    assert!(hero.death_saves().is_none());
    assert!(!hero.has_condition("unconscious"));
}

#[test]
fn natural_one_counts_two_failures() {
    let mut hero = downed_hero();
    let mut dice = Dice::from_scripted(vec![1]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.natural_1);
    assert_eq!(outcome.failures, 2);
    assert!(!outcome.dead);
}

#[test]
fn natural_one_on_the_brink_is_fatal() {
    let mut hero = downed_hero();
    hero.take_damage(2, None);
    hero.take_damage(2, None); // 2 failures banked
    let mut dice = Dice::from_scripted(vec![1]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.dead);
    assert_eq!(outcome.failures, 3);
}

#[test]
fn three_failures_kill_and_death_is_terminal() {
    let hub = NotificationHub::new();
    let saves = recorder(&hub, EventKind::DeathSave);

    let mut hero = downed_hero();
    let mut dice = Dice::from_scripted(vec![5, 8, 3]);
    hero.make_death_save(&mut dice, Some(&hub)).unwrap();
    hero.make_death_save(&mut dice, Some(&hub)).unwrap();
    let outcome = hero.make_death_save(&mut dice, Some(&hub)).unwrap();

    assert!(outcome.dead);
    assert!(!outcome.stabilized);
    assert_eq!(outcome.failures, 3);
    assert_eq!(saves.borrow().len(), 3);

    // A fourth attempt is a no-op returning the terminal record; the empty
    // script proves no die is rolled.
    let mut dice = Dice::from_scripted(vec![]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.dead);
    assert_eq!(outcome.roll, 0);
}

#[test]
fn three_successes_stabilize_and_stop_prompts() {
    let mut hero = downed_hero();
    let mut dice = Dice::from_scripted(vec![10, 12, 19]);
    hero.make_death_save(&mut dice, None).unwrap();
    hero.make_death_save(&mut dice, None).unwrap();
    let outcome = hero.make_death_save(&mut dice, None).unwrap();

    assert!(outcome.stabilized);
    assert!(!outcome.dead);
    assert!(hero.is_stabilized());
    assert_eq!(hero.current_hp, 0);

    let mut dice = Dice::from_scripted(vec![]);
    let outcome = hero.make_death_save(&mut dice, None).unwrap();
    assert!(outcome.stabilized);
    assert_eq!(outcome.roll, 0);
}

#[test]
fn external_stabilization_freezes_the_record() {
    let hub = NotificationHub::new();
    let stabilized = recorder(&hub, EventKind::CharacterStabilized);

    let mut hero = downed_hero();
    hero.stabilize(Some(&hub));

    assert!(hero.is_stabilized());
    assert_eq!(hero.current_hp, 0);
    assert_eq!(stabilized.borrow().len(), 1);

    // Stabilizing a conscious combatant does nothing.
    let mut other = Creature::new("Ally", 8, 12).with_death_saves();
    other.stabilize(Some(&hub));
    assert!(!other.is_stabilized());
    assert_eq!(stabilized.borrow().len(), 1);
}

#[test]
fn damage_breaks_stabilization() {
    let mut hero = downed_hero();
    hero.stabilize(None);
    hero.take_damage(3, None);
    assert!(!hero.is_stabilized());
    assert_eq!(hero.death_saves().unwrap().failures, 1);
}

#[test]
fn conscious_combatants_cannot_roll_death_saves() {
    let mut hero = hero();
    let mut dice = Dice::from_scripted(vec![]);
    let result = hero.make_death_save(&mut dice, None);
    assert!(matches!(result, Err(LifeError::Conscious(_))));
}

#[test]
fn monsters_do_not_roll_death_saves() {
    let mut goblin = Creature::new("Goblin", 7, 15);
    goblin.take_damage(7, None);
    let mut dice = Dice::from_scripted(vec![]);
    let result = goblin.make_death_save(&mut dice, None);
    assert!(matches!(result, Err(LifeError::NotCapable(_))));
    assert!(goblin.is_dead());
}

#[test]
fn healing_from_zero_clears_the_record() {
    let mut hero = downed_hero();
    hero.take_damage(4, None);
    assert_eq!(hero.death_saves().unwrap().failures, 1);

    hero.heal(5);

    assert_eq!(hero.current_hp, 5);
    assert!(hero.death_saves().is_none());
    assert!(!hero.is_unconscious());
    assert!(!hero.has_condition("unconscious"));
}

#[test]
fn dead_combatants_cannot_be_healed() {
    let mut hero = downed_hero();
    hero.take_damage(10, None); // massive damage: dead
    hero.heal(5);
    assert_eq!(hero.current_hp, 0);
    assert!(hero.is_dead());
}

#[test]
fn monster_death_at_zero_publishes() {
    let hub = NotificationHub::new();
    let deaths = recorder(&hub, EventKind::CharacterDeath);

    let mut goblin = Creature::new("Goblin", 7, 15);
    goblin.take_damage(9, Some(&hub));

    assert!(goblin.is_dead());
    assert_eq!(deaths.borrow().len(), 1);
}
