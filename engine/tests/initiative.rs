use engine::{Dice, TurnTracker};

#[test]
fn order_is_initiative_total_descending() {
    let mut dice = Dice::from_scripted(vec![5, 15, 10]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "Korrin", 0);
    tracker.add_combatant(&mut dice, "Goblin", 0);
    tracker.add_combatant(&mut dice, "Orc", 0);

    let names: Vec<&str> = tracker
        .all_combatants()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, ["Goblin", "Orc", "Korrin"]);
}

#[test]
fn ties_break_by_modifier_then_insertion_order() {
    let mut dice = Dice::from_scripted(vec![12, 10, 12]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "Korrin", 0); // total 12
    tracker.add_combatant(&mut dice, "Goblin", 2); // total 12, higher modifier
    tracker.add_combatant(&mut dice, "Orc", 0); // total 12, same as Korrin

    let names: Vec<&str> = tracker
        .all_combatants()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(names, ["Goblin", "Korrin", "Orc"]);
}

#[test]
fn next_turn_cycles_and_counts_rounds() {
    let mut dice = Dice::from_scripted(vec![15, 10]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "Korrin", 0);
    tracker.add_combatant(&mut dice, "Goblin", 0);

    assert_eq!(tracker.round, 0);
    assert_eq!(tracker.current_combatant().unwrap().name, "Korrin");
    tracker.next_turn();
    assert_eq!(tracker.current_combatant().unwrap().name, "Goblin");
    tracker.next_turn();
    assert_eq!(tracker.current_combatant().unwrap().name, "Korrin");
    assert_eq!(tracker.round, 1);
}

#[test]
fn removing_before_the_current_turn_keeps_the_pointer() {
    let mut dice = Dice::from_scripted(vec![15, 10, 5]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "A", 0);
    tracker.add_combatant(&mut dice, "B", 0);
    tracker.add_combatant(&mut dice, "C", 0);

    tracker.next_turn(); // B's turn
    assert!(tracker.remove_combatant("A"));
    assert_eq!(tracker.current_combatant().unwrap().name, "B");
}

#[test]
fn removing_the_current_last_entry_wraps_to_the_top() {
    let mut dice = Dice::from_scripted(vec![15, 10, 5]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "A", 0);
    tracker.add_combatant(&mut dice, "B", 0);
    tracker.add_combatant(&mut dice, "C", 0);

    tracker.next_turn();
    tracker.next_turn(); // C's turn
    assert!(tracker.remove_combatant("C"));
    assert_eq!(tracker.current_combatant().unwrap().name, "A");
}

#[test]
fn removing_unknown_names_is_a_noop() {
    let mut dice = Dice::from_scripted(vec![15]);
    let mut tracker = TurnTracker::new();
    tracker.add_combatant(&mut dice, "A", 0);
    assert!(!tracker.remove_combatant("Nobody"));
    assert_eq!(tracker.all_combatants().len(), 1);
}

#[test]
fn empty_tracker_has_no_current_combatant() {
    let tracker = TurnTracker::new();
    assert!(tracker.current_combatant().is_none());
    assert!(tracker.is_combat_over());
}

#[test]
fn entry_totals_add_roll_and_modifier() {
    let mut dice = Dice::from_scripted(vec![13]);
    let mut tracker = TurnTracker::new();
    let entry = tracker.add_combatant(&mut dice, "Korrin", 2);
    assert_eq!(entry.initiative_roll, 13);
    assert_eq!(entry.total(), 15);
}
