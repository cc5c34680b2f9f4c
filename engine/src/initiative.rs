//! Turn-order tracking.
//!
//! Entries reference combatants by name; the tracker never owns creature
//! state. Order is initiative total descending, ties broken by the
//! initiative modifier and then by insertion order (the sort is stable).

use serde::Serialize;

use crate::{AdMode, Dice};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnEntry {
    pub name: String,
    pub initiative_roll: i32,
    pub modifier: i32,
}

impl TurnEntry {
    pub fn total(&self) -> i32 {
        self.initiative_roll + self.modifier
    }
}

#[derive(Debug, Default)]
pub struct TurnTracker {
    entries: Vec<TurnEntry>,
    current: usize,
    pub round: u32,
}

impl TurnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roll initiative for a combatant and slot it into the order.
    pub fn add_combatant(&mut self, dice: &mut Dice, name: &str, modifier: i32) -> TurnEntry {
        let roll = dice.d20(AdMode::Normal).kept;
        let entry = TurnEntry {
            name: name.to_string(),
            initiative_roll: roll,
            modifier,
        };
        self.entries.push(entry.clone());
        self.entries
            .sort_by(|a, b| (b.total(), b.modifier).cmp(&(a.total(), a.modifier)));
        entry
    }

    /// Remove a combatant (permanently dead, or combat over), fixing up the
    /// current-turn pointer when the removed entry sat at or before it.
    pub fn remove_combatant(&mut self, name: &str) -> bool {
        let Some(index) = self.entries.iter().position(|e| e.name == name) else {
            return false;
        };

        if index < self.current {
            self.current -= 1;
        } else if index == self.current && index == self.entries.len() - 1 {
            self.current = 0;
        }

        self.entries.remove(index);

        if !self.entries.is_empty() && self.current >= self.entries.len() {
            self.current = 0;
        }
        true
    }

    pub fn current_combatant(&self) -> Option<&TurnEntry> {
        self.entries.get(self.current)
    }

    /// Advance cyclically; wrapping past the last entry starts a new round.
    pub fn next_turn(&mut self) {
        if self.entries.is_empty() {
            return;
        }
        self.current += 1;
        if self.current >= self.entries.len() {
            self.current = 0;
            self.round += 1;
        }
    }

    pub fn all_combatants(&self) -> &[TurnEntry] {
        &self.entries
    }

    pub fn is_combat_over(&self) -> bool {
        self.entries.len() <= 1
    }
}
