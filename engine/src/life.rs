//! Death-save state machine.
//!
//! A death-save-capable combatant at 0 HP is Unconscious and rolls a bare
//! d20 at the top of its turns: 10+ is a success, three successes stabilize,
//! three failures kill. A natural 20 restores 1 HP outright; a natural 1
//! counts twice. Damage while down is handled by `Creature::take_damage`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::events::{GameEvent, NotificationHub};
use crate::{AdMode, Creature, Dice};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LifeError {
    #[error("{0} is conscious and cannot make death saves")]
    Conscious(String),
    #[error("{0} does not make death saves")]
    NotCapable(String),
}

/// Per-combatant death-save tally. Counts stay in 0..=3; `dead` is terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathSaveRecord {
    pub successes: u8,
    pub failures: u8,
    pub stabilized: bool,
    pub dead: bool,
}

/// What one `make_death_save` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeathSaveOutcome {
    pub roll: i32,
    pub success: bool,
    pub natural_20: bool,
    pub natural_1: bool,
    pub successes: u8,
    pub failures: u8,
    pub stabilized: bool,
    pub dead: bool,
    /// True only for the natural-20 wake-up.
    pub conscious: bool,
}

impl DeathSaveOutcome {
    fn terminal(record: &DeathSaveRecord) -> Self {
        Self {
            roll: 0,
            success: false,
            natural_20: false,
            natural_1: false,
            successes: record.successes,
            failures: record.failures,
            stabilized: record.stabilized,
            dead: record.dead,
            conscious: false,
        }
    }
}

impl Creature {
    /// Roll one death save. Dead combatants get the terminal record back
    /// without a roll; stabilized ones skip the roll entirely.
    pub fn make_death_save(
        &mut self,
        dice: &mut Dice,
        hub: Option<&NotificationHub>,
    ) -> Result<DeathSaveOutcome, LifeError> {
        if !self.uses_death_saves {
            return Err(LifeError::NotCapable(self.name.clone()));
        }
        if self.current_hp > 0 {
            return Err(LifeError::Conscious(self.name.clone()));
        }

        let name = self.name.clone();
        let record = self.death.get_or_insert_with(DeathSaveRecord::default);
        if record.dead || record.stabilized {
            return Ok(DeathSaveOutcome::terminal(record));
        }

        let roll = dice.d20(AdMode::Normal).kept;
        let natural_20 = roll == 20;
        let natural_1 = roll == 1;
        let success = roll >= 10;

        let mut conscious = false;
        if natural_20 {
            *record = DeathSaveRecord::default();
            conscious = true;
        } else if natural_1 {
            record.failures = (record.failures + 2).min(3);
        } else if success {
            record.successes = (record.successes + 1).min(3);
        } else {
            record.failures = (record.failures + 1).min(3);
        }

        if record.failures >= 3 {
            record.dead = true;
        } else if record.successes >= 3 {
            record.stabilized = true;
        }

        let outcome = DeathSaveOutcome {
            roll,
            success,
            natural_20,
            natural_1,
            successes: record.successes,
            failures: record.failures,
            stabilized: record.stabilized,
            dead: record.dead,
            conscious,
        };

        if conscious {
            self.current_hp = 1;
            self.remove_condition("unconscious");
            self.death = None;
        }

        if let Some(hub) = hub {
            hub.publish(GameEvent::DeathSave {
                character: name.clone(),
                roll,
                successes: outcome.successes,
                failures: outcome.failures,
                stabilized: outcome.stabilized,
                dead: outcome.dead,
            });
            if outcome.dead {
                hub.publish(GameEvent::CharacterDeath { name });
            } else if outcome.stabilized {
                hub.publish(GameEvent::CharacterStabilized { character: name });
            }
        }

        Ok(outcome)
    }

    /// External stabilization (a successful Medicine check): freezes the
    /// record at 0 HP without restoring consciousness.
    pub fn stabilize(&mut self, hub: Option<&NotificationHub>) {
        if self.current_hp != 0 || self.is_dead() {
            return;
        }
        let record = self.death.get_or_insert_with(DeathSaveRecord::default);
        record.stabilized = true;
        if let Some(hub) = hub {
            hub.publish(GameEvent::CharacterStabilized {
                character: self.name.clone(),
            });
        }
    }
}
