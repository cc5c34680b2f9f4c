//! Pub/sub notification hub.
//!
//! Resolvers publish structured events; UI, logging and narrative layers
//! subscribe. The hub is passed explicitly (`Option<&NotificationHub>`) into
//! every call that can publish, never looked up ambiently. Handlers are
//! consumers: publishing from inside a handler is not supported.

use std::cell::RefCell;

use serde::Serialize;

use crate::creature::SavingThrowOutcome;
use crate::timeline::EffectKind;
use crate::{Ability, DamageType};

/// Per-target line of a `SpellCast` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpellTargetResult {
    pub name: String,
    pub save: Option<SavingThrowOutcome>,
    pub damage_rolled: i32,
    pub damage_taken: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    DamageDealt {
        attacker: String,
        target: String,
        item: Option<String>,
        damage_rolled: i32,
        damage_after_resistance: i32,
        damage_actual: i32,
        damage_type: Option<DamageType>,
        resisted: bool,
        hp_before: i32,
        hp_after: i32,
    },
    CharacterDeath {
        name: String,
    },
    SavingThrow {
        character: String,
        ability: Ability,
        dc: i32,
        roll: i32,
        modifier: i32,
        total: i32,
        success: bool,
    },
    DeathSave {
        character: String,
        roll: i32,
        successes: u8,
        failures: u8,
        stabilized: bool,
        dead: bool,
    },
    DamageAtZeroHp {
        character: String,
        damage: i32,
        failures: u8,
    },
    MassiveDamageDeath {
        character: String,
        damage: i32,
    },
    CharacterStabilized {
        character: String,
    },
    SneakAttack {
        attacker: String,
        dice: String,
        damage: i32,
    },
    SpellCast {
        caster: String,
        spell_id: String,
        spell_name: String,
        spell_level: u8,
        upcast_level: Option<u8>,
        save_dc: i32,
        save_ability: Ability,
        targets: Vec<SpellTargetResult>,
    },
    EffectExpired {
        source: String,
        target: String,
        kind: EffectKind,
        reason: Option<String>,
    },
    TimeAdvanced {
        minutes: f64,
        elapsed_minutes: f64,
        reason: String,
    },
    HourPassed {
        hours: u64,
        total_hours: u64,
    },
    CombatStart {
        party: Vec<String>,
        enemies: Vec<String>,
    },
    CombatEnd {
        victors: Vec<String>,
        casualties: Vec<String>,
        xp_awarded: i32,
    },
    CombatFled {
        party: Vec<String>,
        enemies: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    DamageDealt,
    CharacterDeath,
    SavingThrow,
    DeathSave,
    DamageAtZeroHp,
    MassiveDamageDeath,
    CharacterStabilized,
    SneakAttack,
    SpellCast,
    EffectExpired,
    TimeAdvanced,
    HourPassed,
    CombatStart,
    CombatEnd,
    CombatFled,
}

impl GameEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            GameEvent::DamageDealt { .. } => EventKind::DamageDealt,
            GameEvent::CharacterDeath { .. } => EventKind::CharacterDeath,
            GameEvent::SavingThrow { .. } => EventKind::SavingThrow,
            GameEvent::DeathSave { .. } => EventKind::DeathSave,
            GameEvent::DamageAtZeroHp { .. } => EventKind::DamageAtZeroHp,
            GameEvent::MassiveDamageDeath { .. } => EventKind::MassiveDamageDeath,
            GameEvent::CharacterStabilized { .. } => EventKind::CharacterStabilized,
            GameEvent::SneakAttack { .. } => EventKind::SneakAttack,
            GameEvent::SpellCast { .. } => EventKind::SpellCast,
            GameEvent::EffectExpired { .. } => EventKind::EffectExpired,
            GameEvent::TimeAdvanced { .. } => EventKind::TimeAdvanced,
            GameEvent::HourPassed { .. } => EventKind::HourPassed,
            GameEvent::CombatStart { .. } => EventKind::CombatStart,
            GameEvent::CombatEnd { .. } => EventKind::CombatEnd,
            GameEvent::CombatFled { .. } => EventKind::CombatFled,
        }
    }
}

type Handler = Box<dyn FnMut(&GameEvent)>;

/// Single-threaded pub/sub channel. Subscribing takes `&self` so a hub can be
/// shared read-only across the resolvers that publish into it.
#[derive(Default)]
pub struct NotificationHub {
    handlers: RefCell<Vec<(Option<EventKind>, Handler)>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one event kind.
    pub fn subscribe(&self, kind: EventKind, handler: impl FnMut(&GameEvent) + 'static) {
        self.handlers
            .borrow_mut()
            .push((Some(kind), Box::new(handler)));
    }

    /// Subscribe to every event (trace recorders, log sinks).
    pub fn subscribe_all(&self, handler: impl FnMut(&GameEvent) + 'static) {
        self.handlers.borrow_mut().push((None, Box::new(handler)));
    }

    pub fn publish(&self, event: GameEvent) {
        tracing::debug!(kind = ?event.kind(), "event published");
        let kind = event.kind();
        for (filter, handler) in self.handlers.borrow_mut().iter_mut() {
            if filter.is_none() || *filter == Some(kind) {
                handler(&event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}
