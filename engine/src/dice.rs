//! Dice-notation parsing and evaluation.
//!
//! Notation is `[count]d<sides>[(+|-)modifier]`, case-insensitive, with an
//! omitted count meaning 1 (`d20` == `1d20`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{AdMode, Dice};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DiceError {
    #[error("invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("advantage/disadvantage only applies to a single die roll (got {0})")]
    AdvantageRequiresSingleDie(String),
}

/// A parsed dice expression, e.g. `2d6+3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceNotation {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl DiceNotation {
    pub fn new(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            modifier: 0,
        }
    }

    /// Strict parse of `[count]d<sides>[(+|-)modifier]`. Zero-sided dice are
    /// rejected; a zero count is legal (`0d6+2` rolls nothing).
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let invalid = || DiceError::InvalidNotation(notation.to_string());

        let s = notation.trim();
        if s.is_empty() {
            return Err(invalid());
        }
        let d_pos = s.find(['d', 'D']).ok_or_else(invalid)?;
        let count_str = &s[..d_pos];
        let rest = &s[d_pos + 1..];

        if !count_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| invalid())?
        };

        let sign_pos = rest.find(['+', '-']);
        let (sides_str, modifier_str) = match sign_pos {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, ""),
        };

        if sides_str.is_empty() || !sides_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let sides: u32 = sides_str.parse().map_err(|_| invalid())?;
        if sides == 0 {
            return Err(invalid());
        }

        let modifier: i32 = if modifier_str.is_empty() {
            0
        } else {
            let digits = &modifier_str[1..];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: i32 = digits.parse().map_err(|_| invalid())?;
            if modifier_str.starts_with('-') {
                -value
            } else {
                value
            }
        };

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }

    /// Critical-hit doubling: twice the dice, modifier untouched.
    pub fn doubled(&self) -> Self {
        Self {
            count: self.count * 2,
            ..*self
        }
    }

    /// Roll the expression. Advantage/disadvantage roll the single die twice
    /// and keep max/min before adding the modifier; they are an error on
    /// multi-die expressions.
    pub fn roll(&self, dice: &mut Dice, mode: AdMode) -> Result<RollOutcome, DiceError> {
        let rolls = match mode {
            AdMode::Normal => (0..self.count).map(|_| dice.roll_die(self.sides)).collect(),
            AdMode::Advantage | AdMode::Disadvantage => {
                if self.count != 1 {
                    return Err(DiceError::AdvantageRequiresSingleDie(self.to_string()));
                }
                vec![dice.roll_die(self.sides), dice.roll_die(self.sides)]
            }
        };

        let base: i32 = match mode {
            AdMode::Normal => rolls.iter().sum(),
            AdMode::Advantage => rolls.iter().copied().max().unwrap_or(0),
            AdMode::Disadvantage => rolls.iter().copied().min().unwrap_or(0),
        };

        Ok(RollOutcome {
            notation: self.to_string(),
            rolls,
            modifier: self.modifier,
            total: base + self.modifier,
            mode,
        })
    }
}

impl FromStr for DiceNotation {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceNotation::parse(s)
    }
}

impl fmt::Display for DiceNotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{m}"),
            m => write!(f, "{m}"),
        }
    }
}

/// Result of evaluating one dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollOutcome {
    pub notation: String,
    pub rolls: Vec<i32>,
    pub modifier: i32,
    pub total: i32,
    pub mode: AdMode,
}

impl fmt::Display for RollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.mode {
            AdMode::Normal => "",
            AdMode::Advantage => " (advantage)",
            AdMode::Disadvantage => " (disadvantage)",
        };
        write!(
            f,
            "{}{}: {:?} {:+} = {}",
            self.notation, tag, self.rolls, self.modifier, self.total
        )
    }
}

/// Parse and roll in one step; malformed notation is a hard error here.
pub fn roll_notation(dice: &mut Dice, notation: &str, mode: AdMode) -> Result<RollOutcome, DiceError> {
    DiceNotation::parse(notation)?.roll(dice, mode)
}

/// Double the dice in a damage expression for a critical hit (`1d8+3` →
/// `2d8+3`). Unparsable notation is returned unchanged rather than raising;
/// it will still fail loudly if someone later tries to roll it.
pub fn double_damage_dice(notation: &str) -> String {
    match DiceNotation::parse(notation) {
        Ok(parsed) => parsed.doubled().to_string(),
        Err(_) => notation.to_string(),
    }
}
