use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use engine::api::{builtin_spell, simulate_encounter, EncounterConfig};
use engine::{
    resolve_attack, resolve_spell_save, roll_notation, Ability, AbilityScores, ActiveEffect,
    AdMode, Creature, Dice, EffectKind, NotificationHub, Timeline,
};

#[derive(Copy, Clone, ValueEnum)]
enum Adv {
    Normal,
    Advantage,
    Disadvantage,
}

impl From<Adv> for AdMode {
    fn from(a: Adv) -> AdMode {
        match a {
            Adv::Normal => AdMode::Normal,
            Adv::Advantage => AdMode::Advantage,
            Adv::Disadvantage => AdMode::Disadvantage,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Evaluate a dice expression a few times
    Roll {
        /// Dice notation, e.g. 2d6+3
        #[arg(long, default_value = "1d20")]
        notation: String,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Advantage mode (single-die rolls only)
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
        /// Number of rolls
        #[arg(long, default_value_t = 5)]
        rolls: u32,
    },
    /// Resolve a demo attack against a fixed defender
    Attack {
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Attack bonus added to the d20
        #[arg(long, default_value_t = 5)]
        bonus: i32,
        /// Defender armor class
        #[arg(long, default_value_t = 15)]
        ac: i32,
        /// Damage dice notation
        #[arg(long, default_value = "1d8+3")]
        dice: String,
        /// Advantage mode
        #[arg(long, value_enum, default_value_t = Adv::Normal)]
        adv: Adv,
    },
    /// Cast a builtin save-based spell at a pair of goblins
    Cast {
        /// Builtin spell id (fireball, burning_hands, sacred_flame)
        #[arg(long, default_value = "fireball")]
        spell: String,
        /// Slot level to cast at (upcasting)
        #[arg(long)]
        upcast: Option<u8>,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Advance the effect clock over a demo set of timed effects
    Clock {
        /// Minutes to advance, may repeat
        #[arg(long = "advance", required = true)]
        advance: Vec<f64>,
    },
    /// Run a scripted encounter and print the event trace
    Encounter {
        /// Builtin encounter id
        #[arg(long, default_value = "goblin_ambush")]
        id: String,
        /// Encounter file (JSON or YAML) overriding --id
        #[arg(long)]
        path: Option<String>,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 2025)]
        seed: u64,
        /// Safety cap on rounds
        #[arg(long)]
        max_rounds: Option<u32>,
        /// Print the full event trace as JSON lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Parser)]
#[command(name = "rules5e")]
#[command(about = "Rules-resolution CLI harness")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

fn wizard() -> Creature {
    Creature::new("Wizard", 30, 12)
        .with_abilities(AbilityScores {
            str_: 10,
            dex: 12,
            con: 14,
            int_: 16,
            wis: 10,
            cha: 8,
        })
        .with_proficiency_bonus(3)
        .with_spellcasting(Ability::Int)
}

fn goblin(name: &str) -> Creature {
    Creature::new(name, 7, 15).with_abilities(AbilityScores {
        str_: 8,
        dex: 14,
        con: 10,
        int_: 10,
        wis: 8,
        cha: 8,
    })
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Roll {
            notation,
            seed,
            adv,
            rolls,
        } => {
            let mut dice = Dice::from_seed(seed);
            for _ in 0..rolls {
                let outcome = roll_notation(&mut dice, &notation, adv.into())
                    .with_context(|| format!("cannot roll '{}'", notation))?;
                println!("{}", outcome);
            }
        }
        Cmd::Attack {
            seed,
            bonus,
            ac,
            dice,
            adv,
        } => {
            let attacker = Creature::new("Attacker", 12, 16);
            let mut defender = Creature::new("Defender", 20, ac);
            let mode: AdMode = adv.into();
            let mut rng = Dice::from_seed(seed);
            let outcome = resolve_attack(
                &mut rng,
                &attacker,
                &mut defender,
                bonus,
                &dice,
                mode == AdMode::Advantage,
                mode == AdMode::Disadvantage,
                true,
                None,
            )?;
            println!("{}", outcome);
            println!(
                "{}: {}/{} HP",
                defender.name, defender.current_hp, defender.max_hp
            );
        }
        Cmd::Cast {
            spell,
            upcast,
            seed,
        } => {
            let spell = builtin_spell(&spell)?;
            let caster = wizard();
            let mut g1 = goblin("Goblin 1");
            let mut g2 = goblin("Goblin 2");
            let mut dice = Dice::from_seed(seed);
            let mut targets = [&mut g1, &mut g2];
            let outcome = resolve_spell_save(
                &mut dice,
                &caster,
                &mut targets,
                &spell,
                upcast,
                true,
                None,
            )?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Cmd::Clock { advance } => {
            let hub = NotificationHub::new();
            hub.subscribe_all(|event| {
                println!("{}", serde_json::to_string(event).expect("event serializes"));
            });

            let mut timeline = Timeline::new();
            timeline.add_effect(
                ActiveEffect::new(EffectKind::Spell, "hold_person", "Goblin 1", 1.0)
                    .concentration_of("Wizard"),
            );
            timeline.add_effect(ActiveEffect::new(
                EffectKind::Spell,
                "mage_armor",
                "Wizard",
                480.0,
            ));
            for minutes in advance {
                timeline.advance_time(minutes, "cli", Some(&hub));
            }
            println!("elapsed: {} minutes", timeline.elapsed_minutes());
        }
        Cmd::Encounter {
            id,
            path,
            seed,
            max_rounds,
            json,
        } => {
            let result = simulate_encounter(EncounterConfig {
                encounter_id: Some(id),
                encounter_path: path,
                seed,
                max_rounds,
            })?;
            if json {
                for event in &result.events {
                    println!("{}", serde_json::to_string(event)?);
                }
            }
            println!(
                "encounter={} winner={} rounds={} xp={}",
                result.encounter, result.winner, result.rounds, result.xp_awarded
            );
        }
    }
    Ok(())
}
