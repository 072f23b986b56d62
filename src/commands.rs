//! Command surface: parsing chat-style commands and rendering replies.
//!
//! Each command maps 1:1 onto a [`GameSession`] operation. Argument
//! validation (arity, integer fields) happens here, before any core
//! operation runs. Every command executes inside one guild's namespace;
//! the hosting dispatcher supplies the guild id.

use crate::character::{Ability, Character, DeathSaveOutcome};
use crate::error::GameError;
use crate::session::GameSession;
use crate::store::GuildId;
use std::fmt::Write as _;
use std::str::FromStr;

/// A parsed command, ready to dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Roll { expression: String },
    CharCreate { name: String, race: String, class: String },
    CharStatus { name: String },
    LevelUp { name: String },
    Skill { name: String, skill: String },
    InventoryAdd { name: String, item: String },
    InventoryAddApi { name: String, item: String },
    InventoryList { name: String },
    InventoryRemove { name: String, item: String },
    Cast { name: String, spell: String, slot: Option<u8> },
    Slots { name: String },
    LongRest { name: String },
    CombatStart,
    CombatAdd { name: String, hp: i32, initiative: i32, ac: Option<i32> },
    CombatStatus,
    CombatNext,
    CombatEffect { name: String, effect: String },
    CombatDamage { name: String, amount: i32 },
    CombatHeal { name: String, amount: i32 },
    CombatSetAc { name: String, ac: i32 },
    CombatEnd,
    Attack { attacker: String, target: String, expression: String },
    Save { name: String, ability: String, dc: i32 },
    DeathSave { name: String },
    Monster { name: String },
}

fn usage(text: &str) -> GameError {
    GameError::InvalidInput(format!("usage: {text}"))
}

fn int_arg<T: FromStr>(value: &str, what: &str) -> Result<T, GameError> {
    value
        .parse()
        .map_err(|_| GameError::InvalidInput(format!("{what} must be a number, got '{value}'")))
}

impl Command {
    /// Parse one command line. A leading `!` is tolerated so chat-prefix
    /// input works unchanged.
    pub fn parse(input: &str) -> Result<Command, GameError> {
        let input = input.trim().trim_start_matches('!');
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let Some((&verb, args)) = tokens.split_first() else {
            return Err(GameError::InvalidInput("empty command".to_string()));
        };

        let rest_from = |index: usize| tokens[index..].join(" ");

        match (verb.to_lowercase().as_str(), args) {
            ("help", _) => Ok(Command::Help),

            ("roll", [_, ..]) => Ok(Command::Roll {
                expression: rest_from(1),
            }),
            ("roll", []) => Err(usage("roll <XdY+Z>")),

            ("char", [sub, rest @ ..]) => match (sub.to_lowercase().as_str(), rest) {
                ("create", [name, race, class]) => Ok(Command::CharCreate {
                    name: name.to_string(),
                    race: race.to_string(),
                    class: class.to_string(),
                }),
                ("status", [name]) => Ok(Command::CharStatus {
                    name: name.to_string(),
                }),
                _ => Err(usage("char create <name> <race> <class> | char status <name>")),
            },
            ("char", []) => Err(usage("char create <name> <race> <class> | char status <name>")),

            ("levelup", [name]) => Ok(Command::LevelUp {
                name: name.to_string(),
            }),
            ("levelup", _) => Err(usage("levelup <name>")),

            ("skill", [name, _, ..]) => Ok(Command::Skill {
                name: name.to_string(),
                skill: rest_from(2),
            }),
            ("skill", _) => Err(usage("skill <name> <skill>")),

            ("inventory", [sub, rest @ ..]) => match (sub.to_lowercase().as_str(), rest) {
                ("add", [name, _, ..]) => Ok(Command::InventoryAdd {
                    name: name.to_string(),
                    item: rest_from(3),
                }),
                ("addapi", [name, _, ..]) => Ok(Command::InventoryAddApi {
                    name: name.to_string(),
                    item: rest_from(3),
                }),
                ("list", [name]) => Ok(Command::InventoryList {
                    name: name.to_string(),
                }),
                ("remove", [name, _, ..]) => Ok(Command::InventoryRemove {
                    name: name.to_string(),
                    item: rest_from(3),
                }),
                _ => Err(usage("inventory add|addapi|remove <name> <item> | inventory list <name>")),
            },
            ("inventory", []) => {
                Err(usage("inventory add|addapi|remove <name> <item> | inventory list <name>"))
            }

            ("cast", [name, spell_tokens @ ..]) if !spell_tokens.is_empty() => {
                // A trailing integer after a multi-word spell name is the
                // slot level to cast at.
                let (slot, spell_tokens) = match spell_tokens.split_last() {
                    Some((last, init)) if !init.is_empty() => match last.parse::<u8>() {
                        Ok(slot) => (Some(slot), init),
                        Err(_) => (None, spell_tokens),
                    },
                    _ => (None, spell_tokens),
                };
                Ok(Command::Cast {
                    name: name.to_string(),
                    spell: spell_tokens.join(" "),
                    slot,
                })
            }
            ("cast", _) => Err(usage("cast <name> <spell> [slot]")),

            ("slots", [name]) => Ok(Command::Slots {
                name: name.to_string(),
            }),
            ("slots", _) => Err(usage("slots <name>")),

            ("longrest", [name]) => Ok(Command::LongRest {
                name: name.to_string(),
            }),
            ("longrest", _) => Err(usage("longrest <name>")),

            ("combat", [sub, rest @ ..]) => match (sub.to_lowercase().as_str(), rest) {
                ("start", []) => Ok(Command::CombatStart),
                ("status", []) => Ok(Command::CombatStatus),
                ("next", []) => Ok(Command::CombatNext),
                ("end", []) => Ok(Command::CombatEnd),
                ("add", [name, hp, init]) => Ok(Command::CombatAdd {
                    name: name.to_string(),
                    hp: int_arg(hp, "hp")?,
                    initiative: int_arg(init, "initiative")?,
                    ac: None,
                }),
                ("add", [name, hp, init, ac]) => Ok(Command::CombatAdd {
                    name: name.to_string(),
                    hp: int_arg(hp, "hp")?,
                    initiative: int_arg(init, "initiative")?,
                    ac: Some(int_arg(ac, "ac")?),
                }),
                ("effect", [name, _, ..]) => Ok(Command::CombatEffect {
                    name: name.to_string(),
                    effect: rest_from(3),
                }),
                ("damage", [name, amount]) => Ok(Command::CombatDamage {
                    name: name.to_string(),
                    amount: int_arg(amount, "amount")?,
                }),
                ("heal", [name, amount]) => Ok(Command::CombatHeal {
                    name: name.to_string(),
                    amount: int_arg(amount, "amount")?,
                }),
                ("setac", [name, ac]) => Ok(Command::CombatSetAc {
                    name: name.to_string(),
                    ac: int_arg(ac, "ac")?,
                }),
                _ => Err(usage(
                    "combat start|status|next|end | combat add <name> <hp> <init> [ac] | \
                     combat damage|heal <name> <amount> | combat setac <name> <ac> | \
                     combat effect <name> <text>",
                )),
            },
            ("combat", []) => Err(usage("combat start|add|status|next|effect|damage|heal|setac|end")),

            ("attack", [attacker, target]) => Ok(Command::Attack {
                attacker: attacker.to_string(),
                target: target.to_string(),
                expression: String::new(),
            }),
            ("attack", [attacker, target, expr]) => Ok(Command::Attack {
                attacker: attacker.to_string(),
                target: target.to_string(),
                expression: expr.to_string(),
            }),
            ("attack", _) => Err(usage("attack <attacker> <target> [modifier or XdY+Z]")),

            ("save", [name, ability, dc]) => Ok(Command::Save {
                name: name.to_string(),
                ability: ability.to_string(),
                dc: int_arg(dc, "dc")?,
            }),
            ("save", _) => Err(usage("save <name> <str|dex|con|int|wis|cha> <dc>")),

            ("deathsave", [name]) => Ok(Command::DeathSave {
                name: name.to_string(),
            }),
            ("deathsave", _) => Err(usage("deathsave <name>")),

            ("monster", [_, ..]) => Ok(Command::Monster {
                name: rest_from(1),
            }),
            ("monster", []) => Err(usage("monster <name>")),

            _ => Err(GameError::InvalidInput(format!(
                "unknown command '{verb}', try 'help'"
            ))),
        }
    }
}

const HELP_TEXT: &str = "\
Commands (one guild per dispatcher context):
  roll <XdY+Z>
  char create <name> <race> <class> | char status <name>
  levelup <name> | skill <name> <skill>
  inventory add|addapi|remove <name> <item> | inventory list <name>
  cast <name> <spell> [slot] | slots <name> | longrest <name>
  combat start | combat add <name> <hp> <init> [ac] | combat status
  combat next | combat effect <name> <text> | combat damage|heal <name> <amount>
  combat setac <name> <ac> | combat end
  attack <attacker> <target> [modifier or XdY+Z] | save <name> <ability> <dc>
  deathsave <name> | monster <name>";

fn format_character(c: &Character) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {} {} (level {})", c.name, c.race, c.class, c.level);
    let _ = writeln!(out, "HP: {}/{} | AC: {}", c.hp, c.max_hp, c.ac);
    let stats = Ability::all()
        .into_iter()
        .map(|a| format!("{} {}", a.abbreviation(), c.abilities.get(a)))
        .collect::<Vec<_>>()
        .join("  ");
    let _ = writeln!(out, "{stats}");
    let _ = writeln!(out, "Skills: {}", join_or_none(&c.skills));
    let _ = writeln!(out, "Spells: {}", join_or_none(&c.spells));
    if !c.slots.is_empty() {
        let slots = c
            .slots
            .iter()
            .map(|(level, count)| format!("L{level}: {count}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Slots: {slots}");
    }
    if !c.inventory.is_empty() {
        let items = c
            .inventory
            .iter()
            .map(|i| i.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let _ = writeln!(out, "Inventory: {items}");
    }
    out.trim_end().to_string()
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "none".to_string()
    } else {
        values.join(", ")
    }
}

/// Execute a parsed command against a guild and render the reply.
pub async fn dispatch(
    session: &GameSession,
    guild: &GuildId,
    command: Command,
) -> Result<String, GameError> {
    match command {
        Command::Help => Ok(HELP_TEXT.to_string()),

        Command::Roll { expression } => {
            let result = session.roll(&expression).await?;
            Ok(format!("{expression}: {result}"))
        }

        Command::CharCreate { name, race, class } => {
            let character = session.create_character(guild, &name, &race, &class).await?;
            Ok(format!("Character created.\n{}", format_character(&character)))
        }

        Command::CharStatus { name } => {
            let character = session.character(guild, &name).await?;
            Ok(format_character(&character))
        }

        Command::LevelUp { name } => {
            let report = session.level_up(guild, &name).await?;
            Ok(format!(
                "{name} reaches level {}: +{} HP (max {})",
                report.new_level, report.hp_gain, report.new_max_hp
            ))
        }

        Command::Skill { name, skill } => {
            let check = session.skill_check(guild, &name, &skill).await?;
            Ok(format!(
                "{} checks {}: d20({}) + {} = {}",
                check.name, check.skill, check.die, check.bonus, check.total
            ))
        }

        Command::InventoryAdd { name, item } => {
            session.inventory_add(guild, &name, &item).await?;
            Ok(format!("Added '{item}' to {name}'s inventory."))
        }

        Command::InventoryAddApi { name, item } => {
            let added = session.inventory_add_from_provider(guild, &name, &item).await?;
            Ok(format!("Added '{}' to {name}'s inventory.", added.name))
        }

        Command::InventoryList { name } => {
            let items = session.inventory(guild, &name).await?;
            if items.is_empty() {
                return Ok(format!("{name}'s inventory is empty."));
            }
            let list = items
                .iter()
                .map(|i| format!("- {}", i.name))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(format!("{name}'s inventory:\n{list}"))
        }

        Command::InventoryRemove { name, item } => {
            let removed = session.inventory_remove(guild, &name, &item).await?;
            Ok(format!("Removed '{}' from {name}'s inventory.", removed.name))
        }

        Command::Cast { name, spell, slot } => {
            let outcome = session.cast(guild, &name, &spell, slot).await?;
            let mut out = format!(
                "{name} casts {} (level {})\nEffect roll (d20): {}",
                outcome.spell, outcome.level, outcome.effect_roll
            );
            if let Some(damage) = &outcome.damage {
                let _ = write!(
                    out,
                    "\nDamage {}: {:?} = {}",
                    damage.expression, damage.rolls, damage.total
                );
            } else if let Some(description) = &outcome.description {
                let _ = write!(out, "\n{description}");
            }
            Ok(out)
        }

        Command::Slots { name } => {
            let slots = session.slots(guild, &name).await?;
            if slots.is_empty() {
                return Ok(format!("{name} has no spell slots."));
            }
            let list = slots
                .iter()
                .map(|(level, count)| format!("Level {level}: {count}"))
                .collect::<Vec<_>>()
                .join("\n");
            Ok(format!("Slots for {name}:\n{list}"))
        }

        Command::LongRest { name } => {
            let character = session.long_rest(guild, &name).await?;
            Ok(format!(
                "{} takes a long rest: HP {}/{} and slots restored.",
                character.name, character.hp, character.max_hp
            ))
        }

        Command::CombatStart => {
            session.start_encounter(guild).await?;
            Ok("Encounter started. Use 'combat add <name> <hp> <init> [ac]'.".to_string())
        }

        Command::CombatAdd { name, hp, initiative, ac } => {
            let added = session.add_combatant(guild, &name, hp, initiative, ac).await?;
            Ok(format!(
                "{} joins the encounter (HP {}, Init {}, AC {}).",
                added.name, added.hp, added.initiative, added.ac
            ))
        }

        Command::CombatStatus => {
            let encounter = session.encounter(guild).await?;
            if encounter.order.is_empty() {
                return Ok("The encounter has no combatants yet.".to_string());
            }
            let mut out = String::from("Encounter status:");
            for (index, c) in encounter.order.iter().enumerate() {
                let marker = if index == encounter.turn { "->" } else { "  " };
                let effects = if c.effects.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", c.effects.join(", "))
                };
                let _ = write!(
                    out,
                    "\n{marker} {} - HP: {} | Init: {} | AC: {}{effects}",
                    c.name, c.hp, c.initiative, c.ac
                );
            }
            Ok(out)
        }

        Command::CombatNext => {
            let current = session.next_turn(guild).await?;
            Ok(format!("It is now {}'s turn (HP {}).", current.name, current.hp))
        }

        Command::CombatEffect { name, effect } => {
            let combatant = session.add_effect(guild, &name, &effect).await?;
            Ok(format!("Effect '{effect}' added to {}.", combatant.name))
        }

        Command::CombatDamage { name, amount } => {
            let report = session.damage_combatant(guild, &name, amount).await?;
            let mut out = format!(
                "{} takes {amount} damage. HP now: {}",
                report.name, report.hp_after
            );
            if report.dropped {
                let _ = write!(out, "\n{} is down!", report.name);
            }
            Ok(out)
        }

        Command::CombatHeal { name, amount } => {
            let healed = session.heal_combatant(guild, &name, amount).await?;
            Ok(format!("{} heals {amount} HP. HP now: {}", healed.name, healed.hp))
        }

        Command::CombatSetAc { name, ac } => {
            let combatant = session.set_combatant_ac(guild, &name, ac).await?;
            Ok(format!("{}'s AC set to {}.", combatant.name, combatant.ac))
        }

        Command::CombatEnd => {
            session.end_encounter(guild).await?;
            Ok("Encounter ended.".to_string())
        }

        Command::Attack { attacker, target, expression } => {
            let report = session.attack(guild, &attacker, &target, &expression).await?;
            Ok(format!(
                "{} attacks {}!\nAttack roll: {} (die {}) vs AC {}\n{}",
                report.attacker,
                report.target,
                report.total,
                report.die,
                report.target_ac,
                if report.hit { "HIT!" } else { "Miss." }
            ))
        }

        Command::Save { name, ability, dc } => {
            let report = session.saving_throw(guild, &name, &ability, dc).await?;
            Ok(format!(
                "{} makes a {} save (DC {}): d20({}) + {} = {} - {}",
                report.name,
                report.ability.abbreviation(),
                report.dc,
                report.die,
                report.modifier,
                report.total,
                if report.success { "Success" } else { "Failed" }
            ))
        }

        Command::DeathSave { name } => {
            let report = session.death_save(guild, &name).await?;
            let text = match report.outcome {
                DeathSaveOutcome::Revived => {
                    format!("Natural 20! {} is back up with 1 HP.", report.name)
                }
                DeathSaveOutcome::Stabilized => {
                    format!("{} is stable (3 successes).", report.name)
                }
                DeathSaveOutcome::Dead => {
                    format!("{} fails the third death save and dies.", report.name)
                }
                DeathSaveOutcome::Dying { successes, failures } => format!(
                    "Death save roll: {} -> Successes: {successes} | Failures: {failures}",
                    report.roll
                ),
            };
            Ok(text)
        }

        Command::Monster { name } => {
            let monster = session.monster(&name).await?;
            let ac = monster
                .armor_class
                .map(|v| v.to_string())
                .unwrap_or_else(|| "?".to_string());
            let mut out = format!(
                "{}\nType: {} | CR: {}\nHP: {} | AC: {ac}",
                monster.name, monster.kind, monster.challenge_rating, monster.hit_points
            );
            if let Some(desc) = monster.ability_descriptions.first() {
                let _ = write!(out, "\n{desc}");
            }
            Ok(out)
        }
    }
}
