//! Dice rolling for every random outcome in the engine.
//!
//! Supports the notation `[N]dS[+M]` / `[N]dS[-M]` with N defaulting to 1
//! and M to 0. Rolling is generic over [`rand::Rng`] so callers can inject
//! a seeded source for reproducible results.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Most dice a single expression may roll.
pub const MAX_DICE: u32 = 200;

/// Largest die size an expression may use.
pub const MAX_SIDES: u32 = 2000;

/// Error type for dice parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("Invalid dice notation: {0}")]
    InvalidNotation(String),
    #[error("Dice count must be between 1 and {MAX_DICE}, got {0}")]
    InvalidDiceCount(u32),
    #[error("Die size must be between 1 and {MAX_SIDES}, got {0}")]
    InvalidDieSize(u32),
}

/// A parsed dice expression (e.g. `2d6+3`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceExpression {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
    pub original: String,
}

impl DiceExpression {
    /// Parse a dice notation string.
    ///
    /// Whitespace is ignored and the notation is case-insensitive.
    /// Violating the count/size bounds or any syntax error yields a
    /// [`DiceError`]; there is never a partial result.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let cleaned: String = notation
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        let d_pos = cleaned
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.to_string()))?;

        let count_str = &cleaned[..d_pos];
        let rest = &cleaned[d_pos + 1..];

        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?
        };

        let (sides_str, modifier) = match rest.find(['+', '-']) {
            Some(pos) => {
                let modifier: i32 = rest[pos..]
                    .parse()
                    .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;
                (&rest[..pos], modifier)
            }
            None => (rest, 0),
        };

        let sides: u32 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;

        if count == 0 || count > MAX_DICE {
            return Err(DiceError::InvalidDiceCount(count));
        }
        if sides == 0 || sides > MAX_SIDES {
            return Err(DiceError::InvalidDieSize(sides));
        }

        Ok(DiceExpression {
            count,
            sides,
            modifier,
            original: cleaned,
        })
    }

    /// Roll the expression with the thread-local RNG.
    pub fn roll(&self) -> RollResult {
        self.roll_with_rng(&mut rand::thread_rng())
    }

    /// Roll with a specific RNG (useful for testing).
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R) -> RollResult {
        let rolls: Vec<u32> = (0..self.count)
            .map(|_| rng.gen_range(1..=self.sides))
            .collect();
        let total = rolls.iter().map(|&r| r as i32).sum::<i32>() + self.modifier;

        RollResult {
            expression: self.clone(),
            rolls,
            modifier: self.modifier,
            total,
        }
    }
}

impl FromStr for DiceExpression {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DiceExpression::parse(s)
    }
}

impl fmt::Display for DiceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.original)
    }
}

/// Complete result of rolling a dice expression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollResult {
    pub expression: DiceExpression,
    pub rolls: Vec<u32>,
    pub modifier: i32,
    pub total: i32,
}

impl RollResult {
    /// Format the individual dice for display, e.g. `[3, 5] + 2`.
    pub fn dice_display(&self) -> String {
        let rolls = self
            .rolls
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        if self.modifier > 0 {
            format!("[{rolls}] + {}", self.modifier)
        } else if self.modifier < 0 {
            format!("[{rolls}] - {}", self.modifier.abs())
        } else {
            format!("[{rolls}]")
        }
    }
}

impl fmt::Display for RollResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.dice_display(), self.total)
    }
}

/// Convenience function to roll dice from a notation string.
pub fn roll(notation: &str) -> Result<RollResult, DiceError> {
    let expr = DiceExpression::parse(notation)?;
    Ok(expr.roll())
}

/// A d20 roll with the first die and final total, used for attack and
/// save style rolls.
#[derive(Debug, Clone, Copy)]
pub struct D20Roll {
    /// The first (usually only) die that came up.
    pub die: u32,
    /// Die plus any modifier from the input.
    pub total: i32,
}

/// Roll a d20 with a flexible modifier input.
///
/// Accepts three forms:
/// - empty input: a plain d20,
/// - a bare signed integer (`+5`, `-2`, `5`): flat modifier on a fresh d20,
/// - a full dice expression (`d20+5`, `2d6`): delegates to the parser and
///   reports its first die and total.
pub fn roll_d20_with_modifier<R: Rng>(input: &str, rng: &mut R) -> Result<D20Roll, DiceError> {
    let input = input.trim();
    if input.is_empty() {
        let die = rng.gen_range(1..=20u32);
        return Ok(D20Roll {
            die,
            total: die as i32,
        });
    }

    if let Ok(modifier) = input.parse::<i32>() {
        let die = rng.gen_range(1..=20u32);
        return Ok(D20Roll {
            die,
            total: die as i32 + modifier,
        });
    }

    let result = DiceExpression::parse(input)?.roll_with_rng(rng);
    Ok(D20Roll {
        die: result.rolls[0],
        total: result.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_parse_simple() {
        let expr = DiceExpression::parse("1d20").unwrap();
        assert_eq!(expr.count, 1);
        assert_eq!(expr.sides, 20);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_defaults() {
        let expr = DiceExpression::parse("d6").unwrap();
        assert_eq!(expr.count, 1);
        assert_eq!(expr.sides, 6);
        assert_eq!(expr.modifier, 0);
    }

    #[test]
    fn test_parse_with_modifier() {
        let expr = DiceExpression::parse("2d6+3").unwrap();
        assert_eq!(expr.count, 2);
        assert_eq!(expr.modifier, 3);

        let expr = DiceExpression::parse("2d6-2").unwrap();
        assert_eq!(expr.modifier, -2);
    }

    #[test]
    fn test_parse_ignores_whitespace_and_case() {
        let expr = DiceExpression::parse(" 2D6 + 1 ").unwrap();
        assert_eq!(expr.count, 2);
        assert_eq!(expr.sides, 6);
        assert_eq!(expr.modifier, 1);
    }

    #[test]
    fn test_parse_malformed() {
        assert!(DiceExpression::parse("2x6").is_err());
        assert!(DiceExpression::parse("").is_err());
        assert!(DiceExpression::parse("d").is_err());
        assert!(DiceExpression::parse("2d6+").is_err());
        assert!(DiceExpression::parse("2d6+1+1").is_err());
    }

    #[test]
    fn test_parse_out_of_range() {
        assert!(matches!(
            DiceExpression::parse("0d6"),
            Err(DiceError::InvalidDiceCount(0))
        ));
        assert!(matches!(
            DiceExpression::parse("201d6"),
            Err(DiceError::InvalidDiceCount(201))
        ));
        assert!(matches!(
            DiceExpression::parse("1d0"),
            Err(DiceError::InvalidDieSize(0))
        ));
        assert!(matches!(
            DiceExpression::parse("1d2001"),
            Err(DiceError::InvalidDieSize(2001))
        ));
    }

    #[test]
    fn test_roll_shape_and_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let expr = DiceExpression::parse("4d6+2").unwrap();
        for _ in 0..100 {
            let result = expr.roll_with_rng(&mut rng);
            assert_eq!(result.rolls.len(), 4);
            assert!(result.rolls.iter().all(|&r| (1..=6).contains(&r)));
            let sum: i32 = result.rolls.iter().map(|&r| r as i32).sum();
            assert_eq!(result.total, sum + 2);
        }
    }

    #[test]
    fn test_roll_negative_total_possible() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = DiceExpression::parse("1d1-5")
            .unwrap()
            .roll_with_rng(&mut rng);
        assert_eq!(result.total, -4);
    }

    #[test]
    fn test_d20_with_modifier_empty() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let roll = roll_d20_with_modifier("", &mut rng).unwrap();
            assert!((1..=20).contains(&roll.die));
            assert_eq!(roll.total, roll.die as i32);
        }
    }

    #[test]
    fn test_d20_with_modifier_flat() {
        let mut rng = StdRng::seed_from_u64(3);
        for input in ["+5", "5", "-3"] {
            let modifier: i32 = input.parse().unwrap();
            let roll = roll_d20_with_modifier(input, &mut rng).unwrap();
            assert!((1..=20).contains(&roll.die));
            assert_eq!(roll.total, roll.die as i32 + modifier);
        }
    }

    #[test]
    fn test_d20_with_modifier_expression() {
        let mut rng = StdRng::seed_from_u64(3);
        let roll = roll_d20_with_modifier("1d1+4", &mut rng).unwrap();
        assert_eq!(roll.die, 1);
        assert_eq!(roll.total, 5);

        assert!(roll_d20_with_modifier("nonsense", &mut rng).is_err());
    }

    #[test]
    fn test_display() {
        let mut rng = StdRng::seed_from_u64(9);
        let result = DiceExpression::parse("2d1+3").unwrap().roll_with_rng(&mut rng);
        assert_eq!(result.to_string(), "[1, 1] + 3 = 5");
    }
}
