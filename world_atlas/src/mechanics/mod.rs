//! Game mechanics consumed by the journey engine: d20 rolls and character
//! stat modifiers.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use tracing::warn;

/// Source of d20 rolls. Injected so encounters can be replayed.
pub trait DiceRoller {
    /// A value in `1..=20`.
    fn roll_d20(&mut self) -> i32;
}

/// Pseudo-random dice backed by a seedable generator.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl DiceRoller for SeededDice {
    fn roll_d20(&mut self) -> i32 {
        self.rng.gen_range(1..=20)
    }
}

/// Scripted dice. Rolls are returned in order; once the script runs out the
/// last value repeats.
#[derive(Debug, Clone)]
pub struct FixedDice {
    script: VecDeque<i32>,
    last: i32,
}

impl FixedDice {
    pub fn new(rolls: impl IntoIterator<Item = i32>) -> Self {
        Self {
            script: rolls.into_iter().collect(),
            last: 10,
        }
    }

    pub fn always(value: i32) -> Self {
        Self::new([value])
    }
}

impl DiceRoller for FixedDice {
    fn roll_d20(&mut self) -> i32 {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last
    }
}

/// Which character value drives the avoidance check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StatSource {
    /// `custom:<name>`, a 0-100 value.
    Custom(String),
    /// `skill:<name>`, used raw.
    Skill(String),
    /// A standard ability score.
    Ability(String),
}

impl StatSource {
    pub fn parse(selector: &str) -> Self {
        let selector = selector.trim();
        if let Some(name) = selector.strip_prefix("custom:") {
            StatSource::Custom(name.to_string())
        } else if let Some(name) = selector.strip_prefix("skill:") {
            StatSource::Skill(name.to_string())
        } else {
            StatSource::Ability(selector.to_string())
        }
    }
}

impl Default for StatSource {
    fn default() -> Self {
        StatSource::Ability("stealth".to_string())
    }
}

impl From<String> for StatSource {
    fn from(value: String) -> Self {
        StatSource::parse(&value)
    }
}

impl From<StatSource> for String {
    fn from(value: StatSource) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for StatSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatSource::Custom(name) => write!(f, "custom:{}", name),
            StatSource::Skill(name) => write!(f, "skill:{}", name),
            StatSource::Ability(name) => write!(f, "{}", name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct CustomStat {
    pub current: i32,
}

/// The parts of the `character` record the navigation engine reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CharacterSheet {
    #[serde(default)]
    pub abilities: BTreeMap<String, i32>,
    #[serde(default)]
    pub skills: BTreeMap<String, i32>,
    #[serde(default)]
    pub custom_stats: BTreeMap<String, CustomStat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_kmh: Option<f64>,
}

impl CharacterSheet {
    pub fn with_ability(mut self, name: impl Into<String>, score: i32) -> Self {
        self.abilities.insert(name.into(), score);
        self
    }

    pub fn with_skill(mut self, name: impl Into<String>, value: i32) -> Self {
        self.skills.insert(name.into(), value);
        self
    }

    pub fn with_custom_stat(mut self, name: impl Into<String>, current: i32) -> Self {
        self.custom_stats.insert(name.into(), CustomStat { current });
        self
    }

    /// Check modifier for `source`. Missing values give 0.
    pub fn modifier(&self, source: &StatSource) -> i32 {
        let value = match source {
            StatSource::Custom(name) => self
                .custom_stats
                .get(name)
                .map(|s| (s.current - 50).div_euclid(10)),
            StatSource::Skill(name) => self.skills.get(name).copied(),
            StatSource::Ability(name) => self.abilities.get(name).map(|&v| ability_modifier(v)),
        };

        value.unwrap_or_else(|| {
            warn!(stat = %source, "stat missing from character sheet, using modifier 0");
            0
        })
    }
}

/// Standard ability modifier, rounding towards negative infinity.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}
