//! Journey / Encounter Engine.
//!
//! A leg is split into 1-3 segments. Each segment advances the simulated
//! clock and rolls one avoidance check: d20 plus the character's modifier
//! against a DC that grows with segment length. A failed check (total below
//! the DC) means an encounter, whose flavor is rolled on a four-band table.

mod waypoint;

pub use waypoint::*;

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use world_atlas::{ability_modifier, CharacterSheet, DiceRoller, EncounterRules, NavError};

/// Highest DC an avoidance check can have.
pub const MAX_DC: i32 = 30;

/// Ability consulted for the optional luck bonus on the nature roll.
const LUCK_ABILITY: &str = "luck";

/// Unique identifier for a simulated journey.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JourneyId(pub Uuid);

impl JourneyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JourneyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JourneyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Four-band flavor of a triggered encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncounterCategory {
    Dangerous,
    Neutral,
    Beneficial,
    Special,
}

impl EncounterCategory {
    pub fn from_roll(roll: i32) -> Self {
        match roll {
            r if r <= 5 => EncounterCategory::Dangerous,
            r if r <= 10 => EncounterCategory::Neutral,
            r if r <= 15 => EncounterCategory::Beneficial,
            _ => EncounterCategory::Special,
        }
    }
}

impl std::fmt::Display for EncounterCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EncounterCategory::Dangerous => "Dangerous",
            EncounterCategory::Neutral => "Neutral",
            EncounterCategory::Beneficial => "Beneficial",
            EncounterCategory::Special => "Special",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterNature {
    /// Roll after the luck modifier.
    pub roll: i32,
    pub category: EncounterCategory,
}

/// One avoidance check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterCheck {
    pub segment: u32,
    pub total_segments: u32,
    pub segment_km: f64,
    pub roll: i32,
    pub modifier: i32,
    pub dc: i32,
    pub total: i32,
    pub triggered: bool,
    pub time_of_day: String,
}

/// Progress after one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub segment: u32,
    pub distance_traveled_m: i64,
    pub distance_remaining_m: i64,
    pub time_elapsed_min: i64,
    /// Simulated clock as `HH:MM`.
    pub current_time: String,
    pub check: EncounterCheck,
    pub encounter: Option<EncounterNature>,
    /// False on the final segment, where the party has arrived.
    pub can_turn_back: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JourneyReport {
    pub id: JourneyId,
    pub from_location: String,
    pub to_location: String,
    pub terrain: String,
    pub total_distance_m: f64,
    pub total_time_min: f64,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub segments: Vec<SegmentReport>,
    pub total_encounters: u32,
}

impl JourneyReport {
    fn start(from: &str, to: &str, distance_m: f64, terrain: &str) -> Self {
        Self {
            id: JourneyId::new(),
            from_location: from.to_string(),
            to_location: to.to_string(),
            terrain: terrain.to_string(),
            total_distance_m: distance_m,
            total_time_min: 0.0,
            skipped: false,
            reason: None,
            segments: Vec::new(),
            total_encounters: 0,
        }
    }

    /// A leg travelled without encounter checks.
    pub fn skipped(
        from: &str,
        to: &str,
        distance_m: f64,
        terrain: &str,
        speed_kmh: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            skipped: true,
            reason: Some(reason.into()),
            total_time_min: distance_m / 1000.0 / speed_kmh * 60.0,
            ..Self::start(from, to, distance_m, terrain)
        }
    }

    /// First segment whose check triggered an encounter.
    pub fn first_encounter(&self) -> Option<&SegmentReport> {
        self.segments.iter().find(|s| s.encounter.is_some())
    }
}

/// Speeds that cannot produce a finite travel time are refused.
pub fn require_speed(speed_kmh: f64) -> Result<f64, NavError> {
    if speed_kmh.is_finite() && speed_kmh > 0.0 {
        Ok(speed_kmh)
    } else {
        Err(NavError::InvalidSpeed(speed_kmh))
    }
}

/// Clock offset for `minutes` of travel, folded into one day.
fn clock_offset(minutes: f64) -> Duration {
    let seconds = ((minutes * 60.0) as i64).rem_euclid(86_400);
    Duration::try_seconds(seconds).unwrap_or_else(Duration::zero)
}

/// Number of checks for a leg: 1 below 3 km, 2 below 6 km, else 3.
pub fn segments_for(distance_m: f64) -> u32 {
    let km = distance_m / 1000.0;
    if km < 3.0 {
        1
    } else if km < 6.0 {
        2
    } else {
        3
    }
}

fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Rolls encounters over journeys using injected dice.
pub struct JourneyEngine<D: DiceRoller> {
    rules: EncounterRules,
    dice: D,
    clock: NaiveTime,
    time_of_day: String,
    character: Option<CharacterSheet>,
}

impl<D: DiceRoller> JourneyEngine<D> {
    /// Engine starting at 08:00 during the "Day", with no character sheet.
    pub fn new(rules: EncounterRules, dice: D) -> Self {
        Self {
            rules,
            dice,
            clock: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            time_of_day: "Day".to_string(),
            character: None,
        }
    }

    pub fn with_clock(mut self, clock: NaiveTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_time_of_day(mut self, time_of_day: impl Into<String>) -> Self {
        self.time_of_day = time_of_day.into();
        self
    }

    pub fn with_character(mut self, character: CharacterSheet) -> Self {
        self.character = Some(character);
        self
    }

    pub fn rules(&self) -> &EncounterRules {
        &self.rules
    }

    /// DC to avoid an encounter on a segment, capped at [`MAX_DC`].
    pub fn dc_for(&self, segment_km: f64, time_of_day: &str) -> i32 {
        let distance = (segment_km * self.rules.distance_modifier) as i32;
        let dc = self.rules.base_dc + distance + self.rules.time_modifier(time_of_day);
        dc.min(MAX_DC)
    }

    /// Modifier from the configured stat source; 0 without a character.
    pub fn character_modifier(&self) -> i32 {
        match &self.character {
            Some(sheet) => sheet.modifier(&self.rules.stat_to_use),
            None => {
                warn!("no character sheet, encounter modifier is 0");
                0
            }
        }
    }

    pub fn roll_check(
        &mut self,
        segment_km: f64,
        segment: u32,
        total_segments: u32,
        time_of_day: &str,
    ) -> EncounterCheck {
        let dc = self.dc_for(segment_km, time_of_day);
        let modifier = self.character_modifier();
        let roll = self.dice.roll_d20();
        let total = roll + modifier;

        EncounterCheck {
            segment,
            total_segments,
            segment_km,
            roll,
            modifier,
            dc,
            total,
            triggered: total < dc,
            time_of_day: time_of_day.to_string(),
        }
    }

    pub fn roll_encounter_nature(&mut self) -> EncounterNature {
        let mut roll = self.dice.roll_d20();
        if self.rules.use_luck {
            let luck = self
                .character
                .as_ref()
                .and_then(|c| c.abilities.get(LUCK_ABILITY).copied())
                .unwrap_or(10);
            roll += ability_modifier(luck);
        }

        EncounterNature {
            roll,
            category: EncounterCategory::from_roll(roll),
        }
    }

    /// Simulate a leg. Legs shorter than the configured minimum are
    /// reported as skipped with no checks. A speed that is not positive is
    /// an error.
    pub fn check_journey(
        &mut self,
        from: &str,
        to: &str,
        distance_m: f64,
        terrain: &str,
        speed_kmh: f64,
    ) -> Result<JourneyReport, NavError> {
        let speed_kmh = require_speed(speed_kmh)?;
        let min_distance = self.rules.min_distance_meters;
        if distance_m < min_distance {
            debug!(from, to, distance_m, "journey too short for encounter checks");
            return Ok(JourneyReport::skipped(
                from,
                to,
                distance_m,
                terrain,
                speed_kmh,
                format!("Too short (< {}m)", min_distance),
            ));
        }

        let mut report = JourneyReport::start(from, to, distance_m, terrain);
        let id = report.id;
        let total_segments = segments_for(distance_m);
        let segment_m = distance_m / f64::from(total_segments);
        let segment_km = segment_m / 1000.0;
        let segment_min = segment_km / speed_kmh * 60.0;
        let time_of_day = self.time_of_day.clone();

        let mut cumulative_m = 0.0;
        let mut cumulative_min = 0.0;

        for segment in 1..=total_segments {
            let check = self.roll_check(segment_km, segment, total_segments, &time_of_day);

            cumulative_m += segment_m;
            cumulative_min += segment_min;
            let clock = self.clock + clock_offset(cumulative_min);

            let encounter = check.triggered.then(|| self.roll_encounter_nature());
            if encounter.is_some() {
                report.total_encounters += 1;
            }
            debug!(%id, segment, roll = check.roll, dc = check.dc, triggered = check.triggered, "segment check");

            report.segments.push(SegmentReport {
                segment,
                distance_traveled_m: cumulative_m as i64,
                distance_remaining_m: (distance_m - cumulative_m) as i64,
                time_elapsed_min: cumulative_min as i64,
                current_time: format_clock(clock),
                check,
                encounter,
                can_turn_back: segment < total_segments,
            });
        }

        report.total_time_min = cumulative_min.trunc();
        info!(
            %id,
            from,
            to,
            segments = total_segments,
            encounters = report.total_encounters,
            "journey checked"
        );
        Ok(report)
    }
}
