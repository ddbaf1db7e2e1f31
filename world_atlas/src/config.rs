//! Tunables for navigation and encounter rules.
//!
//! Both sections deserialize with defaults for every missing field, so an
//! empty document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ConfigError, NavError};
use crate::mechanics::StatSource;

/// Engine-wide navigation tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Multiplier on a location's footprint radius for intersection tests.
    pub intersection_buffer: f64,
    pub default_diameter_meters: f64,
    /// How many candidate routes route analysis enumerates.
    pub analysis_route_count: usize,
    pub proximity_radius_meters: f64,
    /// Used when neither footprints nor proximity give a stopping distance.
    pub fallback_stopping_distance_meters: f64,
    pub travel_speed_kmh: f64,
    pub waypoint_diameter_meters: f64,
    pub encounters: EncounterRules,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            intersection_buffer: 1.0,
            default_diameter_meters: 10.0,
            analysis_route_count: 3,
            proximity_radius_meters: 5000.0,
            fallback_stopping_distance_meters: 500.0,
            travel_speed_kmh: 4.0,
            waypoint_diameter_meters: 10.0,
            encounters: EncounterRules::default(),
        }
    }
}

impl NavigationConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("intersection_buffer", self.intersection_buffer)?;
        positive("default_diameter_meters", self.default_diameter_meters)?;
        non_negative("proximity_radius_meters", self.proximity_radius_meters)?;
        non_negative(
            "fallback_stopping_distance_meters",
            self.fallback_stopping_distance_meters,
        )?;
        positive("travel_speed_kmh", self.travel_speed_kmh)?;
        positive("waypoint_diameter_meters", self.waypoint_diameter_meters)?;
        if self.analysis_route_count == 0 {
            return Err(ConfigError::InvalidValue {
                field: "analysis_route_count",
                reason: "must be at least 1".to_string(),
            });
        }
        self.encounters.validate()
    }
}

/// The `encounter_system` rules block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterRules {
    pub enabled: bool,
    pub base_dc: i32,
    /// DC added per kilometer of segment.
    pub distance_modifier: f64,
    /// DC adjustment per named time of day.
    pub time_dc_modifiers: BTreeMap<String, i32>,
    pub stat_to_use: StatSource,
    pub use_luck: bool,
    /// Legs shorter than this skip encounter checks.
    pub min_distance_meters: f64,
}

impl Default for EncounterRules {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dc: 15,
            distance_modifier: 2.0,
            time_dc_modifiers: BTreeMap::new(),
            stat_to_use: StatSource::default(),
            use_luck: false,
            min_distance_meters: 300.0,
        }
    }
}

impl EncounterRules {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let rules: Self = toml::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Read rules from a JSON section, e.g. `campaign_rules.encounter_system`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, NavError> {
        let rules: Self = serde_json::from_value(value).map_err(ConfigError::from)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn with_time_modifier(mut self, time_of_day: impl Into<String>, modifier: i32) -> Self {
        self.time_dc_modifiers.insert(time_of_day.into(), modifier);
        self
    }

    pub fn time_modifier(&self, time_of_day: &str) -> i32 {
        self.time_dc_modifiers
            .get(time_of_day)
            .copied()
            .unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("min_distance_meters", self.min_distance_meters)?;
        non_negative("distance_modifier", self.distance_modifier)
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a non-negative number, got {}", value),
        })
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            reason: format!("expected a positive number, got {}", value),
        })
    }
}
