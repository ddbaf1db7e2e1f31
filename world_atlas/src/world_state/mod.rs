//! Campaign state - the typed view over the `locations` and
//! `campaign-overview` store keys.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::config::EncounterRules;
use crate::error::{NavError, StoreError};
use crate::graph::{canonical_pair, LocationGraph};
use crate::locations::MapContext;
use crate::mechanics::CharacterSheet;
use crate::store::{CampaignStore, CHARACTER_KEY, LOCATIONS_KEY, OVERVIEW_KEY};

/// Where the player is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerPosition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_location: Option<String>,
    /// Root-to-leaf ancestry through nested compounds.
    #[serde(default)]
    pub location_stack: Vec<String>,
    #[serde(default)]
    pub map_context: MapContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl PlayerPosition {
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            current_location: Some(location.into()),
            ..Default::default()
        }
    }

    pub fn current(&self) -> Result<&str, NavError> {
        self.current_location
            .as_deref()
            .ok_or(NavError::NoCurrentLocation)
    }
}

/// An operator's standing decision for travel between two locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum RouteDecision {
    /// Go straight there.
    Direct,
    /// Follow a fixed chain of locations.
    UseRoute { route: Vec<String> },
    /// Travel is impossible.
    Blocked {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// A cached [`RouteDecision`] with its creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePreference {
    #[serde(flatten)]
    pub decision: RouteDecision,
    pub decided_at: DateTime<Utc>,
}

/// Key of a route preference: the canonical pair joined by `" <-> "`.
pub fn preference_key(a: &str, b: &str) -> String {
    let (first, second) = canonical_pair(a, b);
    format!("{} <-> {}", first, second)
}

/// The `campaign-overview` mapping. Sections this crate does not own are
/// carried in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CampaignOverview {
    #[serde(default)]
    pub player_position: PlayerPosition,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub path_preferences: BTreeMap<String, RoutePreference>,
    /// Clock as `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precise_time: Option<String>,
    /// Named period used to pick a DC modifier (e.g. "Day", "Night").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl CampaignOverview {
    /// Parsed clock, defaulting to 08:00 when absent or malformed.
    pub fn clock(&self) -> NaiveTime {
        self.precise_time
            .as_deref()
            .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M").ok())
            .unwrap_or_else(default_clock)
    }

    pub fn time_of_day_or_default(&self) -> &str {
        self.time_of_day.as_deref().unwrap_or("Day")
    }

    /// Encounter rules from `campaign_rules.encounter_system`, if the
    /// campaign defines them.
    pub fn encounter_rules(&self) -> Result<Option<EncounterRules>, NavError> {
        self.extra
            .get("campaign_rules")
            .and_then(|r| r.get("encounter_system"))
            .map(|section| EncounterRules::from_value(section.clone()))
            .transpose()
    }
}

fn default_clock() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Everything the navigation engine reads and writes in one cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CampaignState {
    pub locations: LocationGraph,
    pub overview: CampaignOverview,
}

impl CampaignState {
    pub fn new(locations: LocationGraph) -> Self {
        Self {
            locations,
            overview: CampaignOverview::default(),
        }
    }

    /// Read both keys from the store.
    pub fn load(store: &impl CampaignStore) -> Result<Self, StoreError> {
        Ok(Self {
            locations: load_key(store, LOCATIONS_KEY)?,
            overview: load_key(store, OVERVIEW_KEY)?,
        })
    }

    /// Write both keys back.
    pub fn save(&self, store: &mut impl CampaignStore) -> Result<(), StoreError> {
        save_key(store, LOCATIONS_KEY, &self.locations)?;
        save_key(store, OVERVIEW_KEY, &self.overview)
    }

    pub fn position(&self) -> &PlayerPosition {
        &self.overview.player_position
    }

    pub fn position_mut(&mut self) -> &mut PlayerPosition {
        &mut self.overview.player_position
    }
}

/// The player's character sheet, or `None` when the store has none.
pub fn load_character(store: &impl CampaignStore) -> Result<Option<CharacterSheet>, StoreError> {
    let value = store.load(CHARACTER_KEY)?;
    if value.as_object().is_some_and(|m| m.is_empty()) || value.is_null() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StoreError::Json {
            key: CHARACTER_KEY.to_string(),
            source,
        })
}

pub(crate) fn load_key<T>(store: &impl CampaignStore, key: &str) -> Result<T, StoreError>
where
    T: serde::de::DeserializeOwned,
{
    let value = store.load(key)?;
    serde_json::from_value(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })
}

fn save_key<T: Serialize>(
    store: &mut impl CampaignStore,
    key: &str,
    value: &T,
) -> Result<(), StoreError> {
    let value = serde_json::to_value(value).map_err(|source| StoreError::Json {
        key: key.to_string(),
        source,
    })?;
    store.save(key, &value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locations::Location;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_preference_key_is_order_independent() {
        assert_eq!(preference_key("Town", "Castle"), "Castle <-> Town");
        assert_eq!(preference_key("Castle", "Town"), "Castle <-> Town");
    }

    #[test]
    fn test_route_preference_serialized_shape() {
        let pref = RoutePreference {
            decision: RouteDecision::UseRoute {
                route: vec!["A".into(), "B".into(), "C".into()],
            },
            decided_at: Utc::now(),
        };
        let value = serde_json::to_value(&pref).unwrap();
        assert_eq!(value["decision"], "use_route");
        assert_eq!(value["route"], json!(["A", "B", "C"]));
        assert!(value["decided_at"].is_string());
    }

    #[test]
    fn test_reads_original_preference() {
        let pref: RoutePreference = serde_json::from_value(json!({
            "decision": "blocked",
            "reason": "Bridge collapsed",
            "decided_at": "2024-05-01T12:00:00.000000Z"
        }))
        .unwrap();
        assert_eq!(
            pref.decision,
            RouteDecision::Blocked {
                reason: Some("Bridge collapsed".into())
            }
        );
    }

    #[test]
    fn test_overview_preserves_foreign_sections() {
        let store = MemoryStore::new().with_entry(
            OVERVIEW_KEY,
            json!({
                "campaign_name": "Frontier",
                "player_position": {"current_location": "Camp", "hp_note": "x"},
                "time_of_day": "Night"
            }),
        );
        let state = CampaignState::load(&store).unwrap();
        assert_eq!(state.position().current_location.as_deref(), Some("Camp"));

        let mut out = MemoryStore::new();
        state.save(&mut out).unwrap();
        let saved = out.get(OVERVIEW_KEY).unwrap();
        assert_eq!(saved["campaign_name"], "Frontier");
        assert_eq!(saved["player_position"]["hp_note"], "x");
    }

    #[test]
    fn test_state_round_trip() {
        let mut graph = LocationGraph::new();
        graph
            .insert_location("Camp", Location::world().with_coordinates(0.0, 0.0))
            .unwrap();
        let state = CampaignState::new(graph);

        let mut store = MemoryStore::new();
        state.save(&mut store).unwrap();
        let loaded = CampaignState::load(&store).unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_clock_defaults() {
        let mut overview = CampaignOverview::default();
        assert_eq!(overview.clock(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        overview.precise_time = Some("21:45".into());
        assert_eq!(overview.clock(), NaiveTime::from_hms_opt(21, 45, 0).unwrap());
        overview.precise_time = Some("late".into());
        assert_eq!(overview.clock(), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn test_encounter_rules_from_overview() {
        let overview: CampaignOverview = serde_json::from_value(json!({
            "campaign_rules": {"encounter_system": {"enabled": true, "base_dc": 12}}
        }))
        .unwrap();
        let rules = overview.encounter_rules().unwrap().unwrap();
        assert!(rules.enabled);
        assert_eq!(rules.base_dc, 12);
        assert_eq!(CampaignOverview::default().encounter_rules().unwrap(), None);
    }

    #[test]
    fn test_load_character() {
        assert_eq!(load_character(&MemoryStore::new()).unwrap(), None);

        let store = MemoryStore::new().with_entry(
            CHARACTER_KEY,
            json!({"abilities": {"dex": 14}, "speed_kmh": 5.5, "name": "Ilsa"}),
        );
        let sheet = load_character(&store).unwrap().unwrap();
        assert_eq!(sheet.abilities["dex"], 14);
        assert_eq!(sheet.speed_kmh, Some(5.5));
    }
}
