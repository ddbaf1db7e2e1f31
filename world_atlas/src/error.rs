//! Error types shared by the atlas and the navigation engine.
//!
//! Every mutating operation returns `Result<_, NavError>`; the `Display`
//! text is the human-readable reason shown to the operator.

use std::path::PathBuf;

/// Failures of the flat-file store collaborator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed data under key '{key}': {source}")]
    Json {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration section: {0}")]
    Section(#[from] serde_json::Error),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Errors returned by navigation operations.
#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("location already exists: {0}")]
    AlreadyExists(String),

    #[error("parent missing: {0}")]
    ParentNotFound(String),

    #[error("'{0}' is not a compound")]
    NotACompound(String),

    #[error("compound '{0}' has no entry points")]
    NoEntryPoints(String),

    #[error("'{entry}' is not an entry point of '{compound}'")]
    NotAnEntryPoint { entry: String, compound: String },

    #[error("'{target}' is not in the same compound as '{current}'")]
    NotSameCompound { current: String, target: String },

    #[error("'{to}' is not reachable from '{from}'")]
    NotReachable { from: String, to: String },

    #[error("already at top level")]
    AlreadyTopLevel,

    #[error("no current location")]
    NoCurrentLocation,

    #[error("already at {0}")]
    AlreadyAtLocation(String),

    #[error("no connection between '{from}' and '{to}'")]
    NoConnection { from: String, to: String },

    #[error("connection already exists between '{from}' and '{to}'")]
    ConnectionExists { from: String, to: String },

    #[error("location '{0}' has no coordinates")]
    MissingCoordinates(String),

    #[error("no blocked range {from_deg}-{to_deg} at '{location}'")]
    BlockedRangeNotFound {
        location: String,
        from_deg: f64,
        to_deg: f64,
    },

    #[error("vehicle not found: {0}")]
    VehicleNotFound(String),

    #[error("vehicle stationary: '{0}' cannot be moved")]
    VehicleStationary(String),

    #[error("room '{room}' is not part of vehicle '{vehicle_id}'")]
    RoomNotInVehicle { room: String, vehicle_id: String },

    #[error("not inside a vehicle")]
    NotInsideVehicle,

    #[error("'{0}' is not a waypoint")]
    NotAWaypoint(String),

    #[error("travel speed must be positive, got {0} km/h")]
    InvalidSpeed(f64),

    #[error("journey {journey} has no segment {segment}")]
    SegmentNotFound { journey: String, segment: u32 },

    #[error("route decision cancelled")]
    DecisionCancelled,

    #[error("invalid choice: {0}")]
    InvalidChoice(String),

    #[error("operator prompt failed: {0}")]
    Prompt(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_text() {
        assert_eq!(
            NavError::LocationNotFound("Tavern".into()).to_string(),
            "location not found: Tavern"
        );
        assert!(NavError::VehicleStationary("Fort".into())
            .to_string()
            .starts_with("vehicle stationary"));
        assert_eq!(NavError::AlreadyTopLevel.to_string(), "already at top level");
    }

    #[test]
    fn test_config_error_converts() {
        let err: NavError = ConfigError::InvalidValue {
            field: "base_dc",
            reason: "negative".into(),
        }
        .into();
        assert!(matches!(err, NavError::Config(_)));
    }
}
