//! # Navigation Core
//!
//! The navigation engine. This crate reads and edits the map kept by
//! `world_atlas`: it finds routes, keeps travel from cutting through other
//! locations, manages nested compounds and mobile vehicles, and simulates
//! journeys with encounter checks.
//!
//! ## Core Components
//!
//! - **pathfinder**: Hop-count and distance-weighted route search
//! - **intersection**: Footprint checks and splitting of edges that cross locations
//! - **route_cache**: Route analysis, suggestions and cached operator decisions
//! - **hierarchy**: Compounds, interiors, entry points and the player's location stack
//! - **vehicle**: Rigid mobile compounds that carry their rooms and reconnect on arrival
//! - **journey**: Segmented encounter checks and transient waypoints
//! - **layout**: Radial layout of a compound's interior
//! - **navigator**: One load-operate-save cycle per call over a campaign store
//!
//! ## Design Philosophy
//!
//! - **Single Source of Truth**: Every edge is created and removed through `LocationGraph`
//! - **Deterministic**: Dice are injected, so journeys replay exactly under a seed
//! - **Atomic**: A failed operation leaves the store untouched

pub mod hierarchy;
pub mod intersection;
pub mod journey;
pub mod layout;
pub mod navigator;
pub mod pathfinder;
pub mod route_cache;
pub mod vehicle;

pub use hierarchy::*;
pub use intersection::*;
pub use journey::*;
pub use layout::*;
pub use navigator::*;
pub use pathfinder::*;
pub use route_cache::*;
pub use vehicle::*;
