//! # World Atlas
//!
//! The map crate - contains the location model, canonical connection storage,
//! planar geometry and the persisted campaign state. This crate is the single
//! source of truth for map state and does not contain any navigation logic.
//!
//! ## Core Components
//!
//! - **locations**: Location records (world, compound, interior) and their edges
//! - **graph**: `LocationGraph`, the only place edges are created or removed
//! - **geometry**: Bearings, distances, compass points and blocked sectors
//! - **world_state**: Player position, route preferences and the campaign clock
//! - **mechanics**: Dice and character-stat modifiers
//! - **store**: The flat key -> mapping persistence collaborator

pub mod config;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod locations;
pub mod mechanics;
pub mod store;
pub mod world_state;

pub use config::*;
pub use error::*;
pub use geometry::*;
pub use graph::*;
pub use locations::*;
pub use mechanics::*;
pub use store::*;
pub use world_state::*;
