//! Hierarchy Manager - compounds, their interior rooms, and the player's
//! position stack through nested compounds.
//!
//! `child.parent == P` holds exactly when `P.children` lists `child`; every
//! mutation here keeps both sides in step. Data loaded from disk may still
//! violate that, which [`HierarchyManager::validate_hierarchy`] reports
//! without repairing.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use world_atlas::{CampaignState, EdgeMeta, Location, LocationGraph, LocationType, NavError};

use crate::pathfinder::is_reachable;

/// Options for [`HierarchyManager::create_compound`].
#[derive(Debug, Clone, Default)]
pub struct CompoundOptions {
    pub parent: Option<String>,
    pub entry_points: Vec<String>,
    pub mobile: bool,
    pub description: String,
}

impl CompoundOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_entry_point(mut self, entry: impl Into<String>) -> Self {
        self.entry_points.push(entry.into());
        self
    }

    pub fn mobile(mut self) -> Self {
        self.mobile = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Options for [`HierarchyManager::add_interior`].
#[derive(Debug, Clone, Default)]
pub struct InteriorOptions {
    /// Edges to create from the new room.
    pub connections: Vec<(String, EdgeMeta)>,
    pub is_entry_point: bool,
    /// Free-form data describing how the room is entered from outside.
    pub entry_config: Option<Value>,
    pub description: String,
}

impl InteriorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection(mut self, to: impl Into<String>, meta: EdgeMeta) -> Self {
        self.connections.push((to.into(), meta));
        self
    }

    pub fn entry_point(mut self) -> Self {
        self.is_entry_point = true;
        self
    }

    pub fn with_entry_config(mut self, config: Value) -> Self {
        self.entry_config = Some(config);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Where the player ended up after a hierarchy move.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionChange {
    pub location: String,
    pub location_stack: Vec<String>,
}

/// Outcome of [`HierarchyManager::resolve_player_position`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub location: String,
    /// Whether the player was moved into the compound.
    pub resolved: bool,
    pub previous: Option<String>,
    pub location_stack: Vec<String>,
}

/// A node of [`HierarchyManager::get_tree`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: LocationType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPoint {
    pub name: String,
    pub description: String,
    pub entry_config: Value,
}

/// Problems found by [`HierarchyManager::validate_hierarchy`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HierarchyReport {
    pub errors: Vec<String>,
}

impl HierarchyReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Root-to-leaf chain ending at `name`. Stops at the first repeated name,
/// so cyclic parent data still terminates.
pub fn ancestors_of(graph: &LocationGraph, name: &str) -> Vec<String> {
    let mut chain = Vec::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut cursor = Some(name.to_string());

    while let Some(current) = cursor {
        if !visited.insert(current.clone()) {
            warn!(name, at = %current, "cycle in parent chain");
            break;
        }
        cursor = graph.location(&current).and_then(|l| l.parent.clone());
        chain.push(current);
    }

    chain.reverse();
    chain
}

pub struct HierarchyManager<'a> {
    state: &'a mut CampaignState,
}

impl<'a> HierarchyManager<'a> {
    pub fn new(state: &'a mut CampaignState) -> Self {
        Self { state }
    }

    /// Register `child` under `parent`. The parent keeps its kind, so a
    /// world region can hold compounds without becoming one.
    fn link_child(&mut self, parent: &str, child: &str) -> Result<(), NavError> {
        if self.state.locations.require_mut(parent)?.add_child(child) {
            debug!(parent, child, "child registered");
        }
        Ok(())
    }

    pub fn create_compound(&mut self, name: &str, options: CompoundOptions) -> Result<(), NavError> {
        if self.state.locations.contains(name) {
            return Err(NavError::AlreadyExists(name.to_string()));
        }
        if let Some(parent) = &options.parent {
            if !self.state.locations.contains(parent) {
                return Err(NavError::ParentNotFound(parent.clone()));
            }
        }

        let mut location = Location::compound().with_description(options.description);
        {
            let info = location.promote_to_compound();
            info.entry_points = options.entry_points;
            info.mobile = options.mobile;
        }
        if let Some(parent) = &options.parent {
            location.parent = Some(parent.clone());
        }

        self.state.locations.insert_location(name, location)?;
        if let Some(parent) = &options.parent {
            self.link_child(parent, name)?;
        }

        info!(name, parent = ?options.parent, "compound created");
        Ok(())
    }

    pub fn add_interior(
        &mut self,
        name: &str,
        parent: &str,
        options: InteriorOptions,
    ) -> Result<(), NavError> {
        if self.state.locations.contains(name) {
            return Err(NavError::AlreadyExists(name.to_string()));
        }
        if !self.state.locations.contains(parent) {
            return Err(NavError::ParentNotFound(parent.to_string()));
        }

        let mut location = Location::interior(parent).with_description(options.description);
        if options.is_entry_point {
            if let Some(config) = options.entry_config {
                location.extra.insert("entry_config".to_string(), config);
            }
        }
        self.state.locations.insert_location(name, location)?;
        self.link_child(parent, name)?;

        if options.is_entry_point {
            let info = self.state.locations.require_mut(parent)?.promote_to_compound();
            if !info.entry_points.iter().any(|e| e == name) {
                info.entry_points.push(name.to_string());
            }
        }

        for (to, meta) in options.connections {
            if !self.state.locations.add_connection(name, &to, meta) {
                warn!(room = name, %to, "interior connection skipped");
            }
        }

        info!(name, parent, entry_point = options.is_entry_point, "interior added");
        Ok(())
    }

    fn set_position(&mut self, location: &str, stack: Vec<String>) {
        let position = self.state.position_mut();
        position.current_location = Some(location.to_string());
        position.location_stack = stack;
    }

    pub fn enter_compound(
        &mut self,
        compound: &str,
        entry_point: Option<&str>,
    ) -> Result<PositionChange, NavError> {
        let location = self.state.locations.require(compound)?;
        let info = location
            .compound_info()
            .ok_or_else(|| NavError::NotACompound(compound.to_string()))?;
        let first = info
            .entry_points
            .first()
            .ok_or_else(|| NavError::NoEntryPoints(compound.to_string()))?;

        let target = entry_point.unwrap_or(first.as_str()).to_string();
        if !info.entry_points.contains(&target) {
            return Err(NavError::NotAnEntryPoint {
                entry: target,
                compound: compound.to_string(),
            });
        }
        if !self.state.locations.contains(&target) {
            return Err(NavError::LocationNotFound(target));
        }

        let mut stack = self.get_ancestors(compound);
        stack.push(target.clone());
        self.set_position(&target, stack.clone());

        info!(compound, location = %target, "entered compound");
        Ok(PositionChange {
            location: target,
            location_stack: stack,
        })
    }

    /// Move up one nesting level to the current location's parent.
    pub fn exit_compound(&mut self) -> Result<PositionChange, NavError> {
        let current = self.state.position().current()?.to_string();
        let parent = self
            .state
            .locations
            .location(&current)
            .and_then(|l| l.parent.clone())
            .ok_or(NavError::AlreadyTopLevel)?;

        let stack = self.get_ancestors(&parent);
        self.set_position(&parent, stack.clone());

        info!(from = %current, to = %parent, "exited compound");
        Ok(PositionChange {
            location: parent,
            location_stack: stack,
        })
    }

    /// Move between sibling rooms that are connected.
    pub fn move_interior(&mut self, target: &str) -> Result<PositionChange, NavError> {
        let current = self.state.position().current()?.to_string();
        let target_location = self.state.locations.require(target)?;
        let current_parent = self
            .state
            .locations
            .location(&current)
            .and_then(|l| l.parent.as_deref());

        if current_parent != target_location.parent.as_deref() {
            return Err(NavError::NotSameCompound {
                current,
                target: target.to_string(),
            });
        }
        if !is_reachable(&self.state.locations, &current, target) {
            return Err(NavError::NotReachable {
                from: current,
                to: target.to_string(),
            });
        }

        let mut stack = self.state.position().location_stack.clone();
        if stack.last() == Some(&current) {
            if let Some(last) = stack.last_mut() {
                *last = target.to_string();
            }
        } else if !stack.is_empty() {
            stack.push(target.to_string());
        } else {
            stack = self.get_ancestors(target);
        }
        self.set_position(target, stack.clone());

        info!(from = %current, to = target, "moved within compound");
        Ok(PositionChange {
            location: target.to_string(),
            location_stack: stack,
        })
    }

    pub fn get_ancestors(&self, name: &str) -> Vec<String> {
        ancestors_of(&self.state.locations, name)
    }

    pub fn get_children(&self, name: &str) -> Vec<String> {
        self.state
            .locations
            .location(name)
            .map(|l| l.children().to_vec())
            .unwrap_or_default()
    }

    pub fn get_entry_points(&self, compound: &str) -> Vec<EntryPoint> {
        let graph = &self.state.locations;
        let Some(location) = graph.location(compound) else {
            return Vec::new();
        };

        location
            .entry_points()
            .iter()
            .map(|name| {
                let room = graph.location(name);
                EntryPoint {
                    name: name.clone(),
                    description: room.map(|r| r.description.clone()).unwrap_or_default(),
                    entry_config: room
                        .and_then(|r| r.extra.get("entry_config").cloned())
                        .unwrap_or_else(|| Value::Object(Default::default())),
                }
            })
            .collect()
    }

    pub fn location_kind(&self, name: &str) -> Option<LocationType> {
        self.state.locations.location(name).map(Location::location_type)
    }

    /// The subtree under `root`, or every top-level world/compound location.
    pub fn get_tree(&self, root: Option<&str>) -> Result<Vec<TreeNode>, NavError> {
        let graph = &self.state.locations;
        match root {
            Some(root) => {
                graph.require(root)?;
                Ok(vec![self.tree_node(root, &mut HashSet::new())])
            }
            None => Ok(graph
                .iter()
                .filter(|(_, l)| l.parent.is_none() && l.location_type() != LocationType::Interior)
                .map(|(name, _)| self.tree_node(name, &mut HashSet::new()))
                .collect()),
        }
    }

    fn tree_node(&self, name: &str, seen: &mut HashSet<String>) -> TreeNode {
        seen.insert(name.to_string());
        let location = self.state.locations.location(name);
        let mut children = Vec::new();
        for child in location.map(|l| l.children()).unwrap_or(&[]) {
            if self.state.locations.contains(child) && !seen.contains(child) {
                children.push(self.tree_node(child, seen));
            }
        }

        TreeNode {
            name: name.to_string(),
            kind: location
                .map(Location::location_type)
                .unwrap_or(LocationType::World),
            children,
        }
    }

    /// Check parent/children symmetry and parent-chain acyclicity.
    pub fn validate_hierarchy(&self) -> HierarchyReport {
        let graph = &self.state.locations;
        let mut errors = Vec::new();

        for (name, location) in graph.iter() {
            if let Some(parent) = &location.parent {
                match graph.location(parent) {
                    None => errors.push(format!("'{}' references missing parent '{}'", name, parent)),
                    Some(p) if !p.children().iter().any(|c| c == name) => errors.push(format!(
                        "'{}' has parent '{}' but is not in parent's children list",
                        name, parent
                    )),
                    Some(_) => {}
                }
            }

            for child in location.children() {
                match graph.location(child) {
                    None => errors.push(format!("'{}' references missing child '{}'", name, child)),
                    Some(c) if c.parent.as_deref() != Some(name) => errors.push(format!(
                        "Child '{}' of '{}' has different parent: '{}'",
                        child,
                        name,
                        c.parent.as_deref().unwrap_or("none")
                    )),
                    Some(_) => {}
                }
            }
        }

        for name in graph.names() {
            let mut visited: HashSet<&str> = HashSet::new();
            let mut cursor = Some(name);
            while let Some(current) = cursor {
                if !visited.insert(current) {
                    errors.push(format!(
                        "Cycle detected at '{}' involving '{}'",
                        name, current
                    ));
                    break;
                }
                cursor = graph.location(current).and_then(|l| l.parent.as_deref());
            }
        }

        debug!(errors = errors.len(), "hierarchy validated");
        HierarchyReport { errors }
    }

    /// If the player stands on a compound, descend into its first entry
    /// point (or first child when it has none).
    pub fn resolve_player_position(&mut self) -> Result<Resolution, NavError> {
        let current = self.state.position().current()?.to_string();
        let target = self.state.locations.location(&current).and_then(|l| {
            let info = l.compound_info()?;
            info.entry_points
                .first()
                .or_else(|| l.children().first())
                .cloned()
        });

        let Some(target) = target else {
            return Ok(Resolution {
                location: current,
                resolved: false,
                previous: None,
                location_stack: self.state.position().location_stack.clone(),
            });
        };

        let stack = self.get_ancestors(&target);
        self.set_position(&target, stack.clone());

        info!(from = %current, to = %target, "player position resolved into compound");
        Ok(Resolution {
            location: target,
            resolved: true,
            previous: Some(current),
            location_stack: stack,
        })
    }
}
