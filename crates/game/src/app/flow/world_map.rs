use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::catalog::WorldDefinition;
use super::progress::{LevelKey, PlayerProgress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|direction| direction.as_str().eq_ignore_ascii_case(raw))
            .ok_or_else(|| format!("invalid direction '{raw}' (expected up|down|left|right)"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapEdges {
    #[serde(default)]
    pub up: Option<usize>,
    #[serde(default)]
    pub down: Option<usize>,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
}

impl MapEdges {
    pub fn toward(&self, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }
}

/// One stop on a world's map. A node may lead into a level, open another
/// world's map, or be a plain waypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapNode {
    #[serde(default)]
    pub level: Option<usize>,
    #[serde(default)]
    pub opens_world: Option<usize>,
    #[serde(default)]
    pub unlocked_by: Option<LevelKey>,
    #[serde(default)]
    pub edges: MapEdges,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeAction {
    EnterLevel { world: usize, level: usize },
    OpenWorld { world: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum NavigationError {
    #[error("map node {node} is out of range (world has {node_count} nodes)")]
    NodeOutOfRange { node: usize, node_count: usize },
    #[error("map node {node} does not lead to a level")]
    NoLevel { node: usize },
}

/// Movement and interaction over one world's map graph. The navigator never
/// mutates progress; callers apply the node it returns.
#[derive(Debug, Clone)]
pub struct WorldMapNavigator {
    world_index: usize,
    nodes: Vec<MapNode>,
}

impl WorldMapNavigator {
    pub fn new(world_index: usize, world: &WorldDefinition) -> Self {
        Self {
            world_index,
            nodes: world.map.clone(),
        }
    }

    pub fn world_index(&self) -> usize {
        self.world_index
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_unlocked(&self, progress: &PlayerProgress, node: usize) -> bool {
        match self.nodes.get(node) {
            Some(map_node) => is_node_unlocked(map_node, progress),
            None => false,
        }
    }

    pub fn try_to_move(&self, progress: &PlayerProgress, direction: Direction) -> Option<usize> {
        let from = progress.current_node_index;
        let Some(destination) = self
            .nodes
            .get(from)
            .and_then(|node| node.edges.toward(direction))
        else {
            debug!(from, direction = %direction, "map_move_no_edge");
            return None;
        };
        if !self.is_unlocked(progress, destination) {
            debug!(from, destination, direction = %direction, "map_move_locked");
            return None;
        }
        Some(destination)
    }

    pub fn interact_with_current_node(&self, progress: &PlayerProgress) -> Option<NodeAction> {
        let node_index = progress.current_node_index;
        let node = self.nodes.get(node_index)?;
        if !is_node_unlocked(node, progress) {
            debug!(node = node_index, "map_interact_locked");
            return None;
        }
        if let Some(level) = node.level {
            return Some(NodeAction::EnterLevel {
                world: self.world_index,
                level,
            });
        }
        if let Some(world) = node.opens_world {
            return Some(NodeAction::OpenWorld { world });
        }
        debug!(node = node_index, "map_interact_nothing_here");
        None
    }

    pub fn get_level_index(&self, node: usize) -> Result<usize, NavigationError> {
        let map_node = self.nodes.get(node).ok_or(NavigationError::NodeOutOfRange {
            node,
            node_count: self.nodes.len(),
        })?;
        map_node.level.ok_or(NavigationError::NoLevel { node })
    }
}

fn is_node_unlocked(node: &MapNode, progress: &PlayerProgress) -> bool {
    node.unlocked_by
        .map_or(true, |key| progress.is_level_finished(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::flow::progress::LevelResult;

    // 0 - 1 - 2
    //     |
    //     3 (opens world 1)
    fn navigator() -> WorldMapNavigator {
        let world = WorldDefinition {
            name: "Meadow".to_string(),
            entry_node: 0,
            levels: Vec::new(),
            map: vec![
                MapNode {
                    level: Some(0),
                    edges: MapEdges {
                        right: Some(1),
                        ..MapEdges::default()
                    },
                    ..MapNode::default()
                },
                MapNode {
                    level: Some(1),
                    unlocked_by: Some(LevelKey::new(0, 0)),
                    edges: MapEdges {
                        left: Some(0),
                        right: Some(2),
                        down: Some(3),
                        ..MapEdges::default()
                    },
                    ..MapNode::default()
                },
                MapNode {
                    level: Some(2),
                    unlocked_by: Some(LevelKey::new(0, 1)),
                    edges: MapEdges {
                        left: Some(1),
                        ..MapEdges::default()
                    },
                    ..MapNode::default()
                },
                MapNode {
                    opens_world: Some(1),
                    edges: MapEdges {
                        up: Some(1),
                        ..MapEdges::default()
                    },
                    ..MapNode::default()
                },
            ],
        };
        WorldMapNavigator::new(0, &world)
    }

    fn finish(progress: &mut PlayerProgress, world: usize, level: usize) {
        progress.record_level(LevelKey::new(world, level), LevelResult::default());
    }

    #[test]
    fn move_into_locked_node_is_refused() {
        let navigator = navigator();
        let progress = PlayerProgress::default();

        assert_eq!(navigator.try_to_move(&progress, Direction::Right), None);
        assert_eq!(progress.current_node_index, 0);
    }

    #[test]
    fn move_without_edge_is_refused() {
        let navigator = navigator();
        let progress = PlayerProgress::default();

        assert_eq!(navigator.try_to_move(&progress, Direction::Up), None);
        assert_eq!(navigator.try_to_move(&progress, Direction::Left), None);
    }

    #[test]
    fn finishing_a_level_unlocks_the_next_node() {
        let navigator = navigator();
        let mut progress = PlayerProgress::default();
        finish(&mut progress, 0, 0);

        assert_eq!(navigator.try_to_move(&progress, Direction::Right), Some(1));

        progress.current_node_index = 1;
        assert_eq!(navigator.try_to_move(&progress, Direction::Right), None);
        assert_eq!(navigator.try_to_move(&progress, Direction::Down), Some(3));
    }

    #[test]
    fn unlock_keys_belong_to_their_own_world() {
        let navigator = navigator();
        let mut progress = PlayerProgress::default();
        finish(&mut progress, 1, 0);

        assert!(!navigator.is_unlocked(&progress, 1));
    }

    #[test]
    fn interacting_reports_node_action() {
        let navigator = navigator();
        let mut progress = PlayerProgress::default();

        assert_eq!(
            navigator.interact_with_current_node(&progress),
            Some(NodeAction::EnterLevel { world: 0, level: 0 })
        );

        finish(&mut progress, 0, 0);
        progress.current_node_index = 3;
        assert_eq!(
            navigator.interact_with_current_node(&progress),
            Some(NodeAction::OpenWorld { world: 1 })
        );
    }

    #[test]
    fn interacting_with_locked_or_invalid_node_does_nothing() {
        let navigator = navigator();
        let mut progress = PlayerProgress {
            current_node_index: 2,
            ..PlayerProgress::default()
        };

        assert_eq!(navigator.interact_with_current_node(&progress), None);

        progress.current_node_index = 99;
        assert_eq!(navigator.interact_with_current_node(&progress), None);
        assert_eq!(navigator.try_to_move(&progress, Direction::Left), None);
    }

    #[test]
    fn level_index_lookup_reports_errors() {
        let navigator = navigator();

        assert_eq!(navigator.get_level_index(2), Ok(2));
        assert_eq!(
            navigator.get_level_index(3),
            Err(NavigationError::NoLevel { node: 3 })
        );
        assert_eq!(
            navigator.get_level_index(7),
            Err(NavigationError::NodeOutOfRange {
                node: 7,
                node_count: 4
            })
        );
    }

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!("LEFT".parse::<Direction>(), Ok(Direction::Left));
        assert!("sideways".parse::<Direction>().is_err());
    }
}
