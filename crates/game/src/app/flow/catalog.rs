use std::collections::HashMap;
use std::path::Path;

use engine::{
    expected_actual, parse_json_document, read_json_document, validation_err, JsonDocumentError,
    SceneId,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::progress::{LevelKey, SPECIAL_ITEM_SLOTS};
use super::world_map::{Direction, MapNode};

pub const DEFAULT_LIFE_POINTS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelDefinition {
    pub scene: SceneId,
    pub display_name: String,
    #[serde(default)]
    pub feather_total: u32,
    /// Special-item slots in use, counted from slot 0.
    #[serde(default)]
    pub item_slots: usize,
    #[serde(default)]
    pub bonus_item_slot: Option<usize>,
    #[serde(default)]
    pub forced_scroll_delay_seconds: Option<f32>,
    /// Hits the player can take before the level resets.
    #[serde(default = "default_life_points")]
    pub life_points: u32,
}

fn default_life_points() -> u32 {
    DEFAULT_LIFE_POINTS
}

impl Default for LevelDefinition {
    fn default() -> Self {
        Self {
            scene: SceneId::default(),
            display_name: String::new(),
            feather_total: 0,
            item_slots: 0,
            bonus_item_slot: None,
            forced_scroll_delay_seconds: None,
            life_points: DEFAULT_LIFE_POINTS,
        }
    }
}

impl LevelDefinition {
    /// Stand-in for a level scene the catalog does not know.
    pub fn unknown(scene: SceneId) -> Self {
        Self {
            display_name: scene.to_string(),
            scene,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldDefinition {
    pub name: String,
    #[serde(default)]
    pub entry_node: usize,
    pub levels: Vec<LevelDefinition>,
    pub map: Vec<MapNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    MainMenu,
    WorldMap,
    Level(Option<LevelKey>),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to load game catalog '{path}': {source}")]
    Document {
        path: String,
        #[source]
        source: JsonDocumentError,
    },
    #[error("{0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogDocument {
    main_menu_scene: SceneId,
    world_map_scene: SceneId,
    worlds: Vec<WorldDefinition>,
}

/// Validated game content: which scenes are the menu and the map, and every
/// world with its levels and map graph.
#[derive(Debug, Clone)]
pub struct GameCatalog {
    main_menu_scene: SceneId,
    world_map_scene: SceneId,
    worlds: Vec<WorldDefinition>,
    level_by_scene: HashMap<SceneId, LevelKey>,
}

impl GameCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let document = read_json_document::<CatalogDocument>(path).map_err(|source| {
            CatalogError::Document {
                path: path.display().to_string(),
                source,
            }
        })?;
        let catalog = Self::from_document(document)?;
        info!(
            path = %path.display(),
            world_count = catalog.worlds.len(),
            level_count = catalog.level_by_scene.len(),
            "game_catalog_loaded"
        );
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let document =
            parse_json_document::<CatalogDocument>(raw).map_err(|source| CatalogError::Document {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::from_document(document)
    }

    fn from_document(document: CatalogDocument) -> Result<Self, CatalogError> {
        validate_document(&document).map_err(CatalogError::Invalid)?;
        let mut level_by_scene = HashMap::new();
        for (world_index, world) in document.worlds.iter().enumerate() {
            for (level_index, level) in world.levels.iter().enumerate() {
                level_by_scene.insert(level.scene.clone(), LevelKey::new(world_index, level_index));
            }
        }
        Ok(Self {
            main_menu_scene: document.main_menu_scene,
            world_map_scene: document.world_map_scene,
            worlds: document.worlds,
            level_by_scene,
        })
    }

    pub fn main_menu_scene(&self) -> &SceneId {
        &self.main_menu_scene
    }

    pub fn world_map_scene(&self) -> &SceneId {
        &self.world_map_scene
    }

    pub fn world_count(&self) -> usize {
        self.worlds.len()
    }

    pub fn world(&self, world: usize) -> Option<&WorldDefinition> {
        self.worlds.get(world)
    }

    /// `world`, or the first world when the index is stale. Catalogs always
    /// hold at least one world.
    pub fn world_or_first(&self, world: usize) -> (usize, &WorldDefinition) {
        match self.worlds.get(world) {
            Some(definition) => (world, definition),
            None => (0, &self.worlds[0]),
        }
    }

    pub fn level(&self, key: LevelKey) -> Option<&LevelDefinition> {
        self.worlds.get(key.world)?.levels.get(key.level)
    }

    /// Anything that is neither the menu nor the map is a level scene, known
    /// to the catalog or not.
    pub fn resolve_scene(&self, scene: &SceneId) -> SceneKind {
        if *scene == self.main_menu_scene {
            SceneKind::MainMenu
        } else if *scene == self.world_map_scene {
            SceneKind::WorldMap
        } else {
            SceneKind::Level(self.level_by_scene.get(scene).copied())
        }
    }
}

fn validate_document(document: &CatalogDocument) -> Result<(), String> {
    if document.main_menu_scene.as_str().trim().is_empty() {
        return Err(validation_err("main_menu_scene", "scene id cannot be empty"));
    }
    if document.world_map_scene.as_str().trim().is_empty() {
        return Err(validation_err("world_map_scene", "scene id cannot be empty"));
    }
    if document.main_menu_scene == document.world_map_scene {
        return Err(validation_err(
            "world_map_scene",
            "must differ from main_menu_scene",
        ));
    }
    if document.worlds.is_empty() {
        return Err(expected_actual("worlds", "at least one world", 0));
    }

    let mut seen_scenes: HashMap<&SceneId, String> = HashMap::new();
    for (world_index, world) in document.worlds.iter().enumerate() {
        let world_path = format!("worlds[{world_index}]");
        if world.map.is_empty() {
            return Err(expected_actual(
                &format!("{world_path}.map"),
                "at least one node",
                0,
            ));
        }
        if world.entry_node >= world.map.len() {
            return Err(expected_actual(
                &format!("{world_path}.entry_node"),
                format!("< {}", world.map.len()),
                world.entry_node,
            ));
        }

        for (level_index, level) in world.levels.iter().enumerate() {
            let level_path = format!("{world_path}.levels[{level_index}]");
            validate_level(document, level, &level_path)?;
            if let Some(previous) = seen_scenes.insert(&level.scene, level_path.clone()) {
                return Err(validation_err(
                    &format!("{level_path}.scene"),
                    format!("scene '{}' is already used by {previous}", level.scene),
                ));
            }
        }

        for (node_index, node) in world.map.iter().enumerate() {
            let node_path = format!("{world_path}.map[{node_index}]");
            validate_node(document, world, node, &node_path)?;
        }
    }
    Ok(())
}

fn validate_level(
    document: &CatalogDocument,
    level: &LevelDefinition,
    level_path: &str,
) -> Result<(), String> {
    if level.scene.as_str().trim().is_empty() {
        return Err(validation_err(
            &format!("{level_path}.scene"),
            "scene id cannot be empty",
        ));
    }
    if level.scene == document.main_menu_scene || level.scene == document.world_map_scene {
        return Err(validation_err(
            &format!("{level_path}.scene"),
            format!("scene '{}' is reserved for the menu or the map", level.scene),
        ));
    }
    if level.item_slots > SPECIAL_ITEM_SLOTS {
        return Err(expected_actual(
            &format!("{level_path}.item_slots"),
            format!("<= {SPECIAL_ITEM_SLOTS}"),
            level.item_slots,
        ));
    }
    if let Some(bonus) = level.bonus_item_slot {
        if bonus >= level.item_slots {
            return Err(expected_actual(
                &format!("{level_path}.bonus_item_slot"),
                format!("< {}", level.item_slots),
                bonus,
            ));
        }
    }
    if level.life_points == 0 {
        return Err(expected_actual(
            &format!("{level_path}.life_points"),
            ">= 1",
            level.life_points,
        ));
    }
    if let Some(delay) = level.forced_scroll_delay_seconds {
        if !delay.is_finite() || delay < 0.0 {
            return Err(expected_actual(
                &format!("{level_path}.forced_scroll_delay_seconds"),
                "finite non-negative seconds",
                delay,
            ));
        }
    }
    Ok(())
}

fn validate_node(
    document: &CatalogDocument,
    world: &WorldDefinition,
    node: &MapNode,
    node_path: &str,
) -> Result<(), String> {
    if let Some(level) = node.level {
        if level >= world.levels.len() {
            return Err(expected_actual(
                &format!("{node_path}.level"),
                format!("< {}", world.levels.len()),
                level,
            ));
        }
    }
    if let Some(opens_world) = node.opens_world {
        if opens_world >= document.worlds.len() {
            return Err(expected_actual(
                &format!("{node_path}.opens_world"),
                format!("< {}", document.worlds.len()),
                opens_world,
            ));
        }
        if node.level.is_some() {
            return Err(validation_err(
                node_path,
                "a node cannot both enter a level and open a world",
            ));
        }
    }
    if let Some(key) = node.unlocked_by {
        let known = document
            .worlds
            .get(key.world)
            .is_some_and(|unlocking_world| key.level < unlocking_world.levels.len());
        if !known {
            return Err(expected_actual(
                &format!("{node_path}.unlocked_by"),
                "an existing level key",
                key,
            ));
        }
    }
    for direction in Direction::ALL {
        if let Some(target) = node.edges.toward(direction) {
            if target >= world.map.len() {
                return Err(expected_actual(
                    &format!("{node_path}.edges.{direction}"),
                    format!("< {}", world.map.len()),
                    target,
                ));
            }
        }
    }
    Ok(())
}
