mod catalog;
mod controller;
mod level;
mod presentation;
mod progress;
mod transition;
mod world_map;

pub(crate) use catalog::{CatalogError, GameCatalog};
pub(crate) use controller::SceneFlowController;
pub(crate) use presentation::LogPresentation;
pub(crate) use progress::{ProgressStore, SPECIAL_ITEM_SLOTS};
pub(crate) use world_map::Direction;

#[cfg(test)]
pub(crate) use progress::{LevelKey, PlayerProgress};
