use tracing::info;

use super::progress::SPECIAL_ITEM_SLOTS;
use super::world_map::Direction;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPosition {
    pub x: f32,
    pub y: f32,
}

/// HUD, intro and outro surfaces. Calls are notifications only; nothing flows
/// back into the controller.
pub trait Presentation {
    fn feathers_changed(&mut self, collected: u32, total: u32);

    fn life_points_changed(&mut self, remaining: u32, max: u32);

    fn special_item_found(&mut self, slot: usize, items_found: [bool; SPECIAL_ITEM_SLOTS]);

    fn show_level_intro(&mut self, display_name: &str);

    /// `completed` is true when every feather and item was found.
    fn show_level_outro(
        &mut self,
        display_name: &str,
        collected: u32,
        total: u32,
        completed: bool,
    );

    fn outro_save_complete(&mut self, completed: bool);

    fn move_player_to(&mut self, position: PlayerPosition);

    fn map_cursor_moved(&mut self, world: usize, node: usize, direction: Option<Direction>);

    fn forced_scroll_started(&mut self);
}

/// Presentation backend that reports every notification as a log event.
#[derive(Debug, Default)]
pub struct LogPresentation;

impl Presentation for LogPresentation {
    fn feathers_changed(&mut self, collected: u32, total: u32) {
        info!(collected, total, "hud_feathers");
    }

    fn life_points_changed(&mut self, remaining: u32, max: u32) {
        info!(remaining, max, "hud_life_points");
    }

    fn special_item_found(&mut self, slot: usize, items_found: [bool; SPECIAL_ITEM_SLOTS]) {
        info!(slot, items_found = ?items_found, "hud_special_item");
    }

    fn show_level_intro(&mut self, display_name: &str) {
        info!(level = display_name, "level_intro_shown");
    }

    fn show_level_outro(
        &mut self,
        display_name: &str,
        collected: u32,
        total: u32,
        completed: bool,
    ) {
        let comment = if completed { "Completed" } else { "Finished" };
        info!(level = display_name, collected, total, comment, "level_outro_shown");
    }

    fn outro_save_complete(&mut self, completed: bool) {
        if completed {
            info!("level_outro_full_complete_dance");
        }
        info!("level_outro_saved_press_continue");
    }

    fn move_player_to(&mut self, position: PlayerPosition) {
        info!(x = position.x, y = position.y, "player_repositioned");
    }

    fn map_cursor_moved(&mut self, world: usize, node: usize, direction: Option<Direction>) {
        match direction {
            Some(direction) => info!(world, node, direction = %direction, "map_cursor_moved"),
            None => info!(world, node, "map_cursor_placed"),
        }
    }

    fn forced_scroll_started(&mut self) {
        info!("forced_scroll_started");
    }
}
