use thiserror::Error;
use tracing::debug;

use super::catalog::LevelDefinition;
use super::progress::{LevelKey, LevelResult, SPECIAL_ITEM_SLOTS};

pub const INTRO_ANIMATOR: &str = "level_intro";
pub const INTRO_CLIP: &str = "display";
pub const OUTRO_ANIMATOR: &str = "level_outro";
pub const OUTRO_CLIP: &str = "step_by_step";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlagConflict {
    #[error("cannot display the level outro during an internal transition")]
    OutroDuringInternalTransition,
    #[error("cannot start an internal transition while the level outro is displayed")]
    InternalTransitionDuringOutro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroStep {
    Showing,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LevelPhase {
    Intro,
    Playing,
}

/// Per-level state for the level scene that is currently active.
#[derive(Debug, Clone)]
pub struct LevelLifecycle {
    key: Option<LevelKey>,
    definition: LevelDefinition,
    phase: LevelPhase,
    is_displaying_outro: bool,
    is_internal_transition: bool,
    is_finished: bool,
    forced_scroll_running: bool,
    feathers_collected: u32,
    items_found: [bool; SPECIAL_ITEM_SLOTS],
    life_points: u32,
}

impl LevelLifecycle {
    pub fn new(key: Option<LevelKey>, definition: LevelDefinition) -> Self {
        Self {
            key,
            phase: LevelPhase::Playing,
            is_displaying_outro: false,
            is_internal_transition: false,
            is_finished: false,
            forced_scroll_running: false,
            feathers_collected: 0,
            items_found: [false; SPECIAL_ITEM_SLOTS],
            life_points: definition.life_points,
            definition,
        }
    }

    /// Catalog position of this level, `None` for scenes the catalog lacks.
    pub fn key(&self) -> Option<LevelKey> {
        self.key
    }

    pub fn definition(&self) -> &LevelDefinition {
        &self.definition
    }

    pub fn display_level_intro(&mut self, skip: bool) -> IntroStep {
        if skip {
            self.phase = LevelPhase::Playing;
            IntroStep::Skipped
        } else {
            self.phase = LevelPhase::Intro;
            IntroStep::Showing
        }
    }

    pub fn finish_intro(&mut self) -> bool {
        let was_showing = self.phase == LevelPhase::Intro;
        self.phase = LevelPhase::Playing;
        was_showing
    }

    pub fn is_intro_in_progress(&self) -> bool {
        self.phase == LevelPhase::Intro
    }

    pub fn is_displaying_outro(&self) -> bool {
        self.is_displaying_outro
    }

    pub fn is_internal_transition(&self) -> bool {
        self.is_internal_transition
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn is_in_transition(&self) -> bool {
        self.is_displaying_outro || self.is_internal_transition
    }

    pub fn set_displaying_outro(&mut self, value: bool) -> Result<(), FlagConflict> {
        if value && self.is_internal_transition {
            return Err(FlagConflict::OutroDuringInternalTransition);
        }
        self.is_displaying_outro = value;
        Ok(())
    }

    pub fn set_internal_transition(&mut self, value: bool) -> Result<(), FlagConflict> {
        if value && self.is_displaying_outro {
            return Err(FlagConflict::InternalTransitionDuringOutro);
        }
        self.is_internal_transition = value;
        Ok(())
    }

    /// Outro done: the level counts as finished from here on.
    pub fn complete_outro(&mut self) {
        self.is_displaying_outro = false;
        self.is_finished = true;
    }

    pub fn clear_internal_transition(&mut self) -> bool {
        std::mem::replace(&mut self.is_internal_transition, false)
    }

    pub fn feathers_collected(&self) -> u32 {
        self.feathers_collected
    }

    pub fn feather_total(&self) -> u32 {
        self.definition.feather_total
    }

    pub fn items_found(&self) -> [bool; SPECIAL_ITEM_SLOTS] {
        self.items_found
    }

    /// Counts one feather. Returns `false` once the declared total is reached.
    pub fn pick_feather(&mut self) -> bool {
        if self.feathers_collected >= self.definition.feather_total {
            debug!(total = self.definition.feather_total, "feather_over_total_ignored");
            return false;
        }
        self.feathers_collected += 1;
        true
    }

    /// Marks `slot` found. Returns `true` only the first time, and never for
    /// slots the level does not use.
    pub fn pick_special_item(&mut self, slot: usize) -> bool {
        if slot >= self.definition.item_slots {
            debug!(slot, item_slots = self.definition.item_slots, "item_slot_unused");
            return false;
        }
        let found = &mut self.items_found[slot];
        if *found {
            return false;
        }
        *found = true;
        true
    }

    pub fn has_collected_all_feathers(&self) -> bool {
        self.feathers_collected >= self.definition.feather_total
    }

    /// True when every used slot except the bonus slot is found.
    pub fn has_collected_all_items(&self) -> bool {
        let bonus = self.definition.bonus_item_slot;
        (0..self.definition.item_slots)
            .filter(|slot| Some(*slot) != bonus)
            .all(|slot| self.items_found[slot])
    }

    /// Grants the bonus item when the level has one and it is not found yet.
    pub fn grant_bonus_item(&mut self) -> Option<usize> {
        let slot = self.definition.bonus_item_slot?;
        if self.pick_special_item(slot) {
            Some(slot)
        } else {
            None
        }
    }

    /// All feathers and every non-bonus item: the outro reads "Completed"
    /// instead of "Finished".
    pub fn is_fully_completed(&self) -> bool {
        self.has_collected_all_feathers() && self.has_collected_all_items()
    }

    pub fn life_points(&self) -> u32 {
        self.life_points
    }

    pub fn max_life_points(&self) -> u32 {
        self.definition.life_points
    }

    /// Takes one life point and returns what is left.
    pub fn lose_life_point(&mut self) -> u32 {
        self.life_points = self.life_points.saturating_sub(1);
        self.life_points
    }

    pub fn start_forced_scroll(&mut self) -> bool {
        let started = !self.forced_scroll_running;
        self.forced_scroll_running = true;
        started
    }

    pub fn is_forced_scroll_running(&self) -> bool {
        self.forced_scroll_running
    }

    pub fn result(&self) -> LevelResult {
        LevelResult {
            feathers_collected: self.feathers_collected,
            items_found: self.items_found,
        }
    }
}

#[cfg(test)]
mod tests {
    use engine::SceneId;

    use super::*;

    fn level(feathers: u32, item_slots: usize, bonus: Option<usize>) -> LevelLifecycle {
        LevelLifecycle::new(
            Some(LevelKey::new(0, 0)),
            LevelDefinition {
                scene: SceneId::new("Meadow_1"),
                display_name: "Sunny Start".to_string(),
                feather_total: feathers,
                item_slots,
                bonus_item_slot: bonus,
                forced_scroll_delay_seconds: None,
                life_points: 2,
            },
        )
    }

    #[test]
    fn outro_and_internal_transition_exclude_each_other() {
        let mut level = level(0, 0, None);

        level.set_internal_transition(true).expect("internal");
        assert_eq!(
            level.set_displaying_outro(true),
            Err(FlagConflict::OutroDuringInternalTransition)
        );
        assert!(!level.is_displaying_outro());

        level.set_internal_transition(false).expect("clear");
        level.set_displaying_outro(true).expect("outro");
        assert_eq!(
            level.set_internal_transition(true),
            Err(FlagConflict::InternalTransitionDuringOutro)
        );
        assert!(level.is_in_transition());
    }

    #[test]
    fn completing_outro_finishes_level() {
        let mut level = level(0, 0, None);
        level.set_displaying_outro(true).expect("outro");

        level.complete_outro();

        assert!(!level.is_displaying_outro());
        assert!(level.is_finished());
        assert!(!level.is_in_transition());
    }

    #[test]
    fn pick_special_item_changes_state_once() {
        let mut level = level(0, 3, None);

        assert!(level.pick_special_item(1));
        assert!(!level.pick_special_item(1));
        assert_eq!(level.items_found(), [false, true, false, false]);
    }

    #[test]
    fn unused_slots_are_ignored() {
        let mut level = level(0, 2, None);

        assert!(!level.pick_special_item(2));
        assert!(!level.pick_special_item(SPECIAL_ITEM_SLOTS + 1));
        assert_eq!(level.items_found(), [false; SPECIAL_ITEM_SLOTS]);
    }

    #[test]
    fn all_items_query_skips_bonus_slot_and_stays_true() {
        let mut level = level(0, 4, Some(3));

        for slot in 0..3 {
            assert!(!level.has_collected_all_items());
            level.pick_special_item(slot);
        }
        assert!(level.has_collected_all_items());

        level.pick_special_item(0);
        level.pick_special_item(3);
        assert!(level.has_collected_all_items());
    }

    #[test]
    fn feathers_stop_at_declared_total() {
        let mut level = level(2, 0, None);

        assert!(!level.has_collected_all_feathers());
        assert!(level.pick_feather());
        assert!(level.pick_feather());
        assert!(!level.pick_feather());
        assert_eq!(level.feathers_collected(), 2);
        assert!(level.has_collected_all_feathers());
    }

    #[test]
    fn bonus_is_granted_once() {
        let mut level = level(0, 2, Some(1));

        assert_eq!(level.grant_bonus_item(), Some(1));
        assert_eq!(level.grant_bonus_item(), None);
        assert_eq!(level.result().items_found, [false, true, false, false]);
    }

    #[test]
    fn level_without_bonus_grants_nothing() {
        let mut level = level(0, 2, None);
        assert_eq!(level.grant_bonus_item(), None);
    }

    #[test]
    fn intro_ends_in_playable_state() {
        let mut level = level(0, 0, None);

        assert_eq!(level.display_level_intro(false), IntroStep::Showing);
        assert!(level.is_intro_in_progress());
        assert!(level.finish_intro());
        assert!(!level.is_intro_in_progress());
        assert!(!level.finish_intro());

        assert_eq!(level.display_level_intro(true), IntroStep::Skipped);
        assert!(!level.is_intro_in_progress());
    }

    #[test]
    fn result_snapshots_counters() {
        let mut level = level(5, 4, Some(3));
        level.pick_feather();
        level.pick_feather();
        level.pick_special_item(0);

        assert_eq!(
            level.result(),
            LevelResult {
                feathers_collected: 2,
                items_found: [true, false, false, false],
            }
        );
    }

    #[test]
    fn life_points_start_full_and_stop_at_zero() {
        let mut level = level(0, 0, None);
        assert_eq!(level.life_points(), 2);
        assert_eq!(level.max_life_points(), 2);

        assert_eq!(level.lose_life_point(), 1);
        assert_eq!(level.lose_life_point(), 0);
        assert_eq!(level.lose_life_point(), 0);
    }

    #[test]
    fn full_completion_needs_feathers_and_items() {
        let mut level = level(1, 2, Some(1));
        level.pick_special_item(0);
        assert!(!level.is_fully_completed());

        level.pick_feather();
        assert!(level.is_fully_completed());
    }
}
