use engine::{
    AnimationFinished, AnimatorId, EngineContext, EngineEvent, EventSubscriber, SceneBindings,
    SceneId, Scheduler,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::app::commands::GameCommand;

use super::catalog::{GameCatalog, LevelDefinition, SceneKind};
use super::level::{
    FlagConflict, IntroStep, LevelLifecycle, INTRO_ANIMATOR, INTRO_CLIP, OUTRO_ANIMATOR,
    OUTRO_CLIP,
};
use super::presentation::{PlayerPosition, Presentation};
use super::progress::{LevelKey, LevelResult, PlayerProgress, ProgressStore, SPECIAL_ITEM_SLOTS};
use super::transition::{FadePhase, FadeTrigger, GateState, TransitionGate, TRANSITION_ANIMATOR};
use super::world_map::{Direction, NodeAction, WorldMapNavigator};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    MainMenu,
    WorldMap,
    Level,
}

enum ActiveScene {
    MainMenu,
    WorldMap(WorldMapNavigator),
    Level(LevelLifecycle),
}

impl ActiveScene {
    fn mode(&self) -> Mode {
        match self {
            ActiveScene::MainMenu => Mode::MainMenu,
            ActiveScene::WorldMap(_) => Mode::WorldMap,
            ActiveScene::Level(_) => Mode::Level,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelContinuation {
    StartForcedScroll,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("'{action}' needs {expected:?} mode, current mode is {actual:?}")]
    WrongMode {
        action: &'static str,
        expected: Mode,
        actual: Mode,
    },
    #[error("cannot load a level from {mode:?}")]
    LevelLoadNotAllowed { mode: Mode },
    #[error("level {key} does not exist")]
    UnknownLevel { key: LevelKey },
    #[error("level is already in a transition or finished")]
    LevelBusy,
    #[error("level is not finished yet")]
    LevelNotFinished,
    #[error(transparent)]
    FlagConflict(#[from] FlagConflict),
}

/// Owns the menu/map/level flow: decides which scene comes next, gates scene
/// changes behind fades and records level completions.
pub struct SceneFlowController {
    catalog: GameCatalog,
    store: ProgressStore,
    progress: PlayerProgress,
    active: ActiveScene,
    gate: TransitionGate,
    skip_intro_once: bool,
    pending_destination: Option<PlayerPosition>,
    scheduler: Scheduler<LevelContinuation, LevelLifecycle>,
    presentation: Box<dyn Presentation>,
}

impl SceneFlowController {
    pub fn new(
        catalog: GameCatalog,
        store: ProgressStore,
        presentation: Box<dyn Presentation>,
    ) -> Self {
        let progress = store.load();
        Self::with_progress(catalog, store, progress, presentation)
    }

    pub fn with_progress(
        catalog: GameCatalog,
        store: ProgressStore,
        progress: PlayerProgress,
        presentation: Box<dyn Presentation>,
    ) -> Self {
        Self {
            catalog,
            store,
            progress,
            active: ActiveScene::MainMenu,
            gate: TransitionGate::new(),
            skip_intro_once: false,
            pending_destination: None,
            scheduler: Scheduler::new(),
            presentation,
        }
    }

    pub fn mode(&self) -> Mode {
        self.active.mode()
    }

    pub fn progress(&self) -> &PlayerProgress {
        &self.progress
    }

    pub fn level(&self) -> Option<&LevelLifecycle> {
        match &self.active {
            ActiveScene::Level(level) => Some(level),
            _ => None,
        }
    }

    pub fn navigator(&self) -> Option<&WorldMapNavigator> {
        match &self.active {
            ActiveScene::WorldMap(navigator) => Some(navigator),
            _ => None,
        }
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.state()
    }

    pub fn skip_intro_pending(&self) -> bool {
        self.skip_intro_once
    }

    pub fn pending_continuations(&self) -> usize {
        self.scheduler.len()
    }

    pub fn on_scene_activated(
        &mut self,
        ctx: &mut EngineContext,
        scene: SceneId,
        bindings: SceneBindings,
    ) {
        let dropped = self.scheduler.clear();
        let skip_intro = std::mem::take(&mut self.skip_intro_once);
        self.pending_destination = None;
        self.gate.reset(&bindings);

        self.active = match self.catalog.resolve_scene(&scene) {
            SceneKind::MainMenu => ActiveScene::MainMenu,
            SceneKind::WorldMap => ActiveScene::WorldMap(self.enter_world_map()),
            SceneKind::Level(key) => {
                let definition = match key.and_then(|key| self.catalog.level(key)) {
                    Some(definition) => definition.clone(),
                    None => {
                        warn!(scene = %scene, "level_not_in_catalog");
                        LevelDefinition::unknown(scene.clone())
                    }
                };
                ActiveScene::Level(LevelLifecycle::new(key, definition))
            }
        };
        info!(
            scene = %scene,
            mode = ?self.mode(),
            transition_animator = self.gate.is_available(),
            dropped_continuations = dropped,
            "scene_activated"
        );

        if self.gate.is_available() {
            self.gate.fade_out(ctx);
        }
        if matches!(self.active, ActiveScene::Level(_)) {
            self.start_level(ctx, skip_intro);
        }
    }

    fn enter_world_map(&mut self) -> WorldMapNavigator {
        let requested_world = self.progress.current_world_index;
        let (world_index, world) = self.catalog.world_or_first(requested_world);
        if world_index != requested_world {
            warn!(
                world = requested_world,
                "saved_world_out_of_range_using_first"
            );
            self.progress.current_world_index = world_index;
            self.progress.current_node_index = world.entry_node;
        }
        if self.progress.current_node_index >= world.map.len() {
            warn!(
                node = self.progress.current_node_index,
                "saved_node_out_of_range_using_entry"
            );
            self.progress.current_node_index = world.entry_node;
        }
        let navigator = WorldMapNavigator::new(world_index, world);
        self.presentation
            .map_cursor_moved(world_index, self.progress.current_node_index, None);
        navigator
    }

    fn start_level(&mut self, ctx: &mut EngineContext, skip_intro: bool) {
        let ActiveScene::Level(level) = &mut self.active else {
            return;
        };
        match level.display_level_intro(skip_intro) {
            IntroStep::Skipped => debug!("level_intro_skipped"),
            IntroStep::Showing => {
                self.presentation
                    .show_level_intro(&level.definition().display_name);
                if !ctx.play_animation(&AnimatorId::new(INTRO_ANIMATOR), INTRO_CLIP) {
                    level.finish_intro();
                }
            }
        }
        self.presentation
            .feathers_changed(level.feathers_collected(), level.feather_total());
        self.presentation
            .life_points_changed(level.life_points(), level.max_life_points());

        if let Some(delay) = level.definition().forced_scroll_delay_seconds {
            self.scheduler.schedule(
                LevelContinuation::StartForcedScroll,
                Some(Box::new(|level: &LevelLifecycle| level.is_in_transition())),
                delay,
            );
            debug!(delay_seconds = delay, "forced_scroll_scheduled");
        }
    }

    pub fn request_load_main_menu(&mut self, ctx: &mut EngineContext) {
        info!(from = ?self.mode(), "main_menu_load_requested");
        ctx.request_scene_load(self.catalog.main_menu_scene().clone());
    }

    pub fn request_load_world_map(&mut self, ctx: &mut EngineContext) {
        info!(from = ?self.mode(), "world_map_load_requested");
        ctx.request_scene_load(self.catalog.world_map_scene().clone());
    }

    pub fn request_load_level(
        &mut self,
        ctx: &mut EngineContext,
        world: usize,
        level: usize,
    ) -> Result<(), FlowError> {
        let mode = self.mode();
        if mode == Mode::MainMenu {
            return Err(FlowError::LevelLoadNotAllowed { mode });
        }
        let key = LevelKey::new(world, level);
        let definition = self
            .catalog
            .level(key)
            .ok_or(FlowError::UnknownLevel { key })?;
        let scene = definition.scene.clone();

        self.progress.current_world_index = world;
        let current_node_level = self
            .catalog
            .world(world)
            .and_then(|definition| definition.map.get(self.progress.current_node_index))
            .and_then(|node| node.level);
        if current_node_level != Some(level) {
            let node = self.catalog.world(world).and_then(|definition| {
                definition
                    .map
                    .iter()
                    .position(|node| node.level == Some(level))
            });
            if let Some(node) = node {
                self.progress.current_node_index = node;
            }
        }

        info!(level = %key, scene = %scene, from = ?mode, "level_load_requested");
        ctx.request_scene_load(scene);
        Ok(())
    }

    /// Ends the active level: flags the outro, grants the bonus item when
    /// everything was collected, and fades in. Panics without an active level.
    pub fn finish_current_level(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        let ActiveScene::Level(level) = &mut self.active else {
            panic!("finish_current_level called without an active level");
        };
        if level.is_displaying_outro() || level.is_finished() {
            debug!("finish_ignored_outro_already_running");
            return Ok(());
        }
        if self.gate.state() == GateState::FadingIn && !level.is_in_transition() {
            return Err(FlowError::LevelBusy);
        }
        level.set_displaying_outro(true)?;
        if level.has_collected_all_feathers() && level.has_collected_all_items() {
            if let Some(slot) = level.grant_bonus_item() {
                info!(slot, "bonus_item_granted");
                self.presentation
                    .special_item_found(slot, level.items_found());
            }
        }
        info!(
            feathers = level.feathers_collected(),
            feather_total = level.feather_total(),
            "level_finish_started"
        );
        self.fade_in_or_complete(ctx);
        Ok(())
    }

    pub fn on_fade_in_complete(&mut self, ctx: &mut EngineContext) {
        let Some(level) = self.level() else {
            if self.mode() == Mode::WorldMap {
                debug!("fade_in_complete_world_map");
            } else {
                self.request_load_world_map(ctx);
            }
            return;
        };
        match (level.is_displaying_outro(), level.is_internal_transition()) {
            (true, true) => {
                panic!("level outro and internal transition are both active")
            }
            (true, false) => self.show_level_outro(ctx),
            (false, true) => {
                match self.pending_destination.take() {
                    Some(destination) => self.presentation.move_player_to(destination),
                    None => warn!("internal_transition_without_destination"),
                }
                self.fade_out_or_complete(ctx);
            }
            (false, false) => self.reload_current_level(ctx),
        }
    }

    pub fn on_fade_out_complete(&mut self) {
        if let ActiveScene::Level(level) = &mut self.active {
            if level.clear_internal_transition() {
                debug!("internal_transition_finished");
            }
        }
    }

    fn show_level_outro(&mut self, ctx: &mut EngineContext) {
        let Some(level) = self.level() else {
            return;
        };
        let result = level.result();
        let display_name = level.definition().display_name.clone();
        let feather_total = level.feather_total();
        let completed = level.is_fully_completed();

        self.save_level_progress(result.feathers_collected, result.items_found);
        self.presentation.show_level_outro(
            &display_name,
            result.feathers_collected,
            feather_total,
            completed,
        );
        if !ctx.play_animation(&AnimatorId::new(OUTRO_ANIMATOR), OUTRO_CLIP) {
            self.on_outro_displayed();
        }
    }

    fn reload_current_level(&mut self, ctx: &mut EngineContext) {
        let Some(level) = self.level() else {
            return;
        };
        let scene = level.definition().scene.clone();
        info!(scene = %scene, "level_reset");
        self.skip_intro_once = true;
        ctx.request_scene_load(scene);
    }

    /// Records a completion for the current level and writes the save. A
    /// failed write is logged; the in-memory progress keeps the result.
    pub fn save_level_progress(
        &mut self,
        feathers_collected: u32,
        items_found: [bool; SPECIAL_ITEM_SLOTS],
    ) {
        let Some(key) = self.current_level_key() else {
            warn!("level_progress_not_saved_unknown_level");
            return;
        };
        let replaced = self.progress.record_level(
            key,
            LevelResult {
                feathers_collected,
                items_found,
            },
        );
        info!(
            level = %key,
            feathers_collected,
            replaced = replaced.is_some(),
            "level_progress_recorded"
        );
        if let Err(error) = self.store.save(&self.progress) {
            warn!(error = %error, "progress_save_failed");
        }
    }

    /// The active level's catalog key. Scenes outside the catalog fall back
    /// to the level of the current map node.
    fn current_level_key(&self) -> Option<LevelKey> {
        if let Some(key) = self.level().and_then(LevelLifecycle::key) {
            return Some(key);
        }
        let world = self.progress.current_world_index;
        let definition = self.catalog.world(world)?;
        WorldMapNavigator::new(world, definition)
            .get_level_index(self.progress.current_node_index)
            .ok()
            .map(|level| LevelKey::new(world, level))
    }

    pub fn start_game(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        self.require_mode("start", Mode::MainMenu)?;
        self.fade_in_or_complete(ctx);
        Ok(())
    }

    pub fn restart_level(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        let level = self.require_level_mut("die")?;
        if level.is_in_transition() || level.is_finished() {
            return Err(FlowError::LevelBusy);
        }
        info!("player_died");
        self.fade_in_or_complete(ctx);
        Ok(())
    }

    /// Takes a life point; the last one restarts the level.
    pub fn hurt_player(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        let reset_pending = self.gate.state() == GateState::FadingIn;
        let level = self.require_level_mut("hurt")?;
        if level.is_in_transition() || level.is_finished() || reset_pending {
            return Err(FlowError::LevelBusy);
        }
        let remaining = level.lose_life_point();
        let max = level.max_life_points();
        self.presentation.life_points_changed(remaining, max);
        debug!(remaining, "life_point_lost");
        if remaining == 0 {
            self.restart_level(ctx)?;
        }
        Ok(())
    }

    pub fn begin_internal_transition(
        &mut self,
        ctx: &mut EngineContext,
        destination: PlayerPosition,
    ) -> Result<(), FlowError> {
        let fading_in = self.gate.state() == GateState::FadingIn;
        let level = self.require_level_mut("warp")?;
        // A fade-in with neither flag set is a pending reset.
        if level.is_finished() || (fading_in && !level.is_in_transition()) {
            return Err(FlowError::LevelBusy);
        }
        level.set_internal_transition(true)?;
        self.pending_destination = Some(destination);
        self.fade_in_or_complete(ctx);
        Ok(())
    }

    pub fn pick_feather(&mut self) -> Result<bool, FlowError> {
        let level = self.require_level_mut("feather")?;
        let counted = level.pick_feather();
        if counted {
            let (collected, total) = (level.feathers_collected(), level.feather_total());
            self.presentation.feathers_changed(collected, total);
        }
        Ok(counted)
    }

    pub fn pick_special_item(&mut self, slot: usize) -> Result<bool, FlowError> {
        let level = self.require_level_mut("item")?;
        let found = level.pick_special_item(slot);
        if found {
            let items_found = level.items_found();
            self.presentation.special_item_found(slot, items_found);
        }
        Ok(found)
    }

    pub fn move_on_map(&mut self, direction: Direction) -> Result<Option<usize>, FlowError> {
        let ActiveScene::WorldMap(navigator) = &self.active else {
            return Err(self.wrong_mode("move", Mode::WorldMap));
        };
        let destination = navigator.try_to_move(&self.progress, direction);
        if let Some(node) = destination {
            let world = navigator.world_index();
            self.progress.current_node_index = node;
            self.presentation
                .map_cursor_moved(world, node, Some(direction));
        }
        Ok(destination)
    }

    pub fn interact_on_map(
        &mut self,
        ctx: &mut EngineContext,
    ) -> Result<Option<NodeAction>, FlowError> {
        let ActiveScene::WorldMap(navigator) = &self.active else {
            return Err(self.wrong_mode("interact", Mode::WorldMap));
        };
        let action = navigator.interact_with_current_node(&self.progress);
        match action {
            Some(NodeAction::EnterLevel { world, level }) => {
                self.request_load_level(ctx, world, level)?;
            }
            Some(NodeAction::OpenWorld { world }) => {
                let entry_node = self
                    .catalog
                    .world(world)
                    .map_or(0, |definition| definition.entry_node);
                info!(world, entry_node, "world_opened");
                self.progress.current_world_index = world;
                self.progress.current_node_index = entry_node;
                self.active = ActiveScene::WorldMap(self.enter_world_map());
            }
            None => {}
        }
        Ok(action)
    }

    pub fn leave_world_map(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        self.require_mode("back", Mode::WorldMap)?;
        self.request_load_main_menu(ctx);
        Ok(())
    }

    pub fn continue_after_outro(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        let level = self.require_level_mut("continue")?;
        if !level.is_finished() {
            return Err(FlowError::LevelNotFinished);
        }
        self.request_load_world_map(ctx);
        Ok(())
    }

    pub fn quit_level(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        self.require_level_mut("quit_level")?;
        info!("level_abandoned");
        self.request_load_world_map(ctx);
        Ok(())
    }

    pub fn return_to_main_menu(&mut self, ctx: &mut EngineContext) -> Result<(), FlowError> {
        self.require_level_mut("main_menu")?;
        info!("level_abandoned_for_main_menu");
        self.request_load_main_menu(ctx);
        Ok(())
    }

    pub fn on_intro_finished(&mut self) {
        if let ActiveScene::Level(level) = &mut self.active {
            if level.finish_intro() {
                debug!("level_intro_finished");
            }
        }
    }

    pub fn on_outro_displayed(&mut self) {
        if let ActiveScene::Level(level) = &mut self.active {
            level.complete_outro();
            let completed = level.is_fully_completed();
            info!(completed, "level_finished");
            self.presentation.outro_save_complete(completed);
        }
    }

    pub fn tick(&mut self, dt_seconds: f32) {
        let ActiveScene::Level(level) = &mut self.active else {
            return;
        };
        for continuation in self.scheduler.advance(dt_seconds, level) {
            match continuation {
                LevelContinuation::StartForcedScroll => {
                    if level.start_forced_scroll() {
                        self.presentation.forced_scroll_started();
                    }
                }
            }
        }
    }

    pub fn handle_command(
        &mut self,
        ctx: &mut EngineContext,
        command: GameCommand,
    ) -> Result<(), FlowError> {
        match command {
            GameCommand::Start => self.start_game(ctx),
            GameCommand::Move(direction) => self.move_on_map(direction).map(drop),
            GameCommand::Interact => self.interact_on_map(ctx).map(drop),
            GameCommand::Back => self.leave_world_map(ctx),
            GameCommand::Feather => self.pick_feather().map(drop),
            GameCommand::Item { slot } => self.pick_special_item(slot).map(drop),
            GameCommand::Finish => {
                self.require_level_mut("finish")?;
                self.finish_current_level(ctx)
            }
            GameCommand::Die => self.restart_level(ctx),
            GameCommand::Hurt => self.hurt_player(ctx),
            GameCommand::Warp { x, y } => {
                self.begin_internal_transition(ctx, PlayerPosition { x, y })
            }
            GameCommand::Continue => self.continue_after_outro(ctx),
            GameCommand::QuitLevel => self.quit_level(ctx),
            GameCommand::MainMenu => self.return_to_main_menu(ctx),
        }
    }

    fn on_animation_finished(&mut self, ctx: &mut EngineContext, finished: AnimationFinished) {
        match (finished.animator.as_str(), finished.clip.as_str()) {
            (TRANSITION_ANIMATOR, _) => match self.gate.notify_animation_complete() {
                Some(FadePhase::FadeIn) => self.on_fade_in_complete(ctx),
                Some(FadePhase::FadeOut) => self.on_fade_out_complete(),
                None => {}
            },
            (INTRO_ANIMATOR, INTRO_CLIP) => self.on_intro_finished(),
            (OUTRO_ANIMATOR, OUTRO_CLIP) => self.on_outro_displayed(),
            (animator, clip) => debug!(animator, clip, "animation_finished_unhandled"),
        }
    }

    fn fade_in_or_complete(&mut self, ctx: &mut EngineContext) {
        if self.gate.fade_in(ctx) == FadeTrigger::Unavailable {
            warn!("fade_in_unavailable_completing_directly");
            self.on_fade_in_complete(ctx);
        }
    }

    fn fade_out_or_complete(&mut self, ctx: &mut EngineContext) {
        if self.gate.fade_out(ctx) == FadeTrigger::Unavailable {
            warn!("fade_out_unavailable_completing_directly");
            self.on_fade_out_complete();
        }
    }

    fn require_mode(&self, action: &'static str, expected: Mode) -> Result<(), FlowError> {
        if self.mode() == expected {
            Ok(())
        } else {
            Err(self.wrong_mode(action, expected))
        }
    }

    fn require_level_mut(&mut self, action: &'static str) -> Result<&mut LevelLifecycle, FlowError> {
        let actual = self.mode();
        match &mut self.active {
            ActiveScene::Level(level) => Ok(level),
            _ => Err(FlowError::WrongMode {
                action,
                expected: Mode::Level,
                actual,
            }),
        }
    }

    fn wrong_mode(&self, action: &'static str, expected: Mode) -> FlowError {
        FlowError::WrongMode {
            action,
            expected,
            actual: self.mode(),
        }
    }
}

impl EventSubscriber<GameCommand> for SceneFlowController {
    fn on_event(&mut self, event: EngineEvent<GameCommand>, ctx: &mut EngineContext) {
        match event {
            EngineEvent::SceneActivated { scene, bindings } => {
                self.on_scene_activated(ctx, scene, bindings);
            }
            EngineEvent::AnimationFinished(finished) => self.on_animation_finished(ctx, finished),
            EngineEvent::Tick { dt_seconds } => self.tick(dt_seconds),
            EngineEvent::Command(command) => {
                if let Err(error) = self.handle_command(ctx, command) {
                    warn!(command = ?command, error = %error, "game_command_rejected");
                }
            }
        }
    }

    fn on_shutdown(&mut self, _ctx: &mut EngineContext) {
        info!(
            mode = ?self.mode(),
            finished_levels = self.progress.finished_levels.len(),
            "scene_flow_shutdown"
        );
    }
}
