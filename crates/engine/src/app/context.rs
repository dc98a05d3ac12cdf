use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::scene::{AnimatorId, SceneBindings, SceneId, SceneRegistry};

// Absorbs f32 drift from summing fixed tick steps.
pub(crate) const TIME_EPSILON_SECONDS: f32 = 1e-4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationFinished {
    pub animator: AnimatorId,
    pub clip: String,
}

#[derive(Debug, Clone)]
struct PlayingClip {
    clip: String,
    remaining_seconds: f32,
}

/// Host-side state a scene subscriber acts through: scene loading, animation
/// playback and the quit flag.
#[derive(Debug)]
pub struct EngineContext {
    registry: SceneRegistry,
    active_scene: Option<SceneId>,
    active_bindings: SceneBindings,
    pending_scene_load: Option<SceneId>,
    playing: BTreeMap<AnimatorId, PlayingClip>,
    elapsed_seconds: f64,
    quit_requested: bool,
}

impl EngineContext {
    pub fn new(registry: SceneRegistry) -> Self {
        Self {
            registry,
            active_scene: None,
            active_bindings: SceneBindings::empty(),
            pending_scene_load: None,
            playing: BTreeMap::new(),
            elapsed_seconds: 0.0,
            quit_requested: false,
        }
    }

    pub fn request_scene_load(&mut self, scene: SceneId) {
        if let Some(previous) = self.pending_scene_load.replace(scene) {
            warn!(superseded = %previous, "scene_load_superseded");
        }
    }

    pub fn pending_scene_load(&self) -> Option<&SceneId> {
        self.pending_scene_load.as_ref()
    }

    pub fn take_pending_scene_load(&mut self) -> Option<SceneId> {
        self.pending_scene_load.take()
    }

    /// Makes `scene` the active scene. Animations of the previous scene are
    /// dropped without completion signals since their objects are gone.
    pub fn activate_scene(&mut self, scene: SceneId) -> SceneBindings {
        let bindings = match self.registry.bindings_for(&scene) {
            Some(bindings) => bindings.clone(),
            None => {
                warn!(scene = %scene, "scene_not_in_manifest");
                SceneBindings::empty()
            }
        };
        if !self.playing.is_empty() {
            debug!(dropped = self.playing.len(), "scene_animations_dropped");
            self.playing.clear();
        }
        self.active_bindings = bindings.clone();
        self.active_scene = Some(scene);
        bindings
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active_scene.as_ref()
    }

    /// Starts `clip` on `animator`, replacing whatever that animator was
    /// playing. Returns `false` when the active scene has no such animator.
    pub fn play_animation(&mut self, animator: &AnimatorId, clip: &str) -> bool {
        let Some(seconds) = self.active_bindings.clip_seconds(animator.as_str(), clip) else {
            warn!(animator = %animator, clip, "animator_missing");
            return false;
        };
        let previous = self.playing.insert(
            animator.clone(),
            PlayingClip {
                clip: clip.to_string(),
                remaining_seconds: seconds,
            },
        );
        if let Some(previous) = previous {
            debug!(animator = %animator, interrupted = %previous.clip, clip, "animation_interrupted");
        }
        debug!(animator = %animator, clip, seconds, "animation_started");
        true
    }

    pub fn playing_clip(&self, animator: &str) -> Option<&str> {
        self.playing.get(animator).map(|playing| playing.clip.as_str())
    }

    pub fn is_animating(&self) -> bool {
        !self.playing.is_empty()
    }

    /// Advances playback and returns the clips that ran to completion, in
    /// animator order.
    pub fn advance(&mut self, dt_seconds: f32) -> Vec<AnimationFinished> {
        self.elapsed_seconds += f64::from(dt_seconds);
        let mut finished = Vec::new();
        self.playing.retain(|animator, playing| {
            playing.remaining_seconds -= dt_seconds;
            if playing.remaining_seconds <= TIME_EPSILON_SECONDS {
                finished.push(AnimationFinished {
                    animator: animator.clone(),
                    clip: std::mem::take(&mut playing.clip),
                });
                false
            } else {
                true
            }
        });
        finished
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_menu() -> EngineContext {
        let mut registry = SceneRegistry::new();
        registry.register(
            SceneId::new("MainMenu"),
            SceneBindings::empty()
                .with_animator("transition", &[("fade_in", 0.5), ("fade_out", 0.25)]),
        );
        EngineContext::new(registry)
    }

    fn transition() -> AnimatorId {
        AnimatorId::new("transition")
    }

    #[test]
    fn clip_finishes_after_its_duration() {
        let mut ctx = context_with_menu();
        ctx.activate_scene(SceneId::new("MainMenu"));
        assert!(ctx.play_animation(&transition(), "fade_in"));

        assert!(ctx.advance(0.25).is_empty());
        let finished = ctx.advance(0.25);

        assert_eq!(
            finished,
            vec![AnimationFinished {
                animator: transition(),
                clip: "fade_in".to_string(),
            }]
        );
        assert!(!ctx.is_animating());
    }

    #[test]
    fn replaying_an_animator_interrupts_previous_clip() {
        let mut ctx = context_with_menu();
        ctx.activate_scene(SceneId::new("MainMenu"));
        ctx.play_animation(&transition(), "fade_out");
        ctx.play_animation(&transition(), "fade_in");

        let finished = ctx.advance(1.0);

        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].clip, "fade_in");
    }

    #[test]
    fn missing_animator_refuses_playback() {
        let mut ctx = context_with_menu();
        ctx.activate_scene(SceneId::new("Unlisted"));

        assert!(!ctx.play_animation(&transition(), "fade_in"));
        assert!(!ctx.is_animating());
    }

    #[test]
    fn activation_drops_running_animations() {
        let mut ctx = context_with_menu();
        ctx.activate_scene(SceneId::new("MainMenu"));
        ctx.play_animation(&transition(), "fade_in");

        ctx.activate_scene(SceneId::new("MainMenu"));

        assert!(ctx.advance(1.0).is_empty());
    }

    #[test]
    fn later_scene_load_request_supersedes_earlier_one() {
        let mut ctx = context_with_menu();
        ctx.request_scene_load(SceneId::new("WorldMap"));
        ctx.request_scene_load(SceneId::new("MainMenu"));

        assert_eq!(ctx.take_pending_scene_load(), Some(SceneId::new("MainMenu")));
        assert_eq!(ctx.take_pending_scene_load(), None);
    }
}
