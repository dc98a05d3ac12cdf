use engine::{AnimatorId, EngineContext, SceneBindings};
use tracing::{debug, warn};

pub const TRANSITION_ANIMATOR: &str = "transition";
pub const FADE_IN_CLIP: &str = "fade_in";
pub const FADE_OUT_CLIP: &str = "fade_out";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Idle,
    FadingIn,
    FadingOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    FadeIn,
    FadeOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeTrigger {
    Started,
    AlreadyRunning,
    /// The scene has no transition animator; nothing was played.
    Unavailable,
}

/// Single-flight fade state machine bound to the active scene's transition
/// animator.
#[derive(Debug, Clone)]
pub struct TransitionGate {
    animator: Option<AnimatorId>,
    state: GateState,
}

impl Default for TransitionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionGate {
    pub fn new() -> Self {
        Self {
            animator: None,
            state: GateState::Idle,
        }
    }

    /// Rebinds the gate to a freshly activated scene and forgets any fade of
    /// the previous one.
    pub fn reset(&mut self, bindings: &SceneBindings) {
        self.animator = bindings.animator(TRANSITION_ANIMATOR);
        self.state = GateState::Idle;
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_available(&self) -> bool {
        self.animator.is_some()
    }

    pub fn is_transitioning(&self) -> bool {
        self.state != GateState::Idle
    }

    pub fn fade_in(&mut self, ctx: &mut EngineContext) -> FadeTrigger {
        self.trigger(ctx, GateState::FadingIn, FADE_IN_CLIP)
    }

    pub fn fade_out(&mut self, ctx: &mut EngineContext) -> FadeTrigger {
        self.trigger(ctx, GateState::FadingOut, FADE_OUT_CLIP)
    }

    fn trigger(&mut self, ctx: &mut EngineContext, target: GateState, clip: &str) -> FadeTrigger {
        let Some(animator) = &self.animator else {
            warn!(clip, "transition_animator_missing");
            return FadeTrigger::Unavailable;
        };
        if self.state == target {
            debug!(clip, "fade_already_running");
            return FadeTrigger::AlreadyRunning;
        }
        if !ctx.play_animation(animator, clip) {
            return FadeTrigger::Unavailable;
        }
        debug!(from = ?self.state, to = ?target, "fade_started");
        self.state = target;
        FadeTrigger::Started
    }

    /// Returns the gate to idle and reports which fade just ended. The caller
    /// dispatches on the returned phase, so its handler may start a new fade.
    pub fn notify_animation_complete(&mut self) -> Option<FadePhase> {
        let phase = match self.state {
            GateState::FadingIn => FadePhase::FadeIn,
            GateState::FadingOut => FadePhase::FadeOut,
            GateState::Idle => {
                warn!("fade_completion_while_idle");
                return None;
            }
        };
        self.state = GateState::Idle;
        Some(phase)
    }
}
