use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::StartupError;

use super::console::{ConsoleCommandProcessor, ConsoleOutcome, EngineCommand};
use super::context::EngineContext;
use super::events::{EngineEvent, EventBus, EventBusError, EventSubscriber};
use super::scene::{SceneId, SceneRegistry, SceneRegistryError};

const MAX_SCENE_LOADS_PER_PUMP: usize = 8;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub boot_scene: SceneId,
    pub max_settle_seconds: f32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            boot_scene: SceneId::new("MainMenu"),
            max_settle_seconds: 30.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    SceneRegistry(#[from] SceneRegistryError),
    #[error(transparent)]
    Subscribe(#[from] EventBusError),
    #[error("failed to read console input: {0}")]
    ReadInput(#[source] io::Error),
    #[error("failed to write console output: {0}")]
    WriteOutput(#[source] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub ticks: u64,
    pub commands: u64,
    pub active_scene: Option<SceneId>,
    pub elapsed_seconds: f64,
}

/// Runs the fixed-tick headless loop: boots `config.boot_scene`, then feeds
/// console lines from `input` until it is exhausted or a quit is requested.
pub fn run_headless<C, R, W>(
    config: &LoopConfig,
    registry: SceneRegistry,
    subscriber: &mut dyn EventSubscriber<C>,
    console: &ConsoleCommandProcessor<C>,
    input: R,
    output: &mut W,
) -> Result<RunSummary, AppError>
where
    C: 'static,
    R: BufRead,
    W: Write,
{
    let target_tps = config.target_tps.max(1);
    let fixed_dt_seconds = 1.0 / target_tps as f32;
    let max_settle_ticks = ticks_for(config.max_settle_seconds, target_tps);
    info!(
        target_tps,
        boot_scene = %config.boot_scene,
        scene_count = registry.scene_count(),
        max_settle_ticks,
        "loop_config"
    );

    let mut bus = EventBus::new();
    bus.subscribe(subscriber)?;
    let mut runner = Runner {
        ctx: EngineContext::new(registry),
        bus,
        fixed_dt_seconds,
        ticks: 0,
    };
    runner.ctx.request_scene_load(config.boot_scene.clone());
    runner.pump_scene_loads();

    let mut commands = 0_u64;
    for line in input.lines() {
        let line = line.map_err(AppError::ReadInput)?;
        match console.process_line(&line) {
            ConsoleOutcome::Nothing => continue,
            ConsoleOutcome::Output(lines) => {
                for text in lines {
                    writeln!(output, "{text}").map_err(AppError::WriteOutput)?;
                }
            }
            ConsoleOutcome::Engine(EngineCommand::Wait { seconds }) => {
                runner.run_ticks(ticks_for(seconds, target_tps));
            }
            ConsoleOutcome::Engine(EngineCommand::Settle) => runner.settle(max_settle_ticks),
            ConsoleOutcome::Engine(EngineCommand::LoadScene { scene }) => {
                runner.ctx.request_scene_load(scene);
                runner.pump_scene_loads();
            }
            ConsoleOutcome::Engine(EngineCommand::Quit) => {
                info!(reason = "console", "shutdown_requested");
                break;
            }
            ConsoleOutcome::Game(command) => {
                runner.bus.publish(EngineEvent::Command(command), &mut runner.ctx);
                runner.pump_scene_loads();
            }
        }
        commands += 1;
        if runner.ctx.quit_requested() {
            info!(reason = "subscriber", "shutdown_requested");
            break;
        }
    }

    let Runner {
        mut ctx,
        mut bus,
        ticks,
        ..
    } = runner;
    bus.shutdown(&mut ctx);
    let summary = RunSummary {
        ticks,
        commands,
        active_scene: ctx.active_scene().cloned(),
        elapsed_seconds: ctx.elapsed_seconds(),
    };
    info!(
        ticks = summary.ticks,
        commands = summary.commands,
        elapsed_seconds = summary.elapsed_seconds,
        "loop_finished"
    );
    Ok(summary)
}

struct Runner<'a, C> {
    ctx: EngineContext,
    bus: EventBus<'a, C>,
    fixed_dt_seconds: f32,
    ticks: u64,
}

impl<'a, C> Runner<'a, C> {
    fn tick(&mut self) {
        let mut finished_batch = self.ctx.advance(self.fixed_dt_seconds).into_iter();
        while let Some(finished) = finished_batch.next() {
            debug!(animator = %finished.animator, clip = %finished.clip, "animation_finished");
            self.bus
                .publish(EngineEvent::AnimationFinished(finished), &mut self.ctx);
            if self.pump_scene_loads() > 0 {
                // Clips finished this tick belong to the scene that was just replaced.
                let dropped = finished_batch.count();
                if dropped > 0 {
                    debug!(dropped, "stale_animation_events_dropped");
                }
                break;
            }
        }
        self.bus.publish(
            EngineEvent::Tick {
                dt_seconds: self.fixed_dt_seconds,
            },
            &mut self.ctx,
        );
        self.pump_scene_loads();
        self.ticks += 1;
    }

    fn run_ticks(&mut self, count: u64) {
        for _ in 0..count {
            self.tick();
        }
    }

    fn settle(&mut self, max_ticks: u64) {
        let mut spent = 0_u64;
        while self.ctx.is_animating() {
            if spent == max_ticks {
                warn!(max_ticks, "settle_limit_reached");
                return;
            }
            self.tick();
            spent += 1;
        }
    }

    /// Activates queued scene loads and returns how many were activated.
    fn pump_scene_loads(&mut self) -> usize {
        let mut loaded = 0;
        for _ in 0..MAX_SCENE_LOADS_PER_PUMP {
            let Some(scene) = self.ctx.take_pending_scene_load() else {
                return loaded;
            };
            loaded += 1;
            let bindings = self.ctx.activate_scene(scene.clone());
            info!(
                scene = %scene,
                animator_count = bindings.animator_count(),
                "scene_loaded"
            );
            self.bus
                .publish(EngineEvent::SceneActivated { scene, bindings }, &mut self.ctx);
        }
        if self.ctx.pending_scene_load().is_some() {
            warn!(
                limit = MAX_SCENE_LOADS_PER_PUMP,
                "scene_load_chain_deferred"
            );
        }
        loaded
    }
}

fn ticks_for(seconds: f32, target_tps: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * target_tps as f32).ceil() as u64
}
