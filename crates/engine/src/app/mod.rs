mod console;
mod context;
mod events;
mod loop_runner;
mod scene;
mod scheduler;

pub use console::{
    require_no_args, require_single_arg, CommandParseError, ConsoleCommandProcessor,
    ConsoleCommandRegistry, ConsoleOutcome, EngineCommand, LocalAction, ParsedCommand,
};
pub use context::{AnimationFinished, EngineContext};
pub use events::{EngineEvent, EventBus, EventBusError, EventSubscriber};
pub use loop_runner::{run_headless, AppError, LoopConfig, RunSummary};
pub use scene::{
    AnimatorId, SceneBindings, SceneId, SceneRegistry, SceneRegistryError, DEFAULT_CLIP_SECONDS,
};
pub use scheduler::{Scheduler, WaitWhile};
