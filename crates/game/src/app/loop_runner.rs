use std::io::{self, Write};
use std::process::ExitCode;

use engine::{run_headless, AppError, RunSummary};
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let stdout = io::stdout();
    let mut output = stdout.lock();
    match run_with_output(app, &mut output) {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                commands = summary.commands,
                active_scene = ?summary.active_scene,
                "dreamland_exit"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "run_failed");
            ExitCode::FAILURE
        }
    }
}

fn run_with_output<W: Write>(app: AppWiring, output: &mut W) -> Result<RunSummary, AppError> {
    let AppWiring {
        config,
        scenes,
        mut controller,
        console,
        input,
    } = app;
    run_headless(&config, scenes, &mut controller, &console, input, output)
}
