use std::env;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;

use engine::{
    resolve_app_paths, AppPaths, ConsoleCommandProcessor, LoopConfig, SceneRegistry,
    SceneRegistryError, StartupError,
};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::commands::{register_game_commands, GameCommand};
use super::flow::{CatalogError, GameCatalog, LogPresentation, ProgressStore, SceneFlowController};

const SAVE_SLOT_ENV_VAR: &str = "DREAMLAND_SAVE_SLOT";
const SCENE_MANIFEST_FILE: &str = "scenes.json";
const CATALOG_FILE: &str = "worlds.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scenes: SceneRegistry,
    pub(crate) controller: SceneFlowController,
    pub(crate) console: ConsoleCommandProcessor<GameCommand>,
    pub(crate) input: Box<dyn BufRead>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    SceneRegistry(#[from] SceneRegistryError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("invalid DREAMLAND_SAVE_SLOT value '{value}' (expected a non-negative integer)")]
    InvalidSaveSlot { value: String },
    #[error("failed to open command script '{path}': {source}")]
    Script {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to register console commands: {0}")]
    Console(String),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Dreamland Startup ===");

    let paths = resolve_app_paths()?;
    let slot = parse_save_slot(env::var(SAVE_SLOT_ENV_VAR).ok())?;
    let input = open_command_input(env::args_os().nth(1).map(PathBuf::from))?;
    build_wiring(&paths, slot, input)
}

pub(crate) fn build_wiring(
    paths: &AppPaths,
    slot: u32,
    input: Box<dyn BufRead>,
) -> Result<AppWiring, BootstrapError> {
    let scenes = SceneRegistry::load(&paths.content_dir.join(SCENE_MANIFEST_FILE))?;
    let catalog = GameCatalog::load(&paths.content_dir.join(CATALOG_FILE))?;
    let store = ProgressStore::for_slot(&paths.save_dir, slot);
    info!(
        root = %paths.root.display(),
        save = %store.path().display(),
        scene_count = scenes.scene_count(),
        "app_paths"
    );

    let config = LoopConfig {
        boot_scene: catalog.main_menu_scene().clone(),
        ..LoopConfig::default()
    };
    let controller = SceneFlowController::new(catalog, store, Box::new(LogPresentation));
    let mut console = ConsoleCommandProcessor::new();
    register_game_commands(&mut console).map_err(BootstrapError::Console)?;

    Ok(AppWiring {
        config,
        scenes,
        controller,
        console,
        input,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn parse_save_slot(raw: Option<String>) -> Result<u32, BootstrapError> {
    let Some(raw) = raw else {
        return Ok(0);
    };
    raw.trim()
        .parse::<u32>()
        .map_err(|_| BootstrapError::InvalidSaveSlot { value: raw })
}

fn open_command_input(script: Option<PathBuf>) -> Result<Box<dyn BufRead>, BootstrapError> {
    match script {
        Some(path) => {
            let file = File::open(&path).map_err(|source| BootstrapError::Script {
                path: path.clone(),
                source,
            })?;
            info!(script = %path.display(), "command_source_script");
            Ok(Box::new(BufReader::new(file)))
        }
        None => {
            info!("command_source_stdin");
            Ok(Box::new(io::stdin().lock()))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn save_slot_defaults_to_zero() {
        assert_eq!(parse_save_slot(None).expect("default"), 0);
        assert_eq!(parse_save_slot(Some(" 3 ".to_string())).expect("slot"), 3);
    }

    #[test]
    fn save_slot_rejects_garbage() {
        let error = parse_save_slot(Some("-1".to_string())).expect_err("negative");
        assert_eq!(
            error.to_string(),
            "invalid DREAMLAND_SAVE_SLOT value '-1' (expected a non-negative integer)"
        );
    }

    #[test]
    fn missing_script_is_reported() {
        let temp = TempDir::new().expect("temp");
        let path = temp.path().join("missing.txt");

        let error = open_command_input(Some(path.clone())).err().expect("missing script");
        assert!(matches!(&error, BootstrapError::Script { path: reported, .. } if *reported == path));
    }

    #[test]
    fn missing_content_fails_wiring() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::from_root(temp.path().to_path_buf());

        let error = build_wiring(&paths, 0, Box::new(Cursor::new(Vec::new())))
            .err()
            .expect("missing content");
        assert!(matches!(error, BootstrapError::SceneRegistry(_)));
    }

    #[test]
    fn invalid_catalog_fails_wiring() {
        let temp = TempDir::new().expect("temp");
        let paths = AppPaths::from_root(temp.path().to_path_buf());
        fs::create_dir_all(&paths.content_dir).expect("content dir");
        fs::write(paths.content_dir.join(SCENE_MANIFEST_FILE), r#"{"scenes": []}"#)
            .expect("scenes");
        fs::write(
            paths.content_dir.join(CATALOG_FILE),
            r#"{"main_menu_scene": "Menu", "world_map_scene": "Map", "worlds": []}"#,
        )
        .expect("worlds");

        let error = build_wiring(&paths, 0, Box::new(Cursor::new(Vec::new())))
            .err()
            .expect("invalid catalog");
        assert_eq!(
            error.to_string(),
            "validation failed at worlds: expected at least one world, got 0"
        );
    }
}
