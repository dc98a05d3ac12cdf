use engine::{
    require_no_args, require_single_arg, CommandParseError, ConsoleCommandProcessor,
    ParsedCommand,
};

use super::flow::{Direction, SPECIAL_ITEM_SLOTS};

/// Gameplay sensor and menu input the console forwards to the flow
/// controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameCommand {
    Start,
    Move(Direction),
    Interact,
    Back,
    Feather,
    Item { slot: usize },
    Finish,
    Die,
    Hurt,
    Warp { x: f32, y: f32 },
    Continue,
    QuitLevel,
    MainMenu,
}

type GameParser = fn(&[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError>;

pub fn register_game_commands(
    console: &mut ConsoleCommandProcessor<GameCommand>,
) -> Result<(), String> {
    let commands: [(&str, &str, &str, GameParser); 13] = [
        ("start", "Leave the main menu", "", parse_start),
        (
            "move",
            "Move on the world map",
            "<up|down|left|right>",
            parse_move,
        ),
        ("interact", "Use the current map node", "", parse_interact),
        ("back", "Return to the main menu from the map", "", parse_back),
        ("feather", "Collect a feather", "", parse_feather),
        ("item", "Collect a special item", "<slot:usize>", parse_item),
        ("finish", "Reach the end of the level", "", parse_finish),
        ("die", "Fall out of the level and restart it", "", parse_die),
        ("hurt", "Lose one life point", "", parse_hurt),
        (
            "warp",
            "Move through a door inside the level",
            "<x:f32> <y:f32>",
            parse_warp,
        ),
        ("continue", "Leave the level outro", "", parse_continue),
        ("quit_level", "Abandon the level", "", parse_quit_level),
        (
            "main_menu",
            "Abandon the level for the main menu",
            "",
            parse_main_menu,
        ),
    ];
    let registry = console.registry_mut();
    for (name, help, arg_schema, parse) in commands {
        registry.register(name, help, arg_schema, parse)?;
    }
    Ok(())
}

fn no_args(
    args: &[String],
    usage: &str,
    command: GameCommand,
) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    require_no_args(args, usage)?;
    Ok(ParsedCommand::Game(command))
}

fn parse_start(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "start", GameCommand::Start)
}

fn parse_move(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    let usage = "move <up|down|left|right>";
    let raw = require_single_arg(args, "direction", usage)?;
    let direction = raw
        .parse::<Direction>()
        .map_err(|reason| CommandParseError::new(reason, usage))?;
    Ok(ParsedCommand::Game(GameCommand::Move(direction)))
}

fn parse_interact(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "interact", GameCommand::Interact)
}

fn parse_back(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "back", GameCommand::Back)
}

fn parse_feather(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "feather", GameCommand::Feather)
}

fn parse_item(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    let usage = "item <slot>";
    let raw = require_single_arg(args, "slot", usage)?;
    let slot = raw
        .parse::<usize>()
        .ok()
        .filter(|slot| *slot < SPECIAL_ITEM_SLOTS)
        .ok_or_else(|| {
            CommandParseError::new(
                format!(
                    "invalid slot '{raw}' (expected 0..{})",
                    SPECIAL_ITEM_SLOTS - 1
                ),
                usage,
            )
        })?;
    Ok(ParsedCommand::Game(GameCommand::Item { slot }))
}

fn parse_finish(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "finish", GameCommand::Finish)
}

fn parse_die(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "die", GameCommand::Die)
}

fn parse_hurt(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "hurt", GameCommand::Hurt)
}

fn parse_warp(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    let usage = "warp <x> <y>";
    let [x, y] = args else {
        return Err(CommandParseError::new(
            "expected exactly two arguments <x> <y>",
            usage,
        ));
    };
    let coordinate = |raw: &str| {
        raw.parse::<f32>()
            .ok()
            .filter(|value| value.is_finite())
            .ok_or_else(|| CommandParseError::new(format!("invalid coordinate '{raw}'"), usage))
    };
    Ok(ParsedCommand::Game(GameCommand::Warp {
        x: coordinate(x.as_str())?,
        y: coordinate(y.as_str())?,
    }))
}

fn parse_continue(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "continue", GameCommand::Continue)
}

fn parse_quit_level(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "quit_level", GameCommand::QuitLevel)
}

fn parse_main_menu(args: &[String]) -> Result<ParsedCommand<GameCommand>, CommandParseError> {
    no_args(args, "main_menu", GameCommand::MainMenu)
}

#[cfg(test)]
mod tests {
    use engine::ConsoleOutcome;

    use super::*;

    fn console() -> ConsoleCommandProcessor<GameCommand> {
        let mut console = ConsoleCommandProcessor::new();
        register_game_commands(&mut console).expect("register");
        console
    }

    #[test]
    fn parses_gameplay_commands() {
        let console = console();

        assert_eq!(
            console.process_line("move Left"),
            ConsoleOutcome::Game(GameCommand::Move(Direction::Left))
        );
        assert_eq!(
            console.process_line("item 2"),
            ConsoleOutcome::Game(GameCommand::Item { slot: 2 })
        );
        assert_eq!(
            console.process_line("warp 12.5 -3"),
            ConsoleOutcome::Game(GameCommand::Warp { x: 12.5, y: -3.0 })
        );
        assert_eq!(
            console.process_line("QUIT_LEVEL"),
            ConsoleOutcome::Game(GameCommand::QuitLevel)
        );
        assert_eq!(
            console.process_line("hurt"),
            ConsoleOutcome::Game(GameCommand::Hurt)
        );
        assert_eq!(
            console.process_line("main_menu"),
            ConsoleOutcome::Game(GameCommand::MainMenu)
        );
    }

    #[test]
    fn rejects_non_finite_warp_coordinates() {
        let console = console();

        for line in ["warp NaN 0", "warp 0 inf", "warp -infinity 1"] {
            let ConsoleOutcome::Output(lines) = console.process_line(line) else {
                panic!("'{line}' should be rejected");
            };
            assert!(lines[0].starts_with("error: invalid coordinate"), "{lines:?}");
        }
    }

    #[test]
    fn rejects_out_of_range_slot() {
        let console = console();

        assert_eq!(
            console.process_line("item 4"),
            ConsoleOutcome::Output(vec![
                "error: invalid slot '4' (expected 0..3). usage: item <slot>".to_string()
            ])
        );
    }

    #[test]
    fn rejects_bad_direction_and_extra_args() {
        let console = console();

        assert!(matches!(
            console.process_line("move north"),
            ConsoleOutcome::Output(_)
        ));
        assert!(matches!(
            console.process_line("finish now"),
            ConsoleOutcome::Output(_)
        ));
        assert!(matches!(
            console.process_line("warp 1"),
            ConsoleOutcome::Output(_)
        ));
    }

    #[test]
    fn game_commands_follow_builtins_in_help() {
        let console = console();

        let ConsoleOutcome::Output(lines) = console.process_line("help") else {
            panic!("help should print");
        };
        let names: Vec<&str> = lines
            .iter()
            .filter_map(|line| line.split_whitespace().next())
            .collect();
        assert_eq!(names[..7], ["help", "echo", "wait", "settle", "load_scene", "quit", "start"]);
        assert!(names.contains(&"quit_level"));
    }

    #[test]
    fn registering_twice_fails() {
        let mut console = console();
        assert!(register_game_commands(&mut console).is_err());
    }
}
