use std::collections::HashMap;

use super::scene::SceneId;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Wait { seconds: f32 },
    Settle,
    LoadScene { scene: SceneId },
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocalAction {
    Help,
    Echo { text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedCommand<C> {
    Local(LocalAction),
    Engine(EngineCommand),
    Game(C),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandParseError {
    pub reason: String,
    pub usage: String,
}

impl CommandParseError {
    pub fn new(reason: impl Into<String>, usage: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            usage: usage.into(),
        }
    }
}

/// What a single console line turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleOutcome<C> {
    Nothing,
    Output(Vec<String>),
    Engine(EngineCommand),
    Game(C),
}

type ParseFn<C> = dyn Fn(&[String]) -> Result<ParsedCommand<C>, CommandParseError>;
type BuiltinParser<C> = fn(&[String]) -> Result<ParsedCommand<C>, CommandParseError>;

struct CommandSpec<C> {
    name: String,
    help: String,
    arg_schema: String,
    parse: Box<ParseFn<C>>,
}

pub struct ConsoleCommandRegistry<C> {
    specs: Vec<CommandSpec<C>>,
    lookup_by_lower_name: HashMap<String, usize>,
}

impl<C: 'static> Default for ConsoleCommandRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> ConsoleCommandRegistry<C> {
    pub fn new() -> Self {
        Self {
            specs: Vec::new(),
            lookup_by_lower_name: HashMap::new(),
        }
    }

    pub fn with_engine_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, &str, BuiltinParser<C>); 6] = [
            ("help", "List commands", "", parse_help_command::<C>),
            ("echo", "Print text", "<text...>", parse_echo_command::<C>),
            (
                "wait",
                "Advance time",
                "<seconds:f32>",
                parse_wait_command::<C>,
            ),
            (
                "settle",
                "Advance time until no animation plays",
                "",
                parse_settle_command::<C>,
            ),
            (
                "load_scene",
                "Load a scene directly",
                "<scene_id>",
                parse_load_scene_command::<C>,
            ),
            ("quit", "Quit app", "", parse_quit_command::<C>),
        ];
        for (name, help, arg_schema, parse) in builtins {
            registry
                .register(name, help, arg_schema, parse)
                .expect("built-in command registration should not fail");
        }
        registry
    }

    pub fn register<F>(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        arg_schema: impl Into<String>,
        parse: F,
    ) -> Result<(), String>
    where
        F: Fn(&[String]) -> Result<ParsedCommand<C>, CommandParseError> + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err("command name cannot be empty".to_string());
        }
        let lower = name.to_ascii_lowercase();
        if self.lookup_by_lower_name.contains_key(&lower) {
            return Err(format!("duplicate command registration: {name}"));
        }

        self.specs.push(CommandSpec {
            name,
            help: help.into(),
            arg_schema: arg_schema.into(),
            parse: Box::new(parse),
        });
        self.lookup_by_lower_name.insert(lower, self.specs.len() - 1);
        Ok(())
    }

    fn lookup(&self, input_name: &str) -> Option<&CommandSpec<C>> {
        let lower = input_name.to_ascii_lowercase();
        let index = self.lookup_by_lower_name.get(&lower)?;
        self.specs.get(*index)
    }

    fn iter_specs_in_order(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        // Help output order is registration order.
        self.specs.iter().map(|spec| {
            (
                spec.name.as_str(),
                spec.help.as_str(),
                spec.arg_schema.as_str(),
            )
        })
    }
}

pub struct ConsoleCommandProcessor<C> {
    registry: ConsoleCommandRegistry<C>,
}

impl<C: 'static> Default for ConsoleCommandProcessor<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> ConsoleCommandProcessor<C> {
    pub fn new() -> Self {
        Self {
            registry: ConsoleCommandRegistry::with_engine_builtins(),
        }
    }

    pub fn registry_mut(&mut self) -> &mut ConsoleCommandRegistry<C> {
        &mut self.registry
    }

    pub fn process_line(&self, raw_line: &str) -> ConsoleOutcome<C> {
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return ConsoleOutcome::Nothing;
        }

        let tokens = match tokenize_line(trimmed) {
            Ok(tokens) => tokens,
            Err(reason) => {
                return ConsoleOutcome::Output(vec![format!("error: {reason}. usage: help")]);
            }
        };
        let Some((command_name, args)) = tokens.split_first() else {
            return ConsoleOutcome::Nothing;
        };
        let Some(spec) = self.registry.lookup(command_name) else {
            return ConsoleOutcome::Output(vec![format!(
                "error: unknown command '{command_name}'. try: help"
            )]);
        };

        match (spec.parse)(args) {
            Ok(ParsedCommand::Local(action)) => {
                ConsoleOutcome::Output(self.apply_local_action(action))
            }
            Ok(ParsedCommand::Engine(command)) => ConsoleOutcome::Engine(command),
            Ok(ParsedCommand::Game(command)) => ConsoleOutcome::Game(command),
            Err(error) => ConsoleOutcome::Output(vec![format!(
                "error: {}. usage: {}",
                error.reason, error.usage
            )]),
        }
    }

    fn apply_local_action(&self, action: LocalAction) -> Vec<String> {
        match action {
            LocalAction::Help => self
                .registry
                .iter_specs_in_order()
                .map(|(name, help, arg_schema)| {
                    if arg_schema.is_empty() {
                        format!("{name} - {help}")
                    } else {
                        format!("{name} {arg_schema} - {help}")
                    }
                })
                .collect(),
            LocalAction::Echo { text } => vec![text],
        }
    }
}

fn tokenize_line(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut seen_token_content = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
                seen_token_content = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if seen_token_content {
                    tokens.push(std::mem::take(&mut current));
                    seen_token_content = false;
                }
            }
            _ => {
                current.push(ch);
                seen_token_content = true;
            }
        }
    }

    if in_quotes {
        return Err("unterminated quoted string".to_string());
    }
    if seen_token_content {
        tokens.push(current);
    }

    Ok(tokens)
}

pub fn require_no_args(args: &[String], usage: &str) -> Result<(), CommandParseError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(CommandParseError::new("unexpected extra arguments", usage))
    }
}

pub fn require_single_arg<'a>(
    args: &'a [String],
    name: &str,
    usage: &str,
) -> Result<&'a str, CommandParseError> {
    match args {
        [single] => Ok(single.as_str()),
        _ => Err(CommandParseError::new(
            format!("expected exactly one argument <{name}>"),
            usage,
        )),
    }
}

fn parse_help_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    require_no_args(args, "help")?;
    Ok(ParsedCommand::Local(LocalAction::Help))
}

fn parse_echo_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    if args.is_empty() {
        return Err(CommandParseError::new(
            "missing required argument <text...>",
            "echo <text...>",
        ));
    }
    Ok(ParsedCommand::Local(LocalAction::Echo {
        text: args.join(" "),
    }))
}

fn parse_wait_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    let raw = require_single_arg(args, "seconds", "wait <seconds>")?;
    let seconds = raw
        .parse::<f32>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .ok_or_else(|| {
            CommandParseError::new(
                format!("invalid seconds '{raw}' (expected non-negative f32)"),
                "wait <seconds>",
            )
        })?;
    Ok(ParsedCommand::Engine(EngineCommand::Wait { seconds }))
}

fn parse_settle_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    require_no_args(args, "settle")?;
    Ok(ParsedCommand::Engine(EngineCommand::Settle))
}

fn parse_load_scene_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    let scene = require_single_arg(args, "scene_id", "load_scene <scene_id>")?;
    Ok(ParsedCommand::Engine(EngineCommand::LoadScene {
        scene: SceneId::new(scene),
    }))
}

fn parse_quit_command<C>(args: &[String]) -> Result<ParsedCommand<C>, CommandParseError> {
    require_no_args(args, "quit")?;
    Ok(ParsedCommand::Engine(EngineCommand::Quit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum TestCommand {
        Jump { height: u32 },
    }

    fn parse_jump(args: &[String]) -> Result<ParsedCommand<TestCommand>, CommandParseError> {
        let raw = require_single_arg(args, "height", "jump <height>")?;
        let height = raw.parse::<u32>().map_err(|_| {
            CommandParseError::new(format!("invalid height '{raw}'"), "jump <height>")
        })?;
        Ok(ParsedCommand::Game(TestCommand::Jump { height }))
    }

    fn processor() -> ConsoleCommandProcessor<TestCommand> {
        let mut processor = ConsoleCommandProcessor::new();
        processor
            .registry_mut()
            .register("jump", "Jump", "<height:u32>", parse_jump)
            .expect("register jump");
        processor
    }

    #[test]
    fn help_lists_commands_in_registration_order() {
        let ConsoleOutcome::Output(lines) = processor().process_line("help") else {
            panic!("help should print");
        };

        assert_eq!(lines[0], "help - List commands");
        assert_eq!(lines[1], "echo <text...> - Print text");
        assert_eq!(lines[2], "wait <seconds:f32> - Advance time");
        assert_eq!(lines[3], "settle - Advance time until no animation plays");
        assert_eq!(lines[4], "load_scene <scene_id> - Load a scene directly");
        assert_eq!(lines[5], "quit - Quit app");
        assert_eq!(lines[6], "jump <height:u32> - Jump");
    }

    #[test]
    fn unknown_command_reports_clear_error() {
        assert_eq!(
            processor().process_line("nope"),
            ConsoleOutcome::Output(vec!["error: unknown command 'nope'. try: help".to_string()])
        );
    }

    #[test]
    fn bad_args_report_usage_hint() {
        assert_eq!(
            processor().process_line("wait soon"),
            ConsoleOutcome::Output(vec![
                "error: invalid seconds 'soon' (expected non-negative f32). usage: wait <seconds>"
                    .to_string()
            ])
        );
    }

    #[test]
    fn engine_and_game_commands_are_returned() {
        let processor = processor();

        assert_eq!(
            processor.process_line("wait 1.5"),
            ConsoleOutcome::Engine(EngineCommand::Wait { seconds: 1.5 })
        );
        assert_eq!(
            processor.process_line("LOAD_SCENE WorldMap"),
            ConsoleOutcome::Engine(EngineCommand::LoadScene {
                scene: SceneId::new("WorldMap"),
            })
        );
        assert_eq!(
            processor.process_line("jump 3"),
            ConsoleOutcome::Game(TestCommand::Jump { height: 3 })
        );
    }

    #[test]
    fn blank_and_comment_lines_do_nothing() {
        let processor = processor();
        assert_eq!(processor.process_line("   "), ConsoleOutcome::Nothing);
        assert_eq!(processor.process_line("# intro"), ConsoleOutcome::Nothing);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut processor = processor();
        assert!(processor
            .registry_mut()
            .register("Jump", "again", "", parse_jump)
            .is_err());
    }

    #[test]
    fn tokenizer_handles_quotes_and_errors() {
        assert_eq!(
            tokenize_line("echo \"hello there\" 1").expect("tokens"),
            vec!["echo", "hello there", "1"]
        );
        assert_eq!(
            tokenize_line("echo \"\"").expect("tokens"),
            vec!["echo", ""]
        );
        assert!(tokenize_line("echo \"oops").is_err());
    }
}
