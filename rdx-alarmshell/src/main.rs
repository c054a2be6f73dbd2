use alarmclock::prelude::*;
use alarmclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            let colored_command = command.yellow().bold();
            let colored_rest = rest.yellow();
            Cow::Owned(format!("{} {}", colored_command, colored_rest))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

type ShellEditor = Editor<MyHighlighter, DefaultHistory>;

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.green());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", "-".repeat(72).dimmed());
    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());
    println!("{}", "-".repeat(72).dimmed());
}

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Raw hour, minute and second fields, validated by the engine.
    Add(String, String, String),
    List,
    /// 1-based list position; `None` when no position was given.
    Delete(Option<usize>),
    DeleteAll,
    Disable(usize),
    Enable(usize),
    /// Silence one alarm by position, or every ringing alarm.
    Stop(Option<usize>),
    /// Switch to the given format, or toggle.
    Format(Option<ClockFormat>),
    Time,
    Help,
    Exit,
    Empty,
}

fn parse_position(arg: Option<&&str>, usage: &str) -> Result<usize, String> {
    let arg = arg.ok_or_else(|| format!("Usage: {usage}"))?;
    arg.parse::<usize>()
        .map_err(|_| format!("Error: '{arg}' is not a list position. Use 'list' to see them."))
}

fn parse_command(line: &str) -> Result<Command, String> {
    let args = line.split_whitespace().collect::<Vec<_>>();
    let Some(command) = args.first() else {
        return Ok(Command::Empty);
    };
    match *command {
        "add" => match &args[1..] {
            [time] => {
                let parts: Vec<&str> = time.split(':').collect();
                match parts.as_slice() {
                    [h, m, s] => Ok(Command::Add(h.to_string(), m.to_string(), s.to_string())),
                    _ => Err("Usage: add <H> <M> <S>  or  add <HH:MM:SS>".to_string()),
                }
            }
            [h, m, s] => Ok(Command::Add(h.to_string(), m.to_string(), s.to_string())),
            _ => Err("Usage: add <H> <M> <S>  or  add <HH:MM:SS>".to_string()),
        },
        "list" | "ls" => Ok(Command::List),
        "delete" | "rm" => match args.get(1) {
            Some(&"all") => Ok(Command::DeleteAll),
            None => Ok(Command::Delete(None)),
            arg => parse_position(arg, "delete <N> | delete all").map(|n| Command::Delete(Some(n))),
        },
        "disable" => parse_position(args.get(1), "disable <N>").map(Command::Disable),
        "enable" => parse_position(args.get(1), "enable <N>").map(Command::Enable),
        "stop" => match args.get(1) {
            None => Ok(Command::Stop(None)),
            arg => parse_position(arg, "stop [N]").map(|n| Command::Stop(Some(n))),
        },
        "format" => match args.get(1) {
            None => Ok(Command::Format(None)),
            Some(arg) => arg
                .parse::<ClockFormat>()
                .map(|format| Command::Format(Some(format)))
                .map_err(|e| format!("Error: {e}")),
        },
        "time" => Ok(Command::Time),
        "help" => Ok(Command::Help),
        "exit" | "quit" => Ok(Command::Exit),
        _ => Err(format!("Unknown command: '{}'. Type 'help'.", line.trim())),
    }
}

/// Converts a 1-based list position into an alarm id.
async fn alarm_at(engine: &AlarmClockEngine, position: usize) -> Option<AlarmId> {
    match position.checked_sub(1) {
        Some(index) => engine.id_at(index).await,
        None => None,
    }
}

async fn print_alarms(engine: &AlarmClockEngine) {
    let alarms = engine.list().await;
    if alarms.is_empty() {
        println!("No alarms set. Use 'add' to set one.");
        return;
    }
    println!("Alarms:");
    for (index, alarm) in alarms.iter().enumerate() {
        let status = match alarm.state {
            AlarmState::Enabled => alarm.state.to_string().green(),
            AlarmState::Fired => alarm.state.to_string().red().bold(),
            _ => alarm.state.to_string().dimmed(),
        };
        println!(
            "  {:2}. {} [{}]",
            index + 1,
            engine.display(alarm.time_of_day).await,
            status
        );
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  add <H> <M> <S>       - Sets an alarm (also: add HH:MM:SS).");
    println!("  list                  - Shows alarms and their positions.");
    println!("  delete <N>            - Deletes the alarm at position N.");
    println!("  delete all            - Deletes every alarm.");
    println!("  disable <N>           - Turns off the alarm at position N.");
    println!("  enable <N>            - Re-arms the alarm at position N.");
    println!("  stop [N]              - Silences ringing alarms (or just N).");
    println!("  format [12h|24h]      - Switches the time format (toggles without argument).");
    println!("  time                  - Shows the current time.");
    println!("  exit                  - Quits the shell.");
}

/// Runs one command. Returns `false` when the shell should exit.
async fn execute(engine: &AlarmClockEngine, rl: &mut ShellEditor, command: Command) -> bool {
    match command {
        Command::Add(h, m, s) => match engine.set_alarm(&h, &m, &s).await {
            Ok(id) => {
                if let Some(alarm) = engine.get(id).await {
                    println!(
                        "--> Alarm set for {}.",
                        engine.display(alarm.time_of_day).await
                    );
                }
            }
            Err(e) => println!("Error: {e}"),
        },
        Command::List => print_alarms(engine).await,
        Command::Delete(Some(0)) => println!("Error: positions start at 1."),
        Command::Delete(position) => {
            match engine.remove_selected(position.map(|n| n - 1)).await {
                Ok(removed) => println!(
                    "--> Deleted alarm for {}.",
                    engine.display(removed.time_of_day).await
                ),
                Err(SelectionError::OutOfRange { position, .. }) => println!(
                    "Error: no alarm at position {}. Use 'list' to see alarm positions.",
                    position + 1
                ),
                Err(e) => println!("Error: {e}. Use 'list' and pick a position to delete."),
            }
        }
        Command::DeleteAll => {
            if engine.list().await.is_empty() {
                println!("There are no alarms to delete.");
            } else {
                let answer = rl.readline("Delete ALL alarms? [y/N] ").unwrap_or_default();
                if answer.trim().eq_ignore_ascii_case("y") {
                    let count = engine.remove_all().await;
                    println!("--> Deleted {count} alarm(s).");
                } else {
                    println!("--> Nothing deleted.");
                }
            }
        }
        Command::Disable(position) => match alarm_at(engine, position).await {
            Some(id) => {
                if engine.disable(id).await {
                    println!("--> Alarm #{position} disabled.");
                } else {
                    println!("--> Alarm #{position} is not active.");
                }
            }
            None => println!("Error: no alarm at position {position}."),
        },
        Command::Enable(position) => match alarm_at(engine, position).await {
            Some(id) => match engine.enable(id).await {
                Ok(true) => println!("--> Alarm #{position} re-armed."),
                Ok(false) => println!("--> Alarm #{position} is already active."),
                Err(e) => println!("Error: {e}"),
            },
            None => println!("Error: no alarm at position {position}."),
        },
        Command::Stop(None) => {
            if engine.acknowledge_all().await.is_empty() {
                println!("--> No alarm is ringing.");
            }
        }
        Command::Stop(Some(position)) => match alarm_at(engine, position).await {
            Some(id) => {
                if !engine.acknowledge(id).await {
                    println!("--> Alarm #{position} is not ringing.");
                }
            }
            None => println!("Error: no alarm at position {position}."),
        },
        Command::Format(format) => {
            let format = match format {
                Some(format) => {
                    engine.set_format(format).await;
                    format
                }
                None => engine.toggle_format().await,
            };
            println!("--> Showing times in {format} format.");
        }
        Command::Time => println!("{}", engine.display_now().await.green().bold()),
        Command::Help => print_help(),
        Command::Exit => return false,
        Command::Empty => {}
    }
    true
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    let config = AlarmClockConfig::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .init();

    let engine = AlarmClockEngine::new(config);
    let engine_handle = engine.clone();
    engine_handle.attach_sink(Arc::new(TerminalSink::new(
        engine_handle.config().sound.clone(),
        engine_handle.beep_interval(),
    )));

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut rl: ShellEditor = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!(
        "{} is running. It is {}. Type 'help' for commands or 'exit' to quit.",
        ENGINE_NAME.cyan(),
        engine_handle.display_now().await.green().bold()
    );

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                match parse_command(&line) {
                    Ok(command) => {
                        if !execute(&engine_handle, &mut rl, command).await {
                            break;
                        }
                    }
                    Err(message) => println!("{message}"),
                }
            }
            Err(_) => {
                println!("Exiting alarmshell...");
                break;
            }
        }
    }

    engine_handle.acknowledge_all().await;
    Ok(())
}
