//! Interactive console for a running shell.
//!
//! Plain text typed here is forwarded key by key to the page's search box,
//! standing in for the on-screen keyboard. Lines starting with `/` are
//! commands; type `/help` for the list, Tab for completion.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::completion::{Completer, Pair};
use rustyline::config::CompletionType;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Config, Editor, Helper};
use tokio::sync::mpsc;

use crate::keyboard::KeyCommand;
use crate::navigation::NavigationController;

/// Available console commands.
const COMMANDS: &[(&str, &str)] = &[
    ("/go", "Navigate to a URL"),
    ("/url", "Show the current URL"),
    ("/keyboard", "Open the keyboard"),
    ("/close", "Close the keyboard"),
    ("/back", "Delete the last character in the search box"),
    ("/space", "Type a space into the search box"),
    ("/stats", "Show request filtering totals"),
    ("/reload", "Reload the rules file"),
    ("/help", "Show available commands"),
    ("/exit", "Quit the shell"),
];

/// One parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Go(String),
    Url,
    Keyboard,
    CloseKeyboard,
    Backspace,
    Space,
    Stats,
    Reload,
    Help,
    Exit,
    /// Text to forward one character at a time.
    Type(String),
    Unknown(String),
    Empty,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
        if line.trim().is_empty() {
            return ReplCommand::Empty;
        }

        let Some(input) = line.trim_start().strip_prefix('/') else {
            return ReplCommand::Type(line.to_string());
        };

        let mut parts = input.splitn(2, ' ');
        let cmd = parts.next().unwrap_or("");
        let args = parts.next().unwrap_or("").trim();

        match cmd {
            "go" if !args.is_empty() => ReplCommand::Go(args.to_string()),
            "url" => ReplCommand::Url,
            "keyboard" | "kb" => ReplCommand::Keyboard,
            "close" => ReplCommand::CloseKeyboard,
            "back" => ReplCommand::Backspace,
            "space" => ReplCommand::Space,
            "stats" => ReplCommand::Stats,
            "reload" => ReplCommand::Reload,
            "help" | "" => ReplCommand::Help,
            "exit" | "quit" => ReplCommand::Exit,
            other => ReplCommand::Unknown(other.to_string()),
        }
    }
}

/// Helper for tab completion of commands.
#[derive(Default)]
struct ShellHelper;

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        if !input.starts_with('/') || input.contains(' ') {
            return Ok((pos, Vec::new()));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, desc)| Pair {
                display: format!("{cmd:<12} {desc}"),
                replacement: format!("{cmd} "),
            })
            .collect();
        Ok((0, matches))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &rustyline::Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') || line.contains(' ') {
            return None;
        }
        COMMANDS
            .iter()
            .find(|(cmd, _)| cmd.starts_with(line) && *cmd != line)
            .map(|(cmd, _)| cmd[line.len()..].to_string())
    }
}

impl Highlighter for ShellHelper {}
impl Validator for ShellHelper {}
impl Helper for ShellHelper {}

/// Read lines on a dedicated thread; the channel closes on EOF or Ctrl-C.
fn spawn_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();

    std::thread::spawn(move || {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(true)
            .completion_type(CompletionType::List)
            .build();

        let mut rl: Editor<ShellHelper, rustyline::history::DefaultHistory> =
            match Editor::with_config(config) {
                Ok(rl) => rl,
                Err(e) => {
                    tracing::warn!("console unavailable: {e}");
                    return;
                }
            };
        rl.set_helper(Some(ShellHelper));

        loop {
            match rl.readline(" adshield> ") {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    tracing::warn!("console read failed: {e}");
                    break;
                }
            }
        }
    });

    rx
}

/// Run the console until `/exit`, EOF or Ctrl-C.
pub async fn run(controller: &mut NavigationController, rules_path: Option<PathBuf>) -> Result<()> {
    eprintln!();
    eprintln!(
        "  \x1b[1madshield-shell v{}\x1b[0m \x1b[90m— type to search, /help for commands\x1b[0m",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!();

    let mut lines = spawn_reader();
    while let Some(line) = lines.recv().await {
        if !execute(controller, ReplCommand::parse(&line), rules_path.as_ref()).await {
            break;
        }
    }
    Ok(())
}

/// Apply one command. Returns `false` when the console should stop.
pub async fn execute(
    controller: &mut NavigationController,
    command: ReplCommand,
    rules_path: Option<&PathBuf>,
) -> bool {
    match command {
        ReplCommand::Empty => {}
        ReplCommand::Exit => return false,
        ReplCommand::Help => {
            for (cmd, desc) in COMMANDS {
                eprintln!("  {cmd:<12} {desc}");
            }
        }
        ReplCommand::Go(url) => {
            if let Err(e) = controller.navigate(&url).await {
                eprintln!("  Error: {e:#}");
            }
        }
        ReplCommand::Url => match controller.current_url().await {
            Ok(url) => eprintln!("  {url}"),
            Err(e) => eprintln!("  Error: {e:#}"),
        },
        ReplCommand::Keyboard => {
            controller.show_keyboard();
        }
        ReplCommand::CloseKeyboard => {
            if !controller.close_keyboard() {
                eprintln!("  Keyboard is not open");
            }
        }
        ReplCommand::Backspace => forward(controller, KeyCommand::Backspace).await,
        ReplCommand::Space => forward(controller, KeyCommand::Insert(" ".into())).await,
        // Typed text is literal; only /back deletes.
        ReplCommand::Type(text) => {
            for ch in text.chars() {
                forward(controller, KeyCommand::Insert(ch.to_string())).await;
            }
        }
        ReplCommand::Stats => {
            let stats = controller.stats();
            eprintln!(
                "  allowed {}  blocked {}  faults {}  navigations {}",
                stats.allowed,
                stats.blocked,
                stats.faults,
                controller.navigations()
            );
        }
        ReplCommand::Reload => match rules_path {
            Some(path) => match controller.shield().store().reload_from(path) {
                Ok(_) => eprintln!("  Rules reloaded; they apply from the next navigation"),
                Err(e) => eprintln!("  Error: {e} (previous rules kept)"),
            },
            None => eprintln!("  Using built-in rules; nothing to reload"),
        },
        ReplCommand::Unknown(cmd) => {
            eprintln!("  Unknown command /{cmd}. Type /help for commands.");
        }
    }
    true
}

async fn forward(controller: &mut NavigationController, command: KeyCommand) {
    if let Err(e) = controller.send_command(command).await {
        eprintln!("  Error: {e:#}");
    }
}
