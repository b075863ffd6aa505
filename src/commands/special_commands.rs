//! Special commands parser for the interactive chat
//!
//! Lines starting with `/` manage conversations and the model instead of
//! being sent to the backend. Command names are case-insensitive; their
//! arguments are kept as typed.

use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new conversation and make it active
    New,

    /// List stored conversations
    List,

    /// Make another conversation active (id or unique prefix)
    Switch(String),

    /// Delete a conversation (id or unique prefix)
    Delete(String),

    /// Show the current model, or switch to the named one
    Model(Option<String>),

    /// Display help information
    Help,

    /// Exit the session
    Exit,

    /// Not a special command; send the line as a message
    None,
}

/// Parse a line of input
///
/// # Errors
///
/// Returns [`CommandError`] for an unknown command or a missing argument
///
/// # Examples
///
/// ```
/// use chatline::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::New);
/// assert_eq!(
///     parse_special_command("/switch 3fa8").unwrap(),
///     SpecialCommand::Switch("3fa8".to_string())
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };
    let arg = (!arg.is_empty()).then(|| arg.to_string());

    let required = |command: &str, usage: &str, arg: Option<String>| {
        arg.ok_or_else(|| CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    };

    match name.as_str() {
        "/new" => Ok(SpecialCommand::New),
        "/list" | "/ls" => Ok(SpecialCommand::List),
        "/switch" => required("/switch", "/switch <id>", arg).map(SpecialCommand::Switch),
        "/delete" | "/rm" => required("/delete", "/delete <id>", arg).map(SpecialCommand::Delete),
        "/model" => Ok(SpecialCommand::Model(arg)),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        _ => Err(CommandError::UnknownCommand(trimmed.to_string())),
    }
}

/// Print help for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

CONVERSATIONS:
  /new            - Start a new conversation
  /list           - List conversations (active one marked with *)
  /switch <id>    - Continue another conversation (id prefix is enough)
  /delete <id>    - Delete a conversation

MODEL:
  /model          - Show the model used for new turns
  /model <id>     - Switch to a different model

SESSION:
  /help           - Show this help
  /exit           - Leave the chat (also: exit, quit, Ctrl-D)

While a reply is streaming, Ctrl-C stops it and keeps the partial text.
"#
    );
}
