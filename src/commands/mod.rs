/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`    - Interactive chat with slash commands
- `ask`     - One turn, printed to stdout
- `models`  - Backend model catalog
- `history` - Stored conversations
*/

use crate::backend::HttpTransport;
use crate::config::Config;
use crate::conversation::ConversationStore;
use crate::error::{ChatlineError, Result};
use crate::session::{ChatSession, TurnOutcome, TurnTicket};
use crate::storage::SqliteStorage;
use crate::streaming::StreamingChatClient;
use colored::Colorize;
use std::io::Write;
use std::sync::Arc;

// Special commands parser for the interactive chat
pub mod special_commands;

// Model management commands
pub mod models;

// Conversation history commands
pub mod history;

/// Opens the persisted conversation store described by `config`
pub fn open_store(config: &Config) -> Result<ConversationStore> {
    let storage = match &config.storage.path {
        Some(path) => SqliteStorage::new_with_path(path)?,
        None => SqliteStorage::new()?,
    };
    tracing::debug!("Using state database {}", storage.db_path().display());
    Ok(ConversationStore::load_with_options(
        storage,
        config.store_options(),
    ))
}

/// Builds a chat session over the HTTP backend
pub fn open_session(config: &Config) -> Result<ChatSession> {
    let transport = Arc::new(HttpTransport::new(&config.backend)?);
    let client = StreamingChatClient::new(transport).with_sampling(config.sampling());
    Ok(ChatSession::new(open_store(config)?, client))
}

/// Streams one turn to stdout until it ends or Ctrl-C stops it
async fn stream_to_stdout(session: &mut ChatSession, ticket: &TurnTicket) -> TurnOutcome {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    let mut stdout = std::io::stdout();
    let outcome = session
        .run_turn_until(
            ticket,
            |fragment| {
                let _ = stdout.write_all(fragment.as_bytes());
                let _ = stdout.flush();
            },
            interrupt,
        )
        .await;
    println!();
    outcome
}

/// Describes a turn that did not complete; `None` when it did
fn outcome_message(outcome: &TurnOutcome) -> Option<String> {
    match outcome {
        TurnOutcome::Completed => None,
        TurnOutcome::Failed { kind, detail } => Some(format!("{}: {}", kind, detail)),
        TurnOutcome::Stopped => Some("stopped; partial reply kept".to_string()),
        TurnOutcome::Vanished => Some("conversation was deleted".to_string()),
    }
}

// Interactive chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Runs a readline loop. Plain lines are sent as turns and the reply is
    //! streamed to stdout; lines starting with `/` are special commands.

    use super::*;
    use crate::commands::special_commands::{print_help, parse_special_command, SpecialCommand};
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `model` - Model override for this session
    /// * `conversation` - Conversation to continue (id or prefix)
    /// * `new` - Start with a fresh conversation
    pub async fn run_chat(
        config: Config,
        model: Option<String>,
        conversation: Option<String>,
        new: bool,
    ) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut session = open_session(&config)?;
        let mut model_override = model;

        let mut current = if new {
            None
        } else if let Some(id) = conversation {
            Some(session.store().resolve_id(&id)?)
        } else {
            session.store().active_id().map(str::to_string)
        };
        if let Some(id) = &current {
            session.select(id);
        }

        let mut rl = DefaultEditor::new()?;
        print_welcome_banner(&session, current.as_deref(), &config, model_override.as_deref());

        loop {
            let prompt = format_prompt(current.as_deref());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    let command = match parse_special_command(trimmed) {
                        Ok(command) => command,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    match command {
                        SpecialCommand::New => {
                            let conversation = session.create();
                            println!("Started conversation {}\n", short_id(&conversation.id).cyan());
                            current = Some(conversation.id);
                            continue;
                        }
                        SpecialCommand::List => {
                            history::print_conversations(session.store());
                            continue;
                        }
                        SpecialCommand::Switch(id) => {
                            match session.store().resolve_id(&id) {
                                Ok(id) => {
                                    session.select(&id);
                                    if let Some(conversation) = session.store().get(&id) {
                                        println!(
                                            "Switched to {} ({} messages)\n",
                                            conversation.title.bold(),
                                            conversation.messages.len()
                                        );
                                    }
                                    current = Some(id);
                                }
                                Err(e) => eprintln!("{}\n", e.to_string().red()),
                            }
                            continue;
                        }
                        SpecialCommand::Delete(id) => {
                            match session.store().resolve_id(&id) {
                                Ok(id) => {
                                    session.delete(&id);
                                    if current.as_deref() == Some(id.as_str()) {
                                        current = None;
                                    }
                                    println!("{}\n", format!("Deleted conversation {}", short_id(&id)).green());
                                }
                                Err(e) => eprintln!("{}\n", e.to_string().red()),
                            }
                            continue;
                        }
                        SpecialCommand::Model(None) => {
                            match config.resolve_model(
                                model_override.as_deref(),
                                session.store().selected_model(),
                            ) {
                                Ok(model) => println!("Current model: {}\n", model.cyan()),
                                Err(e) => eprintln!("{}\n", e.to_string().yellow()),
                            }
                            continue;
                        }
                        SpecialCommand::Model(Some(model)) => {
                            session.store_mut().set_selected_model(Some(model.clone()));
                            println!("Switched to model {}\n", model.cyan());
                            model_override = Some(model);
                            continue;
                        }
                        SpecialCommand::Help => {
                            print_help();
                            continue;
                        }
                        SpecialCommand::Exit => break,
                        SpecialCommand::None => {}
                    }

                    let model = match config
                        .resolve_model(model_override.as_deref(), session.store().selected_model())
                    {
                        Ok(model) => model,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    let conversation_id = match &current {
                        Some(id) if session.store().get(id).is_some() => id.clone(),
                        _ => {
                            let id = session.create().id;
                            current = Some(id.clone());
                            id
                        }
                    };

                    let ticket = match session.send(&conversation_id, trimmed, &model) {
                        Ok(ticket) => ticket,
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    };

                    print!("{} ", format!("{}:", model).bold().green());
                    let outcome = stream_to_stdout(&mut session, &ticket).await;
                    if let Some(message) = outcome_message(&outcome) {
                        eprintln!("{}", format!("[{}]", message).yellow());
                    }
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        session.store_mut().flush();
        println!("Goodbye!");
        Ok(())
    }

    fn short_id(id: &str) -> &str {
        id.get(..8).unwrap_or(id)
    }

    fn format_prompt(current: Option<&str>) -> String {
        match current {
            Some(id) => format!("[{}] >> ", short_id(id)),
            None => "[new] >> ".to_string(),
        }
    }

    fn print_welcome_banner(
        session: &ChatSession,
        current: Option<&str>,
        config: &Config,
        model_override: Option<&str>,
    ) {
        println!("{}", "chatline".bold());
        println!("Backend: {}", config.backend.base_url);
        match config.resolve_model(model_override, session.store().selected_model()) {
            Ok(model) => println!("Model:   {}", model.cyan()),
            Err(_) => println!("Model:   {}", "none (use /model <id>)".yellow()),
        }
        if let Some(conversation) = current.and_then(|id| session.store().get(id)) {
            println!(
                "Continuing \"{}\" ({} messages)",
                conversation.title,
                conversation.messages.len()
            );
        }
        println!("Type /help for commands, /exit to leave.\n");
    }

}

// One-shot command handler
pub mod ask {
    //! Sends one message and prints the streamed reply.

    use super::*;

    /// Run a single turn
    ///
    /// Without `conversation` a new conversation is created.
    ///
    /// # Errors
    ///
    /// Returns error if no model can be resolved, the conversation is
    /// unknown, or the turn fails
    pub async fn run_ask(
        config: Config,
        prompt: String,
        model: Option<String>,
        conversation: Option<String>,
    ) -> Result<()> {
        let mut session = open_session(&config)?;
        let model = config.resolve_model(model.as_deref(), session.store().selected_model())?;

        let conversation_id = match conversation {
            Some(id) => {
                let id = session.store().resolve_id(&id)?;
                session.select(&id);
                id
            }
            None => session.create().id,
        };
        tracing::info!(conversation = %conversation_id, model = %model, "Sending prompt");

        let ticket = session.send(&conversation_id, &prompt, &model)?;
        let outcome = stream_to_stdout(&mut session, &ticket).await;
        session.store_mut().flush();

        match outcome {
            TurnOutcome::Completed => Ok(()),
            TurnOutcome::Failed { kind, detail } => {
                Err(ChatlineError::Transport(format!("{}: {}", kind, detail)).into())
            }
            other => {
                if let Some(message) = outcome_message(&other) {
                    eprintln!("{}", format!("[{}]", message).yellow());
                }
                Ok(())
            }
        }
    }
}
