use crate::cli::HistoryCommand;
use crate::commands::open_store;
use crate::config::Config;
use crate::conversation::{Conversation, ConversationStore, Role};
use crate::error::Result;
use colored::Colorize;
use prettytable::{format, Table};

const TITLE_COLUMN_CHARS: usize = 40;

/// Handle history commands
pub fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let mut store = open_store(config)?;

    match command {
        HistoryCommand::List => {
            if store.is_empty() {
                println!("{}", "No conversation history found.".yellow());
                return Ok(());
            }
            print_conversations(&store);
            println!(
                "Use {} to continue a conversation.",
                "chatline chat --conversation <ID>".cyan()
            );
            println!();
        }
        HistoryCommand::Show { id } => {
            let id = store.resolve_id(&id)?;
            if let Some(conversation) = store.get(&id) {
                print_transcript(conversation);
            }
        }
        HistoryCommand::Rename { id, title } => {
            let id = store.resolve_id(&id)?;
            store.rename(&id, title.clone())?;
            println!("{}", format!("Renamed {} to \"{}\"", short_id(&id), title).green());
        }
        HistoryCommand::Delete { id } => {
            let id = store.resolve_id(&id)?;
            store.delete(&id);
            println!("{}", format!("Deleted conversation {}", id).green());
        }
    }

    Ok(())
}

/// Prints the conversation table, marking the active conversation
pub fn print_conversations(store: &ConversationStore) {
    if store.is_empty() {
        println!("{}\n", "No conversations yet.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "",
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Updated".bold()
    ]);

    for conversation in store.conversations() {
        let marker = if store.active_id() == Some(conversation.id.as_str()) {
            "*"
        } else {
            ""
        };
        let updated = conversation
            .updated_at
            .format("%Y-%m-%d %H:%M")
            .to_string();

        table.add_row(prettytable::row![
            marker,
            short_id(&conversation.id).cyan(),
            truncate_title(&conversation.title, TITLE_COLUMN_CHARS),
            conversation.messages.len(),
            updated
        ]);
    }

    println!("\nConversations:");
    table.printstd();
    println!();
}

fn print_transcript(conversation: &Conversation) {
    println!("\n{}", conversation.title.bold());
    println!(
        "{}",
        format!(
            "{} | created {} | updated {}",
            conversation.id,
            conversation.created_at.format("%Y-%m-%d %H:%M"),
            conversation.updated_at.format("%Y-%m-%d %H:%M")
        )
        .dimmed()
    );
    println!();

    for message in &conversation.messages {
        let label = match message.role {
            Role::User => "you".blue().bold(),
            Role::Assistant => message
                .model
                .as_deref()
                .unwrap_or("assistant")
                .green()
                .bold(),
            Role::System => "system".magenta().bold(),
        };
        println!(
            "{} {}",
            label,
            message.timestamp.format("%H:%M:%S").to_string().dimmed()
        );
        println!("{}", message.content);
        if let Some(error) = &message.error {
            println!("{}", format!("[failed: {}]", error).red());
        }
        println!();
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Shortens a title to `max_chars` characters, ending with `...` when cut
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }
    let kept: String = title.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}
