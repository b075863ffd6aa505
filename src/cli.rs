//! Command-line interface definition for chatline
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chatline - terminal client for a local chat backend
///
/// Keeps local conversations and streams replies from the backend.
#[derive(Parser, Debug, Clone)]
#[command(name = "chatline")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the backend base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Override the state database location
    #[arg(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start an interactive chat
    Chat {
        /// Model to use for this session
        #[arg(short, long)]
        model: Option<String>,

        /// Conversation to continue (id or unique prefix)
        #[arg(long)]
        conversation: Option<String>,

        /// Start a fresh conversation
        #[arg(long, conflicts_with = "conversation")]
        new: bool,
    },

    /// Send one message and print the reply
    Ask {
        /// Message text
        prompt: String,

        /// Model to use
        #[arg(short, long)]
        model: Option<String>,

        /// Conversation to continue (id or unique prefix); a new one otherwise
        #[arg(long)]
        conversation: Option<String>,
    },

    /// Manage backend models
    Models {
        /// Model management subcommand
        #[command(subcommand)]
        command: ModelCommand,
    },

    /// Manage stored conversations
    History {
        /// History subcommand
        #[command(subcommand)]
        command: HistoryCommand,
    },
}

/// Model management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ModelCommand {
    /// List available models
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Load a model into backend memory
    Load {
        /// Model id
        id: String,
    },

    /// Unload a model from backend memory
    Unload {
        /// Model id
        id: String,
    },

    /// Remember a model as the default for new turns
    Select {
        /// Model id
        id: String,
    },

    /// Show the remembered model
    Current,
}

/// History subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    /// List conversations, newest first
    List,

    /// Print one conversation
    Show {
        /// Conversation id or unique prefix
        id: String,
    },

    /// Rename a conversation
    Rename {
        /// Conversation id or unique prefix
        id: String,
        /// New title
        title: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation id or unique prefix
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            base_url: None,
            storage_path: None,
            command: Commands::History {
                command: HistoryCommand::List,
            },
        }
    }
}
