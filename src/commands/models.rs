//! Model management commands for chatline
//!
//! Lists the backend's model catalog, asks it to load or unload models,
//! and remembers the model picked for new turns.

use crate::backend::{HttpTransport, ModelCatalog, ModelEntry};
use crate::cli::ModelCommand;
use crate::commands::open_store;
use crate::config::Config;
use crate::error::{ChatlineError, Result};
use colored::Colorize;
use prettytable::{row, Table};

/// Handle model commands
pub async fn handle_models(config: &Config, command: ModelCommand) -> Result<()> {
    match command {
        ModelCommand::List { json } => list_models(config, json).await,
        ModelCommand::Load { id } => {
            catalog(config)?.load(&id).await?;
            println!("{}", format!("Loaded model {}", id).green());
            Ok(())
        }
        ModelCommand::Unload { id } => {
            catalog(config)?.unload(&id).await?;
            println!("{}", format!("Unloaded model {}", id).green());
            Ok(())
        }
        ModelCommand::Select { id } => select_model(config, &id).await,
        ModelCommand::Current => show_current_model(config),
    }
}

fn catalog(config: &Config) -> Result<ModelCatalog> {
    Ok(ModelCatalog::new(HttpTransport::new(&config.backend)?))
}

/// List available models from the backend
///
/// # Examples
///
/// ```no_run
/// use chatline::config::Config;
/// use chatline::commands::models::list_models;
///
/// # async fn example() -> anyhow::Result<()> {
/// list_models(&Config::default(), false).await?;
/// # Ok(())
/// # }
/// ```
pub async fn list_models(config: &Config, json: bool) -> Result<()> {
    tracing::debug!("models::list_models flags - json: {}", json);

    let models = catalog(config)?.list().await?;

    if models.is_empty() {
        if json {
            println!("[]");
        } else {
            println!("No models available from {}", config.backend.base_url);
        }
        return Ok(());
    }

    if json {
        output_models_json(&models)?;
    } else {
        let selected = open_store(config)
            .ok()
            .and_then(|store| store.selected_model().map(str::to_string));
        output_models_table(&models, selected.as_deref());
    }
    Ok(())
}

/// Remembers `model_id` as the model for new turns
///
/// The id is checked against the catalog when the backend is reachable.
pub async fn select_model(config: &Config, model_id: &str) -> Result<()> {
    match catalog(config)?.find(model_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err(ChatlineError::NotFound {
                entity: "model",
                id: model_id.to_string(),
            }
            .into());
        }
        Err(e) => {
            tracing::warn!("Could not verify model against backend: {}", e);
            eprintln!(
                "{}",
                "Backend unreachable; saving the selection without checking it.".yellow()
            );
        }
    }

    let mut store = open_store(config)?;
    store.set_selected_model(Some(model_id.to_string()));
    println!("{}", format!("Selected model {}", model_id).green());
    Ok(())
}

/// Show the model new turns would use
pub fn show_current_model(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    match config.resolve_model(None, store.selected_model()) {
        Ok(model) => {
            let source = if store.selected_model().is_some() {
                "selected"
            } else {
                "config default"
            };
            println!("Current model: {} ({})", model.cyan(), source);
        }
        Err(_) => println!("{}", "No model selected.".yellow()),
    }
    Ok(())
}

fn serialize_pretty<T: serde::Serialize + ?Sized>(
    value: &T,
) -> std::result::Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

/// Output models in JSON format
///
/// # Errors
///
/// Returns `ChatlineError::Serialization` if serialization fails
fn output_models_json(models: &[ModelEntry]) -> Result<()> {
    let json = serialize_pretty(models).map_err(ChatlineError::Serialization)?;
    println!("{}", json);
    Ok(())
}

/// Output models in table format
fn output_models_table(models: &[ModelEntry], selected: Option<&str>) {
    let mut table = Table::new();
    table.add_row(row!["", "Model ID", "Name", "Category", "Size", "Loaded"]);

    for model in models {
        let marker = if selected == Some(model.id.as_str()) {
            "*"
        } else {
            ""
        };
        table.add_row(row![
            marker,
            model.id,
            model.name,
            model.category,
            format_size(model.size_mb),
            format_loaded(model.loaded)
        ]);
    }

    println!("\nAvailable models:\n");
    table.printstd();
    println!();
}

fn format_size(size_mb: f64) -> String {
    if size_mb >= 1024.0 {
        format!("{:.1} GB", size_mb / 1024.0)
    } else {
        format!("{:.0} MB", size_mb)
    }
}

fn format_loaded(loaded: bool) -> String {
    if loaded {
        "Yes".to_string()
    } else {
        "No".to_string()
    }
}
