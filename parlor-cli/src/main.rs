//! CLI entry point for parlor

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use parlor_chat::ChatOptions;
use parlor_core::config::{Config, ConfigLoader};
use parlor_core::logging::init_logging;
use parlor_core::session::HistoryStore;
use parlor_ollama::OllamaClient;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod repl;

#[derive(Parser)]
#[command(name = "parlor")]
#[command(about = "A terminal chat client for local Ollama-compatible servers")]
#[command(version = "0.3.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat
    Chat {
        /// Model bound to new sessions
        #[arg(short, long)]
        model: Option<String>,
        /// Resume a stored session by id
        #[arg(short, long)]
        session: Option<String>,
    },
    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Manage server models
    Models {
        #[command(subcommand)]
        command: ModelCommands,
    },
    /// Show server and storage status
    Status {
        /// Keep probing at the configured interval
        #[arg(short, long)]
        watch: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List stored sessions
    List,
    /// Delete a session by id
    Delete {
        /// Session id
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Rename a session
    Rename {
        /// Session id
        id: String,
        /// New title
        title: String,
    },
}

#[derive(Subcommand)]
enum ModelCommands {
    /// List models available on the server
    List,
    /// Pull a model onto the server
    Pull {
        /// Model name, e.g. "llama2"
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };
    let config = config_loader.load()?;
    let _guard = init_logging(&config.logging);

    match cli.command {
        Commands::Chat { model, session } => run_chat(&config, model, session).await?,
        Commands::Sessions { command } => match command {
            SessionCommands::List => run_sessions_list(&config)?,
            SessionCommands::Delete { id, yes } => run_sessions_delete(&config, id, yes)?,
            SessionCommands::Rename { id, title } => run_sessions_rename(&config, id, title)?,
        },
        Commands::Models { command } => match command {
            ModelCommands::List => run_models_list(&config).await?,
            ModelCommands::Pull { name } => run_models_pull(&config, name).await?,
        },
        Commands::Status { watch } => run_status(&config, watch).await?,
    }

    Ok(())
}

/// Expand tilde in path
fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn history_store(config: &Config) -> HistoryStore {
    HistoryStore::new(expand_tilde(&config.storage.history_path))
}

fn build_client(config: &Config) -> OllamaClient {
    OllamaClient::new(&config.ollama.base_url)
}

/// Model for new sessions: flag, then config, then first server model
async fn resolve_model(
    client: &OllamaClient,
    config: &Config,
    requested: Option<String>,
) -> Result<String> {
    if let Some(model) = requested {
        return Ok(model);
    }
    if !config.chat.default_model.is_empty() {
        return Ok(config.chat.default_model.clone());
    }

    let models = client.list_models().await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to list models from {}: {}",
            config.ollama.base_url,
            e
        )
    })?;
    models.first().map(|m| m.name.clone()).ok_or_else(|| {
        anyhow::anyhow!("No models available; pull one with 'parlor models pull <name>'")
    })
}

async fn run_chat(
    config: &Config,
    model: Option<String>,
    session: Option<String>,
) -> Result<()> {
    let client = build_client(config);

    if !client.ping().await {
        println!(
            "{} server at {} is not responding",
            style("✗").red().bold(),
            config.ollama.base_url
        );
        println!("Conversation will fail until it is back online.");
    }

    let model = resolve_model(&client, config, model).await?;
    let store = history_store(config);
    let options = ChatOptions::from(&config.chat);

    repl::run_chat(Arc::new(client), store, options, model, session).await
}

fn run_sessions_list(config: &Config) -> Result<()> {
    let store = history_store(config);
    let sessions = store.list();

    if sessions.is_empty() {
        println!("No stored sessions.");
        return Ok(());
    }

    println!("{}", style("Stored Sessions").bold().cyan());
    println!();
    for session in sessions {
        println!("  {} ({})", style(&session.title).bold(), session.id);
        println!("    Model: {}", session.model);
        println!("    Messages: {}", session.messages.len());
        println!(
            "    Updated: {}",
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
        println!();
    }

    Ok(())
}

fn run_sessions_delete(config: &Config, id: String, yes: bool) -> Result<()> {
    let store = history_store(config);
    let Some(session) = store.list().into_iter().find(|s| s.id == id) else {
        println!("{} Session {} not found", style("✗").red(), id);
        return Ok(());
    };

    if !yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete '{}' ({} messages)?", session.title, session.messages.len()))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Delete cancelled.");
            return Ok(());
        }
    }

    store.delete(&id);
    println!("{} Deleted {}", style("✓").green().bold(), id);
    Ok(())
}

fn run_sessions_rename(config: &Config, id: String, title: String) -> Result<()> {
    let store = history_store(config);
    if !store.list().iter().any(|s| s.id == id) {
        println!("{} Session {} not found", style("✗").red(), id);
        return Ok(());
    }

    store.rename(&id, &title);
    println!("{} Renamed {} to '{}'", style("✓").green().bold(), id, title);
    Ok(())
}

async fn run_models_list(config: &Config) -> Result<()> {
    let client = build_client(config);
    let models = client.list_models().await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to list models from {}: {}",
            config.ollama.base_url,
            e
        )
    })?;

    if models.is_empty() {
        println!("No models installed on the server.");
        return Ok(());
    }

    println!("{}", style("Available Models").bold().cyan());
    println!();
    for model in models {
        match model.size {
            Some(size) => println!("  {} ({})", style(&model.name).bold(), format_size(size)),
            None => println!("  {}", style(&model.name).bold()),
        }
    }

    Ok(())
}

async fn run_models_pull(config: &Config, name: String) -> Result<()> {
    let client = build_client(config);
    println!(
        "Pulling {} from {}",
        style(&name).bold(),
        config.ollama.base_url
    );

    let mut stream = client.pull_model(&name).await?;
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes}",
    )?);

    while let Some(update) = stream.next().await {
        let update = match update {
            Ok(update) => update,
            Err(e) => {
                bar.abandon();
                return Err(e.into());
            }
        };

        if let (Some(total), Some(completed)) = (update.total, update.completed) {
            bar.set_length(total);
            bar.set_position(completed);
        }
        bar.set_message(update.status.clone());

        if update.is_done() {
            break;
        }
    }

    bar.finish_and_clear();
    println!("{} Pulled {}", style("✓").green().bold(), name);
    Ok(())
}

async fn run_status(config: &Config, watch: bool) -> Result<()> {
    let client = build_client(config);
    let store = history_store(config);

    println!("{}", style("Parlor Status").bold().cyan());
    println!();
    println!("  Server: {}", config.ollama.base_url);

    let online = client.ping().await;
    println!("  Status: {}", status_label(online));

    if online {
        if let Ok(models) = client.list_models().await {
            println!("  Models: {}", models.len());
        }
    }
    println!(
        "  History: {} ({} sessions)",
        store.path().display(),
        store.list().len()
    );

    if watch {
        println!();
        println!(
            "{}",
            style(format!(
                "Probing every {}s. Press Ctrl+C to stop.",
                config.ollama.status_poll_secs
            ))
            .dim()
        );
        loop {
            tokio::time::sleep(Duration::from_secs(config.ollama.status_poll_secs)).await;
            let online = client.ping().await;
            println!(
                "  [{}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                status_label(online)
            );
        }
    }

    Ok(())
}

fn status_label(online: bool) -> console::StyledObject<&'static str> {
    if online {
        style("online").green()
    } else {
        style("offline").red()
    }
}

fn format_size(bytes: u64) -> String {
    format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}
