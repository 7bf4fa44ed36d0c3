use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::io::AsyncBufReadExt;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use glimpse::{
    Attachment, ChatModel, ChatSession, EnvCredentialStore, JsonSettingsStore,
    MemorySettingsStore, NoopScreenCapture, Provider, ProviderRouter, SettingsStore,
    StreamSignal,
};

#[derive(Parser)]
#[command(name = "glimpse")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, default_value = "~/.glimpse")]
    data_dir: String,

    /// Keep settings in memory instead of the settings file.
    #[arg(long, global = true)]
    memory_settings: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and stream the answer to stdout.
    Ask {
        query: String,

        /// Attach a PNG image as visual context.
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Model id to use; persisted as the new selection.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Interactive conversation; `:new` starts over, `:quit` exits.
    Chat {
        /// Model id to use; persisted as the new selection.
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List available models.
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let data_dir = expand_tilde(&cli.data_dir);

    let settings: Arc<dyn SettingsStore> = if cli.memory_settings {
        info!("Using in-memory settings");
        Arc::new(MemorySettingsStore::new())
    } else {
        let path = PathBuf::from(&data_dir).join("settings.json");
        Arc::new(JsonSettingsStore::new(path))
    };

    let mut session = ChatSession::new(
        Arc::new(ProviderRouter::new()),
        Arc::new(EnvCredentialStore::new()),
        settings,
        Arc::new(NoopScreenCapture::new()),
    );

    match cli.command {
        Commands::Ask {
            query,
            image,
            model,
        } => {
            if let Some(id) = model.as_deref() {
                session.set_selected_model(resolve_model(id)?);
            }

            let attachment = match image {
                Some(path) => {
                    let data = std::fs::read(&path)?;
                    let label = path
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string());
                    Some(Attachment::new(data, label)?)
                }
                None => None,
            };

            session.submit(&query, attachment).await;
            stream_turn(&mut session).await?;

            if let Some(error) = session.error_message() {
                anyhow::bail!("{error}");
            }
        }

        Commands::Chat { model } => {
            if let Some(id) = model.as_deref() {
                session.set_selected_model(resolve_model(id)?);
            }

            println!(
                "Chatting with {} ({}). `:new` starts over, `:quit` exits.",
                session.selected_model(),
                session.selected_model().provider()
            );

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let mut lines = stdin.lines();

            loop {
                print!("> ");
                std::io::stdout().flush()?;

                let Some(line) = lines.next_line().await? else {
                    break;
                };
                let line = line.trim();
                match line {
                    "" => continue,
                    ":quit" => break,
                    ":new" => {
                        session.new_chat();
                        println!("Started a new chat.");
                        continue;
                    }
                    query => {
                        session.submit(query, None).await;
                        stream_turn(&mut session).await?;

                        if let Some(error) = session.error_message() {
                            eprintln!("error: {error}");
                        }
                    }
                }
            }
        }

        Commands::Models => {
            let selected = session.selected_model();
            for provider in Provider::all() {
                println!("{provider}:");
                for model in ChatModel::models_for(provider) {
                    let marker = if model == selected { "*" } else { " " };
                    println!("  {marker} {:<12} {}", model.display_name(), model.id());
                }
            }
        }
    }

    Ok(())
}

/// Drain one turn, printing deltas as they arrive.
async fn stream_turn(session: &mut ChatSession) -> Result<()> {
    while let Some(signal) = session.pump().await {
        if let StreamSignal::Delta(text) = &signal {
            print!("{text}");
            std::io::stdout().flush()?;
        }
    }
    println!();
    Ok(())
}

fn resolve_model(id: &str) -> Result<ChatModel> {
    ChatModel::from_id(id).ok_or_else(|| {
        let known = ChatModel::all()
            .into_iter()
            .map(|m| m.id())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow::anyhow!("unknown model id `{id}`; known models: {known}")
    })
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
