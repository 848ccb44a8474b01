use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Command, ConfigAction};
use docchat::config::{mask_secret, SETTING_KEYS};
use docchat::{agent, chat, knowledge, rag};
use docchat::{AppState, DataDir, RagConfig, Settings};

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("DOCCHAT_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> docchat::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let data_dir = DataDir::resolve(cli.data_dir.as_deref())?;
    let mut config = RagConfig::default();
    if let Command::Ask {
        top_k: Some(top_k), ..
    } = &cli.command
    {
        config.top_k = *top_k;
    }
    let state = AppState::open(&data_dir, config)?;

    match cli.command {
        Command::Upload { file } => {
            let info = knowledge::upload(&state, &file).await?;
            println!(
                "Uploaded '{}' ({} chunks)",
                info.document.name, info.chunk_count
            );
        }
        Command::Ingest { file } => {
            let count = knowledge::ingest(&state, &file).await?;
            println!("Indexed {} chunks from {}", count, file.display());
        }
        Command::Ask { question, pdf, .. } => {
            let reply = rag::answer(&state, &question, pdf.as_deref()).await;
            println!("{reply}");
        }
        Command::Delete { name, keep_file } => {
            let deleted = if keep_file {
                knowledge::delete_chunks(&state, &name)?
            } else {
                knowledge::delete_document(&state, &name)?
            };
            println!("Deleted {deleted} chunks for '{name}'");
        }
        Command::Forget { file } => {
            let deleted = knowledge::delete_source(&state, &file)?;
            println!("Deleted {deleted} chunks for {}", file.display());
        }
        Command::List { json } => {
            let docs = knowledge::list_documents(&state)?;
            if json {
                let out = serde_json::to_string_pretty(&docs)
                    .map_err(|e| docchat::Error::Config(e.to_string()))?;
                println!("{out}");
            } else if docs.is_empty() {
                println!("No documents uploaded.");
            } else {
                for info in &docs {
                    println!("{}\t{} chunks", info.document.name, info.chunk_count);
                }
            }
        }
        Command::Chat => run_chat(&state).await?,
        Command::Agent { task } => {
            println!("{}", agent::agent_task(&state, &task).await);
        }
        Command::Config { action } => {
            let settings = Settings::from_env(state.db.clone());
            match action {
                ConfigAction::Get { key } => {
                    if !SETTING_KEYS.contains(&key.as_str()) {
                        return Err(docchat::Error::NotFound {
                            kind: "setting",
                            name: key,
                        });
                    }
                    match settings.get(&key)? {
                        Some(value) if key.ends_with("_api_key") => {
                            println!("{}", mask_secret(&value))
                        }
                        Some(value) => println!("{value}"),
                        None => println!("(not set)"),
                    }
                }
                ConfigAction::Set { key, value } => {
                    settings.set(&key, &value)?;
                    println!("Set {key}");
                }
                ConfigAction::Unset { key } => {
                    if settings.unset(&key)? {
                        println!("Removed {key}");
                    } else {
                        println!("{key} was not set");
                    }
                }
                ConfigAction::List => {
                    for (key, value) in settings.list_masked()? {
                        println!("{key} = {value}");
                    }
                }
            }
        }
    }

    Ok(())
}

async fn run_chat(state: &AppState) -> docchat::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/exit" | "/quit" => break,
            "/clear" => {
                state.memories.chat.clear();
                println!("(conversation cleared)");
            }
            input => {
                let reply = chat::chat(state, input).await;
                println!("{reply}\n");
            }
        }
    }
    Ok(())
}
