use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dotenv::dotenv;
use policy_rag::api;
use policy_rag::commands::{self, document, CommandHandler, Flow};
use policy_rag::config::Settings;
use policy_rag::llm::RagEngine;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Level;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Answer policy questions from an indexed handbook", long_about = None)]
struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    chunks_dir: Option<PathBuf>,

    #[arg(long, global = true)]
    top_k: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Split a compiled handbook into filtered source files
    Prepare {
        input: PathBuf,
        #[arg(long, default_value = "data/sources")]
        out_dir: PathBuf,
    },
    /// Chunk source files into the chunk store
    Chunk {
        #[arg(default_value = "data/sources")]
        sources_dir: PathBuf,
        /// Continue numbering after the chunks already stored
        #[arg(long)]
        append: bool,
    },
    /// Embed stored chunks and write the index pair
    Index,
    /// Show the chunks closest to a question
    Search { question: String },
    /// Answer one question
    Ask { question: String },
    /// Interactive question loop
    Chat,
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value = "8000")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    colored::control::set_override(true);

    dotenv().ok();

    let args = Args::parse();
    init_tracing(args.verbose);

    let mut settings = Settings::from_env();
    if let Some(dir) = &args.index_dir {
        settings.index_dir = dir.clone();
    }
    if let Some(dir) = &args.chunks_dir {
        settings.chunks_dir = dir.clone();
    }
    if let Some(top_k) = args.top_k {
        settings.top_k = top_k;
    }

    match args.command {
        Command::Prepare { input, out_dir } => {
            document::prepare(&input, &out_dir)?;
        }
        Command::Chunk { sources_dir, append } => {
            document::chunk(&sources_dir, &settings, append)?;
        }
        Command::Index => document::index(&settings).await?,
        Command::Search { question } => {
            let engine = loaded_engine(&settings)?;
            let hits = engine.search(&question, settings.top_k).await?;
            commands::print_hits(&hits);
        }
        Command::Ask { question } => {
            let engine = loaded_engine(&settings)?;
            commands::print_answer(&engine.answer(&question).await);
        }
        Command::Chat => run_chat(loaded_engine(&settings)?).await?,
        Command::Serve { port } => run_api_server(settings, port).await?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        Level::DEBUG
    } else {
        std::env::var("RAG_LOG")
            .ok()
            .and_then(|v| v.parse::<Level>().ok())
            .unwrap_or(Level::INFO)
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn loaded_engine(settings: &Settings) -> Result<Arc<RagEngine>> {
    let engine = RagEngine::from_settings(settings)?
        .loaded()
        .with_context(|| {
            format!(
                "Failed to load index from {}; run `policy-rag index` first",
                settings.index_dir.display()
            )
        })?;
    Ok(Arc::new(engine))
}

async fn run_chat(engine: Arc<RagEngine>) -> Result<()> {
    let mut command_handler = CommandHandler::new(engine);

    if let Err(e) = command_handler.handle_command("help").await {
        println!("{}", e.red());
    }

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                let _ = rl.add_history_entry(input);

                match command_handler.handle_command(input).await {
                    Ok(Flow::Exit) => break,
                    Ok(Flow::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
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
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(settings: Settings, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let engine = loaded_engine(&settings)?;
    let app = api::create_api(engine, Arc::new(settings));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
