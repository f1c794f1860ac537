#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::{
    path::{Path, PathBuf},
    process,
    sync::Arc,
};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{
    prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use ::pdfchat::{
    build_vector_store, get_conversation_chain, templates::render_terminal, Config, PdfFile,
    VectorStore,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Chat with your own PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Builds an index from PDFs and saves it.
    Index {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(short, long, default_value = "index.json")]
        output: PathBuf,
    },
    /// Prints the chunks closest to a question.
    Query {
        index: PathBuf,
        question: String,
        #[arg(short, default_value_t = 4)]
        k: usize,
    },
    /// Answers a single question.
    Ask { index: PathBuf, question: String },
    /// Starts an interactive conversation over PDFs or a saved index.
    Chat {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    let cli = Cli::parse();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "cli=info,pdfchat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run(cli.command).await {
        error!("{err:#}");
        process::exit(1);
    }
}

async fn run(command: Commands) -> Result<()> {
    let config = Config::from_env()?;

    match command {
        Commands::Index { files, output } => {
            let store = build_vector_store(&config, open_pdfs(&files)?).await?;
            store.save(&output)?;

            info!("Saved {} chunks to {}", store.len(), output.display());
        }
        Commands::Query { index, question, k } => {
            let store = VectorStore::load(&index)?;
            let embedder = config.embedder()?;

            for document in store
                .similarity_search(&question, k, embedder.as_ref())
                .await?
            {
                println!("[{:.4}] {}\n", document.score, document.text);
            }
        }
        Commands::Ask { index, question } => {
            let store = VectorStore::load(&index)?;
            let mut chain = get_conversation_chain(&config, Arc::new(store))?;

            println!("{}", chain.call(&question).await?.answer);
        }
        Commands::Chat { inputs } => chat(&config, &inputs).await?,
    }

    Ok(())
}

async fn chat(config: &Config, inputs: &[PathBuf]) -> Result<()> {
    let store = match inputs {
        [index] if is_index(index) => VectorStore::load(index)?,
        _ => {
            info!("Processing your PDFs...");
            build_vector_store(config, open_pdfs(inputs)?).await?
        }
    };
    let mut chain = get_conversation_chain(config, Arc::new(store))?;

    let mut lines = BufReader::new(io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        stdout.write_all(b"Ask anything to your PDF: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" {
            break;
        }

        match chain.call(question).await {
            Ok(response) => println!("\n{}\n", render_terminal(&response.chat_history)),
            Err(err) => error!("Failed to answer: {err:#}"),
        }
    }

    Ok(())
}

fn is_index(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "json")
}

fn open_pdfs(paths: &[PathBuf]) -> Result<Vec<PdfFile>> {
    paths
        .iter()
        .map(|path| {
            if path.extension().map_or(true, |ext| !ext.eq_ignore_ascii_case("pdf")) {
                bail!("{} is not a PDF", path.display());
            }

            PdfFile::open(path)
        })
        .collect()
}
