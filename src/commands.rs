//! CLI command implementations.
//!
//! Each `run_*` function performs one `unibot` command end to end:
//! credentials, providers, index build-or-load, then the command's own
//! work. Command output goes to the supplied writer (stdout in the binary);
//! logs go to stderr through `tracing`.

use std::io::{BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use unibot_core::embedding::Embedder;
use unibot_core::history::History;
use unibot_core::index::Index;
use unibot_core::pipeline::{AnswerPipeline, Query};
use unibot_core::prompt::PromptTemplate;
use unibot_core::store::{self, IndexStore};

use crate::config::Config;
use crate::corpus;
use crate::credentials::Credentials;
use crate::embedding::create_embedder;
use crate::llm::create_chat_model;
use crate::loader::LoaderRegistry;
use crate::session::{ChatSession, Command};
use crate::sqlite_store::SqliteIndexStore;

/// Load the index at `index.path`, building it from the documents if absent.
///
/// Documents are only read and chunked when no index exists yet.
pub async fn open_index(
    config: &Config,
    store: &dyn IndexStore,
    embedder: &dyn Embedder,
) -> Result<Index> {
    let passages = if store.exists().await? {
        Vec::new()
    } else {
        corpus::collect_passages(config, &LoaderRegistry::default())?
    };
    let index = store::get_or_create(store, embedder, passages, config.embedding.batch_size)
        .await
        .with_context(|| format!("failed to open index at {}", store.location()))?;
    Ok(index)
}

/// Assemble the answer pipeline around an opened index.
pub fn build_pipeline(
    config: &Config,
    index: Index,
    embedder: Arc<dyn Embedder>,
    credentials: &Credentials,
) -> Result<AnswerPipeline> {
    let model = create_chat_model(&config.llm, credentials)?;
    info!(
        llm = model.model_name(),
        embedder = embedder.model_name(),
        k = config.retrieval.k,
        "answer pipeline ready"
    );
    Ok(AnswerPipeline::new(
        Arc::new(index),
        embedder,
        model,
        PromptTemplate::default(),
        config.retrieval.k,
    )?)
}

async fn ready_pipeline(config: &Config) -> Result<AnswerPipeline> {
    let credentials = Credentials::from_env(config)?;
    let embedder = create_embedder(&config.embedding, &credentials)?;
    let store = SqliteIndexStore::new(&config.index.path);
    let index = open_index(config, &store, embedder.as_ref()).await?;
    build_pipeline(config, index, embedder, &credentials)
}

/// `unibot chat`: interactive loop on stdin/stdout.
pub async fn run_chat(config: &Config) -> Result<()> {
    let pipeline = ready_pipeline(config).await?;
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    chat_loop(&pipeline, config.history.max_length, stdin.lock(), stdout.lock()).await
}

/// Drive a chat session from `input` until `exit`/`quit` or end of input.
pub async fn chat_loop<R: BufRead, W: Write>(
    pipeline: &AnswerPipeline,
    max_length: usize,
    input: R,
    mut output: W,
) -> Result<()> {
    let mut session = ChatSession::new(pipeline, max_length)?;

    writeln!(
        output,
        "UniBot is ready. Ask a question, type 'reset' to clear the conversation, or 'exit' to quit."
    )?;
    write!(output, "\nYou: ")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        match Command::parse(&line) {
            Command::Exit => break,
            Command::Reset => {
                session.reset();
                writeln!(output, "Conversation cleared.")?;
            }
            Command::Empty => {}
            Command::Ask(question) => {
                let answer = session.ask(&question).await;
                writeln!(output, "UniBot: {}", answer.trim())?;
            }
        }
        write!(output, "\nYou: ")?;
        output.flush()?;
    }

    writeln!(output, "\nGoodbye!")?;
    Ok(())
}

/// `unibot ask`: answer one question with an empty history.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let pipeline = ready_pipeline(config).await?;
    let history = History::new(config.history.max_length)?;
    let answer = pipeline.answer(Query::new(question, &history)).await?;
    println!("{}", answer.trim());
    Ok(())
}

/// `unibot index build`: build the index if it does not exist yet.
///
/// Always reads the documents, so an existing index that no longer matches
/// them is reported with a warning.
pub async fn run_index_build(config: &Config) -> Result<()> {
    let credentials = Credentials::from_env(config)?;
    let embedder = create_embedder(&config.embedding, &credentials)?;
    let store = SqliteIndexStore::new(&config.index.path);
    let existed = store.exists().await?;
    let passages = corpus::collect_passages(config, &LoaderRegistry::default())?;
    let index = store::get_or_create(
        &store,
        embedder.as_ref(),
        passages,
        config.embedding.batch_size,
    )
    .await
    .with_context(|| format!("failed to open index at {}", store.location()))?;
    if existed {
        println!(
            "Index already exists at {} ({} passages). Use `unibot index rebuild` to rebuild it.",
            store.location(),
            index.len()
        );
    } else {
        println!("Built index at {} ({} passages).", store.location(), index.len());
    }
    Ok(())
}

/// `unibot index rebuild`: re-read the documents and replace the index.
pub async fn run_index_rebuild(config: &Config) -> Result<()> {
    let credentials = Credentials::from_env(config)?;
    let embedder = create_embedder(&config.embedding, &credentials)?;
    let store = SqliteIndexStore::new(&config.index.path);
    let passages = corpus::collect_passages(config, &LoaderRegistry::default())?;
    let index = store::rebuild(
        &store,
        embedder.as_ref(),
        passages,
        config.embedding.batch_size,
    )
    .await?;
    println!("Rebuilt index at {} ({} passages).", store.location(), index.len());
    Ok(())
}

/// `unibot index status`: describe the stored index without embedding anything.
pub async fn run_index_status<W: Write>(config: &Config, mut output: W) -> Result<()> {
    let store = SqliteIndexStore::new(&config.index.path);
    if !store.exists().await? {
        writeln!(
            output,
            "No index at {}. Run `unibot index build` to create it.",
            store.location()
        )?;
        return Ok(());
    }

    let index = store.load().await?;
    let passages = corpus::collect_passages(config, &LoaderRegistry::default())?;
    let meta = index.meta();

    writeln!(output, "Index:      {}", store.location())?;
    writeln!(output, "Passages:   {}", index.len())?;
    writeln!(output, "Model:      {} ({} dims)", meta.model, meta.dims)?;
    writeln!(output, "Built:      {}", meta.created_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
    if index.is_stale(&passages) {
        writeln!(
            output,
            "Documents:  changed since the index was built ({} passages now). Run `unibot index rebuild`.",
            passages.len()
        )?;
    } else {
        writeln!(output, "Documents:  up to date")?;
    }
    Ok(())
}
