use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::batch::{run_boolean_query, run_vector_query, summarize, Query, QueryOutcome};
use engine::embed::{HashingEmbedder, HashingEmbedderConfig};
use engine::eval::{EvalOptions, OrMode};
use engine::persist::{save_snapshot, IndexPaths};
use engine::pipeline::Pipeline;
use engine::store::SledStore;
use engine::{Document, InvertedIndex, RelevanceJudgments, StandardAnalyzer, VectorIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

mod cisi;
mod report;

use cisi::CollectionFiles;
use report::{print_outcomes, write_index_csv, write_report, StrategyReport};

#[derive(Parser)]
#[command(name = "evaluator")]
#[command(about = "Boolean and semantic retrieval over a test collection, scored against relevance judgments", long_about = None)]
struct Cli {
    /// Cache directory (sled database)
    #[arg(long, global = true, default_value = "./cache")]
    cache: PathBuf,
    /// Ignore cached stages and rebuild them
    #[arg(long, global = true, default_value_t = false)]
    force: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct DataArgs {
    /// Directory holding the collection files (*.ALL, *.REL, *.BLN, *.QRY)
    #[arg(long, default_value = "./data")]
    data: PathBuf,
    /// Corpus file, overrides discovery
    #[arg(long)]
    corpus: Option<PathBuf>,
    /// Relevance judgments file, overrides discovery
    #[arg(long)]
    relevance: Option<PathBuf>,
    /// Boolean queries file, overrides discovery
    #[arg(long)]
    boolean_queries: Option<PathBuf>,
    /// Free-text queries file, overrides discovery
    #[arg(long)]
    queries: Option<PathBuf>,
}

impl DataArgs {
    fn resolve(&self) -> CollectionFiles {
        let found = CollectionFiles::discover(&self.data);
        CollectionFiles {
            corpus: self.corpus.clone().or(found.corpus),
            relevance: self.relevance.clone().or(found.relevance),
            boolean_queries: self.boolean_queries.clone().or(found.boolean_queries),
            text_queries: self.queries.clone().or(found.text_queries),
        }
    }
}

#[derive(Args, Clone)]
struct VectorArgs {
    /// Vocabulary file, one token per line; hashed token ids when absent
    #[arg(long)]
    vocab: Option<PathBuf>,
    /// Embedding dimensionality
    #[arg(long, default_value_t = 256)]
    dimension: usize,
    /// Token sequence length after padding/truncation
    #[arg(long, default_value_t = 256)]
    max_seq_len: usize,
    /// Score only the top K ranked documents instead of the whole ranking
    #[arg(long)]
    top_k: Option<usize>,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrModeArg {
    /// Append operand lists, keeping duplicates
    Concatenate,
    /// Sorted union without duplicates
    Union,
}

impl From<OrModeArg> for OrMode {
    fn from(v: OrModeArg) -> Self {
        match v {
            OrModeArg::Concatenate => OrMode::Concatenate,
            OrModeArg::Union => OrMode::Union,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, tokenize and index the corpus
    Build {
        #[command(flatten)]
        data: DataArgs,
        /// Also write an index snapshot to this directory
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print index terms with their collection frequency and documents
    Inspect {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Also write the whole index as `term,total_frequency,id-id-id` rows
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Run the boolean queries and score them
    Boolean {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, value_enum, default_value_t = OrModeArg::Concatenate)]
        or_mode: OrModeArg,
        /// Write a JSON report here
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run the free-text queries by vector similarity and score them
    Vector {
        #[command(flatten)]
        data: DataArgs,
        #[command(flatten)]
        vector: VectorArgs,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Run both strategies
    All {
        #[command(flatten)]
        data: DataArgs,
        #[arg(long, value_enum, default_value_t = OrModeArg::Concatenate)]
        or_mode: OrModeArg,
        #[command(flatten)]
        vector: VectorArgs,
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

/// Everything the loaders produced, joined.
struct Collection {
    documents: Arc<Vec<Document>>,
    index: Arc<InvertedIndex>,
    judgments: Arc<RelevanceJudgments>,
    boolean_queries: Vec<Query>,
    text_queries: Vec<Query>,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();
    let store = Arc::new(SledStore::open(&cli.cache).with_context(|| format!("opening cache {}", cli.cache.display()))?);

    let outcome = run(cli.command, store.clone(), cli.force).await;
    store.close()?;
    outcome
}

async fn run(command: Commands, store: Arc<SledStore>, force: bool) -> Result<()> {
    match command {
        Commands::Build { data, snapshot } => {
            let collection = load(store, data.resolve(), force).await?;
            if let Some(dir) = snapshot {
                save_snapshot(&IndexPaths::new(dir), &collection.index)?;
            }
            Ok(())
        }
        Commands::Inspect { data, page, limit, csv } => {
            let collection = load(store, data.resolve(), force).await?;
            inspect(&collection.index, page, limit);
            if let Some(path) = csv {
                write_index_csv(&path, &collection.index)?;
            }
            Ok(())
        }
        Commands::Boolean { data, or_mode, report } => {
            let collection = load(store, data.resolve(), force).await?;
            let r = boolean(&collection, EvalOptions { or_mode: or_mode.into() }).await?;
            finish(report.as_deref(), vec![r])
        }
        Commands::Vector { data, vector, report } => {
            let collection = load(store, data.resolve(), force).await?;
            let r = semantic(&collection, &vector).await?;
            finish(report.as_deref(), vec![r])
        }
        Commands::All { data, or_mode, vector, report } => {
            let collection = load(store, data.resolve(), force).await?;
            let b = boolean(&collection, EvalOptions { or_mode: or_mode.into() }).await?;
            let v = semantic(&collection, &vector).await?;
            finish(report.as_deref(), vec![b, v])
        }
    }
}

fn spawn_load<T, F>(path: Option<PathBuf>, load: F) -> JoinHandle<Result<Option<T>>>
where
    T: Send + 'static,
    F: FnOnce(&Path) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || path.as_deref().map(load).transpose())
}

/// Load the corpus (through the cache), judgments and both query sets concurrently.
async fn load(store: Arc<SledStore>, files: CollectionFiles, force: bool) -> Result<Collection> {
    let corpus_path = files.corpus.clone().context("no corpus file (*.ALL) found")?;
    let corpus = tokio::task::spawn_blocking(move || -> Result<(Vec<Document>, InvertedIndex)> {
        let mut pipeline = Pipeline::new(store.as_ref(), &StandardAnalyzer);
        pipeline.load_documents(force, || cisi::load_documents(&corpus_path))?;
        pipeline.tokenize(force)?;
        pipeline.build_index(force)?;
        Ok(pipeline.into_parts())
    });
    let judgments = spawn_load(files.relevance, cisi::load_judgments);
    let boolean_queries = spawn_load(files.boolean_queries, cisi::load_boolean_queries);
    let text_queries = spawn_load(files.text_queries, cisi::load_text_queries);

    let (corpus, judgments, boolean_queries, text_queries) =
        tokio::try_join!(corpus, judgments, boolean_queries, text_queries)?;
    let (documents, index) = corpus?;
    let judgments = judgments?.unwrap_or_else(|| {
        tracing::warn!("no relevance file found, every query will score 0");
        RelevanceJudgments::new()
    });

    Ok(Collection {
        documents: Arc::new(documents),
        index: Arc::new(index),
        judgments: Arc::new(judgments),
        boolean_queries: boolean_queries?.unwrap_or_default(),
        text_queries: text_queries?.unwrap_or_default(),
    })
}

/// Await per-query tasks in query order, one slot per query.
async fn collect_in_order(handles: Vec<JoinHandle<QueryOutcome>>) -> Result<Vec<QueryOutcome>> {
    let mut slots = Vec::with_capacity(handles.len());
    for handle in handles {
        slots.push(handle.await?);
    }
    Ok(slots)
}

async fn boolean(collection: &Collection, options: EvalOptions) -> Result<StrategyReport> {
    if collection.boolean_queries.is_empty() {
        tracing::warn!("no boolean queries loaded");
    }
    let handles = collection
        .boolean_queries
        .iter()
        .cloned()
        .map(|query| {
            let index = collection.index.clone();
            let judgments = collection.judgments.clone();
            tokio::task::spawn_blocking(move || run_boolean_query(&query, &index, &StandardAnalyzer, &judgments, options))
        })
        .collect();
    let outcomes = collect_in_order(handles).await?;
    let summary = summarize(&outcomes);
    print_outcomes("BOOLEAN", &outcomes, &summary, false);
    Ok(StrategyReport::new("boolean", &outcomes, summary))
}

async fn semantic(collection: &Collection, args: &VectorArgs) -> Result<StrategyReport> {
    let config = HashingEmbedderConfig { dimension: args.dimension, max_sequence_length: args.max_seq_len };
    let embedder = Arc::new(match &args.vocab {
        Some(path) => HashingEmbedder::from_vocab_file(config, path)?,
        None => HashingEmbedder::new(config),
    });

    let documents = collection.documents.clone();
    let provider = embedder.clone();
    let vectors = tokio::task::spawn_blocking(move || VectorIndex::build(&documents, provider.as_ref())).await??;
    let vectors = Arc::new(vectors);
    tracing::info!(num_docs = vectors.len(), dimension = args.dimension, "embedded documents");

    let cutoff = args.top_k;
    let handles = collection
        .text_queries
        .iter()
        .cloned()
        .map(|query| {
            let vectors = vectors.clone();
            let embedder = embedder.clone();
            let judgments = collection.judgments.clone();
            tokio::task::spawn_blocking(move || run_vector_query(&query, &vectors, embedder.as_ref(), &judgments, cutoff))
        })
        .collect();
    let outcomes = collect_in_order(handles).await?;
    let summary = summarize(&outcomes);
    print_outcomes("VECTOR", &outcomes, &summary, true);
    Ok(StrategyReport::new("vector", &outcomes, summary))
}

fn inspect(index: &InvertedIndex, page: usize, limit: usize) {
    println!("Total Index :{}", index.num_terms());
    for (term, postings) in index.first_terms((page + 1) * limit).into_iter().skip(page * limit) {
        let ids: Vec<String> = postings.doc_ids().map(|d| d.to_string()).collect();
        println!("{term}\t{}\t{}", postings.total_frequency(), ids.join(","));
    }
}

fn finish(report: Option<&Path>, reports: Vec<StrategyReport>) -> Result<()> {
    if let Some(path) = report {
        write_report(path, &reports)?;
    }
    Ok(())
}
