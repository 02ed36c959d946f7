mod display;
mod load;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use meritdraft_ai::{
    CompletionClient, EmbeddingClient, GeminiCompletion, GeminiConfig, GeminiEmbedder, RetryPolicy,
};
use meritdraft_core::{Criterion, Petition, SourceType};
use meritdraft_pipeline::{
    CriterionCatalog, DraftOrchestrator, DraftWorker, LegalContextRetriever, PipelineConfig,
    RetrievalFailurePolicy, SectionGenerator, build_query,
};
use meritdraft_store::{
    ChunkQuery, DuckStore, JobStore, LanceChunkStore, LegalChunkStore, PetitionStore,
    PurityFilter, StoreError,
};
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "meritdraft", version, about = "Draft O-1A/EB-1A support letters")]
struct Cli {
    /// DuckDB file holding petitions and jobs. In-memory when unset.
    #[arg(long, global = true, env = "MERITDRAFT_DB")]
    db: Option<PathBuf>,

    /// LanceDB directory holding the legal knowledge base.
    #[arg(long, global = true, env = "MERITDRAFT_LANCE", default_value = "data/lancedb")]
    lance: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Draft the document for a petition and print it.
    Generate {
        /// Petition record as JSON.
        petition: PathBuf,
        /// Regeneration feedback, stored on the petition.
        #[arg(long)]
        refine: Option<String>,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Override the generation model.
        #[arg(long)]
        model: Option<String>,
        /// Draft from empty context when a retrieval query cannot be embedded.
        #[arg(long)]
        continue_on_retrieval_error: bool,
    },
    /// Show a generation job.
    Status {
        job_id: Uuid,
        /// Print the raw job record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run one knowledge-base search, as the retriever would.
    Search {
        /// Criterion tag; omit for untagged (final merits) material.
        #[arg(long)]
        criterion: Option<Criterion>,
        #[arg(long, default_value = "regulation")]
        source_type: SourceType,
        #[arg(long, default_value = "")]
        field: String,
        /// Fact summary appended to the query.
        query: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Include losing arguments and dicta.
        #[arg(long)]
        unfiltered: bool,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
        api_key: String,
    },
    /// Replace the knowledge base with pre-embedded chunks from a JSON file.
    LoadChunks { file: PathBuf },
}

fn open_db(path: Option<&Path>) -> anyhow::Result<DuckStore> {
    match path {
        Some(p) => DuckStore::open_persistent(p)
            .with_context(|| format!("opening DuckDB at {}", p.display())),
        None => DuckStore::open().context("opening in-memory DuckDB"),
    }
}

fn embedding_client(config: &GeminiConfig) -> anyhow::Result<EmbeddingClient> {
    let backend = GeminiEmbedder::new(config).context("building embedding client")?;
    Ok(EmbeddingClient::new(Arc::new(backend), RetryPolicy::default()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    info!("meritdraft v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Generate {
            petition,
            refine,
            api_key,
            model,
            continue_on_retrieval_error,
        } => {
            let store = Arc::new(open_db(cli.db.as_deref())?);
            let petition = read_petition(&petition)?;
            upsert_petition(store.as_ref(), &petition).await?;

            let mut gemini = GeminiConfig::new(api_key)?;
            if let Some(model) = model.as_deref() {
                gemini = gemini.generation_model(model);
            }
            let mut config = PipelineConfig::default();
            if continue_on_retrieval_error {
                config.on_retrieval_error = RetrievalFailurePolicy::ContinueEmpty;
            }

            let chunks = LanceChunkStore::open(&cli.lance)
                .await
                .with_context(|| format!("opening LanceDB at {}", cli.lance.display()))?;
            let retriever = LegalContextRetriever::new(
                embedding_client(&gemini)?,
                Arc::new(chunks),
                config.limits,
            );
            let completion = CompletionClient::new(
                Arc::new(GeminiCompletion::new(&gemini).context("building completion client")?),
                RetryPolicy::default(),
            );
            let generator = SectionGenerator::new(
                completion,
                Arc::new(CriterionCatalog::default()),
                &config,
            );
            let orchestrator = Arc::new(DraftOrchestrator::new(
                store.clone(),
                store.clone(),
                Arc::new(retriever),
                Arc::new(generator),
                config,
            ));

            let job = orchestrator.create(petition.id, refine).await?;
            eprintln!("  Job {} created ({} steps)", job.id, job.steps.len());

            let worker = DraftWorker::spawn(orchestrator.clone(), 1);
            worker.submit(job.id).await?;
            worker.shutdown().await;

            let job = orchestrator.get_status(job.id).await?;
            display::print_job_card(&job);
            if let Some(message) = &job.error_message {
                bail!("generation failed: {message}");
            }
            let petition = PetitionStore::get(store.as_ref(), petition.id).await?;
            match petition.generated_content {
                Some(content) => println!("{content}"),
                None => bail!("job finished without a document"),
            }
        }
        Command::Status { job_id, json } => {
            let store = open_db(cli.db.as_deref())?;
            let job = JobStore::get(&store, job_id)
                .await
                .with_context(|| format!("loading job {job_id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                display::print_job_card(&job);
            }
        }
        Command::Search {
            criterion,
            source_type,
            field,
            query,
            limit,
            unfiltered,
            api_key,
        } => {
            let gemini = GeminiConfig::new(api_key)?;
            let text = build_query(criterion, &field, &query);
            eprintln!("  Query: {text}");
            let embedding = embedding_client(&gemini)?.embed_query(&text).await?;

            let chunks = LanceChunkStore::open(&cli.lance).await?;
            let purity = if unfiltered {
                PurityFilter::Unfiltered
            } else {
                PurityFilter::Enforced
            };
            let q = ChunkQuery::new(&embedding, criterion, source_type, limit).with_purity(purity);
            let hits = chunks.search_by_criterion(&q).await?;
            eprintln!("  {} result(s)\n", hits.len());
            for (i, chunk) in hits.iter().enumerate() {
                display::print_chunk_card(i + 1, chunk);
            }
        }
        Command::LoadChunks { file } => {
            let chunks = LanceChunkStore::open(&cli.lance).await?;
            let stats = load::load_chunks(&chunks, &file).await?;
            eprintln!(
                "  Loaded {} chunks in {:.1}s",
                stats.total_rows, stats.elapsed_secs
            );
        }
    }

    Ok(())
}

fn read_petition(path: &Path) -> anyhow::Result<Petition> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing petition {}", path.display()))
}

/// Create the petition, or replace the stored copy when it already exists.
async fn upsert_petition(store: &DuckStore, petition: &Petition) -> anyhow::Result<()> {
    match PetitionStore::create(store, petition).await {
        Ok(()) => Ok(()),
        Err(StoreError::AlreadyExists(_)) => {
            PetitionStore::update(store, petition).await?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
