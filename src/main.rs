use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use supportrag::config::AppConfig;
use supportrag::database::Database;
use supportrag::llm::ChatMessage;
use supportrag::llm::LlmClient;
use supportrag::models::parse_import_records;
use supportrag::rag::CaseMatch;
use supportrag::rag::ContextAssembler;
use supportrag::rag::KnowledgeBase;
use supportrag::rag::KnowledgeSource;
use supportrag::rag::RagService;
use supportrag::vector::VectorStore;
use supportrag::Result;
use tracing::info;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "supportrag")]
#[command(about = "Customer-support knowledge retrieval and RAG chat CLI")]
#[command(version)]
struct Cli {
    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import tickets from a JSON file
    Import {
        /// Path to a JSON array of ticket records
        file: PathBuf,
        /// Clear existing data before importing
        #[arg(long)]
        clear: bool,
        /// Also rebuild the vector document index
        #[arg(long)]
        vector: bool,
    },
    /// Substring search over tickets
    Search {
        query: String,
        /// Exact category filter
        #[arg(short, long)]
        category: Option<String>,
        /// Maximum number of results
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
    /// Relevance search with the rendered context block
    Relevant {
        query: String,
        /// Maximum number of cases
        #[arg(short, long, default_value = "3")]
        limit: usize,
        /// Use the vector store instead of keyword matching
        #[arg(long)]
        semantic: bool,
    },
    /// Show one ticket with its full conversation
    Show {
        /// Ticket id
        id: Uuid,
    },
    /// Ask a one-shot retrieval-augmented question
    Ask {
        question: String,
        /// Use the vector store instead of keyword matching
        #[arg(long)]
        semantic: bool,
        /// Stream the answer token by token
        #[arg(long)]
        stream: bool,
    },
    /// Delete all knowledge base data
    Clear {
        /// Also clear the vector document index
        #[arg(long)]
        vector: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;

    if cli.verbose {
        supportrag::logging::init_simple_logging()?;
    } else {
        supportrag::logging::init_logging_with_config(Some(&config))?;
    }

    match cli.command {
        Commands::Import {
            file,
            clear,
            vector,
        } => import(&config, &file, clear, vector).await,
        Commands::Search {
            query,
            category,
            limit,
        } => search(&config, &query, category.as_deref(), limit).await,
        Commands::Relevant {
            query,
            limit,
            semantic,
        } => relevant(&config, &query, limit, semantic).await,
        Commands::Show { id } => show(&config, id).await,
        Commands::Ask {
            question,
            semantic,
            stream,
        } => ask(&config, &question, semantic, stream).await,
        Commands::Clear { vector } => clear(&config, vector).await,
    }
}

async fn import(config: &AppConfig, file: &Path, clear: bool, vector: bool) -> Result<()> {
    let json = std::fs::read_to_string(file)?;
    let (tickets, parse_failures) = parse_import_records(&json)?;
    info!(
        "Parsed {} ticket records ({} malformed)",
        tickets.len(),
        parse_failures.len()
    );

    let database = Database::from_config(config).await?;
    database.ensure_schema().await?;

    if clear {
        database.clear_all_data().await?;
    }

    let mut report = database
        .import_tickets(&tickets, config.import_batch_size())
        .await?;
    for failure in parse_failures {
        report.record_failure(failure.original_id, failure.reason);
    }

    println!(
        "Imported {} tickets, {} failed",
        report.success_count, report.error_count
    );
    for failure in &report.failures {
        println!("  ticket {}: {}", failure.original_id, failure.reason);
    }

    if vector {
        let store = VectorStore::from_config(config).await?;
        if clear {
            store.clear_documents().await?;
        }
        let vector_report = store.add_documents(&tickets).await?;
        println!(
            "Indexed {} documents, {} failed",
            vector_report.success_count, vector_report.error_count
        );
    }

    Ok(())
}

async fn search(
    config: &AppConfig,
    query: &str,
    category: Option<&str>,
    limit: i64,
) -> Result<()> {
    let database = Database::from_config(config).await?;
    let tickets = database.search_tickets(query, category, limit).await?;

    println!("Found {} ticket(s)", tickets.len());
    for ticket in tickets {
        println!(
            "  #{} [{}] {} ({})",
            ticket.original_id,
            ticket.category.as_deref().unwrap_or("未分类"),
            ticket.title,
            ticket.id
        );
    }

    Ok(())
}

async fn relevant(config: &AppConfig, query: &str, limit: usize, semantic: bool) -> Result<()> {
    let source = build_source(config, semantic).await?;
    let matches = source.search_relevant(query, limit).await?;
    let context = ContextAssembler::new().format_as_context(&matches);

    if context.is_empty() {
        println!("No relevant cases found");
    } else {
        println!("{context}");
    }

    Ok(())
}

async fn show(config: &AppConfig, id: Uuid) -> Result<()> {
    let database = Database::from_config(config).await?;
    let ticket = database.get_ticket_with_replies(id).await?;
    let context = ContextAssembler::new().format_as_context(&[CaseMatch::Ticket(ticket)]);
    println!("{context}");

    Ok(())
}

async fn ask(config: &AppConfig, question: &str, semantic: bool, stream: bool) -> Result<()> {
    let source = build_source(config, semantic).await?;
    let service = RagService::new(source, LlmClient::new(config)?, config);
    let messages = vec![ChatMessage::user(question)];

    if stream {
        let mut response = service.chat_stream(&messages, config.llm_model()).await?;
        let mut stdout = std::io::stdout();
        while let Some(chunk) = response.next_chunk().await {
            write!(stdout, "{}", chunk?)?;
            stdout.flush()?;
        }
        writeln!(stdout)?;
    } else {
        let answer = service.chat(&messages, config.llm_model()).await?;
        println!("{answer}");
    }

    Ok(())
}

async fn clear(config: &AppConfig, vector: bool) -> Result<()> {
    let database = Database::from_config(config).await?;
    database.clear_all_data().await?;

    if vector {
        let store = VectorStore::from_config(config).await?;
        store.clear_documents().await?;
    }

    println!("Knowledge base cleared");
    Ok(())
}

async fn build_source(config: &AppConfig, semantic: bool) -> Result<Arc<dyn KnowledgeSource>> {
    if semantic {
        Ok(Arc::new(VectorStore::from_config(config).await?))
    } else {
        let database = Arc::new(Database::from_config(config).await?);
        Ok(Arc::new(KnowledgeBase::new(database, config)))
    }
}
