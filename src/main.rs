use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use nexus_cli::{
    AskRequest, KnowledgeService, Language, MetadataFilter, display_banner, format_answer,
    format_documents, format_governance_stats, format_health, format_languages, format_pending,
    format_stats, handle_input_with_history, print_help,
};

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Offline campus knowledge assistant", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check LLM, embedding and index readiness
    Health,
    /// Index documents (pdf, docx, pptx, txt, md, html)
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value = "anonymous")]
        uploader: String,
        /// Index files even when identical content was uploaded before
        #[arg(long)]
        allow_duplicates: bool,
    },
    /// Ask a question about the indexed documents
    Ask {
        query: String,
        /// Answer language code
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long)]
        top_k: Option<usize>,
        #[arg(long)]
        no_sources: bool,
        /// Restrict retrieval to chunks whose metadata matches
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,
        #[arg(long, default_value = "anonymous")]
        user: String,
    },
    /// Interactive question loop
    Chat {
        #[arg(long, default_value = "en")]
        lang: String,
        #[arg(long, default_value = "anonymous")]
        user: String,
    },
    /// Index statistics and pipeline settings
    Stats,
    /// List indexed documents
    Documents,
    /// Remove a document from the index
    Delete { document_id: String },
    /// List supported answer languages
    Languages,
    /// Document approval workflow
    Governance {
        #[command(subcommand)]
        action: GovernanceCommand,
    },
}

#[derive(Subcommand)]
enum GovernanceCommand {
    Stats,
    Pending,
    Approve {
        document_id: String,
        #[arg(long, default_value = "admin")]
        approver: String,
    },
    Reject {
        document_id: String,
        #[arg(long)]
        reason: Option<String>,
        #[arg(long, default_value = "admin")]
        approver: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nexus=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Languages = cli.command {
        print!("{}", format_languages());
        return Ok(());
    }

    let service = KnowledgeService::from_env().await?;
    debug!(config = ?service.config(), "service ready");

    match cli.command {
        Commands::Health => {
            print!("{}", format_health(&service.health().await));
        }
        Commands::Ingest {
            files,
            uploader,
            allow_duplicates,
        } => ingest(&service, &files, &uploader, allow_duplicates).await?,
        Commands::Ask {
            query,
            lang,
            top_k,
            no_sources,
            filters,
            user,
        } => {
            let mut request = AskRequest::new(query)
                .language(language(&lang))
                .include_sources(!no_sources);
            if let Some(top_k) = top_k {
                request = request.top_k(top_k);
            }
            if !filters.is_empty() {
                request = request.filter(parse_filters(&filters)?);
            }
            let response = service.ask(&request, &user).await?;
            print!("{}", format_answer(&response));
        }
        Commands::Chat { lang, user } => chat(&service, language(&lang), &user).await?,
        Commands::Stats => {
            print!("{}", format_stats(&service.stats().await?));
        }
        Commands::Documents => {
            print!("{}", format_documents(&service.documents().await?));
        }
        Commands::Delete { document_id } => {
            let removed = service.delete(&document_id).await?;
            println!("{} Deleted {} ({} chunks)", "✓".green(), document_id, removed);
        }
        Commands::Governance { action } => governance(&service, action).await?,
        // printed before the service is built
        Commands::Languages => {}
    }

    Ok(())
}

/// Unsupported codes fall back to English
fn language(code: &str) -> Language {
    Language::parse(code).unwrap_or_else(|| {
        eprintln!("{} Unsupported language '{}', answering in English", "⚠".yellow(), code);
        Language::default()
    })
}

fn parse_filters(filters: &[String]) -> Result<MetadataFilter> {
    filters.iter().try_fold(MetadataFilter::new(), |filter, expr| {
        match MetadataFilter::parse_condition(expr) {
            Some((key, value)) => Ok(filter.with(key, value)),
            None => bail!("invalid filter '{}', expected KEY=VALUE", expr),
        }
    })
}

async fn ingest(
    service: &KnowledgeService,
    files: &[PathBuf],
    uploader: &str,
    allow_duplicates: bool,
) -> Result<()> {
    let mut failed = 0;
    for path in files {
        match service.ingest(path, uploader, allow_duplicates).await {
            Ok(result) => println!(
                "{} {} → {} ({} chunks)",
                "✓".green(),
                result.filename.cyan(),
                result.document_id,
                result.total_chunks
            ),
            Err(e) => {
                failed += 1;
                eprintln!("{} {}: {}", "✗".red(), path.display(), e);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed to ingest", failed, files.len());
    }
    Ok(())
}

async fn chat(service: &KnowledgeService, mut language: Language, user: &str) -> Result<()> {
    display_banner();
    let mut history = Vec::new();

    while let Some(input) = handle_input_with_history(&mut history).await? {
        if input.is_empty() {
            continue;
        }

        match input.to_lowercase().as_str() {
            "exit" | "quit" => break,
            "help" => {
                print_help();
                continue;
            }
            "languages" => {
                print!("{}", format_languages());
                continue;
            }
            _ => {}
        }

        if let Some(code) = input.strip_prefix("lang ") {
            language = self::language(code.trim());
            println!("{} Answering in {}", "✓".green(), language);
            continue;
        }

        let request = AskRequest::new(input.as_str()).language(language);
        match service.ask(&request, user).await {
            Ok(response) => println!("{}", format_answer(&response)),
            Err(e) if e.is_retryable() => {
                eprintln!("{} {} (is Ollama running?)", "⚠".yellow(), e)
            }
            Err(e) => eprintln!("{} {}", "✗".red(), e),
        }
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}

async fn governance(service: &KnowledgeService, action: GovernanceCommand) -> Result<()> {
    match action {
        GovernanceCommand::Stats => print!("{}", format_governance_stats(&service.governance_stats().await)),
        GovernanceCommand::Pending => print!("{}", format_pending(&service.pending_documents().await)),
        GovernanceCommand::Approve { document_id, approver } => {
            let record = service.approve(&document_id, &approver).await?;
            println!("{} Approved {} ({})", "✓".green(), document_id, record.filename);
        }
        GovernanceCommand::Reject {
            document_id,
            reason,
            approver,
        } => {
            let record = service.reject(&document_id, reason.as_deref(), &approver).await?;
            println!(
                "{} Rejected {} ({}): {}",
                "✓".green(),
                document_id,
                record.filename,
                record.rejection_reason.unwrap_or_default()
            );
        }
    }
    Ok(())
}
