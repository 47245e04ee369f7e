use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use reviser_core::ChatAnswer;
use reviser_llm::Generator;
use reviser_observability::{init_tracing, AppMetrics};
use reviser_retrieval::{rank_chunks, ContextSelector, SelectorConfig};
use reviser_storage::Store;
use reviser_tutor::{extract_pdf, is_pdf_filename, TutorService, TutorSettings};
use serde::Serialize;
use tracing::warn;
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[command(name = "reviser")]
#[command(about = "Coursebook Reviser CLI")]
struct Cli {
    #[arg(long, env = "REVISER_DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Context {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        query: String,
        #[arg(long, default_value_t = reviser_retrieval::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        #[arg(long, default_value_t = reviser_retrieval::DEFAULT_TOP_K)]
        top_k: usize,
        /// Print the chunk ranking instead of the selected text.
        #[arg(long)]
        explain: bool,
    },
    Ingest { path: PathBuf },
    Pdfs,
    Quiz {
        #[arg(long)]
        pdf_id: String,
    },
    Ask {
        #[arg(long)]
        pdf_id: String,
        question: String,
    },
    Chat {
        #[arg(long)]
        pdf_id: String,
    },
    Videos {
        #[arg(long)]
        pdf_id: String,
    },
    Progress,
}

#[derive(Debug, Serialize)]
struct ChunkExplanation {
    index: usize,
    score: usize,
    overlap: usize,
    frequency: usize,
    selected: bool,
    preview: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("reviser_cli");
    let cli = Cli::parse();

    if let Command::Context {
        file,
        query,
        chunk_size,
        top_k,
        explain,
    } = &cli.command
    {
        return run_context(file, query, *chunk_size, *top_k, *explain);
    }

    let tutor = build_tutor(cli.database_url.as_deref()).await?;

    match cli.command {
        Command::Context { .. } => {}
        Command::Ingest { path } => run_ingest(&tutor, &path).await?,
        Command::Pdfs => print_json(&tutor.list_pdfs().await?)?,
        Command::Quiz { pdf_id } => print_json(&tutor.generate_quiz(&pdf_id).await?)?,
        Command::Ask { pdf_id, question } => {
            let answer = tutor.chat(&pdf_id, &question).await?;
            print_answer(&answer);
        }
        Command::Chat { pdf_id } => run_chat(&tutor, &pdf_id).await?,
        Command::Videos { pdf_id } => print_json(&tutor.recommend_videos(&pdf_id).await?)?,
        Command::Progress => print_json(&tutor.progress().await?)?,
    }

    Ok(())
}

fn run_context(
    file: &Path,
    query: &str,
    chunk_size: usize,
    top_k: usize,
    explain: bool,
) -> Result<()> {
    let text = read_document(file)?;
    let selector = ContextSelector::new(SelectorConfig { chunk_size, top_k });
    let selected = selector.select(&text, query);

    if !explain {
        println!("{}", selected.text);
        return Ok(());
    }

    let ranking = rank_chunks(&text, query, chunk_size)
        .into_iter()
        .map(|chunk| ChunkExplanation {
            index: chunk.index,
            score: chunk.score,
            overlap: chunk.overlap,
            frequency: chunk.frequency,
            selected: selected.chunk_indices.contains(&chunk.index),
            preview: chunk.text.chars().take(80).collect(),
        })
        .collect::<Vec<_>>();

    print_json(&serde_json::json!({
        "path": selected.path,
        "total_chunks": selected.total_chunks,
        "chunk_indices": selected.chunk_indices,
        "ranking": ranking,
    }))
}

fn read_document(file: &Path) -> Result<String> {
    let name = file.to_string_lossy();
    if is_pdf_filename(&name) {
        let bytes = fs::read(file).with_context(|| format!("failed reading {}", file.display()))?;
        let extracted = extract_pdf(&bytes)?;
        return Ok(extracted.text);
    }

    fs::read_to_string(file).with_context(|| format!("failed reading {}", file.display()))
}

async fn run_ingest(tutor: &TutorService<Store>, path: &Path) -> Result<()> {
    let files = collect_pdf_paths(path)?;
    if files.is_empty() {
        bail!("no PDF files found under {}", path.display());
    }

    for file in files {
        let filename = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let bytes = fs::read(&file).with_context(|| format!("failed reading {}", file.display()))?;

        match tutor.upload_pdf(&filename, bytes).await {
            Ok(uploaded) => println!(
                "{}\t{}\t{} pages",
                uploaded.pdf_id, uploaded.filename, uploaded.page_count
            ),
            Err(err) => warn!(file = %file.display(), error = %err, "skipping file"),
        }
    }

    Ok(())
}

fn collect_pdf_paths(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed walking {}", path.display()))?;
        if entry.file_type().is_file() && is_pdf_filename(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

async fn run_chat(tutor: &TutorService<Store>, pdf_id: &str) -> Result<()> {
    println!("Coursebook Reviser chat mode. type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        match tutor.chat(pdf_id, message).await {
            Ok(answer) => print_answer(&answer),
            Err(err) => eprintln!("error: {err}\n"),
        }
    }

    Ok(())
}

fn print_answer(answer: &ChatAnswer) {
    println!("\n{}\n", answer.answer);
    if !answer.citation.is_empty() {
        println!("Source: \"{}\"\n", answer.citation);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn build_tutor(database_url: Option<&str>) -> Result<TutorService<Store>> {
    let store = match database_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => Store::sqlite(url).await?,
        None => {
            warn!("REVISER_DATABASE_URL is not set; documents will not outlive this process");
            Store::memory()
        }
    };
    let generator = Generator::from_env()?;

    Ok(TutorService::new(
        Arc::new(store),
        Arc::new(generator),
        TutorSettings::from_env(),
        AppMetrics::shared(),
    ))
}
