use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use core_types::SearchHit;
use embedder::{Device, HashEmbedder};
use engine::{BuildParams, IndexBuilder, QueryEngine, QueryOutcome};

/// Semantic retrieval over a labeled TSV corpus.
#[derive(Parser, Debug)]
#[command(name = "semsearch", version, about = "Build and query a semantic document index")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Embed a corpus and write the index/metadata blob pair.
    Build {
        /// Path to the gzip TSV corpus (label \t title \t text per line).
        #[arg(long, default_value = "./data/news.txt.gz")]
        input: PathBuf,
        /// Index blob output path.
        #[arg(long, default_value = "news.idx")]
        index_out: PathBuf,
        /// Metadata blob output path.
        #[arg(long, default_value = "news.meta")]
        meta_out: PathBuf,
        /// Embedding batch size (performance knob only).
        #[arg(long, default_value_t = 128)]
        batch_size: usize,
        /// Maximum documents to index; 0 = all.
        #[arg(long, default_value_t = 0)]
        max_docs: usize,
        /// Compute device for the embedding backend.
        #[arg(long, value_enum, env = "SEMSEARCH_DEVICE", default_value_t = DeviceArg::Cpu)]
        device: DeviceArg,
    },
    /// Run one free-text query against a built index.
    Query {
        /// Index blob path.
        #[arg(long)]
        index: PathBuf,
        /// Metadata blob path.
        #[arg(long)]
        meta: PathBuf,
        /// Query text.
        query: String,
        /// Number of results to return.
        #[arg(short, default_value_t = 5)]
        k: usize,
        /// Compute device for the embedding backend.
        #[arg(long, value_enum, env = "SEMSEARCH_DEVICE", default_value_t = DeviceArg::Cpu)]
        device: DeviceArg,
        /// Minimum similarity score; the default admits every cosine score.
        #[arg(long, default_value_t = -1.0)]
        min_score: f32,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum DeviceArg {
    Cpu,
    Cuda,
}

impl From<DeviceArg> for Device {
    fn from(value: DeviceArg) -> Self {
        match value {
            DeviceArg::Cpu => Device::Cpu,
            DeviceArg::Cuda => Device::Cuda,
        }
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            input,
            index_out,
            meta_out,
            batch_size,
            max_docs,
            device,
        } => {
            let emb = HashEmbedder::new(embedder::DEFAULT_DIM, device.into());
            let params = BuildParams {
                input,
                index_out,
                meta_out,
                batch_size,
                max_docs,
                progress: true,
            };
            let report = IndexBuilder::new(&emb)
                .build(&params)
                .context("index build failed")?;
            println!(
                "{} docs={} dim={} -> {}, {}",
                style("OK:").green().bold(),
                report.docs,
                report.dim,
                params.index_out.display(),
                params.meta_out.display()
            );
        }
        Commands::Query {
            index,
            meta,
            query,
            k,
            device,
            min_score,
        } => {
            let emb = HashEmbedder::new(embedder::DEFAULT_DIM, device.into());
            let engine = QueryEngine::load(&index, &meta).context("failed to load index")?;
            match engine.query(&emb, &query, k, min_score)? {
                QueryOutcome::Ranked(hits) => {
                    for hit in &hits {
                        print_hit(hit);
                    }
                }
                QueryOutcome::NoMatches => {
                    println!("{}", style("No results.").yellow());
                }
            }
        }
    }
    Ok(())
}

fn print_hit(hit: &SearchHit) {
    println!(
        "{} score={:.4}\n{}\n{}\n",
        style(format!("[{}]", hit.rank)).cyan().bold(),
        hit.score,
        style(&hit.title).bold(),
        hit.snippet
    );
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
