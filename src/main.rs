//! Holdnet CLI: build a holdings table from a filing archive, or build the
//! network + similarity artifacts from a persisted table.

use anyhow::Context;
use clap::{Parser, Subcommand};
use holdnet::corpus::{self, CorpusBuilder};
use holdnet::pipeline::{build_network, BuildError, NetworkParams};
use holdnet::similarity::Linkage;
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "holdnet", version, about = "13F-HR holdings network analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a downloaded filing archive into a holdings table CSV
    BuildCorpus {
        /// Archive root (the tree holding full-submission.txt files)
        #[arg(long)]
        root: PathBuf,

        /// Output CSV path
        #[arg(long)]
        out: PathBuf,

        /// Cap on documents to process
        #[arg(long)]
        max: Option<usize>,
    },
    /// Build the bipartite network and similarity matrix from a table
    BuildNetwork {
        /// Persisted holdings table CSV
        #[arg(long)]
        table: PathBuf,

        /// Reporting year the table covers
        #[arg(long, default_value_t = 2017)]
        year: u16,

        /// Edge threshold on normalized value, in (0, 1]
        #[arg(long, default_value_t = 0.5)]
        threshold: f64,

        /// Linkage criterion: single, complete, centroid or ward
        #[arg(long, default_value = "ward")]
        linkage: String,

        /// Layout spread factor (> 0)
        #[arg(long, default_value_t = 0.4)]
        gravity: f64,

        /// Number of issuer labels to resolve
        #[arg(long, default_value_t = 20)]
        labels: usize,

        /// Drop nodes below this degree (0 disables)
        #[arg(long, default_value_t = 0)]
        min_degree: usize,

        /// Seeded subsample fraction of records, in (0, 1]
        #[arg(long)]
        sample_fraction: Option<f64>,

        /// Seed for layout and subsample
        #[arg(long, default_value_t = holdnet::DEFAULT_SEED)]
        seed: u64,

        /// Output JSON path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildCorpus { root, out, max } => {
            let mut builder = CorpusBuilder::new(&root);
            if let Some(max) = max {
                builder = builder.with_max_documents(max);
            }
            let (_, summary) = builder
                .build_and_save(&out)
                .with_context(|| format!("building corpus from {}", root.display()))?;
            println!(
                "parsed {} filings ({} skipped), {} records -> {}",
                summary.parsed,
                summary.skipped,
                summary.records,
                out.display()
            );
        }
        Commands::BuildNetwork {
            table,
            year,
            threshold,
            linkage,
            gravity,
            labels,
            min_degree,
            sample_fraction,
            seed,
            out,
        } => {
            let linkage: Linkage = linkage.parse().map_err(BuildError::Config)?;
            let holdings = corpus::load_table(&table)
                .with_context(|| format!("loading {}", table.display()))?;
            let params = NetworkParams {
                year,
                threshold,
                linkage,
                gravity,
                label_count: labels,
                min_degree,
                sample_fraction,
                seed,
            };
            let (network, similarity) = build_network(&holdings, &params)?;

            let artifact = json!({
                "params": params,
                "network": network,
                "similarity": similarity,
            });
            let rendered = serde_json::to_string_pretty(&artifact)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)?;
                    println!(
                        "{} nodes, {} edges -> {}",
                        network.nodes.len(),
                        network.edges.len(),
                        path.display()
                    );
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}
