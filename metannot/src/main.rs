use std::path::Path;
use std::process;
use std::str::FromStr;

use clap::Parser;
use log::{error, info};

use metcore::algorithm::network::{LinkMethod, NetworkParams};
use metcore::algorithm::propagation::PropagationParams;
use metcore::annotate::scoring::{DivergenceMode, ScoringParams};
use metcore::chemistry::adduct::Polarity;
use metcore::chemistry::catalog::AdductCatalog;

use metannot::catalog::snapshot::{load_catalog, save_catalog};
use metannot::data::reference::ReferenceStore;
use metannot::data::sample::{read_sample, read_scores, read_spectral_matches};
use metannot::error::MetannotError;
use metannot::pipeline::config::PipelineConfig;
use metannot::pipeline::report::save_report;
use metannot::pipeline::run::AnnotationPipeline;
use metannot::taxa::resolver::FileTaxonResolver;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// SQLite reference database with the reference_chemicals table
    #[arg(long)]
    reference_db: String,
    /// Sample feature document (JSON)
    #[arg(long)]
    sample: String,
    /// Pairwise spectral similarity scores (JSON)
    #[arg(long)]
    scores: String,
    /// Spectral library matches (JSON)
    #[arg(long)]
    matches: String,
    /// Pre-fetched organism lineages (JSON map of name to lineage)
    #[arg(long)]
    taxonomy: String,
    /// Output report path (JSON)
    #[arg(long)]
    output: String,
    /// Ionization mode, pos or neg
    #[arg(long, default_value_t = String::from("pos"))]
    polarity: String,
    /// Adduct catalog snapshot, reused across runs when present
    #[arg(long)]
    catalog_cache: Option<String>,
    /// Precursor mass tolerance in ppm
    #[arg(long, default_value_t = 10.0)]
    tolerance_ppm: f64,
    /// Minimum pairwise similarity for a network edge
    #[arg(long, default_value_t = 0.7)]
    score_cutoff: f64,
    /// Neighbor list size per node before edge retention
    #[arg(long, default_value_t = 15)]
    top_n: usize,
    /// Maximum surviving edges per node
    #[arg(long, default_value_t = 10)]
    max_links: usize,
    /// Edge retention rule, mutual or single
    #[arg(long, default_value_t = String::from("mutual"))]
    link_method: String,
    /// Weight annotations by propagated class consistency
    #[arg(long, default_value_t = false)]
    divergence: bool,
    /// Ranked annotations kept per feature
    #[arg(long, default_value_t = 5)]
    top_k: usize,
    /// Attempts per taxon lineage fetch
    #[arg(long, default_value_t = 3)]
    retry_attempts: u32,
    /// Rayon worker threads, 0 keeps the default pool size
    #[arg(long, default_value_t = 0)]
    num_threads: usize,
}

fn run(args: &Args) -> Result<(), MetannotError> {
    let polarity = Polarity::from_str(&args.polarity)?;
    let link_method = LinkMethod::from_str(&args.link_method)?;

    let config = PipelineConfig {
        polarity,
        tolerance_ppm: args.tolerance_ppm,
        network: NetworkParams {
            score_cutoff: args.score_cutoff,
            top_n: args.top_n,
            max_links: args.max_links,
            link_method,
            ..Default::default()
        },
        propagation: PropagationParams::default(),
        scoring: ScoringParams {
            divergence: if args.divergence {
                DivergenceMode::Enabled
            } else {
                DivergenceMode::Disabled
            },
            top_k: args.top_k,
        },
        retry_attempts: args.retry_attempts,
        num_threads: args.num_threads,
    };

    if config.num_threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build_global()
            .map_err(|e| MetannotError::Config(format!("failed to size the worker pool: {}", e)))?;
    }

    let store = ReferenceStore::open(&args.reference_db)?;
    info!("loaded {} reference rows from {}", store.len(), args.reference_db);

    let catalog = match &args.catalog_cache {
        Some(path) if Path::new(path).exists() => {
            let catalog = load_catalog(path, polarity)?;
            info!("loaded adduct catalog snapshot from {} ({} entries)", path, catalog.len());
            catalog
        }
        cache => {
            let catalog = AdductCatalog::build(polarity, store.formula_groups())?;
            info!("built adduct catalog with {} entries", catalog.len());
            if let Some(path) = cache {
                save_catalog(path, &catalog)?;
                info!("saved adduct catalog snapshot to {}", path);
            }
            catalog
        }
    };

    let sample = read_sample(&args.sample)?;
    let scores = read_scores(&args.scores)?;
    let matches = read_spectral_matches(&args.matches)?;
    let resolver = FileTaxonResolver::from_path(&args.taxonomy)?;

    let pipeline = AnnotationPipeline::new(store, catalog, config)?;
    let report = pipeline.annotate_sample(&sample, &scores, &matches, &resolver)?;
    save_report(&args.output, &report)?;
    info!(
        "sample {}: wrote {} annotation records to {}",
        report.sample_name,
        report.annotations.len(),
        args.output
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(error) = run(&args) {
        error!("annotation failed: {}", error);
        process::exit(1);
    }
}
