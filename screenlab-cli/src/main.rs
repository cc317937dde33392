//! ScreenLab CLI — run screeners and check rule syntax.
//!
//! Commands:
//! - `run` — run every screener from a TOML config over a symbol catalog
//! - `check` — translate a single rule and print its compiled form

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use screenlab_core::indicators::IndicatorRegistry;
use screenlab_core::lang::{compile, Translator};
use screenlab_core::patterns::PatternRegistry;
use screenlab_runner::{
    CatalogEntry, CsvHistoryProvider, CsvSymbolCatalog, JsonDirSink, JsonFileStore, LogSink,
    NullStore, ResultSink, RunnerConfig, Screen, SymbolCatalog, TranslationStore,
};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "screenlab", about = "ScreenLab CLI — rule-based stock screener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all applicable screeners from a config file.
    Run {
        /// Path to a TOML config file with screener definitions.
        #[arg(long)]
        config: PathBuf,

        /// History root: <data-dir>/<timeframe>/<SYMBOL>.csv.
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Symbol catalog CSV (symbol,region[,ibd_relative_strength]).
        #[arg(long)]
        catalog: PathBuf,

        /// Restrict to screeners and symbols of one region.
        #[arg(long)]
        region: Option<String>,

        /// Reuse stored translations between runs.
        #[arg(long, default_value_t = false)]
        incremental: bool,

        /// Directory for stored translations (with --incremental).
        #[arg(long, default_value = "state")]
        state_dir: PathBuf,

        /// Output directory for outcome JSON; omit to log only.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Translate a rule and print the compiled statements.
    Check {
        /// The rule text, quoted.
        expression: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screenlab=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            config,
            data_dir,
            catalog,
            region,
            incremental,
            state_dir,
            output_dir,
        } => run_screeners(
            config,
            data_dir,
            catalog,
            region.as_deref(),
            incremental,
            state_dir,
            output_dir,
        ),
        Commands::Check { expression } => check_expression(&expression),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_screeners(
    config_path: PathBuf,
    data_dir: PathBuf,
    catalog_path: PathBuf,
    region: Option<&str>,
    incremental: bool,
    state_dir: PathBuf,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let config = RunnerConfig::from_toml_file(&config_path)?;
    if config.screeners.is_empty() {
        bail!("no screeners defined in {}", config_path.display());
    }
    if let Some(workers) = config.workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .context("failed to configure worker pool")?;
    }

    let indicators = IndicatorRegistry::builtin();
    let patterns = PatternRegistry::builtin();
    let translator = Translator::new(&indicators, &patterns);
    let provider = CsvHistoryProvider::new(&data_dir);
    let catalog = CsvSymbolCatalog::from_path(&catalog_path)?;
    let universe = catalog.for_region(region);
    if universe.is_empty() {
        bail!("catalog {} has no symbols for this run", catalog_path.display());
    }

    let store: Box<dyn TranslationStore> = if incremental {
        Box::new(JsonFileStore::new(&state_dir)?)
    } else {
        Box::new(NullStore)
    };
    let sink: Box<dyn ResultSink> = match output_dir {
        Some(dir) => Box::new(JsonDirSink::new(dir)?),
        None => Box::new(LogSink),
    };

    let screen = Screen {
        indicators: &indicators,
        patterns: &patterns,
        translator: &translator,
        provider: &provider,
        store: store.as_ref(),
        cancel: None,
    };

    let mut failures = 0usize;
    for def in &config.screeners {
        if let Some(region) = region {
            if !def.applies_to(region) {
                tracing::debug!(id = %def.id, region, "screener out of region");
                continue;
            }
        }
        let scoped: Vec<CatalogEntry>;
        let entries: &[CatalogEntry] = if def.symbols.is_empty() {
            &universe
        } else {
            scoped = universe
                .iter()
                .filter(|e| def.symbols.iter().any(|s| s.eq_ignore_ascii_case(&e.symbol)))
                .cloned()
                .collect();
            if scoped.is_empty() {
                tracing::warn!(id = %def.id, "no catalog entries match the screener's symbol list");
            }
            &scoped
        };
        tracing::info!(id = %def.id, name = %def.name, symbols = entries.len(), "running screener");
        match screen.run(def, entries) {
            Ok(outcome) => sink.publish(&outcome)?,
            Err(err) => {
                tracing::error!(id = %def.id, %err, "screener failed");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} screener(s) failed");
    }
    Ok(())
}

fn check_expression(expression: &str) -> Result<()> {
    let indicators = IndicatorRegistry::builtin();
    let patterns = PatternRegistry::builtin();
    let translator = Translator::new(&indicators, &patterns);
    let translation = compile(expression, &translator)
        .with_context(|| format!("rule '{expression}' does not translate"))?;
    println!("{}", serde_json::to_string_pretty(&translation)?);
    Ok(())
}
