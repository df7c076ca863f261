//! plscope - Bill statistics from the Brazilian Chamber of Deputies
//!
//! A CLI tool that collects the bills presented in a range of years from
//! the Chamber's open-data API, resolves their authors' parties and
//! writes a statistics report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (invalid arguments, config, unwritable output, etc.)
//!   2 - No bills found for the requested period

mod analysis;
mod api;
mod cache;
mod cli;
mod config;
mod models;
mod pacing;
mod report;
mod source;
#[cfg(test)]
mod testing;

use analysis::AggregateSettings;
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Report, ReportMetadata, SampleMode};
use report::RenderOptions;
use source::DataSource;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("plscope v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Run failed: {}", e);
            eprintln!("\n❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .plscope.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize the API endpoint, retries, pacing and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings and `RUST_LOG`.
fn init_logging(args: &Args) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(args, rust_log.as_deref()))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// `--verbose`/`--quiet` win, then `RUST_LOG`, then INFO.
fn log_filter(args: &Args, rust_log: Option<&str>) -> EnvFilter {
    let builder = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into());

    if args.verbose || args.quiet {
        return builder.parse_lossy("");
    }
    builder.parse_lossy(rust_log.unwrap_or(""))
}

/// Run the complete collection workflow. Returns exit code (0 or 2).
async fn run(args: Args) -> Result<i32> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let start_year = args.start_year;
    let end_year = args.effective_end_year();
    let sample_mode = SampleMode::from_use_all(args.all);

    let mut source = DataSource::from_config(&config)?;
    let base_url = source.client().base_url().to_string();

    // Step 1: Collect bills for the period
    println!(
        "📥 Collecting {} bills presented from {} to {}",
        config.aggregation.bill_type, start_year, end_year
    );
    println!("   API: {}", base_url);

    let spinner = collection_spinner(args.quiet);
    let bills = source.collect(start_year, end_year).await;
    spinner.finish_and_clear();

    if bills.is_empty() {
        eprintln!(
            "\n⚠️  No bills found between {} and {}. Try a different period or check the API.",
            start_year, end_year
        );
        for warning in source.client().take_warnings() {
            eprintln!("   - {}", warning);
        }
        return Ok(2);
    }
    println!("   Collected {} bills", bills.len());

    // Step 2: Per-month series
    let monthly = analysis::monthly_counts(&bills);

    // Step 3: Party counts
    let settings = AggregateSettings::from(&config);
    let bills_sampled = analysis::sample_ids(&bills, args.all, settings.sample_limit).len();

    println!(
        "\n🏛️  Resolving author parties for {}...",
        report::describe_sample(sample_mode, bills_sampled, bills.len())
    );
    if !args.all && bills_sampled < bills.len() {
        println!("   Use --all to resolve every bill (slower).");
    }

    let progress = aggregation_progress(args.quiet)?;
    let parties = analysis::party_counts(&mut source, &bills, args.all, &settings, &progress).await;
    progress.finish_and_clear();

    // Step 4: Build the report
    println!("\n📝 Generating report...");

    let preview = analysis::preview(&bills, config.report.preview_rows);
    let warnings = source.client().take_warnings();
    let duration = start_time.elapsed().as_secs_f64();

    let report = Report {
        metadata: ReportMetadata {
            source: base_url,
            start_year,
            end_year,
            sample_mode,
            bills_collected: bills.len(),
            bills_sampled,
            generated_at: Utc::now(),
            duration_seconds: duration,
        },
        monthly,
        parties,
        preview,
        warnings,
    };

    let options = RenderOptions {
        bar_width: config.report.bar_width,
    };
    report::write_report(&report, args.format, &options, &args.output)?;

    debug!("Cache: {:?}", source.cache_stats());

    // Print summary
    println!("\n📊 Summary:");
    println!("   Bills collected: {}", report.metadata.bills_collected);
    println!("   Months covered: {}", report.monthly.len());
    if report.parties.is_empty() {
        println!("   Parties: none could be determined");
    } else {
        let top: Vec<String> = report
            .parties
            .iter()
            .take(5)
            .map(|p| format!("{} {}", p.party, p.authors))
            .collect();
        println!(
            "   Parties: {} ({} authors) | Top: {}",
            report.parties.len(),
            report.parties.total(),
            top.join(", ")
        );
    }
    println!("   Duration: {:.1}s", duration);

    if !report.warnings.is_empty() {
        warn!("{} requests failed during the run", report.warnings.len());
        println!("\n⚠️  {} warnings (data may be partial):", report.warnings.len());
        for warning in &report.warnings {
            println!("   - {}", warning);
        }
    }

    println!("\n✅ Done! Report saved to: {}", args.output.display());

    Ok(0)
}

/// Spinner shown while listing pages are fetched.
fn collection_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Fetching bill listings...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Progress bar over the bills whose authors are resolved.
fn aggregation_progress(quiet: bool) -> Result<ProgressBar> {
    if quiet {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
