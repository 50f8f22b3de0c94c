//! Domain Grid - check every base name against every TLD
//!
//! A small CLI over the domain_grid engine: collects names and TLDs,
//! shows live progress, then prints the filtered and sorted grid.

use domain_grid::{
    domain::{parse_base_names, parse_tlds, POPULAR_TLDS},
    run::view::{self, count_statuses},
    CheckConfig, CheckOrchestrator, DomainGridError, DomainStatus, GridRow, RowFilter, SortKey,
    SortState,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::env;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Parsed command line
#[derive(Debug, Default)]
struct CliOptions {
    names: Vec<String>,
    tlds: Option<String>,
    filter: RowFilter,
    sort: Option<SortKey>,
    descending: bool,
    output: Option<PathBuf>,
    show_reasons: bool,
}

enum Command {
    Help,
    Version,
    Check(CliOptions),
}

#[tokio::main]
async fn main() {
    if let Err(e) = domain_grid::init() {
        eprintln!("❌ Failed to initialize: {}", e);
        process::exit(1);
    }
    init_tracing();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            println!("domain-grid {}", domain_grid::VERSION);
            return;
        }
        Ok(Command::Check(options)) => options,
        Err(e) => {
            eprintln!("{}", e.user_message());
            process::exit(2);
        }
    };

    if let Err(e) = run(options).await {
        match e.downcast_ref::<DomainGridError>() {
            Some(err) => {
                eprintln!("{}", err.user_message());
                process::exit(if err.is_input_error() { 2 } else { 1 });
            }
            None => {
                eprintln!("❌ Error: {:#}", e);
                process::exit(1);
            }
        }
    }
}

/// Log to stderr so results on stdout stay clean
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_args(args: &[String]) -> Result<Command, DomainGridError> {
    let mut options = CliOptions::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "-t" | "--tlds" => options.tlds = Some(value_for(arg, iter.next())?),
            "-s" | "--search" => options.filter.search = Some(value_for(arg, iter.next())?),
            "-o" | "--output" => options.output = Some(PathBuf::from(value_for(arg, iter.next())?)),
            "--sort" => {
                let key = value_for(arg, iter.next())?;
                options.sort = Some(match key.as_str() {
                    "name" => SortKey::BaseName,
                    tld => SortKey::Tld(tld.trim_start_matches('.').to_lowercase()),
                });
            }
            "--desc" => options.descending = true,
            "--available" => options.filter.has_available = true,
            "--no-taken" => options.filter.no_taken = true,
            "--no-invalid" => options.filter.no_invalid = true,
            "--brandable" => options.filter.brandable = true,
            "--reasons" => options.show_reasons = true,
            other if other.starts_with('-') && other.len() > 1 => {
                return Err(DomainGridError::cli(format!("Unknown option: {}", other)));
            }
            name => options.names.push(name.to_string()),
        }
    }

    Ok(Command::Check(options))
}

fn value_for(flag: &str, value: Option<&String>) -> Result<String, DomainGridError> {
    value
        .cloned()
        .ok_or_else(|| DomainGridError::cli(format!("{} requires a value", flag)))
}

/// Collect input, run the checks and print the grid
async fn run(options: CliOptions) -> anyhow::Result<()> {
    let (names, tlds) = collect_input(&options)?;

    let config = CheckConfig::from_env()?;
    let orchestrator = Arc::new(CheckOrchestrator::new(config)?);

    let handle = orchestrator.start(&names, &tlds)?;
    let submission = handle.submission();
    if !submission.rejected_base_names.is_empty() {
        eprintln!("⚠️  Skipped invalid names: {}", submission.rejected_base_names.join(", "));
    }
    if !submission.rejected_tlds.is_empty() {
        eprintln!("⚠️  Skipped invalid TLDs: {}", submission.rejected_tlds.join(", "));
    }

    println!(
        "🔍 Checking {} names × {} TLDs ({} domains)...",
        submission.base_names.len(),
        submission.tlds.len(),
        handle.total_checks()
    );

    let bar = progress_bar(handle.total_checks() as u64);
    let watcher = {
        let orchestrator = Arc::clone(&orchestrator);
        let bar = bar.clone();
        let mut revisions = orchestrator.subscribe();
        tokio::spawn(async move {
            while revisions.changed().await.is_ok() {
                let counts = count_statuses(&orchestrator.snapshot());
                bar.set_position((counts.total() - counts.checking) as u64);
                bar.set_message(format!("{} available", counts.available));
            }
        })
    };

    let report = handle.wait().await;
    watcher.abort();
    bar.finish_and_clear();

    let Some(report) = report else {
        return Err(DomainGridError::internal("Run was cancelled before finishing").into());
    };

    let mut rows = options.filter.apply(&orchestrator.snapshot());
    let mut sort = SortState::new(options.sort.clone().unwrap_or(SortKey::BaseName));
    if options.descending {
        sort.toggle(sort.key.clone());
    }
    sort.sort(&mut rows);

    print_grid(&rows, &submission_tlds(&orchestrator.snapshot()), options.show_reasons);

    println!();
    println!("📈 {}", orchestrator.summary());
    println!(
        "   Started {} · {} of {} rows shown",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
        rows.len(),
        orchestrator.snapshot().len()
    );

    if let Some(path) = &options.output {
        let written = view::export_available(&rows, path)?;
        println!("💾 Wrote {} available domain(s) to {}", written, path.display());
    }

    Ok(())
}

/// Names and TLDs from arguments, or interactively when attached to a terminal
fn collect_input(options: &CliOptions) -> anyhow::Result<(Vec<String>, Vec<String>)> {
    let default_tlds = POPULAR_TLDS.join(",");

    if !options.names.is_empty() {
        let names = parse_base_names(&options.names.join(" "));
        let tlds = parse_tlds(options.tlds.as_deref().unwrap_or(&default_tlds));
        return Ok((names, tlds));
    }

    if !std::io::stdin().is_terminal() {
        return Err(DomainGridError::input("No base names provided").into());
    }

    let names = inquire::Text::new("Base names:")
        .with_help_message("Separate names with spaces, commas or new lines")
        .prompt()?;
    let tlds = match &options.tlds {
        Some(tlds) => tlds.clone(),
        None => inquire::Text::new("TLDs:")
            .with_default(&default_tlds)
            .with_help_message("Comma separated, e.g. com,io,dev")
            .prompt()?,
    };

    Ok((parse_base_names(&names), parse_tlds(&tlds)))
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    let style = ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// TLD column order as submitted
fn submission_tlds(rows: &[Arc<GridRow>]) -> Vec<String> {
    rows.first()
        .map(|row| row.cells.iter().map(|c| c.tld.clone()).collect())
        .unwrap_or_default()
}

fn print_grid(rows: &[Arc<GridRow>], tlds: &[String], show_reasons: bool) {
    if rows.is_empty() {
        println!("No rows match the current filters.");
        return;
    }

    let name_width = rows.iter().map(|r| r.base_name.len()).max().unwrap_or(4).max(4);
    let widths: Vec<usize> = tlds.iter().map(|t| (t.len() + 1).max(9)).collect();

    print!("{:<width$}", "name", width = name_width + 2);
    for (tld, width) in tlds.iter().zip(&widths) {
        print!("{:<width$}", format!(".{}", tld), width = width + 1);
    }
    println!();

    for row in rows {
        print!("{:<width$}", row.base_name, width = name_width + 2);
        for (tld, width) in tlds.iter().zip(&widths) {
            let label = row.cell(tld).map(|c| status_label(c.status)).unwrap_or("-");
            print!("{:<width$}", label, width = width + 1);
        }
        println!();

        if show_reasons {
            for cell in &row.cells {
                if let Some(reason) = &cell.reason {
                    println!("    {}.{}: {}", row.base_name, cell.tld, reason);
                }
            }
        }
    }
}

fn status_label(status: DomainStatus) -> &'static str {
    match status {
        DomainStatus::Available => "available",
        DomainStatus::Taken => "taken",
        DomainStatus::Invalid => "invalid",
        DomainStatus::Checking => "checking",
        DomainStatus::Idle => "idle",
    }
}

/// Print help information
fn print_help() {
    println!("🌐 Domain Grid - bulk domain availability over DNS-over-HTTPS");
    println!("═════════════════════════════════════════════════════════════");
    println!();
    println!("USAGE:");
    println!("    domain-grid [OPTIONS] [NAMES]...");
    println!();
    println!("OPTIONS:");
    println!("    -t, --tlds <LIST>     Comma separated TLDs (default: {})", POPULAR_TLDS.join(","));
    println!("    -s, --search <TEXT>   Only rows whose name contains TEXT");
    println!("        --available       Only rows with at least one available TLD");
    println!("        --no-taken        Hide rows with any taken TLD");
    println!("        --no-invalid      Hide rows with any invalid TLD");
    println!("        --brandable       Only consonant-led names with a vowel");
    println!("        --sort <KEY>      Sort by 'name' or by a TLD column");
    println!("        --desc            Sort descending");
    println!("        --reasons         Print the lookup trail for every cell");
    println!("    -o, --output <FILE>   Write available domains to FILE");
    println!("    -h, --help            Print help");
    println!("    -V, --version         Print version");
    println!();
    println!("EXAMPLES:");
    println!("    domain-grid foo bar baz --tlds com,io,dev");
    println!("    domain-grid acme,zeno --available --sort com");
    println!();
    println!("ENVIRONMENT VARIABLES:");
    println!("    DOMAIN_GRID_CONCURRENCY       Max concurrent domain checks (default: 64)");
    println!("    DOMAIN_GRID_TIMEOUT_SECS      Per-request timeout (default: 10)");
    println!("    DOMAIN_GRID_FLUSH_MS          Grid refresh interval (default: 300)");
    println!("    DOMAIN_GRID_MAX_COMBINATIONS  Submission ceiling (default: 50000)");
    println!("    DOMAIN_GRID_DOH_PROVIDERS     name=url,... (default: Cloudflare, Google)");
    println!("    RUST_LOG                      Log filter (default: warn)");
}
