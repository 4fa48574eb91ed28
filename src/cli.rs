//! Command-line interface components.

use crate::config::{InsightConfig, LimitPolicy};
use crate::constants::MAX_LISTED_VIOLATIONS;
use crate::models::FileSummary;
use crate::session::{InsightSession, StagedFile};
use crate::stats::{StatsSummary, format_index};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "measurement-insights")]
#[command(about = "Merge quality-inspection spreadsheets and report process capability")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Spreadsheet files or glob patterns, ingested together as one batch
    #[arg(value_name = "FILES", required = true, num_args = 1..)]
    pub files: Vec<String>,

    /// JSON configuration file (header synonyms, limit policy, extensions)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Withhold capability indices when specification limits differ between records
    #[arg(long)]
    pub uniform_limits: bool,

    /// Drop every ingested file with this name before reporting (repeatable)
    #[arg(long, value_name = "NAME")]
    pub remove: Vec<String>,

    /// List out-of-spec records
    #[arg(long)]
    pub out_of_spec: bool,

    /// Print the unified dataset and statistics as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the effective configuration from the file and flags
    pub fn load_config(&self) -> Result<InsightConfig> {
        let mut config = match &self.config {
            Some(path) => InsightConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => InsightConfig::default(),
        };
        if self.uniform_limits {
            config = config.with_limit_policy(LimitPolicy::RequireUniform);
        }
        Ok(config)
    }
}

/// Expand literal paths and glob patterns, preserving argument order
pub fn expand_inputs(inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for input in inputs {
        if !input.contains(['*', '?', '[']) {
            paths.push(PathBuf::from(input));
            continue;
        }

        let mut matched: Vec<PathBuf> = glob::glob(input)
            .with_context(|| format!("Invalid glob pattern '{}'", input))?
            .filter_map(|entry| entry.ok())
            .filter(|path| path.is_file())
            .collect();
        if matched.is_empty() {
            anyhow::bail!("No files match '{}'", input);
        }
        matched.sort();
        debug!("Pattern {} matched {} file(s)", input, matched.len());
        paths.extend(matched);
    }

    Ok(paths)
}

/// Ingest the requested files and print the report
pub async fn run(args: Args) -> Result<()> {
    let config = args.load_config()?;
    let paths = expand_inputs(&args.files)?;

    let mut session = InsightSession::new(config);

    // Step 1: Stage files
    let pb = if args.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(paths.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("Staging files");
    for path in &paths {
        let staged = StagedFile::from_path(path).await?;
        session.stage([staged]);
        pb.inc(1);
    }

    // Step 2: Process the batch
    pb.set_message("Processing batch");
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = session.process_staged().await;
    pb.finish_and_clear();
    let committed = result?;
    debug!("Committed {} of {} staged file(s)", committed.len(), paths.len());

    // Step 3: Apply removals
    for name in &args.remove {
        let ids: Vec<String> = session
            .files()
            .into_iter()
            .filter(|f| &f.name == name)
            .map(|f| f.id)
            .collect();
        if ids.is_empty() && !args.json {
            println!("{} no ingested file named {}", "Note:".bright_yellow(), name);
        }
        for id in ids {
            session.remove_file(&id);
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&session.snapshot())?);
        return Ok(());
    }

    let skipped = paths.len() - committed.len();
    print_repository(&session.files(), skipped);
    print_dashboard(&session);
    if args.out_of_spec {
        print_violations(&session);
    }
    Ok(())
}

fn print_repository(files: &[FileSummary], skipped: usize) {
    println!("\n{}", "Master Data Repository".bright_green().bold());
    println!(
        "  {} {}",
        "Files total:".bright_cyan(),
        files.len().to_string().bright_white().bold()
    );
    if skipped > 0 {
        println!(
            "  {} {}",
            "Skipped (no data):".bright_yellow(),
            skipped.to_string().bright_yellow()
        );
    }
    for file in files {
        println!(
            "  {} {} records | {:.1} KB",
            file.name.bright_white(),
            file.record_count,
            file.size_kb()
        );
    }
    if files.is_empty() {
        println!("  {}", "Repository is empty.".dimmed());
    }
}

fn print_dashboard(session: &InsightSession) {
    let (file_count, record_count) = session.overview();
    println!("\n{}", "Process Dashboard".bright_green().bold());
    println!(
        "  Monitoring {} files ({} records)",
        file_count.to_string().bright_white(),
        record_count.to_string().bright_white()
    );

    let Some(stats) = session.stats() else {
        println!("  {}", "No statistics available.".dimmed());
        return;
    };
    print_stats(stats);
}

fn print_stats(stats: &StatsSummary) {
    let rows = [
        ("Mean:", format!("{:.4}", stats.mean)),
        ("Std dev (n-1):", format!("{:.4}", stats.std_dev)),
        ("Min / Max:", format!("{:.4} / {:.4}", stats.min, stats.max)),
        (
            "Spec limits:",
            format!("LSL {} / USL {}", stats.spec_limits.lsl, stats.spec_limits.usl),
        ),
        ("Cp:", format_index(stats.capability.cp)),
        ("Cpk:", format_index(stats.capability.cpk)),
    ];
    for (label, value) in rows {
        println!("  {} {}", label.bright_cyan(), value);
    }

    let rate = format!(
        "{} ({:.1}%)",
        stats.out_of_spec_count,
        stats.out_of_spec_percent()
    );
    if stats.out_of_spec_count > 0 {
        println!("  {} {}", "Out of spec:".bright_red(), rate.bright_red().bold());
    } else {
        println!("  {} {}", "Out of spec:".bright_cyan(), rate.bright_green());
    }

    if !stats.limits_uniform {
        println!(
            "  {} specification limits differ between records",
            "Warning:".bright_yellow()
        );
    }
}

fn print_violations(session: &InsightSession) {
    let violations: Vec<_> = session
        .unified_view()
        .iter()
        .filter(|r| r.is_out_of_spec())
        .collect();

    println!("\n{}", "Out-of-spec Records".bright_red().bold());
    for record in violations.iter().take(MAX_LISTED_VIOLATIONS) {
        println!(
            "  #{:<6} {:<24} {:>12.4}  [{} .. {}]",
            record.index(), record.serial_number(), record.value(), record.lsl(), record.usl()
        );
    }
    if violations.len() > MAX_LISTED_VIOLATIONS {
        println!(
            "  {} more not shown",
            (violations.len() - MAX_LISTED_VIOLATIONS).to_string().dimmed()
        );
    }
    if violations.is_empty() {
        println!("  {}", "None".bright_green());
    }
}
