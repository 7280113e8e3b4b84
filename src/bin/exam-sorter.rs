//! Exam sorter CLI tool
//!
//! Splits scanned exam PDFs into one document per student and packs them
//! into a ZIP archive together with a summary and a preview.

use std::path::PathBuf;
use std::process;
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use exam_sorter::options::{DEFAULT_MAX_ANGLE, DEFAULT_SIZE_TOLERANCE, DEFAULT_ZOOM};
use exam_sorter::pdf::describe_pages;
use exam_sorter::{run_scan, PdfiumRasterizer, ScanOptions, ScanRequest, TracingEvents};

/// Exam sorter - One PDF per student from scanned, QR-labelled exams
#[derive(Parser)]
#[command(name = "exam-sorter")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Sort a batch of single-sided scans
    exam-sorter scan -o results.zip scans/*.pdf

    # Two-sided A3 scans, labels only on the front
    exam-sorter scan -o results.zip --split-a3 --two-page-scan batch1.pdf batch2.pdf

    # Check what the scanner produced
    exam-sorter info batch1.pdf")]
struct Cli {
    /// Show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read labels, assign pages and write the archive
    Scan(ScanArgs),

    /// Show the size class of every page of a PDF
    Info {
        /// PDF file to inspect
        input: PathBuf,

        /// Tolerance in points when matching A4/A3
        #[arg(long, default_value_t = DEFAULT_SIZE_TOLERANCE)]
        tolerance: f32,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Scanned PDF files (in order). Supports glob patterns like "*.pdf"
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Output ZIP archive
    #[arg(short, long)]
    output: PathBuf,

    /// Cut A3 sheets into A4 halves in reading order
    #[arg(long)]
    split_a3: bool,

    /// Give an unlabeled page to the student of the preceding page
    #[arg(long)]
    two_page_scan: bool,

    /// Only look for labels on the unrotated page
    #[arg(long)]
    quick: bool,

    /// Rasterization zoom factor
    #[arg(long, default_value_t = DEFAULT_ZOOM)]
    zoom: f32,

    /// Tolerance in points when matching A4/A3
    #[arg(long, default_value_t = DEFAULT_SIZE_TOLERANCE)]
    tolerance: f32,

    /// Largest rotation in degrees tried when a label is not found upright
    #[arg(long, default_value_t = DEFAULT_MAX_ANGLE)]
    max_angle: i32,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,

    /// Sort the summary by student name instead of scan order
    #[arg(long)]
    sort_summary: bool,

    /// Directory for intermediate files
    #[arg(long)]
    temp_dir: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Scan(args) => cmd_scan(args),
        Commands::Info { input, tolerance } => cmd_info(input, tolerance),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Expand glob patterns in input paths, keeping argument order
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        // Check if pattern contains glob characters
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched: Vec<PathBuf> = Vec::new();
            for entry in glob(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))? {
                match entry {
                    Ok(path) => matched.push(path),
                    Err(e) => tracing::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if matched.is_empty() {
                bail!("No files matched pattern: {}", pattern);
            }
            // Sort matches of one pattern for consistent ordering
            matched.sort();
            paths.extend(matched);
        } else {
            // No glob characters, treat as literal path
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

fn cmd_scan(args: ScanArgs) -> Result<()> {
    let inputs = expand_globs(args.inputs)?;

    let defaults = ScanOptions::default();
    let options = ScanOptions {
        split_a3: args.split_a3,
        two_page_scan: args.two_page_scan,
        quick_and_dirty: args.quick,
        zoom: args.zoom,
        size_tolerance: args.tolerance,
        max_angle: args.max_angle,
        workers: args.workers.unwrap_or(defaults.workers),
        sort_summary: args.sort_summary,
    }
    .validated()?;

    let rasterizer = PdfiumRasterizer::bind()?;

    let bar = ProgressBar::new(1000);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}%")?
            .progress_chars("#>-"),
    );
    let bar_handle = bar.clone();
    let events = TracingEvents::new().with_progress(move |fraction| {
        bar_handle.set_position((fraction * 1000.0).round() as u64);
    });

    let mut request = ScanRequest::new(inputs, args.output).with_options(options);
    if let Some(dir) = args.temp_dir {
        request = request.with_temp_dir(dir);
    }

    let outcome = run_scan(&request, &rasterizer, &events);
    bar.finish_and_clear();
    let outcome = outcome.context("Scan failed")?;

    println!("Archive: {}", outcome.archive.display());
    println!("Students: {}", outcome.summary.len());
    for row in &outcome.summary {
        println!("  {:<24} {:>4} pages", row.display_name, row.page_count);
    }
    if !outcome.missing.is_empty() {
        let numbers: Vec<String> = outcome.missing.iter().map(|p| (p + 1).to_string()).collect();
        println!("Unassigned pages: {}", numbers.join(", "));
    }

    Ok(())
}

/// Show page sizes of a PDF
fn cmd_info(input: PathBuf, tolerance: f32) -> Result<()> {
    let info = describe_pages(&input, tolerance)
        .with_context(|| format!("Failed to inspect {}", input.display()))?;

    println!("File: {}", input.display());
    if let Some(ref title) = info.title {
        println!("Title: {}", title);
    }
    println!("Pages: {}", info.pages.len());

    let (a4, a3, other) = info.size_counts();
    println!("A4: {}, A3: {}, other: {}", a4, a3, other);

    for page in &info.pages {
        let rotation = if page.rotate != 0 {
            format!(" (rotated {})", page.rotate)
        } else {
            String::new()
        };
        println!(
            "  {:>4}: {:>7.1} x {:<7.1} {}{}",
            page.number, page.width, page.height, page.size, rotation
        );
    }

    Ok(())
}
