use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use genmeta::metadata::ImageMetadata;
use genmeta::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "genmeta",
    version,
    about = "Show the AI generation metadata (prompt, sampler, seed, model, workflow) stored in PNG and JPEG files"
)]
struct Cli {
    /// Image files or directories to read
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Include the raw payload text in the output
    #[arg(long)]
    raw: bool,

    /// Skip standard EXIF tag decoding
    #[arg(long = "no-exif")]
    no_exif: bool,

    /// List the decoded EXIF tags in table output
    #[arg(long = "show-exif")]
    show_exif: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Load config, then apply CLI overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if cli.json {
        config.output.json = true;
    }
    if cli.raw {
        config.extraction.include_raw_text = true;
    }
    if cli.no_exif {
        config.extraction.decode_exif = false;
    }

    let images = pipeline::collect_images(&cli.paths, &config);
    if images.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }
    log::info!("Found {} image(s) to read", images.len());

    let total = images.len();
    let mut results = Vec::with_capacity(total);

    for (i, image_path) in images.iter().enumerate() {
        log::debug!("[{}/{}] Reading: {}", i + 1, total, image_path.display());

        let result = pipeline::process_image(image_path, &config);

        match (&result.metadata, &result.error) {
            (_, Some(err)) => log::error!("{}: {err}", image_path.display()),
            (Some(meta), None) if !config.output.json => {
                print_metadata(image_path, meta, cli.show_exif, config.extraction.include_raw_text)
            }
            _ => {}
        }

        results.push(result);
    }

    // JSON output
    if config.output.json {
        let json_results: Vec<serde_json::Value> = results
            .iter()
            .map(|r| {
                serde_json::json!({
                    "path": r.path.display().to_string(),
                    "metadata": r.metadata,
                    "error": r.error,
                })
            })
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    let with_ai = results
        .iter()
        .filter(|r| r.metadata.as_ref().is_some_and(ImageMetadata::has_ai))
        .count();
    let failed = results.iter().filter(|r| r.error.is_some()).count();
    log::info!("Done: {with_ai} with generation metadata, {failed} unreadable, out of {total} images");

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Max width for the value column before wrapping.
const VAL_WIDTH: usize = 46;
/// Indent for continuation lines (tag column width + " : " = 25 chars + 2 leading spaces).
const INDENT: &str = "                           ";

/// Print one file's record, organized by section.
fn print_metadata(path: &std::path::Path, meta: &ImageMetadata, show_exif: bool, show_raw: bool) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));
    print_row("Type", &meta.file_type);
    print_row("Size", &format!("{} bytes", meta.file_size));
    if let Some(modified) = meta.last_modified {
        print_row("Modified", &modified.to_rfc3339());
    }
    println!();

    // --- Generation ---
    if meta.has_ai() {
        println!("  {BOLD}{GREEN}Generation{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (label, value) in meta.provenance.display_rows() {
            print_row(&label, &value);
        }
        if meta.provenance.workflow_graph.is_some() {
            print_row("Workflow", "(ComfyUI graph, see --json)");
        }
        if show_raw {
            if let Some(raw) = &meta.provenance.raw_text {
                print_row("Raw", raw);
            }
        }
        println!();
    } else {
        println!("  {DIM}(no generation metadata found){RESET}");
        println!();
    }

    // --- EXIF ---
    if show_exif && !meta.exif.is_empty() {
        println!("  {BOLD}EXIF{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for (tag, value) in &meta.exif {
            print_row(tag, value);
        }
        println!();
    }

    // --- Diagnostics ---
    if !meta.diagnostics.is_empty() {
        println!("  {BOLD}Diagnostics{RESET}");
        println!("  {DIM}{}{RESET}", "─".repeat(70));
        for diagnostic in &meta.diagnostics {
            println!("  {DIM}{diagnostic}{RESET}");
        }
        println!();
    }
}

/// Print a single row in the display table.
fn print_row(tag: &str, val: &str) {
    let tag_col = format!("{:<22}", tag);
    let lines = wrap_text(val, VAL_WIDTH);
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            println!("  {tag_col} : {line}");
        } else {
            println!("  {INDENT}{line}");
        }
    }
}

/// Wrap text at word boundaries to fit within max_width, keeping explicit line breaks.
fn wrap_text(s: &str, max_width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in s.lines() {
        let mut current_line = String::new();
        for word in paragraph.split_whitespace() {
            if current_line.is_empty() {
                current_line = word.to_string();
            } else if current_line.len() + 1 + word.len() <= max_width {
                current_line.push(' ');
                current_line.push_str(word);
            } else {
                lines.push(current_line);
                current_line = word.to_string();
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(s.to_string());
    }

    lines
}
