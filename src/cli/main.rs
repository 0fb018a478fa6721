use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use date_stamper::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "date-stamper",
    version,
    about = "Burn capture timestamps into photos, like classic film cameras"
)]
struct Cli {
    /// Image files or directories to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Directory to write stamped images to (default: next to each source)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Stamp this text instead of the extracted timestamp
    #[arg(long, value_name = "TEXT")]
    text: Option<String>,

    /// Run the pipeline without writing any files
    #[arg(long)]
    dry_run: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
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

    // Load config
    let mut config = config::Config::load(cli.config.as_deref())?;

    // CLI flags override config
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.out_dir.is_some() {
        config.output.out_dir = cli.out_dir.clone();
    }

    // Validate inputs
    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    // Collect images
    let paths = pipeline::collect_images(&cli.paths);
    if paths.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    log::info!("Found {} image(s) to process", paths.len());
    if config.output.dry_run {
        log::info!("DRY RUN — no files will be written");
    }

    // Load sources; unreadable files are reported and excluded
    let total = paths.len();
    let mut images = Vec::with_capacity(paths.len());
    for path in &paths {
        match pipeline::SourceImage::from_path(path) {
            Ok(image) => images.push(image),
            Err(err) => log::warn!("Skipping {}: {err}", path.display()),
        }
    }

    // Stamp the batch
    let outcome = pipeline::process_batch(images, &config.stamp, cli.text.as_deref()).await;

    if outcome.any_missing_metadata {
        log::warn!(
            "One or more images did not contain EXIF data. Using creation date or last modified date instead."
        );
    }
    for skip in &outcome.skipped {
        log::warn!("Skipped {}: {}", skip.file_name, skip.reason);
    }

    // Write outputs
    let mut written = Vec::new();
    for entry in &outcome.stamped {
        let dir = match (&config.output.out_dir, entry.source().origin()) {
            (Some(out_dir), _) => out_dir.clone(),
            (None, Some(origin)) => origin
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from(".")),
            (None, None) => PathBuf::from("."),
        };

        let dest = dir.join(entry.output_file_name());
        log::info!(
            "{} {} (\"{}\")",
            if config.output.dry_run { "Would write" } else { "Writing" },
            dest.display(),
            entry.display_text()
        );

        if !config.output.dry_run {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&dest, entry.stamped().bytes())?;
        }
        written.push(dest);
    }

    // JSON output
    if cli.json {
        let json_results: Vec<serde_json::Value> = outcome
            .stamped
            .iter()
            .zip(&written)
            .map(|(entry, dest)| {
                serde_json::json!({
                    "source": entry.source().file_name(),
                    "output": dest.display().to_string(),
                    "text": entry.display_text(),
                    "from_metadata": entry.timestamp().from_metadata,
                })
            })
            .chain(outcome.skipped.iter().map(|skip| {
                serde_json::json!({
                    "source": skip.file_name,
                    "error": skip.reason,
                })
            }))
            .collect();

        println!("{}", serde_json::to_string_pretty(&json_results)?);
    }

    // Summary
    let stamped = outcome.stamped.len();
    let skipped = total - stamped;
    log::info!("Done: {stamped} stamped, {skipped} skipped out of {total} images");

    Ok(())
}
