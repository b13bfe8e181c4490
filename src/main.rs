//! CLI entry point for the vidfetch tool.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error, info};
use vidfetch_core::download::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use vidfetch_core::lookup::{DEFAULT_API_HOST, DEFAULT_LOOKUP_ENDPOINT};
use vidfetch_core::{
    ChannelProgress, DEFAULT_MAX_ATTEMPTS, DownloadOutcome, Downloader, FileSystemSink,
    HttpTransport, LookupClient, NoopProgress, ProgressSink, QualityPreference, RetryPolicy,
    VideoInfo,
};

mod app_config;
mod cli;
mod progress_ui;

use app_config::{FileConfig, VerbositySetting};
use cli::Args;

/// Exit code for usage and configuration errors.
const EXIT_USAGE: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = match app_config::load_default_file_config() {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };
    let file_config = loaded.config.unwrap_or_default();

    init_tracing(&args, file_config.verbosity);

    debug!(
        config_path = ?loaded.path,
        urls = args.urls.len(),
        json = args.json,
        info = args.info,
        "CLI arguments parsed"
    );

    let settings = match RunSettings::resolve(&args, &file_config, app_config::api_key_from_env())
    {
        Ok(settings) => settings,
        Err(err) => {
            error!("{err:#}");
            return Ok(ExitCode::from(EXIT_USAGE));
        }
    };

    // Read input: from positional args or stdin
    let input_text = if !args.urls.is_empty() {
        args.urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read URLs from stdin")?;
        buffer
    } else {
        info!("No input provided. Pipe URLs via stdin or pass as arguments.");
        info!("Example: echo 'https://youtu.be/dQw4w9WgXcQ' | vidfetch");
        return Ok(ExitCode::SUCCESS);
    };

    let urls = split_urls(&input_text);
    if urls.is_empty() {
        info!("No URLs found in input");
        return Ok(ExitCode::SUCCESS);
    }

    let transport = HttpTransport::with_timeouts(
        settings.connect_timeout_secs,
        settings.read_timeout_secs,
    )
    .context("Failed to build HTTP client")?;

    if args.info {
        let downloader = Downloader::new(
            Arc::new(transport),
            Arc::new(FileSystemSink::new(&settings.output_dir)),
        )
        .with_lookup(settings.lookup_client())
        .with_retry_policy(RetryPolicy::with_max_attempts(settings.max_attempts));
        return list_formats(&downloader, &urls, args.json).await;
    }

    info!(urls = urls.len(), quality = %settings.quality, "Starting downloads");

    let use_spinner = !args.quiet && !args.json && io::stderr().is_terminal();
    let (progress, spinner) = if use_spinner {
        let (sink, events) = ChannelProgress::new();
        let handle = progress_ui::spawn_progress_ui(events, urls.len());
        let sink: Arc<dyn ProgressSink> = Arc::new(sink);
        (sink, Some(handle))
    } else {
        let sink: Arc<dyn ProgressSink> = Arc::new(NoopProgress);
        (sink, None)
    };

    let downloader = Downloader::new(
        Arc::new(transport),
        Arc::new(FileSystemSink::new(&settings.output_dir)),
    )
    .with_lookup(settings.lookup_client())
    .with_retry_policy(RetryPolicy::with_max_attempts(settings.max_attempts))
    .with_progress(progress);

    let mut print_error = None;
    let outcomes = downloader
        .download_each(&urls, &settings.quality, |outcome| {
            if let Err(err) = print_outcome(outcome, args.json) {
                print_error.get_or_insert(err);
            }
        })
        .await;

    // Close the progress channel so the spinner task finishes
    drop(downloader);
    if let Some(handle) = spinner {
        let _ = handle.await;
    }
    if let Some(err) = print_error {
        return Err(err);
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    info!(
        completed = outcomes.len() - failed,
        failed,
        total = outcomes.len(),
        "Download complete"
    );

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Prints title and formats for each URL as its lookup finishes.
async fn list_formats(downloader: &Downloader, urls: &[String], json: bool) -> Result<ExitCode> {
    info!(urls = urls.len(), "Listing formats");

    let mut failed = 0usize;
    for url in urls {
        let info = downloader.fetch_info(url).await;
        if !info.success {
            failed += 1;
        }
        print_info(&info, json)?;
    }

    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Installs the stderr log subscriber.
///
/// Priority: `RUST_LOG` > `--quiet` > `-v` count > config verbosity > info.
fn init_tracing(args: &Args, configured: Option<VerbositySetting>) {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => configured.map_or("info", VerbositySetting::filter_directive),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Effective settings after merging flags, environment and config file.
#[derive(Clone, PartialEq, Eq)]
struct RunSettings {
    quality: String,
    max_attempts: u32,
    output_dir: PathBuf,
    lookup_endpoint: String,
    api_host: String,
    api_key: Option<String>,
    connect_timeout_secs: u64,
    read_timeout_secs: u64,
}

impl std::fmt::Debug for RunSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSettings")
            .field("quality", &self.quality)
            .field("max_attempts", &self.max_attempts)
            .field("output_dir", &self.output_dir)
            .field("lookup_endpoint", &self.lookup_endpoint)
            .field("api_host", &self.api_host)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl RunSettings {
    /// Precedence: CLI flag > environment > config file > built-in default.
    fn resolve(args: &Args, file: &FileConfig, env_api_key: Option<String>) -> Result<Self> {
        let quality = args
            .quality
            .clone()
            .or_else(|| file.quality.clone())
            .unwrap_or_else(|| QualityPreference::Highest.to_string());
        quality
            .parse::<QualityPreference>()
            .with_context(|| format!("Invalid --quality value '{quality}'"))?;

        let lookup_endpoint = args
            .lookup_endpoint
            .clone()
            .or_else(|| file.lookup_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_LOOKUP_ENDPOINT.to_string());
        url::Url::parse(&lookup_endpoint)
            .with_context(|| format!("Invalid --lookup-endpoint value '{lookup_endpoint}'"))?;

        Ok(Self {
            quality,
            max_attempts: args
                .max_attempts
                .or(file.max_attempts)
                .unwrap_or(DEFAULT_MAX_ATTEMPTS),
            output_dir: args
                .output_dir
                .clone()
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            lookup_endpoint,
            api_host: args
                .api_host
                .clone()
                .or_else(|| file.api_host.clone())
                .unwrap_or_else(|| DEFAULT_API_HOST.to_string()),
            api_key: args
                .api_key
                .clone()
                .or(env_api_key)
                .or_else(|| file.api_key.clone()),
            connect_timeout_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
            read_timeout_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
        })
    }

    fn lookup_client(&self) -> LookupClient {
        let client = LookupClient::new(&self.lookup_endpoint).with_api_host(&self.api_host);
        match &self.api_key {
            Some(key) => client.with_api_key(key),
            None => client,
        }
    }
}

/// Splits bulk input on commas and whitespace, dropping empty entries.
fn split_urls(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn print_outcome(outcome: &DownloadOutcome, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(outcome).context("Failed to serialize outcome")?
        );
    } else if outcome.success {
        println!(
            "OK     {} -> {} ({} bytes, {})",
            outcome.url,
            outcome.handle.as_deref().unwrap_or("?"),
            outcome.byte_size.unwrap_or(0),
            outcome.format.as_deref().unwrap_or("?"),
        );
    } else {
        println!("FAILED {}: {}", outcome.url, outcome.message);
    }
    Ok(())
}

fn print_info(info: &VideoInfo, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string(info).context("Failed to serialize video info")?
        );
    } else if info.success {
        println!(
            "INFO   {} -> {} [{}]",
            info.url,
            info.title.as_deref().unwrap_or("<untitled>"),
            info.video_id.as_deref().unwrap_or("?"),
        );
        for format in &info.formats {
            println!(
                "       {:>6} {:<5} {}",
                format.quality_label(),
                format.container,
                format.url
            );
        }
    } else {
        println!(
            "FAILED {}: {}",
            info.url,
            info.message.as_deref().unwrap_or("lookup failed")
        );
    }
    Ok(())
}
