//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Download YouTube and Instagram videos.
///
/// vidfetch resolves each page URL to a video id, asks the lookup service
/// for the available formats, and saves the best match for the requested
/// quality. Videos are processed one at a time.
#[derive(Parser, Debug)]
#[command(name = "vidfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Video page URLs (comma or whitespace separated); read from stdin when omitted
    pub urls: Vec<String>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Preferred quality: 'highest' or a resolution such as 720 or 720p
    #[arg(short = 'Q', long)]
    pub quality: Option<String>,

    /// Attempts per request for rate-limited or transient failures (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_attempts: Option<u32>,

    /// Directory to save videos into
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Metadata lookup endpoint
    #[arg(long)]
    pub lookup_endpoint: Option<String>,

    /// Value for the lookup service host header
    #[arg(long)]
    pub api_host: Option<String>,

    /// Lookup service API key (overrides VIDFETCH_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Print one JSON outcome per line on stdout
    #[arg(long)]
    pub json: bool,

    /// List each video's title and available formats without downloading
    #[arg(short, long)]
    pub info: bool,
}
