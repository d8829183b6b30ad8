//! Chosic music API client and asset downloader.
//!
//! Fetches track, artist and recommendation data from the Chosic web tools
//! API, walks paginated listings while respecting the upstream's pacing, and
//! downloads track previews and cover art into one folder per track.
//!
//! # Modules
//!
//! - `chosic` - HTTP client, paginator and per-endpoint service
//! - `download` - per-track asset downloader and concurrent dispatcher
//! - `cli` - Command-line interface implementations
//! - `config` - `.env` credentials and `.chosicrc` defaults
//! - `error` - Error types returned by the pipeline
//! - `output` - JSON output to stdout or a file
//! - `types` - Data structures and type definitions
//! - `utils` - Id parsing, filename sanitising and query parameter helpers
//!
//! # Example
//!
//! ```rust,ignore
//! use chosicli::{chosic::{ChosicService, ClientConfig, HttpClient}, download};
//!
//! #[tokio::main]
//! async fn main() -> chosicli::Res<()> {
//!     let client = HttpClient::new(ClientConfig::default())?;
//!     let service = ChosicService::new(client.clone());
//!     let downloader = download::AssetDownloader::new(client, Default::default());
//!     let report = download::download_tracks(&service, &downloader, vec!["6r7FXNO57mlZCBY6PXcZZT".into()], 4).await;
//!     println!("{} succeeded / {} failed", report.succeeded(), report.failed());
//!     Ok(())
//! }
//! ```

pub mod chosic;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod output;
pub mod types;
pub mod utils;

/// A convenient Result type alias for the CLI layer, where any error is
/// reported to the user rather than matched on.
pub type Res<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Prints an informational message with a blue bullet point.
///
/// # Example
///
/// ```rust,ignore
/// info!("Fetching recommendations...");
/// info!("Found {} tracks", count);
/// ```
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "o".blue().bold(), std::format_args!($($arg)*));
  })
}

/// Prints a success message with a green checkmark.
#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "✓".green().bold(), std::format_args!($($arg)*));
  })
}

/// Prints an error message with a red exclamation mark and exits the program
/// with status 1.
///
/// Only the CLI layer uses this; library code returns errors instead.
#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".red().bold(), std::format_args!($($arg)*));
    std::process::exit(1);
  })
}

/// Prints a warning message with a yellow exclamation mark.
#[macro_export]
macro_rules! warning {
  ($($arg:tt)*) => ({
    use colored::Colorize;
    eprintln!("[{}] {}", "!".yellow().bold(), std::format_args!($($arg)*));
  })
}
