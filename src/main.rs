use std::{path::PathBuf, time::Duration};

use clap::{
    Args, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use chosicli::{
    chosic::{
        ChosicService, ClientConfig, HttpClient, Paging, RecommendationQuery, SearchKind,
        SearchQuery,
    },
    cli::{self, DownloadSettings, OutputSettings},
    config::{self, RcDefaults},
    error,
    utils::{self, ExtraParam},
    warning,
};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    /// Show informational messages
    #[clap(long, short, global = true)]
    verbose: bool,

    /// Show everything, including each request
    #[clap(long, global = true)]
    debug: bool,

    /// Only show errors
    #[clap(long, short, global = true, conflicts_with_all = ["verbose", "debug"])]
    quiet: bool,

    /// Request timeout in seconds
    #[clap(long, global = true)]
    timeout: Option<f64>,

    /// API base url (default: CHOSIC_BASE_URL or the public endpoint)
    #[clap(long, global = true)]
    base_url: Option<String>,

    /// Do not check the session with the API before the first request
    #[clap(long, global = true)]
    skip_handshake: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Search tracks or artists
    Search(SearchOptions),

    /// Look up tracks by id, URI or link
    Track(TrackOptions),

    /// Look up artists by id, URI or link
    Artists(ArtistsOptions),

    /// Tracks similar to the given seeds
    Recommendations(RecommendationsOptions),

    /// Audio features of a track
    Features(FeaturesOptions),

    /// New releases in a genre
    GenreReleases(GenreReleasesOptions),

    /// Top playlists for an artist or a genre
    TopPlaylists(TopPlaylistsOptions),

    /// Download the complete genre list
    Genres(GenresOptions),

    /// Download preview and cover art for tracks
    Download(DownloadOptions),

    /// List the extra parameters accepted by --param
    Params,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Args, Debug, Clone)]
struct PagingArgs {
    /// Maximum number of results (max. 100 per request without --fetch-all)
    #[clap(long)]
    limit: Option<u32>,

    /// Results per page with --fetch-all (1-100)
    #[clap(long)]
    page_size: Option<u32>,

    /// Walk through pages until --limit results are collected
    #[clap(long)]
    fetch_all: bool,
}

impl PagingArgs {
    fn resolve(&self, rc: &RcDefaults) -> Paging {
        let defaults = Paging::default();
        let limit = self.limit.or(rc.limit).unwrap_or(defaults.limit);
        let page_size = self.page_size.or(rc.page_size).unwrap_or(defaults.page_size);

        if limit > utils::MAX_PER_REQUEST && !(self.fetch_all || rc.fetch_all.unwrap_or(false)) {
            warning!(
                "--limit above {} needs --fetch-all, capping at {}",
                utils::MAX_PER_REQUEST,
                utils::MAX_PER_REQUEST
            );
        }
        if page_size > utils::MAX_PER_REQUEST {
            warning!("--page-size capped at {}", utils::MAX_PER_REQUEST);
        }

        Paging {
            fetch_all: self.fetch_all || rc.fetch_all.unwrap_or(false),
            page_size,
            limit,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct ParamArgs {
    /// Extra query parameter passed through as-is, e.g. target_energy=80 (repeatable)
    #[clap(long = "param", value_name = "KEY=VALUE", value_parser = utils::parse_extra_param)]
    params: Vec<ExtraParam>,
}

impl ParamArgs {
    fn checked(self) -> Vec<ExtraParam> {
        for param in &self.params {
            if !utils::is_supported_param(&param.key) {
                warning!("Unknown parameter {}, sending it anyway", param.key);
            }
        }
        self.params
    }
}

#[derive(Args, Debug, Clone)]
struct OutputArgs {
    /// Write JSON to this file instead of stdout
    #[clap(long)]
    output: Option<PathBuf>,

    /// Print a table instead of JSON
    #[clap(long)]
    table: bool,
}

impl From<OutputArgs> for OutputSettings {
    fn from(args: OutputArgs) -> Self {
        OutputSettings {
            output: args.output,
            table: args.table,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct DownloadArgs {
    /// Output folder for downloads
    #[clap(long)]
    out: Option<PathBuf>,

    /// Replace files that already exist
    #[clap(long)]
    overwrite: bool,

    /// Number of tracks downloaded in parallel
    #[clap(long)]
    concurrency: Option<usize>,
}

impl DownloadArgs {
    fn resolve(&self, rc: &RcDefaults) -> DownloadSettings {
        DownloadSettings {
            out: self
                .out
                .clone()
                .or_else(|| rc.out.clone())
                .unwrap_or_else(|| PathBuf::from("downloads")),
            overwrite: self.overwrite || rc.overwrite.unwrap_or(false),
            concurrency: self.concurrency.or(rc.concurrency).unwrap_or(1).max(1),
        }
    }
}

#[derive(Parser, Debug, Clone)]
struct SearchOptions {
    /// Search term, or a track link/URI/id to look up directly
    q: String,

    /// What to search for
    #[clap(long = "type", value_enum, default_value_t = SearchKind::Track)]
    kind: SearchKind,

    /// Download preview and cover art of the tracks found
    #[clap(long)]
    download: bool,

    /// Download only the first result (implies --download)
    #[clap(long)]
    download_first: bool,

    #[command(flatten)]
    paging: PagingArgs,

    #[command(flatten)]
    params: ParamArgs,

    #[command(flatten)]
    output: OutputArgs,

    #[command(flatten)]
    downloads: DownloadArgs,
}

#[derive(Parser, Debug, Clone)]
struct TrackOptions {
    #[clap(required = true)]
    ids: Vec<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct ArtistsOptions {
    #[clap(required = true)]
    ids: Vec<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct RecommendationsOptions {
    /// Seed track id, URI or link (repeatable)
    #[clap(long = "seed-track")]
    seed_tracks: Vec<String>,

    /// Seed artist id, URI or link (repeatable)
    #[clap(long = "seed-artist")]
    seed_artists: Vec<String>,

    #[command(flatten)]
    paging: PagingArgs,

    #[command(flatten)]
    params: ParamArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct FeaturesOptions {
    id: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct GenreReleasesOptions {
    genre: String,

    #[clap(long)]
    limit: Option<u32>,

    #[command(flatten)]
    params: ParamArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct TopPlaylistsOptions {
    #[clap(long)]
    artist_id: Option<String>,

    #[clap(long)]
    genre_name: Option<String>,

    #[clap(long)]
    limit: Option<u32>,

    #[command(flatten)]
    params: ParamArgs,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct GenresOptions {
    /// File to save the genre list to
    #[clap(long)]
    save_path: Option<PathBuf>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Parser, Debug, Clone)]
struct DownloadOptions {
    #[clap(required = true)]
    ids: Vec<String>,

    #[command(flatten)]
    downloads: DownloadArgs,
}

#[derive(Parser, Debug, Clone)]
struct CompletionsOption {
    shell: Shell,
}

fn init_tracing(cli: &Cli, rc: &RcDefaults) {
    let verbose = cli.verbose || rc.verbose.unwrap_or(false);
    let quiet = cli.quiet || (rc.quiet.unwrap_or(false) && !verbose && !cli.debug);

    let level = if quiet {
        "error"
    } else if cli.debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,chosicli={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(cli.debug)
        .init();
}

async fn build_service(cli: &Cli, rc: &RcDefaults) -> ChosicService {
    let mut client_config = ClientConfig {
        credentials: config::credentials_from_env(),
        ..ClientConfig::default()
    };

    if let Some(base_url) = cli.base_url.clone().or_else(config::base_url_from_env) {
        client_config.base_url = base_url;
    }

    match cli.timeout {
        Some(secs) if secs.is_finite() && secs > 0.0 => {
            client_config.timeout = Duration::from_secs_f64(secs)
        }
        Some(secs) => error!("Invalid --timeout {}", secs),
        None => {
            if let Some(timeout) = rc.timeout {
                client_config.timeout = timeout;
            }
        }
    }

    let client = match HttpClient::new(client_config) {
        Ok(client) => client,
        Err(e) => error!("Cannot create HTTP client. Err: {}", e),
    };

    if !cli.skip_handshake && !client.handshake().await {
        warning!("Handshake with the API failed; requests may be rejected");
    }

    ChosicService::new(client)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let rc = match config::load_rc().await {
        Ok(rc) => rc,
        Err(e) => {
            warning!("Ignoring configuration file. Err: {}", e);
            RcDefaults::default()
        }
    };

    init_tracing(&cli, &rc);

    if let Err(e) = config::load_env().await {
        warning!("Cannot load environment. Err: {}", e);
    }

    match cli.command.clone() {
        Command::Params => cli::params(),
        Command::Completions(opt) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
        command => {
            let service = build_service(&cli, &rc).await;
            run(&service, command, &rc).await
        }
    }
}

async fn run(service: &ChosicService, command: Command, rc: &RcDefaults) {
    match command {
        Command::Search(opt) => {
            let mut paging = opt.paging.resolve(rc);
            let download = if opt.download_first {
                paging.fetch_all = false;
                paging.limit = 1;
                Some(opt.downloads.resolve(rc))
            } else if opt.download {
                Some(opt.downloads.resolve(rc))
            } else {
                None
            };
            let mut query = SearchQuery {
                q: opt.q,
                kind: opt.kind,
                extra: opt.params.checked(),
            };
            if opt.download_first && query.remove_param("limit") > 0 {
                warning!("--download-first fetches a single result, ignoring --param limit");
            }
            cli::search(service, query, paging, &opt.output.into(), download).await
        }
        Command::Track(opt) => cli::track(service, opt.ids, &opt.output.into()).await,
        Command::Artists(opt) => cli::artists(service, opt.ids, &opt.output.into()).await,
        Command::Recommendations(opt) => {
            let query = RecommendationQuery {
                seed_tracks: opt.seed_tracks,
                seed_artists: opt.seed_artists,
                extra: opt.params.checked(),
            };
            cli::recommendations(service, query, opt.paging.resolve(rc), &opt.output.into()).await
        }
        Command::Features(opt) => cli::features(service, &opt.id, &opt.output.into()).await,
        Command::GenreReleases(opt) => {
            let extra = opt.params.checked();
            cli::genre_releases(service, &opt.genre, opt.limit, &extra, &opt.output.into()).await
        }
        Command::TopPlaylists(opt) => {
            let extra = opt.params.checked();
            cli::top_playlists(
                service,
                opt.artist_id,
                opt.genre_name,
                opt.limit,
                &extra,
                &opt.output.into(),
            )
            .await
        }
        Command::Genres(opt) => cli::genres(service, opt.save_path, &opt.output.into()).await,
        Command::Download(opt) => {
            cli::download(service, opt.ids, &opt.downloads.resolve(rc)).await
        }
        Command::Params | Command::Completions(_) => {}
    }
}
