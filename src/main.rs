use aniproject::{
    AniListClient, AniProjectError, AniWatchClient, BrowserEvent, Config, DEFAULT_ANILIST_URL,
    DEFAULT_ANIWATCH_URL, DEFAULT_CONSUMET_URL, DEFAULT_PAGE_SIZE, EpisodeBrowser, EpisodeSource,
    GoGoAnimeClient, JsonFileStore, MediaCandidate, OffsetPolicy, UserId, WatchedSync,
    normalize_query,
};
use clap::{Parser, Subcommand};
use dialoguer::{Select, theme::ColorfulTheme};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

type CliBrowser = EpisodeBrowser<GoGoAnimeClient, AniWatchClient, JsonFileStore>;

#[derive(Debug, Parser)]
#[command(name = "aniproject", version, about)]
struct Cli {
    /// AniList GraphQL endpoint
    #[arg(long, env = "ANIPROJECT_ANILIST_URL", default_value = DEFAULT_ANILIST_URL, global = true)]
    anilist_url: String,

    /// Base URL of the Consumet instance used for GoGoAnime
    #[arg(long, env = "ANIPROJECT_CONSUMET_URL", default_value = DEFAULT_CONSUMET_URL, global = true)]
    consumet_url: String,

    /// Base URL of the aniwatch-api instance
    #[arg(long, env = "ANIPROJECT_ANIWATCH_URL", default_value = DEFAULT_ANIWATCH_URL, global = true)]
    aniwatch_url: String,

    /// User whose preferences and watched episodes are used
    #[arg(long, env = "ANIPROJECT_USER", global = true)]
    user: Option<String>,

    /// Directory holding user documents (defaults to the platform data directory)
    #[arg(long, env = "ANIPROJECT_STORE_DIR", global = true)]
    store_dir: Option<PathBuf>,

    /// Episodes per page
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, global = true)]
    page_size: usize,

    /// Keep the page offset when switching sources
    #[arg(long, global = true)]
    preserve_offset: bool,

    /// HTTP request timeout in seconds
    #[arg(long, default_value_t = 20, global = true)]
    timeout: u64,

    /// Print what the browser is doing
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show one page of the episode list of a media entry
    Episodes {
        /// AniList media id
        media_id: u64,

        /// Source to show instead of the preferred one
        #[arg(long)]
        source: Option<EpisodeSource>,

        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Pick the Aniwatch entry by hand when the search is ambiguous
        #[arg(long)]
        pick: bool,
    },

    /// List the Aniwatch search hits for a media entry
    Candidates {
        /// AniList media id
        media_id: u64,
    },

    /// List the episodes marked as watched
    Watched {
        /// AniList media id
        media_id: u64,
    },

    /// Mark every episode of a source as watched
    MarkAll {
        /// AniList media id
        media_id: u64,

        #[arg(long)]
        source: Option<EpisodeSource>,
    },

    /// Clear the watched list of a media entry
    UnmarkAll {
        /// AniList media id
        media_id: u64,
    },

    /// Mark one episode as watched
    Mark {
        /// AniList media id
        media_id: u64,

        /// Position of the episode in the list, starting at 1
        position: usize,

        #[arg(long)]
        source: Option<EpisodeSource>,
    },

    /// Remove the watched marker from one episode
    Unmark {
        /// AniList media id
        media_id: u64,

        /// Position of the episode in the list, starting at 1
        position: usize,
    },

    /// Store the preferred episode source
    SetSource { source: EpisodeSource },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    App(#[from] AniProjectError),

    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("This command needs a user, pass --user or set ANIPROJECT_USER")]
    NoUser,

    #[error("No episode at position {0}")]
    NoSuchEpisode(usize),
}

impl From<aniproject::ProviderError> for CliError {
    fn from(error: aniproject::ProviderError) -> Self {
        CliError::App(error.into())
    }
}

impl From<aniproject::StoreError> for CliError {
    fn from(error: aniproject::StoreError) -> Self {
        CliError::App(error.into())
    }
}

impl From<aniproject::WatchedError> for CliError {
    fn from(error: aniproject::WatchedError) -> Self {
        CliError::App(error.into())
    }
}

/// Handles browser events and prints them to stderr
fn handle_browser_event(event: BrowserEvent) {
    match event {
        BrowserEvent::SourceResolved {
            source,
            from_preference,
        } => {
            if from_preference {
                eprintln!("Using preferred source {source}");
            } else {
                eprintln!("Using source {source}");
            }
        }
        BrowserEvent::FetchStarted { source, generation } => {
            eprintln!("Fetching episodes from {source} (request #{generation})...");
        }
        BrowserEvent::FetchFinished {
            source,
            episode_count,
        } => {
            eprintln!("Found {episode_count} episode(s) on {source}");
        }
        BrowserEvent::FetchFailed { source, message } => {
            eprintln!("Fetching from {source} failed: {message}");
        }
        BrowserEvent::StaleResponseDiscarded {
            source,
            generation,
            latest,
        } => {
            eprintln!("Dropped outdated {source} response #{generation} (latest is #{latest})");
        }
        BrowserEvent::PageChanged { selected, offset } => {
            eprintln!("Showing page {} (offset {offset})", selected + 1);
        }
        BrowserEvent::WatchedStateWritten {
            media_id,
            watched_count,
        } => {
            eprintln!("Saved watched state for media {media_id}: {watched_count} episode(s)");
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli);

    match &cli.command {
        Command::Episodes {
            media_id,
            source,
            page,
            pick,
        } => {
            let mut browser = open_browser(cli, &config, *media_id, *source)?;

            if *pick {
                pick_candidate(&mut browser)?;
            }

            browser.change_page(page.saturating_sub(1))?;
            print_page(&browser);
        }
        Command::Candidates { media_id } => {
            let browser = open_browser(cli, &config, *media_id, Some(EpisodeSource::AniWatch))?;
            let default = normalize_query(&browser.media().title);

            if browser.candidates().is_empty() {
                println!("No Aniwatch entries found for '{default}'.");
            }
            for candidate in browser.candidates() {
                println!("{}", format_candidate(candidate));
            }
        }
        Command::Watched { media_id } => {
            let user = require_user(cli)?;
            let sync = WatchedSync::new(open_store(&config)?);

            match sync.get_watched(Some(&user), *media_id)? {
                Some(list) if !list.is_empty() => {
                    for episode in list {
                        println!("{:>4}  {}", episode.episode_number, episode.episode_title);
                    }
                }
                _ => println!("No episodes marked as watched."),
            }
        }
        Command::MarkAll { media_id, source } => {
            require_user(cli)?;
            let mut browser = open_browser(cli, &config, *media_id, *source)?;
            browser.mark_all_watched()?;
            println!(
                "Marked {} episode(s) as watched.",
                browser.watched().map_or(0, <[_]>::len)
            );
        }
        Command::UnmarkAll { media_id } => {
            let user = require_user(cli)?;
            let sync = WatchedSync::new(open_store(&config)?);
            sync.unmark_all(&user, *media_id)?;
            println!("Cleared the watched list.");
        }
        Command::Mark {
            media_id,
            position,
            source,
        } => {
            require_user(cli)?;
            let mut browser = open_browser(cli, &config, *media_id, *source)?;

            if is_marked(&browser, *position) {
                println!("Episode {position} is already marked as watched.");
            } else if browser.toggle_episode(*position)?.is_none() {
                return Err(CliError::NoSuchEpisode(*position));
            } else {
                println!("Marked episode {position} as watched.");
            }
        }
        Command::Unmark { media_id, position } => {
            let user = require_user(cli)?;
            let sync = WatchedSync::new(open_store(&config)?);
            sync.unmark_episode(&user, *media_id, *position as u32)?;
            println!("Removed the watched marker from episode {position}.");
        }
        Command::SetSource { source } => {
            let user = require_user(cli)?;
            let sync = WatchedSync::new(open_store(&config)?);
            sync.set_preferred_source(&user, *source)?;
            println!("Preferred source set to {}.", source.display_name());
        }
    }

    Ok(())
}

fn config_from_cli(cli: &Cli) -> Config {
    Config {
        anilist_url: cli.anilist_url.clone(),
        consumet_url: cli.consumet_url.clone(),
        aniwatch_url: cli.aniwatch_url.clone(),
        http_timeout: Duration::from_secs(cli.timeout),
        page_size: cli.page_size,
        offset_policy: if cli.preserve_offset {
            OffsetPolicy::Preserve
        } else {
            OffsetPolicy::ResetOnSourceChange
        },
        store_dir: cli.store_dir.clone(),
    }
}

fn require_user(cli: &Cli) -> Result<UserId, CliError> {
    cli.user.as_deref().map(UserId::new).ok_or(CliError::NoUser)
}

fn open_store(config: &Config) -> Result<JsonFileStore, CliError> {
    let store = match &config.store_dir {
        Some(dir) => JsonFileStore::open(dir)?,
        None => JsonFileStore::open_default()?,
    };
    Ok(store)
}

/// Fetches the media entry and mounts a browser on it
fn open_browser(
    cli: &Cli,
    config: &Config,
    media_id: u64,
    source: Option<EpisodeSource>,
) -> Result<CliBrowser, CliError> {
    let anilist = AniListClient::new(&config.anilist_url, config.http_timeout)?;
    let media = anilist.fetch_media(media_id)?;

    let mut browser = EpisodeBrowser::new(
        media.into(),
        GoGoAnimeClient::new(&config.consumet_url, config.http_timeout)?,
        AniWatchClient::new(&config.aniwatch_url, config.http_timeout)?,
        open_store(config)?,
        cli.user.as_deref().map(UserId::new),
        config,
    );

    if cli.verbose {
        browser = browser.with_event_handler(handle_browser_event);
    }

    match source {
        Some(source) => {
            browser.select_source(source)?;
        }
        None => browser.mount()?,
    }

    Ok(browser)
}

/// Lets the user choose among several Aniwatch entries
fn pick_candidate(browser: &mut CliBrowser) -> Result<(), CliError> {
    let Some(candidates) = browser.view().candidates.map(<[_]>::to_vec) else {
        return Ok(());
    };

    let default_name = normalize_query(&browser.media().title);
    let default = candidates
        .iter()
        .position(|c| normalize_query(&c.name) == default_name)
        .unwrap_or(0);

    let items: Vec<String> = candidates.iter().map(format_candidate).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select the matching Aniwatch entry (Esc to keep the best match)")
        .items(&items)
        .default(default)
        .interact_opt()?;

    if let Some(index) = selection {
        browser.select_candidate(&candidates[index].id)?;
    }

    Ok(())
}

fn is_marked(browser: &CliBrowser, position: usize) -> bool {
    browser
        .watched()
        .is_some_and(|list| list.iter().any(|w| w.episode_number as usize == position))
}

fn format_candidate(candidate: &MediaCandidate) -> String {
    let mut line = format!("{} ({})", candidate.name, candidate.id);
    if let Some(format) = &candidate.format {
        line.push_str(&format!(" - {format}"));
    }
    if let Some(sub) = candidate.sub_episodes {
        line.push_str(&format!(", {sub} episode(s)"));
    }
    line
}

fn print_page(browser: &CliBrowser) {
    let view = browser.view();

    println!(
        "\n=== {} on {} ===\n",
        browser.media().title,
        view.source.display_name()
    );

    if let Some(message) = &view.not_available {
        println!("{message}");
        return;
    }

    if view.rows.is_empty() {
        println!("No episodes on this page.");
    }

    for row in &view.rows {
        let marker = if row.watched { "[x]" } else { "[ ]" };
        let filler = if row.is_filler { " (filler)" } else { "" };
        println!("{marker} {:>4}  {}{filler}", row.position, row.label);
        println!("          {}", row.link);
    }

    if view.page_count > 0 {
        println!(
            "\nPage {} of {}",
            view.item_offset / browser.page_size() + 1,
            view.page_count
        );
    }

    if let Some(candidates) = view.candidates {
        println!(
            "\n{} Aniwatch entries match this title, use --pick to choose another one.",
            candidates.len()
        );
    }
}
