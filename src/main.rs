use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use scroblcli::{cli, config, error, types::TrackMetadata};

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
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Authorize with the ListenBrainz API via MusicBrainz OAuth
    Auth,

    /// Update the tracked now-playing item
    Playing(TrackOptions),

    /// Queue the current item as listened
    Scrobble(TrackOptions),

    /// Clear the tracked playback item
    Stop,

    /// Submit queued listens
    Submit(SubmitOptions),

    /// Consume playback events from stdin (one JSON object per line)
    Listen,

    /// Inspect or clear the listen queue
    Queue(QueueOptions),

    /// Show session and queue status
    Status,

    /// Show or change scrobbler settings
    Settings(cli::SettingsOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct TrackOptions {
    /// Track artist
    #[clap(long)]
    pub artist: String,

    /// Track title
    #[clap(long)]
    pub title: String,

    /// Album / release name
    #[clap(long)]
    pub album: Option<String>,

    /// Album artist (submitted instead of the track artist when the
    /// prefer-albumartist setting is on)
    #[clap(long)]
    pub album_artist: Option<String>,

    /// Track number on the release
    #[clap(long)]
    pub track: Option<u32>,

    /// Track duration in seconds
    #[clap(long)]
    pub duration: Option<u64>,

    /// MusicBrainz artist ID (multiple IDs separated by '/')
    #[clap(long)]
    pub artist_mbid: Option<String>,

    /// MusicBrainz release ID
    #[clap(long)]
    pub release_mbid: Option<String>,

    /// MusicBrainz recording ID
    #[clap(long)]
    pub recording_mbid: Option<String>,

    /// MusicBrainz track ID
    #[clap(long)]
    pub track_mbid: Option<String>,

    /// Live/radio-type stream without natural track-end events
    #[clap(long)]
    pub radio: bool,
}

impl From<TrackOptions> for TrackMetadata {
    fn from(opts: TrackOptions) -> Self {
        TrackMetadata {
            artist: opts.artist,
            title: opts.title,
            album: opts.album,
            album_artist: opts.album_artist,
            track: opts.track,
            duration_secs: opts.duration,
            musicbrainz_artist_id: opts.artist_mbid,
            musicbrainz_album_id: opts.release_mbid,
            musicbrainz_recording_id: opts.recording_mbid,
            musicbrainz_track_id: opts.track_mbid,
            radio: opts.radio,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct SubmitOptions {
    /// Stop after this many submission attempts (default: retry until drained)
    #[clap(long)]
    pub max_attempts: Option<u32>,
}

#[derive(Parser, Debug, Clone)]
pub struct QueueOptions {
    /// Subcommands under `queue` (e.g. `clear`); default lists the queue
    #[command(subcommand)]
    pub command: Option<QueueSubcommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueueSubcommand {
    /// List queued listens
    List,

    /// Drop all queued listens
    Clear,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Playing(opt) => cli::playing(opt.into()).await,
        Command::Scrobble(opt) => cli::scrobble(opt.into()).await,
        Command::Stop => cli::stop().await,
        Command::Submit(opt) => cli::submit(opt.max_attempts).await,
        Command::Listen => cli::listen().await,
        Command::Queue(opt) => match opt.command {
            Some(QueueSubcommand::Clear) => cli::clear_queue().await,
            Some(QueueSubcommand::List) | None => cli::list_queue().await,
        },
        Command::Status => cli::status().await,
        Command::Settings(opt) => cli::settings(opt).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
