use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podplay::{
    Catalog, ClockOptions, ClockResource, DEFAULT_SHOW_API, NoopReporter, PlaybackState,
    PlaybackStatus, PlayerEvent, PlayerOptions, PlayerReporter, ReqwestClient,
    SharedPlayerReporter, load_catalog, spawn_player,
};

// Emoji with fallback for terminals without Unicode support
static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "");
static HEADPHONES: Emoji<'_, '_> = Emoji("🎧 ", "[i] ");
static PLAY: Emoji<'_, '_> = Emoji("▶ ", "> ");
static PAUSE: Emoji<'_, '_> = Emoji("⏸ ", "|| ");
static LOADING: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
static DONE: Emoji<'_, '_> = Emoji("✅ ", "[+] ");
static FAILURE: Emoji<'_, '_> = Emoji("❌ ", "[!] ");

const SKIP_SECONDS: f64 = 15.0;

/// Play podcast episodes from a show or RSS feed
#[derive(Parser, Debug)]
#[command(name = "podplay")]
#[command(about = "Play podcast episodes from a show id, show document or RSS feed")]
#[command(version)]
struct Args {
    /// Show id, show/feed URL, or path to a local show JSON or RSS file
    source: String,

    /// Episode to start with (1-based, as listed)
    #[arg(short, long, default_value = "1")]
    episode: usize,

    /// Interval between position updates, in milliseconds
    #[arg(long, default_value = "250")]
    tick_ms: u64,

    /// Simulated latency before playback starts, in milliseconds
    #[arg(long, default_value = "0")]
    start_delay_ms: u64,

    /// Base URL of the podcast API used to resolve show ids
    #[arg(long, default_value = DEFAULT_SHOW_API)]
    api_base: String,

    /// Quiet mode - no listing, progress bar or status lines
    #[arg(short, long)]
    quiet: bool,
}

/// A line typed on stdin
#[derive(Debug, Clone, PartialEq)]
enum Input {
    Toggle,
    Seek(f64),
    Skip(f64),
    Play(usize),
    List,
    Quit,
}

fn parse_input(line: &str) -> Option<Input> {
    let mut words = line.split_whitespace();
    let command = words.next()?;
    let argument = words.next();

    match (command, argument) {
        ("p", None) => Some(Input::Toggle),
        ("s", Some(seconds)) => seconds.parse().ok().map(Input::Seek),
        ("f", None) => Some(Input::Skip(SKIP_SECONDS)),
        ("b", None) => Some(Input::Skip(-SKIP_SECONDS)),
        ("n", Some(number)) => number.parse().ok().map(Input::Play),
        ("l", None) => Some(Input::List),
        ("q", None) => Some(Input::Quit),
        _ => None,
    }
}

const HELP: &str = "commands: p (play/pause), s <secs> (seek), f/b (skip ±15s), n <N> (play episode N), l (list), q (quit)";

/// Reporter printing status lines above the progress bar
struct ConsoleReporter {
    bar: ProgressBar,
}

impl PlayerReporter for ConsoleReporter {
    fn report(&self, event: PlayerEvent) {
        let line = match event {
            PlayerEvent::TrackLoading { title, .. } => {
                format!("{LOADING}Loading {}", title.bold())
            }
            PlayerEvent::PlaybackFailed { error, .. } => {
                format!("{FAILURE}{}", error.red())
            }
            PlayerEvent::TrackRejected { reason } => {
                format!("{FAILURE}{}", reason.yellow())
            }
            PlayerEvent::PlaybackEnded { .. } => {
                format!("{DONE}{}", "Episode finished".green())
            }
            PlayerEvent::PlaybackStarted { .. }
            | PlayerEvent::PlaybackPaused { .. }
            | PlayerEvent::Seeked { .. } => return,
        };
        self.bar.println(line);
    }
}

fn format_clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (hours, minutes, secs) = (total / 3600, (total / 60) % 60, total % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

fn print_listing(catalog: &Catalog, state: &PlaybackState, bar: &ProgressBar) {
    bar.println(format!("{HEADPHONES}{}", catalog.title.bold().green()));

    for (index, entry) in catalog.entries.iter().enumerate() {
        let marker = if state.is_track_playing(&entry.track.id) {
            format!("{PAUSE}")
        } else {
            format!("{PLAY}")
        };
        let season = entry
            .season
            .map(|s| format!("S{s} "))
            .unwrap_or_default();
        let length = entry
            .duration
            .map(|d| format!(" ({})", format_clock(d)))
            .unwrap_or_default();

        bar.println(format!(
            "  {:>3}. {marker}{}{}{}",
            (index + 1).to_string().cyan(),
            season.dimmed(),
            entry.track.title,
            length.dimmed()
        ));
    }
}

/// Mirror published state onto the progress bar until the controller stops
async fn render_state(mut state: watch::Receiver<PlaybackState>, bar: ProgressBar) {
    loop {
        {
            let state = state.borrow_and_update();
            draw(&bar, &state);
        }

        if state.changed().await.is_err() {
            break;
        }
    }
}

fn draw(bar: &ProgressBar, state: &PlaybackState) {
    let icon = match state.status() {
        PlaybackStatus::Playing => &PLAY,
        PlaybackStatus::Loading => &LOADING,
        PlaybackStatus::Ended => &DONE,
        PlaybackStatus::Paused | PlaybackStatus::Idle => &PAUSE,
    };

    let Some(track) = &state.current_track else {
        bar.set_message("Nothing playing");
        return;
    };

    bar.set_length(state.duration.max(0.0) as u64);
    bar.set_position(state.position.max(0.0) as u64);
    bar.set_message(format!(
        "{icon}{} {} {}",
        track.title.bold(),
        track.podcast_title.dimmed(),
        state.progress_label().cyan()
    ));
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "podplay=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    if !args.quiet {
        println!(
            "\n{}{} {}\n",
            MICROPHONE,
            "podplay".bold().magenta(),
            "- Podcast Player".dimmed()
        );
    }

    let client = ReqwestClient::new();
    let catalog = load_catalog(&client, &args.source, &args.api_base)
        .await
        .with_context(|| format!("Failed to load catalogue from {}", args.source))?;

    if catalog.entries.is_empty() {
        bail!("{} has no playable episodes", catalog.title);
    }

    let first = catalog
        .get(args.episode)
        .with_context(|| {
            format!(
                "No episode #{} (catalogue has {})",
                args.episode,
                catalog.entries.len()
            )
        })?
        .track
        .clone();

    let mut resource = ClockResource::new(ClockOptions {
        tick: Duration::from_millis(args.tick_ms.max(1)),
        start_delay: Duration::from_millis(args.start_delay_ms),
    });
    for (source, seconds) in catalog.durations() {
        resource.register_duration(source, seconds);
    }

    let bar = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{msg}\n[{bar:40.cyan/blue}]")
                .context("Invalid progress bar template")?
                .progress_chars("█▓░"),
        );
        bar
    };

    let reporter: SharedPlayerReporter = if args.quiet {
        NoopReporter::shared()
    } else {
        Arc::new(ConsoleReporter { bar: bar.clone() })
    };

    let (player, task) = spawn_player(resource, &PlayerOptions::default(), reporter);
    let render = tokio::spawn(render_state(player.subscribe()?, bar.clone()));

    if !args.quiet {
        print_listing(&catalog, &player.snapshot()?, &bar);
        bar.println(HELP.dimmed().to_string());
    }

    player.play_track(first).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read command")? {
        if line.trim().is_empty() {
            continue;
        }

        match parse_input(&line) {
            Some(Input::Toggle) => player.toggle().await?,
            Some(Input::Seek(seconds)) => player.seek(seconds).await?,
            Some(Input::Skip(delta)) => {
                let position = player.snapshot()?.position;
                player.seek(position + delta).await?;
            }
            Some(Input::Play(number)) => match catalog.get(number) {
                Some(entry) => player.play_track(entry.track.clone()).await?,
                None => bar.println(format!("{FAILURE}No episode #{number}")),
            },
            Some(Input::List) => print_listing(&catalog, &player.snapshot()?, &bar),
            Some(Input::Quit) => break,
            None => bar.println(HELP.dimmed().to_string()),
        }
    }

    player.shutdown().await?;
    task.await.context("Playback controller panicked")?;
    render.abort();
    bar.finish_and_clear();

    Ok(())
}
