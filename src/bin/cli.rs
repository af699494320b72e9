use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use music_stream_preview_client as lib;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use lib::auth::{AuthConfig, TokenAuthority};
use lib::catalog::CatalogClient;
use lib::config::Config;
use lib::models::AudioTrack;
use lib::playback::controller::PlaybackController;
use lib::playback::engine::RodioTransportFactory;
use lib::playback::PlayerPresenting;

#[derive(Parser)]
#[command(name = "music-stream-preview-client", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in: print the authorize URL, paste the redirect back, exchange the code
    Auth,
    /// Show sign-in state and token expiry
    Status,
    /// Clear the locally stored credential
    SignOut,
    /// List new album releases
    Releases {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// List featured playlists
    Featured {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Search the catalog for tracks
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Play preview clips: a search result queue, an album, or a playlist
    Play {
        /// Track search query (queued in result order)
        query: Option<String>,
        /// Play an album's tracks instead
        #[arg(long)]
        album: Option<String>,
        /// Play a playlist's tracks instead
        #[arg(long)]
        playlist: Option<String>,
        /// Play only the first matching track
        #[arg(long)]
        single: bool,
    },
}

struct TerminalPresenter;

impl PlayerPresenting for TerminalPresenter {
    fn present_player(&self, track: &AudioTrack) {
        println!("Now playing: {} - {}", track.artist, track.name);
    }
}

async fn run_sign_in(auth: &TokenAuthority) -> Result<()> {
    let url = auth.authorize_url()?;
    println!(
        "Open this URL in your browser and authorize the application:\n\n{}\n",
        url
    );
    println!("After authorizing you'll be redirected. Paste the full redirect URL here:");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    let code = lib::util::extract_auth_code(input.trim())
        .ok_or_else(|| anyhow!("no code in redirect URL"))?;

    if auth.exchange_code(&code).await {
        println!("Signed in. Credential stored.");
        Ok(())
    } else {
        Err(anyhow!(
            "code exchange failed; check client credentials and try again"
        ))
    }
}

fn print_tracks(tracks: &[AudioTrack]) {
    for (i, t) in tracks.iter().enumerate() {
        let preview = if t.preview_url_parsed().is_some() {
            "preview"
        } else {
            "no preview"
        };
        println!("{:2}. {} - {} [{}]", i + 1, t.artist, t.name, preview);
    }
}

/// Reads transport commands from stdin until quit. The controller outlives
/// each command; `current` is re-read every iteration (pull model).
async fn transport_loop(controller: &PlaybackController) -> Result<()> {
    println!("Controls: p = play/pause, n = next, b = back, v <0.0-1.0> = volume, q = quit");
    let stdin = std::io::stdin();
    loop {
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        match line {
            "p" => controller.toggle_play_pause().await,
            "n" => {
                controller.skip_forward().await;
                if let Some(t) = controller.current_track().await {
                    println!("-> {} - {}", t.artist, t.name);
                }
            }
            "b" => {
                controller.skip_backward().await;
                if let Some(t) = controller.current_track().await {
                    println!("<- {} - {}", t.artist, t.name);
                }
            }
            "q" => {
                controller.stop().await;
                break;
            }
            _ => {
                if let Some(v) = line.strip_prefix("v ").and_then(|s| s.parse::<f32>().ok()) {
                    controller.set_volume(v).await;
                } else if !line.is_empty() {
                    println!("unknown command: {}", line);
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // Resolve config path: explicit --config overrides; otherwise prefer the
    // per-user config dir and fall back to a repo-local config for dev usage.
    let resolved_config_path: PathBuf = match &cli.config {
        Some(p) => p.clone(),
        None => {
            let user_path = dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("/etc"))
                .join("music-stream-client/config.toml");
            if user_path.exists() {
                user_path
            } else {
                PathBuf::from("config.toml")
            }
        }
    };

    let cfg = Config::from_path(Path::new(&resolved_config_path))
        .with_context(|| format!("loading config from {}", resolved_config_path.display()))?;

    // Initialize log->tracing bridge and structured logging.
    // Logs go to both stdout and a daily-rotated file in cfg.log_dir.
    let _ = LogTracer::init();
    let file_appender: RollingFileAppender =
        tracing_appender::rolling::daily(&cfg.log_dir, "music-stream-client.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer().with_writer(non_blocking);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    let auth = Arc::new(TokenAuthority::new(AuthConfig::from_config(&cfg)));
    let timeout = std::time::Duration::from_secs(cfg.http_timeout_sec);
    let catalog = CatalogClient::new(auth.clone(), cfg.api_base.clone(), timeout);

    match cli.command {
        Commands::Auth => {
            run_sign_in(&auth).await?;
        }
        Commands::Status => {
            if !auth.is_signed_in() {
                println!("Signed out.");
                return Ok(());
            }
            match auth.stored_credential() {
                Some(cred) => {
                    println!("Signed in.");
                    match cred.expires_at {
                        Some(at) => {
                            let left = at - chrono::Utc::now().timestamp();
                            println!("Token expires in {}s (refresh due: {})", left, auth.should_refresh());
                        }
                        None => println!("No expiry recorded."),
                    }
                    println!("Refresh token stored: {}", cred.refresh_token.is_some());
                }
                None => println!("Signed out."),
            }
        }
        Commands::SignOut => {
            if auth.sign_out() {
                println!("Signed out.");
            } else {
                eprintln!("Sign-out failed to clear the credential store.");
                std::process::exit(1);
            }
        }
        Commands::Releases { limit } => {
            for (id, name) in catalog.new_releases(limit).await? {
                println!("- {}: {}", id, name);
            }
        }
        Commands::Featured { limit } => {
            for (id, name) in catalog.featured_playlists(limit).await? {
                println!("- {}: {}", id, name);
            }
        }
        Commands::Search { query, limit } => {
            let tracks = catalog.search_tracks(&query, limit).await?;
            if tracks.is_empty() {
                println!("No tracks matched '{}'.", query);
            } else {
                print_tracks(&tracks);
            }
        }
        Commands::Play {
            query,
            album,
            playlist,
            single,
        } => {
            let tracks = if let Some(id) = album {
                catalog.album_tracks(&id).await?
            } else if let Some(id) = playlist {
                catalog.playlist_tracks(&id).await?
            } else if let Some(q) = query {
                catalog.search_tracks(&q, 10).await?
            } else {
                return Err(anyhow!("nothing to play: pass a query, --album or --playlist"));
            };

            if tracks.is_empty() {
                println!("Nothing to play.");
                return Ok(());
            }

            let factory = Arc::new(RodioTransportFactory::new(reqwest::Client::new(), timeout));
            let controller =
                PlaybackController::new(factory, Arc::new(TerminalPresenter), cfg.preview_volume);

            if single {
                let track = match tracks.iter().find(|t| t.preview_url_parsed().is_some()) {
                    Some(t) => t.clone(),
                    None => {
                        println!("No track in the results has a preview clip.");
                        return Ok(());
                    }
                };
                controller.start_single(track).await;
            } else {
                controller.start_queue(tracks).await;
            }

            if controller.current_track().await.is_none() {
                println!("Playback did not start.");
                return Ok(());
            }
            transport_loop(&controller).await?;
        }
    }

    Ok(())
}
