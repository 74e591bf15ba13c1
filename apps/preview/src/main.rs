mod headless;

use anyhow::{Context, Result};
use clap::Parser;
use headless::PreviewLockScreen;
use lockplayer_core::{clamp_art_size, Config, Position, DEFAULT_GROUP};
use lockplayer_media_session::create_media_bus;
use lockplayer_module::{logging, PlayerModule, TokioLocal};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::LocalSet;
use tokio::time::{interval_at, Instant, Interval};

/// Run the lock-screen player panel without a lock screen
#[derive(Parser, Debug)]
#[command(name = "lockplayer-preview", version, about)]
struct Args {
    /// Config file (default: $XDG_CONFIG_HOME/lockplayer/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Config table holding the module options
    #[arg(long, default_value = DEFAULT_GROUP)]
    group: String,

    /// Number of lock-screen windows to simulate
    #[arg(long, default_value_t = 1)]
    windows: u64,

    /// Move focus to the next window every SECS seconds
    #[arg(long, value_name = "SECS")]
    cycle_focus: Option<u64>,

    /// Toggle idle hide/show every SECS seconds
    #[arg(long, value_name = "SECS")]
    idle_toggle: Option<u64>,

    /// Album art size in pixels, 0 disables art
    #[arg(long)]
    art_size: Option<u32>,

    /// Panel position, e.g. top-left or under-clock; unknown values fall
    /// back to top-center like the config file
    #[arg(long)]
    position: Option<String>,

    /// Keep the panel visible while idle-hidden
    #[arg(long)]
    show_hidden: bool,
}

fn main() -> Result<()> {
    logging::init(logging::DEFAULT_FILTER);

    let args = Args::parse();
    let config = load_config(&args)?;
    tracing::info!("Starting lockplayer preview with {:?}", config);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;

    LocalSet::new().block_on(&runtime, run(args, config))
}

async fn run(args: Args, config: Config) -> Result<()> {
    let host = Rc::new(PreviewLockScreen::new(args.windows));
    let media = create_media_bus(&Handle::current());
    let module = PlayerModule::activate(
        host.clone(),
        config,
        Rc::new(TokioLocal),
        Some(media),
        Handle::current(),
    );

    let first = host.next_window();
    let old = host.focus(first);
    module.on_focus_change(first, old);

    let mut cycle = args.cycle_focus.map(every_secs);
    let mut idle = args.idle_toggle.map(every_secs);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            _ = tick(&mut cycle) => {
                let next = host.next_window();
                let old = host.focus(next);
                module.on_focus_change(next, old);
            }
            _ = tick(&mut idle) => {
                if host.toggle_hidden() {
                    module.on_idle_hide();
                } else {
                    module.on_idle_show();
                }
            }
        }
    }

    tracing::info!("Shutting down");
    module.on_unload();
    Ok(())
}

fn every_secs(secs: u64) -> Interval {
    let period = Duration::from_secs(secs.max(1));
    interval_at(Instant::now() + period, period)
}

/// Next tick of `timer`, or never when there is none
async fn tick(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path, &args.group)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let path = default_config_path()?;
            Config::load_or_default(&path, &args.group)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
    };

    if let Some(art_size) = args.art_size {
        config.art_size = clamp_art_size(art_size);
    }
    if let Some(position) = &args.position {
        config.position = Position::from_config(position);
    }
    if args.show_hidden {
        config.show_hidden = true;
    }
    Ok(config)
}

/// `$XDG_CONFIG_HOME/lockplayer/config.toml` or the platform equivalent
fn default_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Failed to get config directory"))?
        .join("lockplayer");
    Ok(config_dir.join("config.toml"))
}
