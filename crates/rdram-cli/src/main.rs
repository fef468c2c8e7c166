mod commands;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rdram_core::memory::layout::timing;
use rdram_core::{BridgeConfig, Button, DiscoveryMethod};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rdram")]
#[command(about = "Memory bridge and input injector for a running N64 emulator")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = "rdram.toml", env = "RDRAM_CONFIG")]
    config: PathBuf,

    /// Emulator process ID (default: configured pid, then process name lookup)
    #[arg(short, long, global = true)]
    pid: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the emulator's memory regions
    Regions {
        /// Only show writable regions
        #[arg(short, long)]
        writable: bool,

        /// Hide regions smaller than this many bytes
        #[arg(long, default_value_t = 0)]
        min_size: u64,
    },
    /// Locate the console RAM
    Discover {
        /// heuristic, signature or signature-then-heuristic
        #[arg(short, long)]
        method: Option<DiscoveryMethod>,

        /// Keep polling until a game is running
        #[arg(short, long)]
        wait: bool,
    },
    /// Read the current game state
    Snapshot {
        /// Game title (default: from config)
        #[arg(short, long)]
        title: Option<String>,

        /// Keep printing snapshots until Ctrl+C
        #[arg(short, long)]
        watch: bool,

        /// Interval between snapshots in watch mode
        #[arg(long, default_value_t = timing::SNAPSHOT_POLL_INTERVAL_MS)]
        interval_ms: u64,

        /// Print JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Dump raw memory
    Hexdump {
        /// Address in hex (host address, or console address with --console)
        address: String,

        /// Number of bytes to dump
        #[arg(short, long, default_value_t = 256)]
        size: usize,

        /// Treat the address as a console address (e.g. 8033B170)
        #[arg(long)]
        console: bool,

        /// Show ASCII column
        #[arg(short, long)]
        ascii: bool,
    },
    /// Show, export or import title address profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Hold buttons on a controller
    Press {
        /// Buttons to hold together (a, b, z, start, d_up, l, r, c_left, ...)
        #[arg(required = true)]
        buttons: Vec<Button>,

        /// Player slot, 0-3
        #[arg(long, default_value_t = 0)]
        player: usize,

        #[arg(short, long, default_value_t = timing::TAP_DURATION_MS)]
        duration_ms: u64,
    },
    /// Move the analog stick
    Stick {
        #[arg(allow_negative_numbers = true)]
        x: i8,

        #[arg(allow_negative_numbers = true)]
        y: i8,

        /// Player slot, 0-3
        #[arg(long, default_value_t = 0)]
        player: usize,

        /// Total time: half gliding, half holding
        #[arg(short, long, default_value_t = 500)]
        duration_ms: u64,

        #[arg(long, default_value_t = timing::STICK_SMOOTHING_STEPS)]
        steps: u32,
    },
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Print the address table
    Show {
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Write the address table to a JSON file
    Export {
        output: PathBuf,

        #[arg(short, long)]
        title: Option<String>,
    },
    /// Validate and display a JSON profile
    Import { input: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rdram=info".parse()?))
        .init();

    let args = Args::parse();
    let config = BridgeConfig::load_or_default(&args.config)?;
    let pid = args.pid;

    match args.command {
        Command::Regions { writable, min_size } => {
            commands::regions::run(&config, pid, writable, min_size)
        }
        Command::Discover { method, wait } => {
            commands::discover::run(&config, pid, method, wait).await
        }
        Command::Snapshot {
            title,
            watch,
            interval_ms,
            json,
        } => {
            commands::snapshot::run(
                &config,
                pid,
                title.as_deref(),
                watch,
                Duration::from_millis(interval_ms),
                json,
            )
            .await
        }
        Command::Hexdump {
            address,
            size,
            console,
            ascii,
        } => commands::hexdump::run(&config, pid, &address, size, console, ascii),
        Command::Profile { action } => match action {
            ProfileAction::Show { title } => commands::profile::show(&config, title.as_deref()),
            ProfileAction::Export { output, title } => {
                commands::profile::export(&config, title.as_deref(), &output)
            }
            ProfileAction::Import { input } => commands::profile::import(&config, &input),
        },
        Command::Press {
            buttons,
            player,
            duration_ms,
        } => {
            commands::input::press(
                &config,
                pid,
                player,
                &buttons,
                Duration::from_millis(duration_ms),
            )
            .await
        }
        Command::Stick {
            x,
            y,
            player,
            duration_ms,
            steps,
        } => {
            commands::input::stick(
                &config,
                pid,
                player,
                (x, y),
                steps,
                Duration::from_millis(duration_ms),
            )
            .await
        }
    }
}
