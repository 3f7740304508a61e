//! lemon-keypad command line
//!
//! `check` validates a keymap file and prints it; `run` drives the keypad
//! against a trace-only HID bus with key input read from a script.

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use keypad_hid::{BusProvider, TraceBus};
use lemon_keypad::builtin::register_builtins;
use lemon_keypad::config::KeymapSummary;
use lemon_keypad::event::{self, MatrixScanner};
use lemon_keypad::script::{self, parse_script};
use lemon_keypad::watchdog::LogWatchdog;
use lemon_keypad::{CallableRegistry, Keypad, KeypadConfig, RunOptions};

#[derive(Parser)]
#[command(name = "lemon-keypad")]
#[command(about = "Programmable macro keypad: layers, tap/hold and tap-dance keys")]
struct Cli {
    /// Keymap file (default: ~/.config/lemon-keypad/keymap.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate the keymap and print every layer
    Check {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the keypad on a trace-only HID bus, feeding key input from a script
    Run {
        /// Script file with press/release/tap/wait lines (default: stdin)
        #[arg(long)]
        script: Option<PathBuf>,

        /// Keep running this long after the script ends, in milliseconds
        #[arg(long, default_value_t = 500)]
        linger_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(KeypadConfig::default_path);
    info!("Loading keymap from {:?}", config_path);
    let config = KeypadConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let mut callables = CallableRegistry::new();
    register_builtins(&mut callables);

    match cli.command {
        Command::Check { json } => check(&config, &callables, json),
        Command::Run { script, linger_ms } => {
            run(config, &callables, script, Duration::from_millis(linger_ms)).await
        }
    }
}

fn check(config: &KeypadConfig, callables: &CallableRegistry, json: bool) -> Result<()> {
    let keymap = config.build_keymap(callables)?;
    let summary = KeymapSummary::new(&keymap);
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!(
        "{} keys, default layer {}",
        summary.key_count, summary.default_layer
    );
    for layer in &summary.layers {
        println!("layer {}:", layer.id);
        for (i, key) in layer.keys.iter().enumerate() {
            println!("  {:>2}  {}", i, key);
        }
    }
    Ok(())
}

async fn run(
    config: KeypadConfig,
    callables: &CallableRegistry,
    script_path: Option<PathBuf>,
    linger: Duration,
) -> Result<()> {
    let keymap = config.build_keymap(callables)?;

    let source = match &script_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let steps = parse_script(&source)?;

    let (sender, events) = event::channel(config.event_queue_capacity);
    let mut scanner = MatrixScanner::new(sender, config.key_count, config.key_active_high);
    let keypad = Keypad::new(keymap, events, BusProvider::new(TraceBus));

    let mut options = RunOptions::new().tick(config.tick());
    if config.watchdog.enabled {
        options = options.watchdog(
            Box::new(LogWatchdog::new()),
            config.watchdog.timeout(),
            config.watchdog.interval(),
        );
    }

    let key_count = config.key_count;
    let shutdown = async move {
        tokio::select! {
            _ = async {
                script::play(&steps, &mut scanner, key_count).await;
                tokio::time::sleep(linger).await;
            } => info!("Script finished"),
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Ctrl+C handler failed: {}", e);
                }
            }
        }
    };

    keypad.run_until(shutdown, options).await;
    Ok(())
}
