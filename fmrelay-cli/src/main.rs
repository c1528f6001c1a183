mod cli;
mod commands;
mod config;
mod error;
mod logging;

use std::io::{BufRead, Write};
use std::process;

use clap::Parser;
use relay_engine::StreamController;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::{
    cli::Args,
    commands::{Command, Flow, HELP},
    config::AppConfig,
    error::Result,
};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?.with_args(&args);
    config.prepare_dirs()?;

    let log_dir = config.log_dir();
    let _log_guard = logging::init_logging(&log_dir, config.log_filter.as_deref(), args.verbose)?;
    if let Err(e) = logging::cleanup_old_logs(&log_dir, logging::LOG_RETENTION_DAYS).await {
        warn!(error = %e, "Failed to clean up old logs");
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        app_dir = %config.app_dir().display(),
        "fmrelay starting"
    );

    let controller = StreamController::new(config.relay_config())?;

    println!("fmrelay {}", env!("CARGO_PKG_VERSION"));
    println!("{HELP}");

    if let Some(url) = args.url.clone() {
        let (_, message) = commands::execute(&controller, Command::Play(url)).await;
        println!("{message}");
    }

    let result = command_loop(&controller).await;

    controller.cleanup().await;
    info!("fmrelay exiting");
    result
}

/// Forward stdin lines from a dedicated thread. A blocking read would otherwise
/// keep the runtime from shutting down on Ctrl-C.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<std::io::Result<String>> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Resolve `task` unless `interrupt` completes first, in which case `task` is dropped.
async fn until_interrupted<T, I>(task: impl Future<Output = T>, interrupt: I) -> Option<T>
where
    I: Future,
{
    tokio::select! {
        _ = interrupt => None,
        output = task => Some(output),
    }
}

/// Read commands from stdin until `quit`, end of input or Ctrl-C.
///
/// Ctrl-C is also honoured while a command runs; the cleanup that follows the
/// loop takes over from a half-finished `play` or `stop`.
async fn command_loop(controller: &StreamController) -> Result<()> {
    let mut lines = spawn_stdin_reader();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = until_interrupted(lines.recv(), tokio::signal::ctrl_c()).await else {
            println!();
            info!("Interrupted");
            return Ok(());
        };

        let Some(line) = line.transpose()? else {
            return Ok(());
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let Some((flow, message)) = until_interrupted(
            commands::execute(controller, command),
            tokio::signal::ctrl_c(),
        )
        .await
        else {
            println!();
            info!("Interrupted while running a command");
            return Ok(());
        };

        println!("{message}");
        if flow == Flow::Exit {
            return Ok(());
        }
    }
}
