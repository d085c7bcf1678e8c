//! `todobot`: a chat bot that keeps a per-user to-do list.
//!
//! Task lists are stored as one JSON file per user under the data
//! directory. The bot talks through a line-based console transport.
//! Configuration comes from CLI flags, environment variables, or a config
//! file (`~/.config/todobot/config.toml`).
//!
//! ```bash
//! TELEGRAM_BOT_TOKEN=123:abc cargo run --bin todobot -- --data-dir ./data
//! # then type lines such as:
//! #   42 /start
//! #   42 !CREATE_TASK
//! #   42 buy milk
//! ```

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use todobot::adapter::BotAdapter;
use todobot::config::{BotConfig, CliArgs};
use todobot::console::{self, ConsoleChat};
use todobot_core::data::DataManager;
use todobot_core::messages::MessageTracker;
use todobot_core::rate_limit::RateLimiter;
use todobot_core::store::TaskStore;
use todobot_core::sweep::Sweepers;

#[tokio::main]
async fn main() {
    let cli = CliArgs::parse();

    let config = match BotConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Stdout belongs to the console transport.
    let _log_guard = init_logging(&config.log_level, &config.log_file);

    tracing::info!(
        data_dir = %config.data_dir.display(),
        max_tasks = config.max_tasks_per_user,
        "todobot starting"
    );

    let store = Arc::new(TaskStore::with_max_tasks(
        DataManager::open(&config.data_dir).await,
        config.max_tasks_per_user,
    ));
    let users = store.warm_up().await;
    tracing::info!(users, "task lists loaded");

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limits,
        config.rate_limit_window,
    ));
    let tracker = Arc::new(MessageTracker::new());
    let client = Arc::new(ConsoleChat::new());

    let mut sweepers = Sweepers::spawn(
        Arc::clone(&store),
        Arc::clone(&tracker),
        Arc::clone(&limiter),
        Arc::clone(&client),
        &config.sweep,
    );

    let adapter = BotAdapter::new(store, limiter, tracker, client, config.max_task_length);
    run(&adapter).await;

    sweepers.shutdown();
    tracing::info!("todobot exiting");
}

/// Reads updates from stdin until EOF or Ctrl-C.
async fn run<R, C>(adapter: &BotAdapter<R, C>)
where
    R: todobot_core::data::TaskRepository,
    C: todobot_core::chat::ChatClient,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if let Some(update) = console::parse_line(&line) {
                        adapter.handle(update).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "failed to read from stdin");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }
}

/// Initialize logging to stderr and to an append-only log file.
///
/// Returns a [`WorkerGuard`] that must be held until shutdown so buffered
/// file entries are flushed. If the log path has no file name, only the
/// stderr layer is installed and `None` is returned. The same happens
/// when the file cannot be opened.
fn init_logging(level: &str, log_path: &Path) -> Option<WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file = log_path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|file_name| {
            let log_dir = match log_path.parent() {
                Some(dir) if !dir.as_os_str().is_empty() => dir,
                _ => Path::new("."),
            };
            match RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(log_dir)
            {
                Ok(appender) => Some(tracing_appender::non_blocking(appender)),
                Err(e) => {
                    eprintln!("Warning: cannot open log file {}: {e}", log_path.display());
                    None
                }
            }
        });
    let (file_layer, guard) = match file {
        Some((writer, guard)) => (
            Some(fmt::layer().with_writer(writer).with_ansi(false)),
            Some(guard),
        ),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}
