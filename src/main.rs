//! taskwire — task-event notification stream client.
//!
//! Connects to the backend's task-event WebSocket stream for one
//! authenticated user, logs every delivered notification, and keeps the
//! connection alive until interrupted.
//!
//! Usage:
//!   taskwire --user-id 3 --token <jwt>
//!   taskwire --user-id 3 --token <jwt> --server http://host:8000
//!   taskwire --user-id 3 --token <jwt> --history   # fetch a history page first

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use taskwire_client::{
    ClientConfig, ClientEvent, EventKind, NotificationClient, PageLoader, PresentError, Presenter,
    event_summary,
};
use taskwire_protocol::TaskStatusEvent;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "taskwire", about = "Task-event notification stream client")]
struct Cli {
    /// Backend REST base URL
    #[arg(long, default_value = "http://localhost:8000")]
    server: String,

    /// Event-stream base URL (derived from --server if omitted)
    #[arg(long)]
    ws_server: Option<String>,

    /// Authenticated user id
    #[arg(long)]
    user_id: i64,

    /// Bearer token
    #[arg(long)]
    token: String,

    /// Fetch a page of notification history on startup
    #[arg(long)]
    history: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

/// Presenter that renders notifications into the log.
struct LogPresenter;

impl Presenter for LogPresenter {
    fn task_completed(&self, event: &TaskStatusEvent) -> Result<(), PresentError> {
        info!(task_id = %event.task_id, "task completed\n{}", event_summary(event));
        Ok(())
    }

    fn task_failed(&self, event: &TaskStatusEvent) -> Result<(), PresentError> {
        error!(task_id = %event.task_id, "task failed\n{}", event_summary(event));
        Ok(())
    }

    fn task_processing(&self, label: &str, message: &str) -> Result<(), PresentError> {
        info!("{label} - {message}");
        Ok(())
    }
}

/// Headless stand-in for full-page navigation.
struct LogPageLoader;

impl PageLoader for LogPageLoader {
    fn load(&self, url: &str) -> Result<(), PresentError> {
        info!("would navigate to {url}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let ws_base = cli.ws_server.clone().unwrap_or_else(|| {
        cli.server
            .replacen("https://", "wss://", 1)
            .replacen("http://", "ws://", 1)
    });

    let config = ClientConfig {
        http_base: cli.server.clone(),
        ws_base,
        ..ClientConfig::default()
    };

    let client = NotificationClient::new(config, Arc::new(LogPresenter), Arc::new(LogPageLoader));

    client.on(EventKind::Connected, |_| info!("event stream connected"));
    client.on(EventKind::Disconnected, |_| {
        warn!("event stream disconnected")
    });
    client.on(EventKind::Error, |event| {
        if let ClientEvent::Error(message) = event {
            warn!("stream error: {message}");
        }
    });
    client.on(EventKind::ActiveTasks, |event| {
        if let ClientEvent::ActiveTasks(tasks) = event {
            info!("{} task(s) already in flight", tasks.len());
        }
    });

    client.connect(cli.user_id, &cli.token);

    if cli.history {
        client.fetch_history(&cli.token, Default::default()).await;
        let unread = client.fetch_unread_count(&cli.token).await;
        info!(
            "history: {} notification(s), {unread} unread",
            client.history().len()
        );
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    client.disconnect().await;

    Ok(())
}
