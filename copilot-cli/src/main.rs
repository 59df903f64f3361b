mod render;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use copilot_appcore::service::{ChatService, UserAction};
use copilot_core::types::ConnectionStatus;
use copilot_engine::store::TranscriptStore;
use copilot_providers::assistant_socket::{AssistantSocketConfig, spawn_assistant_session};
use copilot_runtime::config_store::ConfigStore;
use copilot_runtime::defaults::resolve_client_config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use crate::render::{ConsoleRenderer, render_stepper};

const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Terminal client for the campaign copilot assistant.
#[derive(Debug, Parser)]
#[command(name = "copilot", version)]
struct Args {
    /// Assistant WebSocket endpoint (overrides the config file).
    #[arg(long, env = "COPILOT_WS_URL")]
    endpoint: Option<String>,

    /// JSON client config file.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let from_file = match &args.config {
        Some(path) => ConfigStore::at_path(path)
            .load_optional()
            .with_context(|| format!("load config {}", path.display()))?,
        None => None,
    };
    let cfg = resolve_client_config(args.endpoint.as_deref(), from_file);
    let socket_cfg = AssistantSocketConfig::from_client_config(&cfg)?;

    let (socket, inbound) = spawn_assistant_session(socket_cfg);

    let mut service = ChatService::new(TranscriptStore::default(), Arc::new(socket.clone()));
    service.subscribe(Arc::new(ConsoleRenderer::new()));
    println!("{}", render_stepper(service.state().stage));

    // Status indicator: the only failure signal the user sees.
    let mut status = socket.status_changes();
    tokio::spawn(async move {
        println!("[{}]", status.borrow_and_update().label());
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            println!("[{}]", current.label());
        }
    });

    let (action_tx, action_rx) = mpsc::channel::<UserAction>(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if action_tx.send(UserAction::Submit(line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log::warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
    });

    let interrupted = tokio::select! {
        state = service.run(inbound, action_rx) => {
            log::info!("session ended with {} units at stage {}", state.transcript.len(), state.stage);
            false
        }
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                log::warn!("ctrl-c handler failed: {e}");
            }
            true
        }
    };

    socket.close();
    let mut status = socket.status_changes();
    let _ = tokio::time::timeout(
        CLOSE_GRACE,
        status.wait_for(|s| *s == ConnectionStatus::Disconnected),
    )
    .await;

    if interrupted {
        // The stdin reader sits in a blocking read that can't be cancelled; don't wait
        // for the runtime to join it.
        std::process::exit(130);
    }
    Ok(())
}
