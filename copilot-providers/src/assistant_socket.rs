use anyhow::{Context, anyhow};
use copilot_core::config::ClientConfig;
use copilot_core::event::{InboundEvent, OutboundEvent};
use copilot_core::types::ConnectionStatus;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::protocol::{encode_outbound, parse_inbound_frame};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSocketConfig {
    pub ws_url: Url,
}

impl AssistantSocketConfig {
    pub fn from_client_config(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let raw = cfg.endpoint.trim();
        let ws_url =
            Url::parse(raw).with_context(|| format!("parse assistant endpoint: {raw}"))?;
        match ws_url.scheme() {
            "ws" | "wss" => Ok(Self { ws_url }),
            other => Err(anyhow!("unsupported assistant endpoint scheme: {other}")),
        }
    }
}

#[derive(Debug)]
enum SocketCmd {
    Send(OutboundEvent),
    Close,
}

/// Handle to one assistant connection.
///
/// Cloning shares the same connection. Once the status reaches `Disconnected` the
/// handle is dead for good; a new session needs a new handle.
#[derive(Clone)]
pub struct AssistantSocketHandle {
    tx: mpsc::UnboundedSender<SocketCmd>,
    status: watch::Receiver<ConnectionStatus>,
}

impl AssistantSocketHandle {
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn status_changes(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Fire-and-forget. Anything sent while not connected is dropped without feedback.
    pub fn send(&self, event: OutboundEvent) {
        let status = self.status();
        if !status.is_connected() {
            log::debug!("dropping outbound {} while {status}", event.kind());
            return;
        }
        if self.tx.send(SocketCmd::Send(event)).is_err() {
            log::debug!("dropping outbound event: socket task is gone");
        }
    }

    /// Closes the connection. Irreversible for this handle.
    pub fn close(&self) {
        let _ = self.tx.send(SocketCmd::Close);
    }
}

/// Opens the assistant connection in the background.
///
/// Returns immediately with status `Connecting`. Decoded inbound events arrive on the
/// receiver one per frame, in arrival order; the receiver ends when the connection does.
/// Must be called from within a Tokio runtime.
pub fn spawn_assistant_session(
    cfg: AssistantSocketConfig,
) -> (AssistantSocketHandle, mpsc::UnboundedReceiver<InboundEvent>) {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<SocketCmd>();
    // Unbounded on purpose: inbound frames are never dropped for lack of space.
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<InboundEvent>();
    let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

    tokio::spawn(run_session(cfg.ws_url, cmd_rx, evt_tx, status_tx));

    (
        AssistantSocketHandle {
            tx: cmd_tx,
            status: status_rx,
        },
        evt_rx,
    )
}

async fn run_session(
    url: Url,
    mut cmd_rx: mpsc::UnboundedReceiver<SocketCmd>,
    evt_tx: mpsc::UnboundedSender<InboundEvent>,
    status_tx: watch::Sender<ConnectionStatus>,
) {
    log::info!("connecting to assistant at {url}");

    let ws = tokio::select! {
        res = tokio_tungstenite::connect_async(url.as_str()) => match res {
            Ok((ws, _resp)) => ws,
            Err(e) => {
                log::warn!("assistant connect failed: {e}");
                status_tx.send_replace(ConnectionStatus::Disconnected);
                return;
            }
        },
        _ = wait_for_close(&mut cmd_rx) => {
            log::info!("assistant connection closed before it opened");
            status_tx.send_replace(ConnectionStatus::Disconnected);
            return;
        }
    };

    let (ws_write, mut ws_read) = ws.split();
    let out_tx = spawn_writer(ws_write);

    status_tx.send_replace(ConnectionStatus::Connected);
    log::info!("connected to assistant");

    // Queued before any command is read, so the probe is always the first frame out.
    queue_outbound(&out_tx, &OutboundEvent::Ping);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SocketCmd::Send(event)) => queue_outbound(&out_tx, &event),
                    Some(SocketCmd::Close) | None => break,
                }
            }

            // The writer only stops early on a transport error.
            _ = out_tx.closed() => {
                log::warn!("assistant websocket writer stopped");
                break;
            }

            msg = ws_read.next() => {
                let Some(msg) = msg else { break; };
                let msg = match msg {
                    Ok(m) => m,
                    Err(e) => {
                        log::warn!("assistant websocket read failed: {e}");
                        break;
                    }
                };

                let text = match msg {
                    Message::Text(t) => t.as_str().to_owned(),
                    Message::Binary(b) => String::from_utf8_lossy(&b).into_owned(),
                    Message::Close(_) => break,
                    Message::Ping(p) => {
                        let _ = out_tx.send(Message::Pong(p));
                        continue;
                    }
                    _ => continue,
                };

                match parse_inbound_frame(&text) {
                    Ok(event) => {
                        let _ = evt_tx.send(event);
                    }
                    Err(e) => log::debug!("dropping malformed assistant frame: {e:#}"),
                }
            }
        }
    }

    status_tx.send_replace(ConnectionStatus::Disconnected);
    log::info!("assistant connection closed");

    // Dropping `out_tx` ends the writer task, which will send Close.
}

/// Runs socket writes on their own task so the read loop never awaits them.
///
/// The returned sender reports `closed()` once the writer has given up after a write
/// error. When the sender is dropped the writer sends a Close frame and exits.
fn spawn_writer<S>(mut sink: S) -> mpsc::UnboundedSender<Message>
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: std::fmt::Display,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if let Err(e) = sink.send(msg).await {
                log::warn!("assistant websocket write failed: {e}");
                return;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });
    out_tx
}

async fn wait_for_close(cmd_rx: &mut mpsc::UnboundedReceiver<SocketCmd>) {
    loop {
        match cmd_rx.recv().await {
            Some(SocketCmd::Close) | None => return,
            // The handle only forwards sends while connected; this can't carry real traffic.
            Some(SocketCmd::Send(event)) => {
                log::debug!("dropping outbound {} while connecting", event.kind());
            }
        }
    }
}

fn queue_outbound(out_tx: &mpsc::UnboundedSender<Message>, event: &OutboundEvent) {
    match encode_outbound(event) {
        Ok(text) => {
            if out_tx.send(Message::Text(text.into())).is_err() {
                log::debug!("dropping outbound {}: writer is gone", event.kind());
            }
        }
        Err(e) => log::warn!("{e:#}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_core::stage::Stage;
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    fn cfg_for(addr: std::net::SocketAddr) -> AssistantSocketConfig {
        AssistantSocketConfig::from_client_config(&ClientConfig::with_endpoint(format!(
            "ws://{addr}/ws/assistant"
        )))
        .unwrap()
    }

    async fn wait_status(handle: &AssistantSocketHandle, want: ConnectionStatus) {
        let mut rx = handle.status_changes();
        tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| *s == want))
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn config_accepts_ws_and_wss() {
        for endpoint in ["ws://localhost:8080/ws/assistant", " wss://copilot.example.com/ws "] {
            let cfg =
                AssistantSocketConfig::from_client_config(&ClientConfig::with_endpoint(endpoint))
                    .unwrap();
            assert!(cfg.ws_url.scheme().starts_with("ws"));
        }
    }

    #[test]
    fn config_rejects_other_schemes_and_garbage() {
        let err =
            AssistantSocketConfig::from_client_config(&ClientConfig::with_endpoint("http://x/ws"))
                .unwrap_err();
        assert!(err.to_string().contains("unsupported assistant endpoint scheme: http"));

        assert!(
            AssistantSocketConfig::from_client_config(&ClientConfig::with_endpoint("not a url"))
                .is_err()
        );
    }

    #[tokio::test]
    async fn writer_failure_closes_its_channel() {
        let attempts = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = attempts.clone();
        let failing = Box::pin(futures_util::sink::unfold((), move |(), _msg: Message| {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Err::<(), _>(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "connection reset",
                ))
            }
        }));

        let out_tx = spawn_writer(failing);
        assert!(!out_tx.is_closed());
        out_tx.send(Message::Text("{}".into())).unwrap();

        tokio::time::timeout(Duration::from_secs(2), out_tx.closed())
            .await
            .unwrap();
        // No Close frame is attempted after a failed write.
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert!(out_tx.send(Message::Text("{}".into())).is_err());
    }

    #[tokio::test]
    async fn integration_ws_sends_ping_first_and_delivers_events_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            let first = match ws.next().await {
                Some(Ok(Message::Text(t))) => t.as_str().to_owned(),
                other => panic!("expected text frame, got {other:?}"),
            };

            for frame in [
                r#"{"type":"stage_start","stage":"segment"}"#,
                "{not json",
                r#"{"type":"typing"}"#,
                r#"{"type":"thinking","step":"classify intent"}"#,
                r#"{"type":"assistant_message","message":"Found 120 matching users."}"#,
            ] {
                ws.send(Message::Text(frame.into())).await.unwrap();
            }
            let _ = ws.close(None).await;
            first
        });

        let (handle, mut events) = spawn_assistant_session(cfg_for(addr));

        let mut got = vec![];
        while let Ok(Some(ev)) = tokio::time::timeout(Duration::from_secs(2), events.recv()).await
        {
            got.push(ev);
        }

        assert_eq!(server.await.unwrap(), r#"{"type":"ping"}"#);
        assert_eq!(
            got,
            vec![
                InboundEvent::StageStart {
                    stage: Stage::Segment
                },
                InboundEvent::Thinking {
                    step: "classify intent".into()
                },
                InboundEvent::AssistantMessage {
                    message: "Found 120 matching users.".into()
                },
            ]
        );

        wait_status(&handle, ConnectionStatus::Disconnected).await;
    }

    #[tokio::test]
    async fn integration_ws_intent_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(txt) = msg {
                    let v: serde_json::Value = serde_json::from_str(txt.as_str()).unwrap();
                    if v["type"] == "intent" {
                        let reply = serde_json::json!({
                            "type": "assistant_message",
                            "message": format!("ack: {}", v["intent"].as_str().unwrap()),
                        });
                        let _ = ws.send(Message::Text(reply.to_string().into())).await;
                    }
                }
            }
        });

        let (handle, mut events) = spawn_assistant_session(cfg_for(addr));
        wait_status(&handle, ConnectionStatus::Connected).await;

        handle.send(OutboundEvent::Intent {
            intent: "win back VIPs".into(),
        });

        let ev = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            ev,
            InboundEvent::AssistantMessage {
                message: "ack: win back VIPs".into()
            }
        );

        handle.close();
        wait_status(&handle, ConnectionStatus::Disconnected).await;
    }

    #[tokio::test]
    async fn integration_ws_close_sends_close_frame_and_is_terminal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            let mut texts = vec![];
            while let Some(Ok(msg)) = ws.next().await {
                match msg {
                    Message::Text(t) => texts.push(t.as_str().to_owned()),
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            texts
        });

        let (handle, mut events) = spawn_assistant_session(cfg_for(addr));
        wait_status(&handle, ConnectionStatus::Connected).await;

        handle.close();
        wait_status(&handle, ConnectionStatus::Disconnected).await;

        // Dropped: the handle is dead.
        handle.send(OutboundEvent::Intent {
            intent: "too late".into(),
        });

        let texts = tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(texts, vec![r#"{"type":"ping"}"#.to_string()]);

        let end = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap();
        assert!(end.is_none());
        assert_eq!(handle.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn integration_refused_connection_is_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (handle, mut events) = spawn_assistant_session(cfg_for(addr));
        wait_status(&handle, ConnectionStatus::Disconnected).await;

        let end = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn integration_send_while_connecting_is_dropped() {
        // Accept TCP but never answer the WebSocket handshake.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<()>();
        tokio::spawn(async move {
            use tokio::io::AsyncReadExt;

            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let mut announced = false;
            loop {
                match stream.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) if !announced => {
                        announced = true;
                        let _ = seen_tx.send(());
                    }
                    Ok(_) => {}
                }
            }
        });

        let (handle, _events) = spawn_assistant_session(cfg_for(addr));

        // The upgrade request is out; the handshake is now stuck.
        tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(handle.status(), ConnectionStatus::Connecting);

        handle.send(OutboundEvent::Intent {
            intent: "hello?".into(),
        });
        assert_eq!(handle.status(), ConnectionStatus::Connecting);

        handle.close();
        wait_status(&handle, ConnectionStatus::Disconnected).await;
    }
}
