// WebSocket server for scorer clients.

use std::fmt::Display;

use futures_util::stream::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::protocol::Notification;

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug, PartialEq)]
pub enum WsEvent {
    /// A new WebSocket client has connected.
    Connected { addr: String },
    /// The current WebSocket client has disconnected.
    Disconnected,
    /// A text message was received from the client (raw JSON string).
    Message(String),
}

/// Run the WebSocket server on the given port.
///
/// Binds a TCP listener on `127.0.0.1:{port}` and accepts one connection at
/// a time. Text frames from the client are forwarded through `tx`; every
/// notification published on `updates` is written back to the client as a
/// JSON text frame. The server runs until the app side hangs up.
pub async fn run(
    port: u16,
    tx: mpsc::Sender<WsEvent>,
    updates: broadcast::Sender<Notification>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(format!("127.0.0.1:{port}")).await?;
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let ws_stream = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!("WebSocket handshake failed for {addr_str}: {e}");
                continue;
            }
        };

        let (write, read) = ws_stream.split();

        // Subscribe before announcing the connection so the snapshot sent in
        // reply to `Connected` reaches this client.
        let forwarder = tokio::spawn(forward_updates(updates.subscribe(), write));

        if tx
            .send(WsEvent::Connected {
                addr: addr_str.clone(),
            })
            .await
            .is_err()
        {
            forwarder.abort();
            break;
        }

        let closed = process_message_stream(read, &tx, &addr_str).await.is_err();
        forwarder.abort();
        if closed {
            break;
        }

        if tx.send(WsEvent::Disconnected).await.is_err() {
            break;
        }
    }

    Ok(())
}

/// Process raw WebSocket [`Message`] items from any [`Stream`], forwarding
/// text payloads through `tx`. Returns `Err(())` if the channel is closed
/// (receiver dropped), signalling the caller to stop.
pub async fn process_message_stream<St>(
    mut stream: St,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), ()>
where
    St: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(msg_result) = stream.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                if tx.send(WsEvent::Message(text.to_string())).await.is_err() {
                    return Err(());
                }
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

/// Write every notification from `rx` to `sink` as a JSON text frame.
///
/// Stops when the broadcast channel closes or the sink fails. A lagging
/// receiver skips the missed notifications; the client can recover with a
/// `request_snapshot` command.
pub async fn forward_updates<Si>(mut rx: broadcast::Receiver<Notification>, mut sink: Si)
where
    Si: Sink<Message> + Unpin,
    Si::Error: Display,
{
    loop {
        let notification = match rx.recv().await {
            Ok(n) => n,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Client lagged behind, skipped {skipped} notifications");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let json = match serde_json::to_string(&notification) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize notification: {e}");
                continue;
            }
        };

        if let Err(e) = sink.send(Message::Text(json.into())).await {
            debug!("Stopped forwarding notifications: {e}");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ConnectionStatus;
    use futures_util::stream;
    use tokio_tungstenite::tungstenite::Error as WsError;

    /// Helper: create a stream of Message results from a vec.
    fn mock_stream(
        messages: Vec<Result<Message, WsError>>,
    ) -> impl Stream<Item = Result<Message, WsError>> + Unpin {
        stream::iter(messages)
    }

    #[tokio::test]
    async fn text_message_forwarded_to_channel() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![Ok(Message::Text(r#"{"type":"request_snapshot"}"#.into()))];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(
            event,
            WsEvent::Message(r#"{"type":"request_snapshot"}"#.to_string())
        );
    }

    #[tokio::test]
    async fn multiple_messages_forwarded_in_order() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("first".into())),
            Ok(Message::Text("second".into())),
            Ok(Message::Text("third".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap(), WsEvent::Message("first".into()));
        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("second".into())
        );
        assert_eq!(rx.recv().await.unwrap(), WsEvent::Message("third".into()));
    }

    #[tokio::test]
    async fn close_frame_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("before_close".into())),
            Ok(Message::Close(None)),
            Ok(Message::Text("after_close_should_not_appear".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("before_close".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn error_stops_processing() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Text("before_error".into())),
            Err(WsError::ConnectionClosed),
            Ok(Message::Text("after_error_should_not_appear".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("before_error".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn binary_and_ping_messages_are_ignored() {
        let (tx, mut rx) = mpsc::channel(64);
        let messages = vec![
            Ok(Message::Binary(vec![1, 2, 3].into())),
            Ok(Message::Ping(vec![].into())),
            Ok(Message::Pong(vec![].into())),
            Ok(Message::Text("after_ignored".into())),
        ];

        process_message_stream(mock_stream(messages), &tx, "test")
            .await
            .unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            WsEvent::Message("after_ignored".into())
        );
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn returns_err_when_channel_closed() {
        let (tx, rx) = mpsc::channel(64);
        drop(rx);

        let messages = vec![Ok(Message::Text("orphan".into()))];

        let result = process_message_stream(mock_stream(messages), &tx, "test").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn forwards_notifications_as_json_text() {
        let (updates, rx) = broadcast::channel(16);
        updates
            .send(Notification::ConnectionStatus {
                status: ConnectionStatus::Connected,
            })
            .unwrap();
        updates
            .send(Notification::Rejected {
                command: "swap_strike".into(),
                reason: "unknown match: m9".into(),
            })
            .unwrap();
        drop(updates);

        let mut sent: Vec<Message> = Vec::new();
        forward_updates(rx, &mut sent).await;

        assert_eq!(sent.len(), 2);
        let Message::Text(first) = &sent[0] else {
            panic!("expected text frame");
        };
        let value: serde_json::Value = serde_json::from_str(first.as_str()).unwrap();
        assert_eq!(value["type"], "connection_status");
        let Message::Text(second) = &sent[1] else {
            panic!("expected text frame");
        };
        assert!(second.as_str().contains("unknown match: m9"));
    }

    #[tokio::test]
    async fn forwarding_skips_lagged_notifications() {
        let (updates, rx) = broadcast::channel(1);
        for reason in ["a", "b", "c"] {
            updates
                .send(Notification::Rejected {
                    command: "end_match".into(),
                    reason: reason.into(),
                })
                .unwrap();
        }
        drop(updates);

        let mut sent: Vec<Message> = Vec::new();
        forward_updates(rx, &mut sent).await;

        // Capacity 1: only the newest notification survives.
        assert_eq!(sent.len(), 1);
        let Message::Text(text) = &sent[0] else {
            panic!("expected text frame");
        };
        assert!(text.as_str().contains(r#""reason":"c""#));
    }
}
