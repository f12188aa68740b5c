//! Websocket transport.
//!
//! A thin I/O layer: frames go in and out over channels, and an internal
//! task owns the socket. All protocol logic stays in the sans-IO state
//! machines; this module only encodes, decodes, and reports closure.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, tungstenite::protocol::Message,
};

use chatwire_proto::Frame;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),
}

/// What the socket task reports upward.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// A decoded inbound frame.
    Frame(Frame),
    /// The socket closed or errored. One terminal event per socket.
    Closed,
}

/// Handle to one live websocket.
///
/// Frames are sent and received via the channels; an internal task handles
/// the socket I/O. Dropping the handle without [`Socket::stop`] leaks the
/// task until the peer closes.
pub struct Socket {
    /// Send frames to the broker.
    pub to_server: mpsc::Sender<Frame>,
    /// Receive frames and the closure signal from the broker.
    pub from_server: mpsc::Receiver<SocketEvent>,
    abort_handle: tokio::task::AbortHandle,
}

impl Socket {
    /// Stop the socket task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to the broker.
///
/// Returns a [`Socket`] with channels for frame transport.
///
/// # Errors
///
/// - `TransportError::Connection` when the handshake fails.
pub async fn connect(url: &str) -> Result<Socket, TransportError> {
    let (stream, _response) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<Frame>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<SocketEvent>(32);

    let handle = tokio::spawn(run_socket(stream, to_server_rx, from_server_tx));

    Ok(Socket {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

/// Run the socket, bridging between channels and the websocket.
async fn run_socket(
    stream: WsStream,
    mut to_server: mpsc::Receiver<Frame>,
    from_server: mpsc::Sender<SocketEvent>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            outbound = to_server.recv() => {
                let Some(frame) = outbound else { break };
                match frame.encode() {
                    Ok(json) => {
                        if let Err(err) = sink.send(Message::Text(json.into())).await {
                            tracing::warn!(%err, "socket write failed");
                            let _ = from_server.send(SocketEvent::Closed).await;
                            break;
                        }
                    },
                    Err(err) => tracing::warn!(%err, "dropping unencodable frame"),
                }
            }
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => match Frame::decode(&text) {
                        Ok(frame) => {
                            if from_server.send(SocketEvent::Frame(frame)).await.is_err() {
                                break;
                            }
                        },
                        // Malformed broker traffic is dropped, not fatal
                        Err(err) => tracing::warn!(%err, "dropping undecodable frame"),
                    },
                    // tungstenite answers pings internally
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {},
                    Some(Ok(Message::Close(_))) | None => {
                        let _ = from_server.send(SocketEvent::Closed).await;
                        break;
                    },
                    Some(Err(err)) => {
                        tracing::warn!(%err, "socket read failed");
                        let _ = from_server.send(SocketEvent::Closed).await;
                        break;
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_to_closed_port_fails_fast() {
        let result = connect("ws://127.0.0.1:9/app").await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }
}
