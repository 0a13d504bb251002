//! WebSocket 클라이언트.
//!
//! `tokio-tungstenite` 기반 `SocketConnector` 포트 구현.

use async_trait::async_trait;
use camdeck_core::error::CoreError;
use camdeck_core::ports::transport::{SocketConnector, SocketMessage, SocketSink};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// 수신 채널 버퍼 크기
const INBOUND_BUFFER: usize = 64;

/// WebSocket 연결기
#[derive(Debug, Default, Clone)]
pub struct WsClient;

impl WsClient {
    pub fn new() -> Self {
        Self
    }

    /// 수신 루프
    ///
    /// 종료 시 `Closed` 또는 `Error` 하나를 마지막으로 전달한다.
    async fn read_loop(mut read: SplitStream<WsStream>, tx: mpsc::Sender<SocketMessage>) {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if tx.send(SocketMessage::Text(text.to_string())).await.is_err() {
                        debug!("수신 채널 닫힘, 수신 루프 중단");
                        return;
                    }
                }
                Ok(Message::Binary(data)) => {
                    if tx.send(SocketMessage::Binary(data.to_vec())).await.is_err() {
                        debug!("수신 채널 닫힘, 수신 루프 중단");
                        return;
                    }
                }
                Ok(Message::Close(frame)) => {
                    let (code, reason) = match frame {
                        Some(frame) => (Some(u16::from(frame.code)), frame.reason.to_string()),
                        None => (None, String::new()),
                    };
                    debug!("WebSocket 종료 프레임 수신: code={code:?}");
                    let _ = tx.send(SocketMessage::Closed { code, reason }).await;
                    return;
                }
                Ok(_) => {} // Ping/Pong은 자동 처리
                Err(e) => {
                    warn!("WebSocket 수신 에러: {e}");
                    let _ = tx.send(SocketMessage::Error(e.to_string())).await;
                    return;
                }
            }
        }

        let _ = tx
            .send(SocketMessage::Closed {
                code: None,
                reason: "stream ended".to_string(),
            })
            .await;
        debug!("WebSocket 수신 루프 종료");
    }
}

#[async_trait]
impl SocketConnector for WsClient {
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, mpsc::Receiver<SocketMessage>), CoreError> {
        info!("WebSocket 연결: {url}");

        let (ws_stream, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 연결 실패: {e}")))?;

        let (write, read) = ws_stream.split();
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        tokio::spawn(Self::read_loop(read, tx));

        Ok((
            Box::new(WsSender {
                write: Mutex::new(write),
            }),
            rx,
        ))
    }
}

/// WebSocket 송신기
pub struct WsSender {
    write: Mutex<SplitSink<WsStream, Message>>,
}

#[async_trait]
impl SocketSink for WsSender {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 전송 실패: {e}")))
    }

    async fn close(&self) -> Result<(), CoreError> {
        let mut write = self.write.lock().await;
        write
            .send(Message::Close(None))
            .await
            .map_err(|e| CoreError::Network(format!("WebSocket 종료 실패: {e}")))
    }
}
