//! 소켓 전송 포트.
//!
//! 구현: `camdeck-network` crate (tokio-tungstenite)
//!
//! 연결 하나는 송신용 `SocketSink`와 수신 채널 한 쌍으로 표현된다.
//! 수신 채널은 도착 순서대로 프레임을 전달하며, 마지막에 `Closed` 또는
//! `Error` 하나를 보낸 뒤 닫힌다.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 소켓에서 수신한 메시지
#[derive(Debug, Clone, PartialEq)]
pub enum SocketMessage {
    /// 텍스트 메시지 (JSON)
    Text(String),
    /// 바이너리 메시지 (영상 프레임)
    Binary(Vec<u8>),
    /// 정상 종료
    Closed { code: Option<u16>, reason: String },
    /// 전송 계층 에러
    Error(String),
}

/// 소켓 송신 측
#[async_trait]
pub trait SocketSink: Send + Sync {
    /// 텍스트 메시지 전송
    async fn send_text(&self, text: &str) -> Result<(), CoreError>;

    /// 연결 종료
    async fn close(&self) -> Result<(), CoreError>;
}

/// 소켓 연결기
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// `url`로 연결 수립
    async fn connect(
        &self,
        url: &str,
    ) -> Result<(Box<dyn SocketSink>, mpsc::Receiver<SocketMessage>), CoreError>;
}
